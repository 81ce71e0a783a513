//! New-PI credit.
//!
//! A PI's first two invoice months are covered by a credit up to the month's
//! `New PI Credit` amount. The first month gets the full initial amount; the
//! second month gets whatever the first left over.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use crate::config::NEW_PI_CREDIT_CODE;
use crate::dataset::Dataset;
use crate::error::{InvoiceError, Result};
use crate::models::{PiHistoryRecord, UsageRecord};
use crate::month::InvoiceMonth;
use crate::stages::{Stage, StageContext};

pub struct NewPiCredit;

/// Months since the PI's first invoice; a PI with no history is new this month
pub fn pi_age(history: Option<&PiHistoryRecord>, month: &InvoiceMonth) -> Result<i32> {
    let Some(entry) = history else {
        return Ok(0);
    };
    let age = month.months_since(&entry.first_month);
    if age < 0 {
        return Err(InvoiceError::PiHistory(format!(
            "first invoice month {} of PI {} is after the invoice month {month}",
            entry.first_month, entry.pi
        )));
    }
    Ok(age)
}

/// Credit available to a PI this month
fn credit_budget(
    history: Option<&PiHistoryRecord>,
    month: &InvoiceMonth,
    current_amount: Decimal,
) -> Result<Decimal> {
    let budget = match (pi_age(history, month)?, history) {
        (0, None) => current_amount,
        (0, Some(h)) => h.initial_credits,
        (1, Some(h)) => h.initial_credits - h.first_month_used,
        _ => Decimal::ZERO,
    };
    Ok(budget.max(Decimal::ZERO))
}

fn is_credit_eligible(record: &UsageRecord, ctx: &StageContext<'_>) -> Result<bool> {
    if !record.invoiceable()? {
        return Ok(false);
    }
    if record
        .su_type
        .as_ref()
        .is_some_and(|t| ctx.config.credit_excluded_su_types.contains(t))
    {
        return Ok(false);
    }
    if ctx.config.rates.limit_new_pi_credit_to_partners {
        let partner = record
            .institution
            .as_deref()
            .is_some_and(|i| ctx.config.institutes.is_partner(i, ctx.month));
        return Ok(partner);
    }
    Ok(true)
}

impl Stage for NewPiCredit {
    fn name(&self) -> &'static str {
        "new-pi-credit"
    }

    fn process(&self, mut data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset> {
        let history: HashMap<&str, &PiHistoryRecord> = ctx
            .config
            .pi_history
            .iter()
            .map(|h| (h.pi.as_str(), h))
            .collect();
        let mut remaining: HashMap<String, Decimal> = HashMap::new();

        for record in data.iter_mut() {
            record.credit = None;
            record.credit_code = None;

            if is_credit_eligible(record, ctx)? {
                let pi = record.pi().unwrap_or_default().to_string();
                let budget = match remaining.get(&pi) {
                    Some(b) => *b,
                    None => credit_budget(
                        history.get(pi.as_str()).copied(),
                        ctx.month,
                        ctx.config.rates.new_pi_credit_amount,
                    )?,
                };
                let credit = budget.min(record.cost.max(Decimal::ZERO));
                remaining.insert(pi, budget - credit);
                if credit > Decimal::ZERO {
                    record.credit = Some(credit);
                    record.credit_code = Some(NEW_PI_CREDIT_CODE.to_string());
                }
            }

            let balance = record.cost - record.credit_or_zero();
            record.pi_balance = Some(balance);
            record.balance = Some(balance);
        }
        Ok(data)
    }
}

/// Credit applied per PI in a processed dataset
pub fn credit_used_by_pi(data: &Dataset) -> BTreeMap<String, Decimal> {
    let mut used = BTreeMap::new();
    for record in data {
        if record.credit_code.as_deref() != Some(NEW_PI_CREDIT_CODE) {
            continue;
        }
        if let Some(pi) = record.pi() {
            *used.entry(pi.to_string()).or_insert(Decimal::ZERO) += record.credit_or_zero();
        }
    }
    used
}

/// PI history after this month.
///
/// Billable PIs seen for the first time are appended with the month's credit
/// amount, and the used amount for the PI's current age slot is recorded.
pub fn updated_pi_history(
    history: &[PiHistoryRecord],
    data: &Dataset,
    month: &InvoiceMonth,
    current_amount: Decimal,
) -> Result<Vec<PiHistoryRecord>> {
    let mut updated = history.to_vec();

    for record in data {
        let Some(pi) = record.pi() else {
            continue;
        };
        if record.billable()? && !updated.iter().any(|h| h.pi == pi) {
            updated.push(PiHistoryRecord::new_pi(pi, month, current_amount));
        }
    }

    let used = credit_used_by_pi(data);
    for entry in updated.iter_mut() {
        let amount = used.get(&entry.pi).copied().unwrap_or(Decimal::ZERO);
        let slot = match pi_age(Some(entry), month)? {
            0 => &mut entry.first_month_used,
            1 => &mut entry.second_month_used,
            _ => continue,
        };
        if *slot != Decimal::ZERO && *slot != amount {
            tracing::warn!(
                pi = %entry.pi,
                recorded = %slot,
                computed = %amount,
                "PI credit usage differs from the recorded amount"
            );
        }
        *slot = amount;
    }
    Ok(updated)
}
