//! Prepayment accounting.
//!
//! Prepay groups buy credit up front. Each month the usage of the group's
//! projects is drawn from the group balance before anything is billed to the PI.
//! The month's own debits are always recomputed from the dataset, never read
//! back, so re-running a month yields the same debits.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use crate::dataset::Dataset;
use crate::error::{InvoiceError, Result};
use crate::models::{PrepayBook, PrepayDebit};
use crate::month::InvoiceMonth;
use crate::stages::{Stage, StageContext};

pub struct Prepayment;

/// Every group referenced anywhere needs a contact, and no debit may postdate the month
pub fn validate_book(book: &PrepayBook, month: &InvoiceMonth) -> Result<()> {
    let contacts: BTreeSet<&str> = book.groups().collect();
    let referenced = book
        .projects
        .iter()
        .map(|p| p.group.as_str())
        .chain(book.credits.iter().map(|c| c.group.as_str()))
        .chain(book.debits.iter().map(|d| d.group.as_str()));
    let unknown: BTreeSet<&str> = referenced.filter(|g| !contacts.contains(g)).collect();
    if !unknown.is_empty() {
        return Err(InvoiceError::Prepay(format!(
            "groups {unknown:?} have no contact entry"
        )));
    }

    if let Some(late) = book.debits.iter().find(|d| &d.month > month) {
        return Err(InvoiceError::Prepay(format!(
            "debit of {} for group {} is dated {}, after the invoice month {month}",
            late.debit, late.group, late.month
        )));
    }
    Ok(())
}

/// Balance of each group at the start of the month
pub fn starting_balances(
    book: &PrepayBook,
    month: &InvoiceMonth,
) -> Result<BTreeMap<String, Decimal>> {
    let mut balances = BTreeMap::new();
    for group in book.groups() {
        let balance = book.credits_through(group, month) - book.debits_before(group, month);
        if balance < Decimal::ZERO {
            return Err(InvoiceError::Prepay(format!(
                "group {group} has a negative balance of {balance} in {month}"
            )));
        }
        balances.insert(group.to_string(), balance);
    }
    Ok(balances)
}

impl Stage for Prepayment {
    fn name(&self) -> &'static str {
        "prepayment"
    }

    fn process(&self, mut data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset> {
        let book = &ctx.config.prepay;
        validate_book(book, ctx.month)?;
        let mut remaining = starting_balances(book, ctx.month)?;

        for record in data.iter_mut() {
            record.prepay_group = None;
            record.group_managed = None;
            record.group_balance = None;
            record.group_balance_used = None;

            let mut used = Decimal::ZERO;
            if let Some(group) = book.group_for_project(&record.project_name, ctx.month) {
                record.prepay_group = Some(group.to_string());
                record.group_managed = book.contact(group).map(|c| c.managed);

                if record.invoiceable()? {
                    let owed = record.cost - record.credit_or_zero() - record.subsidy_or_zero();
                    let balance = remaining.entry(group.to_string()).or_insert(Decimal::ZERO);
                    used = (*balance).min(owed.max(Decimal::ZERO));
                    *balance -= used;
                    record.group_balance_used = Some(used);
                }
            }

            record.balance = Some(record.cost - record.credit_or_zero() - used);
            record.pi_balance =
                Some(record.cost - record.credit_or_zero() - record.subsidy_or_zero() - used);
        }

        for record in data.iter_mut() {
            if let Some(group) = &record.prepay_group {
                record.group_balance = remaining.get(group).copied();
            }
        }
        Ok(data)
    }
}

/// Amount each group used in a processed dataset
pub fn group_usage(data: &Dataset) -> BTreeMap<String, Decimal> {
    let mut usage = BTreeMap::new();
    for record in data {
        if let (Some(group), Some(used)) = (&record.prepay_group, record.group_balance_used) {
            *usage.entry(group.clone()).or_insert(Decimal::ZERO) += used;
        }
    }
    usage
}

/// Debit ledger with the month's entries replaced by this run's usage
pub fn updated_debits(book: &PrepayBook, data: &Dataset, month: &InvoiceMonth) -> Vec<PrepayDebit> {
    let mut debits: Vec<PrepayDebit> = book
        .debits
        .iter()
        .filter(|d| &d.month != month)
        .cloned()
        .collect();
    debits.extend(
        group_usage(data)
            .into_iter()
            .filter(|(_, used)| *used > Decimal::ZERO)
            .map(|(group, debit)| PrepayDebit {
                month: month.clone(),
                group,
                debit,
            }),
    );
    debits
}
