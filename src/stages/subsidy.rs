use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::models::UsageRecord;
use crate::stages::{Stage, StageContext};

/// Flat per-project subsidy for the subsidized institution.
///
/// The month's amount is a budget per project, drawn down across the project's
/// rows in order and never beyond what is left after credits.
pub struct Subsidy;

fn is_subsidy_eligible(record: &UsageRecord, ctx: &StageContext<'_>) -> Result<bool> {
    Ok(record.invoiceable()?
        && record.institution.as_deref() == Some(ctx.config.subsidy_institution.as_str()))
}

impl Stage for Subsidy {
    fn name(&self) -> &'static str {
        "subsidy"
    }

    fn process(&self, mut data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset> {
        let amount = ctx.config.rates.bu_subsidy_amount;
        let mut remaining: HashMap<String, Decimal> = HashMap::new();

        for record in data.iter_mut() {
            record.subsidy = None;
            let after_credit = record.cost - record.credit_or_zero();

            if is_subsidy_eligible(record, ctx)? {
                let budget = remaining
                    .entry(record.project_name.clone())
                    .or_insert(amount);
                let subsidy = (*budget).min(after_credit.max(Decimal::ZERO));
                *budget -= subsidy;
                record.subsidy = Some(subsidy);
            }
            record.pi_balance = Some(after_credit - record.subsidy_or_zero());
        }
        Ok(data)
    }
}
