use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::su_kind;
use crate::dataset::Dataset;
use crate::error::{InvoiceError, Result};
use crate::rates::lenovo_charge_metric;
use crate::stages::{Stage, StageContext};

/// Prices Lenovo SU types at the month's per-SU charge
pub struct LenovoRates;

impl Stage for LenovoRates {
    fn name(&self) -> &'static str {
        "lenovo-rates"
    }

    fn process(&self, mut data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset> {
        for record in data.iter_mut() {
            let Some(su_type) = record.su_type.as_deref() else {
                continue;
            };
            if !ctx.config.is_lenovo_su_type(su_type) {
                continue;
            }
            let kind = su_kind(su_type);
            let su_charge = *ctx.config.rates.lenovo_charges.get(kind).ok_or_else(|| {
                InvoiceError::MissingRate {
                    metric: lenovo_charge_metric(kind),
                    month: ctx.month.to_string(),
                }
            })?;
            let hours = record.su_hours.unwrap_or(Decimal::ZERO);
            record.su_charge = Some(su_charge);
            record.lenovo_charge = Some(
                (hours * su_charge).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            );
        }
        Ok(data)
    }
}
