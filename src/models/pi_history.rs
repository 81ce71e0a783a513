use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::de_decimal;
use crate::month::InvoiceMonth;

/// A PI's credit history, one line of `PI.csv`
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PiHistoryRecord {
    #[serde(rename = "PI")]
    pub pi: String,
    #[serde(rename = "First Invoice Month")]
    pub first_month: InvoiceMonth,
    #[serde(rename = "Initial Credits", deserialize_with = "de_decimal")]
    pub initial_credits: Decimal,
    #[serde(rename = "1st Month Used", deserialize_with = "de_decimal")]
    pub first_month_used: Decimal,
    #[serde(rename = "2nd Month Used", deserialize_with = "de_decimal")]
    pub second_month_used: Decimal,
}

pub const PI_HISTORY_HEADERS: [&str; 5] = [
    "PI",
    "First Invoice Month",
    "Initial Credits",
    "1st Month Used",
    "2nd Month Used",
];

impl PiHistoryRecord {
    pub fn new_pi(pi: &str, month: &InvoiceMonth, initial_credits: Decimal) -> Self {
        PiHistoryRecord {
            pi: pi.to_string(),
            first_month: month.clone(),
            initial_credits,
            first_month_used: Decimal::ZERO,
            second_month_used: Decimal::ZERO,
        }
    }
}
