pub mod allocation;
pub mod institute;
pub mod pi_history;
pub mod prepay;
pub mod record;
pub mod rules;

pub use allocation::AllocationRecord;
pub use institute::{Institute, InstituteList};
pub use pi_history::PiHistoryRecord;
pub use prepay::{PrepayBook, PrepayContact, PrepayCredit, PrepayDebit, PrepayProject};
pub use record::{Column, UsageRecord};
pub use rules::{NonbillableRule, ResolvedRule, RuleClusterEntry, RuleEntry};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Parse a decimal from its text form, never through a float
pub(crate) fn de_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let t = s.trim();
    if t.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(t).map_err(serde::de::Error::custom)
}

/// Lenient boolean: `1`, `true`, `yes`, `on` (any case) are true
pub(crate) fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    ))
}
