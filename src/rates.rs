//! # Rates Module
//!
//! Monthly rate values used by the credit, subsidy and Lenovo stages.
//!
//! ## Rate Metrics
//!
//! - `New PI Credit`: credit granted to a PI in their first invoice months
//! - `Limit New PI Credit to MGHPCC Partners`: restricts that credit to partners
//! - `BU Subsidy`: per-project subsidy for Boston University
//! - `Lenovo {SU} Charge`: per-SU charge for each Lenovo SU kind
//!
//! Values explicitly set in [`RateOverrides`] take precedence over the rate table.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::{InvoiceError, Result};
use crate::month::InvoiceMonth;

pub const NEW_PI_CREDIT: &str = "New PI Credit";
pub const LIMIT_NEW_PI_CREDIT_TO_PARTNERS: &str = "Limit New PI Credit to MGHPCC Partners";
pub const BU_SUBSIDY: &str = "BU Subsidy";

/// SU kinds billed at Lenovo rates
pub const LENOVO_SU_KINDS: [&str; 2] = ["GPUA100SXM4", "GPUH100"];

pub fn lenovo_charge_metric(su_kind: &str) -> String {
    format!("Lenovo {su_kind} Charge")
}

/// Source of monthly rate values, a pure function of (metric, month)
pub trait RateTable {
    fn get_value_at(&self, metric: &str, month: &InvoiceMonth) -> Result<String>;

    fn get_decimal_at(&self, metric: &str, month: &InvoiceMonth) -> Result<Decimal> {
        let raw = self.get_value_at(metric, month)?;
        Decimal::from_str(raw.trim()).map_err(|e| {
            InvoiceError::Configuration(format!("rate {metric:?} value {raw:?}: {e}"))
        })
    }

    fn get_bool_at(&self, metric: &str, month: &InvoiceMonth) -> Result<bool> {
        let raw = self.get_value_at(metric, month)?;
        Ok(matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ))
    }
}

#[derive(Deserialize, Debug, Clone)]
struct RateHistoryEntry {
    value: serde_yaml::Value,
    from: InvoiceMonth,
    #[serde(default)]
    until: Option<InvoiceMonth>,
}

#[derive(Deserialize, Debug, Clone)]
struct RateDefinition {
    name: String,
    history: Vec<RateHistoryEntry>,
}

/// Rate table read from a YAML file of `{name, history: [{value, from, until?}]}`
#[derive(Debug, Clone, Default)]
pub struct YamlRateTable {
    rates: BTreeMap<String, Vec<RateHistoryEntry>>,
}

impl YamlRateTable {
    pub fn parse(yaml: &str) -> Result<Self> {
        let defs: Vec<RateDefinition> = serde_yaml::from_str(yaml)?;
        Ok(YamlRateTable {
            rates: defs.into_iter().map(|d| (d.name, d.history)).collect(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

fn yaml_scalar(v: &serde_yaml::Value) -> Option<String> {
    match v {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl RateTable for YamlRateTable {
    fn get_value_at(&self, metric: &str, month: &InvoiceMonth) -> Result<String> {
        self.rates
            .get(metric)
            .and_then(|history| {
                history.iter().find(|h| {
                    &h.from <= month && h.until.as_ref().is_none_or(|u| month <= u)
                })
            })
            .and_then(|h| yaml_scalar(&h.value))
            .ok_or_else(|| InvoiceError::MissingRate {
                metric: metric.to_string(),
                month: month.to_string(),
            })
    }
}

/// Rate table with no values; every lookup fails.
///
/// Used when all rates are supplied as overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRateTable;

impl RateTable for EmptyRateTable {
    fn get_value_at(&self, metric: &str, month: &InvoiceMonth) -> Result<String> {
        Err(InvoiceError::MissingRate {
            metric: metric.to_string(),
            month: month.to_string(),
        })
    }
}

/// Explicit values that win over the rate table
#[derive(Debug, Clone, Default)]
pub struct RateOverrides {
    pub new_pi_credit_amount: Option<Decimal>,
    pub limit_new_pi_credit_to_partners: Option<bool>,
    pub bu_subsidy_amount: Option<Decimal>,
    pub lenovo_charges: Option<BTreeMap<String, Decimal>>,
}

/// Rate values resolved once for the invoice month
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyRates {
    pub new_pi_credit_amount: Decimal,
    pub limit_new_pi_credit_to_partners: bool,
    pub bu_subsidy_amount: Decimal,
    /// Charge per SU keyed by SU kind (`GPUH100`, ...)
    pub lenovo_charges: BTreeMap<String, Decimal>,
}

impl MonthlyRates {
    pub fn resolve(
        table: &dyn RateTable,
        overrides: &RateOverrides,
        month: &InvoiceMonth,
    ) -> Result<Self> {
        let new_pi_credit_amount = match overrides.new_pi_credit_amount {
            Some(v) => v,
            None => table.get_decimal_at(NEW_PI_CREDIT, month)?,
        };
        // `Some(false)` defers to the table
        let limit_new_pi_credit_to_partners = match overrides.limit_new_pi_credit_to_partners {
            Some(true) => true,
            _ => table.get_bool_at(LIMIT_NEW_PI_CREDIT_TO_PARTNERS, month)?,
        };
        let bu_subsidy_amount = match overrides.bu_subsidy_amount {
            Some(v) => v,
            None => table.get_decimal_at(BU_SUBSIDY, month)?,
        };
        let lenovo_charges = match &overrides.lenovo_charges {
            Some(map) => map.clone(),
            None => LENOVO_SU_KINDS
                .iter()
                .map(|kind| {
                    table
                        .get_decimal_at(&lenovo_charge_metric(kind), month)
                        .map(|v| (kind.to_string(), v))
                })
                .collect::<Result<_>>()?,
        };
        Ok(MonthlyRates {
            new_pi_credit_amount,
            limit_new_pi_credit_to_partners,
            bu_subsidy_amount,
            lenovo_charges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATES: &str = r#"
- name: New PI Credit
  history:
    - value: 1000
      from: "2023-01"
      until: "2024-12"
    - value: 500
      from: "2025-01"
- name: Limit New PI Credit to MGHPCC Partners
  history:
    - value: false
      from: "2023-01"
- name: BU Subsidy
  history:
    - value: "100.50"
      from: "2023-01"
- name: Lenovo GPUA100SXM4 Charge
  history:
    - value: 1.803
      from: "2023-01"
- name: Lenovo GPUH100 Charge
  history:
    - value: 6.04
      from: "2023-01"
"#;

    fn month(s: &str) -> InvoiceMonth {
        InvoiceMonth::parse(s).unwrap()
    }

    #[test]
    fn test_value_follows_history() {
        let table = YamlRateTable::parse(RATES).unwrap();
        assert_eq!(
            table.get_decimal_at(NEW_PI_CREDIT, &month("2024-06")).unwrap(),
            Decimal::new(1000, 0)
        );
        assert_eq!(
            table.get_decimal_at(NEW_PI_CREDIT, &month("2025-03")).unwrap(),
            Decimal::new(500, 0)
        );
        assert!(matches!(
            table.get_value_at(NEW_PI_CREDIT, &month("2022-12")),
            Err(InvoiceError::MissingRate { .. })
        ));
    }

    #[test]
    fn test_resolve_monthly_rates() {
        let table = YamlRateTable::parse(RATES).unwrap();
        let rates =
            MonthlyRates::resolve(&table, &RateOverrides::default(), &month("2024-06")).unwrap();
        assert_eq!(rates.bu_subsidy_amount, Decimal::new(10050, 2));
        assert!(!rates.limit_new_pi_credit_to_partners);
        assert_eq!(rates.lenovo_charges["GPUA100SXM4"], Decimal::new(1803, 3));
        assert_eq!(rates.lenovo_charges["GPUH100"], Decimal::new(604, 2));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = RateOverrides {
            new_pi_credit_amount: Some(Decimal::new(42, 0)),
            limit_new_pi_credit_to_partners: Some(true),
            bu_subsidy_amount: Some(Decimal::ZERO),
            lenovo_charges: Some(BTreeMap::new()),
        };
        let rates = MonthlyRates::resolve(&EmptyRateTable, &overrides, &month("2024-06")).unwrap();
        assert_eq!(rates.new_pi_credit_amount, Decimal::new(42, 0));
        assert!(rates.limit_new_pi_credit_to_partners);
    }

    #[test]
    fn test_missing_rate_fails_without_override() {
        let err =
            MonthlyRates::resolve(&EmptyRateTable, &RateOverrides::default(), &month("2024-06"))
                .unwrap_err();
        assert!(matches!(err, InvoiceError::MissingRate { .. }));
    }
}
