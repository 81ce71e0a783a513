//! # Dataset Module
//!
//! The shared table threaded through the pipeline. It is built once per run by
//! concatenating the raw usage exports. Stages receive it by value and hand the
//! next state on.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::error::{InvoiceError, Result};
use crate::models::UsageRecord;

/// Raw export row. Every value is read as text so costs never pass through a float.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawUsageRow {
    #[serde(rename = "Invoice Month")]
    invoice_month: String,
    #[serde(rename = "Project - Allocation")]
    project_name: String,
    #[serde(rename = "Project - Allocation ID")]
    project_id: String,
    #[serde(rename = "Manager (PI)")]
    pi_name: Option<String>,
    #[serde(rename = "Invoice Email")]
    invoice_email: Option<String>,
    #[serde(rename = "Invoice Address")]
    invoice_address: Option<String>,
    #[serde(rename = "Institution")]
    institution: Option<String>,
    #[serde(rename = "Institution - Specific Code")]
    institution_code: Option<String>,
    #[serde(rename = "SU Hours (GBhr or SUhr)")]
    su_hours: Option<String>,
    #[serde(rename = "SU Type")]
    su_type: Option<String>,
    #[serde(rename = "Rate")]
    rate: Option<String>,
    #[serde(rename = "Cost")]
    cost: Option<String>,
    #[serde(rename = "Cluster Name")]
    cluster_name: String,
}

/// Parse a cost as an exact decimal with at most two fractional digits
pub fn parse_cost(raw: &str) -> Result<Decimal> {
    let t = raw.trim();
    if t.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let d = Decimal::from_str(t).map_err(|e| InvoiceError::InvalidCost {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    let normalized = d.normalize();
    if normalized.scale() > 2 {
        return Err(InvoiceError::InvalidCost {
            value: raw.to_string(),
            reason: "more than two decimal places".to_string(),
        });
    }
    Ok(normalized.round_dp(2))
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

impl RawUsageRow {
    fn into_record(self) -> Result<UsageRecord> {
        let su_hours = match non_blank(self.su_hours) {
            Some(h) => Some(
                Decimal::from_str(h.trim()).map_err(|e| InvoiceError::InvalidCost {
                    value: h.clone(),
                    reason: format!("SU hours: {e}"),
                })?,
            ),
            None => None,
        };
        Ok(UsageRecord {
            invoice_month: self.invoice_month,
            project_name: self.project_name,
            project_id: self.project_id,
            pi_name: non_blank(self.pi_name),
            invoice_email: non_blank(self.invoice_email),
            invoice_address: non_blank(self.invoice_address),
            institution: non_blank(self.institution),
            institution_code: non_blank(self.institution_code),
            su_hours,
            su_type: non_blank(self.su_type),
            rate: self.rate.unwrap_or_default(),
            cost: parse_cost(self.cost.as_deref().unwrap_or_default())?,
            cluster_name: self.cluster_name,
            ..Default::default()
        })
    }
}

/// The in-memory usage ledger
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    records: Vec<UsageRecord>,
}

impl Dataset {
    pub fn new(records: Vec<UsageRecord>) -> Self {
        Dataset { records }
    }

    /// Read one export table
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
        let records = rdr
            .deserialize::<RawUsageRow>()
            .map(|row| row.map_err(InvoiceError::from).and_then(RawUsageRow::into_record))
            .collect::<Result<Vec<_>>>()?;
        Ok(Dataset { records })
    }

    /// Merge export tables by concatenation, in the given order
    pub fn merge_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut merged = Dataset::default();
        for path in paths {
            let file = std::fs::File::open(path.as_ref())?;
            let table = Dataset::from_reader(file)?;
            tracing::debug!(
                file = %path.as_ref().display(),
                rows = table.len(),
                "loaded usage export"
            );
            merged.records.extend(table.records);
        }
        Ok(merged)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UsageRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, UsageRecord> {
        self.records.iter_mut()
    }

    pub fn into_records(self) -> Vec<UsageRecord> {
        self.records
    }

    pub fn total_cost(&self) -> Decimal {
        self.records.iter().map(|r| r.cost).sum()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a UsageRecord;
    type IntoIter = std::slice::Iter<'a, UsageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
