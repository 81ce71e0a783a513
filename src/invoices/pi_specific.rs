use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::dataset::Dataset;
use crate::error::{InvoiceError, Result};
use crate::invoices::{BASE_COLUMNS, InvoiceOutput, InvoiceTable, InvoiceView, select_where};
use crate::models::record::money;
use crate::models::{Column, UsageRecord};
use crate::stages::StageContext;

pub const OUTPUT_DIR: &str = "pi_invoices";

pub fn columns() -> Vec<Column> {
    let mut cols = BASE_COLUMNS.to_vec();
    cols.extend([
        Column::Credit,
        Column::CreditCode,
        Column::Subsidy,
        Column::PiBalance,
    ]);
    cols
}

/// One document per PI with everything that PI is billed for
pub struct PiSpecificInvoice;

pub fn select(data: &Dataset) -> Result<Vec<&UsageRecord>> {
    select_where(data, UsageRecord::invoiceable)
}

/// Invoiceable rows grouped by PI, in PI order
pub fn by_pi<'a>(records: &[&'a UsageRecord]) -> BTreeMap<&'a str, Vec<&'a UsageRecord>> {
    let mut groups: BTreeMap<&str, Vec<&UsageRecord>> = BTreeMap::new();
    for r in records {
        if let Some(pi) = r.pi() {
            groups.entry(pi).or_default().push(*r);
        }
    }
    groups
}

fn file_component(s: &str) -> String {
    s.trim().replace(['/', '\\'], "_").replace(' ', "_")
}

pub fn document_path(institution: &str, pi: &str, ctx: &StageContext<'_>) -> PathBuf {
    PathBuf::from(OUTPUT_DIR).join(format!(
        "{}_{} {}.csv",
        file_component(institution),
        file_component(pi),
        ctx.month
    ))
}

fn with_total(records: &[&UsageRecord]) -> InvoiceTable {
    let cols = columns();
    let mut table = InvoiceTable::from_records(&cols, records.iter().copied());

    let sum = |f: fn(&UsageRecord) -> Decimal| records.iter().map(|r| f(r)).sum::<Decimal>();
    let mut total = vec![String::new(); cols.len()];
    total[0] = "Total".to_string();
    for (i, col) in cols.iter().enumerate() {
        total[i] = match col {
            Column::Cost => money(sum(|r| r.cost)),
            Column::Credit => money(sum(UsageRecord::credit_or_zero)),
            Column::Subsidy => money(sum(UsageRecord::subsidy_or_zero)),
            Column::PiBalance => money(sum(|r| r.pi_balance.unwrap_or(r.cost))),
            _ => continue,
        };
    }
    table.push_row(total);
    table
}

impl InvoiceView for PiSpecificInvoice {
    fn name(&self) -> &'static str {
        "pi-specific"
    }

    fn outputs(&self, data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>> {
        let selected = select(data)?;
        let mut owners: BTreeMap<PathBuf, &str> = BTreeMap::new();
        let mut outputs = Vec::new();
        for (pi, records) in by_pi(&selected) {
            let institution = records
                .iter()
                .find_map(|r| r.institution.as_deref())
                .unwrap_or("Unknown");
            let path = document_path(institution, pi, ctx);
            // distinct PIs can sanitize to the same file name
            if let Some(first) = owners.insert(path.clone(), pi) {
                return Err(InvoiceError::OutputCollision {
                    path: path.display().to_string(),
                    first: first.to_string(),
                    second: pi.to_string(),
                });
            }
            outputs.push(InvoiceOutput::document(path, with_total(&records)));
        }
        Ok(outputs)
    }
}
