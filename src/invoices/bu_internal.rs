use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::invoices::{InvoiceOutput, InvoiceTable, InvoiceView, select_where};
use crate::models::UsageRecord;
use crate::models::record::money;
use crate::stages::StageContext;

pub const HEADERS: [&str; 7] = [
    "Invoice Month",
    "Manager (PI)",
    "Project",
    "Cost",
    "Credit",
    "Subsidy",
    "Balance",
];

/// Subsidized-institution usage summarised per PI
pub struct BuInternalInvoice;

pub fn select<'a>(data: &'a Dataset, ctx: &StageContext<'_>) -> Result<Vec<&'a UsageRecord>> {
    select_where(data, |r| {
        Ok(r.invoiceable()?
            && r.institution.as_deref() == Some(ctx.config.subsidy_institution.as_str()))
    })
}

#[derive(Default)]
struct PiSummary<'a> {
    projects: Vec<&'a str>,
    cost: Decimal,
    credit: Decimal,
    subsidy: Decimal,
    balance: Decimal,
}

pub fn summarize(records: &[&UsageRecord], ctx: &StageContext<'_>) -> InvoiceTable {
    let mut by_pi: BTreeMap<&str, PiSummary<'_>> = BTreeMap::new();
    for r in records {
        let Some(pi) = r.pi() else { continue };
        let s = by_pi.entry(pi).or_default();
        if !s.projects.contains(&r.project_name.as_str()) {
            s.projects.push(&r.project_name);
        }
        s.cost += r.cost;
        s.credit += r.credit_or_zero();
        s.subsidy += r.subsidy_or_zero();
        s.balance += r.pi_balance.unwrap_or(r.cost);
    }

    let mut table = InvoiceTable::new(HEADERS);
    for (pi, s) in by_pi {
        table.push_row(vec![
            ctx.month.to_string(),
            pi.to_string(),
            s.projects.join(", "),
            money(s.cost),
            money(s.credit),
            money(s.subsidy),
            money(s.balance),
        ]);
    }
    table
}

impl InvoiceView for BuInternalInvoice {
    fn name(&self) -> &'static str {
        "bu-internal"
    }

    fn outputs(&self, data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>> {
        let selected = select(data, ctx)?;
        Ok(vec![InvoiceOutput::table(
            format!("BU_Internal {}.csv", ctx.month),
            summarize(&selected, ctx),
        )])
    }
}
