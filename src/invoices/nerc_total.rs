use crate::dataset::Dataset;
use crate::error::Result;
use crate::invoices::{InvoiceOutput, InvoiceTable, InvoiceView, billable, select_where};
use crate::models::UsageRecord;
use crate::stages::StageContext;

/// Invoiceable usage of MGHPCC partner institutions
pub struct NercTotalInvoice;

pub fn select<'a>(data: &'a Dataset, ctx: &StageContext<'_>) -> Result<Vec<&'a UsageRecord>> {
    select_where(data, |r| {
        Ok(r.invoiceable()?
            && r.institution
                .as_deref()
                .is_some_and(|i| ctx.config.institutes.is_partner(i, ctx.month)))
    })
}

impl InvoiceView for NercTotalInvoice {
    fn name(&self) -> &'static str {
        "nerc-total"
    }

    fn outputs(&self, data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>> {
        Ok(vec![InvoiceOutput::table(
            format!("NERC-{}-Total-Invoice.csv", ctx.month),
            InvoiceTable::from_records(&billable::columns(), select(data, ctx)?),
        )])
    }
}
