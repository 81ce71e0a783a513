use crate::dataset::Dataset;
use crate::error::Result;
use crate::invoices::{BASE_COLUMNS, InvoiceOutput, InvoiceTable, InvoiceView, select_where};
use crate::models::UsageRecord;
use crate::stages::StageContext;

/// Everything excluded from billing, for auditing the exclusions
pub struct NonbillableInvoice;

pub fn select(data: &Dataset) -> Result<Vec<&UsageRecord>> {
    select_where(data, |r| Ok(!r.billable()?))
}

impl InvoiceView for NonbillableInvoice {
    fn name(&self) -> &'static str {
        "nonbillable"
    }

    fn outputs(&self, data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>> {
        Ok(vec![InvoiceOutput::table(
            format!("nonbillable {}.csv", ctx.month),
            InvoiceTable::from_records(&BASE_COLUMNS, select(data)?),
        )])
    }
}
