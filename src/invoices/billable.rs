use crate::dataset::Dataset;
use crate::error::Result;
use crate::invoices::{BASE_COLUMNS, InvoiceOutput, InvoiceTable, InvoiceView, select_where};
use crate::models::{Column, UsageRecord};
use crate::stages::StageContext;

/// Base columns plus the adjustments applied by the credit, subsidy and prepay stages
pub fn columns() -> Vec<Column> {
    let mut cols = BASE_COLUMNS.to_vec();
    cols.extend([
        Column::Credit,
        Column::CreditCode,
        Column::Subsidy,
        Column::Balance,
    ]);
    cols
}

/// All billable usage. Rows without a PI stay here so billable and nonbillable
/// together cover the whole dataset.
pub struct BillableInvoice;

pub fn select(data: &Dataset) -> Result<Vec<&UsageRecord>> {
    select_where(data, UsageRecord::billable)
}

impl InvoiceView for BillableInvoice {
    fn name(&self) -> &'static str {
        "billable"
    }

    fn outputs(&self, data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>> {
        Ok(vec![InvoiceOutput::table(
            format!("billable {}.csv", ctx.month),
            InvoiceTable::from_records(&columns(), select(data)?),
        )])
    }
}
