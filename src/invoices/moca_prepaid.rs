use crate::dataset::Dataset;
use crate::error::Result;
use crate::invoices::{BASE_COLUMNS, InvoiceOutput, InvoiceTable, InvoiceView, select_where};
use crate::models::{Column, UsageRecord};
use crate::stages::StageContext;

pub fn columns() -> Vec<Column> {
    let mut cols = BASE_COLUMNS.to_vec();
    cols.extend([
        Column::PrepayGroup,
        Column::GroupBalanceUsed,
        Column::GroupBalance,
        Column::Balance,
    ]);
    cols
}

/// Usage of prepay groups managed by the MGHPCC
pub struct MocaPrepaidInvoice;

pub fn select(data: &Dataset) -> Result<Vec<&UsageRecord>> {
    select_where(data, |r| {
        Ok(r.prepay_group.is_some() && r.group_managed == Some(true))
    })
}

impl InvoiceView for MocaPrepaidInvoice {
    fn name(&self) -> &'static str {
        "moca-prepaid"
    }

    fn outputs(&self, data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>> {
        Ok(vec![InvoiceOutput::table(
            format!("MOCA-A_Prepaid_Groups-{}-Invoice.csv", ctx.month),
            InvoiceTable::from_records(&columns(), select(data)?),
        )])
    }
}
