use crate::dataset::Dataset;
use crate::error::Result;
use crate::invoices::{InvoiceOutput, InvoiceTable, InvoiceView, select_where};
use crate::models::{Column, UsageRecord};
use crate::stages::StageContext;

pub const COLUMNS: [Column; 7] = [
    Column::InvoiceMonth,
    Column::ProjectName,
    Column::Institution,
    Column::SuHours,
    Column::SuType,
    Column::SuCharge,
    Column::LenovoCharge,
];

/// Usage of Lenovo-funded SU types, billable or not
pub struct LenovoInvoice;

pub fn select<'a>(data: &'a Dataset, ctx: &StageContext<'_>) -> Result<Vec<&'a UsageRecord>> {
    select_where(data, |r| {
        Ok(r.su_type
            .as_deref()
            .is_some_and(|t| ctx.config.is_lenovo_su_type(t)))
    })
}

impl InvoiceView for LenovoInvoice {
    fn name(&self) -> &'static str {
        "lenovo"
    }

    fn outputs(&self, data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>> {
        let table = InvoiceTable::from_records(&COLUMNS, select(data, ctx)?);
        Ok(vec![InvoiceOutput::table(
            format!("Lenovo {}.csv", ctx.month),
            table,
        )])
    }
}
