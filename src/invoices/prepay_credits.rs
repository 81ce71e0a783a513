use rust_decimal::Decimal;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::invoices::{InvoiceOutput, InvoiceTable, InvoiceView};
use crate::models::record::money;
use crate::stages::StageContext;
use crate::stages::prepayment::{group_usage, starting_balances};

pub const HEADERS: [&str; 8] = [
    "Month",
    "Group Name",
    "Group Contact Email",
    "MGHPCC Managed",
    "Credits This Month",
    "Credits To Date",
    "Debit This Month",
    "Balance",
];

/// Per-group balance statement for the month
pub struct PrepayCreditsSnapshot;

impl InvoiceView for PrepayCreditsSnapshot {
    fn name(&self) -> &'static str {
        "prepay-credits"
    }

    fn outputs(&self, data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>> {
        let book = &ctx.config.prepay;
        let starting = starting_balances(book, ctx.month)?;
        let usage = group_usage(data);

        let mut table = InvoiceTable::new(HEADERS);
        for contact in &book.contacts {
            let group = contact.group.as_str();
            let debit = usage.get(group).copied().unwrap_or(Decimal::ZERO);
            let start = starting.get(group).copied().unwrap_or(Decimal::ZERO);
            table.push_row(vec![
                ctx.month.to_string(),
                group.to_string(),
                contact.email.clone(),
                (if contact.managed { "True" } else { "False" }).to_string(),
                money(book.credits_for(group, ctx.month)),
                money(book.credits_through(group, ctx.month)),
                money(debit),
                money(start - debit),
            ]);
        }

        Ok(vec![InvoiceOutput::table(
            format!("NERC_Prepaid_Group-Credits-{}.csv", ctx.month),
            table,
        )])
    }
}
