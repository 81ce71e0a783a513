//! # Invoices Module
//!
//! The nine output views. Each one is a read-only projection of the final
//! dataset into one or more tables; a selection with no rows still yields a
//! table with its headers.

pub mod billable;
pub mod bu_internal;
pub mod lenovo;
pub mod moca_prepaid;
pub mod nerc_total;
pub mod nonbillable;
pub mod pi_specific;
pub mod prepay_credits;

use std::path::PathBuf;

use crate::dataset::Dataset;
use crate::error::{InvoiceError, Result};
use crate::models::{Column, UsageRecord};
use crate::stages::StageContext;

/// Columns every row-level invoice starts with
pub const BASE_COLUMNS: [Column; 12] = [
    Column::InvoiceMonth,
    Column::ProjectName,
    Column::ProjectId,
    Column::Pi,
    Column::InvoiceEmail,
    Column::InvoiceAddress,
    Column::Institution,
    Column::InstitutionCode,
    Column::SuHours,
    Column::SuType,
    Column::Rate,
    Column::Cost,
];

/// Headers plus string cells, ready for any tabular sink
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl InvoiceTable {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        InvoiceTable {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// One row per record, projected onto `columns`
    pub fn from_records<'a>(
        columns: &[Column],
        records: impl IntoIterator<Item = &'a UsageRecord>,
    ) -> Self {
        let mut table = InvoiceTable::new(columns.iter().map(|c| c.header()));
        table.rows = records
            .into_iter()
            .map(|r| columns.iter().map(|c| r.cell(*c)).collect())
            .collect();
        table
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, by header
    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let idx = self.headers.iter().position(|h| h == header)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).map(String::as_str).unwrap_or_default())
                .collect(),
        )
    }

    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| InvoiceError::Configuration(format!("non UTF-8 table output: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Written directly by the output sink
    Table,
    /// Handed to the document renderer
    Document,
}

/// One file a view produces, at a path relative to the output root
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceOutput {
    pub path: PathBuf,
    pub kind: OutputKind,
    pub table: InvoiceTable,
}

impl InvoiceOutput {
    pub fn table(path: impl Into<PathBuf>, table: InvoiceTable) -> Self {
        InvoiceOutput {
            path: path.into(),
            kind: OutputKind::Table,
            table,
        }
    }

    pub fn document(path: impl Into<PathBuf>, table: InvoiceTable) -> Self {
        InvoiceOutput {
            path: path.into(),
            kind: OutputKind::Document,
            table,
        }
    }
}

pub trait InvoiceView {
    fn name(&self) -> &'static str;

    fn outputs(&self, data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>>;
}

pub fn all_views() -> Vec<Box<dyn InvoiceView>> {
    vec![
        Box::new(lenovo::LenovoInvoice),
        Box::new(nonbillable::NonbillableInvoice),
        Box::new(billable::BillableInvoice),
        Box::new(nerc_total::NercTotalInvoice),
        Box::new(bu_internal::BuInternalInvoice),
        Box::new(pi_specific::PiSpecificInvoice),
        Box::new(moca_prepaid::MocaPrepaidInvoice),
        Box::new(prepay_credits::PrepayCreditsSnapshot),
        Box::new(ocp_test::OcpTestInvoice),
    ]
}

/// Compute every view's outputs; nothing is written here
pub fn build_all(data: &Dataset, ctx: &StageContext<'_>) -> Result<Vec<InvoiceOutput>> {
    let mut outputs = Vec::new();
    for view in all_views() {
        let produced = view.outputs(data, ctx)?;
        tracing::info!(
            view = view.name(),
            files = produced.len(),
            rows = produced.iter().map(|o| o.table.len()).sum::<usize>(),
            "invoice built"
        );
        outputs.extend(produced);
    }
    Ok(outputs)
}

/// Keep the records for which `pred` holds, propagating column errors
pub(crate) fn select_where<'a, F>(data: &'a Dataset, mut pred: F) -> Result<Vec<&'a UsageRecord>>
where
    F: FnMut(&UsageRecord) -> Result<bool>,
{
    let mut selected = Vec::new();
    for record in data {
        if pred(record)? {
            selected.push(record);
        }
    }
    Ok(selected)
}
