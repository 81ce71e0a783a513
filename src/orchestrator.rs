//! # Orchestrator Module
//!
//! One invoice run: preliminary stages, then every view, then the updated
//! ledgers. Everything is computed before the first file is written, so a
//! failing run leaves no partial output behind.

use crate::dataset::Dataset;
use crate::directory::AllocationDirectory;
use crate::error::Result;
use crate::invoices::{self, InvoiceOutput, InvoiceTable, OutputKind};
use crate::models::pi_history::PI_HISTORY_HEADERS;
use crate::models::prepay::DEBIT_HEADERS;
use crate::models::record::money;
use crate::models::{PiHistoryRecord, PrepayDebit};
use crate::rules::timed_rules;
use crate::sink::{DocumentRenderer, OutputSink};
use crate::stages::new_pi_credit::updated_pi_history;
use crate::stages::prepayment::updated_debits;
use crate::stages::{StageContext, run_preliminary};

pub const PI_HISTORY_OUTPUT: &str = "PIs/PI.csv";
pub const PREPAY_DEBITS_OUTPUT: &str = "Prepay/prepay_debits.csv";

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub tables: usize,
    pub documents: usize,
}

/// Everything a run produces, held in memory until written
#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub dataset: Dataset,
    pub outputs: Vec<InvoiceOutput>,
}

pub fn pi_history_table(history: &[PiHistoryRecord]) -> InvoiceTable {
    let mut table = InvoiceTable::new(PI_HISTORY_HEADERS);
    for h in history {
        table.push_row(vec![
            h.pi.clone(),
            h.first_month.to_string(),
            money(h.initial_credits),
            money(h.first_month_used),
            money(h.second_month_used),
        ]);
    }
    table
}

pub fn debits_table(debits: &[PrepayDebit]) -> InvoiceTable {
    let mut table = InvoiceTable::new(DEBIT_HEADERS);
    for d in debits {
        table.push_row(vec![d.month.to_string(), d.group.clone(), money(d.debit)]);
    }
    table
}

pub struct Orchestrator<'a> {
    ctx: StageContext<'a>,
    directory: &'a dyn AllocationDirectory,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: StageContext<'a>, directory: &'a dyn AllocationDirectory) -> Self {
        Orchestrator { ctx, directory }
    }

    /// Run stages and views without writing anything
    pub fn prepare(&self, data: Dataset) -> Result<RunOutputs> {
        for rule in timed_rules(&self.ctx.config.nonbillable_rules) {
            tracing::info!(
                project = %rule.project,
                cluster = rule.cluster.as_deref().unwrap_or("*"),
                month = %self.ctx.month,
                "time-limited nonbillable rule in effect"
            );
        }

        let dataset = run_preliminary(data, &self.ctx, self.directory)?;
        let mut outputs = invoices::build_all(&dataset, &self.ctx)?;

        let history = updated_pi_history(
            &self.ctx.config.pi_history,
            &dataset,
            self.ctx.month,
            self.ctx.config.rates.new_pi_credit_amount,
        )?;
        outputs.push(InvoiceOutput::table(
            PI_HISTORY_OUTPUT,
            pi_history_table(&history),
        ));

        let debits = updated_debits(&self.ctx.config.prepay, &dataset, self.ctx.month);
        outputs.push(InvoiceOutput::table(
            PREPAY_DEBITS_OUTPUT,
            debits_table(&debits),
        ));

        Ok(RunOutputs { dataset, outputs })
    }

    /// Full run: prepare, then hand every output to the sink or renderer.
    ///
    /// A failed write aborts the sink, so earlier outputs of the run are discarded.
    pub fn run(
        &self,
        data: Dataset,
        sink: &dyn OutputSink,
        renderer: &dyn DocumentRenderer,
    ) -> Result<RunSummary> {
        let prepared = self.prepare(data)?;
        let mut summary = RunSummary {
            rows: prepared.dataset.len(),
            ..Default::default()
        };

        sink.begin()?;
        if let Err(e) = write_outputs(&prepared.outputs, sink, renderer, &mut summary) {
            sink.abort();
            return Err(e);
        }
        sink.commit()?;

        tracing::info!(
            rows = summary.rows,
            tables = summary.tables,
            documents = summary.documents,
            "invoice run complete"
        );
        Ok(summary)
    }
}

fn write_outputs(
    outputs: &[InvoiceOutput],
    sink: &dyn OutputSink,
    renderer: &dyn DocumentRenderer,
    summary: &mut RunSummary,
) -> Result<()> {
    for output in outputs {
        match output.kind {
            OutputKind::Table => {
                sink.write_table(&output.path, &output.table)?;
                summary.tables += 1;
            }
            OutputKind::Document => {
                renderer.render(&output.path, &output.table)?;
                summary.documents += 1;
            }
        }
    }
    Ok(())
}
