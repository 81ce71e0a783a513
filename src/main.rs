use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use nerc_invoicing::cli::Args;
use nerc_invoicing::dataset::Dataset;
use nerc_invoicing::loader::load_config;
use nerc_invoicing::orchestrator::Orchestrator;
use nerc_invoicing::settings::Settings;
use nerc_invoicing::sink::{CsvDocumentRenderer, LocalDirSink};
use nerc_invoicing::stages::StageContext;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::from_args(args, chrono::Local::now().date_naive())
        .context("resolve settings")?;
    tracing::info!(month = %settings.invoice_month, "starting invoice run");

    let config = load_config(&settings).context("load configuration files")?;

    let files = settings
        .invoice_files()
        .with_context(|| format!("list usage exports in {}", settings.invoice_dir.display()))?;
    if files.is_empty() {
        tracing::warn!(dir = %settings.invoice_dir.display(), "no usage exports found");
    }
    let data = Dataset::merge_files(&files).context("read usage exports")?;
    tracing::info!(files = files.len(), rows = data.len(), "usage exports merged");

    let directory = settings.directory.open();
    let sink = LocalDirSink::new(&settings.output_dir);
    let renderer = CsvDocumentRenderer::new(&sink);
    let ctx = StageContext::new(&settings.invoice_month, &config);

    let summary = Orchestrator::new(ctx, directory.as_ref())
        .run(data, &sink, &renderer)
        .context("invoice run failed")?;

    println!(
        "Wrote {} tables and {} PI documents for {} rows to {}",
        summary.tables,
        summary.documents,
        summary.rows,
        sink.root().display()
    );
    Ok(())
}
