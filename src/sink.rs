//! Where finished tables go.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::invoices::InvoiceTable;

/// Destination for tabular outputs, addressed by relative path.
///
/// A run calls `begin`, writes every output, then `commit`s. On a failed write
/// it calls `abort` instead, and nothing written so far becomes visible.
pub trait OutputSink {
    fn write_table(&self, relative_path: &Path, table: &InvoiceTable) -> Result<()>;

    fn begin(&self) -> Result<()> {
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        Ok(())
    }

    fn abort(&self) {}
}

/// Formats a per-PI table as a document
pub trait DocumentRenderer {
    fn render(&self, relative_path: &Path, table: &InvoiceTable) -> Result<()>;
}

/// Writes CSV files under a root directory, creating parents as needed.
///
/// Files are staged in a hidden sibling directory and moved under the root
/// on commit.
#[derive(Debug, Clone)]
pub struct LocalDirSink {
    root: PathBuf,
}

impl LocalDirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalDirSink { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self) -> PathBuf {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.root.with_file_name(format!(".{name}.staging"))
    }

    fn staged_files(staging: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(staging).min_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

impl OutputSink for LocalDirSink {
    fn write_table(&self, relative_path: &Path, table: &InvoiceTable) -> Result<()> {
        let path = self.staging_dir().join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(&path)?;
        table.write_csv(file)?;
        tracing::debug!(path = %path.display(), rows = table.len(), "staged table");
        Ok(())
    }

    /// Clears leftovers of an interrupted run
    fn begin(&self) -> Result<()> {
        let staging = self.staging_dir();
        if staging.exists() {
            tracing::warn!(path = %staging.display(), "removing stale staging directory");
            fs::remove_dir_all(&staging)?;
        }
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let staging = self.staging_dir();
        if !staging.exists() {
            return Ok(());
        }
        if !self.root.exists() {
            if let Some(parent) = self.root.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(&staging, &self.root)?;
            return Ok(());
        }

        // root already holds earlier runs; move files over one by one
        for staged in Self::staged_files(&staging)? {
            let Ok(relative) = staged.strip_prefix(&staging) else {
                continue;
            };
            let target = self.root.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(&staged, &target)?;
        }
        fs::remove_dir_all(&staging)?;
        Ok(())
    }

    fn abort(&self) {
        let staging = self.staging_dir();
        if let Err(e) = fs::remove_dir_all(&staging)
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %staging.display(), error = %e, "could not remove staging directory");
        }
    }
}

/// Renders documents as plain CSV through a sink
pub struct CsvDocumentRenderer<'a> {
    sink: &'a dyn OutputSink,
}

impl<'a> CsvDocumentRenderer<'a> {
    pub fn new(sink: &'a dyn OutputSink) -> Self {
        CsvDocumentRenderer { sink }
    }
}

impl DocumentRenderer for CsvDocumentRenderer<'_> {
    fn render(&self, relative_path: &Path, table: &InvoiceTable) -> Result<()> {
        self.sink.write_table(relative_path, table)
    }
}
