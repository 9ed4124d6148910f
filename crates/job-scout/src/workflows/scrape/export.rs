use chrono::{NaiveDate, Utc};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use super::domain::JobRecord;

pub const EXPORT_HEADER: [&str; 5] = ["Job Title", "Company", "Job Link", "Source", "Scraped At"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unable to create export directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to write export {}: {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },
    #[error("unable to flush export {}: {source}", path.display())]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A written export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub file_name: String,
    pub rows: usize,
}

/// Writes one dated CSV file per run under the output directory.
#[derive(Debug, Clone)]
pub struct ExportWriter {
    output_dir: PathBuf,
    prefix: String,
}

impl ExportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn write(&self, records: &[JobRecord]) -> Result<ExportArtifact, ExportError> {
        self.write_dated(records, Utc::now().date_naive())
    }

    /// Writes `<prefix>-YYYY-MM-DD.csv`, replacing a file from an earlier run
    /// on the same day. Empty input still produces the header row.
    pub fn write_dated(
        &self,
        records: &[JobRecord],
        date: NaiveDate,
    ) -> Result<ExportArtifact, ExportError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ExportError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let file_name = format!("{}-{}.csv", self.prefix, date.format("%Y-%m-%d"));
        let path = self.output_dir.join(&file_name);
        let write_err = |source: csv::Error| ExportError::Write {
            path: path.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(write_err)?;
        writer.write_record(EXPORT_HEADER).map_err(write_err)?;
        for record in records {
            writer
                .write_record([
                    record.title.as_str(),
                    record.company.as_str(),
                    record.link.as_str(),
                    record.source.as_str(),
                    record.captured_at_label().as_str(),
                ])
                .map_err(write_err)?;
        }
        writer.flush().map_err(|source| ExportError::Flush {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), rows = records.len(), "export written");
        Ok(ExportArtifact {
            path,
            file_name,
            rows: records.len(),
        })
    }
}
