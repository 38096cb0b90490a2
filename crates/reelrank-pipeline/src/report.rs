//! Report persistence.

use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;

use reelrank_core::{VideoDetail, UNAVAILABLE};

use crate::aggregate::Report;
use crate::error::PersistenceError;

/// Destination for a finished report.
pub trait ReportSink {
    /// Write every entry of `report`, returning where it landed.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the destination cannot be written.
    fn write(&self, report: &Report) -> Result<PathBuf, PersistenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    Written(PathBuf),
    NothingToPersist,
}

/// Persist `report` through `sink`, skipping the write when it is empty.
///
/// A failed write leaves `report` untouched so it can be persisted again.
///
/// # Errors
///
/// Propagates the sink's [`PersistenceError`].
pub fn persist_report(
    report: &Report,
    sink: &dyn ReportSink,
) -> Result<PersistStatus, PersistenceError> {
    if report.is_empty() {
        tracing::info!("report is empty; nothing to persist");
        return Ok(PersistStatus::NothingToPersist);
    }

    match sink.write(report) {
        Ok(path) => {
            tracing::info!(path = %path.display(), rows = report.len(), "report written");
            Ok(PersistStatus::Written(path))
        }
        Err(e) => {
            tracing::error!(error = %e, rows = report.len(), "report write failed");
            Err(e)
        }
    }
}

/// Writes `stats-YYYYMMDD_HHMMSS.csv` files into `output_dir`.
#[derive(Debug, Clone)]
pub struct CsvReportSink {
    output_dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn file_name() -> String {
        format!("stats-{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
    }
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    link: &'a str,
    title: &'a str,
    author_name: &'a str,
    like_count: &'a str,
    comment_count: &'a str,
    share_count: &'a str,
    publish_date: Option<&'a str>,
    creator: &'a str,
}

impl<'a> From<&'a VideoDetail> for ReportRow<'a> {
    fn from(detail: &'a VideoDetail) -> Self {
        let m = &detail.metrics;
        Self {
            link: &m.link,
            title: m.title.as_deref().unwrap_or(UNAVAILABLE),
            author_name: m.author_name.as_deref().unwrap_or(UNAVAILABLE),
            like_count: m.like_count.as_deref().unwrap_or(UNAVAILABLE),
            comment_count: m.comment_count.as_deref().unwrap_or(UNAVAILABLE),
            share_count: m.share_count.as_deref().unwrap_or(UNAVAILABLE),
            publish_date: m.publish_date.as_deref(),
            creator: detail.creator.as_str(),
        }
    }
}

impl ReportSink for CsvReportSink {
    fn write(&self, report: &Report) -> Result<PathBuf, PersistenceError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| {
            PersistenceError::CreateDir {
                path: self.output_dir.clone(),
                source,
            }
        })?;

        let path = self.output_dir.join(Self::file_name());
        let write_err = |source: csv::Error| PersistenceError::Write {
            path: path.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(write_err)?;
        for detail in report {
            writer
                .serialize(ReportRow::from(detail))
                .map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|e| write_err(csv::Error::from(e)))?;

        Ok(path)
    }
}
