//! Orchestration core: read creators, fan out per-creator pipelines under a
//! worker cap, and fold the results into a deduplicated report.

pub mod aggregate;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod source;

pub use aggregate::{aggregate, Aggregation, Report};
pub use error::{PersistenceError, PipelineError, SourceError};
pub use orchestrator::{
    CreatorOutcome, Orchestrator, OrchestratorOptions, RunOutcome, Stage, TaskFailure,
};
pub use report::{persist_report, CsvReportSink, PersistStatus, ReportSink};
pub use source::read_creators;
