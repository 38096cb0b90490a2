//! Bounded fan-out of per-creator pipelines.
//!
//! Each creator runs `acquire → listing → rank → detail → close` on its own
//! tokio task, with at most `max_workers` tasks alive at once. Outcomes are
//! drained in completion order by the caller's task, which owns the
//! completed counter and the result collection, so workers never share
//! mutable state.
//!
//! Per-creator failures never escape: every creator yields exactly one
//! [`CreatorOutcome`], successful or not.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use thiserror::Error;
use tokio::time::Instant;

use reelrank_core::{rank_most_liked, CreatorRef, RankError, VideoDetail};
use reelrank_scraper::{Fetcher, FetcherFactory, ScraperError};

use crate::error::PipelineError;

pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    Listing,
    Ranking,
    Detail,
    Schedule,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Acquire => write!(f, "acquire"),
            Stage::Listing => write!(f, "listing"),
            Stage::Ranking => write!(f, "ranking"),
            Stage::Detail => write!(f, "detail"),
            Stage::Schedule => write!(f, "schedule"),
        }
    }
}

/// Why a creator produced no report entry.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("{stage} fetch failed: {source}")]
    Fetch {
        stage: Stage,
        #[source]
        source: ScraperError,
    },

    #[error("creator listing is empty")]
    EmptyListing,

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error("{stage} stage still running after {}s", limit.as_secs_f64())]
    TimedOut { stage: Stage, limit: Duration },

    #[error("task panicked during {stage}")]
    Panicked { stage: Stage },

    #[error("run deadline passed before the task started")]
    DeadlineExpired,
}

impl TaskFailure {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            TaskFailure::Fetch { stage, .. }
            | TaskFailure::TimedOut { stage, .. }
            | TaskFailure::Panicked { stage } => *stage,
            TaskFailure::EmptyListing | TaskFailure::Rank(_) => Stage::Ranking,
            TaskFailure::DeadlineExpired => Stage::Schedule,
        }
    }
}

/// Result of one creator's pipeline.
#[derive(Debug)]
pub struct CreatorOutcome {
    /// Position of the creator in the input list.
    pub index: usize,
    pub creator: CreatorRef,
    pub result: Result<VideoDetail, TaskFailure>,
}

impl CreatorOutcome {
    #[must_use]
    pub fn detail(&self) -> Option<&VideoDetail> {
        self.result.as_ref().ok()
    }

    #[must_use]
    pub fn into_detail(self) -> Option<VideoDetail> {
        self.result.ok()
    }
}

/// Everything a run produced, in completion order.
#[derive(Debug)]
pub struct RunOutcome {
    pub outcomes: Vec<CreatorOutcome>,
    pub elapsed: Duration,
}

impl RunOutcome {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Per-creator results for the aggregator, `None` for failures.
    pub fn into_results(self) -> impl Iterator<Item = Option<VideoDetail>> {
        self.outcomes.into_iter().map(CreatorOutcome::into_detail)
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub max_workers: usize,
    /// Bound on each creator's pipeline, fetcher acquisition included.
    pub task_timeout: Option<Duration>,
    /// Bound on the whole run. Creators not started when it passes are
    /// recorded as [`TaskFailure::DeadlineExpired`] without acquiring a
    /// fetcher; creators already running finish normally.
    pub run_deadline: Option<Duration>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            task_timeout: None,
            run_deadline: None,
        }
    }
}

impl OrchestratorOptions {
    #[must_use]
    pub fn from_app_config(config: &reelrank_core::AppConfig) -> Self {
        Self {
            max_workers: config.max_workers,
            task_timeout: config.task_timeout(),
            run_deadline: config.run_deadline(),
        }
    }
}

pub struct Orchestrator<F> {
    factory: Arc<F>,
    options: OrchestratorOptions,
}

impl<F: FetcherFactory> Orchestrator<F> {
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] when `max_workers` is zero or
    /// a timeout is zero.
    pub fn new(factory: F, options: OrchestratorOptions) -> Result<Self, PipelineError> {
        if options.max_workers == 0 {
            return Err(PipelineError::Configuration(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if options.task_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PipelineError::Configuration(
                "task_timeout must be positive when set".to_string(),
            ));
        }
        if options.run_deadline.is_some_and(|t| t.is_zero()) {
            return Err(PipelineError::Configuration(
                "run_deadline must be positive when set".to_string(),
            ));
        }

        Ok(Self {
            factory: Arc::new(factory),
            options,
        })
    }

    /// Process every creator, calling `progress(completed, total)` once per
    /// finished creator in completion order.
    ///
    /// `progress` runs on the calling task, never on a worker. Duplicates in
    /// `creators` are processed independently.
    pub async fn run(
        &self,
        creators: Vec<CreatorRef>,
        mut progress: Option<&mut (dyn FnMut(usize, usize) + Send)>,
    ) -> RunOutcome {
        let total = creators.len();
        let started = Instant::now();
        let deadline = self.options.run_deadline.map(|d| started + d);
        let task_timeout = self.options.task_timeout;

        tracing::info!(
            total,
            max_workers = self.options.max_workers,
            "starting creator run"
        );

        let mut pending = stream::iter(creators.into_iter().enumerate())
            .map(|(index, creator)| {
                let factory = Arc::clone(&self.factory);
                async move {
                    // Spawned lazily: the stream only polls `max_workers` of
                    // these at once, so only that many tasks exist.
                    let handle = tokio::spawn(process_creator(
                        factory,
                        index,
                        creator.clone(),
                        task_timeout,
                        deadline,
                    ));
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::error!(creator = %creator, error = %e, "creator task aborted");
                            // Panics inside fetcher calls are caught in the
                            // task, so this is outside any stage.
                            Err(TaskFailure::Panicked {
                                stage: Stage::Schedule,
                            })
                        }
                    };
                    CreatorOutcome {
                        index,
                        creator,
                        result,
                    }
                }
            })
            .buffer_unordered(self.options.max_workers);

        let mut outcomes = Vec::with_capacity(total);
        let mut completed = 0usize;
        while let Some(outcome) = pending.next().await {
            completed += 1;
            match &outcome.result {
                Ok(detail) => tracing::info!(
                    creator = %outcome.creator,
                    link = %detail.link(),
                    completed,
                    total,
                    "creator completed"
                ),
                Err(failure) => tracing::info!(
                    creator = %outcome.creator,
                    reason = %failure,
                    completed,
                    total,
                    "creator completed without result"
                ),
            }
            if let Some(progress) = progress.as_deref_mut() {
                progress(completed, total);
            }
            outcomes.push(outcome);
        }

        let elapsed = started.elapsed();
        tracing::info!(
            total,
            elapsed_secs = elapsed.as_secs_f64(),
            "creator run finished"
        );

        RunOutcome { outcomes, elapsed }
    }
}

/// Worker body: owns its fetcher from acquisition to release.
async fn process_creator<F: FetcherFactory>(
    factory: Arc<F>,
    index: usize,
    creator: CreatorRef,
    task_timeout: Option<Duration>,
    deadline: Option<Instant>,
) -> Result<VideoDetail, TaskFailure> {
    if deadline.is_some_and(|d| Instant::now() >= d) {
        tracing::warn!(creator = %creator, index, "run deadline passed; skipping creator");
        return Err(TaskFailure::DeadlineExpired);
    }

    tracing::info!(creator = %creator, index, "creator task started");
    let task_started = Instant::now();

    let limit = task_timeout.unwrap_or_default();
    let acquire = AssertUnwindSafe(factory.acquire()).catch_unwind();
    let acquired = match within(task_timeout, acquire).await {
        Some(Ok(result)) => result.map_err(|source| TaskFailure::Fetch {
            stage: Stage::Acquire,
            source,
        }),
        Some(Err(_)) => Err(TaskFailure::Panicked {
            stage: Stage::Acquire,
        }),
        None => Err(TaskFailure::TimedOut {
            stage: Stage::Acquire,
            limit,
        }),
    };
    let mut fetcher = match acquired {
        Ok(fetcher) => fetcher,
        Err(failure) => {
            log_failure(&creator, &failure);
            return Err(failure);
        }
    };

    let remaining = task_timeout.map(|t| t.saturating_sub(task_started.elapsed()));
    let mut stage = Stage::Listing;
    let body = AssertUnwindSafe(fetch_top_video(&mut fetcher, &creator, &mut stage));
    let finished = within(remaining, body.catch_unwind()).await;
    let result = match finished {
        Some(Ok(result)) => result,
        Some(Err(_)) => Err(TaskFailure::Panicked { stage }),
        None => Err(TaskFailure::TimedOut { stage, limit }),
    };

    if AssertUnwindSafe(fetcher.close()).catch_unwind().await.is_err() {
        tracing::error!(creator = %creator, "fetcher panicked while closing");
    }

    if let Err(failure) = &result {
        log_failure(&creator, failure);
    }
    result
}

/// Listing → rank → detail for one creator. `stage` tracks the step in
/// progress so an interrupted run can be attributed.
async fn fetch_top_video<T: Fetcher>(
    fetcher: &mut T,
    creator: &CreatorRef,
    stage: &mut Stage,
) -> Result<VideoDetail, TaskFailure> {
    *stage = Stage::Listing;
    let videos = fetcher
        .creator_videos(creator)
        .await
        .map_err(|source| TaskFailure::Fetch {
            stage: Stage::Listing,
            source,
        })?;
    if videos.is_empty() {
        return Err(TaskFailure::EmptyListing);
    }

    *stage = Stage::Ranking;
    let top = rank_most_liked(&videos)?;
    let link = top.link.clone();
    tracing::info!(
        creator = %creator,
        link = %link,
        likes = top.like_count_raw.as_deref().unwrap_or_default(),
        candidates = videos.len(),
        "most-liked video selected"
    );

    *stage = Stage::Detail;
    let metrics = fetcher
        .video_detail(&link)
        .await
        .map_err(|source| TaskFailure::Fetch {
            stage: Stage::Detail,
            source,
        })?;

    Ok(VideoDetail::new(metrics, creator.clone()))
}

/// `None` when `limit` passes before `fut` completes.
async fn within<Fut>(limit: Option<Duration>, fut: Fut) -> Option<Fut::Output>
where
    Fut: std::future::Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn log_failure(creator: &CreatorRef, failure: &TaskFailure) {
    match failure {
        TaskFailure::EmptyListing | TaskFailure::Rank(_) | TaskFailure::DeadlineExpired => {
            tracing::warn!(
                creator = %creator,
                stage = %failure.stage(),
                error = %failure,
                "no usable video for creator"
            );
        }
        _ => {
            tracing::error!(
                creator = %creator,
                stage = %failure.stage(),
                error = %failure,
                "creator pipeline failed"
            );
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
