//! Contracts for the two page capabilities the pipeline depends on.
//!
//! A [`FetcherFactory`] hands out one [`Fetcher`] per creator task. The
//! fetcher is owned by that task for its whole pipeline and must be
//! released with [`Fetcher::close`] on every exit path; implementations
//! backed by a browser session tear the session down there.

use std::future::Future;

use reelrank_core::{CreatorRef, VideoMetrics, VideoSummary};

use crate::error::ScraperError;

pub trait Fetcher: Send + 'static {
    /// List the creator's videos. An empty list is a valid answer.
    fn creator_videos(
        &mut self,
        creator: &CreatorRef,
    ) -> impl Future<Output = Result<Vec<VideoSummary>, ScraperError>> + Send;

    /// Read engagement data from one video page. Elements missing from the
    /// page come back as [`reelrank_core::Field::Unavailable`]; only
    /// navigation and transport failures are errors.
    fn video_detail(
        &mut self,
        link: &str,
    ) -> impl Future<Output = Result<VideoMetrics, ScraperError>> + Send;

    /// Release the underlying resources. Never fails; teardown problems are
    /// logged by the implementation.
    fn close(self) -> impl Future<Output = ()> + Send;
}

pub trait FetcherFactory: Send + Sync + 'static {
    type Fetcher: Fetcher;

    /// Acquire a fresh fetcher for a single creator task.
    fn acquire(&self) -> impl Future<Output = Result<Self::Fetcher, ScraperError>> + Send;
}
