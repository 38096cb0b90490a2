//! Domain types shared by the fetcher, ranking, and reporting layers.
//!
//! Engagement values are kept as the strings the platform renders
//! (`"1.2万"`, `"3456"`). Only the ranking step interprets them numerically.

use serde::{Deserialize, Serialize};

/// Sentinel written in place of an engagement field the page did not expose.
pub const UNAVAILABLE: &str = "unavailable";

/// Opaque identifier of a creator, normally the profile URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatorRef(String);

impl CreatorRef {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CreatorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CreatorRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CreatorRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One row of a creator's video listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub title: String,
    /// Like counter as rendered on the listing tile. `None` when the tile
    /// carried no counter at all.
    pub like_count_raw: Option<String>,
    pub link: String,
}

/// A single scraped value that may be missing from the page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Available(String),
    #[default]
    Unavailable,
}

impl Field {
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Field::Available(_))
    }

    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Field::Available(v) => Some(v.as_str()),
            Field::Unavailable => None,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Available(v) => f.write_str(v),
            Field::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

/// Blank strings count as missing: the page rendered the element but
/// left it empty.
impl From<Option<String>> for Field {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Field::Available(v.trim().to_string()),
            _ => Field::Unavailable,
        }
    }
}

/// Engagement data read from a single video page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetrics {
    pub link: String,
    pub title: Field,
    pub author_name: Field,
    pub like_count: Field,
    pub comment_count: Field,
    pub share_count: Field,
    /// `YYYY-MM-DD HH:MM` when the page exposed a recognizable date.
    pub publish_date: Option<String>,
}

impl VideoMetrics {
    /// A record for `link` with every field unavailable.
    #[must_use]
    pub fn unavailable(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            title: Field::Unavailable,
            author_name: Field::Unavailable,
            like_count: Field::Unavailable,
            comment_count: Field::Unavailable,
            share_count: Field::Unavailable,
            publish_date: None,
        }
    }
}

/// A creator's representative video, ready for the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDetail {
    pub metrics: VideoMetrics,
    pub creator: CreatorRef,
}

impl VideoDetail {
    #[must_use]
    pub fn new(metrics: VideoMetrics, creator: CreatorRef) -> Self {
        Self { metrics, creator }
    }

    /// Deduplication key of the report.
    #[must_use]
    pub fn link(&self) -> &str {
        &self.metrics.link
    }
}
