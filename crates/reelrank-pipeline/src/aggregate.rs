use std::collections::HashMap;

use reelrank_core::VideoDetail;

/// Video details keyed by link, in first-insertion order.
///
/// Inserting a detail whose link is already present replaces the stored
/// snapshot in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    entries: Vec<VideoDetail>,
    positions: HashMap<String, usize>,
}

impl Report {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced snapshot when `detail.link()` was already present.
    pub fn insert(&mut self, detail: VideoDetail) -> Option<VideoDetail> {
        if let Some(&position) = self.positions.get(detail.link()) {
            return Some(std::mem::replace(&mut self.entries[position], detail));
        }
        self.positions
            .insert(detail.link().to_string(), self.entries.len());
        self.entries.push(detail);
        None
    }

    #[must_use]
    pub fn get(&self, link: &str) -> Option<&VideoDetail> {
        self.positions.get(link).map(|&i| &self.entries[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[VideoDetail] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VideoDetail> {
        self.entries.iter()
    }
}

impl FromIterator<VideoDetail> for Report {
    fn from_iter<I: IntoIterator<Item = VideoDetail>>(iter: I) -> Self {
        let mut report = Report::new();
        for detail in iter {
            report.insert(detail);
        }
        report
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a VideoDetail;
    type IntoIter = std::slice::Iter<'a, VideoDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub report: Report,
    /// Outcomes that carried a detail, duplicates included.
    pub success_count: usize,
    pub total_count: usize,
}

/// Fold per-creator results, in processing order, into a deduplicated report.
pub fn aggregate<I>(outcomes: I) -> Aggregation
where
    I: IntoIterator<Item = Option<VideoDetail>>,
{
    let mut report = Report::new();
    let mut success_count = 0;
    let mut total_count = 0;

    for outcome in outcomes {
        total_count += 1;
        let Some(detail) = outcome else { continue };
        success_count += 1;
        if let Some(previous) = report.insert(detail) {
            tracing::debug!(
                link = %previous.link(),
                replaced_creator = %previous.creator,
                "duplicate link; keeping later snapshot"
            );
        }
    }

    tracing::info!(
        success_count,
        total_count,
        rows = report.len(),
        "aggregated creator results"
    );

    Aggregation {
        report,
        success_count,
        total_count,
    }
}
