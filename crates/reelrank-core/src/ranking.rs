//! Selection of a creator's most-liked video.
//!
//! Listing tiles render like counters in several shapes: plain digits,
//! grouped digits (`12,345`), and abbreviated counts such as `1.2万` or
//! `3.4w` once a video passes ten thousand likes. Counters that cannot be
//! read are excluded from the candidate set. They are never treated as zero.

use thiserror::Error;

use crate::types::VideoSummary;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    #[error("no video with a readable like count")]
    NoRankableVideo,
}

/// Parse a rendered like counter into a non-negative integer.
///
/// Returns `None` for empty, negative, or otherwise unreadable input.
#[must_use]
pub fn parse_like_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return cleaned.parse::<u64>().ok();
    }

    let (number, multiplier) = split_unit(&cleaned)?;
    parse_scaled(number.trim_end(), multiplier)
}

fn split_unit(s: &str) -> Option<(&str, u64)> {
    let last = s.chars().next_back()?;
    let multiplier = match last {
        'k' | 'K' => 1_000,
        'w' | 'W' | '万' => 10_000,
        'm' | 'M' => 1_000_000,
        '亿' => 100_000_000,
        _ => return None,
    };
    Some((&s[..s.len() - last.len_utf8()], multiplier))
}

/// Scale a decimal mantissa without going through floating point, so
/// `1.2万` is exactly 12 000.
fn parse_scaled(number: &str, multiplier: u64) -> Option<u64> {
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole_value = whole.parse::<u64>().ok()?.checked_mul(multiplier)?;

    let mut frac_value = 0u64;
    let mut scale = multiplier;
    for digit in frac.bytes() {
        scale /= 10;
        if scale == 0 {
            break;
        }
        frac_value = frac_value.checked_add(u64::from(digit - b'0') * scale)?;
    }

    whole_value.checked_add(frac_value)
}

/// Pick the entry with the highest readable like count.
///
/// Ties resolve to the earliest entry in `videos`.
///
/// # Errors
///
/// Returns [`RankError::NoRankableVideo`] when `videos` is empty or no
/// entry carries a readable counter.
pub fn rank_most_liked(videos: &[VideoSummary]) -> Result<&VideoSummary, RankError> {
    let mut best: Option<(u64, &VideoSummary)> = None;

    for video in videos {
        let Some(count) = video.like_count_raw.as_deref().and_then(parse_like_count) else {
            continue;
        };
        // Strictly greater keeps the first of equal counts.
        if best.is_none_or(|(top, _)| count > top) {
            best = Some((count, video));
        }
    }

    best.map(|(_, video)| video)
        .ok_or(RankError::NoRankableVideo)
}
