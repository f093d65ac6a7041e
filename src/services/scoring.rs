//! Pure scoring functions shared by the recommender and the search ranker.

use std::collections::BTreeSet;

use crate::{
    models::{Mid, Video},
    services::interactions::VideoInteractions,
};

/// General popularity of a video
///
/// Sum of like, coin, favorite and comment counts each divided by the
/// distinct watcher count, plus the mean watch ratio. Zero when nobody has
/// watched the video.
pub fn popularity(stats: &VideoInteractions) -> f64 {
    if stats.watcher_count == 0 {
        return 0.0;
    }

    let watchers = stats.watcher_count as f64;
    let ratio = |count: u64| count as f64 / watchers;

    ratio(stats.likes)
        + ratio(stats.coins)
        + ratio(stats.favorites)
        + ratio(stats.comments)
        + stats.avg_watch_ratio().unwrap_or(0.0)
}

/// Number of users who watched both videos
pub fn co_watch_affinity(a: &BTreeSet<Mid>, b: &BTreeSet<Mid>) -> usize {
    a.intersection(b).count()
}

/// Splits a raw query on whitespace into lowercase keywords
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_lowercase).collect()
}

/// Occurrences of `needle` in `haystack`, overlapping matches included
///
/// Both sides are expected to be lowercased already.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }

    haystack
        .char_indices()
        .filter(|(i, _)| haystack[*i..].starts_with(needle))
        .count()
}

/// Total keyword hits across title, description and owner name
///
/// `keywords` must come from [`split_keywords`].
pub fn keyword_relevance(video: &Video, keywords: &[String]) -> usize {
    let fields: Vec<String> = video
        .searchable_fields()
        .iter()
        .map(|field| field.to_lowercase())
        .collect();

    keywords
        .iter()
        .map(|keyword| {
            fields
                .iter()
                .map(|field| count_occurrences(field, keyword))
                .sum::<usize>()
        })
        .sum()
}
