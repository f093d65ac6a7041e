use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;

use crate::{
    db::{DiscoveryStore, StoreSnapshot},
    error::{AppError, AppResult},
    models::{Bv, Mid, Pagination, User, Video},
    services::{
        interactions::InteractionIndex,
        scoring,
        social_graph::SocialGraph,
    },
};

/// Length of the related-videos list
pub const RELATED_LIMIT: usize = 5;

/// Videos most often co-watched with `bv`
///
/// Ordered by the number of shared watchers, ties broken by ascending bv.
/// Never contains `bv` itself.
pub async fn related_videos(store: &dyn DiscoveryStore, bv: &str) -> AppResult<Vec<Bv>> {
    let mut snapshot = store.snapshot().await?;
    let snapshot = snapshot.as_mut();
    let mut index = InteractionIndex::new();

    if snapshot.get_video(bv).await?.is_none() {
        return Err(AppError::NotFound(format!("video {}", bv)));
    }

    let watchers = index.watchers(snapshot, bv).await?.clone();

    let mut candidates: Vec<Bv> = Vec::new();
    for &watcher in &watchers {
        candidates.extend(index.watched_by(snapshot, watcher).await?.iter().cloned());
    }
    candidates.sort();
    candidates.dedup();
    candidates.retain(|candidate| candidate != bv);

    let mut scored: Vec<(usize, Bv)> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        // Watch facts may outlive their video row.
        if snapshot.get_video(&candidate).await?.is_none() {
            continue;
        }
        let shared = scoring::co_watch_affinity(&watchers, index.watchers(snapshot, &candidate).await?);
        if shared > 0 {
            scored.push((shared, candidate));
        }
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let related: Vec<Bv> = scored
        .into_iter()
        .take(RELATED_LIMIT)
        .map(|(_, candidate)| candidate)
        .collect();

    tracing::debug!(bv = %bv, related = related.len(), "Related videos computed");

    Ok(related)
}

/// Popularity-ranked page over every stored video
pub async fn general_feed(store: &dyn DiscoveryStore, page: Pagination) -> AppResult<Vec<Bv>> {
    let start = Instant::now();
    let mut snapshot = store.snapshot().await?;

    let ranked = rank_by_popularity(snapshot.as_mut()).await?;

    tracing::info!(
        ranked = ranked.len(),
        page_size = page.page_size,
        page_num = page.page_num,
        processing_time_ms = start.elapsed().as_millis(),
        "General feed ranked"
    );

    Ok(page.apply(ranked))
}

/// Feed built from what the user's mutual follows have watched
///
/// Falls back to the general feed, within the same snapshot, when the user
/// has no mutual follows.
pub async fn personalized_feed(
    store: &dyn DiscoveryStore,
    mid: Mid,
    page: Pagination,
) -> AppResult<Vec<Bv>> {
    let start = Instant::now();
    let mut snapshot = store.snapshot().await?;
    let snapshot = snapshot.as_mut();

    require_user(snapshot, mid).await?;

    let graph = SocialGraph::around(snapshot, mid).await?;
    let mutuals = graph.mutual_second_hop(mid, mid);

    if mutuals.is_empty() {
        tracing::info!(mid, "No mutual follows, falling back to general feed");
        let ranked = rank_by_popularity(snapshot).await?;
        return Ok(page.apply(ranked));
    }

    let mut index = InteractionIndex::new();
    let seen = index.watched_by(snapshot, mid).await?.clone();

    // Distinct mutual-follow watchers per unseen video
    let mut watcher_counts: BTreeMap<Bv, usize> = BTreeMap::new();
    for &friend in &mutuals {
        for bv in index.watched_by(snapshot, friend).await? {
            if !seen.contains(bv) {
                *watcher_counts.entry(bv.clone()).or_default() += 1;
            }
        }
    }

    let mut owner_levels: HashMap<Mid, Option<i32>> = HashMap::new();
    let mut scored: Vec<FeedCandidate> = Vec::with_capacity(watcher_counts.len());
    for (bv, watchers) in watcher_counts {
        let Some(video) = snapshot.get_video(&bv).await? else {
            continue;
        };

        let owner_level = match owner_levels.get(&video.owner_mid) {
            Some(level) => *level,
            None => {
                let level = snapshot.get_user(video.owner_mid).await?.and_then(|u| u.level);
                owner_levels.insert(video.owner_mid, level);
                level
            }
        };

        scored.push(FeedCandidate {
            watchers,
            owner_level,
            public_time: video.public_time,
            bv,
        });
    }

    scored.sort_by(FeedCandidate::rank);

    tracing::info!(
        mid,
        mutual_follows = mutuals.len(),
        candidates = scored.len(),
        processing_time_ms = start.elapsed().as_millis(),
        "Personalized feed ranked"
    );

    Ok(page.apply(scored.into_iter().map(|candidate| candidate.bv)))
}

/// Users sharing followees with `mid`, most shared first
///
/// Candidates exclude `mid` and everyone it already follows; ties are
/// broken by level descending with unset levels first, then mid ascending.
pub async fn recommend_friends(
    store: &dyn DiscoveryStore,
    mid: Mid,
    page: Pagination,
) -> AppResult<Vec<Mid>> {
    let mut snapshot = store.snapshot().await?;
    let snapshot = snapshot.as_mut();

    require_user(snapshot, mid).await?;

    let graph = SocialGraph::around(snapshot, mid).await?;
    let counts = graph.common_followee_counts(mid);

    let mut scored: Vec<(usize, Option<i32>, Mid)> = Vec::with_capacity(counts.len());
    for (candidate, shared) in counts {
        let Some(user) = snapshot.get_user(candidate).await? else {
            continue;
        };
        scored.push((shared, user.level, candidate));
    }

    scored.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| desc_nulls_first(&a.1, &b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    tracing::info!(mid, candidates = scored.len(), "Friend suggestions ranked");

    Ok(page.apply(scored.into_iter().map(|(_, _, candidate)| candidate)))
}

/// Mean watch ratio of `bv`, or `None` if nobody has watched it
pub async fn average_view_rate(store: &dyn DiscoveryStore, bv: &str) -> AppResult<Option<f64>> {
    let mut snapshot = store.snapshot().await?;
    let snapshot = snapshot.as_mut();

    let video = snapshot
        .get_video(bv)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("video {}", bv)))?;

    let mut index = InteractionIndex::new();
    Ok(index.video(snapshot, &video).await?.avg_watch_ratio())
}

async fn require_user(snapshot: &mut dyn StoreSnapshot, mid: Mid) -> AppResult<User> {
    snapshot
        .get_user(mid)
        .await?
        .ok_or_else(|| AppError::Unauthenticated(format!("unknown user {}", mid)))
}

/// Every video ordered by popularity descending, then bv ascending
async fn rank_by_popularity(snapshot: &mut dyn StoreSnapshot) -> AppResult<Vec<Bv>> {
    let videos: Vec<Video> = snapshot.list_all_videos().try_collect().await?;
    let mut index = InteractionIndex::new();

    let mut scored: Vec<(f64, Bv)> = Vec::with_capacity(videos.len());
    for video in videos {
        let score = scoring::popularity(index.video(snapshot, &video).await?);
        scored.push((score, video.bv));
    }

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    Ok(scored.into_iter().map(|(_, bv)| bv).collect())
}

/// Descending order in which `None` precedes every `Some`
fn desc_nulls_first<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => b.cmp(a),
    }
}

struct FeedCandidate {
    watchers: usize,
    owner_level: Option<i32>,
    public_time: Option<DateTime<Utc>>,
    bv: Bv,
}

impl FeedCandidate {
    /// Watchers, owner level and public time all descending; unknown levels
    /// and times sort first within their key; bv ascending settles the rest
    fn rank(a: &Self, b: &Self) -> Ordering {
        b.watchers
            .cmp(&a.watchers)
            .then_with(|| desc_nulls_first(&a.owner_level, &b.owner_level))
            .then_with(|| desc_nulls_first(&a.public_time, &b.public_time))
            .then_with(|| a.bv.cmp(&b.bv))
    }
}
