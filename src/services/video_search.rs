use std::time::Instant;

use chrono::Utc;
use futures_util::TryStreamExt;

use crate::{
    db::DiscoveryStore,
    error::{AppError, AppResult},
    models::{Bv, Mid, Pagination, Requester},
    services::scoring,
};

/// Keyword search over the videos visible to `requester_mid`
///
/// Videos without a single keyword hit are dropped; the rest are ordered
/// by relevance, then by distinct watcher count, both descending.
pub async fn search_videos(
    store: &dyn DiscoveryStore,
    requester_mid: Mid,
    keywords: &str,
    page: Pagination,
) -> AppResult<Vec<Bv>> {
    let keywords = scoring::split_keywords(keywords);
    if keywords.is_empty() {
        return Err(AppError::InvalidInput("keywords must not be blank".to_string()));
    }

    let start = Instant::now();
    let mut snapshot = store.snapshot().await?;

    let user = snapshot
        .get_user(requester_mid)
        .await?
        .ok_or_else(|| AppError::Unauthenticated(format!("unknown user {}", requester_mid)))?;
    let requester = Requester::from(&user);
    let now = Utc::now();

    let mut hits: Vec<(usize, u64, Bv)> = Vec::new();
    let mut scanned = 0usize;
    let mut videos = snapshot.list_all_videos();
    while let Some(video) = videos.try_next().await? {
        scanned += 1;
        if !video.is_visible_to(&requester, now) {
            continue;
        }
        let relevance = scoring::keyword_relevance(&video, &keywords);
        if relevance > 0 {
            hits.push((relevance, video.watcher_count, video.bv));
        }
    }

    hits.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    tracing::info!(
        requester = requester_mid,
        keywords = keywords.len(),
        scanned,
        matched = hits.len(),
        processing_time_ms = start.elapsed().as_millis(),
        "Search completed"
    );

    Ok(page.apply(hits.into_iter().map(|(_, _, bv)| bv)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory::fixtures::public_video, Dataset, MemoryStore};
    use crate::models::{User, Video};

    fn titled(bv: &str, owner_mid: Mid, title: &str) -> Video {
        let mut video = public_video(bv, owner_mid);
        video.title = title.to_string();
        video.owner_name = format!("owner{}", owner_mid);
        video
    }

    fn page(size: i64, num: i64) -> Pagination {
        Pagination::new(size, num).unwrap()
    }

    fn store() -> MemoryStore {
        let mut pending = titled("BVpending", 2, "rust rust rust");
        pending.reviewer = None;

        MemoryStore::new(
            Dataset::new()
                .user(User::new(1, 1))
                .user(User::new(2, 1))
                .user(User::superuser(3, 6))
                .video(titled("BVone", 9, "learning rust"))
                .video(titled("BVtwo", 9, "rust and more rust"))
                .video(titled("BVtie", 9, "Rust tips"))
                .video(titled("BVnone", 9, "cooking pasta"))
                .video(pending)
                .watch(5, "BVtie", 10.0)
                .watch(6, "BVtie", 10.0),
        )
    }

    #[tokio::test]
    async fn test_orders_by_relevance_then_watchers() {
        let results = search_videos(&store(), 1, "RUST", page(10, 1)).await.unwrap();
        assert_eq!(results, vec!["BVtwo", "BVtie", "BVone"]);
    }

    #[tokio::test]
    async fn test_never_returns_zero_relevance() {
        let results = search_videos(&store(), 1, "pasta rust", page(10, 1)).await.unwrap();
        assert!(results.contains(&"BVnone".to_string()));

        let results = search_videos(&store(), 1, "java", page(10, 1)).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unreviewed_visible_only_to_owner_and_superuser() {
        let stranger = search_videos(&store(), 1, "rust", page(10, 1)).await.unwrap();
        assert!(!stranger.contains(&"BVpending".to_string()));

        let owner = search_videos(&store(), 2, "rust", page(10, 1)).await.unwrap();
        assert_eq!(owner.first().map(String::as_str), Some("BVpending"));

        let admin = search_videos(&store(), 3, "rust", page(10, 1)).await.unwrap();
        assert!(admin.contains(&"BVpending".to_string()));
    }

    #[tokio::test]
    async fn test_full_ties_fall_back_to_bv() {
        let store = MemoryStore::new(
            Dataset::new()
                .user(User::new(1, 1))
                .video(titled("BVz", 9, "tokio"))
                .video(titled("BVa", 9, "tokio"))
                .video(titled("BVm", 9, "tokio")),
        );
        let results = search_videos(&store, 1, "tokio", page(10, 1)).await.unwrap();
        assert_eq!(results, vec!["BVa", "BVm", "BVz"]);
    }

    #[tokio::test]
    async fn test_pagination() {
        let results = search_videos(&store(), 1, "rust", page(2, 2)).await.unwrap();
        assert_eq!(results, vec!["BVone"]);
    }

    #[tokio::test]
    async fn test_blank_keywords_rejected() {
        let result = search_videos(&store(), 1, "   ", page(10, 1)).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unknown_requester_rejected() {
        let result = search_videos(&store(), 77, "rust", page(10, 1)).await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }
}
