use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::{
    db::StoreSnapshot,
    error::AppResult,
    models::{Bv, Mid, Video, WatchFact},
};

/// Engagement aggregates of one video, all read from the same snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoInteractions {
    pub watcher_count: u64,
    pub likes: u64,
    pub coins: u64,
    pub favorites: u64,
    pub comments: u64,
    pub watch_fact_count: u64,
    pub watch_ratio_sum: f64,
}

impl VideoInteractions {
    /// Derives watcher count and watch-ratio totals from raw watch facts
    pub fn tally(duration: f64, facts: &[WatchFact]) -> Self {
        let watchers: BTreeSet<Mid> = facts.iter().map(|f| f.viewer_mid).collect();
        let watch_ratio_sum = facts
            .iter()
            .map(|f| {
                if duration > 0.0 {
                    f.view_time / duration
                } else {
                    0.0
                }
            })
            .sum();

        Self {
            watcher_count: watchers.len() as u64,
            watch_fact_count: facts.len() as u64,
            watch_ratio_sum,
            ..Self::default()
        }
    }

    /// Mean of `view_time / duration` over every watch fact
    ///
    /// `None` when nobody has watched the video.
    pub fn avg_watch_ratio(&self) -> Option<f64> {
        if self.watch_fact_count == 0 {
            return None;
        }
        Some(self.watch_ratio_sum / self.watch_fact_count as f64)
    }
}

/// Per-call cache of watcher sets, per-user watch history and per-video
/// aggregates
#[derive(Debug, Default)]
pub struct InteractionIndex {
    videos: HashMap<Bv, VideoInteractions>,
    watchers: HashMap<Bv, BTreeSet<Mid>>,
    watched: HashMap<Mid, BTreeSet<Bv>>,
}

impl InteractionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates for `video`, loading them on first use
    pub async fn video(
        &mut self,
        snapshot: &mut dyn StoreSnapshot,
        video: &Video,
    ) -> AppResult<&VideoInteractions> {
        if !self.videos.contains_key(&video.bv) {
            let facts = snapshot.list_watch_facts(&video.bv).await?;
            let mut stats = VideoInteractions::tally(video.duration, &facts);

            if stats.watcher_count > 0 {
                stats.likes = snapshot.count_likes(&video.bv).await?;
                stats.coins = snapshot.count_coins(&video.bv).await?;
                stats.favorites = snapshot.count_favorites(&video.bv).await?;
                stats.comments = snapshot.count_comments(&video.bv).await?;
            }

            self.watchers
                .entry(video.bv.clone())
                .or_insert_with(|| facts.iter().map(|f| f.viewer_mid).collect());
            self.videos.insert(video.bv.clone(), stats);
        }

        Ok(&self.videos[&video.bv])
    }

    /// Distinct users who watched `bv`
    pub async fn watchers(
        &mut self,
        snapshot: &mut dyn StoreSnapshot,
        bv: &str,
    ) -> AppResult<&BTreeSet<Mid>> {
        if !self.watchers.contains_key(bv) {
            let mids = snapshot.list_watchers(bv).await?;
            self.watchers.insert(bv.to_string(), mids);
        }
        Ok(&self.watchers[bv])
    }

    /// Videos `mid` has watched
    pub async fn watched_by(
        &mut self,
        snapshot: &mut dyn StoreSnapshot,
        mid: Mid,
    ) -> AppResult<&BTreeSet<Bv>> {
        if !self.watched.contains_key(&mid) {
            let bvs = snapshot.list_watched_videos(mid).await?;
            self.watched.insert(mid, bvs);
        }
        Ok(&self.watched[&mid])
    }
}
