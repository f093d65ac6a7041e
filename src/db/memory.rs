use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::RwLock;

use crate::{
    db::{DiscoveryStore, StoreSnapshot},
    error::AppResult,
    models::{Bv, Comment, FollowEdge, Mid, User, Video, WatchFact},
};

/// Owned copy of every entity the engine reads
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub users: BTreeMap<Mid, User>,
    pub follows: BTreeSet<FollowEdge>,
    pub videos: BTreeMap<Bv, Video>,
    pub watch_facts: Vec<WatchFact>,
    pub likes: BTreeSet<(Bv, Mid)>,
    pub coins: BTreeSet<(Bv, Mid)>,
    pub favorites: BTreeSet<(Bv, Mid)>,
    pub comments: Vec<Comment>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user: User) -> Self {
        self.users.insert(user.mid, user);
        self
    }

    pub fn follow(mut self, follower: Mid, followee: Mid) -> Self {
        self.follows.insert(FollowEdge::new(follower, followee));
        self
    }

    pub fn video(mut self, video: Video) -> Self {
        self.videos.insert(video.bv.clone(), video);
        self
    }

    pub fn watch(mut self, viewer_mid: Mid, bv: &str, view_time: f64) -> Self {
        self.watch_facts.push(WatchFact {
            viewer_mid,
            bv: bv.to_string(),
            view_time,
        });
        self
    }

    pub fn like(mut self, mid: Mid, bv: &str) -> Self {
        self.likes.insert((bv.to_string(), mid));
        self
    }

    pub fn coin(mut self, mid: Mid, bv: &str) -> Self {
        self.coins.insert((bv.to_string(), mid));
        self
    }

    pub fn favorite(mut self, mid: Mid, bv: &str) -> Self {
        self.favorites.insert((bv.to_string(), mid));
        self
    }

    pub fn comment(mut self, bv: &str, time: f64) -> Self {
        self.comments.push(Comment {
            bv: bv.to_string(),
            time,
        });
        self
    }

    /// Keeps each video's denormalized watcher count in line with its facts
    fn with_watcher_counts(mut self) -> Self {
        let mut watchers: BTreeMap<&str, BTreeSet<Mid>> = BTreeMap::new();
        for fact in &self.watch_facts {
            watchers.entry(&fact.bv).or_default().insert(fact.viewer_mid);
        }

        let counts: BTreeMap<Bv, u64> = watchers
            .into_iter()
            .map(|(bv, mids)| (bv.to_string(), mids.len() as u64))
            .collect();

        for video in self.videos.values_mut() {
            video.watcher_count = counts.get(&video.bv).copied().unwrap_or(0);
        }
        self
    }

    fn count_pairs(pairs: &BTreeSet<(Bv, Mid)>, bv: &str) -> u64 {
        pairs.iter().filter(|(video, _)| video == bv).count() as u64
    }
}

/// In-process store used for tests and local demos
///
/// Snapshots are full clones taken under a read lock, so a snapshot never
/// observes a later write.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Dataset>>,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            inner: Arc::new(RwLock::new(dataset)),
        }
    }

    /// Replaces the stored data; open snapshots are unaffected
    pub async fn replace(&self, dataset: Dataset) {
        *self.inner.write().await = dataset;
    }
}

#[async_trait]
impl DiscoveryStore for MemoryStore {
    async fn snapshot(&self) -> AppResult<Box<dyn StoreSnapshot>> {
        let data = self.inner.read().await.clone().with_watcher_counts();
        Ok(Box::new(MemorySnapshot { data }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

pub struct MemorySnapshot {
    data: Dataset,
}

#[async_trait]
impl StoreSnapshot for MemorySnapshot {
    async fn get_video(&mut self, bv: &str) -> AppResult<Option<Video>> {
        Ok(self.data.videos.get(bv).cloned())
    }

    async fn get_user(&mut self, mid: Mid) -> AppResult<Option<User>> {
        Ok(self.data.users.get(&mid).cloned())
    }

    async fn list_followees(&mut self, mid: Mid) -> AppResult<BTreeSet<Mid>> {
        Ok(self
            .data
            .follows
            .iter()
            .filter(|edge| edge.follower == mid)
            .map(|edge| edge.followee)
            .collect())
    }

    async fn list_followers(&mut self, mid: Mid) -> AppResult<BTreeSet<Mid>> {
        Ok(self
            .data
            .follows
            .iter()
            .filter(|edge| edge.followee == mid)
            .map(|edge| edge.follower)
            .collect())
    }

    async fn list_watchers(&mut self, bv: &str) -> AppResult<BTreeSet<Mid>> {
        Ok(self
            .data
            .watch_facts
            .iter()
            .filter(|fact| fact.bv == bv)
            .map(|fact| fact.viewer_mid)
            .collect())
    }

    async fn list_watch_facts(&mut self, bv: &str) -> AppResult<Vec<WatchFact>> {
        Ok(self
            .data
            .watch_facts
            .iter()
            .filter(|fact| fact.bv == bv)
            .cloned()
            .collect())
    }

    async fn list_watched_videos(&mut self, mid: Mid) -> AppResult<BTreeSet<Bv>> {
        Ok(self
            .data
            .watch_facts
            .iter()
            .filter(|fact| fact.viewer_mid == mid)
            .map(|fact| fact.bv.clone())
            .collect())
    }

    async fn count_likes(&mut self, bv: &str) -> AppResult<u64> {
        Ok(Dataset::count_pairs(&self.data.likes, bv))
    }

    async fn count_coins(&mut self, bv: &str) -> AppResult<u64> {
        Ok(Dataset::count_pairs(&self.data.coins, bv))
    }

    async fn count_favorites(&mut self, bv: &str) -> AppResult<u64> {
        Ok(Dataset::count_pairs(&self.data.favorites, bv))
    }

    async fn count_comments(&mut self, bv: &str) -> AppResult<u64> {
        Ok(self.data.comments.iter().filter(|c| c.bv == bv).count() as u64)
    }

    async fn list_comments(&mut self, bv: &str) -> AppResult<Vec<f64>> {
        Ok(self
            .data
            .comments
            .iter()
            .filter(|c| c.bv == bv)
            .map(|c| c.time)
            .collect())
    }

    fn list_all_videos(&mut self) -> BoxStream<'_, AppResult<Video>> {
        stream::iter(self.data.videos.values().cloned().map(Ok)).boxed()
    }
}
