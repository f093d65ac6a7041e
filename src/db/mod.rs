use std::collections::BTreeSet;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::{
    error::AppResult,
    models::{Bv, Mid, User, Video, WatchFact},
};

pub mod memory;
pub mod postgres;

pub use memory::{Dataset, MemoryStore};
pub use postgres::{create_pool, PgStore};

/// Entry point to the platform's persisted data
///
/// Every engine call opens exactly one snapshot and performs all of its
/// reads through it, so that counts combined into a single ratio reflect
/// the same instant.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// Opens a read-only, consistent view of the store
    async fn snapshot(&self) -> AppResult<Box<dyn StoreSnapshot>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Read accessors over one consistent snapshot
#[async_trait]
pub trait StoreSnapshot: Send {
    async fn get_video(&mut self, bv: &str) -> AppResult<Option<Video>>;

    async fn get_user(&mut self, mid: Mid) -> AppResult<Option<User>>;

    /// Users that `mid` follows
    async fn list_followees(&mut self, mid: Mid) -> AppResult<BTreeSet<Mid>>;

    /// Users following `mid`
    async fn list_followers(&mut self, mid: Mid) -> AppResult<BTreeSet<Mid>>;

    /// Distinct users with at least one watch fact on `bv`
    async fn list_watchers(&mut self, bv: &str) -> AppResult<BTreeSet<Mid>>;

    async fn list_watch_facts(&mut self, bv: &str) -> AppResult<Vec<WatchFact>>;

    /// Videos `mid` has at least one watch fact on
    async fn list_watched_videos(&mut self, mid: Mid) -> AppResult<BTreeSet<Bv>>;

    async fn count_likes(&mut self, bv: &str) -> AppResult<u64>;

    async fn count_coins(&mut self, bv: &str) -> AppResult<u64>;

    async fn count_favorites(&mut self, bv: &str) -> AppResult<u64>;

    async fn count_comments(&mut self, bv: &str) -> AppResult<u64>;

    /// Comment offsets in seconds, in no particular order
    async fn list_comments(&mut self, bv: &str) -> AppResult<Vec<f64>>;

    /// Lazily enumerates every stored video
    fn list_all_videos(&mut self) -> BoxStream<'_, AppResult<Video>>;
}
