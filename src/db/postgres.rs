use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures_util::stream::{BoxStream, StreamExt};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction};

use crate::{
    config::Config,
    db::{DiscoveryStore, StoreSnapshot},
    error::AppResult,
    models::{Bv, Identity, Mid, User, Video, WatchFact},
};

/// Creates a PostgreSQL connection pool
///
/// The acquire timeout bounds how long an engine call may wait for a
/// connection; expiry surfaces as a store failure.
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

const SELECT_VIDEOS: &str = "SELECT bv, owner_mid, owner_name, title, description, duration, \
                             public_time, reviewer, number_of_viewer FROM video";

/// Store adapter over the platform's Postgres schema
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DiscoveryStore for PgStore {
    async fn snapshot(&self) -> AppResult<Box<dyn StoreSnapshot>> {
        let mut tx = self.pool.begin().await?;

        // Must be the first statement of the transaction.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgSnapshot { tx }))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// One repeatable-read transaction; dropped without commit, which rolls back
pub struct PgSnapshot {
    tx: Transaction<'static, Postgres>,
}

fn video_from_row(row: &sqlx::postgres::PgRow) -> Result<Video, sqlx::Error> {
    let public_time: Option<NaiveDateTime> = row.try_get("public_time")?;
    let reviewer: Option<i64> = row.try_get("reviewer")?;
    let watcher_count: Option<i64> = row.try_get("number_of_viewer")?;

    Ok(Video {
        bv: row.try_get("bv")?,
        owner_mid: row.try_get("owner_mid")?,
        owner_name: row.try_get::<Option<String>, _>("owner_name")?.unwrap_or_default(),
        title: row.try_get::<Option<String>, _>("title")?.unwrap_or_default(),
        description: row.try_get("description")?,
        duration: row.try_get::<Option<f64>, _>("duration")?.unwrap_or_default(),
        public_time: public_time.map(|t| t.and_utc()),
        reviewer: reviewer.filter(|mid| *mid != 0),
        watcher_count: watcher_count.unwrap_or_default().max(0) as u64,
    })
}

impl PgSnapshot {
    async fn count(&mut self, sql: &str, bv: &str) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(sql)
            .bind(bv)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn mids(&mut self, sql: &str, mid: Mid) -> AppResult<BTreeSet<Mid>> {
        let mids: Vec<i64> = sqlx::query_scalar(sql)
            .bind(mid)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(mids.into_iter().collect())
    }
}

#[async_trait]
impl StoreSnapshot for PgSnapshot {
    async fn get_video(&mut self, bv: &str) -> AppResult<Option<Video>> {
        let sql = format!("{} WHERE bv = $1", SELECT_VIDEOS);
        let row = sqlx::query(&sql)
            .bind(bv)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.as_ref().map(video_from_row).transpose()?)
    }

    async fn get_user(&mut self, mid: Mid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT mid, level, identity_s FROM user_basic WHERE mid = $1")
            .bind(mid)
            .fetch_optional(&mut *self.tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let identity: Option<String> = row.try_get("identity_s")?;
        let identity = match identity.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("superuser") => Identity::Superuser,
            _ => Identity::User,
        };

        Ok(Some(User {
            mid: row.try_get("mid")?,
            level: row.try_get("level")?,
            identity,
        }))
    }

    async fn list_followees(&mut self, mid: Mid) -> AppResult<BTreeSet<Mid>> {
        self.mids("SELECT following FROM following WHERE user_mid = $1", mid)
            .await
    }

    async fn list_followers(&mut self, mid: Mid) -> AppResult<BTreeSet<Mid>> {
        self.mids("SELECT user_mid FROM following WHERE following = $1", mid)
            .await
    }

    async fn list_watchers(&mut self, bv: &str) -> AppResult<BTreeSet<Mid>> {
        let mids: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT viewer_mid FROM viewer_duration WHERE bv = $1")
                .bind(bv)
                .fetch_all(&mut *self.tx)
                .await?;
        Ok(mids.into_iter().collect())
    }

    async fn list_watch_facts(&mut self, bv: &str) -> AppResult<Vec<WatchFact>> {
        let rows = sqlx::query("SELECT viewer_mid, view_time FROM viewer_duration WHERE bv = $1")
            .bind(bv)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter()
            .map(|row| -> AppResult<WatchFact> {
                Ok(WatchFact {
                    viewer_mid: row.try_get("viewer_mid")?,
                    bv: bv.to_string(),
                    view_time: row.try_get::<Option<f64>, _>("view_time")?.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn list_watched_videos(&mut self, mid: Mid) -> AppResult<BTreeSet<Bv>> {
        let bvs: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT bv FROM viewer_duration WHERE viewer_mid = $1")
                .bind(mid)
                .fetch_all(&mut *self.tx)
                .await?;
        Ok(bvs.into_iter().collect())
    }

    async fn count_likes(&mut self, bv: &str) -> AppResult<u64> {
        self.count("SELECT COUNT(*) FROM video_like WHERE video_bv = $1", bv)
            .await
    }

    async fn count_coins(&mut self, bv: &str) -> AppResult<u64> {
        self.count("SELECT COUNT(*) FROM video_coin WHERE video_bv = $1", bv)
            .await
    }

    async fn count_favorites(&mut self, bv: &str) -> AppResult<u64> {
        self.count("SELECT COUNT(*) FROM video_favorite WHERE video_bv = $1", bv)
            .await
    }

    async fn count_comments(&mut self, bv: &str) -> AppResult<u64> {
        self.count("SELECT COUNT(*) FROM danmu WHERE bv = $1", bv)
            .await
    }

    async fn list_comments(&mut self, bv: &str) -> AppResult<Vec<f64>> {
        let times: Vec<Option<f64>> = sqlx::query_scalar("SELECT time FROM danmu WHERE bv = $1")
            .bind(bv)
            .fetch_all(&mut *self.tx)
            .await?;
        // NULL offsets count as 0.
        Ok(times.into_iter().map(Option::unwrap_or_default).collect())
    }

    fn list_all_videos(&mut self) -> BoxStream<'_, AppResult<Video>> {
        sqlx::query(SELECT_VIDEOS)
            .fetch(&mut *self.tx)
            .map(|row| -> AppResult<Video> { Ok(video_from_row(&row?)?) })
            .boxed()
    }
}
