use std::collections::BTreeSet;

use crate::{
    db::DiscoveryStore,
    error::{AppError, AppResult},
};

/// Width of one hotspot bucket in seconds
pub const BUCKET_SECONDS: f64 = 10.0;

/// Bucket indices of the densest 10-second intervals of a video's comments
///
/// Empty when the video has no comments; every bucket tied for the maximum
/// is returned.
pub async fn hotspots(store: &dyn DiscoveryStore, bv: &str) -> AppResult<BTreeSet<i64>> {
    let mut snapshot = store.snapshot().await?;

    if snapshot.get_video(bv).await?.is_none() {
        return Err(AppError::NotFound(format!("video {}", bv)));
    }

    let times = snapshot.list_comments(bv).await?;
    let buckets = densest_buckets(times);

    tracing::debug!(bv = %bv, hotspots = ?buckets, "Computed comment hotspots");

    Ok(buckets)
}

/// Sorts the offsets and scans runs of equal bucket index once
///
/// A non-finite offset counts as 0, so every comment lands in some bucket.
pub fn densest_buckets(mut times: Vec<f64>) -> BTreeSet<i64> {
    for t in times.iter_mut().filter(|t| !t.is_finite()) {
        *t = 0.0;
    }
    times.sort_by(f64::total_cmp);

    let mut best: BTreeSet<i64> = BTreeSet::new();
    let mut best_count = 0usize;

    let mut run: Option<(i64, usize)> = None;
    let buckets = times
        .iter()
        .map(|t| (t / BUCKET_SECONDS).floor() as i64)
        .map(Some)
        .chain(std::iter::once(None));

    for bucket in buckets {
        match (run, bucket) {
            (Some((current, count)), Some(next)) if current == next => {
                run = Some((current, count + 1));
                continue;
            }
            (Some((current, count)), _) => {
                if count > best_count {
                    best_count = count;
                    best.clear();
                    best.insert(current);
                } else if count == best_count {
                    best.insert(current);
                }
            }
            (None, _) => {}
        }
        run = bucket.map(|next| (next, 1));
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory::fixtures::public_video, Dataset, MemoryStore};

    #[test]
    fn test_densest_bucket_wins() {
        assert_eq!(
            densest_buckets(vec![2.0, 3.0, 21.0, 22.0, 23.0]),
            BTreeSet::from([2])
        );
    }

    #[test]
    fn test_unsorted_input_is_handled() {
        assert_eq!(
            densest_buckets(vec![23.0, 2.0, 22.0, 3.0, 21.0]),
            BTreeSet::from([2])
        );
    }

    #[test]
    fn test_single_bucket() {
        assert_eq!(densest_buckets(vec![40.0, 41.5, 49.9]), BTreeSet::from([4]));
    }

    #[test]
    fn test_uniform_buckets_all_tie() {
        assert_eq!(
            densest_buckets(vec![1.0, 15.0, 25.0, 38.0]),
            BTreeSet::from([0, 1, 2, 3])
        );
    }

    #[test]
    fn test_bucket_edges_are_left_closed() {
        // 10.0 belongs to bucket 1, not bucket 0.
        assert_eq!(
            densest_buckets(vec![9.99, 10.0, 10.5]),
            BTreeSet::from([1])
        );
    }

    #[test]
    fn test_untimed_comments_fall_in_bucket_zero() {
        assert_eq!(densest_buckets(vec![f64::NAN]), BTreeSet::from([0]));
        assert_eq!(
            densest_buckets(vec![f64::NAN, f64::INFINITY, 35.0]),
            BTreeSet::from([0])
        );
    }

    #[test]
    fn test_no_comments() {
        assert!(densest_buckets(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_hotspots_unknown_video_is_not_found() {
        let store = MemoryStore::new(Dataset::new());
        let result = hotspots(&store, "BVmissing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_hotspots_empty_iff_no_comments() {
        let store = MemoryStore::new(
            Dataset::new()
                .video(public_video("BV1", 1))
                .video(public_video("BV2", 1))
                .video(public_video("BV3", 1))
                .comment("BV2", 12.0)
                .comment("BV3", f64::NAN),
        );

        assert!(hotspots(&store, "BV1").await.unwrap().is_empty());
        assert_eq!(hotspots(&store, "BV2").await.unwrap(), BTreeSet::from([1]));
        assert_eq!(hotspots(&store, "BV3").await.unwrap(), BTreeSet::from([0]));
    }
}
