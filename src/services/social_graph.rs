use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    db::StoreSnapshot,
    error::AppResult,
    models::{FollowEdge, Mid},
};

/// Query-time view of the directed follows relation
///
/// Built per call and discarded afterwards. When loaded with [`SocialGraph::around`]
/// only the origin's neighbourhood is populated: the origin's followees, plus
/// the followees and followers of each of those.
#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    followees: HashMap<Mid, BTreeSet<Mid>>,
    followers: HashMap<Mid, BTreeSet<Mid>>,
}

impl SocialGraph {
    /// Builds a complete graph from an edge list
    pub fn from_edges(edges: impl IntoIterator<Item = FollowEdge>) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            graph
                .followees
                .entry(edge.follower)
                .or_default()
                .insert(edge.followee);
            graph
                .followers
                .entry(edge.followee)
                .or_default()
                .insert(edge.follower);
        }
        graph
    }

    /// Loads the two-hop neighbourhood of `origin` from the snapshot
    pub async fn around(snapshot: &mut dyn StoreSnapshot, origin: Mid) -> AppResult<Self> {
        let mut graph = Self::default();

        let direct = snapshot.list_followees(origin).await?;
        for &followee in &direct {
            let onward = snapshot.list_followees(followee).await?;
            let back = snapshot.list_followers(followee).await?;
            graph.followees.insert(followee, onward);
            graph.followers.insert(followee, back);
        }
        graph.followees.insert(origin, direct);

        tracing::debug!(
            origin,
            followees = graph.followees.get(&origin).map_or(0, BTreeSet::len),
            "Loaded social neighbourhood"
        );

        Ok(graph)
    }

    /// Direct followees of `mid`
    pub fn neighbors(&self, mid: Mid) -> BTreeSet<Mid> {
        self.followees.get(&mid).cloned().unwrap_or_default()
    }

    pub fn follows(&self, follower: Mid, followee: Mid) -> bool {
        self.followees
            .get(&follower)
            .is_some_and(|set| set.contains(&followee))
    }

    /// Followees of `a` who themselves follow `b`
    ///
    /// With `a == b` this is the set of users `a` follows that follow `a`
    /// back, which is what feed personalization keys on.
    pub fn mutual_second_hop(&self, a: Mid, b: Mid) -> BTreeSet<Mid> {
        self.followees
            .get(&a)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&x| self.follows(x, b))
            .collect()
    }

    /// For every user other than `origin` and not already followed by it,
    /// how many of `origin`'s followees that user also follows
    ///
    /// Users sharing no followee with `origin` are absent from the result.
    pub fn common_followee_counts(&self, origin: Mid) -> BTreeMap<Mid, usize> {
        let direct = self.neighbors(origin);
        let mut counts: BTreeMap<Mid, usize> = BTreeMap::new();

        for followee in &direct {
            let Some(followers) = self.followers.get(followee) else {
                continue;
            };
            for &candidate in followers {
                if candidate == origin || direct.contains(&candidate) {
                    continue;
                }
                *counts.entry(candidate).or_default() += 1;
            }
        }

        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Dataset, DiscoveryStore, MemoryStore};

    fn edges(pairs: &[(Mid, Mid)]) -> Vec<FollowEdge> {
        pairs.iter().map(|&(a, b)| FollowEdge::new(a, b)).collect()
    }

    #[test]
    fn test_mutual_second_hop_requires_follow_back() {
        // 1 follows 2 and 3; only 2 follows 1 back.
        let graph = SocialGraph::from_edges(edges(&[(1, 2), (1, 3), (2, 1), (3, 4)]));
        assert_eq!(graph.mutual_second_hop(1, 1), BTreeSet::from([2]));
    }

    #[test]
    fn test_mutual_second_hop_between_distinct_users() {
        let graph = SocialGraph::from_edges(edges(&[(1, 2), (1, 3), (2, 9), (3, 9), (3, 1)]));
        assert_eq!(graph.mutual_second_hop(1, 9), BTreeSet::from([2, 3]));
        assert!(graph.mutual_second_hop(5, 9).is_empty());
    }

    #[test]
    fn test_common_followee_counts_excludes_self_and_followed() {
        // origin 1 follows 2 and 3
        let graph = SocialGraph::from_edges(edges(&[
            (1, 2),
            (1, 3),
            (4, 2),
            (4, 3),
            (5, 3),
            (2, 3),
            (6, 7),
        ]));

        let counts = graph.common_followee_counts(1);
        assert_eq!(counts.get(&4), Some(&2));
        assert_eq!(counts.get(&5), Some(&1));
        // 2 is already followed by 1, 6 shares nothing.
        assert!(!counts.contains_key(&2));
        assert!(!counts.contains_key(&6));
        assert!(!counts.contains_key(&1));
    }

    #[tokio::test]
    async fn test_around_matches_full_graph() {
        let pairs = [(1, 2), (1, 3), (2, 1), (4, 2), (4, 3), (3, 5)];
        let dataset = pairs
            .iter()
            .fold(Dataset::new(), |d, &(a, b)| d.follow(a, b));
        let store = MemoryStore::new(dataset);
        let mut snapshot = store.snapshot().await.unwrap();

        let loaded = SocialGraph::around(snapshot.as_mut(), 1).await.unwrap();
        let full = SocialGraph::from_edges(edges(&pairs));

        assert_eq!(loaded.neighbors(1), full.neighbors(1));
        assert_eq!(loaded.mutual_second_hop(1, 1), full.mutual_second_hop(1, 1));
        assert_eq!(
            loaded.common_followee_counts(1),
            full.common_followee_counts(1)
        );
    }
}
