use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Bv, Mid, Requester};

/// Read-only snapshot of a video row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub bv: Bv,
    pub owner_mid: Mid,
    pub owner_name: String,
    pub title: String,
    pub description: Option<String>,
    /// Length in seconds
    pub duration: f64,
    /// `None` or a future instant means the video is not public yet
    pub public_time: Option<DateTime<Utc>>,
    /// Mid of the reviewing superuser, `None` while unreviewed
    pub reviewer: Option<Mid>,
    /// Denormalized distinct-watcher count kept on the video row
    pub watcher_count: u64,
}

impl Video {
    pub fn is_reviewed(&self) -> bool {
        matches!(self.reviewer, Some(reviewer) if reviewer != 0)
    }

    pub fn is_public_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.public_time, Some(public_time) if public_time <= now)
    }

    /// Owners and privileged identities see everything; everyone else only
    /// sees reviewed videos whose public time has passed.
    pub fn is_visible_to(&self, requester: &Requester, now: DateTime<Utc>) -> bool {
        if requester.privileged || requester.mid == self.owner_mid {
            return true;
        }
        self.is_reviewed() && self.is_public_at(now)
    }

    /// Text searched by keyword relevance
    pub fn searchable_fields(&self) -> [&str; 3] {
        [
            self.title.as_str(),
            self.description.as_deref().unwrap_or(""),
            self.owner_name.as_str(),
        ]
    }
}

/// One viewing record: `view_time` seconds of `bv` watched by `viewer_mid`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchFact {
    pub viewer_mid: Mid,
    pub bv: Bv,
    pub view_time: f64,
}

/// A danmu comment; only its offset into the video matters here
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub bv: Bv,
    pub time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn video(reviewer: Option<Mid>, public_time: Option<DateTime<Utc>>) -> Video {
        Video {
            bv: "BV1".to_string(),
            owner_mid: 10,
            owner_name: "owner".to_string(),
            title: "title".to_string(),
            description: None,
            duration: 60.0,
            public_time,
            reviewer,
            watcher_count: 0,
        }
    }

    fn stranger() -> Requester {
        Requester {
            mid: 99,
            privileged: false,
        }
    }

    #[test]
    fn test_reviewed_and_published_is_visible() {
        let now = Utc::now();
        let v = video(Some(1), Some(now - Duration::days(1)));
        assert!(v.is_visible_to(&stranger(), now));
    }

    #[test]
    fn test_unreviewed_hidden_from_stranger() {
        let now = Utc::now();
        assert!(!video(None, Some(now - Duration::days(1))).is_visible_to(&stranger(), now));
        assert!(!video(Some(0), Some(now - Duration::days(1))).is_visible_to(&stranger(), now));
    }

    #[test]
    fn test_unpublished_or_future_hidden_from_stranger() {
        let now = Utc::now();
        assert!(!video(Some(1), None).is_visible_to(&stranger(), now));
        assert!(!video(Some(1), Some(now + Duration::hours(1))).is_visible_to(&stranger(), now));
    }

    #[test]
    fn test_owner_and_superuser_always_see() {
        let now = Utc::now();
        let v = video(None, None);
        let owner = Requester {
            mid: 10,
            privileged: false,
        };
        let admin = Requester {
            mid: 1,
            privileged: true,
        };
        assert!(v.is_visible_to(&owner, now));
        assert!(v.is_visible_to(&admin, now));
    }
}
