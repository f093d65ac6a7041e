use serde::{Deserialize, Serialize};

use super::Mid;

/// Platform role of a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    #[default]
    User,
    Superuser,
}

/// Read-only view of a platform user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub mid: Mid,
    /// Account level, used as a ranking tie-break; `None` when unset
    pub level: Option<i32>,
    #[serde(default)]
    pub identity: Identity,
}

impl User {
    pub fn new(mid: Mid, level: i32) -> Self {
        Self {
            mid,
            level: Some(level),
            identity: Identity::User,
        }
    }

    pub fn superuser(mid: Mid, level: i32) -> Self {
        Self {
            mid,
            level: Some(level),
            identity: Identity::Superuser,
        }
    }

    pub fn is_superuser(&self) -> bool {
        self.identity == Identity::Superuser
    }
}

/// Directed "follows" edge of the social graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FollowEdge {
    pub follower: Mid,
    pub followee: Mid,
}

impl FollowEdge {
    pub fn new(follower: Mid, followee: Mid) -> Self {
        Self { follower, followee }
    }
}

/// The already-authenticated identity a ranking call is made on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub mid: Mid,
    pub privileged: bool,
}

impl From<&User> for Requester {
    fn from(user: &User) -> Self {
        Self {
            mid: user.mid,
            privileged: user.is_superuser(),
        }
    }
}
