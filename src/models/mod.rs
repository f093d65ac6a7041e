pub mod page;
pub mod user;
pub mod video;

pub use page::Pagination;
pub use user::{FollowEdge, Identity, Requester, User};
pub use video::{Comment, Video, WatchFact};

/// Numeric user identifier
pub type Mid = i64;

/// Opaque video identifier
pub type Bv = String;
