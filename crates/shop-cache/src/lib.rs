//! # Shop Cache
//!
//! 髒欄位追蹤與查詢快取模組

pub mod clock;
pub mod debounce;
pub mod dirty_tracking;
pub mod query_client;
pub mod query_key;

// Re-export 主要類型
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::Debounced;
pub use dirty_tracking::{DirtyTracker, SessionToken};
pub use query_client::{
    CachePolicy, FetchOutcome, FetchTicket, IgnoreReason, ObserverId, QueryClient, QuerySnapshot,
    QueryState,
};
pub use query_key::{KeyPart, QueryFilter, QueryKey};
