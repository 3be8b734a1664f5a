//! # Shop Sync
//!
//! 後台資料同步：查詢鍵目錄、記錄儲存與物件儲存介面、圖片處理，
//! 以及串接快取與寫入流程的 [`AdminClient`]。

pub mod auth;
pub mod blob;
pub mod client;
pub mod images;
pub mod keys;
pub mod memory;
pub mod store;

// Re-export 主要類型
pub use auth::{require_admin, Actor, SessionProvider, StaticSession};
pub use blob::BlobStore;
pub use client::{AdminClient, QueryData, SaveOutcome};
pub use images::{slugify_brand, ImagePipeline, InlineImage};
pub use keys::QuerySource;
pub use memory::{MemoryBlobStore, MemoryStore};
pub use store::{ListPage, OrderQuery, Pagination, ProductQuery, ProductSort, RecordStore};
