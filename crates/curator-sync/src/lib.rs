//! Sync layer: the collections platform seam, push/merge planning, and the HTTP client.

mod error;
pub mod http;
pub mod plan;
pub mod platform;

pub use error::SyncError;
pub use http::{DEFAULT_API_BASE, PlatformClient};
pub use plan::{NameIndex, PushOp, PushPlan, PushReport, execute, mark_pushed, plan_merge, plan_push};
pub use platform::{CollectionPlatform, Library, fetch_collections, fetch_library};
