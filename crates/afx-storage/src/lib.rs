//! Storage for the audio effects service.
//!
//! - [`EphemeralStore`]: TTL-bounded key/value map (Redis or in-process)
//! - [`FileRefs`]: user-scoped `(user, file id) -> path` references
//! - [`DeliveryTokens`]: short-lived bearer tokens for produced files
//! - [`BlobStore`]: local filesystem for uploads and outputs
//! - [`HistorySink`]: append-only processing history

pub mod blob;
pub mod config;
pub mod delivery;
pub mod error;
pub mod file_refs;
pub mod history;
pub mod keys;
pub mod kv;

pub use blob::{new_file_id, sanitize_stem, BlobStore};
pub use config::StorageConfig;
pub use delivery::{DeliveryToken, DeliveryTokens};
pub use error::{StorageError, StorageResult};
pub use file_refs::FileRefs;
pub use history::{HistorySink, MemoryHistory, RedisHistory};
pub use kv::{EphemeralStore, MemoryStore, RedisStore};
