//! Job queue and result backend for audio transforms.
//!
//! Producers enqueue [`TransformJob`]s; workers consume them with
//! at-least-once delivery and publish a write-once [`afx_models::JobOutcome`].
//! [`JobQueue`] runs on Redis Streams, [`MemoryJobQueue`] in process.

pub mod broker;
pub mod config;
pub mod error;
pub mod job;
pub mod memory;
pub mod queue;
pub mod results;

pub use broker::JobBroker;
pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use job::{Delivery, TransformJob};
pub use memory::MemoryJobQueue;
pub use queue::JobQueue;
pub use results::ResultBackend;
