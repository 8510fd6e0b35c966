//! Request handlers.

pub mod downloads;
pub mod files;
pub mod health;
pub mod jobs;

pub use downloads::*;
pub use files::*;
pub use health::*;
pub use jobs::*;
