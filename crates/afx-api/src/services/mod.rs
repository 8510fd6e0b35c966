//! Business logic behind the handlers.

pub mod audio;

pub use audio::{AudioService, FileDownload};
