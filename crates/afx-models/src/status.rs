//! Client-facing status payload.

use serde::{Deserialize, Serialize};

/// Body returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusView {
    Pending,
    Success { token: String, filename: String },
    Failed { error: String },
}
