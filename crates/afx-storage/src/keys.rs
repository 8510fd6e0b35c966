//! Key layout shared by the API and the worker.

/// File reference: `(user, file id) -> storage path`.
///
/// Unprefixed; file ids never contain `:` (see `is_bare_filename` in the API),
/// so these keys cannot collide with another user's or with `temp_download:*`.
pub fn file_ref(user_id: &str, file_id: &str) -> String {
    format!("{user_id}:{file_id}")
}

/// Redemption token: `token -> storage path`.
pub fn download_token(token: &str) -> String {
    format!("temp_download:{token}")
}

/// Pending marker written when a job is enqueued.
pub fn job_marker(job_id: &str) -> String {
    format!("afx:job:{job_id}")
}

/// Terminal result of a job.
pub fn job_result(job_id: &str) -> String {
    format!("afx:result:{job_id}")
}

/// Per-user history list.
pub fn history(user_id: &str) -> String {
    format!("afx:history:{user_id}")
}
