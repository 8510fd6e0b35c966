//! Output file naming.

use std::path::Path;

use afx_models::EffectKind;

use crate::error::{MediaError, MediaResult};

/// Extension of every produced file.
pub const OUTPUT_EXTENSION: &str = "mp3";

/// Name of the file produced from `input` by `kind`: `<stem>_<suffix>.mp3`.
///
/// Deterministic, so running the same job twice overwrites one artifact.
pub fn output_filename(input: &Path, kind: EffectKind) -> MediaResult<String> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MediaError::InvalidInput(input.display().to_string()))?;

    Ok(format!("{stem}_{}.{OUTPUT_EXTENSION}", kind.output_suffix()))
}
