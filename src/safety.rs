//! Safety utilities to prevent accidental dataset loss.
//!
//! The enrichment run rewrites its output file wholesale on every flush, so
//! an output that points at the source dataset would replace the only copy
//! of the input. That is refused unless the caller opted into in-place
//! updates.

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Same file, comparing canonical paths when both exist
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output must be a `.json` file
/// - Output cannot be the same as any of the source paths, unless
///   `allow_in_place` is set
pub fn validate_output_path(output: &Path, source_paths: &[&Path], allow_in_place: bool) -> Result<()> {
    let is_json = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if !is_json {
        bail!(
            "Safety check failed: output file '{}' must have a .json extension",
            output.display()
        );
    }

    if allow_in_place {
        return Ok(());
    }

    for source in source_paths {
        if same_file(output, source) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}' (pass --in-place to allow)",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}

/// Default output for an input dataset: `<stem>_enriched.json` next to it.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");
    input.with_file_name(format!("{}_enriched.json", stem))
}
