//! Upload validation and filename sanitizing

use crate::error::{Error, Result};

/// Accept only named `.pdf` uploads, returning the filename
///
/// The suffix check is case-sensitive: `paper.PDF` is rejected.
pub fn validate_upload(filename: Option<&str>) -> Result<String> {
    let name = match filename {
        Some(name) if !name.is_empty() => name,
        _ => return Err(Error::validation("File has no name.")),
    };

    if !name.ends_with(".pdf") {
        return Err(Error::validation(format!("File '{}' is not a PDF.", name)));
    }

    Ok(name.to_string())
}

/// Reduce a client filename to a safe basename
///
/// Drops directory components and replaces anything outside `[A-Za-z0-9._-]`
/// with `_`. Leading dots are stripped so the result is never hidden or `..`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.').trim_start_matches('_');
    if trimmed.is_empty() {
        "upload.pdf".to_string()
    } else {
        trimmed.to_string()
    }
}
