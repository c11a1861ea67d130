//! Filename rules for stored files.
//!
//! A valid name is `<stem>` or `<stem>.<extension>` where the stem matches
//! `[A-Za-z0-9_-]{1,64}`. The extension is whatever follows the last `.` and
//! is not restricted.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::TypeError;

/// Longest permitted stem, in characters.
pub const MAX_STEM_LEN: usize = 64;

fn stem_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!("^[A-Za-z0-9_-]{{1,{MAX_STEM_LEN}}}$")).expect("static pattern")
    })
}

/// The portion of `name` preceding its last `.`, or the whole name when it
/// has no extension.
///
/// ```
/// use blobdir_types::file_stem;
///
/// assert_eq!(file_stem("photo.jpg"), "photo");
/// assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
/// assert_eq!(file_stem("README"), "README");
/// ```
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Validate a filename, returning `Ok(())` if its stem is a valid identifier.
///
/// ```
/// use blobdir_types::validate_file_name;
///
/// assert!(validate_file_name("file.jpg").is_ok());
/// assert!(validate_file_name("no_extension").is_ok());
/// assert!(validate_file_name("!!").is_err());
/// assert!(validate_file_name("").is_err());
/// ```
pub fn validate_file_name(name: &str) -> Result<(), TypeError> {
    let stem = file_stem(name);
    if stem_pattern().is_match(stem) {
        return Ok(());
    }

    let reason = if stem.is_empty() {
        "name must not be empty".to_string()
    } else if stem.chars().count() > MAX_STEM_LEN {
        format!("name must be at most {MAX_STEM_LEN} characters")
    } else {
        "name may only contain letters, digits, '_' and '-'".to_string()
    };
    Err(TypeError::InvalidFileName {
        name: name.to_string(),
        reason,
    })
}
