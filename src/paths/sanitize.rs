//! Filename sanitizer
//!
//! Reduces a client-supplied filename to a basename that is safe to create on
//! common filesystems.

use crate::error::Error;

/// Longest filename accepted by ext4, NTFS and APFS
const MAX_NAME_BYTES: usize = 255;

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitize an untrusted filename
///
/// Keeps only the last path component, strips characters that are illegal on
/// Windows or Unix, drops trailing dots and spaces, and rejects names that
/// refer to directories or device files.
///
/// # Examples
/// - `"../../etc/passwd"` -> `"passwd"`
/// - `"a b.png"` -> `"a b.png"`
/// - `"..\\"` -> `Err(Error::InvalidName)`
pub fn sanitize_filename(input: &str) -> Result<String, Error> {
    let leaf = input.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = leaf
        .chars()
        .filter(|c| !c.is_control() && !ILLEGAL_CHARS.contains(c))
        .collect();

    let truncated = truncate_to_boundary(trim_trailing(&cleaned), MAX_NAME_BYTES);
    let name = trim_trailing(truncated);

    if name.is_empty() || name == "." || name == ".." || is_reserved(name) {
        return Err(Error::InvalidName);
    }

    Ok(name.to_string())
}

fn trim_trailing(name: &str) -> &str {
    name.trim_end_matches(['.', ' '])
}

fn truncate_to_boundary(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Windows device names are reserved with or without an extension
fn is_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED_NAMES
        .iter()
        .any(|reserved| stem.eq_ignore_ascii_case(reserved))
}
