//! Path safety module
//!
//! Pure helpers that turn untrusted client input into filesystem paths:
//! - Filename sanitizing for uploaded files
//! - Root-contained path resolution for served files

mod resolve;
mod sanitize;

pub use resolve::{ensure_contained, resolve_leaf, resolve_within};
pub use sanitize::sanitize_filename;
