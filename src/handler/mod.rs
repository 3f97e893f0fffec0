//! Request handler module
//!
//! Routes each request to exactly one handler: multipart upload, upload
//! listing, uploaded-file serving, or static asset serving.

mod files;
mod listing;
pub mod router;
mod upload;

// Re-export main entry point
pub use router::handle_request;
