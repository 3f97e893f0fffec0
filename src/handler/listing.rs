//! Listing handler
//!
//! GET /files returns the names in the upload directory as a JSON array, in
//! directory enumeration order (not sorted).

use crate::config::AppState;
use crate::error::Error;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::path::Path;
use tokio::fs;

const LIST_ERROR: &str = "Error reading files";

pub async fn handle_list(state: &AppState, is_head: bool) -> Response<Full<Bytes>> {
    match list_uploads(&state.upload_root).await {
        Ok(names) => http::build_json_response(StatusCode::OK, &names, is_head),
        Err(err) => {
            if let Error::Io { source, .. } = &err {
                logger::log_error(&format!(
                    "Failed to list '{}': {source}",
                    state.upload_root.display()
                ));
            }
            http::build_json_error(&err)
        }
    }
}

/// Non-recursive listing of every entry directly under `dir`
pub async fn list_uploads(dir: &Path) -> Result<Vec<String>, Error> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| Error::io(LIST_ERROR, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io(LIST_ERROR, e))?
    {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}
