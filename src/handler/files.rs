//! File serving module
//!
//! Serves uploaded files from the upload directory and static assets from the
//! public directory. Both resolve the request lexically first, then check the
//! symlink-resolved path against the real root before reading anything.

use crate::config::AppState;
use crate::error::Error;
use crate::http;
use crate::logger;
use crate::paths::{ensure_contained, resolve_leaf, resolve_within};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Route prefix for uploaded files
pub const UPLOADS_PREFIX: &str = "/uploads/";

const UPLOAD_FALLBACK_TYPE: &str = "application/octet-stream";
const STATIC_FALLBACK_TYPE: &str = "text/plain";

/// GET /uploads/<name>
pub async fn serve_upload(state: &AppState, path: &str, is_head: bool) -> Response<Full<Bytes>> {
    let requested = path.strip_prefix(UPLOADS_PREFIX).unwrap_or_default();

    match load_upload(&state.upload_root, requested).await {
        Ok((file_path, data)) => {
            let content_type =
                http::content_type_for(&file_path).unwrap_or(UPLOAD_FALLBACK_TYPE);
            http::build_file_response(data, content_type, is_head)
        }
        Err(Error::Forbidden) => forbidden(path, is_head),
        Err(err) => {
            logger::log_warning(&format!("Upload not served '{path}': {err}"));
            http::build_text_response(StatusCode::NOT_FOUND, "File not found", is_head)
        }
    }
}

async fn load_upload(root: &Path, requested: &str) -> Result<(PathBuf, Vec<u8>), Error> {
    let name = decode(requested).ok_or(Error::NotFound)?;
    let file_path = resolve_leaf(root, &name)?;
    ensure_real_path_contained(root, &file_path).await?;

    let data = fs::read(&file_path).await.map_err(|e| {
        logger::log_debug(&format!("Upload read failed '{}': {e}", file_path.display()));
        Error::NotFound
    })?;
    Ok((file_path, data))
}

/// Catch-all static asset route
pub async fn serve_static(state: &AppState, path: &str, is_head: bool) -> Response<Full<Bytes>> {
    let Some(decoded) = decode(path) else {
        logger::log_warning(&format!("Undecodable request path: {path}"));
        return http::build_html_404_response(is_head);
    };

    let file_path = match resolve_within(&state.public_root, &decoded) {
        Ok(resolved) => with_index_file(resolved, &state.config.storage.index_files).await,
        Err(_) => return forbidden(path, is_head),
    };

    if ensure_real_path_contained(&state.public_root, &file_path)
        .await
        .is_err()
    {
        return forbidden(path, is_head);
    }

    match fs::read(&file_path).await {
        Ok(data) => {
            let content_type =
                http::content_type_for(&file_path).unwrap_or(STATIC_FALLBACK_TYPE);
            http::build_file_response(data, content_type, is_head)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            logger::log_warning(&format!("Static file not found: {path}"));
            http::build_html_404_response(is_head)
        }
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            http::build_text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server Error: {:?}", e.kind()),
                is_head,
            )
        }
    }
}

/// Directories are served through their first existing index file
///
/// When none exists the first configured name is returned so the read reports
/// not-found instead of failing on a directory.
async fn with_index_file(path: PathBuf, index_files: &[String]) -> PathBuf {
    let is_dir = fs::metadata(&path).await.is_ok_and(|m| m.is_dir());
    if !is_dir {
        return path;
    }

    for index_file in index_files {
        let candidate = path.join(index_file);
        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            return candidate;
        }
    }

    index_files
        .first()
        .map_or(path.clone(), |first| path.join(first))
}

/// Containment check on the symlink-resolved paths
///
/// Paths that do not exist yet pass; the read that follows reports them.
async fn ensure_real_path_contained(root: &Path, path: &Path) -> Result<(), Error> {
    let (Ok(real_root), Ok(real_path)) =
        (fs::canonicalize(root).await, fs::canonicalize(path).await)
    else {
        return Ok(());
    };
    ensure_contained(&real_root, &real_path)
}

fn decode(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(std::borrow::Cow::into_owned)
}

fn forbidden(path: &str, is_head: bool) -> Response<Full<Bytes>> {
    logger::log_warning(&format!("Path traversal attempt blocked: {path}"));
    http::build_text_response(StatusCode::FORBIDDEN, "Forbidden", is_head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        assert_eq!(decode("a%20b.png").as_deref(), Some("a b.png"));
        assert_eq!(decode("..%2F..%2Fetc").as_deref(), Some("../../etc"));
        assert_eq!(decode("plain").as_deref(), Some("plain"));
        assert_eq!(decode("%FF%FE"), None);
    }

    #[tokio::test]
    async fn test_with_index_file() {
        let dir = tempfile::tempdir().unwrap();
        let index_files = vec!["index.html".to_string(), "index.htm".to_string()];

        assert_eq!(
            with_index_file(dir.path().to_path_buf(), &index_files).await,
            dir.path().join("index.html")
        );

        std::fs::write(dir.path().join("index.htm"), b"<p>hi</p>").unwrap();
        assert_eq!(
            with_index_file(dir.path().to_path_buf(), &index_files).await,
            dir.path().join("index.htm")
        );

        let file = dir.path().join("index.htm");
        assert_eq!(with_index_file(file.clone(), &index_files).await, file);
    }
}
