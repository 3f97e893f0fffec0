//! Upload handler
//!
//! Streams a `multipart/form-data` body into a staging file, validates the
//! declared type and the filename, then renames the staged file into the upload
//! directory. The rename is the only step that touches the upload directory,
//! so a failed or rejected upload never leaves anything visible there.

use crate::config::{AppState, UploadConfig};
use crate::error::Error;
use crate::http;
use crate::logger;
use crate::paths::{resolve_leaf, sanitize_filename};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use multer::{Constraints, Multipart, SizeLimit};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

const SAVE_ERROR: &str = "Error saving file";

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    filename: String,
}

/// A file part that has been fully received into the staging directory
struct StagedUpload {
    original_name: String,
    declared_type: Option<String>,
    size: usize,
    /// Deleted on drop unless persisted
    temp: TempPath,
}

/// POST /upload
pub async fn handle_upload<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match process_upload(req, state).await {
        Ok(filename) => {
            logger::log_info(&format!("Stored upload '{filename}'"));
            http::build_json_response(
                StatusCode::OK,
                &UploadResponse {
                    success: true,
                    filename,
                },
                false,
            )
        }
        Err(err) => {
            log_rejection(&err);
            http::build_json_error(&err)
        }
    }
}

async fn process_upload<B>(req: Request<B>, state: &AppState) -> Result<String, Error>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = state.config.upload.max_size;
    check_content_length(req.headers(), limit)?;
    let boundary = extract_boundary(req.headers())?;

    let staged = receive_file(req.into_body(), boundary, limit, &state.staging_root)
        .await?
        .ok_or(Error::MissingFile)?;

    validate_type(&staged, &state.config.upload)?;

    let filename = sanitize_filename(&staged.original_name)?;
    let destination = resolve_leaf(&state.upload_root, &filename)?;

    logger::log_debug(&format!(
        "Committing upload '{}' ({} bytes) as '{filename}'",
        staged.original_name, staged.size
    ));
    commit(staged.temp, destination).await?;

    Ok(filename)
}

/// Reject bodies that announce a size over the limit before reading them
fn check_content_length(headers: &HeaderMap, limit: u64) -> Result<(), Error> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match declared {
        Some(size) if size > limit => Err(Error::Parse(format!(
            "Request body too large: {size} bytes (max: {limit})"
        ))),
        _ => Ok(()),
    }
}

fn extract_boundary(headers: &HeaderMap) -> Result<String, Error> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Parse("Missing Content-Type header".to_string()))?;

    multer::parse_boundary(content_type)
        .map_err(|_| Error::Parse("Expected multipart/form-data with boundary".to_string()))
}

/// Read the multipart stream, staging the first `file` part that names a file
///
/// Every other part is drained and discarded. Returns `None` when no such
/// part was present.
async fn receive_file<B>(
    body: B,
    boundary: String,
    limit: u64,
    staging_dir: &Path,
) -> Result<Option<StagedUpload>, Error>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
    let mut multipart =
        Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut staged: Option<StagedUpload> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let original_name = match file_name {
            Some(name) if staged.is_none() && field.name() == Some(FILE_FIELD) => name,
            _ => {
                while field.chunk().await?.is_some() {}
                continue;
            }
        };
        let declared_type = field.content_type().map(|m| m.essence_str().to_string());

        let (file, temp) = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(staging_dir)
            .map_err(|e| Error::io(SAVE_ERROR, e))?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut size = 0usize;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len();
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(SAVE_ERROR, e))?;
        }
        file.flush().await.map_err(|e| Error::io(SAVE_ERROR, e))?;

        staged = Some(StagedUpload {
            original_name,
            declared_type,
            size,
            temp,
        });
    }

    Ok(staged)
}

/// The declared type is trusted as sent; content is not sniffed
fn validate_type(staged: &StagedUpload, config: &UploadConfig) -> Result<(), Error> {
    match staged.declared_type.as_deref() {
        Some(declared) if config.is_allowed(declared) => Ok(()),
        other => Err(Error::UnsupportedType(other.map(str::to_string))),
    }
}

/// Atomically rename the staged file over `destination`
async fn commit(temp: TempPath, destination: PathBuf) -> Result<(), Error> {
    tokio::task::spawn_blocking(move || temp.persist(&destination))
        .await
        .map_err(|e| Error::io(SAVE_ERROR, std::io::Error::other(e)))?
        .map_err(|e| Error::io(SAVE_ERROR, e.error))
}

fn log_rejection(err: &Error) {
    match err {
        Error::Io { context, source } => {
            logger::log_error(&format!("Upload failed: {context}: {source}"));
        }
        Error::UnsupportedType(declared) => logger::log_warning(&format!(
            "Upload rejected: declared type {}",
            declared.as_deref().unwrap_or("<none>")
        )),
        other if other.is_client_error() => {
            logger::log_warning(&format!("Upload rejected: {other}"));
        }
        other => logger::log_error(&format!("Upload failed: {other}")),
    }
}
