//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: picks one handler per request,
//! first match wins.

use super::files::{self, UPLOADS_PREFIX};
use super::{listing, upload};
use crate::config::AppState;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Handler selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Upload,
    List,
    UploadedFile,
    Static,
    MethodNotAllowed,
}

impl Route {
    /// Route by method and URI path; the query string plays no part
    ///
    /// Safe methods on an unmatched path (including `GET /upload`) fall
    /// through to static serving. Any other method outside `POST /upload`
    /// is refused.
    pub fn select(method: &Method, path: &str) -> Self {
        let is_read = matches!(*method, Method::GET | Method::HEAD);

        if *method == Method::POST && path == "/upload" {
            Self::Upload
        } else if !is_read {
            Self::MethodNotAllowed
        } else if path == "/files" {
            Self::List
        } else if path.starts_with(UPLOADS_PREFIX) {
            Self::UploadedFile
        } else {
            Self::Static
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let is_head = method == Method::HEAD;

    let response = match Route::select(&method, &path) {
        Route::Upload => upload::handle_upload(req, &state).await,
        Route::List => listing::handle_list(&state, is_head).await,
        Route::UploadedFile => files::serve_upload(&state, &path, is_head).await,
        Route::Static => files::serve_static(&state, &path, is_head).await,
        Route::MethodNotAllowed => {
            logger::log_warning(&format!("Method not allowed: {method} {path}"));
            http::build_405_response()
        }
    };

    Ok(response)
}
