//! HTTP response building module
//!
//! API endpoints answer with JSON; file-serving endpoints answer with raw file
//! bytes or short plain/HTML bodies. Every builder sets `Content-Length` and
//! drops the body for HEAD requests.

use crate::error::Error;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;

const JSON_CONTENT_TYPE: &str = "application/json";
const NOT_FOUND_HTML: &str = "<h1>404 - File Not Found</h1>";

/// Build a response with the given status, type and body
fn build_response(
    status: StatusCode,
    content_type: &str,
    body: Bytes,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = body.len();
    let body = if is_head { Bytes::new() } else { body };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            fallback_response(status)
        })
}

/// Build a JSON response from any serializable value
pub fn build_json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
    is_head: bool,
) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => build_response(status, JSON_CONTENT_TYPE, Bytes::from(body), is_head),
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize JSON response: {e}"));
            fallback_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Build the `{"error": <message>}` envelope used by the API endpoints
pub fn build_json_error(err: &Error) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": err.to_string() });
    build_json_response(err.status(), &body, false)
}

/// Build a plain-text response
pub fn build_text_response(
    status: StatusCode,
    body: impl Into<Bytes>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    build_response(status, "text/plain; charset=utf-8", body.into(), is_head)
}

/// Build the HTML 404 page used by static serving
pub fn build_html_404_response(is_head: bool) -> Response<Full<Bytes>> {
    build_response(
        StatusCode::NOT_FOUND,
        "text/html",
        Bytes::from_static(NOT_FOUND_HTML.as_bytes()),
        is_head,
    )
}

/// Build a 200 response carrying a file's contents
pub fn build_file_response(
    data: Vec<u8>,
    content_type: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    build_response(StatusCode::OK, content_type, Bytes::from(data), is_head)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    let mut resp = build_text_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "405 Method Not Allowed",
        false,
    );
    resp.headers_mut()
        .insert(ALLOW, hyper::header::HeaderValue::from_static("GET, HEAD, POST"));
    resp
}

fn fallback_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = status;
    resp
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
