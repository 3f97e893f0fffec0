//! HTTP protocol layer module
//!
//! Content-Type lookup and response builders shared by the API and the
//! file-serving handlers.

pub mod mime;
pub mod response;

pub use mime::content_type_for;
pub use response::{
    build_405_response, build_file_response, build_html_404_response, build_json_error,
    build_json_response, build_text_response,
};
