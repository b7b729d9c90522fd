//! Request handlers for Azure Blob Storage API.

mod blob;
mod block_blob;
mod container;

pub use blob::*;
pub use block_blob::*;
pub use container::*;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Response, StatusCode};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use md5::{Digest, Md5};

use crate::config::DEFAULT_API_VERSION;
use crate::context::{format_http_date, RequestContext};
use crate::error::{ErrorCode, StorageError, StorageResult};

/// Value of the `Server` response header.
pub const SERVER_HEADER: &str = concat!("Azurite-Blob-Fs/", env!("CARGO_PKG_VERSION"));

/// Creates common response headers for Azure Blob Storage API responses.
pub fn common_headers(ctx: &RequestContext) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, "x-ms-request-id", &ctx.request_id);
    headers.insert("x-ms-version", HeaderValue::from_static(DEFAULT_API_VERSION));
    insert_header(&mut headers, "date", &format_http_date(&Utc::now()));
    headers.insert("server", HeaderValue::from_static(SERVER_HEADER));
    headers
}

/// Inserts a header, dropping values that are not valid header text.
pub fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!("Dropping invalid {} header value {:?}", name, value),
    }
}

/// Builds a response with the given status, headers, and body.
pub fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Validates the request body against a `Content-MD5` header, if one is set.
pub fn check_content_md5(ctx: &RequestContext, body: &[u8]) -> StorageResult<()> {
    if let Some(expected_md5) = ctx.content_md5() {
        let computed_md5 = BASE64.encode(Md5::digest(body));
        if computed_md5 != expected_md5 {
            return Err(StorageError::new(ErrorCode::Md5Mismatch));
        }
    }
    Ok(())
}
