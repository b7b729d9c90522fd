//! Blob service error types and error response formatting.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::ext::ReasonPhrase;
use thiserror::Error;

use crate::config::DEFAULT_API_VERSION;

/// Storage error codes surfaced by the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // General errors
    AuthenticationFailed,
    InternalError,
    InvalidResourceName,
    InvalidXmlDocument,
    Md5Mismatch,
    MissingRequiredQueryParameter,
    ResourceNotFound,
    UnsupportedHttpVerb,
    UnsupportedQueryParameter,

    // Blob-specific errors
    BlobNotFound,
    ContainerAlreadyExists,
    ContainerNotFound,
    InvalidBlockList,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationFailed => "AuthenticationFailed",
            ErrorCode::InternalError => "InternalError",
            ErrorCode::InvalidResourceName => "InvalidResourceName",
            ErrorCode::InvalidXmlDocument => "InvalidXmlDocument",
            ErrorCode::Md5Mismatch => "Md5Mismatch",
            ErrorCode::MissingRequiredQueryParameter => "MissingRequiredQueryParameter",
            ErrorCode::ResourceNotFound => "ResourceNotFound",
            ErrorCode::UnsupportedHttpVerb => "UnsupportedHttpVerb",
            ErrorCode::UnsupportedQueryParameter => "UnsupportedQueryParameter",
            ErrorCode::BlobNotFound => "BlobNotFound",
            ErrorCode::ContainerAlreadyExists => "ContainerAlreadyExists",
            ErrorCode::ContainerNotFound => "ContainerNotFound",
            ErrorCode::InvalidBlockList => "InvalidBlockList",
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// Authentication failures are reported as 400 on this surface; no
    /// 401/403 distinction is made.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            ErrorCode::AuthenticationFailed
            | ErrorCode::InvalidResourceName
            | ErrorCode::InvalidXmlDocument
            | ErrorCode::Md5Mismatch
            | ErrorCode::MissingRequiredQueryParameter
            | ErrorCode::UnsupportedHttpVerb
            | ErrorCode::UnsupportedQueryParameter
            | ErrorCode::InvalidBlockList => StatusCode::BAD_REQUEST,

            // 404 Not Found
            ErrorCode::BlobNotFound | ErrorCode::ContainerNotFound | ErrorCode::ResourceNotFound => {
                StatusCode::NOT_FOUND
            }

            // 409 Conflict
            ErrorCode::ContainerAlreadyExists => StatusCode::CONFLICT,

            // 500 Internal Server Error
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationFailed => {
                "Server failed to authenticate the request. Make sure the value of the \
                 Authorization header is formed correctly including the signature."
            }
            ErrorCode::BlobNotFound => "The specified blob does not exist.",
            ErrorCode::ContainerAlreadyExists => "The specified container already exists.",
            ErrorCode::ContainerNotFound => "The specified container does not exist.",
            ErrorCode::InvalidBlockList => "The specified block list is invalid.",
            ErrorCode::InvalidResourceName => {
                "The specified resource name contains invalid characters."
            }
            ErrorCode::InvalidXmlDocument => "The XML request body is invalid.",
            ErrorCode::Md5Mismatch => {
                "The MD5 value specified in the request did not match the MD5 value calculated by the server."
            }
            ErrorCode::MissingRequiredQueryParameter => {
                "A required query parameter was not specified."
            }
            ErrorCode::ResourceNotFound => "The specified resource does not exist.",
            ErrorCode::UnsupportedHttpVerb => {
                "The resource doesn't support the specified HTTP verb."
            }
            ErrorCode::UnsupportedQueryParameter => {
                "One of the query parameters specified in the request URI is not supported."
            }
            ErrorCode::InternalError => {
                "The server encountered an internal error. Please retry the request."
            }
        }
    }
}

/// Storage error with code and message.
#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct StorageError {
    pub code: ErrorCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl StorageError {
    /// Creates a new storage error with the given code and default message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.default_message().to_string(),
            code,
            request_id: None,
        }
    }

    /// Creates a new storage error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: None,
        }
    }

    /// Wraps an unexpected I/O failure as an internal error.
    ///
    /// The failure is logged here so callers only have to propagate it.
    pub fn io(context: &str, err: std::io::Error) -> Self {
        tracing::error!("{}: {}", context, err);
        Self::with_message(ErrorCode::InternalError, format!("{}: {}", context, err))
    }

    /// Sets the request ID for this error.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let request_id = self
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");

        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Error>
  <Code>{}</Code>
  <Message>{}
RequestId:{}
Time:{}</Message>
</Error>"#,
            self.code.as_str(),
            xml_escape(&self.message),
            request_id,
            timestamp
        );

        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/xml"));
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert("x-ms-request-id", value);
        }
        headers.insert("x-ms-version", HeaderValue::from_static(DEFAULT_API_VERSION));
        headers.insert("x-ms-error-code", HeaderValue::from_static(self.code.as_str()));

        let mut response = (status, headers, xml).into_response();

        // Put the message in the HTTP/1.1 status line so clients can see it.
        if let Ok(reason) = ReasonPhrase::try_from(self.message.as_bytes()) {
            response.extensions_mut().insert(reason);
        }

        response
    }
}

/// Escapes special XML characters in a string.
pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
