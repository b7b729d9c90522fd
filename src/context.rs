//! Request context extraction and handling.

use axum::http::{header::HeaderMap, Method, Uri};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Decoded query parameters in request order.
///
/// Names are case-sensitive and may repeat; the canonicalized resource of a
/// SharedKey signature needs every value, so nothing is collapsed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parses a raw (still percent-encoded) query string.
    pub fn parse(query: &str) -> Self {
        Self(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    /// Parses the query component of a URI.
    pub fn from_uri(uri: &Uri) -> Self {
        uri.query().map(Self::parse).unwrap_or_default()
    }

    /// Returns the first value of a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first value of a parameter, or the empty string.
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Extracted request context: the read-only view of a request that the
/// authentication verifier signs and the handlers act on.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request ID.
    pub request_id: String,
    /// HTTP method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Container name (if present).
    pub container: Option<String>,
    /// Blob name (if present).
    pub blob: Option<String>,
    /// Query parameters.
    pub query: QueryParams,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request timestamp.
    pub timestamp: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context from request parts.
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        container: Option<String>,
        blob: Option<String>,
    ) -> Self {
        let query = QueryParams::from_uri(&uri);
        Self {
            request_id: Uuid::new_v4().to_string(),
            method,
            uri,
            container,
            blob,
            query,
            headers,
            timestamp: Utc::now(),
        }
    }

    /// Returns the first value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name)
    }

    /// Returns the value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-MD5 header value.
    pub fn content_md5(&self) -> Option<&str> {
        self.header("content-md5")
    }

    /// Returns the restype query parameter.
    pub fn restype(&self) -> Option<&str> {
        self.query_param("restype")
    }

    /// Returns the comp query parameter.
    pub fn comp(&self) -> Option<&str> {
        self.query_param("comp")
    }
}

/// Formats a DateTime as RFC 1123 format for HTTP headers.
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Formats a DateTime as ISO 8601 with seven fractional digits.
pub fn format_iso8601(dt: &DateTime<Utc>) -> String {
    format!(
        "{}.{:07}Z",
        dt.format("%Y-%m-%dT%H:%M:%S"),
        dt.timestamp_subsec_nanos() / 100
    )
}
