//! SharedKey authentication for the Blob Storage API.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::borrow::Cow;
use std::collections::BTreeMap;

use axum::http::HeaderMap;

use crate::config::Account;
use crate::context::RequestContext;
use crate::error::{ErrorCode, StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

/// Standard headers folded into the string-to-sign, in signing order.
const SIGNED_HEADERS: [&str; 11] = [
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
    "range",
];

/// Headers with this prefix are signed as canonicalized headers.
pub const CANONICAL_HEADER_PREFIX: &str = "x-ms-";

/// Validates SharedKey authentication.
pub fn validate_shared_key(ctx: &RequestContext, account: &Account) -> StorageResult<()> {
    let auth_header = ctx
        .header("authorization")
        .ok_or_else(|| auth_failed("Authorization header is missing"))?;

    // "SharedKey account:signature"
    let (scheme, credentials) = auth_header
        .split_once(' ')
        .ok_or_else(|| auth_failed("Authorization header is malformed"))?;

    if scheme != "SharedKey" {
        return Err(auth_failed("Authorization header wasn't using SharedKey"));
    }

    let (name, signature) = credentials
        .split_once(':')
        .ok_or_else(|| auth_failed("Authorization header is malformed"))?;

    if name != account.name() {
        return Err(auth_failed("Authorization header names an unknown account"));
    }

    let provided = BASE64
        .decode(signature)
        .map_err(|_| auth_failed("SharedKey wasn't valid base64"))?;

    let string_to_sign = build_string_to_sign(ctx, account.name());

    if !verify_signature(account.key(), &string_to_sign, &provided) {
        tracing::debug!("SharedKey string-to-sign: {:?}", string_to_sign);
        return Err(auth_failed("SharedKey wasn't valid"));
    }

    Ok(())
}

/// Builds the string-to-sign for SharedKey authentication.
pub fn build_string_to_sign(ctx: &RequestContext, account_name: &str) -> String {
    let mut result = String::new();

    result.push_str(ctx.method.as_str());
    result.push('\n');

    for name in SIGNED_HEADERS {
        let value = header_value(&ctx.headers, name);
        // A zero Content-Length is signed as if the header were absent.
        if name == "content-length" && value == "0" {
            result.push('\n');
            continue;
        }
        result.push_str(&value);
        result.push('\n');
    }

    result.push_str(&build_canonicalized_headers(&ctx.headers));
    result.push_str(&build_canonicalized_resource(ctx, account_name));
    result
}

/// Builds the canonicalized headers: each `x-ms-` header as `name:value\n`,
/// sorted by lower-cased name.
fn build_canonicalized_headers(headers: &HeaderMap) -> String {
    // Header names are stored lower-cased and `keys` yields each name once.
    let mut names: Vec<&str> = headers
        .keys()
        .map(|name| name.as_str())
        .filter(|name| name.starts_with(CANONICAL_HEADER_PREFIX))
        .collect();
    names.sort_unstable();

    let mut result = String::new();
    for name in names {
        result.push_str(name);
        result.push(':');
        result.push_str(&header_value(headers, name));
        result.push('\n');
    }
    result
}

/// Builds the canonicalized resource: `/{account}{escaped path}` followed by
/// the query parameters, one `name:v1,v2` line each.
fn build_canonicalized_resource(ctx: &RequestContext, account_name: &str) -> String {
    let mut resource = format!("/{}{}\n", account_name, ctx.uri.path());

    let mut params: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (name, value) in ctx.query.iter() {
        params.entry(name.to_lowercase()).or_default().push(value);
    }

    let lines: Vec<String> = params
        .iter()
        .map(|(name, values)| format!("{}:{}", name, values.join(",")))
        .collect();
    resource.push_str(&lines.join("\n"));

    resource.trim_end_matches('\n').to_string()
}

/// Returns the first value of a header, or the empty string.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Cow<'a, str> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .unwrap_or(Cow::Borrowed(""))
}

/// Computes the base64 HMAC-SHA256 signature of a string-to-sign.
pub fn sign_string(string_to_sign: &str, key: &[u8]) -> StorageResult<String> {
    Ok(BASE64.encode(compute_mac(string_to_sign, key)?))
}

/// Compares a provided signature against the expected HMAC in constant time.
pub(crate) fn verify_signature(key: &[u8], string_to_sign: &str, provided: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(string_to_sign.as_bytes());
    mac.verify_slice(provided).is_ok()
}

fn compute_mac(string_to_sign: &str, key: &[u8]) -> StorageResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| {
        StorageError::with_message(ErrorCode::InternalError, "Failed to create HMAC")
    })?;
    mac.update(string_to_sign.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn auth_failed(reason: &str) -> StorageError {
    tracing::warn!("Authentication failed: {}", reason);
    StorageError::new(ErrorCode::AuthenticationFailed)
}
