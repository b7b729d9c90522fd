//! Blob-level handlers for Azure Blob Storage API.

use axum::{
    body::Body,
    http::{HeaderValue, Response, StatusCode},
};
use bytes::Bytes;

use crate::context::{format_http_date, RequestContext};
use crate::error::StorageResult;
use crate::storage::Storage;

use super::{build_response, check_content_md5, common_headers, insert_header};

/// GET /{container}/{blob} - Download blob.
///
/// A `rscd` query parameter is echoed back as `Content-Disposition`.
pub async fn download_blob(
    ctx: &RequestContext,
    storage: &Storage,
    container: &str,
    blob: &str,
    content_disposition: Option<&str>,
) -> StorageResult<Response<Body>> {
    let blob = storage.blobs.get(container, blob).await?;

    let mut headers = common_headers(ctx);
    insert_header(
        &mut headers,
        "content-length",
        &blob.properties.content_length.to_string(),
    );
    insert_header(
        &mut headers,
        "last-modified",
        &format_http_date(&blob.properties.last_modified),
    );
    headers.insert(
        "Content-Type",
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        "x-ms-blob-type",
        HeaderValue::from_static(blob.properties.blob_type.as_str()),
    );
    if let Some(disposition) = content_disposition {
        insert_header(&mut headers, "content-disposition", disposition);
    }

    Ok(build_response(StatusCode::OK, headers, Body::from(blob.data)))
}

/// PUT /{container}/{blob} - Upload a whole blob in one request.
pub async fn upload_blob(
    ctx: &RequestContext,
    storage: &Storage,
    container: &str,
    blob: &str,
    body: Bytes,
) -> StorageResult<Response<Body>> {
    check_content_md5(ctx, &body)?;

    storage.blobs.put(container, blob, &body).await?;

    let mut headers = common_headers(ctx);
    insert_header(&mut headers, "last-modified", &format_http_date(&ctx.timestamp));

    Ok(build_response(StatusCode::CREATED, headers, Body::empty()))
}

/// DELETE /{container}/{blob} - Delete blob.
pub async fn delete_blob(
    ctx: &RequestContext,
    storage: &Storage,
    container: &str,
    blob: &str,
) -> StorageResult<Response<Body>> {
    storage.blobs.delete(container, blob).await?;

    Ok(build_response(
        StatusCode::ACCEPTED,
        common_headers(ctx),
        Body::empty(),
    ))
}
