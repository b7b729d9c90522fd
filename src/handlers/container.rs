//! Container-level handlers for Azure Blob Storage API.

use axum::{
    body::Body,
    http::{HeaderValue, Response, StatusCode},
};

use crate::context::RequestContext;
use crate::error::StorageResult;
use crate::storage::Storage;
use crate::xml::serialize::serialize_blob_list;

use super::{build_response, common_headers};

/// PUT /{container}?restype=container - Create container.
pub async fn create_container(
    ctx: &RequestContext,
    storage: &Storage,
    container: &str,
) -> StorageResult<Response<Body>> {
    storage.containers.create(container).await?;

    Ok(build_response(
        StatusCode::CREATED,
        common_headers(ctx),
        Body::empty(),
    ))
}

/// GET /{container}?restype=container&comp=list - List blobs.
pub async fn list_blobs(
    ctx: &RequestContext,
    storage: &Storage,
    service_endpoint: &str,
    container: &str,
    prefix: Option<&str>,
) -> StorageResult<Response<Body>> {
    let blobs = storage.blobs.list(container, prefix).await?;
    let xml = serialize_blob_list(&blobs, prefix, service_endpoint, container);

    let mut headers = common_headers(ctx);
    headers.insert("Content-Type", HeaderValue::from_static("application/xml"));

    Ok(build_response(StatusCode::OK, headers, Body::from(xml)))
}
