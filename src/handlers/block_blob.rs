//! Block blob handlers for Azure Blob Storage API.

use axum::{
    body::Body,
    http::{Response, StatusCode},
};
use bytes::Bytes;

use crate::context::RequestContext;
use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::storage::Storage;
use crate::xml::deserialize::BlockListRequest;

use super::{build_response, check_content_md5, common_headers};

/// PUT /{container}/{blob}?comp=block&blockid={id} - Stage block.
pub async fn stage_block(
    ctx: &RequestContext,
    storage: &Storage,
    container: &str,
    blob: &str,
    block_id: &str,
    body: Bytes,
) -> StorageResult<Response<Body>> {
    check_content_md5(ctx, &body)?;

    storage
        .blocks
        .put_block(container, blob, block_id, &body)
        .await?;

    Ok(build_response(
        StatusCode::CREATED,
        common_headers(ctx),
        Body::empty(),
    ))
}

/// PUT /{container}/{blob}?comp=blocklist - Commit block list.
pub async fn commit_block_list(
    ctx: &RequestContext,
    storage: &Storage,
    container: &str,
    blob: &str,
    body: Bytes,
) -> StorageResult<Response<Body>> {
    let xml = std::str::from_utf8(&body).map_err(|_| {
        StorageError::with_message(
            ErrorCode::InvalidXmlDocument,
            "Block list body is not valid UTF-8.",
        )
    })?;
    let block_list = BlockListRequest::parse(xml)?;

    storage
        .blocks
        .commit(container, blob, &block_list.block_ids)
        .await?;

    Ok(build_response(
        StatusCode::CREATED,
        common_headers(ctx),
        Body::empty(),
    ))
}
