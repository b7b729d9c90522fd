//! Request routing for Azure Blob Storage API.

use axum::{
    body::Body,
    extract::{rejection::PathRejection, DefaultBodyLimit, Path, State},
    http::{HeaderMap, Method, Response, Uri},
    response::IntoResponse,
    routing::any,
    Router,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::authenticate;
use crate::config::{Account, Config};
use crate::context::RequestContext;
use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::handlers;
use crate::storage::Storage;

/// Application state shared between handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub account: Arc<Account>,
    pub storage: Storage,
}

impl AppState {
    /// Endpoint advertised in listing results.
    pub fn service_endpoint(&self) -> String {
        format!(
            "http://{}/{}",
            self.config.blob_bind_address(),
            self.account.name()
        )
    }
}

/// An authenticated request decoded from its method and the `restype`,
/// `comp` and `blockid` query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateContainer {
        container: String,
    },
    ListBlobs {
        container: String,
        prefix: Option<String>,
    },
    GetBlob {
        container: String,
        blob: String,
        content_disposition: Option<String>,
    },
    PutBlob {
        container: String,
        blob: String,
    },
    PutBlock {
        container: String,
        blob: String,
        block_id: String,
    },
    PutBlockList {
        container: String,
        blob: String,
    },
    DeleteBlob {
        container: String,
        blob: String,
    },
}

impl Operation {
    /// Decodes a container-level request.
    pub fn decode_container(ctx: &RequestContext, container: &str) -> StorageResult<Self> {
        let container = container.to_string();
        match (&ctx.method, ctx.restype(), comp(ctx)) {
            (&Method::PUT, Some("container"), None) => Ok(Operation::CreateContainer { container }),
            (&Method::GET, _, None) | (&Method::GET, Some("container"), Some("list")) => {
                Ok(Operation::ListBlobs {
                    container,
                    prefix: ctx
                        .query_param("prefix")
                        .filter(|p| !p.is_empty())
                        .map(str::to_string),
                })
            }
            (&Method::PUT | &Method::GET, _, _) => Err(unsupported_query(ctx)),
            _ => Err(StorageError::new(ErrorCode::UnsupportedHttpVerb)),
        }
    }

    /// Decodes a blob-level request.
    pub fn decode_blob(ctx: &RequestContext, container: &str, blob: &str) -> StorageResult<Self> {
        let container = container.to_string();
        let blob = blob.to_string();
        match (&ctx.method, comp(ctx)) {
            (&Method::GET, None) => Ok(Operation::GetBlob {
                container,
                blob,
                content_disposition: ctx
                    .query_param("rscd")
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
            }),
            (&Method::PUT, None) => Ok(Operation::PutBlob { container, blob }),
            (&Method::PUT, Some("block")) => {
                let block_id = ctx
                    .query_param("blockid")
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        StorageError::with_message(
                            ErrorCode::MissingRequiredQueryParameter,
                            "The blockid query parameter is required.",
                        )
                    })?
                    .to_string();
                Ok(Operation::PutBlock {
                    container,
                    blob,
                    block_id,
                })
            }
            (&Method::PUT, Some("blocklist")) => Ok(Operation::PutBlockList { container, blob }),
            (&Method::DELETE, None) => Ok(Operation::DeleteBlob { container, blob }),
            (&Method::GET | &Method::PUT | &Method::DELETE, _) => Err(unsupported_query(ctx)),
            _ => Err(StorageError::new(ErrorCode::UnsupportedHttpVerb)),
        }
    }

    /// Executes the operation.
    pub async fn dispatch(
        self,
        ctx: &RequestContext,
        state: &AppState,
        body: Bytes,
    ) -> StorageResult<Response<Body>> {
        let storage = &state.storage;
        match self {
            Operation::CreateContainer { container } => {
                handlers::create_container(ctx, storage, &container).await
            }
            Operation::ListBlobs { container, prefix } => {
                handlers::list_blobs(
                    ctx,
                    storage,
                    &state.service_endpoint(),
                    &container,
                    prefix.as_deref(),
                )
                .await
            }
            Operation::GetBlob {
                container,
                blob,
                content_disposition,
            } => {
                handlers::download_blob(
                    ctx,
                    storage,
                    &container,
                    &blob,
                    content_disposition.as_deref(),
                )
                .await
            }
            Operation::PutBlob { container, blob } => {
                handlers::upload_blob(ctx, storage, &container, &blob, body).await
            }
            Operation::PutBlock {
                container,
                blob,
                block_id,
            } => handlers::stage_block(ctx, storage, &container, &blob, &block_id, body).await,
            Operation::PutBlockList { container, blob } => {
                handlers::commit_block_list(ctx, storage, &container, &blob, body).await
            }
            Operation::DeleteBlob { container, blob } => {
                handlers::delete_blob(ctx, storage, &container, &blob).await
            }
        }
    }
}

/// The `comp` parameter, with an empty value treated as absent.
fn comp(ctx: &RequestContext) -> Option<&str> {
    ctx.comp().filter(|c| !c.is_empty())
}

fn unsupported_query(ctx: &RequestContext) -> StorageError {
    StorageError::with_message(
        ErrorCode::UnsupportedQueryParameter,
        format!(
            "Unsupported {} request with restype={:?} comp={:?}",
            ctx.method,
            ctx.restype().unwrap_or(""),
            ctx.comp().unwrap_or("")
        ),
    )
}

/// Creates the main router for the blob service.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_size;
    Router::new()
        // Container-level routes
        .route("/:account/:container", any(container_handler))
        // Blob-level routes (with catch-all for blob path)
        .route("/:account/:container/*blob", any(blob_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Handler for container-level operations.
async fn container_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    body: Bytes,
) -> Response<Body> {
    handle(state, method, uri, headers, params, body).await
}

/// Handler for blob-level operations.
async fn blob_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    body: Bytes,
) -> Response<Body> {
    handle(state, method, uri, headers, params, body).await
}

async fn handle(
    state: AppState,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    body: Bytes,
) -> Response<Body> {
    let Path(params) = match params {
        Ok(params) => params,
        Err(e) => {
            warn!("Rejected undecodable path {}: {}", uri.path(), e);
            return StorageError::new(ErrorCode::InvalidResourceName).into_response();
        }
    };

    if params.get("account").map(String::as_str) != Some(state.account.name()) {
        return not_found(&method, &uri).into_response();
    }

    let container = params.get("container").cloned();
    let blob = params.get("blob").cloned();
    let ctx = RequestContext::new(method, uri, headers, container, blob);

    match route_request(&ctx, &state, body).await {
        Ok(response) => response,
        Err(e) => e.with_request_id(&ctx.request_id).into_response(),
    }
}

/// Authenticates, decodes and dispatches a request.
async fn route_request(
    ctx: &RequestContext,
    state: &AppState,
    body: Bytes,
) -> StorageResult<Response<Body>> {
    let auth = authenticate(ctx, &state.account)?;
    debug!(
        "Authenticated {} {} for {} via {:?}",
        ctx.method,
        ctx.uri.path(),
        auth.account,
        auth.mode
    );

    let operation = match (ctx.container.as_deref(), ctx.blob.as_deref()) {
        (Some(container), Some(blob)) => Operation::decode_blob(ctx, container, blob)?,
        (Some(container), None) => Operation::decode_container(ctx, container)?,
        _ => return Err(not_found(&ctx.method, &ctx.uri)),
    };

    operation.dispatch(ctx, state, body).await
}

/// Fallback for routes outside the blob API surface.
async fn not_found_handler(method: Method, uri: Uri) -> Response<Body> {
    not_found(&method, &uri).into_response()
}

fn not_found(method: &Method, uri: &Uri) -> StorageError {
    warn!("No route for {} {}", method, uri.path());
    StorageError::new(ErrorCode::ResourceNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{build_string_to_sign, sign_string};
    use axum::http::{HeaderValue, Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn context(method: Method, uri: &str, container: &str, blob: Option<&str>) -> RequestContext {
        RequestContext::new(
            method,
            uri.parse().unwrap(),
            HeaderMap::new(),
            Some(container.to_string()),
            blob.map(str::to_string),
        )
    }

    fn decode_container(method: Method, query: &str) -> StorageResult<Operation> {
        let ctx = context(method, &format!("/devstoreaccount1/c1{}", query), "c1", None);
        Operation::decode_container(&ctx, "c1")
    }

    fn decode_blob(method: Method, query: &str) -> StorageResult<Operation> {
        let ctx = context(
            method,
            &format!("/devstoreaccount1/c1/b1{}", query),
            "c1",
            Some("b1"),
        );
        Operation::decode_blob(&ctx, "c1", "b1")
    }

    #[test]
    fn test_decode_container_operations() {
        assert_eq!(
            decode_container(Method::PUT, "?restype=container").unwrap(),
            Operation::CreateContainer {
                container: "c1".to_string()
            }
        );
        assert_eq!(
            decode_container(Method::GET, "?prefix=logs").unwrap(),
            Operation::ListBlobs {
                container: "c1".to_string(),
                prefix: Some("logs".to_string())
            }
        );
        assert!(matches!(
            decode_container(Method::GET, "?restype=container&comp=list").unwrap(),
            Operation::ListBlobs { prefix: None, .. }
        ));
        assert!(matches!(
            decode_container(Method::PUT, "?restype=container&comp=").unwrap(),
            Operation::CreateContainer { .. }
        ));
    }

    #[test]
    fn test_decode_container_rejections() {
        for (method, query) in [
            (Method::PUT, ""),
            (Method::PUT, "?restype=directory"),
            (Method::PUT, "?restype=container&comp=metadata"),
            (Method::GET, "?restype=container&comp=acl"),
        ] {
            let err = decode_container(method, query).unwrap_err();
            assert_eq!(err.code, ErrorCode::UnsupportedQueryParameter, "{}", query);
        }
        let err = decode_container(Method::DELETE, "?restype=container").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedHttpVerb);
    }

    #[test]
    fn test_decode_blob_operations() {
        assert!(matches!(
            decode_blob(Method::GET, "?rscd=attachment").unwrap(),
            Operation::GetBlob { content_disposition: Some(ref d), .. } if d == "attachment"
        ));
        assert!(matches!(
            decode_blob(Method::PUT, "").unwrap(),
            Operation::PutBlob { .. }
        ));
        assert_eq!(
            decode_blob(Method::PUT, "?comp=block&blockid=QUFB").unwrap(),
            Operation::PutBlock {
                container: "c1".to_string(),
                blob: "b1".to_string(),
                block_id: "QUFB".to_string()
            }
        );
        assert!(matches!(
            decode_blob(Method::PUT, "?comp=blocklist").unwrap(),
            Operation::PutBlockList { .. }
        ));
        assert!(matches!(
            decode_blob(Method::DELETE, "").unwrap(),
            Operation::DeleteBlob { .. }
        ));
    }

    #[test]
    fn test_decode_blob_rejections() {
        for query in ["?comp=block", "?comp=block&blockid="] {
            let err = decode_blob(Method::PUT, query).unwrap_err();
            assert_eq!(err.code, ErrorCode::MissingRequiredQueryParameter);
        }
        for (method, query) in [
            (Method::PUT, "?comp=metadata"),
            (Method::GET, "?comp=blocklist"),
            (Method::DELETE, "?comp=block"),
        ] {
            let err = decode_blob(method, query).unwrap_err();
            assert_eq!(err.code, ErrorCode::UnsupportedQueryParameter, "{}", query);
        }
        let err = decode_blob(Method::POST, "").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedHttpVerb);
    }

    struct TestApp {
        _dir: TempDir,
        root: std::path::PathBuf,
        account: Account,
        router: Router,
    }

    async fn app() -> TestApp {
        let dir = TempDir::new().unwrap();
        let config = Config {
            location: dir.path().to_path_buf(),
            ..Config::default()
        };
        let account = Account::from_config(&config.account).unwrap();
        let storage = Storage::new(config.blob_root());
        storage.init().await.unwrap();
        let root = config.blob_root();

        let router = create_router(AppState {
            config: Arc::new(config),
            account: Arc::new(account.clone()),
            storage,
        });
        TestApp {
            _dir: dir,
            root,
            account,
            router,
        }
    }

    /// Builds a SharedKey-signed request for a raw, unnormalized URI.
    fn signed(account: &Account, method: Method, uri: &str, body: &'static [u8]) -> Request<Body> {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-version", HeaderValue::from_static("2021-10-04"));
        if !body.is_empty() {
            headers.insert("content-length", HeaderValue::from(body.len()));
        }
        let ctx = RequestContext::new(method.clone(), uri.parse().unwrap(), headers.clone(), None, None);
        let signature = sign_string(&build_string_to_sign(&ctx, account.name()), account.key()).unwrap();

        let mut request = Request::builder().method(method).uri(uri);
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        request
            .header(
                "authorization",
                format!("SharedKey {}:{}", account.name(), signature),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
        app.router.clone().oneshot(request).await.unwrap()
    }

    async fn error_code(response: Response<Body>) -> String {
        response
            .headers()
            .get("x-ms-error-code")
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_round_trip_through_router() {
        let app = app().await;
        let account = app.account.clone();

        let response = send(&app, signed(&account, Method::PUT, "/devstoreaccount1/c1?restype=container", b"")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("x-ms-request-id"));

        let response = send(&app, signed(&account, Method::PUT, "/devstoreaccount1/c1/b1", b"hello")).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = send(&app, signed(&account, Method::GET, "/devstoreaccount1/c1/b1", b"")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn test_traversal_rejected_on_every_endpoint() {
        let app = app().await;
        let account = app.account.clone();
        send(&app, signed(&account, Method::PUT, "/devstoreaccount1/c1?restype=container", b"")).await;

        let cases: Vec<(Method, &str, &'static [u8])> = vec![
            (Method::PUT, "/devstoreaccount1/%2E%2E?restype=container", b""),
            (Method::GET, "/devstoreaccount1/%2e%2e?restype=container&comp=list", b""),
            (Method::PUT, "/devstoreaccount1/../escape?restype=container", b""),
            (Method::PUT, "/devstoreaccount1/c1/..%2F..%2Fescape", b"data"),
            (Method::GET, "/devstoreaccount1/c1/..%2F..%2Fescape", b""),
            (Method::DELETE, "/devstoreaccount1/c1/..%2F..%2Fescape", b""),
            (Method::PUT, "/devstoreaccount1/c1/b1?comp=block&blockid=..%2F..%2Fescape", b"data"),
            (Method::PUT, "/devstoreaccount1/c1/b1?comp=block&blockid=..", b"data"),
            (Method::PUT, "/devstoreaccount1/%2E%2E/b1?comp=blocklist", b"<BlockList></BlockList>"),
        ];

        for (method, uri, body) in cases {
            let response = send(&app, signed(&account, method.clone(), uri, body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
            assert_eq!(error_code(response).await, "InvalidResourceName", "{} {}", method, uri);
        }

        let parent = app.root.parent().unwrap();
        assert!(!parent.join("escape").exists());
        assert!(!app.root.join("escape").exists());
    }

    #[tokio::test]
    async fn test_unknown_routes_not_found() {
        let app = app().await;
        let account = app.account.clone();

        for uri in ["/", "/devstoreaccount1", "/otheraccount/c1?restype=container"] {
            let response = send(&app, signed(&account, Method::GET, uri, b"")).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(error_code(response).await, "ResourceNotFound");
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_request_rejected() {
        let app = app().await;
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/devstoreaccount1/c1?restype=container")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "AuthenticationFailed");
        assert!(!app.root.join("c1").exists());
    }
}
