//! Common test utilities.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use reqwest::{Method, Response, Url};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::net::TcpListener;

use azurite_fs::{BlobServer, Config};

type HmacSha256 = Hmac<Sha256>;

pub const API_VERSION: &str = "2021-10-04";

/// Headers covered by a SharedKey signature, in signing order.
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

/// Test server wrapper.
pub struct TestServer {
    pub base_url: String,
    pub account: String,
    pub key: String,
    client: reqwest::Client,
    dir: TempDir,
}

impl TestServer {
    /// Creates and starts a test server on a random port with an empty
    /// workspace directory.
    pub async fn start() -> Self {
        let dir = TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = Config {
            host: "127.0.0.1".to_string(),
            blob_port: port,
            location: dir.path().to_path_buf(),
            ..Config::default()
        };

        let account = config.account.name.clone();
        let key = config.account.key.clone();
        let base_url = format!("http://127.0.0.1:{}", port);

        let server = BlobServer::new(config).unwrap();

        // Start server in background
        tokio::spawn(async move {
            server.serve(listener).await.unwrap();
        });

        Self {
            base_url,
            account,
            key,
            client: reqwest::Client::new(),
            dir,
        }
    }

    /// Directory holding all containers.
    pub fn blob_root(&self) -> PathBuf {
        self.dir.path().join("blob")
    }

    /// Returns the URL for a container.
    pub fn container_url(&self, container: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.account, container)
    }

    /// Returns the URL for a blob.
    pub fn blob_url(&self, container: &str, blob: &str) -> String {
        format!("{}/{}/{}/{}", self.base_url, self.account, container, blob)
    }

    /// Sends a SharedKey-signed request.
    pub async fn send(&self, method: Method, url: &str, body: impl Into<Vec<u8>>) -> Response {
        self.send_with_headers(method, url, body, &[]).await
    }

    /// Sends a SharedKey-signed request with extra headers.
    pub async fn send_with_headers(
        &self,
        method: Method,
        url: &str,
        body: impl Into<Vec<u8>>,
        extra_headers: &[(&str, &str)],
    ) -> Response {
        let body = body.into();
        let url = Url::parse(url).unwrap();
        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();

        let mut headers: Vec<(String, String)> = vec![
            ("x-ms-date".to_string(), date),
            ("x-ms-version".to_string(), API_VERSION.to_string()),
        ];
        for (name, value) in extra_headers {
            headers.push((name.to_lowercase(), value.to_string()));
        }

        let mut signed = headers.clone();
        if !body.is_empty() {
            signed.push(("content-length".to_string(), body.len().to_string()));
        }
        let authorization = create_auth_header(&method, &url, &signed, &self.account, &self.key);

        let mut request = self
            .client
            .request(method, url)
            .header("authorization", authorization)
            .body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request.send().await.unwrap()
    }

    /// Sends a request with no credentials.
    pub async fn send_anonymous(&self, method: Method, url: &str) -> Response {
        self.client.request(method, url).send().await.unwrap()
    }

    /// Creates a container, asserting success.
    pub async fn create_container(&self, container: &str) {
        let url = format!("{}?restype=container", self.container_url(container));
        let response = self.send(Method::PUT, &url, Vec::<u8>::new()).await;
        assert_eq!(response.status(), 201, "create container {}", container);
    }

    /// Uploads a whole blob, asserting success.
    pub async fn put_blob(&self, container: &str, blob: &str, data: &[u8]) {
        let response = self
            .send(Method::PUT, &self.blob_url(container, blob), data.to_vec())
            .await;
        assert_eq!(response.status(), 201, "put blob {}/{}", container, blob);
    }

    /// Stages a block, returning the response.
    pub async fn put_block(
        &self,
        container: &str,
        blob: &str,
        block_id: &str,
        data: &[u8],
    ) -> Response {
        let mut url = Url::parse(&self.blob_url(container, blob)).unwrap();
        url.query_pairs_mut()
            .append_pair("comp", "block")
            .append_pair("blockid", block_id);
        self.send(Method::PUT, url.as_str(), data.to_vec()).await
    }

    /// Commits a block list of `<Latest>` entries, returning the response.
    pub async fn put_block_list(&self, container: &str, blob: &str, block_ids: &[&str]) -> Response {
        let url = format!("{}?comp=blocklist", self.blob_url(container, blob));
        self.send(Method::PUT, &url, block_list_xml(block_ids)).await
    }

    /// Appends a shared access signature to `url`, signed with the account
    /// key over the given parameters.
    pub fn sas_url(&self, url: &str, params: &[(&str, &str)]) -> String {
        let mut url = Url::parse(url).unwrap();
        let sig = sas_signature(&url, params, &self.key);
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params {
                query.append_pair(name, value);
            }
            query.append_pair("sig", &sig);
        }
        url.to_string()
    }
}

/// Builds a `<BlockList>` body of `<Latest>` entries.
pub fn block_list_xml(block_ids: &[&str]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><BlockList>"#);
    for id in block_ids {
        xml.push_str(&format!("<Latest>{}</Latest>", id));
    }
    xml.push_str("</BlockList>");
    xml
}

/// Creates the authorization header value for SharedKey.
pub fn create_auth_header(
    method: &Method,
    url: &Url,
    headers: &[(String, String)],
    account: &str,
    key: &str,
) -> String {
    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    };

    let mut string_to_sign = format!("{}\n", method.as_str());
    for name in SIGNED_HEADERS {
        let value = header(name);
        if name == "content-length" && value == "0" {
            string_to_sign.push('\n');
        } else {
            string_to_sign.push_str(value);
            string_to_sign.push('\n');
        }
    }

    // Build canonicalized headers
    let mut ms_headers: Vec<_> = headers
        .iter()
        .filter(|(k, _)| k.starts_with("x-ms-"))
        .collect();
    ms_headers.sort_by(|a, b| a.0.cmp(&b.0));
    for (k, v) in ms_headers {
        string_to_sign.push_str(&format!("{}:{}\n", k, v));
    }

    // Build canonicalized resource
    string_to_sign.push_str(&format!("/{}{}", account, url.path()));
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, values) in params {
        string_to_sign.push_str(&format!("\n{}:{}", name, values.join(",")));
    }

    format!("SharedKey {}:{}", account, sign(&string_to_sign, key))
}

/// Computes a SAS `sig` value for `url` and the given parameters.
pub fn sas_signature(url: &Url, params: &[(&str, &str)], key: &str) -> String {
    let param = |name: &str| {
        params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .unwrap_or("")
    };
    let path = percent_encoding::percent_decode_str(url.path()).decode_utf8_lossy();
    let resource = format!("/blob{}", path);

    let string_to_sign = [
        param("sp"),
        param("st"),
        param("se"),
        resource.as_str(),
        param("si"),
        param("sip"),
        param("spr"),
        param("sv"),
        param("rscc"),
        param("rscd"),
        param("rsce"),
        param("rscl"),
        param("rsct"),
    ]
    .join("\n");

    sign(&string_to_sign, key)
}

fn sign(string_to_sign: &str, key: &str) -> String {
    let key_bytes = BASE64.decode(key).unwrap();
    let mut mac = HmacSha256::new_from_slice(&key_bytes).unwrap();
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Returns the `x-ms-error-code` header of a response.
pub fn error_code(response: &Response) -> &str {
    response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
