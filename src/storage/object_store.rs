use super::{join_key, StorageBackend, StorageKind};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Objects in an S3-compatible bucket, stored under `{root_prefix}/{key}`.
///
/// Requests are signed with credentials from the default AWS provider chain:
/// environment variables, shared config/credentials files, then container or
/// instance metadata.
pub struct ObjectStoreBackend {
    client: Client,
    bucket: String,
    root_prefix: String,
}

impl ObjectStoreBackend {
    /// Load the shared AWS configuration and build a client for `bucket`.
    /// The configured region wins over `AWS_REGION` and profile settings,
    /// which win over `us-east-1`. A custom `endpoint` (MinIO, LocalStack,
    /// ...) switches to path-style addressing.
    pub async fn connect(
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
        root_prefix: String,
    ) -> Self {
        let region = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else(Region::new(DEFAULT_REGION));
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;
        let client = build_client(Builder::from(&shared), endpoint);
        Self::with_client(client, bucket, root_prefix)
    }

    pub fn with_client(client: Client, bucket: String, root_prefix: String) -> Self {
        Self {
            client,
            bucket,
            root_prefix: root_prefix.trim_matches('/').to_string(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        join_key(&self.root_prefix, key)
    }

    /// `s3://bucket/full/key`
    pub fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.full_key(key))
    }

    fn relative_key(&self, full_key: &str) -> String {
        if self.root_prefix.is_empty() {
            return full_key.to_string();
        }
        full_key
            .strip_prefix(&self.root_prefix)
            .map(|rest| rest.trim_start_matches('/').to_string())
            .unwrap_or_else(|| full_key.to_string())
    }
}

/// Finish an S3 client configuration. Checksums are only sent when an
/// operation requires them, which keeps uploads readable by S3-compatible
/// stores that reject chunked checksum trailers.
pub(crate) fn build_client(builder: Builder, endpoint: Option<String>) -> Client {
    let mut builder = builder.request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
    if let Some(endpoint) = endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    Client::from_conf(builder.build())
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::ObjectStore
    }

    async fn write_bytes(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .content_type(content_type)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| ScraperError::StorageWrite {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;
        debug!("Uploaded {} bytes to {}", bytes.len(), self.uri(key));
        Ok(self.uri(key))
    }

    async fn list_keys(&self, prefix: &str) -> Result<BTreeSet<String>> {
        let full_prefix = format!("{}/", self.full_key(prefix));
        let mut keys = BTreeSet::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&full_prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| ScraperError::Listing {
                    prefix: full_prefix.clone(),
                    reason: DisplayErrorContext(&e).to_string(),
                })?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.insert(self.relative_key(key));
                }
            }
            match page.next_continuation_token() {
                Some(next) if page.is_truncated().unwrap_or(false) => token = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(e) => Err(ScraperError::ObjectStore {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_store::load_processed;
    use aws_sdk_s3::config::retry::RetryConfig;
    use aws_sdk_s3::config::Credentials;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    #[derive(Debug, Clone)]
    struct Request {
        method: String,
        path: String,
        query: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Request {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        }
    }

    type Responder = Arc<dyn Fn(&Request) -> (u16, String) + Send + Sync>;
    type RequestLog = Arc<Mutex<Vec<Request>>>;

    /// Minimal HTTP/1.1 server standing in for the S3 endpoint.
    async fn serve(responder: Responder) -> (String, RequestLog) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let requests = log.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let requests = requests.clone();
                let responder = responder.clone();
                tokio::spawn(async move {
                    let _ = handle(stream, requests, responder).await;
                });
            }
        });
        (format!("http://{addr}"), log)
    }

    async fn handle(stream: TcpStream, log: RequestLog, responder: Responder) -> std::io::Result<()> {
        let mut reader = BufReader::new(stream);
        loop {
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).await? == 0 {
                return Ok(());
            }
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let target = parts.next().unwrap_or_default().to_string();

            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await?;
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
                }
            }
            let length = headers
                .iter()
                .find(|(n, _)| n == "content-length")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(0);
            let mut body = vec![0; length];
            reader.read_exact(&mut body).await?;

            let (path, query) = match target.split_once('?') {
                Some((p, q)) => (p.to_string(), q.to_string()),
                None => (target.clone(), String::new()),
            };
            let request = Request {
                method,
                path,
                query,
                headers,
                body,
            };
            let (status, body) = responder(&request);
            let body = if request.method == "HEAD" { String::new() } else { body };
            log.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 {status} {}\r\ncontent-type: application/xml\r\ncontent-length: {}\r\n\r\n{body}",
                if status < 400 { "OK" } else { "Error" },
                body.len()
            );
            reader.get_mut().write_all(response.as_bytes()).await?;
        }
    }

    fn stub_backend(endpoint: &str, root_prefix: &str) -> ObjectStoreBackend {
        let builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(DEFAULT_REGION))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .retry_config(RetryConfig::disabled());
        let client = build_client(builder, Some(endpoint.to_string()));
        ObjectStoreBackend::with_client(client, "posters".to_string(), root_prefix.to_string())
    }

    fn list_page(keys: &[&str], next_token: Option<&str>) -> String {
        let contents: String = keys
            .iter()
            .map(|k| format!("<Contents><Key>{k}</Key><Size>10</Size></Contents>"))
            .collect();
        let token = next_token
            .map(|t| format!("<NextContinuationToken>{t}</NextContinuationToken>"))
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>posters</Name><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys><IsTruncated>{}</IsTruncated>{token}{contents}</ListBucketResult>"#,
            keys.len(),
            next_token.is_some()
        )
    }

    const ACCESS_DENIED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>AccessDenied</Code><Message>Access Denied</Message><RequestId>1</RequestId></Error>"#;

    #[test]
    fn test_uri_and_relative_key() {
        let backend = stub_backend("http://127.0.0.1:9", "data/scraped_movies_data/");
        assert_eq!(
            backend.uri("images/a b.jpg"),
            "s3://posters/data/scraped_movies_data/images/a b.jpg"
        );
        assert_eq!(
            backend.relative_key("data/scraped_movies_data/movies/3.jsonl"),
            "movies/3.jsonl"
        );
        assert_eq!(backend.relative_key("elsewhere/3.jsonl"), "elsewhere/3.jsonl");

        let unprefixed = stub_backend("http://127.0.0.1:9", "");
        assert_eq!(unprefixed.uri("movies/1.jsonl"), "s3://posters/movies/1.jsonl");
    }

    #[tokio::test]
    async fn test_put_is_signed_and_carries_content_type() {
        let (endpoint, log) = serve(Arc::new(|_: &Request| (200, String::new()))).await;
        let backend = stub_backend(&endpoint, "data/out");

        let location = backend
            .write_bytes("images/a.jpg", b"jpeg-bytes", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(location, "s3://posters/data/out/images/a.jpg");
        let requests = log.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        let put = &requests[0];
        assert_eq!(put.method, "PUT");
        assert_eq!(put.path, "/posters/data/out/images/a.jpg");
        assert_eq!(put.header("content-type"), Some("image/jpeg"));
        assert_eq!(put.body, b"jpeg-bytes");
        assert!(put
            .header("authorization")
            .is_some_and(|v| v.starts_with("AWS4-HMAC-SHA256")));
    }

    #[tokio::test]
    async fn test_put_rejected_is_storage_write_error() {
        let (endpoint, _log) = serve(Arc::new(|_: &Request| (403, ACCESS_DENIED.to_string()))).await;
        let backend = stub_backend(&endpoint, "data/out");

        let err = backend
            .write_bytes("movies/1.jsonl", b"{}\n", "application/x-ndjson")
            .await
            .unwrap_err();

        assert!(matches!(err, ScraperError::StorageWrite { ref key, .. } if key == "movies/1.jsonl"));
    }

    #[tokio::test]
    async fn test_list_keys_follows_continuation_token() {
        let (endpoint, log) = serve(Arc::new(|req: &Request| {
            if req.query.contains("continuation-token=page-2") {
                (200, list_page(&["data/out/movies/12.jsonl"], None))
            } else {
                (
                    200,
                    list_page(&["data/out/movies/3.jsonl", "data/out/movies/7.jsonl"], Some("page-2")),
                )
            }
        }))
        .await;
        let backend = stub_backend(&endpoint, "data/out");

        let keys = backend.list_keys("movies").await.unwrap();

        assert_eq!(
            keys.into_iter().collect::<Vec<_>>(),
            vec!["movies/12.jsonl", "movies/3.jsonl", "movies/7.jsonl"]
        );
        let requests = log.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.method == "GET" && r.path == "/posters"));
        assert!(requests[0].query.contains("list-type=2"));
        assert!(!requests[0].query.contains("continuation-token"));
        assert!(requests[1].query.contains("continuation-token=page-2"));
    }

    #[tokio::test]
    async fn test_denied_listing_yields_empty_processed_set() {
        let (endpoint, _log) = serve(Arc::new(|_: &Request| (403, ACCESS_DENIED.to_string()))).await;
        let backend = stub_backend(&endpoint, "data/out");

        let err = backend.list_keys("movies").await.unwrap_err();
        assert!(matches!(err, ScraperError::Listing { ref prefix, .. } if prefix == "data/out/movies/"));

        let processed = load_processed(&backend, "movies").await;
        assert!(processed.is_empty());
    }

    #[tokio::test]
    async fn test_exists_maps_not_found_to_false() {
        let (endpoint, log) = serve(Arc::new(|req: &Request| {
            if req.path.ends_with("/3.jsonl") {
                (200, String::new())
            } else {
                (404, String::new())
            }
        }))
        .await;
        let backend = stub_backend(&endpoint, "data/out");

        assert!(backend.exists("movies/3.jsonl").await.unwrap());
        assert!(!backend.exists("movies/4.jsonl").await.unwrap());
        let requests = log.lock().unwrap().clone();
        assert!(requests.iter().all(|r| r.method == "HEAD"));
        assert_eq!(requests[1].path, "/posters/data/out/movies/4.jsonl");
    }
}
