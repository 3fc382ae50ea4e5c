use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tessera_types::{Payload, PermanentAsset};

use crate::error::{StoreError, StoreResult};
use crate::key::storage_key;
use crate::traits::ContentStore;

/// Connection settings for [`HttpContentStore`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpStoreConfig {
    /// Upload endpoint; assets are `PUT` to `<endpoint>/<key>`.
    pub upload_endpoint: String,
    /// Same-origin download proxy; assets are fetched from
    /// `<proxy>?url=<urlencoded asset url>`.
    pub download_proxy: String,
    /// Prefix of the public urls the store hands out.
    pub public_base: String,
    /// Bearer token sent with uploads.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            upload_endpoint: "http://localhost:3000/api/upload".into(),
            download_proxy: "http://localhost:3000/api/asset-proxy".into(),
            public_base: "https://blob.store.example/".into(),
            access_token: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Remote content store over HTTP.
#[derive(Clone, Debug)]
pub struct HttpContentStore {
    client: reqwest::Client,
    config: HttpStoreConfig,
}

impl HttpContentStore {
    pub fn new(config: HttpStoreConfig) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    /// Where an asset with storage key `key` is uploaded to.
    pub fn upload_url(&self, key: &str) -> String {
        format!("{}/{key}", self.config.upload_endpoint.trim_end_matches('/'))
    }

    /// Proxy request that fetches the asset behind `url`.
    pub fn proxy_url(&self, url: &str) -> String {
        let separator = if self.config.download_proxy.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}url={}",
            self.config.download_proxy,
            urlencoding::encode(url)
        )
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn upload(
        &self,
        payload: &Payload,
        name: &str,
        path_hint: Option<&str>,
    ) -> StoreResult<PermanentAsset> {
        let key = storage_key(name, path_hint)?;
        let target = self.upload_url(&key);
        tracing::debug!(%target, size = payload.size(), "uploading asset");

        let mut request = self
            .client
            .put(&target)
            .header(CONTENT_TYPE, payload.content_type())
            .body(payload.data().clone());
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                url: target,
            });
        }
        response
            .json::<PermanentAsset>()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("upload of {key}: {e}")))
    }

    async fn download(&self, url: &str) -> StoreResult<Payload> {
        let target = self.proxy_url(url);
        let response = self.client.get(&target).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = response.bytes().await?;
        Ok(Payload::new(data, content_type))
    }

    fn owns_url(&self, url: &str) -> bool {
        let base = self.config.public_base.as_str();
        url.len() > base.len() && url.starts_with(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes;
    use axum::extract::{Path, Query, State};
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    const PUBLIC: &str = "https://abc.blob.store.example/";

    fn store() -> HttpContentStore {
        HttpContentStore::new(HttpStoreConfig {
            upload_endpoint: "https://app.example/api/upload/".into(),
            download_proxy: "https://app.example/api/asset-proxy".into(),
            public_base: "https://abc.blob.store.example/".into(),
            access_token: Some("t0k".into()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn upload_url_joins_key() {
        assert_eq!(
            store().upload_url("c1/a.png"),
            "https://app.example/api/upload/c1/a.png"
        );
    }

    #[test]
    fn proxy_url_encodes_target() {
        assert_eq!(
            store().proxy_url("https://abc.blob.store.example/c1/a b.png?x=1"),
            "https://app.example/api/asset-proxy?url=https%3A%2F%2Fabc.blob.store.example%2Fc1%2Fa%20b.png%3Fx%3D1"
        );
    }

    #[test]
    fn proxy_url_appends_to_existing_query() {
        let store = HttpContentStore::new(HttpStoreConfig {
            download_proxy: "https://app.example/proxy?mode=raw".into(),
            ..HttpStoreConfig::default()
        })
        .unwrap();
        assert!(store.proxy_url("u").starts_with("https://app.example/proxy?mode=raw&url="));
    }

    #[test]
    fn owns_public_urls_only() {
        let store = store();
        assert!(store.owns_url("https://abc.blob.store.example/c1/a.png"));
        assert!(!store.owns_url("https://abc.blob.store.example/"));
        assert!(!store.owns_url("https://app.example/api/upload/a.png"));
        assert!(!store.owns_url("blob:tessera/1"));
    }

    #[test]
    fn default_config() {
        let c = HttpStoreConfig::default();
        assert_eq!(c.timeout, Duration::from_secs(60));
        assert!(c.access_token.is_none());
    }

    // -----------------------------------------------------------------------
    // Transport against a local asset server
    // -----------------------------------------------------------------------

    /// What the local server saw.
    #[derive(Default)]
    struct Seen {
        auth: Mutex<Vec<Option<String>>>,
        proxied: Mutex<Vec<String>>,
    }

    async fn upload_handler(
        State(seen): State<Arc<Seen>>,
        Path(key): Path<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        seen.auth.lock().unwrap().push(auth);

        if key.starts_with("busy/") {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        if key.starts_with("garbled/") {
            return "not a descriptor".into_response();
        }
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Json(PermanentAsset::new(
            format!("{PUBLIC}{key}"),
            key,
            content_type,
            body.len() as u64,
        ))
        .into_response()
    }

    async fn proxy_handler(
        State(seen): State<Arc<Seen>>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Response {
        let url = query.get("url").cloned().unwrap_or_default();
        seen.proxied.lock().unwrap().push(url.clone());

        if url.ends_with("missing.png") {
            StatusCode::NOT_FOUND.into_response()
        } else if url.ends_with("broken.png") {
            StatusCode::BAD_GATEWAY.into_response()
        } else {
            ([(header::CONTENT_TYPE, "image/png")], b"\x89PNG".to_vec()).into_response()
        }
    }

    async fn serve() -> (HttpContentStore, Arc<Seen>) {
        let seen = Arc::new(Seen::default());
        let app = Router::new()
            .route("/api/upload/*key", put(upload_handler))
            .route("/api/asset-proxy", get(proxy_handler))
            .with_state(Arc::clone(&seen));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let store = HttpContentStore::new(HttpStoreConfig {
            upload_endpoint: format!("http://{addr}/api/upload"),
            download_proxy: format!("http://{addr}/api/asset-proxy"),
            public_base: PUBLIC.into(),
            access_token: Some("t0k".into()),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        (store, seen)
    }

    #[tokio::test]
    async fn upload_returns_server_descriptor() {
        let (store, seen) = serve().await;
        let payload = Payload::new(b"\x89PNG\r\n".to_vec(), "image/png");

        let asset = store.upload(&payload, "a.png", Some("c1")).await.unwrap();

        assert_eq!(asset, PermanentAsset::new(format!("{PUBLIC}c1/a.png"), "c1/a.png", "image/png", 6));
        assert!(store.owns_url(&asset.url));
        assert_eq!(*seen.auth.lock().unwrap(), vec![Some("Bearer t0k".to_string())]);
    }

    #[tokio::test]
    async fn upload_server_error_is_retryable_status() {
        let (store, _seen) = serve().await;
        let payload = Payload::new(vec![1, 2], "image/png");

        let err = store.upload(&payload, "a.png", Some("busy")).await.unwrap_err();

        assert!(matches!(err, StoreError::Status { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn upload_rejects_non_descriptor_body() {
        let (store, _seen) = serve().await;
        let payload = Payload::new(vec![1], "image/png");

        let err = store.upload(&payload, "a.png", Some("garbled")).await.unwrap_err();

        assert!(matches!(err, StoreError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn download_goes_through_proxy() {
        let (store, seen) = serve().await;
        let url = format!("{PUBLIC}c1/hero shot.png?v=1&w=2");

        let payload = store.download(&url).await.unwrap();

        assert_eq!(payload.data().as_ref(), b"\x89PNG");
        assert_eq!(payload.content_type(), "image/png");
        // The whole asset url, query included, arrives as one proxy parameter.
        assert_eq!(*seen.proxied.lock().unwrap(), vec![url]);
    }

    #[tokio::test]
    async fn download_missing_is_not_found() {
        let (store, _seen) = serve().await;
        let url = format!("{PUBLIC}c1/missing.png");

        let err = store.download(&url).await.unwrap_err();

        assert!(matches!(err, StoreError::NotFound(ref u) if *u == url));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn download_upstream_failure_is_status() {
        let (store, _seen) = serve().await;
        let url = format!("{PUBLIC}c1/broken.png");

        let err = store.download(&url).await.unwrap_err();

        assert!(matches!(err, StoreError::Status { status: 502, url: ref u } if *u == url));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let store = HttpContentStore::new(HttpStoreConfig {
            download_proxy: format!("http://{addr}/api/asset-proxy"),
            timeout: Duration::from_secs(2),
            ..HttpStoreConfig::default()
        })
        .unwrap();

        let err = store.download(&format!("{PUBLIC}a.png")).await.unwrap_err();

        assert!(matches!(err, StoreError::Transport(_)));
        assert!(err.is_retryable());
    }
}
