//! HTTP client for the deck backend.
//!
//! Implements both `DeckStore` and `AssetStore`, plus the account check every
//! authorized command starts with.

use crate::auth::AccountInfo;
use crate::config::Endpoints;
use async_trait::async_trait;
use deck_core::model::{DeckList, DeckPayload};
use deck_core::transport::{AssetStore, AssetUpload, DeckStore, Result, TransportError};
use deck_core::{AssetRecord, DeckRecord};
use reqwest::{RequestBuilder, Response, Url, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Transport timeout for a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

/// Authenticated client for one account.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    token: String,
    username: String,
    /// Sent with updates so the channel can tell our own changes apart
    client_id: String,
}

fn request_error(e: reqwest::Error) -> TransportError {
    if e.is_connect() || e.is_timeout() {
        TransportError::ConnectionFailed(e.to_string())
    } else if e.is_decode() {
        TransportError::Decode(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

impl HttpClient {
    pub fn new(endpoints: Endpoints, token: &str, username: &str, client_id: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(request_error)?;

        Ok(Self {
            http,
            endpoints,
            token: token.to_string(),
            username: username.to_string(),
            client_id: client_id.to_string(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The account behind our token.
    pub async fn account(&self) -> Result<AccountInfo> {
        let request = self.http.get(self.endpoints.api_url("api/v1/auth/me"));
        self.send_json(request).await
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await.map_err(request_error)?;
        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url());

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.send(request).await?.bytes().await.map_err(request_error)?;
        serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    fn deck_url(&self, id: u64) -> String {
        self.endpoints.api_url(&format!("api/v1/decks/{}", id))
    }

    /// Whether `url` has the same scheme, host and port as the backend.
    fn is_backend_url(&self, url: &str) -> bool {
        match (Url::parse(url), Url::parse(&self.endpoints.api)) {
            (Ok(url), Ok(api)) => url.origin() == api.origin(),
            _ => false,
        }
    }
}

#[async_trait]
impl DeckStore for HttpClient {
    async fn create(&self, deck: &DeckRecord) -> Result<DeckRecord> {
        let request = self
            .http
            .post(self.endpoints.api_url("api/v1/decks"))
            .json(&DeckPayload { deck: deck.clone() });
        self.send_json(request).await
    }

    async fn fetch(&self, id: u64) -> Result<DeckRecord> {
        let request = self
            .http
            .get(self.deck_url(id))
            .query(&[("username", &self.username)]);
        self.send_json(request).await
    }

    async fn update(&self, deck: &DeckRecord) -> Result<DeckRecord> {
        let request = self
            .http
            .put(self.deck_url(deck.id))
            .query(&[("client_id", &self.client_id)])
            .json(&DeckPayload { deck: deck.clone() });
        self.send_json(request).await
    }

    async fn list(&self) -> Result<Vec<DeckRecord>> {
        let request = self
            .http
            .get(self.endpoints.api_url("api/v1/decks"))
            .query(&[("username", &self.username)]);
        let list: DeckList = self.send_json(request).await?;
        Ok(list.decks)
    }
}

#[async_trait]
impl AssetStore for HttpClient {
    async fn upload(&self, deck_id: u64, upload: AssetUpload) -> Result<String> {
        let request = self
            .http
            .post(self.endpoints.api_url(&format!("api/v1/decks/{}/assets", deck_id)))
            .query(&[("filename", &upload.filename)])
            .header(header::CONTENT_TYPE, upload.content_type)
            .body(upload.bytes);
        let response: UploadResponse = self.send_json(request).await?;
        Ok(response.url)
    }

    async fn download(&self, asset: &AssetRecord) -> Result<Vec<u8>> {
        // Only the backend gets our token; asset hosts are public
        let request = if self.is_backend_url(&asset.url) {
            self.authorized(self.http.get(&asset.url))
        } else {
            self.http.get(&asset.url)
        };

        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let bytes = response.bytes().await.map_err(request_error)?;
        Ok(bytes.to_vec())
    }
}
