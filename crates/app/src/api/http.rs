//! reqwest client for the storefront's cart routes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{
        ACCEPT, CACHE_CONTROL, CONTENT_TYPE, COOKIE, EXPIRES, HeaderMap, HeaderName, HeaderValue,
        InvalidHeaderValue, PRAGMA,
    },
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error};

use lieferspatz::{
    errors::CartError,
    items::ItemId,
    payloads::{AddItemRequest, CartPayload, CountPayload, MutationAck},
};

use super::CartApi;

/// Configuration for connecting to a storefront.
#[derive(Debug, Clone)]
pub struct HttpCartApiConfig {
    /// Storefront origin, e.g. `"http://localhost:5000"`.
    pub base_url: String,

    /// Raw `Cookie` header value carrying the storefront session.
    pub session_cookie: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

/// HTTP client for the storefront's cart routes.
#[derive(Debug, Clone)]
pub struct HttpCartApi {
    base_url: String,
    http: Client,
}

/// Errors that can occur while building the HTTP client.
#[derive(Debug, Error)]
pub enum HttpCartApiError {
    /// The session cookie is not a valid header value.
    #[error("invalid session cookie: {0}")]
    InvalidCookie(#[source] InvalidHeaderValue),

    /// reqwest rejected the client configuration.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

impl HttpCartApi {
    /// Create a new client from the given configuration.
    ///
    /// Every request carries no-cache headers and marks itself as an XHR so
    /// the storefront answers with JSON instead of a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cookie is not a valid header value or
    /// the client cannot be built.
    pub fn new(config: HttpCartApiConfig) -> Result<Self, HttpCartApiError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(cookie) = config.session_cookie.as_deref() {
            let mut value = HeaderValue::from_str(cookie).map_err(HttpCartApiError::InvalidCookie)?;

            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(HttpCartApiError::Client)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder, route: &str) -> Result<Reply, CartError> {
        debug!(route, "sending cart request");

        let response = request.send().await.map_err(CartError::network)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(CartError::network)?;

        debug!(route, status = status.as_u16(), "cart response received");

        Ok(Reply {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl CartApi for HttpCartApi {
    async fn fetch_cart(&self) -> Result<CartPayload, CartError> {
        let reply = self.send(self.http.get(self.url("/cart")), "/cart").await?;

        reply.json()
    }

    async fn fetch_count(&self) -> Result<u32, CartError> {
        let reply = self
            .send(self.http.get(self.url("/cart/count")), "/cart/count")
            .await?;

        let payload: CountPayload = reply.json()?;

        Ok(payload.count)
    }

    async fn add_item(&self, item_id: ItemId, quantity: u32) -> Result<MutationAck, CartError> {
        let request = self
            .http
            .post(self.url(&format!("/cart/add/{item_id}")))
            .json(&AddItemRequest { quantity });

        self.send(request, "/cart/add").await?.ack()
    }

    async fn remove_item(&self, item_id: ItemId) -> Result<MutationAck, CartError> {
        let request = self.http.post(self.url(&format!("/cart/remove/{item_id}")));

        self.send(request, "/cart/remove").await?.ack()
    }
}

/// A response read to completion.
#[derive(Debug)]
struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

impl Reply {
    /// Decode a body that must be present.
    fn json<T: DeserializeOwned>(&self) -> Result<T, CartError> {
        self.check()?;

        parse(&self.body)
    }

    /// Decode the body of a mutating route.
    ///
    /// Empty bodies and `204 No Content` count as a bare success.
    fn ack(&self) -> Result<MutationAck, CartError> {
        self.check()?;

        if self.status == StatusCode::NO_CONTENT || self.body.trim().is_empty() {
            return Ok(MutationAck::default());
        }

        let ack: MutationAck = parse(&self.body)?;

        if ack.is_rejected() {
            return Err(CartError::ServerRejected {
                status: self.status.as_u16(),
                message: ack.message,
            });
        }

        Ok(ack)
    }

    fn check(&self) -> Result<(), CartError> {
        let content_type = self.content_type.as_deref().unwrap_or_default();

        if content_type.contains("text/html") {
            return Err(CartError::SessionExpired);
        }

        if !content_type.is_empty() && !content_type.contains("json") && !self.body.trim().is_empty()
        {
            error!(
                content_type,
                status = self.status.as_u16(),
                "cart route answered with a non-json body"
            );

            return Err(CartError::UnexpectedResponse(format!(
                "expected json, got {content_type} ({})",
                self.status
            )));
        }

        if !self.status.is_success() {
            let message = serde_json::from_str::<MutationAck>(&self.body)
                .ok()
                .and_then(|ack| ack.message);

            return Err(CartError::ServerRejected {
                status: self.status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, CartError> {
    serde_json::from_str(body).map_err(|source| {
        error!("failed to decode cart response: {source}");

        CartError::UnexpectedResponse(source.to_string())
    })
}
