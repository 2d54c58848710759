//! JSON API client over an injectable transport.
//!
//! # Design
//! `ApiClient` holds a base URL, a shared `Transport` and a fixed set of
//! default headers; none of these change after construction. A call walks
//! four stages (build, send, status check, decode) and stops at the first
//! failure with the matching `ApiError` variant. The response is owned by
//! `request` for the whole call, so its body is dropped on every path.

use std::io::BufReader;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::context::Context;
use crate::error::{ApiError, RequestBuildError};
use crate::http::{Body, HttpMethod, HttpRequest};
use crate::transport::Transport;

/// Client for a JSON HTTP API rooted at `base_url`.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    headers: Vec<(String, String)>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            headers: Vec::new(),
        }
    }

    /// Attach a header to every request made by this client.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one round trip and decode the JSON response into `target`.
    ///
    /// `path` is appended to the base URL as-is. With `target` set to `None`
    /// the response body is ignored; with a target, an empty body is an
    /// `ApiError::Decode`. `target` is only written on success.
    pub fn request<T>(
        &self,
        ctx: &Context,
        method: &str,
        path: &str,
        body: Option<Body>,
        target: Option<&mut T>,
    ) -> Result<(), ApiError>
    where
        T: DeserializeOwned,
    {
        let request = self.build_request(ctx, method, path, body)?;
        // The query string may carry credentials; log host and path only.
        debug!(
            method = %request.method,
            host = request.url.host_str().unwrap_or_default(),
            path = request.url.path(),
            "sending API request"
        );

        let response = self.transport.send(request)?;

        if response.is_error() {
            debug!(status = response.status, "API request failed");
            return Err(ApiError::HttpStatus {
                status: response.status,
            });
        }

        if let Some(target) = target {
            *target = serde_json::from_reader(BufReader::new(response.body))
                .map_err(ApiError::Decode)?;
        }

        Ok(())
    }

    /// `request` with a fresh target that is returned on success.
    pub fn fetch<T>(
        &self,
        ctx: &Context,
        method: &str,
        path: &str,
        body: Option<Body>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut slot = None;
        self.request(ctx, method, path, body, Some(&mut slot))?;
        // `Option<T>` decodes JSON `null` as `None`, which `T` may not accept.
        match slot {
            Some(value) => Ok(value),
            None => serde_json::from_str("null").map_err(ApiError::Decode),
        }
    }

    fn build_request(
        &self,
        ctx: &Context,
        method: &str,
        path: &str,
        body: Option<Body>,
    ) -> Result<HttpRequest, RequestBuildError> {
        let method: HttpMethod = method.parse()?;
        let raw = format!("{}{}", self.base_url, path);
        let url = Url::parse(&raw).map_err(|source| RequestBuildError::InvalidUrl { url: raw, source })?;

        Ok(HttpRequest {
            method,
            url,
            headers: self.headers.clone(),
            body,
            context: ctx.clone(),
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
