//! Base HTTP client with shared logic

use reqwest::{Client, RequestBuilder};
use serde::Serialize;

/// Base HTTP client with shared functionality
#[derive(Clone)]
pub struct HttpClientBase {
    pub id: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub http: Client,
}

impl HttpClientBase {
    pub fn new(id: String, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            id,
            endpoint,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            http: Client::new(),
        }
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// JSON POST request, with bearer auth when a key is configured
    pub fn post_json<Req>(&self, url: &str, body: &Req) -> RequestBuilder
    where
        Req: Serialize,
    {
        let request = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        match &self.api_key {
            Some(api_key) => request.bearer_auth(api_key),
            None => request,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
