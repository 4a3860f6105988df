use crate::{
    config::{ApiKeyPlacement, EndpointConfig},
    error::{GenAiError, Result},
    models::ApiErrorEnvelope,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl HttpRequest {
    /// Builds a JSON POST to `endpoint`, placing `api_key` where the
    /// endpoint family expects it.
    pub fn authorized(endpoint: &EndpointConfig, api_key: &str, body: Value) -> Result<Self> {
        let mut url = endpoint.url.clone();
        let mut headers = Vec::new();
        match &endpoint.auth {
            ApiKeyPlacement::Bearer => {
                headers.push(("Authorization".to_string(), format!("Bearer {}", api_key)));
            }
            ApiKeyPlacement::Header(name) => headers.push((name.clone(), api_key.to_string())),
            ApiKeyPlacement::Query(name) => {
                let mut parsed = Url::parse(&endpoint.url).map_err(|e| {
                    GenAiError::Config(format!("Invalid endpoint URL {}: {}", endpoint.url, e))
                })?;
                parsed.query_pairs_mut().append_pair(name, api_key);
                url = parsed.into();
            }
        }
        Ok(Self { url, headers, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Maps a response to its JSON body: non-2xx first, then an empty body,
    /// then malformed JSON.
    pub fn into_json(self) -> Result<Value> {
        if !self.is_success() {
            let provider_error = serde_json::from_str::<ApiErrorEnvelope>(&self.body)
                .ok()
                .and_then(|envelope| envelope.error);
            return Err(GenAiError::from_status(
                self.status,
                provider_error,
                &self.body,
            ));
        }
        if self.body.trim().is_empty() {
            return Err(GenAiError::EmptyResponse(
                "The API returned an empty response.".into(),
            ));
        }
        serde_json::from_str(&self.body).map_err(|e| GenAiError::Parse(e.to_string()))
    }
}

/// The network seam. Every client talks to the outside world through this.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse>;

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| GenAiError::Transport {
            status: None,
            message: format!("Request failed: {}", e),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| GenAiError::Transport {
            status: Some(status),
            message: format!("Failed to read response body: {}", e),
        })?;

        log::debug!("POST {} -> {} ({} bytes)", redact(&request.url), status, body.len());
        Ok(HttpResponse { status, body })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GenAiError::Transport {
                status: None,
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenAiError::Transport {
                status: Some(status.as_u16()),
                message: format!("Failed to fetch image: HTTP {}", status),
            });
        }

        let bytes = response.bytes().await.map_err(|e| GenAiError::Transport {
            status: Some(status.as_u16()),
            message: format!("Failed to read image body: {}", e),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Strips the query string so keys passed as parameters never reach the log.
pub fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
