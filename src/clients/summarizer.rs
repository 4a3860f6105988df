use crate::{
    clients::require_key,
    config::EndpointConfig,
    error::{GenAiError, Result},
    models::{GenerateContentRequest, GenerateContentResponse, Part},
    prompts,
    transport::{HttpRequest, HttpTransport},
};
use std::sync::Arc;

/// Compresses a master prompt into a concise generation prompt.
#[derive(Clone)]
pub struct Summarizer {
    transport: Arc<dyn HttpTransport>,
    endpoint: EndpointConfig,
}

impl Summarizer {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: EndpointConfig) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Distilled text, or `master` unchanged when the endpoint fails or
    /// answers without text. Never fails.
    pub async fn distill(&self, api_key: &str, master: &str) -> String {
        match self.try_distill(api_key, master).await {
            Ok(distilled) => {
                log::debug!("Summarizer distilled {} chars into {}", master.len(), distilled.len());
                distilled
            }
            Err(e) => {
                log::warn!("Summarizer unavailable, using master prompt: {}", e);
                master.to_string()
            }
        }
    }

    pub async fn try_distill(&self, api_key: &str, master: &str) -> Result<String> {
        let api_key = require_key(api_key)?;
        let request =
            GenerateContentRequest::user(vec![Part::text(prompts::summarizer_instruction(master))]);
        let body = serde_json::to_value(request).map_err(|e| GenAiError::Parse(e.to_string()))?;

        let json = self
            .transport
            .post_json(HttpRequest::authorized(&self.endpoint, api_key, body)?)
            .await?
            .into_json()?;

        let parsed: GenerateContentResponse =
            serde_json::from_value(json).map_err(|e| GenAiError::Parse(e.to_string()))?;

        parsed
            .first_text()
            .map(|text| text.trim().to_string())
            .ok_or(GenAiError::NoCandidate)
    }
}
