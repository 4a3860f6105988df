use crate::{
    clients::require_key,
    config::{EndpointConfig, GenerationBackend, GenerationConfig},
    error::{GenAiError, Result},
    models::{
        decode_generation, DeepAiRequest, ImageRef, ImagenInstance, ImagenParameters,
        ImagenRequest, OpenAiImageRequest,
    },
    transport::{redact, HttpRequest, HttpTransport},
};
use serde_json::Value;
use std::sync::Arc;

/// Images returned for one request, alongside how many were asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImages {
    pub images: Vec<ImageRef>,
    pub requested: usize,
}

impl GeneratedImages {
    /// `PartialResult` when the endpoint returned fewer images than requested.
    pub fn shortfall(&self) -> Option<GenAiError> {
        (self.images.len() < self.requested).then(|| GenAiError::PartialResult {
            received: self.images.len(),
            requested: self.requested,
        })
    }
}

#[derive(Clone)]
pub struct ImageClient {
    transport: Arc<dyn HttpTransport>,
    config: GenerationConfig,
}

impl ImageClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: GenerationConfig) -> Self {
        Self { transport, config }
    }

    pub fn backend(&self) -> GenerationBackend {
        self.config.backend
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.config.endpoint
    }

    /// Number of images requested per call. DeepAI always returns one.
    pub fn requested_count(&self) -> usize {
        match self.config.backend {
            GenerationBackend::DeepAi => 1,
            _ => self.config.sample_count as usize,
        }
    }

    pub async fn generate(&self, api_key: &str, prompt: &str) -> Result<GeneratedImages> {
        let api_key = require_key(api_key)?;
        let body = self.build_request_payload(prompt)?;

        log::info!(
            "Generating {} image(s) with {} at {}",
            self.requested_count(),
            self.config.backend.as_str(),
            redact(&self.config.endpoint.url)
        );
        log::debug!("Final prompt being sent to API: {}", prompt);

        let json = self
            .transport
            .post_json(HttpRequest::authorized(&self.config.endpoint, api_key, body)?)
            .await?
            .into_json()?;

        let images = decode_generation(json)?;
        log::info!("Received {} image(s)", images.len());

        Ok(GeneratedImages {
            images,
            requested: self.requested_count(),
        })
    }

    fn build_request_payload(&self, prompt: &str) -> Result<Value> {
        let payload = match self.config.backend {
            GenerationBackend::Imagen => serde_json::to_value(ImagenRequest {
                instances: vec![ImagenInstance {
                    prompt: prompt.to_string(),
                }],
                parameters: ImagenParameters {
                    sample_count: self.config.sample_count,
                },
            }),
            GenerationBackend::OpenAi => serde_json::to_value(OpenAiImageRequest {
                model: self.config.model.clone(),
                prompt: prompt.to_string(),
                n: self.config.sample_count,
                size: self.config.size.clone(),
            }),
            GenerationBackend::DeepAi => serde_json::to_value(DeepAiRequest {
                text: prompt.to_string(),
            }),
        };
        payload.map_err(|e| GenAiError::Parse(e.to_string()))
    }
}
