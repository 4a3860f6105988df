pub mod image_client;
pub mod summarizer;
pub mod vision_client;

use crate::{
    config::GenAiConfig,
    error::{GenAiError, Result},
    transport::{HttpTransport, ReqwestTransport},
};
use std::sync::Arc;

pub use image_client::{GeneratedImages, ImageClient};
pub use summarizer::Summarizer;
pub use vision_client::VisionClient;

/// Rejects a missing or blank key before any request goes out.
pub(crate) fn require_key(api_key: &str) -> Result<&str> {
    let trimmed = api_key.trim();
    if trimmed.is_empty() {
        return Err(GenAiError::missing_key());
    }
    Ok(trimmed)
}

/// The three endpoint adapters, sharing one transport.
#[derive(Clone)]
pub struct GenAiClient {
    vision_client: VisionClient,
    summarizer: Summarizer,
    image_client: ImageClient,
    transport: Arc<dyn HttpTransport>,
}

impl GenAiClient {
    pub fn new(config: &GenAiConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: &GenAiConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            vision_client: VisionClient::new(transport.clone(), config.vision.clone()),
            summarizer: Summarizer::new(transport.clone(), config.summarizer.clone()),
            image_client: ImageClient::new(transport.clone(), config.generation.clone()),
            transport,
        }
    }

    pub fn vision(&self) -> &VisionClient {
        &self.vision_client
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }
}
