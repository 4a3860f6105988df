//! Prompt orchestration for generative-image APIs.
//!
//! A [`Session`] holds the user's prompt, up to four reference images, the
//! displayed result and an undo history. A [`Pipeline`] drives it through
//! reference analysis, prompt distillation and image generation against a
//! Gemini/Imagen, OpenAI or DeepAI backend.

pub mod clients;
pub mod codec;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use clients::{GenAiClient, GeneratedImages, ImageClient, Summarizer, VisionClient};
pub use codec::{ImageUpload, PreviewRegistry, ReferenceImage};
pub use config::{
    ApiKeyPlacement, EndpointConfig, GenAiConfig, GenerationBackend, GenerationConfig,
    PromptStrategy, Provider,
};
pub use error::{GenAiError, Result};
pub use models::{GenerationResult, ImageRef};
pub use pipeline::{GenerationReport, Pipeline, PipelineState, Session};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
