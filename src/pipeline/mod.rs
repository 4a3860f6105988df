//! Orchestration of analysis, summarization and generation over a
//! [`Session`].
//!
//! A generate cycle runs `AnalyzingReferences` (only with reference images),
//! `Summarizing` (only with [`PromptStrategy::Summarize`]) and `Generating`,
//! strictly in that order. Standalone analysis and the edit flow are their
//! own operations and never overlap a generation: each operation claims the
//! session through [`Session::begin`] and releases it when it returns.

pub mod history;
pub mod session;

use crate::{
    clients::GenAiClient,
    codec::{self, ImageUpload, ReferenceImage},
    config::{EndpointConfig, GenAiConfig, PromptStrategy},
    error::{GenAiError, Result},
    logger,
    models::{GenerationResult, ImageRef, InlineData, DEFAULT_IMAGE_MIME},
    prompts,
};

pub use history::GenerationHistory;
pub use session::{InFlight, PipelineState, Session, StateHandle, MAX_REFERENCE_IMAGES};

/// Keys resolved for one generate cycle, one per endpoint that will be
/// called.
struct CycleKeys {
    vision: Option<String>,
    summarizer: Option<String>,
    generation: String,
}

/// What a completed generate cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub image_count: usize,
    pub final_prompt: String,
    pub analyzed_references: bool,
    /// Set when fewer images came back than were requested.
    pub warning: Option<GenAiError>,
}

#[derive(Clone)]
pub struct Pipeline {
    client: GenAiClient,
    strategy: PromptStrategy,
}

impl Pipeline {
    pub fn new(config: &GenAiConfig) -> Self {
        Self::with_client(GenAiClient::new(config), config.strategy)
    }

    pub fn with_client(client: GenAiClient, strategy: PromptStrategy) -> Self {
        Self { client, strategy }
    }

    pub fn client(&self) -> &GenAiClient {
        &self.client
    }

    pub fn strategy(&self) -> PromptStrategy {
        self.strategy
    }

    /// Key for a request to `endpoint`. The session key belongs to the
    /// generation backend's provider and never leaves it.
    fn key_for(&self, endpoint: &EndpointConfig, session: &Session) -> Result<String> {
        endpoint.resolve_key(session.api_key(), self.client.image().backend().provider())
    }

    /// One generate cycle. The displayed result moves to history first; on
    /// failure the display stays empty and the error is recorded on the
    /// session.
    pub async fn generate(&self, session: &mut Session) -> Result<GenerationReport> {
        let guard = session.begin(PipelineState::Generating)?;

        let generation_key = match self.key_for(self.client.image().endpoint(), session) {
            Ok(key) => key,
            Err(e) => return Err(session.record_error(e)),
        };
        let user_prompt = session.prompt().trim().to_string();
        if user_prompt.is_empty() {
            return Err(session.record_error(GenAiError::InvalidInput(
                "Please enter a prompt.".into(),
            )));
        }
        let vision_key = if session.reference_images().is_empty() {
            None
        } else {
            match self.key_for(self.client.vision().endpoint(), session) {
                Ok(key) => Some(key),
                Err(e) => return Err(session.record_error(e)),
            }
        };
        // Optional: without a key the summarizer falls back like any failure.
        let summarizer_key = self
            .key_for(self.client.summarizer().endpoint(), session)
            .map_err(|e| log::warn!("Summarizer disabled for this cycle: {}", e))
            .ok();
        let keys = CycleKeys {
            vision: vision_key,
            summarizer: summarizer_key,
            generation: generation_key,
        };

        session.archive_current();
        session.clear_error();
        let references = session.reference_payloads();

        log::info!(
            "[session {}] Generate with {} reference image(s), history depth {}",
            session.id(),
            references.len(),
            session.history().len()
        );

        let analyzed_references = !references.is_empty();
        match self
            .run_generation(&guard, &keys, &user_prompt, references)
            .await
        {
            Ok((result, warning)) => {
                let report = GenerationReport {
                    image_count: result.len(),
                    final_prompt: result.prompt().to_string(),
                    analyzed_references,
                    warning: warning.clone(),
                };
                session.set_current(result);
                session.set_warning(warning);
                Ok(report)
            }
            Err(e) => Err(session.record_error(e)),
        }
    }

    async fn run_generation(
        &self,
        guard: &InFlight,
        keys: &CycleKeys,
        user_prompt: &str,
        references: Vec<InlineData>,
    ) -> Result<(GenerationResult, Option<GenAiError>)> {
        let description = if references.is_empty() {
            None
        } else {
            guard.advance(PipelineState::AnalyzingReferences);
            let _timer = logger::timer("reference analysis");
            let vision_key = keys.vision.as_deref().ok_or_else(GenAiError::missing_key)?;
            let description = self
                .client
                .vision()
                .describe(vision_key, prompts::REFERENCE_ANALYSIS_INSTRUCTION, references)
                .await?;
            Some(description)
        };

        let final_prompt = match self.strategy {
            PromptStrategy::Summarize => {
                guard.advance(PipelineState::Summarizing);
                let _timer = logger::timer("summarization");
                let master = prompts::master_prompt(user_prompt, description.as_deref());
                let distilled = match keys.summarizer.as_deref() {
                    Some(key) => self.client.summarizer().distill(key, &master).await,
                    None => master,
                };
                prompts::compose_distilled(&distilled)
            }
            PromptStrategy::Direct => prompts::compose_direct(user_prompt, description.as_deref()),
        };

        guard.advance(PipelineState::Generating);
        let _timer = logger::timer("image generation");
        let generated = self
            .client
            .image()
            .generate(&keys.generation, &final_prompt)
            .await?;
        let warning = generated.shortfall();

        Ok((GenerationResult::new(generated.images, final_prompt), warning))
    }

    /// Standalone "analyze an image to create a prompt". The description
    /// replaces any previous analysis; the prompt itself is left alone.
    pub async fn analyze_for_prompt(
        &self,
        session: &mut Session,
        upload: &ImageUpload,
    ) -> Result<String> {
        let _guard = session.begin(PipelineState::AnalyzingForPrompt)?;

        let api_key = match self.key_for(self.client.vision().endpoint(), session) {
            Ok(key) => key,
            Err(e) => return Err(session.record_error(e)),
        };
        session.clear_error();
        session.set_analysis(None);

        let data = match upload.to_base64() {
            Ok(data) => data,
            Err(e) => return Err(session.record_error(e)),
        };
        let image = InlineData {
            mime_type: upload.mime_type.clone(),
            data,
        };

        let _timer = logger::timer("image analysis");
        match self
            .client
            .vision()
            .describe(&api_key, prompts::FORENSIC_ANALYSIS_INSTRUCTION, vec![image])
            .await
        {
            Ok(description) => {
                session.set_analysis(Some(description.clone()));
                Ok(description)
            }
            Err(e) => Err(session.record_error(e)),
        }
    }

    /// Seeds the next cycle from a generated image: it becomes the only
    /// reference image and its description becomes the prompt. Does not
    /// generate. The displayed result stays on screen while the image is
    /// analysed; only the next generate cycle archives it.
    pub async fn edit(&self, session: &mut Session, image: &ImageRef) -> Result<String> {
        let _guard = session.begin(PipelineState::AnalyzingForEdit)?;

        let api_key = match self.key_for(self.client.vision().endpoint(), session) {
            Ok(key) => key,
            Err(e) => return Err(session.record_error(e)),
        };
        session.clear_error();

        let reference = match self.load_reference(image).await {
            Ok(reference) => reference,
            Err(e) => {
                session.set_prompt(prompts::EDIT_FAILED_PROMPT);
                return Err(session.record_error(e));
            }
        };
        session.replace_references(vec![reference]);
        let payloads = session.reference_payloads();

        let _timer = logger::timer("edit analysis");
        match self
            .client
            .vision()
            .describe(&api_key, prompts::EDIT_ANALYSIS_INSTRUCTION, payloads)
            .await
        {
            Ok(description) => {
                session.set_prompt(description.clone());
                Ok(description)
            }
            Err(e) => {
                let fallback = match e {
                    GenAiError::NoCandidate => prompts::EDIT_NO_DESCRIPTION_PROMPT,
                    _ => prompts::EDIT_FAILED_PROMPT,
                };
                session.set_prompt(fallback);
                Err(session.record_error(e))
            }
        }
    }

    async fn load_reference(&self, image: &ImageRef) -> Result<ReferenceImage> {
        match image {
            ImageRef::Inline { mime_type, data } => {
                let bytes = codec::decode_base64(data)?;
                ReferenceImage::from_bytes_with_data_preview(&bytes, mime_type)
            }
            ImageRef::Url { url } if url.starts_with("data:") => {
                let decoded = codec::data_url_to_binary(url)?;
                ReferenceImage::from_bytes_with_data_preview(&decoded.bytes, &decoded.mime_type)
            }
            ImageRef::Url { url } => {
                let bytes = self.client.transport().get_bytes(url).await?;
                ReferenceImage::from_bytes_with_data_preview(&bytes, DEFAULT_IMAGE_MIME)
            }
        }
    }
}
