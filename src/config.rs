use crate::error::{GenAiError, Result};
use std::env;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Where the caller-supplied API key goes on the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyPlacement {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// Custom header, e.g. `api-key: <key>`
    Header(String),
    /// Query parameter, e.g. `?key=<key>`
    Query(String),
}

/// Who operates an endpoint. A key issued by one provider is never sent to
/// another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    OpenAi,
    DeepAi,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Google => "Google Gemini",
            Provider::OpenAi => "OpenAI",
            Provider::DeepAi => "DeepAI",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub provider: Provider,
    pub url: String,
    pub auth: ApiKeyPlacement,
    /// Key dedicated to this endpoint. Takes precedence over the session key.
    pub api_key: Option<String>,
}

impl EndpointConfig {
    pub fn new(provider: Provider, url: impl Into<String>, auth: ApiKeyPlacement) -> Self {
        Self {
            provider,
            url: url.into(),
            auth,
            api_key: None,
        }
    }

    pub fn gemini(model: &str) -> Self {
        Self::new(
            Provider::Google,
            format!("{}/{}:generateContent", GEMINI_BASE_URL, model),
            ApiKeyPlacement::Query("key".into()),
        )
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Picks the key for a request to this endpoint: its own key if set,
    /// otherwise the session key, but only when the session key was issued
    /// by the same provider.
    pub fn resolve_key(
        &self,
        session_key: Option<&str>,
        session_provider: Provider,
    ) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
            return Ok(key.trim().to_string());
        }
        match session_key.map(str::trim).filter(|key| !key.is_empty()) {
            Some(key) if self.provider == session_provider => Ok(key.to_string()),
            Some(_) => Err(GenAiError::Auth(format!(
                "No {} API key configured. The session key is for {} and is only sent there.",
                self.provider.name(),
                session_provider.name()
            ))),
            None => Err(GenAiError::missing_key()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationBackend {
    /// Imagen `:predict`; inline base64 predictions.
    Imagen,
    /// OpenAI images API; hosted URLs (or `b64_json`).
    OpenAi,
    /// DeepAI text2img; single `output_url`.
    DeepAi,
}

impl GenerationBackend {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "imagen" | "google" | "gemini" => Ok(GenerationBackend::Imagen),
            "openai" | "dalle" | "dall-e" => Ok(GenerationBackend::OpenAi),
            "deepai" => Ok(GenerationBackend::DeepAi),
            other => Err(GenAiError::Config(format!(
                "Unknown generation backend: {}",
                other
            ))),
        }
    }

    pub fn default_endpoint(&self) -> EndpointConfig {
        match self {
            GenerationBackend::Imagen => EndpointConfig::new(
                Provider::Google,
                format!("{}/imagen-3.0-generate-002:predict", GEMINI_BASE_URL),
                ApiKeyPlacement::Query("key".into()),
            ),
            GenerationBackend::OpenAi => EndpointConfig::new(
                Provider::OpenAi,
                "https://api.openai.com/v1/images/generations",
                ApiKeyPlacement::Bearer,
            ),
            GenerationBackend::DeepAi => EndpointConfig::new(
                Provider::DeepAi,
                "https://api.deepai.org/api/text2img",
                ApiKeyPlacement::Header("api-key".into()),
            ),
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            GenerationBackend::Imagen => Provider::Google,
            GenerationBackend::OpenAi => Provider::OpenAi,
            GenerationBackend::DeepAi => Provider::DeepAi,
        }
    }

    pub fn default_sample_count(&self) -> u32 {
        match self {
            GenerationBackend::Imagen => 4,
            GenerationBackend::OpenAi | GenerationBackend::DeepAi => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationBackend::Imagen => "imagen",
            GenerationBackend::OpenAi => "openai",
            GenerationBackend::DeepAi => "deepai",
        }
    }
}

/// How the final generation prompt is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStrategy {
    /// Run the summarizer over the master prompt before generating.
    Summarize,
    /// Compose the final prompt from the user text and reference description
    /// without a summarization round trip.
    Direct,
}

impl PromptStrategy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "summarize" | "summarise" => Ok(PromptStrategy::Summarize),
            "direct" => Ok(PromptStrategy::Direct),
            other => Err(GenAiError::Config(format!("Unknown prompt strategy: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub backend: GenerationBackend,
    pub endpoint: EndpointConfig,
    pub sample_count: u32,
    pub model: Option<String>,
    pub size: Option<String>,
}

impl GenerationConfig {
    pub fn for_backend(backend: GenerationBackend) -> Self {
        let (model, size) = match backend {
            GenerationBackend::OpenAi => {
                (Some("dall-e-3".to_string()), Some("1024x1024".to_string()))
            }
            _ => (None, None),
        };
        Self {
            backend,
            endpoint: backend.default_endpoint(),
            sample_count: backend.default_sample_count(),
            model,
            size,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::for_backend(GenerationBackend::Imagen)
    }
}

#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// Session key, issued by the generation backend's provider.
    pub api_key: Option<String>,
    pub vision: EndpointConfig,
    pub summarizer: EndpointConfig,
    pub generation: GenerationConfig,
    pub strategy: PromptStrategy,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        GenAiConfig {
            api_key: None,
            vision: EndpointConfig::gemini("gemini-2.0-flash"),
            summarizer: EndpointConfig::gemini("gemini-2.0-flash"),
            generation: GenerationConfig::default(),
            strategy: PromptStrategy::Summarize,
        }
    }
}

impl GenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(backend) = env::var("GENAI_BACKEND") {
            config.generation = GenerationConfig::for_backend(GenerationBackend::parse(&backend)?);
        }

        config.api_key = match config.generation.backend.provider() {
            Provider::Google => env_key(&["GENAI_API_KEY", "GEMINI_API_KEY"]),
            _ => env_key(&["GENAI_API_KEY"]),
        };
        config.vision.api_key = env_key(&["GENAI_VISION_API_KEY", "GEMINI_API_KEY"]);
        config.summarizer.api_key = env_key(&["GENAI_TEXT_API_KEY", "GEMINI_API_KEY"]);
        if let Ok(count) = env::var("GENAI_SAMPLE_COUNT") {
            let count = count.trim().parse().map_err(|_| {
                GenAiError::Config(format!("GENAI_SAMPLE_COUNT is not a number: {}", count))
            })?;
            config = config.with_sample_count(count)?;
        }
        if let Ok(strategy) = env::var("GENAI_STRATEGY") {
            config.strategy = PromptStrategy::parse(&strategy)?;
        }
        if let Ok(url) = env::var("GENAI_VISION_URL") {
            config.vision.url = url;
        }
        if let Ok(url) = env::var("GENAI_TEXT_URL") {
            config.summarizer.url = url;
        }
        if let Ok(url) = env::var("GENAI_IMAGE_URL") {
            config.generation.endpoint.url = url;
        }
        if let Ok(model) = env::var("GENAI_IMAGE_MODEL") {
            config.generation.model = Some(model);
        }
        if let Ok(size) = env::var("GENAI_IMAGE_SIZE") {
            config.generation.size = Some(size);
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Dedicated key for the Gemini vision and summarization endpoints, for
    /// when generation runs on another provider.
    pub fn with_gemini_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.vision.api_key = Some(api_key.clone());
        self.summarizer.api_key = Some(api_key);
        self
    }

    pub fn with_backend(mut self, backend: GenerationBackend) -> Self {
        self.generation = GenerationConfig::for_backend(backend);
        self
    }

    pub fn with_sample_count(mut self, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(GenAiError::Config("sample count must be at least 1".into()));
        }
        self.generation.sample_count = count;
        Ok(self)
    }

    pub fn with_strategy(mut self, strategy: PromptStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_vision_endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.vision = endpoint;
        self
    }

    pub fn with_summarizer_endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.summarizer = endpoint;
        self
    }

    pub fn with_generation_endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.generation.endpoint = endpoint;
        self
    }
}

/// First non-blank value among `names`.
fn env_key(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imagen_is_the_default_backend() {
        let config = GenAiConfig::new();
        assert_eq!(config.generation.backend, GenerationBackend::Imagen);
        assert_eq!(config.generation.sample_count, 4);
        assert_eq!(config.strategy, PromptStrategy::Summarize);
        assert_eq!(
            config.generation.endpoint.auth,
            ApiKeyPlacement::Query("key".into())
        );
        assert!(config.vision.url.ends_with("gemini-2.0-flash:generateContent"));
    }

    #[test]
    fn backend_defaults() {
        let openai = GenAiConfig::new().with_backend(GenerationBackend::OpenAi);
        assert_eq!(openai.generation.endpoint.auth, ApiKeyPlacement::Bearer);
        assert_eq!(openai.generation.sample_count, 1);
        assert_eq!(openai.generation.model.as_deref(), Some("dall-e-3"));

        let deepai = GenAiConfig::new().with_backend(GenerationBackend::DeepAi);
        assert_eq!(
            deepai.generation.endpoint.auth,
            ApiKeyPlacement::Header("api-key".into())
        );
    }

    #[test]
    fn parses_names() {
        assert_eq!(GenerationBackend::parse("DALL-E").unwrap(), GenerationBackend::OpenAi);
        assert_eq!(PromptStrategy::parse(" direct ").unwrap(), PromptStrategy::Direct);
        assert!(matches!(
            GenerationBackend::parse("midjourney"),
            Err(GenAiError::Config(_))
        ));
    }

    #[test]
    fn session_key_only_reaches_its_own_provider() {
        let config = GenAiConfig::new().with_backend(GenerationBackend::OpenAi);
        let openai = config.generation.backend.provider();

        assert_eq!(
            config
                .generation
                .endpoint
                .resolve_key(Some("sk-1"), openai)
                .unwrap(),
            "sk-1"
        );
        assert!(matches!(
            config.vision.resolve_key(Some("sk-1"), openai),
            Err(GenAiError::Auth(_))
        ));

        let config = config.with_gemini_api_key("g-1");
        assert_eq!(config.vision.resolve_key(Some("sk-1"), openai).unwrap(), "g-1");
        assert_eq!(config.summarizer.resolve_key(None, openai).unwrap(), "g-1");
    }

    #[test]
    fn endpoint_key_wins_and_blank_keys_are_missing() {
        let imagen = GenerationBackend::Imagen.provider();
        let vision = EndpointConfig::gemini("gemini-2.0-flash");
        assert_eq!(vision.resolve_key(Some(" g-session "), imagen).unwrap(), "g-session");
        assert_eq!(vision.resolve_key(Some("  "), imagen), Err(GenAiError::missing_key()));

        let vision = vision.with_api_key("g-own");
        assert_eq!(vision.resolve_key(Some("g-session"), imagen).unwrap(), "g-own");
    }

    #[test]
    fn zero_sample_count_is_rejected() {
        assert!(GenAiConfig::new().with_sample_count(0).is_err());
    }
}
