use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A produced image: either hosted by the provider or carried inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRef {
    Url { url: String },
    Inline { mime_type: String, data: String },
}

impl ImageRef {
    pub fn url(url: impl Into<String>) -> Self {
        ImageRef::Url { url: url.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        ImageRef::Inline {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// URL suitable for display; inline images become `data:` URLs.
    pub fn display_url(&self) -> String {
        match self {
            ImageRef::Url { url } => url.clone(),
            ImageRef::Inline { mime_type, data } => crate::codec::to_data_url(mime_type, data),
        }
    }
}

/// Images from one generation, in endpoint order, plus the prompt that
/// produced them. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    images: Vec<ImageRef>,
    prompt: String,
    created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn new(images: Vec<ImageRef>, prompt: impl Into<String>) -> Self {
        Self {
            images,
            prompt: prompt.into(),
            created_at: Utc::now(),
        }
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
