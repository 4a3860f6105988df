//! Wire types for the `generateContent` family used by both the vision
//! analysis and the summarization endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    pub parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if it holds any.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?
            .first()?
            .text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// `{ "error": { "message": ... } }`, shared by Google and OpenAI.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
    /// Google's canonical status, e.g. `UNAUTHENTICATED`.
    pub status: Option<String>,
    /// Numeric for Google, a string such as `invalid_api_key` for OpenAI.
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorDetail {
    pub reason: Option<String>,
}

const INVALID_KEY_REASONS: &[&str] = &["API_KEY_INVALID", "API_KEY_EXPIRED"];

impl ApiErrorBody {
    /// Whether the provider rejected the credential itself. Gemini reports
    /// this as HTTP 400, not 401.
    pub fn rejects_credentials(&self) -> bool {
        let status = self.status.as_deref() == Some("UNAUTHENTICATED");
        let reason = self.details.iter().any(|detail| {
            detail
                .reason
                .as_deref()
                .map_or(false, |reason| INVALID_KEY_REASONS.contains(&reason))
        });
        let code = self
            .code
            .as_ref()
            .and_then(|code| code.as_str())
            .map_or(false, |code| code == "invalid_api_key");
        let message = self
            .message
            .as_deref()
            .map_or(false, |message| message.starts_with("API key not valid"));
        status || reason || code || message
    }
}
