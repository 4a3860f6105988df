use crate::{
    clients::require_key,
    config::EndpointConfig,
    error::{GenAiError, Result},
    models::{GenerateContentRequest, GenerateContentResponse, InlineData, Part},
    transport::{redact, HttpRequest, HttpTransport},
};
use std::sync::Arc;

/// Sends images plus an instruction to a vision-capable model and returns
/// its description.
#[derive(Clone)]
pub struct VisionClient {
    transport: Arc<dyn HttpTransport>,
    endpoint: EndpointConfig,
}

impl VisionClient {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: EndpointConfig) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub async fn describe(
        &self,
        api_key: &str,
        instruction: &str,
        images: Vec<InlineData>,
    ) -> Result<String> {
        let api_key = require_key(api_key)?;
        if images.is_empty() {
            return Err(GenAiError::InvalidInput(
                "At least one image is required for analysis.".into(),
            ));
        }

        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::text(instruction));
        parts.extend(images.into_iter().map(|image| Part::InlineData {
            inline_data: image,
        }));
        let image_count = parts.len() - 1;

        let body = serde_json::to_value(GenerateContentRequest::user(parts))
            .map_err(|e| GenAiError::Parse(e.to_string()))?;

        log::info!(
            "Analyzing {} image(s) with {}",
            image_count,
            redact(&self.endpoint.url)
        );

        let response = self
            .transport
            .post_json(HttpRequest::authorized(&self.endpoint, api_key, body)?)
            .await?;
        let json = response.into_json()?;

        let parsed: GenerateContentResponse =
            serde_json::from_value(json).map_err(|e| GenAiError::Parse(e.to_string()))?;

        parsed
            .first_text()
            .map(|text| text.trim().to_string())
            .ok_or(GenAiError::NoCandidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gemini_text, FakeTransport};
    use serde_json::json;

    fn client(fake: &Arc<FakeTransport>) -> VisionClient {
        VisionClient::new(fake.clone(), EndpointConfig::gemini("gemini-2.0-flash"))
    }

    fn png(data: &str) -> InlineData {
        InlineData {
            mime_type: "image/png".into(),
            data: data.into(),
        }
    }

    #[tokio::test]
    async fn sends_instruction_then_inline_images() {
        let fake = Arc::new(FakeTransport::new());
        fake.push_json(200, gemini_text("  a tabby cat on a sofa \n"));

        let text = client(&fake)
            .describe("k", "Describe.", vec![png("AAA"), png("BBB")])
            .await
            .unwrap();
        assert_eq!(text, "a tabby cat on a sofa");

        let sent = &fake.requests()[0];
        assert!(sent.url.ends_with(":generateContent?key=k"));
        assert_eq!(
            sent.body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "Describe." },
                        { "inlineData": { "mimeType": "image/png", "data": "AAA" } },
                        { "inlineData": { "mimeType": "image/png", "data": "BBB" } }
                    ]
                }]
            })
        );
    }

    #[tokio::test]
    async fn failure_modes_stay_distinct() {
        let fake = Arc::new(FakeTransport::new());
        fake.push_raw(200, "")
            .push_raw(200, "not json")
            .push_json(200, json!({ "candidates": [] }))
            .push_json(500, json!({ "error": { "message": "backend exploded" } }));
        let vision = client(&fake);

        let mut errors = Vec::new();
        for _ in 0..4 {
            errors.push(vision.describe("k", "x", vec![png("A")]).await.unwrap_err());
        }
        assert!(matches!(errors[0], GenAiError::EmptyResponse(_)));
        assert!(matches!(errors[1], GenAiError::Parse(_)));
        assert_eq!(errors[2], GenAiError::NoCandidate);
        assert_eq!(
            errors[3],
            GenAiError::Transport {
                status: Some(500),
                message: "backend exploded".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_key_never_hits_the_network() {
        let fake = Arc::new(FakeTransport::new());
        let err = client(&fake)
            .describe("  ", "x", vec![png("A")])
            .await
            .unwrap_err();
        assert!(matches!(err, GenAiError::Auth(_)));
        assert!(fake.requests().is_empty());
    }
}
