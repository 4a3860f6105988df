use crate::{
    error::{GenAiError, Result},
    models::ImageRef,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

#[derive(Debug, Serialize)]
pub struct ImagenRequest {
    pub instances: Vec<ImagenInstance>,
    pub parameters: ImagenParameters,
}

#[derive(Debug, Serialize)]
pub struct ImagenInstance {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagenParameters {
    pub sample_count: u32,
}

#[derive(Debug, Serialize)]
pub struct OpenAiImageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub prompt: String,
    pub n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeepAiRequest {
    pub text: String,
}

/// The response shapes the generation endpoints answer with. Untagged:
/// the first variant whose fields are present wins.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GenerationEnvelope {
    Predictions { predictions: Vec<Prediction> },
    Hosted { data: Vec<HostedImage> },
    OutputUrl { output_url: String },
    Unrecognized(serde_json::Map<String, Value>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HostedImage {
    pub url: Option<String>,
    pub b64_json: Option<String>,
}

/// Reduces any supported response body to image references in endpoint
/// order, or the error describing why none were found.
pub fn decode_generation(body: Value) -> Result<Vec<ImageRef>> {
    let block_reason = body
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
        .map(str::to_string);
    let is_empty_object = body.as_object().map_or(false, |obj| obj.is_empty());

    let envelope: GenerationEnvelope =
        serde_json::from_value(body).map_err(|e| GenAiError::Parse(e.to_string()))?;

    let images: Vec<ImageRef> = match envelope {
        // Imagen only counts as a hit when the first prediction carries bytes.
        GenerationEnvelope::Predictions { predictions }
            if predictions
                .first()
                .map_or(false, |p| p.bytes_base64_encoded.is_some()) =>
        {
            predictions
                .into_iter()
                .filter_map(|p| {
                    let mime = p.mime_type.unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
                    p.bytes_base64_encoded.map(|data| ImageRef::inline(mime, data))
                })
                .collect()
        }
        GenerationEnvelope::Hosted { data } => data
            .into_iter()
            .filter_map(|item| match (item.url, item.b64_json) {
                (Some(url), _) => Some(ImageRef::url(url)),
                (None, Some(b64)) => Some(ImageRef::inline(DEFAULT_IMAGE_MIME, b64)),
                (None, None) => None,
            })
            .collect(),
        GenerationEnvelope::OutputUrl { output_url } if !output_url.is_empty() => {
            vec![ImageRef::url(output_url)]
        }
        _ => Vec::new(),
    };

    if !images.is_empty() {
        return Ok(images);
    }
    if let Some(reason) = block_reason {
        return Err(GenAiError::Blocked { reason });
    }
    if is_empty_object {
        return Err(GenAiError::EmptyResponse(
            "The image generator returned an empty response. This may be due to the prompt \
             being too long or complex. Try simplifying your request or using fewer reference \
             images."
                .into(),
        ));
    }
    Err(GenAiError::NotFound)
}
