use crate::models::ApiErrorBody;
use thiserror::Error;

/// Substring the Imagen API puts in its error message when the project has
/// no billing account attached. Provider wording, not a stable contract.
pub const BILLING_MARKER: &str = "billed users";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenAiError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No usable text candidate in response")]
    NoCandidate,

    #[error("Blocked: {reason}")]
    Blocked { reason: String },

    #[error("Billing required: {0}")]
    BillingRequired(String),

    #[error("Partial result: received {received} of {requested} images")]
    PartialResult { received: usize, requested: usize },

    #[error("Image data not found in response")]
    NotFound,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Another operation is already in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GenAiError {
    /// Classifies a non-2xx response. The billing marker wins over every
    /// other field, including the status code. A rejected key is `Auth`
    /// whatever the status.
    pub fn from_status(status: u16, provider_error: Option<ApiErrorBody>, raw_body: &str) -> Self {
        let rejects_credentials = provider_error
            .as_ref()
            .map_or(false, ApiErrorBody::rejects_credentials);
        let provider_message = provider_error
            .and_then(|error| error.message)
            .filter(|message| !message.trim().is_empty());

        match provider_message {
            Some(message) if message.contains(BILLING_MARKER) => {
                GenAiError::BillingRequired(message)
            }
            Some(message) if rejects_credentials || status == 401 || status == 403 => {
                GenAiError::Auth(message)
            }
            Some(message) => GenAiError::Transport {
                status: Some(status),
                message,
            },
            None if raw_body.contains(BILLING_MARKER) => {
                GenAiError::BillingRequired(raw_body.to_string())
            }
            None if rejects_credentials || status == 401 || status == 403 => {
                GenAiError::Auth(raw_body.to_string())
            }
            None => GenAiError::Transport {
                status: Some(status),
                message: format!("The API returned an error: {}", raw_body),
            },
        }
    }

    pub fn missing_key() -> Self {
        GenAiError::Auth("Please add your API key to use this feature.".into())
    }

    pub fn is_billing_required(&self) -> bool {
        matches!(self, GenAiError::BillingRequired(_))
    }

    /// `PartialResult` is delivered alongside a valid result; everything
    /// else aborts the operation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GenAiError::PartialResult { .. })
    }

    pub fn user_message(&self) -> String {
        match self {
            GenAiError::Auth(msg) => format!("Authentication failed: {}", msg),
            GenAiError::Transport { message, .. } => message.clone(),
            GenAiError::EmptyResponse(msg) => msg.clone(),
            GenAiError::Parse(msg) => format!("The API response could not be read: {}", msg),
            GenAiError::NoCandidate => {
                "The model answered but produced no usable description.".into()
            }
            GenAiError::Blocked { reason } => {
                format!("Image generation blocked. Reason: {}.", reason)
            }
            GenAiError::BillingRequired(_) => "The image generation API requires a project with \
                 billing enabled. Enable billing for your API project and try again."
                .into(),
            GenAiError::PartialResult {
                received,
                requested,
            } => format!(
                "The AI returned {} image(s) instead of {}. This can happen with complex prompts \
                 or due to safety filters.",
                received, requested
            ),
            GenAiError::NotFound => "Image data not found in the API response.".into(),
            GenAiError::Decode(msg) => format!("The image could not be read: {}", msg),
            GenAiError::InvalidInput(msg) => msg.clone(),
            GenAiError::Busy => "Please wait for the current operation to finish.".into(),
            GenAiError::Config(msg) => format!("Configuration problem: {}", msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenAiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_message(message: &str) -> Option<ApiErrorBody> {
        Some(ApiErrorBody {
            message: Some(message.into()),
            ..Default::default()
        })
    }

    #[test]
    fn billing_marker_wins_over_status() {
        let err = GenAiError::from_status(
            401,
            provider_message("Imagen API is only accessible to billed users at this time."),
            "",
        );
        assert!(err.is_billing_required());

        let err = GenAiError::from_status(
            400,
            None,
            "<html>only accessible to billed users</html>",
        );
        assert!(err.is_billing_required());
    }

    #[test]
    fn unauthorized_maps_to_auth() {
        let err = GenAiError::from_status(401, provider_message("Incorrect API key"), "");
        assert_eq!(err, GenAiError::Auth("Incorrect API key".into()));
    }

    #[test]
    fn rejected_key_on_bad_request_maps_to_auth() {
        let google = ApiErrorBody {
            message: Some("Request had invalid authentication credentials.".into()),
            status: Some("INVALID_ARGUMENT".into()),
            details: vec![crate::models::ApiErrorDetail {
                reason: Some("API_KEY_INVALID".into()),
            }],
            ..Default::default()
        };
        assert!(matches!(
            GenAiError::from_status(400, Some(google), ""),
            GenAiError::Auth(_)
        ));

        let unauthenticated = ApiErrorBody {
            status: Some("UNAUTHENTICATED".into()),
            ..Default::default()
        };
        assert_eq!(
            GenAiError::from_status(400, Some(unauthenticated), "{}"),
            GenAiError::Auth("{}".into())
        );

        let billed = ApiErrorBody {
            message: Some("API key not valid for billed users only".into()),
            ..Default::default()
        };
        assert!(GenAiError::from_status(400, Some(billed), "").is_billing_required());

        let other = GenAiError::from_status(400, provider_message("Invalid prompt"), "");
        assert!(matches!(other, GenAiError::Transport { status: Some(400), .. }));
    }

    #[test]
    fn non_json_error_body_is_reported_verbatim() {
        let err = GenAiError::from_status(502, None, "Bad Gateway");
        assert_eq!(
            err,
            GenAiError::Transport {
                status: Some(502),
                message: "The API returned an error: Bad Gateway".into(),
            }
        );
    }

    #[test]
    fn only_partial_result_is_non_fatal() {
        let partial = GenAiError::PartialResult {
            received: 2,
            requested: 4,
        };
        assert!(!partial.is_fatal());
        assert!(partial.user_message().starts_with("The AI returned 2 image(s) instead of 4."));
        assert!(GenAiError::NotFound.is_fatal());
        assert!(GenAiError::Busy.is_fatal());
    }

    #[test]
    fn messages_are_distinct_per_kind() {
        let errors = vec![
            GenAiError::Auth("x".into()),
            GenAiError::Transport {
                status: Some(500),
                message: "x".into(),
            },
            GenAiError::EmptyResponse("empty".into()),
            GenAiError::Parse("x".into()),
            GenAiError::NoCandidate,
            GenAiError::Blocked { reason: "x".into() },
            GenAiError::BillingRequired("x".into()),
            GenAiError::NotFound,
        ];
        let mut messages: Vec<String> = errors.iter().map(|e| e.user_message()).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), errors.len());
    }
}
