use crate::{
    codec::{ImageUpload, PreviewRegistry, ReferenceImage},
    error::{GenAiError, Result},
    models::{GenerationResult, InlineData},
    pipeline::history::GenerationHistory,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const MAX_REFERENCE_IMAGES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    AnalyzingReferences,
    Summarizing,
    Generating,
    AnalyzingForPrompt,
    AnalyzingForEdit,
}

impl PipelineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, PipelineState::Idle)
    }

    /// Progress text for the stage, `None` when idle.
    pub fn loading_message(&self) -> Option<&'static str> {
        match self {
            PipelineState::Idle => None,
            PipelineState::AnalyzingReferences => Some("Analyzing reference images..."),
            PipelineState::Summarizing => Some("Summarizing your creative vision..."),
            PipelineState::Generating => Some("Generating high-precision images..."),
            PipelineState::AnalyzingForPrompt => Some("Analyzing..."),
            PipelineState::AnalyzingForEdit => Some("Analyzing image for editing..."),
        }
    }
}

/// Shared view of a session's state; cheap to clone, readable while an
/// operation holds the session.
#[derive(Debug, Clone)]
pub struct StateHandle {
    state: Arc<Mutex<PipelineState>>,
}

impl StateHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PipelineState::Idle)),
        }
    }

    pub fn get(&self) -> PipelineState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(PipelineState::Idle)
    }

    pub fn is_busy(&self) -> bool {
        !self.get().is_idle()
    }
}

/// Marks the session busy. Dropping it, on any path, returns the session to
/// `Idle`.
#[derive(Debug)]
pub struct InFlight {
    state: Arc<Mutex<PipelineState>>,
}

impl InFlight {
    pub fn advance(&self, next: PipelineState) {
        if let Ok(mut state) = self.state.lock() {
            log::debug!("Pipeline state {:?} -> {:?}", *state, next);
            *state = next;
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            *state = PipelineState::Idle;
        }
    }
}

/// Everything one user session owns: prompt, reference images, displayed
/// result, history, last analysis and the single current error.
pub struct Session {
    id: String,
    api_key: Option<String>,
    prompt: String,
    references: Vec<ReferenceImage>,
    previews: PreviewRegistry,
    current: Option<GenerationResult>,
    history: GenerationHistory,
    analysis: Option<String>,
    error: Option<GenAiError>,
    state: StateHandle,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            api_key: None,
            prompt: String::new(),
            references: Vec::new(),
            previews: PreviewRegistry::new(),
            current: None,
            history: GenerationHistory::new(),
            analysis: None,
            error: None,
            state: StateHandle::new(),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.set_api_key(api_key);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        let api_key = api_key.into();
        self.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Adds uploads up to the reference limit; the rest are ignored.
    /// Returns how many were accepted.
    pub fn add_reference_images(&mut self, uploads: &[ImageUpload]) -> Result<usize> {
        let room = MAX_REFERENCE_IMAGES.saturating_sub(self.references.len());
        if uploads.len() > room {
            log::warn!(
                "Only {} more reference image(s) allowed; ignoring {}",
                room,
                uploads.len() - room
            );
        }

        // Encode everything first so a bad upload leaves the session untouched.
        let accepted = uploads
            .iter()
            .take(room)
            .map(|upload| ReferenceImage::from_upload(upload, &self.previews))
            .collect::<Result<Vec<_>>>()?;
        let count = accepted.len();
        self.references.extend(accepted);
        Ok(count)
    }

    pub fn remove_reference_image(&mut self, index: usize) -> Result<()> {
        if index >= self.references.len() {
            return Err(GenAiError::InvalidInput(format!(
                "No reference image at position {}",
                index + 1
            )));
        }
        self.references.remove(index);
        Ok(())
    }

    pub fn reference_images(&self) -> &[ReferenceImage] {
        &self.references
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn current_result(&self) -> Option<&GenerationResult> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &GenerationHistory {
        &self.history
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    pub fn clear_analysis(&mut self) {
        self.analysis = None;
    }

    pub fn error(&self) -> Option<&GenAiError> {
        self.error.as_ref()
    }

    /// Whether the current error calls for billing-specific guidance.
    pub fn needs_billing_setup(&self) -> bool {
        self.error
            .as_ref()
            .map_or(false, GenAiError::is_billing_required)
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// Restores the most recent history entry as the displayed result.
    /// No-op when history is empty or an operation is running.
    pub fn back(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        match self.history.pop() {
            Some(previous) => {
                self.current = Some(previous);
                true
            }
            None => false,
        }
    }

    /// Claims the session for one operation.
    pub fn begin(&self, initial: PipelineState) -> Result<InFlight> {
        let mut state = self.state.state.lock().map_err(|_| GenAiError::Busy)?;
        if !state.is_idle() {
            return Err(GenAiError::Busy);
        }
        *state = initial;
        Ok(InFlight {
            state: Arc::clone(&self.state.state),
        })
    }

    pub(crate) fn record_error(&mut self, error: GenAiError) -> GenAiError {
        log::error!("[session {}] {}", self.id, error);
        self.error = Some(error.clone());
        error
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }

    pub(crate) fn set_warning(&mut self, warning: Option<GenAiError>) {
        if let Some(warning) = &warning {
            log::warn!("[session {}] {}", self.id, warning);
        }
        self.error = warning;
    }

    /// Moves a non-empty displayed result onto history and clears the display.
    pub(crate) fn archive_current(&mut self) {
        if let Some(current) = self.current.take() {
            self.history.push(current);
        }
    }

    pub(crate) fn set_current(&mut self, result: GenerationResult) {
        self.current = Some(result);
    }

    pub(crate) fn set_analysis(&mut self, analysis: Option<String>) {
        self.analysis = analysis;
    }

    pub(crate) fn replace_references(&mut self, references: Vec<ReferenceImage>) {
        self.references = references;
    }

    pub(crate) fn reference_payloads(&self) -> Vec<InlineData> {
        self.references
            .iter()
            .map(|image| InlineData {
                mime_type: image.mime_type.clone(),
                data: image.base64.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageRef;

    fn upload() -> ImageUpload {
        ImageUpload::new(vec![0xff, 0xd8, 0xff], "image/jpeg")
    }

    #[test]
    fn reference_limit_is_four() {
        let mut session = Session::new();
        assert_eq!(session.add_reference_images(&vec![upload(); 3]).unwrap(), 3);
        assert_eq!(session.add_reference_images(&vec![upload(); 3]).unwrap(), 1);
        assert_eq!(session.reference_images().len(), MAX_REFERENCE_IMAGES);
        assert_eq!(session.add_reference_images(&[upload()]).unwrap(), 0);
        assert_eq!(session.previews().live_count(), 4);
    }

    #[test]
    fn removing_a_reference_releases_its_preview() {
        let mut session = Session::new();
        session.add_reference_images(&[upload(), upload()]).unwrap();
        let removed = session.reference_images()[0].preview_url().to_string();

        session.remove_reference_image(0).unwrap();
        assert!(!session.previews().is_live(&removed));
        assert_eq!(session.previews().live_count(), 1);

        assert!(matches!(
            session.remove_reference_image(5),
            Err(GenAiError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_upload_is_rejected_without_partial_state() {
        let mut session = Session::new();
        let bad = ImageUpload::new(Vec::new(), "image/png");
        assert!(matches!(
            session.add_reference_images(&[upload(), bad]),
            Err(GenAiError::Decode(_))
        ));
        assert!(session.reference_images().is_empty());
        assert_eq!(session.previews().live_count(), 0);
    }

    #[test]
    fn back_on_empty_history_changes_nothing() {
        let mut session = Session::new();
        let shown = GenerationResult::new(vec![ImageRef::url("https://x/a.png")], "a");
        session.set_current(shown.clone());

        assert!(!session.back());
        assert_eq!(session.current_result(), Some(&shown));
        assert!(session.history().is_empty());
    }

    #[test]
    fn in_flight_guard_resets_to_idle() {
        let session = Session::new();
        let handle = session.state_handle();
        {
            let guard = session.begin(PipelineState::Generating).unwrap();
            assert!(handle.is_busy());
            assert!(matches!(
                session.begin(PipelineState::AnalyzingForPrompt),
                Err(GenAiError::Busy)
            ));
            guard.advance(PipelineState::Summarizing);
            assert_eq!(
                session.state().loading_message(),
                Some("Summarizing your creative vision...")
            );
        }
        assert_eq!(session.state(), PipelineState::Idle);
        assert!(session.begin(PipelineState::Generating).is_ok());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut session = Session::new().with_api_key("abc");
        assert_eq!(session.api_key(), Some("abc"));
        session.set_api_key("   ");
        assert_eq!(session.api_key(), None);
    }
}
