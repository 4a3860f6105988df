//! Image codec helpers: base64 and `data:` URL conversion, uploaded images,
//! and the preview handles that back their thumbnails.

use crate::error::{GenAiError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn encode_to_base64(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(GenAiError::Decode("image is empty".into()));
    }
    Ok(STANDARD.encode(bytes))
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| GenAiError::Decode(format!("invalid base64 payload: {}", e)))
}

pub fn to_data_url(mime_type: &str, base64: &str) -> String {
    format!("data:{};base64,{}", mime_type, base64)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub base64: String,
}

pub fn parse_data_url(url: &str) -> Result<DataUrl> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| GenAiError::Decode("not a data URL".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| GenAiError::Decode("data URL has no payload".into()))?;
    let mime_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| GenAiError::Decode("only base64 data URLs are supported".into()))?;

    Ok(DataUrl {
        mime_type: if mime_type.is_empty() {
            "text/plain".to_string()
        } else {
            mime_type.to_string()
        },
        base64: payload.to_string(),
    })
}

/// Decodes a `data:` URL back into raw bytes, keeping its MIME type.
pub fn data_url_to_binary(url: &str) -> Result<ImageUpload> {
    let parsed = parse_data_url(url)?;
    let bytes = decode_base64(&parsed.base64)?;
    Ok(ImageUpload::new(bytes, parsed.mime_type))
}

pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "image/png",
    }
}

/// Raw image bytes handed in by the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| GenAiError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(bytes, mime_from_path(path)))
    }

    pub fn to_base64(&self) -> Result<String> {
        encode_to_base64(&self.bytes)
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Tracks live preview URLs. Each handle is released exactly once, when it
/// is dropped.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<String>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> PreviewHandle {
        let url = format!("preview:{}", Uuid::new_v4());
        if let Ok(mut live) = self.live.lock() {
            live.insert(url.clone());
        }
        PreviewHandle {
            url,
            live: Arc::clone(&self.live),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live
            .lock()
            .map(|live| live.contains(url))
            .unwrap_or(false)
    }
}

pub struct PreviewHandle {
    url: String,
    live: Arc<Mutex<HashSet<String>>>,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Ok(mut live) = self.live.lock() {
            if !live.remove(&self.url) {
                log::warn!("Preview {} released twice", self.url);
            }
        }
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.url).finish()
    }
}

#[derive(Debug)]
pub enum PreviewUrl {
    /// Allocated preview; released with the image.
    Handle(PreviewHandle),
    /// An existing `data:` URL; owns nothing.
    Data(String),
}

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        match self {
            PreviewUrl::Handle(handle) => handle.url(),
            PreviewUrl::Data(url) => url,
        }
    }
}

/// A reference image held by a session.
#[derive(Debug)]
pub struct ReferenceImage {
    pub base64: String,
    pub mime_type: String,
    pub preview: PreviewUrl,
}

impl ReferenceImage {
    pub fn from_upload(upload: &ImageUpload, previews: &PreviewRegistry) -> Result<Self> {
        let base64 = upload.to_base64()?;
        Ok(Self {
            base64,
            mime_type: upload.mime_type.clone(),
            preview: PreviewUrl::Handle(previews.allocate()),
        })
    }

    /// Reuses a previously generated image; its data URL doubles as the
    /// preview.
    pub fn from_bytes_with_data_preview(bytes: &[u8], mime_type: &str) -> Result<Self> {
        let base64 = encode_to_base64(bytes)?;
        let preview = PreviewUrl::Data(to_data_url(mime_type, &base64));
        Ok(Self {
            base64,
            mime_type: mime_type.to_string(),
            preview,
        })
    }

    pub fn preview_url(&self) -> &str {
        self.preview.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_roundtrip_to_bytes() {
        let b64 = encode_to_base64(b"\x89PNG").unwrap();
        let url = to_data_url("image/png", &b64);
        let decoded = data_url_to_binary(&url).unwrap();
        assert_eq!(decoded.bytes, b"\x89PNG".to_vec());
        assert_eq!(decoded.mime_type, "image/png");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(encode_to_base64(&[]), Err(GenAiError::Decode(_))));
        assert!(matches!(
            data_url_to_binary("https://example.com/a.png"),
            Err(GenAiError::Decode(_))
        ));
        assert!(matches!(
            data_url_to_binary("data:image/png;base64,***"),
            Err(GenAiError::Decode(_))
        ));
        assert!(matches!(
            ImageUpload::from_path("/definitely/not/here.png"),
            Err(GenAiError::Decode(_))
        ));
    }

    #[test]
    fn mime_guess() {
        assert_eq!(mime_from_path(Path::new("a/b.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("a/b")), "image/png");
    }

    #[test]
    fn previews_are_released_on_drop() {
        let previews = PreviewRegistry::new();
        let upload = ImageUpload::new(vec![1, 2, 3], "image/jpeg");
        let first = ReferenceImage::from_upload(&upload, &previews).unwrap();
        let second = ReferenceImage::from_upload(&upload, &previews).unwrap();
        assert_eq!(previews.live_count(), 2);
        assert!(previews.is_live(first.preview_url()));

        let released = first.preview_url().to_string();
        drop(first);
        assert_eq!(previews.live_count(), 1);
        assert!(!previews.is_live(&released));

        drop(second);
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn data_previews_own_nothing() {
        let image = ReferenceImage::from_bytes_with_data_preview(b"abc", "image/png").unwrap();
        assert_eq!(image.preview_url(), "data:image/png;base64,YWJj");
    }
}
