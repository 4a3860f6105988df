use crate::{
    error::{GenAiError, Result},
    transport::{HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Answers requests from a script, in order, and records what was sent.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
    downloads: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push_raw(status, &body.to_string())
    }

    pub fn push_raw(&self, status: u16, body: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn push_err(&self, err: GenAiError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn serve_bytes(&self, url: &str, bytes: &[u8]) -> &Self {
        self.downloads
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Text parts of every recorded request, flattened.
    pub fn sent_texts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .flat_map(|r| {
                let mut texts = Vec::new();
                collect_strings(&r.body, &mut texts);
                texts
            })
            .collect()
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                match v {
                    Value::String(s) if key == "text" || key == "prompt" => out.push(s.clone()),
                    _ => collect_strings(v, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GenAiError::Transport {
                    status: None,
                    message: "no scripted response".into(),
                })
            })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.downloads
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| GenAiError::Transport {
                status: Some(404),
                message: format!("not found: {}", url),
            })
    }
}

pub fn gemini_text(text: &str) -> Value {
    json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
}

pub fn imagen_predictions(count: usize) -> Value {
    let predictions: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "bytesBase64Encoded": STANDARD.encode(format!("IMG{}", i)),
                "mimeType": "image/png"
            })
        })
        .collect();
    json!({ "predictions": predictions })
}
