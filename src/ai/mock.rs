use super::{GeneratedImage, ImageGenerationService, TextGenerationService};
use crate::models::ImageParams;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Minimal RIFF/WEBP header; enough for format sniffing.
pub const MOCK_WEBP_BYTES: &[u8] = &[
    0x52, 0x49, 0x46, 0x46, 0x1A, 0x00, 0x00, 0x00, // RIFF + size
    0x57, 0x45, 0x42, 0x50, // WEBP
    0x56, 0x50, 0x38, 0x4C, 0x0D, 0x00, 0x00, 0x00, // VP8L chunk
    0x2F, 0x00, 0x00, 0x00, 0x10, 0x07, 0x10, 0x11, 0x11, 0x88, 0x88, 0xFE, 0x07, 0x00,
];

#[derive(Clone)]
pub struct MockTextClient {
    responses: Arc<Mutex<Vec<String>>>,
    failing_calls: Arc<Mutex<HashSet<usize>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockTextClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failing_calls: Arc::new(Mutex::new(HashSet::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a response; queued responses are served in order and cycle.
    pub fn with_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Make the n-th call (1-based) fail.
    pub fn with_failure_on_call(self, call: usize) -> Self {
        self.failing_calls.lock().unwrap().insert(call);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Every prompt received so far, in order.
    pub fn get_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockTextClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerationService for MockTextClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };

        if self.failing_calls.lock().unwrap().contains(&call) {
            return Err(Error::AiProvider(format!("Mock text failure on call {}", call)));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(format!("Mock response {} for: {}", call, prompt))
        } else {
            Ok(responses[(call - 1) % responses.len()].clone())
        }
    }
}

#[derive(Clone)]
pub struct MockImageGenerationClient {
    image_bytes: Arc<Mutex<Vec<u8>>>,
    failing_calls: Arc<Mutex<HashSet<usize>>>,
    requests: Arc<Mutex<Vec<(String, ImageParams)>>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            image_bytes: Arc::new(Mutex::new(MOCK_WEBP_BYTES.to_vec())),
            failing_calls: Arc::new(Mutex::new(HashSet::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_image_bytes(self, bytes: Vec<u8>) -> Self {
        *self.image_bytes.lock().unwrap() = bytes;
        self
    }

    /// Make the n-th call (1-based) fail.
    pub fn with_failure_on_call(self, call: usize) -> Self {
        self.failing_calls.lock().unwrap().insert(call);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn get_requests(&self) -> Vec<(String, ImageParams)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_image(&self, prompt: &str, params: &ImageParams) -> Result<GeneratedImage> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((prompt.to_string(), *params));
            requests.len()
        };

        if self.failing_calls.lock().unwrap().contains(&call) {
            return Err(Error::ImageService(format!(
                "Mock image failure on call {}",
                call
            )));
        }

        let bytes = self.image_bytes.lock().unwrap().clone();
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&bytes)?;
        file.flush()?;

        Ok(GeneratedImage {
            file,
            seed: Some(params.seed * 1000),
        })
    }
}
