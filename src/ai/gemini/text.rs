use super::client::GeminiHttpClient;
use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use crate::ai::TextGenerationService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct GeminiTextClient {
    http: GeminiHttpClient,
    generation_config: GenerationConfig,
}

impl GeminiTextClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                model,
                Duration::from_secs(60),
                client,
            ),
            generation_config: GenerationConfig::default(),
        }
    }

    pub fn model(&self) -> &str {
        self.http.model()
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl TextGenerationService for GeminiTextClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(prompt)],
            }],
            generation_config: self.generation_config.clone(),
        };

        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(Error::AiProvider(format!(
                "Gemini blocked the prompt: {}",
                reason
            )));
        }

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| Error::AiProvider("No candidates in Gemini response".to_string()))?;

        candidate.text().ok_or_else(|| {
            Error::AiProvider(format!(
                "No text in Gemini response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })
    }
}
