//! AI service integration for text and image generation
//!
//! Text (the article body and the image descriptions) comes from Gemini; images
//! come from a FLUX Gradio Space. Both sit behind traits so the workflow can be
//! driven by mocks.

pub mod gemini;
pub mod gradio;
pub mod mock;

pub use gemini::GeminiTextClient;
pub use gradio::GradioImageClient;
pub use mock::{MockImageGenerationClient, MockTextClient};

use crate::models::ImageParams;
use crate::Result;
use async_trait::async_trait;
use tempfile::NamedTempFile;

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate_image(&self, prompt: &str, params: &ImageParams) -> Result<GeneratedImage>;
}

/// An image sitting in a temporary file. Dropping it deletes the file, so it
/// has to be handed to the store to survive.
#[derive(Debug)]
pub struct GeneratedImage {
    pub file: NamedTempFile,
    /// Seed reported back by the service, when it reports one.
    pub seed: Option<u64>,
}
