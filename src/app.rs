//! Blog generation workflow: article text first, then one illustration per
//! requested image, each image failing independently.

use crate::ai::{
    GeminiTextClient, GradioImageClient, ImageGenerationService, MockImageGenerationClient,
    MockTextClient, TextGenerationService,
};
use crate::models::{
    BlogOutcome, BlogRequest, BlogResult, Config, ImageOutcome, ImageParams, ImageResult,
};
use crate::storage::ImageStore;
use crate::{prompts, Error, Result};
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

pub struct App {
    text: Box<dyn TextGenerationService>,
    image_gen: Box<dyn ImageGenerationService>,
    store: ImageStore,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub text: Box<dyn TextGenerationService>,
    pub image_gen: Box<dyn ImageGenerationService>,
}

/// What one image attempt got to before it stopped.
struct ImageAttempt {
    description_prompt: Option<String>,
    result: Result<(PathBuf, Option<u64>)>,
}

impl App {
    pub fn with_services(services: AppServices, output_dir: PathBuf) -> Self {
        Self {
            text: services.text,
            image_gen: services.image_gen,
            store: ImageStore::new(&output_dir),
        }
    }

    /// Build an app from configuration. Dry runs use the mock services and
    /// need no credentials.
    pub fn new(config: &Config) -> Result<Self> {
        let services = if config.dry_run {
            info!("DRY_RUN enabled, using mock text and image services");
            AppServices {
                text: Box::new(MockTextClient::new()),
                image_gen: Box::new(MockImageGenerationClient::new()),
            }
        } else {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                Error::Config("GEMINI_API_KEY (or GOOGLE_API_KEY) not set".to_string())
            })?;

            // Reuse one HTTP connection pool across provider clients.
            let http_client = reqwest::Client::new();

            info!("Text provider: Gemini (model: {})", config.gemini_model);
            info!(
                "Image provider: Gradio space {} (api: /{})",
                config.image_space_url, config.image_api_name
            );

            AppServices {
                text: Box::new(GeminiTextClient::new_with_client(
                    api_key,
                    config.gemini_model.clone(),
                    http_client.clone(),
                )),
                image_gen: Box::new(GradioImageClient::new_with_client(
                    config.image_space_url.clone(),
                    config.image_api_name.clone(),
                    config.hf_token.clone(),
                    http_client,
                )),
            }
        };

        Ok(Self::with_services(services, config.output_dir.clone()))
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Run the whole workflow for one request.
    ///
    /// A failure producing the article body is returned as `Err` before any
    /// image is attempted. Image failures are recorded per index and never
    /// stop the run.
    pub async fn generate(&self, request: &BlogRequest) -> Result<BlogOutcome> {
        info!(
            "Generating blog \"{}\" (~{} words, {} image(s))",
            request.title(),
            request.target_word_count(),
            request.image_count()
        );

        let body = self
            .text
            .generate_text(&prompts::blog_post(request))
            .await?;
        let blog = BlogResult::from_text(&body);
        info!("Generated blog body ({} words)", blog.word_count);

        self.store.ensure_dir()?;

        let mut images = Vec::with_capacity(request.image_count() as usize);
        for index in 1..=request.image_count() {
            let attempt = self.generate_image(request.title(), index).await;
            let outcome = match attempt.result {
                Ok((local_path, seed)) => {
                    info!("[image {}] Saved to {}", index, local_path.display());
                    ImageOutcome::Saved { local_path, seed }
                }
                Err(e) => {
                    warn!("[image {}] Generation failed: {}", index, e);
                    ImageOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            images.push(ImageResult {
                index,
                description_prompt: attempt.description_prompt,
                outcome,
            });
        }

        Ok(BlogOutcome {
            request: request.clone(),
            blog,
            images,
            generated_at: Utc::now(),
        })
    }

    async fn generate_image(&self, title: &str, index: u32) -> ImageAttempt {
        let description = match self.text.generate_text(&prompts::image_description(title)).await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                return ImageAttempt {
                    description_prompt: None,
                    result: Err(e),
                }
            }
        };
        info!(
            "[image {}] Description ({} chars): {}",
            index,
            description.len(),
            description
        );

        let result = self.render_description(&description, index).await;
        ImageAttempt {
            description_prompt: Some(description),
            result,
        }
    }

    async fn render_description(
        &self,
        description: &str,
        index: u32,
    ) -> Result<(PathBuf, Option<u64>)> {
        let params = ImageParams::for_index(index);
        let image = self.image_gen.generate_image(description, &params).await?;
        let seed = image.seed;
        let local_path = self.store.store(index, image)?;
        Ok((local_path, seed))
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppServices};
    use crate::ai::{MockImageGenerationClient, MockTextClient};
    use crate::models::{BlogRequest, Config, ImageOutcome};
    use crate::Error;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn request(images: u32) -> BlogRequest {
        BlogRequest::new(
            "Rust vs Go".to_string(),
            vec!["performance".to_string(), "concurrency".to_string()],
            200,
            images,
        )
        .unwrap()
    }

    fn build_test_app(
        output_dir: PathBuf,
        text: MockTextClient,
        image_gen: MockImageGenerationClient,
    ) -> App {
        App::with_services(
            AppServices {
                text: Box::new(text),
                image_gen: Box::new(image_gen),
            },
            output_dir,
        )
    }

    #[tokio::test]
    async fn test_generate_produces_one_result_per_image_in_order() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new()
            .with_response("  Rust and Go\ncompared side by side.  ".to_string());
        let app = build_test_app(
            dir.path().to_path_buf(),
            text,
            MockImageGenerationClient::new(),
        );

        let outcome = app.generate(&request(4)).await.unwrap();

        assert_eq!(outcome.blog.body_text, "Rust and Go\ncompared side by side.");
        assert_eq!(outcome.blog.word_count, 7);
        let indices: Vec<u32> = outcome.images.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        for image in &outcome.images {
            let expected = dir
                .path()
                .join(format!("generated_image_{}.webp", image.index));
            assert_eq!(image.local_path(), Some(expected.as_path()));
            assert!(expected.exists());
        }
    }

    #[tokio::test]
    async fn test_prompts_and_params_sent_to_services() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new();
        let text_calls = text.clone();
        let image_gen = MockImageGenerationClient::new();
        let image_calls = image_gen.clone();
        let app = build_test_app(dir.path().to_path_buf(), text, image_gen);

        let outcome = app.generate(&request(2)).await.unwrap();

        let prompts = text_calls.get_prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("performance, concurrency"));
        assert!(prompts[0].contains("approximately 200 words"));
        assert!(prompts[1].contains("image description"));
        assert_eq!(prompts[1], prompts[2]);

        let requests = image_calls.get_requests();
        assert_eq!(requests.len(), 2);
        for (i, (prompt, params)) in requests.iter().enumerate() {
            assert_eq!(params.seed, i as u64 + 1);
            assert!(params.randomize_seed);
            assert_eq!(params.num_inference_steps, 4);
            assert_eq!(
                outcome.images[i].description_prompt.as_deref(),
                Some(prompt.as_str())
            );
        }
    }

    #[tokio::test]
    async fn test_body_failure_is_fatal_and_skips_images() {
        let dir = tempdir().unwrap();
        let image_gen = MockImageGenerationClient::new();
        let image_calls = image_gen.clone();
        let app = build_test_app(
            dir.path().join("out"),
            MockTextClient::new().with_failure_on_call(1),
            image_gen,
        );

        let err = app.generate(&request(3)).await.unwrap_err();

        assert!(matches!(err, Error::AiProvider(_)));
        assert_eq!(image_calls.get_call_count(), 0);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_unusable_output_dir_is_fatal() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"plain file").unwrap();

        let image_gen = MockImageGenerationClient::new();
        let image_calls = image_gen.clone();
        let app = build_test_app(blocker, MockTextClient::new(), image_gen);

        let err = app.generate(&request(2)).await.unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(image_calls.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_image_failure_is_isolated() {
        let dir = tempdir().unwrap();
        let app = build_test_app(
            dir.path().to_path_buf(),
            MockTextClient::new(),
            MockImageGenerationClient::new().with_failure_on_call(2),
        );

        let outcome = app.generate(&request(3)).await.unwrap();

        assert_eq!(outcome.images.len(), 3);
        assert!(outcome.images[0].local_path().is_some());
        assert!(outcome.images[1].local_path().is_none());
        assert!(outcome.images[1]
            .error()
            .unwrap()
            .contains("Mock image failure"));
        assert!(outcome.images[1].description_prompt.is_some());
        assert!(outcome.images[2].local_path().is_some());
        assert_eq!(outcome.failed_images().count(), 1);
        assert!(!outcome.blog.body_text.is_empty());
    }

    #[tokio::test]
    async fn test_description_failure_is_recorded_without_prompt() {
        let dir = tempdir().unwrap();
        let image_gen = MockImageGenerationClient::new();
        let image_calls = image_gen.clone();
        // Call 1 is the body, call 2 the first description.
        let app = build_test_app(
            dir.path().to_path_buf(),
            MockTextClient::new().with_failure_on_call(2),
            image_gen,
        );

        let outcome = app.generate(&request(2)).await.unwrap();

        assert_eq!(outcome.images[0].description_prompt, None);
        assert!(outcome.images[0].error().is_some());
        assert!(matches!(
            outcome.images[1].outcome,
            ImageOutcome::Saved { .. }
        ));
        assert_eq!(image_calls.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_by_index() {
        let dir = tempdir().unwrap();
        let app = build_test_app(
            dir.path().to_path_buf(),
            MockTextClient::new(),
            MockImageGenerationClient::new(),
        );

        app.generate(&request(5)).await.unwrap();
        let outcome = app.generate(&request(3)).await.unwrap();

        let paths: Vec<PathBuf> = outcome
            .images
            .iter()
            .filter_map(|i| i.local_path().map(|p| p.to_path_buf()))
            .collect();
        assert_eq!(
            paths,
            (1..=3)
                .map(|i| dir.path().join(format!("generated_image_{}.webp", i)))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_new_requires_api_key_outside_dry_run() {
        let config = Config::from_lookup(|_| None).unwrap();
        let err = App::new(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));

        let dry = Config::from_lookup(|key| (key == "DRY_RUN").then(|| "true".to_string())).unwrap();
        assert!(App::new(&dry).is_ok());
    }
}
