//! Data models and structures
//!
//! Defines the blog request/result types produced by the workflow and the
//! environment-driven configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub const WORD_COUNT_RANGE: RangeInclusive<u32> = 200..=1000;
pub const IMAGE_COUNT_RANGE: RangeInclusive<u32> = 1..=6;

/// What the user asked for. Validated on construction and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBlogRequest")]
pub struct BlogRequest {
    title: String,
    keywords: Vec<String>,
    target_word_count: u32,
    image_count: u32,
}

/// Unchecked wire form; deserialized requests go through [`BlogRequest::new`].
#[derive(Deserialize)]
struct RawBlogRequest {
    title: String,
    keywords: Vec<String>,
    target_word_count: u32,
    image_count: u32,
}

impl TryFrom<RawBlogRequest> for BlogRequest {
    type Error = crate::Error;

    fn try_from(raw: RawBlogRequest) -> crate::Result<Self> {
        BlogRequest::new(
            raw.title,
            raw.keywords,
            raw.target_word_count,
            raw.image_count,
        )
    }
}

impl BlogRequest {
    pub fn new(
        title: String,
        keywords: Vec<String>,
        target_word_count: u32,
        image_count: u32,
    ) -> crate::Result<Self> {
        if !WORD_COUNT_RANGE.contains(&target_word_count) {
            return Err(crate::Error::InvalidRequest(format!(
                "target word count {} is outside {}..={}",
                target_word_count,
                WORD_COUNT_RANGE.start(),
                WORD_COUNT_RANGE.end()
            )));
        }
        if !IMAGE_COUNT_RANGE.contains(&image_count) {
            return Err(crate::Error::InvalidRequest(format!(
                "image count {} is outside {}..={}",
                image_count,
                IMAGE_COUNT_RANGE.start(),
                IMAGE_COUNT_RANGE.end()
            )));
        }

        Ok(Self {
            title,
            keywords,
            target_word_count,
            image_count,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn target_word_count(&self) -> u32 {
        self.target_word_count
    }

    pub fn image_count(&self) -> u32 {
        self.image_count
    }
}

/// Split a comma-separated keyword field, keeping order and dropping blanks.
pub fn parse_keywords(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogResult {
    pub body_text: String,
    pub word_count: usize,
}

impl BlogResult {
    pub fn from_text(text: &str) -> Self {
        let body_text = text.trim().to_string();
        let word_count = count_words(&body_text);
        Self {
            body_text,
            word_count,
        }
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ImageOutcome {
    Saved {
        local_path: PathBuf,
        /// Seed the image service reports having used; differs from the
        /// requested one when it randomizes.
        seed: Option<u64>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub index: u32,
    pub description_prompt: Option<String>,
    #[serde(flatten)]
    pub outcome: ImageOutcome,
}

impl ImageResult {
    pub fn local_path(&self) -> Option<&Path> {
        match &self.outcome {
            ImageOutcome::Saved { local_path, .. } => Some(local_path.as_path()),
            ImageOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ImageOutcome::Saved { .. } => None,
            ImageOutcome::Failed { error } => Some(error.as_str()),
        }
    }

    pub fn caption(&self) -> String {
        format!("Generated Image {}", self.index)
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogOutcome {
    pub request: BlogRequest,
    pub blog: BlogResult,
    pub images: Vec<ImageResult>,
    pub generated_at: DateTime<Utc>,
}

impl BlogOutcome {
    pub fn failed_images(&self) -> impl Iterator<Item = &ImageResult> {
        self.images.iter().filter(|img| img.error().is_some())
    }
}

/// Parameters forwarded to the image model with every description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageParams {
    pub seed: u64,
    pub randomize_seed: bool,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
}

impl ImageParams {
    pub fn for_index(index: u32) -> Self {
        Self {
            seed: u64::from(index),
            randomize_seed: true,
            width: 1024,
            height: 1024,
            num_inference_steps: 4,
        }
    }
}

// Configuration
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_IMAGE_SPACE_URL: &str = "https://black-forest-labs-flux-1-schnell.hf.space";
pub const DEFAULT_IMAGE_API_NAME: &str = "infer";
pub const DEFAULT_OUTPUT_DIR: &str = "generated_images";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub image_space_url: String,
    pub image_api_name: String,
    pub hf_token: Option<String>,
    pub output_dir: PathBuf,
    pub dry_run: bool,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dry_run = match non_empty("DRY_RUN") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                crate::Error::Config(format!("DRY_RUN must be true or false, got '{}'", value))
            })?,
            None => false,
        };

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("GOOGLE_API_KEY")),
            gemini_model: non_empty("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            image_space_url: non_empty("IMAGE_SPACE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_IMAGE_SPACE_URL.to_string()),
            image_api_name: non_empty("IMAGE_API_NAME")
                .unwrap_or_else(|| DEFAULT_IMAGE_API_NAME.to_string()),
            hf_token: non_empty("HF_TOKEN"),
            output_dir: non_empty("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            dry_run,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
