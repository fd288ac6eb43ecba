//! Quick Blogger - writes a blog post and illustrates it with AI-generated images
//!
//! The body text and the per-image descriptions come from a Gemini text model;
//! the descriptions are rendered into pictures by a hosted FLUX Gradio Space and
//! the results are moved into a local output directory.

pub mod ai;
pub mod app;
pub mod error;
pub mod models;
pub mod prompts;
pub mod storage;

pub use error::{Error, Result};
