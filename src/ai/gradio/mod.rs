//! Gradio Space client for hosted image models
//!
//! Speaks the queue-based REST API every Gradio app exposes: submit the inputs,
//! read the event stream for the outputs, then download the produced file.

pub mod client;
pub mod events;

pub use client::GradioImageClient;
pub use events::interpret_message;
