use super::events::{interpret_message, stream_ended};
use crate::ai::{GeneratedImage, ImageGenerationService};
use crate::models::ImageParams;
use crate::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[derive(Debug, Serialize)]
struct CallRequest {
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    event_id: String,
}

/// Gradio's description of a file output.
#[derive(Debug, Deserialize)]
struct FileData {
    path: Option<String>,
    url: Option<String>,
}

pub struct GradioImageClient {
    client: Client,
    space_url: String,
    api_name: String,
    token: Option<String>,
    submit_timeout: Duration,
    result_timeout: Duration,
}

impl GradioImageClient {
    pub fn new(space_url: String, api_name: String, token: Option<String>) -> Self {
        Self::new_with_client(space_url, api_name, token, Client::new())
    }

    pub fn new_with_client(
        space_url: String,
        api_name: String,
        token: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            client,
            space_url: space_url.trim_end_matches('/').to_string(),
            api_name: api_name.trim_start_matches('/').to_string(),
            token,
            submit_timeout: Duration::from_secs(30),
            result_timeout: Duration::from_secs(180),
        }
    }

    fn call_url(&self) -> String {
        format!("{}/gradio_api/call/{}", self.space_url, self.api_name)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await?;
        tracing::error!("Gradio {} failed (status {}): {}", what, status, error_text);
        Err(Error::ImageService(format!(
            "Gradio {} failed (status {}): {}",
            what, status, error_text
        )))
    }

    async fn submit(&self, prompt: &str, params: &ImageParams) -> Result<String> {
        let request = CallRequest {
            data: vec![
                Value::from(prompt),
                Value::from(params.seed),
                Value::from(params.randomize_seed),
                Value::from(params.width),
                Value::from(params.height),
                Value::from(params.num_inference_steps),
            ],
        };

        tracing::debug!("Submitting image request to Gradio ({})", self.call_url());
        let response = self
            .authorized(self.client.post(self.call_url()))
            .timeout(self.submit_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gradio: {}", e);
                e
            })?;

        let call: CallResponse = Self::check_status(response, "submission")
            .await?
            .json()
            .await?;
        Ok(call.event_id)
    }

    async fn await_output(&self, event_id: &str) -> Result<Vec<Value>> {
        let url = format!("{}/{}", self.call_url(), event_id);
        let request = self
            .authorized(self.client.get(&url))
            .timeout(self.result_timeout);

        let mut es = EventSource::new(request).map_err(|e| {
            Error::ImageService(format!("Failed to open Gradio result stream: {}", e))
        })?;

        // EventSource reconnects on its own, so close it on every exit path.
        let outcome = loop {
            match es.next().await {
                Some(Ok(Event::Open)) => tracing::debug!("Gradio result stream opened"),
                Some(Ok(Event::Message(msg))) => {
                    match interpret_message(&msg.event, &msg.data) {
                        Ok(Some(output)) => break Ok(output),
                        Ok(None) => tracing::debug!("Gradio event: {}", msg.event),
                        Err(e) => break Err(e),
                    }
                }
                Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                    break Err(stream_ended())
                }
                Some(Err(reqwest_eventsource::Error::InvalidStatusCode(status, response))) => {
                    let error_text = response.text().await.unwrap_or_default();
                    tracing::error!(
                        "Gradio result stream failed (status {}): {}",
                        status,
                        error_text
                    );
                    break Err(Error::ImageService(format!(
                        "Gradio result stream failed (status {}): {}",
                        status, error_text
                    )));
                }
                Some(Err(e)) => {
                    tracing::error!("Gradio result stream error: {}", e);
                    break Err(Error::ImageService(format!(
                        "Gradio result stream error: {}",
                        e
                    )));
                }
            }
        };
        es.close();
        outcome
    }

    fn file_url(&self, output: &Value) -> Result<String> {
        let file = match output {
            Value::String(path) => FileData {
                path: Some(path.clone()),
                url: None,
            },
            other => serde_json::from_value(other.clone()).map_err(|e| {
                Error::ImageService(format!("Unexpected Gradio image output: {}", e))
            })?,
        };

        match (file.url, file.path) {
            (Some(url), _) => Ok(url),
            (None, Some(path)) => Ok(format!("{}/gradio_api/file={}", self.space_url, path)),
            (None, None) => Err(Error::ImageService(
                "Gradio image output has neither url nor path".to_string(),
            )),
        }
    }

    async fn download(&self, url: &str) -> Result<NamedTempFile> {
        let mut response = Self::check_status(
            self.authorized(self.client.get(url))
                .timeout(self.result_timeout)
                .send()
                .await?,
            "download",
        )
        .await?;

        let mut file = tempfile::Builder::new()
            .prefix("quick-blogger-")
            .tempfile()?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)?;
            written += chunk.len();
        }
        file.flush()?;

        if written == 0 {
            return Err(Error::ImageService(format!(
                "Downloaded image from {} is empty",
                url
            )));
        }
        tracing::debug!("Downloaded {} bytes to {}", written, file.path().display());
        Ok(file)
    }
}

#[async_trait]
impl ImageGenerationService for GradioImageClient {
    async fn generate_image(&self, prompt: &str, params: &ImageParams) -> Result<GeneratedImage> {
        let event_id = self.submit(prompt, params).await?;
        let output = self.await_output(&event_id).await?;

        let image = output
            .first()
            .ok_or_else(|| Error::ImageService("Gradio returned no outputs".to_string()))?;
        let url = self.file_url(image)?;
        let seed = output.get(1).and_then(Value::as_u64);

        let file = self.download(&url).await?;
        Ok(GeneratedImage { file, seed })
    }
}
