use crate::{Error, Result};
use serde_json::Value;

/// Interpret one message from a Gradio result stream.
///
/// `complete` yields the output values, `error` fails, anything else
/// (`generating`, `heartbeat`, ...) means keep reading.
pub fn interpret_message(event: &str, data: &str) -> Result<Option<Vec<Value>>> {
    match event {
        "complete" => serde_json::from_str(data).map(Some).map_err(|e| {
            Error::ImageService(format!("Malformed Gradio result payload: {}", e))
        }),
        "error" => {
            let detail = match data.trim() {
                "" | "null" => "no details given",
                other => other,
            };
            Err(Error::ImageService(format!(
                "Gradio reported an error: {}",
                detail
            )))
        }
        _ => Ok(None),
    }
}

/// Error for a stream that closed before a terminal event arrived.
pub fn stream_ended() -> Error {
    Error::ImageService("Gradio event stream ended without a result".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_returns_values() {
        let output = interpret_message("complete", "[{\"path\": \"/tmp/a.webp\"}, 99]")
            .unwrap()
            .unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(output[1], serde_json::json!(99));
    }

    #[test]
    fn test_progress_events_keep_reading() {
        assert!(interpret_message("generating", "null").unwrap().is_none());
        assert!(interpret_message("heartbeat", "null").unwrap().is_none());
    }

    #[test]
    fn test_error_event_surfaces_detail() {
        let err = interpret_message("error", "\"GPU quota exceeded\"").unwrap_err();
        assert!(matches!(err, Error::ImageService(_)));
        assert!(err.to_string().contains("GPU quota exceeded"));

        let err = interpret_message("error", "null").unwrap_err();
        assert!(err.to_string().contains("no details given"));
    }

    #[test]
    fn test_malformed_complete_payload() {
        let err = interpret_message("complete", "not json").unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }
}
