// src/protocol.rs
//
// JSON framing: one request object in, one response object out.

use crate::config::ComposeConfig;
use crate::engine::{encode_payload, Composition, Dispatcher, LayeredFormat};
use crate::error::{MockupError, Result};
use crate::ops::Method;
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct ComposeRequest {
    /// Base64 mockup, optionally a data URI
    pub mockup: String,
    /// Base64 artwork, optionally a data URI
    pub artwork: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl ComposeRequest {
    pub fn parse(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| MockupError::invalid_request(e.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ComposeResponse {
    Success {
        success: bool,
        result: String,
        method: Method,
        size: Size,
    },
    Failure {
        success: bool,
        error: String,
        #[serde(rename = "type")]
        kind: &'static str,
    },
}

impl ComposeResponse {
    pub fn success(composition: &Composition) -> Self {
        Self::Success {
            success: true,
            result: encode_payload(&composition.jpeg),
            method: composition.method,
            size: Size {
                width: composition.width,
                height: composition.height,
            },
        }
    }

    pub fn failure(err: &MockupError) -> Self {
        Self::Failure {
            success: false,
            error: err.to_string(),
            kind: err.kind(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Single-line JSON rendering.
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            // Only string and integer fields; serialization cannot fail.
            Err(e) => format!(r#"{{"success":false,"error":"{e}","type":"InternalError"}}"#),
        }
    }
}

/// Parse `input`, run the composition and wrap the outcome. Never fails:
/// every error becomes a failure response.
pub fn handle_request<F: LayeredFormat>(dispatcher: &Dispatcher<F>, input: &str) -> ComposeResponse {
    match process(dispatcher, input) {
        Ok(composition) => ComposeResponse::success(&composition),
        Err(err) => {
            error!(kind = err.kind(), category = err.category().as_str(), error = %err, "request failed");
            ComposeResponse::failure(&err)
        }
    }
}

fn process<F: LayeredFormat>(dispatcher: &Dispatcher<F>, input: &str) -> Result<Composition> {
    let request = ComposeRequest::parse(input)?;
    dispatcher.compose_encoded(&request.mockup, &request.artwork, request.filename.as_deref())
}

/// Convenience entry point with the PSD backend.
pub fn process_request(input: &str, config: ComposeConfig) -> ComposeResponse {
    handle_request(&Dispatcher::new(config), input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use serde_json::{json, Value};
    use std::io::Cursor;

    fn png_b64(width: u32, height: u32, rgb: [u8; 3]) -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        encode_payload(&buf)
    }

    fn run(request: Value) -> Value {
        let response = process_request(&request.to_string(), ComposeConfig::default());
        serde_json::from_str(&response.to_json()).unwrap()
    }

    #[test]
    fn success_response_shape() {
        let out = run(json!({
            "mockup": png_b64(400, 300, [255, 255, 255]),
            "artwork": png_b64(200, 100, [0, 0, 0]),
            "filename": "test.png",
        }));
        assert_eq!(out["success"], true);
        assert_eq!(out["method"], "image");
        assert_eq!(out["size"], json!({"width": 400, "height": 300}));
        assert!(!out["result"].as_str().unwrap().is_empty());
        assert!(out.get("error").is_none());
    }

    #[test]
    fn data_uri_prefix_is_accepted() {
        let out = run(json!({
            "mockup": format!("data:image/png;base64,{}", png_b64(20, 20, [255, 255, 255])),
            "artwork": format!("data:image/png;base64,{}", png_b64(5, 5, [0, 0, 0])),
            "filename": "flat.jpg",
        }));
        assert_eq!(out["success"], true);
    }

    #[test]
    fn default_filename_routes_to_layered_path() {
        let out = run(json!({
            "mockup": png_b64(20, 20, [255, 255, 255]),
            "artwork": png_b64(5, 5, [0, 0, 0]),
        }));
        assert_eq!(out["success"], true);
        assert_eq!(out["method"], "fallback");
    }

    #[test]
    fn malformed_json_is_invalid_request() {
        let response = process_request("{not json", ComposeConfig::default());
        assert!(!response.is_success());
        let out: Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(out["success"], false);
        assert_eq!(out["type"], "InvalidRequest");
    }

    #[test]
    fn missing_field_is_invalid_request() {
        let out = run(json!({ "mockup": png_b64(2, 2, [0, 0, 0]) }));
        assert_eq!(out["success"], false);
        assert_eq!(out["type"], "InvalidRequest");
        assert!(out["error"].as_str().unwrap().contains("artwork"));
    }

    #[test]
    fn malformed_base64_is_decode_error() {
        let out = run(json!({
            "mockup": "!!!not base64!!!",
            "artwork": png_b64(2, 2, [0, 0, 0]),
        }));
        assert_eq!(out["success"], false);
        assert_eq!(out["type"], "DecodeError");
    }

    #[test]
    fn response_is_a_single_line() {
        let response = process_request("[]", ComposeConfig::default());
        assert!(!response.to_json().contains('\n'));
    }
}
