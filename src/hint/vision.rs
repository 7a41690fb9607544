//! Layout hints from a vision-capable language model.

use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::raster::PageRaster;
use super::response::parse;
use super::{HintError, HintOutcome, HintProvider};
use crate::error::{Error, Result};
use crate::model::LayoutHint;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const LAYOUT_PROMPT: &str = r#"This image is a sketch of one PDF page: dark bars are text lines, grey or pictured areas are images, outlined boxes are tables. Answer with JSON only, no explanation:
{
  "num_columns": <number of text columns in the body, 1 to 4>,
  "column_positions": [[<left %>, <right %>], ...],
  "tables": [[<x0 %>, <y0 %>, <x1 %>, <y1 %>], ...],
  "elements": [{"type": "text" | "image" | "table", "bbox": [<x0 %>, <y0 %>, <x1 %>, <y1 %>]}, ...]
}
Positions are percentages of the page width and height measured from the top-left corner. List "elements" in the order a person would read them."#;

/// Settings for [`VisionHintProvider`].
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub endpoint: String,
    pub model: String,
    /// Credential; falls back to `ANTHROPIC_API_KEY` when unset.
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
    /// Resolution of the page sketch sent with each request.
    pub dpi: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_tokens: 2048,
            dpi: 150.0,
        }
    }
}

impl VisionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_dpi(mut self, dpi: f32) -> Self {
        self.dpi = dpi;
        self
    }

    /// The configured credential, else the environment's. Blank keys count
    /// as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Hint provider backed by the Anthropic Messages API.
///
/// One blocking request per page, bounded by the configured timeout and
/// never retried.
pub struct VisionHintProvider {
    config: VisionConfig,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl VisionHintProvider {
    pub fn new(config: VisionConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            log::info!("No {} set; layout hints unavailable", API_KEY_ENV);
        }
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn request(&self, raster: &PageRaster) -> std::result::Result<LayoutHint, HintError> {
        let key = self.api_key.as_deref().ok_or(HintError::MissingCredential)?;
        if raster.png.is_empty() {
            return Err(HintError::Raster("empty page raster".to_string()));
        }
        let data = base64::engine::general_purpose::STANDARD.encode(&raster.png);

        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {"type": "base64", "media_type": "image/png", "data": data}
                    },
                    {"type": "text", "text": LAYOUT_PROMPT}
                ]
            }]
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    HintError::Timeout
                } else {
                    HintError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HintError::Status(status.as_u16()));
        }

        let message: MessagesResponse = response
            .json()
            .map_err(|e| HintError::Malformed(e.to_string()))?;
        let text = message
            .content
            .into_iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text)
            .ok_or_else(|| HintError::Malformed("no text block in response".to_string()))?;

        parse(&text, raster.page_width, raster.page_height)
    }
}

impl HintProvider for VisionHintProvider {
    fn get_hint(&self, raster: &PageRaster) -> HintOutcome {
        let outcome: HintOutcome = self.request(raster).into();
        if let HintOutcome::Unavailable(reason) = &outcome {
            log::debug!("Layout hint unavailable: {}", reason);
        }
        outcome
    }

    fn is_available(&self) -> bool {
        self.has_credential()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = VisionConfig::new()
            .with_api_key("  sk-test  ")
            .with_timeout(Duration::from_secs(5))
            .with_max_tokens(512);
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-test"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_unreachable_service_is_unavailable() {
        let config = VisionConfig::new()
            .with_api_key("sk-test")
            .with_endpoint("http://127.0.0.1:9/v1/messages")
            .with_timeout(Duration::from_secs(2));
        let provider = VisionHintProvider::new(config).unwrap();
        let raster = PageRaster {
            png: vec![0x89, b'P', b'N', b'G'],
            width_px: 1,
            height_px: 1,
            page_width: 612.0,
            page_height: 792.0,
        };
        assert!(matches!(provider.get_hint(&raster), HintOutcome::Unavailable(_)));
    }

    #[test]
    fn test_blank_raster_is_unavailable() {
        let provider = VisionHintProvider::new(VisionConfig::new().with_api_key("sk-test")).unwrap();
        assert!(provider.is_available());
        let raster = PageRaster {
            png: Vec::new(),
            width_px: 0,
            height_px: 0,
            page_width: 612.0,
            page_height: 792.0,
        };
        assert_eq!(
            provider.get_hint(&raster),
            HintOutcome::Unavailable("page raster failed: empty page raster".to_string())
        );
    }
}
