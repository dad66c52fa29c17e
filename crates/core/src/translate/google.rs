//! Google Translate backed translator implementation.
//! This talks to the public `translate_a/single` endpoint, which answers with
//! nested JSON arrays instead of an object.

use super::Translator;
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

/// Public endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";

/// Per-request timeout used by `GoogleTranslator::new`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Translator that delegates to the Google Translate web API.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: Client,
    base_url: String,
}

impl GoogleTranslator {
    /// Create a translator for the public endpoint.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a translator for a custom endpoint, e.g. a proxy or a mock server.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Concatenate the translated segments of a `translate_a/single` reply.
/// The reply looks like `[[["Hola","Hello",...],["mundo","world",...]],...]`.
fn extract_translation(value: &Value) -> Result<String, ProviderError> {
    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Malformed("missing segment list".into()))?;
    let mut out = String::new();
    for segment in segments {
        if let Some(text) = segment.get(0).and_then(Value::as_str) {
            out.push_str(text);
        }
    }
    if out.is_empty() {
        return Err(ProviderError::Malformed("empty translation".into()));
    }
    Ok(out)
}

#[async_trait]
impl Translator for GoogleTranslator {
    /// Send one text to the endpoint and return the joined translation.
    async fn translate(
        &self,
        text: &str,
        source: &str,
        dest: &str,
    ) -> Result<String, ProviderError> {
        trace!("google translate {source}->{dest} len={}", text.len());
        let resp = self
            .client
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", dest),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }
        let value: Value = resp.json().await?;
        extract_translation(&value)
    }
}
