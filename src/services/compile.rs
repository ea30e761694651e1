//! HTTP client for the LaTeX compile backend
//!
//! `POST {base}/compile/pdf` with `{"latex_content": …}` and a bearer
//! credential. A 2xx response body is the PDF; anything else carries an
//! error detail, either as JSON `{"detail": …}` or as plain text.

use super::CompileService;
use crate::config::TexnoteConfig;
use crate::error::{Result, TexnoteError};
use crate::types::BearerToken;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

const FALLBACK_MESSAGE: &str = "Compilation failed";

/// Configuration for the compile client
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Backend base URL, without trailing slash
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,
}

impl From<&TexnoteConfig> for CompileConfig {
    fn from(config: &TexnoteConfig) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompileRequest<'a> {
    latex_content: &'a str,
}

/// Human-readable message from a failed compile response body
///
/// A JSON body yields its `detail` when that is present and not empty, and
/// the fallback otherwise. Anything that is not JSON is shown as-is.
pub fn error_message(body: &str) -> String {
    use serde_json::Value;

    match serde_json::from_str::<Value>(body) {
        Ok(payload) => match payload.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
            None | Some(Value::Null) | Some(Value::String(_)) | Some(Value::Bool(false)) => {
                FALLBACK_MESSAGE.to_string()
            }
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => FALLBACK_MESSAGE.to_string(),
            Some(other) => other.to_string(),
        },
        Err(_) if body.trim().is_empty() => FALLBACK_MESSAGE.to_string(),
        Err(_) => body.to_string(),
    }
}

/// Compile backend client
pub struct CompileClient {
    config: CompileConfig,
    client: reqwest::Client,
}

impl CompileClient {
    pub fn new(config: CompileConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/compile/pdf", self.config.base_url)
    }
}

#[async_trait]
impl CompileService for CompileClient {
    async fn compile(&self, source: &str, credential: &BearerToken) -> Result<Vec<u8>> {
        let url = self.endpoint();
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.expose())
            .json(&CompileRequest {
                latex_content: source,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let pdf = response.bytes().await?.to_vec();
            info!("Compiled document ({} bytes)", pdf.len());
            return Ok(pdf);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("Compile backend answered {}", status);
        Err(TexnoteError::collaborator("compile", error_message(&body)))
    }
}
