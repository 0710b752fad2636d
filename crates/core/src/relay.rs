//! HTTP client for the analysis relay.
//!
//! The relay accepts `POST /analyze` with `{image, region}` and answers with
//! an [`AnalysisResult`]. A `503` means the inference process behind it is
//! down; any other non-2xx status is an analysis failure.

use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geometry::CaptureRect;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Something that can turn a captured region into an [`AnalysisResult`].
pub trait AnalysisBackend: Send + Sync {
    fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisResult>> + Send;
}

#[derive(Serialize)]
struct AnalyzeBody<'a> {
    image: &'a str,
    region: CaptureRect,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct RelayClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl RelayClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.relay_url.clone(),
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::config(format!("Invalid relay endpoint {path:?}: {e}")))
    }

    /// Hint shown when the relay cannot be reached at all.
    pub fn unreachable_hint(&self) -> String {
        format!(
            "Nothing is listening at {}. Start the analysis backend (`npm start` in backend/, \
             plus `npm run python` for the inference service) and draw the circle again.",
            self.base_url
        )
    }

    /// Checks that the relay answers `GET /health`.
    pub async fn health(&self) -> Result<()> {
        let response = self
            .http
            .get(self.endpoint("health")?)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::analysis(format!(
                "Health check returned {}",
                response.status()
            )))
        }
    }

    fn classify(&self, err: reqwest::Error) -> AppError {
        // Connect timeouts report both flags; the timeout wins
        if err.is_timeout() {
            AppError::AnalysisTimeout(self.timeout)
        } else if err.is_connect() {
            AppError::ServiceUnavailable {
                hint: self.unreachable_hint(),
            }
        } else {
            AppError::analysis(err.to_string())
        }
    }

    async fn error_message(response: reqwest::Response) -> Option<String> {
        let body = response.text().await.ok()?;
        serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .or_else(|| Some(body.trim().to_string()).filter(|s| !s.is_empty()))
    }
}

impl AnalysisBackend for RelayClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let url = self.endpoint("analyze")?;
        let body = AnalyzeBody {
            image: request.image.base64(),
            region: request.image.rect(),
        };

        log::debug!("POST {} ({} base64 bytes)", url, body.image.len());
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            let hint = Self::error_message(response)
                .await
                .unwrap_or_else(|| self.unreachable_hint());
            return Err(AppError::ServiceUnavailable { hint });
        }
        if !status.is_success() {
            let message = Self::error_message(response)
                .await
                .unwrap_or_else(|| format!("relay returned {}", status));
            return Err(AppError::analysis(message));
        }

        response
            .json::<AnalysisResult>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::AnalysisTimeout(self.timeout)
                } else {
                    AppError::analysis(format!("Malformed analysis result: {}", e))
                }
            })
    }
}
