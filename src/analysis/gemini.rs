// src/analysis/gemini.rs
//! Hosted model boundary. Callers get raw JSON text back; parsing and
//! validation happen in the requestor.

use crate::environment::GeminiConfig;
use crate::error::{PilotError, PilotResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `prompt` and demand a JSON document matching `schema`.
    async fn generate_json(
        &self,
        prompt: &str,
        schema: Value,
        temperature: f32,
    ) -> PilotResult<String>;
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text).filter(|t| !t.trim().is_empty())
    }
}

pub struct GeminiClient {
    client: Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// A missing key is reported on the first call, not here.
    pub fn new(config: &GeminiConfig, api_key: Option<String>) -> PilotResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PilotError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate_json(
        &self,
        prompt: &str,
        schema: Value,
        temperature: f32,
    ) -> PilotResult<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PilotError::AnalysisFailed("GEMINI_API_KEY is not configured".to_string())
        })?;

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
                temperature,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        info!("Sending request to Gemini model {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PilotError::AnalysisFailed(format!("Model request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Gemini API error {}: {}", status, error_text);
            return Err(PilotError::AnalysisFailed(format!(
                "Model returned status {}",
                status.as_u16()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PilotError::AnalysisFailed(format!("Unreadable model response: {}", e)))?;

        let text = body
            .text()
            .ok_or_else(|| PilotError::AnalysisFailed("Model returned no content".to_string()))?;
        debug!("Model returned {} bytes", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> GeminiConfig {
        GeminiConfig {
            api_base: server.uri(),
            model: "gemini-2.5-flash".to_string(),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_generate_json_posts_schema_and_joins_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "key-1"))
            .and(body_partial_json(json!({
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": {"type": "OBJECT"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config(&server), Some("key-1".to_string())).unwrap();
        let text = client
            .generate_json("hello", json!({"type": "OBJECT"}), 0.3)
            .await
            .unwrap();
        assert_eq!(text, "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config(&server), None).unwrap();
        let err = client
            .generate_json("hello", json!({}), 0.3)
            .await
            .unwrap_err();
        assert!(matches!(err, PilotError::AnalysisFailed(_)));
    }

    #[tokio::test]
    async fn test_error_status_and_empty_candidates_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config(&server), Some("key".to_string())).unwrap();
        let first = client.generate_json("a", json!({}), 0.2).await.unwrap_err();
        assert!(first.to_string().contains("503"));

        let second = client.generate_json("a", json!({}), 0.2).await.unwrap_err();
        assert!(matches!(second, PilotError::AnalysisFailed(_)));
    }
}
