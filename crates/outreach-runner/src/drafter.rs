//! OpenAI-compatible HTTP drafting backend.
//!
//! One stateless chat-completion call per draft: the engine's system
//! instruction plus the grounding evidence text. Any failure here is
//! recovered by the engine's template fallback, so errors map to
//! `DraftError` and never panic.

use std::time::Duration;

use async_trait::async_trait;
use outreach_engine::{DraftBackend, DraftError, DraftRequest};
use tracing::debug;

use crate::config::DrafterEndpoint;

/// Reqwest-based drafting backend for any OpenAI-compatible endpoint.
pub struct HttpDraftBackend {
    endpoint: DrafterEndpoint,
    client: reqwest::Client,
}

impl HttpDraftBackend {
    pub fn new(endpoint: DrafterEndpoint) -> Result<Self, DraftError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DraftError::Unavailable(e.to_string()))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl DraftBackend for HttpDraftBackend {
    fn model(&self) -> &str {
        &self.endpoint.model
    }

    async fn draft(&self, request: &DraftRequest) -> Result<String, DraftError> {
        let body = serde_json::json!({
            "model": self.endpoint.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": format!("Grounding evidence:\n{}", request.grounding) }
            ],
            "temperature": 0.4,
            "max_tokens": 400,
        });

        let url = format!("{}/chat/completions", self.endpoint.url.trim_end_matches('/'));
        let mut call = self.client.post(&url).json(&body);
        if !self.endpoint.api_key.is_empty() {
            call = call.bearer_auth(&self.endpoint.api_key);
        }

        let response = call
            .send()
            .await
            .map_err(|e| DraftError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DraftError::Backend(format!(
                "drafting endpoint returned {status}: {text}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DraftError::Backend(e.to_string()))?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(DraftError::EmptyOutput);
        }
        debug!(model = %self.endpoint.model, words = content.split_whitespace().count(), "Draft received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_reports_model_identity() {
        let backend = HttpDraftBackend::new(DrafterEndpoint {
            url: "http://localhost:8080/v1".to_string(),
            model: "outreach-drafter-8b".to_string(),
            api_key: String::new(),
        })
        .unwrap();
        assert_eq!(backend.model(), "outreach-drafter-8b");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_maps_to_unavailable() {
        // Nothing listens on this port; the call must fail as Unavailable,
        // which the engine recovers from via the template path.
        let backend = HttpDraftBackend::new(DrafterEndpoint {
            url: "http://127.0.0.1:1/v1".to_string(),
            model: "m".to_string(),
            api_key: String::new(),
        })
        .unwrap();

        let request = DraftRequest {
            system: "write".to_string(),
            grounding: "facts".to_string(),
            word_budget: (90, 130),
            language: "en".to_string(),
        };
        let err = backend.draft(&request).await.unwrap_err();
        assert!(matches!(err, DraftError::Unavailable(_)));
    }
}
