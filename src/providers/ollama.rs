// Ollama-backed payload generator
// Asks a local LLM (Ollama) for payloads. Falls back to a static payload
// whenever the server is unreachable, so generation never fails.

use super::{ModelProvider, PayloadContext};
use crate::error::ModelError;
use crate::models::{OutputKind, Payload, Prediction};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Few-shot examples kept from training
const MAX_EXAMPLES: usize = 20;

pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    examples: Mutex<Vec<String>>,
    trained: AtomicBool,
}

impl OllamaGenerator {
    pub fn new(model: String) -> Self {
        Self::with_base_url(model, DEFAULT_OLLAMA_URL.to_string())
    }

    pub fn with_base_url(model: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            examples: Mutex::new(Vec::new()),
            trained: AtomicBool::new(false),
        }
    }

    fn build_prompt(&self, context: &PayloadContext) -> String {
        let kind = context.kind.as_deref().unwrap_or("injection");
        let mut prompt = format!(
            "Produce a single {} test payload for an authorized security assessment.",
            kind
        );
        if let Some(param) = &context.parameter {
            prompt.push_str(&format!(" It will be sent in the '{}' parameter.", param));
        }
        let examples = self.examples.lock();
        if !examples.is_empty() {
            prompt.push_str(" Examples:\n");
            for example in examples.iter() {
                prompt.push_str(example);
                prompt.push('\n');
            }
        }
        prompt.push_str(" Reply with the payload only.");
        prompt
    }

    async fn generate(&self, prompt: String) -> Result<String, ModelError> {
        let req_body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });
        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&req_body)
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;
        let resp_json: Value = resp
            .json()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;
        resp_json
            .get("response")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ModelError::Unavailable("empty response from Ollama".to_string()))
    }
}

/// Used whenever the backend cannot answer
pub fn fallback_payload(kind: Option<&str>) -> Payload {
    match kind {
        Some("sql") => "' OR '1'='1".to_string(),
        Some("rce") => "; id".to_string(),
        Some("lfi") => "../../etc/passwd".to_string(),
        _ => "<script>alert(1)</script>".to_string(),
    }
}

#[async_trait]
impl ModelProvider for OllamaGenerator {
    fn output_kind(&self) -> OutputKind {
        OutputKind::Text
    }

    /// Checks the model is served; the path is ignored since Ollama owns storage
    async fn load_model(&self, _path: Option<&Path>) -> Result<(), ModelError> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;
        let tags: Value = resp
            .json()
            .await
            .map_err(|e| ModelError::Load(e.to_string()))?;
        let served = tags
            .get("models")
            .and_then(Value::as_array)
            .map(|models| {
                models.iter().any(|m| {
                    m.get("name")
                        .and_then(Value::as_str)
                        .map_or(false, |n| n == self.model || n.starts_with(&format!("{}:", self.model)))
                })
            })
            .unwrap_or(false);
        if served {
            Ok(())
        } else {
            Err(ModelError::Load(format!("model '{}' is not available", self.model)))
        }
    }

    /// Keeps the most recent examples as few-shot context
    async fn train(&self, training_data: &[String]) -> Result<(), ModelError> {
        let mut examples = self.examples.lock();
        for example in training_data.iter().filter(|e| !e.trim().is_empty()) {
            examples.push(example.trim().to_string());
        }
        if examples.is_empty() {
            return Err(ModelError::Training("no usable examples".to_string()));
        }
        let overflow = examples.len().saturating_sub(MAX_EXAMPLES);
        examples.drain(..overflow);
        self.trained.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn predict(&self, input: &str) -> Prediction {
        let prompt = format!(
            "Does this input look like an injection attempt? Answer briefly. {}",
            input
        );
        match self.generate(prompt).await {
            Ok(text) => Prediction::Text(text),
            Err(e) => {
                tracing::warn!("Ollama prediction unavailable: {}", e);
                Prediction::Text(String::new())
            }
        }
    }

    async fn generate_payload(&self, context: &PayloadContext) -> Payload {
        let prompt = self.build_prompt(context);
        match self.generate(prompt).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Ollama generation unavailable, using fallback: {}", e);
                fallback_payload(context.kind.as_deref())
            }
        }
    }

    fn is_trained(&self) -> bool {
        self.trained.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generates_from_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "response": " ' OR 2>1-- \n" })),
            )
            .mount(&server)
            .await;

        let model = OllamaGenerator::with_base_url("llama2".into(), server.uri());
        let payload = model.generate_payload(&PayloadContext::for_kind("sql")).await;
        assert_eq!(payload, "' OR 2>1--");
    }

    #[tokio::test]
    async fn falls_back_when_unreachable() {
        let model = OllamaGenerator::with_base_url("llama2".into(), "http://127.0.0.1:9".into());
        let payload = model.generate_payload(&PayloadContext::for_kind("rce")).await;
        assert_eq!(payload, "; id");
        assert_eq!(model.predict("x").await, Prediction::Text(String::new()));
    }

    #[tokio::test]
    async fn load_model_checks_tags() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "models": [{ "name": "llama2:latest" }] }),
            ))
            .mount(&server)
            .await;

        let served = OllamaGenerator::with_base_url("llama2".into(), server.uri());
        assert!(served.load_model(None).await.is_ok());

        let missing = OllamaGenerator::with_base_url("mistral".into(), server.uri());
        assert!(matches!(missing.load_model(None).await, Err(ModelError::Load(_))));
    }

    #[tokio::test]
    async fn training_keeps_recent_examples() {
        let model = OllamaGenerator::new("llama2".into());
        let corpus: Vec<String> = (0..30).map(|i| format!("p{}", i)).collect();
        model.train(&corpus).await.unwrap();
        assert!(model.is_trained());
        let prompt = model.build_prompt(&PayloadContext::for_kind("sql"));
        assert!(prompt.contains("p29"));
        assert!(!prompt.contains("\np9\n"));
    }
}
