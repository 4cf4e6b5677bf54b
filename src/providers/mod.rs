// Model Providers
//
// Payload generators and classifiers that detectors can consult.
//
// - classifier: rule-based classifier that learns literal payload examples
// - generator:  template text generator cycling through learned examples
// - ollama:     generator backed by a local Ollama server
//
// Every provider must answer predict() and generate_payload() before it has
// been trained; those calls never fail.

pub mod classifier;
pub mod generator;
pub mod ollama;

pub use classifier::RuleBasedClassifier;
pub use generator::TemplateTextGenerator;
pub use ollama::OllamaGenerator;

use crate::error::ModelError;
use crate::models::{OutputKind, Payload, Prediction};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

/// Context handed to `generate_payload`
#[derive(Debug, Clone, Default, Serialize)]
pub struct PayloadContext {
    /// Vulnerability kind the payload is for, e.g. "sql"
    pub kind: Option<String>,
    pub parameter: Option<String>,
    pub target: Option<String>,
    /// Free-form extras a provider may use
    pub extra: serde_json::Value,
}

impl PayloadContext {
    pub fn for_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// What `predict` returns for this provider
    fn output_kind(&self) -> OutputKind;

    /// Acquire the backing model. Calling it again re-acquires.
    async fn load_model(&self, path: Option<&Path>) -> Result<(), ModelError>;

    /// Update the model. Once this succeeds, `is_trained` stays true.
    async fn train(&self, training_data: &[String]) -> Result<(), ModelError>;

    async fn predict(&self, input: &str) -> Prediction;

    /// Always returns a payload, even if a trivial one
    async fn generate_payload(&self, context: &PayloadContext) -> Payload;

    fn is_trained(&self) -> bool;
}
