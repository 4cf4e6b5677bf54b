// Template text generator
//
// Text-output provider. Learned examples are handed out in rotation; a
// `{param}` placeholder in an example is filled from the context.

use super::{ModelProvider, PayloadContext};
use crate::error::ModelError;
use crate::models::{OutputKind, Payload, Prediction};
use crate::training::read_examples;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const PLACEHOLDER_TEXT: &str = "AI generated content";
pub const PLACEHOLDER_PAYLOAD: &str = "<script>alert('AI generated')</script>";

#[derive(Debug, Default)]
pub struct TemplateTextGenerator {
    templates: Mutex<Vec<String>>,
    trained: AtomicBool,
    cursor: AtomicUsize,
}

impl TemplateTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_template(&self) -> Option<String> {
        let templates = self.templates.lock();
        if templates.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % templates.len();
        Some(templates[idx].clone())
    }
}

#[async_trait]
impl ModelProvider for TemplateTextGenerator {
    fn output_kind(&self) -> OutputKind {
        OutputKind::Text
    }

    async fn load_model(&self, path: Option<&Path>) -> Result<(), ModelError> {
        let loaded = match path {
            Some(p) => read_examples(p).map_err(|e| ModelError::Load(e.to_string()))?,
            None => Vec::new(),
        };
        *self.templates.lock() = loaded;
        self.cursor.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Replaces the template set with the new corpus
    async fn train(&self, training_data: &[String]) -> Result<(), ModelError> {
        let templates: Vec<String> = training_data
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if templates.is_empty() {
            return Err(ModelError::Training("no usable examples".to_string()));
        }
        *self.templates.lock() = templates;
        self.trained.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn predict(&self, input: &str) -> Prediction {
        match self.next_template() {
            Some(t) if !input.is_empty() => Prediction::Text(format!("{} {}", input, t)),
            Some(t) => Prediction::Text(t),
            None => Prediction::Text(PLACEHOLDER_TEXT.to_string()),
        }
    }

    async fn generate_payload(&self, context: &PayloadContext) -> Payload {
        let Some(template) = self.next_template() else {
            return PLACEHOLDER_PAYLOAD.to_string();
        };
        match &context.parameter {
            Some(param) => template.replace("{param}", param),
            None => template,
        }
    }

    fn is_trained(&self) -> bool {
        self.trained.load(Ordering::SeqCst)
    }
}
