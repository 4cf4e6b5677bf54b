// Rule-based classifier
//
// Learns literal payload examples and flags any input that contains one.
// Untrained, it classifies everything as benign and offers a placeholder
// payload.

use super::{ModelProvider, PayloadContext};
use crate::error::ModelError;
use crate::models::{OutputKind, Payload, Prediction};
use crate::training::read_examples;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const PLACEHOLDER_PAYLOAD: &str = "example_payload";

#[derive(Debug, Default)]
pub struct RuleBasedClassifier {
    rules: Mutex<Vec<String>>,
    trained: AtomicBool,
    cursor: AtomicUsize,
}

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.lock().len()
    }

    fn learn(&self, examples: &[String]) -> usize {
        let mut rules = self.rules.lock();
        let before = rules.len();
        for example in examples {
            let example = example.trim();
            if !example.is_empty() && !rules.iter().any(|r| r == example) {
                rules.push(example.to_string());
            }
        }
        rules.len() - before
    }
}

#[async_trait]
impl ModelProvider for RuleBasedClassifier {
    fn output_kind(&self) -> OutputKind {
        OutputKind::Classification
    }

    async fn load_model(&self, path: Option<&Path>) -> Result<(), ModelError> {
        let Some(path) = path else {
            tracing::info!("Rule-based classifier initialized with no stored rules");
            return Ok(());
        };

        let examples = read_examples(path)
            .map_err(|e| ModelError::Load(e.to_string()))?;
        // Reloading replaces whatever was loaded before
        self.rules.lock().clear();
        let added = self.learn(&examples);
        tracing::info!(rules = added, "Loaded classifier rules from {:?}", path);
        Ok(())
    }

    async fn train(&self, training_data: &[String]) -> Result<(), ModelError> {
        if training_data.iter().all(|e| e.trim().is_empty()) {
            return Err(ModelError::Training("no usable examples".to_string()));
        }
        let added = self.learn(training_data);
        self.trained.store(true, Ordering::SeqCst);
        tracing::debug!(added, total = self.rule_count(), "Classifier trained");
        Ok(())
    }

    async fn predict(&self, input: &str) -> Prediction {
        let rules = self.rules.lock();
        Prediction::Classification(rules.iter().any(|r| input.contains(r.as_str())))
    }

    async fn generate_payload(&self, _context: &PayloadContext) -> Payload {
        let rules = self.rules.lock();
        if rules.is_empty() {
            return PLACEHOLDER_PAYLOAD.to_string();
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % rules.len();
        rules[idx].clone()
    }

    fn is_trained(&self) -> bool {
        self.trained.load(Ordering::SeqCst)
    }
}
