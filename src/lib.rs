pub mod models;
pub mod error;
pub mod events;
pub mod config;
pub mod engine;
pub mod mutator;
pub mod parameters;
pub mod detectors;
pub mod providers;
pub mod training;
pub mod registry;
pub mod orchestrator;
pub mod reporting;

// Re-export commonly used items
pub use models::*;
pub use error::*;
pub use events::*;
pub use config::Config;
pub use engine::*;
pub use mutator::*;
pub use parameters::*;
pub use detectors::*;
pub use providers::{ModelProvider, OllamaGenerator, PayloadContext, RuleBasedClassifier, TemplateTextGenerator};
pub use training::*;
pub use registry::*;
pub use orchestrator::*;
pub use reporting::*;
