// Training data sources
// A source supplies labelled payload examples per vulnerability category and
// can push them into a model provider. Failures never propagate: a broken
// source yields an empty corpus and a reported event.

use crate::config::TrainingConfig;
use crate::engine::{ProbeRequest, Transport};
use crate::error::{DataSourceError, ModelError};
use crate::events::{Event, EventSink};
use crate::providers::ModelProvider;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Category name that selects every category
pub const ALL_CATEGORIES: &str = "all";

/// Known categories, in the order `all` returns them
pub const CATEGORIES: &[&str] = &["sql", "xss", "rce", "lfi"];

/// Bundled corpus served when no remote feed is configured
const SAMPLE_CORPUS: &[(&str, &[&str])] = &[
    ("sql", &["' OR '1'='1", "' UNION SELECT 1--"]),
    ("xss", &["<script>alert(1)</script>"]),
    ("rce", &["; whoami", "| id"]),
    ("lfi", &["../../etc/passwd"]),
];

/// Category names double as file names, so only `[A-Za-z0-9_-]` is allowed
pub fn is_category_name(kind: &str) -> bool {
    !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn expand_kind(kind: &str) -> Vec<&str> {
    if kind == ALL_CATEGORIES {
        CATEGORIES.to_vec()
    } else {
        vec![kind]
    }
}

/// Read a newline-delimited file. Each non-blank, trimmed line is one example.
pub fn read_examples(path: &Path) -> Result<Vec<String>, DataSourceError> {
    let contents = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::InvalidData {
            DataSourceError::Decode(format!("{} is not valid UTF-8", path.display()))
        } else {
            DataSourceError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

#[async_trait]
pub trait TrainingSource: Send + Sync {
    /// Label used in diagnostics
    fn name(&self) -> &str;

    /// Examples for one category, or every category for `"all"`.
    /// Returns an empty list when nothing could be fetched.
    async fn fetch(&self, kind: &str) -> Vec<String>;

    /// Where failures go. Defaults to `tracing`.
    fn report(&self, err: DataSourceError) {
        tracing::error!(source = self.name(), "Training data error: {}", err);
    }

    /// Examples from a local newline-delimited file; empty on any error
    fn load_local(&self, path: &Path) -> Vec<String> {
        match read_examples(path) {
            Ok(examples) => examples,
            Err(err) => {
                self.report(err);
                Vec::new()
            }
        }
    }

    /// Fetch everything and train `provider` with it.
    ///
    /// `Ok(false)` means there was no data and the provider was not touched.
    async fn push_training_update(&self, provider: &dyn ModelProvider) -> Result<bool, ModelError> {
        let corpus = self.fetch(ALL_CATEGORIES).await;
        if corpus.is_empty() {
            return Ok(false);
        }
        provider.train(&corpus).await?;
        Ok(true)
    }
}

/// Remote JSON feed with an on-disk cache.
///
/// The feed is queried as `GET {api_url}?type={category}` and may answer with
/// a JSON array of strings or an object mapping the category to one. Each
/// successful answer is cached as `{cache_dir}/{category}.txt`; when the feed
/// fails, the cached copy is served instead.
pub struct ApiTrainingSource {
    name: String,
    api_url: Option<String>,
    api_key: Option<String>,
    cache_dir: PathBuf,
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventSink>,
}

impl ApiTrainingSource {
    pub fn new(
        name: impl Into<String>,
        config: &TrainingConfig,
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let source = Self {
            name: name.into(),
            api_url: Some(config.api_url.clone()).filter(|u| !u.is_empty()),
            api_key: Some(config.api_key.clone()).filter(|k| !k.is_empty()),
            cache_dir: config.cache_dir.clone(),
            transport,
            events,
        };
        if let Err(source_err) = std::fs::create_dir_all(&source.cache_dir) {
            source.report(DataSourceError::Io {
                path: source.cache_dir.display().to_string(),
                source: source_err,
            });
        }
        source
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, kind: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.txt", kind))
    }

    async fn fetch_remote(&self, api_url: &str, kind: &str) -> Result<Vec<String>, DataSourceError> {
        let mut request = ProbeRequest::get(api_url).with_query("type", kind);
        if let Some(key) = &self.api_key {
            request = request.with_header("Authorization", format!("Bearer {}", key));
        }
        let response = self.transport.send(&request).await?;
        if !(200..300).contains(&response.status) {
            return Err(DataSourceError::Decode(format!(
                "feed answered HTTP {}",
                response.status
            )));
        }
        let json: Value = serde_json::from_str(&response.body)
            .map_err(|e| DataSourceError::Decode(e.to_string()))?;
        let list = match &json {
            Value::Array(_) => &json,
            Value::Object(map) => map.get(kind).unwrap_or(&Value::Null),
            _ => &Value::Null,
        };
        let examples = list
            .as_array()
            .ok_or_else(|| DataSourceError::Decode(format!("no '{}' list in feed response", kind)))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Ok(examples)
    }

    fn write_cache(&self, kind: &str, examples: &[String]) {
        let path = self.cache_path(kind);
        if let Err(source) = std::fs::write(&path, examples.join("\n")) {
            self.report(DataSourceError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    }
}

#[async_trait]
impl TrainingSource for ApiTrainingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, kind: &str) -> Vec<String> {
        if !is_category_name(kind) {
            self.report(DataSourceError::InvalidCategory(kind.to_string()));
            return Vec::new();
        }

        let mut corpus = Vec::new();
        for category in expand_kind(kind) {
            let examples: Vec<String> = match &self.api_url {
                None => SAMPLE_CORPUS
                    .iter()
                    .find(|(k, _)| *k == category)
                    .map(|(_, list)| list.iter().map(|s| s.to_string()).collect())
                    .unwrap_or_default(),
                Some(url) => match self.fetch_remote(url, category).await {
                    Ok(examples) => {
                        self.write_cache(category, &examples);
                        examples
                    }
                    Err(err) => {
                        self.report(err);
                        let cached = self.cache_path(category);
                        if cached.exists() {
                            self.load_local(&cached)
                        } else {
                            Vec::new()
                        }
                    }
                },
            };
            corpus.extend(examples);
        }
        tracing::info!(source = %self.name, kind, count = corpus.len(), "Fetched training data");
        corpus
    }

    fn report(&self, err: DataSourceError) {
        self.events.emit(Event::DataSourceFailed {
            source: self.name.clone(),
            reason: err.to_string(),
        });
    }
}

/// Directory of `<category>.txt` files
pub struct LocalTrainingSource {
    name: String,
    dir: PathBuf,
    events: Arc<dyn EventSink>,
}

impl LocalTrainingSource {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, events: Arc<dyn EventSink>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            events,
        }
    }
}

#[async_trait]
impl TrainingSource for LocalTrainingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, kind: &str) -> Vec<String> {
        if !is_category_name(kind) {
            self.report(DataSourceError::InvalidCategory(kind.to_string()));
            return Vec::new();
        }
        if kind != ALL_CATEGORIES {
            return self.load_local(&self.dir.join(format!("{}.txt", kind)));
        }

        if !self.dir.is_dir() {
            self.report(DataSourceError::Io {
                path: self.dir.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
            return Vec::new();
        }

        let mut corpus = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file()
                && entry.path().extension().map_or(false, |ext| ext == "txt")
            {
                corpus.extend(self.load_local(entry.path()));
            }
        }
        corpus
    }

    fn report(&self, err: DataSourceError) {
        self.events.emit(Event::DataSourceFailed {
            source: self.name.clone(),
            reason: err.to_string(),
        });
    }
}
