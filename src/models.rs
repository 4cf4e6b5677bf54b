// Core data models for scanforge

use crate::error::TargetError;
use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use url::Url;

/// Target substituted when the operator gives none
pub const DEMO_TARGET: &str = "https://example.com/test.php";

lazy_static! {
    static ref SCHEME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap();
}

/// An opaque injection string
pub type Payload = String;

/// A URL under test. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    /// Normalize an operator-supplied locator.
    ///
    /// - blank input → [`DEMO_TARGET`]
    /// - no scheme → `https://` is prepended
    /// - the result must parse as a URL with a host
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Target(DEMO_TARGET.to_string()));
        }

        let candidate = if SCHEME_RE.is_match(trimmed) {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&candidate)
            .map_err(|e| TargetError::Malformed(trimmed.to_string(), e.to_string()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(TargetError::MissingHost(trimmed.to_string()));
        }

        // Keep the operator's spelling; Url would add a trailing slash to bare hosts
        Ok(Target(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate-free parameter names for one target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet(Vec<String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a name unless it is blank or already present. Returns whether it was added.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let owned: String = name.into();
        let name = owned.trim();
        if name.is_empty() || self.0.iter().any(|p| p == name) {
            return false;
        }
        self.0.push(name.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|p| p == name)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Raw result a detector hands back before aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub vulnerable: bool,
    pub parameter: Option<String>,
    pub payload: Payload,
    pub evidence: String,
}

impl Verdict {
    /// A negative verdict with no evidence
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn vulnerable(
        parameter: Option<String>,
        payload: impl Into<Payload>,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            vulnerable: true,
            parameter,
            payload: payload.into(),
            evidence: evidence.into(),
        }
    }
}

/// A confirmed positive result. Only built from a vulnerable verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub kind: String,
    pub target: Target,
    pub parameter: Option<String>,
    pub payload: Payload,
    pub evidence: String,
    pub timestamp: DateTime<Local>,
}

impl Finding {
    /// Convert a verdict into a finding; `None` for negative verdicts.
    pub fn from_verdict(kind: &str, target: &Target, verdict: Verdict) -> Option<Self> {
        if !verdict.vulnerable {
            return None;
        }
        Some(Self {
            kind: kind.to_string(),
            target: target.clone(),
            parameter: verdict.parameter,
            payload: verdict.payload,
            evidence: verdict.evidence,
            timestamp: Local::now(),
        })
    }
}

/// How one requested detector kind ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum DetectorOutcome {
    Vulnerable,
    Clean,
    Failed(String),
}

/// Everything a single `scan` call produced
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: Target,
    pub parameters: ParameterSet,
    /// Per requested kind that had a registered detector, in request order
    pub outcomes: Vec<(String, DetectorOutcome)>,
    /// Positive results only, in detector invocation order
    pub findings: Vec<Finding>,
}

impl ScanReport {
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    /// Kinds whose detector failed instead of producing a verdict
    pub fn failed_kinds(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, DetectorOutcome::Failed(_)))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// What a model provider's `predict` returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Classification(bool),
    Text(String),
}

/// The output kind a provider declares up front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Classification,
    Text,
}

impl Prediction {
    pub fn kind(&self) -> OutputKind {
        match self {
            Prediction::Classification(_) => OutputKind::Classification,
            Prediction::Text(_) => OutputKind::Text,
        }
    }
}
