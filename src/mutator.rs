// Evasion chain for scanforge
// Payload transforms that try to slip past naive input filters.
//
// Transforms are pure `&str -> String` functions kept in registration order.
// Two ways to use them:
//   apply(payload, subset)  - compose the selected transforms, in order
//   variants(payload)       - one independent output per transform
// Probe detectors put every variant on the wire.

use crate::models::Payload;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::RwLock;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::sync::Arc;

/// Characters left alone by percent-encoding: alphanumerics, `_ . - ~` and `/`
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

pub type TransformFn = Arc<dyn Fn(&str) -> Payload + Send + Sync>;

/// A named evasion transform
#[derive(Clone)]
pub struct Technique {
    name: String,
    transform: TransformFn,
}

impl Technique {
    pub fn new<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&str) -> Payload + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            transform: Arc::new(transform),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self, payload: &str) -> Payload {
        (self.transform)(payload)
    }
}

impl fmt::Debug for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Technique").field("name", &self.name).finish()
    }
}

/// Percent-encode everything except unreserved characters and `/`
pub fn url_encode(payload: &str) -> Payload {
    utf8_percent_encode(payload, PATH_SAFE).to_string()
}

pub fn double_url_encode(payload: &str) -> Payload {
    url_encode(&url_encode(payload))
}

/// Legacy IIS-style `%uXXXX` escape, one per character (code point, lower-case hex)
pub fn unicode_encode(payload: &str) -> Payload {
    payload
        .chars()
        .map(|c| format!("%u{:04x}", c as u32))
        .collect()
}

pub fn base64_encode(payload: &str) -> Payload {
    STANDARD.encode(payload.as_bytes())
}

/// Hex HTML entities for every non-alphanumeric character
pub fn html_entity_encode(payload: &str) -> Payload {
    let mut encoded = String::with_capacity(payload.len() * 6);
    for ch in payload.chars() {
        if ch.is_ascii_alphanumeric() {
            encoded.push(ch);
        } else {
            encoded.push_str(&format!("&#x{:X};", ch as u32));
        }
    }
    encoded
}

/// Look up a technique from the built-in catalog by name
pub fn builtin_technique(name: &str) -> Option<Technique> {
    let technique = match name {
        "url" => Technique::new("url", url_encode),
        "double-url" => Technique::new("double-url", double_url_encode),
        "unicode" => Technique::new("unicode", unicode_encode),
        "base64" => Technique::new("base64", base64_encode),
        "html-entity" => Technique::new("html-entity", html_entity_encode),
        _ => return None,
    };
    Some(technique)
}

/// Ordered, append-only set of evasion techniques
pub struct EvasionChain {
    techniques: RwLock<Vec<Technique>>,
}

impl Default for EvasionChain {
    fn default() -> Self {
        Self::new()
    }
}

impl EvasionChain {
    /// Chain with the three base techniques: url, double-url, unicode
    pub fn new() -> Self {
        Self {
            techniques: RwLock::new(vec![
                Technique::new("url", url_encode),
                Technique::new("double-url", double_url_encode),
                Technique::new("unicode", unicode_encode),
            ]),
        }
    }

    pub fn empty() -> Self {
        Self {
            techniques: RwLock::new(Vec::new()),
        }
    }

    /// Append a technique at the end. Its behavior is not checked.
    pub fn add_technique(&self, technique: Technique) {
        self.techniques.write().push(technique);
    }

    pub fn len(&self) -> usize {
        self.techniques.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.techniques.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.techniques.read().iter().map(|t| t.name.clone()).collect()
    }

    /// Compose the selected techniques in registration order.
    ///
    /// `None` selects every technique. Names in `subset` that are not
    /// registered are ignored; an empty subset returns the payload unchanged.
    pub fn apply(&self, payload: &str, subset: Option<&[&str]>) -> Payload {
        let selected = self.snapshot(subset);
        selected
            .iter()
            .fold(payload.to_string(), |acc, t| t.transform(&acc))
    }

    /// One output per registered technique, each applied to the raw payload
    pub fn variants(&self, payload: &str) -> Vec<(String, Payload)> {
        self.snapshot(None)
            .iter()
            .map(|t| (t.name.clone(), t.transform(payload)))
            .collect()
    }

    fn snapshot(&self, subset: Option<&[&str]>) -> Vec<Technique> {
        let techniques = self.techniques.read();
        match subset {
            None => techniques.clone(),
            Some(names) => techniques
                .iter()
                .filter(|t| names.contains(&t.name.as_str()))
                .cloned()
                .collect(),
        }
    }
}

impl fmt::Debug for EvasionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvasionChain")
            .field("techniques", &self.names())
            .finish()
    }
}
