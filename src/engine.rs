// HTTP transport for scanforge
// One outbound request per call with a fixed header set and a bounded timeout.

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::events::{Event, EventSink, TracingSink};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// What a probe gets back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

/// A single outbound request.
///
/// Query pairs are appended to the URL verbatim; values must already be
/// encoded the way the probe wants them on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl ProbeRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Full URL with the query pairs attached.
    ///
    /// Pairs are appended to any existing query and land before a fragment.
    /// Values are not re-encoded.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let pairs = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        match Url::parse(&self.url) {
            Ok(mut url) => {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{}&{}", existing, pairs),
                    _ => pairs,
                };
                url.set_query(Some(&query));
                url.to_string()
            }
            // Unparseable URLs fail in the transport; keep the text as given
            Err(_) => format!("{}?{}", self.url, pairs),
        }
    }
}

/// Performs one request. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError>;

    /// Same as [`Transport::send`] but collapses failures to `None`.
    async fn robust_request(&self, request: &ProbeRequest) -> Option<HttpResponse> {
        self.send(request).await.ok()
    }
}

pub struct HttpTransport {
    client: Client,
    timeout_secs: u64,
    events: Arc<dyn EventSink>,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        Self::with_events(config, Arc::new(TracingSink))
    }

    pub fn with_events(
        config: &TransportConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| TransportError::InvalidRequest(format!("user agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.accept)
                .map_err(|e| TransportError::InvalidRequest(format!("accept header: {}", e)))?,
        );

        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
            events,
        })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout_secs)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::InvalidRequest(format!("method '{}'", request.method)))?;

        let mut req = self.client.request(method, request.full_url());
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let result = async {
            let resp = req.send().await?;
            let status = resp.status().as_u16();
            let url = resp.url().to_string();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>(HttpResponse { status, url, body })
        }
        .await;

        result.map_err(|e| {
            let err = self.classify(e);
            self.events.emit(Event::TransportFailed {
                url: request.url.clone(),
                reason: err.to_string(),
            });
            err
        })
    }
}
