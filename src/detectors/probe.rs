// Probe-based detector skeleton
//
// For every parameter and every payload, sends the raw payload and then each
// evasion variant of it through the transport and asks a ResponseValidator whether the
// response proves the vulnerability. The first confirmed response wins.
//
// Payloads come from a static list and, optionally, one generated by a model
// provider per parameter. With the default validator nothing is ever
// confirmed; derived detectors supply their own.

use super::Detector;
use crate::config::TransportConfig;
use crate::engine::{HttpResponse, ProbeRequest, Transport};
use crate::error::{DetectorError, TransportError};
use crate::models::{ParameterSet, Payload, Target, Verdict};
use crate::mutator::EvasionChain;
use crate::providers::{ModelProvider, PayloadContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Technique label for the untransformed payload
pub const RAW_FORM: &str = "raw";

/// Decides whether a response confirms a payload
pub trait ResponseValidator: Send + Sync {
    fn confirms(&self, response: &HttpResponse, payload: &str) -> bool;
}

impl<F> ResponseValidator for F
where
    F: Fn(&HttpResponse, &str) -> bool + Send + Sync,
{
    fn confirms(&self, response: &HttpResponse, payload: &str) -> bool {
        self(response, payload)
    }
}

/// Confirms nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectAll;

impl ResponseValidator for RejectAll {
    fn confirms(&self, _response: &HttpResponse, _payload: &str) -> bool {
        false
    }
}

pub struct ProbeDetector {
    kind: String,
    method: String,
    payloads: Vec<Payload>,
    generator: Option<Arc<dyn ModelProvider>>,
    transport: Arc<dyn Transport>,
    evasion: Arc<EvasionChain>,
    validator: Arc<dyn ResponseValidator>,
}

impl ProbeDetector {
    pub fn new(kind: impl Into<String>, transport: Arc<dyn Transport>, evasion: Arc<EvasionChain>) -> Self {
        Self {
            kind: kind.into(),
            method: "GET".to_string(),
            payloads: Vec::new(),
            generator: None,
            transport,
            evasion,
            validator: Arc::new(RejectAll),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Take the probe method from the transport section of the config
    pub fn with_transport_config(self, config: &TransportConfig) -> Self {
        self.with_method(config.method.clone())
    }

    pub fn with_payloads<I, S>(mut self, payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Payload>,
    {
        self.payloads.extend(payloads.into_iter().map(Into::into));
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn ModelProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    async fn payloads_for(&self, target: &Target, parameter: &str) -> Vec<Payload> {
        let mut payloads = self.payloads.clone();
        if let Some(generator) = &self.generator {
            let context = PayloadContext::for_kind(self.kind.clone())
                .with_parameter(parameter)
                .with_target(target.as_str());
            let generated = generator.generate_payload(&context).await;
            if !payloads.contains(&generated) {
                payloads.push(generated);
            }
        }
        payloads
    }

    /// What goes on the wire for one payload: the raw payload, then every
    /// evasion variant in registration order
    fn wire_forms(&self, payload: &str) -> Vec<(String, Payload)> {
        let mut forms = vec![(RAW_FORM.to_string(), payload.to_string())];
        forms.extend(self.evasion.variants(payload));
        forms
    }
}

#[async_trait]
impl Detector for ProbeDetector {
    async fn scan(&self, target: &Target, parameters: &ParameterSet) -> Result<Verdict, DetectorError> {
        let mut answered = false;
        let mut last_error: Option<TransportError> = None;

        for parameter in parameters {
            for payload in self.payloads_for(target, parameter).await {
                for (technique, encoded) in self.wire_forms(&payload) {
                    let request = ProbeRequest::get(target.as_str())
                        .with_method(self.method.clone())
                        .with_query(parameter.clone(), encoded.clone());

                    match self.transport.send(&request).await {
                        Ok(response) => {
                            answered = true;
                            if self.validate_finding(&response, &payload) {
                                return Ok(Verdict::vulnerable(
                                    Some(parameter.clone()),
                                    encoded,
                                    format!("{} via {}: HTTP {}", self.kind, technique, response.status),
                                ));
                            }
                        }
                        Err(e) => last_error = Some(e),
                    }
                }
            }
        }

        match last_error {
            // Every probe failed; there is no evidence either way
            Some(err) if !answered => Err(DetectorError::Transport(err)),
            _ => Ok(Verdict::clean()),
        }
    }

    fn validate_finding(&self, response: &HttpResponse, payload: &str) -> bool {
        self.validator.confirms(response, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records requests and answers with a canned body
    struct ScriptedTransport {
        body: String,
        fail: bool,
        seen: Mutex<Vec<ProbeRequest>>,
    }

    impl ScriptedTransport {
        fn answering(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_string(),
                fail: false,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                body: String::new(),
                fail: true,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().push(request.clone());
            if self.fail {
                return Err(TransportError::Timeout(1));
            }
            Ok(HttpResponse {
                status: 200,
                url: request.full_url(),
                body: self.body.clone(),
            })
        }
    }

    fn target() -> Target {
        Target::parse("https://shop.example/item.php").unwrap()
    }

    #[tokio::test]
    async fn default_validator_never_confirms() {
        let transport = ScriptedTransport::answering("syntax error near '");
        let detector = ProbeDetector::new("sql", transport.clone(), Arc::new(EvasionChain::new()))
            .with_payloads(["'"]);
        let params: ParameterSet = ["id", "page"].into_iter().collect();

        let verdict = detector.scan(&target(), &params).await.unwrap();
        assert!(!verdict.vulnerable);
        // 2 params x 1 payload x (raw + 3 variants)
        let seen = transport.seen.lock();
        assert_eq!(seen.len(), 8);
        let values: Vec<&str> = seen[..4].iter().map(|r| r.query[0].1.as_str()).collect();
        assert_eq!(values, vec!["'", "%27", "%2527", "%u0027"]);
    }

    #[tokio::test]
    async fn validator_confirmation_produces_verdict() {
        let transport = ScriptedTransport::answering("uid=0(root) gid=0(root)");
        let detector = ProbeDetector::new("rce", transport.clone(), Arc::new(EvasionChain::new()))
            .with_payloads(["; id"])
            .with_validator(|resp: &HttpResponse, _payload: &str| resp.body.contains("uid="));
        let params: ParameterSet = ["cmd"].into_iter().collect();

        let verdict = detector.scan(&target(), &params).await.unwrap();
        assert!(verdict.vulnerable);
        assert_eq!(verdict.parameter.as_deref(), Some("cmd"));
        assert_eq!(verdict.payload, "; id");
        assert!(verdict.evidence.starts_with("rce via raw"));
        assert_eq!(transport.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn configured_method_is_used_for_every_request() {
        let transport = ScriptedTransport::answering("");
        let config = TransportConfig {
            method: "POST".to_string(),
            ..TransportConfig::default()
        };
        let detector = ProbeDetector::new("sql", transport.clone(), Arc::new(EvasionChain::new()))
            .with_transport_config(&config)
            .with_payloads(["'"]);
        assert_eq!(detector.method(), "POST");

        let params: ParameterSet = ["id"].into_iter().collect();
        detector.scan(&target(), &params).await.unwrap();
        assert!(transport.seen.lock().iter().all(|r| r.method == "POST"));
    }

    #[tokio::test]
    async fn all_requests_failing_is_a_transport_error() {
        let detector = ProbeDetector::new("sql", ScriptedTransport::failing(), Arc::new(EvasionChain::new()))
            .with_payloads(["'"]);
        let params: ParameterSet = ["id"].into_iter().collect();

        let err = detector.scan(&target(), &params).await.unwrap_err();
        assert_eq!(err, DetectorError::Transport(TransportError::Timeout(1)));
    }

    #[tokio::test]
    async fn nothing_to_send_is_clean() {
        let transport = ScriptedTransport::failing();
        let detector = ProbeDetector::new("sql", transport.clone(), Arc::new(EvasionChain::new()));
        let verdict = detector.scan(&target(), &ParameterSet::new()).await.unwrap();
        assert_eq!(verdict, Verdict::clean());
        assert!(transport.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn empty_chain_sends_only_the_raw_payload() {
        let transport = ScriptedTransport::answering("");
        let detector = ProbeDetector::new("sql", transport.clone(), Arc::new(EvasionChain::empty()))
            .with_payloads(["' OR 1=1"]);
        let params: ParameterSet = ["id"].into_iter().collect();
        detector.scan(&target(), &params).await.unwrap();

        let seen = transport.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].query, vec![("id".to_string(), "' OR 1=1".to_string())]);
    }

    #[tokio::test]
    async fn generator_payload_is_sent() {
        use crate::providers::TemplateTextGenerator;

        let generator = Arc::new(TemplateTextGenerator::new());
        generator.train(&["{param}-marker".to_string()]).await.unwrap();

        let transport = ScriptedTransport::answering("");
        let detector = ProbeDetector::new("xss", transport.clone(), Arc::new(EvasionChain::empty()))
            .with_generator(generator);
        let params: ParameterSet = ["q"].into_iter().collect();
        detector.scan(&target(), &params).await.unwrap();

        let seen = transport.seen.lock();
        assert_eq!(seen[0].query, vec![("q".to_string(), "q-marker".to_string())]);
    }
}
