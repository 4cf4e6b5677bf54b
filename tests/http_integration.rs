/// End-to-end tests against a local mock server
/// Exercises HttpTransport, the remote training feed and a probe detector

use scanforge::config::{TrainingConfig, TransportConfig};
use scanforge::detectors::{Detector, ProbeDetector};
use scanforge::engine::{HttpResponse, HttpTransport, ProbeRequest, Transport};
use scanforge::events::{Event, MemorySink};
use scanforge::models::{ParameterSet, Target};
use scanforge::mutator::EvasionChain;
use scanforge::training::{ApiTrainingSource, TrainingSource};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(sink: Arc<MemorySink>) -> Arc<HttpTransport> {
    Arc::new(HttpTransport::with_events(&TransportConfig::default(), sink).unwrap())
}

#[tokio::test]
async fn transport_sends_default_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", scanforge::config::DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let http = transport(Arc::new(MemorySink::new()));
    let resp = http
        .send(&ProbeRequest::get(format!("{}/page", server.uri())))
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "hello");
}

#[tokio::test]
async fn transport_keeps_encoded_query_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "' OR 1=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("matched"))
        .mount(&server)
        .await;

    let http = transport(Arc::new(MemorySink::new()));
    let request = ProbeRequest::get(format!("{}/search", server.uri()))
        .with_query("q", "%27%20OR%201%3D1");
    let resp = http.send(&request).await.unwrap();
    assert_eq!(resp.body, "matched");
}

#[tokio::test]
async fn training_feed_array_and_object_answers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .and(query_param("type", "sql"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"["' OR 1=1--", "  ", "admin'--"]"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .and(query_param("type", "xss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"xss": ["<svg onload=1>"]}"#))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = TrainingConfig {
        cache_dir: dir.path().join("cache"),
        api_url: format!("{}/data", server.uri()),
        api_key: "s3cret".to_string(),
        local_dir: None,
    };
    let sink = Arc::new(MemorySink::new());
    let source = ApiTrainingSource::new("main_api", &config, transport(sink.clone()), sink.clone());

    assert_eq!(source.fetch("sql").await, vec!["' OR 1=1--", "admin'--"]);
    assert_eq!(source.fetch("xss").await, vec!["<svg onload=1>"]);

    let cached = std::fs::read_to_string(config.cache_dir.join("sql.txt")).unwrap();
    assert_eq!(cached, "' OR 1=1--\nadmin'--");
}

#[tokio::test]
async fn training_feed_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = TrainingConfig {
        cache_dir: dir.path().join("cache"),
        api_url: format!("{}/data", server.uri()),
        ..TrainingConfig::default()
    };
    let sink = Arc::new(MemorySink::new());
    let source = ApiTrainingSource::new("main_api", &config, transport(sink.clone()), sink.clone());

    assert!(source.fetch("rce").await.is_empty());
    assert!(sink
        .failures()
        .iter()
        .any(|e| matches!(e, Event::DataSourceFailed { source, .. } if source == "main_api")));
}

#[tokio::test]
async fn reflected_payload_is_confirmed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test.php"))
        .and(query_param("q", "<b>x</b>"))
        .respond_with(ResponseTemplate::new(200).set_body_string("results for <b>x</b>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("nothing here"))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let detector = ProbeDetector::new("xss", transport(sink), Arc::new(EvasionChain::new()))
        .with_payloads(["<b>x</b>"])
        .with_validator(|resp: &HttpResponse, payload: &str| resp.body.contains(payload));

    let target = Target::parse(&format!("{}/test.php", server.uri())).unwrap();
    let params: ParameterSet = vec!["id", "q"].into_iter().collect();
    let verdict = detector.scan(&target, &params).await.unwrap();

    assert!(verdict.vulnerable);
    assert_eq!(verdict.parameter.as_deref(), Some("q"));
    assert!(verdict.evidence.starts_with("xss via raw"));
}
