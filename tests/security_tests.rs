/// Security tests for scanforge
/// CSV formula injection protection in exported reports

use scanforge::models::{Finding, Target, Verdict};
use std::fs;
use tempfile::TempDir;

fn finding(payload: &str) -> Finding {
    let target = Target::parse("https://example.com/test.php").unwrap();
    Finding::from_verdict("xss", &target, Verdict::vulnerable(Some("q".into()), payload, "reflected")).unwrap()
}

#[test]
fn test_csv_injection_protection() {
    let dir = TempDir::new().unwrap();
    let findings = vec![
        finding("=HYPERLINK(\"http://evil.com\")"),
        finding("+cmd|'/C calc'!A1"),
        finding("-2+3+cmd|'/C calc'!A1"),
        finding("@SUM(1+1)*cmd|'/C calc'!A1"),
        finding("\t=1+1"),
    ];

    let path = scanforge::reporting::export_csv(&findings, dir.path()).expect("CSV export should succeed");
    let content = fs::read_to_string(&path).expect("Should be able to read CSV file");

    assert!(content.contains("\"'=HYPERLINK"), "CSV should escape = prefix");
    assert!(content.contains("\"'+cmd"), "CSV should escape + prefix");
    assert!(content.contains("\"'-2+3"), "CSV should escape - prefix");
    assert!(content.contains("\"'@SUM"), "CSV should escape @ prefix");
    assert!(content.contains("\"'\t=1+1"), "CSV should escape tab prefix");
    assert!(content.starts_with("Type,URL,Parameter,Payload,Evidence,Timestamp\n"));
}

#[test]
fn test_csv_normal_content_not_escaped() {
    let dir = TempDir::new().unwrap();
    let path = scanforge::reporting::export_csv(&[finding("<script>alert(1)</script>")], dir.path()).unwrap();
    let content = fs::read_to_string(&path).unwrap();

    assert!(content.contains("xss,https://example.com/test.php,q,<script>alert(1)</script>,reflected,"));
    assert!(!content.contains("\"'"));
}

#[test]
fn test_csv_payload_with_commas_is_quoted() {
    let dir = TempDir::new().unwrap();
    let path = scanforge::reporting::export_csv(&[finding("' UNION SELECT 1,2,3--")], dir.path()).unwrap();
    let content = fs::read_to_string(&path).unwrap();

    assert!(content.contains("\"' UNION SELECT 1,2,3--\""));
}
