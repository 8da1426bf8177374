use gridbench_core::errors::{BenchError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("path", "./messaging")
        .with_context("dimension", "cpus")
}

#[test]
fn config_error_surface() {
    let err = BenchError::Config(sample_info("C001", "empty dimension"));
    assert_eq!(err.info().code, "C001");
    assert!(err.info().context.contains_key("dimension"));
}

#[test]
fn workload_error_surface() {
    let err = BenchError::Workload(sample_info("W001", "missing executable").with_hint("build it"));
    assert_eq!(err.info().code, "W001");
    let text = err.to_string();
    assert!(text.starts_with("workload error: missing executable (code: W001)"));
    assert!(text.contains("path=./messaging"));
    assert!(text.ends_with("| hint: build it"));
}

#[test]
fn io_and_serde_error_surface() {
    let io = BenchError::Io(sample_info("I001", "broken pipe"));
    let serde = BenchError::Serde(sample_info("S001", "schema mismatch"));
    assert_eq!(io.info().code, "I001");
    assert_eq!(serde.info().code, "S001");
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = BenchError::config("trials", "trial count must be at least 1");
    let json = serde_json::to_value(&err).expect("json");
    assert_eq!(json["family"], "Config");
    assert_eq!(json["detail"]["code"], "trials");
    let back: BenchError = serde_json::from_value(json).expect("decode");
    assert_eq!(back, err);
}
