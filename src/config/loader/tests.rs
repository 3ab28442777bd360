use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

// Env-var manipulation is process-global; tests that set variables use
// distinct names and clean up after themselves.

#[test]
fn missing_path_yields_defaults() {
    let config = load_config(None).expect("load defaults");
    assert_eq!(config.security.max_args_len, 2048);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = load_config(Some(Path::new("/nonexistent/rangekit.yaml"))).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn yaml_file_merges_onto_defaults() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("create temp file");
    writeln!(
        file,
        "security:\n  maxArgsLen: 512\ntool:\n  exclude: [masscan]\n"
    )
    .unwrap();

    let config = load_config(Some(file.path())).expect("load yaml");
    assert_eq!(config.security.max_args_len, 512);
    assert_eq!(config.tool.exclude, vec!["masscan".to_string()]);
    // Untouched sections keep their defaults
    assert_eq!(config.security.max_stdout_bytes, 1_048_576);
}

#[test]
fn json_file_parses_by_extension() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("create temp file");
    write!(
        file,
        "{{\"circuitBreaker\": {{\"failureThreshold\": 3}}}}"
    )
    .unwrap();

    let config = load_config(Some(file.path())).expect("load json");
    assert_eq!(config.circuit_breaker.failure_threshold, 3);
}

#[test]
fn invalid_file_values_fail_validation() {
    let mut file = NamedTempFile::new().expect("create temp file");
    writeln!(file, "tool:\n  defaultConcurrency: 0\n").unwrap();

    let err = load_config(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("validation"));
}

#[test]
fn csv_parsing_trims_and_drops_empties() {
    assert_eq!(parse_csv("nmap, hydra ,,sqlmap"), vec!["nmap", "hydra", "sqlmap"]);
    assert!(parse_csv("").is_empty());
}
