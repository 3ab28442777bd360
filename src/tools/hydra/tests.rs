use super::*;
use std::io::Write;

fn input(target: &str, extra_args: &str) -> ToolInput {
    ToolInput {
        target: target.to_string(),
        extra_args: extra_args.to_string(),
        timeout_sec: None,
        correlation_id: None,
    }
}

#[test]
fn parses_host_service() {
    let t = parse_target("10.0.0.5:ssh").unwrap();
    assert_eq!(t.host, "10.0.0.5");
    assert_eq!(t.port, None);
    assert_eq!(t.service, "ssh");
    assert_eq!(t.canonical(), "ssh://10.0.0.5");
}

#[test]
fn parses_host_port_service() {
    let t = parse_target("10.0.0.5:2222:ssh").unwrap();
    assert_eq!(t.port, Some(2222));
    assert_eq!(t.canonical(), "ssh://10.0.0.5:2222");
}

#[test]
fn parses_service_url_form() {
    let t = parse_target("ftp://box.lab.internal:21").unwrap();
    assert_eq!(t.host, "box.lab.internal");
    assert_eq!(t.port, Some(21));
    assert_eq!(t.service, "ftp");
}

#[test]
fn rejects_unknown_service() {
    let err = parse_target("10.0.0.5:gopher").unwrap_err();
    assert!(err.message.contains("gopher"));
    assert!(err.suggestion.contains("ssh"));
}

#[test]
fn rejects_bad_port() {
    assert!(parse_target("10.0.0.5:99999:ssh").is_err());
    assert!(parse_target("ssh://10.0.0.5:nope").is_err());
}

#[test]
fn rejects_shapeless_target() {
    assert!(parse_target("10.0.0.5").is_err());
    assert!(parse_target("a:b:c:d").is_err());
}

#[tokio::test]
async fn preflight_accepts_lab_host_with_credentials() {
    let tool = HydraTool::new();
    let ok = tool
        .preflight(&input("10.0.0.5:ssh", "-l admin -p admin"))
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn preflight_rejects_public_host() {
    let tool = HydraTool::new();
    let err = tool
        .preflight(&input("198.51.100.7:ssh", "-l admin -p admin"))
        .await
        .unwrap_err();
    assert!(err.message.contains("198.51.100.7"));
}

#[tokio::test]
async fn preflight_rejects_missing_credentials() {
    let tool = HydraTool::new();
    let err = tool.preflight(&input("10.0.0.5:ssh", "-t 4")).await.unwrap_err();
    assert!(err.message.contains("credential"));
}

#[tokio::test]
async fn preflight_rejects_oversized_password_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for i in 0..10_001 {
        writeln!(file, "password{}", i).unwrap();
    }
    let tool = HydraTool::new();
    let args = format!("-l admin -P {}", file.path().display());
    let err = tool
        .preflight(&input("10.0.0.5:ssh", &args))
        .await
        .unwrap_err();
    assert!(err.message.contains("10000 lines"));
}

#[tokio::test]
async fn preflight_accepts_small_password_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "admin\nroot\ntoor").unwrap();
    let tool = HydraTool::new();
    let args = format!("-l admin -P {}", file.path().display());
    assert!(tool.preflight(&input("10.0.0.5:ssh", &args)).await.is_ok());
}

#[tokio::test]
async fn preflight_rejects_oversized_login_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let blob = vec![b'a'; 1_048_577];
    file.write_all(&blob).unwrap();
    let tool = HydraTool::new();
    let args = format!("-L {} -p admin", file.path().display());
    let err = tool
        .preflight(&input("10.0.0.5:ssh", &args))
        .await
        .unwrap_err();
    assert!(err.message.contains("limit"));
}

#[tokio::test]
async fn preflight_rejects_missing_wordlist() {
    let tool = HydraTool::new();
    let err = tool
        .preflight(&input("10.0.0.5:ssh", "-l admin -P /nonexistent/words.txt"))
        .await
        .unwrap_err();
    assert!(err.message.contains("cannot read"));
}

#[test]
fn clamps_separate_thread_value() {
    let tool = HydraTool::new();
    let tokens: Vec<String> = vec!["-t".into(), "64".into(), "-l".into(), "admin".into()];
    let optimized = tool.optimize(tokens, "10.0.0.5:ssh");
    assert_eq!(optimized, vec!["-t", "16", "-l", "admin"]);
}

#[test]
fn clamps_joined_thread_value() {
    let tool = HydraTool::new();
    let optimized = tool.optimize(vec!["-t64".to_string()], "10.0.0.5:ssh");
    assert_eq!(optimized, vec!["-t16"]);
}

#[test]
fn keeps_thread_value_at_or_below_ceiling() {
    let tool = HydraTool::new();
    let tokens: Vec<String> = vec!["-t".into(), "16".into()];
    assert_eq!(tool.optimize(tokens, "x"), vec!["-t", "16"]);
    let tokens: Vec<String> = vec!["-t".into(), "4".into()];
    assert_eq!(tool.optimize(tokens, "x"), vec!["-t", "4"]);
}

#[test]
fn assembles_canonical_service_url() {
    let tool = HydraTool::new();
    let argv = tool.assemble(
        vec!["-l".to_string(), "admin".to_string()],
        "10.0.0.5:2222:ssh",
    );
    assert_eq!(argv, vec!["-l", "admin", "ssh://10.0.0.5:2222"]);
}
