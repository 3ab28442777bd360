use super::*;
use crate::safety::args::enforce_allow_list;

fn input(target: &str, extra_args: &str) -> ToolInput {
    ToolInput {
        target: target.to_string(),
        extra_args: extra_args.to_string(),
        timeout_sec: None,
        correlation_id: None,
    }
}

#[tokio::test]
async fn dir_mode_with_lab_url() {
    let tool = GobusterTool::new();
    let ok = tool
        .preflight(&input("http://192.168.1.10/", "dir -w /usr/share/wordlists/common.txt"))
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn rejects_missing_mode() {
    let tool = GobusterTool::new();
    let err = tool
        .preflight(&input("http://192.168.1.10/", "-w list.txt"))
        .await
        .unwrap_err();
    assert!(err.suggestion.contains("dir, dns, vhost"));
}

#[tokio::test]
async fn rejects_duplicate_modes() {
    let tool = GobusterTool::new();
    let err = tool
        .preflight(&input("http://192.168.1.10/", "dir vhost"))
        .await
        .unwrap_err();
    assert!(err.message.contains("multiple"));
}

#[tokio::test]
async fn dns_mode_requires_bare_domain() {
    let tool = GobusterTool::new();
    assert!(
        tool.preflight(&input("corp.lab.internal", "dns"))
            .await
            .is_ok()
    );
    let err = tool
        .preflight(&input("http://corp.lab.internal/", "dns"))
        .await
        .unwrap_err();
    assert!(err.message.contains("bare domain"));
}

#[tokio::test]
async fn dir_mode_requires_url() {
    let tool = GobusterTool::new();
    let err = tool
        .preflight(&input("192.168.1.10", "dir"))
        .await
        .unwrap_err();
    assert!(err.message.contains("not a valid URL"));
}

#[tokio::test]
async fn rejects_public_url_host() {
    let tool = GobusterTool::new();
    let err = tool
        .preflight(&input("http://example.com/", "dir"))
        .await
        .unwrap_err();
    assert!(err.message.contains("example.com"));
}

#[tokio::test]
async fn rejects_non_http_scheme() {
    let tool = GobusterTool::new();
    let err = tool
        .preflight(&input("ftp://192.168.1.10/", "dir"))
        .await
        .unwrap_err();
    assert!(err.message.contains("scheme"));
}

#[test]
fn dir_mode_injects_target_threads_and_blacklist() {
    let tool = GobusterTool::new();
    let tokens = vec!["dir".to_string(), "-w".to_string(), "list.txt".to_string()];
    let optimized = tool.optimize(tokens, "http://10.0.0.5/");
    assert_eq!(
        optimized,
        vec!["dir", "-u", "http://10.0.0.5/", "-t", "40", "-b", "404", "-w", "list.txt"]
    );
}

#[test]
fn dns_mode_injects_domain_flag() {
    let tool = GobusterTool::new();
    let optimized = tool.optimize(vec!["dns".to_string()], "corp.lab.internal");
    assert_eq!(
        optimized,
        vec!["dns", "-d", "corp.lab.internal", "-t", "20"]
    );
}

#[test]
fn user_target_flag_is_not_duplicated() {
    let tool = GobusterTool::new();
    let tokens = vec![
        "dir".to_string(),
        "-u".to_string(),
        "http://10.0.0.5/app/".to_string(),
    ];
    let optimized = tool.optimize(tokens, "http://10.0.0.5/");
    assert_eq!(optimized.iter().filter(|t| *t == "-u").count(), 1);
    assert!(optimized.contains(&"http://10.0.0.5/app/".to_string()));
}

#[test]
fn user_status_codes_suppress_blacklist_default() {
    let tool = GobusterTool::new();
    let tokens = vec!["dir".to_string(), "-s".to_string(), "200,301".to_string()];
    let optimized = tool.optimize(tokens, "http://10.0.0.5/");
    assert!(!optimized.contains(&"-b".to_string()));
}

#[test]
fn assembly_does_not_append_target() {
    let tool = GobusterTool::new();
    let argv = tool.assemble(vec!["dir".to_string(), "-u".to_string(), "x".to_string()], "x");
    assert_eq!(argv.last().unwrap(), "x");
    assert_eq!(argv.len(), 3);
}

#[test]
fn optimized_output_passes_allow_list() {
    let tool = GobusterTool::new();
    let optimized = tool.optimize(vec!["dir".to_string()], "http://10.0.0.5/");
    assert!(enforce_allow_list(&optimized, tool.descriptor().allowed_flags).is_ok());
}
