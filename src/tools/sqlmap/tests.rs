use super::*;

fn input(target: &str, extra_args: &str) -> ToolInput {
    ToolInput {
        target: target.to_string(),
        extra_args: extra_args.to_string(),
        timeout_sec: None,
        correlation_id: None,
    }
}

#[tokio::test]
async fn accepts_lab_ip_url() {
    let tool = SqlmapTool::new();
    let ok = tool
        .preflight(&input("http://192.168.1.20/item.php?id=1", "--risk 2"))
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn accepts_lab_hostname_url() {
    let tool = SqlmapTool::new();
    assert!(
        tool.preflight(&input("https://shop.lab.internal/search", ""))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn rejects_public_host() {
    let tool = SqlmapTool::new();
    let err = tool
        .preflight(&input("http://example.com/item", ""))
        .await
        .unwrap_err();
    assert!(err.message.contains("example.com"));
}

#[tokio::test]
async fn rejects_non_url_target() {
    let tool = SqlmapTool::new();
    assert!(tool.preflight(&input("192.168.1.20", "")).await.is_err());
}

#[tokio::test]
async fn risk_two_accepted_risk_three_rejected() {
    let tool = SqlmapTool::new();
    let url = "http://10.0.0.9/app";
    assert!(tool.preflight(&input(url, "--risk 2")).await.is_ok());
    let err = tool.preflight(&input(url, "--risk 3")).await.unwrap_err();
    assert!(err.message.contains("ceiling"));
}

#[tokio::test]
async fn risk_equals_form_is_checked() {
    let tool = SqlmapTool::new();
    let url = "http://10.0.0.9/app";
    assert!(tool.preflight(&input(url, "--risk=1")).await.is_ok());
    assert!(tool.preflight(&input(url, "--risk=9")).await.is_err());
}

#[tokio::test]
async fn level_ceiling_is_three() {
    let tool = SqlmapTool::new();
    let url = "http://10.0.0.9/app";
    assert!(tool.preflight(&input(url, "--level 3")).await.is_ok());
    assert!(tool.preflight(&input(url, "--level 4")).await.is_err());
}

#[tokio::test]
async fn bare_risk_flag_without_value_rejected() {
    let tool = SqlmapTool::new();
    let err = tool
        .preflight(&input("http://10.0.0.9/app", "--risk"))
        .await
        .unwrap_err();
    assert!(err.message.contains("numeric value"));
}

#[test]
fn forces_batch_when_absent() {
    let tool = SqlmapTool::new();
    let optimized = tool.optimize(vec!["--dbs".to_string()], "http://10.0.0.9/");
    assert_eq!(optimized, vec!["--batch", "--dbs"]);
}

#[test]
fn does_not_duplicate_batch() {
    let tool = SqlmapTool::new();
    let optimized = tool.optimize(vec!["--batch".to_string()], "http://10.0.0.9/");
    assert_eq!(optimized, vec!["--batch"]);
}

#[test]
fn assembles_url_through_dash_u() {
    let tool = SqlmapTool::new();
    let argv = tool.assemble(vec!["--batch".to_string()], "http://10.0.0.9/app");
    assert_eq!(argv, vec!["--batch", "-u", "http://10.0.0.9/app"]);
}
