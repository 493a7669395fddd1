use iris_submit::aggregator::{summarize, TotalStrategy};
use iris_submit::infrastructure::{Method, RecordingTransport, Reply, Transport};
use iris_submit::models::{load_all_submissions, ChainForest};
use iris_submit::{App, Config};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn write_submission(dir: &Path, name: &str, languages: &str) {
    std::fs::write(dir.join(format!("{}-1.png", name)), b"png").unwrap();
    let text = format!(
        r#"
name = "{name}"
scans = ["{name}-1.png"]

[metadata]
title = "{name}"
notes = "integration"

[ocr]
languages = {languages}
"#
    );
    std::fs::write(dir.join(format!("{}.toml", name)), text).unwrap();
}

fn config(dir: &Path) -> Config {
    Config {
        submission_folder: dir.to_string_lossy().to_string(),
        output_log_file: dir.join("output.txt").to_string_lossy().to_string(),
        failure_log_file: dir.join("warn.txt").to_string_lossy().to_string(),
        download_folder: Some(dir.join("results").to_string_lossy().to_string()),
        max_concurrent_submissions: 2,
        max_poll_rounds: 5,
        ..Config::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_dry_run_processes_every_submission() {
    let dir = tempfile::tempdir().unwrap();
    write_submission(dir.path(), "alpha", r#"["eng"]"#);
    write_submission(dir.path(), "beta", r#"["grc", "lat"]"#);
    write_submission(dir.path(), "gamma", r#"["ara"]"#);

    let transport = Arc::new(RecordingTransport::dry_run());
    let app = App::with_transport(config(dir.path()), transport.clone());

    let stats = app.run().await.unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.success, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(transport.count(Method::Post, "/api/v1/batch"), 3);

    let downloaded = std::fs::read_dir(dir.path().join("results")).unwrap().count();
    assert_eq!(downloaded, 3);
    assert!(!dir.path().join("warn.txt").exists());
}

#[tokio::test]
async fn test_submission_without_language_fails_alone() {
    let dir = tempfile::tempdir().unwrap();
    write_submission(dir.path(), "alpha", r#"["eng"]"#);
    write_submission(dir.path(), "broken", "[]");

    let mut config = config(dir.path());
    config.max_concurrent_submissions = 1;
    config.download_folder = None;

    let transport = Arc::new(RecordingTransport::dry_run());
    let app = App::with_transport(config, transport.clone());
    let stats = app.run().await.unwrap();

    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 1);
    // 失败的提交没有执行
    assert_eq!(
        transport
            .calls()
            .iter()
            .filter(|c| c.method == Method::Post && c.path.starts_with("/api/v1/batch/") && c.path.matches('/').count() == 4)
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_status_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(RecordingTransport::new());
    transport.reply(
        Method::Get,
        "/api/v1/batch/b9",
        Reply::Json(json!({"chains": {
            "bin": {"state": "FAILURE", "children": ["ocr"], "root_documents": ["/pages/b9/a.png"],
                    "errors": ["ValueError", "image too small", "END"], "task": ["binarize", "nlbin"]},
            "ocr": {"state": "PENDING", "parents": ["bin"], "root_documents": ["/pages/b9/a.png"]}
        }})),
    );

    let app = App::with_transport(config(dir.path()), transport.clone());
    let succeeded = app.run_status("b9").await.unwrap();

    assert!(!succeeded);
    let warn = std::fs::read_to_string(dir.path().join("warn.txt")).unwrap();
    assert!(warn.contains("image too small"));
    assert!(warn.contains("binarize.nlbin"));
}

#[tokio::test]
async fn test_loader_and_aggregator_agree_with_server_shape() {
    let dir = tempfile::tempdir().unwrap();
    write_submission(dir.path(), "alpha", r#"["eng"]"#);
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let submissions = load_all_submissions(&dir.path().to_string_lossy()).await.unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].metadata["title"], "alpha");

    let transport = RecordingTransport::dry_run();
    transport.post_json("/api/v1/batch", None).await.unwrap();
    transport.post_json("/api/v1/batch/dry-run-0001", None).await.unwrap();
    let status = transport.get_json("/api/v1/batch/dry-run-0001").await.unwrap();
    let forest: ChainForest = serde_json::from_value(status["chains"].clone()).unwrap();
    assert!(forest.is_empty());
    assert!(!summarize(&forest, TotalStrategy::AncestorWeighted).should_stop());
}
