//! Integration tests for duplicate detection across runs and processes.

mod helpers;

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use plugin_deduplicator::fingerprint::sha256_file;
use plugin_deduplicator::{DeduplicatorPlugin, DuplicateStore};
use rpipe_plugin::catalog::EntryPointCatalog;
use rpipe_plugin::orchestrator::RunRequest;
use rpipe_plugin::payload::PluginInput;
use rpipe_plugin::traits::PluginHandler;

use helpers::{TestPipeline, TestWorkspace};

fn dedup_input(path: &str, hash: &str, trace: &str) -> PluginInput {
    PluginInput::new()
        .with_string("file_path", path)
        .with_string("file_hash", hash)
        .with_string("trace_id", trace)
}

#[tokio::test]
async fn test_fingerprints_survive_restart() {
    let workspace = TestWorkspace::new();
    workspace.install_reference_plugins();
    let mut config = workspace.config();
    config.store.backend = "file".to_string();

    let first_path = workspace.write_file("a.py", "x = 1\n");
    let second_path = workspace.write_file("b.py", "x = 1\n");

    {
        let pipeline = TestPipeline::with_config(config.clone(), EntryPointCatalog::new()).await;
        let hash = sha256_file(Path::new(&first_path)).await.unwrap();
        let summary = pipeline
            .runtime
            .orchestrator()
            .run_request(
                RunRequest::new(&first_path).with_field("file_hash", hash),
                &CancellationToken::new(),
            )
            .await;
        assert!(summary.is_success());
    }

    assert!(Path::new(&config.store.path).exists());

    let pipeline = TestPipeline::with_config(config, EntryPointCatalog::new()).await;
    assert_eq!(pipeline.store.len(), 1);

    let hash = sha256_file(Path::new(&second_path)).await.unwrap();
    let summary = pipeline
        .runtime
        .orchestrator()
        .run_request(
            RunRequest::new(&second_path).with_field("file_hash", hash),
            &CancellationToken::new(),
        )
        .await;
    let output = summary.event("file_detected").unwrap().results[0]
        .output
        .clone()
        .unwrap();
    assert_eq!(output["is_duplicate"], json!(true));
    assert_eq!(output["duplicate_of"], json!(first_path));
}

#[tokio::test]
async fn test_concurrent_sightings_have_one_owner() {
    let store = Arc::new(DuplicateStore::in_memory().await.unwrap());
    let plugin = Arc::new(DeduplicatorPlugin::new(Arc::clone(&store)));

    let mut handles = Vec::new();
    for i in 0..24 {
        let plugin = Arc::clone(&plugin);
        handles.push(tokio::spawn(async move {
            let path = format!("copy-{i}.bin");
            let output = plugin
                .invoke(dedup_input(&path, "same-content", &format!("t{i}")))
                .await;
            (path, output)
        }));
    }

    let mut owners = Vec::new();
    let mut duplicates = Vec::new();
    for handle in handles {
        let (path, output) = handle.await.unwrap();
        assert!(output.is_success());
        if output.get("is_duplicate") == Some(&json!(false)) {
            owners.push(path);
        } else {
            duplicates.push(output.get("duplicate_of").cloned().unwrap());
        }
    }

    assert_eq!(owners.len(), 1);
    assert_eq!(duplicates.len(), 23);
    assert!(duplicates.iter().all(|d| *d == json!(owners[0])));
    assert_eq!(store.owner_of("same-content").await.as_deref(), Some(owners[0].as_str()));
}

#[tokio::test]
async fn test_reprocessed_path_points_at_itself() {
    let store = Arc::new(DuplicateStore::in_memory().await.unwrap());
    let plugin = DeduplicatorPlugin::new(store);

    plugin.invoke(dedup_input("same.txt", "h", "t1")).await;
    let again = plugin.invoke(dedup_input("same.txt", "h", "t2")).await;
    assert_eq!(again.get("is_duplicate"), Some(&json!(true)));
    assert_eq!(again.get("duplicate_of"), Some(&json!("same.txt")));
    assert_eq!(again.trace_id, "t2");
}

#[tokio::test]
async fn test_missing_hash_reported_by_plugin() {
    let store = Arc::new(DuplicateStore::in_memory().await.unwrap());
    let plugin = DeduplicatorPlugin::new(store);

    let output = plugin
        .invoke(
            PluginInput::new()
                .with_string("file_path", "a.txt")
                .with_string("trace_id", "t9"),
        )
        .await;
    assert!(!output.is_success());
    assert_eq!(output.trace_id, "t9");
    assert_eq!(
        output.error_message.as_deref(),
        Some("Missing required fields: file_hash")
    );
}
