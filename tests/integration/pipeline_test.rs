//! Integration tests for end-to-end pipeline runs.

mod helpers;

use std::path::Path;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use plugin_deduplicator::fingerprint::sha256_file;
use rpipe_core::traits::observability::SpanStatus;
use rpipe_plugin::catalog::EntryPointCatalog;
use rpipe_plugin::orchestrator::{InvocationErrorKind, RUN_SPAN, RunRequest};
use rpipe_plugin::payload::{InvocationStatus, PluginOutput};
use rpipe_plugin::traits::ClosureHandler;

use helpers::{TestPipeline, TestWorkspace, spec_doc};

async fn request_for(path: &str) -> RunRequest {
    let hash = sha256_file(Path::new(path)).await.unwrap();
    RunRequest::new(path).with_field("file_hash", hash)
}

#[tokio::test]
async fn test_reference_plugins_detect_duplicate_content() {
    let workspace = TestWorkspace::new();
    workspace.install_reference_plugins();
    let pipeline = TestPipeline::new(&workspace, EntryPointCatalog::new()).await;

    assert_eq!(pipeline.plugin_names("file_detected").await, vec!["deduplicator"]);
    assert_eq!(pipeline.plugin_names("pre_merge").await, vec!["file-classifier"]);

    let original = workspace.write_file("report.py", "print('hello')\n");
    let copy = workspace.write_file("report_copy.py", "print('hello')\n");

    let cancel = CancellationToken::new();
    let first = pipeline
        .runtime
        .orchestrator()
        .run_request(request_for(&original).await, &cancel)
        .await;
    assert!(first.is_success(), "{:?}", first.error_message);
    assert_eq!(first.events.len(), 3);

    let dedup = &first.event("file_detected").unwrap().results[0];
    assert_eq!(dedup.status, InvocationStatus::Success);
    let output = dedup.output.as_ref().unwrap();
    assert_eq!(output["is_duplicate"], json!(false));
    assert_eq!(output["recommended_action"], json!("proceed"));

    let classified = &first.event("pre_merge").unwrap().results[0];
    let output = classified.output.as_ref().unwrap();
    assert_eq!(output["classification"], json!("python_module"));
    assert_eq!(output["recommended_location"], json!("modules/python/"));

    assert!(first.event("post_merge").unwrap().results.is_empty());

    let second = pipeline
        .runtime
        .orchestrator()
        .run_request(request_for(&copy).await, &cancel)
        .await;
    let output = second.event("file_detected").unwrap().results[0]
        .output
        .clone()
        .unwrap();
    assert_eq!(output["is_duplicate"], json!(true));
    assert_eq!(output["duplicate_of"], json!(original));
    assert_eq!(output["recommended_action"], json!("quarantine"));
    assert_eq!(pipeline.store.len(), 1);
}

#[tokio::test]
async fn test_caller_trace_id_reaches_every_plugin() {
    let workspace = TestWorkspace::new();
    workspace.install_reference_plugins();
    let pipeline = TestPipeline::new(&workspace, EntryPointCatalog::new()).await;

    let file = workspace.write_file("notes.md", "# notes\n");
    let request = request_for(&file).await.with_trace_id(Some("trace-abc"));
    let summary = pipeline
        .runtime
        .orchestrator()
        .run_request(request, &CancellationToken::new())
        .await;

    assert_eq!(summary.trace_id, "trace-abc");
    assert_eq!(summary.results().count(), 2);
    for result in summary.results() {
        assert_eq!(result.trace_id, "trace-abc");
        assert_eq!(result.output.as_ref().unwrap()["trace_id"], json!("trace-abc"));
    }

    for span in pipeline.observer.spans() {
        assert_eq!(span.trace_id, "trace-abc");
        assert!(span.ended, "span {} left open", span.name);
    }
}

#[tokio::test]
async fn test_generated_trace_ids_differ_between_runs() {
    let workspace = TestWorkspace::new();
    let pipeline = TestPipeline::new(&workspace, EntryPointCatalog::new()).await;

    let orchestrator = pipeline.runtime.orchestrator();
    let a = orchestrator.run("a.txt", None).await;
    let b = orchestrator.run("b.txt", None).await;
    assert!(!a.trace_id.is_empty());
    assert_ne!(a.trace_id, b.trace_id);
}

#[tokio::test]
async fn test_span_tree_mirrors_events_and_plugins() {
    let workspace = TestWorkspace::new();
    workspace.install_reference_plugins();
    let pipeline = TestPipeline::new(&workspace, EntryPointCatalog::new()).await;

    let file = workspace.write_file("tool.ps1", "Write-Host hi\n");
    pipeline
        .runtime
        .orchestrator()
        .run_request(request_for(&file).await, &CancellationToken::new())
        .await;

    let root = pipeline.observer.find(RUN_SPAN).unwrap();
    assert_eq!(root.parent, None);
    assert_eq!(root.status, SpanStatus::Ok);

    let events: Vec<String> = pipeline
        .observer
        .children_of(Some(root.id))
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(
        events,
        vec![
            "lifecycle.file_detected",
            "lifecycle.pre_merge",
            "lifecycle.post_merge"
        ]
    );

    let detected = pipeline.observer.find("lifecycle.file_detected").unwrap();
    let plugins = pipeline.observer.children_of(Some(detected.id));
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0].name, "plugin.deduplicator");
    assert_eq!(plugins[0].attributes["plugin.status"], json!("success"));
}

#[tokio::test]
async fn test_faulty_plugin_does_not_stop_its_siblings() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "10-crasher",
        &spec_doc("crasher", "1.0.0", "post_merge", "crasher").build(),
        Some(90.0),
    );
    workspace.write_plugin(
        "20-stamper",
        &spec_doc("stamper", "1.0.0", "post_merge", "stamper").build(),
        Some(90.0),
    );

    let catalog = EntryPointCatalog::new()
        .with(
            "crasher",
            ClosureHandler::wrap("crasher", |input| async move {
                if input.file_path().is_some() {
                    panic!("crasher exploded");
                }
                PluginOutput::success(input.trace_id().unwrap_or_default())
            }),
        )
        .with(
            "stamper",
            ClosureHandler::wrap("stamper", |input| async move {
                PluginOutput::success(input.trace_id().unwrap_or_default()).with_data("stamped", true)
            }),
        );
    let pipeline = TestPipeline::new(&workspace, catalog).await;

    let summary = pipeline.runtime.orchestrator().run("any.txt", None).await;
    assert!(summary.is_success());
    assert_eq!(summary.failed_invocations(), 1);

    let results = &summary.event("post_merge").unwrap().results;
    assert_eq!(results[0].plugin_name, "crasher");
    assert_eq!(results[0].status, InvocationStatus::Error);
    assert_eq!(results[0].error_kind, Some(InvocationErrorKind::RuntimeFault));
    assert_eq!(results[1].plugin_name, "stamper");
    assert_eq!(results[1].output.as_ref().unwrap()["stamped"], json!(true));

    let span = pipeline.observer.find("plugin.crasher").unwrap();
    assert!(matches!(span.status, SpanStatus::Error(_)));
}

#[tokio::test]
async fn test_slow_plugin_times_out() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "sleeper",
        &spec_doc("sleeper", "1.0.0", "pre_merge", "sleeper")
            .with_timeout(1)
            .build(),
        Some(90.0),
    );
    let catalog = EntryPointCatalog::new().with(
        "sleeper",
        ClosureHandler::wrap("sleeper", |input| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            PluginOutput::success(input.trace_id().unwrap_or_default())
        }),
    );
    let pipeline = TestPipeline::new(&workspace, catalog).await;

    let started = std::time::Instant::now();
    let summary = pipeline.runtime.orchestrator().run("slow.txt", None).await;
    assert!(started.elapsed() < Duration::from_secs(10));

    let result = &summary.event("pre_merge").unwrap().results[0];
    assert_eq!(result.error_kind, Some(InvocationErrorKind::Timeout));
    assert!(result.error_message.as_ref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_missing_required_input_is_reported_per_plugin() {
    let workspace = TestWorkspace::new();
    workspace.install_reference_plugins();
    let pipeline = TestPipeline::new(&workspace, EntryPointCatalog::new()).await;

    // No file_hash: the deduplicator's contract cannot be satisfied.
    let summary = pipeline.runtime.orchestrator().run("plain.rs", None).await;
    assert!(summary.is_success());

    let dedup = &summary.event("file_detected").unwrap().results[0];
    assert_eq!(dedup.error_kind, Some(InvocationErrorKind::MissingField));
    assert!(dedup.error_message.as_ref().unwrap().contains("file_hash"));

    let classified = &summary.event("pre_merge").unwrap().results[0];
    assert_eq!(classified.status, InvocationStatus::Success);
    assert_eq!(
        classified.output.as_ref().unwrap()["classification"],
        json!("rust_module")
    );
}

#[tokio::test]
async fn test_cancelled_run_starts_no_events() {
    let workspace = TestWorkspace::new();
    workspace.install_reference_plugins();
    let pipeline = TestPipeline::new(&workspace, EntryPointCatalog::new()).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = pipeline
        .runtime
        .orchestrator()
        .run_request(RunRequest::new("late.py"), &cancel)
        .await;

    assert!(!summary.is_success());
    assert!(summary.events.is_empty());
    assert_eq!(
        summary.error_message.as_deref(),
        Some("run cancelled before event 'file_detected'")
    );
    assert!(pipeline.store.is_empty());
}
