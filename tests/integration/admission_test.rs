//! Integration tests for plugin submission, gating and admission.

mod helpers;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use rpipe_plugin::catalog::EntryPointCatalog;
use rpipe_plugin::contract::LifecycleEvent;
use rpipe_plugin::gates::{
    COVERAGE, QualityGateEngine, SECURITY_SCAN, ScanError, ScanFindings, SecurityScanner,
};
use rpipe_plugin::payload::PluginOutput;
use rpipe_plugin::runtime::PipelineRuntime;
use rpipe_plugin::traits::ClosureHandler;

use helpers::{TestPipeline, TestWorkspace, spec_doc};

fn echo_catalog(names: &[&str]) -> EntryPointCatalog {
    names.iter().fold(EntryPointCatalog::new(), |catalog, name| {
        catalog.with(
            name,
            ClosureHandler::wrap(name, |input| async move {
                PluginOutput::success(input.trace_id().unwrap_or_default())
            }),
        )
    })
}

/// Scanner returning a fixed finding count and counting calls.
#[derive(Debug, Default)]
struct FixedScanner {
    findings: u64,
    calls: AtomicUsize,
}

#[async_trait]
impl SecurityScanner for FixedScanner {
    async fn scan(&self, _plugin_path: &Path) -> Result<ScanFindings, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ScanFindings {
            count: self.findings,
        })
    }
}

/// Scanner whose tool always crashes.
#[derive(Debug)]
struct BrokenScanner;

#[async_trait]
impl SecurityScanner for BrokenScanner {
    async fn scan(&self, _plugin_path: &Path) -> Result<ScanFindings, ScanError> {
        Err(ScanError::ToolFailed {
            code: 2,
            stderr: "internal error".to_string(),
        })
    }
}

async fn bootstrap_with_scanner(
    workspace: &TestWorkspace,
    scanner: Arc<dyn SecurityScanner>,
    catalog: EntryPointCatalog,
) -> PipelineRuntime {
    let mut config = workspace.config();
    config.gates.enabled = vec![
        "coverage".to_string(),
        "security_scan".to_string(),
        "contract_compliance".to_string(),
    ];
    let events = LifecycleEvent::ordered(&config.pipeline.lifecycle_events);
    let engine =
        QualityGateEngine::from_config_with_scanner(&config.gates, &config.plugins, &events, scanner)
            .unwrap();
    PipelineRuntime::bootstrap_with_engine(
        &config,
        catalog,
        Arc::new(rpipe_plugin::observe::MemoryObserver::new()),
        engine,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_plugins_admitted_in_directory_order() {
    let workspace = TestWorkspace::new();
    for (dir, name) in [("30-gamma", "gamma"), ("10-alpha", "alpha"), ("20-beta", "beta")] {
        workspace.write_plugin(
            dir,
            &spec_doc(name, "1.0.0", "pre_merge", name).build(),
            Some(90.0),
        );
    }

    let pipeline = TestPipeline::new(&workspace, echo_catalog(&["alpha", "beta", "gamma"])).await;
    assert_eq!(pipeline.runtime.loaded().len(), 3);
    assert!(pipeline.runtime.loaded().iter().all(|o| o.admitted));
    assert_eq!(
        pipeline.plugin_names("pre_merge").await,
        vec!["alpha", "beta", "gamma"]
    );
}

#[tokio::test]
async fn test_low_coverage_blocks_admission() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "thin",
        &spec_doc("thin", "1.0.0", "pre_merge", "thin").build(),
        Some(72.5),
    );

    let pipeline = TestPipeline::new(&workspace, echo_catalog(&["thin"])).await;
    let outcome = &pipeline.runtime.loaded()[0];
    assert!(!outcome.admitted);

    let coverage = outcome
        .report
        .results
        .iter()
        .find(|r| r.gate_name == COVERAGE)
        .unwrap();
    assert!(!coverage.passed);
    assert_eq!(coverage.message, "Coverage 72.5% < 80%");
    assert!(outcome.reason.as_ref().unwrap().contains("coverage"));
    assert_eq!(pipeline.runtime.registry().count().await, 0);
}

#[tokio::test]
async fn test_missing_coverage_report_blocks_admission() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "untested",
        &spec_doc("untested", "1.0.0", "pre_merge", "untested").build(),
        None,
    );

    let pipeline = TestPipeline::new(&workspace, echo_catalog(&["untested"])).await;
    let outcome = &pipeline.runtime.loaded()[0];
    assert!(!outcome.admitted);
    assert!(outcome.report.results[0].message.starts_with("Cannot read coverage report"));
}

#[tokio::test]
async fn test_every_gate_runs_even_after_a_failure() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "leaky",
        &spec_doc("leaky", "1.0.0", "pre_merge", "leaky").build(),
        Some(10.0),
    );
    let scanner = Arc::new(FixedScanner {
        findings: 3,
        ..FixedScanner::default()
    });

    let runtime = bootstrap_with_scanner(&workspace, scanner.clone(), echo_catalog(&["leaky"])).await;
    let report = &runtime.loaded()[0].report;
    assert_eq!(report.results.len(), 3);
    assert!(!report.all_passed);
    assert_eq!(report.failures().len(), 2);
    assert_eq!(report.results[1].gate_name, SECURITY_SCAN);
    assert_eq!(report.results[1].message, "Found 3 security issues");
    assert!(report.results[2].passed);
    assert_eq!(scanner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_clean_scan_admits_plugin() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "tidy",
        &spec_doc("tidy", "1.0.0", "file_detected", "tidy").build(),
        Some(99.0),
    );

    let runtime = bootstrap_with_scanner(
        &workspace,
        Arc::new(FixedScanner::default()),
        echo_catalog(&["tidy"]),
    )
    .await;
    let outcome = &runtime.loaded()[0];
    assert!(outcome.admitted, "{:?}", outcome.reason);
    assert_eq!(outcome.report.results[1].message, "No security issues found");
    assert!(runtime.registry().contains("tidy").await);
}

#[tokio::test]
async fn test_scanner_failure_is_a_gate_failure() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "opaque",
        &spec_doc("opaque", "1.0.0", "pre_merge", "opaque").build(),
        Some(99.0),
    );

    let runtime =
        bootstrap_with_scanner(&workspace, Arc::new(BrokenScanner), echo_catalog(&["opaque"])).await;
    let outcome = &runtime.loaded()[0];
    assert!(!outcome.admitted);
    let scan = &outcome.report.results[1];
    assert!(!scan.passed);
    assert!(scan.message.starts_with("Security scan could not run"));
    assert!(scan.message.contains("internal error"));
}

#[tokio::test]
async fn test_contract_without_trace_id_is_rejected() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "untraced",
        &spec_doc("untraced", "1.0.0", "pre_merge", "untraced")
            .with_output(&["status"])
            .build(),
        Some(99.0),
    );

    let pipeline = TestPipeline::new(&workspace, echo_catalog(&["untraced"])).await;
    let outcome = &pipeline.runtime.loaded()[0];
    assert!(!outcome.admitted);
    assert!(outcome.reason.as_ref().unwrap().contains("trace_id"));
    assert!(!pipeline.runtime.registry().contains("untraced").await);
}

#[tokio::test]
async fn test_unsupported_event_is_rejected() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "nightly",
        &spec_doc("nightly", "1.0.0", "nightly_batch", "nightly").build(),
        Some(99.0),
    );

    let pipeline = TestPipeline::new(&workspace, echo_catalog(&["nightly"])).await;
    let outcome = &pipeline.runtime.loaded()[0];
    assert!(!outcome.admitted);
    assert!(outcome.reason.as_ref().unwrap().contains("nightly_batch"));
}

#[tokio::test]
async fn test_unknown_entry_point_is_rejected() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "ghost",
        &spec_doc("ghost", "1.0.0", "pre_merge", "not_compiled_in").build(),
        Some(99.0),
    );

    let pipeline = TestPipeline::new(&workspace, EntryPointCatalog::new()).await;
    let outcome = &pipeline.runtime.loaded()[0];
    assert!(!outcome.admitted);
    assert_eq!(
        outcome.reason.as_deref(),
        Some("Unknown entry point 'not_compiled_in'")
    );
}

#[tokio::test]
async fn test_disabled_plugin_is_not_invoked() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "dormant",
        &spec_doc("dormant", "1.0.0", "pre_merge", "dormant")
            .enabled(false)
            .build(),
        Some(99.0),
    );

    let pipeline = TestPipeline::new(&workspace, echo_catalog(&["dormant"])).await;
    assert_eq!(
        pipeline.runtime.loaded()[0].reason.as_deref(),
        Some("Plugin is disabled")
    );

    let summary = pipeline.runtime.orchestrator().run("x.txt", None).await;
    assert_eq!(summary.results().count(), 0);
}

#[tokio::test]
async fn test_resubmission_replaces_version_in_place() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "10-first",
        &spec_doc("first", "1.0.0", "pre_merge", "first").build(),
        Some(90.0),
    );
    workspace.write_plugin(
        "20-second",
        &spec_doc("second", "1.0.0", "pre_merge", "second").build(),
        Some(90.0),
    );

    let pipeline = TestPipeline::new(&workspace, echo_catalog(&["first", "second"])).await;

    let upgraded = workspace.write_plugin(
        "10-first",
        &spec_doc("first", "2.0.0", "pre_merge", "first").build(),
        Some(90.0),
    );
    let outcome = pipeline
        .runtime
        .manager()
        .submit_directory(&upgraded)
        .await
        .unwrap();
    assert!(outcome.admitted);

    let event = LifecycleEvent::parse("pre_merge").unwrap();
    let plugins = pipeline.runtime.registry().resolve(&event).await;
    assert_eq!(plugins.len(), 2);
    assert_eq!(plugins[0].name(), "first");
    assert_eq!(plugins[0].spec.version, "2.0.0");
    assert_eq!(plugins[1].name(), "second");

    let summary = pipeline.runtime.orchestrator().run("x.txt", None).await;
    let results = &summary.event("pre_merge").unwrap().results;
    assert_eq!(results[0].plugin_version, "2.0.0");
}

#[tokio::test]
async fn test_failed_resubmission_keeps_admitted_version() {
    let workspace = TestWorkspace::new();
    let dir = workspace.write_plugin(
        "stable",
        &spec_doc("stable", "1.0.0", "pre_merge", "stable").build(),
        Some(90.0),
    );
    let pipeline = TestPipeline::new(&workspace, echo_catalog(&["stable"])).await;

    workspace.write_plugin(
        "stable",
        &spec_doc("stable", "1.1.0", "pre_merge", "stable").build(),
        Some(40.0),
    );
    let outcome = pipeline
        .runtime
        .manager()
        .submit_directory(&dir)
        .await
        .unwrap();
    assert!(!outcome.admitted);

    let event = LifecycleEvent::parse("pre_merge").unwrap();
    let plugins = pipeline.runtime.registry().resolve(&event).await;
    assert_eq!(plugins[0].spec.version, "1.0.0");
}

#[tokio::test]
async fn test_deregistered_plugin_stops_running() {
    let workspace = TestWorkspace::new();
    workspace.write_plugin(
        "gone",
        &spec_doc("gone", "1.0.0", "post_merge", "gone").build(),
        Some(90.0),
    );
    let pipeline = TestPipeline::new(&workspace, echo_catalog(&["gone"])).await;

    assert!(pipeline.runtime.registry().deregister("gone").await);
    assert!(!pipeline.runtime.registry().deregister("gone").await);

    let summary = pipeline.runtime.orchestrator().run("x.txt", None).await;
    assert!(summary.event("post_merge").unwrap().results.is_empty());
}
