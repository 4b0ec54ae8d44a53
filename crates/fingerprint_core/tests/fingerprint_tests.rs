//! End-to-end collection: registry -> orchestrator -> detectors -> document

use fingerprint_core::registry::{BROWSER, ENVIRONMENT, HARDWARE};
use fingerprint_core::{
    default_detectors, Collector, ConfigError, FingerprintConfig, FnProbe, ProbeOrchestrator, ProbeRegistry,
    ProbeStatus, RecordingSink, ValueProbe,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn headless_registry() -> ProbeRegistry {
    let mut registry = ProbeRegistry::new().with_default_timeout(Duration::from_millis(40));
    let probes = [
        (BROWSER, "user_agent", json!("Mozilla/5.0 HeadlessChrome/121.0 Safari/537.36")),
        (BROWSER, "plugins_count", json!(0)),
        (BROWSER, "languages", json!([])),
        (BROWSER, "webdriver", json!(true)),
        (BROWSER, "platform", json!("Linux x86_64")),
        (ENVIRONMENT, "outer_width", json!(0)),
        (ENVIRONMENT, "outer_height", json!(0)),
        (HARDWARE, "webgl_renderer", json!("Google SwiftShader")),
        (HARDWARE, "max_texture_size", json!(8192)),
    ];
    for (group, name, value) in probes {
        registry.register(group, ValueProbe::new(name, value)).unwrap();
    }
    registry
        .register(
            HARDWARE,
            FnProbe::new("timing_samples", || async {
                std::future::pending::<()>().await;
                Ok(Value::Null)
            })
            .with_fallback(json!([])),
        )
        .unwrap();
    registry
}

#[tokio::test]
async fn test_collect_headless_profile() {
    let sink = RecordingSink::new();
    let collector = Collector::new(
        ProbeOrchestrator::with_sink(Arc::new(sink.clone())),
        headless_registry(),
        default_detectors(&Default::default()),
    );

    let fp = collector.collect().await.unwrap();

    assert_eq!(fp.groups.len(), 3);
    assert_eq!(fp.count(ProbeStatus::Timeout), 1);
    assert_eq!(fp.degraded(), vec!["hardware.timing_samples".to_string()]);
    assert_eq!(sink.degraded().len(), 1);

    let headless = &fp.detections["headless"];
    assert_eq!(headless.verdict.category, "headless");
    assert!(headless
        .verdict
        .matched_indicators
        .contains(&"navigator_webdriver".to_string()));

    // the timed-out probe's fallback never counts as evidence
    assert_eq!(fp.detections["thermal"].verdict.confidence, 0.0);
    assert_eq!(fp.detections["gpu_tier"].verdict.category, "low");
}

#[tokio::test]
async fn test_configured_bands_reach_detectors() {
    let config = FingerprintConfig::from_toml_str(
        r#"
[orchestrator]
default_timeout_ms = 40
log_degraded = false

[detectors.headless]
bands = [
  { threshold = 0.0, label = "clean" },
  { threshold = 0.99, label = "bot" },
]
"#,
    )
    .unwrap();

    let mut registry = ProbeRegistry::from_config(&config.orchestrator);
    registry
        .register(BROWSER, ValueProbe::new("webdriver", json!(true)))
        .unwrap();

    let fp = Collector::from_config(&config, registry).collect().await.unwrap();
    // webdriver alone: that component scores 0.75, the other two 0, so 0.25 overall
    assert_eq!(fp.detections["headless"].verdict.category, "clean");
    assert_eq!(
        fp.detections["headless"].components["webdriver"].category,
        "clean"
    );
}

#[tokio::test]
async fn test_unknown_weight_key_fails_before_collection() {
    let config = FingerprintConfig::from_toml_str(
        r#"
[detectors.cpu_vendor.weights]
gpu = 3.0
"#,
    )
    .unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let mut registry = ProbeRegistry::from_config(&config.orchestrator);
    registry
        .register(
            HARDWARE,
            FnProbe::new("webgl_renderer", move || {
                let flag = Arc::clone(&flag);
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(json!("Intel(R) UHD Graphics 620"))
                }
            }),
        )
        .unwrap();

    let err = Collector::from_config(&config, registry)
        .collect()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::UnknownWeight { ref detector, ref key, .. }
            if detector == "cpu_vendor" && key == "gpu"
    ));
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_payload_is_one_json_document() {
    let mut registry = ProbeRegistry::new();
    registry
        .register(BROWSER, ValueProbe::new("language", json!("es-ES")))
        .unwrap();
    registry
        .register(HARDWARE, ValueProbe::new("cores", json!(12)))
        .unwrap();

    let collector = Collector::new(ProbeOrchestrator::new(), registry, Vec::new());
    let first = collector.collect().await.unwrap();
    let second = collector.collect().await.unwrap();
    assert_ne!(first.collection_id, second.collection_id);

    let payload = first.payload();
    assert_eq!(payload["signals"]["browser"]["language"], "es-ES");
    assert_eq!(payload["signals"]["hardware"]["cores"], 12);
    assert_eq!(payload["collection_id"], first.collection_id.to_string());
    assert!(payload["collected_at"].as_str().unwrap().contains('T'));

    let full = first.to_json().unwrap();
    assert_eq!(full["groups"]["hardware"]["results"]["cores"]["status"], "ok");
}
