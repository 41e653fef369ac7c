//! Starting an application from a configuration file.

use std::fs;
use std::sync::Arc;

use serde_json::json;

use hookshot::core::EventProfiler;
use hookshot::prelude::*;
use hookshot::runtime::config::LogLevel;
use hookshot::runtime::{RuntimeError, RuntimeStats};

mod orders {
    use super::*;

    #[listen(class = "orders")]
    pub fn on_placed(event: &mut PayloadEvent) -> HookResult {
        let total = event.get("total").and_then(|v| v.as_i64()).unwrap_or(0);
        event.insert("discounted", total >= 100)?;
        Ok(())
    }
}

const CONFIG: &str = r#"
[logging]
level = "debug"

[events.listeners]
"order:placed" = ["orders::on_placed"]
"#;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hookshot.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

fn placed(total: i64) -> PayloadEvent {
    let payload = json!({ "total": total });
    PayloadEvent::untargeted("order:placed", payload.as_object().cloned().unwrap()).unwrap()
}

#[test]
fn test_runtime_from_file() {
    let (_dir, path) = write_config(CONFIG);
    let runtime = EventRuntime::builder()
        .config_file(&path)
        .without_env()
        .profiler(Arc::new(EventProfiler::new()))
        .build()
        .unwrap();

    assert_eq!(runtime.config().logging.level, LogLevel::Debug);
    assert_eq!(
        runtime.stats(),
        RuntimeStats {
            event_types: 1,
            hooks: 1,
            listeners: 1,
        }
    );

    let event = runtime.emit(placed(120)).unwrap();
    assert_eq!(event.get("discounted"), Some(&json!(true)));

    let event = runtime.provider().emit(placed(20)).unwrap();
    assert_eq!(event.get("discounted"), Some(&json!(false)));
}

#[test]
fn test_runtime_from_search_path() {
    let (dir, _path) = write_config(CONFIG);
    let runtime = EventRuntime::builder()
        .search_path(dir.path())
        .without_env()
        .profiler(Arc::new(EventProfiler::new()))
        .build()
        .unwrap();

    assert_eq!(runtime.events().types(), ["order:placed"]);
}

#[test]
fn test_unknown_reference_in_file() {
    let (_dir, path) = write_config(
        r#"
[events.listeners]
"order:placed" = ["orders::on_cancelled"]
"#,
    );
    let err = EventRuntime::builder()
        .config_file(&path)
        .without_env()
        .build()
        .unwrap_err();

    assert!(matches!(
        err,
        RuntimeError::Event(EventError::InvalidHook { .. })
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = EventRuntime::builder()
        .config_file(dir.path().join("missing.toml"))
        .without_env()
        .build()
        .unwrap_err();

    assert!(matches!(err, RuntimeError::Config(_)));
}
