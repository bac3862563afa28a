//! Integration tests for tracing and event monitoring.
//!
//! The global registry's trace callback is shared by the whole test binary,
//! so tests that set it run under `#[serial]` and only count events for their
//! own keys.

use module_singleton::{
    clear_trace_callback, contains, is_resolved, resolve, set_trace_callback, InstancePtr,
    Registry, RegistryEvent, TypeKey,
};
use serial_test::serial;
use std::sync::atomic::AtomicPtr;
use std::sync::{Arc, Mutex};

static VALUE: u16 = 404;

fn capture(prefix: &'static str) -> Arc<Mutex<Vec<String>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    set_trace_callback(move |event: &RegistryEvent| {
        if event.key().as_str().starts_with(prefix) {
            events_clone.lock().unwrap().push(event.to_string());
        }
    });
    events
}

#[test]
#[serial]
fn test_global_resolution_events() {
    let events = capture("events::basic");
    let key = TypeKey::named("events::basic::Value");

    resolve(&key, || Ok(InstancePtr::from_ref(&VALUE))).unwrap();
    resolve(&key, || Ok(InstancePtr::from_ref(&VALUE))).unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(
        *captured,
        vec![
            "holder created { key: events::basic::Value }",
            "constructed { key: events::basic::Value }",
            "resolved { key: events::basic::Value }",
            "resolved { key: events::basic::Value }",
        ]
    );
    drop(captured);

    clear_trace_callback();
}

#[test]
#[serial]
fn test_failure_then_recovery_events() {
    let events = capture("events::retry");
    let key = TypeKey::named("events::retry::Value");

    assert!(resolve(&key, || Err("offline".into())).is_err());
    assert!(contains(&key));
    assert!(!is_resolved(&key));

    resolve(&key, || Ok(InstancePtr::from_ref(&VALUE))).unwrap();
    assert!(is_resolved(&key));

    let captured = events.lock().unwrap();
    assert_eq!(captured[0], "holder created { key: events::retry::Value }");
    assert_eq!(captured[1], "construction failed { key: events::retry::Value }");
    assert_eq!(captured[2], "constructed { key: events::retry::Value }");
    drop(captured);

    clear_trace_callback();
}

#[test]
#[serial]
fn test_clear_trace_callback_stops_events() {
    let events = capture("events::cleared");

    resolve(&TypeKey::named("events::cleared::One"), || {
        Ok(InstancePtr::from_ref(&VALUE))
    })
    .unwrap();
    clear_trace_callback();
    resolve(&TypeKey::named("events::cleared::Two"), || {
        Ok(InstancePtr::from_ref(&VALUE))
    })
    .unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(captured.len(), 3);
    assert!(captured.iter().all(|e| e.contains("events::cleared::One")));
}

/// Collects formatted `tracing` output for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn test_events_reach_tracing_subscriber() {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let registry = Registry::new();
        let key = TypeKey::named("events::logged::Value");
        let cache = AtomicPtr::new(std::ptr::null_mut());

        registry
            .resolve(&key, Some(&cache), || Ok(InstancePtr::from_ref(&VALUE)))
            .unwrap();
        registry
            .resolve(&key, Some(&cache), || Ok(InstancePtr::from_ref(&VALUE)))
            .unwrap();
        let failed = registry.resolve(&TypeKey::named("events::logged::Broken"), None, || {
            Err("no backend".into())
        });
        assert!(failed.is_err());
    });

    let logs = buffer.contents();
    let line_with = |needle: &str| {
        logs.lines()
            .find(|line| line.contains(needle))
            .unwrap_or_else(|| panic!("missing `{needle}` in logs:\n{logs}"))
            .to_string()
    };

    let created = line_with("created singleton holder");
    assert!(created.contains("DEBUG") && created.contains("events::logged::Value"));
    assert!(line_with("constructed singleton").contains("DEBUG"));
    assert!(line_with("singleton cache hit").contains("TRACE"));
    let failure = line_with("singleton factory failed");
    assert!(failure.contains("WARN") && failure.contains("no backend"));
}
