//! Tests for the event builder

use serde_json::Value;

use crate::config::Config;
use crate::event::Builder;

#[test]
fn test_new_event_inherits_destination() {
    let builder = Builder::new()
        .with_write_key("key")
        .with_dataset("set")
        .with_api_host("https://api.example.com/")
        .with_sample_rate(8);

    let event = builder.new_event();
    assert_eq!(event.write_key, "key");
    assert_eq!(event.dataset, "set");
    assert_eq!(event.api_host, "https://api.example.com/");
    assert_eq!(event.sample_rate, 8);
}

#[test]
fn test_new_event_is_timestamped() {
    let builder = Builder::new();
    let before = chrono::Utc::now();
    let event = builder.new_event();
    let after = chrono::Utc::now();

    let timestamp = event.timestamp.expect("new events carry a timestamp");
    assert!(timestamp >= before && timestamp <= after);
}

#[test]
fn test_new_event_inherits_static_fields() {
    let mut builder = Builder::new();
    builder.add_field("service", "checkout");
    builder.add_field("version", 3);

    let event = builder.new_event();
    assert_eq!(event.fields().get("service"), Some(&Value::from("checkout")));
    assert_eq!(event.fields().get("version"), Some(&Value::from(3)));
}

#[test]
fn test_dynamic_fields_computed_per_event() {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    let counter = Arc::new(AtomicU64::new(0));
    let mut builder = Builder::new();
    let supply_counter = Arc::clone(&counter);
    builder.add_dynamic_field("seq", move || {
        supply_counter.fetch_add(1, Ordering::Relaxed).into()
    });

    let first = builder.new_event();
    let second = builder.new_event();
    assert_eq!(first.fields().get("seq"), Some(&Value::from(0)));
    assert_eq!(second.fields().get("seq"), Some(&Value::from(1)));
}

#[test]
fn test_clone_creates_independent_scope() {
    let mut original = Builder::new().with_dataset("set");
    original.add_field("shared", true);

    let mut cloned = original.clone();
    cloned.add_field("only_on_clone", 1);

    // The clone kept inherited state...
    assert_eq!(cloned.dataset, "set");
    assert!(cloned.fields().get("shared").is_some());
    // ...but additions do not leak back.
    assert!(original.fields().get("only_on_clone").is_none());
}

#[test]
fn test_clone_shares_dynamic_generators() {
    let mut original = Builder::new();
    original.add_dynamic_field("answer", || 42.into());

    let cloned = original.clone();
    let event = cloned.new_event();
    assert_eq!(event.fields().get("answer"), Some(&Value::from(42)));
}

#[test]
fn test_from_config_copies_defaults() {
    let config = Config::default()
        .with_write_key("key")
        .with_dataset("set")
        .with_sample_rate(10);

    let builder = Builder::from_config(&config);
    assert_eq!(builder.write_key, "key");
    assert_eq!(builder.dataset, "set");
    assert_eq!(builder.sample_rate, 10);
    assert_eq!(builder.api_host, config.api_host);
}

#[test]
fn test_event_fields_override_builder_fields() {
    let mut builder = Builder::new();
    builder.add_field("status", 200);

    let mut event = builder.new_event();
    event.add_field("status", 500);
    assert_eq!(event.fields().get("status"), Some(&Value::from(500)));

    // The builder itself is untouched.
    assert_eq!(builder.fields().get("status"), Some(&Value::from(200)));
}

#[test]
fn test_add_struct_to_builder() {
    #[derive(serde::Serialize)]
    struct Common {
        region: &'static str,
        zone: u8,
    }

    let mut builder = Builder::new();
    builder.add(Common {
        region: "us-east",
        zone: 2,
    })
    .unwrap();

    let event = builder.new_event();
    assert_eq!(event.fields().get("region"), Some(&Value::from("us-east")));
    assert_eq!(event.fields().get("zone"), Some(&Value::from(2)));
}
