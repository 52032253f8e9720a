//! Event builder - reusable templates for new events
//!
//! A builder carries destination settings plus static and dynamic
//! fields; every event it creates starts pre-populated with all of them.
//! Cloning a builder creates an independent scope: fields added to the
//! clone do not appear on events made from the original.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::Error;
use crate::event::types::{Event, Fields};

/// A field whose value is computed fresh for every new event
#[derive(Clone)]
struct DynamicField {
    name: String,
    supply: Arc<dyn Fn() -> Value + Send + Sync>,
}

/// Template for creating events
///
/// # Example
///
/// ```
/// use libhoney::Builder;
///
/// let mut builder = Builder::new()
///     .with_dataset("my-dataset")
///     .with_sample_rate(2);
/// builder.add_field("service", "checkout");
/// builder.add_dynamic_field("open_conns", || 42.into());
///
/// let event = builder.new_event();
/// assert_eq!(event.sample_rate, 2);
/// assert!(event.fields().get("service").is_some());
/// assert!(event.fields().get("open_conns").is_some());
/// ```
#[derive(Clone, Default)]
pub struct Builder {
    /// Authentication token applied to new events
    pub write_key: String,

    /// Destination dataset applied to new events
    pub dataset: String,

    /// Ingest API base URL applied to new events
    pub api_host: String,

    /// Sample rate applied to new events
    pub sample_rate: u32,

    fields: Fields,
    dynamic: Vec<DynamicField>,
}

impl Builder {
    /// Create an empty builder with sample rate 1
    #[must_use]
    pub fn new() -> Self {
        Self {
            sample_rate: 1,
            ..Self::default()
        }
    }

    /// Create a builder inheriting destination settings from a config
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            write_key: config.write_key.clone(),
            dataset: config.dataset.clone(),
            api_host: config.api_host.clone(),
            sample_rate: config.sample_rate,
            fields: Fields::new(),
            dynamic: Vec::new(),
        }
    }

    /// Set the write key applied to new events
    #[must_use]
    pub fn with_write_key(mut self, write_key: impl Into<String>) -> Self {
        self.write_key = write_key.into();
        self
    }

    /// Set the dataset applied to new events
    #[must_use]
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Set the API host applied to new events
    #[must_use]
    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    /// Set the sample rate applied to new events
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Add a static field inherited by every event this builder creates
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        self.fields.add_field(key, value);
    }

    /// Add every key/value of an object-shaped input as static fields
    pub fn add(&mut self, data: impl Serialize) -> Result<(), Error> {
        self.fields.add(data)
    }

    /// Add a dynamic field: the closure runs once per created event and
    /// its result is added under `name`
    pub fn add_dynamic_field(
        &mut self,
        name: impl Into<String>,
        supply: impl Fn() -> Value + Send + Sync + 'static,
    ) {
        self.dynamic.push(DynamicField {
            name: name.into(),
            supply: Arc::new(supply),
        });
    }

    /// The static fields accumulated so far
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Create a new event pre-populated with this builder's destination,
    /// static fields, and freshly-computed dynamic fields. The event is
    /// stamped with the current wall time.
    pub fn new_event(&self) -> Event {
        let mut event = Event::with_fields(self.fields.clone());
        event.write_key = self.write_key.clone();
        event.dataset = self.dataset.clone();
        event.api_host = self.api_host.clone();
        event.sample_rate = self.sample_rate;
        event.timestamp = Some(Utc::now());

        for dynamic in &self.dynamic {
            event.add_field(dynamic.name.clone(), (dynamic.supply)());
        }

        event
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("dataset", &self.dataset)
            .field("api_host", &self.api_host)
            .field("sample_rate", &self.sample_rate)
            .field("static_fields", &self.fields.len())
            .field("dynamic_fields", &self.dynamic.len())
            .finish()
    }
}
