//! Event and field-map types
//!
//! Serializing an [`Event`] produces exactly the wire object the batch
//! endpoint expects: `{"data": {...}, "samplerate": N, "time": "..."}`
//! with `samplerate` omitted at the default rate of 1 and `time` omitted
//! when no timestamp was set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::Error;

/// Ordered map of event fields.
///
/// Keys serialize in lexicographic order (a property of the underlying
/// `BTreeMap`). Two skip rules keep a single bad field from failing an
/// entire batch:
///
/// - values that cannot be converted to JSON are dropped at insert time,
/// - `null` values are dropped at serialization time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    /// Create an empty field map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single named field.
    ///
    /// Values that fail JSON conversion are skipped silently rather than
    /// poisoning the event.
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.0.insert(key, value);
            }
            Err(err) => {
                tracing::debug!(field = %key, error = %err, "skipping unserializable field");
            }
        }
    }

    /// Add every key/value of a JSON-object-shaped input.
    ///
    /// Accepts anything serde serializes to an object: maps, structs with
    /// named fields, `serde_json::Value::Object`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldSource`] if the input serializes to a
    /// non-object (number, string, array, ...) or not at all.
    pub fn add(&mut self, data: impl Serialize) -> Result<(), Error> {
        match serde_json::to_value(data) {
            Ok(Value::Object(map)) => {
                for (key, value) in map {
                    self.0.insert(key, value);
                }
                Ok(())
            }
            Ok(other) => Err(Error::FieldSource(json_type_name(&other).into())),
            Err(err) => Err(Error::FieldSource(format!("unserializable value: {err}"))),
        }
    }

    /// Look up a field by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// True if no fields have been added
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate fields in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.0 {
            // Null field values never reach the wire.
            if value.is_null() {
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The (api host, write key, dataset) triple that partitions batches.
///
/// Two events ride in the same batch iff their destination keys are
/// byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationKey {
    /// Ingest API base URL
    pub api_host: String,
    /// Authentication token
    pub write_key: String,
    /// Target dataset
    pub dataset: String,
}

/// One ingest record: fields plus destination, timestamp, and sample rate.
///
/// Events are normally created through
/// [`Client::new_event`](crate::Client::new_event) or a
/// [`Builder`](crate::Builder), which pre-populate the destination from
/// the client configuration; every destination field can be overridden
/// per event.
#[derive(Debug, Clone, Default)]
pub struct Event {
    /// Authentication token; overrides the client default when set
    pub write_key: String,

    /// Destination dataset; overrides the client default when set
    pub dataset: String,

    /// Ingest API base URL; overrides the client default when set
    pub api_host: String,

    /// Sample rate for this event; 1 means no sampling
    pub sample_rate: u32,

    /// Event time. Stamped at creation by builders; if still absent at
    /// submission it is set to the current wall time.
    pub timestamp: Option<DateTime<Utc>>,

    /// Opaque caller data returned verbatim on the response for this
    /// event. Never transmitted.
    pub metadata: Option<Value>,

    fields: Fields,
}

impl Event {
    /// Create an empty event with no destination and rate 1
    pub fn new() -> Self {
        Self {
            sample_rate: 1,
            ..Self::default()
        }
    }

    pub(crate) fn with_fields(fields: Fields) -> Self {
        Self {
            sample_rate: 1,
            fields,
            ..Self::default()
        }
    }

    /// Add a single named field; see [`Fields::add_field`]
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        self.fields.add_field(key, value);
    }

    /// Add every key/value of an object-shaped input; see [`Fields::add`]
    pub fn add(&mut self, data: impl Serialize) -> Result<(), Error> {
        self.fields.add(data)
    }

    /// The fields accumulated so far
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// The destination triple this event batches under
    pub fn destination(&self) -> DestinationKey {
        DestinationKey {
            api_host: self.api_host.clone(),
            write_key: self.write_key.clone(),
            dataset: self.dataset.clone(),
        }
    }

    /// Check the event is sendable: destination complete, fields present.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.api_host.is_empty() {
            return Err(Error::MissingApiHost);
        }
        if self.write_key.is_empty() {
            return Err(Error::MissingWriteKey);
        }
        if self.dataset.is_empty() {
            return Err(Error::MissingDataset);
        }
        if self.fields.is_empty() {
            return Err(Error::EmptyFields);
        }
        Ok(())
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("data", &self.fields)?;
        if self.sample_rate > 1 {
            map.serialize_entry("samplerate", &self.sample_rate)?;
        }
        if let Some(timestamp) = &self.timestamp {
            map.serialize_entry("time", timestamp)?;
        }
        map.end()
    }
}
