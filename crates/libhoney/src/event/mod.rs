//! Event module - events, field maps, and the templating builder
//!
//! An [`Event`] is an immutable-at-submission snapshot: a map of named
//! fields plus the destination (api host, write key, dataset), a
//! timestamp, a sample rate, and opaque caller metadata. A [`Builder`]
//! is a reusable template that stamps out events pre-populated with
//! static and dynamically-computed fields.

mod builder;
mod types;

#[cfg(test)]
mod builder_test;

pub use builder::Builder;
pub use types::{DestinationKey, Event, Fields};
