//! Relational JSON:API is an adapter which renders and parses API payloads conforming to the
//! [JSON:API](https://jsonapi.org/format/) document format on top of a generic relational data
//! source. It consists of a few cooperating layers:
//!
//! * A declarative description of the application's [resources](resource). Every resource has a
//!   wire type name, an ordered list of fields, and [relations](relation) to other resources. The
//!   descriptions are collected into a [`Registry`](resource::Registry) once at startup and are
//!   immutable afterwards.
//! * A [query](query) layer, which validates the `include`, `fields[...]`, `sort`, `filter[...]`
//!   and `page[...]` query parameters of an inbound request and translates them into an abstract
//!   request against the data layer.
//! * A [prefetch planner](prefetch), which decides which relations can be loaded by joining and
//!   which need separate queries, and issues the corresponding instructions to a
//!   [`DataSource`](storage::DataSource).
//! * A [renderer](render), which walks the records produced by the data layer and builds a
//!   compound document with de-duplicated `included` resources, and its inverse, the
//!   [parser](parse).
//! * [Views](view), which wire all of the above into request handlers, converting every failure
//!   into a JSON:API `errors` document.
//!
//! The data layer itself is abstract. This crate comes with an in-memory
//! [mock](storage::mock) data source, which is useful for lightweight testing.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod context;
pub mod document;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod inflection;
pub mod links;
pub mod pagination;
pub mod parse;
pub mod prefetch;
pub mod prelude;
pub mod query;
pub mod relation;
pub mod render;
pub mod request;
pub mod resource;
pub mod schema;
pub mod storage;
pub mod view;

pub use error::{Error, Result};

// Re-export `serde_json` for use by derived code and as an escape hatch.
pub extern crate serde_json;

// Derived code refers to this crate by name, including from within this crate.
extern crate self as relational_jsonapi;

/// The media type of JSON:API documents.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Initialize tracing.
pub fn init_logging() {
    static ONCE: Once = Once::new();

    ONCE.call_once(|| {
        // Another report handler may already be installed by the embedding application.
        color_eyre::install().ok();
        tracing_subscriber::fmt()
            .with_ansi(true)
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    });
}
