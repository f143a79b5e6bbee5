//! HTTP glue for the ragpipe pipeline.
//!
//! Exposes ingest, query, and batch operations over axum routes, loads
//! runtime settings from the environment, and isolates per-item failures
//! in batch runs. All pipeline semantics live in `ragpipe-core`; this crate
//! only adapts them to the transport.

pub mod batch;
pub mod routes;
pub mod settings;

pub use routes::{AppState, router};
pub use settings::Settings;
