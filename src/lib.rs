#![deny(missing_docs)]

//! Core library for drawing topology enrichment.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Enrichment metrics helpers.
pub mod metrics;
/// Tag, neighbor, and connector extraction from analyzed drawing pages.
pub mod topology;
