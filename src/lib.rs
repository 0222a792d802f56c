#![deny(missing_docs)]

//! Core library for the docsum document summarizer.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from uploaded documents.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization metrics helpers.
pub mod metrics;
/// Segmenting, length planning, and summary assembly.
pub mod processing;
/// Summarizer providers and the model registry.
pub mod summarization;
