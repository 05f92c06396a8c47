//! Shared test utilities for client-transport.
//!
//! This crate provides:
//! - Proptest generators for configuration and request data
//! - Recording implementations of the logger and metrics contracts
//! - Test fixtures with sample payloads and configurations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::{LogRecord, RecordedCall, RecordingLogger, RecordingMetrics};
