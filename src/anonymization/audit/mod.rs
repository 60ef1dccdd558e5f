//! Diagnostic trail
//!
//! Writes the per-record diagnostic stream to a local file.

pub mod logger;

pub use logger::DiagnosticLogger;
