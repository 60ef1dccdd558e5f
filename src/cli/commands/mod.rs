//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod import_csv;
pub mod init;
pub mod run;
pub mod validate;
