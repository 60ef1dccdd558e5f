//! Record sources and sinks.
//!
//! The engine never touches the filesystem. Records come in through a
//! [`RecordSource`] and leave through a [`RecordSink`]:
//!
//! - [`filesystem`] - one JSON record per file, read from and written to directories
//! - [`memory`] - in-process queues for tests and embedding
//!
//! # Example
//!
//! ```rust,no_run
//! use deident::adapters::filesystem::{JsonDirectorySink, JsonDirectorySource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = JsonDirectorySource::scan("./incoming").await?;
//! let sink = JsonDirectorySink::new("./deidentified", false);
//! # Ok(())
//! # }
//! ```

pub mod filesystem;
pub mod memory;
pub mod traits;

pub use filesystem::{JsonDirectorySink, JsonDirectorySource};
pub use memory::{MemorySink, MemorySource};
pub use traits::{Incoming, RecordSink, RecordSource};
