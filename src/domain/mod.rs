//! Domain models and types for deident.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Record model** ([`Record`], [`Dataset`], [`Field`], [`Value`], [`FieldPath`])
//! - **Value representations** ([`Vr`], [`VrFamily`])
//! - **Strongly-typed identifiers** ([`Tag`], [`StudyKey`], [`Seed`], [`UidRoot`])
//! - **Error types** ([`DeidError`], [`RecordError`], [`FieldError`], [`DerivationError`])
//! - **Result type alias** ([`Result`])
//!
//! # Example
//!
//! ```rust
//! use deident::domain::{Dataset, Field, Record, Tag, Value, Vr};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let record = Record::new(
//!     "1.2.840.113619.2.55.3",
//!     Dataset::from_fields([
//!         Field::new(Tag::new("StationName")?, Vr::SH, Value::text("MRC12345")),
//!         Field::new(Tag::new("StudyTime")?, Vr::TM, Value::text("153045")),
//!     ]),
//! );
//! assert_eq!(record.dataset.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod record;
pub mod result;
pub mod vr;

// Re-export commonly used types for convenience
pub use errors::{DeidError, DerivationError, FieldError, RecordError};
pub use ids::{normalize_key, Seed, StudyKey, Tag, UidRoot};
pub use record::{Dataset, Field, FieldPath, PathStep, Record, Value};
pub use result::Result;
pub use vr::{Vr, VrFamily};
