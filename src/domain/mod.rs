//! Domain models and types for Shelfport.
//!
//! The domain layer provides:
//! - **Identifiers and selectors** ([`JobId`], [`EntityKind`], [`IdentifierType`])
//! - **Pipeline records** ([`IdentifierRecord`], [`ResolvedEntity`], [`ExportRow`])
//! - **Tagged item results** ([`Step`], [`SkipReason`], [`SkipRecord`])
//! - **Error types** ([`ShelfportError`], [`LookupError`], [`StorageError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, ShelfportError>`]. Per-item stages
//! return a [`Step`] so skippable failures are never confused with fatal ones:
//!
//! ```rust
//! use shelfport::domain::{ShelfportError, Step};
//!
//! let step: Step<()> = ShelfportError::NotFound("barcode 123".to_string()).into();
//! assert!(matches!(step, Step::Skip(_)));
//! ```

pub mod errors;
pub mod ids;
pub mod records;
pub mod result;
pub mod step;

// Re-export commonly used types for convenience
pub use errors::{LookupError, ShelfportError, StorageError};
pub use ids::{EntityKind, IdentifierType, JobId};
pub use records::{ExportRow, IdentifierRecord, ResolvedEntity};
pub use result::Result;
pub use step::{SkipKind, SkipReason, SkipRecord, Step};
