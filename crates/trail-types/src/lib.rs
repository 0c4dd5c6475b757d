//! Core types and traits for field history resolution.
//!
//! Audit entries come from an [`AuditSource`]; everything downstream (decoding, label
//! resolution, assembly) works on the types defined here.

mod audit;
mod dto;
mod metadata;
mod traits;

pub use audit::*;
pub use dto::*;
pub use metadata::*;
pub use traits::*;

/// Maximum number of history records produced per resolution.
pub const MAX_HISTORY_RECORDS: usize = 5;

/// Number of raw audit entries requested per fetch.
pub const AUDIT_QUERY_TOP: usize = 30;

/// Display text for a value that was empty or null.
pub const EMPTY_DISPLAY: &str = "(empty)";

/// Display text for the old side of a synthesized creation delta.
pub const INITIAL_DISPLAY: &str = "(initial)";
