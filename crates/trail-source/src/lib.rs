//! Audit sources: an OData HTTP client and an in-memory store.

mod memory;
mod odata;

pub use memory::InMemoryAuditSource;
pub use odata::ODataAuditSource;
pub use trail_types::{AuditEntry, AuditSource, AuditSourceError};
