//! Record routing
//!
//! Replays a live record stream through a frozen classification manifest,
//! splitting every record into SQL and MONGO documents plus an audit trail.

pub mod router;
pub mod writer;

pub use router::{AuditEntry, RouteStats, RoutedBatch, RoutedRecord, Router};
pub use writer::RouteOutputs;
