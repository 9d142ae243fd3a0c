//! Field profiling
//!
//! Folds a batch of normalized, flattened records into per-field statistics
//! (frequency, type distribution, cardinality, structure, string patterns)
//! and finalizes them into a [`ProfileSummary`].

pub mod patterns;
pub mod profiler;
pub mod stats;
pub mod types;

pub use patterns::detect_pattern;
pub use profiler::{profile_records, Profiler};
pub use stats::{FieldStats, OrderedCounter};
pub use types::{FieldSummary, Pattern, ProfileSummary, ValueType};
