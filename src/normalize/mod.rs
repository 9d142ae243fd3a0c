//! Key normalization
//!
//! Converts inconsistent raw field names (camelCase, PascalCase, spaced,
//! dashed) into one deduplicated canonical vocabulary, and provides the
//! separate flattening step that turns nested objects into dotted paths.

pub mod flatten;
pub mod normalizer;
pub mod registry;

pub use flatten::flatten_record;
pub use normalizer::{clean_key, similarity, KeyNormalizer};
pub use registry::KeyRegistry;
