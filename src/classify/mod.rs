//! Field classification
//!
//! Maps each field summary to a storage decision (SQL, MONGO or BOTH) with a
//! normalized penalty score, and collects the results into the
//! [`ClassificationManifest`] handed to the router.

pub mod classifier;
pub mod manifest;
pub mod rules;
pub mod types;

pub use classifier::Classifier;
pub use manifest::ClassificationManifest;
pub use rules::{Rule, Verdict, RULES};
pub use types::{ClassificationResult, Decision, Flag};
