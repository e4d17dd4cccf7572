//! Report analysis.
//!
//! Turns extracted document content into a [`Finding`] plus the summary and
//! energy figures shown alongside it.

pub mod detector;
pub mod document;
pub mod summary;
pub mod synthetic;

pub use detector::{Finding, Severity, detect};
pub use document::{DocumentMetadata, FileType};
pub use summary::{estimate_energy, generate_summary};
pub use synthetic::{ScenarioKind, SyntheticReport};
