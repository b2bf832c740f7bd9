//! Domain classification trait

use std::fmt::Debug;

use crate::domain::document::DocumentDomain;

/// Trait for domain classifiers.
///
/// Classification is a pure, deterministic function of the text: same input,
/// same label, no side effects. Empty or blank input yields
/// [`DocumentDomain::Unknown`] rather than an error, so implementations are
/// infallible.
///
/// The orchestrator only depends on this trait, so the shipped keyword
/// classifier can later be swapped for a model-backed one without touching
/// the ingestion contract.
pub trait DomainClassifier: Send + Sync + Debug {
    /// Assign a domain label to the given text
    fn classify(&self, text: &str) -> DocumentDomain;

    /// Get the classifier name
    fn name(&self) -> &'static str;
}
