use thiserror::Error;

use crate::construct::Entity;
use crate::lattice::ConceptId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConceptualError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Input error: {0}")]
    Input(String),
    #[error("Unresolved entity: {entity}")]
    Unresolved { entity: Entity },
    #[error("Ambiguous reference from entity {entity}: {candidates} candidates")]
    Ambiguous { entity: Entity, candidates: usize },
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("Unknown concept: {0}")]
    UnknownConcept(ConceptId),
}

pub type Result<T> = std::result::Result<T, ConceptualError>;

impl ConceptualError {
    /// Oracle failures that a pass should skip over rather than abort on.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Unresolved { .. } | Self::Ambiguous { .. })
    }
}

// Helper conversions
impl From<config::ConfigError> for ConceptualError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for ConceptualError {
    fn from(e: serde_json::Error) -> Self { Self::Input(e.to_string()) }
}
impl From<std::io::Error> for ConceptualError {
    fn from(e: std::io::Error) -> Self { Self::Input(e.to_string()) }
}
