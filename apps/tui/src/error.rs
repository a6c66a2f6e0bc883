use thiserror::Error;

/// Errors reported by the flow map renderer.
///
/// None of these are fatal to a [`crate::map::FlowMap`]: the failed operation
/// is skipped and the map stays usable.
#[derive(Debug, Error)]
pub enum FlowMapError {
    #[error("map not initialized, call initialize() first")]
    NotInitialized,

    #[error("country not found: {0}")]
    UnknownCountry(String),

    #[error("failed to load geography: {0}")]
    Geography(String),

    #[error("invalid value for {name}: {value}")]
    InvalidOption { name: String, value: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowMapError>;
