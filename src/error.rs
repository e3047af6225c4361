use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BalanceError>;

// Structural failures; numeric degeneracies are clamped where they happen and never show up here
#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("layer stack must have exactly {expected} layers, found {found}")]
    LayerCount { expected: usize, found: usize },

    #[error("layer {index} has invalid thickness {thickness} cm")]
    LayerThickness { index: usize, thickness: f64 },

    #[error("layer {index} starts at {depth} cm, not below the previous layer top at {previous} cm")]
    LayerOrder {
        index: usize,
        depth: f64,
        previous: f64,
    },

    #[error("unknown hydrologic soil group '{0}'")]
    UnknownSoilGroup(String),

    #[error("soil {key}: {reason}")]
    InvalidSoil { key: String, reason: String },

    #[error("soil {key} has no frain-derived parameters")]
    MissingFrain { key: String },

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
