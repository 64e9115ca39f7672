use thiserror::Error;

use crate::animator::condition::ParamType;

#[derive(Error, Debug)]
pub enum AnimError {
    #[error("animation state '{0}' not found")]
    UnknownState(String),

    #[error("animation state '{0}' already exists")]
    DuplicateState(String),

    #[error("motion not found: {0}")]
    UnknownMotion(String),

    #[error("transition handle is stale")]
    UnknownTransition,

    #[error("parameter '{0}' not found")]
    UnknownParameter(String),

    #[error("parameter '{name}' is {expected:?}, got a {actual:?} value")]
    ParameterType {
        name: String,
        expected: ParamType,
        actual: ParamType,
    },

    #[error("blend node handle is stale")]
    UnknownBlendNode,

    #[error("blend node is not a {0}")]
    BlendNodeKind(&'static str),

    #[error("motion does not hold a blend tree")]
    NotABlendTree,

    #[error("invalid animation clip '{clip}': {reason}")]
    InvalidClip { clip: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnimError>;
