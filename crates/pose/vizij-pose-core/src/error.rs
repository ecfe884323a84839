//! Error taxonomy for pose loading.
//!
//! Individual object mismatches are never errors; they are logged and the
//! object is skipped. Only conditions that make a whole call meaningless
//! surface here.

use thiserror::Error;

use crate::document::DocumentError;
use crate::mirror::MirrorTableError;
use crate::scene::SceneError;

#[derive(Debug, Error)]
pub enum PoseError {
    #[error("no object found for '{0}'")]
    NoObjectFound(String),

    #[error("more than one object matches '{name}': {candidates:?}")]
    MoreThanOneObjectFound {
        name: String,
        candidates: Vec<String>,
    },

    #[error("no matching objects or attributes found")]
    NoMatchFound,

    #[error("namespace '{0}' does not exist in the scene")]
    NamespaceNotFound(String),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    MirrorTable(#[from] MirrorTableError),
}

pub type PoseResult<T> = Result<T, PoseError>;
