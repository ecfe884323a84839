//! vizij-pose-core: host-agnostic pose transfer.
//!
//! Records attribute values from a scene into a [`TransferDocument`], maps the
//! recorded names onto live objects ([`match_names`]), mirrors left/right
//! counterparts ([`MirrorTable`]) and blends the values back in through
//! [`PoseEngine`]. All scene access goes through the [`SceneAdapter`] trait;
//! [`MemoryScene`] is an in-memory implementation for tests and tooling.

pub mod attribute;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod mirror;
pub mod node;
pub mod scene;

pub use attribute::{AttributeHandle, PasteOption, SetOptions};
pub use config::{AmbiguityPolicy, Config};
pub use document::{AttrRecord, DocumentError, ObjectRecord, TransferDocument, FORMAT_VERSION};
pub use engine::{EngineState, LoadOptions, LoadReport, PoseEngine, ResolvedAttribute};
pub use error::{PoseError, PoseResult};
pub use matcher::{match_names, validate_namespaces, MatchNames, MatchPair, MatchRequest};
pub use mirror::{
    MirrorOption, MirrorPlane, MirrorReport, MirrorRequest, MirrorTable, MirrorTableError,
};
pub use node::NodeReferenceExt;
pub use scene::{
    LoadScope, MemoryScene, SceneAdapter, SceneError, SceneResult, TangentType, TimeRange,
};

pub use vizij_api_core::{NodeReference, Value};
