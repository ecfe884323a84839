//! Engine-wide configuration for vizij-pose-core.

use serde::{Deserialize, Serialize};

/// What to do when a short name resolves to more than one live object.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmbiguityPolicy {
    /// Keep the long name the caller started from.
    #[default]
    FallBackToLongName,
    /// Report [`crate::PoseError::MoreThanOneObjectFound`].
    Raise,
}

/// Host conventions the engine relies on. Defaults match a typical DCC rig.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Driver node types (prefix match) that still allow an attribute to be
    /// set, e.g. animation curves and blend nodes.
    pub valid_connection_types: Vec<String>,

    /// Attribute types that take part in linear blending.
    pub blendable_types: Vec<String>,

    pub ambiguity_policy: AmbiguityPolicy,

    /// Extensions tried, in order, when a document path does not exist.
    pub probe_extensions: Vec<String>,

    /// Written to `metadata.version` on save.
    pub format_version: String,
}

impl Default for Config {
    fn default() -> Self {
        let strings =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            valid_connection_types: strings(&["animCurve", "animBlend", "pairBlend", "character"]),
            blendable_types: strings(&[
                "int",
                "long",
                "float",
                "short",
                "double",
                "doubleAngle",
                "doubleLinear",
            ]),
            ambiguity_policy: AmbiguityPolicy::default(),
            probe_extensions: strings(&["json", "dict", "list"]),
            format_version: crate::document::FORMAT_VERSION.to_string(),
        }
    }
}
