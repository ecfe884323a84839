//! Scene-aware operations on [`NodeReference`].

use vizij_api_core::NodeReference;

use crate::config::AmbiguityPolicy;
use crate::error::{PoseError, PoseResult};
use crate::scene::SceneAdapter;

pub trait NodeReferenceExt {
    /// Resolve the short name to the live object it names.
    ///
    /// Zero matches is [`PoseError::NoObjectFound`]. More than one match is
    /// handled by `policy`: either keep the reference as given, or raise
    /// [`PoseError::MoreThanOneObjectFound`].
    fn to_short_name(
        &self,
        scene: &dyn SceneAdapter,
        policy: AmbiguityPolicy,
    ) -> PoseResult<NodeReference>;

    fn exists(&self, scene: &dyn SceneAdapter) -> bool;
}

impl NodeReferenceExt for NodeReference {
    fn to_short_name(
        &self,
        scene: &dyn SceneAdapter,
        policy: AmbiguityPolicy,
    ) -> PoseResult<NodeReference> {
        let mut found = scene.ls(self.short_name());
        match (found.len(), policy) {
            (0, _) => Err(PoseError::NoObjectFound(self.short_name().to_string())),
            (1, _) => Ok(NodeReference::new(found.remove(0))),
            (_, AmbiguityPolicy::FallBackToLongName) => {
                log::debug!(
                    "short name '{}' is not unique, keeping '{}'",
                    self.short_name(),
                    self.name()
                );
                Ok(self.clone())
            }
            (_, AmbiguityPolicy::Raise) => Err(PoseError::MoreThanOneObjectFound {
                name: self.short_name().to_string(),
                candidates: found,
            }),
        }
    }

    fn exists(&self, scene: &dyn SceneAdapter) -> bool {
        scene.object_exists(self.name())
    }
}
