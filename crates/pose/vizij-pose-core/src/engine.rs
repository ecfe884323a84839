//! PoseEngine: resolve a recorded pose onto live objects once, then apply it
//! as often as needed.
//!
//! States: Idle → Resolving → Cached → Applying → (Idle | Failed).
//!
//! Resolution (matching + attribute pairing) is cached under a key built from
//! everything that can change its outcome. While the key is unchanged a load
//! only re-blends the cached values, which keeps slider scrubbing cheap.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use vizij_api_core::{NodeReference, Value};

use crate::attribute::{AttributeHandle, SetOptions};
use crate::config::Config;
use crate::document::TransferDocument;
use crate::error::{PoseError, PoseResult};
use crate::matcher::{match_names, validate_namespaces, MatchPair, MatchRequest};
use crate::mirror::{format_value, MirrorTable};
use crate::node::NodeReferenceExt;
use crate::scene::{LoadScope, SceneAdapter};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Resolving,
    Cached,
    Applying,
    Failed,
}

/// Options for [`PoseEngine::load`]. Empty vectors mean "not given".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadOptions {
    pub objects: Vec<String>,
    pub namespaces: Vec<String>,
    /// Only these attributes; empty loads all recorded ones.
    pub attrs: Vec<String>,
    /// Percentage in `[0, 100]`.
    pub blend: f64,
    pub key: bool,
    pub mirror: bool,
    pub additive: bool,
    /// Reuse the previous resolution when the request is unchanged.
    pub cache: bool,
    pub only_connected: bool,
    pub ignore_connected: bool,
    pub clear_selection: bool,
    pub search_replace: Option<(String, String)>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            namespaces: Vec::new(),
            attrs: Vec::new(),
            blend: 100.0,
            key: false,
            mirror: false,
            additive: false,
            cache: true,
            only_connected: false,
            ignore_connected: false,
            clear_selection: false,
            search_replace: None,
        }
    }
}

/// One recorded attribute paired with its live destination.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedAttribute {
    /// Destination path with the recorded value cached.
    pub source: AttributeHandle,
    pub destination: AttributeHandle,
    /// Recorded value of the mirrored counterpart, already flipped.
    pub mirror_value: Option<Value>,
    /// Blendable destinations follow `blend`; the rest are written whole.
    pub blendable: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub applied: usize,
    /// Writes that failed during this load; their slots are dropped.
    pub failed: usize,
    /// Slots dropped by an earlier load.
    pub skipped: usize,
}

#[derive(Debug)]
pub struct PoseEngine {
    cfg: Config,
    pose: TransferDocument,
    mirror_table: Option<MirrorTable>,
    cache: Vec<Option<ResolvedAttribute>>,
    cache_key: Option<u64>,
    state: EngineState,
    resolve_count: usize,
}

impl PoseEngine {
    pub fn new(pose: TransferDocument) -> Self {
        Self::with_config(Config::default(), pose)
    }

    pub fn with_config(cfg: Config, pose: TransferDocument) -> Self {
        Self {
            cfg,
            pose,
            mirror_table: None,
            cache: Vec::new(),
            cache_key: None,
            state: EngineState::Idle,
            resolve_count: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn pose(&self) -> &TransferDocument {
        &self.pose
    }

    /// Edits bump the document revision, which invalidates the cache.
    pub fn pose_mut(&mut self) -> &mut TransferDocument {
        &mut self.pose
    }

    pub fn set_pose(&mut self, pose: TransferDocument) {
        self.pose = pose;
        self.clear_cache();
    }

    pub fn mirror_table(&self) -> Option<&MirrorTable> {
        self.mirror_table.as_ref()
    }

    pub fn set_mirror_table(&mut self, table: Option<MirrorTable>) {
        self.mirror_table = table;
        self.clear_cache();
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.cache_key = None;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// How many times resolution actually ran.
    pub fn resolve_count(&self) -> usize {
        self.resolve_count
    }

    /// Live cached pairs; slots dropped after a failed write are skipped.
    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedAttribute> {
        self.cache.iter().flatten()
    }

    /// Select the live objects the pose maps onto.
    pub fn select(
        &self,
        scene: &mut dyn SceneAdapter,
        objects: &[String],
        namespaces: &[String],
    ) -> PoseResult<Vec<String>> {
        validate_namespaces(scene, namespaces)?;
        let request = MatchRequest {
            dst_objects: objects.to_vec(),
            dst_namespaces: namespaces.to_vec(),
            search_replace: None,
        };
        let names: Vec<String> = {
            let view: &dyn SceneAdapter = &*scene;
            match_names(&self.pose.object_names(), &request)
                .map(|pair| pair.destination)
                .filter(|dst| dst.exists(view))
                .map(|dst| dst.name().to_string())
                .collect()
        };
        if names.is_empty() {
            return Err(PoseError::NoMatchFound);
        }
        scene.select(&names)?;
        Ok(names)
    }

    /// Resolve (when the request changed) and apply the pose.
    pub fn load(
        &mut self,
        scene: &mut dyn SceneAdapter,
        opts: &LoadOptions,
    ) -> PoseResult<LoadReport> {
        if opts.mirror && self.mirror_table.is_none() {
            log::warn!("mirror requested without a mirror table; loading unmirrored");
        }

        let key = self.cache_key(scene, opts);
        if !opts.cache || self.cache_key != Some(key) {
            self.state = EngineState::Resolving;
            if let Err(err) = self.resolve(scene, opts) {
                self.clear_cache();
                self.state = EngineState::Failed;
                return Err(err);
            }
            self.cache_key = Some(key);
            self.state = EngineState::Cached;
        }

        self.state = EngineState::Applying;
        let report = self.apply(scene, opts);
        self.state = EngineState::Idle;
        Ok(report)
    }

    fn cache_key(&self, scene: &dyn SceneAdapter, opts: &LoadOptions) -> u64 {
        let mut hasher = DefaultHasher::new();
        opts.objects.hash(&mut hasher);
        opts.namespaces.hash(&mut hasher);
        opts.attrs.hash(&mut hasher);
        opts.ignore_connected.hash(&mut hasher);
        opts.only_connected.hash(&mut hasher);
        opts.search_replace.hash(&mut hasher);
        scene.current_time().to_bits().hash(&mut hasher);
        self.pose.revision().hash(&mut hasher);
        self.mirror_table
            .as_ref()
            .map(MirrorTable::revision)
            .hash(&mut hasher);
        hasher.finish()
    }

    fn resolve(&mut self, scene: &dyn SceneAdapter, opts: &LoadOptions) -> PoseResult<()> {
        self.resolve_count += 1;
        self.cache.clear();
        validate_namespaces(scene, &opts.namespaces)?;

        let request = MatchRequest {
            dst_objects: opts.objects.clone(),
            dst_namespaces: opts.namespaces.clone(),
            search_replace: opts.search_replace.clone(),
        };
        let using_namespaces = opts.objects.is_empty() && !opts.namespaces.is_empty();

        let mut cache = Vec::new();
        for pair in match_names(&self.pose.object_names(), &request) {
            self.cache_pair(scene, pair, opts, using_namespaces, &mut cache)?;
        }
        if cache.is_empty() {
            return Err(PoseError::NoMatchFound);
        }
        log::debug!("resolved {} attributes", cache.len());
        self.cache = cache;
        Ok(())
    }

    fn cache_pair(
        &self,
        scene: &dyn SceneAdapter,
        pair: MatchPair,
        opts: &LoadOptions,
        using_namespaces: bool,
        cache: &mut Vec<Option<ResolvedAttribute>>,
    ) -> PoseResult<()> {
        let MatchPair {
            source,
            mut destination,
        } = pair;
        destination.strip_first_pipe();
        let src_name = source.name();

        let (mirror_object, mirror_axis) = match &self.mirror_table {
            Some(table) => {
                let counterpart = table.mirror_object(src_name).unwrap_or_else(|| {
                    log::debug!("no mirror counterpart for '{src_name}'");
                    src_name.to_string()
                });
                if self.pose.object(&counterpart).is_none() {
                    log::debug!("mirror counterpart '{counterpart}' is not in the pose");
                }
                let axis = table
                    .mirror_axis(&counterpart)
                    .or_else(|| table.mirror_axis(src_name))
                    .or_else(|| self.pose.mirror_axis(&counterpart))
                    .or_else(|| self.pose.mirror_axis(src_name))
                    .map(<[i32]>::to_vec);
                (Some(counterpart), axis)
            }
            None => (None, None),
        };

        if using_namespaces {
            destination = match destination.to_short_name(scene, self.cfg.ambiguity_policy) {
                Ok(resolved) => resolved,
                Err(PoseError::NoObjectFound(name)) => {
                    log::debug!("no live object for '{name}'");
                    return Ok(());
                }
                Err(PoseError::MoreThanOneObjectFound { name, candidates }) => {
                    log::warn!(
                        "skipping '{source}': '{name}' matches {} objects",
                        candidates.len()
                    );
                    return Ok(());
                }
                Err(err) => return Err(err),
            };
        }
        if !destination.exists(scene) {
            log::debug!("destination '{destination}' does not exist");
            return Ok(());
        }

        let dst_name = destination.name();
        let Some(record) = self.pose.object(src_name) else {
            return Ok(());
        };
        for (attr, recorded) in &record.attrs {
            if !opts.attrs.is_empty() && !opts.attrs.contains(attr) {
                continue;
            }
            let mut dst_attr = AttributeHandle::new(dst_name, attr.as_str());
            if !dst_attr.exists(scene) {
                log::debug!("'{}' does not exist", dst_attr.full_name());
                continue;
            }
            let connected = dst_attr.is_connected(scene, &[]);
            if (opts.ignore_connected && connected) || (opts.only_connected && !connected) {
                continue;
            }

            let mirror_value = mirror_object.as_deref().and_then(|counterpart| {
                let value = self.pose.attr_value(counterpart, attr);
                if value.is_none() {
                    log::debug!("no mirror value for '{counterpart}.{attr}'");
                }
                let value = value?;
                Some(match &mirror_axis {
                    Some(axis) => format_value(attr, value, axis),
                    None => value.clone(),
                })
            });

            let blendable = dst_attr.is_blendable(scene, &self.cfg.blendable_types);
            cache.push(Some(ResolvedAttribute {
                source: AttributeHandle::with_value(
                    dst_name,
                    attr.as_str(),
                    recorded.type_name.as_str(),
                    recorded.value.clone(),
                ),
                destination: dst_attr,
                mirror_value,
                blendable,
            }));
        }
        Ok(())
    }

    fn apply(&mut self, scene: &mut dyn SceneAdapter, opts: &LoadOptions) -> LoadReport {
        let mirror = opts.mirror && self.mirror_table.is_some();
        let set_opts = SetOptions {
            blend: opts.blend,
            key: opts.key,
            clamp: true,
            additive: opts.additive,
        };
        let whole = SetOptions {
            blend: 100.0,
            additive: false,
            ..set_opts.clone()
        };

        let mut scope = LoadScope::acquire(scene, opts.clear_selection);
        let mut report = LoadReport::default();
        for slot in self.cache.iter_mut() {
            let Some(resolved) = slot else {
                report.skipped += 1;
                continue;
            };
            let value = match (&resolved.mirror_value, mirror) {
                (Some(value), true) => value.clone(),
                _ => match resolved.source.cached_value() {
                    Some(value) => value.clone(),
                    None => continue,
                },
            };
            let slot_opts = if resolved.blendable || opts.blend == 0.0 {
                &set_opts
            } else {
                &whole
            };
            let outcome = resolved.destination.set(&mut *scope, &value, slot_opts);
            if let Err(err) = outcome {
                log::debug!("cannot set '{}': {err}", resolved.destination.full_name());
                *slot = None;
                report.failed += 1;
            } else {
                report.applied += 1;
            }
        }
        report
    }
}

impl ResolvedAttribute {
    /// The live object this attribute writes to.
    pub fn object(&self) -> NodeReference {
        NodeReference::new(self.destination.object())
    }
}
