//! Name correspondence between recorded objects and live destinations.
//!
//! [`match_names`] pairs every source object with at most one destination,
//! using namespaces and short names only. The result is a lazy, single-pass
//! iterator: explicit destination objects are consumed as they are matched,
//! so the same destination is never handed out twice.
//!
//! Order of work:
//! 1. sources grouped by namespace (first-seen order)
//! 2. target namespaces: given ones, else derived from destination objects,
//!    else the source namespaces themselves (pure rename)
//! 3. shared namespaces (present on both sides) are matched in place, in
//!    source order; search/replace applies here and in step 4
//! 4. every other target namespace takes the next source group in a rotation
//!    (unused source namespaces first), so extra targets spread across source
//!    groups instead of all landing on the first one
//!
//! Misses are logged, never raised.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use vizij_api_core::NodeReference;

use crate::error::{PoseError, PoseResult};
use crate::scene::SceneAdapter;

/// Where recorded objects should land. Empty vectors mean "not given".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchRequest {
    pub dst_objects: Vec<String>,
    pub dst_namespaces: Vec<String>,
    /// Plain substring rewrite applied to every source path before lookup.
    pub search_replace: Option<(String, String)>,
}

impl MatchRequest {
    pub fn objects<S: AsRef<str>>(objects: &[S]) -> Self {
        Self {
            dst_objects: objects.iter().map(|s| s.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn namespaces<S: AsRef<str>>(namespaces: &[S]) -> Self {
        Self {
            dst_namespaces: namespaces.iter().map(|s| s.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_search_replace(mut self, search: &str, replace: &str) -> Self {
        self.search_replace = Some((search.to_string(), replace.to_string()));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub source: NodeReference,
    pub destination: NodeReference,
}

/// Destination objects keyed by short name, in the order given. Entries are
/// removed as they match.
#[derive(Debug, Default)]
struct DestinationIndex {
    by_short_name: IndexMap<String, Vec<NodeReference>>,
}

impl DestinationIndex {
    fn new(objects: &[String]) -> Self {
        let mut by_short_name: IndexMap<String, Vec<NodeReference>> = IndexMap::new();
        for name in objects {
            let node = NodeReference::new(name.as_str());
            by_short_name
                .entry(node.short_name().to_string())
                .or_default()
                .push(node);
        }
        Self { by_short_name }
    }

    /// Remove and return the first candidate whose path overlaps `node`.
    fn take(&mut self, node: &NodeReference) -> Option<NodeReference> {
        let candidates = self.by_short_name.get_mut(node.short_name())?;
        let pos = candidates.iter().position(|c| node.overlaps(c))?;
        Some(candidates.remove(pos))
    }

    fn remaining(&self) -> impl Iterator<Item = &NodeReference> {
        self.by_short_name.values().flatten()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Shared {
        group: usize,
        item: usize,
    },
    Extra {
        target: usize,
        step: usize,
        item: usize,
        matched: bool,
    },
    Finished,
}

/// Lazy iterator returned by [`match_names`].
#[derive(Debug)]
pub struct MatchNames {
    groups: IndexMap<String, Vec<NodeReference>>,
    index: Option<DestinationIndex>,
    search_replace: Option<(String, String)>,
    shared: Vec<String>,
    extra: Vec<String>,
    rotation: Vec<String>,
    cursor: usize,
    phase: Phase,
}

pub fn match_names<S: AsRef<str>>(src_objects: &[S], request: &MatchRequest) -> MatchNames {
    let groups = group_by_namespace(src_objects.iter().map(|s| s.as_ref()));

    // ":" and "" both name the root namespace.
    let targets: Vec<String> = if !request.dst_namespaces.is_empty() {
        request
            .dst_namespaces
            .iter()
            .map(|ns| ns.trim_start_matches(':').to_string())
            .collect()
    } else if !request.dst_objects.is_empty() {
        group_by_namespace(request.dst_objects.iter().map(String::as_str))
            .into_keys()
            .collect()
    } else {
        groups.keys().cloned().collect()
    };

    let shared: Vec<String> = groups
        .keys()
        .filter(|ns| targets.contains(ns))
        .cloned()
        .collect();
    let mut extra: Vec<String> = Vec::new();
    for ns in targets {
        if !groups.contains_key(&ns) && !extra.contains(&ns) {
            extra.push(ns);
        }
    }

    let rotation = groups
        .keys()
        .filter(|ns| !shared.contains(ns))
        .chain(shared.iter())
        .cloned()
        .collect();

    let index = (!request.dst_objects.is_empty())
        .then(|| DestinationIndex::new(&request.dst_objects));

    MatchNames {
        groups,
        index,
        search_replace: request.search_replace.clone(),
        shared,
        extra,
        rotation,
        cursor: 0,
        phase: Phase::Shared { group: 0, item: 0 },
    }
}

fn group_by_namespace<'a>(
    names: impl Iterator<Item = &'a str>,
) -> IndexMap<String, Vec<NodeReference>> {
    let mut groups: IndexMap<String, Vec<NodeReference>> = IndexMap::new();
    for name in names {
        let node = NodeReference::new(name);
        groups
            .entry(node.namespace().to_string())
            .or_default()
            .push(node);
    }
    groups
}

impl MatchNames {
    /// Destination objects not (yet) paired with a source.
    pub fn remaining_destinations(&self) -> Vec<NodeReference> {
        self.index
            .as_ref()
            .map(|idx| idx.remaining().cloned().collect())
            .unwrap_or_default()
    }

    fn source_at(&self, namespace: &str, item: usize) -> Option<NodeReference> {
        self.groups.get(namespace)?.get(item).cloned()
    }

    fn rewrite(&self, source: &NodeReference) -> NodeReference {
        match &self.search_replace {
            Some((search, replace)) => source.replaced(search, replace),
            None => source.clone(),
        }
    }

    fn resolve(&mut self, candidate: NodeReference) -> Option<NodeReference> {
        match &mut self.index {
            Some(index) => index.take(&candidate),
            None => Some(candidate),
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
        if let Some(index) = &self.index {
            for node in index.remaining() {
                log::debug!("no source object matches destination '{node}'");
            }
        }
    }
}

impl Iterator for MatchNames {
    type Item = MatchPair;

    fn next(&mut self) -> Option<MatchPair> {
        loop {
            match self.phase {
                Phase::Shared { group, item } => {
                    let Some(namespace) = self.shared.get(group).cloned() else {
                        self.phase = Phase::Extra {
                            target: 0,
                            step: 0,
                            item: 0,
                            matched: false,
                        };
                        continue;
                    };
                    let Some(source) = self.source_at(&namespace, item) else {
                        self.phase = Phase::Shared {
                            group: group + 1,
                            item: 0,
                        };
                        continue;
                    };
                    self.phase = Phase::Shared {
                        group,
                        item: item + 1,
                    };

                    let candidate = self.rewrite(&source);
                    match self.resolve(candidate) {
                        Some(destination) => {
                            return Some(MatchPair {
                                source,
                                destination,
                            })
                        }
                        None => log::debug!("no destination object matches '{source}'"),
                    }
                }

                Phase::Extra {
                    target,
                    step,
                    item,
                    matched,
                } => {
                    let Some(dst_namespace) = self.extra.get(target).cloned() else {
                        self.finish();
                        continue;
                    };
                    let n = self.rotation.len();
                    if step >= n {
                        log::debug!("no source namespace matches '{dst_namespace}'");
                        self.phase = Phase::Extra {
                            target: target + 1,
                            step: 0,
                            item: 0,
                            matched: false,
                        };
                        continue;
                    }

                    let src_namespace = self.rotation[(self.cursor + step) % n].clone();
                    let Some(source) = self.source_at(&src_namespace, item) else {
                        // Source group exhausted: move on to the next target
                        // once it produced anything, else try the next group.
                        self.phase = if matched {
                            self.cursor = (self.cursor + step + 1) % n;
                            Phase::Extra {
                                target: target + 1,
                                step: 0,
                                item: 0,
                                matched: false,
                            }
                        } else {
                            Phase::Extra {
                                target,
                                step: step + 1,
                                item: 0,
                                matched: false,
                            }
                        };
                        continue;
                    };
                    self.phase = Phase::Extra {
                        target,
                        step,
                        item: item + 1,
                        matched,
                    };

                    let candidate = self.rewrite(&source).with_namespace(&dst_namespace);
                    match self.resolve(candidate) {
                        Some(destination) => {
                            self.phase = Phase::Extra {
                                target,
                                step,
                                item: item + 1,
                                matched: true,
                            };
                            return Some(MatchPair {
                                source,
                                destination,
                            });
                        }
                        None => log::debug!(
                            "no destination object matches '{source}' in namespace '{dst_namespace}'"
                        ),
                    }
                }

                Phase::Finished => return None,
            }
        }
    }
}

/// Every namespace must exist in the scene. The root namespace (`""` or
/// `":"`) always does.
pub fn validate_namespaces(scene: &dyn SceneAdapter, namespaces: &[String]) -> PoseResult<()> {
    let existing = scene.namespaces();
    for ns in namespaces {
        let ns = ns.trim_start_matches(':');
        if ns.is_empty() {
            continue;
        }
        if !existing.iter().any(|e| e == ns) {
            return Err(PoseError::NamespaceNotFound(ns.to_string()));
        }
    }
    Ok(())
}
