//! NodeReference parsing and namespace rewriting.
//!
//! Grammar (host scene-graph paths):
//!   [|]parent|ns:child|ns:leaf
//! - '|' separates hierarchy segments; a leading '|' anchors the path at the root
//! - ':' separates namespaces from the node name inside a segment
//!   Examples:
//!   "|rig|ns:arm_ctl" -> short_name="ns:arm_ctl", namespace="ns"
//!   "a:b:hand"        -> short_name="a:b:hand",   namespace="a:b"
//!   "hand"            -> short_name="hand",       namespace=""
//!
//! The derived parts are computed from the path on demand, so rewriting the
//! namespace can never leave them stale.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeReference {
    full_path: String,
}

impl NodeReference {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            full_path: path.into(),
        }
    }

    /// The full path as given (long or short form).
    pub fn name(&self) -> &str {
        &self.full_path
    }

    /// Text after the last '|', namespaces included.
    pub fn short_name(&self) -> &str {
        match self.full_path.rfind('|') {
            Some(idx) => &self.full_path[idx + 1..],
            None => &self.full_path,
        }
    }

    /// Colon-joined namespace prefix of the short name; empty when none.
    pub fn namespace(&self) -> &str {
        let short = self.short_name();
        match short.rfind(':') {
            Some(idx) => &short[..idx],
            None => "",
        }
    }

    /// Short name with the namespace removed.
    pub fn leaf_name(&self) -> &str {
        let short = self.short_name();
        match short.rfind(':') {
            Some(idx) => &short[idx + 1..],
            None => short,
        }
    }

    /// Remove a single leading '|', for saved paths whose implicit root the
    /// destination scene lacks.
    pub fn strip_first_pipe(&mut self) {
        if self.full_path.starts_with('|') {
            self.full_path.remove(0);
        }
    }

    /// Rewrite the namespace on every namespaced segment of the path and
    /// return the new path.
    ///
    /// - old and new non-empty: every `old:` becomes `new:`
    /// - old non-empty, new empty: every `old:` is removed
    /// - old empty, new non-empty: `new:` is inserted after every '|' and
    ///   prepended when the path is not rooted
    pub fn set_namespace(&mut self, namespace: &str) -> &str {
        let old = self.namespace().to_string();
        if old == namespace {
            return &self.full_path;
        }

        let renamed = if !old.is_empty() && !namespace.is_empty() {
            self.full_path
                .replace(&format!("{old}:"), &format!("{namespace}:"))
        } else if !old.is_empty() {
            self.full_path.replace(&format!("{old}:"), "")
        } else {
            let mut path = self.full_path.replace('|', &format!("|{namespace}:"));
            if !path.starts_with('|') {
                path.insert_str(0, &format!("{namespace}:"));
            }
            path
        };

        self.full_path = renamed;
        &self.full_path
    }

    /// Builder-style variant of [`NodeReference::set_namespace`].
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.set_namespace(namespace);
        self
    }

    /// Apply a plain substring search/replace to the whole path.
    pub fn replaced(&self, search: &str, replace: &str) -> Self {
        if search.is_empty() {
            return self.clone();
        }
        Self::new(self.full_path.replace(search, replace))
    }

    /// True when either path is a suffix of the other, the loose equality
    /// used to pair long names with short names.
    pub fn overlaps(&self, other: &NodeReference) -> bool {
        self.full_path.ends_with(other.name()) || other.full_path.ends_with(self.name())
    }
}

impl fmt::Display for NodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path)
    }
}

impl From<&str> for NodeReference {
    fn from(s: &str) -> Self {
        NodeReference::new(s)
    }
}

impl From<String> for NodeReference {
    fn from(s: String) -> Self {
        NodeReference::new(s)
    }
}

impl AsRef<str> for NodeReference {
    fn as_ref(&self) -> &str {
        &self.full_path
    }
}

// Serde support: serialize as string, deserialize from string
impl Serialize for NodeReference {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.full_path)
    }
}

impl<'de> Deserialize<'de> for NodeReference {
    fn deserialize<D>(deserializer: D) -> Result<NodeReference, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(NodeReference::new(s))
    }
}
