//! Shared pose, legacy and mirror-table fixtures for tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    poses: HashMap<String, String>,
    legacy: HashMap<String, LegacyEntry>,
    #[serde(rename = "mirror-tables")]
    mirror_tables: HashMap<String, String>,
}

/// Old-format documents come in pairs; either half may be missing.
#[derive(Debug, Deserialize)]
struct LegacyEntry {
    #[serde(default)]
    dict: Option<String>,
    #[serde(default)]
    list: Option<String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod poses {
    use super::*;

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.poses, "pose", name)?;
        read_to_string(rel)
    }
}

pub mod legacy {
    use super::*;

    pub fn dict_path(name: &str) -> Result<Option<PathBuf>> {
        let entry = lookup(&MANIFEST.legacy, "legacy", name)?;
        Ok(entry.dict.as_deref().map(resolve_path))
    }

    pub fn list_path(name: &str) -> Result<Option<PathBuf>> {
        let entry = lookup(&MANIFEST.legacy, "legacy", name)?;
        Ok(entry.list.as_deref().map(resolve_path))
    }
}

pub mod mirror_tables {
    use super::*;

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.mirror_tables, "mirror table", name)?;
        Ok(resolve_path(rel))
    }
}
