// Copyright 2026 the Nodepack authors. MIT license.

//! Resolves an npm version range or dist-tag against registry metadata
//! (spec §4.3), grounded on the semver comparisons
//! `tests/util/server/src/npm.rs::get_npm_package` performs when picking
//! the `latest` dist-tag for a fixture package.

use std::collections::BTreeMap;

use semver::{Version, VersionReq};

use crate::error::{NodepackError, Result};

#[derive(Debug, Clone)]
pub struct RegistryMetadata {
  pub versions: BTreeMap<String, serde_json::Value>,
  pub dist_tags: BTreeMap<String, String>,
}

/// Resolves `range` against `metadata`, in spec §4.3 precedence order:
/// dist-tag exact match, then wildcard -> `dist-tags.latest`, then the
/// maximum semver-satisfying version.
pub fn resolve(name: &str, range: &str, metadata: &RegistryMetadata) -> Result<String> {
  if let Some(version) = metadata.dist_tags.get(range) {
    if metadata.versions.contains_key(version) {
      return Ok(version.clone());
    }
  }

  if range.is_empty() || range == "*" {
    return metadata
      .dist_tags
      .get("latest")
      .cloned()
      .ok_or_else(|| no_match(name, range, metadata));
  }

  let req = VersionReq::parse(normalize_range(range))
    .map_err(|_| no_match(name, range, metadata))?;

  let mut best: Option<Version> = None;
  for key in metadata.versions.keys() {
    if let Ok(v) = Version::parse(key) {
      if req.matches(&v) && best.as_ref().map_or(true, |b| v > *b) {
        best = Some(v);
      }
    }
  }

  best.map(|v| v.to_string()).ok_or_else(|| no_match(name, range, metadata))
}

fn normalize_range(range: &str) -> &str {
  range.trim()
}

fn no_match(name: &str, range: &str, metadata: &RegistryMetadata) -> NodepackError {
  let available: Vec<&str> = metadata.versions.keys().take(5).map(|s| s.as_str()).collect();
  NodepackError::NoMatchingVersion {
    name: name.to_string(),
    range: range.to_string(),
    available: available.join(", "),
  }
}
