// Copyright 2026 the Nodepack authors. MIT license.

//! `package.json` parsing (spec §3 "Package manifest").

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
  pub name: String,
  #[serde(default)]
  pub version: String,
  pub main: Option<String>,
  pub module: Option<String>,
  /// Either a string (replaces `main`) or a map (rewrites specifiers).
  pub browser: Option<Value>,
  /// Conditional exports map; presence overrides `main`/`module`/`browser`.
  pub exports: Option<Value>,
  #[serde(default)]
  pub dependencies: BTreeMap<String, String>,
  #[serde(default, rename = "devDependencies")]
  pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
  pub fn parse(text: &str) -> Result<Self> {
    Ok(serde_json::from_str(text)?)
  }

  pub fn has_exports(&self) -> bool {
    self.exports.is_some()
  }
}
