// Copyright 2026 the Nodepack authors. MIT license.

//! Specifier -> absolute VFS path resolution (spec §4.7), grounded on the
//! `node_resolve`/`module_resolve`/`finalize_resolution` pipeline in
//! `cli/compat/esm_resolver.rs` and `cli/compat/node_module_loader.rs`,
//! adapted to resolve against the virtual filesystem instead of the host's
//! real one.

use serde_json::Value;

use crate::error::{NodepackError, Result};
use crate::npm::manifest::PackageManifest;
use crate::vfs::Vfs;

pub const BUILTIN_MODULES: &[&str] = &[
  "path", "events", "url", "querystring", "buffer", "crypto", "stream", "util", "process", "fs", "module",
  "child_process",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
  Path(String),
  Builtin(String),
}

fn is_relative(specifier: &str) -> bool {
  specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".."
}

pub(crate) fn dirname(path: &str) -> String {
  match path.rfind('/') {
    Some(0) => "/".to_string(),
    Some(i) => path[..i].to_string(),
    None => "/".to_string(),
  }
}

fn join(base_dir: &str, rel: &str) -> String {
  let mut segments: Vec<String> = if base_dir == "/" {
    Vec::new()
  } else {
    base_dir.trim_start_matches('/').split('/').map(|s| s.to_string()).collect()
  };
  for part in rel.split('/') {
    match part {
      "" | "." => {}
      ".." => {
        segments.pop();
      }
      other => segments.push(other.to_string()),
    }
  }
  if segments.is_empty() {
    "/".to_string()
  } else {
    format!("/{}", segments.join("/"))
  }
}

/// File-extension algorithm (spec §4.7 step 1): exact match, then `.js`,
/// `.json`, then `index.js` inside a directory.
fn resolve_file_candidates(vfs: &Vfs, candidate: &str) -> Option<String> {
  if vfs.exists(candidate) {
    if let Ok(stat) = vfs.stat(candidate) {
      if stat.is_file {
        return Some(candidate.to_string());
      }
    }
  }
  for ext in [".js", ".json"] {
    let with_ext = format!("{candidate}{ext}");
    if vfs.exists(&with_ext) {
      if let Ok(stat) = vfs.stat(&with_ext) {
        if stat.is_file {
          return Some(with_ext);
        }
      }
    }
  }
  let index = format!("{}/index.js", candidate.trim_end_matches('/'));
  if vfs.exists(&index) {
    return Some(index);
  }
  None
}

/// Splits a bare specifier into (package name, subpath). Scoped packages
/// keep two path segments as the package name.
fn split_package_specifier(specifier: &str) -> (String, String) {
  let mut parts = specifier.splitn(if specifier.starts_with('@') { 3 } else { 2 }, '/');
  let name = if specifier.starts_with('@') {
    let scope = parts.next().unwrap_or("");
    let pkg = parts.next().unwrap_or("");
    format!("{scope}/{pkg}")
  } else {
    parts.next().unwrap_or(specifier).to_string()
  };
  let rest: Vec<&str> = parts.collect();
  let subpath = if rest.is_empty() { String::new() } else { format!("./{}", rest.join("/")) };
  (name, subpath)
}

/// Walks up from `start_dir` looking for `node_modules/<name>`, returning
/// the package directory if found.
fn find_package_dir(vfs: &Vfs, start_dir: &str, name: &str) -> Option<String> {
  let mut dir = start_dir.to_string();
  loop {
    let candidate = format!("{}/node_modules/{name}", dir.trim_end_matches('/'));
    if vfs.exists(&format!("{candidate}/package.json")) {
      return Some(candidate);
    }
    if dir == "/" {
      return None;
    }
    dir = dirname(&dir);
  }
}

fn read_manifest(vfs: &Vfs, package_dir: &str) -> Result<PackageManifest> {
  let text = vfs.read_file_string(&format!("{package_dir}/package.json"))?;
  PackageManifest::parse(&text)
}

/// Resolves a subpath pattern in an `exports` conditional map. Supports
/// exact keys, the `.`/`./` root entry, and a single `*` wildcard pattern.
fn resolve_exports(exports: &Value, subpath: &str, is_esm: bool) -> Option<String> {
  let subpath = if subpath.is_empty() { "." } else { subpath };
  let map = match exports {
    Value::String(s) if subpath == "." => return Some(s.clone()),
    Value::Object(m) => m,
    _ => return None,
  };

  // A top-level conditions map (no "." keys) applies directly to the root.
  let looks_like_conditions = map.keys().next().map(|k| !k.starts_with('.')).unwrap_or(false);
  if looks_like_conditions && subpath == "." {
    return pick_condition(exports, is_esm);
  }

  if let Some(target) = map.get(subpath) {
    return pick_condition(target, is_esm);
  }

  for (pattern, target) in map {
    if let Some(prefix) = pattern.strip_suffix('*') {
      if let Some(rest) = subpath.strip_prefix(prefix) {
        if let Some(Value::String(resolved_pattern)) = Some(pick_condition(target, is_esm).map(Value::String)?) {
          return Some(resolved_pattern.replacen('*', rest, 1));
        }
      }
    }
  }
  None
}

fn pick_condition(value: &Value, is_esm: bool) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Object(map) => {
      let order: &[&str] = if is_esm { &["import", "default"] } else { &["require", "default"] };
      for key in order {
        if let Some(v) = map.get(*key) {
          return pick_condition(v, is_esm);
        }
      }
      None
    }
    _ => None,
  }
}

/// Applies the `browser` map field, rewriting `specifier` if it has an
/// entry. Does not apply to relative/absolute specifiers re-resolved in a
/// later pass (spec §4.7 step 2, `browser` field).
fn apply_browser_map(manifest: &PackageManifest, specifier: &str) -> Option<String> {
  match &manifest.browser {
    Some(Value::Object(map)) => map.get(specifier).and_then(|v| v.as_str()).map(|s| s.to_string()),
    _ => None,
  }
}

pub struct ModuleResolver<'a> {
  vfs: &'a Vfs,
}

impl<'a> ModuleResolver<'a> {
  pub fn new(vfs: &'a Vfs) -> Self {
    ModuleResolver { vfs }
  }

  /// Resolves `specifier` as imported from `referrer` (an absolute VFS
  /// path, or `None` for the entry module resolved against `/`).
  pub fn resolve(&self, specifier: &str, referrer: Option<&str>, is_esm: bool) -> Result<Resolved> {
    if let Some(rest) = specifier.strip_prefix("node:") {
      return Ok(Resolved::Builtin(rest.to_string()));
    }
    if BUILTIN_MODULES.contains(&specifier) {
      return Ok(Resolved::Builtin(specifier.to_string()));
    }

    let referrer_dir = referrer.map(dirname).unwrap_or_else(|| "/".to_string());

    if is_relative(specifier) {
      let candidate = join(&referrer_dir, specifier);
      return self.finalize(&candidate, specifier, referrer);
    }
    if let Some(absolute) = specifier.strip_prefix('/') {
      let candidate = format!("/{absolute}");
      return self.finalize(&candidate, specifier, referrer);
    }

    self.resolve_bare(specifier, &referrer_dir, is_esm, referrer)
  }

  fn finalize(&self, candidate: &str, specifier: &str, referrer: Option<&str>) -> Result<Resolved> {
    resolve_file_candidates(self.vfs, candidate)
      .map(Resolved::Path)
      .ok_or_else(|| NodepackError::ModuleNotFound {
        specifier: specifier.to_string(),
        referrer: referrer.unwrap_or("/").to_string(),
      })
  }

  fn resolve_bare(&self, specifier: &str, referrer_dir: &str, is_esm: bool, referrer: Option<&str>) -> Result<Resolved> {
    let (name, subpath) = split_package_specifier(specifier);
    let package_dir = find_package_dir(self.vfs, referrer_dir, &name).ok_or_else(|| NodepackError::ModuleNotFound {
      specifier: specifier.to_string(),
      referrer: referrer.unwrap_or("/").to_string(),
    })?;
    let manifest = read_manifest(self.vfs, &package_dir)?;

    if manifest.has_exports() {
      let exports = manifest.exports.as_ref().unwrap();
      let target = resolve_exports(exports, &subpath, is_esm).ok_or_else(|| NodepackError::ExportsNotMapped {
        package: name.clone(),
        subpath: if subpath.is_empty() { ".".to_string() } else { subpath.clone() },
      })?;
      let candidate = join(&package_dir, target.trim_start_matches("./"));
      return self.finalize(&candidate, specifier, referrer);
    }

    if !subpath.is_empty() {
      let candidate = join(&package_dir, subpath.trim_start_matches("./"));
      return self.finalize(&candidate, specifier, referrer);
    }

    if let Some(rewritten) = apply_browser_map(&manifest, specifier) {
      let candidate = join(&package_dir, rewritten.trim_start_matches("./"));
      return self.finalize(&candidate, specifier, referrer);
    }

    let entry = if let Some(Value::String(browser_main)) = &manifest.browser {
      Some(browser_main.clone())
    } else if is_esm {
      manifest.module.clone().or_else(|| manifest.main.clone())
    } else {
      manifest.main.clone()
    };
    let entry = entry.unwrap_or_else(|| "index.js".to_string());
    let candidate = join(&package_dir, entry.trim_start_matches("./"));
    self.finalize(&candidate, specifier, referrer)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn setup() -> Vfs {
    let vfs = Vfs::new();
    vfs.write_file("/main.js", b"".to_vec()).unwrap();
    vfs.write_file("/lib/helper.js", b"".to_vec()).unwrap();
    vfs
  }

  #[test]
  fn resolves_relative_with_extension_algorithm() {
    let vfs = setup();
    let resolver = ModuleResolver::new(&vfs);
    let resolved = resolver.resolve("./lib/helper", Some("/main.js"), true).unwrap();
    assert_eq!(resolved, Resolved::Path("/lib/helper.js".to_string()));
  }

  #[test]
  fn resolves_directory_index() {
    let vfs = setup();
    vfs.write_file("/lib/sub/index.js", b"".to_vec()).unwrap();
    let resolver = ModuleResolver::new(&vfs);
    let resolved = resolver.resolve("./lib/sub", Some("/main.js"), true).unwrap();
    assert_eq!(resolved, Resolved::Path("/lib/sub/index.js".to_string()));
  }

  #[test]
  fn builtin_bare_and_node_scheme_resolve_identically() {
    let vfs = setup();
    let resolver = ModuleResolver::new(&vfs);
    assert_eq!(resolver.resolve("fs", Some("/main.js"), true).unwrap(), Resolved::Builtin("fs".to_string()));
    assert_eq!(resolver.resolve("node:fs", Some("/main.js"), true).unwrap(), Resolved::Builtin("fs".to_string()));
  }

  #[test]
  fn resolves_bare_package_main_field() {
    let vfs = setup();
    vfs.write_file("/node_modules/left-pad/package.json", br#"{"name":"left-pad","version":"1.0.0","main":"src/index.js"}"#.to_vec()).unwrap();
    vfs.write_file("/node_modules/left-pad/src/index.js", b"".to_vec()).unwrap();
    let resolver = ModuleResolver::new(&vfs);
    let resolved = resolver.resolve("left-pad", Some("/main.js"), false).unwrap();
    assert_eq!(resolved, Resolved::Path("/node_modules/left-pad/src/index.js".to_string()));
  }

  #[test]
  fn exports_map_overrides_main() {
    let vfs = setup();
    vfs.write_file(
      "/node_modules/pkg/package.json",
      br#"{"name":"pkg","version":"1.0.0","main":"wrong.js","exports":{".":{"import":"./esm.js","require":"./cjs.js"}}}"#.to_vec(),
    )
    .unwrap();
    vfs.write_file("/node_modules/pkg/esm.js", b"".to_vec()).unwrap();
    vfs.write_file("/node_modules/pkg/cjs.js", b"".to_vec()).unwrap();
    let resolver = ModuleResolver::new(&vfs);
    assert_eq!(resolver.resolve("pkg", Some("/main.js"), true).unwrap(), Resolved::Path("/node_modules/pkg/esm.js".to_string()));
    assert_eq!(resolver.resolve("pkg", Some("/main.js"), false).unwrap(), Resolved::Path("/node_modules/pkg/cjs.js".to_string()));
  }

  #[test]
  fn missing_exports_subpath_fails() {
    let vfs = setup();
    vfs.write_file("/node_modules/pkg/package.json", br#"{"name":"pkg","version":"1.0.0","exports":{".":"./index.js"}}"#.to_vec()).unwrap();
    vfs.write_file("/node_modules/pkg/index.js", b"".to_vec()).unwrap();
    let resolver = ModuleResolver::new(&vfs);
    let err = resolver.resolve("pkg/unmapped", Some("/main.js"), true).unwrap_err();
    assert!(matches!(err, NodepackError::ExportsNotMapped { .. }));
  }

  #[test]
  fn scoped_package_name_keeps_two_segments() {
    let vfs = setup();
    vfs.write_file("/node_modules/@scope/pkg/package.json", br#"{"name":"@scope/pkg","version":"1.0.0","main":"index.js"}"#.to_vec()).unwrap();
    vfs.write_file("/node_modules/@scope/pkg/index.js", b"".to_vec()).unwrap();
    let resolver = ModuleResolver::new(&vfs);
    assert_eq!(resolver.resolve("@scope/pkg", Some("/main.js"), false).unwrap(), Resolved::Path("/node_modules/@scope/pkg/index.js".to_string()));
  }

  #[test]
  fn unresolvable_specifier_is_module_not_found() {
    let vfs = setup();
    let resolver = ModuleResolver::new(&vfs);
    let err = resolver.resolve("does-not-exist", Some("/main.js"), true).unwrap_err();
    assert!(matches!(err, NodepackError::ModuleNotFound { .. }));
  }
}
