// Copyright 2026 the Nodepack authors. MIT license.

//! `NpmClient::install` implements the pipeline of spec §4.4: fetch
//! manifest -> resolve version -> fetch+extract tarball -> write into the
//! VFS -> recurse into dependencies. Grounded on the registry JSON shape
//! (`versions`, `dist-tags`, `dist.tarball`) that
//! `tests/util/server/src/npm.rs::get_npm_package` produces for fixtures.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::error::{NodepackError, Result};
use crate::semver_resolve::{self, RegistryMetadata};
use crate::tar::{self, EntryType};
use crate::vfs::Vfs;

/// The host HTTP capability injected into the npm client (spec §6).
pub trait Fetcher {
  fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct InstalledPackage {
  pub name: String,
  pub version: String,
  pub install_path: String,
  pub dependencies: BTreeMap<String, InstalledPackage>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
  pub include_dev: bool,
  pub force: bool,
}

pub struct NpmClient {
  registry_base: String,
  fetcher: Box<dyn Fetcher>,
  manifest_cache: RefCell<HashMap<String, Value>>,
  top_level: RefCell<HashMap<String, InstalledPackage>>,
}

impl NpmClient {
  pub fn new(registry_base: impl Into<String>, fetcher: Box<dyn Fetcher>) -> Self {
    NpmClient {
      registry_base: registry_base.into(),
      fetcher,
      manifest_cache: RefCell::new(HashMap::new()),
      top_level: RefCell::new(HashMap::new()),
    }
  }

  pub fn default_registry() -> String {
    "https://registry.npmjs.org".to_string()
  }

  fn fetch_manifest(&self, name: &str) -> Result<Value> {
    if let Some(cached) = self.manifest_cache.borrow().get(name) {
      return Ok(cached.clone());
    }
    let url = format!("{}/{}", self.registry_base.trim_end_matches('/'), name);
    let bytes = self.fetcher.fetch(&url).map_err(|_| NodepackError::FetchFailed {
      url: url.clone(),
      reason: format!("could not fetch manifest for {name}"),
    })?;
    let value: Value = serde_json::from_slice(&bytes)?;
    self.manifest_cache.borrow_mut().insert(name.to_string(), value.clone());
    Ok(value)
  }

  fn registry_metadata(doc: &Value) -> RegistryMetadata {
    let mut versions = BTreeMap::new();
    if let Some(obj) = doc.get("versions").and_then(|v| v.as_object()) {
      for (k, v) in obj {
        versions.insert(k.clone(), v.clone());
      }
    }
    let mut dist_tags = BTreeMap::new();
    if let Some(obj) = doc.get("dist-tags").and_then(|v| v.as_object()) {
      for (k, v) in obj {
        if let Some(s) = v.as_str() {
          dist_tags.insert(k.clone(), s.to_string());
        }
      }
    }
    RegistryMetadata { versions, dist_tags }
  }

  /// Installs `name@range` (and its dependency closure) into `vfs`.
  pub fn install(&self, vfs: &Vfs, name: &str, range: &str, opts: InstallOptions) -> Result<InstalledPackage> {
    self.install_into(vfs, name, range, "", opts)
  }

  fn install_into(&self, vfs: &Vfs, name: &str, range: &str, parent_install_path: &str, opts: InstallOptions) -> Result<InstalledPackage> {
    let doc = self.fetch_manifest(name)?;
    let metadata = Self::registry_metadata(&doc);
    let version = semver_resolve::resolve(name, range, &metadata)?;

    if let Some(existing) = self.top_level.borrow().get(name) {
      if existing.version == version && !opts.force {
        log::debug!("npm: reusing already-installed {name}@{version}");
        return Ok(existing.clone());
      }
    }
    log::debug!("npm: resolved {name}@{range} -> {version}");

    let install_path = if parent_install_path.is_empty() || !self.top_level.borrow().contains_key(name) {
      format!("/node_modules/{name}")
    } else {
      format!("{parent_install_path}/node_modules/{name}")
    };

    let version_doc = metadata
      .versions
      .get(&version)
      .cloned()
      .ok_or_else(|| NodepackError::NoMatchingVersion { name: name.to_string(), range: range.to_string(), available: String::new() })?;
    let tarball_url = version_doc
      .get("dist")
      .and_then(|d| d.get("tarball"))
      .and_then(|t| t.as_str())
      .ok_or_else(|| NodepackError::FetchFailed { url: name.to_string(), reason: "manifest has no dist.tarball".to_string() })?
      .to_string();

    log::debug!("npm: installing {name}@{version} into {install_path}");
    let tarball_bytes = self.fetcher.fetch(&tarball_url).map_err(|_| {
      log::warn!("npm: failed to fetch tarball for {name}@{version} from {tarball_url}");
      NodepackError::FetchFailed { url: tarball_url.clone(), reason: format!("could not fetch tarball for {name}@{version}") }
    })?;
    let entries = tar::extract(&tarball_bytes)?;
    for entry in &entries {
      let dest = format!("{install_path}/{}", entry.path);
      match entry.kind {
        EntryType::Directory => vfs.mkdir(&dest, true)?,
        EntryType::File => vfs.write_file(&dest, entry.bytes.clone())?,
      }
    }

    let mut dependencies = BTreeMap::new();
    let deps_doc = version_doc.get("dependencies").and_then(|v| v.as_object()).cloned().unwrap_or_default();
    for (dep_name, dep_range) in &deps_doc {
      let dep_range = dep_range.as_str().unwrap_or("*");
      let installed = self.install_into(vfs, dep_name, dep_range, &install_path, opts)?;
      dependencies.insert(dep_name.clone(), installed);
    }
    if opts.include_dev {
      let dev_deps_doc = version_doc.get("devDependencies").and_then(|v| v.as_object()).cloned().unwrap_or_default();
      for (dep_name, dep_range) in &dev_deps_doc {
        let dep_range = dep_range.as_str().unwrap_or("*");
        let installed = self.install_into(vfs, dep_name, dep_range, &install_path, opts)?;
        dependencies.insert(dep_name.clone(), installed);
      }
    }

    let record = InstalledPackage { name: name.to_string(), version, install_path: install_path.clone(), dependencies };
    if install_path == format!("/node_modules/{name}") {
      self.top_level.borrow_mut().insert(name.to_string(), record.clone());
    }
    Ok(record)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use flate2::write::GzEncoder;
  use flate2::Compression;
  use std::collections::HashMap as StdHashMap;
  use std::io::Write;

  struct FakeRegistry {
    manifests: StdHashMap<String, Vec<u8>>,
    tarballs: StdHashMap<String, Vec<u8>>,
  }

  impl Fetcher for FakeRegistry {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
      if let Some(bytes) = self.manifests.get(url) {
        return Ok(bytes.clone());
      }
      if let Some(bytes) = self.tarballs.get(url) {
        return Ok(bytes.clone());
      }
      Err(NodepackError::FetchFailed { url: url.to_string(), reason: "not found".to_string() })
    }
  }

  fn build_tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar_bytes = Vec::new();
    {
      let mut builder = ::tar::Builder::new(&mut tar_bytes);
      for (name, contents) in files {
        let mut header = ::tar::Header::new_ustar();
        header.set_path(format!("package/{name}")).unwrap();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, *contents).unwrap();
      }
      builder.finish().unwrap();
    }
    let mut gz = Vec::new();
    {
      let mut encoder = GzEncoder::new(&mut gz, Compression::default());
      encoder.write_all(&tar_bytes).unwrap();
      encoder.finish().unwrap();
    }
    gz
  }

  #[test]
  fn installs_package_and_its_dependency() {
    let left_pad_tarball = build_tarball(&[("index.js", b"module.exports = () => 'pad';"), ("package.json", br#"{"name":"left-pad","version":"1.0.0"}"#)]);
    let leaf_tarball = build_tarball(&[("index.js", b"module.exports = 1;")]);

    let mut manifests = StdHashMap::new();
    manifests.insert(
      "https://registry.test/left-pad".to_string(),
      serde_json::to_vec(&serde_json::json!({
        "versions": {"1.0.0": {"dist": {"tarball": "https://registry.test/left-pad/-/left-pad-1.0.0.tgz"}, "dependencies": {"leaf": "^1.0.0"}}},
        "dist-tags": {"latest": "1.0.0"}
      })).unwrap(),
    );
    manifests.insert(
      "https://registry.test/leaf".to_string(),
      serde_json::to_vec(&serde_json::json!({
        "versions": {"1.0.0": {"dist": {"tarball": "https://registry.test/leaf/-/leaf-1.0.0.tgz"}}},
        "dist-tags": {"latest": "1.0.0"}
      })).unwrap(),
    );
    let mut tarballs = StdHashMap::new();
    tarballs.insert("https://registry.test/left-pad/-/left-pad-1.0.0.tgz".to_string(), left_pad_tarball);
    tarballs.insert("https://registry.test/leaf/-/leaf-1.0.0.tgz".to_string(), leaf_tarball);

    let client = NpmClient::new("https://registry.test", Box::new(FakeRegistry { manifests, tarballs }));
    let vfs = Vfs::new();
    let installed = client.install(&vfs, "left-pad", "^1.0.0", InstallOptions::default()).unwrap();

    assert_eq!(installed.install_path, "/node_modules/left-pad");
    assert!(vfs.exists("/node_modules/left-pad/index.js"));
    assert!(vfs.exists("/node_modules/leaf/index.js"));
    assert!(installed.dependencies.contains_key("leaf"));
  }

  #[test]
  fn cached_install_is_reused_without_force() {
    let tarball = build_tarball(&[("index.js", b"1")]);
    let mut manifests = StdHashMap::new();
    manifests.insert(
      "https://registry.test/solo".to_string(),
      serde_json::to_vec(&serde_json::json!({
        "versions": {"1.0.0": {"dist": {"tarball": "https://registry.test/solo/-/solo-1.0.0.tgz"}}},
        "dist-tags": {"latest": "1.0.0"}
      })).unwrap(),
    );
    let mut tarballs = StdHashMap::new();
    tarballs.insert("https://registry.test/solo/-/solo-1.0.0.tgz".to_string(), tarball);
    let client = NpmClient::new("https://registry.test", Box::new(FakeRegistry { manifests, tarballs }));
    let vfs = Vfs::new();
    let first = client.install(&vfs, "solo", "^1.0.0", InstallOptions::default()).unwrap();
    let second = client.install(&vfs, "solo", "^1.0.0", InstallOptions::default()).unwrap();
    assert_eq!(first.install_path, second.install_path);
  }
}
