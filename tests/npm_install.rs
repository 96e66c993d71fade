// Copyright 2026 the Nodepack authors. MIT license.

//! End-to-end exercise of the auto-install path (spec §4.4, §4.6): a
//! fixture registry built the same way `NpmClient`'s own unit tests build
//! one (`flate2::write::GzEncoder` + `tar::Builder`), wired through
//! `Runtime::execute` so a bare `require('left-pad')` in guest code
//! triggers a real fetch-manifest -> resolve -> fetch-tarball -> extract
//! -> write-into-VFS round trip before evaluation.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use flate2::write::GzEncoder;
use flate2::Compression;

use nodepack::builtins::crypto::OsEntropySource;
use nodepack::error::{NodepackError, Result};
use nodepack::vfs::SystemClock;
use nodepack::{ExecuteOptions, Fetcher, Runtime, RuntimeOptions};

struct FakeRegistry {
  manifests: HashMap<String, Vec<u8>>,
  tarballs: HashMap<String, Vec<u8>>,
}

impl Fetcher for FakeRegistry {
  fn fetch(&self, url: &str) -> Result<Vec<u8>> {
    if let Some(bytes) = self.manifests.get(url) {
      return Ok(bytes.clone());
    }
    if let Some(bytes) = self.tarballs.get(url) {
      return Ok(bytes.clone());
    }
    Err(NodepackError::FetchFailed { url: url.to_string(), reason: "not found in fixture registry".to_string() })
  }
}

fn build_tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
  let mut tar_bytes = Vec::new();
  {
    let mut builder = tar::Builder::new(&mut tar_bytes);
    for (name, contents) in files {
      let mut header = tar::Header::new_ustar();
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

fn fixture_registry() -> FakeRegistry {
  let left_pad_tarball = build_tarball(&[
    ("index.js", b"module.exports = function pad(s) { return '--' + s; };"),
    ("package.json", br#"{"name":"left-pad","version":"1.0.0","main":"index.js"}"#),
  ]);
  let mut manifests = HashMap::new();
  manifests.insert(
    "https://registry.test/left-pad".to_string(),
    serde_json::to_vec(&serde_json::json!({
      "versions": {"1.0.0": {"dist": {"tarball": "https://registry.test/left-pad/-/left-pad-1.0.0.tgz"}}},
      "dist-tags": {"latest": "1.0.0"}
    }))
    .unwrap(),
  );
  let mut tarballs = HashMap::new();
  tarballs.insert("https://registry.test/left-pad/-/left-pad-1.0.0.tgz".to_string(), left_pad_tarball);
  FakeRegistry { manifests, tarballs }
}

fn test_runtime() -> Runtime {
  Runtime::new(RuntimeOptions {
    registry_base: Some("https://registry.test".to_string()),
    fetcher: Box::new(fixture_registry()),
    entropy: Rc::new(OsEntropySource),
    clock: Box::new(SystemClock),
  })
}

#[tokio::test]
async fn bare_import_triggers_auto_install_before_evaluation() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();

  let source = "import pad from 'left-pad';\nexport default pad('x');\n";
  let result = runtime.execute(source, ExecuteOptions::default()).await.unwrap();

  assert!(result.ok, "{:?}", result.error);
  assert_eq!(result.data, Some(nodepack::Value::String("--x".to_string())));
  assert!(runtime.get_filesystem().exists("/node_modules/left-pad/index.js"));
}

#[tokio::test]
async fn missing_package_surfaces_as_execution_error() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();

  let result = runtime.execute("import x from 'does-not-exist';\n", ExecuteOptions::default()).await.unwrap();
  assert!(!result.ok);
  assert!(result.error.is_some());
}
