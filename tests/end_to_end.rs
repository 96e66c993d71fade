// Copyright 2026 the Nodepack authors. MIT license.

//! The literal end-to-end scenarios of spec §8, run against a real
//! `Runtime` with a fetcher that always fails (no scenario here needs
//! network access).

use std::rc::Rc;

use nodepack::builtins::crypto::OsEntropySource;
use nodepack::error::{NodepackError, Result};
use nodepack::vfs::SystemClock;
use nodepack::{ExecuteOptions, Fetcher, Runtime, RuntimeOptions, Value};

struct NoopFetcher;
impl Fetcher for NoopFetcher {
  fn fetch(&self, url: &str) -> Result<Vec<u8>> {
    Err(NodepackError::FetchFailed { url: url.to_string(), reason: "no network in tests".to_string() })
  }
}

fn test_runtime() -> Runtime {
  Runtime::new(RuntimeOptions {
    registry_base: None,
    fetcher: Box::new(NoopFetcher),
    entropy: Rc::new(OsEntropySource),
    clock: Box::new(SystemClock),
  })
}

#[tokio::test]
async fn scenario_1_default_export_arithmetic() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();
  let result = runtime.execute("export default 3 + 5", ExecuteOptions::default()).await.unwrap();
  assert!(result.ok);
  assert_eq!(result.data, Some(Value::Number(8.0)));
}

#[tokio::test]
async fn scenario_2_console_log_is_captured() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();
  let result = runtime.execute("console.log('Hello from test')", ExecuteOptions::default()).await.unwrap();
  assert!(result.ok);
  assert!(result.logs.contains(&"Hello from test".to_string()));
}

#[tokio::test]
async fn scenario_3_thrown_error_is_not_ok() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();
  let result = runtime.execute("throw new Error('Test error')", ExecuteOptions::default()).await.unwrap();
  assert!(!result.ok);
  assert!(result.error.unwrap().contains("Test error"));
}

#[tokio::test]
async fn scenario_4_esm_importing_builtin_path() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();
  let source = "import p from 'path'; export default p.join('a','b');";
  let result = runtime.execute(source, ExecuteOptions::default()).await.unwrap();
  assert!(result.ok, "{:?}", result.error);
  assert_eq!(result.data, Some(Value::String("a/b".to_string())));
}

#[tokio::test]
async fn scenario_5_cjs_requiring_builtin_path() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();
  let source = "const p = require('path'); module.exports = p.join('x','y');";
  let result = runtime.execute(source, ExecuteOptions::default()).await.unwrap();
  assert!(result.ok, "{:?}", result.error);
  assert_eq!(result.data, Some(Value::String("x/y".to_string())));
}

#[tokio::test]
async fn scenario_6_destructured_cjs_named_exports() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();
  let vfs = runtime.get_filesystem();
  vfs
    .write_file(
      "/cjs-named.js",
      b"exports.add = (a, b) => a + b; exports.subtract = (a, b) => a - b; exports.constant = 42;".to_vec(),
    )
    .unwrap();

  let source = "const { add, subtract, constant } = require('./cjs-named.js');\n\
                module.exports = { sum: add(2, 3), diff: subtract(5, 1), constant };";
  let result = runtime.execute(source, ExecuteOptions::default()).await.unwrap();
  assert!(result.ok, "{:?}", result.error);
  match result.data {
    Some(Value::Object(entries)) => {
      let map: std::collections::HashMap<_, _> = entries.into_iter().collect();
      assert_eq!(map.get("sum"), Some(&Value::Number(5.0)));
      assert_eq!(map.get("diff"), Some(&Value::Number(4.0)));
      assert_eq!(map.get("constant"), Some(&Value::Number(42.0)));
    }
    other => panic!("expected an object export, got {other:?}"),
  }
}

#[tokio::test]
async fn scenario_7_execute_before_initialize_is_rejected() {
  let mut runtime = test_runtime();
  let err = runtime.execute("1", ExecuteOptions::default()).await.unwrap_err();
  assert!(err.to_string().contains("Runtime not initialized"));
}

#[tokio::test]
async fn scenario_8_mixed_format_interop() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();
  let vfs = runtime.get_filesystem();
  vfs.write_file("/string-utils.js", b"module.exports.shout = (s) => s.toUpperCase() + '!';".to_vec()).unwrap();
  vfs.write_file("/number-utils.js", b"export function double(n) { return n * 2; }\n".to_vec()).unwrap();

  let source = "import { double } from './number-utils.js';\n\
                const { shout } = require('./string-utils.js');\n\
                export default shout('ok') + double(21);";
  let result = runtime.execute(source, ExecuteOptions::default()).await.unwrap();
  assert!(result.ok, "{:?}", result.error);
  assert_eq!(result.data, Some(Value::String("OK!42".to_string())));
}

#[tokio::test]
async fn cyclic_require_sees_partial_exports_at_access_time() {
  let mut runtime = test_runtime();
  runtime.initialize().await.unwrap();
  let vfs = runtime.get_filesystem();
  vfs.write_file("/a.js", b"exports.name = 'a'; const b = require('./b.js'); exports.seenFromB = b.name;".to_vec()).unwrap();
  vfs.write_file("/b.js", b"exports.name = 'b'; const a = require('./a.js'); exports.seenFromA = a.name;".to_vec()).unwrap();

  let result = runtime.execute("module.exports = require('./a.js');", ExecuteOptions::default()).await.unwrap();
  assert!(result.ok, "{:?}", result.error);
  match result.data {
    Some(Value::Object(entries)) => {
      let map: std::collections::HashMap<_, _> = entries.into_iter().collect();
      assert_eq!(map.get("name"), Some(&Value::String("a".to_string())));
      assert_eq!(map.get("seenFromB"), Some(&Value::String("b".to_string())));
    }
    other => panic!("expected an object export, got {other:?}"),
  }
}
