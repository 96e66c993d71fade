// Copyright 2026 the Nodepack authors. MIT license.

//! Scans a source string for bare import specifiers to pre-install
//! (spec §4.6).

use regex::Regex;
use std::sync::OnceLock;

const BUILTINS: &[&str] = &[
  "path", "events", "url", "querystring", "buffer", "crypto", "stream", "util", "process", "fs", "module",
  "child_process",
];

fn import_from_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"import\s+(?:[^'"]+?\s+from\s+)?['"]([^'"]+)['"]"#).unwrap())
}

fn is_skippable(specifier: &str) -> bool {
  specifier.starts_with("./")
    || specifier.starts_with("../")
    || specifier.starts_with('/')
    || specifier.starts_with("node:")
    || BUILTINS.contains(&specifier)
}

/// Normalizes a bare specifier to its installable package name:
/// `@scope/name` keeps two segments, otherwise the first `/`-segment.
pub fn package_name_of(specifier: &str) -> String {
  if let Some(rest) = specifier.strip_prefix('@') {
    let mut parts = rest.splitn(2, '/');
    let scope = parts.next().unwrap_or("");
    let name = parts.next().unwrap_or("");
    if name.is_empty() {
      return format!("@{scope}");
    }
    let pkg = name.split('/').next().unwrap_or(name);
    return format!("@{scope}/{pkg}");
  }
  specifier.split('/').next().unwrap_or(specifier).to_string()
}

/// Returns the unique set of bare-specifier package names in first-seen
/// order, skipping relative/absolute/builtin specifiers.
pub fn detect_imports(source: &str) -> Vec<String> {
  let mut seen = std::collections::HashSet::new();
  let mut out = Vec::new();
  for cap in import_from_re().captures_iter(source) {
    let specifier = &cap[1];
    if is_skippable(specifier) {
      continue;
    }
    let name = package_name_of(specifier);
    if seen.insert(name.clone()) {
      out.push(name);
    }
  }
  out
}
