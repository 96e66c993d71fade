// Copyright 2026 the Nodepack authors. MIT license.

//! Classifies a source string as ES-module or script-module (spec §4.5).
//! A pragmatic regex classifier, not a parser — it must ignore `require(`
//! occurrences inside comments and string literals.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
  Esm,
  Cjs,
}

fn export_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?m)^\s*export\s+").unwrap())
}

fn import_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?m)^\s*import\s+").unwrap())
}

fn cjs_write_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"module\.exports\s*=|exports\.\w+\s*=").unwrap())
}

fn require_call_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"require\s*\(").unwrap())
}

/// Strips `//` line comments and quoted string literals so token scans below
/// don't trip on `require(` appearing inside either.
fn strip_comments_and_strings(source: &str) -> String {
  let mut out = String::with_capacity(source.len());
  let mut chars = source.chars().peekable();
  let mut in_line_comment = false;
  let mut in_block_comment = false;
  let mut string_delim: Option<char> = None;

  while let Some(c) = chars.next() {
    if in_line_comment {
      if c == '\n' {
        in_line_comment = false;
        out.push('\n');
      }
      continue;
    }
    if in_block_comment {
      if c == '*' && chars.peek() == Some(&'/') {
        chars.next();
        in_block_comment = false;
      }
      continue;
    }
    if let Some(delim) = string_delim {
      if c == '\\' {
        chars.next();
        continue;
      }
      if c == delim {
        string_delim = None;
      }
      continue;
    }
    match c {
      '/' if chars.peek() == Some(&'/') => {
        chars.next();
        in_line_comment = true;
      }
      '/' if chars.peek() == Some(&'*') => {
        chars.next();
        in_block_comment = true;
      }
      '\'' | '"' | '`' => {
        string_delim = Some(c);
      }
      other => out.push(other),
    }
  }
  out
}

/// Classifies `source` as ESM or CJS. Stable across runs, independent of
/// whitespace outside relevant tokens (spec invariant 4).
pub fn detect_module_format(source: &str) -> ModuleFormat {
  let cleaned = strip_comments_and_strings(source);

  if export_re().is_match(&cleaned) {
    return ModuleFormat::Esm;
  }
  let has_import = import_re().is_match(&cleaned);
  let has_cjs_write = cjs_write_re().is_match(&cleaned);
  if has_import && !has_cjs_write {
    return ModuleFormat::Esm;
  }
  if has_cjs_write {
    return ModuleFormat::Cjs;
  }
  if require_call_re().is_match(&cleaned) {
    return ModuleFormat::Cjs;
  }
  ModuleFormat::Esm
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn export_default_is_esm() {
    assert_eq!(detect_module_format("export default 3 + 5"), ModuleFormat::Esm);
  }

  #[test]
  fn module_exports_is_cjs() {
    assert_eq!(detect_module_format("module.exports = { a: 1 }"), ModuleFormat::Cjs);
  }

  #[test]
  fn bare_require_is_cjs() {
    assert_eq!(detect_module_format("const fs = require('fs');"), ModuleFormat::Cjs);
  }

  #[test]
  fn require_inside_comment_is_ignored() {
    let src = "// require('fs')\nexport const x = 1;";
    assert_eq!(detect_module_format(src), ModuleFormat::Esm);
  }

  #[test]
  fn require_inside_string_literal_is_ignored() {
    let src = "const s = \"require(fs)\";\nexport const x = s;";
    assert_eq!(detect_module_format(src), ModuleFormat::Esm);
  }

  #[test]
  fn stable_regardless_of_incidental_whitespace() {
    let a = detect_module_format("export   const x = 1;");
    let b = detect_module_format("export const x = 1;");
    assert_eq!(a, b);
  }

  #[test]
  fn empty_source_defaults_to_esm() {
    assert_eq!(detect_module_format(""), ModuleFormat::Esm);
  }
}
