// Copyright 2026 the Nodepack authors. MIT license.

//! Rewrites ES-module syntax into an equivalent CommonJS body so the
//! linker (spec §4.11) can run every module through the same
//! function-wrapper evaluation path, regardless of source format. Like
//! `format::detect_module_format`, this is a line-oriented regex pass, not
//! a parser: it only recognizes the common single-line import/export
//! shapes a bundler's output or hand-written module would use.

use regex::Regex;
use std::sync::OnceLock;

fn import_star_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"(?m)^\s*import\s*\*\s*as\s+(\w+)\s+from\s+['"]([^'"]+)['"]\s*;?\s*$"#).unwrap())
}

fn import_default_named_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"(?m)^\s*import\s+(\w+)\s*,\s*\{([^}]*)\}\s+from\s+['"]([^'"]+)['"]\s*;?\s*$"#).unwrap())
}

fn import_named_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"(?m)^\s*import\s*\{([^}]*)\}\s+from\s+['"]([^'"]+)['"]\s*;?\s*$"#).unwrap())
}

fn import_default_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"(?m)^\s*import\s+(\w+)\s+from\s+['"]([^'"]+)['"]\s*;?\s*$"#).unwrap())
}

fn import_bare_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"(?m)^\s*import\s+['"]([^'"]+)['"]\s*;?\s*$"#).unwrap())
}

fn export_default_decl_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?m)^\s*export\s+default\s+(?:async\s+)?(function|class)\s*(\w+)").unwrap())
}

fn export_default_start_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?m)^\s*export\s+default\s+").unwrap())
}

/// Finds the span of a non-declaration `export default <expr>` statement,
/// from the end of the `export default ` keyword through its terminating
/// `;` (or end of source). Tracks paren/bracket/brace nesting and skips
/// over string/template literals so a multi-line object, array, or
/// call-expression default export isn't cut off at the first newline the
/// way a line-anchored regex capture would be.
fn scan_default_export_expr(source: &str) -> Option<(usize, usize, String)> {
  let m = export_default_start_re().find(source)?;
  let expr_start = m.end();
  let bytes = source.as_bytes();
  let mut i = expr_start;
  let mut depth: i32 = 0;
  let mut end = None;
  while i < bytes.len() {
    let c = bytes[i] as char;
    match c {
      '\'' | '"' | '`' => {
        let quote = c;
        i += 1;
        while i < bytes.len() {
          let c2 = bytes[i] as char;
          if c2 == '\\' {
            i += 2;
            continue;
          }
          i += 1;
          if c2 == quote {
            break;
          }
        }
        continue;
      }
      '(' | '[' | '{' => depth += 1,
      ')' | ']' | '}' => depth -= 1,
      ';' if depth <= 0 => {
        end = Some(i);
        break;
      }
      _ => {}
    }
    i += 1;
  }
  let end = end.unwrap_or(bytes.len());
  let expr = source[expr_start..end].trim().to_string();
  Some((m.start(), if end < bytes.len() { end + 1 } else { end }, expr))
}

fn export_decl_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?m)^(\s*)export\s+((?:async\s+)?function\*?|class|const|let|var)\s+(\w+)").unwrap())
}

fn export_list_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"(?m)^\s*export\s*\{([^}]*)\}\s*;?\s*$"#).unwrap())
}

fn rewrite_binding_list(bindings: &str, spec: &str) -> String {
  let pairs: Vec<String> = bindings
    .split(',')
    .map(|b| b.trim())
    .filter(|b| !b.is_empty())
    .map(|b| match b.split_once(" as ") {
      Some((from, to)) => format!("{}: {}", from.trim(), to.trim()),
      None => b.to_string(),
    })
    .collect();
  format!("const {{ {} }} = require('{}');", pairs.join(", "), spec)
}

fn rewrite_imports(source: &str) -> String {
  let source = import_star_re().replace_all(source, "const $1 = require('$2');");
  let source = import_default_named_re()
    .replace_all(&source, |caps: &regex::Captures| {
      let default_name = &caps[1];
      let named = rewrite_binding_list(&caps[2], &caps[3]);
      format!("const {default_name} = __nodepackDefault(require('{}')); {named}", &caps[3])
    })
    .into_owned();
  let source = import_named_re()
    .replace_all(&source, |caps: &regex::Captures| rewrite_binding_list(&caps[1], &caps[2]))
    .into_owned();
  let source = import_default_re().replace_all(&source, "const $1 = __nodepackDefault(require('$2'));").into_owned();
  import_bare_re().replace_all(&source, "require('$1');").into_owned()
}

/// Collects the names a module exports, not counting `export default`.
fn collect_named_exports(source: &str) -> Vec<String> {
  let mut names = Vec::new();
  for caps in export_decl_re().captures_iter(source) {
    names.push(caps[3].to_string());
  }
  for caps in export_list_re().captures_iter(source) {
    for part in caps[1].split(',') {
      let part = part.trim();
      if part.is_empty() {
        continue;
      }
      let local = part.split(" as ").next().unwrap_or(part).trim();
      if local != "default" {
        names.push(local.to_string());
      }
    }
  }
  names
}

fn strip_export_keyword(source: &str) -> String {
  let source = export_decl_re().replace_all(source, "$1$2 $3").into_owned();
  export_list_re().replace_all(&source, "").into_owned()
}

fn rewrite_default_export(source: &str) -> (String, Option<String>) {
  if let Some(caps) = export_default_decl_re().captures(source) {
    let name = caps[2].to_string();
    let rewritten = export_default_decl_re().replace(source, "$1 $2").into_owned();
    return (rewritten, Some(name));
  }
  if let Some((start, end, expr)) = scan_default_export_expr(source) {
    let mut rewritten = String::with_capacity(source.len() - (end - start));
    rewritten.push_str(&source[..start]);
    rewritten.push_str(&source[end..]);
    return (rewritten, Some(format!("({expr})")));
  }
  (source.to_string(), None)
}

fn dynamic_import_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\bimport\s*\(").unwrap())
}

/// Rewrites dynamic `import(specifier)` expressions to a call against the
/// `__dynamicImport` helper the linker injects into every module wrapper
/// (spec §4.11: "require and dynamic-import share the same cache"),
/// regardless of whether the enclosing module is ESM or CJS.
pub fn rewrite_dynamic_import(source: &str) -> String {
  dynamic_import_re().replace_all(source, "__dynamicImport(").into_owned()
}

/// `__nodepackDefault` unwraps a synthesized CJS-of-ESM namespace the same
/// way Node's ESM/CJS interop does: only `default` matters when the
/// imported module declares itself an ES module.
const DEFAULT_HELPER: &str = "function __nodepackDefault(m) { return (m && m.__esModule && 'default' in m) ? m.default : m; }\n";

/// Rewrites ES-module `source` into CommonJS. The result still closes over
/// `exports`/`require`/`module` the way the linker's function wrapper
/// provides them (spec §4.11 step 4) — the same wrapper used for
/// script-modules, so cycle handling is identical for both formats.
pub fn esm_to_cjs(source: &str) -> String {
  let named = collect_named_exports(source);
  let without_imports = rewrite_imports(source);
  let without_export_kw = strip_export_keyword(&without_imports);
  let (body, default_export) = rewrite_default_export(&without_export_kw);

  let mut out = String::new();
  out.push_str(DEFAULT_HELPER);
  out.push_str(&body);
  out.push_str("\nmodule.exports.__esModule = true;\n");
  for name in named {
    out.push_str(&format!("module.exports.{name} = {name};\n"));
  }
  if let Some(default) = default_export {
    out.push_str(&format!("module.exports.default = {default};\n"));
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rewrites_named_import_and_export_const() {
    let src = "import { add } from './math';\nexport const sum = add(1, 2);\n";
    let out = esm_to_cjs(src);
    assert!(out.contains("const { add } = require('./math');"));
    assert!(out.contains("const sum = add(1, 2);"));
    assert!(out.contains("module.exports.sum = sum;"));
  }

  #[test]
  fn rewrites_default_import_and_default_function_export() {
    let src = "import React from 'react';\nexport default function App() {\n  return React.createElement('div');\n}\n";
    let out = esm_to_cjs(src);
    assert!(out.contains("const React = __nodepackDefault(require('react'));"));
    assert!(out.contains("function App()"));
    assert!(out.contains("module.exports.default = App;"));
  }

  #[test]
  fn rewrites_default_expression_export() {
    let out = esm_to_cjs("export default 3 + 5;");
    assert!(out.contains("module.exports.default = (3 + 5);"));
  }

  #[test]
  fn rewrites_multiline_default_object_export() {
    let src = "export default {\n  a: 1,\n  b: 2,\n};\n";
    let out = esm_to_cjs(src);
    assert!(out.contains("module.exports.default = ({\n  a: 1,\n  b: 2,\n});"), "{out}");
  }

  #[test]
  fn rewrites_export_list() {
    let src = "const a = 1;\nconst b = 2;\nexport { a, b as renamed };\n";
    let out = esm_to_cjs(src);
    assert!(out.contains("module.exports.a = a;"));
    assert!(out.contains("module.exports.renamed = renamed;"));
  }

  #[test]
  fn rewrites_namespace_import() {
    let out = esm_to_cjs("import * as path from 'path';\nexport const sep = path.sep;\n");
    assert!(out.contains("const path = require('path');"));
  }

  #[test]
  fn rewrites_bare_side_effect_import() {
    let out = esm_to_cjs("import 'reflect-metadata';\nexport const x = 1;\n");
    assert!(out.contains("require('reflect-metadata');"));
  }

  #[test]
  fn rewrites_dynamic_import_expression() {
    let out = rewrite_dynamic_import("const mod = await import('./lazy.js');");
    assert_eq!(out, "const mod = await __dynamicImport('./lazy.js');");
  }
}
