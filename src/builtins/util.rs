// Copyright 2026 the Nodepack authors. MIT license.

//! `util` shim (spec §4.8): `inspect`, `format`, `types.*` predicates.
//! `inspect_value` (`util.inspect`) renders JSON pretty-printed, matching
//! the spec's builtin table; `format_arg_plain` is the separate, plainer
//! stringification the `console` shim uses for its arguments (spec §4.9:
//! "the same rules as `util.format`'s plain form"), since Node's
//! `console.log` does not quote a top-level string argument the way
//! `JSON.stringify` would.

use rquickjs::{Ctx, Function, FromJs, Object, Value as QjsValue};

use crate::error::{NodepackError, Result};

/// `util.inspect(v)`: JSON.stringify(v, null, 2)-equivalent. `undefined`
/// and functions have no JSON representation; they render as the literal
/// word `undefined` at the top level and as `null` inside an array
/// (matching `JSON.stringify`'s own array-hole behavior) or are omitted
/// entirely as an object property (matching `JSON.stringify`'s own
/// undefined-valued-property behavior).
pub fn inspect_value<'js>(ctx: &Ctx<'js>, value: &QjsValue<'js>) -> Result<String> {
  inspect_depth(ctx, value, 0, 0)
}

fn json_string_escape(s: &str) -> String {
  let mut out = String::with_capacity(s.len() + 2);
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

fn indent(level: usize) -> String {
  "  ".repeat(level)
}

fn is_json_hole<'js>(ctx: &Ctx<'js>, v: &QjsValue<'js>) -> bool {
  v.is_undefined() || Function::from_js(ctx, v.clone()).is_ok()
}

// Walks the same accessor chain as `crate::engine::from_js` (null/bool/
// number/string/array/object, in that order) rather than matching on
// `rquickjs::Type`, so this stays grounded on the one guest-value
// conversion already proven out in this codebase.
fn inspect_depth<'js>(ctx: &Ctx<'js>, value: &QjsValue<'js>, depth: usize, level: usize) -> Result<String> {
  if depth > 6 {
    return Ok("...".to_string());
  }
  if value.is_null() {
    return Ok("null".to_string());
  }
  if value.is_undefined() || Function::from_js(ctx, value.clone()).is_ok() {
    return Ok("undefined".to_string());
  }
  if let Some(b) = value.as_bool() {
    return Ok(b.to_string());
  }
  if let Some(n) = value.as_float() {
    return Ok(format_number(n));
  }
  if let Some(n) = value.as_int() {
    return Ok(format_number(n as f64));
  }
  if let Some(s) = value.as_string() {
    let s = s.to_string().map_err(script_err)?;
    return Ok(json_string_escape(&s));
  }
  if let Some(arr) = value.as_array() {
    let mut items = Vec::new();
    for item in arr.iter::<QjsValue>() {
      let item = item.map_err(script_err)?;
      if is_json_hole(ctx, &item) {
        items.push("null".to_string());
      } else {
        items.push(inspect_depth(ctx, &item, depth + 1, level + 1)?);
      }
    }
    if items.is_empty() {
      return Ok("[]".to_string());
    }
    let inner = indent(level + 1);
    return Ok(format!("[\n{inner}{}\n{}]", items.join(&format!(",\n{inner}")), indent(level)));
  }
  if let Some(obj) = value.as_object() {
    let mut items = Vec::new();
    for prop in obj.props::<String, QjsValue>() {
      let (key, v) = prop.map_err(script_err)?;
      if is_json_hole(ctx, &v) {
        continue;
      }
      items.push(format!("{}: {}", json_string_escape(&key), inspect_depth(ctx, &v, depth + 1, level + 1)?));
    }
    if items.is_empty() {
      return Ok("{}".to_string());
    }
    let inner = indent(level + 1);
    return Ok(format!("{{\n{inner}{}\n{}}}", items.join(&format!(",\n{inner}")), indent(level)));
  }
  Ok("undefined".to_string())
}

/// The plain, unquoted-at-top-level stringification `console.*` uses
/// (spec §4.9), distinct from `util.inspect`'s JSON rendering.
pub fn format_arg_plain<'js>(ctx: &Ctx<'js>, value: &QjsValue<'js>) -> Result<String> {
  plain_depth(ctx, value, 0)
}

fn plain_depth<'js>(ctx: &Ctx<'js>, value: &QjsValue<'js>, depth: usize) -> Result<String> {
  if depth > 6 {
    return Ok("...".to_string());
  }
  if value.is_null() {
    return Ok("null".to_string());
  }
  if value.is_undefined() {
    return Ok("undefined".to_string());
  }
  if let Some(b) = value.as_bool() {
    return Ok(b.to_string());
  }
  if let Some(n) = value.as_float() {
    return Ok(format_number(n));
  }
  if let Some(n) = value.as_int() {
    return Ok(format_number(n as f64));
  }
  if let Some(s) = value.as_string() {
    let s = s.to_string().map_err(script_err)?;
    return Ok(if depth == 0 { s } else { format!("'{s}'") });
  }
  if let Some(arr) = value.as_array() {
    let mut parts = Vec::new();
    for item in arr.iter::<QjsValue>() {
      parts.push(plain_depth(ctx, &item.map_err(script_err)?, depth + 1)?);
    }
    return Ok(format!("[ {} ]", parts.join(", ")));
  }
  if Function::from_js(ctx, value.clone()).is_ok() {
    return Ok("[Function]".to_string());
  }
  if let Some(obj) = value.as_object() {
    let mut parts = Vec::new();
    for prop in obj.props::<String, QjsValue>() {
      let (key, v) = prop.map_err(script_err)?;
      parts.push(format!("{key}: {}", plain_depth(ctx, &v, depth + 1)?));
    }
    return Ok(format!("{{ {} }}", parts.join(", ")));
  }
  Ok("undefined".to_string())
}

fn format_number(n: f64) -> String {
  if n.fract() == 0.0 && n.abs() < 1e15 {
    format!("{}", n as i64)
  } else {
    n.to_string()
  }
}

fn script_err(e: rquickjs::Error) -> NodepackError {
  NodepackError::Script { message: e.to_string(), stack: None }
}

pub fn format(fmt: &str, args: &[String]) -> String {
  let mut out = String::with_capacity(fmt.len());
  let mut chars = fmt.chars().peekable();
  let mut arg_idx = 0;
  while let Some(c) = chars.next() {
    if c == '%' {
      match chars.peek() {
        Some('s') | Some('d') | Some('i') | Some('j') | Some('o') | Some('O') => {
          let spec = chars.next().unwrap();
          if let Some(arg) = args.get(arg_idx) {
            arg_idx += 1;
            out.push_str(&coerce_for_spec(spec, arg));
          } else {
            out.push('%');
            out.push(spec);
          }
        }
        Some('%') => {
          chars.next();
          out.push('%');
        }
        _ => out.push('%'),
      }
    } else {
      out.push(c);
    }
  }
  for extra in &args[arg_idx..] {
    out.push(' ');
    out.push_str(extra);
  }
  out
}

fn coerce_for_spec(spec: char, arg: &str) -> String {
  match spec {
    'd' | 'i' => arg.parse::<f64>().map(|n| format!("{}", n.trunc() as i64)).unwrap_or_else(|_| "NaN".to_string()),
    _ => arg.to_string(),
  }
}

pub fn install<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
  let obj = Object::new(ctx.clone())?;
  let ctx_inspect = ctx.clone();
  obj.set(
    "inspect",
    Function::new(ctx.clone(), move |v: QjsValue<'js>| -> rquickjs::Result<String> { inspect_value(&ctx_inspect, &v).map_err(|e| rquickjs::Error::new_from_js_message("TypeError", "value", e.to_string())) }),
  )?;
  obj.set(
    "format",
    Function::new(ctx.clone(), |fmt: String, rest: rquickjs::function::Rest<String>| -> String { format(&fmt, &rest.0) }),
  )?;

  let types = Object::new(ctx.clone())?;
  types.set("isArray", Function::new(ctx.clone(), |v: QjsValue| -> bool { v.as_array().is_some() }))?;
  types.set("isDate", Function::new(ctx.clone(), |v: QjsValue| -> bool { v.as_object().map(|o| o.get::<_, rquickjs::Function>("getTime").is_ok()).unwrap_or(false) }))?;
  types.set("isRegExp", Function::new(ctx.clone(), |v: QjsValue| -> bool { v.as_object().map(|o| o.get::<_, rquickjs::Function>("test").is_ok()).unwrap_or(false) }))?;
  let ctx_fn = ctx.clone();
  types.set("isFunction", Function::new(ctx.clone(), move |v: QjsValue<'js>| -> bool { Function::from_js(&ctx_fn, v).is_ok() }))?;
  types.set("isString", Function::new(ctx.clone(), |v: QjsValue| -> bool { v.as_string().is_some() }))?;
  types.set("isNumber", Function::new(ctx.clone(), |v: QjsValue| -> bool { v.as_float().is_some() || v.as_int().is_some() }))?;
  types.set("isBoolean", Function::new(ctx.clone(), |v: QjsValue| -> bool { v.as_bool().is_some() }))?;
  types.set("isNull", Function::new(ctx.clone(), |v: QjsValue| -> bool { v.is_null() }))?;
  types.set("isUndefined", Function::new(ctx.clone(), |v: QjsValue| -> bool { v.is_undefined() }))?;
  obj.set("types", types)?;

  Ok(obj)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_substitutes_string_and_number_specs() {
    assert_eq!(format("%s has %d items", &["cart".to_string(), "3".to_string()]), "cart has 3 items");
  }

  #[test]
  fn format_appends_extra_args() {
    assert_eq!(format("%s", &["a".to_string(), "b".to_string()]), "a b");
  }

  #[test]
  fn format_handles_percent_literal() {
    assert_eq!(format("100%%", &[]), "100%");
  }

  #[test]
  fn format_truncates_decimal_for_d_spec() {
    assert_eq!(format("%d", &["3.9".to_string()]), "3");
  }

  #[test]
  fn inspect_renders_object_as_indented_json() {
    rquickjs::Runtime::new().and_then(|rt| rquickjs::Context::full(&rt)).unwrap().with(|ctx| {
      let value: QjsValue = ctx.eval("({ a: 1, b: 'x' })").unwrap();
      let out = inspect_value(&ctx, &value).unwrap();
      assert_eq!(out, "{\n  \"a\": 1,\n  \"b\": \"x\"\n}");
    });
  }

  #[test]
  fn inspect_quotes_top_level_strings() {
    rquickjs::Runtime::new().and_then(|rt| rquickjs::Context::full(&rt)).unwrap().with(|ctx| {
      let value: QjsValue = ctx.eval("'hi'").unwrap();
      assert_eq!(inspect_value(&ctx, &value).unwrap(), "\"hi\"");
    });
  }

  #[test]
  fn format_arg_plain_leaves_top_level_strings_unquoted() {
    rquickjs::Runtime::new().and_then(|rt| rquickjs::Context::full(&rt)).unwrap().with(|ctx| {
      let value: QjsValue = ctx.eval("'hi'").unwrap();
      assert_eq!(format_arg_plain(&ctx, &value).unwrap(), "hi");
    });
  }
}
