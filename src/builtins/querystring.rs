// Copyright 2026 the Nodepack authors. MIT license.

//! `querystring` shim (spec §4.8): `parse`, `stringify`, `escape`
//! (space -> `+`), `unescape` (`+` -> space).

use rquickjs::{Ctx, Function, Object};

use crate::error::Result;

pub fn escape(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for byte in input.bytes() {
    match byte {
      b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' | b'-' | b'.' | b'_' | b'~' => out.push(byte as char),
      b' ' => out.push('+'),
      _ => out.push_str(&format!("%{byte:02X}")),
    }
  }
  out
}

pub fn unescape(input: &str) -> String {
  let replaced = input.replace('+', " ");
  let bytes = replaced.as_bytes();
  let mut out = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'%' && i + 2 < bytes.len() {
      if let Ok(value) = u8::from_str_radix(&replaced[i + 1..i + 3], 16) {
        out.push(value);
        i += 3;
        continue;
      }
    }
    out.push(bytes[i]);
    i += 1;
  }
  String::from_utf8_lossy(&out).into_owned()
}

pub fn parse(input: &str) -> Vec<(String, String)> {
  let trimmed = input.trim_start_matches('?');
  if trimmed.is_empty() {
    return Vec::new();
  }
  trimmed
    .split('&')
    .filter(|pair| !pair.is_empty())
    .map(|pair| match pair.split_once('=') {
      Some((k, v)) => (unescape(k), unescape(v)),
      None => (unescape(pair), String::new()),
    })
    .collect()
}

pub fn stringify(pairs: &[(String, String)]) -> String {
  pairs.iter().map(|(k, v)| format!("{}={}", escape(k), escape(v))).collect::<Vec<_>>().join("&")
}

pub fn install<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
  let obj = Object::new(ctx.clone())?;
  obj.set("escape", Function::new(ctx.clone(), |s: String| -> String { escape(&s) }))?;
  obj.set("unescape", Function::new(ctx.clone(), |s: String| -> String { unescape(&s) }))?;
  obj.set(
    "parse",
    Function::new(ctx.clone(), move |ctx: Ctx<'js>, s: String| -> rquickjs::Result<Object<'js>> {
      let result = Object::new(ctx)?;
      for (k, v) in parse(&s) {
        result.set(k, v)?;
      }
      Ok(result)
    }),
  )?;
  obj.set(
    "stringify",
    Function::new(ctx.clone(), |obj: Object<'js>| -> rquickjs::Result<String> {
      let mut pairs = Vec::new();
      for entry in obj.props::<String, String>() {
        let (k, v) = entry?;
        pairs.push((k, v));
      }
      Ok(stringify(&pairs))
    }),
  )?;
  Ok(obj)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escape_converts_space_to_plus() {
    assert_eq!(escape("a b"), "a+b");
  }

  #[test]
  fn unescape_converts_plus_to_space() {
    assert_eq!(unescape("a+b"), "a b");
  }

  #[test]
  fn parse_then_stringify_round_trips() {
    let pairs = parse("a=1&b=2");
    assert_eq!(pairs, vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
    assert_eq!(stringify(&pairs), "a=1&b=2");
  }

  #[test]
  fn parse_handles_percent_encoding() {
    let pairs = parse("q=hello%20world");
    assert_eq!(pairs, vec![("q".to_string(), "hello world".to_string())]);
  }
}
