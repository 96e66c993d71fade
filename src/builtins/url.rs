// Copyright 2026 the Nodepack authors. MIT license.

//! `url` shim: `URL` and `URLSearchParams` with standard-web semantics
//! (spec §4.8). Parsing/serialization is delegated to the `url` crate; a
//! thin JS prelude wraps the native helpers into guest-visible classes,
//! following the `events` shim's polyfill-over-native-function pattern.

use rquickjs::{Ctx, Function, Object};

use crate::error::{NodepackError, Result};

#[derive(Debug, Clone)]
pub struct UrlComponents {
  pub href: String,
  pub protocol: String,
  pub host: String,
  pub hostname: String,
  pub port: String,
  pub pathname: String,
  pub search: String,
  pub hash: String,
  pub origin: String,
}

pub fn parse_url(input: &str, base: Option<&str>) -> Result<UrlComponents> {
  let parsed = match base {
    Some(b) => {
      let base_url = url::Url::parse(b).map_err(|e| NodepackError::InvalidPath { path: b.to_string(), reason: e.to_string() })?;
      base_url.join(input).map_err(|e| NodepackError::InvalidPath { path: input.to_string(), reason: e.to_string() })?
    }
    None => url::Url::parse(input).map_err(|e| NodepackError::InvalidPath { path: input.to_string(), reason: e.to_string() })?,
  };
  Ok(UrlComponents {
    href: parsed.as_str().to_string(),
    protocol: format!("{}:", parsed.scheme()),
    host: parsed.host_str().map(|h| match parsed.port() {
      Some(p) => format!("{h}:{p}"),
      None => h.to_string(),
    }).unwrap_or_default(),
    hostname: parsed.host_str().unwrap_or_default().to_string(),
    port: parsed.port().map(|p| p.to_string()).unwrap_or_default(),
    pathname: parsed.path().to_string(),
    search: if parsed.query().is_some() { format!("?{}", parsed.query().unwrap()) } else { String::new() },
    hash: parsed.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
    origin: format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or_default()),
  })
}

const PRELUDE: &str = r#"
(function (parseUrl, parseQuery, stringifyQuery) {
  class URLSearchParams {
    constructor(init) {
      this._pairs = typeof init === 'string' ? parseQuery(init) : (init || []);
    }
    get(name) {
      const found = this._pairs.find((p) => p[0] === name);
      return found ? found[1] : null;
    }
    getAll(name) {
      return this._pairs.filter((p) => p[0] === name).map((p) => p[1]);
    }
    set(name, value) {
      this._pairs = this._pairs.filter((p) => p[0] !== name);
      this._pairs.push([name, String(value)]);
    }
    append(name, value) {
      this._pairs.push([name, String(value)]);
    }
    has(name) {
      return this._pairs.some((p) => p[0] === name);
    }
    delete(name) {
      this._pairs = this._pairs.filter((p) => p[0] !== name);
    }
    toString() {
      return stringifyQuery(this._pairs);
    }
    [Symbol.iterator]() {
      return this._pairs[Symbol.iterator]();
    }
  }

  class URL {
    constructor(input, base) {
      const c = parseUrl(input, base || null);
      Object.assign(this, c);
      this.searchParams = new URLSearchParams(this.search.replace(/^\?/, ''));
    }
    toString() {
      return this.href;
    }
    toJSON() {
      return this.href;
    }
  }

  return { URL, URLSearchParams };
})
"#;

pub fn install<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
  let factory: rquickjs::Function = ctx.eval(PRELUDE).map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })?;
  install_with_ctx(ctx, factory)
}

fn install_with_ctx<'js>(ctx: &Ctx<'js>, factory: rquickjs::Function<'js>) -> Result<Object<'js>> {
  let ctx_parse = ctx.clone();
  let parse_fn = Function::new(ctx.clone(), move |input: String, base: rquickjs::function::Opt<String>| -> rquickjs::Result<rquickjs::Object<'js>> {
    let components = parse_url(&input, base.0.as_deref()).map_err(|e| rquickjs::Error::new_from_js_message("TypeError", "value", e.to_string()))?;
    let obj = Object::new(ctx_parse.clone())?;
    obj.set("href", components.href)?;
    obj.set("protocol", components.protocol)?;
    obj.set("host", components.host)?;
    obj.set("hostname", components.hostname)?;
    obj.set("port", components.port)?;
    obj.set("pathname", components.pathname)?;
    obj.set("search", components.search)?;
    obj.set("hash", components.hash)?;
    obj.set("origin", components.origin)?;
    Ok(obj)
  })?;

  let ctx_qparse = ctx.clone();
  let query_parse_fn = Function::new(ctx.clone(), move |input: String| -> rquickjs::Result<rquickjs::Array<'js>> {
    let arr = rquickjs::Array::new(ctx_qparse.clone())?;
    for (i, (k, v)) in crate::builtins::querystring::parse(&input).into_iter().enumerate() {
      let pair = rquickjs::Array::new(ctx_qparse.clone())?;
      pair.set(0, k)?;
      pair.set(1, v)?;
      arr.set(i, pair)?;
    }
    Ok(arr)
  })?;

  let query_stringify_fn = Function::new(ctx.clone(), |pairs: rquickjs::Array| -> rquickjs::Result<String> {
    let mut owned = Vec::new();
    for item in pairs.iter::<rquickjs::Array>() {
      let item = item?;
      let k: String = item.get(0)?;
      let v: String = item.get(1)?;
      owned.push((k, v));
    }
    Ok(crate::builtins::querystring::stringify(&owned))
  })?;

  let result: Object = factory.call((parse_fn, query_parse_fn, query_stringify_fn))?;
  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_host_path_query_and_hash() {
    let c = parse_url("https://example.com:8080/a/b?x=1#frag", None).unwrap();
    assert_eq!(c.protocol, "https:");
    assert_eq!(c.hostname, "example.com");
    assert_eq!(c.port, "8080");
    assert_eq!(c.pathname, "/a/b");
    assert_eq!(c.search, "?x=1");
    assert_eq!(c.hash, "#frag");
  }

  #[test]
  fn resolves_relative_against_base() {
    let c = parse_url("/other", Some("https://example.com/a/b")).unwrap();
    assert_eq!(c.href, "https://example.com/other");
  }
}
