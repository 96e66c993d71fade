// Copyright 2026 the Nodepack authors. MIT license.

//! POSIX `path` shim (spec §4.8), regardless of host OS.

use rquickjs::{Ctx, Function, Object};

use crate::error::Result;

pub fn join(parts: &[&str]) -> String {
  let joined = parts.iter().filter(|p| !p.is_empty()).cloned().collect::<Vec<_>>().join("/");
  normalize(&joined)
}

pub fn normalize(path: &str) -> String {
  let is_absolute = path.starts_with('/');
  let mut out: Vec<&str> = Vec::new();
  for seg in path.split('/') {
    match seg {
      "" | "." => {}
      ".." => {
        if out.last().map(|s| *s != "..").unwrap_or(false) {
          out.pop();
        } else if !is_absolute {
          out.push("..");
        }
      }
      other => out.push(other),
    }
  }
  let joined = out.join("/");
  if is_absolute {
    format!("/{joined}")
  } else if joined.is_empty() {
    ".".to_string()
  } else {
    joined
  }
}

pub fn resolve(cwd: &str, parts: &[&str]) -> String {
  let mut current = cwd.to_string();
  for part in parts {
    current = if part.starts_with('/') { part.to_string() } else { join(&[&current, part]) };
  }
  normalize(&current)
}

pub fn basename(path: &str, ext: Option<&str>) -> String {
  let trimmed = path.trim_end_matches('/');
  let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
  match ext {
    Some(e) if !e.is_empty() && base.ends_with(e) && base != e => base[..base.len() - e.len()].to_string(),
    _ => base.to_string(),
  }
}

pub fn dirname(path: &str) -> String {
  let trimmed = path.trim_end_matches('/');
  match trimmed.rfind('/') {
    Some(0) => "/".to_string(),
    Some(i) => trimmed[..i].to_string(),
    None => ".".to_string(),
  }
}

pub fn extname(path: &str) -> String {
  let base = basename(path, None);
  match base.rfind('.') {
    Some(0) => "".to_string(),
    Some(i) => base[i..].to_string(),
    None => "".to_string(),
  }
}

pub fn install<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
  let obj = Object::new(ctx.clone())?;
  obj.set("sep", "/")?;
  obj.set(
    "join",
    Function::new(ctx.clone(), |parts: rquickjs::function::Rest<String>| -> String {
      join(&parts.iter().map(|s| s.as_str()).collect::<Vec<_>>())
    }),
  )?;
  obj.set("normalize", Function::new(ctx.clone(), |p: String| -> String { normalize(&p) }))?;
  obj.set(
    "resolve",
    Function::new(ctx.clone(), |parts: rquickjs::function::Rest<String>| -> String {
      resolve("/", &parts.iter().map(|s| s.as_str()).collect::<Vec<_>>())
    }),
  )?;
  obj.set("basename", Function::new(ctx.clone(), |p: String, ext: rquickjs::function::Opt<String>| -> String { basename(&p, ext.0.as_deref()) }))?;
  obj.set("dirname", Function::new(ctx.clone(), |p: String| -> String { dirname(&p) }))?;
  obj.set("extname", Function::new(ctx.clone(), |p: String| -> String { extname(&p) }))?;
  Ok(obj)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn join_normalizes_posix_style() {
    assert_eq!(join(&["a", "b"]), "a/b");
    assert_eq!(join(&["a", "../b"]), "b");
  }

  #[test]
  fn basename_strips_extension() {
    assert_eq!(basename("/a/b/c.js", None), "c.js");
    assert_eq!(basename("/a/b/c.js", Some(".js")), "c");
  }

  #[test]
  fn dirname_of_root_file_is_root() {
    assert_eq!(dirname("/index.js"), "/");
  }

  #[test]
  fn extname_handles_dotfiles() {
    assert_eq!(extname(".gitignore"), "");
    assert_eq!(extname("index.test.js"), ".js");
  }
}
