// Copyright 2026 the Nodepack authors. MIT license.

//! `fs` shim (spec §4.8): the synchronous Node `fs` surface over the
//! in-memory [`crate::vfs::Vfs`]. There is no async I/O in this runtime
//! (spec §5), so only the `*Sync`-shaped calls are exposed, under their
//! plain (non-`Sync`-suffixed) Node names — matching how Node itself
//! names the sync variants when `fs` is required without a callback.

use std::rc::Rc;

use rquickjs::{Array, Ctx, Function, IntoJs, Object};

use crate::error::Result;
use crate::vfs::{constants, Vfs};

fn to_js_err(e: crate::error::NodepackError) -> rquickjs::Error {
  rquickjs::Error::new_from_js_message("Error", "value", e.to_string())
}

// `write`/`appendFileSync` accept either a string or a Buffer. The
// normalization from `Buffer` (a `Uint8Array` subclass) into a plain array
// of byte numbers happens in this prelude, the same
// `Array.from`-before-crossing-into-Rust trick the `crypto` shim uses.
const NORMALIZE_PRELUDE: &str = r#"
(function (writeFileRaw, appendFileRaw) {
  function normalize(data) {
    return typeof data === 'string' ? data : Array.from(data);
  }
  return {
    writeFileSync: (path, data) => writeFileRaw(path, normalize(data)),
    appendFileSync: (path, data) => appendFileRaw(path, normalize(data)),
  };
})
"#;

enum StringOrBytes {
  Text(String),
  Bytes(Vec<u8>),
}

impl<'js> rquickjs::FromJs<'js> for StringOrBytes {
  fn from_js(ctx: &Ctx<'js>, value: rquickjs::Value<'js>) -> rquickjs::Result<Self> {
    if let Some(s) = value.as_string() {
      return Ok(Self::Text(s.to_string()?));
    }
    Ok(Self::Bytes(Vec::<u8>::from_js(ctx, value)?))
  }
}

impl StringOrBytes {
  fn into_bytes(self) -> Vec<u8> {
    match self {
      Self::Text(s) => s.into_bytes(),
      Self::Bytes(b) => b,
    }
  }
}

pub fn install<'js>(ctx: &Ctx<'js>, vfs: Rc<Vfs>) -> Result<Object<'js>> {
  let obj = Object::new(ctx.clone())?;

  let constants_obj = Object::new(ctx.clone())?;
  constants_obj.set("F_OK", constants::F_OK)?;
  constants_obj.set("R_OK", constants::R_OK)?;
  constants_obj.set("W_OK", constants::W_OK)?;
  constants_obj.set("X_OK", constants::X_OK)?;
  obj.set("constants", constants_obj)?;

  // `readFileSync` returns a UTF-8 string when `encoding` names a text
  // encoding, and a plain array of byte values otherwise (a thin stand-in
  // for a Buffer instance -- see crate::builtins::buffer for the real one).
  let v = vfs.clone();
  obj.set(
    "readFileSync",
    Function::new(ctx.clone(), move |ctx: Ctx<'js>, path: String, encoding: rquickjs::function::Opt<String>| -> rquickjs::Result<rquickjs::Value<'js>> {
      let bytes = v.read_file_bytes(&path).map_err(to_js_err)?;
      match encoding.0.as_deref() {
        Some("utf8") | Some("utf-8") => String::from_utf8_lossy(&bytes).into_owned().into_js(&ctx),
        _ => bytes.into_js(&ctx),
      }
    }),
  )?;

  let factory: rquickjs::Function = ctx.eval(NORMALIZE_PRELUDE).map_err(|e| crate::error::NodepackError::Script { message: e.to_string(), stack: None })?;

  let v = vfs.clone();
  let write_raw = Function::new(ctx.clone(), move |path: String, data: StringOrBytes| -> rquickjs::Result<()> { v.write_file(&path, data.into_bytes()).map_err(to_js_err) })?;

  let v = vfs.clone();
  let append_raw = Function::new(ctx.clone(), move |path: String, data: StringOrBytes| -> rquickjs::Result<()> { v.append_file(&path, &data.into_bytes()).map_err(to_js_err) })?;

  let normalized: Object = factory.call((write_raw, append_raw))?;
  obj.set("writeFileSync", normalized.get::<_, rquickjs::Value>("writeFileSync")?)?;
  obj.set("appendFileSync", normalized.get::<_, rquickjs::Value>("appendFileSync")?)?;

  let v = vfs.clone();
  obj.set(
    "existsSync",
    Function::new(ctx.clone(), move |path: String| -> bool { v.exists(&path) }),
  )?;

  let v = vfs.clone();
  obj.set(
    "mkdirSync",
    Function::new(ctx.clone(), move |path: String, options: rquickjs::function::Opt<Object>| -> rquickjs::Result<()> {
      let recursive = options.0.as_ref().and_then(|o| o.get::<_, bool>("recursive").ok()).unwrap_or(false);
      v.mkdir(&path, recursive).map_err(to_js_err)
    }),
  )?;

  let v = vfs.clone();
  obj.set(
    "readdirSync",
    Function::new(ctx.clone(), move |ctx: Ctx<'js>, path: String| -> rquickjs::Result<Array<'js>> {
      let entries = v.readdir(&path).map_err(to_js_err)?;
      let arr = Array::new(ctx)?;
      for (i, name) in entries.into_iter().enumerate() {
        arr.set(i, name)?;
      }
      Ok(arr)
    }),
  )?;

  let v = vfs.clone();
  obj.set(
    "statSync",
    Function::new(ctx.clone(), move |ctx: Ctx<'js>, path: String| -> rquickjs::Result<Object<'js>> {
      let stat = v.stat(&path).map_err(to_js_err)?;
      let result = Object::new(ctx.clone())?;
      result.set("size", stat.size)?;
      result.set("mode", stat.mode)?;
      result.set("mtime", stat.mtime.clone())?;
      let is_file = stat.is_file;
      let is_dir = stat.is_dir;
      result.set("isFile", Function::new(ctx.clone(), move || -> bool { is_file }))?;
      result.set("isDirectory", Function::new(ctx, move || -> bool { is_dir }))?;
      Ok(result)
    }),
  )?;

  obj.set("lstatSync", obj.get::<_, rquickjs::Value>("statSync")?)?;

  let v = vfs.clone();
  obj.set(
    "unlinkSync",
    Function::new(ctx.clone(), move |path: String| -> rquickjs::Result<()> { v.unlink(&path).map_err(to_js_err) }),
  )?;

  let v = vfs.clone();
  obj.set(
    "rmdirSync",
    Function::new(ctx.clone(), move |path: String| -> rquickjs::Result<()> { v.rmdir(&path).map_err(to_js_err) }),
  )?;

  let v = vfs.clone();
  obj.set(
    "rmSync",
    Function::new(ctx.clone(), move |path: String, options: rquickjs::function::Opt<Object>| -> rquickjs::Result<()> {
      let recursive = options.0.as_ref().and_then(|o| o.get::<_, bool>("recursive").ok()).unwrap_or(false);
      v.rm(&path, recursive).map_err(to_js_err)
    }),
  )?;

  let v = vfs.clone();
  obj.set(
    "renameSync",
    Function::new(ctx.clone(), move |from: String, to: String| -> rquickjs::Result<()> { v.rename(&from, &to).map_err(to_js_err) }),
  )?;

  let v = vfs.clone();
  obj.set(
    "copyFileSync",
    Function::new(ctx.clone(), move |from: String, to: String| -> rquickjs::Result<()> { v.copy_file(&from, &to).map_err(to_js_err) }),
  )?;

  let v = vfs.clone();
  obj.set(
    "accessSync",
    Function::new(ctx.clone(), move |path: String, mode: rquickjs::function::Opt<i32>| -> rquickjs::Result<()> {
      v.access(&path, mode.0.unwrap_or(constants::F_OK)).map_err(to_js_err)
    }),
  )?;

  let v = vfs;
  obj.set(
    "realpathSync",
    Function::new(ctx.clone(), move |path: String| -> rquickjs::Result<String> { v.realpath(&path).map_err(to_js_err) }),
  )?;

  Ok(obj)
}
