// Copyright 2026 the Nodepack authors. MIT license.

//! Module cache + linking state machine (spec §4.11): `new -> linking ->
//! ready/failed` per resolved path, shared between `require` and dynamic
//! `import()` so both observe a single instance per resolved path. Every
//! module, ES or script, runs through the same CommonJS function wrapper
//! (`crate::module::transform::esm_to_cjs` rewrites ES syntax first), which
//! is what gives cycle handling its Node-compatible "partial exports
//! object" behavior uniformly across both formats.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rquickjs::{CatchResultExt, Ctx, Function, Object, Value as QjsValue};

use crate::builtins::{self};
use crate::error::{NodepackError, Result};
use crate::module::format::{detect_module_format, ModuleFormat};
use crate::module::resolver::{dirname, ModuleResolver, Resolved};
use crate::module::transform;
use crate::runtime::HostCapabilities;
use crate::builtins::process::{ExitState, ProcessConfig};
use crate::vfs::Vfs;

#[derive(Clone)]
enum CacheEntry<'js> {
  Linking(QjsValue<'js>),
  Ready(QjsValue<'js>),
}

/// One linker per [`crate::runtime::Runtime::execute`] call. It is rebuilt
/// fresh every call: module state (spec §5, "Shared resources") only needs
/// to live for the duration of one `execute`, not across calls.
pub struct Linker<'js> {
  ctx: Ctx<'js>,
  vfs: Rc<Vfs>,
  caps: Rc<HostCapabilities>,
  process_config: Rc<ProcessConfig>,
  exit_state: ExitState,
  cache: RefCell<HashMap<String, CacheEntry<'js>>>,
}

fn script_err(e: rquickjs::Error) -> NodepackError {
  NodepackError::Script { message: e.to_string(), stack: None }
}

fn caught_err(caught: rquickjs::CaughtError<'_>) -> NodepackError {
  match caught {
    rquickjs::CaughtError::Exception(exc) => {
      let message = exc.message().unwrap_or_else(|| "unknown script error".to_string());
      let stack = exc.stack();
      NodepackError::Script { message, stack }
    }
    other => NodepackError::Script { message: other.to_string(), stack: None },
  }
}

fn to_js_err(e: NodepackError) -> rquickjs::Error {
  rquickjs::Error::new_from_js_message("Error", "value", e.to_string())
}

impl<'js> Linker<'js> {
  pub fn new(ctx: Ctx<'js>, vfs: Rc<Vfs>, caps: Rc<HostCapabilities>, process_config: Rc<ProcessConfig>, exit_state: ExitState) -> Rc<Self> {
    Rc::new(Linker { ctx, vfs, caps, process_config, exit_state, cache: RefCell::new(HashMap::new()) })
  }

  /// Loads the entry module at `path` and returns its exports (spec
  /// §4.12: `execute` "collects the default export or script
  /// `module.exports`").
  pub fn load_entry(self: &Rc<Self>, path: &str) -> Result<QjsValue<'js>> {
    self.load_path(path)
  }

  /// `require(specifier)` resolved relative to `referrer` (an absolute VFS
  /// path), or to `/` for the entry module.
  pub fn require(self: &Rc<Self>, specifier: &str, referrer: Option<&str>) -> Result<QjsValue<'js>> {
    if let Some(rest) = specifier.strip_prefix("node:") {
      return self.load_builtin(rest);
    }
    if builtins::ALL.contains(&specifier) {
      return self.load_builtin(specifier);
    }
    let resolved = {
      let resolver = ModuleResolver::new(&self.vfs);
      resolver.resolve(specifier, referrer, false)?
    };
    match resolved {
      Resolved::Builtin(name) => self.load_builtin(&name),
      Resolved::Path(path) => self.load_path(&path),
    }
  }

  fn load_builtin(self: &Rc<Self>, name: &str) -> Result<QjsValue<'js>> {
    let obj = builtins::create_exports(&self.ctx, name, &self.vfs, &self.caps, &self.process_config, self.exit_state.clone())?;
    Ok(obj.into_value())
  }

  fn load_path(self: &Rc<Self>, path: &str) -> Result<QjsValue<'js>> {
    if let Some(entry) = self.cache.borrow().get(path) {
      let value = match entry {
        CacheEntry::Linking(v) => v.clone(),
        CacheEntry::Ready(v) => v.clone(),
      };
      return Ok(value);
    }

    let source = self.vfs.read_file_string(path)?;
    let format = detect_module_format(&source);
    let body = match format {
      ModuleFormat::Esm => transform::esm_to_cjs(&source),
      ModuleFormat::Cjs => source,
    };
    let body = transform::rewrite_dynamic_import(&body);

    let module_obj = Object::new(self.ctx.clone()).map_err(script_err)?;
    let exports_obj = Object::new(self.ctx.clone()).map_err(script_err)?;
    module_obj.set("exports", exports_obj.clone()).map_err(script_err)?;

    // Installed *before* the body runs, in `linking` state, so a cyclic
    // `require` of this same path gets the same (possibly still-empty)
    // exports object reference rather than recursing forever.
    let partial: QjsValue = module_obj.get("exports").map_err(script_err)?;
    self.cache.borrow_mut().insert(path.to_string(), CacheEntry::Linking(partial));

    match self.evaluate_wrapped(path, &body, &module_obj, &exports_obj) {
      Ok(()) => {
        let final_exports: QjsValue = module_obj.get("exports").map_err(script_err)?;
        self.cache.borrow_mut().insert(path.to_string(), CacheEntry::Ready(final_exports.clone()));
        Ok(final_exports)
      }
      Err(e) => {
        self.cache.borrow_mut().remove(path);
        Err(e)
      }
    }
  }

  fn evaluate_wrapped(self: &Rc<Self>, path: &str, body: &str, module_obj: &Object<'js>, exports_obj: &Object<'js>) -> Result<()> {
    let wrapped = format!(
      "(function (exports, require, module, __filename, __dirname, __requireAsync) {{\n\
         function __dynamicImport(specifier) {{\n\
           try {{ return Promise.resolve(__requireAsync(specifier)); }}\n\
           catch (e) {{ return Promise.reject(e); }}\n\
         }}\n\
         {body}\n\
       }})"
    );
    let mut opts = rquickjs::context::EvalOptions::default();
    opts.global = true;
    opts.strict = false;
    opts.backtrace_barrier = false;
    let wrapper_fn: Function = self.ctx.eval_with_options(wrapped, opts).catch(&self.ctx).map_err(caught_err)?;

    let linker = self.clone();
    let referrer = path.to_string();
    let require_fn = Function::new(self.ctx.clone(), move |specifier: String| -> rquickjs::Result<QjsValue<'js>> {
      linker.require(&specifier, Some(&referrer)).map_err(to_js_err)
    })
    .map_err(script_err)?;

    let linker_async = self.clone();
    let referrer_async = path.to_string();
    let require_async_fn = Function::new(self.ctx.clone(), move |specifier: String| -> rquickjs::Result<QjsValue<'js>> {
      linker_async.require(&specifier, Some(&referrer_async)).map_err(to_js_err)
    })
    .map_err(script_err)?;

    let dir = dirname(path);
    wrapper_fn
      .call::<_, ()>((exports_obj.clone(), require_fn, module_obj.clone(), path.to_string(), dir, require_async_fn))
      .catch(&self.ctx)
      .map_err(caught_err)
  }
}
