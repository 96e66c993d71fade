// Copyright 2026 the Nodepack authors. MIT license.

//! Guest `console.*` capture (spec §4.9), grounded on the `Console` class
//! in `LemonHX-Xmas.JS/modules/src/console.rs` but simplified: rather than
//! a `#[rquickjs::class]`, `console` is a plain object whose methods close
//! over the shared log sink, since nodepack only needs capture - not
//! terminal formatting.

use std::cell::RefCell;
use std::rc::Rc;

use rquickjs::{Ctx, Function, Object, Value as QjsValue};

use crate::error::Result;

pub type OnLog = Rc<dyn Fn(&str, &str)>;

#[derive(Clone, Default)]
pub struct LogSink {
  records: Rc<RefCell<Vec<String>>>,
}

impl LogSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn clear(&self) {
    self.records.borrow_mut().clear();
  }

  pub fn push(&self, message: String) {
    self.records.borrow_mut().push(message);
  }

  pub fn logs(&self) -> Vec<String> {
    self.records.borrow().clone()
  }
}

/// Stringifies guest arguments with space separators, matching
/// `util.format`'s plain form (spec §4.9).
pub fn format_args<'js>(ctx: &Ctx<'js>, args: &[QjsValue<'js>]) -> Result<String> {
  let mut parts = Vec::with_capacity(args.len());
  for arg in args {
    parts.push(crate::builtins::util::format_arg_plain(ctx, arg)?);
  }
  Ok(parts.join(" "))
}

/// Installs `console.{log,warn,error,info,debug}` into the context globals.
pub fn install<'js>(ctx: &Ctx<'js>, sink: LogSink, on_log: Option<OnLog>) -> Result<()> {
  let console = Object::new(ctx.clone())?;
  for level in ["log", "warn", "error", "info", "debug"] {
    let sink = sink.clone();
    let on_log = on_log.clone();
    let level_owned = level.to_string();
    let func = Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: rquickjs::function::Rest<QjsValue<'js>>| -> rquickjs::Result<()> {
      let message = format_args(&ctx, &args)
        .map_err(|e| rquickjs::Error::new_from_js_message("Error", "value", e.to_string()))?;
      sink.push(message.clone());
      if let Some(cb) = &on_log {
        cb(&level_owned, &message);
      }
      Ok(())
    })?;
    console.set(level, func)?;
  }
  ctx.globals().set("console", console)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn log_sink_preserves_order() {
    let sink = LogSink::new();
    sink.push("a".to_string());
    sink.push("b".to_string());
    assert_eq!(sink.logs(), vec!["a".to_string(), "b".to_string()]);
  }

  #[test]
  fn clear_empties_sink() {
    let sink = LogSink::new();
    sink.push("a".to_string());
    sink.clear();
    assert!(sink.logs().is_empty());
  }
}
