// Copyright 2026 the Nodepack authors. MIT license.

//! `process` shim (spec §4.8): `argv`, `env`, `platform`, `version`,
//! `cwd()`, `exit(code)`. `exit` only marks termination state on the host
//! capabilities bundle; it never tears down the embedding process.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rquickjs::{Array, Ctx, Function, Object};

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct ProcessConfig {
  pub argv: Vec<String>,
  pub env: BTreeMap<String, String>,
  pub cwd: String,
}

#[derive(Clone, Default)]
pub struct ExitState(Rc<Cell<Option<i32>>>);

impl ExitState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn code(&self) -> Option<i32> {
    self.0.get()
  }
}

pub const PLATFORM: &str = "nodepack";
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

pub fn install<'js>(ctx: &Ctx<'js>, config: &ProcessConfig, exit_state: ExitState) -> Result<Object<'js>> {
  let obj = Object::new(ctx.clone())?;

  let argv = Array::new(ctx.clone())?;
  for (i, arg) in config.argv.iter().enumerate() {
    argv.set(i, arg.clone())?;
  }
  obj.set("argv", argv)?;

  let env = Object::new(ctx.clone())?;
  for (k, v) in &config.env {
    env.set(k, v.clone())?;
  }
  obj.set("env", env)?;

  obj.set("platform", PLATFORM)?;
  obj.set("version", VERSION)?;

  let cwd = config.cwd.clone();
  obj.set("cwd", Function::new(ctx.clone(), move || -> String { cwd.clone() }))?;

  obj.set(
    "exit",
    Function::new(ctx.clone(), move |code: rquickjs::function::Opt<i32>| {
      exit_state.0.set(Some(code.0.unwrap_or(0)));
    }),
  )?;

  Ok(obj)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exit_state_starts_unset() {
    let state = ExitState::new();
    assert_eq!(state.code(), None);
  }
}
