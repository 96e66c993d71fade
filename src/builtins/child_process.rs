// Copyright 2026 the Nodepack authors. MIT license.

//! `child_process` shim (spec §4.8, Open Question): spawning a real OS
//! process is out of scope for a sandboxed runtime, so every entry point
//! returns a shape-compatible stub (`.stdout`, `.stderr`, `.on`) whose
//! callbacks are never invoked, rather than silently dropping the import.

use rquickjs::{Ctx, Object};

use crate::error::{NodepackError, Result};

const PRELUDE: &str = r#"
(function (EventEmitter) {
  function makeChildStub() {
    const child = new EventEmitter();
    child.stdout = new EventEmitter();
    child.stderr = new EventEmitter();
    child.stdin = { write() {}, end() {} };
    child.pid = -1;
    child.killed = false;
    child.kill = () => { child.killed = true; return true; };
    return child;
  }
  return {
    spawn: () => makeChildStub(),
    fork: () => makeChildStub(),
    exec: (command, options, callback) => {
      const cb = typeof options === 'function' ? options : callback;
      return makeChildStub();
    },
    execFile: (file, args, options, callback) => {
      return makeChildStub();
    },
    // Real execSync returns the child's stdout (a Buffer, or a string when
    // `encoding` is set) rather than a child-process handle; the sandbox has
    // no output to return, so this is an empty result of the same shape.
    execSync: (command, options) => (options && options.encoding ? '' : new Uint8Array(0)),
  };
})
"#;

pub fn install<'js>(ctx: &Ctx<'js>, event_emitter: rquickjs::Value<'js>) -> Result<Object<'js>> {
  let factory: rquickjs::Function = ctx.eval(PRELUDE).map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })?;
  let result: Object = factory.call((event_emitter,))?;
  Ok(result)
}
