// Copyright 2026 the Nodepack authors. MIT license.

//! Public facade (spec §4.12): `initialize`/`execute`/`getFilesystem`/
//! `terminate`, wiring the host capabilities of spec §6 (`fetch`, entropy,
//! clock) through to the engine, npm client, and builtin shims on every
//! `execute` call.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::builtins::crypto::EntropySource;
use crate::builtins::process::{ExitState, ProcessConfig};
use crate::console::{LogSink, OnLog};
use crate::engine::{self, Engine, Value};
use crate::error::{NodepackError, Result};
use crate::module::imports::detect_imports;
use crate::module::linker::Linker;
use crate::npm::client::InstallOptions;
use crate::npm::{Fetcher, NpmClient};
use crate::vfs::{Clock, Vfs};

/// Capabilities a builtin shim needs at install time (spec §6). `fetch` is
/// consumed once into the [`NpmClient`] at construction and `Clock` once
/// into the [`Vfs`]; only `entropy` is still needed live, inside
/// `crypto`'s native closures, so it is the only field carried here.
pub struct HostCapabilities {
  pub entropy: Rc<dyn EntropySource>,
}

/// Threaded through [`Runtime::new`] (spec §2 "Config (ADDED)"): the npm
/// registry base URL plus the three injected host capabilities of §6.
pub struct RuntimeOptions {
  pub registry_base: Option<String>,
  pub fetcher: Box<dyn Fetcher>,
  pub entropy: Rc<dyn EntropySource>,
  pub clock: Box<dyn Clock>,
}

/// `opts` of `execute(source, opts?)` (spec §4.12).
#[derive(Default)]
pub struct ExecuteOptions {
  pub argv: Vec<String>,
  pub env: BTreeMap<String, String>,
  pub on_log: Option<OnLog>,
  pub entry_path: Option<String>,
}

#[derive(Debug)]
pub struct ExecutionResult {
  pub ok: bool,
  pub data: Option<Value>,
  pub error: Option<String>,
  pub logs: Vec<String>,
}

pub struct Runtime {
  engine: Option<Engine>,
  vfs: Rc<Vfs>,
  npm_client: NpmClient,
  caps: Rc<HostCapabilities>,
  sink: LogSink,
}

impl Runtime {
  pub fn new(options: RuntimeOptions) -> Self {
    let registry_base = options.registry_base.unwrap_or_else(NpmClient::default_registry);
    Runtime {
      engine: None,
      vfs: Rc::new(Vfs::with_clock(options.clock)),
      npm_client: NpmClient::new(registry_base, options.fetcher),
      caps: Rc::new(HostCapabilities { entropy: options.entropy }),
      sink: LogSink::new(),
    }
  }

  /// Creates the engine runtime and one default context (spec §4.12).
  /// Builtins and `console`/`process`/`require` are bound per `execute`
  /// call instead, since they close over that call's `argv`/`env`/log
  /// sink rather than the runtime as a whole.
  pub async fn initialize(&mut self) -> Result<()> {
    self.engine = Some(Engine::new()?);
    Ok(())
  }

  /// Writes `source` to a virtual entry path, auto-installs any bare npm
  /// specifiers the import detector finds (spec §4.6), links and
  /// evaluates the entry, and collects its default export or
  /// `module.exports` (spec §4.12).
  pub async fn execute(&mut self, source: &str, opts: ExecuteOptions) -> Result<ExecutionResult> {
    let engine = self.engine.as_ref().ok_or(NodepackError::NotInitialized)?;
    self.sink.clear();

    let entry_path = opts.entry_path.unwrap_or_else(|| "/main.js".to_string());
    self.vfs.write_file(&entry_path, source.as_bytes().to_vec())?;

    for name in detect_imports(source) {
      self.npm_client.install(&self.vfs, &name, "*", InstallOptions::default())?;
    }

    let process_config = Rc::new(ProcessConfig { argv: opts.argv, env: opts.env, cwd: "/".to_string() });
    let exit_state = ExitState::new();
    let vfs = self.vfs.clone();
    let caps = self.caps.clone();
    let sink = self.sink.clone();
    let on_log = opts.on_log;

    let outcome: Result<Value> = engine.with(|ctx| {
      crate::console::install(&ctx, sink.clone(), on_log)?;
      let process_obj = crate::builtins::process::install(&ctx, &process_config, exit_state.clone())?;
      ctx.globals().set("process", process_obj).map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })?;

      let linker = Linker::new(ctx.clone(), vfs, caps, process_config, exit_state);
      let exports = linker.load_entry(&entry_path)?;
      engine::from_js(&ctx, exports)
    });

    let logs = self.sink.logs();
    Ok(match outcome {
      Ok(data) => ExecutionResult { ok: true, data: Some(data), error: None, logs },
      Err(e) => ExecutionResult { ok: false, data: None, error: Some(e.to_string()), logs },
    })
  }

  /// Exposes the VFS for test fixtures (spec §4.12).
  pub fn get_filesystem(&self) -> Rc<Vfs> {
    self.vfs.clone()
  }

  /// Disposes the context and runtime (spec §4.12). Any handles
  /// outstanding at termination are forcibly released since they are all
  /// scoped to the dropped `Engine`.
  pub fn terminate(&mut self) {
    self.engine = None;
  }
}
