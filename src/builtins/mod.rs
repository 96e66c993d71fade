// Copyright 2026 the Nodepack authors. MIT license.

//! Host-shim standard library (spec §4.8), grounded on the builtin module
//! set enumerated in `LemonHX-Xmas.JS/modules/src/module/module_builder.rs`
//! (`path`, `events`/`event`, `buffer`, `crypto`, `fs`, `child_process`, …).
//! Each shim is reachable both by bare specifier (`'fs'`) and the `node:`
//! scheme (spec §4.7 step 3); the linker resolves both forms to the same
//! [`crate::module::resolver::Resolved::Builtin`] variant and calls
//! [`create_exports`] to build the guest-visible object.

pub mod buffer;
pub mod child_process;
pub mod crypto;
pub mod events;
pub mod fs;
pub mod module_builtin;
pub mod path;
pub mod process;
pub mod querystring;
pub mod stream;
pub mod url;
pub mod util;

use std::rc::Rc;

use rquickjs::{Ctx, Object};

use crate::builtins::process::{ExitState, ProcessConfig};
use crate::error::{NodepackError, Result};
use crate::runtime::HostCapabilities;
use crate::vfs::Vfs;

/// Builds the guest-visible exports object for a builtin named `name`.
/// Unknown names are a `ModuleNotFound` rather than a panic, so a `node:`
/// specifier for a module nodepack doesn't implement fails the same way
/// resolution failures do elsewhere.
///
/// `stream` and `child_process` both hand their emitted objects an
/// `EventEmitter` constructor to extend (spec §4.8: both shims are
/// built on top of `events`), so this builds that constructor once and
/// passes it down rather than each shim re-installing `events` itself.
pub fn create_exports<'js>(
  ctx: &Ctx<'js>,
  name: &str,
  vfs: &Rc<Vfs>,
  caps: &HostCapabilities,
  process_config: &ProcessConfig,
  exit_state: ExitState,
) -> Result<Object<'js>> {
  match name {
    "path" => path::install(ctx),
    "events" => events::install(ctx),
    "url" => url::install(ctx),
    "querystring" => querystring::install(ctx),
    "buffer" => buffer::install(ctx),
    "crypto" => crypto::install(ctx, caps),
    "stream" => stream::install(ctx, event_emitter_ctor(ctx)?),
    "util" => util::install(ctx),
    "process" => process::install(ctx, process_config, exit_state),
    "module" => module_builtin::install(ctx),
    "child_process" => child_process::install(ctx, event_emitter_ctor(ctx)?),
    "fs" => fs::install(ctx, vfs.clone()),
    other => Err(NodepackError::ModuleNotFound { specifier: format!("node:{other}"), referrer: "<builtin>".to_string() }),
  }
}

fn event_emitter_ctor<'js>(ctx: &Ctx<'js>) -> Result<rquickjs::Value<'js>> {
  events::install(ctx)?.get("EventEmitter").map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })
}

pub const ALL: &[&str] = &[
  "path", "events", "url", "querystring", "buffer", "crypto", "stream", "util", "process", "module", "child_process", "fs",
];
