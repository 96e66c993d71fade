// Copyright 2026 the Nodepack authors. MIT license.

//! Nodepack: a sandboxed, host-embeddable JavaScript runtime with a
//! virtual filesystem, a Node-like module system, an npm package
//! fetcher, and a set of host-shim builtins.

pub mod builtins;
pub mod console;
pub mod engine;
pub mod error;
pub mod module;
pub mod npm;
pub mod runtime;
pub mod semver_resolve;
pub mod tar;
pub mod vfs;

pub use builtins::crypto::{EntropySource, OsEntropySource};
pub use engine::Value;
pub use error::{NodepackError, Result};
pub use npm::{Fetcher, NpmClient};
pub use runtime::{ExecuteOptions, ExecutionResult, HostCapabilities, Runtime, RuntimeOptions};
pub use vfs::{Clock, SystemClock, Vfs};
