// Copyright 2026 the Nodepack authors. MIT license.

//! Stable error kinds shared across the core (see spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodepackError {
  #[error("Runtime not initialized: call initialize() before execute()")]
  NotInitialized,

  #[error("{message}")]
  Script {
    message: String,
    stack: Option<String>,
  },

  #[error("Cannot find module '{specifier}' imported from '{referrer}'")]
  ModuleNotFound { specifier: String, referrer: String },

  #[error("Package subpath '{subpath}' is not defined by \"exports\" in {package}/package.json")]
  ExportsNotMapped { package: String, subpath: String },

  #[error("No matching version found for {name}@{range} (available: {available})")]
  NoMatchingVersion {
    name: String,
    range: String,
    available: String,
  },

  #[error("Failed to fetch {url}: {reason}")]
  FetchFailed { url: String, reason: String },

  #[error("Malformed archive: {reason}")]
  MalformedArchive { reason: String },

  #[error("Unsupported encoding '{encoding}'")]
  UnsupportedEncoding { encoding: String },

  #[error("Invalid path '{path}': {reason}")]
  InvalidPath { path: String, reason: String },

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Js(#[from] rquickjs::Error),
}

pub type Result<T> = std::result::Result<T, NodepackError>;

#[cfg(test)]
mod tests {
  use super::*;

  /// A host embedding `nodepack` typically folds its errors into its own
  /// `anyhow`-based error chain; `thiserror`'s `std::error::Error` impl
  /// makes that conversion free.
  #[test]
  fn converts_into_anyhow_error_at_host_boundary() {
    let err: anyhow::Error = NodepackError::NotInitialized.into();
    assert!(err.to_string().contains("not initialized"));
  }
}
