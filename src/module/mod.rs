// Copyright 2026 the Nodepack authors. MIT license.

//! Module system (spec §4.5-§4.11): format detection, bare-import
//! detection for the npm auto-installer, specifier resolution, the ESM->CJS
//! source rewrite, and the linker that ties them together.

pub mod format;
pub mod imports;
pub mod linker;
pub mod resolver;
pub mod transform;
