// Copyright 2026 the Nodepack authors. MIT license.

//! Gzip + ustar tarball extraction (spec §4.2).
//!
//! Tarballs produced by the npm registry are read back with a hand-rolled
//! ustar block walker rather than the `tar` crate's reader, since the spec
//! pins exact header byte offsets. `tests/npm_install.rs` builds fixtures
//! with `flate2`+`tar::Builder` the same way
//! `tests/util/server/src/npm.rs::get_npm_package` does, and this module
//! must read them back symmetrically.

use std::io::Read;

use flate2::read::GzDecoder;

use crate::error::{NodepackError, Result};

const BLOCK_SIZE: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryType {
  File,
  Directory,
}

#[derive(Debug, Clone)]
pub struct TarEntry {
  pub path: String,
  pub bytes: Vec<u8>,
  pub mode: u32,
  pub kind: EntryType,
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
  let mut decoder = GzDecoder::new(bytes);
  let mut out = Vec::new();
  decoder.read_to_end(&mut out).map_err(|e| NodepackError::MalformedArchive { reason: format!("gunzip failed: {e}") })?;
  Ok(out)
}

fn parse_octal(field: &[u8]) -> Result<u64> {
  let text = std::str::from_utf8(field)
    .map_err(|_| NodepackError::MalformedArchive { reason: "non-utf8 octal field".to_string() })?
    .trim_matches(|c: char| c == '\0' || c.is_whitespace());
  if text.is_empty() {
    return Ok(0);
  }
  u64::from_str_radix(text, 8).map_err(|_| NodepackError::MalformedArchive { reason: format!("invalid octal field: {text:?}") })
}

fn strip_package_prefix(name: &str) -> String {
  name.strip_prefix("package/").unwrap_or(name).trim_end_matches('/').to_string()
}

fn round_up_to_block(n: usize) -> usize {
  n.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Gunzips `gz_bytes` and walks 512-byte ustar blocks, emitting one
/// [`TarEntry`] per header. Terminates on the first all-zero block.
pub fn extract(gz_bytes: &[u8]) -> Result<Vec<TarEntry>> {
  let buf = gunzip(gz_bytes)?;
  let mut entries = Vec::new();
  let mut offset = 0usize;

  while offset + BLOCK_SIZE <= buf.len() {
    let header = &buf[offset..offset + BLOCK_SIZE];
    if header.iter().all(|&b| b == 0) {
      break;
    }

    let name_raw = &header[0..100];
    let name_end = name_raw.iter().position(|&b| b == 0).unwrap_or(100);
    let name = std::str::from_utf8(&name_raw[..name_end])
      .map_err(|_| NodepackError::MalformedArchive { reason: "non-utf8 entry name".to_string() })?
      .to_string();

    let mode = parse_octal(&header[100..108])? as u32;
    let size = parse_octal(&header[124..136])? as usize;
    let typeflag = header[156];

    offset += BLOCK_SIZE;
    if offset + size > buf.len() {
      return Err(NodepackError::MalformedArchive { reason: "truncated tar entry".to_string() });
    }
    let content = buf[offset..offset + size].to_vec();
    offset += round_up_to_block(size);

    let clean_path = strip_package_prefix(&name);
    if clean_path.is_empty() {
      continue;
    }
    let kind = if typeflag == b'5' { EntryType::Directory } else { EntryType::File };
    entries.push(TarEntry { path: clean_path, bytes: content, mode, kind });
  }

  Ok(entries)
}

#[cfg(test)]
mod tests {
  use super::*;
  use flate2::write::GzEncoder;
  use flate2::Compression;
  use std::io::Write;

  fn build_fixture(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar_bytes = Vec::new();
    {
      let mut builder = tar::Builder::new(&mut tar_bytes);
      for (name, contents) in files {
        let mut header = tar::Header::new_ustar();
        header.set_path(format!("package/{name}")).unwrap();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, *contents).unwrap();
      }
      builder.finish().unwrap();
    }
    let mut gz = Vec::new();
    {
      let mut encoder = GzEncoder::new(&mut gz, Compression::default());
      encoder.write_all(&tar_bytes).unwrap();
      encoder.finish().unwrap();
    }
    gz
  }

  #[test]
  fn strips_package_prefix_and_reads_bytes() {
    let gz = build_fixture(&[("index.js", b"module.exports = 1;"), ("package.json", b"{}")]);
    let entries = extract(&gz).unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
    assert!(names.contains(&"index.js"));
    assert!(names.contains(&"package.json"));
    let idx = entries.iter().find(|e| e.path == "index.js").unwrap();
    assert_eq!(idx.bytes, b"module.exports = 1;");
    assert_eq!(idx.kind, EntryType::File);
  }

  #[test]
  fn sum_of_bytes_does_not_exceed_decompressed_length() {
    let gz = build_fixture(&[("a.js", b"aaaa"), ("b.js", b"bbbbbbbb")]);
    let decompressed = gunzip(&gz).unwrap();
    let entries = extract(&gz).unwrap();
    let total: usize = entries.iter().map(|e| e.bytes.len()).sum();
    assert!(total <= decompressed.len());
  }

  #[test]
  fn malformed_gzip_is_reported() {
    let err = extract(b"not a gzip stream").unwrap_err();
    assert!(matches!(err, NodepackError::MalformedArchive { .. }));
  }
}
