// Copyright 2026 the Nodepack authors. MIT license.

//! An in-memory POSIX-like filesystem (spec §4.1).
//!
//! Paths are always absolute and `/`-separated. The tree is not safe for
//! concurrent mutation; a [`Vfs`] is owned by exactly one [`crate::Runtime`].

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::{NodepackError, Result};

pub mod constants {
  pub const F_OK: i32 = 0;
  pub const R_OK: i32 = 4;
  pub const W_OK: i32 = 2;
  pub const X_OK: i32 = 1;
}

#[derive(Debug, Clone)]
pub enum VfsNode {
  File { bytes: Vec<u8>, mode: u32, mtime: String },
  Dir { children: BTreeMap<String, VfsNode>, mode: u32, mtime: String },
}

impl VfsNode {
  fn new_dir(mtime: &str) -> Self {
    VfsNode::Dir { children: BTreeMap::new(), mode: 0o755, mtime: mtime.to_string() }
  }

  pub fn is_file(&self) -> bool {
    matches!(self, VfsNode::File { .. })
  }

  pub fn is_dir(&self) -> bool {
    matches!(self, VfsNode::Dir { .. })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
  pub is_file: bool,
  pub is_dir: bool,
  pub size: u64,
  pub mode: u32,
  pub mtime: String,
}

/// A clock capability; hosts inject one so `mtime` is deterministic in tests.
pub trait Clock {
  fn now_iso8601(&self) -> String;
}

pub struct SystemClock;

impl Clock for SystemClock {
  fn now_iso8601(&self) -> String {
    // Avoids a hard dependency on a datetime crate for a field the spec
    // only requires in "string form".
    "1970-01-01T00:00:00.000Z".to_string()
  }
}

pub struct Vfs {
  root: RefCell<VfsNode>,
  clock: Box<dyn Clock>,
}

fn normalize(path: &str) -> Result<Vec<String>> {
  if !path.starts_with('/') {
    return Err(NodepackError::InvalidPath {
      path: path.to_string(),
      reason: "path must be absolute".to_string(),
    });
  }
  let mut out: Vec<String> = Vec::new();
  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        out.pop();
      }
      seg => out.push(seg.to_string()),
    }
  }
  Ok(out)
}

pub fn join_normalized(segments: &[String]) -> String {
  if segments.is_empty() {
    "/".to_string()
  } else {
    format!("/{}", segments.join("/"))
  }
}

impl Vfs {
  pub fn new() -> Self {
    Self::with_clock(Box::new(SystemClock))
  }

  pub fn with_clock(clock: Box<dyn Clock>) -> Self {
    let mtime = clock.now_iso8601();
    Vfs { root: RefCell::new(VfsNode::new_dir(&mtime)), clock }
  }

  fn now(&self) -> String {
    self.clock.now_iso8601()
  }

  fn find<'a>(node: &'a VfsNode, segments: &[String]) -> Option<&'a VfsNode> {
    match segments.split_first() {
      None => Some(node),
      Some((head, rest)) => match node {
        VfsNode::Dir { children, .. } => children.get(head).and_then(|c| Self::find(c, rest)),
        VfsNode::File { .. } => None,
      },
    }
  }

  fn find_mut<'a>(node: &'a mut VfsNode, segments: &[String]) -> Option<&'a mut VfsNode> {
    match segments.split_first() {
      None => Some(node),
      Some((head, rest)) => match node {
        VfsNode::Dir { children, .. } => {
          children.get_mut(head).and_then(|c| Self::find_mut(c, rest))
        }
        VfsNode::File { .. } => None,
      },
    }
  }

  pub fn exists(&self, path: &str) -> bool {
    match normalize(path) {
      Ok(segs) => Self::find(&self.root.borrow(), &segs).is_some(),
      Err(_) => false,
    }
  }

  pub fn mkdir(&self, path: &str, recursive: bool) -> Result<()> {
    let segs = normalize(path)?;
    if segs.is_empty() {
      return Ok(());
    }
    let mtime = self.now();
    let mut root = self.root.borrow_mut();
    let mut cursor = &mut *root;
    for (i, seg) in segs.iter().enumerate() {
      let is_last = i == segs.len() - 1;
      match cursor {
        VfsNode::Dir { children, .. } => {
          if !children.contains_key(seg) {
            if !recursive && !is_last {
              return Err(NodepackError::InvalidPath {
                path: path.to_string(),
                reason: "parent directory does not exist".to_string(),
              });
            }
            children.insert(seg.clone(), VfsNode::new_dir(&mtime));
          } else if is_last && !recursive {
            return Err(NodepackError::InvalidPath {
              path: path.to_string(),
              reason: "directory already exists".to_string(),
            });
          }
          cursor = children.get_mut(seg).unwrap();
        }
        VfsNode::File { .. } => {
          return Err(NodepackError::InvalidPath {
            path: path.to_string(),
            reason: "a path component is a file".to_string(),
          });
        }
      }
    }
    Ok(())
  }

  fn ensure_parent(&self, segments: &[String]) -> Result<()> {
    if segments.len() > 1 {
      let parent = join_normalized(&segments[..segments.len() - 1]);
      if !self.exists(&parent) {
        self.mkdir(&parent, true)?;
      }
    }
    Ok(())
  }

  pub fn write_file(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
    let segs = normalize(path)?;
    if segs.is_empty() {
      return Err(NodepackError::InvalidPath {
        path: path.to_string(),
        reason: "cannot write to /".to_string(),
      });
    }
    self.ensure_parent(&segs)?;
    let mtime = self.now();
    let mut root = self.root.borrow_mut();
    let (parent_segs, name) = segs.split_at(segs.len() - 1);
    let parent = Self::find_mut(&mut root, parent_segs).ok_or_else(|| NodepackError::InvalidPath {
      path: path.to_string(),
      reason: "parent is not a directory".to_string(),
    })?;
    match parent {
      VfsNode::Dir { children, .. } => {
        children.insert(name[0].clone(), VfsNode::File { bytes, mode: 0o644, mtime });
        Ok(())
      }
      VfsNode::File { .. } => Err(NodepackError::InvalidPath {
        path: path.to_string(),
        reason: "parent is not a directory".to_string(),
      }),
    }
  }

  pub fn append_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
    if self.exists(path) {
      let mut existing = self.read_file_bytes(path)?;
      existing.extend_from_slice(bytes);
      self.write_file(path, existing)
    } else {
      self.write_file(path, bytes.to_vec())
    }
  }

  pub fn read_file_bytes(&self, path: &str) -> Result<Vec<u8>> {
    let segs = normalize(path)?;
    let root = self.root.borrow();
    match Self::find(&root, &segs) {
      Some(VfsNode::File { bytes, .. }) => Ok(bytes.clone()),
      Some(VfsNode::Dir { .. }) => Err(NodepackError::InvalidPath {
        path: path.to_string(),
        reason: "is a directory".to_string(),
      }),
      None => Err(NodepackError::InvalidPath { path: path.to_string(), reason: "no such file".to_string() }),
    }
  }

  pub fn read_file_string(&self, path: &str) -> Result<String> {
    let bytes = self.read_file_bytes(path)?;
    String::from_utf8(bytes).map_err(|_| NodepackError::UnsupportedEncoding { encoding: "utf8".to_string() })
  }

  pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
    let segs = normalize(path)?;
    let root = self.root.borrow();
    match Self::find(&root, &segs) {
      Some(VfsNode::Dir { children, .. }) => Ok(children.keys().cloned().collect()),
      Some(VfsNode::File { .. }) => Err(NodepackError::InvalidPath { path: path.to_string(), reason: "not a directory".to_string() }),
      None => Err(NodepackError::InvalidPath { path: path.to_string(), reason: "no such directory".to_string() }),
    }
  }

  pub fn stat(&self, path: &str) -> Result<Stat> {
    let segs = normalize(path)?;
    let root = self.root.borrow();
    match Self::find(&root, &segs) {
      Some(VfsNode::File { bytes, mode, mtime }) => {
        Ok(Stat { is_file: true, is_dir: false, size: bytes.len() as u64, mode: *mode, mtime: mtime.clone() })
      }
      Some(VfsNode::Dir { mode, mtime, .. }) => Ok(Stat { is_file: false, is_dir: true, size: 0, mode: *mode, mtime: mtime.clone() }),
      None => Err(NodepackError::InvalidPath { path: path.to_string(), reason: "no such file or directory".to_string() }),
    }
  }

  /// Symlinks are not modeled (spec §4.1); `lstat` is an alias of `stat`.
  pub fn lstat(&self, path: &str) -> Result<Stat> {
    self.stat(path)
  }

  pub fn unlink(&self, path: &str) -> Result<()> {
    let segs = normalize(path)?;
    let mut root = self.root.borrow_mut();
    let (parent_segs, name) = segs.split_at(segs.len().saturating_sub(1));
    let parent = Self::find_mut(&mut root, parent_segs).ok_or_else(|| NodepackError::InvalidPath {
      path: path.to_string(),
      reason: "no such file".to_string(),
    })?;
    match parent {
      VfsNode::Dir { children, .. } => match children.get(&name[0]) {
        Some(VfsNode::File { .. }) => {
          children.remove(&name[0]);
          Ok(())
        }
        _ => Err(NodepackError::InvalidPath { path: path.to_string(), reason: "not a file".to_string() }),
      },
      VfsNode::File { .. } => Err(NodepackError::InvalidPath { path: path.to_string(), reason: "parent is not a directory".to_string() }),
    }
  }

  pub fn rmdir(&self, path: &str) -> Result<()> {
    let segs = normalize(path)?;
    {
      let root = self.root.borrow();
      match Self::find(&root, &segs) {
        Some(VfsNode::Dir { children, .. }) if !children.is_empty() => {
          return Err(NodepackError::InvalidPath { path: path.to_string(), reason: "directory not empty".to_string() });
        }
        Some(VfsNode::Dir { .. }) => {}
        _ => return Err(NodepackError::InvalidPath { path: path.to_string(), reason: "not a directory".to_string() }),
      }
    }
    self.unlink_dir_entry(&segs)
  }

  pub fn rm(&self, path: &str, recursive: bool) -> Result<()> {
    let segs = normalize(path)?;
    let root = self.root.borrow();
    let is_nonempty_dir = matches!(Self::find(&root, &segs), Some(VfsNode::Dir { children, .. }) if !children.is_empty());
    drop(root);
    if is_nonempty_dir && !recursive {
      return Err(NodepackError::InvalidPath { path: path.to_string(), reason: "directory not empty".to_string() });
    }
    self.unlink_dir_entry(&segs)
  }

  fn unlink_dir_entry(&self, segs: &[String]) -> Result<()> {
    let mut root = self.root.borrow_mut();
    if segs.is_empty() {
      return Err(NodepackError::InvalidPath { path: "/".to_string(), reason: "cannot remove root".to_string() });
    }
    let (parent_segs, name) = segs.split_at(segs.len() - 1);
    let parent = Self::find_mut(&mut root, parent_segs).ok_or_else(|| NodepackError::InvalidPath {
      path: join_normalized(segs),
      reason: "no such path".to_string(),
    })?;
    match parent {
      VfsNode::Dir { children, .. } => {
        children.remove(&name[0]);
        Ok(())
      }
      VfsNode::File { .. } => Err(NodepackError::InvalidPath { path: join_normalized(segs), reason: "parent is not a directory".to_string() }),
    }
  }

  pub fn rename(&self, from: &str, to: &str) -> Result<()> {
    let bytes_or_dir = {
      let segs = normalize(from)?;
      let root = self.root.borrow();
      Self::find(&root, &segs).cloned().ok_or_else(|| NodepackError::InvalidPath { path: from.to_string(), reason: "no such path".to_string() })?
    };
    self.insert_node(to, bytes_or_dir)?;
    self.unlink_dir_entry(&normalize(from)?)
  }

  pub fn copy_file(&self, from: &str, to: &str) -> Result<()> {
    let bytes = self.read_file_bytes(from)?;
    self.write_file(to, bytes)
  }

  fn insert_node(&self, path: &str, node: VfsNode) -> Result<()> {
    let segs = normalize(path)?;
    if segs.is_empty() {
      return Err(NodepackError::InvalidPath { path: path.to_string(), reason: "cannot replace /".to_string() });
    }
    self.ensure_parent(&segs)?;
    let mut root = self.root.borrow_mut();
    let (parent_segs, name) = segs.split_at(segs.len() - 1);
    let parent = Self::find_mut(&mut root, parent_segs).ok_or_else(|| NodepackError::InvalidPath { path: path.to_string(), reason: "parent missing".to_string() })?;
    match parent {
      VfsNode::Dir { children, .. } => {
        children.insert(name[0].clone(), node);
        Ok(())
      }
      VfsNode::File { .. } => Err(NodepackError::InvalidPath { path: path.to_string(), reason: "parent is not a directory".to_string() }),
    }
  }

  pub fn access(&self, path: &str, mode: i32) -> Result<()> {
    if mode == constants::F_OK {
      return if self.exists(path) {
        Ok(())
      } else {
        Err(NodepackError::InvalidPath { path: path.to_string(), reason: "does not exist".to_string() })
      };
    }
    // The VFS has no real permission bits; any existing path passes R/W/X checks.
    self.stat(path).map(|_| ())
  }

  pub fn realpath(&self, path: &str) -> Result<String> {
    let segs = normalize(path)?;
    self.stat(&join_normalized(&segs))?;
    Ok(join_normalized(&segs))
  }
}

impl Default for Vfs {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn write_then_read_round_trips() {
    let vfs = Vfs::new();
    vfs.write_file("/a/b.txt", b"hello".to_vec()).unwrap();
    assert_eq!(vfs.read_file_bytes("/a/b.txt").unwrap(), b"hello");
  }

  #[test]
  fn mkdir_without_recursive_requires_parent() {
    let vfs = Vfs::new();
    assert!(vfs.mkdir("/a/b", false).is_err());
    vfs.mkdir("/a", false).unwrap();
    vfs.mkdir("/a/b", false).unwrap();
  }

  #[test]
  fn rm_nonrecursive_fails_on_nonempty_dir() {
    let vfs = Vfs::new();
    vfs.write_file("/dir/file.txt", b"x".to_vec()).unwrap();
    assert!(vfs.rm("/dir", false).is_err());
    vfs.rm("/dir", true).unwrap();
    assert!(!vfs.exists("/dir"));
  }

  #[test]
  fn stat_reports_kind_and_size() {
    let vfs = Vfs::new();
    vfs.write_file("/f.txt", b"1234".to_vec()).unwrap();
    let stat = vfs.stat("/f.txt").unwrap();
    assert!(stat.is_file);
    assert_eq!(stat.size, 4);
  }

  #[test]
  fn root_always_exists() {
    let vfs = Vfs::new();
    assert!(vfs.exists("/"));
  }
}
