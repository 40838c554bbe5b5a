//! Destinations for recovered `.proto` text.
//!
//! A [`ProtoSink`] receives `(logical name, text)` pairs. [`DirectorySink`]
//! writes them under a root directory, [`MemorySink`] keeps them in memory.

use crate::error::{Error, Result};
use std::collections::{btree_map, BTreeMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Accepts recovered files
pub trait ProtoSink {
    /// Stores `content` under the logical file name `name`
    fn write(&mut self, name: &str, content: &str) -> Result<()>;
}

impl<S: ProtoSink + ?Sized> ProtoSink for &mut S {
    fn write(&mut self, name: &str, content: &str) -> Result<()> {
        (**self).write(name, content)
    }
}

/// Maps a logical file name to a path relative to a sink root.
///
/// The name is split on `/` only. Every component must be non-empty and
/// neither `.` nor `..`; dots inside a component are kept verbatim, so
/// `google/protobuf/empty.proto` maps to `google/protobuf/empty.proto`.
pub fn relative_path(name: &str) -> Result<PathBuf> {
    if name.is_empty() {
        return Err(Error::invalid_logical_name(name, "name is empty"));
    }
    if name.contains('\\') || name.contains('\0') {
        return Err(Error::invalid_logical_name(
            name,
            "name contains a backslash or NUL byte",
        ));
    }

    let mut path = PathBuf::new();
    for component in name.split('/') {
        match component {
            "" => return Err(Error::invalid_logical_name(name, "empty path component")),
            "." | ".." => return Err(Error::path_traversal(name)),
            _ => path.push(component),
        }
    }

    // Catches anything the platform still treats as a root or prefix
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(Error::path_traversal(name));
    }

    Ok(path)
}

/// Writes recovered files below a root directory.
///
/// An existing file is never replaced unless [`overwrite`](Self::overwrite)
/// is set. That includes files written earlier by the same sink, so two
/// descriptors mapping to one logical name fail with
/// [`Error::FileExists`] on the second write instead of silently losing one.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    overwrite: bool,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Creates a sink rooted at `root`; the directory is created on demand
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overwrite: false,
            written: Vec::new(),
        }
    }

    /// Allows replacing files that already exist
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// The root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths written so far, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// The path a logical name would be written to
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(relative_path(name)?))
    }
}

impl ProtoSink for DirectorySink {
    fn write(&mut self, name: &str, content: &str) -> Result<()> {
        let path = self.path_for(name)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::directory_create(parent, e))?;
        }

        if path.exists() && !self.overwrite {
            return Err(Error::file_exists(path));
        }

        fs::write(&path, content).map_err(|e| Error::file_write(&path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "wrote proto file");
        self.written.push(path);
        Ok(())
    }
}

/// Keeps recovered files in memory, sorted by logical name.
///
/// Like [`DirectorySink`] without `overwrite`, a second write to the same
/// name fails with [`Error::FileExists`] and keeps the first text.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: BTreeMap<String, String>,
}

impl MemorySink {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Text stored under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Number of stored files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if nothing was stored
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates over `(name, text)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    /// Consumes the sink, returning its contents
    pub fn into_files(self) -> BTreeMap<String, String> {
        self.files
    }
}

impl ProtoSink for MemorySink {
    fn write(&mut self, name: &str, content: &str) -> Result<()> {
        match self.files.entry(name.to_string()) {
            btree_map::Entry::Occupied(_) => Err(Error::file_exists(name)),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(content.to_string());
                Ok(())
            }
        }
    }
}
