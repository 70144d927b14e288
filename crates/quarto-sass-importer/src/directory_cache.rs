//! Per-run cache of directory listings used during import resolution.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Resolving a single specifier probes up to twelve candidate file names.
//! Instead of stat-ing each candidate, the resolver lists the directory once
//! and answers every later probe in that directory from memory. Entries are
//! never invalidated; a cache lives exactly as long as one compilation run.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Snapshot of the names found in one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Names of regular files (symlinks are followed)
    pub files: HashSet<String>,
    /// Names of subdirectories (symlinks are followed)
    pub directories: HashSet<String>,
}

impl DirectoryEntry {
    /// List `directory` on disk.
    ///
    /// A directory that cannot be read yields an empty entry. The caller then
    /// treats every candidate in it as missing.
    pub fn read(directory: &Path) -> Self {
        let mut entry = DirectoryEntry::default();

        let listing = match fs::read_dir(directory) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::debug!(directory = %directory.display(), error = %e, "Directory listing failed");
                return entry;
            }
        };

        for dir_entry in listing.flatten() {
            let Ok(file_type) = dir_entry.file_type() else {
                continue;
            };
            let name = dir_entry.file_name().to_string_lossy().into_owned();

            let (is_file, is_dir) = if file_type.is_symlink() {
                match fs::metadata(dir_entry.path()) {
                    Ok(target) => (target.is_file(), target.is_dir()),
                    // Dangling link
                    Err(_) => (false, false),
                }
            } else {
                (file_type.is_file(), file_type.is_dir())
            };

            if is_dir {
                entry.directories.insert(name);
            } else if is_file {
                entry.files.insert(name);
            }
        }

        entry
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    pub fn has_directory(&self, name: &str) -> bool {
        self.directories.contains(name)
    }
}

/// Memoized directory listings keyed by directory path.
///
/// Repeated lookups of the same directory return the same shared
/// [`DirectoryEntry`]. The cache is meant to be shared by all importers of a
/// single run, so it uses interior mutability and is not `Sync`.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    entries: RefCell<HashMap<PathBuf, Rc<DirectoryEntry>>>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the listing for `directory`, reading it from disk on first access.
    pub fn get(&self, directory: &Path) -> Rc<DirectoryEntry> {
        // The parent of a bare file name is the empty path
        let directory = if directory.as_os_str().is_empty() {
            Path::new(".")
        } else {
            directory
        };

        if let Some(entry) = self.entries.borrow().get(directory) {
            return Rc::clone(entry);
        }

        let entry = Rc::new(DirectoryEntry::read(directory));
        tracing::trace!(
            directory = %directory.display(),
            files = entry.files.len(),
            directories = entry.directories.len(),
            "Cached directory listing"
        );
        self.entries
            .borrow_mut()
            .insert(directory.to_path_buf(), Rc::clone(&entry));
        entry
    }

    /// Whether `path` names a file, answered from the parent's listing.
    pub fn is_file(&self, path: &Path) -> bool {
        match split_parent(path) {
            Some((parent, name)) => self.get(parent).has_file(&name),
            None => path.is_file(),
        }
    }

    /// Whether `path` names a directory, answered from the parent's listing.
    pub fn is_dir(&self, path: &Path) -> bool {
        match split_parent(path) {
            Some((parent, name)) => self.get(parent).has_directory(&name),
            None => path.is_dir(),
        }
    }

    /// Number of directories listed so far.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

fn split_parent(path: &Path) -> Option<(&Path, String)> {
    let parent = path.parent()?;
    let name = path.file_name()?.to_string_lossy().into_owned();
    Some((parent, name))
}
