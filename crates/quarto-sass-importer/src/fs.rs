//! `grass::Fs` adapter that rebases stylesheets as the compiler reads them.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! grass resolves `@use`/`@import` itself by probing candidate files with
//! `is_file`, in its own order and without telling `@use` and `@import`
//! apart. To get the same answer the importers give, every probe for a
//! stylesheet is checked against [`ModuleResolver`](crate::ModuleResolver):
//! the probe succeeds only for the file the resolver picks.
//!
//! Whether a specifier came from `@import` is recovered from the rules of the
//! stylesheets read so far. A specifier that was never seen, or that is
//! referenced by both kinds of rule, resolves with `@use` semantics.
//!
//! An ambiguous import makes every probe fail; the error is kept and
//! reported by [`take_error`](RebasingFs::take_error) once grass is done.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

use url::Url;

use crate::context::RebaseContext;
use crate::error::ImporterError;
use crate::import_rules::find_import_rules;
use crate::rebase::normalize_path;
use crate::syntax::{is_style_extension, is_stylesheet};

/// How a specifier path has been referenced.
#[derive(Debug, Clone, Copy, Default)]
struct References {
    import: bool,
    module: bool,
}

impl References {
    fn from_import(self) -> bool {
        self.import && !self.module
    }
}

pub struct RebasingFs<'a> {
    context: &'a RebaseContext,
    load_paths: Vec<PathBuf>,
    /// Keyed by the absolute path a specifier names, before resolution
    references: RefCell<HashMap<PathBuf, References>>,
    error: RefCell<Option<ImporterError>>,
}

impl<'a> RebasingFs<'a> {
    pub fn new(context: &'a RebaseContext) -> Self {
        Self {
            context,
            load_paths: Vec::new(),
            references: RefCell::new(HashMap::new()),
            error: RefCell::new(None),
        }
    }

    /// Directories grass searches for non-relative specifiers.
    pub fn with_load_paths<I, P>(mut self, load_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.load_paths = load_paths
            .into_iter()
            .map(|path| absolute_path(&path.into()))
            .collect();
        self
    }

    /// The first resolution error hit while grass was probing, if any.
    pub fn take_error(&self) -> Option<ImporterError> {
        self.error.borrow_mut().take()
    }

    fn record_references(&self, stylesheet: &Path, contents: &str) {
        let directory = stylesheet.parent().unwrap_or_else(|| Path::new(""));
        let mut references = self.references.borrow_mut();
        for rule in find_import_rules(contents) {
            let targets = std::iter::once(directory)
                .chain(self.load_paths.iter().map(PathBuf::as_path))
                .map(|base| normalize_path(&base.join(&rule.specifier)));
            for target in targets {
                let entry = references.entry(target).or_default();
                if rule.from_import {
                    entry.import = true;
                } else {
                    entry.module = true;
                }
            }
        }
    }

    /// Resolve the specifier `probe` was derived from, or `None` when `probe`
    /// is not a stylesheet candidate.
    fn resolve_probe(&self, probe: &Path) -> Option<Result<Option<PathBuf>, ImporterError>> {
        let (bare, extension) = specifier_stem(probe)?;
        let references = self.references.borrow();

        let explicit = bare.with_file_name(format!(
            "{}.{extension}",
            bare.file_name()?.to_string_lossy()
        ));
        let (target, seen) = match references.get(&explicit) {
            Some(seen) => (explicit, Some(*seen)),
            None => {
                let seen = references.get(&bare).copied().or_else(|| {
                    // `dir/index` is probed for a specifier naming `dir`
                    (bare.file_name()? == "index")
                        .then(|| references.get(bare.parent()?).copied())
                        .flatten()
                });
                (bare, seen)
            }
        };
        drop(references);

        let from_import = seen.is_some_and(References::from_import);
        Some(self.context.resolver().resolve(&target, from_import))
    }
}

impl Debug for RebasingFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebasingFs")
            .field("entry_directory", &self.context.entry_directory())
            .field("load_paths", &self.load_paths)
            .finish()
    }
}

impl grass::Fs for RebasingFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.context.directory_cache().is_dir(&absolute_path(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        let probe = absolute_path(path);
        match self.resolve_probe(&probe) {
            None => self.context.directory_cache().is_file(&probe),
            Some(Ok(resolved)) => resolved.is_some_and(|resolved| resolved == probe),
            Some(Err(error)) => {
                let mut stored = self.error.borrow_mut();
                if stored.is_none() {
                    *stored = Some(error);
                }
                false
            }
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        if !is_stylesheet(path) {
            return std::fs::read(path);
        }

        let path = absolute_path(path);
        let contents = self
            .context
            .read_rebased(&path, &source_key(&path))
            .map_err(|e| match e {
                ImporterError::Read { source, .. } => source,
                other => io::Error::other(other.to_string()),
            })?;
        self.record_references(&path, &contents);
        Ok(contents.into_bytes())
    }
}

/// Split a candidate file path into the specifier path it was built from and
/// its style extension: `dir/_x.import.scss` becomes (`dir/x`, `scss`).
fn specifier_stem(path: &Path) -> Option<(PathBuf, String)> {
    let name = path.file_name()?.to_str()?;
    let (stem, extension) = name.rsplit_once('.')?;
    if !is_style_extension(extension) {
        return None;
    }
    let stem = stem.strip_suffix(".import").unwrap_or(stem);
    let stem = stem.strip_prefix('_').unwrap_or(stem);
    if stem.is_empty() {
        return None;
    }
    Some((path.with_file_name(stem), extension.to_string()))
}

fn absolute_path(path: &Path) -> PathBuf {
    normalize_path(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
}

/// Key of a file in the source-map table: its `file:` URL when it has one.
fn source_key(path: &Path) -> String {
    let absolute = absolute_path(path);
    Url::from_file_path(&absolute)
        .map(String::from)
        .unwrap_or_else(|_| absolute.display().to_string())
}
