//! Run-scoped state shared by all rebasing importers.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A compilation run (one entry stylesheet) owns exactly one [`RebaseContext`].
//! Importers built for the run hold it behind an `Rc`, which shares the
//! directory cache and the source-map table between them. Nothing here is
//! `Sync`: runs are single-threaded, and concurrent runs each build their own
//! context.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use url::Url;

use crate::directory_cache::DirectoryCache;
use crate::error::ImporterError;
use crate::importer::ImporterResult;
use crate::rebase::{apply_edits, collect_rebase_edits};
use crate::resolve::ModuleResolver;
use crate::source_map::{RawSourceMap, RebaseSourceMaps};
use crate::syntax::Syntax;

#[derive(Debug)]
pub struct RebaseContext {
    /// Directory that rebased `url()` values are made relative to
    entry_directory: PathBuf,
    directory_cache: DirectoryCache,
    /// Present when intermediate source maps were requested
    source_maps: Option<RebaseSourceMaps>,
}

impl RebaseContext {
    /// Create a context that rebases relative to `entry_directory`.
    ///
    /// The entry directory is fixed for the lifetime of the context.
    pub fn new(entry_directory: impl Into<PathBuf>) -> Self {
        Self {
            entry_directory: entry_directory.into(),
            directory_cache: DirectoryCache::new(),
            source_maps: None,
        }
    }

    /// Also record an intermediate source map for every rebased file.
    pub fn with_source_maps(mut self) -> Self {
        self.source_maps = Some(RebaseSourceMaps::new());
        self
    }

    /// Wrap the context for sharing between importers.
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn entry_directory(&self) -> &Path {
        &self.entry_directory
    }

    pub fn directory_cache(&self) -> &DirectoryCache {
        &self.directory_cache
    }

    pub fn resolver(&self) -> ModuleResolver<'_> {
        ModuleResolver::new(&self.directory_cache)
    }

    pub fn source_maps(&self) -> Option<&RebaseSourceMaps> {
        self.source_maps.as_ref()
    }

    /// Drain the recorded source maps. Empty when tracking is disabled.
    pub fn take_source_maps(&self) -> BTreeMap<String, RawSourceMap> {
        self.source_maps
            .as_ref()
            .map(RebaseSourceMaps::take)
            .unwrap_or_default()
    }

    /// Load a canonicalized stylesheet with its `url()` values rebased.
    ///
    /// Non-`file:` URLs are not ours to load and yield `None`. A file that
    /// cannot be read is an error, since canonicalization found it.
    pub fn load(&self, canonical_url: &Url) -> Result<Option<ImporterResult>, ImporterError> {
        if canonical_url.scheme() != "file" {
            return Ok(None);
        }
        let Ok(path) = canonical_url.to_file_path() else {
            return Ok(None);
        };

        let contents = self.read_rebased(&path, canonical_url.as_str())?;
        Ok(Some(ImporterResult {
            contents,
            syntax: Syntax::from_path(&path),
            source_map_url: canonical_url.clone(),
        }))
    }

    /// Read `path` and rebase its relative `url()` values.
    ///
    /// `source_key` identifies the file in the source-map table. When nothing
    /// needs rebasing the file contents are returned as read.
    pub fn read_rebased(&self, path: &Path, source_key: &str) -> Result<String, ImporterError> {
        let contents = fs::read_to_string(path).map_err(|source| ImporterError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let stylesheet_directory = path.parent().unwrap_or_else(|| Path::new(""));
        let edits = collect_rebase_edits(&contents, stylesheet_directory, &self.entry_directory);
        if edits.is_empty() {
            return Ok(contents);
        }

        tracing::debug!(path = %path.display(), count = edits.len(), "Rebased url() values");

        let rebased = apply_edits(&contents, &edits);
        if let Some(source_maps) = &self.source_maps {
            source_maps.insert(
                source_key,
                RawSourceMap::from_edits(source_key, &contents, &edits),
            );
        }
        Ok(rebased)
    }
}
