//! Compile an entry stylesheet with grass and rebased `url()` values.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! # Example
//!
//! ```rust,ignore
//! use quarto_sass_importer::{RebaseConfig, compile_entry};
//! use std::path::Path;
//!
//! let config = RebaseConfig::from_file(Path::new("sass-rebase.yml"))?;
//! let compiled = compile_entry(Path::new("src/styles.scss"), &config)?;
//! println!("{}", compiled.css);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::RebaseConfig;
use crate::context::RebaseContext;
use crate::error::ImporterError;
use crate::fs::RebasingFs;
use crate::source_map::RawSourceMap;

/// Output of one compilation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledStylesheet {
    pub css: String,
    /// Intermediate maps of the rebased files, keyed by file URL. Empty unless
    /// source maps were requested.
    pub source_maps: BTreeMap<String, RawSourceMap>,
}

/// Compile `entry` using a fresh run context built from `config`.
///
/// A relative `entry` is taken relative to the working directory.
pub fn compile_entry(entry: &Path, config: &RebaseConfig) -> Result<CompiledStylesheet, ImporterError> {
    let entry = std::path::absolute(entry).map_err(|source| ImporterError::Read {
        path: entry.to_path_buf(),
        source,
    })?;
    let context = config.build_context(Some(&entry));
    compile_with_context(&entry, &context, config)
}

/// Compile `entry` with an existing run context.
///
/// grass does its own module resolution, so load paths and package roots are
/// handed to it as plain load paths. Its file probes are answered by the same
/// resolver the importers use, and an ambiguous import found while probing is
/// returned instead of grass's own error.
pub fn compile_with_context(
    entry: &Path,
    context: &RebaseContext,
    config: &RebaseConfig,
) -> Result<CompiledStylesheet, ImporterError> {
    let load_paths: Vec<PathBuf> = config
        .load_paths
        .iter()
        .chain(config.package_roots.iter())
        .cloned()
        .collect();
    let fs = RebasingFs::new(context).with_load_paths(load_paths.iter().cloned());

    let options = grass::Options::default()
        .fs(&fs)
        .load_paths(&load_paths)
        .style(config.style.into());

    tracing::debug!(
        entry = %entry.display(),
        entry_directory = %context.entry_directory().display(),
        "Compiling stylesheet"
    );

    let compiled = grass::from_path(entry, &options);
    if let Some(error) = fs.take_error() {
        return Err(error);
    }
    let css = compiled.map_err(|e| ImporterError::CompilationFailed {
        message: e.to_string(),
    })?;

    Ok(CompiledStylesheet {
        css,
        source_maps: context.take_source_maps(),
    })
}
