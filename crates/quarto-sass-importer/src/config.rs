//! Importer configuration.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Configuration is plain data that can be written in YAML:
//!
//! ```yaml
//! entry-directory: src
//! load-paths:
//!   - vendor/scss
//!   - lib
//! package-roots:
//!   - node_modules
//! source-map: true
//! style: compressed
//! ```
//!
//! Relative paths in a configuration file are relative to the file itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::context::RebaseContext;
use crate::error::ImporterError;
use crate::finder::PackageFinder;
use crate::importer::{ImporterChain, UrlRebasingImporter};

/// CSS output style of the compiler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

impl From<OutputStyle> for grass::OutputStyle {
    fn from(style: OutputStyle) -> Self {
        match style {
            OutputStyle::Expanded => grass::OutputStyle::Expanded,
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
        }
    }
}

impl std::str::FromStr for OutputStyle {
    type Err = ImporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expanded" => Ok(OutputStyle::Expanded),
            "compressed" => Ok(OutputStyle::Compressed),
            other => Err(ImporterError::Config {
                message: format!("unknown output style '{other}'"),
            }),
        }
    }
}

/// Settings for one compilation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RebaseConfig {
    /// Directory rebased urls are relative to.
    ///
    /// Defaults to the directory of the entry stylesheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_directory: Option<PathBuf>,

    /// Directories searched, in order, for non-relative specifiers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_paths: Vec<PathBuf>,

    /// Directories searched, in order, for package specifiers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_roots: Vec<PathBuf>,

    /// Record an intermediate source map for every rebased file
    #[serde(default)]
    pub source_map: bool,

    #[serde(default)]
    pub style: OutputStyle,
}

impl RebaseConfig {
    /// Parse a YAML configuration. An empty document is the default config.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ImporterError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ImporterError::Config {
            message: e.to_string(),
        })
    }

    /// Load a YAML configuration file, resolving its relative paths against
    /// the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ImporterError> {
        let yaml = fs::read_to_string(path).map_err(|e| ImporterError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let mut config = Self::from_yaml_str(&yaml).map_err(|e| match e {
            ImporterError::Config { message } => ImporterError::Config {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Make every relative path in the config relative to `base`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if let Some(entry_directory) = &mut self.entry_directory {
            *entry_directory = base.join(&*entry_directory);
        }
        for path in self.load_paths.iter_mut().chain(self.package_roots.iter_mut()) {
            *path = base.join(&*path);
        }
    }

    /// The directory urls are rebased against for `entry_file`.
    pub fn entry_directory_for(&self, entry_file: Option<&Path>) -> PathBuf {
        let directory = match (&self.entry_directory, entry_file) {
            (Some(directory), _) => directory.clone(),
            (None, Some(file)) => file
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            (None, None) => PathBuf::from("."),
        };
        std::path::absolute(&directory).unwrap_or(directory)
    }

    /// Create the run-scoped context for compiling `entry_file`.
    pub fn build_context(&self, entry_file: Option<&Path>) -> RebaseContext {
        let context = RebaseContext::new(self.entry_directory_for(entry_file));
        if self.source_map {
            context.with_source_maps()
        } else {
            context
        }
    }

    /// Create the importers for a run in the order a host consults them:
    /// relative, then packages, then load paths.
    pub fn build_chain(&self, context: &Rc<RebaseContext>) -> ImporterChain {
        let mut chain = ImporterChain::new();
        chain.push(UrlRebasingImporter::relative(Rc::clone(context)));
        if !self.package_roots.is_empty() {
            chain.push(UrlRebasingImporter::module(
                Rc::clone(context),
                PackageFinder::new(self.package_roots.iter().cloned()),
            ));
        }
        if !self.load_paths.is_empty() {
            chain.push(UrlRebasingImporter::load_paths(
                Rc::clone(context),
                self.load_paths.iter().cloned(),
            ));
        }
        chain
    }
}
