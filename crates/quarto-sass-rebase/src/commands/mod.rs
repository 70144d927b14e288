//! Command implementations for sass-rebase
//!
//! Each command module handles the CLI interface and delegates to
//! quarto-sass-importer for the actual work.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use quarto_sass_importer::{OutputStyle, RebaseConfig};

pub mod compile;
pub mod resolve;
pub mod urls;

/// Resolution and output flags shared by `compile` and `resolve`
#[derive(Debug, Default, Args)]
pub struct RebaseOptions {
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory rebased urls are relative to (defaults to the entry's directory)
    #[arg(long)]
    pub entry_directory: Option<PathBuf>,

    /// Directory to search for non-relative specifiers (repeatable)
    #[arg(short = 'I', long = "load-path")]
    pub load_paths: Vec<PathBuf>,

    /// Directory containing packages, e.g. node_modules (repeatable)
    #[arg(long = "package-root")]
    pub package_roots: Vec<PathBuf>,

    /// Record source maps for rebased files
    #[arg(long)]
    pub source_map: bool,

    /// CSS output style: expanded or compressed
    #[arg(long)]
    pub style: Option<OutputStyle>,
}

impl RebaseOptions {
    /// Build the run configuration: the config file first, then flags on top.
    ///
    /// Paths given as flags are relative to the working directory; list flags
    /// are appended after the configured entries.
    pub fn into_config(self) -> Result<RebaseConfig> {
        let mut config = match &self.config {
            Some(path) => RebaseConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RebaseConfig::default(),
        };

        if let Some(entry_directory) = self.entry_directory {
            config.entry_directory = Some(entry_directory);
        }
        config.load_paths.extend(self.load_paths);
        config.package_roots.extend(self.package_roots);
        config.source_map |= self.source_map;
        if let Some(style) = self.style {
            config.style = style;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_extend_config_file() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("rebase.yml");
        std::fs::write(&config_path, "load-paths: [lib]\nstyle: compressed\n").unwrap();

        let options = RebaseOptions {
            config: Some(config_path),
            load_paths: vec![PathBuf::from("extra")],
            source_map: true,
            ..Default::default()
        };
        let config = options.into_config().unwrap();

        assert_eq!(
            config.load_paths,
            vec![temp.path().join("lib"), PathBuf::from("extra")]
        );
        assert!(config.source_map);
        assert_eq!(config.style, OutputStyle::Compressed);
    }

    #[test]
    fn test_style_flag_overrides_config() {
        let options = RebaseOptions {
            style: Some(OutputStyle::Compressed),
            entry_directory: Some(PathBuf::from("out")),
            ..Default::default()
        };
        let config = options.into_config().unwrap();
        assert_eq!(config.style, OutputStyle::Compressed);
        assert_eq!(config.entry_directory, Some(PathBuf::from("out")));
    }
}
