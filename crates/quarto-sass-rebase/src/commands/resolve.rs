/*
 * resolve.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Resolve command implementation
 */

//! Resolve command implementation.
//!
//! Runs a specifier through the same importer chain a compilation would use
//! and prints the canonical URL it resolves to.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;
use url::Url;

use quarto_sass_importer::CanonicalizeOptions;

use super::RebaseOptions;

/// Arguments for the resolve command
#[derive(Debug)]
pub struct ResolveArgs {
    pub specifier: String,
    /// Stylesheet the specifier appears in
    pub from: Option<PathBuf>,
    pub from_import: bool,
    pub options: RebaseOptions,
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs) -> Result<()> {
    let url = resolve(args)?;
    println!("{url}");
    Ok(())
}

fn resolve(args: ResolveArgs) -> Result<Url> {
    let config = args.options.into_config()?;
    let context = config.build_context(args.from.as_deref()).shared();
    let chain = config.build_chain(&context);

    let containing_url = containing_url(args.from.as_deref())?;
    debug!("Resolving '{}' from {}", args.specifier, containing_url);

    let options = CanonicalizeOptions::new(args.from_import).with_containing_url(&containing_url);
    let canonicalized = chain
        .canonicalize(&args.specifier, &options)
        .with_context(|| format!("Failed to resolve '{}'", args.specifier))?;

    match canonicalized {
        Some(canonicalized) => Ok(canonicalized.url),
        None => anyhow::bail!("Can't find stylesheet to import: {}", args.specifier),
    }
}

/// URL relative specifiers are joined against: the containing file, or the
/// working directory when there is none.
fn containing_url(from: Option<&std::path::Path>) -> Result<Url> {
    match from {
        Some(file) => {
            let file = std::path::absolute(file)
                .with_context(|| format!("Invalid path {}", file.display()))?;
            Url::from_file_path(&file)
                .map_err(|_| anyhow::anyhow!("Invalid path {}", file.display()))
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            Url::from_directory_path(&cwd)
                .map_err(|_| anyhow::anyhow!("Invalid directory {}", cwd.display()))
        }
    }
}
