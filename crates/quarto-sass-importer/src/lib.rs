//! SASS import resolution and url() rebasing for Quarto.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This crate provides:
//! - A scanner for CSS `url()` values (`find_urls`)
//! - Sass-style resolution of `@use`/`@import` specifiers to files on disk,
//!   backed by a per-run directory listing cache
//! - Rebasing of relative `url()` values against an entry directory, with
//!   optional intermediate source maps
//! - Importers implementing the canonicalize/load protocol, and a `grass::Fs`
//!   adapter for compiling with grass

mod compile;
mod config;
mod context;
mod directory_cache;
mod error;
mod finder;
mod fs;
mod import_rules;
mod importer;
mod lexer;
mod rebase;
mod resolve;
mod source_map;
mod syntax;

pub use compile::{CompiledStylesheet, compile_entry, compile_with_context};
pub use config::{OutputStyle, RebaseConfig};
pub use context::RebaseContext;
pub use directory_cache::{DirectoryCache, DirectoryEntry};
pub use error::ImporterError;
pub use finder::PackageFinder;
pub use fs::RebasingFs;
pub use importer::{
    CanonicalizeOptions, CanonicalizeStrategy, Canonicalized, FileFinder, Importer,
    ImporterChain, ImporterResult, LoadPaths, LoadPathsUrlRebasingImporter, Module,
    ModuleUrlRebasingImporter, Relative, RelativeUrlRebasingImporter, UrlRebasingImporter,
};
pub use lexer::{UrlToken, UrlTokens, find_urls};
pub use rebase::{
    UrlEdit, apply_edits, collect_rebase_edits, normalize_path, rebase_stylesheet, rebase_url,
    should_rebase,
};
pub use resolve::{CandidateSet, ModuleResolver};
pub use source_map::{RawSourceMap, RebaseSourceMaps};
pub use syntax::{STYLE_EXTENSIONS, Syntax};
