//! Error types for import resolution and url() rebasing.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while canonicalizing or loading stylesheets.
///
/// An unresolved specifier is not an error: importers return `Ok(None)` so
/// the host can try the next importer.
#[derive(Debug, Error)]
pub enum ImporterError {
    /// More than one equally valid candidate file matched a specifier
    #[error(
        "Ambiguous import detected: {} all match in {}",
        .candidates.join(", "),
        .directory.display()
    )]
    AmbiguousImport {
        directory: PathBuf,
        candidates: Vec<String>,
    },

    /// A canonicalized stylesheet could not be read
    #[error("Failed to read stylesheet {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A resolved path cannot be expressed as a `file:` URL
    #[error("Path cannot be converted to a file URL: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Configuration file could not be loaded or parsed
    #[error("Invalid importer configuration: {message}")]
    Config { message: String },

    /// SASS compilation failed
    #[error("SASS compilation failed: {message}")]
    CompilationFailed { message: String },
}
