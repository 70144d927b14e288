//! Stylesheet syntaxes and the file extensions that select them.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extensions recognized as stylesheet files during import resolution.
///
/// Order matters: it is the order in which extensionless specifiers are
/// expanded into candidate file names.
pub const STYLE_EXTENSIONS: [&str; 3] = ["scss", "sass", "css"];

/// Extension of plain CSS files.
///
/// A CSS file never makes an import ambiguous when it sits next to a
/// same-named Sass file; the Sass file wins.
pub const CSS_EXTENSION: &str = "css";

/// The syntax a loaded stylesheet is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    /// Plain CSS (`.css`)
    Css,
    /// The indented syntax (`.sass`)
    Indented,
    /// SCSS (`.scss`, and anything unrecognized)
    Scss,
}

impl Syntax {
    /// Pick the syntax from a file's extension, case-insensitively.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

        match extension.as_deref() {
            Some("css") => Syntax::Css,
            Some("sass") => Syntax::Indented,
            _ => Syntax::Scss,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Syntax::Css => "css",
            Syntax::Indented => "indented",
            Syntax::Scss => "scss",
        }
    }
}

impl std::fmt::Display for Syntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `extension` (without the dot) is one of [`STYLE_EXTENSIONS`].
///
/// The comparison is case-sensitive, matching how the compiler resolves
/// imports on disk.
pub fn is_style_extension(extension: &str) -> bool {
    STYLE_EXTENSIONS.contains(&extension)
}

/// Whether a path names a stylesheet that should be rebased when loaded.
pub fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_style_extension)
}
