//! Urls command implementation

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use quarto_sass_importer::find_urls;

pub fn execute(file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    print!("{}", format_urls(&contents));
    Ok(())
}

/// One line per token: `start..end value`
fn format_urls(contents: &str) -> String {
    let mut out = String::new();
    for token in find_urls(contents) {
        let _ = writeln!(out, "{}..{} {}", token.start, token.end, token.value);
    }
    out
}
