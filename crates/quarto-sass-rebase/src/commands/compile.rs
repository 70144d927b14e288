/*
 * compile.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compile command implementation
 */

//! Compile command implementation.
//!
//! Compiles an entry stylesheet with grass. Every stylesheet the compiler
//! reads has its relative `url()` values rewritten to be relative to the
//! entry directory, so the CSS can be served from there.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use quarto_sass_importer::{CompiledStylesheet, compile_entry};

use super::RebaseOptions;

/// Arguments for the compile command
#[derive(Debug)]
pub struct CompileArgs {
    pub entry: PathBuf,
    /// Output file; stdout when absent
    pub output: Option<PathBuf>,
    pub options: RebaseOptions,
}

/// Execute the compile command
pub fn execute(args: CompileArgs) -> Result<()> {
    if !args.entry.is_file() {
        anyhow::bail!("Entry stylesheet does not exist: {}", args.entry.display());
    }

    let config = args.options.into_config()?;
    let compiled = compile_entry(&args.entry, &config)
        .with_context(|| format!("Failed to compile {}", args.entry.display()))?;

    match &args.output {
        Some(output) => {
            write_output(output, &compiled)?;
            info!("Wrote {}", output.display());
        }
        None => {
            print!("{}", compiled.css);
            if !compiled.source_maps.is_empty() {
                info!(
                    "{} source maps recorded; pass --output to write them",
                    compiled.source_maps.len()
                );
            }
        }
    }

    Ok(())
}

/// Write the CSS and, when any were recorded, the intermediate source maps.
fn write_output(output: &Path, compiled: &CompiledStylesheet) -> Result<()> {
    if let Some(dir) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }
    fs::write(output, &compiled.css)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if compiled.source_maps.is_empty() {
        return Ok(());
    }

    let maps_path = source_maps_path(output);
    let json = serde_json::to_string_pretty(&compiled.source_maps)
        .context("Failed to serialize source maps")?;
    fs::write(&maps_path, json)
        .with_context(|| format!("Failed to write {}", maps_path.display()))?;
    info!(
        "Wrote {} source maps to {}",
        compiled.source_maps.len(),
        maps_path.display()
    );
    Ok(())
}

/// `site.css` -> `site.css.rebase-maps.json`
fn source_maps_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".rebase-maps.json");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_maps_path() {
        assert_eq!(
            source_maps_path(Path::new("out/site.css")),
            PathBuf::from("out/site.css.rebase-maps.json")
        );
    }

    #[test]
    fn test_compile_writes_css_and_maps() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/shared")).unwrap();
        fs::write(
            temp.path().join("src/main.scss"),
            "@import 'shared/b';\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("src/shared/_b.scss"),
            ".b { background: url(img.png); }\n",
        )
        .unwrap();

        let output = temp.path().join("dist/site.css");
        execute(CompileArgs {
            entry: temp.path().join("src/main.scss"),
            output: Some(output.clone()),
            options: RebaseOptions {
                source_map: true,
                ..Default::default()
            },
        })
        .unwrap();

        let css = fs::read_to_string(&output).unwrap();
        assert!(css.contains("url(./shared/img.png)"), "{css}");

        let maps: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(source_maps_path(&output)).unwrap())
                .unwrap();
        let maps = maps.as_object().unwrap();
        assert_eq!(maps.len(), 1);
        let (key, map) = maps.iter().next().unwrap();
        assert!(key.ends_with("/src/shared/_b.scss"));
        assert_eq!(map["version"], 3);
    }

    #[test]
    fn test_missing_entry_fails() {
        let temp = tempfile::tempdir().unwrap();
        let err = execute(CompileArgs {
            entry: temp.path().join("missing.scss"),
            output: None,
            options: RebaseOptions::default(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
