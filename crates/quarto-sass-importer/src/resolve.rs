//! Sass-style module resolution on disk.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Given a path-like specifier, find the one stylesheet it refers to:
//!
//! 1. Expand the name into candidate files: partials (`_name`), import-only
//!    files (`name.import.ext`, only for `@import`) and, when the specifier
//!    has no style extension, every recognized extension.
//! 2. Intersect the candidates with the cached directory listing.
//! 3. Prefer import-only matches, then default matches. Several matches are
//!    ambiguous unless exactly one of them is not plain CSS.
//! 4. Fall back to `name/index` when `name` is a directory.
//!
//! These rules follow dart-sass's own resolution so that rebasing importers
//! resolve exactly what the compiler would have:
//! <https://github.com/sass/dart-sass/blob/44d6bb6ac72fe6b93f5bfec371a1fffb18e6b76d/lib/src/importer/utils.dart>

use std::path::{Path, PathBuf};

use url::Url;

use crate::directory_cache::DirectoryCache;
use crate::error::ImporterError;
use crate::syntax::{CSS_EXTENSION, STYLE_EXTENSIONS, is_style_extension};

/// Candidate file names for one specifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    /// Import-only candidates; empty unless resolving from `@import`
    pub import_only: Vec<String>,
    /// Regular and partial candidates
    pub default: Vec<String>,
}

impl CandidateSet {
    /// Build the candidates for `filename`.
    ///
    /// `extension` is the specifier's style extension (without the dot), and
    /// `filename` must already have it stripped.
    pub fn new(filename: &str, extension: Option<&str>, from_import: bool) -> Self {
        let mut candidates = CandidateSet::default();

        match extension {
            Some(ext) => {
                if from_import {
                    candidates.import_only.push(format!("{filename}.import.{ext}"));
                    candidates.import_only.push(format!("_{filename}.import.{ext}"));
                }
                candidates.default.push(format!("{filename}.{ext}"));
                candidates.default.push(format!("_{filename}.{ext}"));
            }
            None => {
                for prefix in ["", "_"] {
                    for ext in STYLE_EXTENSIONS {
                        if from_import {
                            candidates
                                .import_only
                                .push(format!("{prefix}{filename}.import.{ext}"));
                        }
                        candidates.default.push(format!("{prefix}{filename}.{ext}"));
                    }
                }
            }
        }

        candidates
    }
}

/// Resolves specifiers against the filesystem through a [`DirectoryCache`].
#[derive(Debug, Clone, Copy)]
pub struct ModuleResolver<'a> {
    cache: &'a DirectoryCache,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(cache: &'a DirectoryCache) -> Self {
        Self { cache }
    }

    /// Resolve a `file:` URL to the canonical URL of the file it refers to.
    ///
    /// URLs that are not local files resolve to `None`.
    pub fn resolve_url(&self, url: &Url, from_import: bool) -> Result<Option<Url>, ImporterError> {
        if url.scheme() != "file" {
            return Ok(None);
        }
        let Ok(path) = url.to_file_path() else {
            return Ok(None);
        };

        match self.resolve(&path, from_import)? {
            Some(resolved) => {
                Url::from_file_path(&resolved)
                    .map(Some)
                    .map_err(|_| ImporterError::InvalidPath(resolved))
            }
            None => Ok(None),
        }
    }

    /// Resolve a path-like specifier to a stylesheet on disk.
    ///
    /// Returns `Ok(None)` when nothing matches and
    /// [`ImporterError::AmbiguousImport`] when the match is not unique.
    pub fn resolve(&self, path: &Path, from_import: bool) -> Result<Option<PathBuf>, ImporterError> {
        self.resolve_with(path, from_import, true)
    }

    fn resolve_with(
        &self,
        path: &Path,
        from_import: bool,
        check_directory: bool,
    ) -> Result<Option<PathBuf>, ImporterError> {
        let (Some(directory), Some(name)) = (path.parent(), path.file_name()) else {
            return Ok(None);
        };
        let Some(name) = name.to_str() else {
            return Ok(None);
        };

        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| is_style_extension(ext));
        let filename = match extension {
            Some(ext) => &name[..name.len() - ext.len() - 1],
            None => name,
        };

        let candidates = CandidateSet::new(filename, extension, from_import);
        let entry = self.cache.get(directory);

        let found_imports: Vec<String> = candidates
            .import_only
            .into_iter()
            .filter(|candidate| entry.has_file(candidate))
            .collect();
        let found_defaults: Vec<String> = candidates
            .default
            .into_iter()
            .filter(|candidate| entry.has_file(candidate))
            .collect();
        let has_potential_index =
            check_directory && extension.is_none() && entry.has_directory(filename);

        // `found_imports` is only populated when resolving from `@import`
        let found = match check_found(directory, found_imports)? {
            Some(file) => Some(file),
            None => check_found(directory, found_defaults)?,
        };

        if let Some(file) = found {
            let resolved = directory.join(file);
            tracing::trace!(path = %path.display(), resolved = %resolved.display(), "Resolved stylesheet");
            return Ok(Some(resolved));
        }

        if has_potential_index {
            // Only one level of directory-as-module is considered
            return self.resolve_with(&path.join("index"), from_import, false);
        }

        Ok(None)
    }
}

/// Pick the single file out of the matching candidates.
///
/// Plain CSS files next to a Sass file do not count as ambiguous; the Sass
/// file takes priority.
fn check_found(directory: &Path, mut found: Vec<String>) -> Result<Option<String>, ImporterError> {
    if found.len() <= 1 {
        return Ok(found.pop());
    }

    let mut without_css: Vec<&String> = found.iter().filter(|name| !is_css(name)).collect();
    if without_css.len() == 1 {
        return Ok(without_css.pop().cloned());
    }

    // Either several Sass files or several CSS files
    tracing::warn!(directory = %directory.display(), candidates = ?found, "Ambiguous import");
    Err(ImporterError::AmbiguousImport {
        directory: directory.to_path_buf(),
        candidates: found,
    })
}

fn is_css(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == CSS_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    fn resolve(root: &Path, specifier: &str, from_import: bool) -> Option<PathBuf> {
        let cache = DirectoryCache::new();
        ModuleResolver::new(&cache)
            .resolve(&root.join(specifier), from_import)
            .unwrap()
    }

    #[test]
    fn test_candidates_with_extension() {
        let candidates = CandidateSet::new("x", Some("scss"), true);
        assert_eq!(candidates.import_only, vec!["x.import.scss", "_x.import.scss"]);
        assert_eq!(candidates.default, vec!["x.scss", "_x.scss"]);

        let candidates = CandidateSet::new("x", Some("css"), false);
        assert!(candidates.import_only.is_empty());
        assert_eq!(candidates.default, vec!["x.css", "_x.css"]);
    }

    #[test]
    fn test_candidates_without_extension() {
        let candidates = CandidateSet::new("x", None, true);
        assert_eq!(
            candidates.default,
            vec!["x.scss", "x.sass", "x.css", "_x.scss", "_x.sass", "_x.css"]
        );
        assert_eq!(
            candidates.import_only,
            vec![
                "x.import.scss",
                "x.import.sass",
                "x.import.css",
                "_x.import.scss",
                "_x.import.sass",
                "_x.import.css",
            ]
        );

        assert!(CandidateSet::new("x", None, false).import_only.is_empty());
    }

    #[test]
    fn test_resolves_partial() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "_x.scss");
        assert_eq!(resolve(temp.path(), "x", false), Some(temp.path().join("_x.scss")));
    }

    #[test]
    fn test_sass_file_preferred_over_css() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "_x.scss");
        touch(temp.path(), "x.css");
        assert_eq!(resolve(temp.path(), "x", false), Some(temp.path().join("_x.scss")));
    }

    #[test]
    fn test_import_only_files_require_from_import() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "x.import.scss");
        touch(temp.path(), "x.scss");

        assert_eq!(resolve(temp.path(), "x", false), Some(temp.path().join("x.scss")));
        assert_eq!(
            resolve(temp.path(), "x", true),
            Some(temp.path().join("x.import.scss"))
        );
    }

    #[test]
    fn test_import_only_with_explicit_extension() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "_x.import.scss");
        touch(temp.path(), "x.scss");

        assert_eq!(
            resolve(temp.path(), "x.scss", true),
            Some(temp.path().join("_x.import.scss"))
        );
        assert_eq!(
            resolve(temp.path(), "x.scss", false),
            Some(temp.path().join("x.scss"))
        );
    }

    #[test]
    fn test_two_sass_files_are_ambiguous() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "x.scss");
        touch(temp.path(), "x.sass");

        let cache = DirectoryCache::new();
        let result = ModuleResolver::new(&cache).resolve(&temp.path().join("x"), false);
        match result {
            Err(ImporterError::AmbiguousImport {
                directory,
                candidates,
            }) => {
                assert_eq!(directory, temp.path());
                assert_eq!(candidates, vec!["x.scss", "x.sass"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_and_regular_file_are_ambiguous() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "x.scss");
        touch(temp.path(), "_x.scss");

        let cache = DirectoryCache::new();
        let result = ModuleResolver::new(&cache).resolve(&temp.path().join("x.scss"), false);
        assert!(matches!(result, Err(ImporterError::AmbiguousImport { .. })));
    }

    #[test]
    fn test_two_css_files_are_ambiguous() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "x.css");
        touch(temp.path(), "_x.css");

        let cache = DirectoryCache::new();
        let result = ModuleResolver::new(&cache).resolve(&temp.path().join("x"), false);
        assert!(matches!(result, Err(ImporterError::AmbiguousImport { .. })));
    }

    #[test]
    fn test_explicit_extension() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "_x.scss");
        touch(temp.path(), "x.css");

        assert_eq!(
            resolve(temp.path(), "x.scss", false),
            Some(temp.path().join("_x.scss"))
        );
        assert_eq!(
            resolve(temp.path(), "x.css", false),
            Some(temp.path().join("x.css"))
        );
        assert_eq!(resolve(temp.path(), "x.sass", false), None);
    }

    #[test]
    fn test_directory_index_fallback() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "foo/_index.scss");
        assert_eq!(
            resolve(temp.path(), "foo", false),
            Some(temp.path().join("foo").join("_index.scss"))
        );
    }

    #[test]
    fn test_file_wins_over_directory_index() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "foo.scss");
        touch(temp.path(), "foo/_index.scss");
        assert_eq!(
            resolve(temp.path(), "foo", false),
            Some(temp.path().join("foo.scss"))
        );
    }

    #[test]
    fn test_index_fallback_is_one_level() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "foo/index/_index.scss");
        assert_eq!(resolve(temp.path(), "foo", false), None);
    }

    #[test]
    fn test_extension_disables_directory_check() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "foo.scss/_index.scss");
        assert_eq!(resolve(temp.path(), "foo.scss", false), None);
    }

    #[test]
    fn test_nested_specifier() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "shared/_b.scss");
        assert_eq!(
            resolve(temp.path(), "shared/b", true),
            Some(temp.path().join("shared").join("_b.scss"))
        );
    }

    #[test]
    fn test_not_found() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(resolve(temp.path(), "missing", true), None);
        assert_eq!(resolve(temp.path(), "nowhere/missing", false), None);
    }

    #[test]
    fn test_directory_listed_once() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "_a.scss");
        touch(temp.path(), "_b.scss");

        let cache = DirectoryCache::new();
        let resolver = ModuleResolver::new(&cache);
        resolver.resolve(&temp.path().join("a"), false).unwrap();
        resolver.resolve(&temp.path().join("b"), false).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_resolve_url() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "_x.scss");

        let cache = DirectoryCache::new();
        let resolver = ModuleResolver::new(&cache);
        let url = Url::from_file_path(temp.path().join("x")).unwrap();
        let resolved = resolver.resolve_url(&url, false).unwrap().unwrap();
        assert_eq!(resolved.to_file_path().unwrap(), temp.path().join("_x.scss"));

        let remote = Url::parse("https://example.com/x.scss").unwrap();
        assert_eq!(resolver.resolve_url(&remote, false).unwrap(), None);
    }
}
