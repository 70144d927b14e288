//! Package lookup for bare specifiers such as `bootstrap/scss/functions`.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::{Path, PathBuf};

use url::Url;

use crate::importer::FileFinder;

/// Finds packages in an ordered list of package roots (e.g. `node_modules`).
///
/// A specifier may carry the webpack-style `~` prefix. Only the package
/// directory has to exist; the rest of the specifier is resolved afterwards
/// with the usual partial and index rules.
#[derive(Debug, Clone, Default)]
pub struct PackageFinder {
    roots: Vec<PathBuf>,
}

impl PackageFinder {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Path the specifier refers to under the first root that has the package.
    pub fn find(&self, specifier: &str) -> Option<PathBuf> {
        let specifier = specifier.strip_prefix('~').unwrap_or(specifier);
        let package = package_name(specifier)?;

        self.roots
            .iter()
            .find(|root| root.join(package).is_dir())
            .map(|root| root.join(specifier))
    }
}

impl FileFinder for PackageFinder {
    fn find_file_url(&self, specifier: &str, _from_import: bool) -> Option<Url> {
        let path = self.find(specifier)?;
        let path = std::path::absolute(&path).unwrap_or(path);
        Url::from_file_path(path).ok()
    }
}

/// The package part of a bare specifier: `name` or `@scope/name`.
fn package_name(specifier: &str) -> Option<&str> {
    if specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.contains(':')
        || Path::new(specifier).is_absolute()
    {
        return None;
    }

    let mut segments = specifier.splitn(3, '/');
    let first = segments.next()?;
    if !first.starts_with('@') {
        return Some(first);
    }

    // The scope alone is not a package
    let name = segments.next().filter(|name| !name.is_empty())?;
    Some(&specifier[..first.len() + 1 + name.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("bootstrap"), Some("bootstrap"));
        assert_eq!(package_name("bootstrap/scss/functions"), Some("bootstrap"));
        assert_eq!(package_name("@scope/pkg"), Some("@scope/pkg"));
        assert_eq!(package_name("@scope/pkg/theme"), Some("@scope/pkg"));
        assert_eq!(package_name("@scope"), None);
        assert_eq!(package_name("@scope/"), None);
        assert_eq!(package_name("./local"), None);
        assert_eq!(package_name("/abs/path"), None);
        assert_eq!(package_name("sass:math"), None);
        assert_eq!(package_name(""), None);
    }

    #[test]
    fn test_find_in_first_root_with_package() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("a/node_modules");
        let second = temp.path().join("b/node_modules");
        fs::create_dir_all(first.join("other")).unwrap();
        fs::create_dir_all(second.join("theme")).unwrap();

        let finder = PackageFinder::new([&first, &second]);
        assert_eq!(
            finder.find("~theme/scss/colors"),
            Some(second.join("theme/scss/colors"))
        );
        assert_eq!(finder.find("other"), Some(first.join("other")));
        assert_eq!(finder.find("missing/x"), None);
    }

    #[test]
    fn test_find_file_url() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("node_modules");
        fs::create_dir_all(root.join("@scope/pkg")).unwrap();

        let finder = PackageFinder::new([&root]);
        let url = finder.find_file_url("@scope/pkg/index", false).unwrap();
        assert_eq!(url.to_file_path().unwrap(), root.join("@scope/pkg/index"));
    }
}
