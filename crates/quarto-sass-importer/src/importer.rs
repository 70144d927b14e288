//! The canonicalize/load importer protocol and the rebasing importers.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A Sass host resolves every `@use`/`@import` in two steps: it asks each
//! importer in turn to `canonicalize` the specifier, and then asks the
//! importer that answered to `load` the canonical URL.
//!
//! All rebasing importers load the same way (see [`RebaseContext::load`]) and
//! differ only in how they turn a specifier into a path to resolve. That
//! difference is the [`CanonicalizeStrategy`]:
//!
//! - [`Relative`]: `file:` URLs, or specifiers relative to the containing file
//! - [`Module`]: package specifiers located by a [`FileFinder`]
//! - [`LoadPaths`]: specifiers looked up in an ordered list of directories

use std::fmt::Debug;
use std::path::PathBuf;
use std::rc::Rc;

use url::Url;

use crate::context::RebaseContext;
use crate::error::ImporterError;
use crate::resolve::ModuleResolver;
use crate::syntax::Syntax;

/// Options passed along with a specifier to `canonicalize`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalizeOptions<'a> {
    /// Whether the specifier comes from `@import` (as opposed to `@use`/`@forward`)
    pub from_import: bool,
    /// Canonical URL of the stylesheet containing the rule, if known
    pub containing_url: Option<&'a Url>,
}

impl<'a> CanonicalizeOptions<'a> {
    pub fn new(from_import: bool) -> Self {
        Self {
            from_import,
            containing_url: None,
        }
    }

    pub fn with_containing_url(mut self, containing_url: &'a Url) -> Self {
        self.containing_url = Some(containing_url);
        self
    }
}

/// A loaded stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImporterResult {
    /// Stylesheet text with relative `url()` values rebased
    pub contents: String,
    pub syntax: Syntax,
    /// URL that source maps should attribute `contents` to
    pub source_map_url: Url,
}

/// The two-method importer protocol.
pub trait Importer {
    /// Turn `specifier` into a canonical URL, or `None` if this importer
    /// cannot resolve it.
    ///
    /// Must be idempotent; the only side effect allowed is cache population.
    fn canonicalize(
        &self,
        specifier: &str,
        options: &CanonicalizeOptions<'_>,
    ) -> Result<Option<Url>, ImporterError>;

    /// Load a URL previously returned by [`Importer::canonicalize`].
    fn load(&self, canonical_url: &Url) -> Result<Option<ImporterResult>, ImporterError>;
}

/// How an importer turns a specifier into something the resolver can check.
pub trait CanonicalizeStrategy {
    fn canonicalize(
        &self,
        resolver: ModuleResolver<'_>,
        specifier: &str,
        options: &CanonicalizeOptions<'_>,
    ) -> Result<Option<Url>, ImporterError>;
}

/// Locates package specifiers, e.g. in `node_modules`.
///
/// Returns a `file:` URL that is then resolved with the usual partial,
/// import-only and index rules. Any closure with the matching signature is a
/// finder.
pub trait FileFinder {
    fn find_file_url(&self, specifier: &str, from_import: bool) -> Option<Url>;
}

impl<F> FileFinder for F
where
    F: Fn(&str, bool) -> Option<Url>,
{
    fn find_file_url(&self, specifier: &str, from_import: bool) -> Option<Url> {
        self(specifier, from_import)
    }
}

fn is_file_url(specifier: &str) -> bool {
    specifier.starts_with("file:")
}

/// Resolves `file:` URLs and specifiers relative to the containing stylesheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relative;

impl CanonicalizeStrategy for Relative {
    fn canonicalize(
        &self,
        resolver: ModuleResolver<'_>,
        specifier: &str,
        options: &CanonicalizeOptions<'_>,
    ) -> Result<Option<Url>, ImporterError> {
        let url = match Url::parse(specifier) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let Some(base) = options.containing_url else {
                    return Ok(None);
                };
                match base.join(specifier) {
                    Ok(url) => url,
                    Err(_) => return Ok(None),
                }
            }
            Err(_) => return Ok(None),
        };

        resolver.resolve_url(&url, options.from_import)
    }
}

/// Resolves package specifiers found by a [`FileFinder`].
pub struct Module<F> {
    finder: F,
}

impl<F> Debug for Module<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("finder", &"<FileFinder>")
            .finish()
    }
}

impl<F: FileFinder> CanonicalizeStrategy for Module<F> {
    fn canonicalize(
        &self,
        resolver: ModuleResolver<'_>,
        specifier: &str,
        options: &CanonicalizeOptions<'_>,
    ) -> Result<Option<Url>, ImporterError> {
        if is_file_url(specifier) {
            return Relative.canonicalize(resolver, specifier, options);
        }

        match self.finder.find_file_url(specifier, options.from_import) {
            Some(url) => resolver.resolve_url(&url, options.from_import),
            None => Ok(None),
        }
    }
}

/// Resolves specifiers against an ordered list of directories.
///
/// The first directory that resolves the specifier wins.
#[derive(Debug, Clone, Default)]
pub struct LoadPaths {
    load_paths: Vec<PathBuf>,
}

impl LoadPaths {
    pub fn new<I, P>(load_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let load_paths = load_paths
            .into_iter()
            .map(Into::into)
            .map(|path: PathBuf| std::path::absolute(&path).unwrap_or(path))
            .collect();
        Self { load_paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.load_paths
    }
}

impl CanonicalizeStrategy for LoadPaths {
    fn canonicalize(
        &self,
        resolver: ModuleResolver<'_>,
        specifier: &str,
        options: &CanonicalizeOptions<'_>,
    ) -> Result<Option<Url>, ImporterError> {
        if is_file_url(specifier) {
            return Relative.canonicalize(resolver, specifier, options);
        }

        for load_path in &self.load_paths {
            let candidate = load_path.join(specifier);
            if let Some(resolved) = resolver.resolve(&candidate, options.from_import)? {
                return Url::from_file_path(&resolved)
                    .map(Some)
                    .map_err(|_| ImporterError::InvalidPath(resolved));
            }
        }
        Ok(None)
    }
}

/// An [`Importer`] that resolves with strategy `S` and loads with `url()`
/// rebasing.
#[derive(Debug)]
pub struct UrlRebasingImporter<S> {
    context: Rc<RebaseContext>,
    strategy: S,
}

pub type RelativeUrlRebasingImporter = UrlRebasingImporter<Relative>;
pub type ModuleUrlRebasingImporter<F> = UrlRebasingImporter<Module<F>>;
pub type LoadPathsUrlRebasingImporter = UrlRebasingImporter<LoadPaths>;

impl<S> UrlRebasingImporter<S> {
    pub fn with_strategy(context: Rc<RebaseContext>, strategy: S) -> Self {
        Self { context, strategy }
    }

    pub fn context(&self) -> &Rc<RebaseContext> {
        &self.context
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }
}

impl UrlRebasingImporter<Relative> {
    pub fn relative(context: Rc<RebaseContext>) -> Self {
        Self::with_strategy(context, Relative)
    }
}

impl<F: FileFinder> UrlRebasingImporter<Module<F>> {
    pub fn module(context: Rc<RebaseContext>, finder: F) -> Self {
        Self::with_strategy(context, Module { finder })
    }
}

impl UrlRebasingImporter<LoadPaths> {
    pub fn load_paths<I, P>(context: Rc<RebaseContext>, load_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_strategy(context, LoadPaths::new(load_paths))
    }
}

impl<S: CanonicalizeStrategy> Importer for UrlRebasingImporter<S> {
    fn canonicalize(
        &self,
        specifier: &str,
        options: &CanonicalizeOptions<'_>,
    ) -> Result<Option<Url>, ImporterError> {
        let canonical = self
            .strategy
            .canonicalize(self.context.resolver(), specifier, options)?;
        tracing::trace!(
            specifier,
            from_import = options.from_import,
            canonical = canonical.as_ref().map(Url::as_str),
            "Canonicalized"
        );
        Ok(canonical)
    }

    fn load(&self, canonical_url: &Url) -> Result<Option<ImporterResult>, ImporterError> {
        self.context.load(canonical_url)
    }
}

/// A canonical URL together with the importer that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonicalized {
    /// Position of the importer in the chain
    pub importer: usize,
    pub url: Url,
}

/// Importers consulted in order, the way a Sass host walks its importer list.
#[derive(Default)]
pub struct ImporterChain {
    importers: Vec<Box<dyn Importer>>,
}

impl Debug for ImporterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImporterChain")
            .field("importers", &self.importers.len())
            .finish()
    }
}

impl ImporterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, importer: impl Importer + 'static) {
        self.importers.push(Box::new(importer));
    }

    pub fn with(mut self, importer: impl Importer + 'static) -> Self {
        self.push(importer);
        self
    }

    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    /// Ask each importer in turn; the first canonical URL wins.
    ///
    /// An error (such as an ambiguous import) stops the search.
    pub fn canonicalize(
        &self,
        specifier: &str,
        options: &CanonicalizeOptions<'_>,
    ) -> Result<Option<Canonicalized>, ImporterError> {
        for (index, importer) in self.importers.iter().enumerate() {
            if let Some(url) = importer.canonicalize(specifier, options)? {
                return Ok(Some(Canonicalized {
                    importer: index,
                    url,
                }));
            }
        }
        tracing::debug!(specifier, "No importer could resolve specifier");
        Ok(None)
    }

    /// Load a URL with the importer that canonicalized it.
    pub fn load(
        &self,
        canonicalized: &Canonicalized,
    ) -> Result<Option<ImporterResult>, ImporterError> {
        match self.importers.get(canonicalized.importer) {
            Some(importer) => importer.load(&canonicalized.url),
            None => Ok(None),
        }
    }

    /// Canonicalize and then load `specifier`.
    pub fn import(
        &self,
        specifier: &str,
        options: &CanonicalizeOptions<'_>,
    ) -> Result<Option<(Canonicalized, ImporterResult)>, ImporterError> {
        let Some(canonicalized) = self.canonicalize(specifier, options)? else {
            return Ok(None);
        };
        Ok(self
            .load(&canonicalized)?
            .map(|result| (canonicalized, result)))
    }
}
