//! Rewriting of relative `url()` values.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Sass inlines imported files into the output of the entry stylesheet, so a
//! relative `url()` written in `shared/_b.scss` would otherwise be resolved
//! relative to the entry file once compiled. Every relative value is
//! rewritten to be relative to the entry directory instead.

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexer::find_urls;

/// Values that are not affected by relocating the stylesheet: absolute and
/// protocol-relative URLs, data URIs, fragments and root-relative paths.
static ABSOLUTE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((?:\w+:)?//|data:|chrome:|#|/)").unwrap());

/// A single replacement of a `url()` value span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEdit {
    /// Byte offset of the replaced span in the original text
    pub start: usize,
    /// End of the replaced span (exclusive)
    pub end: usize,
    /// Text written in place of the span
    pub replacement: String,
}

/// Whether a decoded `url()` value should be rebased.
///
/// Empty values and Sass variables (`$name`) are never paths.
pub fn should_rebase(value: &str) -> bool {
    !(value.is_empty() || value.starts_with('$') || ABSOLUTE_REFERENCE.is_match(value))
}

/// Rebase `value`, found in a stylesheet inside `stylesheet_directory`, so it
/// is relative to `entry_directory`.
///
/// The result always starts with `./`, uses forward slashes, and has the
/// characters that are not allowed in an unquoted `url()` escaped. When only
/// one of the two directories is absolute, the other is made absolute against
/// the working directory first. `None` means no relative path exists between
/// them.
pub fn rebase_url(entry_directory: &Path, stylesheet_directory: &Path, value: &str) -> Option<String> {
    let (entry_directory, stylesheet_directory) =
        if entry_directory.is_absolute() == stylesheet_directory.is_absolute() {
            (entry_directory.to_path_buf(), stylesheet_directory.to_path_buf())
        } else {
            (
                std::path::absolute(entry_directory).ok()?,
                std::path::absolute(stylesheet_directory).ok()?,
            )
        };

    let target = normalize_path(&stylesheet_directory.join(value));
    let base = normalize_path(&entry_directory);
    let relative = pathdiff::diff_paths(&target, &base)?;
    let relative = relative.to_string_lossy().replace('\\', "/");

    let mut rebased = String::with_capacity(relative.len() + 2);
    rebased.push_str("./");
    for ch in relative.chars() {
        // https://developer.mozilla.org/en-US/docs/Web/CSS/url#syntax
        if matches!(ch, '(' | ')' | '\'' | '"') || ch.is_whitespace() {
            rebased.push('\\');
        }
        rebased.push(ch);
    }
    Some(rebased)
}

/// Compute the edits needed to rebase every relative `url()` in `contents`.
///
/// Edits are returned in source order and never overlap. A value that cannot
/// be made relative to the entry directory is left as written and reported.
pub fn collect_rebase_edits(
    contents: &str,
    stylesheet_directory: &Path,
    entry_directory: &Path,
) -> Vec<UrlEdit> {
    find_urls(contents)
        .filter(|token| should_rebase(&token.value))
        .filter_map(|token| {
            let Some(replacement) =
                rebase_url(entry_directory, stylesheet_directory, &token.value)
            else {
                tracing::warn!(
                    value = %token.value,
                    stylesheet_directory = %stylesheet_directory.display(),
                    entry_directory = %entry_directory.display(),
                    "Cannot rebase url() value"
                );
                return None;
            };
            Some(UrlEdit {
                start: token.start,
                end: token.end,
                replacement,
            })
        })
        .collect()
}

/// Rewrite every relative `url()` in `contents` to be relative to
/// `entry_directory`.
pub fn rebase_stylesheet(contents: &str, stylesheet_directory: &Path, entry_directory: &Path) -> String {
    let edits = collect_rebase_edits(contents, stylesheet_directory, entry_directory);
    apply_edits(contents, &edits)
}

/// Apply sorted, non-overlapping edits to `contents` in a single pass.
pub fn apply_edits(contents: &str, edits: &[UrlEdit]) -> String {
    let added: usize = edits.iter().map(|edit| edit.replacement.len()).sum();
    let mut output = String::with_capacity(contents.len() + added);

    let mut cursor = 0;
    for edit in edits {
        debug_assert!(edit.start >= cursor && edit.end >= edit.start);
        output.push_str(&contents[cursor..edit.start]);
        output.push_str(&edit.replacement);
        cursor = edit.end;
    }
    output.push_str(&contents[cursor..]);
    output
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
///
/// Leading `..` components of relative paths are preserved; `..` at the root
/// stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_values_are_not_rebased() {
        for value in [
            "/a.png",
            "http://x/a.png",
            "https://x/a.png",
            "//cdn.example.com/a.png",
            "data:image/png;base64,AAAA",
            "chrome://settings/x.png",
            "#filter",
            "$var",
            "",
        ] {
            assert!(!should_rebase(value), "{value} should not be rebased");
        }
    }

    #[test]
    fn test_relative_values_are_rebased() {
        for value in ["a.png", "./a.png", "../a.png", "images/a b.png", "a.png?v=1"] {
            assert!(should_rebase(value), "{value} should be rebased");
        }
    }

    #[test]
    fn test_rebase_into_entry_directory() {
        assert_eq!(
            rebase_url(
                Path::new("src"),
                Path::new("src/app/styles"),
                "images/a.png"
            ),
            Some("./app/styles/images/a.png".to_string())
        );
    }

    #[test]
    fn test_rebase_same_directory() {
        assert_eq!(
            rebase_url(Path::new("/p/src"), Path::new("/p/src"), "./local.png").as_deref(),
            Some("./local.png")
        );
    }

    #[test]
    fn test_rebase_parent_references() {
        assert_eq!(
            rebase_url(Path::new("/p/src"), Path::new("/p/src/shared"), "../img/x.png").as_deref(),
            Some("./img/x.png")
        );
        assert_eq!(
            rebase_url(Path::new("/p/src/app"), Path::new("/p/src/shared"), "x.png").as_deref(),
            Some("./../shared/x.png")
        );
    }

    #[test]
    fn test_rebase_escapes_special_characters() {
        assert_eq!(
            rebase_url(Path::new("/p"), Path::new("/p/a"), "my image (1)'s\".png").as_deref(),
            Some(r#"./a/my\ image\ \(1\)\'s\".png"#)
        );
    }

    #[test]
    fn test_rebase_relative_stylesheet_against_absolute_entry() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            rebase_url(&cwd.join("src"), Path::new("src/shared"), "./img.png").as_deref(),
            Some("./shared/img.png")
        );
        assert_eq!(
            rebase_url(Path::new("src"), &cwd.join("src/shared"), "img.png").as_deref(),
            Some("./shared/img.png")
        );
    }

    #[test]
    fn test_unreachable_base_is_not_rebased() {
        // A base that climbs above a relative target has no relative path to it
        assert_eq!(rebase_url(Path::new("../out"), Path::new("src"), "a.png"), None);
        let edits = collect_rebase_edits("a{b:url(a.png)}", Path::new("src"), Path::new("../out"));
        assert!(edits.is_empty());
    }

    #[test]
    fn test_collect_edits_skips_non_relative_values() {
        let contents = "a{b:url(/root.png)} c{d:url($icon)} e{f:url(x.png)} g{h:url()}";
        let edits = collect_rebase_edits(contents, Path::new("/p/src/lib"), Path::new("/p/src"));
        assert_eq!(edits.len(), 1);
        assert_eq!(&contents[edits[0].start..edits[0].end], "x.png");
        assert_eq!(edits[0].replacement, "./lib/x.png");
    }

    #[test]
    fn test_apply_edits_in_one_pass() {
        let contents = "a{b:url(x.png)} c{d:url('y.png')}";
        let edits = collect_rebase_edits(contents, Path::new("/p/s"), Path::new("/p"));
        let output = apply_edits(contents, &edits);
        insta::assert_snapshot!(output, @"a{b:url(./s/x.png)} c{d:url(./s/y.png)}");
    }

    #[test]
    fn test_apply_no_edits_is_identity() {
        let contents = r"a{b:url(http://x/\(a\).png)}";
        assert_eq!(apply_edits(contents, &[]), contents);
        assert!(collect_rebase_edits(contents, Path::new("/p/s"), Path::new("/p")).is_empty());
    }

    #[test]
    fn test_rebase_stylesheet() {
        let contents = "@font-face{src:url(\"fonts/a b.woff\")}\n.x{background:url( ../img/x.png )}";
        let output = rebase_stylesheet(contents, Path::new("/p/src/theme"), Path::new("/p/src"));
        insta::assert_snapshot!(output, @r"
        @font-face{src:url(./theme/fonts/a\ b.woff)}
        .x{background:url( ./img/x.png)}
        ");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize_path(Path::new("../a/..")), PathBuf::from(".."));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
    }
}
