//! Scanner for `@import`, `@use` and `@forward` rule specifiers.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Only quoted specifiers are recognized. Built-in modules (`sass:math`),
//! URLs and plain CSS imports are left out since they never reach the
//! filesystem.

use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"@(import|use|forward)\s+((?:"[^"\n]*"|'[^'\n]*')(?:\s*,\s*(?:"[^"\n]*"|'[^'\n]*'))*)"#,
    )
    .unwrap()
});

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"\n]*)"|'([^'\n]*)'"#).unwrap());

/// A specifier referenced by a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportRule {
    pub specifier: String,
    /// `@import` rather than `@use`/`@forward`
    pub from_import: bool,
}

/// Find the loadable specifiers of every import rule in `text`, in order.
pub(crate) fn find_import_rules(text: &str) -> Vec<ImportRule> {
    let mut rules = Vec::new();
    for captures in IMPORT_RULE.captures_iter(text) {
        let from_import = &captures[1] == "import";
        for quoted in QUOTED.captures_iter(&captures[2]) {
            let Some(specifier) = quoted.get(1).or_else(|| quoted.get(2)) else {
                continue;
            };
            let specifier = specifier.as_str();
            if is_loadable(specifier) {
                rules.push(ImportRule {
                    specifier: specifier.to_string(),
                    from_import,
                });
            }
        }
    }
    rules
}

fn is_loadable(specifier: &str) -> bool {
    !(specifier.is_empty() || specifier.contains(':') || specifier.ends_with(".css"))
}
