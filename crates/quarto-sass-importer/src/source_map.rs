//! Intermediate source maps for rebased stylesheets.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! When a stylesheet is rewritten, the compiler parses the rewritten text and
//! its own source map points into that text. The maps produced here bridge
//! the rewritten text back to the file on disk so the orchestrator can chain
//! them with the compiler's map.
//!
//! Maps are high resolution: every unchanged character gets its own segment.
//! A replaced `url()` value maps, as a whole, to the start of the original
//! value. Columns are counted in UTF-16 code units as Source Map v3 requires.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rebase::UrlEdit;

const BASE64_DIGITS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A Source Map v3 document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_content: Vec<Option<String>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

impl RawSourceMap {
    /// Build the map from `original` to the result of applying `edits`.
    ///
    /// `source` names the original file (the canonical URL) and the original
    /// text is embedded as the source content.
    pub fn from_edits(source: &str, original: &str, edits: &[UrlEdit]) -> Self {
        let mut builder = MappingsBuilder::default();

        let mut cursor = 0;
        for edit in edits {
            builder.unchanged(&original[cursor..edit.start]);
            builder.replaced(&original[edit.start..edit.end], &edit.replacement);
            cursor = edit.end;
        }
        builder.unchanged(&original[cursor..]);

        RawSourceMap {
            version: 3,
            file: None,
            sources: vec![source.to_string()],
            sources_content: vec![Some(original.to_string())],
            names: Vec::new(),
            mappings: builder.finish(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Position in a text, 0-indexed, with UTF-16 columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Position {
    line: i64,
    column: i64,
}

impl Position {
    fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += ch.len_utf16() as i64;
        }
    }
}

#[derive(Debug, Default)]
struct MappingsBuilder {
    mappings: String,
    generated: Position,
    original: Position,
    line_has_segments: bool,
    previous_generated_column: i64,
    previous_original: Position,
}

impl MappingsBuilder {
    /// Text copied verbatim: one segment per character.
    fn unchanged(&mut self, text: &str) {
        for ch in text.chars() {
            if ch != '\n' {
                self.segment();
            }
            self.advance_generated(ch);
            self.original.advance(ch);
        }
    }

    /// Text replaced by `replacement`: a single segment at its start.
    fn replaced(&mut self, original: &str, replacement: &str) {
        self.segment();
        for ch in replacement.chars() {
            self.advance_generated(ch);
        }
        for ch in original.chars() {
            self.original.advance(ch);
        }
    }

    fn advance_generated(&mut self, ch: char) {
        if ch == '\n' {
            self.mappings.push(';');
            self.line_has_segments = false;
            self.previous_generated_column = 0;
        }
        self.generated.advance(ch);
    }

    fn segment(&mut self) {
        if self.line_has_segments {
            self.mappings.push(',');
        }
        encode_vlq(
            &mut self.mappings,
            self.generated.column - self.previous_generated_column,
        );
        // Single source
        encode_vlq(&mut self.mappings, 0);
        encode_vlq(
            &mut self.mappings,
            self.original.line - self.previous_original.line,
        );
        encode_vlq(
            &mut self.mappings,
            self.original.column - self.previous_original.column,
        );

        self.previous_generated_column = self.generated.column;
        self.previous_original = self.original;
        self.line_has_segments = true;
    }

    fn finish(self) -> String {
        self.mappings
    }
}

/// Append `value` as a base64 VLQ.
fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64_DIGITS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Intermediate source maps of one run, keyed by canonical file URL.
///
/// Only rebased files get an entry. The table is written while stylesheets
/// load and drained by whoever merges the final source map.
#[derive(Debug, Default)]
pub struct RebaseSourceMaps {
    maps: RefCell<BTreeMap<String, RawSourceMap>>,
}

impl RebaseSourceMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the map for `url`, replacing any earlier map for the same file.
    pub fn insert(&self, url: impl Into<String>, map: RawSourceMap) {
        self.maps.borrow_mut().insert(url.into(), map);
    }

    pub fn get(&self, url: &str) -> Option<RawSourceMap> {
        self.maps.borrow().get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.maps.borrow().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.maps.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.borrow().is_empty()
    }

    /// Remove and return every recorded map.
    pub fn take(&self) -> BTreeMap<String, RawSourceMap> {
        std::mem::take(&mut *self.maps.borrow_mut())
    }
}
