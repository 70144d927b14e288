//! Scanner for CSS `url()` function values.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This is not a CSS parser. It locates every `url(` in a stylesheet and
//! consumes the value that follows it according to the CSS Syntax Level 3
//! rules for url tokens and string tokens:
//!
//! - <https://www.w3.org/TR/css-syntax-3/#consume-url-token>
//! - <https://www.w3.org/TR/css-syntax-3/#consume-string-token>
//!
//! Escapes are simpler than in full CSS: a backslash before a line break is
//! a line continuation, and any other escaped character is taken literally.
//! Hex escapes are not decoded, so `\61` is the two characters `61`.
//!
//! Malformed values are skipped and scanning resumes right after the `url(`
//! that introduced them. Tokens are produced lazily and the scan can be
//! restarted at any time by calling [`find_urls`] again.

use std::iter::Peekable;

use memchr::memmem;

const URL_FUNCTION: &[u8] = b"url(";

/// A `url()` value found in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlToken {
    /// Byte offset where the value starts (at the opening quote, if quoted)
    pub start: usize,
    /// Byte offset where the replaceable span ends (after the closing quote,
    /// or at the closing parenthesis for unquoted values)
    pub end: usize,
    /// The value with quotes removed and escapes decoded
    pub value: String,
}

/// Find all `url()` values in `text`.
pub fn find_urls(text: &str) -> UrlTokens<'_> {
    UrlTokens { text, cursor: 0 }
}

/// Lazy iterator over the `url()` values of a stylesheet.
#[derive(Debug, Clone)]
pub struct UrlTokens<'a> {
    text: &'a str,
    cursor: usize,
}

impl Iterator for UrlTokens<'_> {
    type Item = UrlToken;

    fn next(&mut self) -> Option<UrlToken> {
        while self.cursor < self.text.len() {
            let Some(found) = memmem::find(&self.text.as_bytes()[self.cursor..], URL_FUNCTION)
            else {
                self.cursor = self.text.len();
                break;
            };

            let open = self.cursor + found + URL_FUNCTION.len();
            match consume_url(self.text, open) {
                Some(token) => {
                    self.cursor = token.end.max(open);
                    return Some(token);
                }
                None => self.cursor = open,
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Skipping whitespace after `url(`
    Leading,
    /// Inside a string delimited by the given quote
    Quoted(char),
    /// Inside an unquoted url value
    Unquoted,
    /// Whitespace after an unquoted value; only `)` may follow
    Trailing,
}

enum Escape {
    Newline,
    Char(char),
}

/// Consume a url value starting just after `url(`.
///
/// Returns `None` when the value is malformed or runs into the end of input.
fn consume_url(text: &str, open: usize) -> Option<UrlToken> {
    let mut chars = text[open..]
        .char_indices()
        .map(|(index, ch)| (open + index, ch))
        .peekable();

    let mut state = ScanState::Leading;
    let mut start = open;
    let mut value = String::new();

    loop {
        match state {
            ScanState::Leading => {
                let &(offset, ch) = chars.peek()?;
                if is_whitespace(ch) {
                    chars.next();
                    continue;
                }
                start = offset;
                if ch == '"' || ch == '\'' {
                    chars.next();
                    state = ScanState::Quoted(ch);
                } else {
                    state = ScanState::Unquoted;
                }
            }
            ScanState::Quoted(quote) => {
                let (offset, ch) = chars.next()?;
                match ch {
                    c if c == quote => {
                        return Some(UrlToken {
                            start,
                            end: offset + c.len_utf8(),
                            value,
                        });
                    }
                    // Raw line breaks end a string token as invalid
                    '\n' | '\u{c}' | '\r' => return None,
                    '\\' => match consume_escape(&mut chars)? {
                        Escape::Newline => {}
                        Escape::Char(c) => value.push(c),
                    },
                    c => value.push(c),
                }
            }
            ScanState::Unquoted => {
                let (offset, ch) = chars.next()?;
                match ch {
                    ')' => {
                        return Some(UrlToken {
                            start,
                            end: offset,
                            value,
                        });
                    }
                    '"' | '\'' | '(' => return None,
                    '\\' => match consume_escape(&mut chars)? {
                        // Escaped newlines are only valid inside strings
                        Escape::Newline => return None,
                        Escape::Char(c) => value.push(c),
                    },
                    c if is_whitespace(c) => state = ScanState::Trailing,
                    c => value.push(c),
                }
            }
            ScanState::Trailing => {
                let (offset, ch) = chars.next()?;
                match ch {
                    ')' => {
                        return Some(UrlToken {
                            start,
                            end: offset,
                            value,
                        });
                    }
                    c if is_whitespace(c) => {}
                    _ => return None,
                }
            }
        }
    }
}

/// Consume the character following a backslash.
///
/// `None` means the escape ran into the end of input.
fn consume_escape<I>(chars: &mut Peekable<I>) -> Option<Escape>
where
    I: Iterator<Item = (usize, char)>,
{
    let (_, ch) = chars.next()?;
    match ch {
        '\n' | '\u{c}' => Some(Escape::Newline),
        '\r' => {
            skip_line_feed(chars);
            Some(Escape::Newline)
        }
        c => Some(Escape::Char(c)),
    }
}

fn skip_line_feed<I>(chars: &mut Peekable<I>)
where
    I: Iterator<Item = (usize, char)>,
{
    if matches!(chars.peek(), Some(&(_, '\n'))) {
        chars.next();
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\u{c}' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(text: &str) -> Vec<String> {
        find_urls(text).map(|token| token.value).collect()
    }

    fn spans(text: &str) -> Vec<&str> {
        find_urls(text)
            .map(|token| &text[token.start..token.end])
            .collect()
    }

    #[test]
    fn test_no_urls() {
        assert!(find_urls("").next().is_none());
        assert!(find_urls(".a { color: red; }").next().is_none());
        assert!(find_urls("url").next().is_none());
    }

    #[test]
    fn test_unquoted_url() {
        let text = "a{b:url(x.png)}";
        let tokens: Vec<_> = find_urls(text).collect();
        assert_eq!(
            tokens,
            vec![UrlToken {
                start: 8,
                end: 13,
                value: "x.png".to_string(),
            }]
        );
    }

    #[test]
    fn test_quoted_span_includes_quotes() {
        let text = r#"a{b:url("a b.png")} c{d:url('c.png')}"#;
        assert_eq!(values(text), vec!["a b.png", "c.png"]);
        assert_eq!(spans(text), vec![r#""a b.png""#, "'c.png'"]);
    }

    #[test]
    fn test_surrounding_whitespace() {
        let text = "url(  \n x.png \t )";
        assert_eq!(values(text), vec!["x.png"]);
        assert_eq!(spans(text), vec!["x.png \t "]);

        let quoted = "url( 'y.png' )";
        assert_eq!(spans(quoted), vec!["'y.png'"]);
    }

    #[test]
    fn test_empty_url() {
        let tokens: Vec<_> = find_urls("url()").collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "");
        assert_eq!(tokens[0].start, tokens[0].end);

        assert_eq!(values("url('')"), vec![""]);
    }

    #[test]
    fn test_escaped_characters_unquoted() {
        let text = r"url(a\(b\)\ c.png)";
        assert_eq!(values(text), vec!["a(b) c.png"]);
        assert_eq!(spans(text), vec![r"a\(b\)\ c.png"]);
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let text = r#"url("it\"s.png")"#;
        assert_eq!(values(text), vec![r#"it"s.png"#]);
        assert_eq!(spans(text), vec![r#""it\"s.png""#]);
    }

    #[test]
    fn test_escaped_newline_in_string_is_dropped() {
        assert_eq!(values("url('a\\\nb.png')"), vec!["ab.png"]);
        assert_eq!(values("url('a\\\r\nb.png')"), vec!["ab.png"]);
    }

    #[test]
    fn test_escaped_newline_unquoted_is_invalid() {
        assert_eq!(values("url(a\\\nb.png) url(ok.png)"), vec!["ok.png"]);
    }

    #[test]
    fn test_escaped_digits_are_literal() {
        assert_eq!(values(r"url(\61.png)"), vec!["61.png"]);
        assert_eq!(values(r"url('\000041x')"), vec!["000041x"]);
        // The space after an escaped digit is not consumed by the escape
        assert_eq!(values(r"url(\41 b.png) url(ok.png)"), vec!["ok.png"]);
    }

    #[test]
    fn test_raw_newline_in_string_is_invalid() {
        assert_eq!(values("url('a\nb.png') url(c.png)"), vec!["c.png"]);
    }

    #[test]
    fn test_unterminated_values() {
        assert!(find_urls("url('abc").next().is_none());
        assert!(find_urls("url(abc").next().is_none());
        assert!(find_urls("url(abc  ").next().is_none());
        assert!(find_urls("url(abc\\").next().is_none());
        assert!(find_urls("url(").next().is_none());
    }

    #[test]
    fn test_invalid_unquoted_values_are_skipped() {
        assert_eq!(values(r#"url(a"b) url(x)"#), vec!["x"]);
        assert_eq!(values("url(a(b) url(x)"), vec!["x"]);
        assert_eq!(values("url(a b) url(x)"), vec!["x"]);
    }

    #[test]
    fn test_resumes_after_malformed_url() {
        let text = "url(url(a.png)";
        let tokens: Vec<_> = find_urls(text).collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "a.png");
        assert_eq!(tokens[0].start, 8);
    }

    #[test]
    fn test_multibyte_offsets() {
        let text = "a{b:url(été.png)} c{d:url('ü.svg')}";
        assert_eq!(values(text), vec!["été.png", "ü.svg"]);
        assert_eq!(spans(text), vec!["été.png", "'ü.svg'"]);
    }

    #[test]
    fn test_scan_is_restartable() {
        let text = "a{b:url(x.png)} c{d:url('y.png')} e{f:url(z)}";
        let first: Vec<_> = find_urls(text).collect();
        let second: Vec<_> = find_urls(text).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);

        let mut partial = find_urls(text);
        partial.next();
        let resumed: Vec<_> = partial.clone().collect();
        assert_eq!(resumed, first[1..].to_vec());
    }

    #[test]
    fn test_string_does_not_need_closing_paren() {
        assert_eq!(values("url('a.png'"), vec!["a.png"]);
    }
}
