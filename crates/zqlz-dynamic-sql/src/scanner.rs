//! Delimited token scanner
//!
//! Finds `open ... close` tokens in a string, hands each token's content to
//! a handler and splices the handler's result back into the output. The same
//! scanner serves every placeholder dialect in this crate: literal
//! substitution (`${...}`), bind parameters (`#{...}`) and configuration
//! variables.

use std::convert::Infallible;

/// Delimiters of literal-substitution placeholders.
pub const LITERAL_OPEN: &str = "${";
/// Delimiters of bind-parameter placeholders.
pub const BIND_OPEN: &str = "#{";
/// Close delimiter shared by both placeholder kinds.
pub const CLOSE: &str = "}";

const ESCAPE: u8 = b'\\';

/// A scanner for one open/close delimiter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenScanner<'a> {
    open: &'a str,
    close: &'a str,
}

impl<'a> TokenScanner<'a> {
    pub const fn new(open: &'a str, close: &'a str) -> Self {
        Self { open, close }
    }

    /// Scanner for `${...}` literal-substitution tokens.
    pub const fn literal() -> TokenScanner<'static> {
        TokenScanner::new(LITERAL_OPEN, CLOSE)
    }

    /// Scanner for `#{...}` bind-parameter tokens.
    pub const fn bind() -> TokenScanner<'static> {
        TokenScanner::new(BIND_OPEN, CLOSE)
    }

    /// Scans `input`, replacing each token with the handler's result.
    ///
    /// An open delimiter preceded by a backslash is kept as literal text and
    /// the backslash is dropped. Inside a token, a backslash-escaped close
    /// delimiter becomes part of the content; the first unescaped close ends
    /// the token. When the handler returns `Ok(None)` the token is reproduced
    /// verbatim. An unterminated token is copied through unchanged.
    pub fn scan<F, E>(&self, input: &str, mut handler: F) -> Result<String, E>
    where
        F: FnMut(&str) -> Result<Option<String>, E>,
    {
        let Some(mut start) = input.find(self.open) else {
            return Ok(input.to_string());
        };

        let bytes = input.as_bytes();
        let mut out = String::with_capacity(input.len());
        let mut offset = 0;

        loop {
            if start > 0 && bytes[start - 1] == ESCAPE {
                out.push_str(&input[offset..start - 1]);
                out.push_str(self.open);
                offset = start + self.open.len();
            } else {
                out.push_str(&input[offset..start]);
                offset = start + self.open.len();

                let mut content = String::new();
                let mut end = input[offset..].find(self.close).map(|i| i + offset);
                while let Some(pos) = end {
                    if pos > offset && bytes[pos - 1] == ESCAPE {
                        content.push_str(&input[offset..pos - 1]);
                        content.push_str(self.close);
                        offset = pos + self.close.len();
                        end = input[offset..].find(self.close).map(|i| i + offset);
                    } else {
                        content.push_str(&input[offset..pos]);
                        break;
                    }
                }

                match end {
                    None => {
                        out.push_str(&input[start..]);
                        offset = input.len();
                    }
                    Some(pos) => {
                        match handler(&content)? {
                            Some(replacement) => out.push_str(&replacement),
                            None => {
                                out.push_str(self.open);
                                out.push_str(&content);
                                out.push_str(self.close);
                            }
                        }
                        offset = pos + self.close.len();
                    }
                }
            }

            match input[offset..].find(self.open) {
                Some(next) => start = next + offset,
                None => break,
            }
        }

        out.push_str(&input[offset..]);
        Ok(out)
    }

    /// Infallible variant of [`scan`](Self::scan).
    pub fn replace<F>(&self, input: &str, mut handler: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        match self.scan::<_, Infallible>(input, |content| Ok(handler(content))) {
            Ok(out) => out,
            Err(never) => match never {},
        }
    }

    /// Returns true if `input` contains at least one complete token.
    pub fn contains_token(&self, input: &str) -> bool {
        let mut found = false;
        self.replace(input, |_| {
            found = true;
            None
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn upper(input: &str) -> String {
        TokenScanner::literal().replace(input, |c| Some(c.to_uppercase()))
    }

    #[test]
    fn test_replaces_tokens_in_order() {
        let mut seen = Vec::new();
        let out = TokenScanner::bind().replace("a = #{a} and b = #{b}", |c| {
            seen.push(c.to_string());
            Some("?".into())
        });

        assert_eq!(out, "a = ? and b = ?");
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn test_text_without_tokens_is_unchanged() {
        assert_eq!(upper("SELECT 1"), "SELECT 1");
        assert_eq!(upper(""), "");
    }

    #[test]
    fn test_escaped_open_is_literal() {
        assert_eq!(upper(r"cost \${price} is ${price}"), "cost ${price} is PRICE");
    }

    #[test]
    fn test_escaped_close_inside_token() {
        assert_eq!(upper(r"${a\}b}"), "A}B");
    }

    #[test]
    fn test_unterminated_token_is_copied() {
        assert_eq!(upper("x ${a} ${b"), "x A ${b");
    }

    #[test]
    fn test_no_replacement_keeps_token() {
        let out = TokenScanner::literal().replace("${keep} ${drop}", |c| {
            (c == "drop").then(String::new)
        });
        assert_eq!(out, "${keep} ");
    }

    #[test]
    fn test_dialects_do_not_overlap() {
        let out = TokenScanner::bind().replace("${lit} #{bind}", |_| Some("?".into()));
        assert_eq!(out, "${lit} ?");
    }

    #[test]
    fn test_handler_error_aborts() {
        let result: Result<String, String> =
            TokenScanner::literal().scan("${ok} ${bad}", |c| {
                if c == "bad" {
                    Err(format!("rejected {c}"))
                } else {
                    Ok(Some(c.into()))
                }
            });
        assert_eq!(result, Err("rejected bad".to_string()));
    }

    #[test]
    fn test_contains_token() {
        assert!(TokenScanner::literal().contains_token("order by ${col}"));
        assert!(!TokenScanner::literal().contains_token(r"order by \${col}"));
        assert!(!TokenScanner::literal().contains_token("id = #{id}"));
    }

    #[test]
    fn test_multibyte_text_around_tokens() {
        assert_eq!(upper("名前 = ${name} ✓"), "名前 = NAME ✓");
    }
}
