//! Lexical layer
//!
//! The parser is scannerless: every token reader skips trivia (whitespace,
//! `//` line comments, `/* */` block comments) and then matches directly on
//! the source text. Failed alternatives rewind `pos`; the furthest position
//! any alternative reached, together with what was expected there, becomes
//! the reported [`SyntaxError`].

use ha_ast::Span;

use crate::SyntaxError;

/// Marker for a failed alternative; details live in the parser's failure record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fail;

pub(crate) type PResult<T> = Result<T, Fail>;

pub(crate) struct Parser<'src> {
    src: &'src str,
    pub(crate) pos: usize,
    furthest: usize,
    expected: Vec<String>,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(src: &'src str) -> Self {
        Self {
            src,
            pos: 0,
            furthest: 0,
            expected: Vec::new(),
        }
    }

    /// Convert an internal result into the public error type
    pub(crate) fn finish<T>(self, result: PResult<T>) -> Result<T, SyntaxError> {
        result.map_err(|Fail| SyntaxError::at(self.src, self.furthest, self.expected))
    }

    pub(crate) fn rest(&self) -> &'src str {
        &self.src[self.pos..]
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Record that `what` would have been accepted at `pos`
    pub(crate) fn expect_at(&mut self, pos: usize, what: &str) {
        if pos > self.furthest {
            self.furthest = pos;
            self.expected.clear();
        }
        if pos == self.furthest && !self.expected.iter().any(|e| e == what) {
            self.expected.push(what.to_string());
        }
    }

    pub(crate) fn fail<T>(&mut self, what: &str) -> PResult<T> {
        self.expect_at(self.pos, what);
        Err(Fail)
    }

    /// Run `f`, rewinding to the starting position if it fails
    pub(crate) fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> Option<T> {
        let mark = self.pos;
        match f(self) {
            Ok(value) => Some(value),
            Err(Fail) => {
                self.pos = mark;
                None
            }
        }
    }

    /// Run `f`; if it fails without getting past its first token, report
    /// `label` instead of the individual alternatives it tried
    pub(crate) fn labeled<T>(
        &mut self,
        label: &str,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let start = self.start();
        let saved = (self.furthest, self.expected.clone());
        let result = f(self);
        if result.is_err() && self.furthest <= start {
            (self.furthest, self.expected) = saved;
            self.expect_at(start, label);
        }
        result
    }

    pub(crate) fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if let Some(body) = trimmed.strip_prefix("/*") {
                // Unterminated comments run to the end of input
                self.pos += match body.find("*/") {
                    Some(end) => 2 + end + 2,
                    None => trimmed.len(),
                };
            } else {
                break;
            }
        }
    }

    /// Skip trivia and return the position of the next token
    pub(crate) fn start(&mut self) -> usize {
        self.skip_trivia();
        self.pos
    }

    pub(crate) fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.pos)
    }

    pub(crate) fn at_end(&mut self) -> bool {
        self.skip_trivia();
        self.pos == self.src.len()
    }

    pub(crate) fn end_of_input(&mut self) -> PResult<()> {
        if self.at_end() {
            Ok(())
        } else {
            self.fail("end of input")
        }
    }

    /// Match punctuation; `=` does not match the start of `==`, nor `.` of `..`
    pub(crate) fn symbol(&mut self, sym: &'static str) -> PResult<()> {
        if self.eat(sym) {
            Ok(())
        } else {
            Err(Fail)
        }
    }

    /// Consume `sym` if present, recording it as expected otherwise
    pub(crate) fn eat(&mut self, sym: &'static str) -> bool {
        self.skip_trivia();
        let rest = self.rest();
        if rest.starts_with(sym) && !extends_operator(sym, &rest[sym.len()..]) {
            self.pos += sym.len();
            true
        } else {
            self.expect_at(self.pos, &format!("`{}`", sym));
            false
        }
    }

    pub(crate) fn keyword(&mut self, kw: &'static str) -> PResult<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(Fail)
        }
    }

    /// Consume keyword `kw` when it is not the prefix of a longer identifier
    pub(crate) fn eat_keyword(&mut self, kw: &'static str) -> bool {
        self.skip_trivia();
        let rest = self.rest();
        let matched = rest.starts_with(kw)
            && rest[kw.len()..]
                .chars()
                .next()
                .map_or(true, |c| !is_ident_char(c));

        if matched {
            self.pos += kw.len();
            true
        } else {
            self.expect_at(self.pos, &format!("`{}`", kw));
            false
        }
    }

    /// First of `keywords` present at the cursor
    pub(crate) fn keyword_any(&mut self, keywords: &[&'static str]) -> PResult<&'static str> {
        for kw in keywords {
            if self.eat_keyword(kw) {
                return Ok(kw);
            }
        }
        Err(Fail)
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`
    pub(crate) fn identifier(&mut self) -> PResult<String> {
        self.skip_trivia();
        self.raw_identifier()
    }

    fn raw_identifier(&mut self) -> PResult<String> {
        let rest = self.rest();
        match rest.chars().next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let len = rest
                    .find(|c: char| !is_ident_char(c))
                    .unwrap_or(rest.len());
                self.pos += len;
                Ok(rest[..len].to_string())
            }
            _ => self.fail("identifier"),
        }
    }

    /// `a.b.c` with no trivia around the dots
    pub(crate) fn dotted_path(&mut self) -> PResult<(Vec<String>, Span)> {
        let start = self.start();
        let mut path = vec![self.raw_identifier()?];

        loop {
            let rest = self.rest();
            let continues = rest.starts_with('.')
                && rest[1..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
            if !continues {
                break;
            }
            self.pos += 1;
            path.push(self.raw_identifier()?);
        }

        Ok((path, self.span_from(start)))
    }
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn extends_operator(sym: &str, after: &str) -> bool {
    match sym {
        "=" | "<" | ">" | "!" => after.starts_with('='),
        "." => after.starts_with('.'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_trivia_handles_comments() {
        let mut p = Parser::new("  // line\n /* block\n more */  home");
        assert!(p.eat_keyword("home"));
        assert!(p.at_end());
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let mut p = Parser::new("/* never closed home");
        assert!(p.at_end());
    }

    #[test]
    fn test_keyword_respects_word_boundary() {
        let mut p = Parser::new("homeowner");
        assert!(!p.eat_keyword("home"));
        assert_eq!(p.identifier(), Ok("homeowner".to_string()));
    }

    #[test]
    fn test_symbol_does_not_split_operators() {
        let mut p = Parser::new("== ..");
        assert!(!p.eat("="));
        assert!(p.eat("=="));
        assert!(!p.eat("."));
        assert!(p.eat(".."));
    }

    #[test]
    fn test_dotted_path_stops_at_range() {
        let mut p = Parser::new("home.kitchen..x");
        let (path, span) = p.dotted_path().unwrap();
        assert_eq!(path, vec!["home", "kitchen"]);
        assert_eq!(span, Span::new(0, 12));
        assert!(p.rest().starts_with(".."));
    }

    #[test]
    fn test_furthest_failure_wins() {
        let mut p = Parser::new("abc def");
        assert!(p.attempt(|p| {
            p.identifier()?;
            p.symbol("(")
        })
        .is_none());
        assert!(!p.eat("{"));

        let err = p.finish::<()>(Err(Fail)).unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.expected, vec!["`(`"]);
    }
}
