//! Literal sublanguages
//!
//! Kinds are tried in a fixed order and the first match wins. Numbers check
//! what follows them so that a bare `12` is never taken from the front of
//! `12h`, `12:30` or `2024-01-01T...`.

use chrono::NaiveDateTime;
use ha_ast::{ClockTime, DurationLiteral, DurationUnit, Literal, Number, Property};

use crate::cursor::{is_ident_char, Fail, PResult, Parser};

impl<'src> Parser<'src> {
    pub(crate) fn literal(&mut self) -> PResult<Literal> {
        self.skip_trivia();

        let readers: [fn(&mut Self) -> PResult<Literal>; 9] = [
            Self::boolean,
            |p| p.float().map(|f| Literal::Number(Number::Float(f))),
            |p| p.integer().map(|i| Literal::Number(Number::Int(i))),
            |p| p.string().map(Literal::String),
            |p| p.duration().map(Literal::Duration),
            |p| p.clock_time().map(Literal::ClockTime),
            |p| p.timestamp().map(Literal::Timestamp),
            |p| p.object().map(Literal::Object),
            |p| p.array().map(Literal::Array),
        ];

        for read in readers {
            if let Some(literal) = self.attempt(read) {
                return Ok(literal);
            }
        }
        Err(Fail)
    }

    fn boolean(&mut self) -> PResult<Literal> {
        if self.eat_keyword("true") {
            Ok(Literal::Bool(true))
        } else if self.eat_keyword("false") {
            Ok(Literal::Bool(false))
        } else {
            Err(Fail)
        }
    }

    /// `-?digits.digits`
    pub(crate) fn float(&mut self) -> PResult<f64> {
        let start = self.start();
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let whole = digits_len(&rest[sign..]);
        if whole == 0 || !rest[sign + whole..].starts_with('.') {
            return self.fail("number");
        }
        let frac = digits_len(&rest[sign + whole + 1..]);
        if frac == 0 {
            return self.fail("number");
        }

        let len = sign + whole + 1 + frac;
        if !number_boundary(&rest[len..]) {
            return self.fail("number");
        }
        let value = rest[..len].parse().or_else(|_| self.fail("number"))?;
        self.pos = start + len;
        Ok(value)
    }

    /// `-?digits`
    pub(crate) fn integer(&mut self) -> PResult<i64> {
        let start = self.start();
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let digits = digits_len(&rest[sign..]);
        let len = sign + digits;
        if digits == 0 || !number_boundary(&rest[len..]) {
            return self.fail("number");
        }

        match rest[..len].parse() {
            Ok(value) => {
                self.pos = start + len;
                Ok(value)
            }
            Err(_) => {
                self.expect_at(start + len, "integer within range");
                Err(Fail)
            }
        }
    }

    /// Single- or double-quoted, no escapes
    pub(crate) fn string(&mut self) -> PResult<String> {
        let start = self.start();
        let rest = self.rest();
        let quote = match rest.chars().next() {
            Some(q @ ('\'' | '"')) => q,
            _ => return self.fail("string"),
        };

        match rest[1..].find(quote) {
            Some(end) => {
                self.pos = start + 1 + end + 1;
                Ok(rest[1..1 + end].to_string())
            }
            None => {
                self.expect_at(self.src_len(), "closing quote");
                Err(Fail)
            }
        }
    }

    /// `N{s,m,h}` with no space before the unit
    pub(crate) fn duration(&mut self) -> PResult<DurationLiteral> {
        let start = self.start();
        let rest = self.rest();
        let digits = digits_len(rest);
        let unit = rest[digits..].chars().next().and_then(DurationUnit::from_suffix);

        let Some(unit) = unit.filter(|_| digits > 0) else {
            return self.fail("duration");
        };
        let len = digits + 1;
        if rest[len..].chars().next().is_some_and(is_ident_char) {
            return self.fail("duration");
        }

        match rest[..digits].parse() {
            Ok(value) => {
                self.pos = start + len;
                Ok(DurationLiteral::new(value, unit))
            }
            Err(_) => {
                self.expect_at(start + len, "duration within range");
                Err(Fail)
            }
        }
    }

    /// `HH:MM`, exactly two digits each
    pub(crate) fn clock_time(&mut self) -> PResult<ClockTime> {
        let start = self.start();
        let bytes = self.rest().as_bytes();
        let shaped = bytes.len() >= 5
            && bytes[0].is_ascii_digit()
            && bytes[1].is_ascii_digit()
            && bytes[2] == b':'
            && bytes[3].is_ascii_digit()
            && bytes[4].is_ascii_digit()
            && bytes
                .get(5)
                .map_or(true, |b| !b.is_ascii_digit() && *b != b':');
        if !shaped {
            return self.fail("clock time");
        }

        let hour = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
        let minute = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
        match ClockTime::new(hour, minute) {
            Some(time) => {
                self.pos = start + 5;
                Ok(time)
            }
            None => {
                self.expect_at(start + 5, "valid clock time");
                Err(Fail)
            }
        }
    }

    /// `YYYY-MM-DDTHH:MM:SS`
    pub(crate) fn timestamp(&mut self) -> PResult<NaiveDateTime> {
        const LEN: usize = "YYYY-MM-DDTHH:MM:SS".len();

        let start = self.start();
        let rest = self.rest();
        let candidate = rest.get(..LEN).filter(|c| c.is_ascii());
        let boundary = rest
            .get(LEN..)
            .and_then(|r| r.chars().next())
            .map_or(true, |c| !is_ident_char(c) && c != ':');

        match candidate {
            Some(text) if boundary => {
                match NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
                    Ok(ts) => {
                        self.pos = start + LEN;
                        Ok(ts)
                    }
                    Err(_) => self.fail("timestamp"),
                }
            }
            _ => self.fail("timestamp"),
        }
    }

    /// `{ key: expr, key: expr }`, `,` or `;` between entries, trailing allowed
    pub(crate) fn object(&mut self) -> PResult<Vec<Property>> {
        self.symbol("{")?;
        let mut properties = Vec::new();

        loop {
            if self.eat("}") {
                break;
            }
            properties.push(self.property()?);
            if !(self.eat(",") || self.eat(";")) {
                self.symbol("}")?;
                break;
            }
        }

        Ok(properties)
    }

    /// `key: expr`
    pub(crate) fn property(&mut self) -> PResult<Property> {
        let start = self.start();
        let key = self.identifier()?;
        self.symbol(":")?;
        let value = self.expression()?;
        Ok(Property {
            key,
            value,
            span: self.span_from(start),
        })
    }

    /// `[expr, expr]`, trailing comma allowed
    pub(crate) fn array(&mut self) -> PResult<Vec<ha_ast::Expression>> {
        self.symbol("[")?;
        let mut items = Vec::new();

        loop {
            if self.eat("]") {
                break;
            }
            items.push(self.expression()?);
            if !self.eat(",") {
                self.symbol("]")?;
                break;
            }
        }

        Ok(items)
    }

    fn src_len(&self) -> usize {
        self.pos + self.rest().len()
    }
}

fn digits_len(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// A number must not run into an identifier, a clock time or a date
fn number_boundary(after: &str) -> bool {
    let mut chars = after.chars();
    match chars.next() {
        None => true,
        Some(c) if is_ident_char(c) || c == ':' => false,
        Some('-') => !chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) => true,
    }
}
