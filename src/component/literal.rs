//! Static evaluation of JavaScript literals.
//!
//! Accepts the subset of JavaScript that is plain data: object and array
//! literals, strings (including template literals without `${}`), numbers,
//! `true`/`false`/`null`/`undefined`, comments and trailing commas. Anything
//! that would need a runtime (identifiers, calls, spreads, methods) is an
//! error pointing at the offending byte.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Evaluate the literal at the start of `src` (leading trivia allowed).
///
/// Returns the value and the byte offset just past it.
pub fn parse_literal(src: &str) -> Result<(Value, usize), LiteralError> {
    let mut parser = Parser { src, pos: 0 };
    let value = parser.value()?;
    Ok((value, parser.pos))
}

/// Skip whitespace and comments from `pos`, returning the new offset.
pub fn skip_trivia(src: &str, pos: usize) -> Result<usize, LiteralError> {
    let mut parser = Parser { src, pos };
    parser.skip_trivia()?;
    Ok(parser.pos)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected `{expected}`, found `{c}`"))),
            None => Err(self.error(format!("expected `{expected}`, found end of input"))),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LiteralError> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if trimmed.starts_with("/*") {
                let end = trimmed
                    .find("*/")
                    .ok_or_else(|| self.error("unterminated comment"))?;
                self.pos += end + 2;
            } else {
                return Ok(());
            }
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some(quote @ ('"' | '\'')) => self.string(quote).map(Value::String),
            Some('`') => self.template().map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                let ident = self.ident();
                match ident {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "undefined" => Ok(Value::Null),
                    _ => Err(LiteralError {
                        offset: start,
                        message: format!("`{ident}` is not a literal"),
                    }),
                }
            }
            Some(c) => Err(self.error(format!("unexpected `{c}`"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn object(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();

        loop {
            self.skip_trivia()?;
            let key = match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                Some(quote @ ('"' | '\'')) => self.string(quote)?,
                Some(c) if c.is_ascii_digit() => match self.number()? {
                    Value::Number(n) => n.to_string(),
                    _ => unreachable!("number() only yields numbers"),
                },
                Some(c) if is_ident_start(c) => self.ident().to_owned(),
                Some('[') => return Err(self.error("computed keys are not supported")),
                Some('.') => return Err(self.error("spread is not supported")),
                Some(c) => return Err(self.error(format!("unexpected `{c}` in object"))),
                None => return Err(self.error("unterminated object")),
            };

            self.skip_trivia()?;
            match self.peek() {
                Some(':') => self.pos += 1,
                Some('(') => return Err(self.error(format!("method `{key}` is not supported"))),
                Some(',' | '}') => {
                    return Err(self.error(format!("shorthand property `{key}` is not supported")));
                }
                _ => self.expect(':')?,
            }

            let value = self.value()?;
            map.insert(key, value);

            self.skip_trivia()?;
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => self.expect('}')?,
            }
        }
    }

    fn array(&mut self) -> Result<Value, LiteralError> {
        self.expect('[')?;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                Some('.') if self.rest().starts_with("...") => {
                    return Err(self.error("spread is not supported"));
                }
                None => return Err(self.error("unterminated array")),
                _ => {}
            }

            items.push(self.value()?);

            self.skip_trivia()?;
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {}
                _ => self.expect(']')?,
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some('\n') | None => return Err(self.error("unterminated string")),
                Some(c) => out.push(c),
            }
        }
    }

    fn template(&mut self) -> Result<String, LiteralError> {
        self.expect('`')?;
        let mut out = String::new();
        loop {
            if self.rest().starts_with("${") {
                return Err(self.error("template substitutions are not supported"));
            }
            match self.bump() {
                Some('`') => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated template literal")),
            }
        }
    }

    /// Called after a backslash.
    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let c = self.bump().ok_or_else(|| self.error("unterminated escape"))?;
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // line continuation
            '\n' => {}
            'x' => {
                let code = self.hex_digits(2)?;
                out.push(self.char_from(code)?);
            }
            'u' if self.peek() == Some('{') => {
                self.pos += 1;
                let end = self
                    .rest()
                    .find('}')
                    .ok_or_else(|| self.error("unterminated unicode escape"))?;
                let code = u32::from_str_radix(&self.rest()[..end], 16)
                    .map_err(|_| self.error("invalid unicode escape"))?;
                self.pos += end + 1;
                out.push(self.char_from(code)?);
            }
            'u' => {
                let code = self.hex_digits(4)?;
                out.push(self.char_from(code)?);
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32, LiteralError> {
        let digits = self
            .rest()
            .get(..count)
            .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid hex escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += count;
        Ok(code)
    }

    fn char_from(&self, code: u32) -> Result<char, LiteralError> {
        char::from_u32(code).ok_or_else(|| self.error(format!("invalid code point {code:#x}")))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.pos += 1;
                true
            }
            Some('+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };

        let radix = match self.rest().get(..2) {
            Some("0x" | "0X") => Some(16),
            Some("0o" | "0O") => Some(8),
            Some("0b" | "0B") => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_digit(radix) || c == '_') {
                self.pos += 1;
            }
            let digits = self.src[digits_start..self.pos].replace('_', "");
            let value = i64::from_str_radix(&digits, radix).map_err(|_| LiteralError {
                offset: start,
                message: "invalid integer literal".into(),
            })?;
            return Ok(Value::from(if negative { -value } else { value }));
        }

        let digits_start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' | 'e' | 'E' => is_float = true,
                '+' | '-' if matches!(self.src.as_bytes()[self.pos - 1], b'e' | b'E') => {}
                _ => break,
            }
            self.pos += 1;
        }
        let text = self.src[digits_start..self.pos].replace('_', "");
        let invalid = || LiteralError {
            offset: start,
            message: format!("invalid number `{}`", &self.src[start..self.pos]),
        };

        if !is_float && let Ok(value) = text.parse::<i64>() {
            return Ok(Value::from(if negative { -value } else { value }));
        }
        let value: f64 = text.parse().map_err(|_| invalid())?;
        let value = if negative { -value } else { value };
        Number::from_f64(value).map(Value::Number).ok_or_else(invalid)
    }
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(src: &str) -> Value {
        parse_literal(src).unwrap().0
    }

    #[test]
    fn test_object_literal() {
        let value = eval(
            r#"{
                name: 'Card',
                "css": ["assets/card.css",],
                props: { title: `Hello`, count: 3, ratio: 0.5, draft: false, tag: null },
            }"#,
        );
        assert_eq!(
            value,
            json!({
                "name": "Card",
                "css": ["assets/card.css"],
                "props": { "title": "Hello", "count": 3, "ratio": 0.5, "draft": false, "tag": null }
            })
        );
    }

    #[test]
    fn test_comments_and_undefined() {
        let value = eval("/* head */ { // line\n a: undefined, /* mid */ b: [1, /* x */ 2] }");
        assert_eq!(value, json!({ "a": null, "b": [1, 2] }));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(eval("-42"), json!(-42));
        assert_eq!(eval("0x1F"), json!(31));
        assert_eq!(eval("1_000"), json!(1000));
        assert_eq!(eval("1.5e2"), json!(150.0));
        assert_eq!(eval(".5"), json!(0.5));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(eval(r#""a\"b\nA\u{1F600}\x41""#), json!("a\"b\nA😀A"));
        assert_eq!(eval(r"'it\'s'"), json!("it's"));
        assert_eq!(eval("`multi\nline`"), json!("multi\nline"));
    }

    #[test]
    fn test_consumed_offset() {
        let (value, end) = parse_literal("  [1, 2] ;").unwrap();
        assert_eq!(value, json!([1, 2]));
        assert_eq!(end, 8);
    }

    #[test]
    fn test_numeric_keys() {
        assert_eq!(eval("{ 1: 'one' }"), json!({ "1": "one" }));
    }

    #[test]
    fn test_rejects_runtime_constructs() {
        for src in [
            "{ data() { return {} } }",
            "{ title }",
            "{ [key]: 1 }",
            "{ ...base }",
            "[...items]",
            "`hello ${name}`",
            "someVariable",
            "{ a: fetch('x') }",
        ] {
            assert!(parse_literal(src).is_err(), "{src} should be rejected");
        }
    }

    #[test]
    fn test_error_offset() {
        let err = parse_literal("{ a: 1, b: value }").unwrap_err();
        assert_eq!(err.offset, 11);
        assert!(err.message.contains("value"));
    }

    #[test]
    fn test_unterminated() {
        assert!(parse_literal("{ a: 1").is_err());
        assert!(parse_literal("'abc").is_err());
        assert!(parse_literal("/* never").is_err());
        assert!(parse_literal("").is_err());
    }

    #[test]
    fn test_skip_trivia() {
        assert_eq!(skip_trivia("  // c\n ;", 0).unwrap(), 8);
    }
}
