//! Permissive decoder for Python-literal style payloads.
//!
//! Accepts the subset of literal syntax that shows up in exported match
//! tables: single or double quoted strings, `True`/`False`/`None` (and their
//! JSON spellings), integers and floats, lists, tuples, sets and dicts with
//! trailing commas. The result is a `serde_json::Value` so both decoding
//! strategies hand the same tree to the shape classifier.

use crate::error::DecodeError;
use serde_json::{Map, Number, Value};

/// Same recursion limit serde_json applies, so both strategies reject the
/// same pathological nesting.
const MAX_DEPTH: usize = 128;

pub fn parse_literal(source: &str) -> Result<Value, DecodeError> {
    let mut parser = LiteralParser::new(source);
    parser.skip_whitespace();
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos < parser.bytes.len() {
        return Err(DecodeError::literal(parser.pos, "trailing characters"));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), DecodeError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(DecodeError::literal(
                self.pos,
                format!("expected '{}'", byte as char),
            ))
        }
    }

    fn parse_value(&mut self) -> Result<Value, DecodeError> {
        match self.peek() {
            None => Err(DecodeError::literal(self.pos, "unexpected end of input")),
            Some(open @ (b'[' | b'(' | b'{')) => self.parse_nested(open),
            Some(b'\'') | Some(b'"') => self.parse_string().map(Value::String),
            Some(b'u') | Some(b'U')
                if matches!(self.bytes.get(self.pos + 1), Some(b'\'') | Some(b'"')) =>
            {
                self.pos += 1;
                self.parse_string().map(Value::String)
            }
            Some(byte) if byte == b'-' || byte == b'+' || byte == b'.' || byte.is_ascii_digit() => {
                self.parse_number()
            }
            Some(byte) if byte.is_ascii_alphabetic() || byte == b'_' => self.parse_keyword(),
            Some(byte) => Err(DecodeError::literal(
                self.pos,
                format!("unexpected character '{}'", byte as char),
            )),
        }
    }

    fn parse_nested(&mut self, open: u8) -> Result<Value, DecodeError> {
        if self.depth >= MAX_DEPTH {
            return Err(DecodeError::literal(self.pos, "nesting too deep"));
        }

        self.depth += 1;
        let value = if open == b'{' {
            self.parse_braces()
        } else {
            self.parse_sequence(open)
        };
        self.depth -= 1;
        value
    }

    fn parse_sequence(&mut self, open: u8) -> Result<Value, DecodeError> {
        let close = if open == b'[' { b']' } else { b')' };
        self.expect(open)?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }

            items.push(self.parse_value()?);
            self.skip_whitespace();

            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(byte) if byte == close => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                _ => {
                    return Err(DecodeError::literal(
                        self.pos,
                        format!("expected ',' or '{}'", close as char),
                    ));
                }
            }
        }
    }

    /// Dict or set; the separator after the first element decides which.
    fn parse_braces(&mut self) -> Result<Value, DecodeError> {
        self.expect(b'{')?;
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(Map::new()));
        }

        let first = self.parse_value()?;
        self.skip_whitespace();

        if self.peek() == Some(b':') {
            self.parse_dict_from(first)
        } else {
            self.parse_set_from(first)
        }
    }

    fn parse_dict_from(&mut self, first_key: Value) -> Result<Value, DecodeError> {
        let mut map = Map::new();
        let mut key = first_key;

        loop {
            let key_offset = self.pos;
            let key_text = key_to_string(key)
                .ok_or_else(|| DecodeError::literal(key_offset, "unsupported dict key"))?;
            self.skip_whitespace();
            self.expect(b':')?;
            self.skip_whitespace();
            let value = self.parse_value()?;
            map.insert(key_text, value);
            self.skip_whitespace();

            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek() == Some(b'}') {
                        self.pos += 1;
                        return Ok(Value::Object(map));
                    }
                    key = self.parse_value()?;
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                _ => return Err(DecodeError::literal(self.pos, "expected ',' or '}'")),
            }
        }
    }

    fn parse_set_from(&mut self, first: Value) -> Result<Value, DecodeError> {
        let mut items = vec![first];

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek() == Some(b'}') {
                        self.pos += 1;
                        return Ok(Value::Array(items));
                    }
                    items.push(self.parse_value()?);
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                _ => return Err(DecodeError::literal(self.pos, "expected ',' or '}'")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, DecodeError> {
        let start = self.pos;
        let quote = self.peek().ok_or_else(|| DecodeError::literal(start, "expected quote"))?;
        self.pos += 1;

        let mut out = String::new();
        let mut run_start = self.pos;

        loop {
            let Some(byte) = self.peek() else {
                return Err(DecodeError::literal(start, "unterminated string"));
            };

            if byte == quote {
                out.push_str(&self.src[run_start..self.pos]);
                self.pos += 1;
                return Ok(out);
            }

            if byte == b'\n' {
                return Err(DecodeError::literal(self.pos, "newline in string"));
            }

            if byte == b'\\' {
                out.push_str(&self.src[run_start..self.pos]);
                self.pos += 1;
                self.parse_escape(&mut out)?;
                run_start = self.pos;
                continue;
            }

            self.pos += 1;
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), DecodeError> {
        let offset = self.pos;
        let Some(byte) = self.peek() else {
            return Err(DecodeError::literal(offset, "dangling escape"));
        };
        self.pos += 1;

        match byte {
            b'n' => out.push('\n'),
            b't' => out.push('\t'),
            b'r' => out.push('\r'),
            b'0' => out.push('\0'),
            b'\\' => out.push('\\'),
            b'\'' => out.push('\''),
            b'"' => out.push('"'),
            b'x' => out.push(self.parse_hex_escape(2)?),
            b'u' => out.push(self.parse_hex_escape(4)?),
            b'U' => out.push(self.parse_hex_escape(8)?),
            _ => {
                // Unknown escapes keep their backslash, as Python does.
                out.push('\\');
                self.pos -= 1;
                let ch = self.src[self.pos..]
                    .chars()
                    .next()
                    .ok_or_else(|| DecodeError::literal(offset, "dangling escape"))?;
                out.push(ch);
                self.pos += ch.len_utf8();
            }
        }

        Ok(())
    }

    fn parse_hex_escape(&mut self, digits: usize) -> Result<char, DecodeError> {
        let offset = self.pos;
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| DecodeError::literal(offset, "truncated escape"))?;
        let code = u32::from_str_radix(hex, 16)
            .map_err(|_| DecodeError::literal(offset, "invalid hex escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| DecodeError::literal(offset, "invalid code point"))
    }

    fn parse_number(&mut self) -> Result<Value, DecodeError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.pos += 1;
        }

        while let Some(byte) = self.peek() {
            let continues_exponent = (byte == b'-' || byte == b'+')
                && matches!(self.bytes.get(self.pos - 1), Some(b'e') | Some(b'E'));
            if byte.is_ascii_digit()
                || byte == b'.'
                || byte == b'_'
                || byte == b'e'
                || byte == b'E'
                || continues_exponent
            {
                self.pos += 1;
            } else {
                break;
            }
        }

        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let text = text.strip_prefix('+').unwrap_or(&text);

        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }

        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| DecodeError::literal(start, format!("invalid number '{}'", text)))
    }

    fn parse_keyword(&mut self) -> Result<Value, DecodeError> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphanumeric() || byte == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }

        match &self.src[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            other => Err(DecodeError::literal(
                start,
                format!("unknown identifier '{}'", other),
            )),
        }
    }
}

fn key_to_string(key: Value) -> Option<String> {
    match key {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Null => Some("None".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_quoted_dict() {
        let value = parse_literal("{'Vi': {'items': [23, 47], 'star': 2}}").unwrap();
        assert_eq!(value, json!({"Vi": {"items": [23, 47], "star": 2}}));
    }

    #[test]
    fn test_python_keywords_and_trailing_commas() {
        let value = parse_literal("[{'units': [], 'alive': True, 'note': None,},]").unwrap();
        assert_eq!(value, json!([{"units": [], "alive": true, "note": null}]));
    }

    #[test]
    fn test_tuples_and_sets_become_arrays() {
        assert_eq!(parse_literal("(1, 2)").unwrap(), json!([1, 2]));
        assert_eq!(parse_literal("{3, 4,}").unwrap(), json!([3, 4]));
        assert_eq!(parse_literal("{}").unwrap(), json!({}));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_literal("-7").unwrap(), json!(-7));
        assert_eq!(parse_literal("1_000").unwrap(), json!(1000));
        assert_eq!(parse_literal("2.5").unwrap(), json!(2.5));
        assert_eq!(parse_literal("1e3").unwrap(), json!(1000.0));
    }

    #[test]
    fn test_non_string_keys_are_stringified() {
        let value = parse_literal("{1: 'a', True: 'b'}").unwrap();
        assert_eq!(value, json!({"1": "a", "True": "b"}));
    }

    #[test]
    fn test_escapes_and_unicode() {
        let value = parse_literal(r#"{'블리츠크랭크': 'B', 'k': 'it\'s \x41'}"#).unwrap();
        assert_eq!(value, json!({"블리츠크랭크": "B", "k": "it's A"}));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_literal("not valid json{{").is_err());
        assert!(parse_literal("{'a': 1").is_err());
        assert!(parse_literal("'unterminated").is_err());
        assert!(parse_literal("[1, 2] extra").is_err());
        assert!(parse_literal("{(1, 2): 3}").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = format!("{}1{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&nested).is_ok());

        match parse_literal(&"[".repeat(200_000)) {
            Err(DecodeError::Literal { offset, message }) => {
                assert_eq!(offset, MAX_DEPTH);
                assert_eq!(message, "nesting too deep");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(parse_literal(&"{'a': ".repeat(10_000)).is_err());
    }

    #[test]
    fn test_error_reports_offset() {
        match parse_literal("[1, @]") {
            Err(DecodeError::Literal { offset, .. }) => assert_eq!(offset, 4),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
