//! Python literal displays mapped onto JSON values.
//!
//! Covers what benchmark assertions put on either side of `==`: `None`,
//! booleans, integers, floats, strings, lists, tuples, sets and dicts. Tuples
//! and sets become arrays; dict keys that are not strings use their JSON text.
//! Anything else (names, calls, operators, complex numbers, bytes, integers
//! wider than 64 bits) is not a literal and yields `None`.

use serde_json::{Map, Number, Value};

/// Containers nested deeper than this are not treated as literals. The
/// compiler rejects far shallower nesting, and the parser recurses per level.
const MAX_NESTING: usize = 100;

/// Parse a single literal expression.
pub fn parse_literal(text: &str) -> Option<Value> {
    let mut parser = LiteralParser::new(text);
    let value = parser.expression()?;
    parser.finish()?;
    Some(value)
}

/// Parse the inside of a call's parentheses.
///
/// One argument is returned as itself, several as an array, none as an empty
/// array.
pub fn parse_arguments(text: &str) -> Option<Value> {
    let mut parser = LiteralParser::new(text);
    parser.skip_ws();
    if parser.at_end() {
        return Some(Value::Array(Vec::new()));
    }

    let mut items = vec![parser.expression()?];
    let mut trailing_comma = false;
    loop {
        parser.skip_ws();
        if parser.at_end() {
            break;
        }
        parser.expect(',')?;
        parser.skip_ws();
        if parser.at_end() {
            trailing_comma = true;
            break;
        }
        items.push(parser.expression()?);
    }

    if items.len() == 1 && !trailing_comma {
        items.pop()
    } else {
        Some(Value::Array(items))
    }
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn expect(&mut self, c: char) -> Option<()> {
        (self.bump()? == c).then_some(())
    }

    fn finish(&mut self) -> Option<()> {
        self.skip_ws();
        self.at_end().then_some(())
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '\\' && matches!(self.peek_at(1), Some('\n')) {
                self.pos += 2;
            } else {
                break;
            }
        }
    }

    fn expression(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '[' | '(' | '{' => self.container(),
            '\'' | '"' => self.strings(),
            '-' | '+' => self.signed_number(),
            c if c.is_ascii_digit() => self.number(false),
            '.' if matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => self.number(false),
            c if c.is_alphabetic() || c == '_' => self.word(),
            _ => None,
        }
    }

    fn container(&mut self) -> Option<Value> {
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let value = match self.peek() {
            Some('[') => {
                self.bump();
                self.items(']').map(Value::Array)
            }
            Some('(') => self.parenthesized(),
            Some('{') => self.brace(),
            _ => None,
        };
        self.depth -= 1;
        value
    }

    /// Comma separated expressions up to `close`, trailing comma allowed.
    fn items(&mut self, close: char) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek()? == close {
                self.bump();
                return Some(items);
            }
            items.push(self.expression()?);
            self.skip_ws();
            match self.bump()? {
                ',' => continue,
                c if c == close => return Some(items),
                _ => return None,
            }
        }
    }

    fn parenthesized(&mut self) -> Option<Value> {
        self.expect('(')?;
        self.skip_ws();
        if self.peek()? == ')' {
            self.bump();
            return Some(Value::Array(Vec::new()));
        }
        let first = self.expression()?;
        self.skip_ws();
        match self.bump()? {
            ')' => Some(first),
            ',' => {
                let mut items = vec![first];
                items.extend(self.items(')')?);
                Some(Value::Array(items))
            }
            _ => None,
        }
    }

    fn brace(&mut self) -> Option<Value> {
        self.expect('{')?;
        self.skip_ws();
        if self.peek()? == '}' {
            self.bump();
            return Some(Value::Object(Map::new()));
        }
        let first = self.expression()?;
        self.skip_ws();
        if self.peek()? != ':' {
            return match self.bump()? {
                '}' => Some(Value::Array(vec![first])),
                ',' => {
                    let mut items = vec![first];
                    items.extend(self.items('}')?);
                    Some(Value::Array(items))
                }
                _ => None,
            };
        }

        let mut map = Map::new();
        let mut key = first;
        loop {
            self.expect(':')?;
            let value = self.expression()?;
            map.insert(key_text(key), value);
            self.skip_ws();
            match self.bump()? {
                '}' => return Some(Value::Object(map)),
                ',' => {
                    self.skip_ws();
                    if self.peek()? == '}' {
                        self.bump();
                        return Some(Value::Object(map));
                    }
                    key = self.expression()?;
                    self.skip_ws();
                }
                _ => return None,
            }
        }
    }

    fn word(&mut self) -> Option<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        if matches!(self.peek(), Some('\'') | Some('"')) {
            // String prefixes; bytes and f-strings are not representable.
            return match word.to_ascii_lowercase().as_str() {
                "r" | "u" => {
                    self.pos = start;
                    self.strings()
                }
                _ => None,
            };
        }

        match word.as_str() {
            "None" => Some(Value::Null),
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            _ => None,
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Option<Value> {
        let mut text = self.string()?;
        loop {
            let checkpoint = self.pos;
            self.skip_ws();
            let next_is_string = match self.peek() {
                Some('\'') | Some('"') => true,
                Some(c) if matches!(c, 'r' | 'R' | 'u' | 'U') => {
                    matches!(self.peek_at(1), Some('\'') | Some('"'))
                }
                _ => false,
            };
            if !next_is_string {
                self.pos = checkpoint;
                return Some(Value::String(text));
            }
            text.push_str(&self.string()?);
        }
    }

    fn string(&mut self) -> Option<String> {
        let mut raw = false;
        while let Some(c) = self.peek() {
            match c {
                'r' | 'R' => raw = true,
                'u' | 'U' => {}
                _ => break,
            }
            self.pos += 1;
        }

        let quote = self.bump()?;
        if quote != '\'' && quote != '"' {
            return None;
        }
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = self.bump()?;
            if c == quote {
                if !triple {
                    return Some(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Some(out);
                }
                out.push(c);
                continue;
            }
            match c {
                '\n' if !triple => return None,
                '\\' if raw => {
                    // A backslash still protects the next character in raw strings.
                    out.push('\\');
                    out.push(self.bump()?);
                }
                '\\' => self.escape(&mut out)?,
                _ => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Option<()> {
        let c = self.bump()?;
        match c {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(c),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0b}'),
            'x' => out.push(self.hex_escape(2)?),
            'u' => out.push(self.hex_escape(4)?),
            'U' => out.push(self.hex_escape(8)?),
            '0'..='7' => {
                let mut code = c.to_digit(8)?;
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code)?);
            }
            // \N{NAME} needs the unicode name table
            'N' => return None,
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Some(())
    }

    fn hex_escape(&mut self, digits: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            code = code * 16 + self.bump()?.to_digit(16)?;
        }
        char::from_u32(code)
    }

    fn signed_number(&mut self) -> Option<Value> {
        let negative = self.bump()? == '-';
        self.skip_ws();
        match self.peek()? {
            c if c.is_ascii_digit() || c == '.' => self.number(negative),
            _ => None,
        }
    }

    fn number(&mut self, negative: bool) -> Option<Value> {
        let start = self.pos;
        let radix_prefixed = self.peek() == Some('0')
            && matches!(self.peek_at(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-')
                && !radix_prefixed
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e' | 'E'))
                && self.pos > start;
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        number_value(&token, negative, radix_prefixed)
    }
}

fn number_value(token: &str, negative: bool, radix_prefixed: bool) -> Option<Value> {
    if token.starts_with('_') || token.ends_with('_') || token.contains("__") {
        return None;
    }
    let digits = token.replace('_', "");

    if radix_prefixed {
        let radix = match digits.as_bytes().get(1)? {
            b'x' | b'X' => 16,
            b'o' | b'O' => 8,
            _ => 2,
        };
        let magnitude = i128::from_str_radix(&digits[2..], radix).ok()?;
        return integer_value(magnitude, negative);
    }

    if digits.ends_with(['j', 'J']) {
        return None;
    }

    if digits.contains(['.', 'e', 'E']) {
        if !digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            return None;
        }
        let magnitude: f64 = digits.parse().ok()?;
        let value = if negative { -magnitude } else { magnitude };
        return Number::from_f64(value).map(Value::Number);
    }

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // Python rejects leading zeros on non-zero decimal integers.
    if digits.len() > 1 && digits.starts_with('0') && digits.chars().any(|c| c != '0') {
        return None;
    }
    let magnitude: i128 = digits.parse().ok()?;
    integer_value(magnitude, negative)
}

fn integer_value(magnitude: i128, negative: bool) -> Option<Value> {
    let value = if negative { -magnitude } else { magnitude };
    if let Ok(small) = i64::try_from(value) {
        return Some(Value::Number(small.into()));
    }
    u64::try_from(value).ok().map(|big| Value::Number(big.into()))
}

fn key_text(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(parse_literal("None"), Some(Value::Null));
        assert_eq!(parse_literal("True"), Some(json!(true)));
        assert_eq!(parse_literal(" 42 "), Some(json!(42)));
        assert_eq!(parse_literal("-7"), Some(json!(-7)));
        assert_eq!(parse_literal("- 7"), Some(json!(-7)));
        assert_eq!(parse_literal("1_000"), Some(json!(1000)));
        assert_eq!(parse_literal("0x1f"), Some(json!(31)));
        assert_eq!(parse_literal("0b101"), Some(json!(5)));
        assert_eq!(parse_literal("-0o17"), Some(json!(-15)));
        assert_eq!(parse_literal("2.5"), Some(json!(2.5)));
        assert_eq!(parse_literal(".5"), Some(json!(0.5)));
        assert_eq!(parse_literal("1e3"), Some(json!(1000.0)));
        assert_eq!(parse_literal("1.5e-2"), Some(json!(0.015)));
        assert_eq!(parse_literal("18446744073709551615"), Some(json!(u64::MAX)));
    }

    #[test]
    fn test_deep_nesting_is_not_a_literal() {
        let shallow = format!("{}1{}", "[".repeat(50), "]".repeat(50));
        assert!(parse_literal(&shallow).is_some());

        let deep = format!("{}1{}", "[".repeat(100_000), "]".repeat(100_000));
        assert_eq!(parse_literal(&deep), None);
        let deep = format!("{}1{}", "(".repeat(100_000), ",)".repeat(100_000));
        assert_eq!(parse_literal(&deep), None);
        let deep = format!("{}1{}", "{1: ".repeat(100_000), "}".repeat(100_000));
        assert_eq!(parse_arguments(&deep), None);
    }

    #[test]
    fn test_non_literals() {
        assert_eq!(parse_literal("x"), None);
        assert_eq!(parse_literal("f(1)"), None);
        assert_eq!(parse_literal("1 + 2"), None);
        assert_eq!(parse_literal("3j"), None);
        assert_eq!(parse_literal("b'abc'"), None);
        assert_eq!(parse_literal("f'{x}'"), None);
        assert_eq!(parse_literal("007"), None);
        assert_eq!(parse_literal("1e400"), None);
        assert_eq!(parse_literal("123456789012345678901234567890"), None);
        assert_eq!(parse_literal("[1, x]"), None);
        assert_eq!(parse_literal(""), None);
        assert_eq!(parse_literal("(1"), None);
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse_literal("'abc'"), Some(json!("abc")));
        assert_eq!(parse_literal(r#""a\"b""#), Some(json!("a\"b")));
        assert_eq!(parse_literal(r"'a\nb\x41é\101'"), Some(json!("a\nbAéA")));
        assert_eq!(parse_literal(r"r'a\nb'"), Some(json!("a\\nb")));
        assert_eq!(parse_literal("'ab' \"cd\""), Some(json!("abcd")));
        assert_eq!(parse_literal("'''x\n'y'''"), Some(json!("x\n'y")));
        assert_eq!(parse_literal("u'hi'"), Some(json!("hi")));
        assert_eq!(parse_literal("'unterminated"), None);
        assert_eq!(parse_literal("'a\nb'"), None);
    }

    #[test]
    fn test_containers() {
        assert_eq!(parse_literal("[1, 2, 3]"), Some(json!([1, 2, 3])));
        assert_eq!(parse_literal("[]"), Some(json!([])));
        assert_eq!(parse_literal("(1, 'a')"), Some(json!([1, "a"])));
        assert_eq!(parse_literal("(1,)"), Some(json!([1])));
        assert_eq!(parse_literal("(1)"), Some(json!(1)));
        assert_eq!(parse_literal("()"), Some(json!([])));
        assert_eq!(parse_literal("{1, 2}"), Some(json!([1, 2])));
        assert_eq!(parse_literal("{}"), Some(json!({})));
        assert_eq!(
            parse_literal("{'a': [1, (2, 3)], 'b': None,}"),
            Some(json!({"a": [1, [2, 3]], "b": null}))
        );
        assert_eq!(
            parse_literal("{1: 'x', True: 'y'}"),
            Some(json!({"1": "x", "true": "y"}))
        );
        assert_eq!(
            parse_literal("[[1, 2],\n [3, 4]]"),
            Some(json!([[1, 2], [3, 4]]))
        );
    }

    #[test]
    fn test_arguments() {
        assert_eq!(parse_arguments(""), Some(json!([])));
        assert_eq!(parse_arguments("  "), Some(json!([])));
        assert_eq!(parse_arguments("5"), Some(json!(5)));
        assert_eq!(parse_arguments("[1, 2]"), Some(json!([1, 2])));
        assert_eq!(parse_arguments("1, 2"), Some(json!([1, 2])));
        assert_eq!(parse_arguments("1,"), Some(json!([1])));
        assert_eq!(parse_arguments("'a, b', 3"), Some(json!(["a, b", 3])));
        assert_eq!(parse_arguments("x, 2"), None);
        assert_eq!(parse_arguments("n=3"), None);
        assert_eq!(parse_arguments("1,,2"), None);
    }
}
