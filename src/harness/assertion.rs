//! Structural reading of equality assertions.
//!
//! Recognizes test statements shaped like `assert call(args) == expected` and
//! recovers the argument list and the expected value. Pure and host-side: it
//! never runs anything, and a statement it does not understand simply yields
//! `None`.

use super::literal::{parse_arguments, parse_literal};
use serde_json::Value;

/// Operator words that make a comparison something other than a plain `==`.
const OPERATOR_WORDS: &[&str] = &["in", "is", "not", "and", "or", "if", "else", "lambda"];

/// What could be recovered from one assertion.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionShape {
    /// Callee text, e.g. `two_sum` or `Solution().two_sum`
    pub callee: String,
    /// Parsed argument list, or the raw argument text when not literal
    pub input_args: Value,
    /// Parsed right-hand side, or its raw text when not literal
    pub expected_value: Value,
}

/// Read `test_text` as an equality assertion against a call.
pub fn parse_assertion(test_text: &str) -> Option<AssertionShape> {
    let code = logical_line(test_text)?;
    let body = code.trim().strip_prefix("assert")?;
    if !body.starts_with(|c: char| c.is_whitespace() || c == '(') {
        return None;
    }

    let condition = match top_level_positions(body, |bytes, i| bytes[i] == b',').first() {
        Some(&comma) => &body[..comma],
        None => body,
    };
    let condition = unwrap_parens(condition.trim());

    let (lhs, rhs) = split_equality(condition)?;
    let (callee, args) = split_call(lhs)?;

    let input_args =
        parse_arguments(args).unwrap_or_else(|| Value::String(args.trim().to_string()));
    let expected_value =
        parse_literal(rhs).unwrap_or_else(|| Value::String(rhs.to_string()));

    Some(AssertionShape {
        callee: callee.to_string(),
        input_args,
        expected_value,
    })
}

/// Strip comments and line continuations; `None` when the text holds more
/// than one statement.
fn logical_line(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut ended = false;
    let mut scanner = Scanner::new(text);
    while let Some((i, c, in_code)) = scanner.advance() {
        if ended && !c.is_whitespace() {
            if in_code && c == '#' {
                scanner.skip_line();
                continue;
            }
            return None;
        }
        if !in_code {
            out.push(c);
            continue;
        }
        match c {
            '#' => scanner.skip_line(),
            '\\' if text[i + 1..].starts_with('\n') => {
                scanner.skip_one();
                out.push(' ');
            }
            ';' if scanner.depth == 0 => ended = true,
            '\n' if scanner.depth == 0 => ended = !out.trim().is_empty(),
            '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    Some(out.trim().to_string())
}

/// Byte offsets of top-level positions matching `pred`, outside strings and
/// brackets.
fn top_level_positions(text: &str, pred: impl Fn(&[u8], usize) -> bool) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut scanner = Scanner::new(text);
    while let Some((i, c, in_code)) = scanner.advance() {
        if in_code && scanner.depth == 0 && c.is_ascii() && !is_bracket(c) && pred(bytes, i) {
            found.push(i);
        }
    }
    found
}

fn is_bracket(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}')
}

/// Remove parentheses wrapping the whole expression.
fn unwrap_parens(mut text: &str) -> &str {
    while text.starts_with('(') && closing_of_first(text) == Some(text.len() - 1) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

/// Offset of the bracket closing the one that opens `text`.
fn closing_of_first(text: &str) -> Option<usize> {
    let mut scanner = Scanner::new(text);
    while let Some((i, c, in_code)) = scanner.advance() {
        if in_code && is_bracket(c) && scanner.depth == 0 {
            return Some(i);
        }
    }
    None
}

fn split_equality(condition: &str) -> Option<(&str, &str)> {
    let bytes = condition.as_bytes();
    let equals = top_level_positions(condition, |b, i| {
        b[i] == b'='
            && b.get(i + 1) == Some(&b'=')
            && (i == 0 || !matches!(b[i - 1], b'=' | b'!' | b'<' | b'>'))
    });
    if equals.len() != 1 {
        return None;
    }

    let other_operators = top_level_positions(condition, |b, i| match b[i] {
        b'<' | b'>' => true,
        b'!' => b.get(i + 1) == Some(&b'='),
        b':' => b.get(i + 1) == Some(&b'='),
        _ => false,
    });
    if !other_operators.is_empty() || has_operator_word(condition) {
        return None;
    }

    let at = equals[0];
    let lhs = condition[..at].trim();
    let rhs = condition[at + 2..].trim();
    if lhs.is_empty() || rhs.is_empty() || bytes.get(at + 2) == Some(&b'=') {
        return None;
    }
    Some((lhs, rhs))
}

fn has_operator_word(condition: &str) -> bool {
    let starts = top_level_positions(condition, |b, i| {
        let after_name = i > 0 && (b[i - 1].is_ascii_alphanumeric() || matches!(b[i - 1], b'_' | b'.'));
        b[i].is_ascii_alphabetic() && !after_name
    });
    starts.into_iter().any(|start| {
        let word: String = condition[start..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        OPERATOR_WORDS.contains(&word.as_str())
    })
}

/// Split `callee(args)` where the final `)` closes a top-level `(`.
fn split_call(lhs: &str) -> Option<(&str, &str)> {
    if !lhs.ends_with(')') {
        return None;
    }
    let open = last_top_level_open(lhs)?;

    let callee = lhs[..open].trim_end();
    let args = &lhs[open + 1..lhs.len() - 1];
    let starts_like_name = callee
        .chars()
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_');
    if !starts_like_name
        || !top_level_positions(callee, |b, i| b[i].is_ascii_whitespace()).is_empty()
    {
        return None;
    }
    Some((callee, args))
}

/// Offset of the `(` that opens the last top-level bracket group, if that
/// group is a parenthesis ending the text.
fn last_top_level_open(text: &str) -> Option<usize> {
    let mut last_open = None;
    let mut scanner = Scanner::new(text);
    while let Some((i, c, in_code)) = scanner.advance() {
        if !in_code {
            continue;
        }
        // depth is already updated for this character
        if matches!(c, '(' | '[' | '{') && scanner.depth == 1 {
            last_open = Some((i, c));
        }
    }
    match last_open {
        Some((i, '(')) if closing_of_first(&text[i..]) == Some(text.len() - 1 - i) => Some(i),
        _ => None,
    }
}

/// Character walker aware of Python strings and bracket depth.
struct Scanner<'a> {
    text: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    depth: usize,
    quote: Option<(char, bool)>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
            depth: 0,
            quote: None,
        }
    }

    fn skip_one(&mut self) {
        self.chars.next();
    }

    fn skip_line(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    /// Next character with its offset and whether it sits in code (as opposed
    /// to inside a string literal). Bracket depth is updated before return.
    fn advance(&mut self) -> Option<(usize, char, bool)> {
        let (i, c) = self.chars.next()?;

        if let Some((quote, triple)) = self.quote {
            if c == '\\' {
                self.chars.next();
                return Some((i, c, false));
            }
            if c == quote {
                if !triple {
                    self.quote = None;
                } else if self.text[i..].starts_with(&quote.to_string().repeat(3)) {
                    self.chars.next();
                    self.chars.next();
                    self.quote = None;
                }
            }
            return Some((i, c, false));
        }

        match c {
            '\'' | '"' => {
                let triple = self.text[i..].starts_with(&c.to_string().repeat(3));
                if triple {
                    self.chars.next();
                    self.chars.next();
                }
                self.quote = Some((c, triple));
                Some((i, c, false))
            }
            '(' | '[' | '{' => {
                self.depth += 1;
                Some((i, c, true))
            }
            ')' | ']' | '}' => {
                self.depth = self.depth.saturating_sub(1);
                Some((i, c, true))
            }
            _ => Some((i, c, true)),
        }
    }
}
