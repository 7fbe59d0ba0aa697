//! Tokenizer for directive expressions.

use crate::ExprError;
use serde_json::Number;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Hash,
    Ident(String),
    Str(String),
    Number(Number),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Plus,
    Bang,
    EqEq,
    NotEq,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (position, c) = chars[i];
        let single = match c {
            '#' => Some(TokenKind::Hash),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            '.' => Some(TokenKind::Dot),
            ',' => Some(TokenKind::Comma),
            '+' => Some(TokenKind::Plus),
            _ => None,
        };
        if let Some(kind) = single {
            tokens.push(Token { kind, position });
            i += 1;
            continue;
        }

        match c {
            c if c.is_whitespace() => i += 1,
            '!' | '=' => {
                let next = chars.get(i + 1).map(|(_, c)| *c);
                let kind = match (c, next) {
                    ('!', Some('=')) => TokenKind::NotEq,
                    ('=', Some('=')) => TokenKind::EqEq,
                    ('!', _) => TokenKind::Bang,
                    _ => return Err(ExprError::syntax(position, "expected '=='")),
                };
                i += if kind == TokenKind::Bang { 1 } else { 2 };
                tokens.push(Token { kind, position });
            }
            '\'' | '"' => {
                let (text, next) = read_string(&chars, i, c)?;
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    position,
                });
                i = next;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    // A dot not followed by a digit is member access, not a decimal point.
                    if chars[i].1 == '.'
                        && !chars.get(i + 1).is_some_and(|(_, c)| c.is_ascii_digit())
                    {
                        break;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|(_, c)| c).collect();
                let number = parse_number(&text)
                    .ok_or_else(|| ExprError::syntax(position, format!("invalid number '{}'", text)))?;
                tokens.push(Token {
                    kind: TokenKind::Number(number),
                    position,
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|(_, c)| c).collect();
                tokens.push(Token {
                    kind: TokenKind::Ident(text),
                    position,
                });
            }
            other => {
                return Err(ExprError::syntax(
                    position,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}

/// Read a quoted string starting at `start`. A doubled quote escapes itself.
fn read_string(
    chars: &[(usize, char)],
    start: usize,
    quote: char,
) -> Result<(String, usize), ExprError> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            if chars.get(i + 1).map(|(_, c)| *c) == Some(quote) {
                text.push(quote);
                i += 2;
                continue;
            }
            return Ok((text, i + 1));
        }
        text.push(c);
        i += 1;
    }
    Err(ExprError::syntax(chars[start].0, "unterminated string literal"))
}

fn parse_number(text: &str) -> Option<Number> {
    if text.contains('.') {
        text.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        text.parse::<i64>().ok().map(Number::from)
    }
}
