//! Expression tokenizer

use super::errors::{ExprError, ExprResult};

/// Expression token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    /// `@alias`
    Field(String),
    /// Function name
    Ident(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

/// A token with its character offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Splits an expression into tokens
pub fn tokenize(source: &str) -> ExprResult<Vec<Spanned>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let next = chars.get(pos + 1).copied();
        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '=' if next == Some('=') => {
                pos += 1;
                Token::Eq
            }
            '!' if next == Some('=') => {
                pos += 1;
                Token::Ne
            }
            '!' => Token::Not,
            '<' if next == Some('=') => {
                pos += 1;
                Token::Le
            }
            '<' => Token::Lt,
            '>' if next == Some('=') => {
                pos += 1;
                Token::Ge
            }
            '>' => Token::Gt,
            '&' if next == Some('&') => {
                pos += 1;
                Token::And
            }
            '|' if next == Some('|') => {
                pos += 1;
                Token::Or
            }
            '"' | '\'' => {
                let (text, end) = read_string(&chars, pos)?;
                pos = end;
                Token::Str(text)
            }
            '@' => {
                let end = scan(&chars, pos + 1, is_ident_char);
                if end == pos + 1 {
                    return Err(ExprError::syntax(start, "expected field name after '@'"));
                }
                let name: String = chars[pos + 1..end].iter().collect();
                pos = end - 1;
                Token::Field(name)
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let end = scan_number(&chars, pos);
                let text: String = chars[pos..end].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::syntax(start, format!("invalid number '{}'", text)))?;
                pos = end - 1;
                Token::Number(value)
            }
            c if is_ident_char(c) => {
                let end = scan(&chars, pos, is_ident_char);
                let name: String = chars[pos..end].iter().collect();
                pos = end - 1;
                Token::Ident(name)
            }
            other => {
                return Err(ExprError::syntax(start, format!("unexpected character '{}'", other)));
            }
        };

        tokens.push(Spanned {
            token,
            position: start,
        });
        pos += 1;
    }

    Ok(tokens)
}

fn scan(chars: &[char], from: usize, accept: impl Fn(char) -> bool) -> usize {
    let mut end = from;
    while end < chars.len() && accept(chars[end]) {
        end += 1;
    }
    end
}

/// Digits, one optional fraction and an optional exponent
fn scan_number(chars: &[char], from: usize) -> usize {
    let mut end = scan(chars, from, |c| c.is_ascii_digit());
    if chars.get(end) == Some(&'.') {
        end = scan(chars, end + 1, |c| c.is_ascii_digit());
    }
    if matches!(chars.get(end), Some('e') | Some('E')) {
        let mut exp = end + 1;
        if matches!(chars.get(exp), Some('+') | Some('-')) {
            exp += 1;
        }
        let digits_end = scan(chars, exp, |c| c.is_ascii_digit());
        if digits_end > exp {
            end = digits_end;
        }
    }
    end
}

/// Reads a quoted string starting at `from`; returns the text and the
/// position of the closing quote.
fn read_string(chars: &[char], from: usize) -> ExprResult<(String, usize)> {
    let quote = chars[from];
    let mut text = String::new();
    let mut pos = from + 1;

    while pos < chars.len() {
        match chars[pos] {
            '\\' if pos + 1 < chars.len() => {
                text.push(chars[pos + 1]);
                pos += 2;
            }
            c if c == quote => return Ok((text, pos)),
            c => {
                text.push(c);
                pos += 1;
            }
        }
    }

    Err(ExprError::syntax(from, "unterminated string literal"))
}
