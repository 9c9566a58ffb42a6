//! Tokenizer for pyvm listings.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::AsmError;

/// A single token from a listing line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Mnemonic, name, or one of the keywords `None`, `True`, `False`.
    /// Case is preserved.
    Ident(String),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal with escapes resolved.
    Str(String),
    /// `@name`, a reference to a function defined earlier.
    FuncRef(String),
    /// `.func` or `.end`, lower-cased.
    Directive(String),
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => f.write_str(s),
            Token::Int(n) => write!(f, "{n}"),
            Token::Float(x) => write!(f, "{x:?}"),
            Token::Str(s) => write!(f, "'{}'", s.escape_default()),
            Token::FuncRef(name) => write!(f, "@{name}"),
            Token::Directive(d) => write!(f, ".{d}"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '<'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '<' | '>' | '.')
}

/// Tokenize a single line of listing text.
///
/// Returns an empty Vec for blank lines and comment-only lines.
/// Comments start with `;` outside a string literal and extend to end of line.
pub(crate) fn tokenize_line(line: &str, line_num: usize) -> Result<Vec<Token>, AsmError> {
    let mut chars = line.chars().peekable();
    let mut tokens = Vec::new();

    while let Some(&c) = chars.peek() {
        match c {
            ';' => break,
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | ',' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
            }
            '\'' | '"' => {
                chars.next();
                tokens.push(Token::Str(lex_string(&mut chars, c, line_num)?));
            }
            '@' => {
                chars.next();
                let name = take_while(&mut chars, is_ident_continue);
                if name.is_empty() {
                    return Err(AsmError::UnexpectedToken {
                        line: line_num,
                        token: "@".to_string(),
                    });
                }
                tokens.push(Token::FuncRef(name));
            }
            '.' if starts_number(&chars) => {
                tokens.push(lex_number(&mut chars, line_num)?);
            }
            '.' => {
                chars.next();
                let word = take_while(&mut chars, char::is_alphanumeric);
                if word.is_empty() {
                    return Err(AsmError::UnexpectedToken {
                        line: line_num,
                        token: ".".to_string(),
                    });
                }
                tokens.push(Token::Directive(word.to_lowercase()));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                tokens.push(lex_number(&mut chars, line_num)?);
            }
            c if is_ident_start(c) => {
                tokens.push(Token::Ident(take_while(&mut chars, is_ident_continue)));
            }
            other => {
                return Err(AsmError::UnexpectedToken {
                    line: line_num,
                    token: other.to_string(),
                })
            }
        }
    }

    Ok(tokens)
}

fn take_while(chars: &mut Peekable<Chars<'_>>, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

/// Whether the `.` at the cursor begins a literal like `.5`.
fn starts_number(chars: &Peekable<Chars<'_>>) -> bool {
    let mut ahead = chars.clone();
    ahead.next();
    ahead.next().is_some_and(|c| c.is_ascii_digit())
}

fn lex_number(chars: &mut Peekable<Chars<'_>>, line_num: usize) -> Result<Token, AsmError> {
    let mut word = String::new();
    if let Some(sign) = chars.next_if(|&c| c == '-' || c == '+') {
        word.push(sign);
    }
    while let Some(&c) = chars.peek() {
        let exponent_sign =
            matches!(c, '+' | '-') && word.ends_with(|p: char| p.eq_ignore_ascii_case(&'e'));
        if !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign) {
            break;
        }
        word.push(c);
        chars.next();
    }

    let invalid = || AsmError::InvalidNumber {
        line: line_num,
        token: word.clone(),
    };
    let digits = word.trim_start_matches(|c| c == '-' || c == '+');
    if digits.is_empty() {
        return Err(invalid());
    }
    let cleaned = word.replace('_', "");
    if is_float_literal(digits) {
        cleaned.parse::<f64>().map(Token::Float).map_err(|_| invalid())
    } else {
        cleaned.parse::<i64>().map(Token::Int).map_err(|_| invalid())
    }
}

fn is_float_literal(digits: &str) -> bool {
    let lower = digits.to_ascii_lowercase();
    matches!(lower.as_str(), "inf" | "infinity" | "nan")
        || lower.contains(|c| c == '.' || c == 'e')
}

fn lex_string(
    chars: &mut Peekable<Chars<'_>>,
    quote: char,
    line_num: usize,
) -> Result<String, AsmError> {
    let mut out = String::new();
    loop {
        let c = chars
            .next()
            .ok_or(AsmError::UnterminatedString { line: line_num })?;
        match c {
            c if c == quote => return Ok(out),
            '\\' => out.push(lex_escape(chars, line_num)?),
            c => out.push(c),
        }
    }
}

fn lex_escape(chars: &mut Peekable<Chars<'_>>, line_num: usize) -> Result<char, AsmError> {
    let c = chars
        .next()
        .ok_or(AsmError::UnterminatedString { line: line_num })?;
    let invalid = |escape: String| AsmError::InvalidEscape {
        line: line_num,
        escape,
    };
    match c {
        '\\' => Ok('\\'),
        '\'' => Ok('\''),
        '"' => Ok('"'),
        'n' => Ok('\n'),
        't' => Ok('\t'),
        'r' => Ok('\r'),
        '0' => Ok('\0'),
        'x' => {
            let hex: String = chars.by_ref().take(2).collect();
            u8::from_str_radix(&hex, 16)
                .ok()
                .filter(|_| hex.len() == 2)
                .map(char::from)
                .ok_or_else(|| invalid(format!("x{hex}")))
        }
        'u' => {
            if chars.next_if_eq(&'{').is_none() {
                return Err(invalid("u".to_string()));
            }
            let hex = take_while(chars, |c| c != '}');
            if chars.next_if_eq(&'}').is_none() {
                return Err(invalid(format!("u{{{hex}")));
            }
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| invalid(format!("u{{{hex}}}")))
        }
        other => Err(invalid(other.to_string())),
    }
}
