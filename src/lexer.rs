//! Tokenization. Token text is recognized with `nom` combinators; a driver
//! loop threads a [`Position`] through every consumed character (whitespace,
//! comments, and string delimiters included) so each token and each error
//! points at real source coordinates.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{opt, recognize, value},
    error::ErrorKind,
    sequence::pair,
};

use crate::ast::Number;
use crate::{Error, Origin, Position};

/// Non-alphanumeric characters allowed in identifiers. A leading `-`
/// followed by a digit is a number, not a symbol.
pub(crate) const SYMBOL_SPECIAL_CHARS: &str = "_=+-*/^%&@!?~<>";

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || SYMBOL_SPECIAL_CHARS.contains(c)
}

/// What a token is, plus any decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `(`
    Open,
    /// `)`
    Close,
    /// `'`
    Quote,
    /// An identifier.
    Symbol(String),
    /// A numeric literal, already parsed.
    Number(Number),
    /// An atom literal `#name` (payload excludes the `#`).
    Atom(String),
    /// A string literal, escapes decoded.
    Str(String),
    /// End of input. Always the last token of a stream.
    Eof,
}

/// A token: its kind, the raw source slice it came from, and the position of
/// its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub pos: Position,
}

/// Tokenize a source string. `\r\n` is normalized to `\n` before scanning;
/// the returned stream always ends with an [`TokenKind::Eof`] token.
pub fn lex(source: &str, origin: Origin) -> Result<Vec<Token>, Error> {
    let normalized = source.replace("\r\n", "\n");
    let mut pos = Position::start(origin);
    let mut rest = normalized.as_str();
    let mut tokens = Vec::new();

    loop {
        rest = skip_trivia(rest, &mut pos);
        let Some(first) = rest.chars().next() else {
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                pos,
            });
            return Ok(tokens);
        };

        let start = pos.clone();
        let (next, kind) = if first == '"' {
            scan_string(rest, &mut pos)?
        } else {
            match scan_token(rest) {
                Ok((next, kind)) => {
                    pos.advance_str(&rest[..rest.len() - next.len()]);
                    (next, kind)
                }
                Err(nom::Err::Failure(_)) => {
                    return Err(Error::lex("number literal out of range", start));
                }
                Err(_) => {
                    return Err(Error::lex(format!("unexpected character '{first}'"), start));
                }
            }
        };

        tokens.push(Token {
            kind,
            lexeme: rest[..rest.len() - next.len()].to_owned(),
            pos: start,
        });
        rest = next;
    }
}

/// Consume whitespace and `;` line comments, advancing the position.
fn skip_trivia<'a>(mut rest: &'a str, pos: &mut Position) -> &'a str {
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            Some(c @ (' ' | '\t' | '\u{000B}' | '\r' | '\n')) => {
                pos.advance_char(c);
                rest = chars.as_str();
            }
            Some(';') => {
                pos.advance_char(';');
                rest = chars.as_str();
                // Discard to end of line; the newline itself is consumed by
                // the whitespace arm on the next pass.
                while let Some(c) = rest.chars().next() {
                    if c == '\n' {
                        break;
                    }
                    pos.advance_char(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
            _ => return rest,
        }
    }
}

fn scan_token(input: &str) -> IResult<&str, TokenKind> {
    alt((scan_number, scan_atom, scan_symbol, scan_structural)).parse(input)
}

/// Optional leading `-`, digits, optionally one `.` with more digits. A
/// second dot terminates the number; a lone dot never starts one.
fn scan_number(input: &str) -> IResult<&str, TokenKind> {
    let digits = take_while1(|c: char| c.is_ascii_digit());
    let fraction = opt(pair(char('.'), take_while1(|c: char| c.is_ascii_digit())));
    let (rest, text) = recognize(pair(opt(char('-')), pair(digits, fraction))).parse(input)?;

    let number = if text.contains('.') {
        match text.parse::<f64>() {
            Ok(x) => Number::Float(x),
            Err(_) => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    ErrorKind::Float,
                )));
            }
        }
    } else {
        match text.parse::<i64>() {
            Ok(n) => Number::Int(n),
            Err(_) => {
                // Digits that overflow i64 are a lex error, not a symbol.
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    ErrorKind::Digit,
                )));
            }
        }
    };
    Ok((rest, TokenKind::Number(number)))
}

/// `#` followed by identifier characters.
fn scan_atom(input: &str) -> IResult<&str, TokenKind> {
    let (rest, text) = recognize(pair(char('#'), take_while1(is_ident_char))).parse(input)?;
    Ok((rest, TokenKind::Atom(text[1..].to_owned())))
}

/// A letter or special character, then letters, digits, or specials.
fn scan_symbol(input: &str) -> IResult<&str, TokenKind> {
    let (rest, text) = take_while1(is_ident_char).parse(input)?;
    let starts_well = text.chars().next().is_some_and(is_ident_start);
    if !starts_well {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Alpha,
        )));
    }
    Ok((rest, TokenKind::Symbol(text.to_owned())))
}

fn scan_structural(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::Open, char('(')),
        value(TokenKind::Close, char(')')),
        value(TokenKind::Quote, char('\'')),
    ))
    .parse(input)
}

/// Double-quoted string with the escape set `\n \t \r \\ \"`. Scanned by
/// hand so the decoded text and the advancing position stay in lockstep.
fn scan_string<'a>(
    input: &'a str,
    pos: &mut Position,
) -> Result<(&'a str, TokenKind), Error> {
    let start = pos.clone();
    pos.advance_char('"');
    let mut remaining = &input[1..];
    let mut text = String::new();

    loop {
        let mut chars = remaining.chars();
        match chars.next() {
            None => return Err(Error::lex("unterminated string literal", start)),
            Some('"') => {
                pos.advance_char('"');
                return Ok((chars.as_str(), TokenKind::Str(text)));
            }
            Some('\\') => {
                let escape_pos = pos.clone();
                pos.advance_char('\\');
                let decoded = match chars.next() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('\\') => '\\',
                    Some('"') => '"',
                    Some(other) => {
                        return Err(Error::lex(
                            format!("unknown escape sequence '\\{other}'"),
                            escape_pos,
                        ));
                    }
                    None => return Err(Error::lex("unterminated string literal", start)),
                };
                // The source character after the backslash is one column.
                pos.advance_char(decoded);
                text.push(decoded);
                remaining = chars.as_str();
            }
            Some(c) => {
                pos.advance_char(c);
                text.push(c);
                remaining = chars.as_str();
            }
        }
    }
}
