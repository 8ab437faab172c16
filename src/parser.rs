//! Recursive descent over the token stream. The parser is deliberately
//! small: it builds literals, symbols, quotes, and lists, and nothing else.
//! Special forms are not recognized here - `if`, `let`, `lambda` and friends
//! are ordinary symbols whose kernel bindings happen to be special forms, so
//! all semantics live in the evaluator.

use crate::ast::Expr;
use crate::lexer::{Token, TokenKind};
use crate::{Error, MAX_PARSE_DEPTH, Position};

struct Cursor<'a> {
    tokens: &'a [Token],
    index: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.index)
    }

    fn bump(&mut self) {
        self.index += 1;
    }

    fn end_position(&self) -> Position {
        self.tokens
            .last()
            .map_or_else(Position::unknown, |t| t.pos.clone())
    }
}

/// Parse a token stream into the program's top-level expressions.
pub fn parse(tokens: &[Token]) -> Result<Vec<Expr>, Error> {
    let mut cursor = Cursor { tokens, index: 0 };
    let mut program = Vec::new();
    while let Some(token) = cursor.peek() {
        if matches!(token.kind, TokenKind::Eof) {
            break;
        }
        program.push(parse_expr(&mut cursor, 0)?);
    }
    Ok(program)
}

fn parse_expr(cursor: &mut Cursor<'_>, depth: usize) -> Result<Expr, Error> {
    let Some(token) = cursor.peek() else {
        return Err(Error::parse("unexpected end of input", cursor.end_position()));
    };
    if depth >= MAX_PARSE_DEPTH {
        return Err(Error::parse(
            format!("expression nesting exceeds the maximum depth of {MAX_PARSE_DEPTH}"),
            token.pos.clone(),
        ));
    }

    match &token.kind {
        TokenKind::Number(n) => {
            cursor.bump();
            Ok(Expr::Number(*n))
        }
        TokenKind::Atom(name) => {
            cursor.bump();
            Ok(Expr::Atom(name.clone()))
        }
        TokenKind::Str(text) => {
            cursor.bump();
            Ok(Expr::Str(text.clone()))
        }
        TokenKind::Symbol(name) => {
            cursor.bump();
            Ok(Expr::Symbol {
                name: name.clone(),
                pos: token.pos.clone(),
            })
        }
        TokenKind::Quote => {
            cursor.bump();
            let inner = parse_expr(cursor, depth + 1)?;
            Ok(fold_quote(inner))
        }
        TokenKind::Open => parse_list(cursor, depth, token.pos.clone()),
        TokenKind::Close => Err(Error::parse("unexpected ')'", token.pos.clone())),
        TokenKind::Eof => Err(Error::parse("unexpected end of input", token.pos.clone())),
    }
}

/// `( )` is Nil; `( e1 .. en )` is a List carrying the opening paren's
/// position. Running out of input reports the unclosed opening paren.
fn parse_list(cursor: &mut Cursor<'_>, depth: usize, open_pos: Position) -> Result<Expr, Error> {
    cursor.bump(); // consume '('
    let mut items = Vec::new();
    loop {
        let Some(token) = cursor.peek() else {
            return Err(Error::parse("unclosed list", open_pos));
        };
        match token.kind {
            TokenKind::Close => {
                cursor.bump();
                return Ok(if items.is_empty() {
                    Expr::Nil
                } else {
                    Expr::List {
                        items,
                        pos: open_pos,
                    }
                });
            }
            TokenKind::Eof => return Err(Error::parse("unclosed list", open_pos)),
            _ => items.push(parse_expr(cursor, depth + 1)?),
        }
    }
}

/// `'expr` evaluates to `expr` unevaluated. When the operand is already a
/// self-evaluating value the quote is redundant, so the parser folds it
/// away; anything else is wrapped in a Quoted node.
fn fold_quote(inner: Expr) -> Expr {
    match inner {
        Expr::Nil | Expr::Number(_) | Expr::Atom(_) | Expr::Str(_) => inner,
        other => Expr::Quoted(Box::new(other)),
    }
}
