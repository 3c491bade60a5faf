//! Recursive-descent parser for the filter language.
//!
//! Grammar (AND and OR share one precedence level, left-associative,
//! binding below NOT):
//!
//! ```text
//! expression := term (BOOL_OP term)*
//! term       := '(' expression ')' | factor
//! factor     := 'NOT' term | comparison
//! comparison := IDENT COMPARATOR literal
//! literal    := STRING | INT | FLOAT
//! ```

use crate::error::{QuiverDbError, Result};
use crate::filter::ast::{BoolOp, CompareOp, FilterNode};
use crate::filter::lexer::{tokenize, Token, TokenKind};
use crate::metadata::FieldValue;

/// Parse a filter string into an AST.
///
/// Fails with `InvalidFilter` on lexical errors, syntax errors, and
/// trailing input after a complete expression.
pub fn parse_filter(input: &str) -> Result<FilterNode> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.expression()?;

    if parser.pos < parser.tokens.len() {
        return Err(QuiverDbError::invalid_filter(format!(
            "unexpected token after expression: {}",
            parser.tokens[parser.pos].text
        )));
    }

    Ok(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next_token(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expression(&mut self) -> Result<FilterNode> {
        let mut node = self.term()?;

        loop {
            let op = match self.peek() {
                Some(tok) if tok.kind == TokenKind::BoolOp && tok.text != "NOT" => {
                    if tok.text == "AND" {
                        BoolOp::And
                    } else {
                        BoolOp::Or
                    }
                }
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            node = FilterNode::Boolean {
                op,
                left: Box::new(node),
                right: Box::new(right),
            };
        }

        Ok(node)
    }

    fn term(&mut self) -> Result<FilterNode> {
        let at_lparen = matches!(self.peek(), Some(tok) if tok.kind == TokenKind::LParen);
        if !at_lparen {
            return self.factor();
        }

        self.pos += 1;
        let node = self.expression()?;
        match self.next_token() {
            Some(tok) if tok.kind == TokenKind::RParen => Ok(node),
            Some(tok) => Err(QuiverDbError::invalid_filter(format!(
                "expected closing parenthesis, found: {}",
                tok.text
            ))),
            None => Err(QuiverDbError::invalid_filter(
                "expected closing parenthesis, found end of input",
            )),
        }
    }

    fn factor(&mut self) -> Result<FilterNode> {
        let (kind, text) = match self.peek() {
            Some(tok) => (tok.kind, tok.text.clone()),
            None => return Err(QuiverDbError::invalid_filter("unexpected end of filter")),
        };

        if kind == TokenKind::BoolOp && text == "NOT" {
            self.pos += 1;
            // NOT binds a whole term so negated groups parse
            let child = self.term()?;
            return Ok(FilterNode::Not(Box::new(child)));
        }

        if kind == TokenKind::Ident {
            return self.comparison(text);
        }

        Err(QuiverDbError::invalid_filter(format!(
            "expected a comparison, found: {text}"
        )))
    }

    fn comparison(&mut self, field: String) -> Result<FilterNode> {
        self.pos += 1; // consume the identifier

        let op = match self.next_token() {
            Some(tok) if tok.kind == TokenKind::Comparator => CompareOp::parse(&tok.text)?,
            Some(tok) => {
                return Err(QuiverDbError::invalid_filter(format!(
                    "expected a comparator after identifier {field}, found: {}",
                    tok.text
                )))
            }
            None => {
                return Err(QuiverDbError::invalid_filter(format!(
                    "expected a comparator after identifier {field}, found end of input"
                )))
            }
        };

        let value = match self.next_token() {
            Some(tok) => convert_literal(&tok)?,
            None => {
                return Err(QuiverDbError::invalid_filter(format!(
                    "expected a literal after {field} {}, found end of input",
                    op.as_str()
                )))
            }
        };

        Ok(FilterNode::Comparison { field, op, value })
    }
}

fn convert_literal(token: &Token) -> Result<FieldValue> {
    match token.kind {
        TokenKind::Int => token.text.parse::<i64>().map(FieldValue::Int).map_err(|_| {
            QuiverDbError::invalid_filter(format!("integer literal out of range: {}", token.text))
        }),
        TokenKind::Float => token
            .text
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| {
                QuiverDbError::invalid_filter(format!("malformed float literal: {}", token.text))
            }),
        TokenKind::Str => Ok(FieldValue::Str(token.text.clone())),
        _ => Err(QuiverDbError::invalid_filter(format!(
            "expected a literal, found: {}",
            token.text
        ))),
    }
}
