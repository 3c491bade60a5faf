//! Tokenizer for the filter surface syntax.
//!
//! Lexical classes, first match wins: parentheses, double-quoted string
//! literal (no escape processing), floating literal (`digits.digits`),
//! integer literal, comparison operator (longest match), boolean keyword
//! (`AND` / `OR` / `NOT`, case-sensitive), identifier. Whitespace separates
//! tokens and is otherwise ignored.

use crate::error::{QuiverDbError, Result};

/// Kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,
    /// Contents between the quotes, quotes stripped.
    Str,
    /// `digits.digits`
    Float,
    /// `digits`
    Int,
    /// One of `!=`, `>=`, `<=`, `=`, `>`, `<`.
    Comparator,
    /// `AND`, `OR`, or `NOT`.
    BoolOp,
    /// Word characters: letters, digits, underscore.
    Ident,
}

/// A lexed token: its class and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Tokenize a filter string.
///
/// Fails with `InvalidFilter` on any character that starts no token class
/// and on unterminated string literals.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '(' => {
                tokens.push(Token::new(TokenKind::LParen, "("));
                i += 1;
            }
            ')' => {
                tokens.push(Token::new(TokenKind::RParen, ")"));
                i += 1;
            }
            '"' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != '"' {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(QuiverDbError::invalid_filter(
                        "unterminated string literal",
                    ));
                }
                let text: String = chars[start..end].iter().collect();
                tokens.push(Token::new(TokenKind::Str, text));
                i = end + 1;
            }
            '!' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::new(TokenKind::Comparator, "!="));
                    i += 2;
                } else {
                    return Err(QuiverDbError::invalid_filter(
                        "invalid token in filter string: !",
                    ));
                }
            }
            '>' | '<' => {
                // Longest match: ">=" / "<=" before ">" / "<"
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::new(TokenKind::Comparator, format!("{c}=")));
                    i += 2;
                } else {
                    tokens.push(Token::new(TokenKind::Comparator, c));
                    i += 1;
                }
            }
            '=' => {
                tokens.push(Token::new(TokenKind::Comparator, "="));
                i += 1;
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                // A dot followed by at least one digit makes it a float
                if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let text: String = chars[start..i].iter().collect();
                    tokens.push(Token::new(TokenKind::Float, text));
                } else {
                    let text: String = chars[start..i].iter().collect();
                    tokens.push(Token::new(TokenKind::Int, text));
                }
            }
            _ if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let kind = match text.as_str() {
                    "AND" | "OR" | "NOT" => TokenKind::BoolOp,
                    _ => TokenKind::Ident,
                };
                tokens.push(Token::new(kind, text));
            }
            other => {
                return Err(QuiverDbError::invalid_filter(format!(
                    "invalid token in filter string: {other}"
                )));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokenize() {
        let tokens = tokenize("age = 30 AND name = \"Alice\"").unwrap();
        assert_eq!(tokens.len(), 7);
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Ident,
                TokenKind::Comparator,
                TokenKind::Int,
                TokenKind::BoolOp,
                TokenKind::Ident,
                TokenKind::Comparator,
                TokenKind::Str,
            ]
        );
        assert_eq!(tokens[6].text, "Alice");
    }

    #[test]
    fn test_tokenize_groups() {
        let tokens = tokenize("(age = 30 OR age = 31) AND name = \"Alice\"").unwrap();
        assert_eq!(tokens.len(), 13);
        assert_eq!(tokens[0].kind, TokenKind::LParen);
        assert_eq!(tokens[8].kind, TokenKind::RParen);
    }

    #[test]
    fn test_tokenize_without_spaces() {
        let tokens = tokenize("age>=30").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Comparator);
        assert_eq!(tokens[1].text, ">=");
    }

    #[test]
    fn test_tokenize_float_vs_int() {
        let tokens = tokenize("score = 30.5").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Float);
        assert_eq!(tokens[2].text, "30.5");

        let tokens = tokenize("score = 30").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Int);
    }

    #[test]
    fn test_tokenize_not() {
        let tokens = tokenize("NOT age = 30").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::BoolOp);
        assert_eq!(tokens[0].text, "NOT");
    }

    #[test]
    fn test_lowercase_keywords_are_idents() {
        let tokens = tokenize("and").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
    }

    #[test]
    fn test_invalid_token() {
        assert!(tokenize("age # 30").is_err());
        assert!(tokenize("name = \"open").is_err());
        assert!(tokenize("age ! 30").is_err());
    }
}
