//! Tokenizer for field expressions.

use metric_core::errors::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    None,
    True,
    False,
    And,
    Or,
    Not,
    In,
    If,
    Else,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {n}"),
            Self::Ident(name) => format!("identifier {name:?}"),
            other => format!("{:?}", other).to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub position: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.' || bytes[i] == b'_') {
                i += 1;
            }
            let literal = &source[start..i];
            let value: f64 = literal
                .replace('_', "")
                .parse()
                .map_err(|_| ExpressionError::InvalidNumber {
                    literal: literal.to_string(),
                })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                position: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &source[start..i];
            let kind = match word {
                "None" => TokenKind::None,
                "True" => TokenKind::True,
                "False" => TokenKind::False,
                "and" => TokenKind::And,
                "or" => TokenKind::Or,
                "not" => TokenKind::Not,
                "in" => TokenKind::In,
                "if" => TokenKind::If,
                "else" => TokenKind::Else,
                _ => TokenKind::Ident(word.to_string()),
            };
            tokens.push(Token {
                kind,
                position: start,
            });
            continue;
        }

        let next = bytes.get(i + 1).map(|b| *b as char);
        let (kind, width) = match (c, next) {
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('=', _) => (TokenKind::Assign, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('.', _) => (TokenKind::Dot, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            _ => {
                let found = source[start..].chars().next().unwrap_or(c);
                return Err(ExpressionError::UnexpectedCharacter {
                    position: start,
                    found,
                });
            }
        };
        tokens.push(Token {
            kind,
            position: start,
        });
        i += width;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_operators() {
        assert_eq!(
            kinds("age >= 18 and not x in [1,2]"),
            vec![
                TokenKind::Ident("age".into()),
                TokenKind::Ge,
                TokenKind::Number(18.0),
                TokenKind::And,
                TokenKind::Not,
                TokenKind::Ident("x".into()),
                TokenKind::In,
                TokenKind::LBracket,
                TokenKind::Number(1.0),
                TokenKind::Comma,
                TokenKind::Number(2.0),
                TokenKind::RBracket,
            ]
        );
    }

    #[test]
    fn decimals_and_member_access() {
        assert_eq!(
            kinds("result.brand * 0.5"),
            vec![
                TokenKind::Ident("result".into()),
                TokenKind::Dot,
                TokenKind::Ident("brand".into()),
                TokenKind::Star,
                TokenKind::Number(0.5),
            ]
        );
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("a % 2").unwrap_err();
        assert_eq!(
            err,
            ExpressionError::UnexpectedCharacter {
                position: 2,
                found: '%'
            }
        );
        assert!(matches!(tokenize("1.2.3"), Err(ExpressionError::InvalidNumber { .. })));
    }
}
