/// Field-expression parsing errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("unexpected character {found:?} at position {position}")]
    UnexpectedCharacter { position: usize, found: char },

    #[error("expected {expected} at position {position}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("invalid number literal {literal:?}")]
    InvalidNumber { literal: String },

    #[error("unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("function {function} takes {expected} arguments, found {found}")]
    InvalidArity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("expression nests deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },

    #[error("expression is empty")]
    Empty,
}
