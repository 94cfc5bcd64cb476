//! Recursive-descent parser with Python precedence:
//! conditional < or < and < not < comparison/membership < + - < * / < unary.

use metric_core::errors::ExpressionError;

use super::ast::{ArithmeticOp, CompareOp, Expr, Function, Pin};
use super::lexer::{tokenize, Token, TokenKind};

/// Deepest nesting accepted before parsing gives up.
pub const MAX_DEPTH: usize = 200;

pub fn parse(source: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    if let Some(token) = parser.peek_token() {
        return Err(ExpressionError::UnexpectedToken {
            position: token.position,
            expected: "end of expression".to_string(),
            found: token.kind.describe(),
        });
    }
    expect_scalar(&expr)?;
    Ok(expr)
}

fn expect_scalar(expr: &Expr) -> Result<(), ExpressionError> {
    if expr.is_list() {
        return Err(ExpressionError::TypeMismatch {
            expected: "a number".to_string(),
            found: "a list (use len, sum, any, max or min)".to_string(),
        });
    }
    Ok(())
}

fn expect_list(expr: &Expr) -> Result<(), ExpressionError> {
    if !expr.is_list() {
        return Err(ExpressionError::TypeMismatch {
            expected: "a list".to_string(),
            found: "a number".to_string(),
        });
    }
    Ok(())
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.peek_token().map(|t| &t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ExpressionError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(ExpressionError::UnexpectedToken {
                position: token.position,
                expected: expected.to_string(),
                found: token.kind.describe(),
            }),
            None => Err(ExpressionError::UnexpectedEnd {
                expected: expected.to_string(),
            }),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String, ExpressionError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => Ok(name),
            Some(token) => Err(ExpressionError::UnexpectedToken {
                position: token.position,
                expected: expected.to_string(),
                found: token.kind.describe(),
            }),
            None => Err(ExpressionError::UnexpectedEnd {
                expected: expected.to_string(),
            }),
        }
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep {
                max_depth: MAX_DEPTH,
            });
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, ExpressionError> {
        self.enter()?;
        let then = self.or_expr()?;
        let expr = if self.eat(&TokenKind::If) {
            let test = self.or_expr()?;
            expect_scalar(&test)?;
            self.expect(TokenKind::Else, "else")?;
            let otherwise = self.expression()?;
            if then.is_list() != otherwise.is_list() {
                return Err(ExpressionError::TypeMismatch {
                    expected: then.kind_name().to_string(),
                    found: otherwise.kind_name().to_string(),
                });
            }
            Expr::Conditional {
                then: Box::new(then),
                test: Box::new(test),
                otherwise: Box::new(otherwise),
            }
        } else {
            then
        };
        self.depth -= 1;
        Ok(expr)
    }

    fn or_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Or) {
            let right = self.and_expr()?;
            expect_scalar(&left)?;
            expect_scalar(&right)?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.not_expr()?;
        while self.eat(&TokenKind::And) {
            let right = self.not_expr()?;
            expect_scalar(&left)?;
            expect_scalar(&right)?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(&TokenKind::Not) {
            self.enter()?;
            let inner = self.not_expr()?;
            self.depth -= 1;
            expect_scalar(&inner)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.additive()?;

        let negated = match (self.peek(), self.peek_at(1)) {
            (Some(TokenKind::In), _) => Some(false),
            (Some(TokenKind::Not), Some(TokenKind::In)) => Some(true),
            _ => None,
        };
        if let Some(negated) = negated {
            self.pos += if negated { 2 } else { 1 };
            let set = self.additive()?;
            expect_scalar(&left)?;
            expect_list(&set)?;
            return Ok(Expr::Membership {
                value: Box::new(left),
                set: Box::new(set),
                negated,
            });
        }

        let mut rest = Vec::new();
        while let Some(op) = self.peek().and_then(compare_op) {
            self.pos += 1;
            let operand = self.additive()?;
            expect_scalar(&operand)?;
            rest.push((op, operand));
        }
        if rest.is_empty() {
            return Ok(left);
        }
        expect_scalar(&left)?;
        Ok(Expr::Compare(Box::new(left), rest))
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => ArithmeticOp::Add,
                Some(TokenKind::Minus) => ArithmeticOp::Subtract,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            expect_scalar(&left)?;
            expect_scalar(&right)?;
            left = Expr::Arithmetic(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => ArithmeticOp::Multiply,
                Some(TokenKind::Slash) => ArithmeticOp::Divide,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            expect_scalar(&left)?;
            expect_scalar(&right)?;
            left = Expr::Arithmetic(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                expect_scalar(&inner)?;
                Ok(match inner {
                    Expr::Number(n) => Expr::Number(-n),
                    other => Expr::Negate(Box::new(other)),
                })
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self.advance().ok_or_else(|| ExpressionError::UnexpectedEnd {
            expected: "a value".to_string(),
        })?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::None => Ok(Expr::None),
            TokenKind::True => Ok(Expr::Number(1.0)),
            TokenKind::False => Ok(Expr::Number(0.0)),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let items = self.sequence(TokenKind::RBracket, "]")?;
                for item in &items {
                    expect_scalar(item)?;
                }
                Ok(Expr::List(items))
            }
            TokenKind::Ident(name) => self.identifier(name),
            other => Err(ExpressionError::UnexpectedToken {
                position: token.position,
                expected: "a value".to_string(),
                found: other.describe(),
            }),
        }
    }

    /// Comma separated expressions up to `close`, which is consumed.
    fn sequence(&mut self, close: TokenKind, expected: &str) -> Result<Vec<Expr>, ExpressionError> {
        let mut items = Vec::new();
        while !self.eat(&close) {
            items.push(self.expression()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(close.clone(), expected)?;
                break;
            }
        }
        Ok(items)
    }

    fn identifier(&mut self, name: String) -> Result<Expr, ExpressionError> {
        match (name.as_str(), self.peek()) {
            ("result", Some(TokenKind::Dot)) => {
                self.pos += 1;
                let entity_type = self.expect_ident("an entity type")?;
                Ok(Expr::ResultEntity(entity_type))
            }
            ("response", Some(TokenKind::Dot)) => {
                self.pos += 1;
                let field = self.expect_ident("a field name")?;
                self.expect(TokenKind::LParen, "(")?;
                let pins = self.pins()?;
                Ok(Expr::ResponseField { field, pins })
            }
            (_, Some(TokenKind::LParen)) => {
                self.pos += 1;
                let args = self.sequence(TokenKind::RParen, ")")?;
                self.call(name, args)
            }
            _ => Ok(Expr::Field(name)),
        }
    }

    fn call(&mut self, name: String, args: Vec<Expr>) -> Result<Expr, ExpressionError> {
        if name == "range" {
            let found = args.len();
            let [lo, hi] = <[Expr; 2]>::try_from(args).map_err(|_| ExpressionError::InvalidArity {
                function: name,
                expected: "2".to_string(),
                found,
            })?;
            expect_scalar(&lo)?;
            expect_scalar(&hi)?;
            return Ok(Expr::Range(Box::new(lo), Box::new(hi)));
        }

        let function =
            Function::from_name(&name).ok_or(ExpressionError::UnknownFunction { name })?;
        let arity_error = |expected: &str, found: usize| ExpressionError::InvalidArity {
            function: function.name().to_string(),
            expected: expected.to_string(),
            found,
        };
        match function {
            Function::Len | Function::Sum | Function::Any => {
                if args.len() != 1 {
                    return Err(arity_error("1", args.len()));
                }
                expect_list(&args[0])?;
            }
            Function::Max | Function::Min => match args.len() {
                0 => return Err(arity_error("1 list or at least 2 numbers", 0)),
                1 => expect_list(&args[0])?,
                _ => {
                    for arg in &args {
                        expect_scalar(arg)?;
                    }
                }
            },
        }
        Ok(Expr::Call(function, args))
    }

    /// `type=pin, ...)` after the opening parenthesis of `response.field(`.
    fn pins(&mut self) -> Result<Vec<(String, Pin)>, ExpressionError> {
        let mut pins = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            let entity_type = self.expect_ident("an entity type")?;
            self.expect(TokenKind::Assign, "=")?;
            let pin = self.pin()?;
            pins.push((entity_type, pin));
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RParen, ")")?;
                break;
            }
        }
        Ok(pins)
    }

    fn pin(&mut self) -> Result<Pin, ExpressionError> {
        let position = self.peek_token().map_or(0, |t| t.position);
        let expr = self.additive()?;
        let mismatch = |found: String| ExpressionError::UnexpectedToken {
            position,
            expected: "an instance id, a list of ids or result.<type>".to_string(),
            found,
        };
        match expr {
            Expr::Number(n) => Ok(Pin::Ids(vec![instance_id(n)?])),
            Expr::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Expr::Number(n) => instance_id(n),
                    other => Err(mismatch(format!("{other:?}"))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Pin::Ids),
            Expr::ResultEntity(entity_type) => Ok(Pin::Result(entity_type)),
            other => Err(mismatch(format!("{other:?}"))),
        }
    }
}

fn instance_id(n: f64) -> Result<i32, ExpressionError> {
    if n.fract() == 0.0 && n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) {
        Ok(n as i32)
    } else {
        Err(ExpressionError::InvalidNumber {
            literal: n.to_string(),
        })
    }
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::EqEq => Some(CompareOp::Eq),
        TokenKind::NotEq => Some(CompareOp::NotEq),
        TokenKind::Lt => Some(CompareOp::Lt),
        TokenKind::Le => Some(CompareOp::Le),
        TokenKind::Gt => Some(CompareOp::Gt),
        TokenKind::Ge => Some(CompareOp::Ge),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_of_and_over_or() {
        let expr = parse("a == 3 or a == 4 and b == 35").unwrap();
        assert!(matches!(expr, Expr::Or(_, ref right) if matches!(**right, Expr::And(..))));
    }

    #[test]
    fn conditional_binds_loosest() {
        let expr = parse("1 if x > 2 else 0").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn not_in_membership() {
        let expr = parse("x not in range(1, 5)").unwrap();
        assert!(matches!(expr, Expr::Membership { negated: true, .. }));
    }

    #[test]
    fn response_call_with_pins() {
        let expr = parse("len(response.consider(brand=result.brand, product=[1, 2])) > 0").unwrap();
        let Expr::Compare(left, _) = expr else {
            panic!("expected comparison");
        };
        let Expr::Call(Function::Len, args) = *left else {
            panic!("expected len call");
        };
        assert_eq!(
            args[0],
            Expr::ResponseField {
                field: "consider".to_string(),
                pins: vec![
                    ("brand".to_string(), Pin::Result("brand".to_string())),
                    ("product".to_string(), Pin::Ids(vec![1, 2])),
                ],
            }
        );
    }

    #[test]
    fn list_in_scalar_position_rejected() {
        assert!(matches!(parse("[1, 2]"), Err(ExpressionError::TypeMismatch { .. })));
        assert!(matches!(parse("response.x() + 1"), Err(ExpressionError::TypeMismatch { .. })));
        assert!(matches!(parse("x in 3"), Err(ExpressionError::TypeMismatch { .. })));
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(parse("   "), Err(ExpressionError::Empty));
        assert!(matches!(parse("a +"), Err(ExpressionError::UnexpectedEnd { .. })));
        assert!(matches!(parse("a b"), Err(ExpressionError::UnexpectedToken { .. })));
        assert!(matches!(parse("foo(1)"), Err(ExpressionError::UnknownFunction { .. })));
        assert!(matches!(parse("len(1, 2)"), Err(ExpressionError::InvalidArity { .. })));
        assert!(matches!(parse("(((((1)))"), Err(ExpressionError::UnexpectedEnd { .. })));
    }

    #[test]
    fn deep_nesting_rejected() {
        let source = format!("{}1{}", "(".repeat(MAX_DEPTH + 5), ")".repeat(MAX_DEPTH + 5));
        assert_eq!(
            parse(&source),
            Err(ExpressionError::TooDeep {
                max_depth: MAX_DEPTH
            })
        );
    }
}
