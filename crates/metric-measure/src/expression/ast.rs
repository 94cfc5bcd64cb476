//! Expression syntax tree.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Len,
    Sum,
    Any,
    Max,
    Min,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "len" => Some(Self::Len),
            "sum" => Some(Self::Sum),
            "any" => Some(Self::Any),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::Sum => "sum",
            Self::Any => "any",
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

/// Instance selection for one entity type of a `response.field(...)` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Pin {
    Ids(Vec<i32>),
    /// `result.<entity_type>`
    Result(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    None,
    /// Bare field reference resolved against the result combination.
    Field(String),
    /// `result.<entity_type>`
    ResultEntity(String),
    /// `response.<field>(type=pin, ...)`, list valued.
    ResponseField {
        field: String,
        pins: Vec<(String, Pin)>,
    },
    /// `[a, b, c]`, list valued.
    List(Vec<Expr>),
    /// `range(lo, hi)`, half-open, list valued.
    Range(Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Not(Box<Expr>),
    Arithmetic(ArithmeticOp, Box<Expr>, Box<Expr>),
    /// `a < b <= c` is `Compare(a, [(Lt, b), (Le, c)])`.
    Compare(Box<Expr>, Vec<(CompareOp, Expr)>),
    Membership {
        value: Box<Expr>,
        set: Box<Expr>,
        negated: bool,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Conditional {
        then: Box<Expr>,
        test: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// True for expressions that produce a list rather than one number.
    pub fn is_list(&self) -> bool {
        match self {
            Self::ResponseField { .. } | Self::List(_) | Self::Range(..) => true,
            Self::Conditional { then, .. } => then.is_list(),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        if self.is_list() {
            "a list"
        } else {
            "a number"
        }
    }

    /// Visit every node, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Self::Number(_)
            | Self::None
            | Self::Field(_)
            | Self::ResultEntity(_)
            | Self::ResponseField { .. } => {}
            Self::List(items) | Self::Call(_, items) => {
                for item in items {
                    item.walk(visit);
                }
            }
            Self::Range(a, b)
            | Self::Arithmetic(_, a, b)
            | Self::And(a, b)
            | Self::Or(a, b) => {
                a.walk(visit);
                b.walk(visit);
            }
            Self::Negate(inner) | Self::Not(inner) => inner.walk(visit),
            Self::Compare(first, rest) => {
                first.walk(visit);
                for (_, operand) in rest {
                    operand.walk(visit);
                }
            }
            Self::Membership { value, set, .. } => {
                value.walk(visit);
                set.walk(visit);
            }
            Self::Conditional {
                then,
                test,
                otherwise,
            } => {
                then.walk(visit);
                test.walk(visit);
                otherwise.walk(visit);
            }
        }
    }
}
