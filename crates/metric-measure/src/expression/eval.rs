//! Tree-walking evaluator. Every value is `Option<f64>`; `None` is absent
//! and propagates through arithmetic, ordering and membership.

use super::ast::{ArithmeticOp, CompareOp, Expr, Function, Pin};

/// Answers an expression can read for one response and result row.
pub trait EvalContext {
    /// Value of a bare field reference for the result combination.
    fn field_value(&self, field: &str) -> Option<f64>;

    /// Every answer to `field` whose entity ids match `pins`. Types not
    /// pinned match every instance.
    fn field_values(&self, field: &str, pins: &[(&str, Vec<i32>)]) -> Vec<f64>;

    /// Instance id the result row is computed for.
    fn result_entity(&self, entity_type: &str) -> Option<i32>;
}

pub fn truthy(value: Option<f64>) -> bool {
    value.is_some_and(|v| v != 0.0)
}

fn boolean(b: bool) -> Option<f64> {
    Some(if b { 1.0 } else { 0.0 })
}

enum ListValue {
    Items(Vec<Option<f64>>),
    /// Half-open integer range.
    Range(i64, i64),
}

impl ListValue {
    fn contains(&self, value: f64) -> bool {
        match self {
            Self::Items(items) => items.iter().any(|item| *item == Some(value)),
            Self::Range(lo, hi) => {
                value.fract() == 0.0 && (*lo as f64) <= value && value < (*hi as f64)
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Items(items) => items.len(),
            Self::Range(lo, hi) => usize::try_from(hi.saturating_sub(*lo)).unwrap_or(0),
        }
    }

    fn into_items(self) -> Vec<Option<f64>> {
        match self {
            Self::Items(items) => items,
            Self::Range(lo, hi) => (lo..hi).map(|i| Some(i as f64)).collect(),
        }
    }
}

pub fn evaluate(expr: &Expr, ctx: &impl EvalContext) -> Option<f64> {
    match expr {
        Expr::Number(n) => Some(*n),
        Expr::None => None,
        Expr::Field(name) => ctx.field_value(name),
        Expr::ResultEntity(entity_type) => ctx.result_entity(entity_type).map(f64::from),
        Expr::Negate(inner) => evaluate(inner, ctx).map(|v| -v),
        Expr::Not(inner) => evaluate(inner, ctx).map(|v| if v == 0.0 { 1.0 } else { 0.0 }),
        Expr::Arithmetic(op, left, right) => {
            let (l, r) = (evaluate(left, ctx)?, evaluate(right, ctx)?);
            match op {
                ArithmeticOp::Add => Some(l + r),
                ArithmeticOp::Subtract => Some(l - r),
                ArithmeticOp::Multiply => Some(l * r),
                ArithmeticOp::Divide if r == 0.0 => None,
                ArithmeticOp::Divide => Some(l / r),
            }
        }
        Expr::Compare(first, rest) => {
            let mut left = evaluate(first, ctx);
            for (op, operand) in rest {
                let right = evaluate(operand, ctx);
                if !compare(*op, left, right)? {
                    return boolean(false);
                }
                left = right;
            }
            boolean(true)
        }
        Expr::Membership {
            value,
            set,
            negated,
        } => {
            let value = evaluate(value, ctx)?;
            let found = evaluate_list(set, ctx).contains(value);
            boolean(found != *negated)
        }
        Expr::And(left, right) => {
            let l = evaluate(left, ctx);
            if truthy(l) {
                evaluate(right, ctx)
            } else {
                l
            }
        }
        Expr::Or(left, right) => {
            let l = evaluate(left, ctx);
            if truthy(l) {
                l
            } else {
                evaluate(right, ctx)
            }
        }
        Expr::Conditional {
            then,
            test,
            otherwise,
        } => {
            if truthy(evaluate(test, ctx)) {
                evaluate(then, ctx)
            } else {
                evaluate(otherwise, ctx)
            }
        }
        Expr::Call(function, args) => call(*function, args, ctx),
        // The parser rejects lists in scalar position.
        Expr::ResponseField { .. } | Expr::List(_) | Expr::Range(..) => None,
    }
}

/// Equality against an absent value is defined; ordering is not.
fn compare(op: CompareOp, left: Option<f64>, right: Option<f64>) -> Option<bool> {
    let (l, r) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            let both_absent = left.is_none() && right.is_none();
            return match op {
                CompareOp::Eq => Some(both_absent),
                CompareOp::NotEq => Some(!both_absent),
                _ => None,
            };
        }
    };
    Some(match op {
        CompareOp::Eq => l == r,
        CompareOp::NotEq => l != r,
        CompareOp::Lt => l < r,
        CompareOp::Le => l <= r,
        CompareOp::Gt => l > r,
        CompareOp::Ge => l >= r,
    })
}

fn call(function: Function, args: &[Expr], ctx: &impl EvalContext) -> Option<f64> {
    match (function, args) {
        (Function::Len, [list]) => Some(evaluate_list(list, ctx).len() as f64),
        (Function::Sum, [list]) => evaluate_list(list, ctx)
            .into_items()
            .into_iter()
            .sum::<Option<f64>>(),
        (Function::Any, [list]) => {
            boolean(evaluate_list(list, ctx).into_items().into_iter().any(truthy))
        }
        (Function::Max | Function::Min, [list]) => {
            let items = evaluate_list(list, ctx).into_items();
            extremum(function, items.into_iter().flatten())
        }
        (Function::Max | Function::Min, scalars) => {
            extremum(function, scalars.iter().filter_map(|arg| evaluate(arg, ctx)))
        }
        _ => None,
    }
}

/// Largest or smallest present value; `None` when there are none.
fn extremum(function: Function, values: impl Iterator<Item = f64>) -> Option<f64> {
    match function {
        Function::Max => values.reduce(f64::max),
        _ => values.reduce(f64::min),
    }
}

fn evaluate_list(expr: &Expr, ctx: &impl EvalContext) -> ListValue {
    match expr {
        Expr::List(items) => ListValue::Items(items.iter().map(|i| evaluate(i, ctx)).collect()),
        Expr::Range(lo, hi) => match (evaluate(lo, ctx), evaluate(hi, ctx)) {
            (Some(lo), Some(hi)) => ListValue::Range(lo as i64, hi as i64),
            _ => ListValue::Items(Vec::new()),
        },
        Expr::ResponseField { field, pins } => {
            let resolved: Vec<(&str, Vec<i32>)> = pins
                .iter()
                .map(|(entity_type, pin)| {
                    let ids = match pin {
                        Pin::Ids(ids) => ids.clone(),
                        Pin::Result(result_type) => {
                            ctx.result_entity(result_type).into_iter().collect()
                        }
                    };
                    (entity_type.as_str(), ids)
                })
                .collect();
            ListValue::Items(
                ctx.field_values(field, &resolved)
                    .into_iter()
                    .map(Some)
                    .collect(),
            )
        }
        Expr::Conditional {
            then,
            test,
            otherwise,
        } => {
            if truthy(evaluate(test, ctx)) {
                evaluate_list(then, ctx)
            } else {
                evaluate_list(otherwise, ctx)
            }
        }
        _ => ListValue::Items(Vec::new()),
    }
}
