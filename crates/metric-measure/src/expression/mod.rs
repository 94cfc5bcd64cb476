//! Python-flavoured field expressions.
//!
//! Used for primary variables, base expressions and expression filters.
//! Value sets compile to the same tree, so range-based and
//! expression-based measures share one evaluator.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use metric_core::errors::ExpressionError;
use metric_core::models::{DataTarget, ValueSet};

pub use ast::{Expr, Pin};
pub use eval::{truthy, EvalContext};

/// A parsed expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let root = parser::parse(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            root,
        })
    }

    /// Membership test of `field` against a value set: `field in [..]`
    /// for a list, `min <= field <= max` for an inclusive range.
    pub fn from_value_set(field: &str, values: &ValueSet) -> Self {
        let reference = Box::new(Expr::Field(field.to_string()));
        match values {
            ValueSet::Values(values) => Self {
                source: format!(
                    "{field} in [{}]",
                    values
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                root: Expr::Membership {
                    value: reference,
                    set: Box::new(Expr::List(
                        values.iter().map(|v| Expr::Number(f64::from(*v))).collect(),
                    )),
                    negated: false,
                },
            },
            ValueSet::Range { min, max } => Self {
                source: format!("{min} <= {field} <= {max}"),
                root: Expr::Compare(
                    Box::new(Expr::Number(f64::from(*min))),
                    vec![
                        (ast::CompareOp::Le, *reference),
                        (ast::CompareOp::Le, Expr::Number(f64::from(*max))),
                    ],
                ),
            },
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn evaluate(&self, ctx: &impl EvalContext) -> Option<f64> {
        eval::evaluate(&self.root, ctx)
    }

    /// Python truthiness of the value: present and non-zero.
    pub fn is_true(&self, ctx: &impl EvalContext) -> bool {
        truthy(self.evaluate(ctx))
    }

    /// Every field the expression reads.
    pub fn field_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.root.walk(&mut |expr| match expr {
            Expr::Field(name) | Expr::ResponseField { field: name, .. } => {
                names.insert(name.clone());
            }
            _ => {}
        });
        names
    }

    /// Entity types read through `result.<type>`.
    pub fn result_entity_types(&self) -> BTreeSet<String> {
        let mut types = BTreeSet::new();
        self.root.walk(&mut |expr| match expr {
            Expr::ResultEntity(entity_type) => {
                types.insert(entity_type.clone());
            }
            Expr::ResponseField { pins, .. } => {
                for (_, pin) in pins {
                    if let Pin::Result(entity_type) = pin {
                        types.insert(entity_type.clone());
                    }
                }
            }
            _ => {}
        });
        types
    }

    /// Instances named by literal pins, which must be loaded in addition
    /// to the requested targets. One target per entity type.
    pub fn pinned_targets(&self) -> Vec<DataTarget> {
        let mut pinned: BTreeMap<String, BTreeSet<i32>> = BTreeMap::new();
        self.root.walk(&mut |expr| {
            if let Expr::ResponseField { pins, .. } = expr {
                for (entity_type, pin) in pins {
                    if let Pin::Ids(ids) = pin {
                        pinned
                            .entry(entity_type.clone())
                            .or_default()
                            .extend(ids.iter().copied());
                    }
                }
            }
        });
        pinned
            .into_iter()
            .map(|(entity_type, ids)| DataTarget::new(entity_type, ids))
            .collect()
    }

    /// `(field, pinned entity type)` pairs, for validating pins against
    /// field keys.
    pub fn pinned_types(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        self.root.walk(&mut |expr| {
            if let Expr::ResponseField { field, pins } = expr {
                for (entity_type, _) in pins {
                    pairs.push((field.clone(), entity_type.clone()));
                }
            }
        });
        pairs
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Scalar answers by field, list answers by (field, brand id).
    #[derive(Default)]
    struct MapContext {
        scalars: HashMap<&'static str, f64>,
        by_brand: Vec<(&'static str, i32, f64)>,
        brand: Option<i32>,
    }

    impl EvalContext for MapContext {
        fn field_value(&self, field: &str) -> Option<f64> {
            self.scalars.get(field).copied()
        }

        fn field_values(&self, field: &str, pins: &[(&str, Vec<i32>)]) -> Vec<f64> {
            self.by_brand
                .iter()
                .filter(|(f, brand, _)| {
                    *f == field
                        && pins
                            .iter()
                            .all(|(t, ids)| *t != "brand" || ids.contains(brand))
                })
                .map(|(_, _, v)| *v)
                .collect()
        }

        fn result_entity(&self, entity_type: &str) -> Option<i32> {
            (entity_type == "brand").then_some(self.brand).flatten()
        }
    }

    fn age_35() -> MapContext {
        MapContext {
            scalars: HashMap::from([("age", 35.0), ("consumer_segment", 3.0)]),
            by_brand: vec![("order_channel", 1, 2.0), ("order_channel", 2, 5.0)],
            brand: Some(1),
        }
    }

    fn eval(source: &str, ctx: &MapContext) -> Option<f64> {
        Expression::parse(source).unwrap().evaluate(ctx)
    }

    #[test]
    fn boolean_cases() {
        let ctx = age_35();
        for (source, expected) in [
            ("age", true),
            ("not age", false),
            ("age == -999", false),
            ("age == 35 and age == 45", false),
            ("age == 35 or age == 45", true),
            ("age in [35,36,37]", true),
            ("age in [36,37,38]", false),
            ("consumer_segment == 3 or consumer_segment == 4 and age == 45", true),
            ("(consumer_segment == 3 or consumer_segment == 4) and age == 45", false),
            ("30 < age <= 35", true),
            ("30 < age < 35", false),
            ("age not in range(18, 35)", true),
            ("any(response.order_channel(brand=result.brand)) and age == 35", true),
            ("any(response.order_channel(brand=4))", false),
            ("any(response.order_channel(brand=[3,2])) or age == 36", true),
        ] {
            assert_eq!(truthy(eval(source, &ctx)), expected, "{source}");
        }
    }

    #[test]
    fn absence_propagates() {
        let ctx = age_35();
        assert_eq!(eval("missing + 1", &ctx), None);
        assert_eq!(eval("missing < 1", &ctx), None);
        assert_eq!(eval("1 <= missing <= 3", &ctx), None);
        assert_eq!(eval("missing in [1]", &ctx), None);
        assert_eq!(eval("not missing", &ctx), None);
        assert_eq!(eval("age / 0", &ctx), None);
        assert_eq!(eval("-missing", &ctx), None);
    }

    #[test]
    fn equality_with_none() {
        let ctx = age_35();
        assert_eq!(eval("missing == 1", &ctx), Some(0.0));
        assert_eq!(eval("missing == None", &ctx), Some(1.0));
        assert_eq!(eval("age != None", &ctx), Some(1.0));
        assert_eq!(eval("missing != None", &ctx), Some(0.0));
    }

    #[test]
    fn python_and_or_return_operands() {
        let ctx = age_35();
        assert_eq!(eval("0 and missing", &ctx), Some(0.0));
        assert_eq!(eval("missing and 0", &ctx), None);
        assert_eq!(eval("1 or missing", &ctx), Some(1.0));
        assert_eq!(eval("missing or 0", &ctx), Some(0.0));
        assert_eq!(eval("age and 7", &ctx), Some(7.0));
        assert_eq!(eval("1 if missing else 2", &ctx), Some(2.0));
    }

    #[test]
    fn list_functions() {
        let ctx = age_35();
        assert_eq!(eval("len(response.order_channel())", &ctx), Some(2.0));
        assert_eq!(eval("sum(response.order_channel())", &ctx), Some(7.0));
        assert_eq!(eval("max(response.order_channel())", &ctx), Some(5.0));
        assert_eq!(eval("min(response.order_channel(brand=9))", &ctx), None);
        assert_eq!(eval("max(missing, 3, age)", &ctx), Some(35.0));
        assert_eq!(eval("min(missing, 3, age)", &ctx), Some(3.0));
        assert_eq!(eval("sum([1, missing])", &ctx), None);
        assert_eq!(eval("len(range(2, 7))", &ctx), Some(5.0));
        assert_eq!(eval("result.brand * 10", &ctx), Some(10.0));
    }

    #[test]
    fn value_sets_match_membership() {
        let ctx = age_35();
        let list = Expression::from_value_set("age", &ValueSet::Values(vec![34, 35]));
        assert_eq!(list.source(), "age in [34, 35]");
        assert!(list.is_true(&ctx));
        let range = Expression::from_value_set("age", &ValueSet::Range { min: 36, max: 40 });
        assert_eq!(range.source(), "36 <= age <= 40");
        assert!(!range.is_true(&ctx));
        assert_eq!(range.evaluate(&MapContext::default()), None);
    }

    #[test]
    fn dependencies() {
        let expr = Expression::parse(
            "a + sum(response.b(brand=6, product=[1, 2])) + len(response.b(brand=result.brand)) > c",
        )
        .unwrap();
        assert_eq!(
            expr.field_names().into_iter().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(
            expr.result_entity_types().into_iter().collect::<Vec<_>>(),
            vec!["brand"]
        );
        assert_eq!(
            expr.pinned_targets(),
            vec![DataTarget::new("brand", [6]), DataTarget::new("product", [1, 2])]
        );
    }
}
