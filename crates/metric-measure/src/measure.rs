//! Validated measure model.
//!
//! `Measure` is the checked form of a `MeasureDefinition`: the primary
//! and base signals are tagged variants, every expression is parsed, and
//! the invariants (one primary source, at most one base source, complete
//! secondary) hold by construction.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use metric_core::errors::MeasureError;
use metric_core::models::{
    CalculationType, DataTarget, FieldOperation, MeasureDefinition, ValueSet,
};

use crate::expression::Expression;

/// Where the numerator signal comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimarySignal {
    /// A raw field, optionally gated by a true-value set.
    Field {
        field: String,
        true_values: Option<(ValueSet, Expression)>,
    },
    /// A parsed numeric or boolean expression.
    Variable(Expression),
}

/// Denominator population.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseSignal {
    Always,
    Field {
        field: String,
        values: ValueSet,
        test: Expression,
    },
    Expression(Expression),
}

/// Second field combined with the primary signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Secondary {
    pub field: String,
    pub operation: FieldOperation,
    pub true_values: Option<(ValueSet, Expression)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    pub name: String,
    pub calculation_type: CalculationType,
    pub primary: PrimarySignal,
    pub base: BaseSignal,
    pub secondary: Option<Secondary>,
    /// Earliest date results may be reported from.
    pub min_date: Option<NaiveDate>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TryFrom<MeasureDefinition> for Measure {
    type Error = MeasureError;

    fn try_from(definition: MeasureDefinition) -> Result<Self, Self::Error> {
        let name = definition.name.clone();
        let parse = |source: &str| {
            Expression::parse(source).map_err(|source| MeasureError::Expression {
                measure: name.clone(),
                source,
            })
        };
        let value_set = |field: &str, values: &ValueSet| {
            if values.is_empty() {
                return Err(MeasureError::InvalidValueSet {
                    measure: name.clone(),
                    reason: format!("value set for {field} is empty"),
                });
            }
            Ok((values.clone(), Expression::from_value_set(field, values)))
        };

        let primary = match (non_blank(&definition.field), non_blank(&definition.primary_variable)) {
            (Some(_), Some(_)) => return Err(MeasureError::AmbiguousPrimary { measure: name.clone() }),
            (None, None) => return Err(MeasureError::MissingPrimary { measure: name.clone() }),
            (Some(field), None) => {
                let true_values = definition
                    .primary_true_values
                    .as_ref()
                    .map(|values| value_set(field, values))
                    .transpose()?;
                if true_values.is_none() && definition.calculation_type == CalculationType::YesNo {
                    return Err(MeasureError::MissingTrueValues { measure: name.clone() });
                }
                PrimarySignal::Field {
                    field: field.to_string(),
                    true_values,
                }
            }
            (None, Some(source)) => PrimarySignal::Variable(parse(source)?),
        };

        let base = match (non_blank(&definition.base_field), non_blank(&definition.base_expression)) {
            (Some(_), Some(_)) => return Err(MeasureError::AmbiguousBase { measure: name.clone() }),
            (Some(field), None) => {
                let values = definition
                    .base_values
                    .as_ref()
                    .ok_or_else(|| MeasureError::MissingBaseValues {
                        measure: name.clone(),
                    })?;
                let (values, test) = value_set(field, values)?;
                BaseSignal::Field {
                    field: field.to_string(),
                    values,
                    test,
                }
            }
            (None, Some(source)) => BaseSignal::Expression(parse(source)?),
            (None, None) => match (&definition.base_values, &primary) {
                (None, _) => BaseSignal::Always,
                // Base values with no base field apply to the primary field.
                (Some(values), PrimarySignal::Field { field, .. }) => {
                    let (values, test) = value_set(field, values)?;
                    BaseSignal::Field {
                        field: field.clone(),
                        values,
                        test,
                    }
                }
                (Some(_), PrimarySignal::Variable(_)) => {
                    return Err(MeasureError::InvalidValueSet {
                        measure: name.clone(),
                        reason: "base values need a base field or a primary field".to_string(),
                    })
                }
            },
        };

        let secondary = match (non_blank(&definition.field2), definition.field_operation) {
            (None, None) => None,
            (Some(field), Some(operation)) => Some(Secondary {
                field: field.to_string(),
                operation,
                true_values: definition
                    .secondary_true_values
                    .as_ref()
                    .map(|values| value_set(field, values))
                    .transpose()?,
            }),
            _ => return Err(MeasureError::IncompleteSecondary { measure: name.clone() }),
        };

        Ok(Self {
            name: definition.name,
            calculation_type: definition.calculation_type,
            primary,
            base,
            secondary,
            min_date: definition.min_date,
        })
    }
}

impl Measure {
    /// Every field the measure reads.
    pub fn field_dependencies(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        match &self.primary {
            PrimarySignal::Field { field, .. } => {
                fields.insert(field.clone());
            }
            PrimarySignal::Variable(expression) => fields.extend(expression.field_names()),
        }
        match &self.base {
            BaseSignal::Always => {}
            BaseSignal::Field { field, .. } => {
                fields.insert(field.clone());
            }
            BaseSignal::Expression(expression) => fields.extend(expression.field_names()),
        }
        if let Some(secondary) = &self.secondary {
            fields.insert(secondary.field.clone());
        }
        fields
    }

    /// Parsed expressions of the measure.
    pub fn expressions(&self) -> impl Iterator<Item = &Expression> {
        let primary = match &self.primary {
            PrimarySignal::Variable(expression) => Some(expression),
            PrimarySignal::Field { .. } => None,
        };
        let base = match &self.base {
            BaseSignal::Expression(expression) => Some(expression),
            _ => None,
        };
        primary.into_iter().chain(base)
    }

    /// Instances named by literal pins in the measure's expressions.
    pub fn pinned_targets(&self) -> Vec<DataTarget> {
        self.expressions()
            .flat_map(Expression::pinned_targets)
            .collect()
    }

    /// Factor applied to the weighted mean to give the reported result.
    pub fn result_scale(&self) -> f64 {
        match self.calculation_type {
            CalculationType::NetPromoterScore => 100.0,
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yes_no(field: &str) -> MeasureDefinition {
        let mut definition = MeasureDefinition::new("Consideration", CalculationType::YesNo);
        definition.field = Some(field.to_string());
        definition.primary_true_values = Some(ValueSet::Values(vec![1]));
        definition
    }

    #[test]
    fn builds_field_measure() {
        let measure = Measure::try_from(yes_no("consider")).unwrap();
        assert!(matches!(measure.primary, PrimarySignal::Field { ref field, .. } if field == "consider"));
        assert_eq!(measure.base, BaseSignal::Always);
        assert!(measure.secondary.is_none());
    }

    #[test]
    fn primary_must_be_unambiguous() {
        let mut both = yes_no("consider");
        both.primary_variable = Some("consider == 1".to_string());
        assert!(matches!(
            Measure::try_from(both),
            Err(MeasureError::AmbiguousPrimary { .. })
        ));

        let neither = MeasureDefinition::new("Empty", CalculationType::Average);
        assert!(matches!(
            Measure::try_from(neither),
            Err(MeasureError::MissingPrimary { .. })
        ));

        let mut blank = MeasureDefinition::new("Blank", CalculationType::Average);
        blank.primary_variable = Some("   ".to_string());
        assert!(matches!(
            Measure::try_from(blank),
            Err(MeasureError::MissingPrimary { .. })
        ));
    }

    #[test]
    fn yes_no_field_needs_true_values() {
        let mut definition = yes_no("consider");
        definition.primary_true_values = None;
        assert_eq!(
            Measure::try_from(definition),
            Err(MeasureError::MissingTrueValues {
                measure: "Consideration".to_string()
            })
        );
    }

    #[test]
    fn base_rules() {
        let mut missing_values = yes_no("consider");
        missing_values.base_field = Some("aware".to_string());
        assert!(matches!(
            Measure::try_from(missing_values),
            Err(MeasureError::MissingBaseValues { .. })
        ));

        let mut ambiguous = yes_no("consider");
        ambiguous.base_field = Some("aware".to_string());
        ambiguous.base_values = Some(ValueSet::Values(vec![1]));
        ambiguous.base_expression = Some("aware == 1".to_string());
        assert!(matches!(
            Measure::try_from(ambiguous),
            Err(MeasureError::AmbiguousBase { .. })
        ));

        let mut legacy = yes_no("consider");
        legacy.base_values = Some(ValueSet::Range { min: 0, max: 1 });
        let measure = Measure::try_from(legacy).unwrap();
        assert!(matches!(measure.base, BaseSignal::Field { ref field, .. } if field == "consider"));
    }

    #[test]
    fn secondary_must_be_complete() {
        let mut definition = yes_no("consider");
        definition.field2 = Some("reject".to_string());
        assert!(matches!(
            Measure::try_from(definition),
            Err(MeasureError::IncompleteSecondary { .. })
        ));
    }

    #[test]
    fn bad_expression_is_config_error() {
        let mut definition = MeasureDefinition::new("Broken", CalculationType::Average);
        definition.primary_variable = Some("spend +".to_string());
        assert!(matches!(
            Measure::try_from(definition),
            Err(MeasureError::Expression { ref measure, .. }) if measure == "Broken"
        ));
    }

    #[test]
    fn dependencies_cover_every_signal() {
        let mut definition = MeasureDefinition::new("Net", CalculationType::Average);
        definition.primary_variable = Some("max(pos, sum(response.neg(brand=3)))".to_string());
        definition.base_expression = Some("age >= 18".to_string());
        definition.field2 = Some("other".to_string());
        definition.field_operation = Some(FieldOperation::Minus);
        let measure = Measure::try_from(definition).unwrap();
        assert_eq!(
            measure.field_dependencies().into_iter().collect::<Vec<_>>(),
            vec!["age", "neg", "other", "pos"]
        );
        assert_eq!(measure.pinned_targets(), vec![DataTarget::new("brand", [3])]);
    }
}
