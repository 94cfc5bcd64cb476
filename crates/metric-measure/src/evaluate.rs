//! Per-response measure evaluation.

use metric_core::errors::{EntityError, MeasureError};
use metric_core::models::{
    CalculationType, EntityValueCombination, FieldOperation, ResponseRecord, SubsetId,
};
use metric_entity::ResponseFieldManager;
use tracing::debug;

use crate::context::{bind_fields, FieldMap, ResponseContext};
use crate::expression::{truthy, EvalContext, Expression};
use crate::measure::{BaseSignal, Measure, PrimarySignal, Secondary};
use crate::nps;

/// What one response contributes to one result row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseValue {
    /// Outside the denominator population.
    NotInBase,
    /// In base but without a usable answer. Counts towards neither the
    /// sample size nor the value total.
    Excluded,
    /// Counted with this value.
    Counted(f64),
}

impl ResponseValue {
    pub fn counted(&self) -> Option<f64> {
        match self {
            Self::Counted(value) => Some(*value),
            _ => None,
        }
    }
}

/// One side of a two-field composite.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Absent,
    Present { value: f64, is_true: bool },
}

impl Side {
    fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    fn is_true(&self) -> bool {
        matches!(self, Self::Present { is_true: true, .. })
    }

    fn indicator(&self) -> f64 {
        if self.is_true() {
            1.0
        } else {
            0.0
        }
    }

    /// The value when present and true, otherwise zero.
    fn contribution(&self) -> f64 {
        match self {
            Self::Present {
                value,
                is_true: true,
            } => *value,
            _ => 0.0,
        }
    }
}

/// A measure bound to the field descriptors of one subset.
#[derive(Debug, Clone)]
pub struct MeasureEvaluator<'m> {
    measure: &'m Measure,
    fields: FieldMap,
    subset: SubsetId,
}

impl<'m> MeasureEvaluator<'m> {
    /// Resolve every field the measure reads. Unknown fields and pins on
    /// entity types a field is not keyed by are configuration errors.
    pub fn bind(
        measure: &'m Measure,
        registry: &ResponseFieldManager,
        subset: &SubsetId,
    ) -> Result<Self, MeasureError> {
        let dependencies = measure.field_dependencies();
        let fields = bind_fields(dependencies.iter().map(String::as_str), registry).map_err(
            |error| MeasureError::UnknownField {
                measure: measure.name.clone(),
                field: match error {
                    EntityError::UnknownField { name } => name,
                    other => other.to_string(),
                },
            },
        )?;

        for expression in measure.expressions() {
            for (field, entity_type) in expression.pinned_types() {
                let keyed = fields
                    .get(&field)
                    .is_some_and(|d| d.entity_types.contains(&entity_type));
                if !keyed {
                    return Err(MeasureError::UnknownField {
                        measure: measure.name.clone(),
                        field: format!("{field}({entity_type}=...)"),
                    });
                }
            }
        }

        debug!(measure = %measure.name, subset = %subset, fields = fields.len(), "bound measure");
        Ok(Self {
            measure,
            fields,
            subset: subset.clone(),
        })
    }

    /// Build from fields already resolved by an earlier `bind`.
    pub fn with_fields(measure: &'m Measure, fields: FieldMap, subset: SubsetId) -> Self {
        Self {
            measure,
            fields,
            subset,
        }
    }

    pub fn measure(&self) -> &'m Measure {
        self.measure
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn subset(&self) -> &SubsetId {
        &self.subset
    }

    pub fn context<'a>(
        &'a self,
        response: &'a ResponseRecord,
        combination: &'a EntityValueCombination,
    ) -> ResponseContext<'a> {
        ResponseContext::new(response, combination, &self.fields, &self.subset)
    }

    pub fn in_base(&self, response: &ResponseRecord, combination: &EntityValueCombination) -> bool {
        let ctx = self.context(response, combination);
        match &self.measure.base {
            BaseSignal::Always => true,
            BaseSignal::Field { test, .. } => test.is_true(&ctx),
            BaseSignal::Expression(expression) => expression.is_true(&ctx),
        }
    }

    /// Raw numeric primary signal, before true values and secondary fields.
    pub fn primary_value(
        &self,
        response: &ResponseRecord,
        combination: &EntityValueCombination,
    ) -> Option<f64> {
        let ctx = self.context(response, combination);
        match &self.measure.primary {
            PrimarySignal::Field { field, .. } => ctx.field_value(field),
            PrimarySignal::Variable(expression) => expression.evaluate(&ctx),
        }
    }

    pub fn evaluate(
        &self,
        response: &ResponseRecord,
        combination: &EntityValueCombination,
    ) -> ResponseValue {
        if !self.in_base(response, combination) {
            return ResponseValue::NotInBase;
        }
        let ctx = self.context(response, combination);
        match self.measure.calculation_type {
            CalculationType::Text => self.text(&ctx),
            CalculationType::YesNo => self.yes_no(&ctx),
            CalculationType::Average => self.average(&ctx),
            CalculationType::NetPromoterScore => match self.average(&ctx) {
                ResponseValue::Counted(score) => {
                    nps::classify(score).map_or(ResponseValue::Excluded, ResponseValue::Counted)
                }
                other => other,
            },
        }
    }

    /// Truthiness of a value with no true-value set: non-zero for yes/no
    /// signals, present for everything else.
    fn default_truth(&self, value: f64) -> bool {
        match self.measure.calculation_type {
            CalculationType::YesNo => truthy(Some(value)),
            _ => true,
        }
    }

    fn side(
        &self,
        ctx: &ResponseContext<'_>,
        value: Option<f64>,
        true_values: Option<&Expression>,
    ) -> Side {
        match value {
            None => Side::Absent,
            Some(value) => Side::Present {
                value,
                is_true: true_values.map_or_else(|| self.default_truth(value), |tv| tv.is_true(ctx)),
            },
        }
    }

    fn primary(&self, ctx: &ResponseContext<'_>) -> Side {
        match &self.measure.primary {
            PrimarySignal::Field { field, true_values } => self.side(
                ctx,
                ctx.field_value(field),
                true_values.as_ref().map(|(_, expression)| expression),
            ),
            PrimarySignal::Variable(expression) => self.side(ctx, expression.evaluate(ctx), None),
        }
    }

    fn secondary(&self, ctx: &ResponseContext<'_>, secondary: &Secondary) -> Side {
        self.side(
            ctx,
            ctx.field_value(&secondary.field),
            secondary.true_values.as_ref().map(|(_, expression)| expression),
        )
    }

    fn yes_no(&self, ctx: &ResponseContext<'_>) -> ResponseValue {
        let primary = self.primary(ctx);
        let Some(secondary) = &self.measure.secondary else {
            return single_indicator(primary);
        };
        let other = self.secondary(ctx, secondary);
        match secondary.operation {
            FieldOperation::Filter if !other.is_true() => ResponseValue::Excluded,
            FieldOperation::Filter => single_indicator(primary),
            _ if !primary.is_present() && !other.is_present() => ResponseValue::Excluded,
            FieldOperation::Minus => ResponseValue::Counted(primary.indicator() - other.indicator()),
            FieldOperation::Plus => ResponseValue::Counted(primary.indicator() + other.indicator()),
            FieldOperation::Or => {
                ResponseValue::Counted(if primary.is_true() || other.is_true() { 1.0 } else { 0.0 })
            }
        }
    }

    fn average(&self, ctx: &ResponseContext<'_>) -> ResponseValue {
        let primary = self.primary(ctx);
        let Some(secondary) = &self.measure.secondary else {
            return single_value(primary);
        };
        let other = self.secondary(ctx, secondary);
        match secondary.operation {
            FieldOperation::Filter if !other.is_true() => ResponseValue::Excluded,
            FieldOperation::Filter => single_value(primary),
            FieldOperation::Or if !primary.is_present() && !other.is_present() => {
                ResponseValue::Excluded
            }
            FieldOperation::Or => {
                ResponseValue::Counted(if primary.is_true() || other.is_true() { 1.0 } else { 0.0 })
            }
            _ if !primary.is_true() && !other.is_true() => ResponseValue::Excluded,
            FieldOperation::Minus => {
                ResponseValue::Counted(primary.contribution() - other.contribution())
            }
            FieldOperation::Plus => {
                ResponseValue::Counted(primary.contribution() + other.contribution())
            }
        }
    }

    fn text(&self, ctx: &ResponseContext<'_>) -> ResponseValue {
        if let Some(secondary) = &self.measure.secondary {
            if secondary.operation == FieldOperation::Filter && !self.secondary(ctx, secondary).is_true() {
                return ResponseValue::Excluded;
            }
        }
        let has_verbatim = match &self.measure.primary {
            PrimarySignal::Field { field, .. } => {
                ctx.text(field).is_some_and(|text| !text.trim().is_empty())
            }
            PrimarySignal::Variable(expression) => expression.is_true(ctx),
        };
        ResponseValue::Counted(if has_verbatim { 1.0 } else { 0.0 })
    }
}

fn single_indicator(side: Side) -> ResponseValue {
    match side {
        Side::Absent => ResponseValue::Excluded,
        present => ResponseValue::Counted(present.indicator()),
    }
}

fn single_value(side: Side) -> ResponseValue {
    match side {
        Side::Present {
            value,
            is_true: true,
        } => ResponseValue::Counted(value),
        _ => ResponseValue::Excluded,
    }
}
