//! Filters on another measure's value.
//!
//! A `MetricFilter` evaluates a measure at its own entity combination,
//! e.g. "respondents who consider brand 1", and keeps a response when the
//! measure's raw primary value is one of the accepted values. Types the
//! filter combination leaves open are taken from the result combination.

use std::collections::BTreeSet;
use std::sync::Arc;

use metric_core::errors::FilterError;
use metric_core::models::{
    DataTarget, EntityValueCombination, ResponseRecord, SubsetId, ValueSet,
};
use metric_entity::ResponseFieldManager;
use metric_measure::{FieldMap, Measure, MeasureEvaluator, PrimarySignal};

use crate::filter::{BoundFilter, Filter, FilterDependencies};

#[derive(Debug, Clone)]
pub struct MetricFilter {
    measure: Arc<Measure>,
    fields: FieldMap,
    subset: SubsetId,
    combination: EntityValueCombination,
    values: ValueSet,
    invert: bool,
}

impl MetricFilter {
    pub fn new(
        measure: Arc<Measure>,
        registry: &ResponseFieldManager,
        subset: &SubsetId,
        combination: EntityValueCombination,
        values: ValueSet,
    ) -> Result<Self, FilterError> {
        let fields = MeasureEvaluator::bind(&measure, registry, subset)?
            .fields()
            .clone();

        let mut related: BTreeSet<&str> = fields
            .values()
            .flat_map(|field| field.entity_types.iter().map(String::as_str))
            .collect();
        let result_types: BTreeSet<String> = measure
            .expressions()
            .flat_map(|expression| expression.result_entity_types())
            .collect();
        related.extend(result_types.iter().map(String::as_str));

        if let Some(unrelated) = combination
            .values()
            .iter()
            .find(|value| !related.contains(value.entity_type.as_str()))
        {
            let field = match &measure.primary {
                PrimarySignal::Field { field, .. } => field.clone(),
                PrimarySignal::Variable(_) => measure.name.clone(),
            };
            return Err(FilterError::UnrelatedEntityType {
                field,
                entity_type: unrelated.entity_type.clone(),
            });
        }

        Ok(Self {
            measure,
            fields,
            subset: subset.clone(),
            combination,
            values,
            invert: false,
        })
    }

    /// Keep responses in the measure's base whose value is NOT accepted,
    /// including those with no answer.
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn measure(&self) -> &Measure {
        &self.measure
    }

    pub fn combination(&self) -> &EntityValueCombination {
        &self.combination
    }

    /// Filter combination, completed from `target` for unbound types.
    fn resolve(&self, target: &EntityValueCombination) -> EntityValueCombination {
        let open = target
            .values()
            .iter()
            .filter(|value| self.combination.instance_of(&value.entity_type).is_none())
            .cloned();
        EntityValueCombination::try_from_values(self.combination.values().iter().cloned().chain(open))
            .unwrap_or_else(|_| self.combination.clone())
    }

    fn matches(
        &self,
        evaluator: &MeasureEvaluator<'_>,
        response: &ResponseRecord,
        combination: &EntityValueCombination,
    ) -> bool {
        if !evaluator.in_base(response, combination) {
            return false;
        }
        let accepted = evaluator
            .primary_value(response, combination)
            .is_some_and(|value| self.values.contains(value));
        accepted != self.invert
    }
}

impl Filter for MetricFilter {
    fn bind(&self, target: &EntityValueCombination) -> BoundFilter<'_> {
        let combination = self.resolve(target);
        let evaluator =
            MeasureEvaluator::with_fields(&self.measure, self.fields.clone(), self.subset.clone());
        Box::new(move |response: &ResponseRecord| self.matches(&evaluator, response, &combination))
    }

    fn field_dependencies_and_data_targets(&self, known: &[DataTarget]) -> FilterDependencies {
        let mut dependencies = FilterDependencies::from_known(known);
        dependencies.add_fields(self.measure.field_dependencies());
        dependencies.add_targets(
            self.combination
                .values()
                .iter()
                .map(|value| DataTarget::new(value.entity_type.clone(), [value.instance_id])),
        );
        dependencies.add_targets(self.measure.pinned_targets());
        dependencies
    }
}
