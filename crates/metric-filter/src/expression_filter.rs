use metric_core::errors::FilterError;
use metric_core::models::{DataTarget, EntityValueCombination, ResponseRecord, SubsetId};
use metric_entity::ResponseFieldManager;
use metric_measure::{bind_fields, Expression, FieldMap, ResponseContext};
use tracing::debug;

use crate::filter::{BoundFilter, Filter, FilterDependencies};

/// Keeps responses for which a boolean expression holds at the result
/// combination. A blank expression keeps everything.
#[derive(Debug, Clone)]
pub struct ExpressionFilter {
    expression: Option<Expression>,
    fields: FieldMap,
    subset: SubsetId,
}

impl ExpressionFilter {
    pub fn new(
        source: &str,
        registry: &ResponseFieldManager,
        subset: &SubsetId,
    ) -> Result<Self, FilterError> {
        if source.trim().is_empty() {
            debug!("blank filter expression, including every response");
            return Ok(Self {
                expression: None,
                fields: FieldMap::default(),
                subset: subset.clone(),
            });
        }

        let expression = Expression::parse(source)?;
        let names = expression.field_names();
        let fields = bind_fields(names.iter().map(String::as_str), registry).map_err(|_| {
            FilterError::UnknownField {
                field: names
                    .iter()
                    .find(|name| !registry.contains(name))
                    .cloned()
                    .unwrap_or_default(),
            }
        })?;
        for (field, entity_type) in expression.pinned_types() {
            let keyed = fields
                .get(&field)
                .is_some_and(|descriptor| descriptor.entity_types.contains(&entity_type));
            if !keyed {
                return Err(FilterError::UnrelatedEntityType { field, entity_type });
            }
        }

        Ok(Self {
            expression: Some(expression),
            fields,
            subset: subset.clone(),
        })
    }

    pub fn expression(&self) -> Option<&Expression> {
        self.expression.as_ref()
    }
}

impl Filter for ExpressionFilter {
    fn bind(&self, target: &EntityValueCombination) -> BoundFilter<'_> {
        let Some(expression) = &self.expression else {
            return Box::new(|_: &ResponseRecord| true);
        };
        let target = target.clone();
        Box::new(move |response: &ResponseRecord| {
            let ctx = ResponseContext::new(response, &target, &self.fields, &self.subset);
            expression.is_true(&ctx)
        })
    }

    fn field_dependencies_and_data_targets(&self, known: &[DataTarget]) -> FilterDependencies {
        let mut dependencies = FilterDependencies::from_known(known);
        if let Some(expression) = &self.expression {
            dependencies.add_fields(expression.field_names());
            dependencies.add_targets(expression.pinned_targets());
        }
        dependencies
    }
}
