use std::sync::Arc;

use metric_core::models::{DataTarget, EntityValueCombination, ResponseRecord};

use crate::filter::{BoundFilter, Filter, FilterDependencies};

/// Includes a response only when every child filter does.
#[derive(Debug, Clone, Default)]
pub struct AndFilter {
    filters: Vec<Arc<dyn Filter>>,
}

impl AndFilter {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Filter for AndFilter {
    fn bind(&self, target: &EntityValueCombination) -> BoundFilter<'_> {
        let bound: Vec<BoundFilter<'_>> = self.filters.iter().map(|f| f.bind(target)).collect();
        Box::new(move |response: &ResponseRecord| bound.iter().all(|filter| filter(response)))
    }

    fn field_dependencies_and_data_targets(&self, known: &[DataTarget]) -> FilterDependencies {
        self.filters
            .iter()
            .fold(FilterDependencies::from_known(known), |mut acc, filter| {
                let child = filter.field_dependencies_and_data_targets(&acc.targets);
                acc.add_fields(child.fields);
                acc.add_targets(child.targets);
                acc
            })
    }
}
