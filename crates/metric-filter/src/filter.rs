use std::collections::BTreeSet;
use std::fmt;

use metric_core::models::{DataTarget, EntityValueCombination, ResponseRecord};

use crate::targets::merge_data_targets;

/// A filter bound to one result combination.
pub type BoundFilter<'a> = Box<dyn Fn(&ResponseRecord) -> bool + Send + Sync + 'a>;

/// Fields and entity instances a filter needs loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDependencies {
    pub fields: BTreeSet<String>,
    /// One target per entity type.
    pub targets: Vec<DataTarget>,
}

impl FilterDependencies {
    /// Start from targets the caller already loads.
    pub fn from_known(known: &[DataTarget]) -> Self {
        Self {
            fields: BTreeSet::new(),
            targets: merge_data_targets(known.iter().cloned()),
        }
    }

    pub fn add_fields(&mut self, fields: impl IntoIterator<Item = String>) {
        self.fields.extend(fields);
    }

    pub fn add_targets(&mut self, targets: impl IntoIterator<Item = DataTarget>) {
        let current = std::mem::take(&mut self.targets);
        self.targets = merge_data_targets(current.into_iter().chain(targets));
    }
}

/// A predicate over responses, curried on the result combination.
pub trait Filter: Send + Sync + fmt::Debug {
    /// Bind to the combination of the result row being calculated.
    fn bind(&self, target: &EntityValueCombination) -> BoundFilter<'_>;

    /// Fields and targets needed to apply this filter, given the targets
    /// the caller already loads. The returned targets include `known`.
    fn field_dependencies_and_data_targets(&self, known: &[DataTarget]) -> FilterDependencies;
}

/// Includes every response.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysIncludeFilter;

impl Filter for AlwaysIncludeFilter {
    fn bind(&self, _target: &EntityValueCombination) -> BoundFilter<'_> {
        Box::new(|_: &ResponseRecord| true)
    }

    fn field_dependencies_and_data_targets(&self, known: &[DataTarget]) -> FilterDependencies {
        FilterDependencies::from_known(known)
    }
}
