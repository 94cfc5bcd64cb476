use std::fmt;
use std::sync::Arc;

use metric_core::models::{
    AverageDescriptor, CalculationPeriod, DataTarget, SubsetId, TargetInstances,
};
use metric_filter::Filter;
use metric_measure::Measure;

/// Everything one calculation needs.
#[derive(Clone)]
pub struct CalculationRequest {
    pub subset: SubsetId,
    pub measure: Arc<Measure>,
    pub filter: Option<Arc<dyn Filter>>,
    /// Dimensions results are split by. The first one labels each series.
    pub targets: Vec<TargetInstances>,
    /// Extra instances the filter reads without splitting results.
    pub filter_instances: Vec<TargetInstances>,
    pub period: CalculationPeriod,
    pub average: AverageDescriptor,
}

impl CalculationRequest {
    pub fn new(
        subset: SubsetId,
        measure: Arc<Measure>,
        period: CalculationPeriod,
        average: AverageDescriptor,
    ) -> Self {
        Self {
            subset,
            measure,
            filter: None,
            targets: Vec::new(),
            filter_instances: Vec::new(),
            period,
            average,
        }
    }

    pub fn with_targets(mut self, targets: Vec<TargetInstances>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_filter_instances(mut self, instances: Vec<TargetInstances>) -> Self {
        self.filter_instances = instances;
        self
    }

    /// The same request for a different measure.
    pub fn for_measure(&self, measure: Arc<Measure>) -> Self {
        Self {
            measure,
            ..self.clone()
        }
    }

    /// Instances the request reads before filter dependencies are added.
    pub fn known_targets(&self) -> Vec<DataTarget> {
        self.targets
            .iter()
            .chain(&self.filter_instances)
            .map(DataTarget::from)
            .chain(self.measure.pinned_targets())
            .collect()
    }
}

impl fmt::Debug for CalculationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculationRequest")
            .field("subset", &self.subset)
            .field("measure", &self.measure.name)
            .field("filter", &self.filter)
            .field("targets", &self.targets.len())
            .field("filter_instances", &self.filter_instances.len())
            .field("period", &self.period)
            .field("average", &self.average.average_id)
            .finish()
    }
}
