//! Calculation orchestrator.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, Instrument};

use metric_core::collections::FxHashMap;
use metric_core::config::EngineConfig;
use metric_core::errors::{DataError, MetricError, MetricResult};
use metric_core::models::{
    AverageType, CalculationType, DataTarget, DateRange, EntityMeanMap, EntityValueCombination,
    EntityWeightedDailyResults, MainQuestionType, ReferenceWeightings, ResponseFieldDescriptor,
    ResponseId, ResponseRecord, SigConfidenceLevel, Significance, SubsetId, WeightAcross,
    WeightedDailyResult,
};
use metric_core::traits::{Cancellable, CancellationToken, QuotaCellReferenceWeightingRepository};
use metric_data::LazyDataLoader;
use metric_entity::{entity_value_combinations, RegistrySnapshot, SharedRegistry};
use metric_filter::{AlwaysIncludeFilter, Filter};
use metric_measure::{Measure, MeasureEvaluator, ResponseValue};
use metric_weighting::{
    calculate_market_average, CellAccumulator, CellMix, MarketAverage, QuotaCellScheme, QuotaWeigher,
    RelativeSizes,
};
use metric_windowing::{across_windows, roll_up, ResultWindow, Windower};

use crate::request::CalculationRequest;
use crate::{calculation_span, fetch_span};

/// Runs calculation requests against one registry, loader and weighting
/// repository.
pub struct MetricCalculationOrchestrator {
    registry: Arc<SharedRegistry>,
    loader: Arc<LazyDataLoader>,
    weightings: Arc<dyn QuotaCellReferenceWeightingRepository>,
    schemes: FxHashMap<SubsetId, QuotaCellScheme>,
    config: EngineConfig,
}

/// Everything resolved before responses are evaluated.
struct Plan {
    snapshot: Arc<RegistrySnapshot>,
    combinations: Vec<EntityValueCombination>,
    fields: Vec<ResponseFieldDescriptor>,
    targets: Vec<DataTarget>,
    windows: Vec<ResultWindow>,
}

/// One combination's series, with the cell breakdown of each result when
/// it was asked for.
struct Evaluated {
    series: EntityWeightedDailyResults,
    cells: Vec<CellMix>,
}

impl MetricCalculationOrchestrator {
    pub fn new(
        registry: Arc<SharedRegistry>,
        loader: Arc<LazyDataLoader>,
        weightings: Arc<dyn QuotaCellReferenceWeightingRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            loader,
            weightings,
            schemes: FxHashMap::default(),
            config,
        }
    }

    /// Register the quota scheme of one subset. Subsets without a scheme
    /// put every response in the unweighted cell.
    pub fn with_scheme(mut self, scheme: QuotaCellScheme) -> Self {
        self.schemes.insert(scheme.subset.clone(), scheme);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loader(&self) -> &LazyDataLoader {
        &self.loader
    }

    /// One result series per combination of the requested dimensions,
    /// labelled with the instance of the first dimension. With no
    /// dimensions there is a single unlabelled series.
    pub async fn calculate(
        &self,
        request: &CalculationRequest,
        token: &CancellationToken,
    ) -> MetricResult<Vec<EntityWeightedDailyResults>> {
        let evaluated = self.calculate_cells(request, false, token).await?;
        Ok(evaluated.into_iter().map(|e| e.series).collect())
    }

    async fn calculate_cells(
        &self,
        request: &CalculationRequest,
        keep_cells: bool,
        token: &CancellationToken,
    ) -> MetricResult<Vec<Evaluated>> {
        let span = calculation_span!(request.measure.name, request.subset, request.average.average_id);
        self.calculate_in_span(request, keep_cells, token).instrument(span).await
    }

    async fn calculate_in_span(
        &self,
        request: &CalculationRequest,
        keep_cells: bool,
        token: &CancellationToken,
    ) -> MetricResult<Vec<Evaluated>> {
        let plan = self.plan(request).await?;
        let Some(range) = loaded_range(&plan.windows) else {
            debug!("no admissible result windows");
            return Ok(plan
                .combinations
                .iter()
                .map(|combination| Evaluated {
                    series: label(request, combination, Vec::new()),
                    cells: Vec::new(),
                })
                .collect());
        };

        let records = self
            .loader
            .get_data_for_fields(&request.subset, &plan.fields, Some(range), &plan.targets, token)
            .instrument(fetch_span!(request.subset, plan.fields.len()))
            .await?;
        if token.is_cancelled() {
            return Err(DataError::Cancelled.into());
        }

        let weightings = self.weightings.get(&request.subset);
        let series = self.evaluate(request, &plan, &records, weightings.as_deref(), keep_cells, token)?;
        info!(
            series = series.len(),
            windows = plan.windows.len(),
            responses = records.len(),
            "calculation finished"
        );
        Ok(series)
    }

    /// Blend per-entity results into one series, optionally weighted by a
    /// relative-size measure calculated over the same request. Relative-size
    /// blends spread each entity's size over its weighted quota cells.
    pub async fn calculate_market_average(
        &self,
        request: &CalculationRequest,
        relative_size: Option<Arc<Measure>>,
        average_type: AverageType,
        question_type: MainQuestionType,
        mean_map: Option<&EntityMeanMap>,
        token: &CancellationToken,
    ) -> MetricResult<MarketAverage> {
        let Some(measure) = relative_size else {
            let results = self.calculate(request, token).await?;
            return Ok(calculate_market_average(
                &results,
                self.config.weighting.minimum_sample_per_point,
                average_type,
                question_type,
                mean_map,
                None,
            )?);
        };

        let (results, cells): (Vec<_>, Vec<_>) = self
            .calculate_cells(request, true, token)
            .await?
            .into_iter()
            .map(|e| (e.series, e.cells))
            .unzip();
        let sizes = self.calculate(&request.for_measure(measure), token).await?;
        let relative = RelativeSizes::new(&sizes)
            .with_cells(&cells)
            .with_tolerance(self.config.weighting.weight_sum_tolerance);
        Ok(calculate_market_average(
            &results,
            self.config.weighting.minimum_sample_per_point,
            average_type,
            question_type,
            mean_map,
            Some(relative),
        )?)
    }

    /// Verdict of each result against its predecessor, at `level` or the
    /// configured default.
    pub fn calculate_significance(
        &self,
        results: &[WeightedDailyResult],
        calculation_type: CalculationType,
        level: Option<SigConfidenceLevel>,
    ) -> Vec<Significance> {
        let level = level.unwrap_or(self.config.significance.default_confidence);
        metric_significance::compare_consecutive(results, calculation_type, level)
    }

    /// Ids of every response counted by the request, ascending.
    pub async fn response_ids(
        &self,
        request: &CalculationRequest,
        token: &CancellationToken,
    ) -> MetricResult<Vec<ResponseId>> {
        let mut with_ids = request.clone();
        with_ids.average.include_response_ids = true;
        let series = self.calculate(&with_ids, token).await?;
        let ids: BTreeSet<ResponseId> = series
            .iter()
            .flat_map(|s| &s.results)
            .flat_map(|r| r.response_ids.iter().copied())
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn plan(&self, request: &CalculationRequest) -> MetricResult<Plan> {
        let snapshot = self.registry.current();
        let combinations = entity_value_combinations(&request.targets)?;

        let filter = self.filter_of(request);
        let dependencies = filter.field_dependencies_and_data_targets(&request.known_targets());
        let mut names: BTreeSet<String> = request.measure.field_dependencies();
        names.extend(dependencies.fields);
        names.extend(self.scheme_for(&request.subset).field_names().map(str::to_string));
        let fields = names
            .iter()
            .map(|name| snapshot.fields.get(name).map(|field| (*field).clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let data_start = self.loader.dataset_start(&request.subset).await?;
        let windows = Windower::windows(
            &request.average,
            &request.period,
            data_start,
            request.measure.min_date,
        )?;
        debug!(
            combinations = combinations.len(),
            fields = fields.len(),
            targets = dependencies.targets.len(),
            windows = windows.len(),
            "planned calculation"
        );
        Ok(Plan {
            snapshot,
            combinations,
            fields,
            targets: dependencies.targets,
            windows,
        })
    }

    fn evaluate(
        &self,
        request: &CalculationRequest,
        plan: &Plan,
        records: &[Arc<ResponseRecord>],
        weightings: Option<&ReferenceWeightings>,
        keep_cells: bool,
        token: &CancellationToken,
    ) -> MetricResult<Vec<Evaluated>> {
        let evaluator = MeasureEvaluator::bind(&request.measure, &plan.snapshot.fields, &request.subset)?;
        let weigher = QuotaWeigher::new(weightings)?;
        let filter = self.filter_of(request);
        let scheme = self.scheme_for(&request.subset);
        let calculation_type = request.measure.calculation_type;
        let keep_ids = request.average.include_response_ids;

        // Each response's quota cell does not depend on the combination.
        let cells: Vec<String> = records.iter().map(|r| scheme.cell_for(r.as_ref()).key).collect();

        plan.combinations
            .par_iter()
            .map(|combination| {
                if token.is_cancelled() {
                    return Err(MetricError::from(DataError::Cancelled));
                }
                let included = filter.bind(combination);
                let mut daily = CellAccumulator::new(keep_ids);
                for (record, cell) in records.iter().zip(&cells) {
                    let record: &ResponseRecord = record;
                    if !included(record) {
                        continue;
                    }
                    if let ResponseValue::Counted(value) = evaluator.evaluate(record, combination) {
                        daily.add(record.date, cell, record.id, value);
                    }
                }

                let windows = roll_up(&daily, &plan.windows);
                let shared_weights = match request.average.weight_across {
                    WeightAcross::AllPeriods => {
                        Some(weigher.weights_for(&across_windows(&daily, &plan.windows)))
                    }
                    WeightAcross::SinglePeriod => None,
                };
                let mut mixes = Vec::new();
                let results = windows
                    .iter()
                    .map(|totals| {
                        let weights = match &shared_weights {
                            Some(weights) => Cow::Borrowed(weights),
                            None => Cow::Owned(weigher.weights_for(&totals.cells)),
                        };
                        if keep_cells {
                            mixes.push(weigher.cell_mix(&totals.cells, &weights, calculation_type));
                        }
                        weigher.weigh(totals.window.result_date, &totals.cells, &weights, calculation_type)
                    })
                    .collect();
                Ok(Evaluated {
                    series: label(request, combination, results),
                    cells: mixes,
                })
            })
            .collect()
    }

    fn filter_of(&self, request: &CalculationRequest) -> Arc<dyn Filter> {
        request
            .filter
            .clone()
            .unwrap_or_else(|| Arc::new(AlwaysIncludeFilter))
    }

    fn scheme_for(&self, subset: &SubsetId) -> QuotaCellScheme {
        self.schemes
            .get(subset)
            .cloned()
            .unwrap_or_else(|| QuotaCellScheme::unweighted(subset.clone()))
    }
}

/// The day span every window together covers.
fn loaded_range(windows: &[ResultWindow]) -> Option<DateRange> {
    let start = windows.iter().map(|w| w.start).min()?;
    let end = windows.iter().map(|w| w.end).max()?;
    Some(DateRange::new(start, end))
}

fn label(
    request: &CalculationRequest,
    combination: &EntityValueCombination,
    results: Vec<WeightedDailyResult>,
) -> EntityWeightedDailyResults {
    let instance = request.targets.first().and_then(|first| {
        let id = combination.instance_of(&first.entity_type.id)?;
        first.instances.iter().find(|i| i.id == id).cloned()
    });
    EntityWeightedDailyResults::new(instance, results)
}
