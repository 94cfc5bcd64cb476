//! Blends per-entity result series into one market-average series.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, info};

use metric_core::constants::{DEFAULT_WEIGHT_SUM_TOLERANCE, WEIGHT_IS_ZERO};
use metric_core::errors::WeightingError;
use metric_core::models::{
    AverageType, EntityMeanMap, EntityWeightedDailyResults, MainQuestionType, WeightedDailyResult,
};

use crate::blend::{blend_weights, CellMix, EntityCellTargets};
use crate::stats::{safe_divide, weighted_standard_deviation};

/// Entity id used for a result series with no entity instance.
const NO_ENTITY_ID: i32 = -1;

/// Market-average series plus the entity instances whose relative-size
/// weight was capped for low sample in at least one period.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketAverage {
    pub results: Vec<WeightedDailyResult>,
    pub downweighted: BTreeSet<i32>,
}

/// Relative-size results to weight each entity by, aligned with the
/// entity results.
#[derive(Debug, Clone, Copy)]
pub struct RelativeSizes<'a> {
    pub sizes: &'a [EntityWeightedDailyResults],
    /// Per entity, per period cell breakdown of the blended results. Without
    /// it each entity result is blended as a single cell.
    pub cells: Option<&'a [Vec<CellMix>]>,
    pub tolerance: f64,
}

impl<'a> RelativeSizes<'a> {
    pub fn new(sizes: &'a [EntityWeightedDailyResults]) -> Self {
        Self {
            sizes,
            cells: None,
            tolerance: DEFAULT_WEIGHT_SUM_TOLERANCE,
        }
    }

    pub fn with_cells(mut self, cells: &'a [Vec<CellMix>]) -> Self {
        self.cells = Some(cells);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// One entity's result in one period, with its blend weight.
#[derive(Debug, Clone, Copy)]
struct Weighted<'r> {
    entity_id: i32,
    result: &'r WeightedDailyResult,
    weight: f64,
    cells: Option<&'r CellMix>,
}

/// Blend `entity_results` into one series.
///
/// Without `relative_sizes` every entity weighs the same. With them, each
/// entity weighs its relative-size result for the same date, capped so that
/// every `1 / minimum_sample` of the average represents at least one
/// respondent. The mean is then taken over the entity x cell grid built by
/// [`blend_weights`], which must sum to one within the tolerance.
pub fn calculate_market_average(
    entity_results: &[EntityWeightedDailyResults],
    minimum_sample: u16,
    average_type: AverageType,
    question_type: MainQuestionType,
    mean_map: Option<&EntityMeanMap>,
    relative_sizes: Option<RelativeSizes<'_>>,
) -> Result<MarketAverage, WeightingError> {
    if entity_results.is_empty() {
        return Err(WeightingError::EmptyResults);
    }
    if let Some(relative) = &relative_sizes {
        check_aligned(entity_results, relative.sizes)?;
        if let Some(cells) = relative.cells {
            check_cells_aligned(entity_results, cells)?;
        }
    }
    debug!(
        entities = entity_results.len(),
        ?average_type,
        ?question_type,
        relative_sizes = relative_sizes.is_some(),
        "calculating market average"
    );

    let periods = pivot(entity_results)?;
    let mut downweighted = BTreeSet::new();
    let weighted_periods = match relative_sizes {
        None => periods
            .iter()
            .map(|period| {
                period
                    .iter()
                    .map(|(entity_id, result)| Weighted {
                        entity_id: *entity_id,
                        result: *result,
                        weight: 1.0,
                        cells: None,
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>(),
        Some(relative) => {
            let size_periods = pivot(relative.sizes)?;
            let sizes_by_date: BTreeMap<NaiveDate, &Vec<(i32, &WeightedDailyResult)>> = size_periods
                .iter()
                .filter_map(|period| period.first().map(|(_, r)| (r.date, period)))
                .collect();
            let mut weighted = Vec::with_capacity(periods.len());
            for (index, period) in periods.iter().enumerate() {
                let Some((_, first)) = period.first() else {
                    continue;
                };
                let sizes = sizes_by_date
                    .get(&first.date)
                    .ok_or(WeightingError::MissingRelativeSize { date: first.date })?;
                let mut row: Vec<Weighted<'_>> = period
                    .iter()
                    .zip(sizes.iter())
                    .enumerate()
                    .map(|(entity, ((entity_id, result), (_, size)))| Weighted {
                        entity_id: *entity_id,
                        result: *result,
                        weight: size.weighted_result,
                        cells: relative.cells.map(|cells| &cells[entity][index]),
                    })
                    .collect();
                trim_weights_for_low_sample(&mut row, minimum_sample, &mut downweighted);
                weighted.push(row);
            }
            weighted
        }
    };

    if !downweighted.is_empty() {
        info!(
            entities = ?downweighted,
            minimum_sample,
            "market-average weights capped for low sample"
        );
    }

    let tolerance = relative_sizes.as_ref().map(|relative| relative.tolerance);
    let results = weighted_periods
        .iter()
        .map(|period| match average_type {
            AverageType::Mean | AverageType::ResultMean => result_mean(period, tolerance),
            AverageType::EntityIdMean => entity_id_mean(period, mean_map),
            AverageType::Median => median_entity_id(period),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MarketAverage {
        results,
        downweighted,
    })
}

fn check_aligned(
    entity_results: &[EntityWeightedDailyResults],
    relative_sizes: &[EntityWeightedDailyResults],
) -> Result<(), WeightingError> {
    let misaligned: Vec<String> = entity_results
        .iter()
        .zip(relative_sizes)
        .filter(|(result, size)| result.entity_instance != size.entity_instance)
        .map(|(result, size)| format!("{:?}/{:?}", result.instance_id(), size.instance_id()))
        .collect();
    if !misaligned.is_empty() || entity_results.len() != relative_sizes.len() {
        return Err(WeightingError::MisalignedEntities {
            details: if misaligned.is_empty() {
                format!(
                    "{} entities against {} relative sizes",
                    entity_results.len(),
                    relative_sizes.len()
                )
            } else {
                misaligned.join(",")
            },
        });
    }
    Ok(())
}

fn check_cells_aligned(
    entity_results: &[EntityWeightedDailyResults],
    cells: &[Vec<CellMix>],
) -> Result<(), WeightingError> {
    let aligned = cells.len() == entity_results.len()
        && cells
            .iter()
            .zip(entity_results)
            .all(|(mixes, entity)| mixes.len() == entity.results.len());
    if aligned {
        return Ok(());
    }
    Err(WeightingError::MisalignedEntities {
        details: format!(
            "cell breakdown covers {} entities, {} periods for the first",
            cells.len(),
            cells.first().map_or(0, Vec::len)
        ),
    })
}

/// Per-period rows of `(entity id, result)`, in entity order.
fn pivot(
    entity_results: &[EntityWeightedDailyResults],
) -> Result<Vec<Vec<(i32, &WeightedDailyResult)>>, WeightingError> {
    let min = entity_results.iter().map(|e| e.results.len()).min().unwrap_or(0);
    let max = entity_results.iter().map(|e| e.results.len()).max().unwrap_or(0);
    if min != max {
        return Err(WeightingError::PeriodCountMismatch { min, max });
    }
    Ok((0..max)
        .map(|period| {
            entity_results
                .iter()
                .map(|entity| {
                    (
                        entity.instance_id().unwrap_or(NO_ENTITY_ID),
                        &entity.results[period],
                    )
                })
                .collect()
        })
        .collect())
}

/// Cap each entity's normalised weight at `sample / minimum_sample` and hand
/// the excess to the entities that can still take it, least up-weightable
/// first. Weights come back normalised, in their original order.
fn trim_weights_for_low_sample(
    period: &mut [Weighted<'_>],
    minimum_sample: u16,
    downweighted: &mut BTreeSet<i32>,
) {
    let total_weight: f64 = period.iter().map(|w| w.weight).sum();
    if total_weight.abs() < WEIGHT_IS_ZERO || minimum_sample == 0 {
        return;
    }

    let mut order: Vec<(usize, f64, f64)> = period
        .iter()
        .enumerate()
        .map(|(index, entity)| {
            let original = entity.weight / total_weight;
            let max_allowed = f64::from(entity.result.unweighted_sample_size) / f64::from(minimum_sample);
            (index, original, max_allowed)
        })
        .collect();
    order.sort_by(|a, b| (a.2 / a.1).total_cmp(&(b.2 / b.1)));

    let mut upweight_factor = 1.0;
    let mut remaining = 1.0;
    for (index, original, max_allowed) in order {
        remaining -= original;
        let mut weight = original * upweight_factor;
        if weight > max_allowed {
            upweight_factor *= 1.0 + (weight - max_allowed) / remaining;
            weight = max_allowed;
            downweighted.insert(period[index].entity_id);
        }
        period[index].weight = weight;
    }
}

/// Mean of the entity results. With a blend `tolerance` (relative sizes)
/// the result comes from the entity x cell grid instead of `Σ r·w / Σ w`.
fn result_mean(
    period: &[Weighted<'_>],
    tolerance: Option<f64>,
) -> Result<WeightedDailyResult, WeightingError> {
    let date = period.first().map_or(NaiveDate::MIN, |w| w.result.date);
    let mut average = WeightedDailyResult::empty(date);
    let mut total_result = 0.0;
    let mut total_weight = 0.0;
    let mut values = Vec::with_capacity(period.len());

    for entity in period
        .iter()
        .filter(|w| w.result.unweighted_sample_size > 0 && w.weight > 0.0)
    {
        average.unweighted_sample_size += entity.result.unweighted_sample_size;
        average.weighted_sample_size += entity.result.weighted_sample_size;
        average
            .response_ids
            .extend_from_slice(&entity.result.response_ids);
        total_result += entity.result.weighted_result * entity.weight;
        total_weight += entity.weight;
        values.push((entity.result.weighted_result, entity.weight));
    }

    average.weighted_result = match tolerance {
        Some(tolerance) => blended_result(period, tolerance)?,
        None => safe_divide(total_result, total_weight),
    };
    average.unweighted_value_total = period.len() as f64;
    (average.standard_deviation, average.variance) =
        weighted_standard_deviation(&values, total_weight, average.weighted_result);
    Ok(average)
}

/// `Σ w[e, c]·v[e, c]` where each counted entity spreads its weight over its
/// cells in proportion to their weighted sample. Entities are keyed by
/// position so unlabelled series stay distinct.
fn blended_result(period: &[Weighted<'_>], tolerance: f64) -> Result<f64, WeightingError> {
    let mut targets = Vec::new();
    let mut sizes = BTreeMap::new();
    let mut values = BTreeMap::new();
    for (index, entity) in period.iter().enumerate() {
        if entity.result.unweighted_sample_size == 0 || entity.weight <= 0.0 {
            continue;
        }
        let key = index as i32;
        sizes.insert(key, entity.weight);
        let cells: BTreeMap<String, f64> = match entity.cells {
            Some(mix) => mix
                .iter()
                .map(|(cell, share)| {
                    values.insert((key, cell.to_string()), share.result);
                    (cell.to_string(), share.weighted_sample)
                })
                .collect(),
            None => {
                values.insert((key, String::new()), entity.result.weighted_result);
                BTreeMap::from([(String::new(), 1.0)])
            }
        };
        targets.push(EntityCellTargets::new(key, cells));
    }
    if targets.is_empty() {
        return Ok(0.0);
    }
    Ok(blend_weights(&targets, &sizes, tolerance)?.blend(&values))
}

fn entity_id_mean(
    period: &[Weighted<'_>],
    mean_map: Option<&EntityMeanMap>,
) -> Result<WeightedDailyResult, WeightingError> {
    let included: Vec<&Weighted<'_>> = period
        .iter()
        .filter(|w| !mean_map.is_some_and(|map| map.is_excluded(w.entity_id)))
        .collect();
    let Some(first) = included.first() else {
        return Err(WeightingError::EmptyResults);
    };

    let mut average = WeightedDailyResult::empty(first.result.date);
    let mut total_result = 0.0;
    let mut values = Vec::with_capacity(included.len());
    for entity in included.iter().filter(|w| w.result.unweighted_sample_size > 0) {
        let multiplier = mean_map
            .filter(|map| !map.mapping.is_empty())
            .and_then(|map| map.get(entity.entity_id))
            .map_or(entity.entity_id, |m| m.mean_calculation_value);
        let multiplier = f64::from(multiplier);
        total_result += multiplier * entity.result.weighted_value_total;
        values.push((multiplier, entity.result.weighted_value_total));
        average
            .response_ids
            .extend_from_slice(&entity.result.response_ids);
    }

    let total_weight: f64 = included.iter().map(|w| w.result.weighted_value_total).sum();
    average.weighted_result = safe_divide(total_result, total_weight);
    average.unweighted_sample_size = first.result.unweighted_sample_size;
    average.weighted_sample_size = first.result.weighted_sample_size;
    average.unweighted_value_total = included.len() as f64;
    (average.standard_deviation, average.variance) =
        weighted_standard_deviation(&values, total_weight, average.weighted_result);
    Ok(average)
}

/// Upper median: the id of the entity holding respondent `ceil(n / 2)` when
/// entities are ordered by id.
fn median_entity_id(period: &[Weighted<'_>]) -> Result<WeightedDailyResult, WeightingError> {
    let first = period.first().ok_or(WeightingError::EmptyResults)?;
    let mut ordered: Vec<&Weighted<'_>> = period.iter().collect();
    ordered.sort_by_key(|w| w.entity_id);

    let weighted_sample_size = period
        .iter()
        .map(|w| w.result.weighted_value_total)
        .sum::<f64>() as u32;
    let median_index = f64::from(weighted_sample_size.div_ceil(2));

    let mut running_total = 0.0;
    let median = ordered
        .iter()
        .find(|w| {
            running_total += w.result.weighted_value_total;
            running_total >= median_index
        })
        .ok_or(WeightingError::MedianUnavailable)?;

    let mut average = WeightedDailyResult::empty(first.result.date);
    average.weighted_result = f64::from(median.entity_id);
    average.unweighted_sample_size = period.iter().map(|w| w.result.unweighted_sample_size).sum();
    average.weighted_sample_size = f64::from(weighted_sample_size);
    Ok(average)
}

#[cfg(test)]
mod tests {
    use metric_core::models::EntityInstance;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    fn entity(id: i32, sample: u32, result: f64) -> EntityWeightedDailyResults {
        let mut r = WeightedDailyResult::empty(date());
        r.unweighted_sample_size = sample;
        r.weighted_sample_size = f64::from(sample);
        r.weighted_result = result;
        EntityWeightedDailyResults::new(Some(EntityInstance::new(id, format!("e{id}"))), vec![r])
    }

    fn size(id: i32, weight: f64) -> EntityWeightedDailyResults {
        let mut e = entity(id, 100, weight);
        e.results[0].weighted_result = weight;
        e
    }

    #[test]
    fn trims_low_sample_entity_and_redistributes() {
        let results = [entity(1, 30, 0.1), entity(2, 100, 0.2), entity(3, 100, 0.3)];
        let sizes = [size(1, 0.5), size(2, 0.3), size(3, 0.2)];
        let average = calculate_market_average(
            &results,
            75,
            AverageType::Mean,
            MainQuestionType::SingleChoice,
            None,
            Some(RelativeSizes::new(&sizes)),
        )
        .unwrap();
        assert!((average.results[0].weighted_result - 0.184).abs() < 1e-12);
        assert_eq!(average.downweighted, BTreeSet::from([1]));
        assert_eq!(average.results[0].unweighted_sample_size, 230);
    }

    #[test]
    fn zero_minimum_skips_trimming() {
        let results = [entity(1, 30, 0.1), entity(2, 100, 0.2), entity(3, 100, 0.3)];
        let sizes = [size(1, 0.5), size(2, 0.3), size(3, 0.2)];
        let average = calculate_market_average(
            &results,
            0,
            AverageType::Mean,
            MainQuestionType::SingleChoice,
            None,
            Some(RelativeSizes::new(&sizes)),
        )
        .unwrap();
        assert!((average.results[0].weighted_result - 0.17).abs() < 1e-12);
        assert!(average.downweighted.is_empty());
    }

    #[test]
    fn misaligned_relative_sizes_rejected() {
        let results = [entity(1, 30, 0.1), entity(2, 100, 0.2)];
        let sizes = [size(2, 0.5), size(1, 0.5)];
        let err = calculate_market_average(
            &results,
            75,
            AverageType::Mean,
            MainQuestionType::SingleChoice,
            None,
            Some(RelativeSizes::new(&sizes)),
        )
        .unwrap_err();
        assert!(matches!(err, WeightingError::MisalignedEntities { .. }));
    }

    #[test]
    fn relative_size_for_other_date_is_missing() {
        let results = [entity(1, 30, 0.1)];
        let mut sizes = [size(1, 0.5)];
        sizes[0].results[0].date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let err = calculate_market_average(
            &results,
            75,
            AverageType::Mean,
            MainQuestionType::SingleChoice,
            None,
            Some(RelativeSizes::new(&sizes)),
        )
        .unwrap_err();
        assert_eq!(err, WeightingError::MissingRelativeSize { date: date() });
    }

    fn mix(cells: &[(&str, f64, f64)]) -> CellMix {
        use crate::blend::CellShare;

        CellMix::new(
            cells
                .iter()
                .map(|(key, weighted_sample, result)| {
                    let share = CellShare {
                        weighted_sample: *weighted_sample,
                        result: *result,
                    };
                    (key.to_string(), share)
                })
                .collect(),
        )
    }

    #[test]
    fn cell_breakdown_feeds_the_blend() {
        let results = [entity(1, 100, 0.875), entity(2, 100, 0.25)];
        let sizes = [size(1, 0.125), size(2, 1.0)];
        let cells = [
            vec![mix(&[("age:1", 1.0, 0.5), ("age:2", 3.0, 1.0)])],
            vec![mix(&[("age:1", 1.0, 1.0), ("age:2", 3.0, 0.0)])],
        ];
        let average = calculate_market_average(
            &results,
            1,
            AverageType::Mean,
            MainQuestionType::SingleChoice,
            None,
            Some(RelativeSizes::new(&sizes).with_cells(&cells)),
        )
        .unwrap();
        assert!((average.results[0].weighted_result - 0.359375 / 1.125).abs() < 1e-12);
    }

    #[test]
    fn counted_entity_without_cell_mass_violates_the_blend() {
        let results = [entity(1, 100, 0.4), entity(2, 100, 0.2)];
        let sizes = [size(1, 0.5), size(2, 0.5)];
        let cells = [
            vec![mix(&[("age:1", 2.0, 0.4)])],
            vec![mix(&[("age:1", 0.0, 0.2)])],
        ];
        let err = calculate_market_average(
            &results,
            1,
            AverageType::Mean,
            MainQuestionType::SingleChoice,
            None,
            Some(RelativeSizes::new(&sizes).with_cells(&cells)),
        )
        .unwrap_err();
        assert!(matches!(err, WeightingError::WeightSumViolation { sum, .. } if (sum - 0.5).abs() < 1e-12));
    }

    #[test]
    fn cell_breakdown_must_cover_every_period() {
        let results = [entity(1, 100, 0.4)];
        let sizes = [size(1, 0.5)];
        let cells = [Vec::new()];
        let err = calculate_market_average(
            &results,
            1,
            AverageType::Mean,
            MainQuestionType::SingleChoice,
            None,
            Some(RelativeSizes::new(&sizes).with_cells(&cells)),
        )
        .unwrap_err();
        assert!(matches!(err, WeightingError::MisalignedEntities { .. }));
    }

    #[test]
    fn differing_period_counts_rejected() {
        let mut longer = entity(2, 100, 0.2);
        longer.results.push(WeightedDailyResult::empty(date()));
        let err = calculate_market_average(
            &[entity(1, 30, 0.1), longer],
            75,
            AverageType::Mean,
            MainQuestionType::SingleChoice,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err, WeightingError::PeriodCountMismatch { min: 1, max: 2 });
    }
}
