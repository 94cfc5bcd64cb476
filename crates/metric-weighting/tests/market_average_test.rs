//! Golden market-average cases plus the relative-size blend invariant.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use serde::Deserialize;

use metric_core::errors::WeightingError;
use metric_core::models::{AverageType, EntityMeanMap, EntityWeightedDailyResults, MainQuestionType};
use metric_weighting::{blend_weights, calculate_market_average, EntityCellTargets, RelativeSizes};

#[derive(Debug, Deserialize)]
struct GoldenFile {
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    average_type: AverageType,
    minimum_sample: u16,
    entities: Vec<EntityWeightedDailyResults>,
    #[serde(default)]
    relative_sizes: Option<Vec<EntityWeightedDailyResults>>,
    #[serde(default)]
    mean_map: Option<EntityMeanMap>,
    #[serde(default)]
    downweighted: Option<Vec<i32>>,
    expected: Vec<Expected>,
}

#[derive(Debug, Deserialize)]
struct Expected {
    period: usize,
    weighted_result: f64,
    unweighted_sample_size: Option<u32>,
    weighted_sample_size: Option<f64>,
    unweighted_value_total: Option<f64>,
    standard_deviation: Option<f64>,
}

#[test]
fn golden_market_average_cases() {
    let golden: GoldenFile = test_fixtures::load_fixture("golden/market_average.json");
    for case in &golden.cases {
        let average = calculate_market_average(
            &case.entities,
            case.minimum_sample,
            case.average_type,
            MainQuestionType::SingleChoice,
            case.mean_map.as_ref(),
            case.relative_sizes.as_deref().map(RelativeSizes::new),
        )
        .unwrap_or_else(|e| panic!("{}: {e}", case.name));

        assert_eq!(
            average.results.len(),
            case.entities[0].results.len(),
            "{}: period count",
            case.name
        );
        if let Some(downweighted) = &case.downweighted {
            let expected: BTreeSet<i32> = downweighted.iter().copied().collect();
            assert_eq!(average.downweighted, expected, "{}: downweighted", case.name);
        }

        for expected in &case.expected {
            let actual = &average.results[expected.period];
            let context = format!("{} period {}", case.name, expected.period);
            assert!(
                (actual.weighted_result - expected.weighted_result).abs() < 1e-9,
                "{context}: result {} != {}",
                actual.weighted_result,
                expected.weighted_result
            );
            if let Some(sample) = expected.unweighted_sample_size {
                assert_eq!(actual.unweighted_sample_size, sample, "{context}: sample");
            }
            if let Some(weighted) = expected.weighted_sample_size {
                assert!((actual.weighted_sample_size - weighted).abs() < 1e-9, "{context}: weighted sample");
            }
            if let Some(total) = expected.unweighted_value_total {
                assert_eq!(actual.unweighted_value_total, total, "{context}: value total");
            }
            if let Some(sd) = expected.standard_deviation {
                let actual_sd = actual
                    .standard_deviation
                    .unwrap_or_else(|| panic!("{context}: missing standard deviation"));
                assert!((actual_sd - sd).abs() < 1e-6, "{context}: sd {actual_sd} != {sd}");
            }
        }
    }
}

#[test]
fn single_entity_has_no_standard_deviation() {
    let golden: GoldenFile = test_fixtures::load_fixture("golden/market_average.json");
    let first_brand = &golden.cases[0].entities[..1];
    let average = calculate_market_average(
        first_brand,
        75,
        AverageType::Mean,
        MainQuestionType::Value,
        None,
        None,
    )
    .unwrap();
    assert!(average.results.iter().all(|r| r.standard_deviation.is_none()));
    assert!((average.results[0].weighted_result - 0.0280491523).abs() < 1e-12);
}

#[test]
fn entity_id_mean_with_every_entity_excluded_fails() {
    let golden: GoldenFile = test_fixtures::load_fixture("golden/market_average.json");
    let case = golden
        .cases
        .iter()
        .find(|c| c.name == "entity_id_mean_weighted")
        .unwrap();
    let map: EntityMeanMap = serde_json::from_value(serde_json::json!({
        "entity_type": "brand",
        "mapping": [
            { "entity_id": 1, "mean_calculation_value": 1, "include_in_calculation": false },
            { "entity_id": 2, "mean_calculation_value": 1, "include_in_calculation": false },
            { "entity_id": 3, "mean_calculation_value": 1, "include_in_calculation": false }
        ]
    }))
    .unwrap();
    let err = calculate_market_average(
        &case.entities,
        75,
        AverageType::EntityIdMean,
        MainQuestionType::SingleChoice,
        Some(&map),
        None,
    )
    .unwrap_err();
    assert_eq!(err, WeightingError::EmptyResults);
}

#[test]
fn blend_rejects_entity_without_cell_mass() {
    let entities = [
        EntityCellTargets::new(1, BTreeMap::from([("a".to_string(), 0.5)])),
        EntityCellTargets::new(2, BTreeMap::from([("a".to_string(), 0.0)])),
    ];
    let sizes = BTreeMap::from([(1, 1.0), (2, 1.0)]);
    let err = blend_weights(&entities, &sizes, 1e-9).unwrap_err();
    assert!(matches!(err, WeightingError::WeightSumViolation { sum, .. } if (sum - 0.5).abs() < 1e-12));
}

#[test]
fn blend_applies_weights_to_cell_values() {
    let entities = [
        EntityCellTargets::new(
            1,
            BTreeMap::from([("young".to_string(), 0.25), ("old".to_string(), 0.75)]),
        ),
        EntityCellTargets::new(2, BTreeMap::from([("young".to_string(), 2.0)])),
    ];
    let sizes = BTreeMap::from([(1, 3.0), (2, 1.0)]);
    let blend = blend_weights(&entities, &sizes, 1e-9).unwrap();
    assert!((blend.get(1, "young") - 0.1875).abs() < 1e-12);
    assert!((blend.get(1, "old") - 0.5625).abs() < 1e-12);
    assert!((blend.get(2, "young") - 0.25).abs() < 1e-12);

    let values = BTreeMap::from([
        ((1, "young".to_string()), 0.4),
        ((1, "old".to_string()), 0.8),
        ((2, "young".to_string()), 0.2),
    ]);
    assert!((blend.blend(&values) - (0.075 + 0.45 + 0.05)).abs() < 1e-12);
}

fn entity_grid() -> impl Strategy<Value = (Vec<EntityCellTargets>, BTreeMap<i32, f64>)> {
    prop::collection::vec(
        (
            prop::collection::btree_map(0u8..12, 0.01f64..50.0, 1..8),
            0.01f64..1000.0,
        ),
        1..12,
    )
    .prop_map(|entities| {
        let mut sizes = BTreeMap::new();
        let targets = entities
            .into_iter()
            .enumerate()
            .map(|(index, (cells, size))| {
                let id = index as i32 + 1;
                sizes.insert(id, size);
                let cells = cells
                    .into_iter()
                    .map(|(cell, target)| (format!("cell:{cell}"), target))
                    .collect();
                EntityCellTargets::new(id, cells)
            })
            .collect();
        (targets, sizes)
    })
}

proptest! {
    #[test]
    fn blend_weights_sum_to_one((entities, sizes) in entity_grid()) {
        let blend = blend_weights(&entities, &sizes, 1e-9).unwrap();
        prop_assert!((blend.sum() - 1.0).abs() <= 1e-9);
        prop_assert!(blend.iter().all(|(_, _, w)| w >= 0.0));
    }

    #[test]
    fn trimmed_blend_stays_convex(
        samples in prop::collection::vec(1u32..400, 2..8),
        sizes in prop::collection::vec(0.01f64..10.0, 8),
    ) {
        use test_fixtures::builders::{daily_result, day, entity_results};

        let date = day(2024, 1, 31);
        let results: Vec<_> = samples
            .iter()
            .enumerate()
            .map(|(i, s)| entity_results(i as i32 + 1, vec![daily_result(date).sample(*s).result(1.0).build()]))
            .collect();
        let relative: Vec<_> = samples
            .iter()
            .enumerate()
            .map(|(i, _)| entity_results(i as i32 + 1, vec![daily_result(date).sample(100).result(sizes[i]).build()]))
            .collect();
        let average = calculate_market_average(
            &results,
            75,
            AverageType::Mean,
            MainQuestionType::SingleChoice,
            None,
            Some(RelativeSizes::new(&relative)),
        )
        .unwrap();
        // Every entity reports 1.0, so any convex blend of them is 1.0.
        prop_assert!((average.results[0].weighted_result - 1.0).abs() < 1e-9);
        prop_assert_eq!(average.results[0].unweighted_sample_size, samples.iter().sum::<u32>());
    }
}
