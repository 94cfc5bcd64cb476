//! Tests for metric, expression and composite filters.

use std::sync::Arc;

use chrono::NaiveDate;

use metric_core::errors::FilterError;
use metric_core::models::{
    AnswerValue, CalculationType, DataTarget, EntityValue, EntityValueCombination,
    MeasureDefinition, ResponseFieldDescriptor, ResponseRecord, SubsetId, ValueSet,
};
use metric_entity::ResponseFieldManager;
use metric_filter::{AndFilter, ExpressionFilter, Filter, MetricFilter};
use metric_measure::Measure;

fn subset() -> SubsetId {
    SubsetId::new("All")
}

fn registry() -> ResponseFieldManager {
    let brand = || vec!["brand".to_string()];
    let mut fields = ResponseFieldManager::new();
    for field in [
        ResponseFieldDescriptor::new("Positive_buzz", brand()),
        ResponseFieldDescriptor::new("Advertising_awareness", brand()),
        ResponseFieldDescriptor::new("Shopper_segment", brand()),
        ResponseFieldDescriptor::new("CarouselAsked", vec!["content".to_string()]),
        ResponseFieldDescriptor::new(
            "Carousel",
            vec!["content".to_string(), "option".to_string()],
        ),
        ResponseFieldDescriptor::profile("Age"),
    ] {
        fields.add(field).unwrap();
    }
    fields
}

fn respondent() -> ResponseRecord {
    let number = AnswerValue::Number;
    ResponseRecord::new(123, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .with_answer("Shopper_segment", &[1], number(1))
        .with_answer("Positive_buzz", &[1], number(1))
        .with_answer("Advertising_awareness", &[1], number(0))
        .with_answer("Shopper_segment", &[2], number(1))
        .with_answer("Positive_buzz", &[2], number(0))
        .with_answer("Advertising_awareness", &[2], number(1))
        .with_answer("Shopper_segment", &[3], number(1))
        .with_answer("CarouselAsked", &[3], number(3))
        .with_answer("Carousel", &[3, 4], number(4))
        .with_answer("Age", &[], number(35))
}

fn brand_measure(name: &str, field: &str) -> Arc<Measure> {
    let mut definition = MeasureDefinition::new(name, CalculationType::YesNo);
    definition.field = Some(field.to_string());
    definition.primary_true_values = Some(ValueSet::Values(vec![1]));
    definition.base_field = Some("Shopper_segment".to_string());
    definition.base_values = Some(ValueSet::Values(vec![1, 2, 3, 4, 5]));
    Arc::new(Measure::try_from(definition).unwrap())
}

fn age_measure() -> Arc<Measure> {
    let mut definition = MeasureDefinition::new("Age", CalculationType::Average);
    definition.field = Some("Age".to_string());
    definition.primary_true_values = Some(ValueSet::Range { min: 16, max: 74 });
    Arc::new(Measure::try_from(definition).unwrap())
}

fn combination(values: &[(&str, i32)]) -> EntityValueCombination {
    EntityValueCombination::try_from_values(
        values.iter().map(|(t, id)| EntityValue::new(*t, *id)),
    )
    .unwrap()
}

fn brand_filter(measure: Arc<Measure>, brand: i32) -> MetricFilter {
    MetricFilter::new(
        measure,
        &registry(),
        &subset(),
        combination(&[("brand", brand)]),
        ValueSet::Values(vec![1]),
    )
    .unwrap()
}

fn includes(filter: &dyn Filter, result_brand: i32) -> bool {
    filter.bind(&combination(&[("brand", result_brand)]))(&respondent())
}

#[test]
fn test_includes_response_matching_other_brand() {
    let filter = brand_filter(brand_measure("Positive Buzz", "Positive_buzz"), 1);
    assert!(includes(&filter, 2));
}

#[test]
fn test_excludes_response_not_matching() {
    let filter = brand_filter(brand_measure("Advertising Awareness", "Advertising_awareness"), 1);
    assert!(!includes(&filter, 2));
}

#[test]
fn test_inverted_filter() {
    let aware = brand_filter(brand_measure("Advertising Awareness", "Advertising_awareness"), 1);
    assert!(includes(&aware.inverted(), 2));

    let buzz = brand_filter(brand_measure("Positive Buzz", "Positive_buzz"), 1);
    assert!(!includes(&buzz.inverted(), 2));
}

#[test]
fn test_inverted_filter_includes_unanswered_but_not_out_of_base() {
    let measure = brand_measure("Positive Buzz", "Positive_buzz");
    // Brand 3 is in base with no buzz answer.
    assert!(includes(&brand_filter(measure.clone(), 3).inverted(), 1));
    // Brand 4 has no shopper segment, so the response is out of base.
    assert!(!includes(&brand_filter(measure, 4).inverted(), 1));
}

#[test]
fn test_multi_entity_filter() {
    let mut definition = MeasureDefinition::new("Carousel", CalculationType::YesNo);
    definition.field = Some("Carousel".to_string());
    definition.primary_true_values = Some(ValueSet::Range { min: 1, max: 999 });
    definition.base_field = Some("CarouselAsked".to_string());
    definition.base_values = Some(ValueSet::Range { min: 1, max: 999 });
    let measure = Arc::new(Measure::try_from(definition).unwrap());
    let everything = ValueSet::Range {
        min: i32::MIN,
        max: i32::MAX,
    };

    let answered = MetricFilter::new(
        measure.clone(),
        &registry(),
        &subset(),
        combination(&[("content", 3), ("option", 4)]),
        ValueSet::Values(vec![4]),
    )
    .unwrap();
    assert!(includes(&answered, 2));

    let defined = MetricFilter::new(
        measure.clone(),
        &registry(),
        &subset(),
        combination(&[("content", 3), ("option", 4)]),
        everything.clone(),
    )
    .unwrap();
    assert!(defined.bind(&EntityValueCombination::empty())(&respondent()));

    let undefined = MetricFilter::new(
        measure,
        &registry(),
        &subset(),
        combination(&[("content", 4), ("option", 5)]),
        everything,
    )
    .unwrap();
    assert!(!undefined.bind(&EntityValueCombination::empty())(&respondent()));
}

#[test]
fn test_profile_filters() {
    let registry = registry();
    let range = MetricFilter::new(
        age_measure(),
        &registry,
        &subset(),
        EntityValueCombination::empty(),
        ValueSet::Range { min: 40, max: 60 },
    )
    .unwrap();
    assert!(!includes(&range, 1));

    let millennials = MetricFilter::new(
        age_measure(),
        &registry,
        &subset(),
        EntityValueCombination::empty(),
        ValueSet::Values((25..=39).collect()),
    )
    .unwrap();
    assert!(includes(&millennials, 1));
}

#[test]
fn test_filter_on_expression_measure() {
    let mut definition = MeasureDefinition::new("Age Band", CalculationType::YesNo);
    definition.primary_variable = Some(
        "(((18 <= Age and Age <= 30) or Age in []) and result.ageband == 1 and 1) \
         or (((31 <= Age and Age <= 60) or Age in []) and result.ageband == 2 and 2)"
            .to_string(),
    );
    definition.base_expression = Some("Age != None".to_string());
    let measure = Arc::new(Measure::try_from(definition).unwrap());
    let band = |id: i32| {
        MetricFilter::new(
            measure.clone(),
            &registry(),
            &subset(),
            combination(&[("ageband", id)]),
            ValueSet::Values(vec![id]),
        )
        .unwrap()
    };

    assert!(!includes(&band(1), 1));
    assert!(includes(&band(2), 1));
}

#[test]
fn test_unrelated_entity_type_is_rejected() {
    let err = MetricFilter::new(
        age_measure(),
        &registry(),
        &subset(),
        combination(&[("brand", 1)]),
        ValueSet::Values(vec![1]),
    )
    .unwrap_err();
    assert_eq!(
        err,
        FilterError::UnrelatedEntityType {
            field: "Age".to_string(),
            entity_type: "brand".to_string()
        }
    );
}

#[test]
fn test_expression_filter() {
    let registry = registry();
    let filter = ExpressionFilter::new("Age >= 30 and Positive_buzz", &registry, &subset()).unwrap();
    assert!(includes(&filter, 1));
    assert!(!includes(&filter, 2));

    let blank = ExpressionFilter::new("   ", &registry, &subset()).unwrap();
    assert!(blank.expression().is_none());
    assert!(includes(&blank, 7));

    assert!(matches!(
        ExpressionFilter::new("Nowhere > 1", &registry, &subset()),
        Err(FilterError::UnknownField { .. })
    ));
    assert!(matches!(
        ExpressionFilter::new("len(response.Age(brand=1)) > 0", &registry, &subset()),
        Err(FilterError::UnrelatedEntityType { .. })
    ));
    assert!(matches!(
        ExpressionFilter::new("Age >", &registry, &subset()),
        Err(FilterError::Expression(_))
    ));
}

#[test]
fn test_dependencies_merge_per_entity_type() {
    let registry = registry();
    let products_a = ExpressionFilter::new(
        "any(response.Positive_buzz(brand=[5, 6]))",
        &registry,
        &subset(),
    )
    .unwrap();
    let products_b = ExpressionFilter::new(
        "any(response.Advertising_awareness(brand=[5, 10])) and Age > 18",
        &registry,
        &subset(),
    )
    .unwrap();
    let buzz = MetricFilter::new(
        brand_measure("Positive Buzz", "Positive_buzz"),
        &registry,
        &subset(),
        combination(&[("brand", 2)]),
        ValueSet::Values(vec![1]),
    )
    .unwrap();
    let and = AndFilter::new(vec![
        Arc::new(products_a),
        Arc::new(products_b),
        Arc::new(buzz),
    ]);

    let dependencies =
        and.field_dependencies_and_data_targets(&[DataTarget::new("content", [3])]);
    assert_eq!(
        dependencies.targets,
        vec![
            DataTarget::new("brand", [2, 5, 6, 10]),
            DataTarget::new("content", [3]),
        ]
    );
    assert_eq!(
        dependencies.fields.into_iter().collect::<Vec<_>>(),
        vec![
            "Advertising_awareness",
            "Age",
            "Positive_buzz",
            "Shopper_segment"
        ]
    );
}
