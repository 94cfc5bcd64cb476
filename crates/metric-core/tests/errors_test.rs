//! Tests for error conversion and display.

use metric_core::errors::{DataError, EntityError, MeasureError, MetricError};

#[test]
fn test_subsystem_errors_convert_into_metric_error() {
    let err: MetricError = DataError::Cancelled.into();
    assert!(err.is_cancelled());

    let err: MetricError = EntityError::ProfileDimension {
        entity_type: "profile".to_string(),
    }
    .into();
    assert!(!err.is_cancelled());
    assert!(err.to_string().contains("profile"));
}

#[test]
fn test_messages_carry_identifiers() {
    let err = MeasureError::MissingPrimary {
        measure: "Awareness".to_string(),
    };
    assert!(err.to_string().contains("Awareness"));

    let err = EntityError::AverageMappingCycle {
        path: "1 -> 2 -> 1".to_string(),
    };
    assert!(err.to_string().contains("1 -> 2 -> 1"));

    let err = DataError::MissingEntityType {
        field: "consider".to_string(),
        entity_type: "brand".to_string(),
    };
    let message = err.to_string();
    assert!(message.contains("consider") && message.contains("brand"));
}
