use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How per-response values reduce into a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationType {
    YesNo,
    Average,
    NetPromoterScore,
    Text,
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::YesNo => "YesNo",
            Self::Average => "Average",
            Self::NetPromoterScore => "NetPromoterScore",
            Self::Text => "Text",
        };
        f.write_str(name)
    }
}

/// How a secondary field combines with the primary signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldOperation {
    Plus,
    Minus,
    Or,
    Filter,
}

/// A set of accepted raw values: an explicit list or an inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSet {
    Values(Vec<i32>),
    Range { min: i32, max: i32 },
}

impl ValueSet {
    pub fn contains(&self, value: f64) -> bool {
        match self {
            Self::Values(values) => values.iter().any(|v| f64::from(*v) == value),
            Self::Range { min, max } => f64::from(*min) <= value && value <= f64::from(*max),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Values(values) => values.is_empty(),
            Self::Range { min, max } => min > max,
        }
    }
}

/// Declarative measure configuration, as stored. Validated into a
/// `metric_measure::Measure` before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureDefinition {
    pub name: String,
    pub calculation_type: CalculationType,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub primary_variable: Option<String>,
    #[serde(default)]
    pub primary_true_values: Option<ValueSet>,
    #[serde(default)]
    pub field2: Option<String>,
    #[serde(default)]
    pub field_operation: Option<FieldOperation>,
    #[serde(default)]
    pub secondary_true_values: Option<ValueSet>,
    #[serde(default)]
    pub base_field: Option<String>,
    #[serde(default)]
    pub base_values: Option<ValueSet>,
    #[serde(default)]
    pub base_expression: Option<String>,
    /// Earliest date results may be reported from.
    #[serde(default)]
    pub min_date: Option<NaiveDate>,
}

impl MeasureDefinition {
    pub fn new(name: impl Into<String>, calculation_type: CalculationType) -> Self {
        Self {
            name: name.into(),
            calculation_type,
            field: None,
            primary_variable: None,
            primary_true_values: None,
            field2: None,
            field_operation: None,
            secondary_true_values: None,
            base_field: None,
            base_values: None,
            base_expression: None,
            min_date: None,
        }
    }
}
