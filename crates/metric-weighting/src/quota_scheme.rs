use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use metric_core::models::{QuotaCell, ResponseRecord, SubsetId};

/// One demographic dimension of a quota scheme. Raw profile answers map to
/// category ids; answers with no mapping leave the response unallocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDimension {
    /// Dimension name used in cell keys, e.g. `"age"`.
    pub name: String,
    /// Profile field holding the raw answer.
    pub field: String,
    /// Raw answer -> category id.
    pub categories: BTreeMap<i32, i32>,
}

impl QuotaDimension {
    pub fn new(name: impl Into<String>, field: impl Into<String>, categories: BTreeMap<i32, i32>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            categories,
        }
    }

    fn category_of(&self, response: &ResponseRecord) -> Option<i32> {
        let raw = response.answer(&self.field, &[])?.as_number()?;
        self.categories.get(&raw).copied()
    }
}

/// Interlocked demographic dimensions of one subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCellScheme {
    pub subset: SubsetId,
    pub dimensions: Vec<QuotaDimension>,
}

impl QuotaCellScheme {
    pub fn new(subset: SubsetId, dimensions: Vec<QuotaDimension>) -> Self {
        Self { subset, dimensions }
    }

    /// A scheme with no dimensions puts every response in the unweighted cell.
    pub fn unweighted(subset: SubsetId) -> Self {
        Self::new(subset, Vec::new())
    }

    /// Profile fields the scheme reads.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.field.as_str())
    }

    /// Cell key for a category per dimension, in dimension order.
    pub fn key_for(&self, categories: &[i32]) -> String {
        self.dimensions
            .iter()
            .zip(categories)
            .map(|(dimension, category)| format!("{}:{category}", dimension.name))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Quota cell of a response. Absent or unmapped answers on any
    /// dimension give the unweighted cell.
    pub fn cell_for(&self, response: &ResponseRecord) -> QuotaCell {
        if self.dimensions.is_empty() {
            return QuotaCell::unweighted(self.subset.clone());
        }
        let categories: Option<Vec<i32>> = self
            .dimensions
            .iter()
            .map(|dimension| dimension.category_of(response))
            .collect();
        match categories {
            Some(categories) => QuotaCell::new(self.subset.clone(), self.key_for(&categories)),
            None => QuotaCell::unweighted(self.subset.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use metric_core::models::AnswerValue;

    use super::*;

    fn scheme() -> QuotaCellScheme {
        QuotaCellScheme::new(
            SubsetId::new("UK"),
            vec![
                QuotaDimension::new("age", "Age", BTreeMap::from([(25, 1), (35, 2), (45, 2)])),
                QuotaDimension::new("region", "Region", BTreeMap::from([(1, 1), (2, 1), (3, 2)])),
            ],
        )
    }

    fn response(age: Option<i32>, region: Option<i32>) -> ResponseRecord {
        let mut record = ResponseRecord::new(1, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        if let Some(age) = age {
            record.set_answer("Age", &[], AnswerValue::Number(age));
        }
        if let Some(region) = region {
            record.set_answer("Region", &[], AnswerValue::Number(region));
        }
        record
    }

    #[test]
    fn allocates_interlocked_key() {
        assert_eq!(scheme().cell_for(&response(Some(35), Some(3))).key, "age:2|region:2");
        assert_eq!(scheme().cell_for(&response(Some(25), Some(2))).key, "age:1|region:1");
    }

    #[test]
    fn unmapped_or_absent_is_unweighted() {
        assert!(scheme().cell_for(&response(Some(99), Some(1))).is_unweighted());
        assert!(scheme().cell_for(&response(Some(35), None)).is_unweighted());
        assert!(QuotaCellScheme::unweighted(SubsetId::new("UK"))
            .cell_for(&response(Some(35), Some(1)))
            .is_unweighted());
    }
}
