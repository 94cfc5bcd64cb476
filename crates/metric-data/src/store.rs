use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use metric_core::models::{AnswerRow, DateRange, ResponseFieldDescriptor, ResponseId, ResponseRecord};

/// Every answer loaded so far for one subset, merged per response.
///
/// Records are shared copy-on-write: readers holding an `Arc` from an
/// earlier call keep seeing the answers they were given.
#[derive(Debug, Default)]
pub struct ResponseStore {
    records: RwLock<BTreeMap<ResponseId, Arc<ResponseRecord>>>,
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&self, rows: &[AnswerRow]) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        for row in rows {
            let record = records
                .entry(row.response_id)
                .or_insert_with(|| Arc::new(ResponseRecord::new(row.response_id, row.date)));
            Arc::make_mut(record).set_answer(&row.field, &row.entity_ids, row.value.clone());
        }
    }

    /// Records dated within `range` that answered at least one of `fields`,
    /// ordered by date then id.
    pub fn records(&self, range: &DateRange, fields: &[ResponseFieldDescriptor]) -> Vec<Arc<ResponseRecord>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut selected: Vec<Arc<ResponseRecord>> = records
            .values()
            .filter(|record| range.contains(record.date))
            .filter(|record| fields.iter().any(|field| record.has_field(&field.name)))
            .cloned()
            .collect();
        selected.sort_by_key(|record| (record.date, record.id));
        selected
    }

    pub fn get(&self, id: ResponseId) -> Option<Arc<ResponseRecord>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
