//! In-memory `AnswerSource` with call counting and an optional gate, for
//! exercising fetch coalescing and cancellation.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Semaphore;

use metric_core::errors::{DataError, DataResult};
use metric_core::models::{AnswerRow, ResponseFieldDescriptor, ResponseHeader, SubsetId};
use metric_core::traits::{AnswerSource, CancellationToken, FetchRequest};

#[derive(Debug, Default)]
pub struct InMemoryAnswerSource {
    rows: HashMap<SubsetId, Vec<AnswerRow>>,
    load_calls: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    failure: Option<String>,
}

impl InMemoryAnswerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, subset: SubsetId, rows: Vec<AnswerRow>) -> Self {
        self.rows.entry(subset).or_default().extend(rows);
        self
    }

    /// Every `load_answers` call sleeps this long first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every `load_answers` call waits for a permit on `gate` first.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Every `load_answers` call fails with `DataError::Source`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, request: &FetchRequest) {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
    }

    async fn wait_turn(&self, token: &CancellationToken) -> DataResult<()> {
        let wait = async {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
        };
        tokio::select! {
            _ = token.cancelled() => Err(DataError::Cancelled),
            _ = wait => Ok(()),
        }
    }

    fn matches(request: &FetchRequest, row: &AnswerRow) -> bool {
        if !request.fields.iter().any(|f| f.name == row.field) {
            return false;
        }
        if request.range.is_some_and(|range| !range.contains(row.date)) {
            return false;
        }
        request
            .entity_types
            .iter()
            .zip(row.entity_ids.iter())
            .all(|(entity_type, id)| {
                request
                    .target_for(entity_type)
                    .map_or(true, |target| target.instance_ids.contains(id))
            })
    }
}

#[async_trait]
impl AnswerSource for InMemoryAnswerSource {
    async fn load_answers(
        &self,
        request: &FetchRequest,
        token: &CancellationToken,
    ) -> DataResult<Vec<AnswerRow>> {
        self.record(request);
        self.wait_turn(token).await?;
        if let Some(reason) = &self.failure {
            return Err(DataError::Source {
                reason: reason.clone(),
            });
        }
        Ok(self
            .rows
            .get(&request.subset)
            .into_iter()
            .flatten()
            .filter(|row| Self::matches(request, row))
            .cloned()
            .collect())
    }

    async fn load_responses(
        &self,
        subset: &SubsetId,
        fields: &[ResponseFieldDescriptor],
    ) -> DataResult<Vec<ResponseHeader>> {
        let headers: BTreeSet<(i64, NaiveDate)> = self
            .rows
            .get(subset)
            .into_iter()
            .flatten()
            .filter(|row| fields.iter().any(|f| f.name == row.field))
            .map(|row| (row.response_id, row.date))
            .collect();
        Ok(headers
            .into_iter()
            .map(|(id, date)| ResponseHeader { id, date })
            .collect())
    }

    async fn dataset_start(&self, subset: &SubsetId) -> DataResult<Option<NaiveDate>> {
        Ok(self
            .rows
            .get(subset)
            .and_then(|rows| rows.iter().map(|row| row.date).min()))
    }
}
