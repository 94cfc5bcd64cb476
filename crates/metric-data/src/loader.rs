use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use metric_core::config::LoaderConfig;
use metric_core::errors::{DataError, DataResult};
use metric_core::models::{
    DataTarget, DateRange, EntityIds, ResponseFieldDescriptor, ResponseRecord, SubsetId,
};
use metric_core::traits::{AnswerSource, Cancellable, CancellationToken, DataLimiter, FetchRequest};
use metric_entity::SharedRegistry;

use crate::grouping::{group_fields, FieldGroup};
use crate::in_flight::InFlightTable;
use crate::limiter::FixedDataLimiter;
use crate::prefetch::expand_adjacent;
use crate::range_cache::{LoadedKey, LoadedRangeCache};
use crate::store::ResponseStore;

const ALL_DATES: DateRange = DateRange {
    start: NaiveDate::MIN,
    end: NaiveDate::MAX,
};

/// Loads answers on demand, fetching only what is not already loaded.
pub struct LazyDataLoader {
    source: Arc<dyn AnswerSource>,
    registry: Arc<SharedRegistry>,
    limiter: Arc<dyn DataLimiter>,
    config: LoaderConfig,
    in_flight: InFlightTable,
    loaded: LoadedRangeCache,
    stores: DashMap<SubsetId, Arc<ResponseStore>>,
    permits: Semaphore,
}

impl std::fmt::Debug for LazyDataLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyDataLoader")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight.len())
            .field("subsets", &self.stores.len())
            .finish()
    }
}

impl LazyDataLoader {
    pub fn new(
        source: Arc<dyn AnswerSource>,
        registry: Arc<SharedRegistry>,
        limiter: Arc<dyn DataLimiter>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            source,
            registry,
            limiter,
            in_flight: InFlightTable::new(),
            loaded: LoadedRangeCache::new(config.loaded_range_cache_capacity),
            stores: DashMap::new(),
            permits: Semaphore::new(config.max_concurrent_loads),
            config,
        }
    }

    /// A loader capped by `config.latest_date_to_request`.
    pub fn with_config_limit(
        source: Arc<dyn AnswerSource>,
        registry: Arc<SharedRegistry>,
        config: LoaderConfig,
    ) -> Self {
        let limiter = Arc::new(FixedDataLimiter::new(config.latest_date_to_request));
        Self::new(source, registry, limiter, config)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn in_flight(&self) -> &InFlightTable {
        &self.in_flight
    }

    pub fn loaded_ranges(&self) -> &LoadedRangeCache {
        &self.loaded
    }

    /// The response store of `subset`, created empty on first use.
    pub fn store(&self, subset: &SubsetId) -> Arc<ResponseStore> {
        Arc::clone(self.stores.entry(subset.clone()).or_default().value())
    }

    pub async fn dataset_start(&self, subset: &SubsetId) -> DataResult<Option<NaiveDate>> {
        self.source.dataset_start(subset).await
    }

    /// Answers to `fields` for every combination of `targets` within
    /// `range` (every date when `None`), as merged response records.
    ///
    /// Every entity type a field is keyed by must have a target. Fields
    /// sharing an entity-type key are fetched together; (field, instance)
    /// pairs whose range is already loaded are not fetched again.
    #[instrument(skip(self, fields, targets, token), fields(fields = fields.len()))]
    pub async fn get_data_for_fields(
        &self,
        subset: &SubsetId,
        fields: &[ResponseFieldDescriptor],
        range: Option<DateRange>,
        targets: &[DataTarget],
        token: &CancellationToken,
    ) -> DataResult<Vec<Arc<ResponseRecord>>> {
        if token.is_cancelled() {
            return Err(DataError::Cancelled);
        }
        if let Some(range) = range {
            if range.start > range.end {
                return Err(DataError::InvalidDateRange {
                    start: range.start,
                    end: range.end,
                });
            }
        }

        let groups = group_fields(fields, self.config.field_chunk_size);
        let mut plans = Vec::with_capacity(groups.len());
        for group in &groups {
            let group_targets = targets_for(group, targets)?;
            let size = group_targets
                .iter()
                .fold(1usize, |size, t| size.saturating_mul(t.instance_ids.len()));
            if size > self.config.max_cartesian_product {
                return Err(DataError::CartesianProductTooLarge {
                    size,
                    max: self.config.max_cartesian_product,
                });
            }
            plans.push((group, group_targets));
        }

        let _permit = self.permits.try_acquire().map_err(|_| DataError::TooBusy {
            max_concurrent: self.config.max_concurrent_loads,
        })?;

        let store = self.store(subset);
        let Some(requested) = self.effective_range(subset, range) else {
            debug!(%subset, "requested range lies entirely after the data limit");
            return Ok(Vec::new());
        };
        for (group, group_targets) in plans {
            self.load_group(subset, group, &group_targets, requested, &store, token)
                .await?;
        }
        Ok(store.records(&requested, fields))
    }

    /// Every response in `subset` answering one of `fields`, with its
    /// profile answers loaded. Used when no date bound is known.
    pub async fn get_responses(
        &self,
        subset: &SubsetId,
        fields: &[ResponseFieldDescriptor],
        token: &CancellationToken,
    ) -> DataResult<Vec<Arc<ResponseRecord>>> {
        if token.is_cancelled() {
            return Err(DataError::Cancelled);
        }
        let headers = self.source.load_responses(subset, fields).await?;
        let profile_fields: Vec<ResponseFieldDescriptor> =
            fields.iter().filter(|f| f.is_profile()).cloned().collect();
        if !profile_fields.is_empty() {
            self.get_data_for_fields(subset, &profile_fields, None, &[], token)
                .await?;
        }

        let latest = self.limiter.latest_date_to_request(subset);
        let store = self.store(subset);
        Ok(headers
            .into_iter()
            .filter(|header| latest.map_or(true, |latest| header.date <= latest))
            .map(|header| {
                store
                    .get(header.id)
                    .unwrap_or_else(|| Arc::new(ResponseRecord::new(header.id, header.date)))
            })
            .collect())
    }

    fn effective_range(&self, subset: &SubsetId, range: Option<DateRange>) -> Option<DateRange> {
        let mut effective = range.unwrap_or(ALL_DATES);
        if let Some(latest) = self.limiter.latest_date_to_request(subset) {
            effective.end = effective.end.min(latest);
        }
        (effective.start <= effective.end).then_some(effective)
    }

    async fn load_group(
        &self,
        subset: &SubsetId,
        group: &FieldGroup,
        targets: &[DataTarget],
        range: DateRange,
        store: &ResponseStore,
        token: &CancellationToken,
    ) -> DataResult<()> {
        let entity_key = group.entity_key();
        let missing: Vec<EntityIds> = id_combinations(targets)
            .into_iter()
            .filter(|ids| {
                group.fields.iter().any(|field| {
                    let key = LoadedKey::new(subset, &field.name, &entity_key, ids.clone());
                    !self.loaded.covers(&key, &range)
                })
            })
            .collect();
        if missing.is_empty() {
            debug!(%subset, entity_key, fields = group.fields.len(), "answers already loaded");
            return Ok(());
        }

        let narrowed: Vec<DataTarget> = group
            .entity_types
            .iter()
            .enumerate()
            .map(|(position, entity_type)| {
                DataTarget::new(entity_type.clone(), missing.iter().map(|ids| ids[position]))
            })
            .collect();
        let fetch_targets = if group.is_profile() {
            narrowed
        } else {
            let registry = self.registry.current();
            expand_adjacent(
                &narrowed,
                &registry.instances,
                subset,
                self.config.adjacent_prefetch_batch,
                &self.config.prefetch_excluded_entity_types,
            )
        };

        let request = FetchRequest {
            subset: subset.clone(),
            fields: group.fields.clone(),
            entity_types: group.entity_types.clone(),
            targets: fetch_targets.clone(),
            range: (range != ALL_DATES).then_some(range),
        };
        let rows = self
            .in_flight
            .fetch(Arc::clone(&self.source), request, token)
            .await?;
        store.merge(&rows);

        for ids in id_combinations(&fetch_targets) {
            for field in &group.fields {
                self.loaded
                    .record(LoadedKey::new(subset, &field.name, &entity_key, ids.clone()), range);
            }
        }
        Ok(())
    }
}

/// Targets for the group's entity types, in key order. Targets repeated
/// for one type are unioned.
fn targets_for(group: &FieldGroup, targets: &[DataTarget]) -> DataResult<Vec<DataTarget>> {
    group
        .entity_types
        .iter()
        .map(|entity_type| {
            let mut matching = targets.iter().filter(|t| t.entity_type == *entity_type).peekable();
            if matching.peek().is_none() {
                let field = group
                    .fields
                    .first()
                    .map(|f| f.name.clone())
                    .unwrap_or_default();
                return Err(DataError::MissingEntityType {
                    field,
                    entity_type: entity_type.clone(),
                });
            }
            Ok(DataTarget::new(
                entity_type.clone(),
                matching.flat_map(|t| t.instance_ids.iter().copied()),
            ))
        })
        .collect()
}

/// Cartesian product of the targets' ids, one position per target.
fn id_combinations(targets: &[DataTarget]) -> Vec<EntityIds> {
    targets.iter().fold(vec![EntityIds::new()], |combinations, target| {
        combinations
            .iter()
            .flat_map(|prefix| {
                target.instance_ids.iter().map(move |id| {
                    let mut next = prefix.clone();
                    next.push(*id);
                    next
                })
            })
            .collect()
    })
}
