//! Lazy loading against an in-memory answer source: coalescing,
//! cancellation, caching, prefetch and limits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use metric_core::config::LoaderConfig;
use metric_core::errors::DataError;
use metric_core::models::{AnswerRow, DataTarget, DateRange, ResponseFieldDescriptor, SubsetId};
use metric_core::traits::{Cancellable, CancellationToken};
use metric_data::LazyDataLoader;
use metric_entity::{
    EntityInstanceRepository, EntityTypeRepository, RegistrySnapshot, ResponseFieldManager,
    SharedRegistry,
};
use test_fixtures::builders::{answer, brand_field, day, instance, profile_field};
use test_fixtures::InMemoryAnswerSource;

fn uk() -> SubsetId {
    SubsetId::new("uk")
}

fn january() -> DateRange {
    DateRange::new(day(2024, 1, 1), day(2024, 1, 31))
}

fn brand_targets() -> Vec<DataTarget> {
    vec![DataTarget::new("brand", [1, 2])]
}

fn rows() -> Vec<AnswerRow> {
    vec![
        answer(1, day(2024, 1, 3), "aware", &[1], 1),
        answer(1, day(2024, 1, 3), "aware", &[2], 0),
        answer(2, day(2024, 1, 20), "aware", &[1], 0),
        answer(3, day(2024, 2, 2), "aware", &[1], 1),
        answer(1, day(2024, 1, 3), "age", &[], 2),
        answer(2, day(2024, 1, 20), "age", &[], 4),
        answer(4, day(2024, 1, 9), "visits", &[5], 3),
        answer(4, day(2024, 1, 9), "visits", &[12], 1),
    ]
}

fn registry() -> Arc<SharedRegistry> {
    let mut instances = EntityInstanceRepository::new();
    for id in 1..=40 {
        instances.add("brand", instance(id));
        instances.add("region", instance(id));
    }
    Arc::new(SharedRegistry::new(RegistrySnapshot::new(
        EntityTypeRepository::new(),
        instances,
        ResponseFieldManager::new(),
    )))
}

fn loader(source: Arc<InMemoryAnswerSource>, config: LoaderConfig) -> LazyDataLoader {
    LazyDataLoader::with_config_limit(source, registry(), config)
}

fn gated_source() -> (Arc<InMemoryAnswerSource>, Arc<Semaphore>) {
    let gate = Arc::new(Semaphore::new(0));
    let source = InMemoryAnswerSource::new()
        .with_rows(uk(), rows())
        .with_gate(Arc::clone(&gate));
    (Arc::new(source), gate)
}

async fn open_after(gate: &Semaphore, delay: Duration) {
    tokio::time::sleep(delay).await;
    gate.add_permits(100);
}

#[tokio::test]
async fn returns_records_within_the_requested_range() {
    let source = Arc::new(InMemoryAnswerSource::new().with_rows(uk(), rows()));
    let loader = loader(Arc::clone(&source), LoaderConfig::default());

    let records = loader
        .get_data_for_fields(&uk(), &[brand_field("aware")], Some(january()), &brand_targets(), &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(records[0].answer("aware", &[2]).is_some());
}

#[tokio::test]
async fn concurrent_identical_requests_share_one_fetch() {
    let (source, gate) = gated_source();
    let loader = loader(Arc::clone(&source), LoaderConfig::default());
    let token = CancellationToken::new();
    let fields = [brand_field("aware")];
    let targets = brand_targets();

    let subset = uk();
    let (first, second, _) = tokio::join!(
        loader.get_data_for_fields(&subset, &fields, Some(january()), &targets, &token),
        loader.get_data_for_fields(&subset, &fields, Some(january()), &targets, &token),
        open_after(&gate, Duration::from_millis(20)),
    );

    assert_eq!(first.unwrap().len(), 2);
    assert_eq!(second.unwrap().len(), 2);
    assert_eq!(source.load_calls(), 1);
    assert_eq!(loader.in_flight().coalesced_count(), 1);
    assert!(loader.in_flight().is_empty());
}

#[tokio::test]
async fn a_cancelled_caller_does_not_disturb_the_others() {
    let (source, gate) = gated_source();
    let loader = loader(Arc::clone(&source), LoaderConfig::default());
    let keep = CancellationToken::new();
    let quit = CancellationToken::new();
    let fields = [brand_field("aware")];
    let targets = brand_targets();

    let subset = uk();
    let (kept, quitted, _) = tokio::join!(
        loader.get_data_for_fields(&subset, &fields, Some(january()), &targets, &keep),
        loader.get_data_for_fields(&subset, &fields, Some(january()), &targets, &quit),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            quit.cancel();
            open_after(&gate, Duration::from_millis(10)).await;
        },
    );

    assert_eq!(quitted.unwrap_err(), DataError::Cancelled);
    assert_eq!(kept.unwrap().len(), 2);
    assert_eq!(source.load_calls(), 1);
}

#[tokio::test]
async fn cancelling_the_fetch_reaches_every_caller_and_does_not_poison_retries() {
    let (source, gate) = gated_source();
    let loader = loader(Arc::clone(&source), LoaderConfig::default());
    let token = CancellationToken::new();
    let fields = [brand_field("aware")];
    let targets = brand_targets();

    let subset = uk();
    let (first, second, _) = tokio::join!(
        loader.get_data_for_fields(&subset, &fields, Some(january()), &targets, &token),
        loader.get_data_for_fields(&subset, &fields, Some(january()), &targets, &token),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            for fingerprint in loader.in_flight().running() {
                assert!(loader.in_flight().cancel(&fingerprint));
            }
        },
    );
    assert_eq!(first.unwrap_err(), DataError::Cancelled);
    assert_eq!(second.unwrap_err(), DataError::Cancelled);

    gate.add_permits(100);
    let retried = loader
        .get_data_for_fields(&uk(), &fields, Some(january()), &targets, &token)
        .await
        .unwrap();
    assert_eq!(retried.len(), 2);
    assert_eq!(source.load_calls(), 2);
}

#[tokio::test]
async fn the_last_caller_leaving_abandons_the_fetch() {
    let (source, _gate) = gated_source();
    let loader = loader(Arc::clone(&source), LoaderConfig::default());
    let token = CancellationToken::new();

    let subset = uk();
    let fields = [brand_field("aware")];
    let targets = brand_targets();
    let (result, _) = tokio::join!(
        loader.get_data_for_fields(&subset, &fields, Some(january()), &targets, &token),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        },
    );
    assert_eq!(result.unwrap_err(), DataError::Cancelled);
    assert!(loader.in_flight().is_empty());
}

#[tokio::test]
async fn loaded_ranges_are_not_fetched_again() {
    let source = Arc::new(InMemoryAnswerSource::new().with_rows(uk(), rows()));
    let loader = loader(Arc::clone(&source), LoaderConfig::default());
    let token = CancellationToken::new();
    let fields = [brand_field("aware")];

    for range in [january(), january(), DateRange::new(day(2024, 1, 10), day(2024, 1, 20))] {
        loader
            .get_data_for_fields(&uk(), &fields, Some(range), &brand_targets(), &token)
            .await
            .unwrap();
    }
    assert_eq!(source.load_calls(), 1);

    let wider = DateRange::new(day(2024, 1, 1), day(2024, 2, 29));
    let records = loader
        .get_data_for_fields(&uk(), &fields, Some(wider), &brand_targets(), &token)
        .await
        .unwrap();
    assert_eq!(source.load_calls(), 2);
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn only_unloaded_instances_are_requested() {
    let source = Arc::new(InMemoryAnswerSource::new().with_rows(uk(), rows()));
    let loader = loader(Arc::clone(&source), LoaderConfig::default());
    let token = CancellationToken::new();
    let fields = [brand_field("aware")];

    loader
        .get_data_for_fields(&uk(), &fields, Some(january()), &[DataTarget::new("brand", [1])], &token)
        .await
        .unwrap();
    loader
        .get_data_for_fields(&uk(), &fields, Some(january()), &brand_targets(), &token)
        .await
        .unwrap();

    let requests = source.requests();
    assert_eq!(requests.len(), 2);
    let second: Vec<i32> = requests[1].targets[0].instance_ids.iter().copied().collect();
    assert_eq!(second, vec![2]);
}

#[tokio::test]
async fn non_brand_targets_prefetch_adjacent_instances() {
    let source = Arc::new(InMemoryAnswerSource::new().with_rows(uk(), rows()));
    let loader = loader(Arc::clone(&source), LoaderConfig::default());
    let token = CancellationToken::new();
    let visits = ResponseFieldDescriptor::new("visits", vec!["region".to_string()]);

    loader
        .get_data_for_fields(&uk(), &[visits.clone()], Some(january()), &[DataTarget::new("region", [1, 2])], &token)
        .await
        .unwrap();
    let requested: Vec<i32> = source.requests()[0].targets[0].instance_ids.iter().copied().collect();
    assert_eq!(requested, (1..=17).collect::<Vec<_>>());

    let records = loader
        .get_data_for_fields(&uk(), &[visits], Some(january()), &[DataTarget::new("region", [12])], &token)
        .await
        .unwrap();
    assert_eq!(source.load_calls(), 1);
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn the_configured_limit_caps_requested_dates() {
    let source = Arc::new(InMemoryAnswerSource::new().with_rows(uk(), rows()));
    let config = LoaderConfig {
        latest_date_to_request: Some(day(2024, 1, 15)),
        ..LoaderConfig::default()
    };
    let loader = loader(Arc::clone(&source), config);

    let records = loader
        .get_data_for_fields(&uk(), &[brand_field("aware")], Some(january()), &brand_targets(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    let range = source.requests()[0].range.unwrap();
    assert_eq!(range.end, day(2024, 1, 15));
}

#[tokio::test]
async fn too_many_concurrent_loads_fail_fast() {
    let (source, gate) = gated_source();
    let config = LoaderConfig {
        max_concurrent_loads: 1,
        ..LoaderConfig::default()
    };
    let loader = loader(Arc::clone(&source), config);
    let token = CancellationToken::new();
    let fields = [brand_field("aware")];
    let targets = brand_targets();

    let subset = uk();
    let (first, second, _) = tokio::join!(
        loader.get_data_for_fields(&subset, &fields, Some(january()), &targets, &token),
        async {
            tokio::task::yield_now().await;
            loader
                .get_data_for_fields(&subset, &fields, Some(january()), &targets, &token)
                .await
        },
        open_after(&gate, Duration::from_millis(20)),
    );
    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), DataError::TooBusy { max_concurrent: 1 });
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_fetching() {
    let source = Arc::new(InMemoryAnswerSource::new().with_rows(uk(), rows()));
    let config = LoaderConfig {
        max_cartesian_product: 4,
        ..LoaderConfig::default()
    };
    let loader = loader(Arc::clone(&source), config);
    let token = CancellationToken::new();

    let missing = loader
        .get_data_for_fields(&uk(), &[brand_field("aware")], Some(january()), &[], &token)
        .await
        .unwrap_err();
    assert_eq!(
        missing,
        DataError::MissingEntityType {
            field: "aware".to_string(),
            entity_type: "brand".to_string(),
        }
    );

    let pair = ResponseFieldDescriptor::new("price", vec!["brand".to_string(), "product".to_string()]);
    let too_large = loader
        .get_data_for_fields(
            &uk(),
            &[pair],
            Some(january()),
            &[DataTarget::new("brand", [1, 2, 3]), DataTarget::new("product", [1, 2])],
            &token,
        )
        .await
        .unwrap_err();
    assert_eq!(too_large, DataError::CartesianProductTooLarge { size: 6, max: 4 });

    let backwards = DateRange::new(day(2024, 2, 1), day(2024, 1, 1));
    assert!(matches!(
        loader
            .get_data_for_fields(&uk(), &[brand_field("aware")], Some(backwards), &brand_targets(), &token)
            .await,
        Err(DataError::InvalidDateRange { .. })
    ));
    assert_eq!(source.load_calls(), 0);
}

#[tokio::test]
async fn source_failures_propagate_and_are_not_cached() {
    let source = Arc::new(InMemoryAnswerSource::new().with_rows(uk(), rows()).failing("store offline"));
    let loader = loader(Arc::clone(&source), LoaderConfig::default());
    let token = CancellationToken::new();

    for _ in 0..2 {
        let error = loader
            .get_data_for_fields(&uk(), &[brand_field("aware")], Some(january()), &brand_targets(), &token)
            .await
            .unwrap_err();
        assert!(matches!(error, DataError::Source { .. }));
    }
    assert_eq!(source.load_calls(), 2);
}

#[tokio::test]
async fn responses_come_with_their_profile_answers() {
    let source = Arc::new(InMemoryAnswerSource::new().with_rows(uk(), rows()));
    let loader = loader(Arc::clone(&source), LoaderConfig::default());

    let responses = loader
        .get_responses(&uk(), &[profile_field("age")], &CancellationToken::new())
        .await
        .unwrap();

    let ages: Vec<Option<i32>> = responses
        .iter()
        .map(|r| r.answer("age", &[]).and_then(|v| v.as_number()))
        .collect();
    assert_eq!(ages, vec![Some(2), Some(4)]);
}
