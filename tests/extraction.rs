mod common;

use common::{InjectedFailure, ScriptedSource, id_of, people, row};
use std::time::Duration;
use typesense_sync::config::PaginationTuning;
use typesense_sync::models::FieldValue;
use typesense_sync::source::SourceError;
use typesense_sync::sync::{ExtractionError, extract};

fn ids(records: &[typesense_sync::models::SourceRow]) -> Vec<i64> {
    records.iter().map(id_of).collect()
}

#[tokio::test]
async fn pages_through_a_small_table() {
    let source = ScriptedSource::new(people(23));

    let records = extract(&source, "public.people", 10, None, &PaginationTuning::default())
        .await
        .unwrap();

    assert_eq!(ids(&records), (1..=23).collect::<Vec<i64>>());
    assert_eq!(
        source.requests(),
        vec![(0, 10), (10, 10), (20, 10), (23, 10)]
    );
}

#[tokio::test]
async fn page_size_grows_after_ten_successful_pages() {
    let source = ScriptedSource::new(people(400));

    let records = extract(&source, "people", 10, None, &PaginationTuning::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 400);

    let limits: Vec<usize> = source.requests().iter().map(|(_, limit)| *limit).collect();
    assert_eq!(&limits[..10], &[10; 10]);
    assert_eq!(&limits[10..20], &[15; 10]);
    assert_eq!(limits[20], 23);
}

#[tokio::test(start_paused = true)]
async fn timeout_retreats_and_retries_the_same_offset() {
    // calls 0..=9 succeed at size 10, call 10 is the first at size 15
    let source = ScriptedSource::new(people(300)).fail_call(10, InjectedFailure::Timeout);
    let started = tokio::time::Instant::now();

    let records = extract(&source, "people", 10, None, &PaginationTuning::default())
        .await
        .unwrap();

    let requests = source.requests();
    assert_eq!(requests[10], (100, 15));
    assert_eq!(requests[11], (100, 10));
    assert!(started.elapsed() >= Duration::from_secs(12));

    assert_eq!(ids(&records), (1..=300).collect::<Vec<i64>>());
    assert!(requests.iter().all(|(_, limit)| *limit >= 10));
}

#[tokio::test]
async fn timeout_at_the_floor_is_fatal() {
    let source = ScriptedSource::new(people(30)).fail_call(1, InjectedFailure::Timeout);

    let err = extract(&source, "people", 10, None, &PaginationTuning::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Source(SourceError::Timeout(_))));
    assert_eq!(source.requests().len(), 2);
}

#[tokio::test]
async fn other_source_errors_abort_immediately() {
    let source = ScriptedSource::new(people(30)).fail_call(0, InjectedFailure::Fatal);

    let err = extract(&source, "people", 100, None, &PaginationTuning::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Source(SourceError::Decode(_))));
    assert_eq!(source.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_timeouts_without_progress_give_up() {
    let tuning = PaginationTuning {
        max_consecutive_timeouts: 3,
        ..PaginationTuning::default()
    };
    let source = ScriptedSource::new(people(100))
        .fail_call(0, InjectedFailure::Timeout)
        .fail_call(1, InjectedFailure::Timeout)
        .fail_call(2, InjectedFailure::Timeout)
        .fail_call(3, InjectedFailure::Timeout);

    let err = extract(&source, "people", 50, None, &tuning)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExtractionError::TooManyTimeouts {
            offset: 0,
            timeouts: 4
        }
    ));
    assert_eq!(source.requests().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn timeouts_up_to_the_cap_are_all_retried() {
    let tuning = PaginationTuning {
        max_consecutive_timeouts: 3,
        ..PaginationTuning::default()
    };
    let source = ScriptedSource::new(people(20))
        .fail_call(0, InjectedFailure::Timeout)
        .fail_call(1, InjectedFailure::Timeout)
        .fail_call(2, InjectedFailure::Timeout);

    let records = extract(&source, "people", 50, None, &tuning).await.unwrap();

    assert_eq!(ids(&records), (1..=20).collect::<Vec<i64>>());
    assert_eq!(source.requests()[..4], [(0, 50), (0, 50), (0, 50), (0, 50)]);
}

#[tokio::test]
async fn global_limit_truncates_the_result() {
    let source = ScriptedSource::new(people(23));

    let records = extract(&source, "people", 10, Some(15), &PaginationTuning::default())
        .await
        .unwrap();

    assert_eq!(ids(&records), (1..=15).collect::<Vec<i64>>());
    assert_eq!(source.requests(), vec![(0, 10), (10, 10)]);
}

#[tokio::test]
async fn zero_limit_reads_nothing() {
    let source = ScriptedSource::new(people(5));

    let records = extract(&source, "people", 10, Some(0), &PaginationTuning::default())
        .await
        .unwrap();

    assert!(records.is_empty());
    assert!(source.requests().is_empty());
}

#[tokio::test]
async fn unsafe_table_names_are_rejected_before_querying() {
    let source = ScriptedSource::new(people(5));

    let err = extract(
        &source,
        "people; DROP TABLE people",
        10,
        None,
        &PaginationTuning::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ExtractionError::Source(SourceError::InvalidTable(_))));
    assert!(source.requests().is_empty());
}

#[tokio::test]
async fn denylisted_columns_are_stripped_from_every_row() {
    let rows = vec![
        row(vec![
            ("id", FieldValue::Int(1)),
            ("name", FieldValue::Text("a".to_string())),
            ("follower_count", FieldValue::Int(10)),
        ]),
        row(vec![
            ("id", FieldValue::Int(2)),
            ("name", FieldValue::Text("b".to_string())),
            ("last_updated", FieldValue::Text("yesterday".to_string())),
        ]),
    ];
    let source = ScriptedSource::new(rows);

    let records = extract(&source, "people", 10, None, &PaginationTuning::default())
        .await
        .unwrap();

    for record in &records {
        let columns: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["id", "name"]);
    }
}
