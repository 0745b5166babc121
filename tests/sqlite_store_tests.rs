use chrono::{Duration, Utc};
use tempfile::TempDir;

use wellrs::database::SqliteRecordStore;
use wellrs::models::{MentalRecord, PhysicalRecord, SleepRecord};
use wellrs::store::RecordStore;
use wellrs::summary::SummaryOutcome;
use wellrs::WellnessEngine;

fn temp_store() -> (TempDir, SqliteRecordStore) {
    let dir = TempDir::new().unwrap();
    let store = SqliteRecordStore::open(dir.path().join("wellrs.db")).unwrap();
    (dir, store)
}

#[test]
fn test_summary_from_sqlite_store() {
    let (_dir, store) = temp_store();
    let now = Utc::now();

    for days_ago in 0..5 {
        let timestamp = now - Duration::days(days_ago) - Duration::hours(1);
        store
            .insert_physical(&PhysicalRecord {
                user_id: 3,
                timestamp,
                heart_rate: Some(68),
                steps: Some(8_000),
                ..PhysicalRecord::default()
            })
            .unwrap();
        store
            .insert_mental(&MentalRecord {
                user_id: 3,
                timestamp,
                mood_score: Some(7),
                stress_level: Some(4),
                ..MentalRecord::default()
            })
            .unwrap();
        store
            .insert_sleep(&SleepRecord {
                user_id: 3,
                timestamp,
                duration_hours: Some(7.5),
                quality: Some(7),
                ..SleepRecord::default()
            })
            .unwrap();
    }

    // Another user's data must not leak into the summary
    store
        .insert_mental(&MentalRecord {
            user_id: 4,
            timestamp: now - Duration::hours(3),
            mood_score: Some(1),
            ..MentalRecord::default()
        })
        .unwrap();

    let outcome = WellnessEngine::new().compute_summary(&store, 3, Some(7)).unwrap();
    let summary = outcome.summary().expect("summary");

    assert_eq!(summary.metrics.avg_heart_rate, Some(68.0));
    assert_eq!(summary.metrics.avg_mood, Some(7.0));
    assert_eq!(summary.metrics.avg_sleep_duration, Some(7.5));
    assert_eq!(summary.metrics.avg_sleep_quality, Some(7.0));
    assert_eq!(summary.record_count, 15);
    assert!(summary.chart_data.sleep_trend.len() >= 4);
}

#[test]
fn test_unknown_user_is_no_data() {
    let (_dir, store) = temp_store();
    let outcome = WellnessEngine::new().compute_summary(&store, 99, None).unwrap();
    assert!(matches!(outcome, SummaryOutcome::NoData(_)));
}

#[test]
fn test_store_reopens_with_existing_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wellrs.db");
    let logged_at = Utc::now() - Duration::days(2);

    {
        let store = SqliteRecordStore::open(&path).unwrap();
        store
            .insert_physical(&PhysicalRecord {
                user_id: 1,
                timestamp: logged_at,
                bp_sys: Some(135),
                bp_dia: Some(88),
                ..PhysicalRecord::default()
            })
            .unwrap();
    }

    let store = SqliteRecordStore::open(&path).unwrap();
    let records = store
        .list_physical_records(1, Utc::now() - Duration::days(14))
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].bp_sys, Some(135));
    assert_eq!(records[0].timestamp, logged_at);
    assert_eq!(store.get_stats().unwrap().physical_records, 1);
}
