use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use wellrs::models::{MentalRecord, PhysicalRecord, SleepRecord, TrailingWindow};
use wellrs::normalizer::Normalizer;
use wellrs::{MetricKind, ScoringPolicy, WellnessEngine};

/// Summary computation over growing record sets
///
/// A user logging several times a day for a year stays in the low thousands
/// of records, so sizes go a little past that.

fn create_records(count: usize) -> (Vec<PhysicalRecord>, Vec<MentalRecord>, Vec<SleepRecord>) {
    let as_of = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
    let step = Duration::minutes((365 * 24 * 60 / count.max(1)) as i64);

    let mut physical = Vec::with_capacity(count);
    let mut mental = Vec::with_capacity(count);
    let mut sleep = Vec::with_capacity(count);

    for i in 0..count {
        let timestamp = as_of - step * i as i32;
        let jitter = (i % 7) as i32;

        physical.push(PhysicalRecord {
            user_id: 1,
            timestamp,
            heart_rate: Some(62 + jitter * 3),
            bp_sys: Some(112 + jitter * 2),
            bp_dia: Some(72 + jitter),
            steps: Some(4_000 + jitter * 1_200),
            calories_burned: Some(1_900 + jitter * 50),
            temperature: Some(36.5 + jitter as f64 * 0.1),
        });
        mental.push(MentalRecord {
            user_id: 1,
            timestamp,
            mood_score: Some(3 + jitter),
            stress_level: Some(8 - jitter),
            anxiety_level: Some(2 + jitter % 3),
            energy_level: Some(4 + jitter % 5),
            sleep_quality: Some(6),
            notes: None,
        });
        sleep.push(SleepRecord {
            user_id: 1,
            timestamp,
            duration_hours: Some(5.5 + jitter as f64 * 0.5),
            quality: Some(5 + jitter % 4),
            ..SleepRecord::default()
        });
    }

    (physical, mental, sleep)
}

fn bench_summarize(c: &mut Criterion) {
    let engine = WellnessEngine::new();
    let window = TrailingWindow::new(Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap(), 365);

    let mut group = c.benchmark_group("Wellness Summary");

    for &size in &[10, 100, 1_000, 5_000] {
        let (physical, mental, sleep) = create_records(size);

        group.throughput(Throughput::Elements((size * 3) as u64));
        group.bench_with_input(
            BenchmarkId::new("summarize", size),
            &(physical, mental, sleep),
            |b, (physical, mental, sleep)| {
                b.iter(|| engine.summarize(1, black_box(physical), black_box(mental), black_box(sleep), &window));
            },
        );
    }

    group.finish();
}

fn bench_normalizer(c: &mut Criterion) {
    let policy = ScoringPolicy::default();
    let normalizer = Normalizer::new(&policy);

    c.bench_function("normalize_heart_rate_sweep", |b| {
        b.iter(|| {
            (20..=220)
                .filter_map(|bpm| normalizer.normalize(MetricKind::HeartRate, black_box(bpm as f64)))
                .sum::<f64>()
        });
    });
}

criterion_group!(benches, bench_summarize, bench_normalizer);
criterion_main!(benches);
