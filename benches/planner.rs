use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fire_timelapse::{plan_firms_chunks, CacheKey, DateRange};

fn range(years: i32) -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2000, 11, 1).unwrap(),
        NaiveDate::from_ymd_opt(2000 + years, 10, 31).unwrap(),
    )
    .unwrap()
}

fn bench_planner(c: &mut Criterion) {
    let one_year = range(1);
    let decades = range(24);
    c.bench_function("plan_firms_chunks 1 year", |b| {
        b.iter(|| plan_firms_chunks(black_box(one_year)))
    });
    c.bench_function("plan_firms_chunks 24 years", |b| {
        b.iter(|| plan_firms_chunks(black_box(decades)))
    });
    c.bench_function("cache key", |b| {
        b.iter(|| {
            CacheKey::from_url(black_box(
                "https://firms.modaps.eosdis.nasa.gov/api/area/csv/KEY/MODIS_SP/-122.3,36.8,-120.7,38.2/10/2023-08-01",
            ))
        })
    });
}

criterion_group!(benches, bench_planner);
criterion_main!(benches);
