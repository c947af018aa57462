use arena_core::clock::Clock;
use arena_core::slots::build_day;
use arena_core::{BookingDraft, FacilityDraft, FixedClock, UserId};
use chrono::{NaiveDate, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_build_day(c: &mut Criterion) {
    let facility = FacilityDraft {
        name: "Sports Hall".into(),
        kind: "hall".into(),
        description: "Multi-purpose indoor hall".into(),
        capacity: 40,
        open_time: "06:00".into(),
        close_time: "23:00".into(),
        image_url: None,
    }
    .into_facility(Utc::now())
    .expect("valid facility");

    let viewer = UserId::new();
    let bookings: Vec<_> = (6..22)
        .step_by(2)
        .map(|hour| {
            BookingDraft {
                facility_id: facility.id,
                date: "2030-05-06".into(),
                start_time: format!("{hour:02}:00"),
                end_time: format!("{:02}:00", hour + 1),
                note: None,
            }
            .parse(if hour % 4 == 0 { viewer } else { UserId::new() })
            .expect("valid booking")
            .into_booking(Utc::now())
        })
        .collect();

    let date = NaiveDate::from_ymd_opt(2030, 5, 6).expect("valid date");
    let now = FixedClock::at(date, 12, 0).now();

    c.bench_function("slots.build_day.17h_8_bookings", |b| {
        b.iter(|| {
            black_box(build_day(
                black_box(&facility),
                date,
                black_box(&bookings),
                &[],
                Some(viewer),
                now,
            ))
        });
    });
}

criterion_group!(benches, bench_build_day);
criterion_main!(benches);
