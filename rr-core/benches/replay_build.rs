use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rr_core::model::{CarSample, LapRow, PositionSample, ResultRow, Session};
use rr_core::{build_replay, LiveState, RacePolicy, ReplayConfig};
use std::f64::consts::TAU;
use std::time::Duration;

const LAP_SECS: f64 = 90.0;

/// `cars` cars lapping a 1km-radius circle, GPS at 4 Hz and car data at ~3.7 Hz
fn create_sample_session(cars: usize, laps: u32) -> Session {
    let mut session = Session::default();
    let race_secs = LAP_SECS * laps as f64 + 30.0;

    for car in 0..cars {
        let number = (car + 1).to_string();
        let code = format!("D{:02}", car + 1);
        let pace = LAP_SECS + car as f64 * 0.4;
        let offset = car as f64 * 0.8;

        session.results.push(ResultRow {
            driver_number: number.clone(),
            abbreviation: code.clone(),
            team_name: "Williams".to_string(),
            status: "Finished".to_string(),
            position: Some(car as u32 + 1),
            ..Default::default()
        });

        for n in 1..=laps {
            let end = offset + pace * n as f64;
            session.laps.push(LapRow {
                driver: code.clone(),
                driver_number: number.clone(),
                lap_number: n,
                time: Some(end),
                lap_start_time: Some(end - pace),
                lap_time: Some(pace),
                position: Some(car as u32 + 1),
                tyre_life: Some(n),
                ..Default::default()
            });
        }

        let positions = (0..(race_secs * 4.0) as usize)
            .map(|i| {
                let t = i as f64 * 0.25;
                let a = (t - offset) / pace * TAU;
                PositionSample {
                    session_time: t,
                    x: 1000.0 * a.cos(),
                    y: 1000.0 * a.sin(),
                }
            })
            .collect();
        let car_data = (0..(race_secs * 3.7) as usize)
            .map(|i| CarSample {
                session_time: i as f64 / 3.7,
                speed: Some(250.0 + (i % 40) as f64),
                throttle: Some(100.0),
                brake: Some(0.0),
                gear: Some(7.0),
                drs: Some(if i % 60 < 12 { 12.0 } else { 0.0 }),
            })
            .collect();
        session.positions.insert(number.clone(), positions);
        session.car_data.insert(number, car_data);
    }

    session
}

fn bench_replay_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay_build");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let session = create_sample_session(20, 10);
    for interval in [1.0, 4.0] {
        let config = ReplayConfig::with_interval(interval);
        group.bench_with_input(BenchmarkId::new("build", interval), &config, |b, config| {
            b.iter(|| build_replay(black_box(&session), config));
        });
    }

    group.finish();
}

fn bench_standings(c: &mut Criterion) {
    let mut group = c.benchmark_group("live_state");

    let session = create_sample_session(20, 10);
    let live = LiveState::from_session(&session, RacePolicy::default());

    group.bench_function("standings_at_time", |b| {
        b.iter(|| black_box(live.standings_at_time(black_box(512.0), None)));
    });

    group.bench_function("standings_at_lap", |b| {
        b.iter(|| black_box(live.standings_at_lap(black_box(5))));
    });

    group.finish();
}

criterion_group!(benches, bench_replay_build, bench_standings);
criterion_main!(benches);
