//! Integration tests for the session sources

use rr_adapters::{save, DemoSource, FileSource};
use rr_core::adapter::SessionSource;
use rr_core::model::{Compound, Session};
use rr_core::{build_replay, ReplayConfig};

fn demo_session() -> Session {
    DemoSource::new().load().expect("demo session should load")
}

#[test]
fn test_demo_source_name() {
    let source = DemoSource::new();
    assert_eq!(source.name(), "demo");
    assert_eq!(source.laps(), 20);
}

#[test]
fn test_demo_source_rejects_too_short_race() {
    assert!(DemoSource::with_laps(2).load().is_err());
    assert!(DemoSource::with_laps(3).load().is_ok());
}

#[test]
fn test_demo_source_is_deterministic() {
    let a = serde_json::to_value(demo_session()).unwrap();
    let b = serde_json::to_value(demo_session()).unwrap();
    assert_eq!(a, b, "two loads should produce identical sessions");
}

#[test]
fn test_demo_session_tables_present() {
    let session = demo_session();
    assert_eq!(session.info.event_name, "Demo Grand Prix");
    assert_eq!(session.results.len(), 6);
    assert_eq!(session.total_laps(), 20);
    assert_eq!(session.positions.len(), 6);
    assert_eq!(session.car_data.len(), 6);
    assert!(!session.track_status.is_empty());
    assert!(!session.weather.is_empty());

    let circuit = session.circuit.as_ref().expect("demo has circuit info");
    assert_eq!(circuit.rotation, Some(92.0));
    assert_eq!(circuit.corners.len(), 6);

    let last = session.race_control.last().expect("race control messages");
    assert_eq!(last.flag.as_deref(), Some("CHEQUERED"));
}

#[test]
fn test_demo_results_classification() {
    let session = demo_session();
    let status = |code: &str| {
        session
            .results
            .iter()
            .find(|r| r.abbreviation == code)
            .map(|r| r.status.clone())
            .unwrap()
    };

    assert_eq!(status("ALO"), "Engine");
    assert_eq!(status("ALB"), "+1 Lap");
    assert_eq!(session.results.last().unwrap().abbreviation, "ALO");
    assert_eq!(session.results[0].points, 25.0);
    assert_eq!(session.results[0].status, "Finished");
}

#[test]
fn test_demo_laps_are_contiguous_with_one_stop() {
    let session = demo_session();
    for result in &session.results {
        let laps: Vec<_> = session
            .laps
            .iter()
            .filter(|l| l.driver == result.abbreviation)
            .collect();
        assert!(!laps.is_empty(), "{} has laps", result.abbreviation);
        for pair in laps.windows(2) {
            assert_eq!(pair[1].lap_number, pair[0].lap_number + 1);
            assert_eq!(pair[1].lap_start_time, pair[0].time);
        }

        let stops = laps.iter().filter(|l| l.pit_in_time.is_some()).count();
        assert_eq!(stops, 1, "{} pits once", result.abbreviation);
        let last = laps.last().unwrap();
        assert_eq!(last.compound, Compound::Hard);
    }
}

#[test]
fn test_demo_telemetry_sorted_and_sampled() {
    let session = demo_session();
    for (number, samples) in &session.positions {
        assert!(
            samples.windows(2).all(|w| w[1].session_time > w[0].session_time),
            "GPS for #{number} strictly increasing"
        );
    }
    let ver = &session.positions["1"];
    let span = ver.last().unwrap().session_time - ver[0].session_time;
    let rate = ver.len() as f64 / span;
    assert!((rate - 4.0).abs() < 0.1, "GPS near 4 Hz, got {rate}");

    let car = &session.car_data["1"];
    assert!(car.iter().any(|c| c.drs == Some(12.0)), "DRS opens somewhere");
    assert!(car.iter().all(|c| (1.0..=8.0).contains(&c.gear.unwrap())));
}

#[test]
fn test_demo_replay_build() {
    let session = demo_session();
    let bundle = build_replay(&session, &ReplayConfig::with_interval(4.0)).expect("replay builds");

    let info = bundle.info();
    assert_eq!(info.total_laps, 20);
    assert_eq!(info.rotation.degrees, 92.0);
    assert!(info.frame_count > 300);
    assert!(bundle.seek(0).is_some());

    let overlays = bundle.overlays();
    assert!(overlays.track_outline.len() > 100);
    assert!(!overlays.drs_zones.is_empty());
    let corners = overlays.corners.as_ref().expect("corner markers");
    assert_eq!(corners.numbers, vec![1, 2, 3, 4, 5, 6]);
    assert!(overlays.x_range[0] < overlays.x_range[1]);
    assert_eq!(overlays.pit_events.len(), 6);
    assert!(!overlays.weather.is_empty());
    assert_eq!(bundle.stints()["VER"].len(), 2);
}

#[test]
fn test_demo_replay_retirement_and_lapped_car() {
    let session = demo_session();
    let bundle = build_replay(&session, &ReplayConfig::with_interval(4.0)).unwrap();
    let live = bundle.live();

    let end = bundle.info().race_end;
    let standings = live.standings_at_time(end, None);
    let last = standings.last().unwrap();
    assert_eq!(last.code, "ALO");
    assert!(last.retired);

    let alb = standings.iter().find(|s| s.code == "ALB").unwrap();
    assert_eq!(alb.gap, "+1 LAP");
    assert_eq!(standings[0].lap, 20);

    // Car stops transmitting after it retires
    let final_frame = bundle.frames().last().unwrap();
    assert!(final_frame.drivers.iter().all(|d| d.code != "ALO"));
    assert!(final_frame.drivers.iter().any(|d| d.code == "ALB"));
}

#[test]
fn test_demo_standings_at_lap_stay_on_that_lap() {
    let session = demo_session();
    let live = rr_core::LiveState::from_session(&session, rr_core::RacePolicy::default());

    let standings = live.standings_at_lap(19).unwrap();
    assert_eq!(standings[0].code, "VER");
    assert!(standings.iter().all(|s| s.lap == 19));
    assert!(standings.iter().all(|s| s.code != "ALO"), "ALO stopped after lap 12");
    let alb = standings.iter().find(|s| s.code == "ALB").unwrap();
    assert!(alb.gap.ends_with('s'), "lapped car gets a time gap, got {}", alb.gap);

    let summary = live.race_summary(20);
    assert_eq!(summary.pit_stops.len(), 6);
    assert!(summary.retirements.iter().any(|r| r.driver == "ALO" && r.last_lap == 12));
    assert!(!summary.neutralisations.is_empty());
}

#[test]
fn test_file_source_round_trip() {
    let session = demo_session();
    let dir = tempfile::tempdir().unwrap();

    for name in ["race.json", "race.json.zst"] {
        let path = dir.path().join(name);
        save(&session, &path).expect("save should succeed");

        let source = FileSource::new(&path);
        assert_eq!(source.name(), "race");
        let loaded = source.load().expect("load should succeed");
        assert_eq!(
            serde_json::to_value(&loaded).unwrap(),
            serde_json::to_value(&session).unwrap()
        );
    }
}

#[test]
fn test_file_source_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, b"{ not json").unwrap();
    assert!(FileSource::new(&path).load().is_err());
}
