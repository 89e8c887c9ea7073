//! Serialization guarantees of `MapAccess` under contention.

use crate::harness::{EngineProbe, FakeEngine, MISSING_MAP};
use marga_path::core::Point3;
use marga_server::MapAccess;
use marga_server::engine::EngineError;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn randomized_interleavings_stay_serialized() {
    for round in 0..5u64 {
        let probe = EngineProbe::default();
        let engine = FakeEngine::new(probe.clone()).with_delay(Duration::from_micros(50));
        let maps = Arc::new(MapAccess::new(Box::new(engine)));

        let workers: Vec<_> = (0..8u64)
            .map(|worker| {
                let maps = Arc::clone(&maps);
                thread::spawn(move || {
                    let mut rng = SmallRng::seed_from_u64(round * 100 + worker);
                    for _ in 0..25 {
                        let map_id = rng.gen_range(1..5);
                        let result = match rng.gen_range(0..3) {
                            0 => maps
                                .with_map(map_id, |e| e.find_path(map_id, Point3::ZERO, Point3::ZERO))
                                .map(|_| ()),
                            1 => maps.with_map(map_id, |e| e.random_point(map_id)).map(|_| ()),
                            _ => maps.ensure_loaded(map_id),
                        };
                        assert!(result.is_ok());
                        if rng.gen_bool(0.3) {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(probe.overlaps(), 0, "round {}", round);
        for map_id in maps.loaded_maps() {
            assert_eq!(probe.loads_of(map_id), 1, "map {} round {}", map_id, round);
        }
    }
}

#[test]
fn failed_load_reported_and_retried() {
    let probe = EngineProbe::default();
    let maps = MapAccess::new(Box::new(FakeEngine::new(probe.clone())));

    assert_eq!(
        maps.with_map(MISSING_MAP, |e| e.random_point(MISSING_MAP)),
        Err(EngineError::MapNotFound(MISSING_MAP))
    );
    assert!(!maps.is_loaded(MISSING_MAP));
    assert_eq!(maps.preload(&[MISSING_MAP, 2]), 1);
    assert_eq!(maps.loaded_maps(), vec![2]);

    let loads = probe
        .calls()
        .iter()
        .filter(|c| *c == &format!("load {}", MISSING_MAP))
        .count();
    assert_eq!(loads, 2);
}
