//! Concurrency properties of the pair registry.

use pairwatch_engine::{PairRegistry, Readiness};
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_only_one_claim_wins() {
    let registry = Arc::new(PairRegistry::new());
    registry.record_data(&PathBuf::from("/in/a.zip"), 1);
    registry.record_checksum(&PathBuf::from("/in/a.zip.sha256"));

    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.try_claim("a.zip")
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
}

#[test]
fn test_concurrent_sightings_converge() {
    let registry = Arc::new(PairRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..200 {
                    let data = PathBuf::from(format!("/in/f{i}.zip"));
                    let checksum = PathBuf::from(format!("/in/f{i}.zip.sha256"));
                    // Half the threads see checksums first.
                    if t % 2 == 0 {
                        registry.record_data(&data, i);
                        registry.record_checksum(&checksum);
                    } else {
                        registry.record_checksum(&checksum);
                        registry.record_data(&data, i);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.pending_count(), 200);
    assert!(registry
        .snapshot()
        .iter()
        .all(|pair| pair.readiness() == Readiness::BothPresent));
    assert_eq!(registry.ready_for_verification().len(), 200);
}

#[test]
fn test_removal_races_with_sightings() {
    let registry = Arc::new(PairRegistry::new());
    for i in 0..100 {
        registry.record_data(&PathBuf::from(format!("/in/r{i}.bin")), 1);
    }

    let remover = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            (0..100)
                .filter(|i| registry.remove(&format!("r{i}.bin")))
                .count()
        })
    };
    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..100 {
                let _ = registry.ready_for_verification();
                let _ = registry.pending_count();
            }
        })
    };

    assert_eq!(remover.join().unwrap(), 100);
    reader.join().unwrap();
    assert_eq!(registry.pending_count(), 0);
}
