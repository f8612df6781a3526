use mdns_discovery::DiscoveryEngine;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};
use test_log::test;

#[test]
fn service_type_must_end_with_valid_domain() {
    assert!(DiscoveryEngine::new("_missing-dot._tcp.local").is_err());
    assert!(DiscoveryEngine::new("no-protocol.local.").is_err());
    assert!(DiscoveryEngine::new("_ok._udp.local.").is_ok());
}

/// A stopped engine must not wait out a full poll timeout: the wake-up
/// socket interrupts a pending wait, so `stop` returns after one
/// packet-processing iteration.
#[test]
fn stop_returns_promptly() {
    let engine = DiscoveryEngine::new("_stop-test._udp.local.").expect("failed to create engine");

    // Let the loop settle into a long poll wait.
    sleep(Duration::from_millis(1200));

    let before = Instant::now();
    engine.stop();
    let elapsed = before.elapsed();
    println!("stop took {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3));
}

/// Dropping the handle performs the same teardown as `stop`.
#[test]
fn drop_shuts_the_engine_down() {
    let before = Instant::now();
    {
        let _engine =
            DiscoveryEngine::new("_drop-test._udp.local.").expect("failed to create engine");
        sleep(Duration::from_millis(500));
    }
    assert!(before.elapsed() < Duration::from_secs(4));
}

/// Browsing for a type nobody advertises yields an empty list, not an
/// error and not a hang.
#[test]
fn unknown_service_type_finds_nothing() {
    let engine =
        DiscoveryEngine::new("_nobody-here-i7q3._udp.local.").expect("failed to create engine");

    sleep(Duration::from_secs(2));
    assert!(engine.get_services().is_empty());

    engine.stop();
}

/// The snapshot accessor is safe to hammer from several threads while the
/// discovery thread keeps republishing.
#[test]
fn concurrent_snapshot_readers() {
    let engine = Arc::new(
        DiscoveryEngine::new("_reader-test._tcp.local.").expect("failed to create engine"),
    );

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(std::thread::spawn(move || {
            for _ in 0..200 {
                let _services = engine.get_services();
            }
        }));
    }
    for handle in handles {
        handle.join().expect("reader thread panicked");
    }

    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.stop(),
        Err(_) => panic!("readers still hold the engine"),
    }
}
