mod helpers;

use mnemo::error::MemoryError;
use mnemo::memory::engine::MemoryEngine;
use tempfile::TempDir;

fn engine_with_lock(timeout_ms: u64, stale_ms: u64) -> (TempDir, MemoryEngine) {
    let dir = TempDir::new().unwrap();
    let mut config = helpers::test_config(&dir);
    config.lock.timeout_ms = timeout_ms;
    config.lock.stale_ms = stale_ms;
    config.lock.retry_delay_ms = 10;
    let engine = MemoryEngine::open(config).unwrap();
    (dir, engine)
}

#[test]
fn held_lock_times_out_and_names_the_path() {
    let (dir, engine) = engine_with_lock(100, 60_000);

    // Simulate another live process holding the lock
    let lock_path = dir.path().join("memory.jsonl.lock");
    std::fs::write(&lock_path, "{}").unwrap();

    let err = engine.add("s", "blocked", vec![], None, None).unwrap_err();
    match err {
        MemoryError::LockTimeout { path } => assert_eq!(path, lock_path),
        other => panic!("expected LockTimeout, got {other}"),
    }

    // The foreign marker was left alone
    assert!(lock_path.exists());
}

#[test]
fn stale_markers_are_evicted() {
    // stale_ms = 0 makes any existing marker immediately evictable,
    // standing in for a crashed writer that never cleaned up.
    let (dir, engine) = engine_with_lock(5_000, 0);

    let lock_path = dir.path().join("memory.jsonl.lock");
    std::fs::write(&lock_path, "{}").unwrap();

    let item = engine.add("s", "proceeds anyway", vec![], None, None).unwrap();
    assert_eq!(engine.get(&item.id).unwrap().content, "proceeds anyway");

    // The marker is gone once the write completes
    assert!(!lock_path.exists());
}

#[test]
fn lock_marker_is_removed_after_each_write() {
    let (dir, engine) = engine_with_lock(5_000, 60_000);
    engine.add("s", "one", vec![], None, None).unwrap();
    engine.add("s", "two", vec![], None, None).unwrap();

    assert!(!dir.path().join("memory.jsonl.lock").exists());
}

#[test]
fn writers_from_two_handles_interleave_safely() {
    let dir = TempDir::new().unwrap();
    let config = helpers::test_config(&dir);
    let first = MemoryEngine::open(config.clone()).unwrap();
    let second = MemoryEngine::open(config).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = if i % 2 == 0 { first.clone() } else { second.clone() };
            std::thread::spawn(move || {
                engine
                    .add("shared", &format!("entry {i}"), vec![], None, None)
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // All four lines landed intact
    let outcome = first.log().read_all().unwrap();
    assert_eq!(outcome.stats.valid_lines, 4);
    assert_eq!(outcome.stats.invalid_lines, 0);
}
