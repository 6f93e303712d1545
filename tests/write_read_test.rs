mod helpers;

use mnemo::memory::engine::MemoryEngine;
use mnemo::memory::types::MemoryPatch;
use tempfile::TempDir;

#[test]
fn open_creates_log_at_nonexistent_path() {
    let dir = TempDir::new().unwrap();
    let mut config = helpers::test_config(&dir);
    config.storage.log_path = dir
        .path()
        .join("nested/deeper/memory.jsonl")
        .to_string_lossy()
        .into_owned();

    let engine = MemoryEngine::open(config.clone()).unwrap();
    assert!(config.resolved_log_path().exists());

    // Functional from the start
    let item = engine.add("boot", "first memory", vec![], None, None).unwrap();
    assert_eq!(engine.get(&item.id).unwrap().content, "first memory");
}

#[test]
fn two_engines_share_one_log() {
    let dir = TempDir::new().unwrap();
    let config = helpers::test_config(&dir);

    let writer = MemoryEngine::open(config.clone()).unwrap();
    let reader = MemoryEngine::open(config).unwrap();

    let item = writer
        .add("shared", "written by one process", vec!["ipc".into()], None, None)
        .unwrap();

    let seen = reader.get(&item.id).unwrap();
    assert_eq!(seen.content, "written by one process");
    assert_eq!(seen.tags, vec!["ipc"]);
}

#[test]
fn update_merges_and_preserves_untouched_fields() {
    let (_dir, engine) = helpers::test_engine();
    let item = engine
        .add("proj", "use port 5432", vec!["db".into()], None, Some(0.7))
        .unwrap();

    let patch = MemoryPatch {
        importance: Some(0.95),
        ..MemoryPatch::default()
    };
    let updated = engine.update(&item.id, &patch).unwrap();

    assert_eq!(updated.importance, 0.95);
    assert_eq!(updated.content, "use port 5432");
    assert_eq!(updated.tags, vec!["db"]);
    assert_eq!(updated.created_at, item.created_at);
}

#[test]
fn empty_patch_is_rejected() {
    let (_dir, engine) = helpers::test_engine();
    let item = engine.add("s", "content", vec![], None, None).unwrap();

    let err = engine.update(&item.id, &MemoryPatch::default()).unwrap_err();
    assert!(err.to_string().contains("at least one field"));
}

#[test]
fn metadata_round_trips_and_null_clears_it() {
    let (_dir, engine) = helpers::test_engine();
    let meta = serde_json::json!({"source": "ci", "attempt": 3});
    let item = engine
        .add("s", "flaky test notes", vec![], Some(meta.clone()), None)
        .unwrap();
    assert_eq!(engine.get(&item.id).unwrap().metadata, Some(meta));

    let clear = MemoryPatch {
        metadata: Some(None),
        ..MemoryPatch::default()
    };
    let cleared = engine.update(&item.id, &clear).unwrap();
    assert!(cleared.metadata.is_none());
}

#[test]
fn delete_is_soft_and_reversible() {
    let (_dir, engine) = helpers::test_engine();
    let item = engine.add("s", "transient", vec![], None, None).unwrap();

    engine.delete(&item.id).unwrap();
    assert!(engine.get(&item.id).unwrap().deleted);

    let restore = MemoryPatch {
        deleted: Some(false),
        ..MemoryPatch::default()
    };
    let restored = engine.update(&item.id, &restore).unwrap();
    assert!(!restored.deleted);
}

#[test]
fn patch_parses_from_wire_json() {
    let (_dir, engine) = helpers::test_engine();
    let item = engine.add("s", "original", vec![], None, None).unwrap();

    // Absent summary key leaves it alone; explicit null clears.
    let patch: MemoryPatch =
        serde_json::from_str(r#"{"content": "revised", "tags": ["Edited"]}"#).unwrap();
    let updated = engine.update(&item.id, &patch).unwrap();
    assert_eq!(updated.content, "revised");
    assert_eq!(updated.tags, vec!["edited"]);
}
