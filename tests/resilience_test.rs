mod helpers;

use mnemo::memory::search::SearchQuery;

#[test]
fn corrupt_lines_do_not_break_reads() {
    let (_dir, engine) = helpers::test_engine();
    let good = engine.add("s", "survives", vec![], None, None).unwrap();

    helpers::raw_append(engine.log().path(), "{ not json at all");
    helpers::raw_append(engine.log().path(), r#"{"id": "half", "content": "no timestamps"}"#);

    // Reads keep working around the damage
    assert_eq!(engine.get(&good.id).unwrap().content, "survives");
    let results = engine.search(&SearchQuery::default()).unwrap();
    assert_eq!(results.len(), 1);

    // And health reports it
    let health = engine.health().unwrap();
    assert_eq!(health.stats.invalid_lines, 2);
    assert!(health.reasons.contains(&"invalid-lines".to_string()));
}

#[test]
fn repair_quarantines_corruption_and_keeps_valid_data() {
    let (_dir, engine) = helpers::test_engine();
    let keep = engine.add("s", "keep me", vec![], None, None).unwrap();
    helpers::raw_append(engine.log().path(), "garbage");

    let result = engine.repair(false, true).unwrap();
    assert!(result.repaired);
    assert_eq!(result.stats.invalid_lines, 1);

    let quarantine = result.quarantine_path.expect("quarantine file written");
    let body = std::fs::read_to_string(&quarantine).unwrap();
    assert!(body.contains("garbage"));

    let backup = result.backup_path.expect("backup written");
    assert!(std::fs::read_to_string(&backup).unwrap().contains("garbage"));

    // Log is clean and the good record survived
    assert_eq!(engine.health().unwrap().stats.invalid_lines, 0);
    assert_eq!(engine.get(&keep.id).unwrap().content, "keep me");
}

#[test]
fn repair_without_quarantine_drops_silently() {
    let (_dir, engine) = helpers::test_engine();
    engine.add("s", "fine", vec![], None, None).unwrap();
    helpers::raw_append(engine.log().path(), "broken");

    let result = engine.repair(false, false).unwrap();
    assert!(result.repaired);
    assert!(result.quarantine_path.is_none());
}

#[test]
fn repair_on_clean_log_changes_nothing() {
    let (_dir, engine) = helpers::test_engine();
    engine.add("s", "fine", vec![], None, None).unwrap();
    let before = std::fs::read_to_string(engine.log().path()).unwrap();

    let result = engine.repair(false, true).unwrap();
    assert!(!result.repaired);
    assert_eq!(std::fs::read_to_string(engine.log().path()).unwrap(), before);
}

#[test]
fn search_tolerates_missing_index_file() {
    let (dir, engine) = helpers::test_engine();
    engine.add("s", "indexed once", vec!["t".into()], None, None).unwrap();
    engine.rebuild_index().unwrap();

    std::fs::remove_file(dir.path().join("index.json")).unwrap();

    let query = SearchQuery {
        scope: Some("s".into()),
        tags: vec!["t".into()],
        ..SearchQuery::default()
    };
    assert_eq!(engine.search(&query).unwrap().len(), 1);
}

#[test]
fn search_tolerates_unreadable_index_file() {
    let (dir, engine) = helpers::test_engine();
    engine.add("s", "still found", vec!["t".into()], None, None).unwrap();

    std::fs::write(dir.path().join("index.json"), "not json").unwrap();

    let query = SearchQuery {
        scope: Some("s".into()),
        tags: vec!["t".into()],
        ..SearchQuery::default()
    };
    assert_eq!(engine.search(&query).unwrap().len(), 1);
}
