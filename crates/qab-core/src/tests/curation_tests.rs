//! Tests for favorites/hidden sets and recents persistence

use super::fixtures::*;
use crate::curation::{CurationSet, RecencyStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_favorites_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("favorites.tsv");

    let mut favorites = CurationSet::new("favorites", path.clone(), Duration::ZERO);
    favorites.add_item(Some("modA"), "item1");
    favorites.add_item(Some(""), "item2");
    favorites.save().unwrap();

    let loaded = CurationSet::load("favorites", &path, Duration::ZERO);
    assert!(loaded.check(Some("modA"), "item1"));
    assert!(loaded.check(Some(""), "item2"));
    assert!(loaded.check(None, "item2"));
    assert!(!loaded.check(Some("modB"), "item1"));
    assert_eq!(loaded.len(), 2);
}

#[test]
fn test_add_item_is_idempotent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut favorites = CurationSet::new(
        "favorites",
        TempDir::new().unwrap().path().join("f.tsv"),
        Duration::ZERO,
    );
    let counter = Arc::clone(&calls);
    favorites.set_on_changed(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(favorites.add_item(Some("guid"), "id"));
    assert!(!favorites.add_item(Some("guid"), "id"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_mod_actions_cover_package_entries() {
    let entries = vec![
        make_package_entry("com.example.a", 5001, "One"),
        make_package_entry("com.example.a", 5002, "Two"),
        make_package_entry("com.example.b", 5003, "Other"),
        make_entry(4, "Base"),
    ];
    let mut hidden = CurationSet::new(
        "hidden",
        TempDir::new().unwrap().path().join("h.tsv"),
        Duration::ZERO,
    );

    assert!(hidden.add_mod(Some("com.example.a"), &entries));
    assert!(hidden.contains(&entries[0]));
    assert!(hidden.contains(&entries[1]));
    assert!(!hidden.contains(&entries[2]));
    assert!(!hidden.contains(&entries[3]));

    assert!(hidden.remove_mod(Some("com.example.a")));
    assert!(hidden.is_empty());
    assert!(!hidden.remove_mod(Some("com.example.a")));
}

#[test]
fn test_malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hidden.tsv");
    std::fs::write(&path, "modA\0item1\nno separator here\n\n\0item2\n").unwrap();

    let hidden = CurationSet::load("hidden", &path, Duration::ZERO);
    assert_eq!(hidden.len(), 2);
    assert!(hidden.check(Some("modA"), "item1"));
    assert!(hidden.check(None, "item2"));
}

#[test]
fn test_flush_writes_pending_changes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("favorites.tsv");
    let mut favorites = CurationSet::new("favorites", path.clone(), Duration::from_secs(3600));
    favorites.add_item(None, "x");
    assert!(favorites.is_save_pending());
    assert!(!path.exists());

    favorites.flush();
    assert!(!favorites.is_save_pending());
    assert!(CurationSet::load("favorites", &path, Duration::ZERO).check(None, "x"));
}

#[test]
fn test_recents_keep_twenty_most_recent() {
    let dir = TempDir::new().unwrap();
    let mut recents = RecencyStore::new(dir.path().join("recents.json"), 20, Duration::ZERO);

    for i in 0..25u64 {
        recents.bump_at(&format!("id{i}"), 1_000 + i);
    }

    assert_eq!(recents.len(), 20);
    for i in 0..5 {
        assert!(recents.try_get_last_use(&format!("id{i}")).is_none());
    }
    for i in 5..25u64 {
        assert_eq!(recents.try_get_last_use(&format!("id{i}")), Some(1_000 + i));
    }
}

#[test]
fn test_recents_round_trip_trims_to_capacity() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recents.json");
    let mut recents = RecencyStore::new(path.clone(), 20, Duration::ZERO);
    for i in 0..10u64 {
        recents.bump_at(&format!("id{i}"), 500 + i);
    }
    recents.save().unwrap();

    let loaded = RecencyStore::load(&path, 3, Duration::ZERO);
    assert_eq!(loaded.len(), 3);
    let ids: Vec<&str> = loaded.ids_by_recency().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["id9", "id8", "id7"]);
}
