// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::tempdir;
use yare::parameterized;

fn exercise(store: &dyn KeyValueStore) {
    assert_eq!(store.get("queue").unwrap(), None);

    store.set("queue", "[1]").unwrap();
    assert_eq!(store.get("queue").unwrap().as_deref(), Some("[1]"));

    store.set("queue", "[1,2]").unwrap();
    assert_eq!(store.get("queue").unwrap().as_deref(), Some("[1,2]"));

    store.remove("queue").unwrap();
    assert_eq!(store.get("queue").unwrap(), None);

    // Removing twice is fine.
    store.remove("queue").unwrap();
}

#[test]
fn memory_store_contract() {
    exercise(&MemoryStore::new());
}

#[test]
fn file_store_contract() {
    let dir = tempdir().unwrap();
    exercise(&FileStore::open(dir.path()).unwrap());
}

#[test]
fn sqlite_store_contract() {
    exercise(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn arc_store_delegates() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    exercise(&store);
}

#[test]
fn file_store_persists_across_instances() {
    let dir = tempdir().unwrap();
    FileStore::open(dir.path())
        .unwrap()
        .set("offline_request_queue", "[]")
        .unwrap();

    let reopened = FileStore::open(dir.path()).unwrap();
    assert_eq!(
        reopened.get("offline_request_queue").unwrap().as_deref(),
        Some("[]")
    );
    assert!(!dir.path().join("offline_request_queue.json.tmp").exists());
}

#[test]
fn file_store_creates_missing_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let store = FileStore::open(&nested).unwrap();
    store.set("k", "v").unwrap();
    assert!(nested.join("k.json").exists());
}

#[parameterized(
    empty = { "" },
    traversal = { "../etc/passwd" },
    slash = { "a/b" },
    hidden = { ".secret" },
    space = { "a b" },
)]
fn file_store_rejects_bad_keys(key: &str) {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    assert!(matches!(store.set(key, "v"), Err(StoreError::InvalidKey(_))));
}

#[test]
fn sqlite_store_persists_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("tend.db");

    SqliteStore::open(&path).unwrap().set("k", "v1").unwrap();
    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v1"));
}
