#![cfg(feature = "persistent")]
//! Unit tests for PersistentHashMap and TransientHashMap.

use figura_collections::persistent::{PersistentHashMap, TransientHashMap};
use figura_collections::CollectionError;
use rstest::rstest;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// A key whose hash ignores everything but `bucket`, forcing full collisions.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CollidingKey {
    bucket: u8,
    name: &'static str,
}

impl Hash for CollidingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bucket.hash(state);
    }
}

// =============================================================================
// Construction and lookup
// =============================================================================

#[rstest]
fn test_new_creates_empty_map() {
    let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    assert_eq!(map.get("key"), None);
}

#[rstest]
fn test_singleton_creates_single_entry_map() {
    let map = PersistentHashMap::singleton("key".to_string(), 42);
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("key"), Some(&42));
    assert!(map.contains_key("key"));
    assert!(map.contains_value(&42));
    assert!(!map.contains_value(&7));
}

#[rstest]
#[case(1)]
#[case(32)]
#[case(1000)]
#[case(10_000)]
fn test_insert_many_then_get(#[case] count: i32) {
    let map: PersistentHashMap<i32, i32> = (0..count).map(|key| (key, key * 2)).collect();
    assert_eq!(map.len(), count as usize);
    for key in 0..count {
        assert_eq!(map.get(&key), Some(&(key * 2)));
    }
    assert_eq!(map.get(&count), None);
}

// =============================================================================
// Structural sharing
// =============================================================================

#[rstest]
fn test_insert_preserves_original() {
    let original = PersistentHashMap::new().insert("stroke", "black");
    let updated = original.insert("stroke", "red").insert("fill", "none");

    assert_eq!(original.get("stroke"), Some(&"black"));
    assert_eq!(original.get("fill"), None);
    assert_eq!(updated.get("stroke"), Some(&"red"));
    assert_eq!(updated.len(), 2);
}

#[rstest]
fn test_remove_preserves_original() {
    let original: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
    let removed = original.remove(&50);

    assert_eq!(original.get(&50), Some(&50));
    assert_eq!(removed.get(&50), None);
    assert_eq!(removed.len(), 99);
}

#[rstest]
fn test_remove_absent_key_returns_equal_map() {
    let map = PersistentHashMap::new().insert(1, "one");
    let same = map.remove(&2);
    assert_eq!(same, map);
    assert_eq!(same.len(), 1);
}

// =============================================================================
// Hash collisions
// =============================================================================

#[rstest]
fn test_colliding_keys_are_kept_apart() {
    let first = CollidingKey { bucket: 1, name: "first" };
    let second = CollidingKey { bucket: 1, name: "second" };
    let third = CollidingKey { bucket: 1, name: "third" };

    let map = PersistentHashMap::new()
        .insert(first.clone(), 1)
        .insert(second.clone(), 2)
        .insert(third.clone(), 3);

    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&first), Some(&1));
    assert_eq!(map.get(&second), Some(&2));
    assert_eq!(map.get(&third), Some(&3));

    let replaced = map.insert(second.clone(), 20);
    assert_eq!(replaced.len(), 3);
    assert_eq!(replaced.get(&second), Some(&20));

    let removed = map.remove(&first).remove(&third);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed.get(&second), Some(&2));
    assert_eq!(removed.get(&first), None);
}

// =============================================================================
// Bulk operations
// =============================================================================

#[rstest]
fn test_insert_all_and_merge() {
    let base = PersistentHashMap::new().insert("a", 1).insert("b", 2);
    let extended = base.insert_all([("b", 20), ("c", 3)]).unwrap();
    assert_eq!(extended.get("b"), Some(&20));
    assert_eq!(extended.len(), 3);

    let merged = base.merge(&PersistentHashMap::singleton("d", 4));
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.get("d"), Some(&4));
    assert_eq!(base.len(), 2);
}

#[rstest]
fn test_update_with_inserts_updates_and_removes() {
    let map = PersistentHashMap::new().insert("count".to_string(), 1);

    let inserted = map.update_with("other", |_| Some(5));
    assert_eq!(inserted.get("other"), Some(&5));

    let bumped = map.update_with("count", |value| value.map(|value| value + 1));
    assert_eq!(bumped.get("count"), Some(&2));

    let removed = map.update_with("count", |_| None);
    assert!(removed.is_empty());

    let untouched = map.update_with("missing", |_| None);
    assert_eq!(untouched, map);
}

// =============================================================================
// Iteration
// =============================================================================

#[rstest]
fn test_iteration_visits_every_entry_once() {
    let map: PersistentHashMap<i32, i32> = (0..500).map(|key| (key, -key)).collect();
    let mut keys: Vec<i32> = map.keys().copied().collect();
    keys.sort_unstable();
    assert_eq!(keys, (0..500).collect::<Vec<_>>());
    assert_eq!(map.iter().len(), 500);
    assert_eq!(map.values().copied().sum::<i32>(), -(0..500).sum::<i32>());
}

#[rstest]
fn test_iteration_is_restartable() {
    let map: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
    let first_pass: Vec<_> = map.iter().collect();
    let second_pass: Vec<_> = map.iter().collect();
    assert_eq!(first_pass, second_pass);
}

#[rstest]
fn test_into_iter_yields_owned_entries() {
    let map: PersistentHashMap<i32, String> =
        (0..40).map(|key| (key, key.to_string())).collect();
    let mut entries: Vec<(i32, String)> = map.into_iter().collect();
    entries.sort();
    assert_eq!(entries.len(), 40);
    assert_eq!(entries[39], (39, "39".to_string()));
}

// =============================================================================
// Equality and hashing
// =============================================================================

#[rstest]
fn test_equality_ignores_insertion_order() {
    let forward: PersistentHashMap<i32, i32> = (0..200).map(|key| (key, key)).collect();
    let backward: PersistentHashMap<i32, i32> = (0..200).rev().map(|key| (key, key)).collect();
    assert_eq!(forward, backward);
    assert_eq!(hash_value(&forward), hash_value(&backward));
}

#[rstest]
fn test_equality_after_remove_and_reinsert() {
    let map: PersistentHashMap<i32, i32> = (0..64).map(|key| (key, key)).collect();
    let rebuilt = map.remove(&10).remove(&40).insert(40, 40).insert(10, 10);
    assert_eq!(map, rebuilt);
    assert_eq!(hash_value(&map), hash_value(&rebuilt));
}

#[rstest]
fn test_maps_with_different_values_differ() {
    let left = PersistentHashMap::new().insert(1, "a");
    let right = PersistentHashMap::new().insert(1, "b");
    assert_ne!(left, right);
}

#[rstest]
fn test_debug_format() {
    let map = PersistentHashMap::singleton(1, "one");
    assert_eq!(format!("{map:?}"), r#"{1: "one"}"#);
}

// =============================================================================
// Transient
// =============================================================================

#[rstest]
fn test_transient_batch_then_build() {
    let mut builder = TransientHashMap::new();
    for key in 0..1000 {
        assert_eq!(builder.insert(key, key), Ok(None));
    }
    assert_eq!(builder.insert(5, 50), Ok(Some(5)));
    assert_eq!(builder.remove(&6), Ok(Some(6)));
    assert_eq!(builder.remove(&6), Ok(None));
    assert_eq!(builder.get(&5), Ok(Some(&50)));
    assert_eq!(builder.contains_key(&6), Ok(false));
    assert_eq!(builder.len(), 999);

    let map = builder.build().unwrap();
    assert_eq!(map.len(), 999);
    assert_eq!(map.get(&5), Some(&50));
}

#[rstest]
fn test_transient_does_not_disturb_source() {
    let source: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
    let mut builder = source.clone().transient();
    builder.insert(0, -1).unwrap();
    builder.remove(&99).unwrap();
    let edited = builder.build().unwrap();

    assert_eq!(source.get(&0), Some(&0));
    assert_eq!(source.get(&99), Some(&99));
    assert_eq!(edited.get(&0), Some(&-1));
    assert_eq!(edited.get(&99), None);
}

#[rstest]
fn test_sealed_transient_rejects_everything() {
    let mut builder: TransientHashMap<i32, i32> = TransientHashMap::new();
    builder.insert(1, 1).unwrap();
    builder.build().unwrap();

    assert!(builder.is_sealed());
    assert_eq!(builder.insert(2, 2), Err(CollectionError::BuilderSealed));
    assert_eq!(builder.remove(&1), Err(CollectionError::BuilderSealed));
    assert_eq!(builder.get(&1), Err(CollectionError::BuilderSealed));
    assert_eq!(builder.insert_all([(3, 3)]), Err(CollectionError::BuilderSealed));
    assert!(builder.cursor().is_err());
    assert_eq!(builder.build(), Err(CollectionError::BuilderSealed));
}

#[rstest]
fn test_transient_extend() {
    let mut builder = TransientHashMap::new();
    builder.extend((0..10).map(|key| (key, key)));
    assert_eq!(builder.build().unwrap().len(), 10);
}
