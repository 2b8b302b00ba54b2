#![cfg(feature = "persistent")]
//! Unit tests for PersistentVector and TransientVector.

use figura_collections::persistent::{PersistentVector, TransientVector};
use figura_collections::CollectionError;
use rstest::rstest;

fn range_vector(start: usize, end: usize) -> PersistentVector<usize> {
    (start..end).collect()
}

fn to_vec(vector: &PersistentVector<usize>) -> Vec<usize> {
    vector.iter().copied().collect()
}

// =============================================================================
// Basic access
// =============================================================================

#[rstest]
fn test_new_creates_empty_vector() {
    let vector: PersistentVector<i32> = PersistentVector::new();
    assert!(vector.is_empty());
    assert_eq!(vector.first(), None);
    assert_eq!(vector.last(), None);
    assert!(vector.pop_back().is_none());
}

#[rstest]
fn test_singleton() {
    let vector = PersistentVector::singleton("only");
    assert_eq!(vector.len(), 1);
    assert_eq!(vector.first(), Some(&"only"));
    assert_eq!(vector.last(), Some(&"only"));
}

#[rstest]
#[case(31)]
#[case(32)]
#[case(33)]
#[case(1024)]
#[case(1056)]
#[case(1057)]
#[case(40_000)]
fn test_get_across_level_boundaries(#[case] length: usize) {
    let vector = range_vector(0, length);
    assert_eq!(vector.len(), length);
    assert_eq!(vector.first(), Some(&0));
    assert_eq!(vector.last(), Some(&(length - 1)));
    for index in (0..length).step_by(7) {
        assert_eq!(vector.get(index), Some(&index));
    }
}

// =============================================================================
// Structural sharing
// =============================================================================

#[rstest]
fn test_push_back_preserves_original() {
    let original = range_vector(0, 100);
    let extended = original.push_back(100);
    assert_eq!(original.len(), 100);
    assert_eq!(original.get(100), None);
    assert_eq!(extended.get(100), Some(&100));
}

#[rstest]
#[case(0)]
#[case(40)]
#[case(99)]
fn test_update_preserves_original(#[case] index: usize) {
    let original = range_vector(0, 100);
    let updated = original.update(index, 1000).unwrap();
    assert_eq!(original.get(index), Some(&index));
    assert_eq!(updated.get(index), Some(&1000));
    assert_eq!(updated.len(), 100);
}

#[rstest]
fn test_update_out_of_range() {
    let vector = range_vector(0, 10);
    assert_eq!(
        vector.update(10, 0),
        Err(CollectionError::IndexOutOfBounds {
            index: 10,
            length: 10
        })
    );
}

// =============================================================================
// Concat / slice
// =============================================================================

#[rstest]
#[case(0, 0)]
#[case(1, 1)]
#[case(31, 33)]
#[case(33, 31)]
#[case(1000, 1)]
#[case(1, 1000)]
#[case(1057, 2049)]
fn test_concat_preserves_order(#[case] left: usize, #[case] right: usize) {
    let joined = range_vector(0, left).concat(&range_vector(left, left + right));
    assert_eq!(joined.len(), left + right);
    assert_eq!(to_vec(&joined), (0..left + right).collect::<Vec<_>>());
}

#[rstest]
fn test_concat_of_many_small_vectors() {
    let mut vector = PersistentVector::new();
    for chunk in 0..200 {
        vector = vector.concat(&range_vector(chunk * 7, chunk * 7 + 7));
    }
    assert_eq!(to_vec(&vector), (0..1400).collect::<Vec<_>>());
}

#[rstest]
fn test_concat_then_push_and_pop() {
    let joined = range_vector(0, 45).concat(&range_vector(45, 100));
    let pushed = joined.push_back(100);
    assert_eq!(pushed.get(100), Some(&100));

    let (popped, last) = pushed.pop_back().unwrap();
    assert_eq!(last, 100);
    assert_eq!(popped, joined);
}

#[rstest]
#[case(0, 0)]
#[case(0, 1)]
#[case(1, 1000)]
#[case(32, 64)]
#[case(500, 533)]
#[case(999, 1000)]
#[case(0, 1000)]
fn test_slice(#[case] start: usize, #[case] end: usize) {
    let vector = range_vector(0, 1000);
    let sliced = vector.slice(start, end).unwrap();
    assert_eq!(to_vec(&sliced), (start..end).collect::<Vec<_>>());
}

#[rstest]
fn test_slice_of_slice_and_concat_back() {
    let vector = range_vector(0, 3000);
    let middle = vector.slice(100, 2900).unwrap().slice(50, 2700).unwrap();
    assert_eq!(middle.first(), Some(&150));
    assert_eq!(middle.len(), 2650);

    let (left, right) = middle.split_at(1234);
    assert_eq!(left.concat(&right), middle);
}

#[rstest]
#[case(10, 5)]
#[case(0, 11)]
fn test_slice_rejects_invalid_range(#[case] start: usize, #[case] end: usize) {
    let vector = range_vector(0, 10);
    assert_eq!(
        vector.slice(start, end),
        Err(CollectionError::InvalidRange {
            start,
            end,
            length: 10
        })
    );
}

#[rstest]
fn test_take_and_drop_first() {
    let vector = range_vector(0, 100);
    assert_eq!(to_vec(&vector.take(10)), (0..10).collect::<Vec<_>>());
    assert_eq!(to_vec(&vector.drop_first(90)), (90..100).collect::<Vec<_>>());
    assert!(vector.drop_first(200).is_empty());
    assert_eq!(vector.take(200), vector);
}

#[rstest]
fn test_push_front() {
    let vector = range_vector(1, 100).push_front(0);
    assert_eq!(to_vec(&vector), (0..100).collect::<Vec<_>>());
}

// =============================================================================
// Iteration
// =============================================================================

#[rstest]
fn test_iter_forward_and_backward() {
    let vector = range_vector(0, 1500);
    let reversed: Vec<usize> = vector.iter().rev().copied().collect();
    assert_eq!(reversed, (0..1500).rev().collect::<Vec<_>>());
    assert_eq!(vector.iter().len(), 1500);
}

#[rstest]
fn test_into_iter_over_sliced_vector() {
    let sliced = range_vector(0, 200).slice(17, 150).unwrap();
    let owned: Vec<usize> = sliced.clone().into_iter().collect();
    assert_eq!(owned, (17..150).collect::<Vec<_>>());

    let backwards: Vec<usize> = sliced.into_iter().rev().collect();
    assert_eq!(backwards.first(), Some(&149));
}

#[rstest]
fn test_debug_format() {
    let vector: PersistentVector<i32> = (1..=3).collect();
    assert_eq!(format!("{vector:?}"), "[1, 2, 3]");
}

// =============================================================================
// Transient
// =============================================================================

#[rstest]
fn test_transient_push_set_pop() {
    let mut builder = TransientVector::new();
    builder.push_back_all(0..100_usize).unwrap();
    assert_eq!(builder.set(50, 500), Ok(50));
    assert_eq!(builder.set(100, 0), Err(CollectionError::IndexOutOfBounds {
        index: 100,
        length: 100
    }));
    assert_eq!(builder.pop_back(), Ok(Some(99)));

    let vector = builder.build().unwrap();
    assert_eq!(vector.len(), 99);
    assert_eq!(vector.get(50), Some(&500));
}

#[rstest]
fn test_transient_from_persistent_leaves_source_alone() {
    let source = range_vector(0, 100);
    let mut builder = source.clone().transient();
    builder.set(0, 7).unwrap();
    builder.push_back(100).unwrap();
    let edited = builder.build().unwrap();

    assert_eq!(source.get(0), Some(&0));
    assert_eq!(source.len(), 100);
    assert_eq!(edited.get(0), Some(&7));
    assert_eq!(edited.len(), 101);
}

#[rstest]
fn test_transient_pop_to_empty() {
    let mut builder = range_vector(0, 70).transient();
    for expected in (0..70).rev() {
        assert_eq!(builder.pop_back(), Ok(Some(expected)));
    }
    assert_eq!(builder.pop_back(), Ok(None));
    assert!(builder.build().unwrap().is_empty());
}

#[rstest]
fn test_sealed_transient_vector() {
    let mut builder: TransientVector<i32> = TransientVector::new();
    builder.build().unwrap();
    assert_eq!(builder.push_back(1), Err(CollectionError::BuilderSealed));
    assert_eq!(builder.pop_back(), Err(CollectionError::BuilderSealed));
    assert_eq!(builder.get(0), Err(CollectionError::BuilderSealed));
    assert_eq!(builder.build(), Err(CollectionError::BuilderSealed));
}
