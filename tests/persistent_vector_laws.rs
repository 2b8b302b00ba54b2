#![cfg(feature = "persistent")]
//! Property-based tests for PersistentVector.
//!
//! The vector is checked against `Vec` as a model for concat, slice, push
//! and pop, and against itself for builder equivalence.

use figura_collections::persistent::{PersistentVector, TransientVector};
use proptest::prelude::*;

fn arbitrary_elements() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(any::<i32>(), 0..2000)
}

#[derive(Debug, Clone)]
enum Edit {
    PushBack(i32),
    PushFront(i32),
    PopBack,
    Concat(Vec<i32>),
    Slice(usize, usize),
    Update(usize, i32),
}

fn arbitrary_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        4 => any::<i32>().prop_map(Edit::PushBack),
        1 => any::<i32>().prop_map(Edit::PushFront),
        2 => Just(Edit::PopBack),
        2 => prop::collection::vec(any::<i32>(), 0..100).prop_map(Edit::Concat),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(start, end)| Edit::Slice(start, end)),
        1 => (any::<usize>(), any::<i32>()).prop_map(|(index, value)| Edit::Update(index, value)),
    ]
}

proptest! {
    #[test]
    fn prop_concat_law(left in arbitrary_elements(), right in arbitrary_elements()) {
        let left_vector: PersistentVector<i32> = left.iter().copied().collect();
        let right_vector: PersistentVector<i32> = right.iter().copied().collect();
        let joined = left_vector.concat(&right_vector);

        prop_assert_eq!(joined.len(), left.len() + right.len());
        for index in 0..left.len() {
            prop_assert_eq!(joined.get(index), left_vector.get(index));
        }
        for index in left.len()..joined.len() {
            prop_assert_eq!(joined.get(index), right_vector.get(index - left.len()));
        }
    }

    #[test]
    fn prop_slice_matches_model(
        elements in arbitrary_elements(),
        start in any::<prop::sample::Index>(),
        end in any::<prop::sample::Index>()
    ) {
        let vector: PersistentVector<i32> = elements.iter().copied().collect();
        let bound = elements.len() + 1;
        let (start, end) = {
            let (first, second) = (start.index(bound), end.index(bound));
            (first.min(second), first.max(second))
        };

        let sliced = vector.slice(start, end).unwrap();
        prop_assert_eq!(sliced.iter().copied().collect::<Vec<_>>(), elements[start..end].to_vec());
    }

    #[test]
    fn prop_round_trip_through_iterator(elements in arbitrary_elements()) {
        let vector: PersistentVector<i32> = elements.iter().copied().collect();
        let rebuilt: PersistentVector<i32> = vector.clone().into_iter().collect();
        prop_assert_eq!(rebuilt, vector);
    }

    #[test]
    fn prop_edits_match_vec_model(edits in prop::collection::vec(arbitrary_edit(), 0..120)) {
        let mut model: Vec<i32> = Vec::new();
        let mut vector = PersistentVector::new();

        for edit in edits {
            match edit {
                Edit::PushBack(value) => {
                    model.push(value);
                    vector = vector.push_back(value);
                }
                Edit::PushFront(value) => {
                    model.insert(0, value);
                    vector = vector.push_front(value);
                }
                Edit::PopBack => {
                    let expected = model.pop();
                    match vector.pop_back() {
                        Some((remaining, value)) => {
                            prop_assert_eq!(Some(value), expected);
                            vector = remaining;
                        }
                        None => prop_assert_eq!(expected, None),
                    }
                }
                Edit::Concat(suffix) => {
                    let other: PersistentVector<i32> = suffix.iter().copied().collect();
                    model.extend(suffix);
                    vector = vector.concat(&other);
                }
                Edit::Slice(first, second) => {
                    let bound = model.len() + 1;
                    let (start, end) = {
                        let (first, second) = (first % bound, second % bound);
                        (first.min(second), first.max(second))
                    };
                    model = model[start..end].to_vec();
                    vector = vector.slice(start, end).unwrap();
                }
                Edit::Update(index, value) => {
                    if model.is_empty() {
                        prop_assert!(vector.update(index, value).is_err());
                    } else {
                        let index = index % model.len();
                        model[index] = value;
                        vector = vector.update(index, value).unwrap();
                    }
                }
            }
            prop_assert_eq!(vector.len(), model.len());
        }

        prop_assert_eq!(vector.iter().copied().collect::<Vec<_>>(), model);
    }

    #[test]
    fn prop_builder_matches_one_at_a_time(elements in arbitrary_elements(), pops in 0_usize..50) {
        let mut persistent = PersistentVector::new();
        let mut builder = TransientVector::new();
        for &element in &elements {
            persistent = persistent.push_back(element);
            builder.push_back(element).unwrap();
        }
        for _ in 0..pops {
            if let Some((remaining, _)) = persistent.pop_back() {
                persistent = remaining;
            }
            builder.pop_back().unwrap();
        }

        prop_assert_eq!(builder.build().unwrap(), persistent);
    }
}
