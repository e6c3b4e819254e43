use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use vista_ir::{ParameterSpec, Value};

use super::*;
use crate::native::ListProvider;

fn provider(name: &str, size: usize) -> MaterializedProvider {
    let values: Vec<Value> = (0..size)
        .map(|i| Value::Int(i64::try_from(i).unwrap()))
        .collect();
    MaterializedProvider::new(
        ParameterSpec::new(name, "int", "test.Ints"),
        values.clone(),
        Arc::new(ListProvider::new(values)),
    )
}

fn collect(sizes: &[usize]) -> Vec<Vec<usize>> {
    IndexProduct::new(sizes).map(|t| t.to_vec()).collect()
}

#[test]
fn zero_providers_yield_one_empty_combination() {
    let all: Vec<_> = combinations(&[]).collect();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_empty());
}

#[test]
fn single_provider_enumerates_directly() {
    let providers = [provider("a", 3)];
    let indices: Vec<Vec<usize>> = combinations(&providers)
        .map(|c| c.indices().collect())
        .collect();
    assert_eq!(indices, vec![vec![0], vec![1], vec![2]]);
}

#[test]
fn rightmost_index_varies_fastest() {
    assert_eq!(
        collect(&[2, 3]),
        vec![
            vec![0, 0],
            vec![0, 1],
            vec![0, 2],
            vec![1, 0],
            vec![1, 1],
            vec![1, 2],
        ]
    );
}

#[test]
fn combination_carries_values_and_indices() {
    let providers = [provider("a", 2), provider("b", 2)];
    let last = combinations(&providers).last().unwrap();
    assert_eq!(last.to_args(), vec![Value::Int(1), Value::Int(1)]);
    assert_eq!(last.indices().collect::<Vec<_>>(), vec![1, 1]);
}

#[test]
fn empty_size_yields_nothing() {
    assert!(collect(&[3, 0, 2]).is_empty());
}

#[test]
fn total_saturates() {
    assert_eq!(total_combinations([3, 2]), 6);
    assert_eq!(total_combinations(std::iter::empty()), 1);
    assert_eq!(total_combinations([usize::MAX, 2]), usize::MAX);
}

proptest! {
    #[test]
    fn count_is_product_of_sizes(sizes in prop::collection::vec(1usize..5, 0..5)) {
        let expected: usize = sizes.iter().product();
        prop_assert_eq!(IndexProduct::new(&sizes).count(), expected);
        prop_assert_eq!(total_combinations(sizes.iter().copied()), expected);
    }

    #[test]
    fn tuples_are_lexicographically_increasing(sizes in prop::collection::vec(1usize..4, 1..5)) {
        let tuples = collect(&sizes);
        for pair in tuples.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for tuple in &tuples {
            for (index, size) in tuple.iter().zip(&sizes) {
                prop_assert!(index < size);
            }
        }
    }
}
