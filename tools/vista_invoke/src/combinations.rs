//! Lazy cartesian product over materialized providers.
//!
//! Ordering contract: the rightmost parameter's index varies fastest, the
//! same order a nested `for` loop over the parameters would produce.
//!
//! ```text
//! sizes [2, 3] ──► (0,0) (0,1) (0,2) (1,0) (1,1) (1,2)
//! ```

use smallvec::SmallVec;
use vista_ir::Value;

use crate::materialize::MaterializedProvider;

type Indices = SmallVec<[usize; 4]>;

/// Product of all sizes, saturating instead of overflowing.
pub fn total_combinations<I>(sizes: I) -> usize
where
    I: IntoIterator<Item = usize>,
{
    sizes.into_iter().fold(1, usize::saturating_mul)
}

/// Odometer over index tuples for the given sizes.
///
/// Zero sizes yield exactly one empty tuple. Any zero size yields nothing.
#[derive(Clone, Debug)]
pub struct IndexProduct {
    sizes: Indices,
    next: Option<Indices>,
}

impl IndexProduct {
    pub fn new(sizes: &[usize]) -> Self {
        let next = if sizes.contains(&0) {
            None
        } else {
            Some(SmallVec::from_elem(0, sizes.len()))
        };
        IndexProduct {
            sizes: SmallVec::from_slice(sizes),
            next,
        }
    }
}

impl Iterator for IndexProduct {
    type Item = Indices;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;

        let mut advanced = current.clone();
        let mut position = advanced.len();
        while position > 0 {
            position -= 1;
            advanced[position] += 1;
            if advanced[position] < self.sizes[position] {
                self.next = Some(advanced);
                return Some(current);
            }
            advanced[position] = 0;
        }

        // Every position wrapped: `current` was the last tuple.
        Some(current)
    }
}

/// One value per parameter, with the index it came from.
#[derive(Clone, Debug)]
pub struct Combination<'a> {
    entries: SmallVec<[(&'a Value, usize); 4]>,
}

impl<'a> Combination<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(&'a Value, usize)] {
        &self.entries
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(_, index)| *index)
    }

    /// Owned argument list for invocation.
    pub fn to_args(&self) -> Vec<Value> {
        self.entries.iter().map(|(value, _)| (*value).clone()).collect()
    }
}

/// Lazy iterator returned by `combinations`.
pub struct Combinations<'a> {
    providers: &'a [MaterializedProvider],
    indices: IndexProduct,
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Combination<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.indices.next()?;
        let entries = self
            .providers
            .iter()
            .zip(indices)
            .map(|(provider, index)| (&provider.values()[index], index))
            .collect();
        Some(Combination { entries })
    }
}

/// Every combination of the providers' values, generated on demand.
pub fn combinations(providers: &[MaterializedProvider]) -> Combinations<'_> {
    let sizes: Indices = providers.iter().map(MaterializedProvider::len).collect();
    Combinations {
        providers,
        indices: IndexProduct::new(&sizes),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
