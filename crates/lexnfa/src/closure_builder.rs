use std::{
    borrow::BorrowMut,
    collections::{BTreeSet, VecDeque},
    hash::Hash,
};

use indexmap::IndexSet;

pub trait SetInsert<T> {
    fn insert(&mut self, t: T) -> bool;
}

impl<T: Eq + Hash> SetInsert<T> for IndexSet<T> {
    #[inline]
    fn insert(&mut self, t: T) -> bool { IndexSet::insert(self, t) }
}

impl<T: Ord> SetInsert<T> for BTreeSet<T> {
    #[inline]
    fn insert(&mut self, t: T) -> bool { BTreeSet::insert(self, t) }
}

/// Breadth-first worklist for computing transitive closures.  Elements are
/// inserted into the output set in the order they are first discovered.
#[derive(Debug)]
pub struct ClosureBuilder<T>(VecDeque<T>);

impl<T> Default for ClosureBuilder<T> {
    #[inline]
    fn default() -> Self { Self(VecDeque::new()) }
}

impl<T> ClosureBuilder<T> {
    #[inline]
    pub fn init<I: IntoIterator<Item = T>>(&mut self, it: I) {
        assert!(self.0.is_empty());
        self.extend(it);
    }
}

impl<T: Clone> ClosureBuilder<T> {
    pub fn solve<S: BorrowMut<U>, U: SetInsert<T>, I: IntoIterator<Item = T>>(
        &mut self,
        mut set: S,
        mut f: impl FnMut(T) -> I,
    ) -> S {
        {
            let set = set.borrow_mut();

            while let Some(el) = self.0.pop_front() {
                if set.insert(el.clone()) {
                    self.0.extend(f(el));
                }
            }
        }

        set
    }
}

impl<T> Extend<T> for ClosureBuilder<T> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, it: I) { self.0.extend(it); }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn discovery_order() {
        let edges: [&[usize]; 5] = [&[2, 1], &[3], &[1, 0], &[], &[0]];

        let mut b = ClosureBuilder::default();
        b.init([0]);
        let set = b.solve::<_, IndexSet<usize>, _>(IndexSet::new(), |n| edges[n].iter().copied());

        assert_eq!(set.into_iter().collect::<Vec<_>>(), [0, 2, 1, 3]);
    }
}
