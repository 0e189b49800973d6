use std::{cmp::Ordering, collections::BTreeSet, sync::Arc};

use super::{Nfa, StateId};
use crate::grammar::{DEFAULT_STATE, TokenId};

/// A canonical set of NFA states reached through one epsilon closure.  Two
/// composites built from equal sets are the same composite.
#[derive(Debug, Clone)]
pub struct CompositeStateSet {
    states: Arc<BTreeSet<StateId>>,
    ordered: Vec<StateId>,
    ordinal: Option<TokenId>,
    index: usize,
}

impl CompositeStateSet {
    /// # Panics
    /// This function panics if `states` is empty or contains a state with
    /// no character move.
    #[must_use]
    pub fn new(states: Arc<BTreeSet<StateId>>, nfa: &Nfa, index: usize) -> Self {
        assert!(!states.is_empty(), "Composite state set cannot be empty");

        let mut ordered: Vec<_> = states.iter().copied().collect();
        ordered.sort_by(|&a, &b| priority_cmp(nfa, a, b));
        let ordinal = states.iter().filter_map(|&s| next_accept(nfa, s)).min();

        Self {
            states,
            ordered,
            ordinal,
            index,
        }
    }

    #[inline]
    #[must_use]
    pub fn states(&self) -> &Arc<BTreeSet<StateId>> { &self.states }

    /// Member states, in emission order
    #[inline]
    #[must_use]
    pub fn ordered_states(&self) -> &[StateId] { &self.ordered }

    /// The highest-priority token any member can complete on its next move
    #[inline]
    #[must_use]
    pub fn ordinal(&self) -> Option<TokenId> { self.ordinal }

    #[inline]
    #[must_use]
    pub fn index(&self) -> usize { self.index }

    #[must_use]
    pub fn method_name(&self, lexical_state: &str) -> String {
        if lexical_state == DEFAULT_STATE {
            format!("NFA_{}", self.index)
        } else {
            format!("NFA_{lexical_state}_{}", self.index)
        }
    }
}

fn next_accept(nfa: &Nfa, id: StateId) -> Option<TokenId> {
    nfa.get(id).next().and_then(|n| nfa.get(n).accept())
}

/// Emission order of composite members: descending by the ordinal of the
/// token completed by the member's move (non-accepting moves first), then
/// ascending by the first range's bounds, then descending by range count
fn priority_cmp(nfa: &Nfa, a: StateId, b: StateId) -> Ordering {
    let ord = |s| next_accept(nfa, s).map_or(u32::MAX, |TokenId(t)| t);
    let (ra, rb) = (nfa.get(a).ranges(), nfa.get(b).ranges());
    let (fa, fb) = (ra[0], rb[0]);

    ord(b)
        .cmp(&ord(a))
        .then_with(|| fa.left().cmp(&fb.left()))
        .then_with(|| fa.right().cmp(&fb.right()))
        .then_with(|| rb.len().cmp(&ra.len()))
        .then_with(|| a.cmp(&b))
}
