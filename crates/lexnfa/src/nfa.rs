//! Arena-allocated Thompson NFA for a single lexical state

use indexmap::IndexSet;

use crate::{chars::CharRange, closure_builder::ClosureBuilder, grammar::TokenId};

pub mod builder;
pub mod composite;

/// Handle to a state in an [`Nfa`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(usize);

impl StateId {
    #[inline]
    #[must_use]
    pub fn id(self) -> usize { self.0 }
}

/// A single automaton vertex.  A state either consumes one character from
/// `ranges` and moves to `next`, or only has epsilon moves.
#[derive(Debug, Clone, Default)]
pub struct NfaState {
    ranges: Vec<CharRange>,
    next: Option<StateId>,
    epsilon: IndexSet<StateId>,
    accept: Option<TokenId>,
    index: Option<usize>,
    closure_done: bool,
}

impl NfaState {
    #[inline]
    #[must_use]
    pub fn ranges(&self) -> &[CharRange] { &self.ranges }

    #[inline]
    #[must_use]
    pub fn next(&self) -> Option<StateId> { self.next }

    /// Epsilon successors.  Once the closure has been computed this is the
    /// closure itself, restricted to states with character moves.
    #[inline]
    #[must_use]
    pub fn epsilon(&self) -> &IndexSet<StateId> { &self.epsilon }

    #[inline]
    #[must_use]
    pub fn accept(&self) -> Option<TokenId> { self.accept }

    /// Position in the emitted simple-state list, if this state survived
    /// pruning
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<usize> { self.index }

    #[inline]
    #[must_use]
    pub fn has_moves(&self) -> bool { !self.ranges.is_empty() }
}

#[derive(Debug, Clone)]
pub struct Nfa {
    states: Vec<NfaState>,
    initial: StateId,
}

impl Default for Nfa {
    fn default() -> Self { Self::new() }
}

impl Nfa {
    #[must_use]
    pub fn new() -> Self {
        let mut me = Self {
            states: vec![],
            initial: StateId(0),
        };
        me.initial = me.push();
        me
    }

    /// The state every pattern in this automaton is unioned into
    #[inline]
    #[must_use]
    pub fn initial(&self) -> StateId { self.initial }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize { self.states.len() }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool { self.states.is_empty() }

    #[inline]
    pub fn push(&mut self) -> StateId {
        let id = StateId(self.states.len());
        self.states.push(NfaState::default());
        id
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: StateId) -> &NfaState { &self.states[id.0] }

    pub fn states(&self) -> impl ExactSizeIterator<Item = (StateId, &NfaState)> {
        self.states.iter().enumerate().map(|(i, s)| (StateId(i), s))
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        let state = &mut self.states[from.0];
        assert!(
            !state.has_moves() && !state.closure_done,
            "Cannot add an epsilon move to {from:?}"
        );
        state.epsilon.insert(to);
    }

    /// Give `from` a character move over `ranges` to `to`
    pub fn set_moves(&mut self, from: StateId, ranges: Vec<CharRange>, to: StateId) {
        debug_assert!(crate::chars::is_canonical(&ranges));
        let state = &mut self.states[from.0];
        assert!(
            state.next.is_none() && state.epsilon.is_empty(),
            "State {from:?} already has outgoing moves"
        );
        state.ranges = ranges;
        state.next = Some(to);
    }

    pub fn set_accept(&mut self, id: StateId, tok: TokenId) {
        let prev = self.states[id.0].accept.replace(tok);
        assert!(prev.is_none(), "State {id:?} already accepts {prev:?}");
    }

    pub(crate) fn set_index(&mut self, id: StateId, index: usize) {
        self.states[id.0].index = Some(index);
    }

    /// Compute the epsilon closure of every state not yet closed.
    ///
    /// Each state adopts the accept type of the first member of its closure
    /// that has one, in breadth-first order starting with the state itself.
    /// The stored closure then drops every member without character moves.
    /// All closures are solved against the graph as it was before this
    /// call, so calling this again is a no-op.
    pub fn epsilon_closure(&mut self) {
        let mut builder = ClosureBuilder::default();
        let states = &self.states;

        let solved: Vec<_> = states
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.closure_done)
            .map(|(i, _)| {
                builder.init([StateId(i)]);
                let closure = builder.solve::<_, IndexSet<StateId>, _>(IndexSet::new(), |s| {
                    states[s.0].epsilon.iter().copied()
                });

                let accept = closure.iter().find_map(|s| states[s.0].accept);
                let kept: IndexSet<_> = closure
                    .into_iter()
                    .filter(|s| states[s.0].has_moves())
                    .collect();

                tracing::trace!(state = i, ?accept, closure = ?kept, "Solved epsilon closure");
                (i, kept, accept)
            })
            .collect();

        for (i, closure, accept) in solved {
            let state = &mut self.states[i];
            state.epsilon = closure;
            state.accept = accept;
            state.closure_done = true;
        }
    }

    /// True if `id` must be emitted with its own move table: it has a
    /// successor that either accepts or can continue matching
    ///
    /// # Panics
    /// This function panics if the epsilon closure has not been computed.
    #[must_use]
    pub fn is_move_code_needed(&self, id: StateId) -> bool {
        let state = self.get(id);
        assert!(state.closure_done, "Closure of {id:?} has not been computed");

        state.next.is_some_and(|n| {
            let next = self.get(n);
            next.accept.is_some() || !next.epsilon.is_empty()
        })
    }
}
