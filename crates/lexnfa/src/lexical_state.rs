//! Assembly of the automaton for one lexical state

use std::{borrow::Cow, collections::BTreeSet, fmt::Write, sync::Arc};

use hashbrown::{HashMap, HashSet};
use indexmap::{IndexMap, IndexSet};

use crate::{
    chars::{self, ASCII_LIMIT, CharRange},
    closure_builder::ClosureBuilder,
    dot,
    error::BuildError,
    grammar::{DEFAULT_STATE, TokenId, TokenPattern},
    nfa::{
        Nfa, NfaState, StateId,
        builder::{NfaBuilder, RefTable},
        composite::CompositeStateSet,
    },
};

/// Where a simple state's character move leads, by emitted index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextState {
    /// The move completes a match (if any) but nothing can follow it
    Dead,
    Simple(usize),
    Composite(usize),
}

/// What a state's epsilon closure canonicalizes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Canonical {
    Dead,
    Simple(StateId),
    /// Index into the canonical set table
    Composite(usize),
}

#[derive(Debug)]
pub struct LexicalStateData {
    name: String,
    nfa: Nfa,
    tokens: Vec<TokenId>,
    canonical_sets: IndexSet<Arc<BTreeSet<StateId>>>,
    simple_states: Vec<StateId>,
    simple_next: Vec<NextState>,
    composites: Vec<CompositeStateSet>,
    case_sensitive_literals: IndexMap<String, TokenId>,
    case_insensitive_literals: IndexMap<String, TokenId>,
}

/// The closure of `id` restricted to states that are emitted
fn closure_members(nfa: &Nfa, id: StateId) -> BTreeSet<StateId> {
    nfa.get(id)
        .epsilon()
        .iter()
        .copied()
        .filter(|&s| nfa.is_move_code_needed(s))
        .collect()
}

fn intern(sets: &mut IndexSet<Arc<BTreeSet<StateId>>>, set: BTreeSet<StateId>) -> usize {
    if let Some(id) = sets.get_index_of(&set) {
        return id;
    }

    tracing::trace!(id = sets.len(), states = ?set, "New canonical composite");
    sets.insert_full(Arc::new(set)).0
}

fn canonicalize(
    nfa: &Nfa,
    sets: &mut IndexSet<Arc<BTreeSet<StateId>>>,
    id: StateId,
) -> Canonical {
    let members = closure_members(nfa, id);

    match members.len() {
        0 => Canonical::Dead,
        1 => Canonical::Simple(members.into_iter().next().unwrap_or_else(|| unreachable!())),
        _ => Canonical::Composite(intern(sets, members)),
    }
}

impl LexicalStateData {
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            nfa: Nfa::new(),
            tokens: vec![],
            canonical_sets: IndexSet::new(),
            simple_states: vec![],
            simple_next: vec![],
            composites: vec![],
            case_sensitive_literals: IndexMap::new(),
            case_insensitive_literals: IndexMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    #[inline]
    #[must_use]
    pub fn nfa(&self) -> &Nfa { &self.nfa }

    /// Non-private patterns active in this state, in priority order
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[TokenId] { &self.tokens }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool { self.tokens.is_empty() }

    /// Build every non-private pattern into this state's automaton, then
    /// close, canonicalize, prune and index it
    ///
    /// # Errors
    /// This function fails if a pattern contains an unresolvable reference
    /// or an invalid repetition range.
    pub fn process<'r, I: IntoIterator<Item = (TokenId, &'r TokenPattern)>>(
        &mut self,
        patterns: I,
        refs: &RefTable<'r>,
        ignore_case: bool,
    ) -> Result<(), BuildError> {
        let _span = tracing::debug_span!("process", state = %self.name).entered();

        for (tok, pattern) in patterns {
            if pattern.private {
                continue;
            }

            let ignore_case = ignore_case || pattern.ignore_case;
            NfaBuilder::new(&mut self.nfa, refs, ignore_case).build_states(&pattern.regex, tok)?;
            self.tokens.push(tok);

            if let Some(image) = pattern.regex.literal_image() {
                self.add_string_literal(image, ignore_case, tok);
            }
        }

        self.generate_data();

        tracing::debug!(
            tokens = self.tokens.len(),
            nfa_states = self.nfa.len(),
            simple_states = self.simple_states.len(),
            composites = self.composites.len(),
            canonical_sets = self.canonical_sets.len(),
            "Lexical state processed",
        );

        Ok(())
    }

    fn add_string_literal(&mut self, image: &str, ignore_case: bool, tok: TokenId) {
        if ignore_case {
            self.case_insensitive_literals
                .entry(image.to_uppercase())
                .or_insert(tok);
        } else {
            self.case_sensitive_literals
                .entry(image.to_owned())
                .or_insert(tok);
        }
    }

    fn generate_data(&mut self) {
        self.nfa.epsilon_closure();

        let nfa = &self.nfa;
        let sets = &mut self.canonical_sets;

        let canonical: Vec<_> = nfa
            .states()
            .map(|(id, _)| canonicalize(nfa, sets, id))
            .collect();

        // The initial state is always a composite, even with one member
        let initial = closure_members(nfa, nfa.initial());
        let initial = (!initial.is_empty()).then(|| intern(sets, initial));

        let mut walk = ClosureBuilder::default();
        walk.init(initial.map(Canonical::Composite));
        let reached = walk.solve::<_, IndexSet<Canonical>, _>(IndexSet::new(), |node| {
            let members: Vec<StateId> = match node {
                Canonical::Dead => unreachable!(),
                Canonical::Simple(s) => vec![s],
                Canonical::Composite(c) => sets[c].iter().copied().collect(),
            };

            members
                .into_iter()
                .filter_map(|s| nfa.get(s).next())
                .map(|n| canonical[n.id()])
                .filter(|&c| c != Canonical::Dead)
                .collect::<Vec<_>>()
        });

        let mut live = HashSet::new();
        let mut composite_index = HashMap::new();
        let mut composites = vec![];
        for &node in &reached {
            match node {
                Canonical::Dead => unreachable!(),
                Canonical::Simple(s) => {
                    live.insert(s);
                },
                Canonical::Composite(c) => {
                    live.extend(sets[c].iter().copied());
                    composite_index.insert(c, composites.len());
                    composites.push(CompositeStateSet::new(
                        Arc::clone(&sets[c]),
                        nfa,
                        composites.len(),
                    ));
                },
            }
        }
        debug_assert!(initial.is_none_or(|i| composite_index.get(&i) == Some(&0)));

        let simple_states: Vec<_> = nfa
            .states()
            .map(|(id, _)| id)
            .filter(|id| live.contains(id))
            .collect();
        let simple_index: HashMap<_, _> = simple_states
            .iter()
            .enumerate()
            .map(|(i, &s)| (s, i))
            .collect();

        let simple_next = simple_states
            .iter()
            .map(|&s| {
                let next = nfa.get(s).next().unwrap_or_else(|| unreachable!());
                match canonical[next.id()] {
                    Canonical::Dead => NextState::Dead,
                    Canonical::Simple(t) => NextState::Simple(simple_index[&t]),
                    Canonical::Composite(c) => NextState::Composite(composite_index[&c]),
                }
            })
            .collect();

        for (i, &s) in simple_states.iter().enumerate() {
            self.nfa.set_index(s, i);
        }

        self.simple_states = simple_states;
        self.simple_next = simple_next;
        self.composites = composites;
    }

    /// Emitted simple states, in index order
    pub fn simple_states(&self) -> impl ExactSizeIterator<Item = SimpleState<'_>> {
        (0..self.simple_states.len()).map(|index| SimpleState { data: self, index })
    }

    #[must_use]
    pub fn simple_state(&self, index: usize) -> SimpleState<'_> {
        assert!(index < self.simple_states.len(), "Simple state {index} out of range");
        SimpleState { data: self, index }
    }

    /// Reachable composites, in index order.  The first is the initial
    /// composite.
    #[inline]
    #[must_use]
    pub fn composites(&self) -> &[CompositeStateSet] { &self.composites }

    /// The start state of this lexical state, or `None` if no pattern can
    /// consume a character
    #[inline]
    #[must_use]
    pub fn initial_composite(&self) -> Option<&CompositeStateSet> { self.composites.first() }

    /// The members of `composite` as simple states, in emission order
    pub fn composite_states<'a>(
        &'a self,
        composite: &'a CompositeStateSet,
    ) -> impl Iterator<Item = SimpleState<'a>> + 'a {
        composite.ordered_states().iter().map(|&s| {
            let index = self
                .nfa
                .get(s)
                .index()
                .unwrap_or_else(|| panic!("Composite member {s:?} was not emitted"));
            SimpleState { data: self, index }
        })
    }

    /// Find the literal pattern matching `image` exactly, or ignoring case
    /// for case-insensitive literals
    #[must_use]
    pub fn string_literal(&self, image: &str) -> Option<TokenId> {
        self.case_sensitive_literals
            .get(image)
            .or_else(|| self.case_insensitive_literals.get(&image.to_uppercase()))
            .copied()
    }

    pub fn string_literals(&self) -> impl Iterator<Item = (&str, TokenId)> {
        self.case_sensitive_literals
            .iter()
            .chain(&self.case_insensitive_literals)
            .map(|(k, &v)| (k.as_str(), v))
    }

    fn naming_prefix(&self, kind: &str) -> String {
        if self.name == DEFAULT_STATE {
            format!("{kind}_")
        } else {
            format!("{kind}_{}_", self.name)
        }
    }

    /// Render the emitted automaton as a Graphviz digraph
    pub fn dot<'a>(&self, fmt_tok: impl Fn(TokenId) -> Cow<'a, str>) -> dot::Graph<'a> {
        let mut graph = dot::Graph::new(dot::GraphType::Directed);
        graph.label(self.name.clone());

        for comp in &self.composites {
            let id = format!("c{}", comp.index());
            let node = graph.node(id.clone());
            node.shape("box");
            node.label(comp.method_name(&self.name));

            for state in self.composite_states(comp) {
                graph.edge(id.clone(), format!("s{}", state.index())).style("dashed");
            }
        }

        for state in self.simple_states() {
            let id = format!("s{}", state.index());
            let mut label = String::new();
            for (i, range) in state.ranges().iter().enumerate() {
                if i > 0 {
                    label.push(' ');
                }
                write!(label, "{range:?}").unwrap_or_else(|_| unreachable!());
            }
            graph.node(id.clone()).label(label);

            let tok = state.next_type();
            let to = match state.next() {
                NextState::Dead => match tok {
                    Some(TokenId(t)) => {
                        let to = format!("a{t}");
                        graph.node(to.clone()).border_count("2");
                        to
                    },
                    None => continue,
                },
                NextState::Simple(s) => format!("s{s}"),
                NextState::Composite(c) => format!("c{c}"),
            };

            let edge = graph.edge(id, to);
            if let Some(tok) = tok {
                edge.label(fmt_tok(tok));
            }
        }

        if !self.composites.is_empty() {
            let start = graph.node("_start");
            start.style("invis");
            start.shape("point");
            start.label("");
            graph.edge("_start", "c0");
        }

        graph
    }
}

/// An emitted NFA state with its own move table
#[derive(Debug, Clone, Copy)]
pub struct SimpleState<'a> {
    data: &'a LexicalStateData,
    index: usize,
}

impl<'a> SimpleState<'a> {
    fn state(self) -> &'a NfaState { self.data.nfa.get(self.id()) }

    fn is(self, other: Self) -> bool {
        std::ptr::eq(self.data, other.data) && self.index == other.index
    }

    #[inline]
    #[must_use]
    pub fn id(self) -> StateId { self.data.simple_states[self.index] }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize { self.index }

    /// Sorted, non-overlapping move ranges.  Never empty.
    #[inline]
    #[must_use]
    pub fn ranges(self) -> &'a [CharRange] { self.state().ranges() }

    /// Ranges starting in the ASCII block
    #[inline]
    #[must_use]
    pub fn ascii_ranges(self) -> &'a [CharRange] { chars::split_ascii(self.ranges()).0 }

    #[inline]
    #[must_use]
    pub fn non_ascii_ranges(self) -> &'a [CharRange] { chars::split_ascii(self.ranges()).1 }

    #[inline]
    #[must_use]
    pub fn has_ascii_moves(self) -> bool {
        self.ranges().first().is_some_and(|r| r.left() < ASCII_LIMIT)
    }

    #[inline]
    #[must_use]
    pub fn has_non_ascii_moves(self) -> bool {
        self.ranges().last().is_some_and(|r| r.right() >= ASCII_LIMIT)
    }

    #[inline]
    #[must_use]
    pub fn accepts(self, c: char) -> bool { chars::contains(self.ranges(), c as u32) }

    #[inline]
    #[must_use]
    pub fn next(self) -> NextState { self.data.simple_next[self.index] }

    /// The token completed by taking this state's move
    #[must_use]
    pub fn next_type(self) -> Option<TokenId> {
        self.state()
            .next()
            .and_then(|n| self.data.nfa.get(n).accept())
    }

    #[must_use]
    pub fn moves_array_name(self) -> String {
        format!("{}{}", self.data.naming_prefix("NFA_MOVES"), self.index)
    }

    /// True if any of `others` is this state or shares a move character
    /// with it
    pub fn overlaps<I: IntoIterator<Item = SimpleState<'a>>>(self, others: I) -> bool {
        others
            .into_iter()
            .any(|o| o.is(self) || chars::intersects(self.ranges(), o.ranges()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{grammar::LexerGrammar, re::Regex};

    fn process(grammar: &LexerGrammar) -> LexicalStateData {
        let refs: RefTable = grammar
            .patterns
            .iter()
            .filter_map(|p| p.label.as_deref().map(|l| (l, &p.regex)))
            .collect();

        let mut data = LexicalStateData::new(DEFAULT_STATE);
        data.process(grammar.tokens(), &refs, grammar.ignore_case)
            .unwrap();
        data
    }

    fn ident() -> Regex {
        Regex::Seq(vec![
            Regex::any_of(['a'..='z']),
            Regex::any_of(['a'..='z', '0'..='9']).star(),
        ])
    }

    #[test]
    fn keyword_wins_initial_composite() {
        let data = process(&LexerGrammar::new([
            TokenPattern::labeled("I", "i"),
            TokenPattern::labeled("IDENT", ident()),
        ]));

        let init = data.initial_composite().unwrap();
        assert_eq!(init.index(), 0);
        assert_eq!(init.ordinal(), Some(TokenId(1)));
        assert_eq!(init.states().len(), 2);

        // The keyword's move completes the higher-priority token, so it
        // sorts after the identifier's
        let types: Vec<_> = data.composite_states(init).map(|s| s.next_type()).collect();
        assert_eq!(types, [Some(TokenId(2)), Some(TokenId(1))]);
    }

    #[test]
    fn keyword_wins_after_shared_prefix() {
        let data = process(&LexerGrammar::new([
            TokenPattern::labeled("IF", "if"),
            TokenPattern::labeled("IDENT", ident()),
        ]));

        // A lone "i" only completes an identifier
        let init = data.initial_composite().unwrap();
        assert_eq!(init.ordinal(), Some(TokenId(2)));

        let after_i: Vec<_> = data
            .composite_states(init)
            .filter(|s| s.accepts('i'))
            .map(|s| match s.next() {
                NextState::Simple(n) => data.simple_state(n),
                next => panic!("Unexpected successor {next:?}"),
            })
            .collect();
        assert_eq!(after_i.len(), 2);

        let completed: Vec<_> = after_i
            .iter()
            .filter(|s| s.accepts('f'))
            .map(|s| s.next_type())
            .collect();
        assert_eq!(completed.len(), 2);
        assert!(completed.contains(&Some(TokenId(2))));
        assert_eq!(completed.into_iter().flatten().min(), Some(TokenId(1)));
    }

    #[test]
    fn composite_dedup() {
        let data = process(&LexerGrammar::new([TokenPattern::new(Regex::Seq(vec![
            Regex::Alt(vec!["ab".into(), "cd".into()]).star(),
            "x".into(),
        ]))]));

        // Every loop iteration returns to the same {a, c, x} set
        assert_eq!(data.composites().len(), 1);
        let init = data.initial_composite().unwrap();
        assert_eq!(init.states().len(), 3);

        for s in data.simple_states() {
            match s.ranges() {
                [r] if *r == CharRange::char('b') || *r == CharRange::char('d') => {
                    assert_eq!(s.next(), NextState::Composite(0));
                },
                [r] if *r == CharRange::char('x') => assert_eq!(s.next(), NextState::Dead),
                _ => (),
            }
        }
    }

    #[test]
    fn equal_alternatives_share_a_composite() {
        let data = process(&LexerGrammar::new([TokenPattern::new(Regex::Seq(vec![
            Regex::Alt(vec!["aa".into(), "aa".into()]),
            "b".into(),
        ]))]));

        assert_eq!(data.composites().len(), 1);
        assert_eq!(data.initial_composite().unwrap().states().len(), 2);
    }

    #[test]
    fn literal_chain_prefix() {
        let data = process(&LexerGrammar::new([TokenPattern::new("cat")]));

        assert_eq!(data.simple_states().len(), 3);
        let init = data.initial_composite().unwrap();
        let [c] = data.composite_states(init).collect::<Vec<_>>()[..] else {
            panic!()
        };

        let mut state = c;
        for (i, ch) in "cats".chars().enumerate() {
            if i == 3 {
                assert!(!state.accepts(ch));
                break;
            }

            assert!(state.accepts(ch));
            match state.next() {
                NextState::Simple(n) => {
                    assert_eq!(state.next_type(), None);
                    state = data.simple_state(n);
                },
                NextState::Dead => {
                    assert_eq!(i, 2);
                    assert_eq!(state.next_type(), Some(TokenId(1)));
                },
                NextState::Composite(_) => panic!(),
            }
        }
    }

    #[test]
    fn unreached_composites_are_dropped() {
        let data = process(&LexerGrammar::new([
            TokenPattern::new(Regex::Seq(vec![
                Regex::BOTTOM,
                Regex::Alt(vec!["ab".into(), "cd".into()]),
            ])),
            TokenPattern::new("x"),
        ]));

        assert!(data.canonical_sets.len() > data.composites().len());
        assert_eq!(data.composites().len(), 1);
        assert_eq!(data.simple_states().len(), 1);
        assert_eq!(data.simple_state(0).ranges(), [CharRange::char('x')]);
    }

    #[test]
    fn private_reference_is_reachable() {
        let data = process(&LexerGrammar::new([
            TokenPattern::labeled("DIGIT", Regex::any_of(['0'..='9'])).private(),
            TokenPattern::labeled("NUM", Regex::reference("DIGIT").plus()),
        ]));

        assert_eq!(data.tokens(), [TokenId(2)]);
        let init = data.initial_composite().unwrap();
        let [digit] = data.composite_states(init).collect::<Vec<_>>()[..] else {
            panic!()
        };
        assert_eq!(digit.ranges(), [CharRange::chars('0', '9')]);
        assert_eq!(digit.next_type(), Some(TokenId(2)));
        assert_eq!(digit.next(), NextState::Simple(digit.index()));
    }

    #[test]
    fn empty_state_is_degenerate() {
        let data = process(&LexerGrammar::new([
            TokenPattern::new(Regex::any_of(['a'..='z'])).private(),
        ]));

        assert!(data.is_empty());
        assert!(data.initial_composite().is_none());
        assert_eq!(data.simple_states().len(), 0);
    }

    #[test]
    fn literal_tables() {
        let data = process(&LexerGrammar::new([
            TokenPattern::new("while"),
            TokenPattern::new("select").ignore_case(),
            TokenPattern::new("while"),
            TokenPattern::new(Regex::any_of(['a'..='z']).plus()),
        ]));

        assert_eq!(data.string_literal("while"), Some(TokenId(1)));
        assert_eq!(data.string_literal("WHILE"), None);
        assert_eq!(data.string_literal("SeLeCt"), Some(TokenId(2)));
        assert_eq!(data.string_literals().count(), 2);
    }

    #[test]
    fn ascii_split_and_names() {
        let data = process(&LexerGrammar::new([TokenPattern::new(Regex::any_of([
            'a'..='z',
            'é'..='ö',
        ]))]));

        let s = data.simple_state(0);
        assert_eq!(s.ascii_ranges(), [CharRange::chars('a', 'z')]);
        assert_eq!(s.non_ascii_ranges(), [CharRange::chars('é', 'ö')]);
        assert!(s.has_ascii_moves());
        assert!(s.has_non_ascii_moves());
        assert_eq!(s.moves_array_name(), "NFA_MOVES_0");
        assert!(s.overlaps([s]));

        let mut other = LexicalStateData::new("COMMENT");
        other
            .process([(TokenId(1), &TokenPattern::new("*/"))], &RefTable::new(), false)
            .unwrap();
        let star = other.simple_state(0);
        assert_eq!(star.moves_array_name(), "NFA_MOVES_COMMENT_0");
        assert_eq!(
            other.initial_composite().unwrap().method_name(other.name()),
            "NFA_COMMENT_0"
        );
        assert!(!s.overlaps([star]));
    }

    #[test]
    fn dot_output() {
        let data = process(&LexerGrammar::new([TokenPattern::new("ab")]));
        let dot = data.dot(|t| t.to_string().into()).to_string();

        assert!(dot.starts_with("digraph {label=\"DEFAULT\";"));
        assert!(dot.contains("\"c0\"->\"s0\""));
        assert!(dot.contains("\"_start\"->\"c0\""));
    }
}
