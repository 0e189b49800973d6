use hashbrown::HashMap;

use super::{Nfa, StateId};
use crate::{
    chars::{self, CharRange},
    error::BuildError,
    grammar::TokenId,
    re::{CharList, Regex},
};

/// Patterns that may be named by [`Regex::Ref`], keyed by label
pub type RefTable<'a> = HashMap<&'a str, &'a Regex>;

enum Alternative<'a> {
    Regex(&'a Regex),
    Ranges(Vec<CharRange>),
}

/// Thompson construction of regex trees into an [`Nfa`]
#[derive(Debug)]
pub struct NfaBuilder<'a, 'r> {
    nfa: &'a mut Nfa,
    refs: &'a RefTable<'r>,
    ignore_case: bool,
    resolving: Vec<&'r str>,
}

impl<'a, 'r> NfaBuilder<'a, 'r> {
    #[must_use]
    pub fn new(nfa: &'a mut Nfa, refs: &'a RefTable<'r>, ignore_case: bool) -> Self {
        Self {
            nfa,
            refs,
            ignore_case,
            resolving: vec![],
        }
    }

    /// Build `regex` as a pattern for `tok`, unioning it into the
    /// automaton's initial state
    ///
    /// # Errors
    /// This function fails if `regex` contains an unresolvable reference or
    /// an invalid repetition range.
    pub fn build_states(&mut self, regex: &Regex, tok: TokenId) -> Result<(), BuildError> {
        let (start, end) = self.build(regex)?;
        self.nfa.set_accept(end, tok);
        self.nfa.add_epsilon(self.nfa.initial(), start);
        Ok(())
    }

    /// Build `regex`, returning its start and end states
    ///
    /// # Errors
    /// This function fails if `regex` contains an unresolvable reference or
    /// an invalid repetition range.
    pub fn build(&mut self, regex: &Regex) -> Result<(StateId, StateId), BuildError> {
        match regex {
            Regex::Lit(s) => Ok(self.build_lit(s)),
            Regex::Chars(l) => Ok(self.build_ranges(self.resolve_list(l))),
            Regex::Seq(units) => {
                if let [unit] = &**units {
                    return self.build(unit);
                }

                let start = self.nfa.push();
                let end = self.nfa.push();
                let mut prev = start;
                for unit in units {
                    let (s, e) = self.build(unit)?;
                    self.nfa.add_epsilon(prev, s);
                    prev = e;
                }
                self.nfa.add_epsilon(prev, end);

                Ok((start, end))
            },
            Regex::Alt(alts) => {
                let mut alts = self.compress_choice(alts);
                if alts.len() == 1 {
                    return self.build_alternative(alts.swap_remove(0));
                }

                let start = self.nfa.push();
                let end = self.nfa.push();
                for alt in alts {
                    let (s, e) = self.build_alternative(alt)?;
                    self.nfa.add_epsilon(start, s);
                    self.nfa.add_epsilon(e, end);
                }

                Ok((start, end))
            },
            Regex::Star(r) => {
                let start = self.nfa.push();
                let end = self.nfa.push();
                let (s, e) = self.build(r)?;
                self.nfa.add_epsilon(start, s);
                self.nfa.add_epsilon(start, end);
                self.nfa.add_epsilon(e, end);
                self.nfa.add_epsilon(e, s);
                Ok((start, end))
            },
            Regex::Plus(r) => {
                let start = self.nfa.push();
                let end = self.nfa.push();
                let (s, e) = self.build(r)?;
                self.nfa.add_epsilon(start, s);
                self.nfa.add_epsilon(e, s);
                self.nfa.add_epsilon(e, end);
                Ok((start, end))
            },
            Regex::Opt(r) => {
                let start = self.nfa.push();
                let end = self.nfa.push();
                let (s, e) = self.build(r)?;
                self.nfa.add_epsilon(start, s);
                self.nfa.add_epsilon(start, end);
                self.nfa.add_epsilon(e, end);
                Ok((start, end))
            },
            Regex::Repeat { inner, min, max } => {
                self.build(&Self::desugar_repeat(inner, *min, *max)?)
            },
            Regex::Ref(name) => {
                let Some((&name, &target)) = self.refs.get_key_value(name.as_str()) else {
                    return Err(BuildError::UnknownReference(name.clone()));
                };

                if self.resolving.contains(&name) {
                    return Err(BuildError::RecursiveReference(name.to_owned()));
                }

                self.resolving.push(name);
                let ret = self.build(target);
                self.resolving.pop();
                ret
            },
        }
    }

    fn build_lit(&mut self, s: &str) -> (StateId, StateId) {
        let start = self.nfa.push();
        let mut state = start;

        // A one-character literal comes out the same shape as a one-range
        // character list
        for c in s.chars() {
            let next = self.nfa.push();
            self.nfa
                .set_moves(state, chars::char_moves(c, self.ignore_case), next);
            state = next;
        }

        (start, state)
    }

    fn build_ranges(&mut self, ranges: Vec<CharRange>) -> (StateId, StateId) {
        let start = self.nfa.push();
        let end = self.nfa.push();

        // An empty set matches nothing, so leave the start state dead
        if !ranges.is_empty() {
            self.nfa.set_moves(start, ranges, end);
        }

        (start, end)
    }

    fn build_alternative(&mut self, alt: Alternative) -> Result<(StateId, StateId), BuildError> {
        match alt {
            Alternative::Regex(r) => self.build(r),
            Alternative::Ranges(r) => Ok(self.build_ranges(r)),
        }
    }

    /// Case-expand, then negate, the ranges of a character list
    fn resolve_list(&self, list: &CharList) -> Vec<CharRange> {
        let mut ranges = chars::sort_and_merge(list.ranges.iter().copied());

        if self.ignore_case {
            ranges = chars::case_expand(&ranges);
        }

        if list.negated {
            ranges = chars::negate(&ranges);
        }

        ranges
    }

    /// Flatten nested choices and merge every single-character alternative
    /// into one character-list alternative, placed where the first of them
    /// appeared
    fn compress_choice<'b>(&self, alts: &'b [Regex]) -> Vec<Alternative<'b>> {
        fn flatten<'b>(alts: &'b [Regex], out: &mut Vec<&'b Regex>) {
            for alt in alts {
                match alt {
                    Regex::Alt(a) => flatten(a, out),
                    r => out.push(r),
                }
            }
        }

        let mut flat = vec![];
        flatten(alts, &mut flat);

        let mut out = Vec::with_capacity(flat.len());
        let mut merged: Option<(usize, Vec<CharRange>)> = None;

        for alt in flat {
            let ranges = match alt {
                Regex::Chars(l) => self.resolve_list(l),
                Regex::Lit(s) => {
                    let mut it = s.chars();
                    match (it.next(), it.next()) {
                        (Some(c), None) => chars::char_moves(c, self.ignore_case),
                        _ => {
                            out.push(Alternative::Regex(alt));
                            continue;
                        },
                    }
                },
                _ => {
                    out.push(Alternative::Regex(alt));
                    continue;
                },
            };

            match merged {
                Some((_, ref mut acc)) => acc.extend(ranges),
                None => {
                    merged = Some((out.len(), ranges));
                    out.push(Alternative::Ranges(vec![]));
                },
            }
        }

        if let Some((pos, ranges)) = merged {
            out[pos] = Alternative::Ranges(chars::sort_and_merge(ranges));
        }

        out
    }

    /// Rewrite `{min,max}` as `min` copies followed by either a star or
    /// `max - min` optional copies
    fn desugar_repeat(inner: &Regex, min: u32, max: Option<u32>) -> Result<Regex, BuildError> {
        if let Some(max) = max {
            if max < min {
                return Err(BuildError::InvalidRepetition { min, max });
            }
        }

        let mut units: Vec<_> = (0..min).map(|_| inner.clone()).collect();
        match max {
            None => units.push(inner.clone().star()),
            Some(max) => units.extend((min..max).map(|_| inner.clone().opt())),
        }

        Ok(Regex::Seq(units))
    }
}
