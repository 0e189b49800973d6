//! Lexical data for a whole grammar

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};

use crate::{
    error::{BuildError, Diagnostic},
    grammar::{LexerGrammar, TokenId, TokenKind},
    lexical_state::LexicalStateData,
    nfa::builder::RefTable,
};

/// Everything known about one token type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub id: TokenId,
    pub label: String,
    pub kind: TokenKind,
    /// The image of a string-literal pattern
    pub literal: Option<String>,
    pub private: bool,
    /// Lexical states this token is active in, by index
    pub lexical_states: Vec<usize>,
    /// The lexical state to switch to after this token, by index
    pub next_state: Option<usize>,
}

#[derive(Debug)]
pub struct LexerData {
    tokens: Vec<TokenInfo>,
    lexical_states: Vec<LexicalStateData>,
    state_index: HashMap<String, usize>,
    diagnostics: Vec<Diagnostic>,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || matches!(c, '_' | '$'))
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '$'))
}

impl LexerData {
    /// Build the automata for every lexical state of `grammar`
    ///
    /// # Errors
    /// This function fails if the grammar is malformed: a reference names no
    /// pattern or forms a cycle, a repetition range is inverted, a label or
    /// lexical state is declared twice, or a pattern names an undeclared
    /// lexical state.
    pub fn build(grammar: &LexerGrammar) -> Result<Self, BuildError> {
        let mut me = Self {
            tokens: vec![],
            lexical_states: vec![],
            state_index: HashMap::new(),
            diagnostics: vec![],
        };

        for name in grammar.state_names() {
            if me
                .state_index
                .insert(name.to_owned(), me.lexical_states.len())
                .is_some()
            {
                return Err(BuildError::DuplicateLexicalState(name.to_owned()));
            }
            me.lexical_states.push(LexicalStateData::new(name));
        }

        let mut refs = RefTable::new();
        for pattern in &grammar.patterns {
            if let Some(label) = pattern.label.as_deref() {
                if refs.insert(label, &pattern.regex).is_some() {
                    return Err(BuildError::DuplicateLabel(label.to_owned()));
                }
            }
        }

        me.tokens.push(TokenInfo {
            id: TokenId::EOF,
            label: "EOF".into(),
            kind: TokenKind::Token,
            literal: None,
            private: false,
            lexical_states: vec![],
            next_state: None,
        });

        for (id, pattern) in grammar.tokens() {
            let lexical_states: Vec<usize> = if pattern.lexical_states.is_empty() {
                vec![0]
            } else {
                pattern
                    .lexical_states
                    .iter()
                    .map(|s| {
                        me.state_index.get(s).copied().ok_or_else(|| {
                            BuildError::UndeclaredLexicalState {
                                pattern: pattern.label.clone().unwrap_or_else(|| id.to_string()),
                                state: s.clone(),
                            }
                        })
                    })
                    .collect::<Result<_, _>>()?
            };

            let next_state = pattern.next_state.as_ref().and_then(|s| {
                let idx = me.state_index.get(s).copied();
                if idx.is_none() {
                    me.report(Diagnostic::error(format!(
                        "Token {id} switches to undeclared lexical state {s:?}"
                    )));
                }
                idx
            });
            // Switching to the only state a pattern lives in is no switch
            let next_state = next_state.filter(|&n| lexical_states != [n]);

            me.tokens.push(TokenInfo {
                id,
                label: pattern.label.clone().unwrap_or_default(),
                kind: pattern.kind,
                literal: pattern.regex.literal_image().map(Into::into),
                private: pattern.private,
                lexical_states,
                next_state,
            });
        }

        me.ensure_string_labels();

        for (i, state) in me.lexical_states.iter_mut().enumerate() {
            let patterns = grammar
                .tokens()
                .filter(|&(id, _)| me.tokens[id.0 as usize].lexical_states.contains(&i));

            state.process(patterns, &refs, grammar.ignore_case)?;
        }

        for i in 0..me.lexical_states.len() {
            if me.lexical_states[i].is_empty() {
                let name = me.lexical_states[i].name().to_owned();
                me.report(Diagnostic::error(format!(
                    "Lexical state {name} does not contain any token types"
                )));
            }
        }

        Ok(me)
    }

    fn report(&mut self, diag: Diagnostic) {
        if diag.is_error() {
            tracing::error!("{}", diag.message);
        } else {
            tracing::warn!("{}", diag.message);
        }

        self.diagnostics.push(diag);
    }

    /// Give every token without a usable label one derived from its literal
    /// image, or from its ordinal
    fn ensure_string_labels(&mut self) {
        let mut used: HashSet<String> = self
            .tokens
            .iter()
            .filter(|t| is_identifier(&t.label))
            .map(|t| t.label.clone())
            .collect();

        for tok in &mut self.tokens {
            if is_identifier(&tok.label) {
                continue;
            }

            let upper = tok.literal.as_deref().map(str::to_uppercase);
            tok.label = match upper {
                Some(s) if is_identifier(&s) && !used.contains(&s) => s,
                _ => format!("_TOKEN_{}", tok.id.0),
            };
            used.insert(tok.label.clone());
        }
    }

    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] { &self.diagnostics }

    #[must_use]
    pub fn has_errors(&self) -> bool { self.diagnostics.iter().any(Diagnostic::is_error) }

    /// All tokens, indexed by ordinal.  The first is EOF.
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[TokenInfo] { &self.tokens }

    #[inline]
    #[must_use]
    pub fn token(&self, id: TokenId) -> Option<&TokenInfo> { self.tokens.get(id.0 as usize) }

    #[inline]
    #[must_use]
    pub fn token_count(&self) -> usize { self.tokens.len() }

    #[must_use]
    pub fn token_name(&self, id: TokenId) -> Option<&str> {
        self.token(id).map(|t| t.label.as_str())
    }

    /// The label of the first literal pattern with exactly this image
    #[must_use]
    pub fn string_literal_label(&self, image: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.literal.as_deref() == Some(image))
            .map(|t| t.label.as_str())
    }

    fn tokens_of_kind(&self, kind: TokenKind) -> BTreeSet<TokenId> {
        self.tokens
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.id)
            .collect()
    }

    /// Tokens handed to the parser, including EOF
    #[must_use]
    pub fn regular_tokens(&self) -> BTreeSet<TokenId> { self.tokens_of_kind(TokenKind::Token) }

    #[must_use]
    pub fn skipped_tokens(&self) -> BTreeSet<TokenId> { self.tokens_of_kind(TokenKind::Skip) }

    #[must_use]
    pub fn more_tokens(&self) -> BTreeSet<TokenId> { self.tokens_of_kind(TokenKind::More) }

    #[must_use]
    pub fn unparsed_tokens(&self) -> BTreeSet<TokenId> { self.tokens_of_kind(TokenKind::Unparsed) }

    #[inline]
    #[must_use]
    pub fn lexical_states(&self) -> &[LexicalStateData] { &self.lexical_states }

    #[must_use]
    pub fn lexical_state(&self, name: &str) -> Option<&LexicalStateData> {
        self.lexical_state_index(name)
            .map(|i| &self.lexical_states[i])
    }

    #[inline]
    #[must_use]
    pub fn lexical_state_index(&self, name: &str) -> Option<usize> {
        self.state_index.get(name).copied()
    }

    #[must_use]
    pub fn lexical_state_name(&self, index: usize) -> Option<&str> {
        self.lexical_states.get(index).map(LexicalStateData::name)
    }

    /// The largest number of emitted simple states in any lexical state
    #[must_use]
    pub fn max_nfa_states(&self) -> usize {
        self.lexical_states
            .iter()
            .map(|s| s.simple_states().len())
            .max()
            .unwrap_or(0)
    }

    /// True if more than one lexical state exists and some token leaves its
    /// own lexical state
    #[must_use]
    pub fn has_lexical_state_transitions(&self) -> bool {
        self.lexical_states.len() > 1
            && self.tokens.iter().any(|t| {
                t.next_state
                    .is_some_and(|n| t.lexical_states.iter().any(|&s| s != n))
            })
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        chars::CharRange,
        grammar::{DEFAULT_STATE, TokenPattern},
        lexical_state::NextState,
        re::{self, CharList, Regex},
    };

    fn ident() -> Regex {
        Regex::Seq(vec![
            Regex::any_of(['a'..='z', 'A'..='Z', '_'..='_']),
            Regex::any_of(['a'..='z', 'A'..='Z', '_'..='_', '0'..='9']).star(),
        ])
    }

    fn java_ish() -> LexerGrammar {
        LexerGrammar::new([
            TokenPattern::new(Regex::any_of([' ', '\t', '\n'])).kind(TokenKind::Skip),
            TokenPattern::new("/*")
                .kind(TokenKind::More)
                .switch_to("COMMENT"),
            TokenPattern::new("*/")
                .kind(TokenKind::Unparsed)
                .in_states(["COMMENT"])
                .switch_to(DEFAULT_STATE),
            TokenPattern::new(CharList::negated(Vec::<CharRange>::new()))
                .kind(TokenKind::More)
                .in_states(["COMMENT"]),
            TokenPattern::new("if"),
            TokenPattern::new("+"),
            TokenPattern::labeled("IDENT", ident()),
            TokenPattern::labeled(
                "LETTER",
                Regex::any_of(['a'..='z', 'A'..='Z']),
            )
            .private(),
        ])
        .with_states([DEFAULT_STATE, "COMMENT"])
    }

    #[test]
    fn token_tables() {
        let data = LexerData::build(&java_ish()).unwrap();
        assert!(data.diagnostics().is_empty());

        assert_eq!(data.token_count(), 9);
        assert_eq!(data.token_name(TokenId::EOF), Some("EOF"));
        assert_eq!(data.token_name(TokenId(5)), Some("IF"));
        assert_eq!(data.token_name(TokenId(6)), Some("_TOKEN_6"));
        assert_eq!(data.token_name(TokenId(1)), Some("_TOKEN_1"));
        assert_eq!(data.token_name(TokenId(7)), Some("IDENT"));
        assert_eq!(data.string_literal_label("+"), Some("_TOKEN_6"));
        assert_eq!(data.string_literal_label("-"), None);

        assert_eq!(data.skipped_tokens(), [TokenId(1)].into());
        assert_eq!(data.more_tokens(), [TokenId(2), TokenId(4)].into());
        assert_eq!(data.unparsed_tokens(), [TokenId(3)].into());
        assert_eq!(
            data.regular_tokens(),
            [TokenId::EOF, TokenId(5), TokenId(6), TokenId(7), TokenId(8)].into()
        );
    }

    #[test]
    fn lexical_states() {
        let data = LexerData::build(&java_ish()).unwrap();

        assert_eq!(data.lexical_state_index("COMMENT"), Some(1));
        assert_eq!(data.lexical_state_name(0), Some(DEFAULT_STATE));
        assert!(data.lexical_state("NOPE").is_none());
        assert!(data.has_lexical_state_transitions());

        let comment = data.lexical_state("COMMENT").unwrap();
        assert_eq!(comment.tokens(), [TokenId(3), TokenId(4)]);
        assert_eq!(data.tokens()[2].next_state, Some(1));
        assert_eq!(data.tokens()[3].next_state, Some(0));

        let default = data.lexical_state(DEFAULT_STATE).unwrap();
        assert_eq!(default.tokens(), [1, 2, 5, 6, 7].map(TokenId));
        assert_eq!(
            data.max_nfa_states(),
            default.simple_states().len().max(comment.simple_states().len())
        );
    }

    #[test]
    fn label_collisions() {
        let data = LexerData::build(&LexerGrammar::new([
            TokenPattern::labeled("WHILE", Regex::any_of(['w'..='w'])),
            TokenPattern::new("while"),
            TokenPattern::labeled("not an identifier", "do"),
            TokenPattern::new("do"),
        ]))
        .unwrap();

        assert_eq!(data.token_name(TokenId(2)), Some("_TOKEN_2"));
        assert_eq!(data.token_name(TokenId(3)), Some("DO"));
        assert_eq!(data.token_name(TokenId(4)), Some("_TOKEN_4"));
    }

    #[test]
    fn empty_lexical_state_is_reported() {
        let data = LexerData::build(
            &LexerGrammar::new([
                TokenPattern::new("a"),
                TokenPattern::labeled("HIDDEN", "b").private().in_states(["EMPTY"]),
                TokenPattern::new("c").switch_to("NOWHERE"),
            ])
            .with_states([DEFAULT_STATE, "EMPTY"]),
        )
        .unwrap();

        assert!(data.has_errors());
        let messages: Vec<_> = data.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, [
            "Token #3 switches to undeclared lexical state \"NOWHERE\"",
            "Lexical state EMPTY does not contain any token types",
        ]);

        assert!(data.lexical_state("EMPTY").unwrap().initial_composite().is_none());
        assert!(data.lexical_state(DEFAULT_STATE).unwrap().initial_composite().is_some());
        assert!(!data.has_lexical_state_transitions());
    }

    #[test]
    fn self_transition_is_ignored() {
        let data = LexerData::build(
            &LexerGrammar::new([
                TokenPattern::new("a").switch_to(DEFAULT_STATE),
                TokenPattern::new("b").in_states(["OTHER"]).switch_to("OTHER"),
                TokenPattern::new("c")
                    .in_states([DEFAULT_STATE, "OTHER"])
                    .switch_to("OTHER"),
            ])
            .with_states([DEFAULT_STATE, "OTHER"]),
        )
        .unwrap();

        assert!(data.diagnostics().is_empty());
        assert_eq!(data.tokens()[1].next_state, None);
        assert_eq!(data.tokens()[2].next_state, None);
        assert_eq!(data.tokens()[3].next_state, Some(1));
        assert!(data.has_lexical_state_transitions());

        let data = LexerData::build(
            &LexerGrammar::new([
                TokenPattern::new("a").switch_to(DEFAULT_STATE),
                TokenPattern::new("b").in_states(["OTHER"]).switch_to("OTHER"),
            ])
            .with_states([DEFAULT_STATE, "OTHER"]),
        )
        .unwrap();

        assert!(!data.has_lexical_state_transitions());
    }

    #[test]
    fn build_errors() {
        let err = |g: LexerGrammar| LexerData::build(&g).unwrap_err();

        assert_eq!(
            err(LexerGrammar::new([TokenPattern::new(Regex::reference("X"))])),
            BuildError::UnknownReference("X".into())
        );
        assert_eq!(
            err(LexerGrammar::new([TokenPattern::new(Regex::lit("a").repeat(2, Some(1)))])),
            BuildError::InvalidRepetition { min: 2, max: 1 }
        );
        assert_eq!(
            err(LexerGrammar::new([TokenPattern::new("a").in_states(["X"])])),
            BuildError::UndeclaredLexicalState {
                pattern: "#1".into(),
                state: "X".into()
            }
        );
        assert_eq!(
            err(LexerGrammar::default().with_states(["A", "A"])),
            BuildError::DuplicateLexicalState("A".into())
        );
        assert_eq!(
            err(LexerGrammar::new([
                TokenPattern::labeled("A", "a"),
                TokenPattern::labeled("A", "b"),
            ])),
            BuildError::DuplicateLabel("A".into())
        );
    }

    fn summary(data: &LexerData) -> Vec<(Vec<(String, NextState)>, Vec<(Vec<usize>, Option<TokenId>)>)> {
        data.lexical_states()
            .iter()
            .map(|s| {
                let simple = s
                    .simple_states()
                    .map(|st| (format!("{:?}", st.ranges()), st.next()))
                    .collect();
                let composites = s
                    .composites()
                    .iter()
                    .map(|c| (s.composite_states(c).map(|st| st.index()).collect(), c.ordinal()))
                    .collect();
                (simple, composites)
            })
            .collect()
    }

    proptest! {
        #[test]
        fn test_determinism(
            res in prop::collection::vec(re::re(4, 16, 3, prop::char::range('a', 'f')), 1..4),
            ignore_case in prop::bool::ANY,
        ) {
            let mut grammar = LexerGrammar::new(res.into_iter().map(TokenPattern::new));
            grammar.ignore_case = ignore_case;

            let a = LexerData::build(&grammar).unwrap();
            let b = LexerData::build(&grammar.clone()).unwrap();
            prop_assert_eq!(summary(&a), summary(&b));

            for state in a.lexical_states() {
                for st in state.simple_states() {
                    prop_assert!(!st.ranges().is_empty());
                    prop_assert!(crate::chars::is_canonical(st.ranges()));
                }

                if let Some(init) = state.initial_composite() {
                    prop_assert_eq!(init.index(), 0);
                }
            }
        }
    }
}
