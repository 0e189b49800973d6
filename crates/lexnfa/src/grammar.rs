//! Token definitions as handed over by a grammar front-end

use std::fmt;

use crate::re::Regex;

/// The conventional name of the top-level lexical state
pub const DEFAULT_STATE: &str = "DEFAULT";

/// A token ordinal.  Ordinals double as match priority: when two patterns
/// match the same input, the lower ordinal wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub u32);

impl TokenId {
    /// The implicit end-of-input token
    pub const EOF: TokenId = TokenId(0);

    /// The ordinal of the pattern at `index` in declaration order
    #[inline]
    #[must_use]
    pub fn for_pattern(index: usize) -> Self {
        Self(u32::try_from(index + 1).unwrap_or_else(|_| unreachable!()))
    }

    /// The declaration index of this token's pattern, or `None` for EOF
    #[inline]
    #[must_use]
    pub fn pattern_index(self) -> Option<usize> {
        self.0.checked_sub(1).map(|i| i as usize)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// What the lexer does with a matched token
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Handed to the parser
    #[default]
    Token,
    /// Discarded
    Skip,
    /// Kept as a prefix of the next token
    More,
    /// Recorded but not handed to the parser
    Unparsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPattern {
    pub label: Option<String>,
    pub regex: Regex,
    pub kind: TokenKind,
    /// Lexical states this pattern is active in.  Empty means the first
    /// declared state.
    pub lexical_states: Vec<String>,
    /// Private patterns only exist to be referenced by other patterns
    pub private: bool,
    pub ignore_case: bool,
    /// The lexical state to switch to after this pattern matches
    pub next_state: Option<String>,
}

impl TokenPattern {
    #[must_use]
    pub fn new<R: Into<Regex>>(regex: R) -> Self {
        Self {
            label: None,
            regex: regex.into(),
            kind: TokenKind::Token,
            lexical_states: vec![],
            private: false,
            ignore_case: false,
            next_state: None,
        }
    }

    #[must_use]
    pub fn labeled<S: Into<String>, R: Into<Regex>>(label: S, regex: R) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::new(regex)
        }
    }

    #[must_use]
    pub fn kind(self, kind: TokenKind) -> Self { Self { kind, ..self } }

    #[must_use]
    pub fn private(self) -> Self {
        Self {
            private: true,
            ..self
        }
    }

    #[must_use]
    pub fn ignore_case(self) -> Self {
        Self {
            ignore_case: true,
            ..self
        }
    }

    #[must_use]
    pub fn in_states<I: IntoIterator<Item = S>, S: Into<String>>(self, states: I) -> Self {
        Self {
            lexical_states: states.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    #[must_use]
    pub fn switch_to<S: Into<String>>(self, state: S) -> Self {
        Self {
            next_state: Some(state.into()),
            ..self
        }
    }
}

/// The lexical half of a grammar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexerGrammar {
    /// Match every pattern without regard to case
    pub ignore_case: bool,
    /// Declared lexical states, in order.  Empty means only [`DEFAULT_STATE`].
    pub lexical_states: Vec<String>,
    pub patterns: Vec<TokenPattern>,
}

impl LexerGrammar {
    #[must_use]
    pub fn new<I: IntoIterator<Item = TokenPattern>>(patterns: I) -> Self {
        Self {
            patterns: patterns.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_states<I: IntoIterator<Item = S>, S: Into<String>>(self, states: I) -> Self {
        Self {
            lexical_states: states.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    #[must_use]
    pub fn ignore_case(self) -> Self {
        Self {
            ignore_case: true,
            ..self
        }
    }

    /// The declared lexical state names, defaulting to [`DEFAULT_STATE`]
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        let default = self
            .lexical_states
            .is_empty()
            .then_some(DEFAULT_STATE)
            .into_iter();

        default.chain(self.lexical_states.iter().map(String::as_str))
    }

    /// Iterate over patterns paired with their ordinals
    pub fn tokens(&self) -> impl Iterator<Item = (TokenId, &TokenPattern)> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(i, p)| (TokenId::for_pattern(i), p))
    }
}
