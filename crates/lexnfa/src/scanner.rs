//! Reference interpreter for the emitted automata

use std::collections::BTreeSet;

use crate::{
    grammar::{TokenId, TokenKind},
    lexer_data::LexerData,
    lexical_state::{LexicalStateData, NextState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("No token matches the input at byte offset {offset}")]
pub struct TrapError {
    pub offset: usize,
}

/// A matched token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub token: TokenId,
    /// The matched text, including any prefix accumulated by
    /// [`TokenKind::More`] tokens
    pub text: &'a str,
    /// The lexical state the token was matched in
    pub lexical_state: usize,
}

/// Splits a string into tokens by maximal munch, breaking ties between
/// matches of equal length by token ordinal.  Skipped tokens are dropped and
/// `More` tokens are prepended to the following token.
#[derive(Debug)]
pub struct Scanner<'a> {
    data: &'a LexerData,
    input: &'a str,
    pos: usize,
    state: usize,
    trapped: bool,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(data: &'a LexerData, input: &'a str) -> Self {
        Self {
            data,
            input,
            pos: 0,
            state: 0,
            trapped: false,
        }
    }

    /// The index of the current lexical state
    #[inline]
    #[must_use]
    pub fn lexical_state(&self) -> usize { self.state }

    /// The longest match starting at `pos` and its end offset
    fn longest_match(&self, pos: usize) -> Option<(TokenId, usize)> {
        let lsd = &self.data.lexical_states()[self.state];
        let init = lsd.initial_composite()?;

        let mut active: BTreeSet<usize> = lsd.composite_states(init).map(|s| s.index()).collect();
        let mut last_accept = None;

        for (off, c) in self.input[pos..].char_indices() {
            let mut next = BTreeSet::new();
            let mut tok: Option<TokenId> = None;

            for state in active.iter().map(|&s| lsd.simple_state(s)) {
                if !state.accepts(c) {
                    continue;
                }

                if let Some(t) = state.next_type() {
                    tok = Some(tok.map_or(t, |u| u.min(t)));
                }

                follow(lsd, state.next(), &mut next);
            }

            if let Some(tok) = tok {
                last_accept = Some((tok, pos + off + c.len_utf8()));
            }

            if next.is_empty() {
                break;
            }
            active = next;
        }

        last_accept
    }
}

fn follow(lsd: &LexicalStateData, next: NextState, out: &mut BTreeSet<usize>) {
    match next {
        NextState::Dead => (),
        NextState::Simple(s) => {
            out.insert(s);
        },
        NextState::Composite(c) => {
            out.extend(lsd.composite_states(&lsd.composites()[c]).map(|s| s.index()));
        },
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Lexeme<'a>, TrapError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.trapped {
            return None;
        }

        let mut start = self.pos;
        loop {
            if self.pos == self.input.len() {
                if start == self.pos {
                    return None;
                }

                // Input ended partway through a run of More tokens
                self.trapped = true;
                return Some(Err(TrapError { offset: self.pos }));
            }

            let Some((token, end)) = self.longest_match(self.pos) else {
                self.trapped = true;
                return Some(Err(TrapError { offset: self.pos }));
            };

            let info = self
                .data
                .token(token)
                .unwrap_or_else(|| unreachable!());
            let lexical_state = self.state;
            self.pos = end;
            if let Some(next) = info.next_state {
                self.state = next;
            }

            match info.kind {
                TokenKind::Skip => start = self.pos,
                TokenKind::More => (),
                TokenKind::Token | TokenKind::Unparsed => {
                    return Some(Ok(Lexeme {
                        token,
                        text: &self.input[start..end],
                        lexical_state,
                    }));
                },
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        grammar::{DEFAULT_STATE, LexerGrammar, TokenPattern},
        re::{CharList, Regex},
    };

    fn ident() -> Regex {
        Regex::Seq(vec![
            Regex::any_of(['a'..='z']),
            Regex::any_of(['a'..='z', '0'..='9']).star(),
        ])
    }

    fn scan<'a>(data: &'a LexerData, input: &'a str) -> Vec<(&'a str, &'a str)> {
        Scanner::new(data, input)
            .map(|l| {
                let l = l.unwrap();
                (data.token_name(l.token).unwrap(), l.text)
            })
            .collect()
    }

    #[test]
    fn keyword_priority() {
        let data = LexerData::build(&LexerGrammar::new([
            TokenPattern::new(Regex::any_of([' '])).kind(TokenKind::Skip),
            TokenPattern::new("if"),
            TokenPattern::labeled("IDENT", ident()),
        ]))
        .unwrap();

        assert_eq!(scan(&data, "if iff i if"), [
            ("IF", "if"),
            ("IDENT", "iff"),
            ("IDENT", "i"),
            ("IF", "if"),
        ]);
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let data = LexerData::build(&LexerGrammar::new([
            TokenPattern::labeled("IDENT", ident()),
            TokenPattern::new("if"),
        ]))
        .unwrap();

        assert_eq!(scan(&data, "if"), [("IDENT", "if")]);
    }

    #[test]
    fn maximal_munch_rewinds() {
        let data = LexerData::build(&LexerGrammar::new([
            TokenPattern::new("cat"),
            TokenPattern::new("catalog"),
            TokenPattern::labeled("A", Regex::any_of(['a'..='z'])),
        ]))
        .unwrap();

        assert_eq!(scan(&data, "catal"), [("CAT", "cat"), ("A", "a"), ("A", "l")]);
        assert_eq!(scan(&data, "catalog"), [("CATALOG", "catalog")]);
    }

    #[test]
    fn ignore_case() {
        let data = LexerData::build(
            &LexerGrammar::new([
                TokenPattern::new("select"),
                TokenPattern::labeled("WORD", Regex::any_of(['a'..='z']).plus()),
            ])
            .ignore_case(),
        )
        .unwrap();

        assert_eq!(scan(&data, "SeLeCt"), [("SELECT", "SeLeCt")]);
        assert_eq!(scan(&data, "Selects"), [("WORD", "Selects")]);
    }

    #[test]
    fn lexical_state_transitions() {
        let data = LexerData::build(
            &LexerGrammar::new([
                TokenPattern::new(Regex::any_of([' '])).kind(TokenKind::Skip),
                TokenPattern::labeled("OPEN", "/*")
                    .kind(TokenKind::More)
                    .switch_to("COMMENT"),
                TokenPattern::labeled("COMMENT", "*/")
                    .in_states(["COMMENT"])
                    .switch_to(DEFAULT_STATE),
                TokenPattern::labeled("BODY", CharList::negated(['*']))
                    .kind(TokenKind::More)
                    .in_states(["COMMENT"]),
                TokenPattern::labeled("STAR", "*")
                    .kind(TokenKind::More)
                    .in_states(["COMMENT"]),
                TokenPattern::labeled("X", "x"),
            ])
            .with_states([DEFAULT_STATE, "COMMENT"]),
        )
        .unwrap();

        let lexemes: Vec<_> = Scanner::new(&data, "x /* a*b */ x")
            .map(Result::unwrap)
            .collect();
        let summary: Vec<_> = lexemes
            .iter()
            .map(|l| (data.token_name(l.token).unwrap(), l.text, l.lexical_state))
            .collect();

        assert_eq!(summary, [
            ("X", "x", 0),
            ("COMMENT", "/* a*b */", 1),
            ("X", "x", 0),
        ]);
    }

    #[test]
    fn trap() {
        let data = LexerData::build(&LexerGrammar::new([TokenPattern::new("ab")])).unwrap();
        let mut scanner = Scanner::new(&data, "abac");

        assert_eq!(scanner.next().map(|l| l.map(|l| l.text)), Some(Ok("ab")));
        assert_eq!(scanner.next(), Some(Err(TrapError { offset: 2 })));
        assert_eq!(scanner.next(), None);
    }

    #[test]
    fn unterminated_more() {
        let data = LexerData::build(&LexerGrammar::new([
            TokenPattern::new("a").kind(TokenKind::More),
            TokenPattern::new("b"),
        ]))
        .unwrap();

        assert_eq!(scan(&data, "aab"), [("B", "aab")]);
        let mut scanner = Scanner::new(&data, "aa");
        assert_eq!(scanner.next(), Some(Err(TrapError { offset: 2 })));
    }
}
