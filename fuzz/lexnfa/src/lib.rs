use arbitrary::Arbitrary;
use lexnfa::{
    chars::{self, CharRange},
    re::{CharList, Regex},
    LexerData, LexerGrammar, Scanner, TokenKind, TokenPattern,
};

#[derive(Debug, Clone, Copy, Arbitrary)]
pub struct Symbol(u8);

impl Symbol {
    // Keep the alphabet small so patterns actually overlap
    fn char(self) -> char { char::from(b'a' + self.0 % 6) }
}

#[derive(Debug, Clone, Arbitrary)]
pub enum Tree {
    Lit(Vec<Symbol>),
    Chars(Vec<(Symbol, Symbol)>, bool),
    Seq(Vec<Tree>),
    Alt(Vec<Tree>),
    Star(Box<Tree>),
    Plus(Box<Tree>),
    Opt(Box<Tree>),
    Repeat(Box<Tree>, u8, Option<u8>),
}

impl Tree {
    pub fn to_regex(&self) -> Regex {
        match self {
            Self::Lit(s) => Regex::lit(s.iter().map(|c| c.char()).collect::<String>()),
            Self::Chars(r, neg) => {
                let ranges = r.iter().map(|&(a, b)| {
                    let (a, b) = (a.char(), b.char());
                    CharRange::chars(a.min(b), a.max(b))
                });
                if *neg {
                    CharList::negated(ranges).into()
                } else {
                    CharList::new(ranges).into()
                }
            },
            Self::Seq(v) => Regex::Seq(v.iter().map(Tree::to_regex).collect()),
            Self::Alt(v) => Regex::Alt(v.iter().map(Tree::to_regex).collect()),
            Self::Star(t) => t.to_regex().star(),
            Self::Plus(t) => t.to_regex().plus(),
            Self::Opt(t) => t.to_regex().opt(),
            Self::Repeat(t, min, extra) => {
                let min = u32::from(min % 4);
                t.to_regex()
                    .repeat(min, extra.map(|e| min + u32::from(e % 4)))
            },
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
pub struct Input {
    pub patterns: Vec<(Tree, bool)>,
    pub ignore_case: bool,
    pub text: Vec<Symbol>,
}

fn grammar(input: &Input) -> LexerGrammar {
    let grammar = LexerGrammar::new(input.patterns.iter().map(|(t, skip)| {
        let pat = TokenPattern::new(t.to_regex());
        if *skip {
            pat.kind(TokenKind::Skip)
        } else {
            pat
        }
    }));

    if input.ignore_case {
        grammar.ignore_case()
    } else {
        grammar
    }
}

fn summarize(data: &LexerData) -> Vec<(Vec<Vec<usize>>, Vec<String>)> {
    data.lexical_states()
        .iter()
        .map(|lsd| {
            let comps = lsd
                .composites()
                .iter()
                .map(|c| lsd.composite_states(c).map(|s| s.index()).collect())
                .collect();
            let simple = lsd
                .simple_states()
                .map(|s| format!("{:?} {:?} {:?}", s.ranges(), s.next(), s.next_type()))
                .collect();
            (comps, simple)
        })
        .collect()
}

pub fn run(input: &Input) {
    let grammar = grammar(input);
    let Ok(a) = LexerData::build(&grammar) else {
        return;
    };
    let b = LexerData::build(&grammar).unwrap();

    assert_eq!(summarize(&a), summarize(&b));

    for lsd in a.lexical_states() {
        for st in lsd.simple_states() {
            assert!(chars::is_canonical(st.ranges()));
            assert!(!st.ranges().is_empty());
        }

        for (i, comp) in lsd.composites().iter().enumerate() {
            assert_eq!(comp.index(), i);
            assert!(!comp.states().is_empty());
        }
    }

    let text: String = input.text.iter().map(|c| c.char()).collect();
    let mut end = 0;
    for lexeme in Scanner::new(&a, &text) {
        match lexeme {
            Ok(l) => assert!(!l.text.is_empty()),
            Err(e) => {
                end = e.offset;
                break;
            },
        }
    }
    assert!(end <= text.len());
}
