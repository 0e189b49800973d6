//! The regular-expression tree consumed by the NFA builder

use crate::chars::CharRange;

/// A bracketed list of character ranges, optionally negated
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CharList {
    pub ranges: Vec<CharRange>,
    pub negated: bool,
}

impl CharList {
    #[must_use]
    pub fn new<I: IntoIterator<Item = R>, R: Into<CharRange>>(ranges: I) -> Self {
        Self {
            ranges: ranges.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    #[must_use]
    pub fn negated<I: IntoIterator<Item = R>, R: Into<CharRange>>(ranges: I) -> Self {
        Self {
            negated: true,
            ..Self::new(ranges)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Regex {
    /// An exact string
    Lit(String),
    Chars(CharList),
    Seq(Vec<Regex>),
    /// Ordered choice
    Alt(Vec<Regex>),
    Star(Box<Regex>),
    Plus(Box<Regex>),
    Opt(Box<Regex>),
    /// Between `min` and `max` repetitions, or at least `min` if `max` is
    /// `None`
    Repeat {
        inner: Box<Regex>,
        min: u32,
        max: Option<u32>,
    },
    /// A reference to another pattern by label
    Ref(String),
}

impl Regex {
    pub const BOTTOM: Regex = Regex::Alt(Vec::new());
    pub const EMPTY: Regex = Regex::Seq(Vec::new());

    #[inline]
    #[must_use]
    pub fn lit<S: Into<String>>(s: S) -> Self { Self::Lit(s.into()) }

    #[inline]
    #[must_use]
    pub fn any_of<I: IntoIterator<Item = R>, R: Into<CharRange>>(ranges: I) -> Self {
        Self::Chars(CharList::new(ranges))
    }

    #[inline]
    #[must_use]
    pub fn none_of<I: IntoIterator<Item = R>, R: Into<CharRange>>(ranges: I) -> Self {
        Self::Chars(CharList::negated(ranges))
    }

    #[inline]
    #[must_use]
    pub fn reference<S: Into<String>>(name: S) -> Self { Self::Ref(name.into()) }

    #[inline]
    #[must_use]
    pub fn star(self) -> Self { Self::Star(self.into()) }

    #[inline]
    #[must_use]
    pub fn plus(self) -> Self { Self::Plus(self.into()) }

    #[inline]
    #[must_use]
    pub fn opt(self) -> Self { Self::Opt(self.into()) }

    #[inline]
    #[must_use]
    pub fn repeat(self, min: u32, max: Option<u32>) -> Self {
        Self::Repeat {
            inner: self.into(),
            min,
            max,
        }
    }

    /// The image of this expression if it is a plain string literal
    #[must_use]
    pub fn literal_image(&self) -> Option<&str> {
        match self {
            Self::Lit(s) => Some(s),
            _ => None,
        }
    }

    /// Visit the label of every reference in this tree
    pub fn for_each_ref<F: FnMut(&str)>(&self, f: &mut F) {
        match self {
            Self::Lit(_) | Self::Chars(_) => (),
            Self::Seq(v) | Self::Alt(v) => v.iter().for_each(|r| r.for_each_ref(f)),
            Self::Star(r) | Self::Plus(r) | Self::Opt(r) | Self::Repeat { inner: r, .. } => {
                r.for_each_ref(f);
            },
            Self::Ref(name) => f(name),
        }
    }
}

impl From<&str> for Regex {
    #[inline]
    fn from(s: &str) -> Self { Self::lit(s) }
}

impl From<String> for Regex {
    #[inline]
    fn from(s: String) -> Self { Self::Lit(s) }
}

impl From<CharList> for Regex {
    #[inline]
    fn from(l: CharList) -> Self { Self::Chars(l) }
}

#[cfg(any(test, feature = "proptest"))]
pub use prop::*;

#[cfg(any(test, feature = "proptest"))]
mod prop {
    use proptest::prelude::*;

    use super::{CharList, Regex};
    use crate::chars::CharRange;

    pub fn char_list(chr: impl Strategy<Value = char> + Clone) -> impl Strategy<Value = CharList> {
        (
            prop::collection::vec((chr.clone(), chr), 1..4),
            prop::bool::weighted(0.2),
        )
            .prop_map(|(pairs, negated)| CharList {
                ranges: pairs
                    .into_iter()
                    .map(|(a, b)| CharRange::chars(a.min(b), a.max(b)))
                    .collect(),
                negated,
            })
    }

    /// Generate reference-free regex trees over the given alphabet
    pub fn re(
        depth: u32,
        tree_size: u32,
        branch_size: u32,
        chr: impl Strategy<Value = char> + Clone + 'static,
    ) -> impl Strategy<Value = Regex> {
        prop_oneof![
            prop::collection::vec(chr.clone(), 0..4)
                .prop_map(|v| Regex::Lit(v.into_iter().collect())),
            char_list(chr).prop_map(Regex::Chars),
        ]
        .prop_recursive(depth, tree_size, branch_size, move |s| {
            let size = 0..=(branch_size.try_into().unwrap());
            prop_oneof![
                prop::collection::vec(s.clone(), size.clone()).prop_map(Regex::Alt),
                prop::collection::vec(s.clone(), size).prop_map(Regex::Seq),
                s.clone().prop_map(Regex::star),
                s.clone().prop_map(Regex::plus),
                s.clone().prop_map(Regex::opt),
                (s, 0..3_u32, prop::option::of(0..3_u32)).prop_map(|(r, min, extra)| {
                    r.repeat(min, extra.map(|e| min + e))
                }),
            ]
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collects_refs() {
        let re = Regex::Seq(vec![
            Regex::reference("DIGIT").plus(),
            Regex::Alt(vec![Regex::lit("."), Regex::reference("EXP")]).opt(),
            Regex::reference("DIGIT").repeat(0, Some(2)),
        ]);

        let mut refs = vec![];
        re.for_each_ref(&mut |r| refs.push(r.to_owned()));
        assert_eq!(refs, ["DIGIT", "EXP", "DIGIT"]);
    }

    #[test]
    fn literal_image() {
        assert_eq!(Regex::lit("while").literal_image(), Some("while"));
        assert_eq!(Regex::any_of(['a'..='z']).literal_image(), None);
    }

    proptest::proptest! {
        #[test]
        fn generated_trees_are_reference_free(
            r in re(3, 12, 3, proptest::char::range('a', 'c')),
        ) {
            let mut refs = 0_usize;
            r.for_each_ref(&mut |_| refs += 1);
            proptest::prop_assert_eq!(refs, 0);
        }
    }
}
