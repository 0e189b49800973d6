//! Set algebra over inclusive ranges of Unicode code points

use std::{cmp::Ordering, fmt, ops::RangeInclusive};

mod case;

/// The largest addressable code point
pub const MAX_CODE_POINT: u32 = 0x10_FFFF;

/// Code points below this bound are considered ASCII by the move-range
/// helpers
pub const ASCII_LIMIT: u32 = 0x80;

/// An inclusive range of code points.  A single character is a range whose
/// endpoints are equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharRange {
    left: u32,
    right: u32,
}

fn fmt_point(f: &mut fmt::Formatter<'_>, c: u32) -> fmt::Result {
    match char::from_u32(c) {
        Some(c) if !c.is_control() => write!(f, "{c:?}"),
        _ => write!(f, "U+{c:04X}"),
    }
}

impl fmt::Debug for CharRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_point(f, self.left)?;
        if self.left != self.right {
            f.write_str("..=")?;
            fmt_point(f, self.right)?;
        }

        Ok(())
    }
}

impl CharRange {
    /// Construct a new range
    ///
    /// # Panics
    /// This function panics if `left > right` or either bound lies outside
    /// the code point space.
    #[must_use]
    pub const fn new(left: u32, right: u32) -> Self {
        assert!(left <= right, "Invalid range, left is greater than right");
        assert!(right <= MAX_CODE_POINT, "Range exceeds the code point space");
        Self { left, right }
    }

    #[must_use]
    #[inline]
    pub const fn single(c: u32) -> Self { Self::new(c, c) }

    #[must_use]
    #[inline]
    pub const fn chars(left: char, right: char) -> Self { Self::new(left as u32, right as u32) }

    #[must_use]
    #[inline]
    pub const fn char(c: char) -> Self { Self::single(c as u32) }

    #[must_use]
    #[inline]
    pub const fn left(self) -> u32 { self.left }

    #[must_use]
    #[inline]
    pub const fn right(self) -> u32 { self.right }

    #[must_use]
    #[inline]
    pub const fn is_single(self) -> bool { self.left == self.right }

    #[must_use]
    #[inline]
    pub const fn contains(self, c: u32) -> bool { self.left <= c && c <= self.right }

    fn cmp_point(self, c: u32) -> Ordering {
        if c < self.left {
            Ordering::Greater
        } else if c > self.right {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

impl From<RangeInclusive<char>> for CharRange {
    #[inline]
    fn from(range: RangeInclusive<char>) -> Self { Self::chars(*range.start(), *range.end()) }
}

impl From<char> for CharRange {
    #[inline]
    fn from(c: char) -> Self { Self::char(c) }
}

/// Returns true if `ranges` is sorted ascending, with no two ranges
/// overlapping or touching
#[must_use]
pub fn is_canonical(ranges: &[CharRange]) -> bool {
    ranges.windows(2).all(|w| w[0].right < w[1].left && w[1].left - w[0].right > 1)
}

/// Produce the canonical form of an arbitrary collection of ranges: sorted
/// ascending by left bound, with overlapping, contained and adjacent ranges
/// coalesced.
#[must_use]
pub fn sort_and_merge<I: IntoIterator<Item = CharRange>>(ranges: I) -> Vec<CharRange> {
    let mut ranges: Vec<_> = ranges.into_iter().collect();
    ranges.sort_unstable();

    let mut out: Vec<CharRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match out.last_mut() {
            // Containment, overlap and adjacency all extend the placed range
            Some(last) if range.left <= last.right.saturating_add(1) => {
                last.right = last.right.max(range.right);
            },
            _ => out.push(range),
        }
    }

    debug_assert!(is_canonical(&out));
    out
}

/// Complement a canonical range list over `0..=MAX_CODE_POINT`
#[must_use]
pub fn negate(ranges: &[CharRange]) -> Vec<CharRange> {
    debug_assert!(is_canonical(ranges));

    let mut out = Vec::with_capacity(ranges.len() + 1);
    let mut next = 0;
    for range in ranges {
        if range.left > next {
            out.push(CharRange::new(next, range.left - 1));
        }
        next = range.right + 1;
    }

    if next <= MAX_CODE_POINT {
        out.push(CharRange::new(next, MAX_CODE_POINT));
    }

    out
}

/// Extend a range list with the uppercase and lowercase images of every code
/// point it contains, returning the canonical result
#[must_use]
pub fn case_expand(ranges: &[CharRange]) -> Vec<CharRange> {
    let mut out = ranges.to_vec();
    for &range in ranges {
        case::UPPER.images(range, &mut out);
        case::LOWER.images(range, &mut out);
    }
    sort_and_merge(out)
}

/// The canonical range list matching `c` alone, or `c` and its case variants
#[must_use]
pub fn char_moves(c: char, ignore_case: bool) -> Vec<CharRange> {
    let range = CharRange::char(c);
    if ignore_case {
        case_expand(&[range])
    } else {
        vec![range]
    }
}

/// Test whether a canonical range list contains a code point
#[must_use]
pub fn contains(ranges: &[CharRange], c: u32) -> bool {
    ranges.binary_search_by(|r| r.cmp_point(c)).is_ok()
}

/// Split a canonical range list into the ranges starting in the ASCII block
/// and the remainder.  A range straddling the ASCII boundary is kept whole in
/// the first half.
#[must_use]
pub fn split_ascii(ranges: &[CharRange]) -> (&[CharRange], &[CharRange]) {
    ranges.split_at(ranges.partition_point(|r| r.left < ASCII_LIMIT))
}

/// Test whether two canonical range lists share any code point
#[must_use]
pub fn intersects(lhs: &[CharRange], rhs: &[CharRange]) -> bool {
    let (mut l, mut r) = (lhs.iter().peekable(), rhs.iter().peekable());

    while let (Some(a), Some(b)) = (l.peek(), r.peek()) {
        if a.right < b.left {
            l.next();
        } else if b.right < a.left {
            r.next();
        } else {
            return true;
        }
    }

    false
}
