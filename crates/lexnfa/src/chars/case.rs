use spin::Lazy;

use super::CharRange;

// No code point above this has a case mapping
const SCAN_LIMIT: u32 = 0x1_FFFF;

// Simple mappings of the code points whose full mapping expands to several
// characters, as (first, last, delta).  Every other expanding code point has
// no simple mapping.
const UPPER_SIMPLE: &[(u32, u32, i64)] = &[
    (0x1F80, 0x1F87, 8),
    (0x1F90, 0x1F97, 8),
    (0x1FA0, 0x1FA7, 8),
    (0x1FB3, 0x1FB3, 9),
    (0x1FC3, 0x1FC3, 9),
    (0x1FF3, 0x1FF3, 9),
];
const LOWER_SIMPLE: &[(u32, u32, i64)] = &[(0x0130, 0x0130, 0x69 - 0x130)];

pub static UPPER: Lazy<CaseTable> =
    Lazy::new(|| CaseTable::scan(char::to_uppercase, UPPER_SIMPLE));
pub static LOWER: Lazy<CaseTable> =
    Lazy::new(|| CaseTable::scan(char::to_lowercase, LOWER_SIMPLE));

/// A maximal run of consecutive code points whose case image differs from
/// the code point by the same offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    start: u32,
    end: u32,
    delta: i64,
}

impl Run {
    fn shift(&self, c: u32) -> u32 {
        u32::try_from(i64::from(c) + self.delta).unwrap_or_else(|_| unreachable!())
    }
}

/// Sorted, non-overlapping runs covering exactly the code points whose
/// simple case mapping differs from themselves
#[derive(Debug)]
pub struct CaseTable(Vec<Run>);

impl CaseTable {
    fn scan<I: Iterator<Item = char>>(
        map: impl Fn(char) -> I,
        simple: &[(u32, u32, i64)],
    ) -> Self {
        let mut runs: Vec<Run> = vec![];

        for chr in (0..=SCAN_LIMIT).filter_map(char::from_u32) {
            let mut img = map(chr);
            let c = chr as u32;

            let delta = match (img.next(), img.next()) {
                (Some(img), None) => i64::from(img as u32) - i64::from(c),
                (Some(_), Some(_)) => {
                    match simple.iter().find(|&&(lo, hi, _)| (lo..=hi).contains(&c)) {
                        Some(&(_, _, delta)) => delta,
                        None => continue,
                    }
                },
                (None, _) => continue,
            };

            if delta == 0 {
                continue;
            }

            match runs.last_mut() {
                Some(last) if last.end + 1 == c && last.delta == delta => last.end = c,
                _ => runs.push(Run {
                    start: c,
                    end: c,
                    delta,
                }),
            }
        }

        Self(runs)
    }

    /// Push the images of every code point in `range` that has a differing
    /// case mapping
    pub fn images(&self, range: CharRange, out: &mut Vec<CharRange>) {
        let first = self.0.partition_point(|r| r.end < range.left);

        for run in self.0[first..].iter().take_while(|r| r.start <= range.right) {
            let lo = run.start.max(range.left);
            let hi = run.end.min(range.right);
            debug_assert!(lo <= hi);

            out.push(CharRange::new(run.shift(lo), run.shift(hi)));
        }
    }
}
