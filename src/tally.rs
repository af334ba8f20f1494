use std::cmp::Reverse;
use std::fmt;
use std::iter;
use std::ops::{AddAssign, Index};

/// Occurrence count for every byte value.
#[derive(Clone, PartialEq, Eq)]
pub struct Tally([u64; 256]);

impl Default for Tally {
    fn default() -> Self {
        Self([0; 256])
    }
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0[b as usize] += 1;
        }
    }

    /// Number of bytes counted.
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        (0..=u8::MAX).zip(self.0.iter().copied())
    }

    /// Rows with a nonzero count, most frequent first. Equal counts are
    /// ordered by ascending byte value.
    pub fn report(&self) -> Vec<CharCount> {
        let mut rows = self
            .iter()
            .filter(|&(_, count)| count > 0)
            .map(|(byte, count)| CharCount { byte, count })
            .collect::<Vec<_>>();
        rows.sort_by_key(|row| (Reverse(row.count), row.byte));
        rows
    }
}

impl Index<u8> for Tally {
    type Output = u64;

    fn index(&self, byte: u8) -> &u64 {
        &self.0[byte as usize]
    }
}

impl AddAssign<&Tally> for Tally {
    fn add_assign(&mut self, other: &Tally) {
        for (count, other) in iter::zip(&mut self.0, &other.0) {
            *count += other;
        }
    }
}

impl iter::Sum for Tally {
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = Self>,
    {
        iter.fold(Self::default(), |mut acc, tally| {
            acc += &tally;
            acc
        })
    }
}

impl fmt::Debug for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().filter(|&(_, count)| count > 0))
            .finish()
    }
}

/// Sums per-worker tallies into one.
pub fn merge<I>(tallies: I) -> Tally
where
    I: IntoIterator<Item = Tally>,
{
    tallies.into_iter().sum()
}

/// One report row.
///
/// Displays as a quoted character for printable ASCII and as hex otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharCount {
    pub byte: u8,
    pub count: u64,
}

impl CharCount {
    pub fn is_printable(&self) -> bool {
        (32..=126).contains(&self.byte)
    }
}

impl fmt::Display for CharCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_printable() {
            write!(f, "'{}'", self.byte as char)
        } else {
            write!(f, "{:#x}", self.byte)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{merge, CharCount, Tally};

    #[test]
    fn test_add() {
        let mut tally = Tally::new();
        tally.add(b"hello");
        tally.add(b"");
        tally.add(b"world");
        assert_eq!(tally[b'l'], 3);
        assert_eq!(tally[b'o'], 2);
        assert_eq!(tally[b'z'], 0);
        assert_eq!(tally.total(), 10);
    }

    #[test]
    fn test_merge() {
        let tallies = [&b"abc"[..], b"aab", b"", b"\x00\xff"]
            .into_iter()
            .map(|bytes| {
                let mut tally = Tally::new();
                tally.add(bytes);
                tally
            })
            .collect::<Vec<_>>();

        let merged = merge(tallies);
        assert_eq!(merged[b'a'], 3);
        assert_eq!(merged[b'b'], 2);
        assert_eq!(merged[b'c'], 1);
        assert_eq!(merged[0x00], 1);
        assert_eq!(merged[0xff], 1);
        assert_eq!(merged.total(), 8);
        assert_eq!(merge([]), Tally::new());
    }

    #[test]
    fn test_report_order() {
        let mut tally = Tally::new();
        tally.add(b"zzyyxxa\x01\x01\x01");
        let rows = tally.report();
        assert_eq!(
            rows,
            [
                CharCount { byte: 0x01, count: 3 },
                CharCount { byte: b'x', count: 2 },
                CharCount { byte: b'y', count: 2 },
                CharCount { byte: b'z', count: 2 },
                CharCount { byte: b'a', count: 1 },
            ]
        );
        assert!(Tally::new().report().is_empty());
    }

    #[test]
    fn test_display() {
        let row = |byte| CharCount { byte, count: 1 }.to_string();
        assert_eq!(row(b'A'), "'A'");
        assert_eq!(row(b' '), "' '");
        assert_eq!(row(b'~'), "'~'");
        assert_eq!(row(0x00), "0x0");
        assert_eq!(row(0x01), "0x1");
        assert_eq!(row(0x14), "0x14");
        assert_eq!(row(0x1f), "0x1f");
        assert_eq!(row(0x7f), "0x7f");
        assert_eq!(row(0xff), "0xff");
    }
}
