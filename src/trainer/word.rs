use crate::vocab::{Pair, TokenId};

/// A distinct segmented word with its corpus occurrence count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Word {
    parts: Vec<TokenId>,
    count: usize,
}

impl Word {
    /// Builds a word with one part per byte.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            parts: bytes.iter().map(|&b| TokenId::from(b)).collect(),
            count: 1,
        }
    }

    /// Records another occurrence of the same word.
    pub(crate) fn bump(&mut self) {
        self.count += 1;
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    #[cfg(test)]
    pub(crate) fn from_parts(parts: Vec<TokenId>) -> Self {
        Self { parts, count: 1 }
    }

    #[cfg(test)]
    pub(crate) fn parts(&self) -> &[TokenId] {
        &self.parts
    }

    /// Invokes the closure for each adjacent part pair, left to right.
    pub(crate) fn for_each_pair<F>(&self, mut f: F)
    where
        F: FnMut(Pair),
    {
        for window in self.parts.windows(2) {
            f((window[0], window[1]));
        }
    }

    /// Rewrites every non-overlapping occurrence of `pair`, scanning left to right,
    /// into `replacement`. Returns the number of occurrences replaced.
    pub(crate) fn merge(&mut self, pair: Pair, replacement: TokenId) -> usize {
        let len = self.parts.len();
        if len < 2 {
            return 0;
        }

        let mut read = 0usize;
        let mut write = 0usize;
        let mut merges = 0usize;
        while read < len {
            if read + 1 < len && self.parts[read] == pair.0 && self.parts[read + 1] == pair.1 {
                self.parts[write] = replacement;
                read += 2;
                merges += 1;
            } else {
                self.parts[write] = self.parts[read];
                read += 1;
            }
            write += 1;
        }
        self.parts.truncate(write);
        merges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_all_pairs() {
        let mut word = Word::from_bytes(&[1, 2, 1, 2, 3]);
        assert_eq!(word.merge((1, 2), 99), 2);
        assert_eq!(word.parts(), &[99, 99, 3]);
    }

    #[test]
    fn merge_never_reexamines_consumed_parts() {
        let mut word = Word::from_bytes(b"aaa");
        let a = TokenId::from(b'a');
        assert_eq!(word.merge((a, a), 300), 1);
        assert_eq!(word.parts(), &[300, a]);
    }

    #[test]
    fn pairs_are_enumerated_left_to_right() {
        let word = Word::from_bytes(&[1, 2, 3]);
        let mut collected = Vec::new();
        word.for_each_pair(|pair| collected.push(pair));
        assert_eq!(collected, vec![(1, 2), (2, 3)]);
        assert_eq!(word.count(), 1);
    }
}
