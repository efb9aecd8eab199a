//! String similarity and word-level error counting.

use serde::{Deserialize, Serialize};

/// Character-level similarity ratio in `[0, 1]`.
///
/// `1 - levenshtein(a, b) / max(len(a), len(b))`, measured in Unicode scalar
/// values. Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Word-level edit operations between a reference and a hypothesis token stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordErrors {
    pub hits: usize,
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
}

impl WordErrors {
    /// Count hits, substitutions, deletions and insertions along a minimal edit path.
    ///
    /// Among equal-cost paths, substitutions are preferred over a
    /// deletion/insertion pair.
    pub fn between<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> Self {
        let n = reference.len();
        let m = hypothesis.len();

        let mut table = vec![vec![0usize; m + 1]; n + 1];
        for (i, row) in table.iter_mut().enumerate() {
            row[0] = i;
        }
        for j in 0..=m {
            table[0][j] = j;
        }
        for i in 1..=n {
            for j in 1..=m {
                let cost = usize::from(reference[i - 1] != hypothesis[j - 1]);
                table[i][j] = (table[i - 1][j - 1] + cost)
                    .min(table[i - 1][j] + 1)
                    .min(table[i][j - 1] + 1);
            }
        }

        let mut errors = WordErrors::default();
        let (mut i, mut j) = (n, m);
        while i > 0 || j > 0 {
            if i > 0 && j > 0 {
                let cost = usize::from(reference[i - 1] != hypothesis[j - 1]);
                if table[i][j] == table[i - 1][j - 1] + cost {
                    if cost == 0 {
                        errors.hits += 1;
                    } else {
                        errors.substitutions += 1;
                    }
                    i -= 1;
                    j -= 1;
                    continue;
                }
            }
            if i > 0 && table[i][j] == table[i - 1][j] + 1 {
                errors.deletions += 1;
                i -= 1;
            } else {
                errors.insertions += 1;
                j -= 1;
            }
        }

        errors
    }

    /// Total number of word errors.
    pub fn total(&self) -> usize {
        self.substitutions + self.deletions + self.insertions
    }

    /// Word error rate relative to the reference length, if it is non-empty.
    pub fn word_error_rate(&self) -> Option<f64> {
        let reference_len = self.hits + self.substitutions + self.deletions;
        (reference_len > 0).then(|| self.total() as f64 / reference_len as f64)
    }
}

impl std::ops::AddAssign for WordErrors {
    fn add_assign(&mut self, other: Self) {
        self.hits += other.hits;
        self.substitutions += other.substitutions;
        self.deletions += other.deletions;
        self.insertions += other.insertions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_one() {
        assert_eq!(similarity("hello world", "hello world"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_disjoint_is_zero() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn test_one_letter_dropped() {
        let score = similarity("hello world", "hello word");
        assert!((score - 10.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_edit_distance_ratio() {
        // kitten -> sitting takes three edits over seven characters
        let score = similarity("kitten", "sitting");
        assert!((score - 4.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_unicode_counts_scalars() {
        // One accented character differs, not two bytes.
        let score = similarity("café", "cafe");
        assert!((score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_word_errors() {
        let reference = ["the", "quick", "brown", "fox"];
        let hypothesis = ["the", "quick", "red", "fox", "jumps"];
        let errors = WordErrors::between(&reference, &hypothesis);
        assert_eq!(errors.hits, 3);
        assert_eq!(errors.substitutions, 1);
        assert_eq!(errors.deletions, 0);
        assert_eq!(errors.insertions, 1);
        assert_eq!(errors.total(), 2);
        assert_eq!(errors.word_error_rate(), Some(0.5));
    }

    #[test]
    fn test_word_errors_empty_sides() {
        let words = ["a", "b"];
        let none: [&str; 0] = [];
        assert_eq!(WordErrors::between(&words, &none).deletions, 2);
        assert_eq!(WordErrors::between(&none, &words).insertions, 2);
        assert_eq!(WordErrors::between(&none, &none).word_error_rate(), None);
    }
}
