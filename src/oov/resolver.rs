use fxhash::FxHashMap;
use tracing::debug;

use super::bigram::BigramModel;
use super::edit_distance::damerau_levenshtein;
use super::embedding::EmbeddingStore;
use crate::error::{PcfgError, Result};

/// Resolves an out-of-vocabulary token to the lexicon token it should be
/// treated as, combining an embedding-space nearest-neighbor search with a
/// bigram-context tiebreak. Mirrors the three-branch procedure used to
/// smooth unseen words before parsing: known-to-the-embedding-vocabulary
/// words get a similarity-plus-bigram score over every lexicon token;
/// unknown words fall back to edit-distance candidates scored by bigram
/// context alone; and if even that search is empty, every lexicon token is
/// considered.
pub struct OovResolver<'a> {
    embeddings: &'a EmbeddingStore,
    bigram: &'a BigramModel,
    lexicon_counts: &'a FxHashMap<String, u64>,
    edit_distance_threshold: usize,
    bigram_weight: f64,
}

impl<'a> OovResolver<'a> {
    /// `lexicon_counts` is `count(token)` from the treebank lexicon (spec.md
    /// §4.2's "total occurrences of t anywhere in the lexicon"), i.e. the
    /// `.words` file `induce` writes -- *not* the bigram sentence corpus's
    /// own token frequency, which can legitimately differ since the bigram
    /// training sentences are allowed to be a strict subset of the lexicon
    /// (spec.md §4.5).
    pub fn new(
        embeddings: &'a EmbeddingStore,
        bigram: &'a BigramModel,
        lexicon_counts: &'a FxHashMap<String, u64>,
    ) -> Self {
        Self {
            embeddings,
            bigram,
            lexicon_counts,
            edit_distance_threshold: 2,
            bigram_weight: 1000.0,
        }
    }

    fn candidates(&self, word: &str) -> Vec<&'a str> {
        self.bigram
            .tokens()
            .iter()
            .map(String::as_str)
            .filter(|token| damerau_levenshtein(word, token) <= self.edit_distance_threshold)
            .collect()
    }

    /// Bigram factor per candidate, combining left and right context. If
    /// every candidate ties at the neutral factor of 1.0 (both neighbors
    /// carried no bigram evidence, i.e. both were unknown or absent), this
    /// falls back to `count(c)` over the candidate set -- each candidate's
    /// occurrence count in the treebank lexicon, per spec.md §4.6 and
    /// `OOV.py`'s `self.grammer.token_count[candidate]` -- renormalised so
    /// the candidate scores sum to 1. This is deliberately the lexicon
    /// count, not the bigram sentence corpus's own token frequency: the two
    /// can diverge since the bigram training sentences may be a strict
    /// subset of the lexicon (spec.md §4.5).
    fn bigram_scores(
        &self,
        prev_word: Option<&str>,
        next_word: Option<&str>,
        candidates: &[&'a str],
    ) -> Vec<f64> {
        let mut scores: Vec<f64> = candidates
            .iter()
            .map(|c| self.bigram.left_factor(prev_word, c) * self.bigram.right_factor(c, next_word))
            .collect();

        let sum: f64 = scores.iter().sum();
        if (sum - candidates.len() as f64).abs() < 1e-12 {
            let counts: Vec<f64> = candidates
                .iter()
                .map(|c| *self.lexicon_counts.get(*c).unwrap_or(&0) as f64)
                .collect();
            let count_sum: f64 = counts.iter().sum();
            if count_sum > 0.0 {
                scores = counts.iter().map(|c| c / count_sum).collect();
            } else {
                let uniform = 1.0 / candidates.len() as f64;
                scores.iter_mut().for_each(|s| *s = uniform);
            }
        }

        scores
    }

    /// Returns the best-scoring index, breaking ties toward the lowest
    /// index (stable insertion order, matching the lexicon's own id
    /// assignment).
    fn argmax(scores: &[f64]) -> Option<usize> {
        scores
            .iter()
            .enumerate()
            .fold(None, |best, (i, &s)| match best {
                Some((_, bs)) if bs >= s => best,
                _ => Some((i, s)),
            })
            .map(|(i, _)| i)
    }

    /// Walks `sentence` word-by-word, replacing any token `is_known` rejects
    /// with its resolved in-vocabulary substitute. Context words
    /// (`prev`/`next`) are always the *original* neighbours, never an
    /// already-substituted one: a single left-to-right pass over the
    /// untouched sentence.
    pub fn substitute<T>(
        &self,
        sentence: &mut crate::sentence::Sentence<T>,
        is_known: impl Fn(&T) -> bool,
    ) -> Result<()>
    where
        T: AsRef<str> + From<String> + Clone,
    {
        let original = sentence.0.clone();
        for (i, word) in original.iter().enumerate() {
            if is_known(word) {
                continue;
            }
            let prev = if i > 0 {
                Some(original[i - 1].as_ref())
            } else {
                None
            };
            let next = original.get(i + 1).map(|w| w.as_ref());
            let replacement = self.resolve(word.as_ref(), prev, next)?;
            debug!(word = word.as_ref(), replacement = %replacement, "resolved OOV token");
            sentence.0[i] = T::from(replacement);
        }
        Ok(())
    }

    /// Errors with `EmptyCandidates` only when the lexicon itself is empty
    /// (no token for the bigram model to have been trained on), since every
    /// candidate list in this function either narrows down from or falls
    /// back to the bigram model's full token set.
    pub fn resolve(&self, word: &str, prev_word: Option<&str>, next_word: Option<&str>) -> Result<String> {
        if self.bigram.tokens().is_empty() {
            return Err(PcfgError::EmptyCandidates);
        }

        let normalized = self.embeddings.normalize(word);

        if self.embeddings.contains(&normalized) {
            let mut similarities: Vec<f64> = self
                .bigram
                .tokens()
                .iter()
                .map(|token| {
                    let token_normalized = self.embeddings.normalize(token);
                    self.embeddings
                        .similarity(&normalized, &token_normalized)
                        .unwrap_or(0.0)
                })
                .collect();

            let candidates = self.candidates(word);
            if candidates.is_empty() {
                let best = Self::argmax(&similarities).unwrap_or(0);
                return Ok(self.bigram.tokens()[best].clone());
            }

            let bigram_scores = self.bigram_scores(prev_word, next_word, &candidates);
            for (candidate, score) in candidates.iter().zip(&bigram_scores) {
                if let Some(id) = self.bigram.id_of(candidate) {
                    similarities[id] += self.bigram_weight * score;
                }
            }

            let best = Self::argmax(&similarities).unwrap_or(0);
            Ok(self.bigram.tokens()[best].clone())
        } else {
            let mut candidates = self.candidates(word);
            if candidates.is_empty() {
                candidates = self.bigram.tokens().iter().map(String::as_str).collect();
            }

            let scores = self.bigram_scores(prev_word, next_word, &candidates);
            let best = Self::argmax(&scores).unwrap_or(0);
            Ok(candidates[best].to_string())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixtures() -> (EmbeddingStore, BigramModel, FxHashMap<String, u64>) {
        let embeddings = EmbeddingStore::new(
            vec!["dog".to_string(), "cat".to_string(), "doge".to_string()],
            vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.95, 0.05]],
        )
        .unwrap();
        let bigram = BigramModel::train(
            vec!["the", "dog", "barks", "cat", "meows"].into_iter(),
            vec!["the dog barks", "the cat meows"].into_iter(),
        )
        .unwrap();
        let lexicon_counts = vec![
            ("the".to_string(), 2),
            ("dog".to_string(), 1),
            ("barks".to_string(), 1),
            ("cat".to_string(), 1),
            ("meows".to_string(), 1),
        ]
        .into_iter()
        .collect();
        (embeddings, bigram, lexicon_counts)
    }

    #[test]
    fn known_embedding_word_prefers_bigram_consistent_candidate() {
        let (embeddings, bigram, lexicon_counts) = fixtures();
        let resolver = OovResolver::new(&embeddings, &bigram, &lexicon_counts);
        // "doge" is in the embedding vocabulary (simulating a pretrained
        // embedding covering more words than the lexicon) and close in edit
        // distance to "dog"; bigram context after "the" should favor "dog".
        let resolved = resolver.resolve("doge", Some("the"), None).unwrap();
        assert_eq!("dog", resolved);
    }

    #[test]
    fn unknown_word_falls_back_to_edit_distance_candidates() {
        let (embeddings, bigram, lexicon_counts) = fixtures();
        let resolver = OovResolver::new(&embeddings, &bigram, &lexicon_counts);
        let resolved = resolver.resolve("dpg", Some("the"), None).unwrap();
        assert_eq!("dog", resolved);
    }

    #[test]
    fn both_contexts_unknown_falls_back_to_lexicon_counts() {
        // The bigram sentence corpus says "dog" (twice) outweighs "cat"
        // (once), but the lexicon -- which may cover sentences never fed to
        // the bigram model, per spec.md §4.5 -- says the opposite. With
        // both neighbors outside the bigram vocabulary every candidate's
        // bigram factor ties at 1.0, so the tie-break must fall back to the
        // lexicon's count(c), not the bigram corpus's, and "cat" must win.
        let bigram = BigramModel::train(
            vec!["dog", "cat"].into_iter(),
            vec!["dog dog", "cat"].into_iter(),
        )
        .unwrap();
        let lexicon_counts: FxHashMap<String, u64> =
            vec![("dog".to_string(), 1), ("cat".to_string(), 5)]
                .into_iter()
                .collect();
        let embeddings = EmbeddingStore::new(vec![], vec![]).unwrap();
        let resolver = OovResolver::new(&embeddings, &bigram, &lexicon_counts);

        let scores = resolver.bigram_scores(Some("unseen_left"), Some("unseen_right"), &["dog", "cat"]);
        assert!(scores[1] > scores[0]);
        assert!((scores[0] - 1.0 / 6.0).abs() < 1e-9);
        assert!((scores[1] - 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn resolve_errors_on_empty_lexicon() {
        let embeddings = EmbeddingStore::new(vec![], vec![]).unwrap();
        let bigram = BigramModel::train(std::iter::empty(), std::iter::empty()).unwrap();
        let lexicon_counts = FxHashMap::default();
        let resolver = OovResolver::new(&embeddings, &bigram, &lexicon_counts);
        assert!(matches!(
            resolver.resolve("anything", None, None),
            Err(PcfgError::EmptyCandidates)
        ));
    }

    #[test]
    fn argmax_breaks_ties_toward_lowest_index() {
        assert_eq!(Some(0), OovResolver::argmax(&[0.5, 0.5, 0.5]));
        assert_eq!(Some(1), OovResolver::argmax(&[0.1, 0.9, 0.2]));
    }

    #[test]
    fn substitute_replaces_only_unknown_words_using_original_context() {
        use crate::sentence::Sentence;

        let (embeddings, bigram, lexicon_counts) = fixtures();
        let resolver = OovResolver::new(&embeddings, &bigram, &lexicon_counts);
        let lexicon = ["the", "dog", "barks", "cat", "meows"];

        let mut sentence = Sentence(vec![
            "the".to_string(),
            "dpg".to_string(),
            "barks".to_string(),
        ]);
        resolver
            .substitute(&mut sentence, |w: &String| lexicon.contains(&w.as_str()))
            .unwrap();

        assert_eq!(
            Sentence(vec![
                "the".to_string(),
                "dog".to_string(),
                "barks".to_string()
            ]),
            sentence
        );
    }
}
