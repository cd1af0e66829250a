use fxhash::FxHashMap;

use crate::error::{PcfgError, Result};

/// A bigram language model over the grammar's lexicon tokens, with one
/// boundary sentinel appended at index `len(tokens)` standing in for
/// sentence-start/sentence-end. Rows are normalised counts; a row with no
/// observed transitions stays all-zero rather than becoming uniform or NaN.
#[derive(Debug)]
pub struct BigramModel {
    token2id: FxHashMap<String, usize>,
    id2token: Vec<String>,
    boundary: usize,
    /// Row-major `(boundary + 1) x (boundary + 1)` transition matrix.
    transitions: Vec<f64>,
}

impl BigramModel {
    /// `tokens` must be the lexicon's tokens in stable insertion order;
    /// `lines` is the training corpus, one whitespace-tokenised sentence per
    /// line. Every token in `lines` is expected to already be a lexicon
    /// token (the sentence file is assumed derived from the same trees as
    /// the grammar); a line containing a token outside `tokens` is an
    /// input-consistency error, not silently folded into the boundary
    /// symbol.
    pub fn train<'a>(
        tokens: impl Iterator<Item = &'a str>,
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<Self> {
        let id2token: Vec<String> = tokens.map(str::to_string).collect();
        let token2id: FxHashMap<String, usize> = id2token
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        let boundary = id2token.len();
        let dim = boundary + 1;
        let mut counts = vec![0f64; dim * dim];

        for line in lines {
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }

            let mut prev = boundary;
            for word in &words {
                let cur = token2id.get(*word).copied().ok_or_else(|| {
                    PcfgError::InconsistentGrammar(format!(
                        "bigram training sentence contains token `{}` absent from the lexicon",
                        word
                    ))
                })?;
                counts[prev * dim + cur] += 1.0;
                prev = cur;
            }
            counts[prev * dim + boundary] += 1.0;
        }

        for row in 0..dim {
            let start = row * dim;
            let sum: f64 = counts[start..start + dim].iter().sum();
            if sum > 0.0 {
                for cell in &mut counts[start..start + dim] {
                    *cell /= sum;
                }
            }
        }

        Ok(Self {
            token2id,
            id2token,
            boundary,
            transitions: counts,
        })
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token2id.contains_key(token)
    }

    pub fn id_of(&self, token: &str) -> Option<usize> {
        self.token2id.get(token).copied()
    }

    pub fn tokens(&self) -> &[String] {
        &self.id2token
    }

    fn dim(&self) -> usize {
        self.boundary + 1
    }

    /// `None` as either index means sentence boundary.
    fn cell(&self, from: usize, to: usize) -> f64 {
        self.transitions[from * self.dim() + to]
    }

    /// Left factor of the bigram score for `candidate`, given the word
    /// preceding it. `prev_word = None` means sentence start (boundary
    /// lookup); `Some(w)` where `w` is not in the lexicon contributes a
    /// neutral factor of 1.0 rather than a boundary lookup, since an unknown
    /// neighbor carries no bigram evidence either way.
    pub fn left_factor(&self, prev_word: Option<&str>, candidate: &str) -> f64 {
        let candidate_id = match self.id_of(candidate) {
            Some(id) => id,
            None => return 1.0,
        };
        match prev_word {
            None => self.cell(self.boundary, candidate_id),
            Some(w) => match self.id_of(w) {
                Some(id) => self.cell(id, candidate_id),
                None => 1.0,
            },
        }
    }

    /// Right factor, symmetric to [`Self::left_factor`].
    pub fn right_factor(&self, candidate: &str, next_word: Option<&str>) -> f64 {
        let candidate_id = match self.id_of(candidate) {
            Some(id) => id,
            None => return 1.0,
        };
        match next_word {
            None => self.cell(candidate_id, self.boundary),
            Some(w) => match self.id_of(w) {
                Some(id) => self.cell(candidate_id, id),
                None => 1.0,
            },
        }
    }
}
