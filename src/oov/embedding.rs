use std::io::{Read, Write};

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{PcfgError, Result};

/// A word -> row-index map plus its dense matrix of real vectors,
/// flattened row-major for bincode's benefit. Loaded once at start-up and
/// never mutated.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingStore {
    words: Vec<String>,
    vocab: FxHashMap<String, usize>,
    vectors: Vec<f64>,
    dim: usize,
}

impl EmbeddingStore {
    pub fn new(words: Vec<String>, vectors: Vec<Vec<f64>>) -> Result<Self> {
        let dim = vectors.first().map_or(0, |v| v.len());
        if vectors.iter().any(|v| v.len() != dim) {
            return Err(PcfgError::InconsistentGrammar(
                "embedding vectors must all share the same dimension".to_string(),
            ));
        }
        if words.len() != vectors.len() {
            return Err(PcfgError::InconsistentGrammar(format!(
                "embedding word list has {} entries but {} vectors were given",
                words.len(),
                vectors.len()
            )));
        }

        let vocab = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
        let flattened = vectors.into_iter().flatten().collect();

        Ok(Self {
            words,
            vocab,
            vectors: flattened,
            dim,
        })
    }

    pub fn load<R: Read>(reader: R) -> Result<Self> {
        bincode::deserialize_from(reader)
            .map_err(|e| PcfgError::InconsistentGrammar(format!("malformed embedding file: {e}")))
    }

    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        bincode::serialize_into(writer, self)
            .map_err(|e| PcfgError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.vocab.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.vocab.get(word).copied()
    }

    fn row(&self, index: usize) -> &[f64] {
        let start = index * self.dim;
        &self.vectors[start..start + self.dim]
    }

    /// Cosine similarity between two words already known to be present in
    /// the embedding vocabulary.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        let a = self.row(self.index_of(a)?);
        let b = self.row(self.index_of(b)?);

        let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            Some(0.0)
        } else {
            Some(dot / (norm_a * norm_b))
        }
    }

    /// Digit normalisation: every decimal digit character becomes `#`.
    pub fn normalize_digits(word: &str) -> String {
        word.chars()
            .map(|c| if c.is_ascii_digit() { '#' } else { c })
            .collect()
    }

    /// Case normalisation: tries lower, upper, title case (in that order for
    /// tie-breaking) and returns whichever in-vocabulary variant has the
    /// smallest row index. Returns the input unchanged if none match.
    pub fn normalize_case(&self, word: &str) -> String {
        let candidates = [
            word.to_lowercase(),
            word.to_uppercase(),
            title_case(word),
        ];

        candidates
            .into_iter()
            .filter_map(|candidate| self.index_of(&candidate).map(|idx| (idx, candidate)))
            .min_by_key(|(idx, _)| *idx)
            .map(|(_, candidate)| candidate)
            .unwrap_or_else(|| word.to_string())
    }

    /// Digit normalisation first; if still out of vocabulary, case
    /// normalisation on the digit-normalised result. The returned word is
    /// not guaranteed to be in vocabulary.
    pub fn normalize(&self, word: &str) -> String {
        let mut w = word.to_string();
        if !self.contains(&w) {
            w = Self::normalize_digits(&w);
        }
        if !self.contains(&w) {
            w = self.normalize_case(&w);
        }
        w
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn store() -> EmbeddingStore {
        EmbeddingStore::new(
            vec!["Paris".to_string(), "####".to_string(), "dog".to_string()],
            vec![
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn case_normalisation_prefers_smallest_index() {
        let store = store();
        assert_eq!("Paris", store.normalize_case("paris"));
        assert_eq!("Paris", store.normalize_case("PARIS"));
    }

    #[test]
    fn digit_normalisation_then_case() {
        let store = store();
        assert_eq!("####", store.normalize("1995"));
    }

    #[test]
    fn normalize_passes_through_when_nothing_matches() {
        let store = store();
        assert_eq!("unknownword", store.normalize("unknownword"));
    }

    #[test]
    fn cosine_similarity_matches_expected_values() {
        let store = store();
        // Paris=[1,0], dog=[1,1]: cos = 1/sqrt(2).
        let sim = store.similarity("Paris", "dog").unwrap();
        assert!((sim - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);

        // Orthogonal vectors.
        let sim2 = store.similarity("Paris", "####").unwrap();
        assert!(sim2.abs() < 1e-9);
    }

    #[test]
    fn bincode_roundtrip() {
        let store = store();
        let mut buf = Vec::new();
        store.save(&mut buf).unwrap();
        let loaded = EmbeddingStore::load(buf.as_slice()).unwrap();
        assert_eq!(store.words, loaded.words);
        assert_eq!(store.vectors, loaded.vectors);
    }
}
