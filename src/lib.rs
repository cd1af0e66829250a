pub mod binarized;
pub mod error;
pub mod grammar;
pub mod oov;
pub mod sentence;
pub mod sexp;
pub mod signature;
pub mod tree;
pub mod unk;

pub use sentence::Sentence;
pub use tree::Tree;

/// End-to-end pipeline tests wiring the estimator, the interned-tag PCYK
/// chart and the OOV resolver together, matching spec.md §8's S1/S2
/// scenarios. Everything below these is already covered closer to the
/// relevant module (DL distance: `oov::edit_distance`; bigram row sums:
/// `oov::bigram`; case/digit normalisation: `oov::embedding`).
#[cfg(test)]
mod end_to_end {
    use std::str::FromStr;
    use float_ord::FloatOrd;
    use fxhash::FxHashMap;

    use crate::grammar::bare::{GrammarBare, Tag};
    use crate::grammar::parse::GrammarParse;
    use crate::grammar::rule::WeightedRule;
    use crate::oov::bigram::BigramModel;
    use crate::oov::embedding::EmbeddingStore;
    use crate::oov::resolver::OovResolver;
    use crate::Sentence;

    fn induce(tree_line: &str) -> (GrammarParse<Tag, Tag, FloatOrd<f64>>, FxHashMap<String, u64>) {
        let mut bare = GrammarBare::new();
        bare.observe_line(tree_line).unwrap();
        let lexicon_counts: FxHashMap<String, u64> = bare
            .word_counts()
            .iter()
            .map(|(token, count)| (token.to_string(), *count))
            .collect();
        let rules = bare.normalize().unwrap();

        let mut grammar = GrammarParse::new(Tag::from("SENT"));
        for weighted in rules {
            grammar
                .insert_rule(WeightedRule {
                    rule: weighted.rule,
                    weight: FloatOrd(weighted.weight),
                })
                .unwrap();
        }
        (grammar, lexicon_counts)
    }

    /// S1: a grammar induced from a single tree reproduces that exact
    /// sentence with a fully deterministic (probability-1 at every step)
    /// derivation isomorphic to the training tree, modulo the VN->V unary
    /// chain (a genuine unary chain, not a binarization artifact, so it
    /// survives into the parse result unchanged).
    #[test]
    fn s1_single_tree_grammar_reparses_its_own_sentence() {
        let (grammar, _) = induce("((SENT (NP (DET the) (N cat)) (VN (V sleeps))))");
        let sentence = Sentence::<Tag>::from_str("the cat sleeps").unwrap();

        let parsed = grammar.cyk(&sentence).unwrap();
        assert_eq!(
            "((SENT (NP (DET the) (N cat)) (VN (V sleeps))))",
            format!("({})", parsed)
        );
    }

    /// S2: "runs" is OOV against a lexicon of {the, cat, sleeps}; at edit
    /// distance k=2 none of the three lexicon tokens are close enough, so
    /// the resolver falls back to the full lexicon and picks the token
    /// maximising the bigram product conditional on (cat, <BOUNDARY>) --
    /// "sleeps" is the only token the single-sentence bigram model ever
    /// observed following "cat" and preceding a sentence boundary.
    #[test]
    fn s2_oov_word_resolved_via_full_lexicon_bigram_fallback() {
        let (grammar, lexicon_counts) = induce("((SENT (NP (DET the) (N cat)) (VN (V sleeps))))");

        let tokens: Vec<&str> = grammar.lexical_tokens().map(|t| t.as_ref()).collect();
        let bigram = BigramModel::train(tokens.into_iter(), std::iter::once("the cat sleeps"))
            .unwrap();
        let embeddings = EmbeddingStore::new(vec![], vec![]).unwrap();
        let resolver = OovResolver::new(&embeddings, &bigram, &lexicon_counts);

        let mut sentence = Sentence::<Tag>::from_str("the cat runs").unwrap();
        resolver
            .substitute(&mut sentence, |t: &Tag| grammar.has_lexical_entry(t))
            .unwrap();
        assert_eq!(
            Sentence(vec![Tag::from("the"), Tag::from("cat"), Tag::from("sleeps")]),
            sentence
        );

        let parsed = grammar.cyk(&sentence).unwrap();
        assert_eq!(
            "((SENT (NP (DET the) (N cat)) (VN (V sleeps))))",
            format!("({})", parsed)
        );
    }
}
