use thiserror::Error;

/// The error kinds the core distinguishes.
///
/// `MalformedTree` and `InconsistentGrammar` are estimator-construction
/// failures. `UnknownTag` guards the tag/id bijection a chart parser relies
/// on: this estimator auto-interns every tag it sees, so the variant exists
/// for any future caller that builds a `GrammarParse` from pre-assigned ids
/// instead. `EmptyCandidates` is only reachable with an empty lexicon.
/// `NoDerivation` describes the per-sentence, recoverable case where PCYK
/// finds no parse; callers log it and fall back to a flat tree rather than
/// aborting the batch.
#[derive(Error, Debug)]
pub enum PcfgError {
    #[error("malformed tree: {0}")]
    MalformedTree(String),

    #[error("inconsistent grammar: {0}")]
    InconsistentGrammar(String),

    #[error("unknown tag referenced: {0}")]
    UnknownTag(String),

    #[error("OOV resolver has no candidates: lexicon is empty")]
    EmptyCandidates,

    #[error("no derivation found for sentence")]
    NoDerivation,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PcfgError>;
