pub mod binarized;
pub mod error;
pub mod grammar;
pub mod oov;
pub mod sentence;
pub mod sexp;
pub mod signature;
pub mod tree;
pub mod unk;

use std::convert::TryFrom;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgEnum, Parser, Subcommand};
use float_ord::FloatOrd;
use fxhash::FxHashMap;
use rayon::prelude::*;
use tracing::{info, warn};

use grammar::bare::{self, GrammarBare};
use grammar::parse::GrammarParse;
use grammar::rule::{Rule, WeightedRule};
use oov::bigram::BigramModel;
use oov::embedding::EmbeddingStore;
use oov::resolver::OovResolver;
use sentence::Sentence;
use sexp::{strip_outer_wrapper, SExp};
use tree::Tree;

type Tag = bare::Tag;
type Token = bare::Token;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reads a sequence of binarized constituent trees from STDIN and prints the induced PCFG to STDOUT.
    /// If the optional argument [GRAMMAR] is present, it is written into the files
    /// GRAMMAR.rules, GRAMMAR.lexicon and GRAMMAR.words.
    Induce { grammar: Option<String> },
    /// Reads a sequence of sentences from STDIN and returns the best derived parse trees to STDOUT.
    /// RULES and LEXICON are the files that make up the used PCFG.
    Parse {
        rules: String,
        lexicon: String,
        /// Choose the parsing paradigm.
        #[clap(short, long, default_value_t=ParsingParadigma::Cyk, arg_enum)]
        paradigma: ParsingParadigma,
        /// The grammar's sentence-root tag.
        #[clap(short, long, default_value_t = String::from("SENT"))]
        initial_nonterminal: String,
        /// Do trivial unking on supplied sentences before parsing.
        #[clap(short, long)]
        unking: bool,
        /// Do smoothing on supplied sentences before parsing.
        #[clap(short, long)]
        smoothing: bool,
        /// Pretrained word embeddings (bincode-encoded `EmbeddingStore`), used to score
        /// OOV candidates by cosine similarity. Without this, OOV resolution falls back
        /// to bigram context alone.
        #[clap(long)]
        embeddings: Option<PathBuf>,
        /// Whitespace-tokenised training sentences, used to estimate the bigram model
        /// that drives OOV resolution. Required for OOV substitution to run at all.
        #[clap(long)]
        bigram_sentences: Option<PathBuf>,
        /// The `.words` file written by `induce` (token and lexicon occurrence count
        /// per line), used by the OOV resolver's all-candidates-tied renormalization
        /// fallback. Without it, that fallback degrades to a uniform split over the
        /// tied candidates instead of the treebank-frequency-weighted one.
        #[clap(long)]
        words: Option<PathBuf>,
        /// Not implemented: rule pruning is out of scope for this parser.
        #[clap(short, long)]
        threshold_beam: Option<f64>,
        /// Not implemented: rule pruning is out of scope for this parser.
        #[clap(short, long)]
        rank_beam: Option<usize>,
        /// Not implemented.
        #[clap(short, long)]
        kbest: Option<u32>,
        /// Not implemented.
        #[clap(short, long)]
        astar: Option<PathBuf>,
    },
    /// Reads constituent trees from STDIN and returns their binarised counterparts to STDOUT.
    Binarise {
        /// Set horizontal markovisation parameter.
        #[clap(short, long, default_value_t = 999)]
        horizontal: usize,
        /// Set vertical markovisation parameter.
        #[clap(short, long, default_value_t = 1)]
        vertical: usize,
    },
    /// Reads binarised constituent trees from STDIN and returns them in their original state to STDOUT.
    Debinarise,
    /// Reads sequence of constituent trees from STDIN and returns the derived trees via trivial unking.
    Unk {
        /// If a word occurs less often than the threshold it gets unked.
        #[clap(short, long)]
        threshold: usize,
    },
    /// Reads sequence of constituent trees from STDIN and returns the derived trees via smoothing.
    Smooth {
        /// If a word occurs less often than the threshold it gets unked with the derived signature.
        #[clap(short, long)]
        threshold: usize,
    },
}

#[derive(ArgEnum, Copy, Clone, PartialEq, Eq)]
enum ParsingParadigma {
    Cyk,
    Deductive,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Induce { grammar } => induce(grammar.as_deref()),
        Commands::Parse {
            rules,
            lexicon,
            paradigma,
            initial_nonterminal,
            unking,
            smoothing,
            embeddings,
            bigram_sentences,
            words,
            threshold_beam,
            rank_beam,
            kbest,
            astar,
        } => {
            if kbest.is_some()
                || astar.is_some()
                || threshold_beam.is_some()
                || rank_beam.is_some()
                || *paradigma == ParsingParadigma::Deductive
            {
                eprintln!(
                    "k-best/beam pruning/A*/deductive parsing are out of scope for this parser"
                );
                std::process::exit(22);
            }

            if *unking && *smoothing {
                eprintln!("unking and smoothing are mutually exclusive; only use one");
                std::process::exit(1);
            }

            parse(
                rules,
                lexicon,
                initial_nonterminal,
                *unking,
                *smoothing,
                embeddings.as_deref(),
                bigram_sentences.as_deref(),
                words.as_deref(),
            )
        }
        Commands::Binarise {
            horizontal,
            vertical,
        } => {
            binarise(*horizontal, *vertical);
            Ok(())
        }
        Commands::Debinarise => {
            debinarise();
            Ok(())
        }
        Commands::Unk { threshold } => {
            unking(UnkingMode::Trivial, *threshold);
            Ok(())
        }
        Commands::Smooth { threshold } => {
            unking(UnkingMode::Smoothing, *threshold);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Reads binarized bracketed tree lines from STDIN, estimates a PCFG and
/// writes the three on-disk tables: `.rules` (binary and unary rules),
/// `.lexicon` (preterminal emissions) and `.words` (the lexicon's token
/// inventory). With no grammar name given, writes all three in sequence to
/// STDOUT.
fn induce(grammar_name: Option<&str>) -> error::Result<()> {
    let stdin = io::stdin();
    let handle = stdin.lock();

    let mut grammar = GrammarBare::new();
    let mut line_no = 0usize;
    for line in handle.lines() {
        line_no += 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = grammar.observe_line(&line) {
            warn!(line = line_no, error = %e, "skipping malformed training tree");
        }
    }

    let word_counts = grammar.word_counts().clone();
    let rules = grammar.normalize()?;
    info!(rules = rules.len(), "induced grammar");

    if let Some(name) = grammar_name {
        let mut rules_file = File::create(format!("{}.rules", name))?;
        bare::write_non_lexical_rules(&rules, &mut rules_file)?;
        let mut lexicon_file = File::create(format!("{}.lexicon", name))?;
        bare::write_lexical_rules(&rules, &mut lexicon_file)?;
        let mut words_file = File::create(format!("{}.words", name))?;
        bare::write_terminals(&word_counts, &mut words_file)?;
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        bare::write_non_lexical_rules(&rules, &mut out)?;
        bare::write_lexical_rules(&rules, &mut out)?;
        bare::write_terminals(&word_counts, &mut out)?;
    }

    Ok(())
}

fn load_rules(
    grammar: &mut GrammarParse<Tag, Token, FloatOrd<f64>>,
    path: &str,
) -> error::Result<()> {
    let file = File::open(path)?;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match WeightedRule::<Tag, Token, f64>::from_str(&line) {
            Ok(WeightedRule {
                rule: Rule::Lexical { lhs, rhs },
                weight,
            }) => {
                grammar.insert_rule(WeightedRule {
                    rule: Rule::Lexical { lhs, rhs },
                    weight: FloatOrd(weight),
                })?;
            }
            Ok(WeightedRule {
                rule: Rule::NonLexical { lhs, rhs },
                weight,
            }) => {
                grammar.insert_rule(WeightedRule {
                    rule: Rule::NonLexical { lhs, rhs },
                    weight: FloatOrd(weight),
                })?;
            }
            Err(e) => warn!(file = path, error = %e, "skipping malformed rule line"),
        }
    }
    Ok(())
}

/// Reads `rules`/`lexicon` into a `GrammarParse`, optionally builds an OOV
/// resolver from `--embeddings`/`--bigram-sentences`, then parses every
/// sentence on STDIN with PCYK, un-binarizes the recovered derivation and
/// prints it. A sentence with no derivation never aborts the batch: it is
/// logged and printed as the flat fallback tree.
#[allow(clippy::too_many_arguments)]
fn parse(
    rules: &str,
    lexicon: &str,
    initial_nonterminal: &str,
    unking: bool,
    smoothing: bool,
    embeddings: Option<&std::path::Path>,
    bigram_sentences: Option<&std::path::Path>,
    words: Option<&std::path::Path>,
) -> error::Result<()> {
    let root: Tag = Tag::from(initial_nonterminal);
    let mut grammar = GrammarParse::new(root.clone());
    load_rules(&mut grammar, rules)?;
    load_rules(&mut grammar, lexicon)?;
    info!(
        lexicon_size = grammar.lexical_tokens().count(),
        "grammar loaded"
    );

    let bigram_model = bigram_sentences
        .map(|path| -> error::Result<BigramModel> {
            let text = std::fs::read_to_string(path)?;
            let tokens: Vec<&str> = grammar.lexical_tokens().map(|t| t.as_ref()).collect();
            BigramModel::train(tokens.into_iter(), text.lines())
        })
        .transpose()?;

    // An embeddings file is optional; when `--bigram-sentences` is given
    // without `--embeddings`, an empty store stands in so every word takes
    // the bigram-only resolution path rather than disabling OOV resolution
    // entirely.
    let embedding_store = match embeddings {
        Some(path) => {
            let file = File::open(path)?;
            Some(EmbeddingStore::load(BufReader::new(file))?)
        }
        None if bigram_model.is_some() => Some(EmbeddingStore::new(vec![], vec![])?),
        None => None,
    };

    if let (Some(store), Some(_)) = (&embedding_store, &bigram_model) {
        info!(vocab = store.len(), "OOV resolver ready");
    }

    // The `.words` file carries `count(token)` from the treebank lexicon
    // (spec.md §4.2), which the resolver's all-candidates-tied
    // renormalization fallback (§4.6) requires. Without it, that fallback
    // has no lexicon frequency to renormalize over and degrades to a
    // uniform split across the tied candidates.
    let lexicon_counts: FxHashMap<String, u64> = match words {
        Some(path) => {
            let file = File::open(path)?;
            bare::read_terminal_counts(BufReader::new(file))?
        }
        None => FxHashMap::default(),
    };

    let resolver = match (&embedding_store, &bigram_model) {
        (Some(embeddings), Some(bigram)) => {
            Some(OovResolver::new(embeddings, bigram, &lexicon_counts))
        }
        _ => None,
    };

    const LINES_READ: usize = 128;
    let stdin = io::stdin();
    let mut handle = stdin.lock();
    let mut input_buf = String::new();
    let mut done = false;

    while !done {
        for _ in 0..LINES_READ {
            match handle.read_line(&mut input_buf) {
                Ok(0) => {
                    done = true;
                    break;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "error reading input line"),
            }
        }

        let outputs: Vec<String> = input_buf
            .par_lines()
            .filter_map(|l| {
                if l.trim().is_empty() {
                    return None;
                }
                match Sentence::<Token>::from_str(l) {
                    Ok(s) => Some(s),
                    Err(e) => {
                        warn!(error = %e, "skipping malformed sentence");
                        None
                    }
                }
            })
            .map(|mut sentence| {
                let word_map = if unking {
                    sentence.unkify(grammar.rules_lexical())
                } else if smoothing {
                    sentence.smooth(grammar.rules_lexical())
                } else {
                    if let Some(resolver) = &resolver {
                        if let Err(e) = resolver.substitute(&mut sentence, |t| grammar.has_lexical_entry(t)) {
                            warn!(error = %e, "OOV resolution failed for sentence");
                        }
                    }
                    None
                };

                // The bracketed output is wrapped in one more outer parenthesis
                // pair than the tree's own `(TAG ...)` rendering, matching the
                // double-paren `((SENT ...))` convention spec.md §6 uses for the
                // training-tree format.
                match grammar.cyk(&sentence) {
                    Some(mut recovered) => {
                        if let Some(word_map) = word_map {
                            recovered.deunkify(word_map);
                        }
                        let plain = recovered.into_label_tree();
                        let markovized = plain.parse_markovized();
                        format!("({})", markovized.debinarize())
                    }
                    None => {
                        warn!("no derivation found for sentence; emitting flat fallback tree");
                        format!("({})", sentence.into_noparse(root.clone()))
                    }
                }
            })
            .collect();

        for line in outputs {
            println!("{}", line);
        }

        input_buf.clear();
    }

    Ok(())
}

fn binarise(horizontal: usize, vertical: usize) {
    let stdin = io::stdin();
    let handle = stdin.lock();

    for line in handle.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "error reading input line");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let sexp = match SExp::<Tag>::from_str(&line) {
            Ok(s) => strip_outer_wrapper(s),
            Err(e) => {
                warn!(error = %e, "skipping malformed tree line");
                continue;
            }
        };

        let tree = match Tree::try_from(&sexp) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "skipping malformed tree line");
                continue;
            }
        };

        println!("{}", tree.markovize(vertical, horizontal, &[]));
    }
}

fn debinarise() {
    let stdin = io::stdin();
    let handle = stdin.lock();

    for line in handle.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "error reading input line");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let sexp = match SExp::<Tag>::from_str(&line) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "skipping malformed tree line");
                continue;
            }
        };

        let tree = match Tree::try_from(&sexp) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "skipping malformed tree line");
                continue;
            }
        };

        println!("{}", tree.parse_markovized().debinarize());
    }
}

enum UnkingMode {
    Trivial,
    Smoothing,
}

fn unking(mode: UnkingMode, threshold: usize) {
    let stdin = io::stdin();
    let handle = stdin.lock();

    let mut word_count: FxHashMap<Tag, usize> = FxHashMap::default();

    let mut trees: Vec<Tree<Tag>> = Vec::new();
    for line in handle.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "error reading input line");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let sexp = match SExp::<Tag>::from_str(&line) {
            Ok(s) => strip_outer_wrapper(s),
            Err(e) => {
                warn!(error = %e, "skipping malformed tree line");
                continue;
            }
        };

        match Tree::try_from(&sexp) {
            Ok(t) => trees.push(t),
            Err(e) => warn!(error = %e, "skipping malformed tree line"),
        }
    }

    for tree in &trees {
        unk::count_words(tree, &mut word_count);
    }

    // We keep all words that we don't want to unkify.
    word_count.retain(|_, v| *v > threshold);
    let word_count = word_count;

    for mut tree in trees {
        match mode {
            UnkingMode::Trivial => tree.unkify(&word_count),
            UnkingMode::Smoothing => tree.smooth(&word_count),
        };
        println!("{}", tree);
    }
}
