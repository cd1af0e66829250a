use std::convert::TryFrom;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use fxhash::FxHashMap;
use multimap::MultiMap;
use smallstr::SmallString;

use super::rule::{Rule, WeightedRule};
use crate::error::{PcfgError, Result};
use crate::sexp::{strip_outer_wrapper, SExp};
use crate::tree::Tree;

pub type Tag = SmallString<[u8; 8]>;
pub type Token = SmallString<[u8; 8]>;

const EPSILON: f64 = 1e-9;

/// Accumulates rule and lexicon counts from a binarized training treebank
/// and normalises them into the probability tables that feed
/// [`super::parse::GrammarParse`]. Trees fed to this estimator are expected
/// to already be in binary form (arity <= 2 everywhere): the `binarise`
/// pipeline stage, not this one, is where markovization happens.
#[derive(Debug, Default)]
pub struct GrammarBare {
    count_lhs: FxHashMap<Tag, u64>,
    count_rule: FxHashMap<Rule<Tag, Token>, u64>,
    count_token: FxHashMap<Token, u64>,
    rhss_by_lhs: MultiMap<Tag, Vec<Tag>>,
    tags_by_token: MultiMap<Token, Tag>,
}

impl GrammarBare {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one binarized bracketed tree line and folds it into the
    /// running counts.
    pub fn observe_line(&mut self, line: &str) -> Result<()> {
        let sexp = SExp::<Tag>::from_str(line)
            .map_err(|e| PcfgError::MalformedTree(e.to_string()))?;
        let tree = Tree::try_from(&strip_outer_wrapper(sexp))?;
        self.observe(&tree)
    }

    fn observe(&mut self, tree: &Tree<Tag>) -> Result<()> {
        if tree.is_leaf() {
            return Ok(());
        }

        match tree.children.as_slice() {
            [child] if child.is_leaf() => {
                let tag = tree.root.clone();
                let token = child.root.clone();

                *self.count_lhs.entry(tag.clone()).or_insert(0) += 1;
                *self.count_token.entry(token.clone()).or_insert(0) += 1;

                let already_tagged = self
                    .tags_by_token
                    .get_vec(&token)
                    .map_or(false, |v| v.contains(&tag));
                if !already_tagged {
                    self.tags_by_token.insert(token.clone(), tag.clone());
                }

                *self
                    .count_rule
                    .entry(Rule::Lexical {
                        lhs: tag,
                        rhs: token,
                    })
                    .or_insert(0) += 1;

                Ok(())
            }
            [child] => {
                let lhs = tree.root.clone();
                let rhs = vec![child.root.clone()];
                self.observe_nonlexical(lhs, rhs)?;
                self.observe(child)
            }
            [left, right] => {
                let lhs = tree.root.clone();
                let rhs = vec![left.root.clone(), right.root.clone()];
                self.observe_nonlexical(lhs, rhs)?;
                self.observe(left)?;
                self.observe(right)
            }
            children => Err(PcfgError::MalformedTree(format!(
                "node `{}` has arity {} after binarization; PCFG estimation requires arity 1 or 2",
                tree.root,
                children.len()
            ))),
        }
    }

    fn observe_nonlexical(&mut self, lhs: Tag, rhs: Vec<Tag>) -> Result<()> {
        *self.count_lhs.entry(lhs.clone()).or_insert(0) += 1;

        let already_present = self
            .rhss_by_lhs
            .get_vec(&lhs)
            .map_or(false, |v| v.contains(&rhs));
        if !already_present {
            self.rhss_by_lhs.insert(lhs.clone(), rhs.clone());
        }

        *self
            .count_rule
            .entry(Rule::NonLexical { lhs, rhs })
            .or_insert(0) += 1;

        Ok(())
    }

    pub fn word_counts(&self) -> &FxHashMap<Token, u64> {
        &self.count_token
    }

    /// Normalises accumulated counts into the grammar's weighted rule set.
    ///
    /// Non-lexical rules get `count(A -> alpha) / count(A)`. Lexical entries
    /// get the posterior `count(t, A) / count(t)` -- the value the PCYK
    /// chart actually multiplies in as its leaf score, per the parser's
    /// contract, not the classical emission likelihood.
    ///
    /// Validates invariant 1 (per-LHS probabilities, using the likelihood
    /// form `count(A -> t) / count(A)` for lexical entries, sum to 1) and
    /// invariant 2 (per-token posteriors sum to 1) before returning;
    /// violations beyond `EPSILON` abort with `InconsistentGrammar`.
    pub fn normalize(self) -> Result<Vec<WeightedRule<Tag, Token, f64>>> {
        self.validate_lhs_sums()?;
        self.validate_token_sums()?;

        let mut rules = Vec::with_capacity(self.count_rule.len());
        for (rule, count) in &self.count_rule {
            let weight = match rule {
                Rule::NonLexical { lhs, .. } => {
                    *count as f64 / self.count_lhs[lhs] as f64
                }
                Rule::Lexical { rhs: token, .. } => {
                    *count as f64 / self.count_token[token] as f64
                }
            };
            rules.push(WeightedRule {
                rule: rule.clone(),
                weight,
            });
        }

        Ok(rules)
    }

    fn validate_lhs_sums(&self) -> Result<()> {
        let mut sums: FxHashMap<&Tag, f64> = FxHashMap::default();
        for (rule, count) in &self.count_rule {
            let lhs = match rule {
                Rule::NonLexical { lhs, .. } => lhs,
                Rule::Lexical { lhs, .. } => lhs,
            };
            let denom = self.count_lhs[lhs] as f64;
            *sums.entry(lhs).or_insert(0.0) += *count as f64 / denom;
        }

        for (lhs, sum) in sums {
            if (sum - 1.0).abs() > EPSILON {
                return Err(PcfgError::InconsistentGrammar(format!(
                    "rule probabilities for LHS `{}` sum to {}, expected 1",
                    lhs, sum
                )));
            }
        }

        Ok(())
    }

    fn validate_token_sums(&self) -> Result<()> {
        let mut sums: FxHashMap<&Token, f64> = FxHashMap::default();
        for (rule, count) in &self.count_rule {
            if let Rule::Lexical { rhs: token, .. } = rule {
                let denom = self.count_token[token] as f64;
                *sums.entry(token).or_insert(0.0) += *count as f64 / denom;
            }
        }

        for (token, sum) in sums {
            if (sum - 1.0).abs() > EPSILON {
                return Err(PcfgError::InconsistentGrammar(format!(
                    "posterior tag probabilities for token `{}` sum to {}, expected 1",
                    token, sum
                )));
            }
        }

        Ok(())
    }
}

/// Writes `.rules`-format lines (`LHS -> RHS1 RHS2 ... weight`) for every
/// non-lexical rule.
pub fn write_non_lexical_rules<W: Write>(
    rules: &[WeightedRule<Tag, Token, f64>],
    buf: &mut W,
) -> io::Result<()> {
    for weighted in rules {
        if let Rule::NonLexical { lhs, rhs } = &weighted.rule {
            write!(buf, "{} -> ", lhs)?;
            for n in rhs {
                write!(buf, "{} ", n)?;
            }
            writeln!(buf, "{}", weighted.weight)?;
        }
    }
    Ok(())
}

/// Writes `.lexicon`-format lines (`TAG token weight`) for every lexical
/// rule.
pub fn write_lexical_rules<W: Write>(
    rules: &[WeightedRule<Tag, Token, f64>],
    buf: &mut W,
) -> io::Result<()> {
    for weighted in rules {
        if let Rule::Lexical { lhs, rhs } = &weighted.rule {
            writeln!(buf, "{} {} {}", lhs, rhs, weighted.weight)?;
        }
    }
    Ok(())
}

/// Writes the `.words` file: one `token count` line per lexicon token, where
/// `count` is `count(token)` (spec.md §4.2's total treebank-leaf occurrence
/// count). This is the lexicon frequency the OOV resolver's §4.6
/// renormalization fallback needs -- it is not recoverable from `.rules`/
/// `.lexicon` alone, since those only carry normalised posteriors.
pub fn write_terminals<W: Write>(
    word_counts: &FxHashMap<Token, u64>,
    buf: &mut W,
) -> io::Result<()> {
    for (token, count) in word_counts {
        writeln!(buf, "{} {}", token, count)?;
    }
    Ok(())
}

/// Reads a `.words` file written by [`write_terminals`] back into a
/// token -> lexicon-occurrence-count map.
pub fn read_terminal_counts<R: BufRead>(reader: R) -> Result<FxHashMap<String, u64>> {
    let mut counts = FxHashMap::default();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let mut parts = line.rsplitn(2, ' ');
        let count = parts
            .next()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| {
                PcfgError::MalformedTree(format!("malformed terminal-count line: `{}`", line))
            })?;
        let token = parts.next().ok_or_else(|| {
            PcfgError::MalformedTree(format!("malformed terminal-count line: `{}`", line))
        })?;

        counts.insert(token.to_string(), count);
    }
    Ok(counts)
}
