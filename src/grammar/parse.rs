use std::collections::BinaryHeap;
use std::hash::Hash;

use float_ord::FloatOrd;
use fxhash::FxHashMap;
use multimap::MultiMap;

use super::chart::Chart;
use super::rule::{Rule, WeightedRule};
use crate::error::{PcfgError, Result};
use crate::tree::NodeType;
use crate::Sentence;
use crate::Tree;

/// Backtrace information recorded alongside a chart cell's best weight, used
/// to reconstruct the actual derivation once PCYK finishes.
/// `Binary` refers to the two child cells (already flattened chart indices).
/// `Chain` refers to the non-terminal occupying the same cell that this
/// entry was unary-derived from. `Term` is the position of the terminal in
/// the input sentence.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
enum BacktraceInfo {
    Binary(usize, usize),
    Chain(usize),
    Term(usize),
}

type Cell = (FloatOrd<f64>, Option<BacktraceInfo>);

/// Grammar representation specialized for PCYK parsing: tags are interned
/// to dense `u32` ids so chart cells can be flat arrays indexed by id
/// instead of hashmaps, and rules are bucketed by the chart access pattern
/// that uses them (lexical rules by token, chain rules by their single RHS
/// tag, binary rules by LHS).
#[derive(Debug)]
pub struct GrammarParse<N, T, W>
where
    N: Eq + Hash,
    T: Eq + Hash,
    W: Copy + Default,
{
    initial_nonterminal: u32,
    rules_lexical: MultiMap<T, (u32, W)>,
    rules_chain: MultiMap<u32, (u32, W)>,
    rules_double: MultiMap<u32, (u32, u32, W)>,
    lookup: Vec<N>,
    lookup_index: FxHashMap<N, u32>,
}

impl<N, T> GrammarParse<N, T, FloatOrd<f64>>
where
    N: Eq + Hash + Clone,
    T: Eq + Hash + Clone,
{
    pub fn new(initial_nonterminal: N) -> Self {
        let mut result = Self {
            initial_nonterminal: 0,
            rules_lexical: MultiMap::new(),
            rules_chain: MultiMap::new(),
            rules_double: MultiMap::new(),
            lookup: vec![],
            lookup_index: FxHashMap::default(),
        };
        result.initial_nonterminal = result.intify(initial_nonterminal);

        result
    }

    fn intify(&mut self, n: N) -> u32 {
        self.lookup_index.get(&n).copied().unwrap_or_else(|| {
            let index = self.lookup.len() as u32;
            self.lookup.push(n.clone());
            self.lookup_index.insert(n, index);
            index
        })
    }

    /// Whether `token` has at least one lexical (preterminal) rule emitting
    /// it, i.e. whether it's in-vocabulary for this grammar.
    pub fn has_lexical_entry(&self, token: &T) -> bool {
        self.rules_lexical.contains_key(token)
    }

    /// The full lexicon token set, in insertion order -- used to build the
    /// bigram model's vocabulary, which is fixed to the tokens observed in
    /// the grammar's lexicon.
    pub fn lexical_tokens(&self) -> impl Iterator<Item = &T> {
        self.rules_lexical.keys()
    }

    /// Direct access to the lexical-rule table, so CLI-level preprocessing
    /// (`Sentence::unkify`/`smooth`) can check lexicon membership without
    /// duplicating it.
    pub fn rules_lexical(&self) -> &MultiMap<T, (u32, FloatOrd<f64>)> {
        &self.rules_lexical
    }

    pub fn insert_rule(&mut self, weighted_rule: WeightedRule<N, T, FloatOrd<f64>>) -> Result<()> {
        match weighted_rule.rule {
            Rule::Lexical { lhs, rhs } => {
                let lhs = self.intify(lhs);
                self.rules_lexical.insert(rhs, (lhs, weighted_rule.weight));
            }

            Rule::NonLexical { lhs, mut rhs } => {
                let lhs = self.intify(lhs);
                let rhs: Vec<_> = rhs.drain(..).map(|n| self.intify(n)).collect();

                match rhs.as_slice() {
                    [n] => {
                        self.rules_chain.insert(*n, (lhs, weighted_rule.weight));
                    }
                    [n1, n2] => self
                        .rules_double
                        .insert(lhs, (*n1, *n2, weighted_rule.weight)),
                    _ => {
                        return Err(PcfgError::InconsistentGrammar(
                            "PCYK parsing requires a binarised grammar: every rule must have \
                             arity 1 (lexical/chain) or 2"
                                .to_string(),
                        ))
                    }
                }
            }
        };

        Ok(())
    }

    /// Runs the probabilistic CYK algorithm over `sentence`, returning the
    /// Viterbi-best derivation tree, or `None` if no span of the chart
    /// contains the grammar's initial non-terminal.
    pub fn cyk(&self, sentence: &Sentence<T>) -> Option<Tree<NodeType<N, T>>> {
        let n = sentence.len();
        let num_nt = self.lookup.len();

        if n == 0 || num_nt == 0 {
            return None;
        }

        let mut chart: Chart<Cell> = Chart::new(n, num_nt);

        // Span 1: lexical rules, then unary closure within the cell.
        for (i, word) in sentence.iter().enumerate() {
            let start = chart.cell_start_index(i, 1);
            if let Some(lexicals) = self.rules_lexical.get_vec(word) {
                for (nt, weight) in lexicals {
                    chart[start + (*nt as usize)] = (*weight, Some(BacktraceInfo::Term(i)));
                }
            }
            self.unary_closure(chart.get_cell_mut(start));
        }

        // Spans of increasing length combine two adjacent, already-filled
        // sub-spans, then apply unary closure to the combined cell.
        for span in 2..=n {
            for i in 0..=(n - span) {
                let j = i + span;
                let i_j = chart.cell_start_index(i, span);

                for a in 0..num_nt {
                    if let Some(binary_rules) = self.rules_double.get_vec(&(a as u32)) {
                        let mut best: Cell = Default::default();
                        for m in (i + 1)..j {
                            let i_m = chart.cell_start_index(i, m - i);
                            let m_j = chart.cell_start_index(m, j - m);
                            for (x, y, weight) in binary_rules {
                                let left = chart[i_m + (*x as usize)].0 .0;
                                let right = chart[m_j + (*y as usize)].0 .0;
                                let candidate = (
                                    FloatOrd(weight.0 * left * right),
                                    Some(BacktraceInfo::Binary(
                                        i_m + (*x as usize),
                                        m_j + (*y as usize),
                                    )),
                                );
                                best = best.max(candidate);
                            }
                        }
                        chart[i_j + a] = chart[i_j + a].max(best);
                    }
                }

                self.unary_closure(chart.get_cell_mut(i_j));
            }
        }

        let root = chart.cell_start_index(0, n) + (self.initial_nonterminal as usize);
        Self::construct_best_tree(&chart, root, sentence, &self.lookup)
    }

    /// Relaxes unary (chain) rules to a fixed point within a single chart
    /// cell using a max-heap: every entry currently in the cell is pushed,
    /// then repeatedly popped and, if it still improves on the cell's
    /// current best for its target non-terminal, used to push its chain
    /// successors. Terminates because weights are in `(0, 1]` and each chain
    /// application strictly shrinks the weight, so the heap can't grow
    /// without bound.
    fn unary_closure(&self, c: &mut [Cell]) {
        let mut queue = BinaryHeap::with_capacity(c.len());

        for ele in c
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, (w, _))| w.0 != 0.0)
            .map(|(i, w)| (w, i))
        {
            queue.push(ele);
        }
        for weight in c.iter_mut() {
            *weight = Default::default();
        }

        while let Some(((q, backtrace), b)) = queue.pop() {
            if q > c[b].0 {
                c[b] = (q, backtrace);
                if let Some(chain_rules) = self.rules_chain.get_vec(&(b as u32)) {
                    for (a, chain_weight) in chain_rules {
                        queue.push((
                            (
                                FloatOrd(chain_weight.0 * q.0),
                                Some(BacktraceInfo::Chain(b)),
                            ),
                            *a as usize,
                        ));
                    }
                }
            }
        }
    }

    fn construct_best_tree(
        chart: &Chart<Cell>,
        c_idx: usize,
        sentence: &Sentence<T>,
        lookup: &[N],
    ) -> Option<Tree<NodeType<N, T>>> {
        let num_nt = lookup.len();

        match chart[c_idx].1 {
            None => None,
            Some(BacktraceInfo::Term(t)) => {
                let nt = c_idx % num_nt;
                Some(Tree {
                    root: NodeType::NonTerminal(lookup[nt].clone()),
                    children: vec![Tree {
                        root: NodeType::Terminal(sentence.0[t].clone()),
                        children: vec![],
                    }],
                })
            }
            Some(BacktraceInfo::Chain(i)) => {
                let tree =
                    Self::construct_best_tree(chart, c_idx - (c_idx % num_nt) + i, sentence, lookup)?;
                let nt = c_idx % num_nt;
                Some(Tree {
                    root: NodeType::NonTerminal(lookup[nt].clone()),
                    children: vec![tree],
                })
            }
            Some(BacktraceInfo::Binary(i, j)) => {
                let tree_i = Self::construct_best_tree(chart, i, sentence, lookup)?;
                let tree_j = Self::construct_best_tree(chart, j, sentence, lookup)?;
                let nt = c_idx % num_nt;
                Some(Tree {
                    root: NodeType::NonTerminal(lookup[nt].clone()),
                    children: vec![tree_i, tree_j],
                })
            }
        }
    }
}
