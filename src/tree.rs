use std::convert::TryFrom;
use std::fmt;

use crate::error::PcfgError;
use crate::sexp::SExp;

/// A rooted, labelled constituency tree. A childless node is a leaf: either a
/// surface token (under a preterminal) or, transiently, a bare label before
/// binarization distinguishes tags from tokens by position.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Tree<A> {
    pub root: A,
    pub children: Vec<Tree<A>>,
}

/// Distinguishes a parsed derivation's nonterminal tags from its terminal
/// surface tokens. `N` and `T` are allowed to be the same underlying
/// representation (both are `SmallString` in this crate); the type only
/// exists so a recovered parse tree can't mix up which kind of string is at
/// which position.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum NodeType<N, T> {
    NonTerminal(N),
    Terminal(T),
}

impl<A> Tree<A> {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn leaves(&self) -> Vec<&A> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a A>) {
        if self.is_leaf() {
            out.push(&self.root);
        } else {
            for child in &self.children {
                child.collect_leaves(out);
            }
        }
    }

    pub fn leaves_mut(&mut self) -> Vec<&mut A> {
        let mut out = Vec::new();
        self.collect_leaves_mut(&mut out);
        out
    }

    fn collect_leaves_mut<'a>(&'a mut self, out: &mut Vec<&'a mut A>) {
        if self.children.is_empty() {
            out.push(&mut self.root);
        } else {
            for child in &mut self.children {
                child.collect_leaves_mut(out);
            }
        }
    }
}

impl<A: Clone> TryFrom<&SExp<A>> for Tree<A> {
    type Error = PcfgError;

    fn try_from(sexp: &SExp<A>) -> Result<Self, Self::Error> {
        match sexp {
            SExp::List(list) => {
                let root = match list.first() {
                    Some(SExp::Atom(a)) => a.clone(),
                    Some(SExp::List(_)) => {
                        return Err(PcfgError::MalformedTree(
                            "first element of an s-expression list must be an atom".to_string(),
                        ))
                    }
                    None => {
                        return Err(PcfgError::MalformedTree(
                            "empty s-expression list has no label".to_string(),
                        ))
                    }
                };

                let mut children = Vec::with_capacity(list.len().saturating_sub(1));
                for sexp in list.iter().skip(1) {
                    children.push(Tree::try_from(sexp)?);
                }

                Ok(Tree { root, children })
            }
            SExp::Atom(a) => Ok(Tree {
                root: a.clone(),
                children: vec![],
            }),
        }
    }
}

impl<N, T> Tree<NodeType<N, T>> {
    /// Collapses a recovered PCYK derivation (nonterminal tags and terminal
    /// tokens distinguished by `NodeType`) into a plain label tree matching
    /// the raw bracket-string shape the binarization pipeline operates on,
    /// so a parse result can be un-binarized with the same
    /// `parse_markovized`/`debinarize` pair used for training trees.
    pub fn into_label_tree(self) -> Tree<N>
    where
        T: Into<N>,
    {
        match self.root {
            NodeType::NonTerminal(n) => Tree {
                root: n,
                children: self
                    .children
                    .into_iter()
                    .map(Tree::into_label_tree)
                    .collect(),
            },
            NodeType::Terminal(t) => Tree {
                root: t.into(),
                children: vec![],
            },
        }
    }
}

impl<N: fmt::Display, T: fmt::Display> fmt::Display for NodeType<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::NonTerminal(n) => write!(f, "{}", n),
            NodeType::Terminal(t) => write!(f, "{}", t),
        }
    }
}

impl<A: fmt::Display> fmt::Display for Tree<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            write!(f, "{}", self.root)
        } else {
            write!(f, "({}", self.root)?;
            for child in &self.children {
                write!(f, " {}", child)?;
            }
            write!(f, ")")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sexp_tree_conversion() {
        assert_eq!(
            Tree {
                root: "a".to_string(),
                children: vec![]
            },
            Tree::try_from(&SExp::Atom("a".to_string())).unwrap(),
        );

        assert_eq!(
            Tree {
                root: "NP".to_string(),
                children: vec![
                    Tree {
                        root: "D".to_string(),
                        children: vec![Tree {
                            root: "the".to_string(),
                            children: vec![]
                        }]
                    },
                    Tree {
                        root: "N".to_string(),
                        children: vec![Tree {
                            root: "ball".to_string(),
                            children: vec![]
                        }]
                    },
                ]
            },
            Tree::try_from(&SExp::List(vec![
                SExp::Atom("NP".to_string()),
                SExp::List(vec![
                    SExp::Atom("D".to_string()),
                    SExp::Atom("the".to_string())
                ]),
                SExp::List(vec![
                    SExp::Atom("N".to_string()),
                    SExp::Atom("ball".to_string())
                ])
            ]))
            .unwrap(),
        );
    }

    #[test]
    fn malformed_tree_rejected() {
        let nested_first = SExp::List(vec![
            SExp::List(vec![SExp::Atom("A".to_string())]),
            SExp::Atom("b".to_string()),
        ]);
        assert!(Tree::try_from(&nested_first).is_err());

        let empty_list: SExp<String> = SExp::List(vec![]);
        assert!(Tree::try_from(&empty_list).is_err());
    }

    #[test]
    fn display_bracket_format() {
        let tree = Tree {
            root: "NP",
            children: vec![
                Tree {
                    root: "D",
                    children: vec![Tree {
                        root: "the",
                        children: vec![],
                    }],
                },
                Tree {
                    root: "N",
                    children: vec![Tree {
                        root: "ball",
                        children: vec![],
                    }],
                },
            ],
        };
        assert_eq!("(NP (D the) (N ball))", format!("{}", tree));
    }

    #[test]
    fn node_type_display_delegates() {
        let nonterm: NodeType<&str, &str> = NodeType::NonTerminal("NP");
        let term: NodeType<&str, &str> = NodeType::Terminal("ball");
        assert_eq!("NP", format!("{}", nonterm));
        assert_eq!("ball", format!("{}", term));

        let parsed = Tree {
            root: NodeType::NonTerminal("NP"),
            children: vec![Tree {
                root: NodeType::Terminal("ball"),
                children: vec![],
            }],
        };
        assert_eq!("(NP ball)", format!("{}", parsed));
    }

    #[test]
    fn leaves_mut_rewrites_tokens() {
        let mut tree = Tree {
            root: "NP".to_string(),
            children: vec![
                Tree {
                    root: "D".to_string(),
                    children: vec![Tree {
                        root: "the".to_string(),
                        children: vec![],
                    }],
                },
                Tree {
                    root: "N".to_string(),
                    children: vec![Tree {
                        root: "ball".to_string(),
                        children: vec![],
                    }],
                },
            ],
        };
        for leaf in tree.leaves_mut() {
            *leaf = leaf.to_uppercase();
        }
        assert_eq!("(NP (D THE) (N BALL))", format!("{}", tree));
    }

    #[test]
    fn into_label_tree_collapses_node_type() {
        let parsed = Tree {
            root: NodeType::NonTerminal("NP".to_string()),
            children: vec![
                Tree {
                    root: NodeType::NonTerminal("D".to_string()),
                    children: vec![Tree {
                        root: NodeType::Terminal("the".to_string()),
                        children: vec![],
                    }],
                },
                Tree {
                    root: NodeType::NonTerminal("N".to_string()),
                    children: vec![Tree {
                        root: NodeType::Terminal("ball".to_string()),
                        children: vec![],
                    }],
                },
            ],
        };

        let plain = parsed.into_label_tree();
        assert_eq!("(NP (D the) (N ball))", format!("{}", plain));
    }
}
