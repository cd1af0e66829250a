//! Right-factoring markovization into CNF (`markovize`) and its structural
//! inverse (`debinarize`), built around the `Binarized<A>` label AST that
//! records sibling/ancestor annotations in a `|<...>^<...>` suffix.

pub mod debinarize;
pub mod markovize;
pub mod node;

pub use node::{Binarized, MarkovizedNode};
