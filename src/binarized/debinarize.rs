use super::node::{Binarized, MarkovizedNode};
use crate::tree::Tree;

impl<A> Tree<Binarized<A>> {
    pub fn debinarize(mut self) -> Tree<A> {
        if self.is_leaf() {
            Tree {
                root: self.root.into_label(),
                children: vec![],
            }
        } else if self.children.iter().last().unwrap().root.is_markovized()
            && self.children.iter().last().unwrap().children.len() == 2
        {
            let last = self.children.pop().unwrap();
            self.children.extend(last.children);
            self.debinarize()
        } else {
            let root = match self.root {
                Binarized::Bare(a) => a,
                Binarized::Markovized(MarkovizedNode { label: a, .. }) => a,
            };

            Tree {
                root,
                children: self.children.drain(..).map(|c| c.debinarize()).collect(),
            }
        }
    }
}
