//! A single tree of a hough forest.

use super::node::{Node, NodeIndex};
use super::split::{NodeStats, SplitSearch};
use rand::Rng;

/// Nodes are stored in an arena and refer to their children by index.
/// Leaves keep indices into the example cache of the owning forest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HoughTree {
    nodes: Vec<Node>,
    root: NodeIndex,
}

impl HoughTree {
    /// Grows a tree top-down on the given examples.
    ///
    /// A node becomes a leaf if it is at the maximum depth, holds at most
    /// `max_leaf_elements` examples or no valid split can be found.
    /// `search.options` must be resolved.
    pub fn train<R: Rng>(search: &SplitSearch, examples: Vec<usize>, rng: &mut R) -> HoughTree {
        let mut nodes = vec![];
        let root = grow(&mut nodes, search, examples, 0, rng);
        HoughTree {
            nodes: nodes,
            root: root,
        }
    }

    /// Assembles a tree from its arena, e.g. after reading it from a stream.
    /// Call `validate` before using a tree that was not grown by `train`.
    pub fn from_parts(nodes: Vec<Node>, root: NodeIndex) -> HoughTree {
        HoughTree {
            nodes: nodes,
            root: root,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Maximum depth of a leaf. A tree made of a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.leaves().iter().map(|&(d, _)| d).max().unwrap_or(0)
    }

    /// Every leaf reachable from the root together with its depth.
    pub fn leaves(&self) -> Vec<(usize, &[usize])> {
        let mut res = vec![];
        let mut stack = vec![(self.root, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match self.nodes[idx.index()] {
                Node::Leaf { ref examples } => res.push((depth, &examples[..])),
                Node::Split { left, right, .. } => {
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }
        res
    }

    /// Follows the decision path of `features` and returns the examples of the leaf reached.
    pub fn find_leaf(&self, features: &[f64]) -> &[usize] {
        let mut idx = self.root;
        loop {
            match self.nodes[idx.index()] {
                Node::Leaf { ref examples } => return examples,
                Node::Split { feature, threshold, left, right } => {
                    idx = if features[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Checks that the arena forms a proper tree whose splits use features below
    /// `num_features` and whose leaves refer to examples below `num_examples`.
    pub fn validate(&self, num_features: usize, num_examples: usize) -> Result<(), String> {
        if self.root.index() >= self.nodes.len() {
            return Err(format!("root {} outside of {} nodes", self.root, self.nodes.len()));
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            if visited[idx.index()] {
                return Err(format!("node {} is reachable twice", idx));
            }
            visited[idx.index()] = true;
            match self.nodes[idx.index()] {
                Node::Leaf { ref examples } => {
                    if let Some(e) = examples.iter().find(|&&e| e >= num_examples) {
                        return Err(format!("leaf {} refers to example {} of {}", idx, e, num_examples));
                    }
                }
                Node::Split { feature, threshold, left, right } => {
                    if feature >= num_features {
                        return Err(format!("node {} splits on feature {} of {}", idx, feature, num_features));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has no valid threshold", idx));
                    }
                    for child in &[left, right] {
                        if child.index() >= self.nodes.len() {
                            return Err(format!("node {} has child {} outside of {} nodes",
                                               idx,
                                               child,
                                               self.nodes.len()));
                        }
                        stack.push(*child);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Recursively grows the subtree for `examples` and returns the index of its root.
/// A split node is reserved before its children are grown and filled in afterwards.
fn grow<R: Rng>(nodes: &mut Vec<Node>,
                search: &SplitSearch,
                examples: Vec<usize>,
                depth: usize,
                rng: &mut R)
                -> NodeIndex {
    let options = search.options;
    if depth as i64 >= options.get_max_depth() || examples.len() as i64 <= options.get_max_leaf_elements() {
        return push_leaf(nodes, examples);
    }

    let stats = NodeStats::of_examples(search.cache, search.num_vote_params, &examples);
    let split = match search.find_split(&examples, &stats, rng) {
        Some(split) => split,
        None => {
            if options.get_verbose() >= 2 {
                debug!("No valid split for {} examples at depth {}, making a leaf",
                       examples.len(),
                       depth);
            }
            return push_leaf(nodes, examples);
        }
    };

    let cache = search.cache;
    let (left, right): (Vec<usize>, Vec<usize>) = examples.into_iter()
        .partition(|&e| cache.feature(e, split.feature) <= split.threshold);
    debug_assert!(!left.is_empty() && !right.is_empty());
    if options.get_verbose() >= 2 {
        trace!("Depth {}: split on feature {} at {} into {} / {} (score {})",
               depth,
               split.feature,
               split.threshold,
               left.len(),
               right.len(),
               split.score);
    }

    let idx = nodes.len();
    nodes.push(Node::Leaf { examples: vec![] });
    let left = grow(nodes, search, left, depth + 1, rng);
    let right = grow(nodes, search, right, depth + 1, rng);
    nodes[idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: left,
        right: right,
    };
    NodeIndex::new(idx)
}

fn push_leaf(nodes: &mut Vec<Node>, examples: Vec<usize>) -> NodeIndex {
    nodes.push(Node::Leaf { examples: examples });
    NodeIndex::new(nodes.len() - 1)
}
