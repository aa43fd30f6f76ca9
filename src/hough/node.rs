use std::fmt;

/// Index into the node arena of a single tree.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn new(index: usize) -> NodeIndex {
        NodeIndex(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node of a hough tree.
/// An example goes to the left child if its value of `feature` is
/// lower than or equal to `threshold`, to the right child otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
    },
    /// Indices into the example cache of the forest
    Leaf { examples: Vec<usize> },
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        match *self {
            Node::Leaf { .. } => true,
            Node::Split { .. } => false,
        }
    }
}
