use serde::Deserialize;

use super::ModelError;

/// XGBoost writes `default_left` as 0/1 integers in older dumps and as
/// booleans in newer ones.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

/// One regression tree in array layout, validated at load.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn from_raw(raw: RawTree, index: usize) -> Result<Self, ModelError> {
        let n = raw.left_children.len();
        let bad = |reason: String| ModelError::MalformedTree { index, reason };

        if n == 0 {
            return Err(bad("no nodes".into()));
        }
        if raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || raw.default_left.len() != n
        {
            return Err(bad("node arrays differ in length".into()));
        }
        if raw.split_type.iter().any(|&t| t != 0) {
            return Err(ModelError::Unsupported("categorical splits".into()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (l, r) = (raw.left_children[i], raw.right_children[i]);
            if l == -1 {
                nodes.push(Node::Leaf(raw.split_conditions[i]));
                continue;
            }
            // Children always come after their parent, which also rules out cycles.
            let child = |c: i32| -> Result<usize, ModelError> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > i && c < n)
                    .ok_or_else(|| bad(format!("node {} has invalid child {}", i, c)))
            };
            nodes.push(Node::Split {
                feature: raw.split_indices[i] as usize,
                threshold: raw.split_conditions[i],
                left: child(l)?,
                right: child(r)?,
                default_left: raw.default_left[i].is_set(),
            });
        }
        Ok(Tree { nodes })
    }

    /// Highest feature index any split reads.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf(_) => None,
            })
            .max()
    }

    /// Walk from the root to a leaf. `row` must cover `max_feature()`.
    pub fn leaf_value(&self, row: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(v) => return v,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = row[feature];
                    idx = if value.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if value < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}
