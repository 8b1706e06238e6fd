//! Second-order regression trees.
//!
//! Trees are grown on per-row gradients `g` and hessians `h` of a loss. A
//! leaf holding rows `I` predicts `-G / (H + lambda)` with `G = sum(g_i)` and
//! `H = sum(h_i)`, and a split is scored by
//!
//! ```text
//! gain = 1/2 * ( G_L^2 / (H_L + lambda) + G_R^2 / (H_R + lambda) - G^2 / (H + lambda) )
//! ```
//!
//! Two growth policies are supported: depth-wise (every node is split until
//! `max_depth`) and leaf-wise (the leaf with the largest gain is split next,
//! until `max_leaves`).

use crate::model::ModelError;
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Smallest gain accepted for a split.
const MIN_SPLIT_GAIN: f64 = 1e-10;

/// Order in which tree nodes are expanded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthPolicy {
    /// Level by level up to the depth limit.
    #[default]
    DepthWise,
    /// Best-gain leaf first, bounded by a leaf budget.
    LeafWise,
}

/// Growth constraints of a single tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub growth: GrowthPolicy,
    pub max_depth: usize,
    /// Only used by [`GrowthPolicy::LeafWise`].
    pub max_leaves: usize,
    /// L2 penalty on leaf values.
    pub reg_lambda: f64,
    /// Minimum hessian sum on each side of a split.
    pub min_child_weight: f64,
    /// Minimum row count on each side of a split.
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            growth: GrowthPolicy::DepthWise,
            max_depth: 3,
            max_leaves: 31,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            min_samples_leaf: 1,
        }
    }
}

/// A node of a fitted tree. Children always have larger indices than their parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree stored as a flat node list rooted at index 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Rebuild a tree from stored nodes, checking that it is well formed for
    /// inputs with `n_features` columns.
    pub fn from_nodes(nodes: Vec<Node>, n_features: usize) -> Result<Self, ModelError> {
        if nodes.is_empty() {
            return Err(ModelError::InvalidParams("tree without nodes".to_string()));
        }
        for (idx, node) in nodes.iter().enumerate() {
            match *node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(ModelError::InvalidParams(format!(
                        "leaf {} has non-finite value",
                        idx
                    )))
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(ModelError::InvalidParams(format!(
                            "node {} splits on feature {} of {}",
                            idx, feature, n_features
                        )));
                    }
                    if left <= idx || right <= idx || left >= nodes.len() || right >= nodes.len() {
                        return Err(ModelError::InvalidParams(format!(
                            "node {} has out-of-order children ({}, {})",
                            idx, left, right
                        )));
                    }
                }
                Node::Leaf { .. } => {}
            }
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Output of the tree for one feature row.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left_rows: Vec<usize>,
    right_rows: Vec<usize>,
}

struct OpenLeaf {
    node: usize,
    depth: usize,
    split: Option<SplitCandidate>,
}

/// Grows one tree over a row and feature subset.
pub(crate) struct TreeBuilder<'a> {
    config: &'a TreeConfig,
    x: ArrayView2<'a, f64>,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(
        config: &'a TreeConfig,
        x: ArrayView2<'a, f64>,
        grad: &'a [f64],
        hess: &'a [f64],
        features: &'a [usize],
    ) -> Self {
        Self {
            config,
            x,
            grad,
            hess,
            features,
        }
    }

    pub(crate) fn build(&self, rows: Vec<usize>) -> RegressionTree {
        let mut nodes = Vec::new();
        match self.config.growth {
            GrowthPolicy::DepthWise => {
                self.grow_depth_wise(rows, 0, &mut nodes);
            }
            GrowthPolicy::LeafWise => self.grow_leaf_wise(rows, &mut nodes),
        }
        RegressionTree { nodes }
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]))
    }

    fn leaf_value(&self, rows: &[usize]) -> f64 {
        let (g, h) = self.sums(rows);
        let denom = h + self.config.reg_lambda;
        if denom > 0.0 {
            -g / denom
        } else {
            0.0
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.config.reg_lambda;
        if denom > 0.0 {
            g * g / denom
        } else {
            0.0
        }
    }

    fn best_split(&self, rows: &[usize]) -> Option<SplitCandidate> {
        let n = rows.len();
        if n < 2 * self.config.min_samples_leaf.max(1) {
            return None;
        }
        let (g_total, h_total) = self.sums(rows);
        let parent = self.score(g_total, h_total);

        let mut best: Option<(usize, f64, f64)> = None;
        let mut sorted = rows.to_vec();
        for &f in self.features {
            sorted.sort_by(|&a, &b| self.x[[a, f]].total_cmp(&self.x[[b, f]]));
            let (mut gl, mut hl) = (0.0, 0.0);
            for i in 0..n - 1 {
                let r = sorted[i];
                gl += self.grad[r];
                hl += self.hess[r];
                let v = self.x[[r, f]];
                let next = self.x[[sorted[i + 1], f]];
                if v == next {
                    continue;
                }
                let n_left = i + 1;
                if n_left < self.config.min_samples_leaf || n - n_left < self.config.min_samples_leaf {
                    continue;
                }
                let (gr, hr) = (g_total - gl, h_total - hl);
                if hl < self.config.min_child_weight || hr < self.config.min_child_weight {
                    continue;
                }
                let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent);
                let mut threshold = v + (next - v) / 2.0;
                if threshold >= next {
                    threshold = v;
                }
                if !threshold.is_finite() {
                    continue;
                }
                let improves = match best {
                    Some((_, _, best_gain)) => gain > best_gain,
                    None => gain > MIN_SPLIT_GAIN,
                };
                if improves {
                    best = Some((f, threshold, gain));
                }
            }
        }

        let (feature, threshold, gain) = best?;
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.x[[r, feature]] <= threshold);
        Some(SplitCandidate {
            feature,
            threshold,
            gain,
            left_rows,
            right_rows,
        })
    }

    fn grow_depth_wise(&self, rows: Vec<usize>, depth: usize, nodes: &mut Vec<Node>) -> usize {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            value: self.leaf_value(&rows),
        });
        if depth >= self.config.max_depth {
            return idx;
        }
        if let Some(split) = self.best_split(&rows) {
            let left = self.grow_depth_wise(split.left_rows, depth + 1, nodes);
            let right = self.grow_depth_wise(split.right_rows, depth + 1, nodes);
            nodes[idx] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
        }
        idx
    }

    fn open_leaf(&self, node: usize, rows: &[usize], depth: usize) -> OpenLeaf {
        let split = if depth < self.config.max_depth {
            self.best_split(rows)
        } else {
            None
        };
        OpenLeaf { node, depth, split }
    }

    fn grow_leaf_wise(&self, rows: Vec<usize>, nodes: &mut Vec<Node>) {
        nodes.push(Node::Leaf {
            value: self.leaf_value(&rows),
        });
        let mut open = vec![self.open_leaf(0, &rows, 0)];
        let mut n_leaves = 1;

        while n_leaves < self.config.max_leaves {
            let best = open
                .iter()
                .enumerate()
                .filter_map(|(i, leaf)| leaf.split.as_ref().map(|s| (i, s.gain)))
                .fold(None, |acc: Option<(usize, f64)>, (i, gain)| match acc {
                    Some((_, best_gain)) if best_gain >= gain => acc,
                    _ => Some((i, gain)),
                });
            let Some((pick, _)) = best else { break };
            let leaf = open.swap_remove(pick);
            let Some(split) = leaf.split else { break };

            let left = nodes.len();
            nodes.push(Node::Leaf {
                value: self.leaf_value(&split.left_rows),
            });
            let right = nodes.len();
            nodes.push(Node::Leaf {
                value: self.leaf_value(&split.right_rows),
            });
            nodes[leaf.node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            open.push(self.open_leaf(left, &split.left_rows, leaf.depth + 1));
            open.push(self.open_leaf(right, &split.right_rows, leaf.depth + 1));
            n_leaves += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2};

    /// One informative feature (col 0) and one constant feature (col 1).
    fn step_problem() -> (Array2<f64>, Vec<f64>, Vec<f64>) {
        let x = Array2::from_shape_fn((8, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        // Gradients of log-loss at p = 0.5 for targets [0,0,0,0,1,1,1,1]
        let grad = vec![0.5, 0.5, 0.5, 0.5, -0.5, -0.5, -0.5, -0.5];
        let hess = vec![0.25; 8];
        (x, grad, hess)
    }

    fn config(growth: GrowthPolicy) -> TreeConfig {
        TreeConfig {
            growth,
            reg_lambda: 0.0,
            min_child_weight: 0.0,
            ..TreeConfig::default()
        }
    }

    #[test]
    fn test_depth_wise_finds_step() {
        let (x, grad, hess) = step_problem();
        let cfg = config(GrowthPolicy::DepthWise);
        let tree = TreeBuilder::new(&cfg, x.view(), &grad, &hess, &[0, 1]).build((0..8).collect());

        match tree.nodes()[0] {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(feature, 0);
                assert!((threshold - 3.5).abs() < 1e-12);
            }
            ref other => panic!("expected split at root, got {other:?}"),
        }
        // Pure children cannot be split further.
        assert_eq!(tree.n_leaves(), 2);
        assert!((tree.predict_row(arr1(&[0.0, 1.0]).view()) + 2.0).abs() < 1e-12);
        assert!((tree.predict_row(arr1(&[7.0, 1.0]).view()) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_reg_lambda_shrinks_leaves() {
        let (x, grad, hess) = step_problem();
        let cfg = TreeConfig {
            reg_lambda: 1.0,
            min_child_weight: 0.0,
            ..TreeConfig::default()
        };
        let tree = TreeBuilder::new(&cfg, x.view(), &grad, &hess, &[0]).build((0..8).collect());
        // G = 2, H = 1 on the left: -2 / (1 + 1)
        assert!((tree.predict_row(arr1(&[0.0, 1.0]).view()) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_depth_zero_is_single_leaf() {
        let (x, grad, hess) = step_problem();
        let cfg = TreeConfig {
            max_depth: 0,
            ..config(GrowthPolicy::DepthWise)
        };
        let tree = TreeBuilder::new(&cfg, x.view(), &grad, &hess, &[0]).build((0..8).collect());
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_min_samples_leaf_blocks_small_children() {
        let (x, grad, hess) = step_problem();
        let cfg = TreeConfig {
            min_samples_leaf: 5,
            ..config(GrowthPolicy::LeafWise)
        };
        let tree = TreeBuilder::new(&cfg, x.view(), &grad, &hess, &[0]).build((0..8).collect());
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_leaf_wise_respects_leaf_budget() {
        let x = Array2::from_shape_fn((16, 1), |(i, _)| i as f64);
        let grad: Vec<f64> = (0..16).map(|i| if i % 4 < 2 { 0.5 } else { -0.5 }).collect();
        let hess = vec![0.25; 16];
        let cfg = TreeConfig {
            max_leaves: 3,
            max_depth: 10,
            ..config(GrowthPolicy::LeafWise)
        };
        let tree = TreeBuilder::new(&cfg, x.view(), &grad, &hess, &[0]).build((0..16).collect());
        assert_eq!(tree.n_leaves(), 3);
        // Every stored tree must pass validation.
        assert!(RegressionTree::from_nodes(tree.nodes().to_vec(), 1).is_ok());
    }

    #[test]
    fn test_from_nodes_validation() {
        assert!(RegressionTree::from_nodes(vec![], 1).is_err());
        let cyclic = vec![Node::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
        }];
        assert!(RegressionTree::from_nodes(cyclic, 1).is_err());
        let bad_feature = vec![
            Node::Split {
                feature: 3,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: 0.0 },
            Node::Leaf { value: 1.0 },
        ];
        assert!(RegressionTree::from_nodes(bad_feature.clone(), 2).is_err());
        assert!(RegressionTree::from_nodes(bad_feature, 4).is_ok());
    }
}
