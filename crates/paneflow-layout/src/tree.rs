//! Tree Algebra (component A, §4.A): pure operations on the binary split
//! tree. Every operation returns a new tree; inputs are never mutated.
//! Untouched subtrees are reused by `Arc` clone rather than rebuilt,
//! which is what gives this implementation the structural sharing the
//! spec calls out as a non-normative performance note.

use paneflow_core::action::{NavDirection, SplitDirection};
use paneflow_core::error::LayoutError;
use paneflow_core::ids::{PaneGroupId, SplitId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub const RATIO_MIN: f32 = 0.1;
pub const RATIO_MAX: f32 = 0.9;
const NEIGHBOR_EPSILON: f64 = 1e-9;

/// Serialized only (never deserialized back) — this is the snapshot blob
/// handed to clients in `workspace_snapshot`, not a wire input.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TreeNode {
    Leaf {
        id: PaneGroupId,
    },
    Split {
        id: SplitId,
        direction: SplitDirection,
        ratio: f32,
        left: Arc<TreeNode>,
        right: Arc<TreeNode>,
    },
}

/// A leaf's normalized rectangle within `[0,1] x [0,1]`, produced by
/// `build_spatial_map`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub const UNIT: Rect = Rect { x0: 0.0, y0: 0.0, x1: 1.0, y1: 1.0 };

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

pub fn new_leaf(id: PaneGroupId) -> Arc<TreeNode> {
    Arc::new(TreeNode::Leaf { id })
}

fn clamp_ratio(ratio: f32) -> f32 {
    ratio.clamp(RATIO_MIN, RATIO_MAX)
}

/// Graft `new_side` next to the leaf named `target`, used by both
/// `split_leaf` (fresh leaf) and `insert_tree_at` (existing subtree).
fn graft(
    node: &Arc<TreeNode>,
    target: PaneGroupId,
    new_side: &Arc<TreeNode>,
    split_id: SplitId,
    direction: SplitDirection,
    insert_after: bool,
) -> Option<Arc<TreeNode>> {
    match &**node {
        TreeNode::Leaf { id } if *id == target => {
            let (left, right) = if insert_after {
                (node.clone(), new_side.clone())
            } else {
                (new_side.clone(), node.clone())
            };
            Some(Arc::new(TreeNode::Split {
                id: split_id,
                direction,
                ratio: 0.5,
                left,
                right,
            }))
        }
        TreeNode::Leaf { .. } => None,
        TreeNode::Split { id, direction: d, ratio, left, right } => {
            if let Some(new_left) = graft(left, target, new_side, split_id, direction, insert_after) {
                Some(Arc::new(TreeNode::Split {
                    id: *id,
                    direction: *d,
                    ratio: *ratio,
                    left: new_left,
                    right: right.clone(),
                }))
            } else {
                graft(right, target, new_side, split_id, direction, insert_after).map(|new_right| {
                    Arc::new(TreeNode::Split {
                        id: *id,
                        direction: *d,
                        ratio: *ratio,
                        left: left.clone(),
                        right: new_right,
                    })
                })
            }
        }
    }
}

/// `splitLeaf(root, targetId, direction, insertAfter, newLeafId)` (§4.A).
pub fn split_leaf(
    root: &Arc<TreeNode>,
    target: PaneGroupId,
    direction: SplitDirection,
    insert_after: bool,
    new_leaf_id: PaneGroupId,
) -> Result<Arc<TreeNode>, LayoutError> {
    let fresh = new_leaf(new_leaf_id);
    graft(root, target, &fresh, SplitId::next(), direction, insert_after).ok_or(LayoutError::LeafNotFound)
}

/// `insertTreeAt(root, targetId, newSubtree, direction, insertAfter)` (§4.A).
pub fn insert_tree_at(
    root: &Arc<TreeNode>,
    target: PaneGroupId,
    new_subtree: Arc<TreeNode>,
    direction: SplitDirection,
    insert_after: bool,
) -> Result<Arc<TreeNode>, LayoutError> {
    graft(root, target, &new_subtree, SplitId::next(), direction, insert_after).ok_or(LayoutError::LeafNotFound)
}

enum RemoveOutcome {
    NotFound,
    /// `None` means this subtree collapsed to nothing.
    Removed(Option<Arc<TreeNode>>),
}

fn remove_rec(node: &Arc<TreeNode>, target: PaneGroupId) -> RemoveOutcome {
    match &**node {
        TreeNode::Leaf { id } => {
            if *id == target {
                RemoveOutcome::Removed(None)
            } else {
                RemoveOutcome::NotFound
            }
        }
        TreeNode::Split { id, direction, ratio, left, right } => match remove_rec(left, target) {
            RemoveOutcome::Removed(new_left) => match new_left {
                None => RemoveOutcome::Removed(Some(right.clone())),
                Some(l) => RemoveOutcome::Removed(Some(Arc::new(TreeNode::Split {
                    id: *id,
                    direction: *direction,
                    ratio: *ratio,
                    left: l,
                    right: right.clone(),
                }))),
            },
            RemoveOutcome::NotFound => match remove_rec(right, target) {
                RemoveOutcome::Removed(new_right) => match new_right {
                    None => RemoveOutcome::Removed(Some(left.clone())),
                    Some(r) => RemoveOutcome::Removed(Some(Arc::new(TreeNode::Split {
                        id: *id,
                        direction: *direction,
                        ratio: *ratio,
                        left: left.clone(),
                        right: r,
                    }))),
                },
                RemoveOutcome::NotFound => RemoveOutcome::NotFound,
            },
        },
    }
}

/// `removeLeaf(root, targetId)` (§4.A). `None` means the whole tree is
/// now empty (root itself was the target). A target that cannot be found
/// leaves the tree unchanged — callers (the reducer) only ever invoke
/// this with a leaf id known to exist.
pub fn remove_leaf(root: &Arc<TreeNode>, target: PaneGroupId) -> Option<Arc<TreeNode>> {
    match remove_rec(root, target) {
        RemoveOutcome::Removed(result) => result,
        RemoveOutcome::NotFound => Some(root.clone()),
    }
}

fn update_ratio_rec(node: &Arc<TreeNode>, split_id: SplitId, ratio: f32) -> Arc<TreeNode> {
    match &**node {
        TreeNode::Leaf { .. } => node.clone(),
        TreeNode::Split { id, direction, ratio: current, left, right } => {
            if *id == split_id {
                let clamped = clamp_ratio(ratio);
                if clamped == *current {
                    return node.clone();
                }
                Arc::new(TreeNode::Split {
                    id: *id,
                    direction: *direction,
                    ratio: clamped,
                    left: left.clone(),
                    right: right.clone(),
                })
            } else {
                let new_left = update_ratio_rec(left, split_id, ratio);
                let new_right = update_ratio_rec(right, split_id, ratio);
                if Arc::ptr_eq(&new_left, left) && Arc::ptr_eq(&new_right, right) {
                    node.clone()
                } else {
                    Arc::new(TreeNode::Split {
                        id: *id,
                        direction: *direction,
                        ratio: *current,
                        left: new_left,
                        right: new_right,
                    })
                }
            }
        }
    }
}

/// `updateRatio(root, splitId, ratio)` (§4.A). No-op (returns the same
/// `Arc`) if the split doesn't exist or the clamped ratio is unchanged.
pub fn update_ratio(root: &Arc<TreeNode>, split_id: SplitId, ratio: f32) -> Arc<TreeNode> {
    update_ratio_rec(root, split_id, ratio)
}

fn equalize_rec(node: &Arc<TreeNode>) -> Arc<TreeNode> {
    match &**node {
        TreeNode::Leaf { .. } => node.clone(),
        TreeNode::Split { id, direction, ratio, left, right } => {
            let new_left = equalize_rec(left);
            let new_right = equalize_rec(right);
            if *ratio == 0.5 && Arc::ptr_eq(&new_left, left) && Arc::ptr_eq(&new_right, right) {
                node.clone()
            } else {
                Arc::new(TreeNode::Split {
                    id: *id,
                    direction: *direction,
                    ratio: 0.5,
                    left: new_left,
                    right: new_right,
                })
            }
        }
    }
}

/// `equalize(root)` (§4.A): set `ratio = 0.5` on every split, recursively.
pub fn equalize(root: &Arc<TreeNode>) -> Arc<TreeNode> {
    equalize_rec(root)
}

fn get_leaves_rec(node: &Arc<TreeNode>, out: &mut Vec<PaneGroupId>) {
    match &**node {
        TreeNode::Leaf { id } => out.push(*id),
        TreeNode::Split { left, right, .. } => {
            get_leaves_rec(left, out);
            get_leaves_rec(right, out);
        }
    }
}

/// `getLeaves(root)` (§4.A): left-to-right / top-to-bottom traversal
/// order.
pub fn get_leaves(root: &Arc<TreeNode>) -> Vec<PaneGroupId> {
    let mut out = Vec::new();
    get_leaves_rec(root, &mut out);
    out
}

fn build_spatial_map_rec(node: &Arc<TreeNode>, rect: Rect, out: &mut HashMap<PaneGroupId, Rect>) {
    match &**node {
        TreeNode::Leaf { id } => {
            out.insert(*id, rect);
        }
        TreeNode::Split { direction, ratio, left, right, .. } => {
            let ratio = *ratio as f64;
            match direction {
                SplitDirection::Horizontal => {
                    let split_x = rect.x0 + rect.width() * ratio;
                    build_spatial_map_rec(left, Rect { x1: split_x, ..rect }, out);
                    build_spatial_map_rec(right, Rect { x0: split_x, ..rect }, out);
                }
                SplitDirection::Vertical => {
                    let split_y = rect.y0 + rect.height() * ratio;
                    build_spatial_map_rec(left, Rect { y1: split_y, ..rect }, out);
                    build_spatial_map_rec(right, Rect { y0: split_y, ..rect }, out);
                }
            }
        }
    }
}

/// `buildSpatialMap(root)` (§4.A): deterministic normalized rectangle per
/// leaf, independent of pixel size.
pub fn build_spatial_map(root: &Arc<TreeNode>) -> HashMap<PaneGroupId, Rect> {
    let mut out = HashMap::new();
    build_spatial_map_rec(root, Rect::UNIT, &mut out);
    out
}

/// `getSpatialNeighbor(root, currentId, dir)` (§4.A).
pub fn get_spatial_neighbor(
    root: &Arc<TreeNode>,
    current: PaneGroupId,
    dir: NavDirection,
) -> Option<PaneGroupId> {
    let map = build_spatial_map(root);
    let order = get_leaves(root);
    let current_rect = *map.get(&current)?;

    let mut best: Option<(PaneGroupId, f64)> = None;
    for id in &order {
        if *id == current {
            continue;
        }
        let Some(rect) = map.get(id) else { continue };
        let on_side = match dir {
            NavDirection::Left => rect.x1 <= current_rect.x0 + NEIGHBOR_EPSILON,
            NavDirection::Right => rect.x0 >= current_rect.x1 - NEIGHBOR_EPSILON,
            NavDirection::Up => rect.y1 <= current_rect.y0 + NEIGHBOR_EPSILON,
            NavDirection::Down => rect.y0 >= current_rect.y1 - NEIGHBOR_EPSILON,
        };
        if !on_side {
            continue;
        }
        let dist = ((rect.x0 - current_rect.x0).powi(2) + (rect.y0 - current_rect.y0).powi(2)).sqrt();
        match best {
            None => best = Some((*id, dist)),
            Some((_, best_dist)) if dist < best_dist => best = Some((*id, dist)),
            _ => {}
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: PaneGroupId) -> Arc<TreeNode> {
        new_leaf(id)
    }

    #[test]
    fn split_leaf_replaces_target_and_clamps_nothing_yet() {
        let g1 = PaneGroupId::next();
        let g2 = PaneGroupId::next();
        let root = leaf(g1);
        let result = split_leaf(&root, g1, SplitDirection::Horizontal, true, g2).unwrap();
        match &*result {
            TreeNode::Split { direction, ratio, left, right, .. } => {
                assert_eq!(*direction, SplitDirection::Horizontal);
                assert_eq!(*ratio, 0.5);
                assert_eq!(get_leaves(left), vec![g1]);
                assert_eq!(get_leaves(right), vec![g2]);
            }
            _ => panic!("expected split"),
        }
        assert_eq!(get_leaves(&result), vec![g1, g2]);
    }

    #[test]
    fn split_leaf_not_found_errors() {
        let g1 = PaneGroupId::next();
        let g2 = PaneGroupId::next();
        let root = leaf(g1);
        let err = split_leaf(&root, g2, SplitDirection::Horizontal, true, PaneGroupId::next()).unwrap_err();
        assert!(matches!(err, LayoutError::LeafNotFound));
    }

    #[test]
    fn remove_leaf_root_becomes_empty() {
        let g1 = PaneGroupId::next();
        let root = leaf(g1);
        assert!(remove_leaf(&root, g1).is_none());
    }

    #[test]
    fn remove_leaf_elides_split_no_dangling_node() {
        let g1 = PaneGroupId::next();
        let g2 = PaneGroupId::next();
        let root = split_leaf(&leaf(g1), g1, SplitDirection::Horizontal, true, g2).unwrap();
        let after = remove_leaf(&root, g2).unwrap();
        // The sibling leaf replaces the split entirely: no Split node left.
        assert!(matches!(&*after, TreeNode::Leaf { id } if *id == g1));
    }

    #[test]
    fn algebraic_law_remove_after_split_is_identity() {
        let g1 = PaneGroupId::next();
        let root = leaf(g1);
        let new_id = PaneGroupId::next();
        let split = split_leaf(&root, g1, SplitDirection::Vertical, false, new_id).unwrap();
        let back = remove_leaf(&split, new_id).unwrap();
        assert_eq!(get_leaves(&back), get_leaves(&root));
    }

    #[test]
    fn update_ratio_clamps_to_range() {
        let g1 = PaneGroupId::next();
        let g2 = PaneGroupId::next();
        let root = split_leaf(&leaf(g1), g1, SplitDirection::Horizontal, true, g2).unwrap();
        let split_id = match &*root {
            TreeNode::Split { id, .. } => *id,
            _ => unreachable!(),
        };
        let clamped_low = update_ratio(&root, split_id, 0.02);
        match &*clamped_low {
            TreeNode::Split { ratio, .. } => assert_eq!(*ratio, 0.1),
            _ => panic!(),
        }
        let clamped_high = update_ratio(&root, split_id, 0.95);
        match &*clamped_high {
            TreeNode::Split { ratio, .. } => assert_eq!(*ratio, 0.9),
            _ => panic!(),
        }
    }

    #[test]
    fn update_ratio_preserves_leaf_order() {
        let g1 = PaneGroupId::next();
        let g2 = PaneGroupId::next();
        let root = split_leaf(&leaf(g1), g1, SplitDirection::Horizontal, true, g2).unwrap();
        let split_id = match &*root {
            TreeNode::Split { id, .. } => *id,
            _ => unreachable!(),
        };
        let before = get_leaves(&root);
        let after = update_ratio(&root, split_id, 0.3);
        assert_eq!(before, get_leaves(&after));
    }

    #[test]
    fn equalize_is_idempotent() {
        let g1 = PaneGroupId::next();
        let g2 = PaneGroupId::next();
        let root = split_leaf(&leaf(g1), g1, SplitDirection::Horizontal, true, g2).unwrap();
        let split_id = match &*root {
            TreeNode::Split { id, .. } => *id,
            _ => unreachable!(),
        };
        let skewed = update_ratio(&root, split_id, 0.2);
        let once = equalize(&skewed);
        let twice = equalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn spatial_map_partitions_unit_square() {
        let g1 = PaneGroupId::next();
        let g2 = PaneGroupId::next();
        let g3 = PaneGroupId::next();
        let root = split_leaf(&leaf(g1), g1, SplitDirection::Horizontal, true, g2).unwrap();
        let root = split_leaf(&root, g2, SplitDirection::Vertical, true, g3).unwrap();
        let map = build_spatial_map(&root);
        let total_area: f64 = map.values().map(Rect::area).sum();
        assert!((total_area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn spatial_neighbor_2x2_grid_matches_scenario_3() {
        // Build A | B over C | D: split g1 right -> A,B; split A down -> A,C;
        // split B down -> B,D.
        let a = PaneGroupId::next();
        let root = leaf(a);
        let b = PaneGroupId::next();
        let root = split_leaf(&root, a, SplitDirection::Horizontal, true, b).unwrap();
        let c = PaneGroupId::next();
        let root = split_leaf(&root, a, SplitDirection::Vertical, true, c).unwrap();
        let d = PaneGroupId::next();
        let root = split_leaf(&root, b, SplitDirection::Vertical, true, d).unwrap();

        assert_eq!(get_spatial_neighbor(&root, d, NavDirection::Left), Some(c));
        assert_eq!(get_spatial_neighbor(&root, d, NavDirection::Up), Some(b));
        assert_eq!(get_spatial_neighbor(&root, b, NavDirection::Left), Some(a));
        assert_eq!(get_spatial_neighbor(&root, a, NavDirection::Left), None);
    }

    #[test]
    fn spatial_neighbor_never_returns_self() {
        let a = PaneGroupId::next();
        let root = leaf(a);
        assert_eq!(get_spatial_neighbor(&root, a, NavDirection::Left), None);
    }
}
