use serde::Serialize;

use crate::models::InvitationNode;

/// Membership counts relative to the first root of a forest.
///
/// `direct` counts the root's immediate children, `indirect` everything
/// deeper, and `total` includes the root itself, so for any non-empty forest
/// `direct + indirect + 1 == total`.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub total: usize,
    pub direct: usize,
    pub indirect: usize,
}

impl TreeStats {
    /// Only the first root is counted; an empty forest gives all zeroes.
    pub fn from_forest(forest: &[InvitationNode]) -> Self {
        match forest.first() {
            Some(root) => Self::from_root(root),
            None => Self::default(),
        }
    }

    pub fn from_root(root: &InvitationNode) -> Self {
        let total = count_nodes(root);
        let direct = root.children().len();
        Self {
            total,
            direct,
            indirect: total - direct - 1,
        }
    }
}

/// Counts `root` and all its descendants. Iterative so deep chains can't
/// overflow the stack.
fn count_nodes(root: &InvitationNode) -> usize {
    let mut count = 0;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        count += 1;
        stack.extend(node.children());
    }
    count
}
