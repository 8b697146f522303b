use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An ordered sequence of root nodes.
pub type Forest = Vec<InvitationNode>;

/// One member of the invitation hierarchy as returned by `GET /tree`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct InvitationNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
    // `null` and a missing key both mean "leaf"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<InvitationNode>>,
}

impl InvitationNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: None,
            children: None,
        }
    }

    /// Builder helper, mostly for tests and fixtures.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: InvitationNode) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn children(&self) -> &[InvitationNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .flat_map(|attrs| attrs.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }
}

// Releasing a node frees its subtree level by level; the default drop glue
// would recurse once per level.
impl Drop for InvitationNode {
    fn drop(&mut self) {
        let mut pending = match self.children.take() {
            Some(children) => children,
            None => return,
        };
        while let Some(mut node) = pending.pop() {
            if let Some(children) = node.children.take() {
                pending.extend(children);
            }
        }
    }
}
