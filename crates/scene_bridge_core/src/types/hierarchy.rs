use super::Vector3;
use serde::{Deserialize, Serialize};

/// Body of `GET /hierarchy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    #[serde(default)]
    pub object_count: usize,
    #[serde(default)]
    pub roots_count: usize,
    #[serde(default)]
    pub objects: Vec<HierarchyNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vector3>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
}

impl Hierarchy {
    /// Depth-first walk yielding each node with its depth (roots are 0).
    pub fn walk(&self) -> Vec<(usize, &HierarchyNode)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, &HierarchyNode)> =
            self.objects.iter().rev().map(|n| (0, n)).collect();

        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
        }
        out
    }

    /// All nodes named `name`. Duplicates are expected.
    pub fn find_all(&self, name: &str) -> Vec<&HierarchyNode> {
        self.walk()
            .into_iter()
            .filter(|(_, node)| node.name == name)
            .map(|(_, node)| node)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.walk().len()
    }
}
