use crate::transport::HttpTransport;
use crate::types::Hierarchy;
use crate::Result;
use std::fmt::Write;

/// Pulls the host's scene tree and logs its size.
pub async fn snapshot(transport: &HttpTransport) -> Result<Hierarchy> {
    let tree = transport.hierarchy().await?;

    let walked = tree.node_count();
    if walked != tree.object_count {
        tracing::warn!(
            "Hierarchy reports {} objects but contains {}",
            tree.object_count,
            walked
        );
    }
    tracing::debug!("Hierarchy: {} objects, {} roots", walked, tree.roots_count);

    Ok(tree)
}

/// Indented one-line-per-node listing, e.g. for terminal output.
pub fn render(tree: &Hierarchy) -> String {
    let mut out = String::new();
    for (depth, node) in tree.walk() {
        let _ = write!(out, "{}{}", "  ".repeat(depth), node.name);
        if let Some(position) = node.position {
            let _ = write!(out, " {}", position);
        }
        if !node.components.is_empty() {
            let _ = write!(out, " [{}]", node.components.join(", "));
        }
        out.push('\n');
    }
    out
}
