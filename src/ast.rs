//! Indented text rendering of an AST stage.

use std::collections::{HashMap, HashSet};

use crate::model::AstNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    None,
    /// On the focus path.
    Path,
    /// Last node of the focus path.
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine<'a> {
    pub depth: usize,
    pub node: &'a AstNode,
    pub focus: Focus,
}

impl TreeLine<'_> {
    pub fn text(&self) -> String {
        let marker = match self.focus {
            Focus::None => ' ',
            Focus::Path => '*',
            Focus::Active => '>',
        };
        let mut out = format!(
            "{}{marker} {} ({})",
            "  ".repeat(self.depth),
            self.node.label,
            self.node.id
        );
        if let Some(details) = &self.node.details {
            out.push_str(" - ");
            out.push_str(details);
        }
        out
    }
}

/// Flattens the tree depth-first.
///
/// Roots are nodes no other node lists as a child; when every node is someone's
/// child, all nodes are treated as roots. Unknown child ids are skipped and a
/// node is visited at most once per root.
pub fn render_tree<'a>(nodes: &'a [AstNode], focus_path: &[String]) -> Vec<TreeLine<'a>> {
    let by_id: HashMap<&str, &AstNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let child_ids: HashSet<&str> = nodes
        .iter()
        .flat_map(|n| n.children.iter().map(String::as_str))
        .collect();

    let mut roots: Vec<&AstNode> = nodes
        .iter()
        .filter(|n| !child_ids.contains(n.id.as_str()))
        .collect();
    if roots.is_empty() {
        roots = nodes.iter().collect();
    }

    let on_path: HashSet<&str> = focus_path.iter().map(String::as_str).collect();
    let active = focus_path.last().map(String::as_str);
    let focus_of = |id: &str| {
        if active == Some(id) {
            Focus::Active
        } else if on_path.contains(id) {
            Focus::Path
        } else {
            Focus::None
        }
    };

    let mut out = Vec::new();
    for root in roots {
        let mut visited = HashSet::new();
        let mut stack = vec![(root, 0)];
        while let Some((node, depth)) = stack.pop() {
            if !visited.insert(node.id.as_str()) {
                continue;
            }
            out.push(TreeLine {
                depth,
                node,
                focus: focus_of(&node.id),
            });
            for child in node.children.iter().rev() {
                if let Some(child) = by_id.get(child.as_str()) {
                    stack.push((*child, depth + 1));
                }
            }
        }
    }
    out
}
