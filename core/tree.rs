//! Directory tree built from the walk selection.

use crate::error::{AppError, Result};
use crate::walker::Selection;
use log;
use serde::Serialize;
use std::path::{Component, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    fn new(name: &str, node_type: NodeType) -> Self {
        Self {
            name: name.to_string(),
            node_type,
            children: match node_type {
                NodeType::Directory => Some(Vec::new()),
                NodeType::File => None,
            },
        }
    }
}

/// Builds a name-sorted tree from the selected files. Visited directories
/// holding no selected file appear only when `collapse_empty_dirs` is false.
pub fn build_tree(selection: &Selection, collapse_empty_dirs: bool) -> Result<Vec<TreeNode>> {
    log::debug!(
        "Building tree structure from {} files...",
        selection.files.len()
    );
    let mut roots: Vec<TreeNode> = Vec::new();

    if !collapse_empty_dirs {
        for dir in &selection.dirs {
            insert_path(&mut roots, dir, NodeType::Directory)?;
        }
    }
    for file in &selection.files {
        insert_path(&mut roots, &file.relative_path, NodeType::File)?;
    }

    log::debug!("Tree structure built successfully.");
    Ok(roots)
}

fn insert_path(roots: &mut Vec<TreeNode>, path: &Path, leaf_type: NodeType) -> Result<()> {
    let components: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if components.is_empty() {
        return Ok(());
    }
    insert_node(roots, &components, leaf_type)
}

fn insert_node(level: &mut Vec<TreeNode>, components: &[String], leaf_type: NodeType) -> Result<()> {
    let Some((name, rest)) = components.split_first() else {
        return Ok(());
    };
    let node_type = if rest.is_empty() {
        leaf_type
    } else {
        NodeType::Directory
    };

    let index = match level.binary_search_by(|node| node.name.cmp(name)) {
        Ok(index) => {
            if level[index].node_type != node_type {
                return Err(AppError::Render(format!(
                    "Tree conflict: \"{}\" is both a file and a directory",
                    name
                )));
            }
            index
        }
        Err(insertion_point) => {
            level.insert(insertion_point, TreeNode::new(name, node_type));
            insertion_point
        }
    };

    if !rest.is_empty() {
        let children = level[index].children.get_or_insert_with(Vec::new);
        insert_node(children, rest, leaf_type)?;
    }
    Ok(())
}

/// Draws the tree with box characters under a `root_name/` header.
pub fn render_ascii(root_name: &str, nodes: &[TreeNode]) -> String {
    let mut out = format!("{}/\n", root_name);
    draw_level(nodes, "", &mut out);
    out
}

fn draw_level(nodes: &[TreeNode], prefix: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { "└── " } else { "├── " };
        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&node.name);
        if node.node_type == NodeType::Directory {
            out.push('/');
        }
        out.push('\n');
        if let Some(children) = &node.children {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            draw_level(children, &child_prefix, out);
        }
    }
}
