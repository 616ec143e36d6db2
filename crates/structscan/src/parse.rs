//! Parsing Go source files with tree-sitter.
//!
//! Every call builds its own parser, so concurrent extractions never share
//! mutable parser state.
//!
//! # Examples
//!
//! ```
//! use structscan::parse::parse_go_source;
//! use std::path::Path;
//!
//! let source = parse_go_source(Path::new("user.go"), "package models\n".to_string()).unwrap();
//! assert_eq!(source.package_name(), "models");
//!
//! // A file without a package clause is rejected
//! assert!(parse_go_source(Path::new("empty.go"), String::new()).is_err());
//! ```

use std::path::{Path, PathBuf};

use crate::{ExtractError, Location, Result};

/// A successfully parsed Go file: the text, its syntax tree, and its package name.
pub struct GoSource {
    path: PathBuf,
    text: String,
    tree: tree_sitter::Tree,
    package_name: String,
}

impl GoSource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Identifier from the `package` clause.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Source text covered by a node of this file's tree.
    pub fn node_text(&self, node: &tree_sitter::Node) -> &str {
        node.utf8_text(self.text.as_bytes()).unwrap_or_default()
    }

    pub fn location(&self, node: &tree_sitter::Node) -> Location {
        node_to_location(&self.path, node)
    }
}

impl std::fmt::Debug for GoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoSource")
            .field("path", &self.path)
            .field("package_name", &self.package_name)
            .finish_non_exhaustive()
    }
}

/// Read and parse a Go file from disk.
pub fn parse_go_file(path: &Path) -> Result<GoSource> {
    let text = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_go_source(path, text)
}

/// Parse Go source text.
///
/// Fails when the tree contains syntax errors or the file declares no package,
/// which includes the empty file.
pub fn parse_go_source(path: &Path, text: String) -> Result<GoSource> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&tree_sitter_go::LANGUAGE.into())?;

    let tree = parser
        .parse(&text, None)
        .ok_or_else(|| parse_error(path, "parser produced no syntax tree", None))?;

    let root = tree.root_node();
    if let Some(error_node) = first_error_node(&root) {
        let message = if error_node.is_missing() {
            format!("missing `{}`", error_node.kind())
        } else {
            "syntax error".to_string()
        };
        let location = node_to_location(path, &error_node);
        tracing::debug!("Syntax error in {:?} at {}", path, location);
        return Err(parse_error(path, message, Some(location)));
    }

    let package_name = find_child_by_kind(&root, "package_clause")
        .and_then(|clause| find_child_by_kind(&clause, "package_identifier"))
        .and_then(|ident| ident.utf8_text(text.as_bytes()).ok())
        .map(str::to_string)
        .ok_or_else(|| parse_error(path, "missing package clause", None))?;

    Ok(GoSource {
        path: path.to_path_buf(),
        text,
        tree,
        package_name,
    })
}

fn parse_error(path: &Path, message: impl Into<String>, location: Option<Location>) -> ExtractError {
    ExtractError::Parse {
        path: path.to_path_buf(),
        message: message.into(),
        location,
    }
}

/// Find the first ERROR or MISSING node in document order.
fn first_error_node<'a>(node: &tree_sitter::Node<'a>) -> Option<tree_sitter::Node<'a>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error_node(&child) {
            return Some(found);
        }
    }
    None
}

/// Convert a tree-sitter node position to our Location type.
pub fn node_to_location(file: &Path, node: &tree_sitter::Node) -> Location {
    let start = node.start_position();
    let end = node.end_position();
    Location::with_end(
        file.to_path_buf(),
        (start.row + 1) as u32,    // Convert to 1-indexed
        (start.column + 1) as u32, // Convert to 1-indexed
        (end.row + 1) as u32,      // Convert to 1-indexed
        (end.column + 1) as u32,   // Convert to 1-indexed
    )
}

/// Find a child node by its kind.
pub fn find_child_by_kind<'a>(
    node: &tree_sitter::Node<'a>,
    kind: &str,
) -> Option<tree_sitter::Node<'a>> {
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            if cursor.node().kind() == kind {
                return Some(cursor.node());
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    None
}
