//! structscan: struct declaration extraction for Go code generators
//!
//! This crate provides the pieces a query-builder generator needs from a Go file:
//! - Parsing a single source file with tree-sitter
//! - Collecting top-level struct declarations by name
//! - Extracting exported fields, doc comments, and one level of embedded fields
//! - Resolving the import path of the file's package

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod config;
pub mod package;
pub mod parse;
pub mod structs;

// Re-export main types
pub use config::Config;
pub use package::resolve_import_path;
pub use parse::{parse_go_file, GoSource};
pub use structs::{
    collect_struct_names, extract_structs, extract_structs_with_config, Field, Package,
    ParsedFile, ParsedStruct, StructDecl, StructId,
};

/// A location in source code (file, line, column) with start and end positions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,       // 1-indexed start line
    pub column: u32,     // 1-indexed start column
    pub end_line: u32,   // 1-indexed end line
    pub end_column: u32, // 1-indexed end column
}

impl Location {
    pub fn new(file: PathBuf, line: u32, column: u32) -> Self {
        Self {
            file,
            line,
            column,
            end_line: line,
            end_column: column,
        }
    }

    /// Create a location with explicit start and end positions
    pub fn with_end(file: PathBuf, line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            file,
            line,
            column,
            end_line,
            end_column,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Errors that can occur while extracting structs
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse file {path}: {message}")]
    Parse {
        path: PathBuf,
        message: String,
        location: Option<Location>,
    },

    #[error("tree-sitter-go grammar incompatible with tree-sitter version: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
