/// Tree-sitter grammar setup for markdown bodies.
use std::path::Path;

use tree_sitter::{Parser, Tree};

use crate::error::Error;

/// Parse a markdown body with the block-level tree-sitter grammar.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the language cannot be set or parsing fails.
pub fn parse_markdown(file_path: &Path, source: &str) -> Result<Tree, Error> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_md::LANGUAGE.into())
        .map_err(|e| {
            return Error::ParseFailed {
                file: file_path.to_path_buf(),
                reason: e.to_string(),
            };
        })?;

    return parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: "tree-sitter returned None".to_string(),
        };
    });
}
