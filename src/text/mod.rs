//! Run-text engine
//!
//! Word-processing documents split a visually continuous phrase into many
//! runs (spell-check marks, revisions, field codes). This module treats a
//! paragraph's runs as one logical string and edits arbitrary substrings of
//! it without disturbing formatting outside the edited range.

mod paragraph;

pub use paragraph::{paragraph_text, replace, IndexedRun, ParagraphText};

use crate::document::{walker, Document, NodeId};

impl Document {
    /// Logical text of every paragraph under `root`, joined by newlines
    pub fn text(&self, root: NodeId) -> String {
        walker::paragraphs(self, root)
            .into_iter()
            .map(|p| paragraph_text(self, p))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
