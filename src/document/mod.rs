//! In-memory document model
//!
//! A [`Document`] is an arena of nodes forming one tree per part (body,
//! headers, footers). Parent links are arena indices used for navigation
//! only; ownership flows strictly from parent to children.

mod node;
mod run;
pub mod walker;

pub use node::{
    Annotation, AnnotationId, Document, Node, NodeId, NodeKind, PartKind, WrapperKind,
};
pub use run::{BreakKind, Run, RunContent, RunFormat};
pub use walker::{walk, DocumentVisitor};
