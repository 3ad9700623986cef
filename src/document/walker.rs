//! Depth-first traversal over a document part
//!
//! The walker visits part → table → row → cell → paragraph → run in document
//! order (pre-order, tables row-major) and reports annotation anchors as it
//! meets them. Inline wrappers are not entered: runs inside structured
//! content, fields or hyperlinks are invisible to visitors.

use std::convert::Infallible;

use super::node::{AnnotationId, Document, NodeId, NodeKind};

/// Callbacks invoked by [`walk`]; every callback defaults to a no-op
pub trait DocumentVisitor {
    type Error;

    fn paragraph(&mut self, _doc: &Document, _paragraph: NodeId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn run(&mut self, _doc: &Document, _paragraph: NodeId, _run: NodeId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn annotation_start(
        &mut self,
        _doc: &Document,
        _id: AnnotationId,
        _anchor: NodeId,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn annotation_end(
        &mut self,
        _doc: &Document,
        _id: AnnotationId,
        _anchor: NodeId,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// `run` is the run carrying the reference item
    fn annotation_reference(
        &mut self,
        _doc: &Document,
        _id: AnnotationId,
        _run: NodeId,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Walk the subtree under `root`, stopping at the first visitor error
pub fn walk<V>(doc: &Document, root: NodeId, visitor: &mut V) -> Result<(), V::Error>
where
    V: DocumentVisitor + ?Sized,
{
    match doc.kind(root) {
        NodeKind::Part(_) | NodeKind::Table | NodeKind::Row | NodeKind::Cell => {
            for &child in doc.children(root) {
                walk(doc, child, visitor)?;
            }
        }
        NodeKind::Paragraph => walk_paragraph(doc, root, visitor)?,
        NodeKind::AnnotationStart(id) => visitor.annotation_start(doc, *id, root)?,
        NodeKind::AnnotationEnd(id) => visitor.annotation_end(doc, *id, root)?,
        NodeKind::Run(_) | NodeKind::Wrapper(_) => {}
    }
    Ok(())
}

fn walk_paragraph<V>(doc: &Document, paragraph: NodeId, visitor: &mut V) -> Result<(), V::Error>
where
    V: DocumentVisitor + ?Sized,
{
    visitor.paragraph(doc, paragraph)?;
    for &child in doc.children(paragraph) {
        match doc.kind(child) {
            NodeKind::Run(run) => {
                visitor.run(doc, paragraph, child)?;
                for id in run.annotation_references() {
                    visitor.annotation_reference(doc, id, child)?;
                }
            }
            NodeKind::AnnotationStart(id) => visitor.annotation_start(doc, *id, child)?,
            NodeKind::AnnotationEnd(id) => visitor.annotation_end(doc, *id, child)?,
            _ => {}
        }
    }
    Ok(())
}

#[derive(Default)]
struct Collector {
    paragraphs: Vec<NodeId>,
    runs: Vec<(NodeId, NodeId)>,
}

impl DocumentVisitor for Collector {
    type Error = Infallible;

    fn paragraph(&mut self, _doc: &Document, paragraph: NodeId) -> Result<(), Infallible> {
        self.paragraphs.push(paragraph);
        Ok(())
    }

    fn run(&mut self, _doc: &Document, paragraph: NodeId, run: NodeId) -> Result<(), Infallible> {
        self.runs.push((paragraph, run));
        Ok(())
    }
}

fn collect(doc: &Document, root: NodeId) -> Collector {
    let mut collector = Collector::default();
    if let Err(never) = walk(doc, root, &mut collector) {
        match never {}
    }
    collector
}

/// Paragraphs under `root` in walk order
pub fn paragraphs(doc: &Document, root: NodeId) -> Vec<NodeId> {
    collect(doc, root).paragraphs
}

/// `(paragraph, run)` pairs under `root` in walk order
pub fn runs(doc: &Document, root: NodeId) -> Vec<(NodeId, NodeId)> {
    collect(doc, root).runs
}
