//! Offset-indexed view of a paragraph and substring replacement

use std::ops::Range;

use crate::document::{Document, NodeId, NodeKind, Run};
use crate::placeholder::Placeholder;

/// A run projected onto its paragraph's logical string
///
/// Offsets are byte offsets local to the paragraph; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedRun {
    pub start: usize,
    pub end: usize,
    /// Index of the run in its parent's child list (paragraph or wrapper)
    pub index_in_parent: usize,
    pub run: NodeId,
}

impl IndexedRun {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether a match over `range` touches this run
    ///
    /// Non-empty runs are touched when the ranges intersect. An empty run is
    /// touched when it sits inside the match or exactly at its start, but not
    /// when it sits exactly at its end.
    pub fn is_touched_by(&self, range: &Range<usize>) -> bool {
        if self.is_empty() {
            range.start <= self.start && self.start < range.end
        } else {
            self.start < range.end && range.start < self.end
        }
    }
}

/// Snapshot of a paragraph's logical string and run offsets
///
/// Any structural edit invalidates the snapshot; scan again afterwards.
#[derive(Debug, Clone)]
pub struct ParagraphText {
    paragraph: NodeId,
    text: String,
    runs: Vec<IndexedRun>,
}

impl ParagraphText {
    /// Index the runs of `paragraph`, flattening inline wrappers
    pub fn scan(doc: &Document, paragraph: NodeId) -> Self {
        let mut scan = Self {
            paragraph,
            text: String::new(),
            runs: Vec::new(),
        };
        scan.collect(doc, paragraph);
        scan
    }

    fn collect(&mut self, doc: &Document, container: NodeId) {
        for (index, &child) in doc.children(container).iter().enumerate() {
            match doc.kind(child) {
                NodeKind::Run(run) => {
                    let start = self.text.len();
                    for item in &run.content {
                        self.text.push_str(item.rendered());
                    }
                    self.runs.push(IndexedRun {
                        start,
                        end: self.text.len(),
                        index_in_parent: index,
                        run: child,
                    });
                }
                NodeKind::Wrapper(_) => self.collect(doc, child),
                _ => {}
            }
        }
    }

    pub fn paragraph(&self) -> NodeId {
        self.paragraph
    }

    /// The logical string
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn runs(&self) -> &[IndexedRun] {
        &self.runs
    }

    /// Runs touched by a match over `range`, in document order
    pub fn touched_runs(&self, range: &Range<usize>) -> Vec<IndexedRun> {
        self.runs
            .iter()
            .filter(|r| r.is_touched_by(range))
            .copied()
            .collect()
    }
}

/// Logical string of a paragraph
pub fn paragraph_text(doc: &Document, paragraph: NodeId) -> String {
    ParagraphText::scan(doc, paragraph).text
}

/// Replace the first occurrence of `placeholder` in `paragraph` with `replacement`
///
/// Returns the id of the inserted run, or `None` when the placeholder text does
/// not occur in the paragraph (the document is then left untouched). The
/// replacement takes the formatting of the first touched run unless it has a
/// format of its own.
pub fn replace(
    doc: &mut Document,
    paragraph: NodeId,
    placeholder: &Placeholder,
    mut replacement: Run,
) -> Option<NodeId> {
    let needle = placeholder.expression();
    if needle.is_empty() {
        return None;
    }

    let scan = ParagraphText::scan(doc, paragraph);
    let start = scan.text().find(needle)?;
    let range = start..start + needle.len();
    let touched = scan.touched_runs(&range);
    let first = *touched.first()?;

    if replacement.format.is_none() {
        replacement.format = doc.run(first.run).and_then(|r| r.format.clone());
    }

    if touched.len() == 1 {
        replace_in_single_run(doc, first, &range, replacement)
    } else {
        replace_across_runs(doc, &touched, &range, replacement)
    }
}

fn replace_in_single_run(
    doc: &mut Document,
    indexed: IndexedRun,
    range: &Range<usize>,
    replacement: Run,
) -> Option<NodeId> {
    let id = indexed.run;
    let local = (range.start - indexed.start)..(range.end - indexed.start);
    let len = indexed.len();

    if local.start == 0 && local.end == len {
        return doc.replace_node(id, NodeKind::Run(replacement));
    }

    if local.start == 0 {
        doc.run_mut(id)?.remove_range(local);
        return doc.insert_before(id, NodeKind::Run(replacement));
    }

    if local.end == len {
        doc.run_mut(id)?.remove_range(local);
        return doc.insert_after(id, NodeKind::Run(replacement));
    }

    let (prefix, suffix) = doc.run(id)?.split_around(local);
    *doc.run_mut(id)? = prefix;
    let inserted = doc.insert_after(id, NodeKind::Run(replacement))?;
    doc.insert_after(inserted, NodeKind::Run(suffix))?;
    Some(inserted)
}

fn replace_across_runs(
    doc: &mut Document,
    touched: &[IndexedRun],
    range: &Range<usize>,
    replacement: Run,
) -> Option<NodeId> {
    let first = *touched.first()?;
    let last = *touched.last()?;

    doc.run_mut(first.run)?
        .remove_range((range.start - first.start)..first.len());
    doc.run_mut(last.run)?
        .remove_range(0..(range.end - last.start).min(last.len()));

    for middle in &touched[1..touched.len() - 1] {
        doc.detach(middle.run);
    }

    doc.insert_after(first.run, NodeKind::Run(replacement))
}
