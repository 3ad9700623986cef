//! Annotation scopes
//!
//! An annotation is marked in the tree by zero-width anchors (start, end and
//! an optional reference) and carries a payload stored on the document.
//! This module rebuilds the nesting of annotations from a walk over a part.

mod builder;

pub use builder::{build_scopes, ScopeBuilder};

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::document::{walker, Annotation, AnnotationId, Document, DocumentVisitor, NodeId};

/// One reconstructed annotation
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub id: AnnotationId,
    pub start: Option<NodeId>,
    pub end: Option<NodeId>,
    pub reference: Option<NodeId>,
    pub parent: Option<AnnotationId>,
    pub children: Vec<AnnotationId>,
    pub payload: Option<Annotation>,
}

impl Scope {
    pub fn new(id: AnnotationId) -> Self {
        Self {
            id,
            start: None,
            end: None,
            reference: None,
            parent: None,
            children: Vec::new(),
            payload: None,
        }
    }

    /// Both range anchors and the payload are present
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some() && self.payload.is_some()
    }

    /// Payload text, trimmed; empty when there is no payload
    pub fn expression(&self) -> &str {
        self.payload.as_ref().map(|p| p.text.trim()).unwrap_or("")
    }
}

/// Why an annotation was left out of the forest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanKind {
    MissingStart,
    MissingEnd,
    MissingPayload,
    /// Anchors are complete but the scope hangs off no root
    Detached,
    /// Nested inside the given malformed annotation
    EnclosedByMalformed(AnnotationId),
    /// A payload whose id has no anchor anywhere in the document
    PayloadWithoutAnchors,
    /// A block-level start anchor with no paragraph for it to attach to
    Unattached,
}

/// Non-fatal report about a stray anchor or payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanAnnotation {
    pub id: AnnotationId,
    pub kind: OrphanKind,
}

impl fmt::Display for OrphanAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OrphanKind::MissingStart => write!(f, "annotation {} has no start anchor", self.id),
            OrphanKind::MissingEnd => write!(f, "annotation {} has no end anchor", self.id),
            OrphanKind::MissingPayload => write!(f, "annotation {} has no payload", self.id),
            OrphanKind::Detached => {
                write!(f, "annotation {} is not reachable from a root annotation", self.id)
            }
            OrphanKind::EnclosedByMalformed(outer) => write!(
                f,
                "annotation {} is nested in malformed annotation {}",
                self.id, outer
            ),
            OrphanKind::PayloadWithoutAnchors => {
                write!(f, "payload {} has no anchors in the document", self.id)
            }
            OrphanKind::Unattached => {
                write!(f, "annotation {} starts where no paragraph follows", self.id)
            }
        }
    }
}

/// Valid scopes of one part, keyed by id, with their root order
#[derive(Debug, Clone, Default)]
pub struct ScopeForest {
    scopes: HashMap<AnnotationId, Scope>,
    roots: Vec<AnnotationId>,
    warnings: Vec<OrphanAnnotation>,
}

impl ScopeForest {
    pub fn new(
        scopes: HashMap<AnnotationId, Scope>,
        roots: Vec<AnnotationId>,
        warnings: Vec<OrphanAnnotation>,
    ) -> Self {
        Self {
            scopes,
            roots,
            warnings,
        }
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Scope> {
        self.scopes.get(&id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.scopes.contains_key(&id)
    }

    /// Root ids in document order
    pub fn root_ids(&self) -> &[AnnotationId] {
        &self.roots
    }

    pub fn roots(&self) -> impl Iterator<Item = &Scope> {
        self.roots.iter().filter_map(|id| self.scopes.get(id))
    }

    /// All scopes, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.values()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn warnings(&self) -> &[OrphanAnnotation] {
        &self.warnings
    }

    /// Flatten into the id → scope map
    pub fn into_scopes(self) -> HashMap<AnnotationId, Scope> {
        self.scopes
    }
}

#[derive(Default)]
struct AnchorIds(HashSet<AnnotationId>);

impl DocumentVisitor for AnchorIds {
    type Error = std::convert::Infallible;

    fn annotation_start(&mut self, _d: &Document, id: AnnotationId, _a: NodeId) -> Result<(), Self::Error> {
        self.0.insert(id);
        Ok(())
    }

    fn annotation_end(&mut self, _d: &Document, id: AnnotationId, _a: NodeId) -> Result<(), Self::Error> {
        self.0.insert(id);
        Ok(())
    }

    fn annotation_reference(&mut self, _d: &Document, id: AnnotationId, _r: NodeId) -> Result<(), Self::Error> {
        self.0.insert(id);
        Ok(())
    }
}

/// Payloads whose id has no anchor in any part of the document
pub fn orphan_payloads(doc: &Document) -> Vec<OrphanAnnotation> {
    let mut anchors = AnchorIds::default();
    for &part in doc.parts() {
        if let Err(never) = walker::walk(doc, part, &mut anchors) {
            match never {}
        }
    }
    doc.annotations()
        .filter(|a| !anchors.0.contains(&a.id))
        .map(|a| OrphanAnnotation {
            id: a.id,
            kind: OrphanKind::PayloadWithoutAnchors,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PartKind;

    #[test]
    fn test_scope_expression_trims_payload() {
        let mut scope = Scope::new(AnnotationId(1));
        assert_eq!(scope.expression(), "");
        scope.payload = Some(Annotation::new(AnnotationId(1), "  hide()\n"));
        assert_eq!(scope.expression(), "hide()");
    }

    #[test]
    fn test_orphan_payloads_checks_every_part() {
        let mut doc = Document::new();
        let header = doc.add_part(PartKind::Header);
        let p = doc.add_paragraph(header);
        doc.add_annotation_start(p, AnnotationId(1));
        doc.add_annotation_end(p, AnnotationId(1));
        doc.add_annotation(Annotation::new(AnnotationId(1), "a()"));
        doc.add_annotation(Annotation::new(AnnotationId(2), "b()"));

        let orphans = orphan_payloads(&doc);
        assert_eq!(
            orphans,
            vec![OrphanAnnotation {
                id: AnnotationId(2),
                kind: OrphanKind::PayloadWithoutAnchors
            }]
        );
        assert_eq!(orphans[0].to_string(), "payload 2 has no anchors in the document");
    }
}
