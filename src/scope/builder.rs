//! Scope reconstruction from anchor events

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::document::{walk, AnnotationId, Document, DocumentVisitor, NodeId};
use crate::error::StructuralError;

use super::{OrphanAnnotation, OrphanKind, Scope, ScopeForest};

/// Build the scope forest of one document part
///
/// Fails on malformed nesting; tolerates (prunes and reports) scopes with
/// missing anchors or payloads.
pub fn build_scopes(doc: &Document, part: NodeId) -> Result<ScopeForest, StructuralError> {
    let mut builder = ScopeBuilder::default();
    walk(doc, part, &mut builder)?;
    Ok(builder.finish(doc))
}

/// Walker visitor tracking open annotations on an explicit stack
#[derive(Debug, Default)]
pub struct ScopeBuilder {
    stack: Vec<AnnotationId>,
    scopes: HashMap<AnnotationId, Scope>,
    roots: Vec<AnnotationId>,
}

impl DocumentVisitor for ScopeBuilder {
    type Error = StructuralError;

    fn annotation_start(
        &mut self,
        _doc: &Document,
        id: AnnotationId,
        anchor: NodeId,
    ) -> Result<(), StructuralError> {
        if !self.scopes.contains_key(&id) {
            let mut scope = Scope::new(id);
            match self.stack.last() {
                None => self.roots.push(id),
                Some(&open) => {
                    scope.parent = Some(open);
                    if let Some(parent) = self.scopes.get_mut(&open) {
                        if !parent.children.contains(&id) {
                            parent.children.push(id);
                        }
                    }
                }
            }
            self.scopes.insert(id, scope);
        }
        if let Some(scope) = self.scopes.get_mut(&id) {
            scope.start = Some(anchor);
        }
        self.stack.push(id);
        Ok(())
    }

    fn annotation_end(
        &mut self,
        _doc: &Document,
        id: AnnotationId,
        anchor: NodeId,
    ) -> Result<(), StructuralError> {
        let scope = self
            .scopes
            .get_mut(&id)
            .ok_or_else(|| StructuralError::end_before_start(id))?;
        scope.end = Some(anchor);

        match self.stack.last() {
            Some(&open) if open == id => {
                self.stack.pop();
                Ok(())
            }
            open => Err(StructuralError::ambiguous(id, open.copied())),
        }
    }

    fn annotation_reference(
        &mut self,
        _doc: &Document,
        id: AnnotationId,
        run: NodeId,
    ) -> Result<(), StructuralError> {
        self.scopes
            .entry(id)
            .or_insert_with(|| Scope::new(id))
            .reference = Some(run);
        Ok(())
    }
}

impl ScopeBuilder {
    /// Attach payloads and prune incomplete scopes together with their subtrees
    pub fn finish(mut self, doc: &Document) -> ScopeForest {
        for scope in self.scopes.values_mut() {
            scope.payload = doc.annotation(scope.id).cloned();
        }

        let reachable = self.reachable_from_roots();
        let mut warnings = Vec::new();
        let mut pruned: HashSet<AnnotationId> = HashSet::new();

        let mut ids: Vec<AnnotationId> = self.scopes.keys().copied().collect();
        ids.sort();

        for &id in &ids {
            let scope = &self.scopes[&id];
            let defect = if scope.start.is_none() {
                Some(OrphanKind::MissingStart)
            } else if scope.end.is_none() {
                Some(OrphanKind::MissingEnd)
            } else if scope.payload.is_none() {
                Some(OrphanKind::MissingPayload)
            } else if !reachable.contains(&id) {
                Some(OrphanKind::Detached)
            } else {
                None
            };

            if let Some(kind) = defect {
                warnings.push(OrphanAnnotation { id, kind });
                pruned.insert(id);
                // Everything nested inside a malformed scope goes with it
                let mut work = scope.children.clone();
                while let Some(child) = work.pop() {
                    if pruned.insert(child) {
                        warnings.push(OrphanAnnotation {
                            id: child,
                            kind: OrphanKind::EnclosedByMalformed(id),
                        });
                    }
                    if let Some(nested) = self.scopes.get(&child) {
                        work.extend(nested.children.iter().copied());
                    }
                }
            }
        }

        // A child processed before its malformed ancestor may have been
        // reported twice; keep the first reason only.
        let mut seen = HashSet::new();
        warnings.retain(|w| seen.insert(w.id));

        for warning in &warnings {
            warn!(annotation = %warning.id, "pruning annotation: {}", warning);
        }

        let mut scopes = self.scopes;
        scopes.retain(|id, _| !pruned.contains(id));
        for scope in scopes.values_mut() {
            scope.children.retain(|c| !pruned.contains(c));
        }
        let roots = self.roots.into_iter().filter(|r| !pruned.contains(r)).collect();

        ScopeForest::new(scopes, roots, warnings)
    }

    fn reachable_from_roots(&self) -> HashSet<AnnotationId> {
        let mut reachable = HashSet::new();
        let mut work = self.roots.clone();
        while let Some(id) = work.pop() {
            if reachable.insert(id) {
                if let Some(scope) = self.scopes.get(&id) {
                    work.extend(scope.children.iter().copied());
                }
            }
        }
        reachable
    }
}
