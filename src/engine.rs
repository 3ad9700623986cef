//! Orchestration of processors and placeholder resolution
//!
//! Processors run in three fixed phases per document part:
//!
//! 1. run-scoped annotations: each run is handed to the tightest annotation
//!    enclosing it within its paragraph;
//! 2. paragraph-scoped annotations: annotations starting inside a paragraph
//!    or immediately before it at block level;
//! 3. inline `#{...}` calls found in paragraph text.
//!
//! An annotation is consumed at most once per run. One whose evaluation fails
//! stays eligible: later runs it encloses and the paragraph phase try it again.
//! Annotations that were consumed have their anchors and payload removed once
//! all phases are done; the others are left in place. Value placeholders (`${...}`) are resolved
//! afterwards by [`Engine::resolve_placeholders`].

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::config::{ConfigError, StampConfig};
use crate::document::{walker, AnnotationId, Document, NodeId, NodeKind, PartKind, Run};
use crate::error::EvaluationError;
use crate::expression::{DataContext, Evaluator, PathEvaluator, Value};
use crate::placeholder::{Placeholder, PlaceholderStyle};
use crate::processor::{
    CallSite, Failure, FailureOutcome, FailureResolver, Processor, ProcessorCall,
    ProcessorContext, ProcessorRegistry, RegistryError, ResolverChain, ValueResolver,
};
use crate::scope::{build_scopes, orphan_payloads, OrphanAnnotation, OrphanKind, Scope};
use crate::text::{paragraph_text, replace};
use crate::StampError;

/// Summary of one engine call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StampReport {
    /// Annotations whose expression evaluated successfully
    pub scopes_consumed: usize,
    /// `#{...}` calls that evaluated successfully and were erased
    pub inline_calls_consumed: usize,
    /// `${...}` placeholders replaced by their value
    pub placeholders_resolved: usize,
    /// Failed evaluations the failure resolver chose not to raise
    pub failures_tolerated: usize,
    pub warnings: Vec<OrphanAnnotation>,
}

impl StampReport {
    pub fn merge(&mut self, other: StampReport) {
        self.scopes_consumed += other.scopes_consumed;
        self.inline_calls_consumed += other.inline_calls_consumed;
        self.placeholders_resolved += other.placeholders_resolved;
        self.failures_tolerated += other.failures_tolerated;
        self.warnings.extend(other.warnings);
    }
}

enum Outcome {
    Done,
    Leave,
    Substitute(String),
}

/// Annotation bookkeeping for one `run_processors` call
#[derive(Default)]
struct Progress {
    /// Scopes handed to a processor at least once
    attempted: HashSet<AnnotationId>,
    /// Scopes that evaluated successfully
    done: HashSet<AnnotationId>,
    consumed: Vec<Scope>,
    report: StampReport,
}

/// The stamping engine
pub struct Engine {
    config: StampConfig,
    value_style: PlaceholderStyle,
    processor_style: PlaceholderStyle,
    evaluator: Box<dyn Evaluator>,
    registry: ProcessorRegistry,
    resolvers: ResolverChain,
    failures: Box<dyn FailureResolver>,
}

impl Default for Engine {
    fn default() -> Self {
        let config = StampConfig::default();
        Self {
            value_style: PlaceholderStyle::value(),
            processor_style: PlaceholderStyle::processor(),
            evaluator: Box::new(PathEvaluator),
            registry: ProcessorRegistry::new(),
            resolvers: ResolverChain::new(config.evaluation.null_replacement.clone()),
            failures: Box::new(config.evaluation.on_failure.clone()),
            config,
        }
    }
}

impl Engine {
    /// Create an engine with the reference evaluator and no processors
    pub fn new(config: StampConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            value_style: PlaceholderStyle::new(config.delimiters.value.clone())?,
            processor_style: PlaceholderStyle::new(config.delimiters.processor.clone())?,
            evaluator: Box::new(PathEvaluator),
            registry: ProcessorRegistry::new(),
            resolvers: ResolverChain::new(config.evaluation.null_replacement.clone()),
            failures: Box::new(config.evaluation.on_failure.clone()),
            config,
        })
    }

    pub fn with_evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn with_processor(mut self, processor: impl Processor + 'static) -> Result<Self, RegistryError> {
        self.register(Box::new(processor))?;
        Ok(self)
    }

    /// Add a value resolver ahead of the default ones
    pub fn with_value_resolver(mut self, resolver: impl ValueResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Replace the configured failure policy
    pub fn with_failure_resolver(mut self, resolver: impl FailureResolver + 'static) -> Self {
        self.failures = Box::new(resolver);
        self
    }

    pub fn register(&mut self, processor: Box<dyn Processor>) -> Result<(), RegistryError> {
        self.registry.register(processor)
    }

    pub fn config(&self) -> &StampConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Process every enabled part: processors first, then value placeholders
    pub fn stamp(&mut self, doc: &mut Document, data: &Value) -> Result<StampReport, StampError> {
        let mut report = StampReport::default();

        let orphans = orphan_payloads(doc);
        for orphan in &orphans {
            warn!(annotation = %orphan.id, "{}", orphan);
        }
        report.warnings.extend(orphans);

        let parts = doc.parts().to_vec();
        for part in parts {
            if !self.processes(doc.part_kind(part)) {
                debug!(part = part.index(), "skipping disabled part");
                continue;
            }
            report.merge(self.run_processors(doc, part, data)?);
            report.merge(self.resolve_placeholders(doc, part, data)?);
        }

        debug!(
            scopes = report.scopes_consumed,
            inline = report.inline_calls_consumed,
            placeholders = report.placeholders_resolved,
            tolerated = report.failures_tolerated,
            "stamping finished"
        );
        Ok(report)
    }

    fn processes(&self, kind: Option<PartKind>) -> bool {
        match kind {
            Some(PartKind::Header) => self.config.parts.headers,
            Some(PartKind::Footer) => self.config.parts.footers,
            _ => true,
        }
    }

    /// Run all processors over one part, in the three phases
    pub fn run_processors(
        &mut self,
        doc: &mut Document,
        part: NodeId,
        data: &Value,
    ) -> Result<StampReport, StampError> {
        let forest = build_scopes(doc, part)?;
        let mut progress = Progress::default();
        progress.report.warnings.extend_from_slice(forest.warnings());
        let mut pending = forest.into_scopes();

        self.run_scoped_phase(doc, part, data, &mut pending, &mut progress)?;
        debug!(consumed = progress.report.scopes_consumed, "run-scoped phase done");

        self.paragraph_phase(doc, part, data, &mut progress)?;
        debug!(consumed = progress.report.scopes_consumed, "paragraph phase done");

        self.inline_phase(doc, part, data, &mut progress)?;
        debug!(calls = progress.report.inline_calls_consumed, "inline phase done");

        for scope in &progress.consumed {
            remove_anchors(doc, scope);
        }
        Ok(progress.report)
    }

    fn run_scoped_phase(
        &mut self,
        doc: &mut Document,
        part: NodeId,
        data: &Value,
        pending: &mut HashMap<AnnotationId, Scope>,
        progress: &mut Progress,
    ) -> Result<(), StampError> {
        for (paragraph, run) in walker::runs(doc, part) {
            if !doc.is_attached(run) {
                continue;
            }
            let Some(id) = enclosing_scope(doc, run, paragraph, pending) else {
                continue;
            };
            let Some(scope) = pending.get(&id).cloned() else {
                continue;
            };
            if self.invoke_scope(doc, data, paragraph, Some(run), scope, progress)? {
                pending.remove(&id);
            }
        }
        Ok(())
    }

    fn paragraph_phase(
        &mut self,
        doc: &mut Document,
        part: NodeId,
        data: &Value,
        progress: &mut Progress,
    ) -> Result<(), StampError> {
        // Earlier invocations may have restructured the part
        let mut pending: HashMap<AnnotationId, Scope> = build_scopes(doc, part)?
            .into_scopes()
            .into_iter()
            .filter(|(id, _)| !progress.done.contains(id))
            .collect();

        for paragraph in walker::paragraphs(doc, part) {
            if pending.is_empty() {
                break;
            }
            if !doc.is_attached(paragraph) {
                continue;
            }
            for id in paragraph_scopes(doc, paragraph) {
                if let Some(scope) = pending.remove(&id) {
                    self.invoke_scope(doc, data, paragraph, None, scope, progress)?;
                }
            }
        }

        // Block-level anchors with no paragraph to attach to
        let mut unattached: Vec<AnnotationId> = pending
            .into_keys()
            .filter(|id| !progress.attempted.contains(id))
            .collect();
        unattached.sort();
        for id in unattached {
            let orphan = OrphanAnnotation {
                id,
                kind: OrphanKind::Unattached,
            };
            warn!(annotation = %id, "{}", orphan);
            progress.report.warnings.push(orphan);
        }
        Ok(())
    }

    fn inline_phase(
        &mut self,
        doc: &mut Document,
        part: NodeId,
        data: &Value,
        progress: &mut Progress,
    ) -> Result<(), StampError> {
        for paragraph in walker::paragraphs(doc, part) {
            if !doc.is_attached(paragraph) {
                continue;
            }
            let text = paragraph_text(doc, paragraph);
            for placeholder in self.processor_style.find(&text) {
                let context = ProcessorContext {
                    paragraph,
                    run: None,
                    scope: None,
                    placeholder: &placeholder,
                };
                match self.invoke(doc, data, context, CallSite::Inline)? {
                    Outcome::Done => {
                        replace(doc, paragraph, &placeholder, Run::empty());
                        progress.report.inline_calls_consumed += 1;
                    }
                    Outcome::Substitute(text) => {
                        replace(doc, paragraph, &placeholder, Run::new(text));
                        progress.report.failures_tolerated += 1;
                    }
                    Outcome::Leave => progress.report.failures_tolerated += 1,
                }
                if !doc.is_attached(paragraph) {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Evaluate an annotation; returns whether it was consumed
    fn invoke_scope(
        &mut self,
        doc: &mut Document,
        data: &Value,
        paragraph: NodeId,
        run: Option<NodeId>,
        scope: Scope,
        progress: &mut Progress,
    ) -> Result<bool, StampError> {
        progress.attempted.insert(scope.id);
        let placeholder = Placeholder::bare(scope.expression());
        let context = ProcessorContext {
            paragraph,
            run,
            scope: Some(&scope),
            placeholder: &placeholder,
        };
        // A substitute has nothing to replace for an annotation
        match self.invoke(doc, data, context, CallSite::Annotation)? {
            Outcome::Done => {
                progress.report.scopes_consumed += 1;
                progress.done.insert(scope.id);
                progress.consumed.push(scope);
                Ok(true)
            }
            Outcome::Leave | Outcome::Substitute(_) => {
                progress.report.failures_tolerated += 1;
                Ok(false)
            }
        }
    }

    /// Evaluate one expression with processor dispatch, then commit and reset
    fn invoke(
        &mut self,
        doc: &mut Document,
        data: &Value,
        context: ProcessorContext<'_>,
        site: CallSite,
    ) -> Result<Outcome, StampError> {
        let placeholder = context.placeholder;
        let scope = context.scope.map(|s| s.id);

        let result = {
            let mut call = ProcessorCall::new(&mut self.registry, data, doc, context, site);
            self.evaluator.evaluate(placeholder.content().trim(), &mut call)
        };

        match result {
            Ok(_) => {
                let committed = self.registry.commit(doc);
                self.registry.reset();
                committed?;
                Ok(Outcome::Done)
            }
            Err(error) => {
                self.registry.reset();
                self.tolerate(placeholder, scope, error)
            }
        }
    }

    fn tolerate(
        &mut self,
        placeholder: &Placeholder,
        scope: Option<AnnotationId>,
        error: EvaluationError,
    ) -> Result<Outcome, StampError> {
        if matches!(error, EvaluationError::Syntax { .. }) {
            debug!("{}", error.format(&placeholder.to_string()));
        }
        let failure = Failure {
            placeholder,
            scope,
            error: &error,
        };
        match self.failures.resolve(&failure) {
            FailureOutcome::Raise => Err(StampError::Evaluation(error)),
            FailureOutcome::Leave => {
                warn!(%placeholder, %error, "leaving unresolved expression");
                Ok(Outcome::Leave)
            }
            FailureOutcome::Substitute(text) => {
                warn!(%placeholder, %error, replacement = %text, "substituting unresolved expression");
                Ok(Outcome::Substitute(text))
            }
        }
    }

    /// Replace every `${...}` placeholder of a part with its value
    pub fn resolve_placeholders(
        &mut self,
        doc: &mut Document,
        part: NodeId,
        data: &Value,
    ) -> Result<StampReport, StampError> {
        let mut report = StampReport::default();

        for paragraph in walker::paragraphs(doc, part) {
            let text = paragraph_text(doc, paragraph);
            for placeholder in self.value_style.find(&text) {
                let mut context = DataContext::new(data);
                let evaluated = self
                    .evaluator
                    .evaluate(placeholder.content().trim(), &mut context);

                let replacement = match evaluated {
                    Ok(value) => {
                        let run = self.resolvers.resolve(&value, &placeholder)?;
                        report.placeholders_resolved += 1;
                        Some(run)
                    }
                    Err(error) => {
                        report.failures_tolerated += 1;
                        match self.tolerate(&placeholder, None, error)? {
                            Outcome::Substitute(text) => Some(Run::new(text)),
                            Outcome::Done | Outcome::Leave => None,
                        }
                    }
                };
                if let Some(run) = replacement {
                    replace(doc, paragraph, &placeholder, run);
                }
            }
        }

        debug!(resolved = report.placeholders_resolved, "placeholders resolved");
        Ok(report)
    }
}

/// Tightest pending scope whose anchors bracket `run` within its paragraph
///
/// Starting from the run, each level up to the paragraph is searched for the
/// nearest preceding start anchor whose end anchor follows at the same level.
fn enclosing_scope(
    doc: &Document,
    run: NodeId,
    paragraph: NodeId,
    pending: &HashMap<AnnotationId, Scope>,
) -> Option<AnnotationId> {
    let mut node = run;
    loop {
        let parent = doc.parent(node)?;
        let index = doc.index_in_parent(node)?;
        let siblings = doc.children(parent);

        for &before in siblings[..index].iter().rev() {
            let NodeKind::AnnotationStart(id) = doc.kind(before) else {
                continue;
            };
            if !pending.contains_key(id) {
                continue;
            }
            let closes_after = siblings[index + 1..]
                .iter()
                .any(|&after| matches!(doc.kind(after), NodeKind::AnnotationEnd(end) if end == id));
            if closes_after {
                return Some(*id);
            }
        }

        if parent == paragraph {
            return None;
        }
        node = parent;
    }
}

/// Annotations attached to a paragraph, in document order
///
/// Block-level start anchors directly preceding the paragraph come first.
/// When the paragraph opens a cell that opens its row and table, anchors
/// directly preceding the table belong to it too, outermost first. Start
/// anchors inside the paragraph follow.
fn paragraph_scopes(doc: &Document, paragraph: NodeId) -> Vec<AnnotationId> {
    let mut ids = Vec::new();

    let mut node = paragraph;
    while let (Some(parent), Some(index)) = (doc.parent(node), doc.index_in_parent(node)) {
        let before = &doc.children(parent)[..index];
        let leading: Vec<AnnotationId> = before
            .iter()
            .rev()
            .map_while(|&sibling| match doc.kind(sibling) {
                NodeKind::AnnotationStart(id) => Some(*id),
                _ => None,
            })
            .collect();
        let opens_parent = leading.len() == before.len();
        let mut outer: Vec<AnnotationId> = leading.into_iter().rev().collect();
        outer.append(&mut ids);
        ids = outer;

        let nested = matches!(doc.kind(parent), NodeKind::Cell | NodeKind::Row | NodeKind::Table);
        if !opens_parent || !nested {
            break;
        }
        node = parent;
    }

    for &child in doc.children(paragraph) {
        if let NodeKind::AnnotationStart(id) = doc.kind(child) {
            ids.push(*id);
        }
    }
    ids
}

/// Delete the anchors and payload of a consumed annotation
fn remove_anchors(doc: &mut Document, scope: &Scope) {
    for anchor in [scope.start, scope.end].into_iter().flatten() {
        doc.detach(anchor);
    }
    if let Some(run) = scope.reference {
        let emptied = doc
            .run_mut(run)
            .map(|r| r.remove_annotation_reference(scope.id) && r.content.is_empty())
            .unwrap_or(false);
        if emptied {
            doc.detach(run);
        }
    }
    doc.remove_annotation(scope.id);
}
