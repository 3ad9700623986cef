//! End-to-end stamping tests with small processors

use std::cell::RefCell;
use std::rc::Rc;

use docstamp::document::{Document, PartKind};
use docstamp::processor::{Failure, FailureOutcome};
use docstamp::scope::OrphanKind;
use docstamp::{
    stamp, stamp_with_config, Annotation, AnnotationId, Engine, EvaluationError,
    FailureResolver, NodeId, Operation, Processor, ProcessorContext, RegistryError, StampConfig,
    StampError, Value,
};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// `display_paragraph_if(bool)`: drops the paragraph when false
#[derive(Default)]
struct ParagraphDisplay {
    hidden: Vec<NodeId>,
}

impl Processor for ParagraphDisplay {
    fn operations(&self) -> Vec<Operation> {
        vec![Operation::new("display_paragraph_if", 1)]
    }

    fn invoke(
        &mut self,
        operation: &str,
        args: &[Value],
        context: &ProcessorContext<'_>,
        _doc: &Document,
    ) -> Result<Value, EvaluationError> {
        match args[0].as_bool() {
            Some(true) => {}
            Some(false) => self.hidden.push(context.paragraph),
            None => {
                return Err(EvaluationError::processor(
                    operation,
                    format!("expected bool, got {}", args[0].kind()),
                ))
            }
        }
        Ok(Value::Null)
    }

    fn commit(&mut self, doc: &mut Document) -> Result<(), StampError> {
        for paragraph in self.hidden.drain(..) {
            doc.detach(paragraph);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.hidden.clear();
    }
}

/// `replace_word_with(text)`: rewrites the run an annotation encloses
#[derive(Default)]
struct WordReplacer {
    pending: Vec<(NodeId, String)>,
}

impl Processor for WordReplacer {
    fn operations(&self) -> Vec<Operation> {
        vec![Operation::new("replace_word_with", 1).annotation_only()]
    }

    fn invoke(
        &mut self,
        operation: &str,
        args: &[Value],
        context: &ProcessorContext<'_>,
        _doc: &Document,
    ) -> Result<Value, EvaluationError> {
        let run = context
            .run
            .ok_or_else(|| EvaluationError::processor(operation, "not attached to a run"))?;
        self.pending.push((run, args[0].to_string()));
        Ok(Value::Null)
    }

    fn commit(&mut self, doc: &mut Document) -> Result<(), StampError> {
        for (run, text) in self.pending.drain(..) {
            if let Some(run) = doc.run_mut(run) {
                run.set_text(&text);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Leaves every failure in place and remembers the placeholder text
#[derive(Default, Clone)]
struct RecordingResolver {
    seen: Rc<RefCell<Vec<String>>>,
}

impl FailureResolver for RecordingResolver {
    fn resolve(&mut self, failure: &Failure<'_>) -> FailureOutcome {
        self.seen
            .borrow_mut()
            .push(failure.placeholder.expression().to_string());
        FailureOutcome::Leave
    }
}

fn engine() -> Engine {
    Engine::default()
        .with_processor(ParagraphDisplay::default())
        .and_then(|e| e.with_processor(WordReplacer::default()))
        .expect("Processors should register")
}

const DATA: &str = r#"
title = "Dr"
name = "Ada"
show_secret = false

[order]
total = 42.5
"#;

#[test]
fn test_full_document() {
    init_tracing();
    let mut doc = Document::new();
    let body = doc.body();

    // run-scoped: the annotation encloses only "Mr"
    let greeting = doc.add_paragraph(body);
    doc.add_text_run(greeting, "Dear ");
    doc.add_annotation_start(greeting, AnnotationId(1));
    doc.add_run(greeting, docstamp::Run::new("Mr").with_format("bold"));
    doc.add_annotation_end(greeting, AnnotationId(1));
    doc.add_text_run(greeting, " ${na");
    doc.add_text_run(greeting, "me},");
    doc.add_annotation(Annotation::new(AnnotationId(1), "replace_word_with(title)"));

    // paragraph removed by its annotation
    let secret = doc.add_paragraph(body);
    doc.add_annotation_start(secret, AnnotationId(2));
    doc.add_text_run(secret, "Secret: ${code}");
    doc.add_annotation_end(secret, AnnotationId(2));
    doc.add_annotation(Annotation::new(AnnotationId(2), "display_paragraph_if(show_secret)"));

    // inline call erased, value resolved through a member path
    doc.add_paragraph_with_runs(body, &["Total: ${order.total} #{display_paragraph_if(true)}"]);

    let data = Value::from_toml_str(DATA).unwrap();
    let report = engine().stamp(&mut doc, &data).unwrap();

    assert_eq!(report.scopes_consumed, 2);
    assert_eq!(report.inline_calls_consumed, 1);
    assert_eq!(report.placeholders_resolved, 2);
    assert_eq!(report.failures_tolerated, 0);
    assert!(report.warnings.is_empty());
    assert!(!doc.is_attached(secret));
    assert!(doc.annotations().next().is_none());

    insta::assert_snapshot!(doc.outline(body), @r#"
    body
      paragraph
        run "Dear "
        run "Dr" (bold)
        run " "
        run "Ada"
        run ","
      paragraph
        run "Total: "
        run "42.5"
        run " "
        run ""
    "#);
}

#[test]
fn test_failed_inline_call_is_left_untouched() {
    init_tracing();
    let mut doc = Document::new();
    let body = doc.body();
    doc.add_paragraph_with_runs(body, &["Before #{fo", "o()} after"]);
    let before = doc.outline(body);

    let resolver = RecordingResolver::default();
    let seen = resolver.seen.clone();
    let mut engine = engine().with_failure_resolver(resolver);
    let report = engine.stamp(&mut doc, &Value::Null).unwrap();

    assert_eq!(doc.outline(body), before);
    assert_eq!(*seen.borrow(), vec!["#{foo()}".to_string()]);
    assert_eq!(report.failures_tolerated, 1);
    assert_eq!(report.inline_calls_consumed, 0);
}

#[test]
fn test_annotation_only_operation_is_unknown_inline() {
    let mut doc = Document::new();
    let body = doc.body();
    doc.add_paragraph_with_runs(body, &["#{replace_word_with('x')}"]);

    let resolver = RecordingResolver::default();
    let seen = resolver.seen.clone();
    let report = engine()
        .with_failure_resolver(resolver)
        .stamp(&mut doc, &Value::Null)
        .unwrap();

    assert_eq!(report.failures_tolerated, 1);
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(doc.text(body), "#{replace_word_with('x')}");
}

#[test]
fn test_processor_error_raises_with_throw_policy() {
    let mut doc = Document::new();
    let body = doc.body();
    doc.add_paragraph_with_runs(body, &["#{display_paragraph_if('yes')}"]);

    let err = engine().stamp(&mut doc, &Value::Null).unwrap_err();
    match err {
        StampError::Evaluation(EvaluationError::Processor { operation, message }) => {
            assert_eq!(operation, "display_paragraph_if");
            assert_eq!(message, "expected bool, got string");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_block_level_annotation_hides_following_paragraph() {
    let mut doc = Document::new();
    let body = doc.body();
    let kept = doc.add_paragraph_with_runs(body, &["kept"]);
    doc.add_annotation_start(body, AnnotationId(7));
    let hidden = doc.add_paragraph_with_runs(body, &["hidden"]);
    doc.add_annotation_end(body, AnnotationId(7));
    doc.add_annotation(Annotation::new(AnnotationId(7), "display_paragraph_if(false)"));

    let report = engine().stamp(&mut doc, &Value::Null).unwrap();

    assert_eq!(report.scopes_consumed, 1);
    assert!(doc.is_attached(kept));
    assert!(!doc.is_attached(hidden));
    assert_eq!(doc.children(body), &[kept]);
}

#[test]
fn test_headers_and_footers() {
    let mut doc = Document::new();
    let body = doc.body();
    let header = doc.add_part(PartKind::Header);
    let footer = doc.add_part(PartKind::Footer);
    doc.add_paragraph_with_runs(body, &["${name} body"]);
    doc.add_paragraph_with_runs(header, &["${name} header"]);
    doc.add_paragraph_with_runs(footer, &["${name} footer"]);

    let data = Value::map([("name", "Ada")]);
    let config = StampConfig::new().with_footers(false);
    let report = stamp_with_config(&mut doc, &data, config).unwrap();

    assert_eq!(report.placeholders_resolved, 2);
    assert_eq!(doc.text(body), "Ada body");
    assert_eq!(doc.text(header), "Ada header");
    assert_eq!(doc.text(footer), "${name} footer");
}

#[test]
fn test_toml_configuration() {
    let config = StampConfig::from_str(
        r#"
[delimiters]
value = { prefix = "{{", suffix = "}}" }

[evaluation]
on_failure = "leave"
null_replacement = "(none)"
"#,
    )
    .unwrap();

    let mut doc = Document::new();
    let body = doc.body();
    doc.add_paragraph_with_runs(body, &["Hi {{ name }}, {{ nickname }} {{ unknown }} ${name}"]);

    let data = Value::from_toml_str("name = \"Ada\"").unwrap();
    let data = match data {
        Value::Map(mut map) => {
            map.insert("nickname".to_string(), Value::Null);
            Value::Map(map)
        }
        other => other,
    };

    let report = stamp_with_config(&mut doc, &data, config).unwrap();
    assert_eq!(doc.text(body), "Hi Ada, (none) {{ unknown }} ${name}");
    assert_eq!(report.placeholders_resolved, 2);
    assert_eq!(report.failures_tolerated, 1);
}

#[test]
fn test_orphans_are_reported_not_fatal() {
    init_tracing();
    let mut doc = Document::new();
    let body = doc.body();
    let p = doc.add_paragraph_with_runs(body, &["${name}"]);
    doc.add_annotation_start(p, AnnotationId(3));
    doc.add_annotation_end(p, AnnotationId(3));
    doc.add_annotation(Annotation::new(AnnotationId(9), "display_paragraph_if(false)"));

    let report = engine()
        .stamp(&mut doc, &Value::map([("name", "Ada")]))
        .unwrap();

    let kinds: Vec<(AnnotationId, OrphanKind)> =
        report.warnings.iter().map(|w| (w.id, w.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (AnnotationId(9), OrphanKind::PayloadWithoutAnchors),
            (AnnotationId(3), OrphanKind::MissingPayload),
        ]
    );
    assert_eq!(doc.text(body), "Ada");
    assert!(doc.is_attached(p));
}

#[test]
fn test_duplicate_processor_registration() {
    let result = Engine::default()
        .with_processor(ParagraphDisplay::default())
        .and_then(|e| e.with_processor(ParagraphDisplay::default()));
    match result {
        Err(RegistryError::Duplicate { name, arity }) => {
            assert_eq!(name, "display_paragraph_if");
            assert_eq!(arity, 1);
        }
        Ok(_) => panic!("duplicate registration should fail"),
    }
}

#[test]
fn test_engine_is_reusable_across_documents() {
    let mut engine = engine();
    let data = Value::map([("name", "Ada")]);
    for _ in 0..2 {
        let mut doc = Document::new();
        let body = doc.body();
        doc.add_paragraph_with_runs(body, &["${name} #{display_paragraph_if(true)}"]);
        let report = engine.stamp(&mut doc, &data).unwrap();
        assert_eq!(report.inline_calls_consumed, 1);
        assert_eq!(doc.text(body), "Ada ");
    }
}

#[test]
fn test_convenience_stamp_without_processors() {
    let mut doc = Document::new();
    let body = doc.body();
    doc.add_paragraph_with_runs(body, &["a ${x}", " b ${y}"]);
    let data = Value::map([("x", Value::from(1i64)), ("y", Value::from(true))]);
    stamp(&mut doc, &data).unwrap();
    assert_eq!(doc.text(body), "a 1 b true");
}
