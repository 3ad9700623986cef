//! Runs: formatted leaf fragments of paragraph text

use std::fmt;
use std::ops::Range;

use super::node::AnnotationId;

/// Opaque formatting token carried by a run
///
/// The engine never interprets it; it is copied verbatim when a run is split
/// or when a replacement inherits the formatting of the run it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunFormat(pub String);

impl RunFormat {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of explicit break inside a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Line,
    Page,
    Column,
}

/// A single inline item of run content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunContent {
    Text(String),
    Tab,
    Break(BreakKind),
    CarriageReturn,
    NoBreakHyphen,
    SoftHyphen,
    Drawing,
    Bookmark,
    FieldRef,
    /// Reference anchor of an annotation (zero-width)
    AnnotationReference(AnnotationId),
}

impl RunContent {
    /// Text this item contributes to the paragraph's logical string
    pub fn rendered(&self) -> &str {
        match self {
            RunContent::Text(text) => text,
            RunContent::Tab => "\t",
            RunContent::Break(_) | RunContent::CarriageReturn => "\n",
            RunContent::NoBreakHyphen => "-",
            RunContent::SoftHyphen
            | RunContent::Drawing
            | RunContent::Bookmark
            | RunContent::FieldRef
            | RunContent::AnnotationReference(_) => "",
        }
    }
}

/// A leaf fragment of paragraph text with its formatting token
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Run {
    pub format: Option<RunFormat>,
    pub content: Vec<RunContent>,
}

impl Run {
    /// Create an unformatted run holding `text`
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![RunContent::Text(text)]
        };
        Self {
            format: None,
            content,
        }
    }

    /// Create a run with no content
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set the formatting token
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(RunFormat::new(format));
        self
    }

    /// Append an inline item
    pub fn with_content(mut self, item: RunContent) -> Self {
        self.content.push(item);
        self
    }

    /// Rendered text of the run
    pub fn text(&self) -> String {
        self.content.iter().map(RunContent::rendered).collect()
    }

    /// Length in bytes of the rendered text
    pub fn len(&self) -> usize {
        self.content.iter().map(|c| c.rendered().len()).sum()
    }

    /// True when the run renders no text (it may still hold zero-width items)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the rendered content with `text`, keeping annotation references
    pub fn set_text(&mut self, text: &str) {
        let references: Vec<RunContent> = self
            .content
            .drain(..)
            .filter(|c| matches!(c, RunContent::AnnotationReference(_)))
            .collect();
        if !text.is_empty() {
            self.content.push(RunContent::Text(text.to_string()));
        }
        self.content.extend(references);
    }

    /// Split the run around `range`, dropping the rendered text inside it
    ///
    /// Both halves keep the run's format. Zero-width items positioned before
    /// the end of the range stay with the prefix; those at or after it go to
    /// the suffix. Other items inside the range are dropped with the text.
    pub fn split_around(&self, range: Range<usize>) -> (Run, Run) {
        let mut prefix = Vec::new();
        let mut suffix = Vec::new();
        let mut pos = 0;

        for item in &self.content {
            let len = item.rendered().len();
            match item {
                RunContent::Text(text) => {
                    let head = range.start.clamp(pos, pos + len);
                    let tail = range.end.clamp(pos, pos + len);
                    if head > pos {
                        prefix.push(RunContent::Text(text[..head - pos].to_string()));
                    }
                    if tail < pos + len {
                        suffix.push(RunContent::Text(text[tail - pos..].to_string()));
                    }
                }
                _ if len == 0 => {
                    if pos < range.end {
                        prefix.push(item.clone());
                    } else {
                        suffix.push(item.clone());
                    }
                }
                _ if pos + len <= range.start => prefix.push(item.clone()),
                _ if range.end <= pos => suffix.push(item.clone()),
                _ => {}
            }
            pos += len;
        }

        (
            Run {
                format: self.format.clone(),
                content: prefix,
            },
            Run {
                format: self.format.clone(),
                content: suffix,
            },
        )
    }

    /// Remove the rendered text in `range`; zero-width items are kept
    pub fn remove_range(&mut self, range: Range<usize>) {
        let mut pos = 0;
        let mut kept = Vec::with_capacity(self.content.len());

        for item in std::mem::take(&mut self.content) {
            let len = item.rendered().len();
            match item {
                RunContent::Text(text) => {
                    let start = range.start.clamp(pos, pos + len);
                    let end = range.end.clamp(pos, pos + len);
                    if start < end {
                        let mut rest = String::with_capacity(len - (end - start));
                        rest.push_str(&text[..start - pos]);
                        rest.push_str(&text[end - pos..]);
                        if !rest.is_empty() {
                            kept.push(RunContent::Text(rest));
                        }
                    } else if !text.is_empty() {
                        kept.push(RunContent::Text(text));
                    }
                }
                _ if len > 0 && range.start <= pos && pos + len <= range.end => {}
                other => kept.push(other),
            }
            pos += len;
        }

        self.content = kept;
    }

    /// Ids of annotation references carried by this run
    pub fn annotation_references(&self) -> impl Iterator<Item = AnnotationId> + '_ {
        self.content.iter().filter_map(|c| match c {
            RunContent::AnnotationReference(id) => Some(*id),
            _ => None,
        })
    }

    /// Remove the reference anchor of annotation `id`; returns whether one was found
    pub fn remove_annotation_reference(&mut self, id: AnnotationId) -> bool {
        let before = self.content.len();
        self.content
            .retain(|c| !matches!(c, RunContent::AnnotationReference(r) if *r == id));
        self.content.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mixed_run() -> Run {
        Run::new("ab")
            .with_format("bold")
            .with_content(RunContent::Tab)
            .with_content(RunContent::Text("cd".to_string()))
            .with_content(RunContent::Drawing)
    }

    #[test]
    fn test_rendering_mapping() {
        let run = Run::empty()
            .with_content(RunContent::Text("a".into()))
            .with_content(RunContent::Tab)
            .with_content(RunContent::Break(BreakKind::Page))
            .with_content(RunContent::CarriageReturn)
            .with_content(RunContent::NoBreakHyphen)
            .with_content(RunContent::SoftHyphen)
            .with_content(RunContent::Drawing)
            .with_content(RunContent::Bookmark)
            .with_content(RunContent::FieldRef)
            .with_content(RunContent::AnnotationReference(AnnotationId(1)));
        assert_eq!(run.text(), "a\t\n\n-");
        assert_eq!(run.len(), 5);
    }

    #[test]
    fn test_split_around_keeps_format_on_both_halves() {
        let run = mixed_run();
        let (prefix, suffix) = run.split_around(1..4);
        assert_eq!(prefix.text(), "a");
        assert_eq!(suffix.text(), "d");
        assert_eq!(prefix.format, Some(RunFormat::new("bold")));
        assert_eq!(suffix.format, Some(RunFormat::new("bold")));
        assert!(suffix.content.contains(&RunContent::Drawing));
    }

    #[test]
    fn test_split_around_keeps_item_at_range_start_in_prefix() {
        let run = Run::new("a")
            .with_content(RunContent::Drawing)
            .with_content(RunContent::Text("${x} b".into()));
        let (prefix, suffix) = run.split_around(1..5);
        assert_eq!(
            prefix.content,
            vec![RunContent::Text("a".into()), RunContent::Drawing]
        );
        assert_eq!(suffix.content, vec![RunContent::Text(" b".into())]);
    }

    #[test]
    fn test_split_around_keeps_zero_width_items_inside_range() {
        let run = Run::new("a${")
            .with_content(RunContent::Bookmark)
            .with_content(RunContent::Text("x}b".into()));
        let (prefix, suffix) = run.split_around(1..5);
        assert!(prefix.content.contains(&RunContent::Bookmark));
        assert!(!suffix.content.contains(&RunContent::Bookmark));
        assert_eq!((prefix.text(), suffix.text()), ("a".to_string(), "b".to_string()));
    }

    #[test]
    fn test_remove_range_across_items() {
        let mut run = mixed_run();
        run.remove_range(1..4);
        assert_eq!(run.text(), "ad");
        assert!(run.content.contains(&RunContent::Drawing));
    }

    #[test]
    fn test_remove_whole_text_leaves_empty_run() {
        let mut run = Run::new("hello");
        run.remove_range(0..5);
        assert!(run.is_empty());
        assert!(run.content.is_empty());
    }

    #[test]
    fn test_set_text_keeps_references() {
        let mut run = Run::new("old").with_content(RunContent::AnnotationReference(AnnotationId(3)));
        run.set_text("new");
        assert_eq!(run.text(), "new");
        assert_eq!(run.annotation_references().collect::<Vec<_>>(), vec![AnnotationId(3)]);
    }

    #[test]
    fn test_remove_annotation_reference() {
        let mut run = Run::empty().with_content(RunContent::AnnotationReference(AnnotationId(3)));
        assert!(run.remove_annotation_reference(AnnotationId(3)));
        assert!(!run.remove_annotation_reference(AnnotationId(3)));
        assert!(run.content.is_empty());
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let run = Run::new("héllo");
        // 'é' is two bytes
        assert_eq!(run.len(), 6);
        let (prefix, suffix) = run.split_around(1..3);
        assert_eq!((prefix.text(), suffix.text()), ("h".to_string(), "llo".to_string()));
    }
}
