//! Arena-backed document tree

use std::collections::BTreeMap;
use std::fmt;

use super::run::Run;

/// Index of a node in its document's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Identifier shared by an annotation's anchors and its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Independently walkable top-level part of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Body,
    Header,
    Footer,
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartKind::Body => write!(f, "body"),
            PartKind::Header => write!(f, "header"),
            PartKind::Footer => write!(f, "footer"),
        }
    }
}

/// Inline container that groups runs inside a paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperKind {
    StructuredContent,
    SimpleField,
    Hyperlink,
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapperKind::StructuredContent => write!(f, "structured-content"),
            WrapperKind::SimpleField => write!(f, "simple-field"),
            WrapperKind::Hyperlink => write!(f, "hyperlink"),
        }
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Part(PartKind),
    Table,
    Row,
    Cell,
    Paragraph,
    Run(Run),
    Wrapper(WrapperKind),
    AnnotationStart(AnnotationId),
    AnnotationEnd(AnnotationId),
}

/// A node: its kind plus navigation links
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Annotation body stored alongside the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub author: Option<String>,
    pub text: String,
}

impl Annotation {
    pub fn new(id: AnnotationId, text: impl Into<String>) -> Self {
        Self {
            id,
            author: None,
            text: text.into(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// A document: node arena, part roots and annotation payloads
///
/// Nodes are never freed; a detached node keeps its id but is no longer
/// reachable from any part root.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    parts: Vec<NodeId>,
    annotations: BTreeMap<AnnotationId, Annotation>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with an empty body part
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            parts: Vec::new(),
            annotations: BTreeMap::new(),
        };
        doc.add_part(PartKind::Body);
        doc
    }

    /// The body part root
    pub fn body(&self) -> NodeId {
        self.parts[0]
    }

    /// Add another part root (header or footer)
    pub fn add_part(&mut self, kind: PartKind) -> NodeId {
        let id = self.alloc(NodeKind::Part(kind), None);
        self.parts.push(id);
        id
    }

    /// All part roots, body first
    pub fn parts(&self) -> &[NodeId] {
        &self.parts
    }

    pub fn part_kind(&self, part: NodeId) -> Option<PartKind> {
        match self.kind(part) {
            NodeKind::Part(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Position of a node in its parent's child list
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn run(&self, id: NodeId) -> Option<&Run> {
        match &self.nodes[id.0].kind {
            NodeKind::Run(run) => Some(run),
            _ => None,
        }
    }

    pub fn run_mut(&mut self, id: NodeId) -> Option<&mut Run> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Run(run) => Some(run),
            _ => None,
        }
    }

    /// Iterate over the ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// True when the node is reachable from one of the part roots
    pub fn is_attached(&self, id: NodeId) -> bool {
        if self.parts.contains(&id) {
            return true;
        }
        match self.ancestors(id).last() {
            Some(root) => self.parts.contains(&root),
            None => false,
        }
    }

    /// The paragraph containing a node, or the node itself if it is one
    pub fn enclosing_paragraph(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| matches!(self.kind(n), NodeKind::Paragraph))
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    /// Insert a new node at `index` in `parent`'s child list
    pub fn insert(&mut self, parent: NodeId, index: usize, kind: NodeKind) -> NodeId {
        let id = self.alloc(kind, Some(parent));
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, id);
        id
    }

    /// Append a new node to `parent`'s child list
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let index = self.children(parent).len();
        self.insert(parent, index, kind)
    }

    /// Insert a new node right before `sibling`; `None` if `sibling` is detached
    pub fn insert_before(&mut self, sibling: NodeId, kind: NodeKind) -> Option<NodeId> {
        let parent = self.parent(sibling)?;
        let index = self.index_in_parent(sibling)?;
        Some(self.insert(parent, index, kind))
    }

    /// Insert a new node right after `sibling`; `None` if `sibling` is detached
    pub fn insert_after(&mut self, sibling: NodeId, kind: NodeKind) -> Option<NodeId> {
        let parent = self.parent(sibling)?;
        let index = self.index_in_parent(sibling)?;
        Some(self.insert(parent, index + 1, kind))
    }

    /// Remove a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        self.nodes[parent.0].children.retain(|&c| c != id);
        self.nodes[id.0].parent = None;
        true
    }

    /// Put a new node in place of `id`, detaching `id`
    pub fn replace_node(&mut self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        let new_id = self.insert_before(id, kind)?;
        self.detach(id);
        Some(new_id)
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn add_paragraph(&mut self, parent: NodeId) -> NodeId {
        self.append(parent, NodeKind::Paragraph)
    }

    /// Add a paragraph holding one unformatted run per fragment
    pub fn add_paragraph_with_runs(&mut self, parent: NodeId, fragments: &[&str]) -> NodeId {
        let paragraph = self.add_paragraph(parent);
        for fragment in fragments {
            self.add_text_run(paragraph, fragment);
        }
        paragraph
    }

    pub fn add_run(&mut self, parent: NodeId, run: Run) -> NodeId {
        self.append(parent, NodeKind::Run(run))
    }

    pub fn add_text_run(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.add_run(parent, Run::new(text))
    }

    pub fn add_table(&mut self, parent: NodeId) -> NodeId {
        self.append(parent, NodeKind::Table)
    }

    pub fn add_row(&mut self, table: NodeId) -> NodeId {
        self.append(table, NodeKind::Row)
    }

    pub fn add_cell(&mut self, row: NodeId) -> NodeId {
        self.append(row, NodeKind::Cell)
    }

    pub fn add_wrapper(&mut self, parent: NodeId, kind: WrapperKind) -> NodeId {
        self.append(parent, NodeKind::Wrapper(kind))
    }

    pub fn add_annotation_start(&mut self, parent: NodeId, id: AnnotationId) -> NodeId {
        self.append(parent, NodeKind::AnnotationStart(id))
    }

    pub fn add_annotation_end(&mut self, parent: NodeId, id: AnnotationId) -> NodeId {
        self.append(parent, NodeKind::AnnotationEnd(id))
    }

    // ------------------------------------------------------------------
    // Annotation payloads
    // ------------------------------------------------------------------

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.insert(annotation.id, annotation);
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.values()
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        self.annotations.remove(&id)
    }

    // ------------------------------------------------------------------
    // Debug views
    // ------------------------------------------------------------------

    /// Indented outline of the subtree under `root`, one node per line
    pub fn outline(&self, root: NodeId) -> String {
        let mut lines = Vec::new();
        self.outline_into(root, 0, &mut lines);
        lines.join("\n")
    }

    fn outline_into(&self, id: NodeId, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        let label = match self.kind(id) {
            NodeKind::Part(kind) => kind.to_string(),
            NodeKind::Table => "table".to_string(),
            NodeKind::Row => "row".to_string(),
            NodeKind::Cell => "cell".to_string(),
            NodeKind::Paragraph => "paragraph".to_string(),
            NodeKind::Run(run) => match &run.format {
                Some(format) => format!("run {:?} ({})", run.text(), format),
                None => format!("run {:?}", run.text()),
            },
            NodeKind::Wrapper(kind) => format!("wrapper {}", kind),
            NodeKind::AnnotationStart(a) => format!("annotation-start {}", a),
            NodeKind::AnnotationEnd(a) => format!("annotation-end {}", a),
        };
        lines.push(format!("{}{}", indent, label));
        for &child in self.children(id) {
            self.outline_into(child, depth + 1, lines);
        }
    }
}
