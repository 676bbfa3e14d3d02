//! Arena tree for the parsed source.
//!
//! Every node lives in [`Tree`] and is addressed by a [`NodeId`]. Nodes know
//! their parent, so handlers can walk upwards ("find the nearest enclosing
//! opening element") and rewrite in place the way a visitor path would.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Byte range of a node in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub lo: usize,
    pub hi: usize,
}

impl Span {
    pub fn new(lo: usize, hi: usize) -> Self {
        Self { lo, hi }
    }

    pub fn range(self) -> Range<usize> {
        self.lo..self.hi
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub source: String,
    pub default: Option<String>,
    pub named: Vec<ImportSpecifier>,
    /// Full statement text, including the trailing newline if any.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program {
        body: Vec<NodeId>,
    },
    /// Opaque JavaScript text.
    Code(String),
    Import(ImportDecl),
    Element {
        opening: NodeId,
        children: Vec<NodeId>,
        /// Closing tag as written, `None` when self-closing.
        closing: Option<String>,
    },
    /// The opening tag of a JSX element. This is the node that owns the attributes.
    OpeningElement {
        name: String,
        attributes: Vec<NodeId>,
        self_closing: bool,
    },
    /// JSX text child.
    Text(String),
    Attribute {
        name: String,
        value: Option<NodeId>,
    },
    SpreadAttribute {
        argument: NodeId,
    },
    /// `{...}` in JSX. `expression` is `None` for `{}`.
    ExprContainer {
        expression: Option<NodeId>,
    },
    Str {
        value: String,
        quote: char,
    },
    Ident(String),
    Array {
        elements: Vec<NodeId>,
    },
    Member {
        object: NodeId,
        property: String,
    },
    Call {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    TaggedTemplate {
        tag: NodeId,
        /// Raw (uncooked) template chunks; always one more than `expressions`.
        quasis: Vec<String>,
        expressions: Vec<NodeId>,
    },
    /// Expression the parser does not model: opaque code interleaved with
    /// any JSX or tagged templates found inside it.
    Fragment {
        parts: Vec<NodeId>,
    },
}

/// Field-less tag of a [`NodeKind`], used for ancestor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Program,
    Code,
    Import,
    Element,
    OpeningElement,
    Text,
    Attribute,
    SpreadAttribute,
    ExprContainer,
    Str,
    Ident,
    Array,
    Member,
    Call,
    TaggedTemplate,
    Fragment,
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Program { .. } => NodeType::Program,
            Self::Code(_) => NodeType::Code,
            Self::Import(_) => NodeType::Import,
            Self::Element { .. } => NodeType::Element,
            Self::OpeningElement { .. } => NodeType::OpeningElement,
            Self::Text(_) => NodeType::Text,
            Self::Attribute { .. } => NodeType::Attribute,
            Self::SpreadAttribute { .. } => NodeType::SpreadAttribute,
            Self::ExprContainer { .. } => NodeType::ExprContainer,
            Self::Str { .. } => NodeType::Str,
            Self::Ident(_) => NodeType::Ident,
            Self::Array { .. } => NodeType::Array,
            Self::Member { .. } => NodeType::Member,
            Self::Call { .. } => NodeType::Call,
            Self::TaggedTemplate { .. } => NodeType::TaggedTemplate,
            Self::Fragment { .. } => NodeType::Fragment,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Program { body } => body.clone(),
            Self::Element {
                opening, children, ..
            } => std::iter::once(*opening).chain(children.iter().copied()).collect(),
            Self::OpeningElement { attributes, .. } => attributes.clone(),
            Self::Attribute { value, .. } => value.iter().copied().collect(),
            Self::SpreadAttribute { argument } => vec![*argument],
            Self::ExprContainer { expression } => expression.iter().copied().collect(),
            Self::Array { elements } => elements.clone(),
            Self::Member { object, .. } => vec![*object],
            Self::Call { callee, arguments } => {
                std::iter::once(*callee).chain(arguments.iter().copied()).collect()
            }
            Self::TaggedTemplate {
                tag, expressions, ..
            } => std::iter::once(*tag).chain(expressions.iter().copied()).collect(),
            Self::Fragment { parts } => parts.clone(),
            Self::Code(_) | Self::Import(_) | Self::Text(_) | Self::Str { .. } | Self::Ident(_) => {
                vec![]
            }
        }
    }

    fn slots_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            Self::Program { body } => body.iter_mut().collect(),
            Self::Element {
                opening, children, ..
            } => std::iter::once(opening).chain(children.iter_mut()).collect(),
            Self::OpeningElement { attributes, .. } => attributes.iter_mut().collect(),
            Self::Attribute { value, .. } => value.iter_mut().collect(),
            Self::SpreadAttribute { argument } => vec![argument],
            Self::ExprContainer { expression } => expression.iter_mut().collect(),
            Self::Array { elements } => elements.iter_mut().collect(),
            Self::Member { object, .. } => vec![object],
            Self::Call { callee, arguments } => {
                std::iter::once(callee).chain(arguments.iter_mut()).collect()
            }
            Self::TaggedTemplate {
                tag, expressions, ..
            } => std::iter::once(tag).chain(expressions.iter_mut()).collect(),
            Self::Fragment { parts } => parts.iter_mut().collect(),
            Self::Code(_) | Self::Import(_) | Self::Text(_) | Self::Str { .. } | Self::Ident(_) => {
                vec![]
            }
        }
    }

    /// The list a child can be removed from or inserted into, if any.
    fn list_containing(&mut self, child: NodeId) -> Option<&mut Vec<NodeId>> {
        let list = match self {
            Self::Program { body } => body,
            Self::Element { children, .. } => children,
            Self::OpeningElement { attributes, .. } => attributes,
            Self::Array { elements } => elements,
            Self::Call { arguments, .. } => arguments,
            Self::Fragment { parts } => parts,
            _ => return None,
        };
        list.contains(&child).then_some(list)
    }

    fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        match self.slots_mut().into_iter().find(|slot| **slot == old) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }

    fn remove_child(&mut self, child: NodeId) -> bool {
        if let Some(list) = self.list_containing(child) {
            list.retain(|id| *id != child);
            return true;
        }
        match self {
            Self::Attribute { value, .. } if *value == Some(child) => {
                *value = None;
                true
            }
            Self::ExprContainer { expression } if *expression == Some(child) => {
                *expression = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub span: Option<Span>,
    dirty: bool,
}

impl Node {
    /// True when the node (or something below it) changed since parsing.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    source: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// An empty tree over `source`. The parser fills the root's body.
    pub fn new(source: &str) -> Self {
        let root = Node {
            kind: NodeKind::Program { body: vec![] },
            parent: None,
            span: Some(Span::new(0, source.len())),
            dirty: false,
        };
        Self {
            source: source.to_string(),
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.kind(id).node_type()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.nodes[id.0].span
    }

    /// Adds a node read from the source. Children are re-parented to it.
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.push_node(kind, Some(span), false)
    }

    /// Adds a node that has no source location (built by a collaborator).
    pub fn alloc_synthetic(&mut self, kind: NodeKind) -> NodeId {
        self.push_node(kind, None, true)
    }

    fn push_node(&mut self, kind: NodeKind, span: Option<Span>, dirty: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        for child in kind.children() {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            parent: None,
            span,
            dirty,
        });
        id
    }

    pub(crate) fn set_body(&mut self, body: Vec<NodeId>) {
        let root = self.root;
        for child in &body {
            self.nodes[child.0].parent = Some(root);
        }
        self.nodes[root.0].kind = NodeKind::Program { body };
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Nearest strict ancestor matching `predicate`.
    pub fn find_ancestor(&self, id: NodeId, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        self.ancestors(id).find(|ancestor| predicate(self.node(*ancestor)))
    }

    pub fn find_ancestor_of_type(&self, id: NodeId, node_type: NodeType) -> Option<NodeId> {
        self.find_ancestor(id, |node| node.kind.node_type() == node_type)
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|ancestor| ancestor == self.root)
    }

    /// All nodes below `id` in document order (pre-order), `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.kind(id).children().into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.kind(next).children().into_iter().rev());
        }
        out
    }

    pub fn attribute_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Attribute { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attribute_value(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Attribute { value, .. } => *value,
            _ => None,
        }
    }

    /// Attribute ids of an opening element (empty for any other node).
    pub fn attributes(&self, opening: NodeId) -> &[NodeId] {
        match self.kind(opening) {
            NodeKind::OpeningElement { attributes, .. } => attributes,
            _ => &[],
        }
    }

    fn mark_dirty(&mut self, id: NodeId) {
        let mut next = Some(id);
        while let Some(current) = next {
            self.nodes[current.0].dirty = true;
            next = self.nodes[current.0].parent;
        }
    }

    /// Puts the node produced by `build` where `old` was. `build` receives
    /// `old` already detached, so it may reuse it inside the replacement.
    pub fn replace_with(&mut self, old: NodeId, build: impl FnOnce(&mut Tree, NodeId) -> NodeId) -> NodeId {
        let parent = self.nodes[old.0].parent.take();
        let new = build(self, old);
        if let Some(parent) = parent {
            self.nodes[parent.0].kind.replace_child(old, new);
            self.nodes[new.0].parent = Some(parent);
            self.mark_dirty(parent);
        }
        new
    }

    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.replace_with(old, |_, _| new);
    }

    /// Like [`Tree::replace`], but the replacement inherits the span of `old`
    /// so mappings and diagnostics keep pointing at the original source.
    pub fn replace_with_location(&mut self, old: NodeId, new: NodeId) {
        self.nodes[new.0].span = self.nodes[old.0].span;
        self.replace(old, new);
        self.nodes[new.0].dirty = true;
    }

    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].kind.remove_child(id);
            self.mark_dirty(parent);
        }
    }

    /// Inserts `new` right after `anchor` in the anchor's parent list.
    /// Returns false when the anchor is not part of a list.
    pub fn insert_after(&mut self, anchor: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.nodes[anchor.0].parent else {
            return false;
        };
        let Some(list) = self.nodes[parent.0].kind.list_containing(anchor) else {
            return false;
        };
        let Some(position) = list.iter().position(|id| *id == anchor) else {
            return false;
        };
        list.insert(position + 1, new);
        self.nodes[new.0].parent = Some(parent);
        self.mark_dirty(parent);
        true
    }

    /// Appends `new` to the list of a container node (attributes, array
    /// elements, arguments, children or body).
    pub fn push_container(&mut self, container: NodeId, new: NodeId) -> bool {
        let list = match &mut self.nodes[container.0].kind {
            NodeKind::Program { body } => body,
            NodeKind::Element { children, .. } => children,
            NodeKind::OpeningElement { attributes, .. } => attributes,
            NodeKind::Array { elements } => elements,
            NodeKind::Call { arguments, .. } => arguments,
            NodeKind::Fragment { parts } => parts,
            _ => return false,
        };
        list.push(new);
        self.nodes[new.0].parent = Some(container);
        self.mark_dirty(container);
        true
    }

    /// 1-based line and column of a byte offset in the original source.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        crate::tokenizer::line_col(&self.source, offset)
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Position of the first attribute called `name` in `attributes`.
///
/// Always called on the live attribute list: handlers never cache which
/// attributes an element had.
pub fn find_attribute_by_name(tree: &Tree, attributes: &[NodeId], name: &str) -> Option<usize> {
    attributes
        .iter()
        .position(|id| tree.attribute_name(*id) == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// `<div a="x" b={y} />` built by hand.
    fn element_tree() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new(r#"<div a="x" b={y} />"#);
        let x = tree.alloc(
            NodeKind::Str {
                value: "x".to_string(),
                quote: '"',
            },
            Span::new(7, 10),
        );
        let a = tree.alloc(
            NodeKind::Attribute {
                name: "a".to_string(),
                value: Some(x),
            },
            Span::new(5, 10),
        );
        let y = tree.alloc(NodeKind::Ident("y".to_string()), Span::new(14, 15));
        let container = tree.alloc(NodeKind::ExprContainer { expression: Some(y) }, Span::new(13, 16));
        let b = tree.alloc(
            NodeKind::Attribute {
                name: "b".to_string(),
                value: Some(container),
            },
            Span::new(11, 16),
        );
        let opening = tree.alloc(
            NodeKind::OpeningElement {
                name: "div".to_string(),
                attributes: vec![a, b],
                self_closing: true,
            },
            Span::new(0, 19),
        );
        let element = tree.alloc(
            NodeKind::Element {
                opening,
                children: vec![],
                closing: None,
            },
            Span::new(0, 19),
        );
        tree.set_body(vec![element]);
        (tree, opening, a, y)
    }

    #[test_log::test]
    fn test_find_ancestor_by_type() {
        let (tree, opening, _, y) = element_tree();
        assert_eq!(tree.find_ancestor_of_type(y, NodeType::OpeningElement), Some(opening));
        assert_eq!(tree.node_type(tree.find_ancestor_of_type(y, NodeType::Attribute).unwrap()), NodeType::Attribute);
        assert_eq!(tree.find_ancestor_of_type(y, NodeType::TaggedTemplate), None);
    }

    #[test_log::test]
    fn test_find_ancestor_is_strict() {
        let (tree, opening, _, _) = element_tree();
        assert_eq!(tree.find_ancestor_of_type(opening, NodeType::OpeningElement), None);
    }

    #[test_log::test]
    fn test_find_attribute_by_name() {
        let (tree, opening, _, _) = element_tree();
        let attributes = tree.attributes(opening);
        assert_eq!(find_attribute_by_name(&tree, attributes, "b"), Some(1));
        assert_eq!(find_attribute_by_name(&tree, attributes, "css"), None);
    }

    #[test_log::test]
    fn test_remove_detaches_and_marks_dirty() {
        let (mut tree, opening, a, _) = element_tree();
        tree.remove(a);
        assert!(!tree.is_attached(a));
        assert_eq!(tree.attributes(opening).len(), 1);
        assert!(tree.node(opening).is_dirty());
        assert!(tree.node(tree.root()).is_dirty());
    }

    #[test_log::test]
    fn test_replace_with_location_keeps_span() {
        let (mut tree, _, _, y) = element_tree();
        let z = tree.alloc_synthetic(NodeKind::Ident("z".to_string()));
        tree.replace_with_location(y, z);
        assert_eq!(tree.span(z), Some(Span::new(14, 15)));
        assert!(tree.is_attached(z));
        assert!(!tree.is_attached(y));
    }

    #[test_log::test]
    fn test_replace_with_reuses_old_node() {
        let (mut tree, _, _, y) = element_tree();
        let array = tree.replace_with(y, |tree, old| {
            tree.alloc_synthetic(NodeKind::Array { elements: vec![old] })
        });
        assert_eq!(tree.parent(y), Some(array));
        assert!(tree.is_attached(y));
        assert_eq!(tree.node_type(tree.parent(array).unwrap()), NodeType::ExprContainer);
    }

    #[test_log::test]
    fn test_insert_after() {
        let (mut tree, opening, a, _) = element_tree();
        let extra = tree.alloc_synthetic(NodeKind::Attribute {
            name: "extra".to_string(),
            value: None,
        });
        assert!(tree.insert_after(a, extra));
        assert_eq!(tree.attributes(opening)[1], extra);
        assert_eq!(tree.parent(extra), Some(opening));
    }

    #[test_log::test]
    fn test_descendants_in_document_order() {
        let (tree, opening, a, y) = element_tree();
        let descendants = tree.descendants(tree.root());
        let position = |id| descendants.iter().position(|d| *d == id).unwrap();
        assert!(position(opening) < position(a));
        assert!(position(a) < position(y));
    }
}
