//! Owned XML document tree.
//!
//! Nodes live in an arena addressed by [`NodeId`]. Cloning a document yields an
//! independent snapshot with identical node ids, so a node located in one copy
//! can be detached from another without searching again.

pub mod escape;
mod parser;
pub use parser::MAX_DEPTH;
mod writer;

use std::collections::BTreeMap;
use std::fmt;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("Invalid attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid escape sequence: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document is not well-formed: {0}")]
    Structure(String),
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Utf8(err.utf8_error())
    }
}

/// Index of a node inside an [`XmlDocument`].
///
/// An id belongs to the document that produced it and to clones of that
/// document. Lookups with an id from an unrelated document return `None` or
/// nothing, except [`XmlDocument::kind`], which panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A possibly prefixed XML name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(prefix: Option<&str>, local: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_owned),
            local: local.to_owned(),
        }
    }

    /// Split a raw `prefix:local` name.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self::new(Some(prefix), local),
            None => Self::new(None, raw),
        }
    }

    /// The prefix, or the empty string for unprefixed names.
    pub fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    /// Normalized and unescaped value.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    /// Namespace declarations made on this element as `(prefix, uri)`, the
    /// default namespace using the empty prefix. An empty uri undeclares.
    pub namespaces: Vec<(String, String)>,
    /// Regular attributes in source order.
    pub attributes: Vec<Attribute>,
}

impl Element {
    /// Value of the unprefixed attribute `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.prefix.is_none() && attr.name.local == name)
            .map(|attr| attr.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Declaration(Declaration),
    DocType(String),
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<Node>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// Create a document holding only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    /// Parse UTF-8 XML, keeping all whitespace.
    pub fn parse(input: impl AsRef<[u8]>) -> Result<Self> {
        parser::parse(input.as_ref())
    }

    /// Serialize the tree back into XML bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::write(self)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .find(|&id| self.element(id).is_some())
    }

    /// # Panics
    ///
    /// If `id` does not belong to this document.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
    }

    /// All nodes below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).rev().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).rev());
        }
        result
    }

    /// Concatenated character data of the direct children of `id`.
    pub fn text(&self, id: NodeId) -> String {
        self.children(id)
            .filter_map(|child| match self.kind(child) {
                NodeKind::Text(text) | NodeKind::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Resolve `prefix` against the declarations in scope at `id`.
    pub fn lookup_namespace(&self, id: NodeId, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(element) = self.element(node) {
                if let Some((_, uri)) = element.namespaces.iter().find(|(p, _)| p == prefix) {
                    return (!uri.is_empty()).then_some(uri.as_str());
                }
            }
            current = self.parent(node);
        }
        None
    }

    /// Namespace URI of the element `id`.
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        let element = self.element(id)?;
        self.lookup_namespace(id, element.name.prefix_str())
    }

    /// Every prefix binding visible at `id`, the default namespace keyed by "".
    pub fn in_scope_namespaces(&self, id: NodeId) -> BTreeMap<String, String> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(element) = self.element(node) {
                chain.push(element);
            }
            current = self.parent(node);
        }

        let mut scope = BTreeMap::new();
        for element in chain.into_iter().rev() {
            for (prefix, uri) in &element.namespaces {
                if uri.is_empty() {
                    scope.remove(prefix);
                } else {
                    scope.insert(prefix.clone(), uri.clone());
                }
            }
        }
        scope
    }

    /// Whether `id` is an element with the given namespace and local name.
    pub fn is_element(&self, id: NodeId, namespace: &str, local_name: &str) -> bool {
        self.element(id).is_some_and(|element| {
            element.name.local == local_name && self.namespace_uri(id).unwrap_or_default() == namespace
        })
    }

    /// All elements of the document matching namespace and local name.
    pub fn find_elements(&self, namespace: &str, local_name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_element(id, namespace, local_name))
            .collect()
    }

    /// Direct child elements of `parent` matching namespace and local name.
    pub fn child_elements(&self, parent: NodeId, namespace: &str, local_name: &str) -> Vec<NodeId> {
        self.children(parent)
            .filter(|&id| self.is_element(id, namespace, local_name))
            .collect()
    }

    pub fn first_child_element(
        &self,
        parent: NodeId,
        namespace: &str,
        local_name: &str,
    ) -> Option<NodeId> {
        self.children(parent)
            .find(|&id| self.is_element(id, namespace, local_name))
    }

    /// Unlink `id` from its parent. The subtree stays in the arena but is no
    /// longer reachable from the document node.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id.0).and_then(|node| node.parent.take()) else {
            return;
        };
        self.nodes[parent.0].children.retain(|&child| child != id);
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Deep-copy the subtree rooted at `source_id` of `source` into this
    /// arena. The copy is returned detached.
    pub fn import(&mut self, source: &XmlDocument, source_id: NodeId) -> NodeId {
        let id = self.push(None, source.kind(source_id).clone());
        let mut pending = vec![(source_id, id)];
        while let Some((from, to)) = pending.pop() {
            for child in source.children(from) {
                let copied = self.push(Some(to), source.kind(child).clone());
                pending.push((child, copied));
            }
        }
        id
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        let text = self.push(None, NodeKind::Text(text.into()));
        self.append_child(id, text);
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }
}
