//! Exclusive XML Canonicalization 1.0, without comments.
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//!
//! Only namespace declarations that are visibly utilized are rendered. A
//! prefix is visibly utilized on an element when it is the prefix of the
//! element name, of one of its attributes, or listed in the
//! InclusiveNamespaces PrefixList (`#default` naming the default namespace).
//! A declaration is skipped when the nearest rendered ancestor already output
//! the same binding.

use std::collections::BTreeMap;

use crate::xml::escape::{escape_attribute, escape_text};
use crate::xml::{Attribute, Element, NodeId, NodeKind, QName, XML_NAMESPACE, XmlDocument};

/// Canonicalize the subtree rooted at `node`.
///
/// Passing the document node canonicalizes the whole document. For any other
/// node the namespaces in scope at its parent form the binding context. Nodes
/// detached from `doc` are simply not visited, which is how callers omit
/// content (the enveloped-signature transform detaches the signature).
pub fn canonicalize(doc: &XmlDocument, node: NodeId, inclusive_prefixes: Option<&[&str]>) -> Vec<u8> {
    let inclusive = inclusive_prefixes
        .unwrap_or_default()
        .iter()
        .map(|p| if *p == "#default" { String::new() } else { (*p).to_owned() })
        .collect();

    let mut canonicalizer = Canonicalizer {
        doc,
        inclusive,
        scope: BTreeMap::new(),
        rendered: BTreeMap::new(),
        undo: Vec::new(),
        output: Vec::new(),
    };

    if matches!(doc.kind(node), NodeKind::Document) {
        canonicalizer.document(node);
    } else {
        if let Some(parent) = doc.parent(node) {
            canonicalizer.enter_scope_of(parent);
        }
        canonicalizer.subtree(node);
    }
    canonicalizer.output
}

/// A binding change to revert when an element is closed.
enum Undo<'a> {
    Scope(&'a str, Option<&'a str>),
    Rendered(&'a str, Option<&'a str>),
}

enum Frame {
    Open(NodeId),
    Close { id: NodeId, mark: usize },
}

struct Canonicalizer<'a> {
    doc: &'a XmlDocument,
    inclusive: Vec<String>,
    /// Bindings in scope at the current element.
    scope: BTreeMap<&'a str, &'a str>,
    /// Bindings rendered by the output ancestors of the current element.
    rendered: BTreeMap<&'a str, &'a str>,
    undo: Vec<Undo<'a>>,
    output: Vec<u8>,
}

impl<'a> Canonicalizer<'a> {
    fn document(&mut self, id: NodeId) {
        let doc = self.doc;
        let mut after_element = false;
        for child in doc.children(id) {
            match doc.kind(child) {
                NodeKind::Element(_) => {
                    self.subtree(child);
                    after_element = true;
                }
                NodeKind::ProcessingInstruction { target, data } => {
                    if after_element {
                        self.output.push(b'\n');
                    }
                    self.processing_instruction(target, data);
                    if !after_element {
                        self.output.push(b'\n');
                    }
                }
                // Comments are dropped; prolog whitespace, the XML declaration
                // and the doctype are not part of the data model.
                _ => {}
            }
        }
    }

    /// Load the bindings visible at `id` into the scope without rendering them.
    fn enter_scope_of(&mut self, id: NodeId) {
        let doc = self.doc;
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(element) = doc.element(node) {
                chain.push(element);
            }
            current = doc.parent(node);
        }
        for element in chain.into_iter().rev() {
            self.declare(element);
        }
    }

    fn subtree(&mut self, start: NodeId) {
        let doc = self.doc;
        let mut stack = vec![Frame::Open(start)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Open(id) => match doc.kind(id) {
                    NodeKind::Element(element) => {
                        let mark = self.undo.len();
                        self.start_tag(element);
                        stack.push(Frame::Close { id, mark });
                        stack.extend(doc.children(id).rev().map(Frame::Open));
                    }
                    NodeKind::Text(text) | NodeKind::CData(text) => {
                        self.output.extend_from_slice(escape_text(text).as_bytes());
                    }
                    NodeKind::ProcessingInstruction { target, data } => {
                        self.processing_instruction(target, data);
                    }
                    _ => {}
                },
                Frame::Close { id, mark } => {
                    if let Some(element) = doc.element(id) {
                        self.output.extend_from_slice(b"</");
                        self.qname(&element.name);
                        self.output.push(b'>');
                    }
                    self.restore(mark);
                }
            }
        }
    }

    /// Apply the namespace declarations made on `element` to the scope.
    fn declare(&mut self, element: &'a Element) {
        for (prefix, uri) in &element.namespaces {
            let previous = if uri.is_empty() {
                self.scope.remove(prefix.as_str())
            } else {
                self.scope.insert(prefix.as_str(), uri.as_str())
            };
            self.undo.push(Undo::Scope(prefix.as_str(), previous));
        }
    }

    fn restore(&mut self, mark: usize) {
        while self.undo.len() > mark {
            let (map, key, previous) = match self.undo.pop() {
                Some(Undo::Scope(key, previous)) => (&mut self.scope, key, previous),
                Some(Undo::Rendered(key, previous)) => (&mut self.rendered, key, previous),
                None => return,
            };
            match previous {
                Some(value) => map.insert(key, value),
                None => map.remove(key),
            };
        }
    }

    fn start_tag(&mut self, element: &'a Element) {
        self.declare(element);

        let mut utilized: Vec<&str> = Vec::with_capacity(1 + element.attributes.len());
        utilized.push(element.name.prefix_str());
        utilized.extend(element.attributes.iter().filter_map(|a| a.name.prefix.as_deref()));
        utilized.extend(self.inclusive.iter().map(String::as_str));
        utilized.retain(|p| *p != "xml");
        // Sorting by prefix puts the default namespace ("") first.
        utilized.sort_unstable();
        utilized.dedup();

        let mut declarations: Vec<(&'a str, &'a str)> = Vec::new();
        for prefix in utilized {
            match self.scope.get_key_value(prefix) {
                Some((&key, &uri)) => {
                    if self.rendered.get(prefix) != Some(&uri) {
                        declarations.push((key, uri));
                    }
                }
                None if prefix.is_empty() => {
                    if self.rendered.get("").is_some_and(|uri| !uri.is_empty()) {
                        declarations.push(("", ""));
                    }
                }
                None => {}
            }
        }

        let mut attributes: Vec<(&str, &Attribute)> = element
            .attributes
            .iter()
            .map(|attr| {
                let namespace = match attr.name.prefix.as_deref() {
                    None => "",
                    Some("xml") => XML_NAMESPACE,
                    Some(prefix) => self.scope.get(prefix).copied().unwrap_or_default(),
                };
                (namespace, attr)
            })
            .collect();
        attributes.sort_by(|a, b| (a.0, &a.1.name.local).cmp(&(b.0, &b.1.name.local)));

        self.output.push(b'<');
        self.qname(&element.name);
        for &(prefix, uri) in &declarations {
            if prefix.is_empty() {
                self.output.extend_from_slice(b" xmlns=\"");
            } else {
                self.output.extend_from_slice(b" xmlns:");
                self.output.extend_from_slice(prefix.as_bytes());
                self.output.extend_from_slice(b"=\"");
            }
            self.output.extend_from_slice(escape_attribute(uri).as_bytes());
            self.output.push(b'"');
        }
        for (_, attr) in attributes {
            self.output.push(b' ');
            self.qname(&attr.name);
            self.output.extend_from_slice(b"=\"");
            self.output.extend_from_slice(escape_attribute(&attr.value).as_bytes());
            self.output.push(b'"');
        }
        self.output.push(b'>');

        for (prefix, uri) in declarations {
            let previous = self.rendered.insert(prefix, uri);
            self.undo.push(Undo::Rendered(prefix, previous));
        }
    }

    fn qname(&mut self, name: &QName) {
        if let Some(prefix) = &name.prefix {
            self.output.extend_from_slice(prefix.as_bytes());
            self.output.push(b':');
        }
        self.output.extend_from_slice(name.local.as_bytes());
    }

    fn processing_instruction(&mut self, target: &str, data: &str) {
        self.output.extend_from_slice(b"<?");
        self.output.extend_from_slice(target.as_bytes());
        if !data.is_empty() {
            self.output.push(b' ');
            self.output.extend_from_slice(data.as_bytes());
        }
        self.output.extend_from_slice(b"?>");
    }
}
