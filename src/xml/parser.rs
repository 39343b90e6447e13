use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use std::borrow::Cow;
use std::str;

use super::{Attribute, Declaration, Element, Error, NodeId, NodeKind, QName, Result, XmlDocument};

/// Deepest element nesting accepted by [`parse`].
pub const MAX_DEPTH: usize = 1024;

/// Build a document tree from UTF-8 XML without dropping any whitespace.
pub(super) fn parse(input: &[u8]) -> Result<XmlDocument> {
    let text = str::from_utf8(input)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let text = normalize_line_endings(text);

    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut doc = XmlDocument::new();
    let mut stack = vec![doc.root()];
    let mut seen_root = false;

    loop {
        let parent = stack.last().copied().unwrap_or(doc.root());
        let at_top = stack.len() == 1;

        match reader.read_event()? {
            Event::Decl(e) => {
                doc.push(Some(parent), NodeKind::Declaration(read_declaration(&e)?));
            }
            Event::DocType(e) => {
                let doctype = str::from_utf8(&e)?.to_owned();
                doc.push(Some(parent), NodeKind::DocType(doctype));
            }
            Event::Start(e) => {
                if at_top {
                    if seen_root {
                        return Err(Error::Structure("more than one root element".into()));
                    }
                    seen_root = true;
                }
                if stack.len() > MAX_DEPTH {
                    return Err(Error::Structure(format!(
                        "elements nested deeper than {MAX_DEPTH} levels"
                    )));
                }
                let id = doc.push(Some(parent), NodeKind::Element(read_element(&e)?));
                stack.push(id);
            }
            Event::Empty(e) => {
                if at_top {
                    if seen_root {
                        return Err(Error::Structure("more than one root element".into()));
                    }
                    seen_root = true;
                }
                doc.push(Some(parent), NodeKind::Element(read_element(&e)?));
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                if at_top && !text.trim().is_empty() {
                    return Err(Error::Structure("text outside the root element".into()));
                }
                doc.push(Some(parent), NodeKind::Text(text.into_owned()));
            }
            Event::CData(e) => {
                if at_top {
                    return Err(Error::Structure("CDATA outside the root element".into()));
                }
                let data = String::from_utf8(e.into_inner().into_owned())?;
                doc.push(Some(parent), NodeKind::CData(data));
            }
            Event::Comment(e) => {
                let comment = str::from_utf8(&e)?.to_owned();
                doc.push(Some(parent), NodeKind::Comment(comment));
            }
            Event::PI(e) => {
                let target = str::from_utf8(e.target())?.to_owned();
                let data = str::from_utf8(e.content())?.trim_start().to_owned();
                doc.push(Some(parent), NodeKind::ProcessingInstruction { target, data });
            }
            Event::Eof => break,
        }
    }

    if stack.len() != 1 {
        return Err(Error::Structure("unexpected end of document".into()));
    }
    if !seen_root {
        return Err(Error::Structure("no root element".into()));
    }
    check_namespaces(&doc)?;
    Ok(doc)
}

/// Normalize line endings to LF (XML 1.0 section 2.11).
pub(super) fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

fn read_declaration(e: &BytesDecl<'_>) -> Result<Declaration> {
    let version = String::from_utf8(e.version()?.into_owned())?;
    let encoding = e
        .encoding()
        .transpose()?
        .map(|v| String::from_utf8(v.into_owned()))
        .transpose()?;
    let standalone = e
        .standalone()
        .transpose()?
        .map(|v| String::from_utf8(v.into_owned()))
        .transpose()?;
    Ok(Declaration {
        version,
        encoding,
        standalone,
    })
}

fn read_element(e: &BytesStart<'_>) -> Result<Element> {
    let name = QName::parse(str::from_utf8(e.name().as_ref())?);
    let mut namespaces = Vec::new();
    let mut attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = str::from_utf8(attr.key.as_ref())?;
        let value = normalize_attribute_value(str::from_utf8(&attr.value)?)?;

        if key == "xmlns" {
            namespaces.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.push((prefix.to_owned(), value));
        } else {
            attributes.push(Attribute {
                name: QName::parse(key),
                value,
            });
        }
    }

    Ok(Element {
        name,
        namespaces,
        attributes,
    })
}

/// Attribute-value normalization for CDATA-typed attributes: literal
/// whitespace characters become spaces before references are expanded, so
/// `&#xA;` survives as a line feed.
fn normalize_attribute_value(raw: &str) -> Result<String> {
    let spaced = raw.replace(['\t', '\n', '\r'], " ");
    Ok(unescape(&spaced)?.into_owned())
}

/// Every element and attribute prefix must be bound.
fn check_namespaces(doc: &XmlDocument) -> Result<()> {
    for id in doc.descendants(doc.root()) {
        let Some(element) = doc.element(id) else {
            continue;
        };
        let prefixes = element
            .name
            .prefix
            .iter()
            .chain(element.attributes.iter().filter_map(|a| a.name.prefix.as_ref()));
        for prefix in prefixes {
            if doc.lookup_namespace(id, prefix).is_none() {
                return Err(unbound(id, prefix));
            }
        }
    }
    Ok(())
}

fn unbound(id: NodeId, prefix: &str) -> Error {
    Error::Structure(format!("namespace prefix '{prefix}' is not bound (node {})", id.0))
}
