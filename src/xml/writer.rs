use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesText, Event};
use std::io::Write;

use super::escape::{escape_attribute, escape_text};
use super::{NodeId, NodeKind, QName, Result, XmlDocument};

/// Serialize every node reachable from the document node.
pub(super) fn write(doc: &XmlDocument) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    let mut stack = vec![Frame::Open(doc.root())];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Open(id) => {
                if write_open(&mut writer, doc, id)? {
                    stack.push(Frame::Close(id));
                    stack.extend(doc.children(id).rev().map(Frame::Open));
                }
            }
            Frame::Close(id) => {
                if let Some(element) = doc.element(id) {
                    writer.write_event(Event::End(BytesEnd::new(element.name.to_string())))?;
                }
            }
        }
    }
    Ok(writer.into_inner())
}

enum Frame {
    Open(NodeId),
    Close(NodeId),
}

/// Write the node itself, or the start tag of a non-empty element. Returns
/// whether the children still have to be written.
fn write_open(writer: &mut Writer<Vec<u8>>, doc: &XmlDocument, id: NodeId) -> Result<bool> {
    match doc.kind(id) {
        NodeKind::Document => return Ok(true),
        NodeKind::Declaration(decl) => {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
        }
        NodeKind::DocType(doctype) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(doctype.as_str())))?;
        }
        NodeKind::Element(element) => {
            let out = writer.get_mut();
            out.push(b'<');
            write_qname(out, &element.name);
            for (prefix, uri) in &element.namespaces {
                if prefix.is_empty() {
                    out.extend_from_slice(b" xmlns=\"");
                } else {
                    out.extend_from_slice(b" xmlns:");
                    out.extend_from_slice(prefix.as_bytes());
                    out.extend_from_slice(b"=\"");
                }
                out.extend_from_slice(escape_attribute(uri).as_bytes());
                out.push(b'"');
            }
            for attr in &element.attributes {
                out.push(b' ');
                write_qname(out, &attr.name);
                out.extend_from_slice(b"=\"");
                out.extend_from_slice(escape_attribute(&attr.value).as_bytes());
                out.push(b'"');
            }

            if doc.children(id).next().is_none() {
                out.extend_from_slice(b"/>");
                return Ok(false);
            }
            out.push(b'>');
            return Ok(true);
        }
        NodeKind::Text(text) => {
            writer.get_mut().write_all(escape_text(text).as_bytes())?;
        }
        NodeKind::CData(data) => {
            writer.write_event(Event::CData(BytesCData::new(data.as_str())))?;
        }
        NodeKind::Comment(comment) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?;
        }
        NodeKind::ProcessingInstruction { target, data } => {
            let out = writer.get_mut();
            out.extend_from_slice(b"<?");
            out.extend_from_slice(target.as_bytes());
            if !data.is_empty() {
                out.push(b' ');
                out.extend_from_slice(data.as_bytes());
            }
            out.extend_from_slice(b"?>");
        }
    }
    Ok(false)
}

fn write_qname(out: &mut Vec<u8>, name: &QName) {
    if let Some(prefix) = &name.prefix {
        out.extend_from_slice(prefix.as_bytes());
        out.push(b':');
    }
    out.extend_from_slice(name.local.as_bytes());
}
