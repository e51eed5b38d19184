//! Response body decoding
//!
//! The root element is unwrapped, so `<Response><Status>OK</Status></Response>`
//! decodes to an object with a single `Status` leaf. Elements without child
//! elements become leaves holding their text verbatim; repeated siblings are
//! collected into a [`Node::List`]. Attributes, comments and processing
//! instructions are ignored.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::xml::Node;

struct Frame {
    name: String,
    children: Vec<(String, Node)>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn push_child(&mut self, name: String, node: Node) {
        match self.children.iter_mut().find(|(existing, _)| *existing == name) {
            // Element nodes are never lists, so a list here is an earlier repeat
            Some((_, Node::List(items))) => items.push(node),
            Some((_, slot)) => {
                let first = std::mem::replace(slot, Node::List(Vec::new()));
                *slot = Node::List(vec![first, node]);
            }
            None => self.children.push((name, node)),
        }
    }

    fn finish(self) -> (String, Node) {
        let node = if self.children.is_empty() {
            Node::Leaf(self.text)
        } else {
            Node::Object(self.children)
        };
        (self.name, node)
    }
}

/// Decode an XML response body into a [`Node`] tree
pub fn decode_response(body: &[u8]) -> Result<Node> {
    let mut reader = Reader::from_reader(body);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            malformed(
                format!("XML error at byte {}: {}", reader.buffer_position(), e),
                body,
            )
        })?;

        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(malformed("multiple root elements", body));
                }
                stack.push(Frame::new(element_name(start.name().as_ref(), body)?));
            }
            Event::Empty(start) => {
                let name = element_name(start.name().as_ref(), body)?;
                match stack.last_mut() {
                    Some(parent) => parent.push_child(name, Node::Leaf(String::new())),
                    None if root.is_none() => root = Some(Node::Object(Vec::new())),
                    None => return Err(malformed("multiple root elements", body)),
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without an open element", body))?;
                let (name, node) = frame.finish();
                match stack.last_mut() {
                    Some(parent) => parent.push_child(name, node),
                    None => root = Some(node),
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| malformed(format!("invalid text content: {}", e), body))?;
                match stack.last_mut() {
                    Some(frame) => frame.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(malformed("text outside of the root element", body)),
                }
            }
            Event::CData(data) => {
                let data = String::from_utf8(data.into_inner().into_owned())
                    .map_err(|_| malformed("CDATA section is not valid UTF-8", body))?;
                match stack.last_mut() {
                    Some(frame) => frame.text.push_str(&data),
                    None => return Err(malformed("CDATA outside of the root element", body)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(
            format!("unexpected end of document inside <{}>", open.name),
            body,
        ));
    }

    root.ok_or_else(|| malformed("document has no root element", body))
}

fn element_name(raw: &[u8], body: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|_| malformed("element name is not valid UTF-8", body))
}

fn malformed(message: impl Into<String>, body: &[u8]) -> Error {
    Error::MalformedResponse {
        message: message.into(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}
