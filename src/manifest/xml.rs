use log::trace;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::err::ManifestError;
use crate::node::{Node, TEXT_KEY};

/// An element that has been opened but not closed yet.
struct Frame {
    name: String,
    children: Vec<(String, Node)>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>, position: u64) -> Result<Frame, ManifestError> {
        let name = utf8(start.name().as_ref(), "element name")?.to_owned();

        // Attributes become leading children so that `<field id="a"/>` and
        // `<field><id>a</id></field>` read the same.
        let mut children = vec![];
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ManifestError::Xml {
                position,
                message: e.to_string(),
            })?;
            let key = utf8(attr.key.as_ref(), "attribute name")?.to_owned();
            let value = attr.unescape_value().map_err(|e| ManifestError::Xml {
                position,
                message: e.to_string(),
            })?;
            children.push((key, Node::string(value.into_owned())));
        }

        Ok(Frame {
            name,
            children,
            text: String::new(),
        })
    }

    fn close(mut self, path: &str) -> Result<(String, Node), ManifestError> {
        if self.children.is_empty() {
            return Ok((self.name, Node::string(self.text)));
        }

        if !self.text.is_empty() {
            self.children
                .push((TEXT_KEY.to_owned(), Node::string(std::mem::take(&mut self.text))));
        }

        let node = Node::from_children(path, self.children)?;
        Ok((self.name, node))
    }
}

fn utf8<'a>(bytes: &'a [u8], what: &'static str) -> Result<&'a str, ManifestError> {
    std::str::from_utf8(bytes).map_err(|_| ManifestError::InvalidUtf8 { what })
}

fn path_of(stack: &[Frame], name: &str) -> String {
    let mut path = String::new();
    // The root element is left out, paths start at its children.
    for frame in stack.iter().skip(1) {
        path.push_str(&frame.name);
        path.push('/');
    }
    path.push_str(name);
    path
}

/// Reads an XML manifest into a tree. Returns the root element's node.
pub(super) fn read_xml(bytes: &[u8]) -> Result<Node, ManifestError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ManifestError::Xml {
                position: reader.error_position() as u64,
                message: e.to_string(),
            })?;
        let position = reader.buffer_position() as u64;

        let closed = match event {
            Event::Start(start) => {
                stack.push(Frame::open(&start, position)?);
                None
            }
            Event::Empty(start) => {
                let frame = Frame::open(&start, position)?;
                let path = path_of(&stack, &frame.name);
                Some(frame.close(&path)?)
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| ManifestError::Xml {
                    position,
                    message: "closing tag without a matching opening tag".to_owned(),
                })?;
                let path = path_of(&stack, &frame.name);
                Some(frame.close(&path)?)
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| ManifestError::Xml {
                        position,
                        message: e.to_string(),
                    })?;
                    top.text.push_str(&text);
                }
                None
            }
            Event::CData(cdata) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(utf8(&cdata, "CDATA section")?);
                }
                None
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no manifest data.
            _ => None,
        };

        if let Some((name, node)) = closed {
            trace!("closed element `{}`", name);
            match stack.last_mut() {
                Some(parent) => parent.children.push((name, node)),
                None if root.is_none() => root = Some(node),
                None => {
                    return Err(ManifestError::Xml {
                        position,
                        message: format!("unexpected second root element `{name}`"),
                    });
                }
            }
        }

        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(ManifestError::Xml {
            position: reader.buffer_position() as u64,
            message: format!("unexpected end of document inside `{}`", open.name),
        });
    }

    root.ok_or(ManifestError::EmptyDocument)
}
