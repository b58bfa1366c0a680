//! A small owned XML element tree.
//!
//! Frames coming off the wire are parsed into an [`Element`] with
//! `quick-xml`'s pull reader, and outgoing messages are built as
//! `Element`s and rendered back to text. Game-specific payloads (the
//! board state inside a memento, the body of a move) stay as `Element`s
//! so the protocol layer never needs to know any game's rules.

use std::str::FromStr;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// One XML element with its attributes, text, and child elements.
///
/// Attribute order is preserved so that rendering is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    /// Creates an empty element with the given tag name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: appends an attribute.
    pub fn with_attr(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder: appends a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: sets the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Returns the value of attribute `key`, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of attribute `key` or a decode error naming the
    /// element and attribute.
    pub fn required_attr(&self, key: &str) -> Result<&str, ProtocolError> {
        self.attr(key).ok_or_else(|| {
            ProtocolError::Decode(format!(
                "<{}> is missing attribute `{key}`",
                self.name
            ))
        })
    }

    /// Parses attribute `key` into `T`. A missing attribute is `Ok(None)`;
    /// a present but unparsable one is a decode error.
    pub fn parse_attr<T: FromStr>(
        &self,
        key: &str,
    ) -> Result<Option<T>, ProtocolError> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
                ProtocolError::Decode(format!(
                    "attribute `{key}` of <{}> has invalid value `{raw}`",
                    self.name
                ))
            }),
        }
    }

    /// Returns the first child named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns every child named `name`, in document order.
    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Returns the text content, or `""` when there is none.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Parses the text content into `T`.
    pub fn parse_text<T: FromStr>(&self) -> Result<T, ProtocolError> {
        self.text().trim().parse().map_err(|_| {
            ProtocolError::Decode(format!(
                "<{}> has invalid content `{}`",
                self.name,
                self.text()
            ))
        })
    }

    /// Parses exactly one element from `bytes`.
    ///
    /// Whitespace-only text nodes (indentation) are dropped; any other
    /// text is kept exactly, surrounding whitespace included. Anything
    /// after the root element other than whitespace, comments or processing
    /// instructions is an error.
    pub fn parse(bytes: &[u8]) -> Result<Element, ProtocolError> {
        let mut reader = Reader::from_reader(bytes);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                ProtocolError::Decode(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                ))
            })?;

            match event {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    // quick-xml already checked that the names match.
                    let element = stack.pop().ok_or_else(|| {
                        ProtocolError::Decode("unexpected closing tag".into())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| {
                        ProtocolError::Decode(format!("bad text: {e}"))
                    })?;
                    if !text.trim().is_empty() {
                        push_text(&mut stack, &text);
                    }
                }
                Event::CData(data) => {
                    push_text(&mut stack, &String::from_utf8_lossy(&data));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ProtocolError::Decode(format!(
                "<{}> is never closed",
                open.name
            )));
        }
        root.ok_or_else(|| ProtocolError::Decode("frame has no element".into()))
    }

    /// Renders the element as compact XML text.
    ///
    /// Elements without text or children use the self-closing form
    /// (`<join/>`).
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    /// Appends the rendered element to `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }

        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape(text.as_str()));
        }
        for child in &self.children {
            child.write_to(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, ProtocolError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            ProtocolError::Decode(format!(
                "bad attribute in <{}>: {e}",
                element.name
            ))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| {
                ProtocolError::Decode(format!(
                    "bad value for `{key}` in <{}>: {e}",
                    element.name
                ))
            })?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ProtocolError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(ProtocolError::Decode(format!(
            "unexpected second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.text.get_or_insert_with(String::new).push_str(text);
    }
}
