use std::collections::HashMap;
use std::io::{Read, Write};

use quick_xml::events::{BytesCData, BytesStart, BytesText, Event};
use quick_xml::{DeError, Reader, Writer};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Codec;
use crate::error::CodecResult;

/// XML codec.
///
/// The root element is named after the record type (or its
/// `#[serde(rename = "...")]`), and each field becomes a child element.
/// `None` fields are left out.
///
/// Character data is read back exactly as written, including leading and
/// trailing whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlCodec {
    indent: String,
    prefix: String,
}

impl XmlCodec {
    /// Single-line XML.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented XML: every line starts with `prefix` followed by one `indent`
    /// per nesting level.
    pub fn indented(indent: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
            prefix: prefix.into(),
        }
    }

    /// Returns a copy using a two-space prefix and a four-space indent.
    pub fn with_indent(&self) -> Self {
        Self::indented("    ", "  ")
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn is_pretty(&self) -> bool {
        !self.indent.is_empty() || !self.prefix.is_empty()
    }
}

impl Codec for XmlCodec {
    fn default_file_name(&self) -> &'static str {
        "config.xml"
    }

    fn write<W, T>(&self, mut writer: W, record: &T) -> CodecResult<()>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        let root = to_tree(record)?;
        let compact = String::from_utf8_lossy(&emit(&root, TextStyle::Escaped)?).into_owned();
        if self.is_pretty() {
            let pretty = reindent(&compact, &self.indent, &self.prefix)?;
            writer.write_all(pretty.as_bytes())?;
        } else {
            writer.write_all(compact.as_bytes())?;
        }
        Ok(())
    }

    fn read<R, T>(&self, mut reader: R, record: &mut T) -> CodecResult<()>
    where
        R: Read,
        T: Serialize + DeserializeOwned,
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        let document = parse(&content)?;
        let merged = merge(to_tree(&*record)?, document);
        let xml = emit(&merged, TextStyle::CData)?;
        *record = quick_xml::de::from_reader(xml.as_slice())?;
        Ok(())
    }
}

// ============================================================================
// Element tree
// ============================================================================

/// An element with its start tag (name and attributes) kept as written.
#[derive(Debug)]
struct Element {
    start: BytesStart<'static>,
    self_closing: bool,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    /// Character data, escaped as in the source and decoded.
    Text { raw: String, value: String },
    CData(String),
}

impl Element {
    fn new(start: BytesStart<'static>, self_closing: bool) -> Self {
        Self {
            start,
            self_closing,
            children: Vec::new(),
        }
    }

    fn name(&self) -> &[u8] {
        self.start.name().into_inner()
    }

    fn has_elements(&self) -> bool {
        self.children
            .iter()
            .any(|node| matches!(node, Node::Element(_)))
    }

    /// Drops indentation between child elements.
    fn finish(&mut self) {
        if self.has_elements() {
            self.children.retain(
                |node| !matches!(node, Node::Text { value, .. } if value.chars().all(is_xml_space)),
            );
        }
    }

    fn name_counts(&self) -> HashMap<Vec<u8>, usize> {
        let mut counts = HashMap::new();
        for node in &self.children {
            if let Node::Element(child) = node {
                *counts.entry(child.name().to_vec()).or_default() += 1;
            }
        }
        counts
    }
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn parse(xml: &str) -> CodecResult<Element> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<Element> = Vec::new();

    loop {
        let closed = match reader.read_event()? {
            Event::Start(start) => {
                open.push(Element::new(start.into_owned(), false));
                None
            }
            Event::Empty(start) => Some(Element::new(start.into_owned(), true)),
            Event::End(_) => open.pop().map(|mut element| {
                element.finish();
                element
            }),
            Event::Text(text) => {
                if let Some(parent) = open.last_mut() {
                    parent.children.push(Node::Text {
                        raw: String::from_utf8_lossy(&text).into_owned(),
                        value: text.unescape()?.into_owned(),
                    });
                }
                None
            }
            Event::CData(data) => {
                if let Some(parent) = open.last_mut() {
                    let value = data.decode().map_err(quick_xml::Error::from)?;
                    parent.children.push(Node::CData(value.into_owned()));
                }
                None
            }
            Event::Eof => return Err(DeError::UnexpectedEof.into()),
            _ => None,
        };

        if let Some(element) = closed {
            match open.last_mut() {
                Some(parent) => parent.children.push(Node::Element(element)),
                None => return Ok(element),
            }
        }
    }
}

/// Serializes `record` into a tree without its `None` fields.
///
/// The serializer writes `None` as an empty element, which reads back as
/// `Some`. Such elements are found through the record's JSON form.
fn to_tree<T: Serialize + ?Sized>(record: &T) -> CodecResult<Element> {
    let mut root = parse(&quick_xml::se::to_string(record)?)?;
    if let Ok(shape) = serde_json::to_value(record) {
        prune_nulls(&mut root, &shape);
    }
    Ok(root)
}

/// Removes empty children whose value in `shape` is null. Children match
/// fields by name; repeated children match array items by position.
fn prune_nulls(element: &mut Element, shape: &serde_json::Value) {
    let serde_json::Value::Object(fields) = shape else {
        return;
    };

    let mut seen: HashMap<Vec<u8>, usize> = HashMap::new();
    element.children.retain_mut(|node| {
        let Node::Element(child) = node else {
            return true;
        };
        let position = seen.entry(child.name().to_vec()).or_default();
        let index = *position;
        *position += 1;

        let value = std::str::from_utf8(child.name())
            .ok()
            .and_then(|key| fields.get(key))
            .and_then(|value| match value {
                serde_json::Value::Array(items) => items.get(index),
                other => Some(other),
            });
        match value {
            Some(serde_json::Value::Null) if child.children.is_empty() => false,
            Some(value) => {
                prune_nulls(child, value);
                true
            }
            None => true,
        }
    });
}

/// Overlays `document` onto `defaults`.
///
/// Children merge by name. A name that repeats on either side is a sequence
/// and is taken whole from `document`. Names missing from `document` keep
/// their default, and an empty element in `document` keeps the children of
/// its default.
fn merge(defaults: Element, mut document: Element) -> Element {
    if !defaults.has_elements() {
        return document;
    }
    if document.children.is_empty() {
        document.children = defaults.children;
        return document;
    }
    if !document.has_elements() {
        return document;
    }

    let in_document = document.name_counts();
    let in_defaults = defaults.name_counts();
    let mut single: HashMap<Vec<u8>, Element> = HashMap::new();
    let mut missing = Vec::new();
    for node in defaults.children {
        let Node::Element(child) = node else {
            continue;
        };
        match in_document.get(child.name()) {
            None => missing.push(Node::Element(child)),
            Some(1) if in_defaults.get(child.name()) == Some(&1) => {
                single.insert(child.name().to_vec(), child);
            }
            Some(_) => {}
        }
    }

    document.children = document
        .children
        .into_iter()
        .map(|node| match node {
            Node::Element(child) => match single.remove(child.name()) {
                Some(default) => Node::Element(merge(default, child)),
                None => Node::Element(child),
            },
            other => other,
        })
        .collect();
    document.children.extend(missing);
    document
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextStyle {
    /// Text as written in the source.
    Escaped,
    /// Text-only content as CDATA, which the deserializer does not trim.
    CData,
}

fn emit(root: &Element, style: TextStyle) -> CodecResult<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, root, style)?;
    Ok(writer.into_inner())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    style: TextStyle,
) -> std::io::Result<()> {
    if element.self_closing && element.children.is_empty() {
        return writer.write_event(Event::Empty(element.start.borrow()));
    }

    writer.write_event(Event::Start(element.start.borrow()))?;
    let text_only = !element.has_elements();
    for node in &element.children {
        match node {
            Node::Element(child) => write_element(writer, child, style)?,
            Node::Text { value, .. } if text_only && style == TextStyle::CData => {
                for part in BytesCData::escaped(value) {
                    writer.write_event(Event::CData(part))?;
                }
            }
            Node::Text { raw, .. } => {
                writer.write_event(Event::Text(BytesText::from_escaped(raw.as_str())))?;
            }
            Node::CData(value) => {
                for part in BytesCData::escaped(value) {
                    writer.write_event(Event::CData(part))?;
                }
            }
        }
    }
    writer.write_event(Event::End(element.start.to_end()))
}

// ============================================================================
// Indentation
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Opening tag: the next line is one level deeper.
    In,
    /// Closing tag.
    Out,
    /// Self-closing tag.
    Empty,
    /// Comments, processing instructions and other markup.
    Same,
}

/// Line builder for [`reindent`].
///
/// An element holding only text is kept on a single line: the closing tag of
/// an element that was just opened does not start a new line.
struct Lines<'a> {
    indent: &'a str,
    prefix: &'a str,
    out: String,
    depth: usize,
    just_opened: bool,
    started: bool,
}

impl<'a> Lines<'a> {
    fn new(indent: &'a str, prefix: &'a str, capacity: usize) -> Self {
        Self {
            indent,
            prefix,
            out: String::with_capacity(capacity),
            depth: 0,
            just_opened: false,
            started: false,
        }
    }

    fn step(&mut self, step: Step) {
        if step == Step::Out {
            self.depth = self.depth.saturating_sub(1);
            if self.just_opened {
                self.just_opened = false;
                return;
            }
        }

        if self.started {
            self.out.push('\n');
        } else {
            self.started = true;
        }
        self.out.push_str(self.prefix);
        for _ in 0..self.depth {
            self.out.push_str(self.indent);
        }

        match step {
            Step::In => {
                self.depth += 1;
                self.just_opened = true;
            }
            Step::Empty => self.just_opened = false,
            Step::Out | Step::Same => {}
        }
    }

    fn push(&mut self, raw: &str) {
        self.out.push_str(raw);
    }
}

/// Re-emits single-line XML with one element per line.
///
/// Markup is copied byte-for-byte from the input; only line breaks, the prefix
/// and indentation are inserted between tags.
fn reindent(compact: &str, indent: &str, prefix: &str) -> CodecResult<String> {
    let mut reader = Reader::from_str(compact);
    let mut lines = Lines::new(indent, prefix, compact.len() * 2);
    let mut start = 0;

    loop {
        let event = reader.read_event()?;
        let end = reader.buffer_position() as usize;
        let raw = &compact[start..end];
        start = end;

        match event {
            Event::Eof => break,
            Event::Start(_) => lines.step(Step::In),
            Event::End(_) => lines.step(Step::Out),
            Event::Empty(_) => lines.step(Step::Empty),
            Event::Text(_) | Event::CData(_) => {}
            _ => lines.step(Step::Same),
        }
        lines.push(raw);
    }

    Ok(lines.out)
}
