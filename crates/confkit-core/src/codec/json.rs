use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::Formatter;

use super::{Codec, Merge};
use crate::error::CodecResult;

/// JSON codec.
///
/// Writes compact JSON unless an indent or a line prefix is configured. Output
/// always ends with a newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonCodec {
    indent: String,
    prefix: String,
}

impl JsonCodec {
    /// Compact JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-printed JSON: each nested line starts with `prefix` followed by
    /// one `indent` per nesting level.
    pub fn indented(indent: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
            prefix: prefix.into(),
        }
    }

    /// Returns a copy using a three-space indent and no prefix.
    pub fn with_indent(&self) -> Self {
        Self::indented("   ", "")
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

impl Codec for JsonCodec {
    fn default_file_name(&self) -> &'static str {
        "config.json"
    }

    fn write<W, T>(&self, mut writer: W, record: &T) -> CodecResult<()>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        if self.is_pretty() {
            let formatter = PrefixedFormatter::new(self.prefix.as_bytes(), self.indent.as_bytes());
            let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
            record.serialize(&mut ser)?;
        } else {
            serde_json::to_writer(&mut writer, record)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn read<R, T>(&self, reader: R, record: &mut T) -> CodecResult<()>
    where
        R: Read,
        T: Serialize + DeserializeOwned,
    {
        let document: serde_json::Value = serde_json::from_reader(reader)?;
        let mut merged = serde_json::to_value(&*record)?;
        merged.merge(document);
        *record = serde_json::from_value(merged)?;
        Ok(())
    }
}

/// Like `serde_json::ser::PrettyFormatter`, but every line after the first is
/// started with a fixed prefix before the indentation.
struct PrefixedFormatter<'a> {
    prefix: &'a [u8],
    indent: &'a [u8],
    depth: usize,
    has_value: bool,
}

impl<'a> PrefixedFormatter<'a> {
    fn new(prefix: &'a [u8], indent: &'a [u8]) -> Self {
        Self {
            prefix,
            indent,
            depth: 0,
            has_value: false,
        }
    }

    fn newline<W: ?Sized + Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"\n")?;
        writer.write_all(self.prefix)?;
        for _ in 0..self.depth {
            writer.write_all(self.indent)?;
        }
        Ok(())
    }

    fn open<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(bracket)
    }

    fn close<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.depth -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(bracket)
    }

    fn item<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if !first {
            writer.write_all(b",")?;
        }
        self.newline(writer)
    }
}

impl Formatter for PrefixedFormatter<'_> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"[")
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.item(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"{")
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.item(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }
}
