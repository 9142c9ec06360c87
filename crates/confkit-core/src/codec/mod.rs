//! Pluggable serialization formats.
//!
//! A [`Codec`] knows three things about a wire format: the canonical name of a
//! configuration file in that format, how to write a record to a stream, and
//! how to read a record back. The [`Store`](crate::Store) drives the same
//! create/load/save workflow over any of them.
//!
//! | Codec            | Default file      | Feature   | Pretty-printing |
//! |------------------|-------------------|-----------|-----------------|
//! | [`JsonCodec`]    | `config.json`     | always    | indent + prefix |
//! | [`YamlCodec`]    | `config.yaml`     | `yaml`    | -               |
//! | [`TomlCodec`]    | `config.toml`     | `toml`    | -               |
//! | [`XmlCodec`]     | `config.xml`      | `xml`     | indent + prefix |
//! | [`MsgPackCodec`] | `config.msgpack`  | `msgpack` | -               |
//!
//! Field names follow the record's serde attributes (`#[serde(rename = "...")]`
//! and friends), so a record controls its own keys per format.
//!
//! Reading decodes into the record in place: keys present in the document
//! replace the record's values, and keys the document lacks keep them. A file
//! written by an older version of a record therefore still loads.

mod json;
#[cfg(feature = "msgpack")]
mod msgpack;
#[cfg(feature = "toml")]
mod toml;
#[cfg(feature = "xml")]
mod xml;
#[cfg(feature = "yaml")]
mod yaml;

use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecResult;

pub use json::JsonCodec;
#[cfg(feature = "msgpack")]
pub use msgpack::MsgPackCodec;
#[cfg(feature = "toml")]
pub use self::toml::TomlCodec;
#[cfg(feature = "xml")]
pub use xml::XmlCodec;
#[cfg(feature = "yaml")]
pub use yaml::YamlCodec;

/// A serialization format usable by a [`Store`](crate::Store).
///
/// Implementations must round-trip: writing a record and reading the output
/// back must reproduce every field the format can represent.
pub trait Codec {
    /// Canonical file name for configuration in this format, e.g. `config.json`.
    fn default_file_name(&self) -> &'static str;

    /// Encodes `record` into `writer`.
    fn write<W, T>(&self, writer: W, record: &T) -> CodecResult<()>
    where
        W: Write,
        T: Serialize + ?Sized;

    /// Decodes the content of `reader` into `record`.
    ///
    /// Values present in the document replace those of `record`; nested
    /// records merge field by field, and anything missing from the document
    /// keeps its current value.
    fn read<R, T>(&self, reader: R, record: &mut T) -> CodecResult<()>
    where
        R: Read,
        T: Serialize + DeserializeOwned;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn default_file_name(&self) -> &'static str {
        (**self).default_file_name()
    }

    fn write<W, T>(&self, writer: W, record: &T) -> CodecResult<()>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        (**self).write(writer, record)
    }

    fn read<R, T>(&self, reader: R, record: &mut T) -> CodecResult<()>
    where
        R: Read,
        T: Serialize + DeserializeOwned,
    {
        (**self).read(reader, record)
    }
}

/// Runtime selection among the enabled codecs.
///
/// Useful when the format is only known from a file name or from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    Json(JsonCodec),
    #[cfg(feature = "yaml")]
    Yaml(YamlCodec),
    #[cfg(feature = "toml")]
    Toml(TomlCodec),
    #[cfg(feature = "xml")]
    Xml(XmlCodec),
    #[cfg(feature = "msgpack")]
    MsgPack(MsgPackCodec),
}

impl Format {
    /// Picks a codec from a file extension (without the leading dot).
    ///
    /// Matching is case-insensitive. Returns `None` for unknown extensions and
    /// for formats whose feature is disabled.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json(JsonCodec::new())),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Some(Self::Yaml(YamlCodec)),
            #[cfg(feature = "toml")]
            "toml" => Some(Self::Toml(TomlCodec)),
            #[cfg(feature = "xml")]
            "xml" => Some(Self::Xml(XmlCodec::new())),
            #[cfg(feature = "msgpack")]
            "msgpack" | "mpk" => Some(Self::MsgPack(MsgPackCodec)),
            _ => None,
        }
    }

    /// Picks a codec from the extension of `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Short lowercase name of the format.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            #[cfg(feature = "yaml")]
            Self::Yaml(_) => "yaml",
            #[cfg(feature = "toml")]
            Self::Toml(_) => "toml",
            #[cfg(feature = "xml")]
            Self::Xml(_) => "xml",
            #[cfg(feature = "msgpack")]
            Self::MsgPack(_) => "msgpack",
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Self::Json(JsonCodec::new())
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<JsonCodec> for Format {
    fn from(codec: JsonCodec) -> Self {
        Self::Json(codec)
    }
}

#[cfg(feature = "yaml")]
impl From<YamlCodec> for Format {
    fn from(codec: YamlCodec) -> Self {
        Self::Yaml(codec)
    }
}

#[cfg(feature = "toml")]
impl From<TomlCodec> for Format {
    fn from(codec: TomlCodec) -> Self {
        Self::Toml(codec)
    }
}

#[cfg(feature = "xml")]
impl From<XmlCodec> for Format {
    fn from(codec: XmlCodec) -> Self {
        Self::Xml(codec)
    }
}

#[cfg(feature = "msgpack")]
impl From<MsgPackCodec> for Format {
    fn from(codec: MsgPackCodec) -> Self {
        Self::MsgPack(codec)
    }
}

// Dispatches a method call to the codec held by each variant.
macro_rules! dispatch {
    ($format:expr, $codec:ident => $call:expr) => {
        match $format {
            Format::Json($codec) => $call,
            #[cfg(feature = "yaml")]
            Format::Yaml($codec) => $call,
            #[cfg(feature = "toml")]
            Format::Toml($codec) => $call,
            #[cfg(feature = "xml")]
            Format::Xml($codec) => $call,
            #[cfg(feature = "msgpack")]
            Format::MsgPack($codec) => $call,
        }
    };
}

impl Codec for Format {
    fn default_file_name(&self) -> &'static str {
        dispatch!(self, codec => codec.default_file_name())
    }

    fn write<W, T>(&self, writer: W, record: &T) -> CodecResult<()>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        dispatch!(self, codec => codec.write(writer, record))
    }

    fn read<R, T>(&self, reader: R, record: &mut T) -> CodecResult<()>
    where
        R: Read,
        T: Serialize + DeserializeOwned,
    {
        dispatch!(self, codec => codec.read(reader, record))
    }
}

/// Self-describing value trees that a decoded document is merged into.
pub(crate) trait Merge {
    /// Overlays `document` onto `self`. Mappings merge entry by entry; any
    /// other value in `document` replaces the current one.
    fn merge(&mut self, document: Self);
}

impl Merge for serde_json::Value {
    fn merge(&mut self, document: Self) {
        match (self, document) {
            (serde_json::Value::Object(base), serde_json::Value::Object(entries)) => {
                for (key, value) in entries {
                    match base.get_mut(&key) {
                        Some(slot) => slot.merge(value),
                        None => {
                            base.insert(key, value);
                        }
                    }
                }
            }
            (base, document) => *base = document,
        }
    }
}
