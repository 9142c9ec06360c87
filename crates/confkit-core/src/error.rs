//! Error types for codecs and the file store.
//!
//! Errors coming from the filesystem or from a format library are wrapped
//! transparently: their `Display` output and `source()` chain are exactly the
//! ones produced by the underlying crate.

use thiserror::Error;

/// Errors produced while encoding or decoding a record.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Reading from or writing to the underlying stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML encoding or decoding failed.
    #[cfg(feature = "yaml")]
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// The TOML document could not be parsed.
    #[cfg(feature = "toml")]
    #[error(transparent)]
    TomlDecode(#[from] toml::de::Error),

    /// The record could not be represented as TOML.
    #[cfg(feature = "toml")]
    #[error(transparent)]
    TomlEncode(#[from] toml::ser::Error),

    /// The XML document could not be deserialized.
    #[cfg(feature = "xml")]
    #[error(transparent)]
    XmlDecode(#[from] quick_xml::DeError),

    /// The record could not be represented as XML.
    #[cfg(feature = "xml")]
    #[error(transparent)]
    XmlEncode(#[from] quick_xml::SeError),

    /// Malformed XML met while re-indenting encoder output.
    #[cfg(feature = "xml")]
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    /// MessagePack encoding failed.
    #[cfg(feature = "msgpack")]
    #[error(transparent)]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding failed.
    #[cfg(feature = "msgpack")]
    #[error(transparent)]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors produced by [`Store`](crate::Store) operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A filesystem operation (open, create, mkdir, remove) failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The codec failed to encode or decode the record.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The platform configuration directory could not be determined.
    #[error("could not determine the platform configuration directory")]
    NoConfigDir,

    /// No enabled codec handles the file extension.
    #[error("no codec available for configuration file extension `{0}`")]
    UnknownFormat(String),
}

impl StoreError {
    /// Returns `true` when the error is an I/O error of the given kind.
    pub fn is_io_kind(&self, kind: std::io::ErrorKind) -> bool {
        match self {
            Self::Io(err) => err.kind() == kind,
            Self::Codec(CodecError::Io(err)) => err.kind() == kind,
            _ => false,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
