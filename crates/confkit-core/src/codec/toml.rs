use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Codec, Merge};
use crate::error::CodecResult;

/// TOML codec.
///
/// The record must serialize to a table; nested records become `[sections]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn default_file_name(&self) -> &'static str {
        "config.toml"
    }

    fn write<W, T>(&self, mut writer: W, record: &T) -> CodecResult<()>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        let content = ::toml::to_string(record)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

    fn read<R, T>(&self, mut reader: R, record: &mut T) -> CodecResult<()>
    where
        R: Read,
        T: Serialize + DeserializeOwned,
    {
        // The toml parser works on complete documents only.
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let document: ::toml::Table = ::toml::from_str(&content)?;
        let mut merged = ::toml::Value::try_from(&*record)?;
        merged.merge(::toml::Value::Table(document));
        *record = merged.try_into()?;
        Ok(())
    }
}

impl Merge for ::toml::Value {
    fn merge(&mut self, document: Self) {
        match (self, document) {
            (::toml::Value::Table(base), ::toml::Value::Table(entries)) => {
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
