use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Codec, Merge};
use crate::error::CodecResult;

/// YAML codec, using `serde_yaml`'s canonical block style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn default_file_name(&self) -> &'static str {
        "config.yaml"
    }

    fn write<W, T>(&self, writer: W, record: &T) -> CodecResult<()>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        serde_yaml::to_writer(writer, record)?;
        Ok(())
    }

    fn read<R, T>(&self, reader: R, record: &mut T) -> CodecResult<()>
    where
        R: Read,
        T: Serialize + DeserializeOwned,
    {
        let document: serde_yaml::Value = serde_yaml::from_reader(reader)?;
        let mut merged = serde_yaml::to_value(&*record)?;
        merged.merge(document);
        *record = serde_yaml::from_value(merged)?;
        Ok(())
    }
}

impl Merge for serde_yaml::Value {
    fn merge(&mut self, document: Self) {
        match (self, document) {
            (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(entries)) => {
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
