use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Codec, Merge};
use crate::error::CodecResult;

/// MessagePack codec.
///
/// Structs are written as maps keyed by field name, so a file stays readable
/// after fields are reordered or added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn default_file_name(&self) -> &'static str {
        "config.msgpack"
    }

    fn write<W, T>(&self, mut writer: W, record: &T) -> CodecResult<()>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        rmp_serde::encode::write_named(&mut writer, record)?;
        Ok(())
    }

    fn read<R, T>(&self, mut reader: R, record: &mut T) -> CodecResult<()>
    where
        R: Read,
        T: Serialize + DeserializeOwned,
    {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;

        // Merged through JSON values. Types with a separate binary form
        // (addresses, byte strings) do not survive that, so fall back to a
        // direct decode of the whole document.
        if let Ok(document) = rmp_serde::from_slice::<serde_json::Value>(&content)
            && let Ok(mut merged) = serde_json::to_value(&*record)
        {
            merged.merge(document);
            if let Ok(value) = serde_json::from_value(merged) {
                *record = value;
                return Ok(());
            }
        }

        *record = rmp_serde::from_slice(&content)?;
        Ok(())
    }
}
