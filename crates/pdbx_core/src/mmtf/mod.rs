//! Read-only MMTF support. The MessagePack map is decoded into a flat set of
//! fields, which [`projection`] then turns into canonical categories.

mod codec;
mod projection;

use std::io::Read;

pub use codec::Array;

use crate::error::{Error, Result};
use crate::model::Dictionary;
use crate::msgpack::{self, MsgValue};

/// One top-level MMTF field: either a binary-encoded array or a plain value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Array(Array),
    Value(MsgValue),
}

/// The decoded top-level MMTF map, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MmtfFile {
    fields: Vec<(String, Field)>,
}

impl MmtfFile {
    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, field)| field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn value(&self, key: &str) -> Option<&MsgValue> {
        match self.get(key)? {
            Field::Value(value) if !value.is_nil() => Some(value),
            _ => None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.value(key)?.as_str().filter(|text| !text.is_empty())
    }

    /// Integer list from either an encoded array or a plain MessagePack array.
    pub fn ints(&self, key: &str) -> Option<Vec<i64>> {
        match self.get(key)? {
            Field::Array(Array::Ints(values)) => Some(values.clone()),
            Field::Array(_) => None,
            Field::Value(value) => value.as_array()?.iter().map(MsgValue::as_i64).collect(),
        }
    }

    /// List of cell texts, numbers formatted the way they were stored.
    pub fn texts(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            Field::Array(array) => Some(array.texts()),
            Field::Value(value) => value.as_array()?.iter().map(scalar_text).collect(),
        }
    }
}

/// Text of a scalar MessagePack value, keeping `f32` precision.
pub(crate) fn scalar_text(value: &MsgValue) -> Option<String> {
    match value {
        MsgValue::Str(text) => Some(text.clone()),
        MsgValue::Bin(bytes) => String::from_utf8(bytes.clone()).ok(),
        MsgValue::Int(number) => Some(number.to_string()),
        MsgValue::Uint(number) => Some(number.to_string()),
        MsgValue::F32(number) => Some(crate::bcif::format_f32(*number)),
        MsgValue::F64(number) => Some(crate::bcif::format_f64(*number)),
        MsgValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn decode_field(value: MsgValue) -> Result<Field> {
    let encoded = match &value {
        MsgValue::Bin(bytes) if codec::looks_encoded(bytes) => Some(bytes.as_slice()),
        MsgValue::Str(text) if codec::looks_encoded(text.as_bytes()) => Some(text.as_bytes()),
        _ => None,
    };
    match encoded {
        Some(bytes) => Ok(Field::Array(codec::decode(bytes)?)),
        None => Ok(Field::Value(value)),
    }
}

pub fn decode(bytes: &[u8]) -> Result<MmtfFile> {
    let MsgValue::Map(entries) = msgpack::decode(bytes)? else {
        return Err(Error::malformed("MMTF data is not a MessagePack map"));
    };
    let mut fields = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let key = key
            .as_str()
            .ok_or_else(|| Error::malformed("MMTF field name is not a string"))?
            .to_string();
        let field = decode_field(value)
            .map_err(|err| err.within(format!("field {key}")))?;
        fields.push((key, field));
    }
    tracing::debug!(fields = fields.len(), "decoded MMTF map");
    Ok(MmtfFile { fields })
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Dictionary> {
    projection::project(&decode(bytes)?)
}

pub fn parse_reader<R: Read>(mut reader: R) -> Result<Dictionary> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse_bytes(&bytes)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn binary_fields_are_decoded() {
        let file = decode(&fixture::sample()).expect("decoded");
        assert_eq!(file.str("structureId"), Some("1ABC"));
        assert_eq!(file.ints("groupIdList"), Some(vec![11, 12, 3169]));
        assert_eq!(file.ints("chainsPerModel"), Some(vec![2]));
        assert_eq!(
            file.texts("xCoordList"),
            Some(vec!["3.696".into(), "3.0".into(), "2.0".into(), "-1.5".into()])
        );
        assert_eq!(
            file.texts("chainIdList"),
            Some(vec!["A".to_string(), "B".to_string()])
        );
        assert_eq!(file.texts("resolution"), None);
        assert!(file.keys().any(|key| key == "mmtfVersion"));
    }

    #[test]
    fn non_map_input_is_malformed() {
        let bytes = msgpack::encode(&MsgValue::Array(vec![])).expect("encoded");
        assert_eq!(decode(&bytes).unwrap_err().kind(), ErrorKind::Malformed);
    }

    #[test]
    fn unknown_codec_surfaces_as_unsupported() {
        let map = MsgValue::map([("xCoordList", MsgValue::Bin(codec::encode_header(42, 0, 0)))]);
        let bytes = msgpack::encode(&map).expect("encoded");
        assert_eq!(
            parse_bytes(&bytes).unwrap_err().kind(),
            ErrorKind::UnsupportedEncoding
        );
    }
}
