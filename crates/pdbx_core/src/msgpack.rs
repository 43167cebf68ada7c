//! A small MessagePack value tree shared by the BinaryCIF and MMTF codecs.

use std::fmt;
use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use rmp::Marker;

use crate::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum MsgValue {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<MsgValue>),
    Map(Vec<(MsgValue, MsgValue)>),
}

impl MsgValue {
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, MsgValue)>) -> Self {
        MsgValue::Map(
            entries
                .into_iter()
                .map(|(key, value)| (MsgValue::Str(key.into()), value))
                .collect(),
        )
    }

    pub fn str(value: impl Into<String>) -> Self {
        MsgValue::Str(value.into())
    }

    /// Strings are sometimes written as `bin` by older encoders, so both are
    /// accepted.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MsgValue::Str(text) => Some(text),
            MsgValue::Bin(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MsgValue::Int(value) => Some(*value),
            MsgValue::Uint(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MsgValue::F64(value) => Some(*value),
            MsgValue::F32(value) => Some(f64::from(*value)),
            MsgValue::Int(value) => Some(*value as f64),
            MsgValue::Uint(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MsgValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[MsgValue]> {
        match self {
            MsgValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bin(&self) -> Option<&[u8]> {
        match self {
            MsgValue::Bin(bytes) => Some(bytes),
            MsgValue::Str(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, MsgValue::Nil)
    }

    pub fn entries(&self) -> Option<&[(MsgValue, MsgValue)]> {
        match self {
            MsgValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up a key in a map value.
    pub fn get(&self, key: &str) -> Option<&MsgValue> {
        self.entries()?
            .iter()
            .find(|(candidate, _)| candidate.as_str() == Some(key))
            .map(|(_, value)| value)
    }

    /// Like [`MsgValue::get`] but a missing key is a format error.
    pub fn field(&self, key: &str) -> Result<&MsgValue> {
        self.get(key)
            .ok_or_else(|| Error::malformed(format!("missing field {key:?}")))
    }

    pub fn field_str(&self, key: &str) -> Result<&str> {
        self.field(key)?
            .as_str()
            .ok_or_else(|| Error::malformed(format!("field {key:?} is not a string")))
    }

    pub fn field_i64(&self, key: &str) -> Result<i64> {
        self.field(key)?
            .as_i64()
            .ok_or_else(|| Error::malformed(format!("field {key:?} is not an integer")))
    }

    pub fn field_f64(&self, key: &str) -> Result<f64> {
        self.field(key)?
            .as_f64()
            .ok_or_else(|| Error::malformed(format!("field {key:?} is not a number")))
    }

    pub fn field_array(&self, key: &str) -> Result<&[MsgValue]> {
        self.field(key)?
            .as_array()
            .ok_or_else(|| Error::malformed(format!("field {key:?} is not an array")))
    }

    pub fn field_bin(&self, key: &str) -> Result<&[u8]> {
        self.field(key)?
            .as_bin()
            .ok_or_else(|| Error::malformed(format!("field {key:?} is not binary data")))
    }
}

/// Deepest container nesting `decode` accepts.
const MAX_DEPTH: usize = 128;

pub fn decode(bytes: &[u8]) -> Result<MsgValue> {
    let mut cursor = Cursor::new(bytes);
    read_value(&mut cursor, 0)
}

fn truncated(err: std::io::Error) -> Error {
    Error::malformed("truncated MessagePack data").with_source(err)
}

fn read_value(rd: &mut Cursor<&[u8]>, depth: usize) -> Result<MsgValue> {
    if depth > MAX_DEPTH {
        return Err(Error::malformed(format!(
            "MessagePack containers nested deeper than {MAX_DEPTH}"
        )));
    }
    let marker = rmp::decode::read_marker(rd)?;

    let value = match marker {
        Marker::Null => MsgValue::Nil,
        Marker::True => MsgValue::Bool(true),
        Marker::False => MsgValue::Bool(false),
        Marker::FixPos(value) => MsgValue::Uint(u64::from(value)),
        Marker::FixNeg(value) => MsgValue::Int(i64::from(value)),
        Marker::U8 => MsgValue::Uint(u64::from(rd.read_u8().map_err(truncated)?)),
        Marker::U16 => MsgValue::Uint(u64::from(rd.read_u16::<BigEndian>().map_err(truncated)?)),
        Marker::U32 => MsgValue::Uint(u64::from(rd.read_u32::<BigEndian>().map_err(truncated)?)),
        Marker::U64 => MsgValue::Uint(rd.read_u64::<BigEndian>().map_err(truncated)?),
        Marker::I8 => MsgValue::Int(i64::from(rd.read_i8().map_err(truncated)?)),
        Marker::I16 => MsgValue::Int(i64::from(rd.read_i16::<BigEndian>().map_err(truncated)?)),
        Marker::I32 => MsgValue::Int(i64::from(rd.read_i32::<BigEndian>().map_err(truncated)?)),
        Marker::I64 => MsgValue::Int(rd.read_i64::<BigEndian>().map_err(truncated)?),
        Marker::F32 => MsgValue::F32(rd.read_f32::<BigEndian>().map_err(truncated)?),
        Marker::F64 => MsgValue::F64(rd.read_f64::<BigEndian>().map_err(truncated)?),
        Marker::FixStr(len) => read_string(rd, usize::from(len))?,
        Marker::Str8 => {
            let len = usize::from(rd.read_u8().map_err(truncated)?);
            read_string(rd, len)?
        }
        Marker::Str16 => {
            let len = usize::from(rd.read_u16::<BigEndian>().map_err(truncated)?);
            read_string(rd, len)?
        }
        Marker::Str32 => {
            let len = rd.read_u32::<BigEndian>().map_err(truncated)? as usize;
            read_string(rd, len)?
        }
        Marker::Bin8 => {
            let len = usize::from(rd.read_u8().map_err(truncated)?);
            MsgValue::Bin(read_bytes(rd, len)?)
        }
        Marker::Bin16 => {
            let len = usize::from(rd.read_u16::<BigEndian>().map_err(truncated)?);
            MsgValue::Bin(read_bytes(rd, len)?)
        }
        Marker::Bin32 => {
            let len = rd.read_u32::<BigEndian>().map_err(truncated)? as usize;
            MsgValue::Bin(read_bytes(rd, len)?)
        }
        Marker::FixArray(len) => read_array(rd, usize::from(len), depth)?,
        Marker::Array16 => {
            let len = usize::from(rd.read_u16::<BigEndian>().map_err(truncated)?);
            read_array(rd, len, depth)?
        }
        Marker::Array32 => {
            let len = rd.read_u32::<BigEndian>().map_err(truncated)? as usize;
            read_array(rd, len, depth)?
        }
        Marker::FixMap(len) => read_map(rd, usize::from(len), depth)?,
        Marker::Map16 => {
            let len = usize::from(rd.read_u16::<BigEndian>().map_err(truncated)?);
            read_map(rd, len, depth)?
        }
        Marker::Map32 => {
            let len = rd.read_u32::<BigEndian>().map_err(truncated)? as usize;
            read_map(rd, len, depth)?
        }
        other => {
            return Err(Error::malformed(format!(
                "unsupported MessagePack marker {other:?}"
            )));
        }
    };
    Ok(value)
}

fn read_bytes(rd: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let remaining = rd.get_ref().len().saturating_sub(rd.position() as usize);
    if len > remaining {
        return Err(Error::malformed(format!(
            "MessagePack item of {len} bytes with only {remaining} left"
        )));
    }
    let mut buf = vec![0u8; len];
    rd.read_exact(&mut buf).map_err(truncated)?;
    Ok(buf)
}

fn read_string(rd: &mut Cursor<&[u8]>, len: usize) -> Result<MsgValue> {
    let bytes = read_bytes(rd, len)?;
    Ok(MsgValue::Str(String::from_utf8(bytes)?))
}

fn read_array(rd: &mut Cursor<&[u8]>, len: usize, depth: usize) -> Result<MsgValue> {
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(read_value(rd, depth + 1)?);
    }
    Ok(MsgValue::Array(items))
}

fn read_map(rd: &mut Cursor<&[u8]>, len: usize, depth: usize) -> Result<MsgValue> {
    let mut entries = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        let key = read_value(rd, depth + 1)?;
        let value = read_value(rd, depth + 1)?;
        entries.push((key, value));
    }
    Ok(MsgValue::Map(entries))
}

fn write_failed(err: impl fmt::Display) -> Error {
    Error::new(ErrorKind::Io, format!("MessagePack write: {err}"))
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::malformed(format!("{len} items do not fit MessagePack")))
}

pub fn encode(value: &MsgValue) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_value(&mut out, value)?;
    Ok(out)
}

fn write_value(out: &mut Vec<u8>, value: &MsgValue) -> Result<()> {
    match value {
        MsgValue::Nil => rmp::encode::write_nil(out).map_err(write_failed)?,
        MsgValue::Bool(flag) => rmp::encode::write_bool(out, *flag).map_err(write_failed)?,
        MsgValue::Int(number) => {
            rmp::encode::write_sint(out, *number).map_err(write_failed)?;
        }
        MsgValue::Uint(number) => {
            rmp::encode::write_uint(out, *number).map_err(write_failed)?;
        }
        MsgValue::F32(number) => rmp::encode::write_f32(out, *number).map_err(write_failed)?,
        MsgValue::F64(number) => rmp::encode::write_f64(out, *number).map_err(write_failed)?,
        MsgValue::Str(text) => rmp::encode::write_str(out, text).map_err(write_failed)?,
        MsgValue::Bin(bytes) => rmp::encode::write_bin(out, bytes).map_err(write_failed)?,
        MsgValue::Array(items) => {
            rmp::encode::write_array_len(out, len_u32(items.len())?).map_err(write_failed)?;
            for item in items {
                write_value(out, item)?;
            }
        }
        MsgValue::Map(entries) => {
            rmp::encode::write_map_len(out, len_u32(entries.len())?).map_err(write_failed)?;
            for (key, item) in entries {
                write_value(out, key)?;
                write_value(out, item)?;
            }
        }
    }
    Ok(())
}
