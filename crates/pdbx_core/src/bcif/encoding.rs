//! BinaryCIF column encodings. Each [`Encoding`] is one step of a stack; a
//! column lists its steps in the order they were applied while encoding, so
//! decoding walks the list backwards.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::msgpack::MsgValue;

/// Element type of a typed array inside an encoding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
}

impl DataType {
    pub fn from_code(code: i64) -> Result<Self> {
        Ok(match code {
            1 => DataType::Int8,
            2 => DataType::Int16,
            3 => DataType::Int32,
            4 => DataType::Uint8,
            5 => DataType::Uint16,
            6 => DataType::Uint32,
            32 => DataType::Float32,
            33 => DataType::Float64,
            other => return Err(Error::unsupported(format!("unknown array type {other}"))),
        })
    }

    pub fn code(self) -> i64 {
        match self {
            DataType::Int8 => 1,
            DataType::Int16 => 2,
            DataType::Int32 => 3,
            DataType::Uint8 => 4,
            DataType::Uint16 => 5,
            DataType::Uint32 => 6,
            DataType::Float32 => 32,
            DataType::Float64 => 33,
        }
    }

    pub fn width(self) -> usize {
        match self {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    fn packed(byte_count: u8, is_unsigned: bool) -> Result<Self> {
        match (byte_count, is_unsigned) {
            (1, false) => Ok(DataType::Int8),
            (1, true) => Ok(DataType::Uint8),
            (2, false) => Ok(DataType::Int16),
            (2, true) => Ok(DataType::Uint16),
            (4, false) => Ok(DataType::Int32),
            (4, true) => Ok(DataType::Uint32),
            _ => Err(Error::malformed(format!("cannot pack into {byte_count} bytes"))),
        }
    }
}

/// Values flowing between encoding steps.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Bytes(Vec<u8>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Floats32(Vec<f32>),
    /// `None` is a null string-array index.
    Strings(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bytes(values) => values.len(),
            ColumnData::Ints(values) => values.len(),
            ColumnData::Floats(values) => values.len(),
            ColumnData::Floats32(values) => values.len(),
            ColumnData::Strings(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            ColumnData::Bytes(_) => "bytes",
            ColumnData::Ints(_) => "integers",
            ColumnData::Floats(_) | ColumnData::Floats32(_) => "floats",
            ColumnData::Strings(_) => "strings",
        }
    }

    fn into_bytes(self, step: &str) -> Result<Vec<u8>> {
        match self {
            ColumnData::Bytes(bytes) => Ok(bytes),
            other => Err(Error::malformed(format!(
                "{step} expects bytes, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_ints(self, step: &str) -> Result<Vec<i64>> {
        match self {
            ColumnData::Ints(values) => Ok(values),
            ColumnData::Bytes(bytes) => Ok(bytes.into_iter().map(i64::from).collect()),
            other => Err(Error::malformed(format!(
                "{step} expects integers, got {}",
                other.kind()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Encoding {
    ByteArray {
        data_type: DataType,
    },
    FixedPoint {
        factor: f64,
        src_type: DataType,
    },
    IntervalQuantization {
        min: f64,
        max: f64,
        num_steps: i64,
        src_type: DataType,
    },
    RunLength {
        src_size: usize,
        src_type: DataType,
    },
    Delta {
        origin: i64,
        src_type: DataType,
    },
    IntegerPacking {
        byte_count: u8,
        is_unsigned: bool,
        src_size: Option<usize>,
    },
    StringArray {
        data_encoding: Vec<Encoding>,
        string_data: String,
        offset_encoding: Vec<Encoding>,
        offsets: Vec<u8>,
    },
}

impl Encoding {
    pub fn kind(&self) -> &'static str {
        match self {
            Encoding::ByteArray { .. } => "ByteArray",
            Encoding::FixedPoint { .. } => "FixedPoint",
            Encoding::IntervalQuantization { .. } => "IntervalQuantization",
            Encoding::RunLength { .. } => "RunLength",
            Encoding::Delta { .. } => "Delta",
            Encoding::IntegerPacking { .. } => "IntegerPacking",
            Encoding::StringArray { .. } => "StringArray",
        }
    }

    /// Reverses this one step.
    pub fn decode(&self, input: ColumnData) -> Result<ColumnData> {
        match self {
            Encoding::ByteArray { data_type } => {
                decode_byte_array(&input.into_bytes("ByteArray")?, *data_type)
            }
            Encoding::FixedPoint { factor, src_type } => {
                let values = input.into_ints("FixedPoint")?;
                if *factor == 0.0 {
                    return Err(Error::malformed("FixedPoint factor of zero"));
                }
                Ok(floats(values.iter().map(|&v| v as f64 / factor), *src_type))
            }
            Encoding::IntervalQuantization {
                min,
                max,
                num_steps,
                src_type,
            } => {
                let values = input.into_ints("IntervalQuantization")?;
                let step = if *num_steps > 1 {
                    (max - min) / (*num_steps - 1) as f64
                } else {
                    0.0
                };
                Ok(floats(values.iter().map(|&k| min + k as f64 * step), *src_type))
            }
            Encoding::RunLength { src_size, .. } => Ok(ColumnData::Ints(run_length_decode(
                &input.into_ints("RunLength")?,
                *src_size,
            )?)),
            Encoding::Delta { origin, .. } => Ok(ColumnData::Ints(delta_decode(
                &input.into_ints("Delta")?,
                *origin,
            )?)),
            Encoding::IntegerPacking {
                byte_count,
                is_unsigned,
                src_size,
            } => {
                let values =
                    integer_unpack(&input.into_ints("IntegerPacking")?, *byte_count, *is_unsigned)?;
                if let Some(expected) = src_size {
                    if values.len() != *expected {
                        return Err(Error::malformed(format!(
                            "IntegerPacking produced {} values, expected {expected}",
                            values.len()
                        )));
                    }
                }
                Ok(ColumnData::Ints(values))
            }
            Encoding::StringArray {
                data_encoding,
                string_data,
                offset_encoding,
                offsets,
            } => {
                let indices = decode_chain(&input.into_bytes("StringArray")?, data_encoding)?
                    .into_ints("StringArray indices")?;
                let offsets = decode_chain(offsets, offset_encoding)?
                    .into_ints("StringArray offsets")?;
                decode_string_array(&indices, string_data, &offsets)
            }
        }
    }

    pub fn from_msgpack(value: &MsgValue) -> Result<Self> {
        let kind = value.field_str("kind")?;
        Ok(match kind {
            "ByteArray" => Encoding::ByteArray {
                data_type: DataType::from_code(value.field_i64("type")?)?,
            },
            "FixedPoint" => Encoding::FixedPoint {
                factor: value.field_f64("factor")?,
                src_type: src_type(value)?,
            },
            "IntervalQuantization" => Encoding::IntervalQuantization {
                min: value.field_f64("min")?,
                max: value.field_f64("max")?,
                num_steps: value.field_i64("numSteps")?,
                src_type: src_type(value)?,
            },
            "RunLength" => Encoding::RunLength {
                src_size: size(value.field_i64("srcSize")?)?,
                src_type: src_type(value)?,
            },
            "Delta" => Encoding::Delta {
                origin: value.field_i64("origin")?,
                src_type: src_type(value)?,
            },
            "IntegerPacking" => Encoding::IntegerPacking {
                byte_count: u8::try_from(value.field_i64("byteCount")?)
                    .map_err(|_| Error::malformed("IntegerPacking byteCount out of range"))?,
                is_unsigned: value
                    .field("isUnsigned")?
                    .as_bool()
                    .ok_or_else(|| Error::malformed("isUnsigned is not a boolean"))?,
                src_size: value
                    .get("srcSize")
                    .and_then(MsgValue::as_i64)
                    .map(size)
                    .transpose()?,
            },
            "StringArray" => Encoding::StringArray {
                data_encoding: chain_from_msgpack(value.field_array("dataEncoding")?)?,
                string_data: value.field_str("stringData")?.to_string(),
                offset_encoding: chain_from_msgpack(value.field_array("offsetEncoding")?)?,
                offsets: value.field_bin("offsets")?.to_vec(),
            },
            other => return Err(Error::unsupported(format!("unknown encoding kind {other:?}"))),
        })
    }

    pub fn to_msgpack(&self) -> MsgValue {
        let mut entries = vec![("kind", MsgValue::str(self.kind()))];
        match self {
            Encoding::ByteArray { data_type } => {
                entries.push(("type", MsgValue::Int(data_type.code())));
            }
            Encoding::FixedPoint { factor, src_type } => {
                entries.push(("factor", number(*factor)));
                entries.push(("srcType", MsgValue::Int(src_type.code())));
            }
            Encoding::IntervalQuantization {
                min,
                max,
                num_steps,
                src_type,
            } => {
                entries.push(("min", number(*min)));
                entries.push(("max", number(*max)));
                entries.push(("numSteps", MsgValue::Int(*num_steps)));
                entries.push(("srcType", MsgValue::Int(src_type.code())));
            }
            Encoding::RunLength { src_size, src_type } => {
                entries.push(("srcType", MsgValue::Int(src_type.code())));
                entries.push(("srcSize", MsgValue::Uint(*src_size as u64)));
            }
            Encoding::Delta { origin, src_type } => {
                entries.push(("origin", MsgValue::Int(*origin)));
                entries.push(("srcType", MsgValue::Int(src_type.code())));
            }
            Encoding::IntegerPacking {
                byte_count,
                is_unsigned,
                src_size,
            } => {
                entries.push(("byteCount", MsgValue::Int(i64::from(*byte_count))));
                entries.push(("isUnsigned", MsgValue::Bool(*is_unsigned)));
                if let Some(src_size) = src_size {
                    entries.push(("srcSize", MsgValue::Uint(*src_size as u64)));
                }
            }
            Encoding::StringArray {
                data_encoding,
                string_data,
                offset_encoding,
                offsets,
            } => {
                entries.push(("dataEncoding", chain_to_msgpack(data_encoding)));
                entries.push(("stringData", MsgValue::str(string_data.as_str())));
                entries.push(("offsetEncoding", chain_to_msgpack(offset_encoding)));
                entries.push(("offsets", MsgValue::Bin(offsets.clone())));
            }
        }
        MsgValue::map(entries)
    }
}

fn src_type(value: &MsgValue) -> Result<DataType> {
    match value.get("srcType").and_then(MsgValue::as_i64) {
        Some(code) => DataType::from_code(code),
        None => Ok(DataType::Int32),
    }
}

fn size(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::malformed(format!("negative size {value}")))
}

/// Integral floats are written as integers, the way other encoders do.
fn number(value: f64) -> MsgValue {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        MsgValue::Int(value as i64)
    } else {
        MsgValue::F64(value)
    }
}

pub fn chain_from_msgpack(values: &[MsgValue]) -> Result<Vec<Encoding>> {
    values.iter().map(Encoding::from_msgpack).collect()
}

pub fn chain_to_msgpack(chain: &[Encoding]) -> MsgValue {
    MsgValue::Array(chain.iter().map(Encoding::to_msgpack).collect())
}

/// Undoes a whole encoding stack, innermost step first.
pub fn decode_chain(data: &[u8], chain: &[Encoding]) -> Result<ColumnData> {
    chain
        .iter()
        .rev()
        .try_fold(ColumnData::Bytes(data.to_vec()), |current, step| {
            step.decode(current)
        })
}

fn floats(values: impl Iterator<Item = f64>, src_type: DataType) -> ColumnData {
    match src_type {
        DataType::Float32 => ColumnData::Floats32(values.map(|v| v as f32).collect()),
        _ => ColumnData::Floats(values.collect()),
    }
}

fn decode_byte_array(bytes: &[u8], data_type: DataType) -> Result<ColumnData> {
    let width = data_type.width();
    if bytes.len() % width != 0 {
        return Err(Error::malformed(format!(
            "{} bytes do not divide into elements of {width} bytes",
            bytes.len()
        )));
    }
    let chunks = bytes.chunks_exact(width);
    Ok(match data_type {
        DataType::Int8 => ColumnData::Ints(bytes.iter().map(|&b| i64::from(b as i8)).collect()),
        DataType::Uint8 => ColumnData::Ints(bytes.iter().map(|&b| i64::from(b)).collect()),
        DataType::Int16 => {
            ColumnData::Ints(chunks.map(|c| i64::from(LittleEndian::read_i16(c))).collect())
        }
        DataType::Uint16 => {
            ColumnData::Ints(chunks.map(|c| i64::from(LittleEndian::read_u16(c))).collect())
        }
        DataType::Int32 => {
            ColumnData::Ints(chunks.map(|c| i64::from(LittleEndian::read_i32(c))).collect())
        }
        DataType::Uint32 => {
            ColumnData::Ints(chunks.map(|c| i64::from(LittleEndian::read_u32(c))).collect())
        }
        DataType::Float32 => ColumnData::Floats32(chunks.map(LittleEndian::read_f32).collect()),
        DataType::Float64 => ColumnData::Floats(chunks.map(LittleEndian::read_f64).collect()),
    })
}

pub fn encode_byte_array(values: &[i64], data_type: DataType) -> Result<Vec<u8>> {
    let mut out = vec![0u8; values.len() * data_type.width()];
    let out_of_range = |value: i64| Error::malformed(format!("{value} does not fit {data_type:?}"));
    for (value, slot) in values.iter().zip(out.chunks_exact_mut(data_type.width())) {
        let value = *value;
        match data_type {
            DataType::Int8 => slot[0] = i8::try_from(value).map_err(|_| out_of_range(value))? as u8,
            DataType::Uint8 => slot[0] = u8::try_from(value).map_err(|_| out_of_range(value))?,
            DataType::Int16 => LittleEndian::write_i16(
                slot,
                i16::try_from(value).map_err(|_| out_of_range(value))?,
            ),
            DataType::Uint16 => LittleEndian::write_u16(
                slot,
                u16::try_from(value).map_err(|_| out_of_range(value))?,
            ),
            DataType::Int32 => LittleEndian::write_i32(
                slot,
                i32::try_from(value).map_err(|_| out_of_range(value))?,
            ),
            DataType::Uint32 => LittleEndian::write_u32(
                slot,
                u32::try_from(value).map_err(|_| out_of_range(value))?,
            ),
            DataType::Float32 => LittleEndian::write_f32(slot, value as f32),
            DataType::Float64 => LittleEndian::write_f64(slot, value as f64),
        }
    }
    Ok(out)
}

pub fn delta_encode(values: &[i64]) -> Result<(i64, Vec<i64>)> {
    let origin = values.first().copied().unwrap_or(0);
    let mut previous = origin;
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        out.push(
            value
                .checked_sub(previous)
                .ok_or_else(|| Error::malformed("delta overflow"))?,
        );
        previous = value;
    }
    Ok((origin, out))
}

pub fn delta_decode(values: &[i64], origin: i64) -> Result<Vec<i64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut current = origin;
    for (index, &delta) in values.iter().enumerate() {
        current = if index == 0 {
            origin.checked_add(delta)
        } else {
            current.checked_add(delta)
        }
        .ok_or_else(|| Error::malformed("delta overflow"))?;
        out.push(current);
    }
    Ok(out)
}

/// Interleaved `(value, count)` pairs.
pub fn run_length_encode(values: &[i64]) -> Vec<i64> {
    let mut out = Vec::new();
    let mut iter = values.iter().copied().peekable();
    while let Some(value) = iter.next() {
        let mut count = 1;
        while iter.peek() == Some(&value) {
            iter.next();
            count += 1;
        }
        out.push(value);
        out.push(count);
    }
    out
}

pub fn run_length_decode(values: &[i64], src_size: usize) -> Result<Vec<i64>> {
    if values.len() % 2 != 0 {
        return Err(Error::malformed("RunLength data has an odd length"));
    }
    let mut out = Vec::with_capacity(src_size);
    for pair in values.chunks_exact(2) {
        let count = usize::try_from(pair[1])
            .map_err(|_| Error::malformed(format!("negative run length {}", pair[1])))?;
        if out.len() + count > src_size {
            return Err(Error::malformed(format!(
                "RunLength expands past its declared size {src_size}"
            )));
        }
        out.extend(std::iter::repeat(pair[0]).take(count));
    }
    if out.len() != src_size {
        return Err(Error::malformed(format!(
            "RunLength expanded to {} values, expected {src_size}",
            out.len()
        )));
    }
    Ok(out)
}

/// `(upper, lower)` extremum markers for a packing width.
fn packing_limits(byte_count: u8, is_unsigned: bool) -> Result<(i64, i64)> {
    let span: i64 = match byte_count {
        1 => 1 << 8,
        2 => 1 << 16,
        other => {
            return Err(Error::malformed(format!(
                "IntegerPacking byteCount {other} is not 1 or 2"
            )))
        }
    };
    Ok(if is_unsigned {
        (span - 1, 0)
    } else {
        (span / 2 - 1, -span / 2)
    })
}

/// Splits values into cells of `byte_count` bytes. A cell holding an
/// extremum means the next cell continues the same value.
pub fn integer_pack(values: &[i64], byte_count: u8, is_unsigned: bool) -> Result<Vec<i64>> {
    let (upper, lower) = packing_limits(byte_count, is_unsigned)?;
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        let mut value = value;
        if value >= 0 {
            while value >= upper {
                out.push(upper);
                value -= upper;
            }
        } else {
            if is_unsigned {
                return Err(Error::malformed(format!(
                    "cannot pack negative {value} as unsigned"
                )));
            }
            while value <= lower {
                out.push(lower);
                value -= lower;
            }
        }
        out.push(value);
    }
    Ok(out)
}

pub fn integer_unpack(values: &[i64], byte_count: u8, is_unsigned: bool) -> Result<Vec<i64>> {
    let (upper, lower) = packing_limits(byte_count, is_unsigned)?;
    let mut out = Vec::with_capacity(values.len());
    let mut accumulated: i64 = 0;
    let mut continuing = false;
    for &value in values {
        accumulated = accumulated
            .checked_add(value)
            .ok_or_else(|| Error::malformed("integer packing overflow"))?;
        if value == upper || (!is_unsigned && value == lower) {
            continuing = true;
            continue;
        }
        out.push(accumulated);
        accumulated = 0;
        continuing = false;
    }
    if continuing {
        return Err(Error::malformed("integer packing ends inside a value"));
    }
    Ok(out)
}

/// Number of packed cells `values` would need.
fn packed_len(values: &[i64], byte_count: u8, is_unsigned: bool) -> Option<usize> {
    let (upper, lower) = packing_limits(byte_count, is_unsigned).ok()?;
    let mut total = 0usize;
    for &value in values {
        total += if value >= 0 {
            (value / upper) as usize + 1
        } else if is_unsigned {
            return None;
        } else {
            (value / lower) as usize + 1
        };
    }
    Some(total)
}

/// Packs integers into the narrowest array that is smaller than plain
/// 32-bit storage, falling back to `Int32` when packing does not pay off.
pub fn encode_packed(values: &[i64], force_signed: bool) -> Result<(Vec<u8>, Vec<Encoding>)> {
    let is_unsigned = !force_signed && values.iter().all(|&value| value >= 0);
    let plain = values.len() * 4;
    let best = [1u8, 2]
        .into_iter()
        .filter_map(|byte_count| {
            packed_len(values, byte_count, is_unsigned)
                .map(|cells| (byte_count, cells * usize::from(byte_count)))
        })
        .filter(|&(_, bytes)| bytes < plain)
        .min_by_key(|&(_, bytes)| bytes);

    match best {
        Some((byte_count, _)) => {
            let packed = integer_pack(values, byte_count, is_unsigned)?;
            let data_type = DataType::packed(byte_count, is_unsigned)?;
            Ok((
                encode_byte_array(&packed, data_type)?,
                vec![
                    Encoding::IntegerPacking {
                        byte_count,
                        is_unsigned,
                        src_size: Some(values.len()),
                    },
                    Encoding::ByteArray { data_type },
                ],
            ))
        }
        None => Ok((
            encode_byte_array(values, DataType::Int32)?,
            vec![Encoding::ByteArray {
                data_type: DataType::Int32,
            }],
        )),
    }
}

/// `Delta` then packing, for columns of plain integers.
pub fn encode_integers(values: &[i64]) -> Result<(Vec<u8>, Vec<Encoding>)> {
    let (origin, deltas) = delta_encode(values)?;
    let (bytes, rest) = encode_packed(&deltas, true)?;
    let mut chain = vec![Encoding::Delta {
        origin,
        src_type: DataType::Int32,
    }];
    chain.extend(rest);
    Ok((bytes, chain))
}

/// Offsets are byte positions in the UTF-8 pool.
fn decode_string_array(indices: &[i64], pool: &str, offsets: &[i64]) -> Result<ColumnData> {
    let bytes = pool.as_bytes();
    let byte_at = |offset: i64| -> Result<usize> {
        usize::try_from(offset)
            .ok()
            .filter(|&offset| offset <= bytes.len())
            .ok_or_else(|| Error::malformed(format!("string offset {offset} out of range")))
    };
    let mut strings = Vec::with_capacity(offsets.len().saturating_sub(1));
    for window in offsets.windows(2) {
        let (start, end) = (byte_at(window[0])?, byte_at(window[1])?);
        if start > end {
            return Err(Error::malformed("string offsets are not ascending"));
        }
        strings.push(std::str::from_utf8(&bytes[start..end])?);
    }
    let values = indices
        .iter()
        .map(|&index| match usize::try_from(index) {
            Err(_) => Ok(None),
            Ok(index) => strings
                .get(index)
                .map(|text| Some((*text).to_string()))
                .ok_or_else(|| Error::malformed(format!("string index {index} out of range"))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ColumnData::Strings(values))
}

/// Builds a `StringArray` step and the encoded index bytes for `values`.
pub fn encode_strings(values: &[Option<&str>]) -> Result<(Vec<u8>, Vec<Encoding>)> {
    let mut pool: Vec<&str> = Vec::new();
    let mut lookup = std::collections::HashMap::new();
    let mut indices = Vec::with_capacity(values.len());
    for value in values {
        match value {
            None => indices.push(-1),
            Some(text) => {
                let index = *lookup.entry(*text).or_insert_with(|| {
                    pool.push(*text);
                    pool.len() - 1
                });
                indices.push(index as i64);
            }
        }
    }

    let mut offsets = Vec::with_capacity(pool.len() + 1);
    let mut position = 0i64;
    offsets.push(position);
    for text in &pool {
        position += text.len() as i64;
        offsets.push(position);
    }
    let (offset_bytes, offset_encoding) = encode_integers(&offsets)?;

    let runs = run_length_encode(&indices);
    let (index_bytes, data_encoding) = if runs.len() < indices.len() {
        let (bytes, rest) = encode_packed(&runs, false)?;
        let mut chain = vec![Encoding::RunLength {
            src_size: indices.len(),
            src_type: DataType::Int32,
        }];
        chain.extend(rest);
        (bytes, chain)
    } else {
        encode_packed(&indices, false)?
    };

    Ok((
        index_bytes,
        vec![Encoding::StringArray {
            data_encoding,
            string_data: pool.concat(),
            offset_encoding,
            offsets: offset_bytes,
        }],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn delta_then_packing_matches_the_reference_bytes() {
        let (bytes, chain) = encode_integers(&[1000, 1003, 1005, 1006]).expect("encoded");
        assert_eq!(bytes, vec![0x00, 0x03, 0x02, 0x01]);
        assert_eq!(
            chain,
            vec![
                Encoding::Delta {
                    origin: 1000,
                    src_type: DataType::Int32
                },
                Encoding::IntegerPacking {
                    byte_count: 1,
                    is_unsigned: false,
                    src_size: Some(4)
                },
                Encoding::ByteArray {
                    data_type: DataType::Int8
                },
            ]
        );
        let decoded = decode_chain(&bytes, &chain).expect("decoded");
        assert_eq!(decoded, ColumnData::Ints(vec![1000, 1003, 1005, 1006]));
    }

    #[test]
    fn unsigned_packing_spills_into_the_next_cell() {
        let packed = integer_pack(&[1, 2, 5, 264, 3], 1, true).expect("packed");
        assert_eq!(packed, vec![1, 2, 5, 255, 9, 3]);
        assert_eq!(
            integer_unpack(&packed, 1, true).expect("unpacked"),
            vec![1, 2, 5, 264, 3]
        );
    }

    #[test]
    fn packing_at_the_extremum_adds_a_zero_cell() {
        assert_eq!(integer_pack(&[127, -128], 1, false).expect("packed"), vec![127, 0, -128, 0]);
        assert_eq!(
            integer_unpack(&[127, 0, -128, 0], 1, false).expect("unpacked"),
            vec![127, -128]
        );
    }

    #[test]
    fn string_array_slices_the_pool() {
        let decoded = decode_string_array(&[0, 1, 0, -1], "aAB", &[0, 1, 3]).expect("decoded");
        assert_eq!(
            decoded,
            ColumnData::Strings(vec![
                Some("a".to_string()),
                Some("AB".to_string()),
                Some("a".to_string()),
                None
            ])
        );
    }

    #[test]
    fn string_offsets_count_bytes() {
        let decoded = decode_string_array(&[0, 1], "éA", &[0, 2, 3]).expect("decoded");
        assert_eq!(
            decoded,
            ColumnData::Strings(vec![Some("é".to_string()), Some("A".to_string())])
        );
        let err = decode_string_array(&[0], "éA", &[0, 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Utf8);

        let (_, chain) = encode_strings(&[Some("é"), Some("A")]).expect("encoded");
        let Encoding::StringArray {
            offset_encoding,
            offsets,
            ..
        } = &chain[0]
        else {
            panic!("expected a string array");
        };
        let offsets = decode_chain(offsets, offset_encoding)
            .and_then(|decoded| decoded.into_ints("offsets"))
            .expect("offsets");
        assert_eq!(offsets, vec![0, 2, 3]);
    }

    #[test]
    fn string_columns_round_trip() {
        let values = [Some("ALA"), Some("ALA"), Some("ALA"), Some("GLY"), None, Some("Å")];
        let (bytes, chain) = encode_strings(&values).expect("encoded");
        let expected: Vec<Option<String>> = values.iter().map(|v| v.map(str::to_string)).collect();
        assert_eq!(decode_chain(&bytes, &chain).expect("decoded"), ColumnData::Strings(expected));
    }

    #[test]
    fn byte_arrays_are_little_endian() {
        let decoded = decode_byte_array(&[0x01, 0x02, 0xff, 0xff], DataType::Int16).expect("decoded");
        assert_eq!(decoded, ColumnData::Ints(vec![0x0201, -1]));
        let err = decode_byte_array(&[0x01, 0x02, 0x03], DataType::Int16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn fixed_point_and_quantization() {
        let fixed = Encoding::FixedPoint {
            factor: 1000.0,
            src_type: DataType::Float64,
        };
        assert_eq!(
            fixed.decode(ColumnData::Ints(vec![3696, -12])).expect("decoded"),
            ColumnData::Floats(vec![3.696, -0.012])
        );
        let quantized = Encoding::IntervalQuantization {
            min: 1.0,
            max: 2.0,
            num_steps: 3,
            src_type: DataType::Float64,
        };
        assert_eq!(
            quantized.decode(ColumnData::Ints(vec![0, 1, 2])).expect("decoded"),
            ColumnData::Floats(vec![1.0, 1.5, 2.0])
        );
    }

    #[test]
    fn run_length_size_mismatch_is_malformed() {
        let err = run_length_decode(&[7, 3], 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        let err = run_length_decode(&[7, 3, 1], 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn unknown_kinds_are_unsupported() {
        let step = MsgValue::map([("kind", MsgValue::str("Zstd"))]);
        let err = Encoding::from_msgpack(&step).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);
    }

    #[test]
    fn steps_survive_msgpack() {
        let (_, chain) = encode_strings(&[Some("x"), Some("y"), Some("x")]).expect("encoded");
        let value = chain_to_msgpack(&chain);
        let items = value.as_array().expect("array");
        assert_eq!(chain_from_msgpack(items).expect("parsed"), chain);
    }

    #[test]
    fn delta_overflow_is_malformed() {
        let err = delta_decode(&[1, i64::MAX], 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    proptest! {
        #[test]
        fn delta_round_trips(values in proptest::collection::vec(-1_000_000i64..1_000_000, 0..64)) {
            let (origin, deltas) = delta_encode(&values).unwrap();
            prop_assert_eq!(delta_decode(&deltas, origin).unwrap(), values);
        }

        #[test]
        fn run_length_round_trips(values in proptest::collection::vec(0i64..4, 0..64)) {
            let runs = run_length_encode(&values);
            prop_assert_eq!(run_length_decode(&runs, values.len()).unwrap(), values);
        }

        #[test]
        fn packing_round_trips(
            values in proptest::collection::vec(-70_000i64..70_000, 0..64),
            byte_count in 1u8..=2,
        ) {
            let packed = integer_pack(&values, byte_count, false).unwrap();
            prop_assert_eq!(integer_unpack(&packed, byte_count, false).unwrap(), values);
        }

        #[test]
        fn integer_columns_round_trip(values in proptest::collection::vec(-100_000i64..100_000, 0..64)) {
            let (bytes, chain) = encode_integers(&values).unwrap();
            prop_assert_eq!(decode_chain(&bytes, &chain).unwrap(), ColumnData::Ints(values));
        }
    }
}
