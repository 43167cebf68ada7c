//! The MMTF binary array codecs, numbered 1 to 10. Every encoded field starts
//! with a 12-byte big-endian header: codec id, decoded length, parameter.

use byteorder::{BigEndian, ByteOrder};

use crate::bcif::encoding::{delta_decode, integer_unpack, run_length_decode};
use crate::bcif::{format_f32, format_f64};
use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 12;

/// A decoded MMTF array.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Floats32(Vec<f32>),
    Strings(Vec<String>),
}

impl Array {
    pub fn len(&self) -> usize {
        match self {
            Array::Ints(values) => values.len(),
            Array::Floats(values) => values.len(),
            Array::Floats32(values) => values.len(),
            Array::Strings(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn texts(&self) -> Vec<String> {
        match self {
            Array::Ints(values) => values.iter().map(i64::to_string).collect(),
            Array::Floats(values) => values.iter().copied().map(format_f64).collect(),
            Array::Floats32(values) => values.iter().copied().map(format_f32).collect(),
            Array::Strings(values) => values.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub codec: i32,
    pub length: usize,
    pub param: i32,
}

/// Encoded fields begin with a codec id below 2^24, so their first byte is
/// always zero.
pub fn looks_encoded(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && bytes[0] == 0
}

pub fn read_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::malformed("MMTF field shorter than its header"));
    }
    let length = BigEndian::read_i32(&bytes[4..8]);
    Ok(Header {
        codec: BigEndian::read_i32(&bytes[0..4]),
        length: usize::try_from(length)
            .map_err(|_| Error::malformed(format!("negative MMTF array length {length}")))?,
        param: BigEndian::read_i32(&bytes[8..12]),
    })
}

fn exact<'a>(body: &'a [u8], width: usize, count: usize) -> Result<&'a [u8]> {
    let needed = width
        .checked_mul(count)
        .ok_or_else(|| Error::malformed("MMTF array length overflow"))?;
    if body.len() < needed {
        return Err(Error::malformed(format!(
            "MMTF array needs {needed} bytes, found {}",
            body.len()
        )));
    }
    Ok(&body[..needed])
}

fn i32_stream(body: &[u8]) -> Result<Vec<i64>> {
    if body.len() % 4 != 0 {
        return Err(Error::malformed("MMTF 32-bit stream has a ragged length"));
    }
    Ok(body
        .chunks_exact(4)
        .map(|chunk| i64::from(BigEndian::read_i32(chunk)))
        .collect())
}

fn divide(values: Vec<i64>, divisor: i32) -> Result<Array> {
    if divisor == 0 {
        return Err(Error::malformed("MMTF divisor of zero"));
    }
    let divisor = f64::from(divisor);
    Ok(Array::Floats(
        values.into_iter().map(|value| value as f64 / divisor).collect(),
    ))
}

pub fn decode(bytes: &[u8]) -> Result<Array> {
    let header = read_header(bytes)?;
    let body = &bytes[HEADER_LEN..];
    let length = header.length;
    match header.codec {
        1 => Ok(Array::Floats32(
            exact(body, 4, length)?
                .chunks_exact(4)
                .map(BigEndian::read_f32)
                .collect(),
        )),
        2 => Ok(Array::Ints(
            exact(body, 1, length)?
                .iter()
                .map(|&byte| i64::from(byte as i8))
                .collect(),
        )),
        3 => Ok(Array::Ints(
            exact(body, 2, length)?
                .chunks_exact(2)
                .map(|chunk| i64::from(BigEndian::read_i16(chunk)))
                .collect(),
        )),
        4 => Ok(Array::Ints(
            exact(body, 4, length)?
                .chunks_exact(4)
                .map(|chunk| i64::from(BigEndian::read_i32(chunk)))
                .collect(),
        )),
        5 => {
            let width = usize::try_from(header.param)
                .ok()
                .filter(|&width| width > 0)
                .ok_or_else(|| Error::malformed("MMTF string codec needs a positive length"))?;
            let strings = exact(body, width, length)?
                .chunks_exact(width)
                .map(|chunk| {
                    let end = chunk.iter().position(|&b| b == 0).unwrap_or(chunk.len());
                    String::from_utf8(chunk[..end].to_vec())
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Array::Strings(strings))
        }
        6 => {
            let values = run_length_decode(&i32_stream(body)?, length)?;
            let chars = values
                .into_iter()
                .map(|code| match code {
                    0 => Ok(String::new()),
                    code => u32::try_from(code)
                        .ok()
                        .and_then(char::from_u32)
                        .map(String::from)
                        .ok_or_else(|| Error::malformed(format!("invalid character code {code}"))),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Array::Strings(chars))
        }
        7 => Ok(Array::Ints(run_length_decode(&i32_stream(body)?, length)?)),
        8 => Ok(Array::Ints(delta_decode(
            &run_length_decode(&i32_stream(body)?, length)?,
            0,
        )?)),
        9 => divide(run_length_decode(&i32_stream(body)?, length)?, header.param),
        10 => {
            if body.len() % 2 != 0 {
                return Err(Error::malformed("MMTF 16-bit stream has a ragged length"));
            }
            let packed: Vec<i64> = body
                .chunks_exact(2)
                .map(|chunk| i64::from(BigEndian::read_i16(chunk)))
                .collect();
            let values = delta_decode(&integer_unpack(&packed, 2, false)?, 0)?;
            if values.len() != length {
                return Err(Error::malformed(format!(
                    "MMTF codec 10 produced {} values, expected {length}",
                    values.len()
                )));
            }
            divide(values, header.param)
        }
        other => Err(Error::unsupported(format!("MMTF codec {other}"))),
    }
}

#[cfg(test)]
pub(crate) fn encode_header(codec: i32, length: i32, param: i32) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN];
    BigEndian::write_i32(&mut out[0..4], codec);
    BigEndian::write_i32(&mut out[4..8], length);
    BigEndian::write_i32(&mut out[8..12], param);
    out
}

#[cfg(test)]
pub(crate) fn encode_i32s(codec: i32, length: i32, param: i32, values: &[i32]) -> Vec<u8> {
    let mut out = encode_header(codec, length, param);
    for &value in values {
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, value);
        out.extend_from_slice(&buf);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn fixed_width_codecs() {
        let mut floats = encode_header(1, 2, 0);
        floats.extend_from_slice(&1.5f32.to_be_bytes());
        floats.extend_from_slice(&(-2.25f32).to_be_bytes());
        assert_eq!(decode(&floats).expect("codec 1"), Array::Floats32(vec![1.5, -2.25]));

        let mut bytes = encode_header(2, 2, 0);
        bytes.extend_from_slice(&[0xff, 0x05]);
        assert_eq!(decode(&bytes).expect("codec 2"), Array::Ints(vec![-1, 5]));

        let mut shorts = encode_header(3, 1, 0);
        shorts.extend_from_slice(&(-300i16).to_be_bytes());
        assert_eq!(decode(&shorts).expect("codec 3"), Array::Ints(vec![-300]));

        let ints = encode_i32s(4, 2, 0, &[70_000, -1]);
        assert_eq!(decode(&ints).expect("codec 4"), Array::Ints(vec![70_000, -1]));
    }

    #[test]
    fn string_codecs() {
        let mut fixed = encode_header(5, 2, 4);
        fixed.extend_from_slice(b"A\0\0\0BC\0\0");
        assert_eq!(
            decode(&fixed).expect("codec 5"),
            Array::Strings(vec!["A".to_string(), "BC".to_string()])
        );

        let chars = encode_i32s(6, 3, 0, &[65, 2, 0, 1]);
        assert_eq!(
            decode(&chars).expect("codec 6"),
            Array::Strings(vec!["A".to_string(), "A".to_string(), String::new()])
        );
    }

    #[test]
    fn run_length_family() {
        assert_eq!(
            decode(&encode_i32s(7, 4, 0, &[1, 3, 9, 1])).expect("codec 7"),
            Array::Ints(vec![1, 1, 1, 9])
        );
        assert_eq!(
            decode(&encode_i32s(8, 4, 0, &[1, 4])).expect("codec 8"),
            Array::Ints(vec![1, 2, 3, 4])
        );
        assert_eq!(
            decode(&encode_i32s(9, 2, 100, &[150, 2])).expect("codec 9"),
            Array::Floats(vec![1.5, 1.5])
        );
    }

    #[test]
    fn recursive_index_codec() {
        let mut bytes = encode_header(10, 3, 1000);
        for value in [3696i16, 32767, 1000, -500] {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        assert_eq!(
            decode(&bytes).expect("codec 10"),
            Array::Floats(vec![3.696, 37.463, 36.963])
        );
    }

    #[test]
    fn unknown_codec_is_unsupported() {
        let err = decode(&encode_header(11, 0, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);
        let err = decode(&encode_header(4, 2, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
