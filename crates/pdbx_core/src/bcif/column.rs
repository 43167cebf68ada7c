//! Conversion between decoded column arrays and dictionary cells.

use crate::bcif::encoding::{
    encode_integers, encode_packed, encode_strings, run_length_encode, ColumnData, DataType,
    Encoding,
};
use crate::error::Result;
use crate::model::Value;

/// Shortest text that reads back as the same `f64`, with a trailing `.0`
/// on integral values.
pub fn format_f64(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

pub fn format_f32(value: f32) -> String {
    if !value.is_finite() {
        return format_f64(f64::from(value));
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

/// Multi-line strings collapse to one line when they hold no spaces, and
/// otherwise keep their lines with surrounding whitespace trimmed.
fn normalize_newlines(text: String) -> String {
    if !text.contains('\n') {
        return text;
    }
    if !text.contains(' ') {
        return text.split('\n').collect();
    }
    text.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns a decoded column into cells, letting mask values 1 and 2 stand in
/// for `.` and `?`.
pub(crate) fn to_values(data: ColumnData, mask: Option<&[i64]>) -> Vec<Value> {
    let texts: Vec<String> = match data {
        ColumnData::Bytes(values) => values.iter().map(u8::to_string).collect(),
        ColumnData::Ints(values) => values.iter().map(i64::to_string).collect(),
        ColumnData::Floats(values) => values.into_iter().map(format_f64).collect(),
        ColumnData::Floats32(values) => values.into_iter().map(format_f32).collect(),
        ColumnData::Strings(values) => values
            .into_iter()
            .map(|value| normalize_newlines(value.unwrap_or_default()))
            .collect(),
    };
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| match mask.and_then(|mask| mask.get(index)) {
            Some(1) => Value::Inapplicable,
            Some(2) => Value::Unknown,
            _ => Value::from(text),
        })
        .collect()
}

/// Encoded bytes plus the steps that produced them.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Encoded {
    pub data: Vec<u8>,
    pub encoding: Vec<Encoding>,
}

impl From<(Vec<u8>, Vec<Encoding>)> for Encoded {
    fn from((data, encoding): (Vec<u8>, Vec<Encoding>)) -> Self {
        Self { data, encoding }
    }
}

fn mask_code(value: &Value) -> i64 {
    match value {
        Value::Text(_) => 0,
        Value::Inapplicable => 1,
        Value::Unknown => 2,
    }
}

fn as_integer(text: &str) -> Option<i64> {
    let value: i64 = text.parse().ok()?;
    (value.to_string() == text && i32::try_from(value).is_ok()).then_some(value)
}

/// Digits after the point of a plain `-12.345` style decimal.
fn decimal_places(text: &str) -> Option<usize> {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = unsigned.split_once('.')?;
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    (digits(whole) && digits(fraction)).then_some(fraction.len())
}

fn integer_column(values: &[&Value]) -> Option<Vec<i64>> {
    values
        .iter()
        .map(|value| match value.known() {
            None => Some(0),
            Some(text) => as_integer(text),
        })
        .collect()
}

fn decimal_column(values: &[&Value]) -> Option<(f64, Vec<i64>)> {
    let places = values
        .iter()
        .filter_map(|value| value.known())
        .map(decimal_places)
        .collect::<Option<Vec<_>>>()?;
    let places = places.into_iter().max()?;
    if places > 9 {
        return None;
    }
    let factor = 10f64.powi(places as i32);
    values
        .iter()
        .map(|value| match value.known() {
            None => Some(0),
            Some(text) => {
                let scaled = (text.parse::<f64>().ok()? * factor).round();
                let scaled = scaled as i64;
                (format_f64(scaled as f64 / factor) == text).then_some(scaled)
            }
        })
        .collect::<Option<Vec<_>>>()
        .map(|scaled| (factor, scaled))
}

fn encode_mask(values: &[&Value]) -> Result<Option<Encoded>> {
    if values.iter().all(|value| !value.is_missing()) {
        return Ok(None);
    }
    let mask: Vec<i64> = values.iter().map(|value| mask_code(value)).collect();
    let runs = run_length_encode(&mask);
    if runs.len() < mask.len() {
        let (data, rest) = encode_packed(&runs, false)?;
        let mut encoding = vec![Encoding::RunLength {
            src_size: mask.len(),
            src_type: DataType::Uint8,
        }];
        encoding.extend(rest);
        Ok(Some(Encoded { data, encoding }))
    } else {
        Ok(Some(encode_packed(&mask, false)?.into()))
    }
}

fn encode_numeric(values: &[&Value]) -> Option<Encoded> {
    if let Some(integers) = integer_column(values) {
        return encode_integers(&integers).ok().map(Encoded::from);
    }
    let (factor, scaled) = decimal_column(values)?;
    let (data, rest) = encode_integers(&scaled).ok()?;
    let mut encoding = vec![Encoding::FixedPoint {
        factor,
        src_type: DataType::Float64,
    }];
    encoding.extend(rest);
    Some(Encoded { data, encoding })
}

/// Chooses an encoding for one column. Numeric encodings are only used when
/// every cell decodes back to identical text.
pub(crate) fn encode_column(values: &[&Value]) -> Result<(Encoded, Option<Encoded>)> {
    let mask = encode_mask(values)?;
    if values.iter().any(|value| !value.is_missing()) {
        if let Some(encoded) = encode_numeric(values) {
            return Ok((encoded, mask));
        }
    }
    let strings: Vec<Option<&str>> = values.iter().map(|value| value.known()).collect();
    Ok((encode_strings(&strings)?.into(), mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcif::encoding::decode_chain;
    use pretty_assertions::assert_eq;

    fn round_trip(texts: &[&str]) -> (Vec<Value>, Encoded) {
        let values: Vec<Value> = texts.iter().map(|text| Value::from(*text)).collect();
        let refs: Vec<&Value> = values.iter().collect();
        let (data, mask) = encode_column(&refs).expect("encoded");
        let decoded = decode_chain(&data.data, &data.encoding).expect("decoded");
        let mask = mask.map(|mask| {
            decode_chain(&mask.data, &mask.encoding)
                .and_then(|decoded| decoded.into_ints("mask"))
                .expect("mask")
        });
        let back = to_values(decoded, mask.as_deref());
        assert_eq!(back, values);
        (back, data)
    }

    #[test]
    fn float_text() {
        assert_eq!(format_f64(3.0), "3.0");
        assert_eq!(format_f64(-0.012), "-0.012");
        assert_eq!(format_f32(1.1), "1.1");
        assert_eq!(format_f64(f64::NAN), "nan");
    }

    #[test]
    fn newline_collapse() {
        assert_eq!(normalize_newlines("AB\nCD".to_string()), "ABCD");
        assert_eq!(normalize_newlines("first line \n  second".to_string()), "first line\nsecond");
    }

    #[test]
    fn masks_replace_values() {
        let values = to_values(ColumnData::Ints(vec![5, 0, 0]), Some(&[0, 1, 2][..]));
        assert_eq!(values, vec![Value::from("5"), Value::Inapplicable, Value::Unknown]);
    }

    #[test]
    fn integer_columns_use_delta() {
        let (_, data) = round_trip(&["1", "2", "3", "?", "5"]);
        assert!(matches!(data.encoding[0], Encoding::Delta { .. }));
    }

    #[test]
    fn decimal_columns_use_fixed_point() {
        let (_, data) = round_trip(&["3.696", "-12.5", "0.001"]);
        assert!(matches!(data.encoding[0], Encoding::FixedPoint { factor, .. } if factor == 1000.0));
    }

    #[test]
    fn lossy_numbers_fall_back_to_strings() {
        let (_, data) = round_trip(&["1.00", "0.50"]);
        assert!(matches!(data.encoding[0], Encoding::StringArray { .. }));
        let (_, data) = round_trip(&["007", "8"]);
        assert!(matches!(data.encoding[0], Encoding::StringArray { .. }));
    }

    #[test]
    fn string_columns_keep_markers_and_empties() {
        round_trip(&["ALA", ".", "", "?", "GLY", "ALA"]);
        round_trip(&["?", "?"]);
    }
}
