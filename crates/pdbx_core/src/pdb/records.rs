//! Fixed-column access to PDB lines plus the small value conversions shared by
//! the reader and the writer.

use chrono::{Datelike, NaiveDate};

use crate::model::Value;

/// One line of a PDB file, addressed by the 1-based inclusive column ranges
/// used in the format documentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    text: &'a str,
}

impl<'a> Line<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text: text.trim_end_matches(['\r', '\n']),
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn record(&self) -> &'a str {
        self.field(1, 6)
    }

    /// Columns `start..=end`, clipped to the line length.
    pub fn raw(&self, start: usize, end: usize) -> &'a str {
        let bytes = self.text.as_bytes();
        let from = start.saturating_sub(1).min(bytes.len());
        let to = end.min(bytes.len()).max(from);
        std::str::from_utf8(&bytes[from..to]).unwrap_or("")
    }

    pub fn field(&self, start: usize, end: usize) -> &'a str {
        self.raw(start, end).trim()
    }

    /// Trimmed field as a cell; blanks become `?`.
    pub fn value(&self, start: usize, end: usize) -> Value {
        match self.field(start, end) {
            "" => Value::Unknown,
            text => Value::text(text),
        }
    }

    /// Trimmed field that must parse as a number; anything else becomes `?`.
    pub fn number(&self, start: usize, end: usize) -> Value {
        number(self.field(start, end))
    }

    pub fn rest(&self, start: usize) -> &'a str {
        self.field(start, usize::MAX)
    }

    /// The REMARK number in columns 8-10.
    pub fn remark(&self) -> Option<u32> {
        (self.record() == "REMARK")
            .then(|| self.field(8, 10).parse().ok())
            .flatten()
    }
}

/// Numeric cell text, or `?` when the text does not parse.
pub(crate) fn number(text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        return Value::Unknown;
    }
    if text.parse::<f64>().is_ok() {
        Value::text(text)
    } else {
        tracing::trace!(text, "non-numeric PDB field replaced by ?");
        Value::Unknown
    }
}

pub(crate) fn text_or_unknown(text: &str) -> Value {
    if text.is_empty() {
        Value::Unknown
    } else {
        Value::text(text)
    }
}

/// All lines of a file, grouped on demand by record name.
pub(crate) struct Records<'a> {
    lines: Vec<Line<'a>>,
}

impl<'a> Records<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().map(Line::new).collect(),
        }
    }

    pub fn all(&self) -> &[Line<'a>] {
        &self.lines
    }

    pub fn named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = Line<'a>> + 's {
        self.lines
            .iter()
            .copied()
            .filter(move |line| line.record() == name)
    }

    pub fn first(&self, name: &str) -> Option<Line<'a>> {
        self.lines.iter().copied().find(|line| line.record() == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.first(name).is_some()
    }

    pub fn remarks(&self, number: u32) -> impl Iterator<Item = Line<'a>> + '_ {
        self.lines
            .iter()
            .copied()
            .filter(move |line| line.remark() == Some(number))
    }

    /// Text of a continued record starting at column `start`, pieces joined
    /// by single spaces.
    pub fn joined(&self, name: &str, start: usize) -> Option<String> {
        let text = join_text(self.named(name).map(|line| line.rest(start)));
        (!text.is_empty()).then_some(text)
    }
}

pub(crate) fn join_text<'b>(pieces: impl Iterator<Item = &'b str>) -> String {
    pieces
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins comma-separated lists, where a line ending in a comma continues
/// without a space.
pub(crate) fn join_list<'b>(pieces: impl Iterator<Item = &'b str>) -> String {
    let mut out = String::new();
    for piece in pieces.map(str::trim).filter(|piece| !piece.is_empty()) {
        if !out.is_empty() && !out.ends_with(',') {
            out.push(' ');
        }
        out.push_str(piece);
    }
    out
}

/// Splits text into lines of at most `first` then `rest` characters, breaking
/// at spaces where possible.
pub(crate) fn wrap(text: &str, first: usize, rest: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ').filter(|word| !word.is_empty()) {
        let limit = if lines.is_empty() { first } else { rest };
        let needed = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };
        if needed <= limit {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        let mut word = word;
        loop {
            let limit = if lines.is_empty() { first } else { rest };
            if word.len() <= limit {
                current.push_str(word);
                break;
            }
            let cut = (1..=limit).rev().find(|&i| word.is_char_boundary(i)).unwrap_or(limit);
            lines.push(word[..cut].to_string());
            word = &word[cut..];
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Splits a comma-separated list into lines that each end in a comma except
/// the last, for records read back with [`join_list`].
pub(crate) fn wrap_list(items: &[&str], first: usize, rest: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for (index, item) in items.iter().enumerate() {
        let piece = if index + 1 < items.len() {
            format!("{item},")
        } else {
            item.to_string()
        };
        let limit = if lines.is_empty() { first } else { rest };
        if !current.is_empty() && current.len() + piece.len() > limit {
            lines.push(std::mem::take(&mut current));
        }
        current.push_str(&piece);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// `DD-MON-YY` to a date. Two-digit years up to 68 are read as 20xx.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.trim().split('-');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month = parts.next()?.trim().to_ascii_uppercase();
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = MONTHS.iter().position(|name| *name == month)? as u32 + 1;
    let year = match year {
        0..=68 => 2000 + year,
        69..=99 => 1900 + year,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Date cell in ISO form, `?` when unreadable.
pub(crate) fn date_value(text: &str) -> Value {
    match parse_date(text) {
        Some(date) => Value::text(date.format("%Y-%m-%d").to_string()),
        None => {
            if !text.trim().is_empty() {
                tracing::trace!(text, "unreadable PDB date replaced by ?");
            }
            Value::Unknown
        }
    }
}

/// ISO date text back to `DD-MON-YY`.
pub(crate) fn format_date(iso: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d").ok()?;
    let month = MONTHS[date.month0() as usize];
    Some(format!("{:02}-{}-{:02}", date.day(), month, date.year().rem_euclid(100)))
}

const DIGITS_UPPER: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS_LOWER: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36(text: &str, digits: &[u8]) -> Option<i64> {
    text.bytes().try_fold(0i64, |total, byte| {
        let digit = digits.iter().position(|&d| d == byte)? as i64;
        total.checked_mul(36)?.checked_add(digit)
    })
}

/// Reads a decimal or hybrid-36 number of the given field width.
pub(crate) fn hybrid36_decode(text: &str, width: u32) -> Option<i64> {
    let trimmed = text.trim();
    let first = trimmed.chars().next()?;
    if first.is_ascii_digit() || first == '-' {
        return trimmed.parse().ok();
    }
    if trimmed.len() != width as usize {
        return None;
    }
    let decimal_limit = 10i64.pow(width);
    let block = 36i64.pow(width - 1);
    if first.is_ascii_uppercase() {
        Some(base36(trimmed, DIGITS_UPPER)? - 10 * block + decimal_limit)
    } else if first.is_ascii_lowercase() {
        Some(base36(trimmed, DIGITS_LOWER)? + 16 * block + decimal_limit)
    } else {
        None
    }
}

fn to_base36(mut value: i64, digits: &[u8], width: u32) -> String {
    let mut out = vec![b'0'; width as usize];
    for slot in out.iter_mut().rev() {
        *slot = digits[(value % 36) as usize];
        value /= 36;
    }
    String::from_utf8(out).unwrap_or_default()
}

/// Writes a number in a field of `width` characters, switching to hybrid-36
/// past the decimal range.
pub(crate) fn hybrid36_encode(value: i64, width: u32) -> Option<String> {
    let decimal_limit = 10i64.pow(width);
    let block = 36i64.pow(width - 1);
    if value < decimal_limit {
        let text = value.to_string();
        return (text.len() <= width as usize).then_some(text);
    }
    let value = value - decimal_limit;
    if value < 26 * block {
        return Some(to_base36(value + 10 * block, DIGITS_UPPER, width));
    }
    let value = value - 26 * block;
    (value < 26 * block).then(|| to_base36(value + 10 * block, DIGITS_LOWER, width))
}

/// Label asym ids: A..Z, AA..AZ, BA.. (bijective base 26).
pub(crate) fn asym_id(index: usize) -> String {
    let mut index = index + 1;
    let mut letters = Vec::new();
    while index > 0 {
        index -= 1;
        letters.push(b'A' + (index % 26) as u8);
        index /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Formal charge from the PDB `2-` form to the mmCIF `-2` form.
pub(crate) fn charge_value(text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        return Value::Unknown;
    }
    let (digits, sign) = match text.as_bytes() {
        [digit, sign @ (b'+' | b'-')] if digit.is_ascii_digit() => (&text[..1], *sign),
        [sign @ (b'+' | b'-'), digit] if digit.is_ascii_digit() => (&text[1..], *sign),
        _ => return number(text),
    };
    if sign == b'-' {
        Value::text(format!("-{digits}"))
    } else {
        Value::text(digits)
    }
}

/// Formal charge from the mmCIF form back to the two PDB columns.
pub(crate) fn charge_text(value: &Value) -> String {
    match value.parse::<i64>() {
        Some(charge) if charge > 0 && charge < 10 => format!("{charge}+"),
        Some(charge) if charge < 0 && charge > -10 => format!("{}-", -charge),
        _ => String::new(),
    }
}

/// A decimal cell re-rendered with a fixed number of places, or blank.
pub(crate) fn fixed(value: &Value, places: usize) -> String {
    value
        .parse::<f64>()
        .map(|number| format!("{number:.places$}"))
        .unwrap_or_default()
}

/// Cell text for fixed-column output: markers become blank.
pub(crate) fn blank(value: Option<&Value>) -> &str {
    value.and_then(Value::known).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn columns_are_one_based_and_clipped() {
        let line = Line::new("HEADER    LYASE                                   06-MAY-02   1LOL");
        assert_eq!(line.record(), "HEADER");
        assert_eq!(line.field(11, 50), "LYASE");
        assert_eq!(line.field(63, 66), "1LOL");
        assert_eq!(line.field(70, 80), "");
        assert_eq!(line.value(70, 80), Value::Unknown);
        assert_eq!(Line::new("REMARK 350 BIOMOLECULE: 1").remark(), Some(350));
    }

    #[test]
    fn dates_use_a_two_digit_window() {
        assert_eq!(date_value("06-MAY-02"), Value::text("2002-05-06"));
        assert_eq!(date_value("12-jan-69"), Value::text("1969-01-12"));
        assert_eq!(date_value("31-FEB-99"), Value::Unknown);
        assert_eq!(date_value("   "), Value::Unknown);
        assert_eq!(format_date("2002-05-06").as_deref(), Some("06-MAY-02"));
    }

    #[test]
    fn hybrid36_round_trips() {
        assert_eq!(hybrid36_decode("99999", 5), Some(99_999));
        assert_eq!(hybrid36_decode("A0000", 5), Some(100_000));
        assert_eq!(hybrid36_encode(100_000, 5).as_deref(), Some("A0000"));
        assert_eq!(hybrid36_decode("a0000", 5), Some(100_000 + 26 * 36i64.pow(4)));
        assert_eq!(hybrid36_encode(100_000 + 26 * 36i64.pow(4), 5).as_deref(), Some("a0000"));
        assert_eq!(hybrid36_decode("  -12", 4), Some(-12));
        for value in [1, 9999, 10_000, 123_456, 2_000_000] {
            let text = hybrid36_encode(value, 4).expect("encodable");
            assert_eq!(hybrid36_decode(&text, 4), Some(value));
        }
        assert_eq!(hybrid36_decode("A1!", 3), None);
    }

    #[test]
    fn asym_ids_are_bijective_base_26() {
        let ids: Vec<String> = [0, 1, 25, 26, 27, 51, 52, 701, 702].map(asym_id).to_vec();
        assert_eq!(ids, vec!["A", "B", "Z", "AA", "AB", "AZ", "BA", "ZZ", "AAA"]);
    }

    #[test]
    fn charges_switch_sign_position() {
        assert_eq!(charge_value("2-"), Value::text("-2"));
        assert_eq!(charge_value("1+"), Value::text("1"));
        assert_eq!(charge_value("  "), Value::Unknown);
        assert_eq!(charge_text(&Value::text("-2")), "2-");
        assert_eq!(charge_text(&Value::text("0")), "");
    }

    #[test]
    fn wrapping_breaks_at_spaces() {
        let lines = wrap("CRYSTAL STRUCTURE OF OROTIDINE MONOPHOSPHATE DECARBOXYLASE", 20, 18);
        assert!(lines.iter().all(|line| line.len() <= 20));
        assert_eq!(join_text(lines.iter().map(String::as_str)), "CRYSTAL STRUCTURE OF OROTIDINE MONOPHOSPHATE DECARBOXYLASE");
        let list = wrap_list(&["M.B.BERRY", "B.MEADOR", "T.BILDERBACK"], 20, 20);
        assert_eq!(list, vec!["M.B.BERRY,B.MEADOR,", "T.BILDERBACK"]);
        assert_eq!(join_list(list.iter().map(String::as_str)), "M.B.BERRY,B.MEADOR,T.BILDERBACK");
    }
}
