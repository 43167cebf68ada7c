use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::Write;

use crate::error::{Error, Result};
use crate::model::{Category, Dictionary, Value};

#[derive(Clone, Copy, Debug, Default)]
pub struct WriteOptions {
    /// Emit one-row categories as `loop_` tables too.
    pub loop_single_rows: bool,
}

pub fn to_string(dictionary: &Dictionary) -> Result<String> {
    to_string_with_options(dictionary, WriteOptions::default())
}

/// Fails with `Malformed` when a multi-line value has a line starting with
/// `;`, which no CIF text field can hold.
pub fn to_string_with_options(dictionary: &Dictionary, options: WriteOptions) -> Result<String> {
    for category in dictionary.iter() {
        let unwritable = category
            .raw_rows()
            .iter()
            .flatten()
            .any(|value| ends_text_field(value.as_str()));
        if unwritable {
            return Err(Error::malformed(format!(
                "a value in {} has a line starting with ';'",
                category.name()
            )));
        }
    }
    let mut out = String::new();
    let _ = writeln!(out, "data_{}", dictionary.entry_id().unwrap_or("XXXX"));
    for category in dictionary.iter().filter(|category| !category.is_empty()) {
        out.push_str("#\n");
        if category.is_loop() || options.loop_single_rows {
            write_loop(&mut out, category);
        } else {
            write_pairs(&mut out, category);
        }
    }
    out.push_str("#\n");
    Ok(out)
}

fn ends_text_field(text: &str) -> bool {
    text.split('\n').skip(1).any(|line| line.starts_with(';'))
}

pub fn write<W: Write>(dictionary: &Dictionary, mut writer: W, options: WriteOptions) -> Result<()> {
    writer.write_all(to_string_with_options(dictionary, options)?.as_bytes())?;
    Ok(())
}

fn write_pairs(out: &mut String, category: &Category) {
    let Some(row) = category.first() else {
        return;
    };
    let tags: Vec<String> = category
        .columns()
        .iter()
        .map(|column| format!("_{}.{}", category.name(), column))
        .collect();
    let width = tags.iter().map(String::len).max().unwrap_or(0);
    for (tag, value) in tags.iter().zip(row.values()) {
        match format_value(value) {
            Formatted::Inline(text) => {
                let _ = writeln!(out, "{tag:<width$} {text}");
            }
            Formatted::TextField(text) => {
                let _ = writeln!(out, "{tag}\n;{text}\n;");
            }
        }
    }
}

fn write_loop(out: &mut String, category: &Category) {
    out.push_str("loop_\n");
    for column in category.columns() {
        let _ = writeln!(out, "_{}.{}", category.name(), column);
    }
    let formatted: Vec<Vec<Formatted<'_>>> = category
        .raw_rows()
        .iter()
        .map(|row| row.iter().map(format_value).collect())
        .collect();
    let mut widths = vec![0; category.columns().len()];
    for row in &formatted {
        for (width, cell) in widths.iter_mut().zip(row) {
            if let Formatted::Inline(text) = cell {
                *width = (*width).max(text.chars().count());
            }
        }
    }
    for row in &formatted {
        let mut line = String::new();
        for (cell, &width) in row.iter().zip(&widths) {
            match cell {
                Formatted::Inline(text) => {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    let _ = write!(line, "{text:<width$}");
                }
                Formatted::TextField(text) => {
                    let pending = line.trim_end();
                    if !pending.is_empty() {
                        out.push_str(pending);
                        out.push('\n');
                    }
                    let _ = writeln!(out, ";{text}\n;");
                    line.clear();
                }
            }
        }
        let line = line.trim_end();
        if !line.is_empty() {
            out.push_str(line);
            out.push('\n');
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Formatted<'a> {
    Inline(Cow<'a, str>),
    TextField(&'a str),
}

const RESERVED_STARTS: &[char] = &['_', '#', '$', '\'', '"', ';', '[', ']'];

fn needs_quotes(text: &str) -> bool {
    if text.is_empty() || text == "?" || text == "." {
        return true;
    }
    if text.starts_with(RESERVED_STARTS) || text.contains([' ', '\t']) {
        return true;
    }
    let lower = text.to_ascii_lowercase();
    lower == "loop_"
        || lower == "stop_"
        || lower == "global_"
        || lower.starts_with("data_")
        || lower.starts_with("save_")
}

fn format_value(value: &Value) -> Formatted<'_> {
    let text = match value {
        Value::Unknown => return Formatted::Inline(Cow::Borrowed("?")),
        Value::Inapplicable => return Formatted::Inline(Cow::Borrowed(".")),
        Value::Text(text) => text.as_str(),
    };
    if text.contains(['\n', '\r']) {
        return Formatted::TextField(text);
    }
    if !needs_quotes(text) {
        return Formatted::Inline(Cow::Borrowed(text));
    }
    if !text.contains('\'') {
        Formatted::Inline(Cow::Owned(format!("'{text}'")))
    } else if !text.contains('"') {
        Formatted::Inline(Cow::Owned(format!("\"{text}\"")))
    } else {
        Formatted::TextField(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmcif::parse_str;
    use pretty_assertions::assert_eq;

    fn sample() -> Dictionary {
        let mut entry = Category::new("entry", ["id"]);
        entry.push(["1LOL"]).expect("row");
        let mut keywords = Category::new("struct_keywords", ["entry_id", "pdbx_keywords", "text"]);
        keywords
            .push(["1LOL", "LYASE", "TIM barrel, LYASE"])
            .expect("row");
        let mut atoms = Category::new("atom_site", ["group_PDB", "id", "label_atom_id", "label_alt_id"]);
        atoms.push(["ATOM", "1", "N", "."]).expect("row");
        atoms.push(["HETATM", "10", "C1'", "?"]).expect("row");
        [entry, keywords, atoms].into_iter().collect()
    }

    #[test]
    fn writes_pairs_and_aligned_loops() {
        let expected = "\
data_1LOL
#
_entry.id 1LOL
#
_struct_keywords.entry_id      1LOL
_struct_keywords.pdbx_keywords LYASE
_struct_keywords.text          'TIM barrel, LYASE'
#
loop_
_atom_site.group_PDB
_atom_site.id
_atom_site.label_atom_id
_atom_site.label_alt_id
ATOM   1  N   .
HETATM 10 C1' ?
#
";
        assert_eq!(to_string(&sample()).expect("written"), expected);
    }

    #[test]
    fn missing_entry_defaults_to_placeholder() {
        let mut s = Category::new("s", ["x"]);
        s.push(["y"]).expect("row");
        let out = to_string(&[s].into_iter().collect()).expect("written");
        assert!(out.starts_with("data_XXXX\n"));
    }

    #[test]
    fn quoting_rules() {
        assert_eq!(format_value(&Value::text("plain")), Formatted::Inline("plain".into()));
        assert_eq!(format_value(&Value::text("a b")), Formatted::Inline("'a b'".into()));
        assert_eq!(format_value(&Value::text("it's x")), Formatted::Inline("\"it's x\"".into()));
        assert_eq!(format_value(&Value::text("_tag")), Formatted::Inline("'_tag'".into()));
        assert_eq!(format_value(&Value::text("")), Formatted::Inline("''".into()));
        assert_eq!(format_value(&Value::text("data_x")), Formatted::Inline("'data_x'".into()));
        assert_eq!(format_value(&Value::text("C1'")), Formatted::Inline("C1'".into()));
        assert_eq!(
            format_value(&Value::text("it's \"x\"")),
            Formatted::TextField("it's \"x\"")
        );
        assert_eq!(format_value(&Value::text("a\nb")), Formatted::TextField("a\nb"));
    }

    #[test]
    fn round_trips_through_the_reader() {
        let mut dictionary = sample();
        let mut title = Category::new("struct", ["entry_id", "title"]);
        title.push(["1LOL", "first line\nsecond line"]).expect("row");
        dictionary.insert(title);
        let mut notes = Category::new("note", ["id", "text", "quote"]);
        notes.push(["1", "multi\nline", "both ' and \" here"]).expect("row");
        notes.push(["2", "single", ""]).expect("row");
        dictionary.insert(notes);

        let text = to_string(&dictionary).expect("written");
        assert_eq!(parse_str(&text).expect("reparsed"), dictionary);

        let looped = to_string_with_options(&dictionary, WriteOptions { loop_single_rows: true })
            .expect("written");
        assert_eq!(parse_str(&looped).expect("reparsed"), dictionary);
    }

    #[test]
    fn lines_starting_with_a_semicolon_are_refused() {
        let mut note = Category::new("note", ["text"]);
        note.push(["first\n;second"]).expect("row");
        let err = to_string(&[note].into_iter().collect()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Malformed);

        let mut note = Category::new("note", ["text"]);
        note.push([";first\nsecond"]).expect("row");
        let dictionary: Dictionary = [note].into_iter().collect();
        let text = to_string(&dictionary).expect("written");
        assert_eq!(parse_str(&text).expect("reparsed"), dictionary);
    }
}
