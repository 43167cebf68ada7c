use std::borrow::Cow;
use std::io::Read;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Category, Dictionary, Value};

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    /// Unquoted text: tags, keywords and plain values.
    Bare(&'a str),
    /// A quoted string or a semicolon text field; never a tag or keyword.
    Quoted(Cow<'a, str>),
}

impl<'a> Token<'a> {
    fn is_block_boundary(&self) -> bool {
        match self {
            Token::Bare(text) => {
                text.starts_with('_')
                    || is_keyword(text, "loop_")
                    || starts_with_keyword(text, "data_")
                    || starts_with_keyword(text, "save_")
                    || is_keyword(text, "stop_")
                    || is_keyword(text, "global_")
            }
            Token::Quoted(_) => false,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Token::Bare(text) => Value::from(text),
            Token::Quoted(text) => Value::from(text.into_owned()),
        }
    }
}

fn is_keyword(text: &str, keyword: &str) -> bool {
    text.eq_ignore_ascii_case(keyword)
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.len() >= keyword.len()
        && text.is_char_boundary(keyword.len())
        && text[..keyword.len()].eq_ignore_ascii_case(keyword)
}

pub fn parse_reader<R: Read>(mut reader: R) -> Result<Dictionary> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_str(&buf)
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Dictionary> {
    parse_str(std::str::from_utf8(bytes)?)
}

/// Parses the first data block of an mmCIF document.
pub fn parse_str(input: &str) -> Result<Dictionary> {
    let tokens = tokenize(input)?;
    let dictionary = Parser::new(tokens).run()?;
    debug!(categories = dictionary.len(), "parsed mmCIF");
    Ok(dictionary)
}

struct Parser<'a> {
    tokens: std::iter::Peekable<std::vec::IntoIter<Token<'a>>>,
    dictionary: Dictionary,
    pending: Option<Category>,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
            dictionary: Dictionary::new(),
            pending: None,
        }
    }

    fn run(mut self) -> Result<Dictionary> {
        self.skip_to_data_block()?;
        while let Some(token) = self.tokens.next() {
            match token {
                Token::Bare(text) if is_keyword(text, "loop_") => {
                    self.flush_pending();
                    self.parse_loop()?;
                }
                Token::Bare(text) if starts_with_keyword(text, "data_") => {
                    debug!(block = &text[5..], "ignoring data block after the first");
                    break;
                }
                Token::Bare(text) if text.starts_with('_') => {
                    let value = match self.tokens.next() {
                        Some(token) if !token.is_block_boundary() => token.into_value(),
                        _ => {
                            return Err(Error::malformed(format!("tag {text} has no value")));
                        }
                    };
                    self.assign_pair(text, value)?;
                }
                Token::Bare(text)
                    if starts_with_keyword(text, "save_")
                        || is_keyword(text, "stop_")
                        || is_keyword(text, "global_") =>
                {
                    self.flush_pending();
                }
                other => {
                    return Err(Error::malformed(format!(
                        "value {:?} outside of a tag or loop",
                        other.into_value().as_str()
                    )));
                }
            }
        }
        self.flush_pending();
        Ok(self.dictionary)
    }

    fn skip_to_data_block(&mut self) -> Result<()> {
        for token in self.tokens.by_ref() {
            if let Token::Bare(text) = token {
                if starts_with_keyword(text, "data_") {
                    return Ok(());
                }
            }
        }
        Err(Error::malformed("no data_ block found"))
    }

    fn assign_pair(&mut self, tag: &str, value: Value) -> Result<()> {
        let (category, column) = split_tag(tag)?;
        let same = self
            .pending
            .as_ref()
            .map(|pending| pending.name() == category)
            .unwrap_or(false);
        if !same {
            self.flush_pending();
            let mut fresh = Category::new(category, [column]);
            fresh.push_row(vec![value])?;
            self.pending = Some(fresh);
            return Ok(());
        }
        if let Some(pending) = self.pending.as_mut() {
            pending.add_column(column, value);
        }
        Ok(())
    }

    fn flush_pending(&mut self) {
        if let Some(category) = self.pending.take() {
            self.dictionary.insert(category);
        }
    }

    fn parse_loop(&mut self) -> Result<()> {
        let mut category_name: Option<&str> = None;
        let mut columns = Vec::new();
        while let Some(Token::Bare(text)) = self.tokens.peek() {
            if !text.starts_with('_') {
                break;
            }
            let text = *text;
            self.tokens.next();
            let (category, column) = split_tag(text)?;
            match category_name {
                None => category_name = Some(category),
                Some(name) if name == category => {}
                Some(name) => {
                    return Err(Error::malformed(format!(
                        "loop mixes categories {name} and {category}"
                    )));
                }
            }
            columns.push(column.to_string());
        }
        let name = category_name.ok_or_else(|| Error::malformed("loop_ without tags"))?;

        let mut values = Vec::new();
        while let Some(token) = self.tokens.peek() {
            if token.is_block_boundary() {
                break;
            }
            if let Some(token) = self.tokens.next() {
                values.push(token.into_value());
            }
        }

        if values.len() % columns.len() != 0 {
            return Err(Error::malformed(format!(
                "loop {name} has {} values for {} columns",
                values.len(),
                columns.len()
            )));
        }

        let width = columns.len();
        let mut category = Category::new(name, columns);
        let mut values = values.into_iter();
        loop {
            let row: Vec<Value> = values.by_ref().take(width).collect();
            if row.is_empty() {
                break;
            }
            category.push_row(row)?;
        }
        self.dictionary.insert_non_empty(category);
        Ok(())
    }
}

fn split_tag(tag: &str) -> Result<(&str, &str)> {
    tag[1..]
        .split_once('.')
        .filter(|(category, column)| !category.is_empty() && !column.is_empty())
        .ok_or_else(|| Error::malformed(format!("tag {tag} is not of the form _category.column")))
}

fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

fn tokenize(input: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut index = 0;
    let mut line_start = true;

    while index < bytes.len() {
        match bytes[index] {
            b'\n' => {
                line_start = true;
                index += 1;
            }
            b'\r' | b'\t' | b' ' => {
                line_start = false;
                index += 1;
            }
            b'#' => {
                while index < bytes.len() && bytes[index] != b'\n' {
                    index += 1;
                }
            }
            b';' if line_start => {
                let start = index + 1;
                index += 1;
                let mut end = None;
                while index < bytes.len() {
                    if bytes[index] == b'\n' && bytes.get(index + 1) == Some(&b';') {
                        end = Some(index);
                        index += 2;
                        break;
                    }
                    index += 1;
                }
                let end = end.ok_or_else(|| Error::malformed("unterminated text field"))?;
                let raw = input[start..end].trim_end_matches('\r');
                let text = if raw.contains('\r') {
                    Cow::Owned(raw.replace("\r\n", "\n"))
                } else {
                    Cow::Borrowed(raw)
                };
                tokens.push(Token::Quoted(text));
                line_start = false;
            }
            quote @ (b'"' | b'\'') => {
                index += 1;
                let start = index;
                loop {
                    match bytes.get(index) {
                        None | Some(b'\n') => {
                            return Err(Error::malformed("unterminated quoted value"));
                        }
                        Some(&byte)
                            if byte == quote
                                && bytes.get(index + 1).map_or(true, |&next| is_space(next)) =>
                        {
                            break;
                        }
                        Some(_) => index += 1,
                    }
                }
                tokens.push(Token::Quoted(Cow::Borrowed(&input[start..index])));
                index += 1;
                line_start = false;
            }
            _ => {
                let start = index;
                while index < bytes.len() && !is_space(bytes[index]) {
                    index += 1;
                }
                tokens.push(Token::Bare(&input[start..index]));
                line_start = false;
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_pairs_and_loops() {
        let cif = r#"
data_1LOL
#
_entry.id 1LOL
#
_cell.entry_id   1LOL
_cell.length_a   57.570
_cell.Z_PDB      ?
#
loop_
_atom_site.group_PDB
_atom_site.id
_atom_site.label_alt_id
_atom_site.Cartn_x
ATOM 1 . 3.696
ATOM 2 . 3.198
#
"#;
        let dictionary = parse_str(cif).expect("parsed");
        assert_eq!(
            dictionary.names().collect::<Vec<_>>(),
            vec!["entry", "cell", "atom_site"]
        );
        assert_eq!(dictionary.entry_id(), Some("1LOL"));
        assert_eq!(dictionary.value("cell", "Z_PDB"), Some(&Value::Unknown));
        let atoms = dictionary.get("atom_site").expect("atoms");
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms.value(1, "Cartn_x").map(Value::as_str), Some("3.198"));
        assert_eq!(atoms.value(0, "label_alt_id"), Some(&Value::Inapplicable));
    }

    #[test]
    fn text_fields_are_kept_verbatim() {
        let dictionary = parse_str("data_x\n_s.x\n;abc\ndef\n;\n").expect("parsed");
        let s = dictionary.get("s").expect("category");
        assert_eq!(s.len(), 1);
        assert_eq!(s.value(0, "x").map(Value::as_str), Some("abc\ndef"));
    }

    #[test]
    fn quotes_close_only_before_whitespace() {
        let cif = "data_x\nloop_\n_a.b\n_a.c\nO5' \"it's\"\n'x y' 'a'b'\n";
        let dictionary = parse_str(cif).expect("parsed");
        let a = dictionary.get("a").expect("category");
        assert_eq!(a.len(), 2);
        assert_eq!(a.value(0, "b").map(Value::as_str), Some("O5'"));
        assert_eq!(a.value(0, "c").map(Value::as_str), Some("it's"));
        assert_eq!(a.value(1, "b").map(Value::as_str), Some("x y"));
        assert_eq!(a.value(1, "c").map(Value::as_str), Some("a'b"));
        let cif = "data_x\n_a.b 'x y'\n_a.c \"C1'\"\n";
        let dictionary = parse_str(cif).expect("parsed");
        assert_eq!(dictionary.known("a", "b"), Some("x y"));
        assert_eq!(dictionary.known("a", "c"), Some("C1'"));
    }

    #[test]
    fn rows_may_span_lines_and_hash_inside_values() {
        let cif = "data_x\nloop_\n_a.b\n_a.c\n_a.d\n1 x#y\n3\n4 5 6\n";
        let dictionary = parse_str(cif).expect("parsed");
        let a = dictionary.get("a").expect("category");
        assert_eq!(a.len(), 2);
        assert_eq!(a.value(0, "c").map(Value::as_str), Some("x#y"));
        assert_eq!(a.value(1, "d").map(Value::as_str), Some("6"));
    }

    #[test]
    fn only_the_first_block_is_read() {
        let dictionary = parse_str("data_a\n_x.y 1\ndata_b\n_z.w 2\n").expect("parsed");
        assert_eq!(dictionary.names().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn structural_errors_are_malformed() {
        for bad in [
            "_entry.id 1LOL\n",
            "data_x\n_s.x\n;abc\n",
            "data_x\nloop_\n_a.b\n_a.c\n1 2 3\n",
            "data_x\n_a.b 'open\n",
            "data_x\n_nodot 1\n",
            "data_x\n_a.b\n",
        ] {
            let err = parse_str(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Malformed, "{bad:?}");
        }
    }

    #[test]
    fn non_utf8_bytes_are_rejected() {
        let err = parse_bytes(&[b'd', 0xff, 0xfe]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Utf8);
    }
}
