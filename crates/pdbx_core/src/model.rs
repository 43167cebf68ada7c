//! The canonical in-memory form every format is read into and written from:
//! an ordered list of named categories, each a table of string cells.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// One cell of a category table.
///
/// `?` and `.` are first-class markers in every PDB format, so they get
/// their own variants instead of being folded into an optional string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// `?`
    Unknown,
    /// `.`
    Inapplicable,
    Text(String),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::from(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Value::Unknown => "?",
            Value::Inapplicable => ".",
            Value::Text(text) => text,
        }
    }

    /// True for `?` and `.`.
    pub fn is_missing(&self) -> bool {
        !matches!(self, Value::Text(_))
    }

    /// The text of a known value, `None` for the two markers.
    pub fn known(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parse<T: std::str::FromStr>(&self) -> Option<T> {
        self.known().and_then(|text| text.trim().parse().ok())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Unknown
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        match value {
            "?" => Value::Unknown,
            "." => Value::Inapplicable,
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        match value.as_str() {
            "?" => Value::Unknown,
            "." => Value::Inapplicable,
            _ => Value::Text(value),
        }
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::from(value.as_str())
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map(Value::from).unwrap_or(Value::Unknown)
    }
}

impl From<Option<&str>> for Value {
    fn from(value: Option<&str>) -> Self {
        value.map(Value::from).unwrap_or(Value::Unknown)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

macro_rules! value_from_number {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Text(value.to_string())
            }
        })*
    };
}

value_from_number!(i32, i64, u32, u64, usize);

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A named table whose rows all share the same columns in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Category {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Multi-row categories are written as `loop_` tables.
    pub fn is_loop(&self) -> bool {
        self.rows.len() > 1
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::malformed(format!(
                "row of {} values pushed to category {} with {} columns",
                row.len(),
                self.name,
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn push<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_row(values.into_iter().map(Into::into).collect())
    }

    /// Appends a column, filling existing rows with `fill`.
    pub fn add_column(&mut self, column: impl Into<String>, fill: Value) {
        self.columns.push(column.into());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn first(&self) -> Option<Row<'_>> {
        self.row(0)
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|values| &values[index])
    }

    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut Value> {
        self.rows.get_mut(row).and_then(|values| values.get_mut(column))
    }

    pub fn set(&mut self, row: usize, column: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.column_index(column).ok_or_else(|| {
            Error::malformed(format!("category {} has no column {column}", self.name))
        })?;
        if row >= self.rows.len() {
            return Err(Error::malformed(format!("category {} has no row {row}", self.name)));
        }
        let cell = self
            .cell_mut(row, index)
            .ok_or_else(|| Error::malformed(format!("row {row} has no column {column}")))?;
        *cell = value.into();
        Ok(())
    }

    /// Every value of one column, top to bottom.
    pub fn column(&self, column: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }
}

/// A borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|index| &self.values[index])
    }

    /// The cell text, or `?` when the column is absent.
    pub fn str(&self, column: &str) -> &'a str {
        self.get(column).map(Value::as_str).unwrap_or("?")
    }

    /// The cell text when it is a known value.
    pub fn known(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(Value::known)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Insertion-ordered collection of categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    categories: Vec<Category>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Adds a category at the end, or replaces the existing one of the same
    /// name where it stands.
    pub fn insert(&mut self, category: Category) {
        match self
            .categories
            .iter_mut()
            .find(|existing| existing.name == category.name)
        {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
    }

    /// Like [`Dictionary::insert`] but drops categories without rows.
    pub fn insert_non_empty(&mut self, category: Category) {
        if !category.is_empty() {
            self.insert(category);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories
            .iter_mut()
            .find(|category| category.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Category> {
        let index = self
            .categories
            .iter()
            .position(|category| category.name == name)?;
        Some(self.categories.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.categories.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Category> {
        self.categories.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.categories.iter().map(Category::name)
    }

    /// First-row value of `category.column`.
    pub fn value(&self, category: &str, column: &str) -> Option<&Value> {
        self.get(category)?.value(0, column)
    }

    /// First-row value of `category.column` when it is known.
    pub fn known(&self, category: &str, column: &str) -> Option<&str> {
        self.value(category, column).and_then(Value::known)
    }

    pub fn entry_id(&self) -> Option<&str> {
        self.known("entry", "id")
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.iter()
    }
}

impl IntoIterator for Dictionary {
    type Item = Category;
    type IntoIter = std::vec::IntoIter<Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.into_iter()
    }
}

impl FromIterator<Category> for Dictionary {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut dictionary = Dictionary::new();
        for category in iter {
            dictionary.insert(category);
        }
        dictionary
    }
}

struct RowsSer<'a>(&'a Category);
struct RowSer<'a>(Row<'a>);

impl Serialize for RowSer<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.values.len()))?;
        for (column, value) in self.0.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl Serialize for RowsSer<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for row in self.0.rows() {
            seq.serialize_element(&RowSer(row))?;
        }
        seq.end()
    }
}

/// Serialises as `{category: [{column: value, ..}, ..], ..}` in order.
impl Serialize for Dictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for category in &self.categories {
            map.serialize_entry(category.name(), &RowsSer(category))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn cell_category() -> Category {
        let mut cell = Category::new("cell", ["entry_id", "length_a", "Z_PDB"]);
        cell.push(["1LOL", "57.570", "?"]).expect("row");
        cell
    }

    #[test]
    fn markers_are_kept_apart_from_text() {
        assert_eq!(Value::from("?"), Value::Unknown);
        assert_eq!(Value::from("."), Value::Inapplicable);
        assert_eq!(Value::from(""), Value::Text(String::new()));
        assert_eq!(Value::from("?x").as_str(), "?x");
        assert!(Value::Unknown.is_missing());
        assert_eq!(Value::from("12.5").parse::<f64>(), Some(12.5));
    }

    #[test]
    fn rows_must_match_the_header() {
        let mut cell = cell_category();
        let err = cell.push(["only", "two"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(cell.len(), 1);
    }

    #[test]
    fn row_views_look_up_by_column() {
        let cell = cell_category();
        let row = cell.first().expect("row");
        assert_eq!(row.str("length_a"), "57.570");
        assert_eq!(row.get("Z_PDB"), Some(&Value::Unknown));
        assert_eq!(row.known("Z_PDB"), None);
        assert_eq!(row.str("missing"), "?");
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut dictionary = Dictionary::new();
        dictionary.insert(Category::new("entry", ["id"]));
        dictionary.insert(cell_category());
        let mut entry = Category::new("entry", ["id"]);
        entry.push(["1LOL"]).expect("row");
        dictionary.insert(entry);

        assert_eq!(dictionary.names().collect::<Vec<_>>(), vec!["entry", "cell"]);
        assert_eq!(dictionary.entry_id(), Some("1LOL"));
    }

    #[test]
    fn add_column_fills_existing_rows() {
        let mut cell = cell_category();
        cell.add_column("length_b", Value::Unknown);
        assert_eq!(cell.value(0, "length_b"), Some(&Value::Unknown));
        cell.set(0, "length_b", "91.110").expect("set");
        assert_eq!(cell.value(0, "length_b").map(Value::as_str), Some("91.110"));
    }

    #[test]
    fn set_outside_the_table_fails() {
        let mut cell = cell_category();
        let err = cell.set(3, "length_a", "1.0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        let err = cell.set(0, "length_c", "1.0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(cell.value(0, "length_a").map(Value::as_str), Some("57.570"));
    }

    #[test]
    fn serialises_as_nested_maps() {
        let dictionary: Dictionary = [cell_category()].into_iter().collect();
        let json = serde_json::to_string(&dictionary).expect("json");
        assert_eq!(
            json,
            r#"{"cell":[{"entry_id":"1LOL","length_a":"57.570","Z_PDB":"?"}]}"#
        );
    }
}
