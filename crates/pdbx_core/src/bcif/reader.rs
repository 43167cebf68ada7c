use std::io::Read;

use tracing::debug;

use crate::bcif::column::to_values;
use crate::bcif::encoding::{chain_from_msgpack, decode_chain};
use crate::error::{Error, Result};
use crate::model::{Category, Dictionary, Value};
use crate::msgpack::{self, MsgValue};

pub fn parse_reader<R: Read>(mut reader: R) -> Result<Dictionary> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    parse_bytes(&buf)
}

/// Decodes the first data block of a BinaryCIF file.
pub fn parse_bytes(bytes: &[u8]) -> Result<Dictionary> {
    let root = msgpack::decode(bytes)?;
    let block = root
        .field_array("dataBlocks")?
        .first()
        .ok_or_else(|| Error::malformed("BinaryCIF file has no data blocks"))?;

    let mut dictionary = Dictionary::new();
    for category in block.field_array("categories")? {
        dictionary.insert_non_empty(read_category(category)?);
    }
    debug!(
        encoder = root.get("encoder").and_then(MsgValue::as_str).unwrap_or("?"),
        categories = dictionary.len(),
        "parsed BinaryCIF"
    );
    Ok(dictionary)
}

fn read_category(node: &MsgValue) -> Result<Category> {
    let name = node.field_str("name")?;
    let name = name.strip_prefix('_').unwrap_or(name);
    let row_count = usize::try_from(node.field_i64("rowCount")?)
        .map_err(|_| Error::malformed(format!("category {name} has a negative row count")))?;

    let mut names = Vec::new();
    let mut columns = Vec::new();
    for column in node.field_array("columns")? {
        let column_name = column.field_str("name")?;
        let values = read_column(column, row_count)
            .map_err(|err| err.within(column_name).within(name))?;
        names.push(column_name.to_string());
        columns.push(values.into_iter());
    }

    let mut category = Category::new(name, names);
    for _ in 0..row_count {
        let row: Vec<Value> = columns
            .iter_mut()
            .map(|column| column.next().unwrap_or_default())
            .collect();
        category.push_row(row)?;
    }
    Ok(category)
}

fn read_column(column: &MsgValue, row_count: usize) -> Result<Vec<Value>> {
    let data = decode_node(column.field("data")?)?;
    if data.len() != row_count {
        return Err(Error::malformed(format!(
            "decoded {} values for {row_count} rows",
            data.len()
        )));
    }
    let mask = match column.get("mask") {
        Some(mask) if !mask.is_nil() => Some(decode_node(mask)?.into_ints("mask")?),
        _ => None,
    };
    Ok(to_values(data, mask.as_deref()))
}

fn decode_node(node: &MsgValue) -> Result<crate::bcif::encoding::ColumnData> {
    let bytes = node.field_bin("data")?;
    let chain = chain_from_msgpack(node.field_array("encoding")?)?;
    decode_chain(bytes, &chain)
}
