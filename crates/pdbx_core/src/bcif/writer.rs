use std::io::Write;

use tracing::debug;

use crate::bcif::column::{encode_column, Encoded};
use crate::bcif::encoding::chain_to_msgpack;
use crate::error::Result;
use crate::model::{Category, Dictionary, Value};
use crate::msgpack::{self, MsgValue};

/// Version of the BinaryCIF container layout that is written.
pub const FORMAT_VERSION: &str = "0.3.0";

#[derive(Clone, Debug)]
pub struct WriteOptions {
    /// Written to the `encoder` field of the file.
    pub encoder: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            encoder: concat!("pdbx ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub fn to_bytes(dictionary: &Dictionary) -> Result<Vec<u8>> {
    to_bytes_with_options(dictionary, &WriteOptions::default())
}

pub fn to_bytes_with_options(dictionary: &Dictionary, options: &WriteOptions) -> Result<Vec<u8>> {
    let categories = dictionary
        .iter()
        .filter(|category| !category.is_empty())
        .map(category_node)
        .collect::<Result<Vec<_>>>()?;
    debug!(categories = categories.len(), "encoding BinaryCIF");

    let block = MsgValue::map([
        ("header", MsgValue::str(dictionary.entry_id().unwrap_or("XXXX"))),
        ("categories", MsgValue::Array(categories)),
    ]);
    let root = MsgValue::map([
        ("encoder", MsgValue::str(options.encoder.as_str())),
        ("version", MsgValue::str(FORMAT_VERSION)),
        ("dataBlocks", MsgValue::Array(vec![block])),
    ]);
    msgpack::encode(&root)
}

pub fn write<W: Write>(dictionary: &Dictionary, mut writer: W, options: &WriteOptions) -> Result<()> {
    writer.write_all(&to_bytes_with_options(dictionary, options)?)?;
    Ok(())
}

fn encoded_node(encoded: Encoded) -> MsgValue {
    MsgValue::map([
        ("data", MsgValue::Bin(encoded.data)),
        ("encoding", chain_to_msgpack(&encoded.encoding)),
    ])
}

fn category_node(category: &Category) -> Result<MsgValue> {
    let mut columns = Vec::with_capacity(category.columns().len());
    for (index, name) in category.columns().iter().enumerate() {
        let values: Vec<&Value> = category.raw_rows().iter().map(|row| &row[index]).collect();
        let (data, mask) = encode_column(&values)?;
        columns.push(MsgValue::map([
            ("name", MsgValue::str(name.as_str())),
            ("data", encoded_node(data)),
            ("mask", mask.map(encoded_node).unwrap_or(MsgValue::Nil)),
        ]));
    }
    Ok(MsgValue::map([
        ("name", MsgValue::str(format!("_{}", category.name()))),
        ("rowCount", MsgValue::Uint(category.len() as u64)),
        ("columns", MsgValue::Array(columns)),
    ]))
}
