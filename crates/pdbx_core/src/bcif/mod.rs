//! BinaryCIF: the mmCIF tables stored column by column in MessagePack, each
//! column compressed by a stack of [`Encoding`] steps.

mod column;
pub mod encoding;
mod reader;
mod writer;

pub use column::{format_f32, format_f64};
pub use encoding::{decode_chain, ColumnData, DataType, Encoding};
pub use reader::{parse_bytes, parse_reader};
pub use writer::{to_bytes, to_bytes_with_options, write, WriteOptions, FORMAT_VERSION};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{Category, Dictionary};
    use crate::msgpack::{self, MsgValue};
    use pretty_assertions::assert_eq;

    fn sample() -> Dictionary {
        let mut entry = Category::new("entry", ["id"]);
        entry.push(["1LOL"]).expect("row");
        let mut atoms = Category::new(
            "atom_site",
            ["group_PDB", "id", "label_atom_id", "label_alt_id", "Cartn_x", "occupancy", "pdbx_formal_charge"],
        );
        atoms.push(["ATOM", "1", "N", ".", "3.696", "1.00", "?"]).expect("row");
        atoms.push(["ATOM", "2", "CA", ".", "3.198", "1.00", "?"]).expect("row");
        atoms.push(["HETATM", "3", "O", "A", "-0.5", "0.50", "-1"]).expect("row");
        let mut title = Category::new("struct", ["entry_id", "title"]);
        title.push(["1LOL", "Crystal structure of orotidine monophosphate decarboxylase"]).expect("row");
        [entry, atoms, title].into_iter().collect()
    }

    #[test]
    fn dictionary_round_trips() {
        let dictionary = sample();
        let bytes = to_bytes(&dictionary).expect("encoded");
        assert_eq!(parse_bytes(&bytes).expect("decoded"), dictionary);
    }

    #[test]
    fn container_layout() {
        let bytes = to_bytes(&sample()).expect("encoded");
        let root = msgpack::decode(&bytes).expect("msgpack");
        assert_eq!(root.field_str("version").expect("version"), FORMAT_VERSION);
        let block = &root.field_array("dataBlocks").expect("blocks")[0];
        assert_eq!(block.field_str("header").expect("header"), "1LOL");
        let categories = block.field_array("categories").expect("categories");
        assert_eq!(categories[1].field_str("name").expect("name"), "_atom_site");
        assert_eq!(categories[1].field_i64("rowCount").expect("rows"), 3);
    }

    #[test]
    fn row_count_mismatch_is_malformed() {
        let column = MsgValue::map([
            ("name", MsgValue::str("id")),
            (
                "data",
                MsgValue::map([
                    ("data", MsgValue::Bin(vec![1, 2])),
                    ("encoding", MsgValue::Array(vec![Encoding::ByteArray { data_type: DataType::Uint8 }.to_msgpack()])),
                ]),
            ),
            ("mask", MsgValue::Nil),
        ]);
        let category = MsgValue::map([
            ("name", MsgValue::str("_x")),
            ("rowCount", MsgValue::Uint(3)),
            ("columns", MsgValue::Array(vec![column])),
        ]);
        let root = MsgValue::map([(
            "dataBlocks",
            MsgValue::Array(vec![MsgValue::map([
                ("header", MsgValue::str("X")),
                ("categories", MsgValue::Array(vec![category])),
            ])]),
        )]);
        let bytes = msgpack::encode(&root).expect("encoded");
        let err = parse_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(err.scopes().collect::<Vec<_>>(), vec!["x", "id"]);
        assert_eq!(err.message(), "decoded 2 values for 3 rows");
    }
}
