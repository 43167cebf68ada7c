#![forbid(unsafe_code)]
//! Readers and writers for macromolecular structure files.
//!
//! Every format is decoded into one canonical [`Dictionary`] of mmCIF-style
//! categories, and every writer renders from it. mmCIF, BinaryCIF and PDB
//! round-trip; MMTF is read only. Nothing here touches the filesystem or the
//! network: see `pdbx_io` for that.

pub mod align;
pub mod bcif;
pub mod error;
pub mod format;
pub mod metadata;
pub mod mmcif;
pub mod mmtf;
pub mod model;
pub mod msgpack;
pub mod pdb;
pub mod residues;

pub use error::{Error, ErrorKind, Result};
pub use format::Format;
pub use metadata::{Assembly, StructureFile, Transformation};
pub use model::{Category, Dictionary, Row, Value};

/// Decodes a buffer already known to hold `format`.
pub fn parse_bytes(format: Format, bytes: &[u8]) -> Result<Dictionary> {
    match format {
        Format::Mmcif => mmcif::parse_bytes(bytes),
        Format::Bcif => bcif::parse_bytes(bytes),
        Format::Pdb => pdb::parse_bytes(bytes),
        Format::Mmtf => mmtf::parse_bytes(bytes),
    }
}
