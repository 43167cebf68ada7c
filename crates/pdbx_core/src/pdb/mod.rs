//! The legacy fixed-column PDB format.
//!
//! Reading runs in stages over the record lines: title section, molecules
//! and atoms, assemblies, then annotations, and finally a pass that gives
//! every annotation row the label identifiers of the residues it names.
//! Writing regenerates the records from the canonical tables.

mod annotation;
mod assembly;
mod atoms;
mod compound;
mod header;
mod molecules;
mod records;
mod references;
mod writer;

use std::io::{Read, Write};

use crate::error::Result;
use crate::model::Dictionary;

pub(crate) use assembly::{is_identity, OPERATOR_COLUMNS};
pub(crate) use molecules::ATOM_SITE_COLUMNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Read every MODEL; when false, stop after the first ENDMDL.
    pub all_models: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { all_models: true }
    }
}

pub fn parse_str(input: &str) -> Result<Dictionary> {
    parse_str_with_options(input, ReadOptions::default())
}

pub fn parse_str_with_options(input: &str, options: ReadOptions) -> Result<Dictionary> {
    let records = records::Records::new(input);
    let mut dictionary = Dictionary::new();
    let entry_id = header::read(&records, &mut dictionary)?;
    tracing::debug!(entry = %entry_id, "read PDB title section");
    let labels = molecules::read(&records, options.all_models, &mut dictionary)?;
    assembly::read(&records, &labels, &mut dictionary)?;
    annotation::read(&records, &mut dictionary)?;
    annotation::propagate(&labels, &mut dictionary)?;
    tracing::debug!(
        categories = dictionary.len(),
        residues = labels.len(),
        "parsed PDB"
    );
    Ok(dictionary)
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Dictionary> {
    parse_str(std::str::from_utf8(bytes)?)
}

pub fn parse_reader<R: Read>(mut reader: R) -> Result<Dictionary> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_str(&buf)
}

/// Renders a dictionary as PDB records, each padded to 80 columns.
pub fn to_string(dictionary: &Dictionary) -> String {
    writer::to_string(dictionary)
}

pub fn write<W: Write>(dictionary: &Dictionary, mut writer: W) -> Result<()> {
    writer.write_all(to_string(dictionary).as_bytes())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mmcif;
    use pretty_assertions::assert_eq;

    const ATOM: &str = "ATOM      1  N   VAL A  11       3.696  33.898  63.219  1.00 21.50           N  ";

    #[test]
    fn header_line() {
        let dictionary =
            parse_str("HEADER    LYASE                                   06-MAY-02   1LOL\n")
                .expect("parse");
        assert_eq!(dictionary.entry_id(), Some("1LOL"));
        assert_eq!(dictionary.known("struct_keywords", "pdbx_keywords"), Some("LYASE"));
        assert_eq!(
            dictionary.known("pdbx_database_status", "recvd_initial_deposition_date"),
            Some("2002-05-06")
        );
    }

    #[test]
    fn blank_header_date_is_unknown() {
        let dictionary = parse_str("HEADER    LYASE\n").expect("parse");
        assert_eq!(
            dictionary
                .value("pdbx_database_status", "recvd_initial_deposition_date")
                .map(|value| value.to_string()),
            Some("?".to_string())
        );
    }

    #[test]
    fn missing_header_defaults_the_entry_id() {
        let dictionary = parse_str(&format!("{ATOM}\nEND\n")).expect("parse");
        assert_eq!(dictionary.entry_id(), Some("XXXX"));
    }

    #[test]
    fn atom_line_survives_a_trip_through_mmcif() {
        let source = format!("{ATOM}\nTER       2      VAL A  11\nEND\n");
        let dictionary = parse_str(&source).expect("parse PDB");
        let cif = mmcif::to_string(&dictionary).expect("write mmCIF");
        let reread = mmcif::parse_str(&cif).expect("parse mmCIF");
        let text = to_string(&reread);
        let atom = text
            .lines()
            .find(|line| line.starts_with("ATOM"))
            .expect("ATOM line");
        assert_eq!(atom, ATOM);
        assert!(text.lines().any(|line| line.starts_with("TER       2      VAL A  11")));
    }

    #[test]
    fn unreadable_coordinates_are_fatal() {
        let source = "ATOM      1  N   VAL A  11       3.696  xx.xxx  63.219  1.00 21.50           N\n";
        let err = parse_str(source).expect_err("bad coordinate");
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn first_model_only() {
        let source = format!(
            "MODEL        1\n{ATOM}\nENDMDL\nMODEL        2\n{ATOM}\nENDMDL\nEND\n"
        );
        let all = parse_str(&source).expect("all models");
        let first = parse_str_with_options(&source, ReadOptions { all_models: false })
            .expect("first model");
        assert_eq!(all.get("atom_site").map(|sites| sites.len()), Some(2));
        assert_eq!(first.get("atom_site").map(|sites| sites.len()), Some(1));
    }

    #[test]
    fn non_utf8_input_is_reported() {
        let err = parse_bytes(&[0x41, 0xff, 0xfe]).expect_err("invalid UTF-8");
        assert_eq!(err.kind(), ErrorKind::Utf8);
    }
}
