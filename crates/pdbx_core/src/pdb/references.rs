//! Primary structure records: SEQRES, DBREF, SEQADV and MODRES.

use std::collections::HashMap;

use super::records::{text_or_unknown, Records};
use crate::error::Result;
use crate::model::{Category, Dictionary, Value};

/// SEQRES residue names per author chain, chains in file order.
#[derive(Debug, Default)]
pub(super) struct Sequences {
    pub chains: Vec<String>,
    pub residues: HashMap<String, Vec<String>>,
}

impl Sequences {
    pub fn read(records: &Records<'_>) -> Self {
        let mut sequences = Sequences::default();
        for line in records.named("SEQRES") {
            let chain = line.field(12, 12).to_string();
            if !sequences.residues.contains_key(&chain) {
                sequences.chains.push(chain.clone());
            }
            sequences
                .residues
                .entry(chain)
                .or_default()
                .extend(line.raw(20, 80).split_whitespace().map(str::to_string));
        }
        sequences
    }

    pub fn of(&self, chain: &str) -> &[String] {
        self.residues.get(chain).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Modification {
    pub name: String,
    pub chain: String,
    pub number: String,
    pub insertion: String,
    pub parent: String,
    pub details: String,
}

pub(super) fn modifications(records: &Records<'_>) -> Vec<Modification> {
    records
        .named("MODRES")
        .map(|line| Modification {
            name: line.field(13, 15).to_string(),
            chain: line.field(17, 17).to_string(),
            number: line.field(19, 22).to_string(),
            insertion: line.field(23, 23).to_string(),
            parent: line.field(25, 27).to_string(),
            details: line.rest(30).to_string(),
        })
        .collect()
}

pub(super) const MOD_RESIDUE_COLUMNS: [&str; 10] = [
    "id",
    "label_asym_id",
    "label_comp_id",
    "label_seq_id",
    "auth_asym_id",
    "auth_comp_id",
    "auth_seq_id",
    "PDB_ins_code",
    "parent_comp_id",
    "details",
];

pub(super) fn modification_category(
    modifications: &[Modification],
    dictionary: &mut Dictionary,
) -> Result<()> {
    let mut category = Category::new("pdbx_struct_mod_residue", MOD_RESIDUE_COLUMNS);
    for (index, modification) in modifications.iter().enumerate() {
        category.push([
            Value::from(index + 1),
            Value::Unknown,
            Value::text(&modification.name),
            Value::Unknown,
            text_or_unknown(&modification.chain),
            Value::text(&modification.name),
            text_or_unknown(&modification.number),
            text_or_unknown(&modification.insertion),
            text_or_unknown(&modification.parent),
            text_or_unknown(&modification.details),
        ])?;
    }
    dictionary.insert_non_empty(category);
    Ok(())
}

/// One DBREF or DBREF1/DBREF2 pair.
#[derive(Debug, Clone, PartialEq)]
struct Reference {
    code: String,
    chain: String,
    begin: (String, String),
    end: (String, String),
    database: String,
    accession: String,
    db_code: String,
    db_begin: (String, String),
    db_end: (String, String),
}

fn references(records: &Records<'_>) -> Vec<Reference> {
    let mut references = Vec::new();
    let mut pending: Option<Reference> = None;
    for line in records.all() {
        let text = |start, end| line.field(start, end).to_string();
        match line.record() {
            "DBREF" => references.push(Reference {
                code: text(8, 11),
                chain: text(13, 13),
                begin: (text(15, 18), text(19, 19)),
                end: (text(21, 24), text(25, 25)),
                database: text(27, 32),
                accession: text(34, 41),
                db_code: text(43, 54),
                db_begin: (text(56, 60), text(61, 61)),
                db_end: (text(63, 67), text(68, 68)),
            }),
            "DBREF1" => {
                pending = Some(Reference {
                    code: text(8, 11),
                    chain: text(13, 13),
                    begin: (text(15, 18), text(19, 19)),
                    end: (text(21, 24), text(25, 25)),
                    database: text(27, 32),
                    accession: String::new(),
                    db_code: text(48, 67),
                    db_begin: Default::default(),
                    db_end: Default::default(),
                })
            }
            "DBREF2" => {
                if let Some(mut reference) = pending.take() {
                    reference.accession = text(19, 40);
                    reference.db_begin = (text(46, 55), String::new());
                    reference.db_end = (text(58, 67), String::new());
                    references.push(reference);
                }
            }
            _ => {}
        }
    }
    references
}

pub(super) const STRUCT_REF_COLUMNS: [&str; 5] =
    ["id", "db_name", "db_code", "pdbx_db_accession", "entity_id"];

pub(super) const STRUCT_REF_SEQ_COLUMNS: [&str; 15] = [
    "align_id",
    "ref_id",
    "pdbx_PDB_id_code",
    "pdbx_strand_id",
    "seq_align_beg",
    "pdbx_seq_align_beg_ins_code",
    "seq_align_end",
    "pdbx_seq_align_end_ins_code",
    "pdbx_db_accession",
    "db_align_beg",
    "pdbx_db_align_beg_ins_code",
    "db_align_end",
    "pdbx_db_align_end_ins_code",
    "pdbx_auth_seq_align_beg",
    "pdbx_auth_seq_align_end",
];

pub(super) const SEQ_DIF_COLUMNS: [&str; 13] = [
    "align_id",
    "pdbx_pdb_id_code",
    "mon_id",
    "pdbx_pdb_strand_id",
    "seq_num",
    "pdbx_pdb_ins_code",
    "pdbx_seq_db_name",
    "pdbx_seq_db_accession_code",
    "db_mon_id",
    "pdbx_seq_db_seq_num",
    "details",
    "pdbx_auth_seq_num",
    "pdbx_ordinal",
];

/// `struct_ref`, `struct_ref_seq` and `struct_ref_seq_dif`. Label sequence
/// numbers are left as `?` for the label pass to fill in.
pub(super) fn reference_categories(
    records: &Records<'_>,
    entity_of_chain: &dyn Fn(&str) -> Option<String>,
    dictionary: &mut Dictionary,
) -> Result<()> {
    let mut refs = Category::new("struct_ref", STRUCT_REF_COLUMNS);
    let mut seqs = Category::new("struct_ref_seq", STRUCT_REF_SEQ_COLUMNS);
    let mut known: Vec<(String, String, String)> = Vec::new();
    let mut chains: Vec<String> = Vec::new();

    for reference in references(records) {
        let entity = entity_of_chain(&reference.chain).unwrap_or_else(|| "?".to_string());
        let key = (
            reference.database.clone(),
            reference.accession.clone(),
            entity.clone(),
        );
        let ref_id = match known.iter().position(|existing| *existing == key) {
            Some(position) => position + 1,
            None => {
                refs.push([
                    Value::from(known.len() + 1),
                    text_or_unknown(&reference.database),
                    text_or_unknown(&reference.db_code),
                    text_or_unknown(&reference.accession),
                    Value::from(entity),
                ])?;
                known.push(key);
                known.len()
            }
        };
        seqs.push([
            Value::from(seqs.len() + 1),
            Value::from(ref_id),
            text_or_unknown(&reference.code),
            text_or_unknown(&reference.chain),
            Value::Unknown,
            text_or_unknown(&reference.begin.1),
            Value::Unknown,
            text_or_unknown(&reference.end.1),
            text_or_unknown(&reference.accession),
            text_or_unknown(&reference.db_begin.0),
            text_or_unknown(&reference.db_begin.1),
            text_or_unknown(&reference.db_end.0),
            text_or_unknown(&reference.db_end.1),
            text_or_unknown(&reference.begin.0),
            text_or_unknown(&reference.end.0),
        ])?;
        chains.push(reference.chain);
    }

    let mut differences = Category::new("struct_ref_seq_dif", SEQ_DIF_COLUMNS);
    for line in records.named("SEQADV") {
        let chain = line.field(17, 17);
        let align_id = chains
            .iter()
            .position(|known| known == chain)
            .map(|position| Value::from(position + 1))
            .unwrap_or_default();
        differences.push([
            align_id,
            line.value(8, 11),
            line.value(13, 15),
            line.value(17, 17),
            Value::Unknown,
            line.value(23, 23),
            line.value(25, 28),
            line.value(30, 38),
            line.value(40, 42),
            line.value(44, 48),
            line.value(50, 70),
            line.value(19, 22),
            Value::from(differences.len() + 1),
        ])?;
    }

    dictionary.insert_non_empty(refs);
    dictionary.insert_non_empty(seqs);
    dictionary.insert_non_empty(differences);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RECORDS: &str = "\
DBREF  1LOL A    1   229  UNP    O26232   PYRF_METTH       1    229
DBREF1 1ABC B    1   100  UNP                  A0A0B4J2F2_HUMAN
DBREF2 1ABC B     A0A0B4J2F2                         1         100
SEQADV 1LOL MET A    0  UNP  O26232              EXPRESSION TAG
SEQRES   1 A    3  MET VAL GLY
SEQRES   1 B    2  ALA
SEQRES   2 B    2  ALA
MODRES 1LOL MSE A   14  MET  SELENOMETHIONINE
";

    #[test]
    fn sequences_per_chain() {
        let sequences = Sequences::read(&Records::new(RECORDS));
        assert_eq!(sequences.chains, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(sequences.of("A"), ["MET", "VAL", "GLY"]);
        assert_eq!(sequences.of("B").len(), 2);
        assert!(sequences.of("C").is_empty());
    }

    #[test]
    fn modified_residues() {
        let modifications = modifications(&Records::new(RECORDS));
        assert_eq!(modifications.len(), 1);
        assert_eq!(modifications[0].parent, "MET");
        assert_eq!(modifications[0].number, "14");
        assert_eq!(modifications[0].details, "SELENOMETHIONINE");
    }

    #[test]
    fn database_references() {
        let mut dictionary = Dictionary::new();
        let entity = |chain: &str| Some(if chain == "A" { "1" } else { "2" }.to_string());
        reference_categories(&Records::new(RECORDS), &entity, &mut dictionary).expect("refs");
        let refs = dictionary.get("struct_ref").expect("struct_ref");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs.value(1, "pdbx_db_accession").map(Value::as_str), Some("A0A0B4J2F2"));
        assert_eq!(refs.value(1, "db_code").map(Value::as_str), Some("A0A0B4J2F2_HUMAN"));
        let seqs = dictionary.get("struct_ref_seq").expect("struct_ref_seq");
        assert_eq!(seqs.value(0, "pdbx_auth_seq_align_end").map(Value::as_str), Some("229"));
        assert_eq!(seqs.value(1, "db_align_end").map(Value::as_str), Some("100"));
        assert_eq!(dictionary.known("struct_ref_seq_dif", "details"), Some("EXPRESSION TAG"));
        assert_eq!(dictionary.known("struct_ref_seq_dif", "pdbx_auth_seq_num"), Some("0"));
        assert_eq!(dictionary.known("struct_ref_seq_dif", "align_id"), Some("1"));
    }
}
