//! COMPND and SOURCE specifications: `KEY: value;` lists grouped by MOL_ID.

use super::records::{join_text, Records};
use crate::error::Result;
use crate::model::{Category, Dictionary, Value};

/// One MOL_ID block of COMPND with the matching SOURCE block.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct Molecule {
    pub id: String,
    pub compound: Vec<(String, String)>,
    pub source: Vec<(String, String)>,
}

impl Molecule {
    pub fn get(&self, key: &str) -> Option<&str> {
        lookup(&self.compound, key)
    }

    pub fn source(&self, key: &str) -> Option<&str> {
        lookup(&self.source, key)
    }

    /// Author chains from the CHAIN token.
    pub fn chains(&self) -> Vec<String> {
        self.get("CHAIN")
            .map(|text| {
                text.split(',')
                    .map(str::trim)
                    .filter(|chain| !chain.is_empty() && *chain != "NULL")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn src_method(&self) -> &'static str {
        if yes(self.get("ENGINEERED")) {
            "man"
        } else if yes(self.source("SYNTHETIC")) {
            "syn"
        } else {
            "nat"
        }
    }
}

fn yes(value: Option<&str>) -> bool {
    value.map_or(false, |text| text.eq_ignore_ascii_case("YES"))
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}

fn is_key(text: &str) -> bool {
    !text.is_empty()
        && text
            .bytes()
            .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit() || byte == b'_')
}

/// Splits a specification list into MOL_ID groups of key/value pairs.
fn specification(text: &str) -> Vec<(String, Vec<(String, String)>)> {
    let mut groups: Vec<(String, Vec<(String, String)>)> = Vec::new();
    for piece in text.split(';').map(str::trim).filter(|piece| !piece.is_empty()) {
        let pair = piece
            .split_once(':')
            .map(|(key, value)| (key.trim(), value.trim()))
            .filter(|(key, _)| is_key(key));
        match pair {
            Some(("MOL_ID", id)) => groups.push((id.to_string(), Vec::new())),
            Some((key, value)) => {
                if groups.is_empty() {
                    groups.push(("1".to_string(), Vec::new()));
                }
                if let Some((_, pairs)) = groups.last_mut() {
                    pairs.push((key.to_string(), value.to_string()));
                }
            }
            None => {
                if groups.is_empty() {
                    groups.push(("1".to_string(), vec![("MOLECULE".to_string(), String::new())]));
                }
                if let Some((_, value)) = groups.last_mut().and_then(|(_, pairs)| pairs.last_mut()) {
                    if !value.is_empty() {
                        value.push_str("; ");
                    }
                    value.push_str(piece);
                }
            }
        }
    }
    groups
}

pub(super) fn read(records: &Records<'_>) -> Vec<Molecule> {
    let compound = join_text(records.named("COMPND").map(|line| line.rest(11)));
    let source = join_text(records.named("SOURCE").map(|line| line.rest(11)));
    let mut molecules: Vec<Molecule> = specification(&compound)
        .into_iter()
        .map(|(id, compound)| Molecule {
            id,
            compound,
            source: Vec::new(),
        })
        .collect();
    for (id, pairs) in specification(&source) {
        if let Some(molecule) = molecules.iter_mut().find(|molecule| molecule.id == id) {
            molecule.source = pairs;
        }
    }
    molecules
}

pub(super) const SRC_GEN_COLUMNS: [(&str, &str); 6] = [
    ("pdbx_gene_src_gene", "GENE"),
    ("gene_src_common_name", "ORGANISM_COMMON"),
    ("pdbx_gene_src_scientific_name", "ORGANISM_SCIENTIFIC"),
    ("pdbx_gene_src_ncbi_taxonomy_id", "ORGANISM_TAXID"),
    ("pdbx_host_org_scientific_name", "EXPRESSION_SYSTEM"),
    ("pdbx_host_org_ncbi_taxonomy_id", "EXPRESSION_SYSTEM_TAXID"),
];

pub(super) const SRC_NAT_COLUMNS: [(&str, &str); 3] = [
    ("common_name", "ORGANISM_COMMON"),
    ("pdbx_organism_scientific", "ORGANISM_SCIENTIFIC"),
    ("pdbx_ncbi_taxonomy_id", "ORGANISM_TAXID"),
];

fn source_table(name: &str, columns: &[(&str, &str)]) -> Category {
    Category::new(
        name,
        std::iter::once("entity_id").chain(columns.iter().map(|(column, _)| *column)),
    )
}

/// `entity_name_com`, `entity_src_gen` and `entity_src_nat` for the
/// molecules, which take entity ids 1, 2, .. in order.
pub(super) fn categories(molecules: &[Molecule], dictionary: &mut Dictionary) -> Result<()> {
    let mut names = Category::new("entity_name_com", ["entity_id", "name"]);
    let mut generated = source_table("entity_src_gen", &SRC_GEN_COLUMNS);
    let mut natural = source_table("entity_src_nat", &SRC_NAT_COLUMNS);
    for (index, molecule) in molecules.iter().enumerate() {
        let entity_id = Value::from(index + 1);
        if let Some(synonym) = molecule.get("SYNONYM") {
            names.push([entity_id.clone(), Value::text(synonym)])?;
        }
        let (table, columns) = if molecule.src_method() == "man" {
            (&mut generated, &SRC_GEN_COLUMNS[..])
        } else {
            (&mut natural, &SRC_NAT_COLUMNS[..])
        };
        if columns.iter().any(|(_, key)| molecule.source(key).is_some()) {
            let mut row = vec![entity_id];
            row.extend(columns.iter().map(|(_, key)| Value::from(molecule.source(key))));
            table.push_row(row)?;
        }
    }
    dictionary.insert_non_empty(names);
    dictionary.insert_non_empty(generated);
    dictionary.insert_non_empty(natural);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COMPND: &str = "\
COMPND    MOL_ID: 1;
COMPND   2 MOLECULE: OROTIDINE 5'-MONOPHOSPHATE DECARBOXYLASE;
COMPND   3 CHAIN: A, B;
COMPND   4 SYNONYM: OMP DECARBOXYLASE;
COMPND   5 EC: 4.1.1.23;
COMPND   6 ENGINEERED: YES
SOURCE    MOL_ID: 1;
SOURCE   2 ORGANISM_SCIENTIFIC: METHANOTHERMOBACTER THERMAUTOTROPHICUS;
SOURCE   3 ORGANISM_TAXID: 145262;
SOURCE   4 EXPRESSION_SYSTEM: ESCHERICHIA COLI;
SOURCE   5 EXPRESSION_SYSTEM_TAXID: 562
";

    #[test]
    fn groups_tokens_by_molecule() {
        let molecules = read(&Records::new(COMPND));
        assert_eq!(molecules.len(), 1);
        let molecule = &molecules[0];
        assert_eq!(molecule.get("MOLECULE"), Some("OROTIDINE 5'-MONOPHOSPHATE DECARBOXYLASE"));
        assert_eq!(molecule.chains(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(molecule.src_method(), "man");
        assert_eq!(molecule.source("ORGANISM_TAXID"), Some("145262"));
    }

    #[test]
    fn engineered_molecules_fill_src_gen() {
        let molecules = read(&Records::new(COMPND));
        let mut dictionary = Dictionary::new();
        categories(&molecules, &mut dictionary).expect("categories");
        assert_eq!(dictionary.known("entity_name_com", "name"), Some("OMP DECARBOXYLASE"));
        assert_eq!(
            dictionary.known("entity_src_gen", "pdbx_host_org_scientific_name"),
            Some("ESCHERICHIA COLI")
        );
        assert_eq!(dictionary.value("entity_src_gen", "pdbx_gene_src_gene"), Some(&Value::Unknown));
        assert!(!dictionary.contains("entity_src_nat"));
    }

    #[test]
    fn free_text_compound_becomes_one_molecule() {
        let molecules = read(&Records::new("COMPND    HEMOGLOBIN\n"));
        assert_eq!(molecules.len(), 1);
        assert_eq!(molecules[0].get("MOLECULE"), Some("HEMOGLOBIN"));
        assert_eq!(molecules[0].src_method(), "nat");
    }
}
