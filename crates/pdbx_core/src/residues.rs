//! Lookup tables for the standard residues of proteins and nucleic acids.

use std::collections::HashMap;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidueClass {
    Peptide,
    Dna,
    Rna,
}

impl ResidueClass {
    /// `entity_poly.type` for a chain made of this class.
    pub fn polymer_type(self) -> &'static str {
        match self {
            ResidueClass::Peptide => "polypeptide(L)",
            ResidueClass::Dna => "polydeoxyribonucleotide",
            ResidueClass::Rna => "polyribonucleotide",
        }
    }

    pub fn from_polymer_type(value: &str) -> Option<Self> {
        match value {
            "polypeptide(L)" | "polypeptide(D)" => Some(ResidueClass::Peptide),
            "polydeoxyribonucleotide" => Some(ResidueClass::Dna),
            "polyribonucleotide" => Some(ResidueClass::Rna),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StandardResidue {
    pub code: char,
    pub class: ResidueClass,
    pub name: &'static str,
    pub formula: &'static str,
    pub weight: &'static str,
}

const STANDARD: &[(&str, char, ResidueClass, &str, &str, &str)] = &[
    ("ALA", 'A', ResidueClass::Peptide, "ALANINE", "C3 H7 N O2", "89.093"),
    ("ARG", 'R', ResidueClass::Peptide, "ARGININE", "C6 H15 N4 O2 1", "175.209"),
    ("ASN", 'N', ResidueClass::Peptide, "ASPARAGINE", "C4 H8 N2 O3", "132.118"),
    ("ASP", 'D', ResidueClass::Peptide, "ASPARTIC ACID", "C4 H7 N O4", "133.103"),
    ("CYS", 'C', ResidueClass::Peptide, "CYSTEINE", "C3 H7 N O2 S", "121.158"),
    ("GLN", 'Q', ResidueClass::Peptide, "GLUTAMINE", "C5 H10 N2 O3", "146.144"),
    ("GLU", 'E', ResidueClass::Peptide, "GLUTAMIC ACID", "C5 H9 N O4", "147.129"),
    ("GLY", 'G', ResidueClass::Peptide, "GLYCINE", "C2 H5 N O2", "75.067"),
    ("HIS", 'H', ResidueClass::Peptide, "HISTIDINE", "C6 H10 N3 O2 1", "156.162"),
    ("ILE", 'I', ResidueClass::Peptide, "ISOLEUCINE", "C6 H13 N O2", "131.173"),
    ("LEU", 'L', ResidueClass::Peptide, "LEUCINE", "C6 H13 N O2", "131.173"),
    ("LYS", 'K', ResidueClass::Peptide, "LYSINE", "C6 H15 N2 O2 1", "147.195"),
    ("MET", 'M', ResidueClass::Peptide, "METHIONINE", "C5 H11 N O2 S", "149.211"),
    ("PHE", 'F', ResidueClass::Peptide, "PHENYLALANINE", "C9 H11 N O2", "165.189"),
    ("PRO", 'P', ResidueClass::Peptide, "PROLINE", "C5 H9 N O2", "115.130"),
    ("SER", 'S', ResidueClass::Peptide, "SERINE", "C3 H7 N O3", "105.093"),
    ("THR", 'T', ResidueClass::Peptide, "THREONINE", "C4 H9 N O3", "119.119"),
    ("TRP", 'W', ResidueClass::Peptide, "TRYPTOPHAN", "C11 H12 N2 O2", "204.225"),
    ("TYR", 'Y', ResidueClass::Peptide, "TYROSINE", "C9 H11 N O3", "181.189"),
    ("VAL", 'V', ResidueClass::Peptide, "VALINE", "C5 H11 N O2", "117.146"),
    ("UNK", 'X', ResidueClass::Peptide, "UNKNOWN", "C4 H9 N O2", "103.120"),
    ("DA", 'A', ResidueClass::Dna, "2'-DEOXYADENOSINE-5'-MONOPHOSPHATE", "C10 H14 N5 O6 P", "331.222"),
    ("DC", 'C', ResidueClass::Dna, "2'-DEOXYCYTIDINE-5'-MONOPHOSPHATE", "C9 H14 N3 O7 P", "307.197"),
    ("DG", 'G', ResidueClass::Dna, "2'-DEOXYGUANOSINE-5'-MONOPHOSPHATE", "C10 H14 N5 O7 P", "347.221"),
    ("DT", 'T', ResidueClass::Dna, "THYMIDINE-5'-MONOPHOSPHATE", "C10 H15 N2 O8 P", "322.208"),
    ("DI", 'I', ResidueClass::Dna, "2'-DEOXYINOSINE-5'-MONOPHOSPHATE", "C10 H13 N4 O7 P", "332.207"),
    ("DU", 'U', ResidueClass::Dna, "2'-DEOXYURIDINE-5'-MONOPHOSPHATE", "C9 H13 N2 O8 P", "308.182"),
    ("A", 'A', ResidueClass::Rna, "ADENOSINE-5'-MONOPHOSPHATE", "C10 H14 N5 O7 P", "347.221"),
    ("C", 'C', ResidueClass::Rna, "CYTIDINE-5'-MONOPHOSPHATE", "C9 H14 N3 O8 P", "323.197"),
    ("G", 'G', ResidueClass::Rna, "GUANOSINE-5'-MONOPHOSPHATE", "C10 H14 N5 O8 P", "363.221"),
    ("U", 'U', ResidueClass::Rna, "URIDINE-5'-MONOPHOSPHATE", "C9 H13 N2 O9 P", "324.181"),
    ("I", 'I', ResidueClass::Rna, "INOSINIC ACID", "C10 H13 N4 O8 P", "348.206"),
    ("N", 'N', ResidueClass::Rna, "ANY 5'-MONOPHOSPHATE NUCLEOTIDE", "C5 H11 O7 P", "214.110"),
];

static STANDARD_RESIDUES: Lazy<HashMap<&'static str, StandardResidue>> = Lazy::new(|| {
    STANDARD
        .iter()
        .map(|&(id, code, class, name, formula, weight)| {
            (
                id,
                StandardResidue {
                    code,
                    class,
                    name,
                    formula,
                    weight,
                },
            )
        })
        .collect()
});

/// Common modified residues and the standard residue they derive from.
static MODIFIED_PARENTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("MSE", "MET"),
        ("SEP", "SER"),
        ("TPO", "THR"),
        ("PTR", "TYR"),
        ("CSO", "CYS"),
        ("CSD", "CYS"),
        ("CME", "CYS"),
        ("OCS", "CYS"),
        ("MLY", "LYS"),
        ("M3L", "LYS"),
        ("KCX", "LYS"),
        ("LLP", "LYS"),
        ("HYP", "PRO"),
        ("PCA", "GLN"),
        ("SEC", "CYS"),
        ("PYL", "LYS"),
        ("MLE", "LEU"),
        ("NLE", "LEU"),
        ("5MC", "C"),
        ("PSU", "U"),
        ("1MA", "A"),
        ("OMG", "G"),
    ]
    .into_iter()
    .collect()
});

const WATER: &[&str] = &["HOH", "DOD", "WAT", "H2O", "OH2", "TIP", "TIP3", "TIP4", "SOL"];

pub fn standard(name: &str) -> Option<&'static StandardResidue> {
    STANDARD_RESIDUES.get(name)
}

pub fn is_standard(name: &str) -> bool {
    STANDARD_RESIDUES.contains_key(name)
}

pub fn is_water(name: &str) -> bool {
    WATER.iter().any(|water| *water == name)
}

/// Standard parent of a well-known modified residue.
pub fn modified_parent(name: &str) -> Option<&'static str> {
    MODIFIED_PARENTS.get(name).copied()
}

/// Class of a residue, looking through modified residues to their parent.
pub fn class_of(name: &str, parent: Option<&str>) -> Option<ResidueClass> {
    standard(name)
        .or_else(|| parent.and_then(standard))
        .or_else(|| modified_parent(name).and_then(standard))
        .map(|residue| residue.class)
}

/// `entity_poly.pdbx_seq_one_letter_code` fragment: one letter for standard
/// residues, `(NAME)` otherwise.
pub fn one_letter(name: &str) -> String {
    match standard(name) {
        Some(residue) if name != "UNK" && name != "N" => residue.code.to_string(),
        _ => format!("({name})"),
    }
}

/// `entity_poly.pdbx_seq_one_letter_code_can` fragment.
pub fn canonical_letter(name: &str, parent: Option<&str>) -> char {
    standard(name)
        .or_else(|| parent.and_then(standard))
        .or_else(|| modified_parent(name).and_then(standard))
        .map(|residue| residue.code)
        .unwrap_or('X')
}

/// Residue name for a one-letter code within a polymer class.
pub fn residue_for_letter(letter: char, class: ResidueClass) -> &'static str {
    let letter = letter.to_ascii_uppercase();
    STANDARD
        .iter()
        .find(|&&(_, code, candidate, ..)| code == letter && candidate == class)
        .map(|&(id, ..)| id)
        .unwrap_or(match class {
            ResidueClass::Peptide => "UNK",
            ResidueClass::Dna | ResidueClass::Rna => "N",
        })
}

/// `chem_comp.type` for a residue.
pub fn chem_comp_type(name: &str, parent: Option<&str>, polymer: bool) -> &'static str {
    if !polymer {
        return "non-polymer";
    }
    match class_of(name, parent) {
        Some(ResidueClass::Peptide) if name == "GLY" => "peptide linking",
        Some(ResidueClass::Peptide) => "L-peptide linking",
        Some(ResidueClass::Dna) => "DNA linking",
        Some(ResidueClass::Rna) => "RNA linking",
        None => "other",
    }
}

/// Element symbol guessed from a PDB atom name when the element columns are
/// blank.
pub fn element_from_atom_name(name: &str) -> String {
    let letters: String = name
        .trim()
        .chars()
        .skip_while(|c| c.is_ascii_digit())
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    match letters.chars().next() {
        Some(first) => first.to_ascii_uppercase().to_string(),
        None => "X".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn one_letter_codes() {
        assert_eq!(one_letter("TRP"), "W");
        assert_eq!(one_letter("DG"), "G");
        assert_eq!(one_letter("MSE"), "(MSE)");
        assert_eq!(canonical_letter("MSE", None), 'M');
        assert_eq!(canonical_letter("XYZ", Some("SER")), 'S');
        assert_eq!(canonical_letter("XYZ", None), 'X');
    }

    #[test]
    fn classes_and_types() {
        assert_eq!(class_of("DA", None), Some(ResidueClass::Dna));
        assert_eq!(class_of("SEP", None), Some(ResidueClass::Peptide));
        assert_eq!(chem_comp_type("GLY", None, true), "peptide linking");
        assert_eq!(residue_for_letter('w', ResidueClass::Peptide), "TRP");
        assert_eq!(residue_for_letter('G', ResidueClass::Dna), "DG");
        assert_eq!(residue_for_letter('Z', ResidueClass::Rna), "N");
        assert_eq!(chem_comp_type("U", None, true), "RNA linking");
        assert_eq!(chem_comp_type("HEM", None, false), "non-polymer");
        assert!(is_water("HOH"));
        assert!(!is_water("HEM"));
    }

    #[test]
    fn elements_from_names() {
        assert_eq!(element_from_atom_name(" CA "), "C");
        assert_eq!(element_from_atom_name("1HB "), "H");
        assert_eq!(element_from_atom_name(""), "X");
    }
}
