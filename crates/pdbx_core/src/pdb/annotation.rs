//! Secondary structure, connectivity, cis peptides and sites, plus the pass
//! that fills label identifiers into every table keyed by author residue.

use super::molecules::Labels;
use super::records::{Line, Records};
use crate::error::Result;
use crate::model::{Category, Dictionary, Value};

pub(super) const HELIX_COLUMNS: [&str; 20] = [
    "conf_type_id",
    "id",
    "pdbx_PDB_helix_id",
    "beg_label_comp_id",
    "beg_label_asym_id",
    "beg_label_seq_id",
    "pdbx_beg_PDB_ins_code",
    "end_label_comp_id",
    "end_label_asym_id",
    "end_label_seq_id",
    "pdbx_end_PDB_ins_code",
    "beg_auth_comp_id",
    "beg_auth_asym_id",
    "beg_auth_seq_id",
    "end_auth_comp_id",
    "end_auth_asym_id",
    "end_auth_seq_id",
    "pdbx_PDB_helix_class",
    "details",
    "pdbx_PDB_helix_length",
];

pub(super) const SHEET_RANGE_COLUMNS: [&str; 16] = [
    "sheet_id",
    "id",
    "beg_label_comp_id",
    "beg_label_asym_id",
    "beg_label_seq_id",
    "pdbx_beg_PDB_ins_code",
    "end_label_comp_id",
    "end_label_asym_id",
    "end_label_seq_id",
    "pdbx_end_PDB_ins_code",
    "beg_auth_comp_id",
    "beg_auth_asym_id",
    "beg_auth_seq_id",
    "end_auth_comp_id",
    "end_auth_asym_id",
    "end_auth_seq_id",
];

pub(super) const HBOND_COLUMNS: [&str; 21] = [
    "sheet_id",
    "range_id_1",
    "range_id_2",
    "range_1_label_atom_id",
    "range_1_label_comp_id",
    "range_1_label_asym_id",
    "range_1_label_seq_id",
    "range_1_PDB_ins_code",
    "range_1_auth_atom_id",
    "range_1_auth_comp_id",
    "range_1_auth_asym_id",
    "range_1_auth_seq_id",
    "range_2_label_atom_id",
    "range_2_label_comp_id",
    "range_2_label_asym_id",
    "range_2_label_seq_id",
    "range_2_PDB_ins_code",
    "range_2_auth_atom_id",
    "range_2_auth_comp_id",
    "range_2_auth_asym_id",
    "range_2_auth_seq_id",
];

pub(super) const CONN_COLUMNS: [&str; 22] = [
    "id",
    "conn_type_id",
    "pdbx_PDB_id",
    "ptnr1_label_asym_id",
    "ptnr1_label_comp_id",
    "ptnr1_label_seq_id",
    "ptnr1_label_atom_id",
    "pdbx_ptnr1_label_alt_id",
    "pdbx_ptnr1_PDB_ins_code",
    "ptnr1_symmetry",
    "ptnr2_label_asym_id",
    "ptnr2_label_comp_id",
    "ptnr2_label_seq_id",
    "ptnr2_label_atom_id",
    "pdbx_ptnr2_label_alt_id",
    "pdbx_ptnr2_PDB_ins_code",
    "ptnr1_auth_asym_id",
    "ptnr1_auth_seq_id",
    "ptnr2_auth_asym_id",
    "ptnr2_auth_seq_id",
    "ptnr2_symmetry",
    "pdbx_dist_value",
];

pub(super) const CIS_COLUMNS: [&str; 17] = [
    "pdbx_id",
    "label_comp_id",
    "label_seq_id",
    "label_asym_id",
    "pdbx_PDB_ins_code",
    "auth_comp_id",
    "auth_seq_id",
    "auth_asym_id",
    "pdbx_label_comp_id_2",
    "pdbx_label_seq_id_2",
    "pdbx_label_asym_id_2",
    "pdbx_PDB_ins_code_2",
    "pdbx_auth_comp_id_2",
    "pdbx_auth_seq_id_2",
    "pdbx_auth_asym_id_2",
    "pdbx_PDB_model_num",
    "pdbx_omega_angle",
];

pub(super) const SITE_GEN_COLUMNS: [&str; 10] = [
    "id",
    "site_id",
    "pdbx_num_res",
    "label_comp_id",
    "label_asym_id",
    "label_seq_id",
    "pdbx_auth_ins_code",
    "auth_comp_id",
    "auth_asym_id",
    "auth_seq_id",
];

/// Elements whose LINK records are metal coordination.
const METALS: &[&str] = &[
    "LI", "NA", "K", "RB", "CS", "MG", "CA", "SR", "BA", "MN", "FE", "CO", "NI", "CU", "ZN",
    "CD", "HG", "AL", "GA", "PT", "AU", "AG", "PB", "MO", "W", "V", "CR",
];

/// A residue given by name, chain, number and insertion code in a record.
#[derive(Clone, Copy)]
struct Site {
    name: (usize, usize),
    chain: usize,
    number: (usize, usize),
    insertion: usize,
}

impl Site {
    const fn new(name: usize, chain: usize, number: usize, width: usize) -> Self {
        Self {
            name: (name, name + 2),
            chain,
            number: (number, number + width - 1),
            insertion: number + width,
        }
    }

    /// Label comp, asym and seq (left unknown for the label pass), then the
    /// insertion code.
    fn label_cells(&self, line: &Line<'_>) -> [Value; 4] {
        [
            line.value(self.name.0, self.name.1),
            Value::Unknown,
            Value::Unknown,
            line.value(self.insertion, self.insertion),
        ]
    }

    fn auth_cells(&self, line: &Line<'_>) -> [Value; 3] {
        [
            line.value(self.name.0, self.name.1),
            line.value(self.chain, self.chain),
            line.value(self.number.0, self.number.1),
        ]
    }

    fn is_empty(&self, line: &Line<'_>) -> bool {
        line.field(self.name.0, self.name.1).is_empty()
    }
}

fn helices(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    const BEGIN: Site = Site::new(16, 20, 22, 4);
    const END: Site = Site::new(28, 32, 34, 4);
    let mut category = Category::new("struct_conf", HELIX_COLUMNS);
    for line in records.named("HELIX") {
        let mut row = vec![
            Value::text("HELX_P"),
            Value::text(format!("HELX_P{}", category.len() + 1)),
            line.value(12, 14),
        ];
        row.extend(BEGIN.label_cells(&line));
        row.extend(END.label_cells(&line));
        row.extend(BEGIN.auth_cells(&line));
        row.extend(END.auth_cells(&line));
        row.extend([line.value(39, 40), line.value(41, 70), line.value(72, 76)]);
        category.push_row(row)?;
    }
    if !category.is_empty() {
        let mut types = Category::new("struct_conf_type", ["id"]);
        types.push(["HELX_P"])?;
        dictionary.insert(category);
        dictionary.insert(types);
    }
    Ok(())
}

fn sheets(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    const BEGIN: Site = Site::new(18, 22, 23, 4);
    const END: Site = Site::new(29, 33, 34, 4);
    let mut sheets = Category::new("struct_sheet", ["id", "type", "number_strands", "details"]);
    let mut order = Category::new(
        "struct_sheet_order",
        ["sheet_id", "range_id_1", "range_id_2", "offset", "sense"],
    );
    let mut ranges = Category::new("struct_sheet_range", SHEET_RANGE_COLUMNS);
    let mut hbonds = Category::new("pdbx_struct_sheet_hbond", HBOND_COLUMNS);
    let mut seen: Vec<String> = Vec::new();

    for line in records.named("SHEET") {
        let sheet = line.field(12, 14).to_string();
        let strand = line.field(8, 10).to_string();
        if !seen.contains(&sheet) {
            sheets.push([
                Value::text(&sheet),
                Value::Unknown,
                line.number(15, 16),
                Value::Unknown,
            ])?;
            seen.push(sheet.clone());
        }
        let mut row = vec![Value::text(&sheet), Value::text(&strand)];
        row.extend(BEGIN.label_cells(&line));
        row.extend(END.label_cells(&line));
        row.extend(BEGIN.auth_cells(&line));
        row.extend(END.auth_cells(&line));
        ranges.push_row(row)?;

        let previous = strand
            .parse::<u32>()
            .ok()
            .filter(|&number| number > 1)
            .map(|number| (number - 1).to_string());
        let Some(previous) = previous else {
            continue;
        };
        let sense = match line.field(39, 40) {
            "1" => "parallel",
            "-1" => "anti-parallel",
            _ => continue,
        };
        order.push([
            Value::text(&sheet),
            Value::text(&previous),
            Value::text(&strand),
            Value::Unknown,
            Value::text(sense),
        ])?;
        if line.field(42, 45).is_empty() {
            continue;
        }
        let mut row = vec![Value::text(&sheet), Value::text(&previous), Value::text(&strand)];
        for (atom, residue) in [((57, 60), Site::new(61, 65, 66, 4)), ((42, 45), Site::new(46, 50, 51, 4))] {
            let atom = line.value(atom.0, atom.1);
            row.push(atom.clone());
            row.extend(residue.label_cells(&line));
            row.push(atom);
            row.extend(residue.auth_cells(&line));
        }
        hbonds.push_row(row)?;
    }
    dictionary.insert_non_empty(sheets);
    dictionary.insert_non_empty(order);
    dictionary.insert_non_empty(ranges);
    dictionary.insert_non_empty(hbonds);
    Ok(())
}

/// `1555` to `1_555`.
fn symmetry(line: &Line<'_>, start: usize, end: usize) -> Value {
    match line.field(start, end) {
        "" => Value::Unknown,
        code if code.len() > 3 && code.bytes().all(|byte| byte.is_ascii_digit()) => {
            let (operator, translation) = code.split_at(code.len() - 3);
            Value::text(format!("{operator}_{translation}"))
        }
        code => Value::text(code),
    }
}

pub(super) fn is_metal(atom: &str) -> bool {
    METALS.contains(&atom)
}

/// Partner atom columns: name, alt location then the residue. SSBOND
/// partners have no atom columns and are always SG.
struct Partner {
    atom: Option<(usize, usize)>,
    alt: Option<usize>,
    residue: Site,
}

fn partner_cells(partner: &Partner, line: &Line<'_>, atom: Value) -> ([Value; 6], [Value; 2]) {
    let label = partner.residue.label_cells(line);
    let alt = match partner.alt {
        Some(column) => line.value(column, column),
        None => Value::Unknown,
    };
    let [comp, asym, seq, insertion] = label;
    let [_, chain, number] = partner.residue.auth_cells(line);
    ([asym, comp, seq, atom, alt, insertion], [chain, number])
}

fn connections(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    let mut category = Category::new("struct_conn", CONN_COLUMNS);
    let mut kinds: Vec<&str> = Vec::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut next_id = |kind: &'static str| {
        let count = match counts.iter_mut().find(|(name, _)| *name == kind) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                counts.push((kind, 1));
                1
            }
        };
        format!("{kind}{count}")
    };

    for line in records.all() {
        let (kind, first, second) = match line.record() {
            "SSBOND" => (
                "disulf",
                Partner {
                    atom: None,
                    alt: None,
                    residue: Site::new(12, 16, 18, 4),
                },
                Partner {
                    atom: None,
                    alt: None,
                    residue: Site::new(26, 30, 32, 4),
                },
            ),
            "LINK" => {
                let metal = is_metal(line.field(13, 16)) || is_metal(line.field(43, 46));
                (
                    if metal { "metalc" } else { "covale" },
                    Partner {
                        atom: Some((13, 16)),
                        alt: Some(17),
                        residue: Site::new(18, 22, 23, 4),
                    },
                    Partner {
                        atom: Some((43, 46)),
                        alt: Some(47),
                        residue: Site::new(48, 52, 53, 4),
                    },
                )
            }
            _ => continue,
        };
        let atom = |partner: &Partner| match partner.atom {
            Some((start, end)) => line.value(start, end),
            None => Value::text("SG"),
        };
        let (label_1, auth_1) = partner_cells(&first, line, atom(&first));
        let (label_2, auth_2) = partner_cells(&second, line, atom(&second));
        let mut row = vec![Value::text(next_id(kind)), Value::text(kind), Value::Unknown];
        row.extend(label_1);
        row.push(symmetry(line, 60, 65));
        row.extend(label_2);
        row.extend(auth_1);
        row.extend(auth_2);
        row.extend([symmetry(line, 67, 72), line.number(74, 78)]);
        category.push_row(row)?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    if !category.is_empty() {
        let mut types = Category::new("struct_conn_type", ["id"]);
        for kind in kinds {
            types.push([kind])?;
        }
        dictionary.insert(category);
        dictionary.insert(types);
    }
    Ok(())
}

fn cis_peptides(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    const FIRST: Site = Site::new(12, 16, 18, 4);
    const SECOND: Site = Site::new(26, 30, 32, 4);
    let mut category = Category::new("struct_mon_prot_cis", CIS_COLUMNS);
    for line in records.named("CISPEP") {
        let mut row = vec![line.value(8, 10)];
        for site in [FIRST, SECOND] {
            let [comp, asym, seq, insertion] = site.label_cells(&line);
            let [auth_comp, chain, number] = site.auth_cells(&line);
            row.extend([comp, seq, asym, insertion, auth_comp, number, chain]);
        }
        row.extend([line.value(44, 46), line.number(54, 59)]);
        category.push_row(row)?;
    }
    dictionary.insert_non_empty(category);
    Ok(())
}

/// SITE residues per line, then the REMARK 800 descriptions.
fn sites(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    const SLOTS: [Site; 4] = [
        Site::new(19, 23, 24, 4),
        Site::new(30, 34, 35, 4),
        Site::new(41, 45, 46, 4),
        Site::new(52, 56, 57, 4),
    ];
    let mut order: Vec<String> = Vec::new();
    let mut generators = Category::new("struct_site_gen", SITE_GEN_COLUMNS);
    for line in records.named("SITE") {
        let site = line.field(12, 14).to_string();
        if !order.contains(&site) {
            order.push(site.clone());
        }
        for slot in SLOTS.iter().filter(|slot| !slot.is_empty(&line)) {
            let mut row = vec![
                Value::from(generators.len() + 1),
                Value::text(&site),
                line.number(16, 17),
            ];
            let [comp, asym, seq, insertion] = slot.label_cells(&line);
            row.extend([comp, asym, seq, insertion]);
            row.extend(slot.auth_cells(&line));
            generators.push_row(row)?;
        }
    }

    let mut described: Vec<(String, Option<String>, Option<String>)> = Vec::new();
    let mut last_key = String::new();
    for line in records.remarks(800) {
        let text = line.rest(12);
        match text.split_once(':') {
            Some((key, value)) if !key.contains(' ') => {
                let (key, value) = (key.trim(), value.trim().to_string());
                match key {
                    "SITE_IDENTIFIER" => described.push((value, None, None)),
                    "EVIDENCE_CODE" => {
                        if let Some(site) = described.last_mut() {
                            site.1 = Some(value);
                        }
                    }
                    "SITE_DESCRIPTION" => {
                        if let Some(site) = described.last_mut() {
                            site.2 = Some(value);
                        }
                    }
                    _ => {}
                }
                last_key = key.to_string();
            }
            _ if text.is_empty() => last_key.clear(),
            _ if last_key == "SITE_DESCRIPTION" => {
                if let Some(description) = described.last_mut().and_then(|site| site.2.as_mut()) {
                    description.push(' ');
                    description.push_str(text);
                }
            }
            _ => {}
        }
    }
    for (site, _, _) in &described {
        if !order.contains(site) {
            order.push(site.clone());
        }
    }

    let mut category = Category::new("struct_site", ["id", "pdbx_evidence_code", "details"]);
    for site in order {
        let (evidence, details) = described
            .iter()
            .find(|(id, _, _)| *id == site)
            .map(|(_, evidence, details)| (evidence.clone(), details.clone()))
            .unwrap_or_default();
        category.push([Value::text(site), Value::from(evidence), Value::from(details)])?;
    }
    dictionary.insert_non_empty(category);
    dictionary.insert_non_empty(generators);
    Ok(())
}

pub(super) fn read(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    helices(records, dictionary)?;
    sheets(records, dictionary)?;
    connections(records, dictionary)?;
    cis_peptides(records, dictionary)?;
    sites(records, dictionary)
}

/// Where one residue reference sits in a table: the label asym and seq
/// columns to fill from the author chain, number and insertion columns.
struct Reference {
    category: &'static str,
    label_asym: Option<&'static str>,
    label_seq: &'static str,
    auth_asym: &'static str,
    auth_seq: &'static str,
    insertion: Option<&'static str>,
}

const fn reference(
    category: &'static str,
    label_asym: Option<&'static str>,
    label_seq: &'static str,
    auth_asym: &'static str,
    auth_seq: &'static str,
    insertion: Option<&'static str>,
) -> Reference {
    Reference {
        category,
        label_asym,
        label_seq,
        auth_asym,
        auth_seq,
        insertion,
    }
}

const REFERENCES: &[Reference] = &[
    reference("struct_conf", Some("beg_label_asym_id"), "beg_label_seq_id", "beg_auth_asym_id", "beg_auth_seq_id", Some("pdbx_beg_PDB_ins_code")),
    reference("struct_conf", Some("end_label_asym_id"), "end_label_seq_id", "end_auth_asym_id", "end_auth_seq_id", Some("pdbx_end_PDB_ins_code")),
    reference("struct_sheet_range", Some("beg_label_asym_id"), "beg_label_seq_id", "beg_auth_asym_id", "beg_auth_seq_id", Some("pdbx_beg_PDB_ins_code")),
    reference("struct_sheet_range", Some("end_label_asym_id"), "end_label_seq_id", "end_auth_asym_id", "end_auth_seq_id", Some("pdbx_end_PDB_ins_code")),
    reference("pdbx_struct_sheet_hbond", Some("range_1_label_asym_id"), "range_1_label_seq_id", "range_1_auth_asym_id", "range_1_auth_seq_id", Some("range_1_PDB_ins_code")),
    reference("pdbx_struct_sheet_hbond", Some("range_2_label_asym_id"), "range_2_label_seq_id", "range_2_auth_asym_id", "range_2_auth_seq_id", Some("range_2_PDB_ins_code")),
    reference("struct_conn", Some("ptnr1_label_asym_id"), "ptnr1_label_seq_id", "ptnr1_auth_asym_id", "ptnr1_auth_seq_id", Some("pdbx_ptnr1_PDB_ins_code")),
    reference("struct_conn", Some("ptnr2_label_asym_id"), "ptnr2_label_seq_id", "ptnr2_auth_asym_id", "ptnr2_auth_seq_id", Some("pdbx_ptnr2_PDB_ins_code")),
    reference("struct_mon_prot_cis", Some("label_asym_id"), "label_seq_id", "auth_asym_id", "auth_seq_id", Some("pdbx_PDB_ins_code")),
    reference("struct_mon_prot_cis", Some("pdbx_label_asym_id_2"), "pdbx_label_seq_id_2", "pdbx_auth_asym_id_2", "pdbx_auth_seq_id_2", Some("pdbx_PDB_ins_code_2")),
    reference("struct_site_gen", Some("label_asym_id"), "label_seq_id", "auth_asym_id", "auth_seq_id", Some("pdbx_auth_ins_code")),
    reference("pdbx_struct_mod_residue", Some("label_asym_id"), "label_seq_id", "auth_asym_id", "auth_seq_id", Some("PDB_ins_code")),
    reference("struct_ref_seq_dif", None, "seq_num", "pdbx_pdb_strand_id", "pdbx_auth_seq_num", Some("pdbx_pdb_ins_code")),
    reference("struct_ref_seq", None, "seq_align_beg", "pdbx_strand_id", "pdbx_auth_seq_align_beg", Some("pdbx_seq_align_beg_ins_code")),
    reference("struct_ref_seq", None, "seq_align_end", "pdbx_strand_id", "pdbx_auth_seq_align_end", Some("pdbx_seq_align_end_ins_code")),
];

/// Fills label asym and seq columns of author-keyed tables. Cells are only
/// replaced when the author residue was observed in the atom records.
pub(super) fn propagate(labels: &Labels, dictionary: &mut Dictionary) -> Result<()> {
    let mut filled = 0usize;
    for reference in REFERENCES {
        let Some(category) = dictionary.get_mut(reference.category) else {
            continue;
        };
        let column = |name: &str| category.column_index(name);
        let (Some(label_seq), Some(auth_asym), Some(auth_seq)) = (
            column(reference.label_seq),
            column(reference.auth_asym),
            column(reference.auth_seq),
        ) else {
            continue;
        };
        let label_asym = reference.label_asym.and_then(column);
        let insertion = reference.insertion.and_then(column);

        for row in 0..category.len() {
            let cells = &category.raw_rows()[row];
            let chain = cells[auth_asym].known().unwrap_or("");
            let number = cells[auth_seq].known().unwrap_or("");
            let code = insertion
                .and_then(|index| cells[index].known())
                .unwrap_or("");
            let Some(label) = labels.get(chain, number, code) else {
                continue;
            };
            let (asym, seq) = (Value::text(&label.asym), label.seq.clone());
            if let Some(index) = label_asym {
                if let Some(cell) = category.cell_mut(row, index) {
                    *cell = asym;
                }
            }
            if let Some(cell) = category.cell_mut(row, label_seq) {
                *cell = seq;
            }
            filled += 1;
        }
    }
    tracing::trace!(filled, "label identifiers propagated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdb::molecules;
    use pretty_assertions::assert_eq;

    const FILE: &str = "\
HELIX    1   1 VAL A   11  GLY A   12  1                                   2
SHEET    1   A 2 VAL A  11  GLY A  12  0
SHEET    2   A 2 ALA B   1  GLY B   2 -1  N  ALA B   1   O  GLY A  12
SSBOND   1 CYS A    6    CYS A  127                          1555   1555  2.03
LINK         O   GLY A  12                ZN    ZN A 301     1555   1555  2.10
CISPEP   1 VAL A   11    GLY A   12          0        -3.35
REMARK 800
REMARK 800 SITE
REMARK 800 SITE_IDENTIFIER: AC1
REMARK 800 EVIDENCE_CODE: SOFTWARE
REMARK 800 SITE_DESCRIPTION: BINDING SITE FOR RESIDUE ZN A
REMARK 800 301
SITE     1 AC1  2 GLY A  12  HOH A 401
ATOM      1  N   VAL A  11       3.696  33.898  63.219  1.00 21.50           N
ATOM      2  N   GLY A  12       4.225  32.018  61.739  1.00 18.23           N
TER       3      GLY A  12
HETATM    4 ZN    ZN A 301       7.000  30.000  60.000  1.00 30.00          ZN
HETATM    5  O   HOH A 401       1.000   2.000   3.000  1.00 40.00           O
ATOM      6  N   ALA B   1       1.000   2.000   3.000  1.00 40.00           N
ATOM      7  N   GLY B   2       1.000   2.000   3.000  1.00 40.00           N
";

    fn parse() -> Dictionary {
        let records = Records::new(FILE);
        let mut dictionary = Dictionary::new();
        let labels = molecules::read(&records, true, &mut dictionary).expect("molecules");
        let mut annotations = Dictionary::new();
        read(&records, &mut annotations).expect("annotations");
        propagate(&labels, &mut annotations).expect("labels");
        annotations
    }

    #[test]
    fn helices_get_labels() {
        let dictionary = parse();
        let helix = dictionary.get("struct_conf").and_then(Category::first).expect("helix");
        assert_eq!(helix.str("id"), "HELX_P1");
        assert_eq!(helix.str("beg_label_asym_id"), "A");
        assert_eq!(helix.str("beg_label_seq_id"), "1");
        assert_eq!(helix.str("end_label_seq_id"), "2");
        assert_eq!(helix.str("pdbx_PDB_helix_class"), "1");
        assert_eq!(helix.str("pdbx_PDB_helix_length"), "2");
        assert_eq!(dictionary.known("struct_conf_type", "id"), Some("HELX_P"));
    }

    #[test]
    fn sheets_with_registration() {
        let dictionary = parse();
        assert_eq!(dictionary.known("struct_sheet", "number_strands"), Some("2"));
        assert_eq!(dictionary.known("struct_sheet_order", "sense"), Some("anti-parallel"));
        let ranges = dictionary.get("struct_sheet_range").expect("ranges");
        assert_eq!(ranges.value(1, "beg_label_asym_id").map(Value::as_str), Some("B"));
        let hbond = dictionary.get("pdbx_struct_sheet_hbond").and_then(Category::first).expect("hbond");
        assert_eq!(hbond.str("range_1_auth_seq_id"), "12");
        assert_eq!(hbond.str("range_1_label_atom_id"), "O");
        assert_eq!(hbond.str("range_2_auth_asym_id"), "B");
        assert_eq!(hbond.str("range_2_label_seq_id"), "1");
    }

    #[test]
    fn connections_are_typed() {
        let dictionary = parse();
        let conn = dictionary.get("struct_conn").expect("conn");
        let ids: Vec<&str> = conn.column("id").expect("id").map(Value::as_str).collect();
        assert_eq!(ids, vec!["disulf1", "metalc1"]);
        let ssbond = conn.first().expect("ssbond");
        assert_eq!(ssbond.str("ptnr1_label_atom_id"), "SG");
        assert_eq!(ssbond.str("ptnr1_symmetry"), "1_555");
        assert_eq!(ssbond.str("pdbx_dist_value"), "2.03");
        assert_eq!(ssbond.get("ptnr1_label_seq_id"), Some(&Value::Unknown));
        let link = conn.row(1).expect("link");
        assert_eq!(link.str("ptnr2_label_atom_id"), "ZN");
        assert_eq!(link.str("ptnr2_label_asym_id"), "C");
        assert_eq!(link.str("ptnr2_label_seq_id"), ".");
        assert_eq!(link.str("ptnr1_label_seq_id"), "2");
    }

    #[test]
    fn cis_peptides_and_sites() {
        let dictionary = parse();
        let cis = dictionary.get("struct_mon_prot_cis").and_then(Category::first).expect("cis");
        assert_eq!(cis.str("label_seq_id"), "1");
        assert_eq!(cis.str("pdbx_label_seq_id_2"), "2");
        assert_eq!(cis.str("pdbx_omega_angle"), "-3.35");
        assert_eq!(cis.str("pdbx_PDB_model_num"), "0");

        assert_eq!(dictionary.known("struct_site", "pdbx_evidence_code"), Some("SOFTWARE"));
        assert_eq!(
            dictionary.known("struct_site", "details"),
            Some("BINDING SITE FOR RESIDUE ZN A 301")
        );
        let generators = dictionary.get("struct_site_gen").expect("site gen");
        assert_eq!(generators.len(), 2);
        assert_eq!(generators.value(1, "label_asym_id").map(Value::as_str), Some("D"));
    }
}
