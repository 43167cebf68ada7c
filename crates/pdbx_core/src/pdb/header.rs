//! Title section records: everything that describes the entry rather than
//! its molecules.

use super::records::{date_value, join_list, join_text, number, Line, Records};
use crate::error::Result;
use crate::model::{Category, Dictionary, Value};

/// Builds the header categories and returns the entry id.
pub(super) fn read(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<Value> {
    let header = records.first("HEADER");
    let code = header
        .map(|line| line.field(63, 66))
        .filter(|code| !code.is_empty())
        .unwrap_or("XXXX");
    let entry_id = Value::text(code);
    let mut entry = Category::new("entry", ["id"]);
    entry.push([&entry_id])?;
    dictionary.insert(entry);

    authors(records, dictionary)?;
    journal(records, dictionary)?;
    title(records, &entry_id, dictionary)?;
    keywords(records, header, &entry_id, dictionary)?;
    if let Some(header) = header {
        let mut status = Category::new(
            "pdbx_database_status",
            ["status_code", "entry_id", "recvd_initial_deposition_date"],
        );
        status.push([
            Value::text("REL"),
            entry_id.clone(),
            date_value(header.field(51, 59)),
        ])?;
        dictionary.insert(status);
    }
    related(records, dictionary)?;
    obsolete(records, dictionary)?;
    caveat(records, dictionary)?;
    revisions(records, dictionary)?;
    let methods = experiment(records, &entry_id, dictionary)?;
    model_type(records, dictionary)?;
    refinement(records, &entry_id, methods.first(), dictionary)?;
    crystal(records, &entry_id, dictionary)?;
    transforms(records, &entry_id, dictionary)?;
    Ok(entry_id)
}

fn authors(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    let names = join_list(records.named("AUTHOR").map(|line| line.rest(11)));
    let mut audit = Category::new("audit_author", ["name", "pdbx_ordinal"]);
    for (index, name) in split_names(&names).enumerate() {
        audit.push([Value::text(name), Value::from(index + 1)])?;
    }
    dictionary.insert_non_empty(audit);
    Ok(())
}

fn split_names(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|name| !name.is_empty())
}

fn journal(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    let lines: Vec<Line<'_>> = records.named("JRNL").collect();
    if lines.is_empty() {
        return Ok(());
    }
    let sub = |name: &'static str| lines.iter().copied().filter(move |line| line.field(13, 16) == name);
    let title = join_text(sub("TITL").map(|line| line.rest(20)));
    let first_ref = sub("REF").next();
    let publication = join_text(sub("REF").map(|line| line.field(20, 47)));
    let refn = sub("REFN").next();
    let single = |name: &'static str| {
        sub(name)
            .next()
            .map(|line| line.value(20, 79))
            .unwrap_or_default()
    };

    let mut citation = Category::new(
        "citation",
        [
            "id",
            "title",
            "journal_abbrev",
            "journal_volume",
            "page_first",
            "year",
            "journal_id_ISSN",
            "pdbx_database_id_PubMed",
            "pdbx_database_id_DOI",
        ],
    );
    citation.push([
        Value::text("primary"),
        Value::from((!title.is_empty()).then_some(title)),
        Value::from((!publication.is_empty()).then_some(publication)),
        first_ref.map(|line| line.value(52, 55)).unwrap_or_default(),
        first_ref.map(|line| line.value(57, 61)).unwrap_or_default(),
        first_ref.map(|line| line.value(63, 66)).unwrap_or_default(),
        refn.map(|line| line.value(41, 65)).unwrap_or_default(),
        single("PMID"),
        single("DOI"),
    ])?;
    dictionary.insert(citation);

    for (record, category) in [("AUTH", "citation_author"), ("EDIT", "citation_editor")] {
        let names = join_list(sub(record).map(|line| line.rest(20)));
        let mut people = Category::new(category, ["citation_id", "name", "ordinal"]);
        for (index, name) in split_names(&names).enumerate() {
            people.push([
                Value::text("primary"),
                Value::text(name),
                Value::from(index + 1),
            ])?;
        }
        dictionary.insert_non_empty(people);
    }
    Ok(())
}

fn title(records: &Records<'_>, entry_id: &Value, dictionary: &mut Dictionary) -> Result<()> {
    if let Some(text) = records.joined("TITLE", 11) {
        let mut category = Category::new("struct", ["entry_id", "title"]);
        category.push([entry_id.clone(), Value::text(text)])?;
        dictionary.insert(category);
    }
    Ok(())
}

fn keywords(
    records: &Records<'_>,
    header: Option<Line<'_>>,
    entry_id: &Value,
    dictionary: &mut Dictionary,
) -> Result<()> {
    let text = records.joined("KEYWDS", 11);
    if header.is_none() && text.is_none() {
        return Ok(());
    }
    let mut category = Category::new("struct_keywords", ["entry_id", "pdbx_keywords", "text"]);
    category.push([
        entry_id.clone(),
        header.map(|line| line.value(11, 50)).unwrap_or_default(),
        Value::from(text),
    ])?;
    dictionary.insert(category);
    Ok(())
}

fn related(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    let mut category = Category::new(
        "pdbx_database_related",
        ["db_name", "db_id", "content_type", "details"],
    );
    for line in records.named("SPLIT") {
        for id in line.rest(12).split_whitespace() {
            category.push(["PDB", id, "split", "?"])?;
        }
    }
    dictionary.insert_non_empty(category);
    Ok(())
}

fn obsolete(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    let mut category = Category::new(
        "pdbx_database_PDB_obs_spr",
        ["id", "date", "pdb_id", "replace_pdb_id", "details"],
    );
    for record in ["OBSLTE", "SPRSDE"] {
        let lines: Vec<Line<'_>> = records.named(record).collect();
        let Some(first) = lines.first() else {
            continue;
        };
        let others = lines
            .iter()
            .flat_map(|line| line.rest(32).split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        let this = first.value(22, 25);
        let others = Value::from((!others.is_empty()).then_some(others));
        let (pdb_id, replaced) = if record == "OBSLTE" {
            (others, this)
        } else {
            (this, others)
        };
        category.push([
            Value::text(record),
            date_value(first.field(12, 20)),
            pdb_id,
            replaced,
            Value::Unknown,
        ])?;
    }
    dictionary.insert_non_empty(category);
    Ok(())
}

fn caveat(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    let text = join_text(records.named("CAVEAT").map(|line| line.rest(20)));
    if !text.is_empty() {
        let mut category = Category::new("database_PDB_caveat", ["id", "text"]);
        category.push(["1".to_string(), text])?;
        dictionary.insert(category);
    }
    Ok(())
}

fn revisions(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    let mut revisions = Category::new(
        "database_PDB_rev",
        ["num", "date", "replaces", "mod_type"],
    );
    let mut changes = Category::new("database_PDB_rev_record", ["rev_num", "type"]);
    for line in records.named("REVDAT") {
        let num = line.value(8, 10);
        if line.field(11, 12).is_empty() {
            revisions.push([
                num.clone(),
                date_value(line.field(14, 22)),
                line.value(24, 27),
                line.value(32, 32),
            ])?;
        }
        for (start, end) in [(40, 45), (47, 52), (54, 59), (61, 66)] {
            let change = line.field(start, end);
            if !change.is_empty() {
                changes.push([num.clone(), Value::text(change)])?;
            }
        }
    }
    dictionary.insert_non_empty(revisions);
    dictionary.insert_non_empty(changes);
    Ok(())
}

fn experiment(
    records: &Records<'_>,
    entry_id: &Value,
    dictionary: &mut Dictionary,
) -> Result<Vec<String>> {
    let methods: Vec<String> = records
        .joined("EXPDTA", 11)
        .map(|text| {
            text.split(';')
                .map(str::trim)
                .filter(|method| !method.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let mut exptl = Category::new("exptl", ["entry_id", "method"]);
    for method in &methods {
        exptl.push([entry_id.clone(), Value::text(method)])?;
    }
    dictionary.insert_non_empty(exptl);
    Ok(methods)
}

fn model_type(records: &Records<'_>, dictionary: &mut Dictionary) -> Result<()> {
    let Some(text) = records.joined("MDLTYP", 11) else {
        return Ok(());
    };
    let mut category = Category::new("pdbx_coordinate_model", ["asym_id", "type"]);
    for item in text.split(';').map(str::trim) {
        let Some((kind, chains)) = item.split_once(", CHAIN") else {
            continue;
        };
        for chain in chains.split(',').map(str::trim).filter(|chain| !chain.is_empty()) {
            category.push([chain, kind.trim()])?;
        }
    }
    dictionary.insert_non_empty(category);
    Ok(())
}

/// REMARK 3 keys and the `refine` columns they fill.
const REFINE_KEYS: &[(&str, &str)] = &[
    ("RESOLUTION RANGE HIGH (ANGSTROMS)", "ls_d_res_high"),
    ("RESOLUTION RANGE LOW (ANGSTROMS)", "ls_d_res_low"),
    ("R VALUE (WORKING + TEST SET)", "ls_R_factor_obs"),
    ("R VALUE (WORKING SET)", "ls_R_factor_R_work"),
    ("FREE R VALUE", "ls_R_factor_R_free"),
    ("NUMBER OF REFLECTIONS", "ls_number_reflns_obs"),
];

pub(super) const REFINE_COLUMNS: [&str; 8] = [
    "pdbx_refine_id",
    "entry_id",
    "ls_d_res_high",
    "ls_d_res_low",
    "ls_R_factor_obs",
    "ls_R_factor_R_work",
    "ls_R_factor_R_free",
    "ls_number_reflns_obs",
];

pub(super) fn refine_key(column: &str) -> Option<&'static str> {
    REFINE_KEYS
        .iter()
        .find(|(_, name)| *name == column)
        .map(|(key, _)| *key)
}

fn refinement(
    records: &Records<'_>,
    entry_id: &Value,
    method: Option<&String>,
    dictionary: &mut Dictionary,
) -> Result<()> {
    let mut values = vec![Value::Unknown; REFINE_COLUMNS.len()];
    let slot = |column: &str| REFINE_COLUMNS.iter().position(|name| *name == column);

    for line in records.remarks(3) {
        let Some((key, value)) = line.rest(11).split_once(':') else {
            continue;
        };
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ");
        let Some(&(_, column)) = REFINE_KEYS.iter().find(|(name, _)| *name == key) else {
            continue;
        };
        if let Some(index) = slot(column) {
            if values[index].is_missing() {
                values[index] = match value.trim() {
                    "NULL" => Value::Unknown,
                    text => number(text),
                };
            }
        }
    }
    let resolution = records.remarks(2).find_map(|line| {
        let (_, after) = line.rest(11).split_once("RESOLUTION.")?;
        let token = after.split_whitespace().next()?;
        Some(if token == "NOT" {
            Value::Inapplicable
        } else {
            number(token)
        })
    });
    if let (Some(resolution), Some(index)) = (resolution, slot("ls_d_res_high")) {
        values[index] = resolution;
    }
    if values.iter().all(Value::is_missing) {
        return Ok(());
    }
    values[0] = Value::from(method.cloned());
    values[1] = entry_id.clone();
    let mut refine = Category::new("refine", REFINE_COLUMNS);
    refine.push_row(values)?;
    dictionary.insert(refine);
    Ok(())
}

fn crystal(records: &Records<'_>, entry_id: &Value, dictionary: &mut Dictionary) -> Result<()> {
    let Some(line) = records.first("CRYST1") else {
        return Ok(());
    };
    let mut cell = Category::new(
        "cell",
        [
            "entry_id",
            "length_a",
            "length_b",
            "length_c",
            "angle_alpha",
            "angle_beta",
            "angle_gamma",
            "Z_PDB",
        ],
    );
    cell.push([
        entry_id.clone(),
        line.number(7, 15),
        line.number(16, 24),
        line.number(25, 33),
        line.number(34, 40),
        line.number(41, 47),
        line.number(48, 54),
        line.number(67, 70),
    ])?;
    dictionary.insert(cell);
    let mut symmetry = Category::new("symmetry", ["entry_id", "space_group_name_H-M"]);
    symmetry.push([entry_id.clone(), line.value(56, 66)])?;
    dictionary.insert(symmetry);
    Ok(())
}

/// Column names of a 3x4 transform stored as `matrix[i][j]` then `vector[i]`.
pub(super) fn transform_columns(matrix: &str, vector: &str) -> Vec<String> {
    let mut columns = Vec::with_capacity(12);
    for row in 1..=3 {
        for column in 1..=3 {
            columns.push(format!("{matrix}[{row}][{column}]"));
        }
    }
    for row in 1..=3 {
        columns.push(format!("{vector}[{row}]"));
    }
    columns
}

/// The three ORIGXn/SCALEn style rows as matrix values then vector values.
fn transform_values(rows: [Option<Line<'_>>; 3]) -> Option<Vec<Value>> {
    let rows = [rows[0]?, rows[1]?, rows[2]?];
    let mut values: Vec<Value> = rows
        .iter()
        .flat_map(|line| [line.number(11, 20), line.number(21, 30), line.number(31, 40)])
        .collect();
    values.extend(rows.iter().map(|line| line.number(46, 55)));
    Some(values)
}

fn transforms(records: &Records<'_>, entry_id: &Value, dictionary: &mut Dictionary) -> Result<()> {
    for (record, category, matrix, vector) in [
        ("ORIGX", "database_PDB_matrix", "origx", "origx_vector"),
        ("SCALE", "atom_sites", "fract_transf_matrix", "fract_transf_vector"),
    ] {
        let rows = [1, 2, 3].map(|n| records.first(&format!("{record}{n}")));
        if let Some(values) = transform_values(rows) {
            let mut columns = vec!["entry_id".to_string()];
            columns.extend(transform_columns(matrix, vector));
            let mut table = Category::new(category, columns);
            let mut row = vec![entry_id.clone()];
            row.extend(values);
            table.push_row(row)?;
            dictionary.insert(table);
        }
    }

    let mut columns = vec!["id".to_string(), "code".to_string()];
    columns.extend(transform_columns("matrix", "vector"));
    let mut ncs = Category::new("struct_ncs_oper", columns);
    let mut serials: Vec<&str> = Vec::new();
    for line in records.named("MTRIX1") {
        let serial = line.field(8, 10);
        if !serials.contains(&serial) {
            serials.push(serial);
        }
    }
    for serial in serials {
        let find = |n: u32| {
            records
                .named(&format!("MTRIX{n}"))
                .find(|line| line.field(8, 10) == serial)
        };
        let rows = [find(1), find(2), find(3)];
        let given = rows[0].map(|line| line.field(60, 60) == "1").unwrap_or(false);
        if let Some(values) = transform_values(rows) {
            let mut row = vec![
                Value::text(serial),
                Value::text(if given { "given" } else { "generate" }),
            ];
            row.extend(values);
            ncs.push_row(row)?;
        }
    }
    dictionary.insert_non_empty(ncs);
    Ok(())
}
