//! PDB output. Every record the reader understands is regenerated from the
//! canonical tables, so reading the output gives back the same dictionary.

use std::collections::HashMap;
use std::fmt::Write as _;

use super::annotation::is_metal;
use super::assembly::PROPERTIES;
use super::compound::{SRC_GEN_COLUMNS, SRC_NAT_COLUMNS};
use super::header::{refine_key, REFINE_COLUMNS};
use super::molecules::default_formula;
use super::records::{blank, charge_text, fixed, format_date, hybrid36_encode, wrap, wrap_list};
use crate::metadata::{compose, expand_operators, operator_transform, Transform, IDENTITY};
use crate::model::{Dictionary, Row, Value};
use crate::residues;

const PARTNERS: [[&str; 5]; 2] = [
    [
        "ptnr1_auth_comp_id",
        "ptnr1_label_comp_id",
        "ptnr1_auth_asym_id",
        "ptnr1_auth_seq_id",
        "pdbx_ptnr1_PDB_ins_code",
    ],
    [
        "ptnr2_auth_comp_id",
        "ptnr2_label_comp_id",
        "ptnr2_auth_asym_id",
        "ptnr2_auth_seq_id",
        "pdbx_ptnr2_PDB_ins_code",
    ],
];

fn fit(text: &str, width: usize) -> &str {
    match text.char_indices().nth(width) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn text_of<'a>(row: &Row<'a>, column: &str) -> &'a str {
    blank(row.get(column))
}

/// First of the columns holding a known value, or blank.
fn either<'a>(row: &Row<'a>, preferred: &str, fallback: &str) -> &'a str {
    row.known(preferred)
        .or_else(|| row.known(fallback))
        .unwrap_or("")
}

/// Continuation field: blank on the first line, then 2, 3, ...
fn continuation(index: usize) -> String {
    if index == 0 {
        String::new()
    } else {
        (index + 1).to_string()
    }
}

fn symmetry_code(row: &Row<'_>, column: &str) -> String {
    text_of(row, column).replace('_', "")
}

/// Atom names start in column 14 unless they fill all four columns or begin
/// with a two-letter element.
fn atom_name(name: &str, element: &str) -> String {
    if name.len() >= 4 || (element.len() == 2 && name.starts_with(element)) {
        format!("{:<4}", fit(name, 4))
    } else {
        format!(" {name:<3}")
    }
}

/// A residue as author fields: name, chain, number and insertion code.
struct Residue<'a> {
    comp: &'a str,
    chain: &'a str,
    seq: &'a str,
    ins: &'a str,
}

impl<'a> Residue<'a> {
    /// `[auth comp, label comp, chain, number, insertion]` columns.
    fn of(row: &Row<'a>, columns: [&str; 5]) -> Self {
        Residue {
            comp: either(row, columns[0], columns[1]),
            chain: text_of(row, columns[2]),
            seq: text_of(row, columns[3]),
            ins: text_of(row, columns[4]),
        }
    }

    /// `RES C SSSSI`
    fn spaced(&self) -> String {
        format!(
            "{:>3} {:1} {:>4}{:1}",
            fit(self.comp, 3),
            fit(self.chain, 1),
            fit(self.seq, 4),
            fit(self.ins, 1)
        )
    }

    /// `RES CSSSSI`
    fn packed(&self) -> String {
        format!(
            "{:>3} {:1}{:>4}{:1}",
            fit(self.comp, 3),
            fit(self.chain, 1),
            fit(self.seq, 4),
            fit(self.ins, 1)
        )
    }
}

#[derive(Default)]
struct Lines(Vec<String>);

impl Lines {
    fn push(&mut self, text: impl Into<String>) {
        self.0.push(text.into());
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    /// A record whose later lines carry a continuation number in 9-10.
    fn continued(&mut self, record: &str, pieces: &[String]) {
        for (index, piece) in pieces.iter().enumerate() {
            if index == 0 {
                self.push(format!("{record:<6}    {piece}"));
            } else {
                self.push(format!("{record:<6}  {:>2} {piece}", index + 1));
            }
        }
    }

    fn finish(self) -> String {
        let mut out = String::with_capacity(self.0.len() * 81);
        for line in self.0 {
            let _ = writeln!(out, "{line:<80}");
        }
        out
    }
}

struct Writer<'d> {
    dictionary: &'d Dictionary,
    code: &'d str,
    /// Label asym id to author chain.
    chains: HashMap<&'d str, &'d str>,
    /// Entity id to entity type.
    entity_types: HashMap<&'d str, &'d str>,
}

pub(super) fn to_string(dictionary: &Dictionary) -> String {
    let writer = Writer::new(dictionary);
    let mut lines = Lines::default();
    writer.title_section(&mut lines);
    writer.remarks(&mut lines);
    writer.primary_structure(&mut lines);
    writer.heterogens(&mut lines);
    writer.secondary_structure(&mut lines);
    writer.connectivity(&mut lines);
    writer.sites(&mut lines);
    writer.crystal(&mut lines);
    writer.coordinates(&mut lines);
    lines.push("END");
    tracing::debug!(lines = lines.len(), code = writer.code, "wrote PDB records");
    lines.finish()
}

impl<'d> Writer<'d> {
    fn new(dictionary: &'d Dictionary) -> Self {
        let rows = |name: &str| {
            dictionary
                .get(name)
                .into_iter()
                .flat_map(|category| category.rows())
        };
        let mut chains = HashMap::new();
        for atom in rows("atom_site") {
            chains
                .entry(atom.str("label_asym_id"))
                .or_insert(atom.str("auth_asym_id"));
        }
        let entity_types = rows("entity")
            .map(|entity| (entity.str("id"), entity.str("type")))
            .collect();
        Writer {
            dictionary,
            code: dictionary.entry_id().unwrap_or("XXXX"),
            chains,
            entity_types,
        }
    }

    fn rows(&self, name: &str) -> impl Iterator<Item = Row<'d>> + 'd {
        let dictionary: &'d Dictionary = self.dictionary;
        dictionary
            .get(name)
            .into_iter()
            .flat_map(|category| category.rows())
    }

    fn first(&self, name: &str) -> Option<Row<'d>> {
        self.rows(name).next()
    }

    fn known(&self, category: &str, column: &str) -> Option<&'d str> {
        let dictionary: &'d Dictionary = self.dictionary;
        dictionary.known(category, column)
    }

    fn entity_row(&self, category: &str, entity: &str) -> Option<Row<'d>> {
        self.rows(category).find(|row| row.str("entity_id") == entity)
    }

    fn entity_type(&self, atom: &Row<'d>) -> &'d str {
        if let Some(kind) = self.entity_types.get(atom.str("label_entity_id")).copied() {
            return kind;
        }
        let comp = either(atom, "auth_comp_id", "label_comp_id");
        if atom.str("group_PDB") == "ATOM" {
            "polymer"
        } else if residues::is_water(comp) {
            "water"
        } else {
            "non-polymer"
        }
    }

    fn title_section(&self, lines: &mut Lines) {
        self.header(lines);
        self.replacements("OBSLTE", lines);
        if let Some(title) = self.known("struct", "title") {
            lines.continued("TITLE", &wrap(title, 69, 69));
        }
        self.split(lines);
        self.caveat(lines);
        self.compound(lines);
        if let Some(keywords) = self.known("struct_keywords", "text") {
            lines.continued("KEYWDS", &wrap(keywords, 69, 69));
        }
        let methods: Vec<&str> = self
            .rows("exptl")
            .filter_map(|row| row.known("method"))
            .collect();
        if !methods.is_empty() {
            lines.continued("EXPDTA", &wrap(&methods.join("; "), 69, 69));
        }
        self.model_types(lines);
        let authors: Vec<&str> = self
            .rows("audit_author")
            .filter_map(|row| row.known("name"))
            .collect();
        if !authors.is_empty() {
            lines.continued("AUTHOR", &wrap_list(&authors, 69, 68));
        }
        self.revisions(lines);
        self.replacements("SPRSDE", lines);
        self.journal(lines);
    }

    fn header(&self, lines: &mut Lines) {
        let classification = self.known("struct_keywords", "pdbx_keywords");
        let status = self.first("pdbx_database_status");
        if classification.is_none() && status.is_none() && self.code == "XXXX" {
            return;
        }
        let date = status
            .and_then(|row| row.known("recvd_initial_deposition_date"))
            .and_then(format_date)
            .unwrap_or_default();
        lines.push(format!(
            "HEADER    {:<40}{date:<9}   {}",
            fit(classification.unwrap_or(""), 40),
            fit(self.code, 4)
        ));
    }

    /// OBSLTE lists the entries replacing this one, SPRSDE the ones it
    /// replaces.
    fn replacements(&self, record: &str, lines: &mut Lines) {
        let (this, others) = if record == "OBSLTE" {
            ("replace_pdb_id", "pdb_id")
        } else {
            ("pdb_id", "replace_pdb_id")
        };
        for row in self
            .rows("pdbx_database_PDB_obs_spr")
            .filter(|row| row.str("id") == record)
        {
            let date = row.known("date").and_then(format_date).unwrap_or_default();
            let ids: Vec<&str> = row
                .known(others)
                .map(|text| text.split_whitespace().collect())
                .unwrap_or_default();
            let mut chunks: Vec<&[&str]> = ids.chunks(8).collect();
            if chunks.is_empty() {
                chunks.push(&[]);
            }
            for (index, chunk) in chunks.iter().enumerate() {
                lines.push(format!(
                    "{record:<6}  {:>2} {date:<9} {:<4}      {}",
                    continuation(index),
                    fit(text_of(&row, this), 4),
                    chunk.join(" ")
                ));
            }
        }
    }

    fn split(&self, lines: &mut Lines) {
        let ids: Vec<&str> = self
            .rows("pdbx_database_related")
            .filter(|row| row.str("content_type") == "split")
            .filter_map(|row| row.known("db_id"))
            .collect();
        for (index, chunk) in ids.chunks(14).enumerate() {
            lines.push(format!("SPLIT   {:>2} {}", continuation(index), chunk.join(" ")));
        }
    }

    fn caveat(&self, lines: &mut Lines) {
        let Some(text) = self.known("database_PDB_caveat", "text") else {
            return;
        };
        for (index, piece) in wrap(text, 59, 59).iter().enumerate() {
            lines.push(format!(
                "CAVEAT  {:>2} {:<4}    {piece}",
                continuation(index),
                fit(self.code, 4)
            ));
        }
    }

    /// COMPND and SOURCE, one MOL_ID block per polymer entity.
    fn compound(&self, lines: &mut Lines) {
        let polymers: Vec<Row<'d>> = self
            .rows("entity")
            .filter(|row| row.str("type") == "polymer")
            .collect();
        if polymers.is_empty() {
            return;
        }
        let mut compound: Vec<String> = Vec::new();
        let mut source: Vec<String> = Vec::new();
        let mut described = false;
        for (index, entity) in polymers.iter().enumerate() {
            let id = entity.str("id");
            let method = entity.str("src_method");
            let known = |column: &str| entity.known(column).map(str::to_string);
            let strands = self
                .entity_row("entity_poly", id)
                .and_then(|row| row.known("pdbx_strand_id"))
                .map(|text| text.split(',').map(str::trim).collect::<Vec<_>>().join(", "));
            let synonym = self
                .entity_row("entity_name_com", id)
                .and_then(|row| row.known("name"))
                .map(str::to_string);
            let tokens = [
                ("MOL_ID", Some((index + 1).to_string())),
                ("MOLECULE", known("pdbx_description")),
                ("CHAIN", strands),
                ("FRAGMENT", known("pdbx_fragment")),
                ("SYNONYM", synonym),
                ("EC", known("pdbx_ec")),
                ("ENGINEERED", (method == "man").then(|| "YES".to_string())),
                ("MUTATION", known("pdbx_mutation")),
                ("OTHER_DETAILS", known("details")),
            ];
            compound.extend(
                tokens
                    .into_iter()
                    .filter_map(|(key, value)| Some(format!("{key}: {}", value?))),
            );

            let (table, columns) = if method == "man" {
                ("entity_src_gen", &SRC_GEN_COLUMNS[..])
            } else {
                ("entity_src_nat", &SRC_NAT_COLUMNS[..])
            };
            let mut pairs: Vec<String> = Vec::new();
            if let Some(row) = self.entity_row(table, id) {
                for (column, key) in columns {
                    if let Some(value) = row.known(column) {
                        pairs.push(format!("{key}: {value}"));
                    }
                }
            }
            if method == "syn" {
                pairs.insert(0, "SYNTHETIC: YES".to_string());
            }
            described |= !pairs.is_empty();
            source.push(format!("MOL_ID: {}", index + 1));
            source.extend(pairs);
        }
        specification("COMPND", &compound, lines);
        if described {
            specification("SOURCE", &source, lines);
        }
    }

    fn model_types(&self, lines: &mut Lines) {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for row in self.rows("pdbx_coordinate_model") {
            let (kind, asym) = (row.str("type"), row.str("asym_id"));
            match groups.iter_mut().find(|(name, _)| *name == kind) {
                Some((_, chains)) => chains.push(asym),
                None => groups.push((kind, vec![asym])),
            }
        }
        if groups.is_empty() {
            return;
        }
        let text = groups
            .iter()
            .map(|(kind, chains)| format!("{kind}, CHAIN {}", chains.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        lines.continued("MDLTYP", &wrap(&text, 69, 69));
    }

    fn revisions(&self, lines: &mut Lines) {
        for revision in self.rows("database_PDB_rev") {
            let num = revision.str("num");
            let changes: Vec<&str> = self
                .rows("database_PDB_rev_record")
                .filter(|row| row.str("rev_num") == num)
                .filter_map(|row| row.known("type"))
                .collect();
            let date = revision.known("date").and_then(format_date).unwrap_or_default();
            let mut chunks: Vec<&[&str]> = changes.chunks(4).collect();
            if chunks.is_empty() {
                chunks.push(&[]);
            }
            for (index, chunk) in chunks.iter().enumerate() {
                let records = chunk
                    .iter()
                    .map(|change| format!("{change:<6}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                lines.push(format!(
                    "REVDAT {num:>3}{:>2} {date:<9} {:<4}    {:1}       {records}",
                    continuation(index),
                    fit(text_of(&revision, "replaces"), 4),
                    fit(text_of(&revision, "mod_type"), 1)
                ));
            }
        }
    }

    fn names(&self, category: &str, citation: &str) -> Vec<&'d str> {
        self.rows(category)
            .filter(|row| row.str("citation_id") == citation)
            .filter_map(|row| row.known("name"))
            .collect()
    }

    /// JRNL for the primary citation, or the first one listed.
    fn journal(&self, lines: &mut Lines) {
        let citations: Vec<Row<'d>> = self.rows("citation").collect();
        let Some(citation) = citations
            .iter()
            .find(|row| row.str("id") == "primary")
            .or(citations.first())
            .copied()
        else {
            return;
        };
        let id = citation.str("id");
        let mut out: Vec<String> = Vec::new();
        let mut sub = |tag: &str, pieces: Vec<String>| {
            for (index, piece) in pieces.iter().enumerate() {
                out.push(format!("JRNL        {tag:<4}{:>2} {piece}", continuation(index)));
            }
        };

        let authors = self.names("citation_author", id);
        if !authors.is_empty() {
            sub("AUTH", wrap_list(&authors, 59, 58));
        }
        if let Some(title) = citation.known("title") {
            sub("TITL", wrap(title, 59, 59));
        }
        let editors = self.names("citation_editor", id);
        if !editors.is_empty() {
            sub("EDIT", wrap_list(&editors, 59, 58));
        }
        let publication = citation.known("journal_abbrev");
        let volume = text_of(&citation, "journal_volume");
        let page = text_of(&citation, "page_first");
        let year = text_of(&citation, "year");
        if publication.is_some() || !volume.is_empty() || !page.is_empty() || !year.is_empty() {
            let mut pieces = wrap(publication.unwrap_or(""), 28, 28);
            if let Some(first) = pieces.first_mut() {
                *first = format!(
                    "{first:<28}  V.{:>4} {:>5} {:>4}",
                    fit(volume, 4),
                    fit(page, 5),
                    fit(year, 4)
                );
            }
            sub("REF", pieces);
        }
        if let Some(issn) = citation.known("journal_id_ISSN") {
            out.push(format!("JRNL        REFN                   ISSN {issn}"));
        }
        for (tag, column) in [("PMID", "pdbx_database_id_PubMed"), ("DOI", "pdbx_database_id_DOI")] {
            if let Some(value) = citation.known(column) {
                out.push(format!("JRNL        {tag:<4}   {value}"));
            }
        }
        if out.is_empty() {
            out.push("JRNL        REF".to_string());
        }
        for line in out {
            lines.push(line);
        }
    }

    fn remarks(&self, lines: &mut Lines) {
        self.refinement(lines);
        self.assemblies(lines);
        self.unobserved(lines);
        self.site_descriptions(lines);
    }

    /// REMARK 2 and REMARK 3.
    fn refinement(&self, lines: &mut Lines) {
        let Some(refine) = self.first("refine") else {
            return;
        };
        lines.push("REMARK   2");
        match refine.get("ls_d_res_high") {
            Some(Value::Inapplicable) => lines.push("REMARK   2 RESOLUTION. NOT APPLICABLE."),
            Some(Value::Text(resolution)) => {
                lines.push(format!("REMARK   2 RESOLUTION. {resolution:>7} ANGSTROMS."))
            }
            _ => {}
        }
        lines.push("REMARK   3");
        for column in &REFINE_COLUMNS[2..] {
            let Some(key) = refine_key(column) else {
                continue;
            };
            let value = refine.known(column).unwrap_or("NULL");
            lines.push(format!("REMARK   3   {key} : {value}"));
        }
    }

    /// REMARK 350, rebuilt as BIOMT matrices from the operator expressions.
    fn assemblies(&self, lines: &mut Lines) {
        let assemblies: Vec<Row<'d>> = self.rows("pdbx_struct_assembly").collect();
        if assemblies.is_empty() {
            return;
        }
        let operators: HashMap<&str, Transform> = self
            .rows("pdbx_struct_oper_list")
            .map(|row| (row.str("id"), operator_transform(&row)))
            .collect();
        for text in [
            "REMARK 350",
            "REMARK 350 COORDINATES FOR A COMPLETE MULTIMER REPRESENTING THE KNOWN",
            "REMARK 350 BIOLOGICALLY SIGNIFICANT OLIGOMERIZATION STATE OF THE",
            "REMARK 350 MOLECULE CAN BE GENERATED BY APPLYING BIOMT TRANSFORMATIONS",
            "REMARK 350 GIVEN BELOW.  BOTH NON-CRYSTALLOGRAPHIC AND",
            "REMARK 350 CRYSTALLOGRAPHIC OPERATIONS ARE GIVEN.",
        ] {
            lines.push(text);
        }

        for assembly in assemblies {
            let id = assembly.str("id");
            lines.push("REMARK 350");
            lines.push(format!("REMARK 350 BIOMOLECULE: {id}"));
            let details = assembly.str("details");
            let oligomer = text_of(&assembly, "oligomeric_details").to_ascii_uppercase();
            if details.contains("author") {
                lines.push(format!("REMARK 350 AUTHOR DETERMINED BIOLOGICAL UNIT: {oligomer}"));
            }
            if details.contains("software") {
                lines.push(format!(
                    "REMARK 350 SOFTWARE DETERMINED QUATERNARY STRUCTURE: {oligomer}"
                ));
            }
            if let Some(method) = assembly.known("method_details") {
                lines.push(format!("REMARK 350 SOFTWARE USED: {method}"));
            }
            for property in self
                .rows("pdbx_struct_assembly_prop")
                .filter(|row| row.str("biol_id") == id)
            {
                let kind = property.str("type");
                let Some((key, _)) = PROPERTIES.iter().find(|(_, name)| *name == kind) else {
                    continue;
                };
                let Some(value) = property.known("value") else {
                    continue;
                };
                let unit = if kind == "MORE" { "KCAL/MOL" } else { "ANGSTROM**2" };
                lines.push(format!("REMARK 350 {key}: {value} {unit}"));
            }

            let mut serial = 0;
            for generator in self
                .rows("pdbx_struct_assembly_gen")
                .filter(|row| row.str("assembly_id") == id)
            {
                let mut chains: Vec<&str> = Vec::new();
                for asym in generator.str("asym_id_list").split(',').map(str::trim) {
                    let chain = self.chains.get(asym).copied().unwrap_or(asym);
                    if !chain.is_empty() && !chains.contains(&chain) {
                        chains.push(chain);
                    }
                }
                if chains.is_empty() {
                    continue;
                }
                for (index, chunk) in chains.chunks(10).enumerate() {
                    let label = if index == 0 {
                        "APPLY THE FOLLOWING TO CHAINS"
                    } else {
                        "                   AND CHAINS"
                    };
                    lines.push(format!("REMARK 350 {label}: {}", chunk.join(", ")));
                }
                for combination in expand_operators(generator.str("oper_expression")) {
                    let transforms: Option<Vec<&Transform>> = combination
                        .iter()
                        .map(|name| operators.get(name.as_str()))
                        .collect();
                    let Some(transforms) = transforms else {
                        tracing::warn!(assembly = id, "operator expression names an unknown operator");
                        continue;
                    };
                    let transform = transforms
                        .into_iter()
                        .fold(IDENTITY, |total, next| compose(&total, next));
                    serial += 1;
                    for (row, values) in transform.iter().enumerate() {
                        lines.push(format!(
                            "REMARK 350   BIOMT{} {serial:>3}{:>10.6}{:>10.6}{:>10.6}     {:>10.5}",
                            row + 1,
                            values[0],
                            values[1],
                            values[2],
                            values[3]
                        ));
                    }
                }
            }
        }
    }

    /// REMARK 465 for unobserved polymer residues.
    fn unobserved(&self, lines: &mut Lines) {
        let rows: Vec<Row<'d>> = self
            .rows("pdbx_unobs_or_zero_occ_residues")
            .filter(|row| row.str("polymer_flag") != "N" && row.str("occupancy_flag") != "0")
            .collect();
        if rows.is_empty() {
            return;
        }
        for text in [
            "REMARK 465",
            "REMARK 465 MISSING RESIDUES",
            "REMARK 465 THE FOLLOWING RESIDUES WERE NOT LOCATED IN THE",
            "REMARK 465 EXPERIMENT. (M=MODEL NUMBER; RES=RESIDUE NAME; C=CHAIN",
            "REMARK 465 IDENTIFIER; SSSEQ=SEQUENCE NUMBER; I=INSERTION CODE.)",
            "REMARK 465",
            "REMARK 465   M RES C SSSEQI",
        ] {
            lines.push(text);
        }
        for row in rows {
            let model = match text_of(&row, "PDB_model_num") {
                "1" => "",
                model => model,
            };
            let residue = Residue::of(
                &row,
                ["auth_comp_id", "label_comp_id", "auth_asym_id", "auth_seq_id", "PDB_ins_code"],
            );
            lines.push(format!(
                "REMARK 465 {model:>3} {:>3} {:1} {:>5}{:1}",
                fit(residue.comp, 3),
                fit(residue.chain, 1),
                fit(residue.seq, 5),
                fit(residue.ins, 1)
            ));
        }
    }

    /// REMARK 800 for sites with an evidence code or description.
    fn site_descriptions(&self, lines: &mut Lines) {
        let sites: Vec<Row<'d>> = self
            .rows("struct_site")
            .filter(|row| row.known("pdbx_evidence_code").is_some() || row.known("details").is_some())
            .collect();
        if sites.is_empty() {
            return;
        }
        lines.push("REMARK 800");
        lines.push("REMARK 800 SITE");
        for (index, site) in sites.iter().enumerate() {
            if index > 0 {
                lines.push("REMARK 800");
            }
            lines.push(format!("REMARK 800 SITE_IDENTIFIER: {}", site.str("id")));
            if let Some(evidence) = site.known("pdbx_evidence_code") {
                lines.push(format!("REMARK 800 EVIDENCE_CODE: {evidence}"));
            }
            if let Some(details) = site.known("details") {
                for (index, piece) in wrap(details, 50, 68).iter().enumerate() {
                    if index == 0 {
                        lines.push(format!("REMARK 800 SITE_DESCRIPTION: {piece}"));
                    } else {
                        lines.push(format!("REMARK 800 {piece}"));
                    }
                }
            }
        }
    }

    fn primary_structure(&self, lines: &mut Lines) {
        self.database_references(lines);
        self.sequence_differences(lines);
        self.sequences(lines);
        self.modified_residues(lines);
    }

    fn database_references(&self, lines: &mut Lines) {
        let references: HashMap<&str, Row<'d>> = self
            .rows("struct_ref")
            .map(|row| (row.str("id"), row))
            .collect();
        for seq in self.rows("struct_ref_seq") {
            let reference = references.get(seq.str("ref_id")).copied();
            let from_reference = |column: &str| {
                reference
                    .map(|row| text_of(&row, column))
                    .unwrap_or("")
            };
            let code = match text_of(&seq, "pdbx_PDB_id_code") {
                "" => self.code,
                code => code,
            };
            let chain = fit(text_of(&seq, "pdbx_strand_id"), 1);
            let begin = text_of(&seq, "pdbx_auth_seq_align_beg");
            let begin_ins = text_of(&seq, "pdbx_seq_align_beg_ins_code");
            let end = text_of(&seq, "pdbx_auth_seq_align_end");
            let end_ins = text_of(&seq, "pdbx_seq_align_end_ins_code");
            let database = from_reference("db_name");
            let accession = match text_of(&seq, "pdbx_db_accession") {
                "" => from_reference("pdbx_db_accession"),
                accession => accession,
            };
            let db_code = from_reference("db_code");
            let db_begin = text_of(&seq, "db_align_beg");
            let db_begin_ins = text_of(&seq, "pdbx_db_align_beg_ins_code");
            let db_end = text_of(&seq, "db_align_end");
            let db_end_ins = text_of(&seq, "pdbx_db_align_end_ins_code");

            if accession.len() > 8 || db_code.len() > 12 {
                lines.push(format!(
                    "DBREF1 {code:<4} {chain:1} {begin:>4}{begin_ins:1} {end:>4}{end_ins:1} {database:<6}               {db_code}"
                ));
                lines.push(format!(
                    "DBREF2 {code:<4} {chain:1}     {accession:<22}     {db_begin:>10}  {db_end:>10}"
                ));
            } else {
                lines.push(format!(
                    "DBREF  {code:<4} {chain:1} {begin:>4}{begin_ins:1} {end:>4}{end_ins:1} {database:<6} {accession:<8} {db_code:<12} {db_begin:>5}{db_begin_ins:1} {db_end:>5}{db_end_ins:1}"
                ));
            }
        }
    }

    fn sequence_differences(&self, lines: &mut Lines) {
        for row in self.rows("struct_ref_seq_dif") {
            let code = match text_of(&row, "pdbx_pdb_id_code") {
                "" => self.code,
                code => code,
            };
            lines.push(format!(
                "SEQADV {code:<4} {:>3} {:1} {:>4}{:1} {:<4} {:<9} {:>3} {:>5} {}",
                text_of(&row, "mon_id"),
                fit(text_of(&row, "pdbx_pdb_strand_id"), 1),
                text_of(&row, "pdbx_auth_seq_num"),
                text_of(&row, "pdbx_pdb_ins_code"),
                fit(text_of(&row, "pdbx_seq_db_name"), 4),
                text_of(&row, "pdbx_seq_db_accession_code"),
                text_of(&row, "db_mon_id"),
                text_of(&row, "pdbx_seq_db_seq_num"),
                text_of(&row, "details")
            ));
        }
    }

    fn sequences(&self, lines: &mut Lines) {
        let mut by_entity: HashMap<&str, Vec<&str>> = HashMap::new();
        for row in self.rows("entity_poly_seq") {
            by_entity
                .entry(row.str("entity_id"))
                .or_default()
                .push(row.str("mon_id"));
        }
        for poly in self.rows("entity_poly") {
            let Some(sequence) = by_entity.get(poly.str("entity_id")) else {
                continue;
            };
            let strands = text_of(&poly, "pdbx_strand_id")
                .split(',')
                .map(str::trim)
                .filter(|strand| !strand.is_empty());
            for chain in strands {
                for (index, chunk) in sequence.chunks(13).enumerate() {
                    let names = chunk
                        .iter()
                        .map(|name| format!("{:>3}", fit(name, 3)))
                        .collect::<Vec<_>>()
                        .join(" ");
                    lines.push(format!(
                        "SEQRES {:>3} {:1} {:>4}  {names}",
                        index + 1,
                        fit(chain, 1),
                        sequence.len()
                    ));
                }
            }
        }
    }

    fn modified_residues(&self, lines: &mut Lines) {
        for row in self.rows("pdbx_struct_mod_residue") {
            let residue = Residue::of(
                &row,
                ["auth_comp_id", "label_comp_id", "auth_asym_id", "auth_seq_id", "PDB_ins_code"],
            );
            lines.push(format!(
                "MODRES {:<4} {} {:>3}  {}",
                fit(self.code, 4),
                residue.spaced(),
                fit(text_of(&row, "parent_comp_id"), 3),
                text_of(&row, "details")
            ));
        }
    }

    /// HET, HETNAM, HETSYN and FORMUL.
    fn heterogens(&self, lines: &mut Lines) {
        let first_model = self.first("atom_site").map(|row| row.str("pdbx_PDB_model_num"));
        let mut order: Vec<(Residue<'d>, usize)> = Vec::new();
        let mut index: HashMap<(&str, &str, &str, &str), usize> = HashMap::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for atom in self
            .rows("atom_site")
            .filter(|row| Some(row.str("pdbx_PDB_model_num")) == first_model)
        {
            if self.entity_type(&atom) == "polymer" {
                continue;
            }
            let residue = Residue::of(
                &atom,
                ["auth_comp_id", "label_comp_id", "auth_asym_id", "auth_seq_id", "pdbx_PDB_ins_code"],
            );
            let key = (residue.comp, residue.chain, residue.seq, residue.ins);
            match index.get(&key) {
                Some(&position) => order[position].1 += 1,
                None => {
                    *counts.entry(residue.comp).or_default() += 1;
                    index.insert(key, order.len());
                    order.push((residue, 1));
                }
            }
        }
        for (residue, atoms) in &order {
            if residues::is_water(residue.comp) {
                continue;
            }
            lines.push(format!(
                "HET    {:>3}  {:1}{:>4}{:1}  {atoms:>5}",
                fit(residue.comp, 3),
                fit(residue.chain, 1),
                fit(residue.seq, 4),
                fit(residue.ins, 1)
            ));
        }

        let components: Vec<Row<'d>> = self.rows("chem_comp").collect();
        for (record, column) in [("HETNAM", "name"), ("HETSYN", "pdbx_synonyms")] {
            for component in &components {
                let id = component.str("id");
                if residues::is_standard(id) || residues::is_water(id) {
                    continue;
                }
                let Some(text) = component.known(column) else {
                    continue;
                };
                for (index, piece) in wrap(text, 55, 55).iter().enumerate() {
                    lines.push(format!(
                        "{record:<6}  {:>2} {:>3} {piece}",
                        continuation(index),
                        fit(id, 3)
                    ));
                }
            }
        }

        let mut number = self
            .rows("entity")
            .filter(|row| row.str("type") == "polymer")
            .count();
        for component in &components {
            let id = component.str("id");
            let Some(formula) = component.known("formula") else {
                continue;
            };
            let water = residues::is_water(id);
            if residues::standard(id).is_some() && default_formula(id).known() == Some(formula) {
                continue;
            }
            let count = counts.get(id).copied().unwrap_or(0);
            let text = if count > 1 || (water && count > 0) {
                format!("{count}({formula})")
            } else {
                formula.to_string()
            };
            number += 1;
            for (index, piece) in wrap(&text, 51, 51).iter().enumerate() {
                let star = if index == 0 && water { "*" } else { " " };
                lines.push(format!(
                    "FORMUL  {number:>2}  {:>3} {:>2}{star}{piece}",
                    fit(id, 3),
                    continuation(index)
                ));
            }
        }
    }

    fn secondary_structure(&self, lines: &mut Lines) {
        for (index, helix) in self
            .rows("struct_conf")
            .filter(|row| row.str("conf_type_id").starts_with("HELX"))
            .enumerate()
        {
            let begin = Residue::of(
                &helix,
                ["beg_auth_comp_id", "beg_label_comp_id", "beg_auth_asym_id", "beg_auth_seq_id", "pdbx_beg_PDB_ins_code"],
            );
            let end = Residue::of(
                &helix,
                ["end_auth_comp_id", "end_label_comp_id", "end_auth_asym_id", "end_auth_seq_id", "pdbx_end_PDB_ins_code"],
            );
            lines.push(format!(
                "HELIX  {:>3} {:>3} {} {}{:>2}{:<30} {:>5}",
                index + 1,
                fit(text_of(&helix, "pdbx_PDB_helix_id"), 3),
                begin.spaced(),
                end.spaced(),
                fit(text_of(&helix, "pdbx_PDB_helix_class"), 2),
                fit(text_of(&helix, "details"), 30),
                fit(text_of(&helix, "pdbx_PDB_helix_length"), 5)
            ));
        }

        let strands: HashMap<&str, &str> = self
            .rows("struct_sheet")
            .map(|row| (row.str("id"), text_of(&row, "number_strands")))
            .collect();
        for range in self.rows("struct_sheet_range") {
            let sheet = range.str("sheet_id");
            let strand = range.str("id");
            let sense = self
                .rows("struct_sheet_order")
                .find(|row| row.str("sheet_id") == sheet && row.str("range_id_2") == strand)
                .map(|row| match row.str("sense") {
                    "parallel" => "1",
                    "anti-parallel" => "-1",
                    _ => "0",
                })
                .unwrap_or("0");
            let begin = Residue::of(
                &range,
                ["beg_auth_comp_id", "beg_label_comp_id", "beg_auth_asym_id", "beg_auth_seq_id", "pdbx_beg_PDB_ins_code"],
            );
            let end = Residue::of(
                &range,
                ["end_auth_comp_id", "end_label_comp_id", "end_auth_asym_id", "end_auth_seq_id", "pdbx_end_PDB_ins_code"],
            );
            let mut text = format!(
                "SHEET  {:>3} {:>3}{:>2} {} {}{sense:>2}",
                fit(strand, 3),
                fit(sheet, 3),
                fit(strands.get(sheet).copied().unwrap_or(""), 2),
                begin.packed(),
                end.packed()
            );
            if let Some(bond) = self
                .rows("pdbx_struct_sheet_hbond")
                .find(|row| row.str("sheet_id") == sheet && row.str("range_id_2") == strand)
            {
                let current = Residue::of(
                    &bond,
                    ["range_2_auth_comp_id", "range_2_label_comp_id", "range_2_auth_asym_id", "range_2_auth_seq_id", "range_2_PDB_ins_code"],
                );
                let previous = Residue::of(
                    &bond,
                    ["range_1_auth_comp_id", "range_1_label_comp_id", "range_1_auth_asym_id", "range_1_auth_seq_id", "range_1_PDB_ins_code"],
                );
                let _ = write!(
                    text,
                    " {:<4}{} {:<4}{}",
                    fit(either(&bond, "range_2_auth_atom_id", "range_2_label_atom_id"), 4),
                    current.packed(),
                    fit(either(&bond, "range_1_auth_atom_id", "range_1_label_atom_id"), 4),
                    previous.packed()
                );
            }
            lines.push(text);
        }
    }

    /// SSBOND, LINK and CISPEP.
    fn connectivity(&self, lines: &mut Lines) {
        let partner = |row: &Row<'d>, n: usize| Residue::of(row, PARTNERS[n]);
        let connections: Vec<Row<'d>> = self.rows("struct_conn").collect();

        let mut serial = 0;
        for conn in connections.iter().filter(|row| row.str("conn_type_id") == "disulf") {
            serial += 1;
            lines.push(format!(
                "SSBOND {serial:>3} {}   {}                       {:>6} {:>6} {:>5}",
                partner(conn, 0).spaced(),
                partner(conn, 1).spaced(),
                symmetry_code(conn, "ptnr1_symmetry"),
                symmetry_code(conn, "ptnr2_symmetry"),
                fit(text_of(conn, "pdbx_dist_value"), 5)
            ));
        }

        for conn in connections.iter().filter(|row| {
            let kind = row.str("conn_type_id");
            kind != "disulf" && kind != "hydrog"
        }) {
            let atom = |name: &str, label: &str| {
                let name = either(conn, name, label);
                let element = if is_metal(name) { name } else { fit(name, 1) };
                atom_name(name, element)
            };
            lines.push(format!(
                "LINK        {}{:1}{}               {}{:1}{}  {:>6} {:>6} {:>5}",
                atom("ptnr1_auth_atom_id", "ptnr1_label_atom_id"),
                fit(text_of(conn, "pdbx_ptnr1_label_alt_id"), 1),
                partner(conn, 0).packed(),
                atom("ptnr2_auth_atom_id", "ptnr2_label_atom_id"),
                fit(text_of(conn, "pdbx_ptnr2_label_alt_id"), 1),
                partner(conn, 1).packed(),
                symmetry_code(conn, "ptnr1_symmetry"),
                symmetry_code(conn, "ptnr2_symmetry"),
                fit(text_of(conn, "pdbx_dist_value"), 5)
            ));
        }

        for cis in self.rows("struct_mon_prot_cis") {
            let first = Residue::of(
                &cis,
                ["auth_comp_id", "label_comp_id", "auth_asym_id", "auth_seq_id", "pdbx_PDB_ins_code"],
            );
            let second = Residue::of(
                &cis,
                ["pdbx_auth_comp_id_2", "pdbx_label_comp_id_2", "pdbx_auth_asym_id_2", "pdbx_auth_seq_id_2", "pdbx_PDB_ins_code_2"],
            );
            lines.push(format!(
                "CISPEP {:>3} {}   {}       {:>3}       {:>6}",
                fit(text_of(&cis, "pdbx_id"), 3),
                first.spaced(),
                second.spaced(),
                fit(text_of(&cis, "pdbx_PDB_model_num"), 3),
                fit(text_of(&cis, "pdbx_omega_angle"), 6)
            ));
        }
    }

    fn sites(&self, lines: &mut Lines) {
        let members: Vec<Row<'d>> = self.rows("struct_site_gen").collect();
        for site in self.rows("struct_site") {
            let id = site.str("id");
            let entries: Vec<&Row<'d>> = members.iter().filter(|row| row.str("site_id") == id).collect();
            if entries.is_empty() {
                continue;
            }
            let count = entries
                .first()
                .and_then(|row| row.known("pdbx_num_res"))
                .map(str::to_string)
                .unwrap_or_else(|| entries.len().to_string());
            for (index, chunk) in entries.chunks(4).enumerate() {
                let listed = chunk
                    .iter()
                    .map(|row| {
                        Residue::of(
                            row,
                            ["auth_comp_id", "label_comp_id", "auth_asym_id", "auth_seq_id", "pdbx_auth_ins_code"],
                        )
                        .packed()
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                lines.push(format!(
                    "SITE   {:>3} {:>3} {:>2} {listed}",
                    index + 1,
                    fit(id, 3),
                    fit(&count, 2)
                ));
            }
        }
    }

    /// CRYST1, ORIGXn, SCALEn and MTRIXn.
    fn crystal(&self, lines: &mut Lines) {
        if let Some(cell) = self.first("cell") {
            let length = |column: &str| cell.get(column).map(|value| fixed(value, 3)).unwrap_or_default();
            let angle = |column: &str| cell.get(column).map(|value| fixed(value, 2)).unwrap_or_default();
            lines.push(format!(
                "CRYST1{:>9}{:>9}{:>9}{:>7}{:>7}{:>7} {:<11}{:>4}",
                length("length_a"),
                length("length_b"),
                length("length_c"),
                angle("angle_alpha"),
                angle("angle_beta"),
                angle("angle_gamma"),
                fit(self.known("symmetry", "space_group_name_H-M").unwrap_or(""), 11),
                fit(text_of(&cell, "Z_PDB"), 4)
            ));
        }
        for (record, category, matrix, vector) in [
            ("ORIGX", "database_PDB_matrix", "origx", "origx_vector"),
            ("SCALE", "atom_sites", "fract_transf_matrix", "fract_transf_vector"),
        ] {
            let Some(row) = self.first(category) else {
                continue;
            };
            if row.get(&format!("{matrix}[1][1]")).is_none() {
                continue;
            }
            for n in 1..=3 {
                lines.push(format!("{record}{n}    {}", transform_row(&row, matrix, vector, n)));
            }
        }
        for ncs in self.rows("struct_ncs_oper") {
            let given = if ncs.str("code") == "given" { "1" } else { "" };
            for n in 1..=3 {
                lines.push(format!(
                    "MTRIX{n} {:>3}{}    {given}",
                    fit(ncs.str("id"), 3),
                    transform_row(&ncs, "matrix", "vector", n)
                ));
            }
        }
    }

    /// MODEL, ATOM/HETATM, ANISOU, TER and ENDMDL.
    fn coordinates(&self, lines: &mut Lines) {
        let atoms: Vec<Row<'d>> = self.rows("atom_site").collect();
        let anisotropic: HashMap<&str, Row<'d>> = self
            .rows("atom_site_anisotrop")
            .map(|row| (row.str("id"), row))
            .collect();
        let mut models: Vec<&str> = Vec::new();
        for atom in &atoms {
            let model = atom.str("pdbx_PDB_model_num");
            if !models.contains(&model) {
                models.push(model);
            }
        }
        let numbered = models.len() > 1;

        let mut serial: i64 = 0;
        let mut next_serial = || {
            serial += 1;
            hybrid36_encode(serial, 5).unwrap_or_else(|| "*****".to_string())
        };
        // last polymer atom of the chain still waiting for its TER
        let mut open: Option<Row<'d>> = None;
        let mut model = None;

        let terminate = |open: &mut Option<Row<'d>>, lines: &mut Lines, serial: String| {
            if let Some(last) = open.take() {
                let residue = atom_residue(&last);
                lines.push(format!("TER   {serial:>5}      {}", residue.packed()));
            }
        };

        for atom in atoms {
            let this_model = atom.str("pdbx_PDB_model_num");
            if model != Some(this_model) {
                if open.is_some() {
                    terminate(&mut open, lines, next_serial());
                }
                if numbered {
                    if model.is_some() {
                        lines.push("ENDMDL");
                    }
                    lines.push(format!("MODEL     {:>4}", fit(this_model, 4)));
                }
                model = Some(this_model);
            }
            if let Some(last) = open {
                if last.str("label_asym_id") != atom.str("label_asym_id") {
                    terminate(&mut open, lines, next_serial());
                }
            }

            let polymer = self.entity_type(&atom) == "polymer";
            let record = match atom.known("group_PDB") {
                Some(group) => group,
                None if polymer => "ATOM",
                None => "HETATM",
            };
            let element = text_of(&atom, "type_symbol");
            let name = atom_name(either(&atom, "auth_atom_id", "label_atom_id"), element);
            let alt = fit(text_of(&atom, "label_alt_id"), 1);
            let residue = atom_residue(&atom);
            let charge = atom.get("pdbx_formal_charge").map(charge_text).unwrap_or_default();
            let coordinate = |column: &str| atom.get(column).map(|value| fixed(value, 3)).unwrap_or_default();
            let factor = |column: &str| atom.get(column).map(|value| fixed(value, 2)).unwrap_or_default();
            let number = next_serial();
            lines.push(format!(
                "{record:<6}{number:>5} {name}{alt:1}{}   {:>8}{:>8}{:>8}{:>6}{:>6}          {:>2}{charge:2}",
                residue.packed(),
                coordinate("Cartn_x"),
                coordinate("Cartn_y"),
                coordinate("Cartn_z"),
                factor("occupancy"),
                factor("B_iso_or_equiv"),
                fit(element, 2)
            ));

            if let Some(tensor) = anisotropic.get(atom.str("id")) {
                let factors = ["U[1][1]", "U[2][2]", "U[3][3]", "U[1][2]", "U[1][3]", "U[2][3]"]
                    .map(|column| {
                        tensor
                            .get(column)
                            .and_then(|value| value.parse::<f64>())
                            .map(|factor| format!("{:>7}", (factor * 10_000.0).round() as i64))
                            .unwrap_or_else(|| " ".repeat(7))
                    })
                    .concat();
                lines.push(format!(
                    "ANISOU{number:>5} {name}{alt:1}{} {factors}      {:>2}{charge:2}",
                    residue.packed(),
                    fit(element, 2)
                ));
            }

            open = polymer.then_some(atom);
        }
        if open.is_some() {
            terminate(&mut open, lines, next_serial());
        }
        if numbered && model.is_some() {
            lines.push("ENDMDL");
        }
    }
}

fn atom_residue<'a>(atom: &Row<'a>) -> Residue<'a> {
    let mut residue = Residue::of(
        atom,
        ["auth_comp_id", "label_comp_id", "auth_asym_id", "auth_seq_id", "pdbx_PDB_ins_code"],
    );
    if residue.chain.is_empty() {
        residue.chain = text_of(atom, "label_asym_id");
    }
    if residue.seq.is_empty() {
        residue.seq = text_of(atom, "label_seq_id");
    }
    residue
}

fn transform_row(row: &Row<'_>, matrix: &str, vector: &str, n: usize) -> String {
    let cell = |column: String, places: usize| {
        row.get(&column)
            .map(|value| fixed(value, places))
            .unwrap_or_default()
    };
    format!(
        "{:>10}{:>10}{:>10}     {:>10}",
        cell(format!("{matrix}[{n}][1]"), 6),
        cell(format!("{matrix}[{n}][2]"), 6),
        cell(format!("{matrix}[{n}][3]"), 6),
        cell(format!("{vector}[{n}]"), 5)
    )
}

/// `KEY: value;` tokens, each wrapped on its own.
fn specification(record: &str, tokens: &[String], lines: &mut Lines) {
    let mut pieces = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        if index + 1 < tokens.len() {
            pieces.extend(wrap(&format!("{token};"), 69, 69));
        } else {
            pieces.extend(wrap(token, 69, 69));
        }
    }
    lines.continued(record, &pieces);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdb::parse_str;
    use pretty_assertions::assert_eq;

    const ATOMS: &str = "\
HEADER    LYASE                                   07-MAY-02   1LOL
ATOM      1  N   VAL A  11       3.696  33.898  63.219  1.00 21.50           N
ATOM      2  CA  VAL A  11       3.198  33.218  61.983  1.00 19.76           C
HETATM    3 ZN    ZN A 301      10.000  10.000  10.000  1.00 30.00          ZN2+
HETATM    4  O   HOH A 401       1.000   2.000   3.000  1.00 40.00           O
END
";

    #[test]
    fn atom_lines_are_reproduced() {
        let dictionary = parse_str(ATOMS).expect("parse");
        let text = to_string(&dictionary);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.iter().all(|line| line.len() == 80));
        let atoms: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|line| line.starts_with("ATOM") || line.starts_with("HETATM"))
            .collect();
        assert_eq!(
            atoms[0],
            "ATOM      1  N   VAL A  11       3.696  33.898  63.219  1.00 21.50           N  "
        );
        assert_eq!(
            atoms[2].trim_end(),
            "HETATM    4 ZN    ZN A 301      10.000  10.000  10.000  1.00 30.00          ZN2+"
        );
        let ter = lines.iter().find(|line| line.starts_with("TER")).expect("TER");
        assert_eq!(ter.trim_end(), "TER       3      VAL A  11");
        assert_eq!(lines.last().map(|line| line.trim_end()), Some("END"));
    }

    #[test]
    fn header_and_crystal_records() {
        let source = "\
HEADER    LYASE                                   07-MAY-02   1LOL
CRYST1   57.570   55.482   66.129  90.00  94.28  90.00 P 1 21 1      4
ATOM      1  N   VAL A  11       3.696  33.898  63.219  1.00 21.50           N
END
";
        let text = to_string(&parse_str(source).expect("parse"));
        let mut lines = text.lines().map(str::trim_end);
        assert_eq!(
            lines.next(),
            Some("HEADER    LYASE                                   07-MAY-02   1LOL")
        );
        assert!(text
            .lines()
            .any(|line| line.trim_end() == "CRYST1   57.570   55.482   66.129  90.00  94.28  90.00 P 1 21 1      4"));
    }

    #[test]
    fn long_names_fill_the_atom_field() {
        assert_eq!(atom_name("CA", "C"), " CA ");
        assert_eq!(atom_name("CA", "CA"), "CA  ");
        assert_eq!(atom_name("HD11", "H"), "HD11");
        assert_eq!(atom_name("N", "N"), " N  ");
    }
}
