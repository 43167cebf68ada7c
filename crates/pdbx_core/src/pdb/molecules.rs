//! Entities, label asyms and the atom tables.
//!
//! Polymer chains are aligned against their SEQRES sequence to get label
//! sequence numbers; every residue then gets a [`Label`], which later passes
//! use to fill the label columns of annotation tables.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::atoms::{self, Kind, ResidueKey, Stream};
use super::compound::{self, Molecule};
use super::records::{asym_id, charge_value, join_text, text_or_unknown, Records};
use super::references::{self, Sequences};
use crate::align::align;
use crate::error::Result;
use crate::model::{Category, Dictionary, Value};
use crate::residues::{self, ResidueClass};

/// Label identifiers of one author residue.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Label {
    pub asym: String,
    pub seq: Value,
    pub entity: String,
}

/// Author residue to label residue map, built once from the atom records.
#[derive(Debug, Default)]
pub(crate) struct Labels {
    residues: HashMap<ResidueKey, Label>,
    chains: Vec<(String, Vec<String>)>,
}

impl Labels {
    pub fn get(&self, chain: &str, number: &str, insertion: &str) -> Option<&Label> {
        self.residues
            .get(&(chain.to_string(), number.to_string(), insertion.to_string()))
    }

    /// Every label asym that came from one author chain, in asym order.
    pub fn asyms_of(&self, chain: &str) -> &[String] {
        self.chains
            .iter()
            .find(|(name, _)| name == chain)
            .map(|(_, asyms)| asyms.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    fn add_asym(&mut self, chain: &str, asym: &str) {
        match self.chains.iter_mut().find(|(name, _)| name == chain) {
            Some((_, asyms)) => asyms.push(asym.to_string()),
            None => self.chains.push((chain.to_string(), vec![asym.to_string()])),
        }
    }
}

struct Entity {
    kind: Kind,
    molecule: Option<Molecule>,
    sequence: Vec<String>,
    strands: Vec<String>,
    comp: Option<String>,
    count: usize,
}

impl Entity {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            molecule: None,
            sequence: Vec::new(),
            strands: Vec::new(),
            comp: None,
            count: 0,
        }
    }
}

struct Asym {
    id: String,
    entity: usize,
    chain: String,
}

/// A polymer chain with the full-sequence positions its atoms occupy.
struct PolymerChain {
    chain: String,
    asym: String,
    length: usize,
    occupied: HashSet<usize>,
}

struct Layout {
    entities: Vec<Entity>,
    asyms: Vec<Asym>,
    polymers: Vec<PolymerChain>,
    labels: Labels,
}

fn entity_id(index: usize) -> String {
    (index + 1).to_string()
}

impl Layout {
    fn build(molecules: &[Molecule], sequences: &Sequences, stream: &Stream<'_>) -> Self {
        let mut layout = Layout {
            entities: molecules
                .iter()
                .map(|molecule| Entity {
                    strands: molecule.chains(),
                    molecule: Some(molecule.clone()),
                    ..Entity::new(Kind::Polymer)
                })
                .collect(),
            asyms: Vec::new(),
            polymers: Vec::new(),
            labels: Labels::default(),
        };

        let mut polymer_chains: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, residue) in stream.residues.iter().enumerate() {
            if residue.kind != Kind::Polymer {
                continue;
            }
            match polymer_chains.iter_mut().find(|(chain, _)| *chain == residue.chain) {
                Some((_, members)) => members.push(index),
                None => polymer_chains.push((residue.chain.clone(), vec![index])),
            }
        }
        for (chain, members) in polymer_chains {
            layout.add_polymer(chain, &members, sequences, stream);
        }
        for entity in &mut layout.entities {
            if entity.sequence.is_empty() {
                if let Some(chain) = entity
                    .strands
                    .iter()
                    .find(|chain| !sequences.of(chain).is_empty())
                {
                    entity.sequence = sequences.of(chain).to_vec();
                }
            }
            entity.count = entity.strands.len();
        }

        for (index, residue) in stream.residues.iter().enumerate() {
            if residue.kind != Kind::NonPolymer {
                continue;
            }
            let entity = layout.entity_for_comp(Kind::NonPolymer, &residue.name);
            layout.entities[entity].count += 1;
            let asym = layout.add_asym(entity, &residue.chain);
            layout.label(stream, index, asym, entity, Value::Inapplicable);
        }

        let mut water_asyms: Vec<(String, String)> = Vec::new();
        for (index, residue) in stream.residues.iter().enumerate() {
            if residue.kind != Kind::Water {
                continue;
            }
            let entity = match layout
                .entities
                .iter()
                .position(|entity| entity.kind == Kind::Water)
            {
                Some(position) => position,
                None => layout.entity_for_comp(Kind::Water, &residue.name),
            };
            layout.entities[entity].count += 1;
            let asym = match water_asyms.iter().find(|(chain, _)| *chain == residue.chain) {
                Some((_, asym)) => asym.clone(),
                None => {
                    let asym = layout.add_asym(entity, &residue.chain);
                    water_asyms.push((residue.chain.clone(), asym.clone()));
                    asym
                }
            };
            layout.label(stream, index, asym, entity, Value::Inapplicable);
        }
        layout
    }

    fn add_polymer(
        &mut self,
        chain: String,
        members: &[usize],
        sequences: &Sequences,
        stream: &Stream<'_>,
    ) {
        let observed: Vec<String> = members
            .iter()
            .map(|&index| stream.residues[index].name.clone())
            .collect();
        let seqres = sequences.of(&chain);
        let full = if !seqres.is_empty() && seqres.len() >= observed.len() {
            seqres.to_vec()
        } else {
            observed.clone()
        };

        let entity = match self
            .entities
            .iter()
            .position(|entity| entity.molecule.is_some() && entity.strands.contains(&chain))
        {
            Some(position) => position,
            None => match self.entities.iter().position(|entity| {
                entity.molecule.is_none() && entity.kind == Kind::Polymer && entity.sequence == full
            }) {
                Some(position) => {
                    self.entities[position].strands.push(chain.clone());
                    position
                }
                None => {
                    self.entities.push(Entity {
                        strands: vec![chain.clone()],
                        ..Entity::new(Kind::Polymer)
                    });
                    self.entities.len() - 1
                }
            },
        };
        if self.entities[entity].sequence.is_empty() {
            self.entities[entity].sequence = full.clone();
        }

        let asym = self.add_asym(entity, &chain);
        let positions = align(&full, &observed);
        for (&index, &position) in members.iter().zip(&positions) {
            self.label(stream, index, asym.clone(), entity, Value::from(position + 1));
        }
        self.polymers.push(PolymerChain {
            chain,
            asym,
            length: full.len(),
            occupied: positions.into_iter().collect(),
        });
    }

    fn entity_for_comp(&mut self, kind: Kind, name: &str) -> usize {
        match self
            .entities
            .iter()
            .position(|entity| entity.kind == kind && entity.comp.as_deref() == Some(name))
        {
            Some(position) => position,
            None => {
                self.entities.push(Entity {
                    comp: Some(name.to_string()),
                    ..Entity::new(kind)
                });
                self.entities.len() - 1
            }
        }
    }

    fn add_asym(&mut self, entity: usize, chain: &str) -> String {
        let id = asym_id(self.asyms.len());
        self.labels.add_asym(chain, &id);
        self.asyms.push(Asym {
            id: id.clone(),
            entity,
            chain: chain.to_string(),
        });
        id
    }

    fn label(&mut self, stream: &Stream<'_>, residue: usize, asym: String, entity: usize, seq: Value) {
        self.labels.residues.insert(
            stream.residues[residue].key(),
            Label {
                asym,
                seq,
                entity: entity_id(entity),
            },
        );
    }

    fn polymer_entity_of(&self, chain: &str) -> Option<String> {
        self.entities
            .iter()
            .position(|entity| entity.kind == Kind::Polymer && entity.strands.iter().any(|s| s == chain))
            .map(entity_id)
    }
}

/// Per-component text from HETNAM, HETSYN and FORMUL.
#[derive(Default)]
struct Heterogens {
    names: HashMap<String, String>,
    synonyms: HashMap<String, String>,
    formulas: HashMap<String, String>,
    listed: Vec<String>,
}

fn grouped(records: &Records<'_>, record: &str, id: (usize, usize), text: usize) -> HashMap<String, String> {
    let mut pieces: Vec<(String, Vec<&str>)> = Vec::new();
    for line in records.named(record) {
        let key = line.field(id.0, id.1).to_string();
        match pieces.iter_mut().find(|(name, _)| *name == key) {
            Some((_, parts)) => parts.push(line.rest(text)),
            None => pieces.push((key, vec![line.rest(text)])),
        }
    }
    pieces
        .into_iter()
        .map(|(key, parts)| (key, join_text(parts.into_iter())))
        .collect()
}

/// Strips the `*` and `n(...)` count decoration of a FORMUL entry.
fn formula_text(text: &str) -> String {
    let text = text.trim().trim_start_matches('*');
    if let Some(open) = text.find('(') {
        let count = &text[..open];
        if text.ends_with(')') && count.bytes().all(|byte| byte.is_ascii_digit()) {
            return text[open + 1..text.len() - 1].trim().to_string();
        }
    }
    text.to_string()
}

impl Heterogens {
    fn read(records: &Records<'_>) -> Self {
        let mut listed = Vec::new();
        for line in records.named("HET") {
            let id = line.field(8, 10).to_string();
            if !id.is_empty() && !listed.contains(&id) {
                listed.push(id);
            }
        }
        Self {
            names: grouped(records, "HETNAM", (12, 14), 16),
            synonyms: grouped(records, "HETSYN", (12, 14), 16),
            formulas: grouped(records, "FORMUL", (13, 15), 19)
                .into_iter()
                .map(|(key, text)| (key, formula_text(&text)))
                .collect(),
            listed,
        }
    }
}

/// Name a component gets when no HETNAM record names it.
pub(super) fn default_comp_name(id: &str) -> Value {
    if let Some(residue) = residues::standard(id) {
        Value::text(residue.name)
    } else if residues::is_water(id) {
        Value::text("WATER")
    } else {
        Value::Unknown
    }
}

/// Formula a component gets when no FORMUL record gives one.
pub(super) fn default_formula(id: &str) -> Value {
    if let Some(residue) = residues::standard(id) {
        Value::text(residue.formula)
    } else if residues::is_water(id) {
        Value::text("H2 O")
    } else {
        Value::Unknown
    }
}

fn default_weight(id: &str) -> Value {
    if let Some(residue) = residues::standard(id) {
        Value::text(residue.weight)
    } else if residues::is_water(id) {
        Value::text("18.015")
    } else {
        Value::Unknown
    }
}

pub(crate) const ATOM_SITE_COLUMNS: [&str; 21] = [
    "group_PDB",
    "id",
    "type_symbol",
    "label_atom_id",
    "label_alt_id",
    "label_comp_id",
    "label_asym_id",
    "label_entity_id",
    "label_seq_id",
    "pdbx_PDB_ins_code",
    "Cartn_x",
    "Cartn_y",
    "Cartn_z",
    "occupancy",
    "B_iso_or_equiv",
    "pdbx_formal_charge",
    "auth_seq_id",
    "auth_comp_id",
    "auth_asym_id",
    "auth_atom_id",
    "pdbx_PDB_model_num",
];

pub(super) const ANISOTROP_COLUMNS: [&str; 17] = [
    "id",
    "type_symbol",
    "pdbx_label_atom_id",
    "pdbx_label_alt_id",
    "pdbx_label_comp_id",
    "pdbx_label_asym_id",
    "pdbx_label_seq_id",
    "U[1][1]",
    "U[2][2]",
    "U[3][3]",
    "U[1][2]",
    "U[1][3]",
    "U[2][3]",
    "pdbx_auth_seq_id",
    "pdbx_auth_comp_id",
    "pdbx_auth_asym_id",
    "pdbx_auth_atom_id",
];

pub(super) const ENTITY_COLUMNS: [&str; 10] = [
    "id",
    "type",
    "src_method",
    "pdbx_description",
    "formula_weight",
    "pdbx_number_of_molecules",
    "pdbx_ec",
    "pdbx_mutation",
    "pdbx_fragment",
    "details",
];

pub(super) const UNOBSERVED_COLUMNS: [&str; 11] = [
    "id",
    "PDB_model_num",
    "polymer_flag",
    "occupancy_flag",
    "auth_asym_id",
    "auth_comp_id",
    "auth_seq_id",
    "PDB_ins_code",
    "label_asym_id",
    "label_comp_id",
    "label_seq_id",
];

/// Anisotropic factors are stored as integers scaled by 10^4.
fn anisotropic(text: &str) -> Value {
    match text.trim().parse::<i64>() {
        Ok(scaled) => Value::text(format!("{:.4}", scaled as f64 / 10_000.0)),
        Err(_) => Value::Unknown,
    }
}

struct Builder<'r, 'a> {
    records: &'r Records<'a>,
    stream: Stream<'a>,
    layout: Layout,
    molecules: Vec<Molecule>,
    parents: HashMap<String, String>,
    heterogens: Heterogens,
}

impl Builder<'_, '_> {
    fn entities(&self, dictionary: &mut Dictionary) -> Result<()> {
        let mut category = Category::new("entity", ENTITY_COLUMNS);
        for (index, entity) in self.layout.entities.iter().enumerate() {
            let id = entity_id(index);
            let count = Value::from(entity.count);
            let row = match (entity.kind, &entity.molecule) {
                (Kind::Polymer, Some(molecule)) => vec![
                    Value::text(id),
                    Value::text("polymer"),
                    Value::text(molecule.src_method()),
                    Value::from(molecule.get("MOLECULE")),
                    Value::Unknown,
                    count,
                    Value::from(molecule.get("EC")),
                    Value::from(molecule.get("MUTATION")),
                    Value::from(molecule.get("FRAGMENT")),
                    Value::from(molecule.get("OTHER_DETAILS")),
                ],
                (kind, _) => {
                    let (kind, method, description) = match kind {
                        Kind::Polymer => ("polymer", "nat", Value::Unknown),
                        Kind::NonPolymer => (
                            "non-polymer",
                            "syn",
                            self.comp_name(entity.comp.as_deref().unwrap_or("")),
                        ),
                        Kind::Water => ("water", "nat", Value::text("water")),
                    };
                    let mut row = vec![
                        Value::text(id),
                        Value::text(kind),
                        Value::text(method),
                        description,
                        Value::Unknown,
                        count,
                    ];
                    row.resize(ENTITY_COLUMNS.len(), Value::Unknown);
                    row
                }
            };
            category.push_row(row)?;
        }
        dictionary.insert_non_empty(category);
        compound::categories(&self.molecules, dictionary)
    }

    fn parent(&self, name: &str) -> Option<&str> {
        self.parents.get(name).map(String::as_str)
    }

    fn polymer_class(&self, sequence: &[String]) -> ResidueClass {
        sequence
            .iter()
            .find_map(|name| residues::class_of(name, self.parent(name)))
            .unwrap_or(ResidueClass::Peptide)
    }

    fn polymers(&self, dictionary: &mut Dictionary) -> Result<()> {
        let mut poly = Category::new(
            "entity_poly",
            [
                "entity_id",
                "type",
                "nstd_linkage",
                "nstd_monomer",
                "pdbx_seq_one_letter_code",
                "pdbx_seq_one_letter_code_can",
                "pdbx_strand_id",
            ],
        );
        let mut seq = Category::new("entity_poly_seq", ["entity_id", "num", "mon_id", "hetero"]);
        for (index, entity) in self.layout.entities.iter().enumerate() {
            if entity.kind != Kind::Polymer {
                continue;
            }
            let id = entity_id(index);
            let sequence = &entity.sequence;
            let nonstandard = sequence.iter().any(|name| !residues::is_standard(name));
            let code: String = sequence.iter().map(|name| residues::one_letter(name)).collect();
            let canonical: String = sequence
                .iter()
                .map(|name| residues::canonical_letter(name, self.parent(name)))
                .collect();
            let strands = entity.strands.join(",");
            poly.push([
                Value::text(&id),
                Value::text(self.polymer_class(sequence).polymer_type()),
                Value::text("no"),
                Value::text(if nonstandard { "yes" } else { "no" }),
                text_or_unknown(&code),
                text_or_unknown(&canonical),
                text_or_unknown(&strands),
            ])?;
            for (position, name) in sequence.iter().enumerate() {
                seq.push([
                    Value::text(&id),
                    Value::from(position + 1),
                    Value::text(name),
                    Value::text("n"),
                ])?;
            }
        }
        dictionary.insert_non_empty(poly);
        dictionary.insert_non_empty(seq);
        Ok(())
    }

    fn comp_name(&self, id: &str) -> Value {
        self.heterogens
            .names
            .get(id)
            .map(Value::from)
            .unwrap_or_else(|| default_comp_name(id))
    }

    fn nonpolymers(&self, dictionary: &mut Dictionary) -> Result<()> {
        let mut category = Category::new("pdbx_entity_nonpoly", ["entity_id", "name", "comp_id"]);
        for (index, entity) in self.layout.entities.iter().enumerate() {
            if entity.kind == Kind::Polymer {
                continue;
            }
            let comp = entity.comp.as_deref().unwrap_or("?");
            let name = if entity.kind == Kind::Water {
                Value::text("water")
            } else {
                self.comp_name(comp)
            };
            category.push([Value::text(entity_id(index)), name, Value::from(comp)])?;
        }
        dictionary.insert_non_empty(category);
        Ok(())
    }

    fn chemistry(&self, dictionary: &mut Dictionary) -> Result<()> {
        let mut polymeric: HashSet<&str> = HashSet::new();
        for entity in &self.layout.entities {
            if entity.kind == Kind::Polymer {
                polymeric.extend(entity.sequence.iter().map(String::as_str));
            }
        }
        for residue in &self.stream.residues {
            if residue.kind == Kind::Polymer {
                polymeric.insert(residue.name.as_str());
            }
        }
        let mut ids: BTreeSet<&str> = polymeric.iter().copied().collect();
        ids.extend(self.stream.atoms.iter().map(|atom| atom.line.field(18, 20)));
        ids.extend(self.heterogens.listed.iter().map(String::as_str));
        ids.remove("");

        let mut category = Category::new(
            "chem_comp",
            [
                "id",
                "type",
                "mon_nstd_flag",
                "name",
                "pdbx_synonyms",
                "formula",
                "formula_weight",
            ],
        );
        for id in ids {
            let polymer = polymeric.contains(id);
            let kind = residues::chem_comp_type(id, self.parent(id), polymer);
            let flag = match (polymer, residues::is_standard(id)) {
                (true, true) => "y",
                (true, false) => "n",
                (false, _) => ".",
            };
            category.push([
                Value::text(id),
                Value::text(kind),
                Value::text(flag),
                self.comp_name(id),
                self.heterogens.synonyms.get(id).map(Value::from).unwrap_or_default(),
                self.heterogens
                    .formulas
                    .get(id)
                    .map(Value::from)
                    .unwrap_or_else(|| default_formula(id)),
                default_weight(id),
            ])?;
        }
        dictionary.insert_non_empty(category);
        Ok(())
    }

    fn atom_sites(&self, dictionary: &mut Dictionary) -> Result<()> {
        let mut sites = Category::new("atom_site", ATOM_SITE_COLUMNS);
        let mut anisotrop = Category::new("atom_site_anisotrop", ANISOTROP_COLUMNS);
        let mut elements: BTreeSet<String> = BTreeSet::new();

        for (index, atom) in self.stream.atoms.iter().enumerate() {
            let line = atom.line;
            let residue = &self.stream.residues[atom.residue];
            let label = self.layout.labels.residues.get(&residue.key());
            let id = Value::from(index + 1);
            let name = line.field(13, 16);
            let element = match line.field(77, 78) {
                "" => residues::element_from_atom_name(name),
                symbol => symbol.to_string(),
            };
            elements.insert(element.clone());
            let alt = match line.field(17, 17) {
                "" => Value::Inapplicable,
                alt => Value::text(alt),
            };
            let comp = Value::text(line.field(18, 20));
            let chain = text_or_unknown(line.field(22, 22));
            let asym = label.map(|label| Value::text(&label.asym)).unwrap_or_default();
            let seq = label.map(|label| label.seq.clone()).unwrap_or_default();
            let auth_seq = line.value(23, 26);

            sites.push([
                Value::text(line.record()),
                id.clone(),
                Value::text(&element),
                Value::text(name),
                alt.clone(),
                comp.clone(),
                asym.clone(),
                label.map(|label| Value::text(&label.entity)).unwrap_or_default(),
                seq.clone(),
                line.value(27, 27),
                Value::text(line.field(31, 38)),
                Value::text(line.field(39, 46)),
                Value::text(line.field(47, 54)),
                line.number(55, 60),
                line.number(61, 66),
                charge_value(line.raw(79, 80)),
                auth_seq.clone(),
                comp.clone(),
                chain.clone(),
                Value::text(name),
                Value::from(atom.model),
            ])?;

            if let Some(anisou) = atom.anisou {
                let mut row = vec![
                    id,
                    Value::text(&element),
                    Value::text(name),
                    alt,
                    comp.clone(),
                    asym,
                    seq,
                ];
                row.extend(
                    [(29, 35), (36, 42), (43, 49), (50, 56), (57, 63), (64, 70)]
                        .map(|(start, end)| anisotropic(anisou.field(start, end))),
                );
                row.extend([auth_seq, comp, chain, Value::text(name)]);
                anisotrop.push_row(row)?;
            }
        }

        let mut types = Category::new("atom_type", ["symbol"]);
        for element in elements {
            types.push([element])?;
        }
        dictionary.insert_non_empty(types);
        dictionary.insert_non_empty(sites);
        dictionary.insert_non_empty(anisotrop);
        Ok(())
    }

    fn asyms(&self, dictionary: &mut Dictionary) -> Result<()> {
        let mut category = Category::new(
            "struct_asym",
            ["id", "pdbx_blank_PDB_chainid_flag", "pdbx_modified", "entity_id", "details"],
        );
        for asym in &self.layout.asyms {
            category.push([
                Value::text(&asym.id),
                Value::text(if asym.chain.is_empty() { "Y" } else { "N" }),
                Value::text("N"),
                Value::text(entity_id(asym.entity)),
                Value::Unknown,
            ])?;
        }
        dictionary.insert_non_empty(category);
        Ok(())
    }

    /// REMARK 465 rows. Their label sequence numbers fill the alignment's
    /// free positions when the counts agree.
    fn unobserved(&self, dictionary: &mut Dictionary) -> Result<()> {
        let mut rows: Vec<[String; 5]> = Vec::new();
        let mut started = false;
        for line in self.records.remarks(465) {
            if !started {
                started = line.rest(11).contains("RES C SSSEQI");
                continue;
            }
            let name = line.field(16, 18);
            if name.is_empty() {
                continue;
            }
            let model = match line.field(11, 14) {
                "" => "1",
                model => model,
            };
            rows.push([
                model.to_string(),
                name.to_string(),
                line.field(20, 20).to_string(),
                line.field(22, 26).to_string(),
                line.field(27, 27).to_string(),
            ]);
        }

        let mut assigned: HashMap<usize, Value> = HashMap::new();
        let mut groups: Vec<((&str, &str), Vec<usize>)> = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let key = (row[0].as_str(), row[2].as_str());
            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, members)) => members.push(index),
                None => groups.push((key, vec![index])),
            }
        }
        for ((_, chain), members) in &groups {
            let Some(polymer) = self.layout.polymers.iter().find(|p| p.chain == *chain) else {
                continue;
            };
            let free: Vec<usize> = (0..polymer.length)
                .filter(|position| !polymer.occupied.contains(position))
                .collect();
            if free.len() == members.len() {
                for (&member, &position) in members.iter().zip(&free) {
                    assigned.insert(member, Value::from(position + 1));
                }
            }
        }

        let mut category = Category::new("pdbx_unobs_or_zero_occ_residues", UNOBSERVED_COLUMNS);
        for (index, row) in rows.iter().enumerate() {
            let asym = self
                .layout
                .polymers
                .iter()
                .find(|polymer| polymer.chain == row[2])
                .map(|polymer| Value::text(&polymer.asym))
                .unwrap_or_default();
            category.push([
                Value::from(index + 1),
                Value::text(&row[0]),
                Value::text("Y"),
                Value::text("1"),
                text_or_unknown(&row[2]),
                Value::text(&row[1]),
                text_or_unknown(&row[3]),
                text_or_unknown(&row[4]),
                asym,
                Value::text(&row[1]),
                assigned.remove(&index).unwrap_or_default(),
            ])?;
        }
        dictionary.insert_non_empty(category);
        Ok(())
    }
}

/// Builds the molecule and atom categories and returns the label map.
pub(super) fn read(
    records: &Records<'_>,
    all_models: bool,
    dictionary: &mut Dictionary,
) -> Result<Labels> {
    let molecules = compound::read(records);
    let sequences = Sequences::read(records);
    let modifications = references::modifications(records);
    let modified: HashSet<&str> = modifications
        .iter()
        .map(|modification| modification.name.as_str())
        .collect();
    let stream = atoms::read(records, &modified, all_models)?;
    let layout = Layout::build(&molecules, &sequences, &stream);
    tracing::debug!(
        entities = layout.entities.len(),
        asyms = layout.asyms.len(),
        "assigned PDB entities"
    );

    let builder = Builder {
        records,
        parents: modifications
            .iter()
            .map(|modification| (modification.name.clone(), modification.parent.clone()))
            .collect(),
        stream,
        layout,
        molecules,
        heterogens: Heterogens::read(records),
    };
    builder.entities(dictionary)?;
    builder.polymers(dictionary)?;
    let entity_of_chain = |chain: &str| builder.layout.polymer_entity_of(chain);
    references::reference_categories(records, &entity_of_chain, dictionary)?;
    references::modification_category(&modifications, dictionary)?;
    builder.nonpolymers(dictionary)?;
    builder.chemistry(dictionary)?;
    builder.atom_sites(dictionary)?;
    builder.asyms(dictionary)?;
    builder.unobserved(dictionary)?;
    Ok(builder.layout.labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FILE: &str = "\
COMPND    MOL_ID: 1;
COMPND   2 MOLECULE: PROTEIN X;
COMPND   3 CHAIN: A
SEQRES   1 A    5  MET LYS VAL GLY ALA
HETNAM     XMP XANTHOSINE-5'-MONOPHOSPHATE
FORMUL   2  XMP    C10 H13 N4 O9 P
FORMUL   3  HOH   *2(H2 O)
REMARK 465   M RES C SSSEQI
REMARK 465     MET A     9
REMARK 465     LYS A    10
REMARK 465     ALA A    13
ATOM      1  N   VAL A  11       3.696  33.898  63.219  1.00 21.50           N
ANISOU    1  N   VAL A  11     2406   1892   1614    198    519   -328       N
ATOM      2  CA  VAL A  11       3.198  33.218  61.983  1.00 19.76           C
ATOM      3  N   GLY A  12       4.225  32.018  61.739  1.00 18.23           N
TER       4      GLY A  12
HETATM    5  P   XMP A 301       7.000  30.000  60.000  1.00 30.00           P
HETATM    6  O   HOH A 401       1.000   2.000   3.000  1.00 40.00           O
HETATM    7  O   HOH A 402       1.000   2.000   3.000  1.00 40.00           O
ATOM      8  N   ALA B   1       1.000   2.000   3.000  1.00 40.00           N
ATOM      9  N   GLY B   2       1.000   2.000   3.000  1.00 40.00           N
";

    fn parse() -> (Dictionary, Labels) {
        let mut dictionary = Dictionary::new();
        let labels = read(&Records::new(FILE), true, &mut dictionary).expect("molecules");
        (dictionary, labels)
    }

    fn column(dictionary: &Dictionary, category: &str, name: &str) -> Vec<String> {
        dictionary
            .get(category)
            .and_then(|category| category.column(name))
            .map(|values| values.map(|value| value.as_str().to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn entities_in_canonical_order() {
        let (dictionary, _) = parse();
        assert_eq!(column(&dictionary, "entity", "type"), vec!["polymer", "polymer", "non-polymer", "water"]);
        assert_eq!(
            column(&dictionary, "entity", "pdbx_description"),
            vec!["PROTEIN X", "?", "XANTHOSINE-5'-MONOPHOSPHATE", "water"]
        );
        assert_eq!(column(&dictionary, "entity", "pdbx_number_of_molecules"), vec!["1", "1", "1", "2"]);
        assert_eq!(column(&dictionary, "entity_poly", "pdbx_seq_one_letter_code"), vec!["MKVGA", "AG"]);
        assert_eq!(column(&dictionary, "entity_poly", "pdbx_strand_id"), vec!["A", "B"]);
        assert_eq!(column(&dictionary, "entity_poly_seq", "mon_id").len(), 7);
    }

    #[test]
    fn asyms_and_labels() {
        let (dictionary, labels) = parse();
        assert_eq!(column(&dictionary, "struct_asym", "id"), vec!["A", "B", "C", "D"]);
        assert_eq!(column(&dictionary, "struct_asym", "entity_id"), vec!["1", "2", "3", "4"]);
        assert_eq!(labels.asyms_of("A"), ["A", "C", "D"]);
        let val = labels.get("A", "11", "").expect("label");
        assert_eq!((val.asym.as_str(), val.seq.as_str()), ("A", "3"));
        let water = labels.get("A", "402", "").expect("label");
        assert_eq!((water.asym.as_str(), water.seq.as_str()), ("D", "."));
        assert_eq!(
            column(&dictionary, "atom_site", "label_seq_id"),
            vec!["3", "3", "4", ".", ".", ".", "1", "2"]
        );
    }

    #[test]
    fn atom_rows_and_anisotropy() {
        let (dictionary, _) = parse();
        let atoms = dictionary.get("atom_site").expect("atom_site");
        let first: Vec<&str> = atoms.raw_rows()[0].iter().map(Value::as_str).collect();
        assert_eq!(
            first,
            vec![
                "ATOM", "1", "N", "N", ".", "VAL", "A", "1", "3", "?", "3.696", "33.898", "63.219",
                "1.00", "21.50", "?", "11", "VAL", "A", "N", "1"
            ]
        );
        assert_eq!(dictionary.known("atom_site_anisotrop", "U[1][1]"), Some("0.2406"));
        assert_eq!(dictionary.known("atom_site_anisotrop", "U[2][3]"), Some("-0.0328"));
        assert_eq!(column(&dictionary, "atom_type", "symbol"), vec!["C", "N", "O", "P"]);
    }

    #[test]
    fn chemistry_uses_het_records() {
        let (dictionary, _) = parse();
        let chem = dictionary.get("chem_comp").expect("chem_comp");
        let ids: Vec<&str> = chem.column("id").expect("id").map(Value::as_str).collect();
        assert_eq!(ids, vec!["ALA", "GLY", "HOH", "LYS", "MET", "VAL", "XMP"]);
        let xmp = chem.row(6).expect("xmp");
        assert_eq!(xmp.str("formula"), "C10 H13 N4 O9 P");
        assert_eq!(xmp.str("type"), "non-polymer");
        assert_eq!(chem.row(2).expect("hoh").str("formula"), "H2 O");
        assert_eq!(chem.row(5).expect("val").str("mon_nstd_flag"), "y");
    }

    #[test]
    fn unobserved_residues_fill_free_positions() {
        let (dictionary, _) = parse();
        assert_eq!(
            column(&dictionary, "pdbx_unobs_or_zero_occ_residues", "label_seq_id"),
            vec!["1", "2", "5"]
        );
        assert_eq!(
            column(&dictionary, "pdbx_unobs_or_zero_occ_residues", "label_asym_id"),
            vec!["A", "A", "A"]
        );
    }

    #[test]
    fn formula_decoration_is_removed() {
        assert_eq!(formula_text("*199(H2 O)"), "H2 O");
        assert_eq!(formula_text("2(SO4 2-)"), "SO4 2-");
        assert_eq!(formula_text("C6 H12 O6"), "C6 H12 O6");
    }
}
