//! Fills canonical categories from a decoded MMTF map.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{scalar_text, MmtfFile};
use crate::error::{Error, Result};
use crate::model::{Category, Dictionary, Value};
use crate::msgpack::MsgValue;
use crate::pdb::{is_identity, ATOM_SITE_COLUMNS, OPERATOR_COLUMNS};
use crate::residues::{self, ResidueClass};

struct Group {
    name: String,
    atoms: Vec<String>,
    elements: Vec<String>,
    charges: Vec<i64>,
    kind: Option<String>,
}

struct Entity {
    kind: String,
    description: String,
    sequence: String,
    chains: Vec<usize>,
}

fn strings(value: &MsgValue, key: &str) -> Result<Vec<String>> {
    value
        .field_array(key)?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::malformed(format!("{key} holds a non-string")))
        })
        .collect()
}

fn integers(value: &MsgValue, key: &str) -> Result<Vec<i64>> {
    value
        .field_array(key)?
        .iter()
        .map(|item| {
            item.as_i64()
                .ok_or_else(|| Error::malformed(format!("{key} holds a non-integer")))
        })
        .collect()
}

fn indices(value: &MsgValue, key: &str) -> Result<Vec<usize>> {
    integers(value, key)?
        .into_iter()
        .map(|index| {
            usize::try_from(index).map_err(|_| Error::malformed(format!("negative index in {key}")))
        })
        .collect()
}

fn at<'a, T>(list: &'a [T], index: usize, what: &str) -> Result<&'a T> {
    list.get(index)
        .ok_or_else(|| Error::malformed(format!("{what} has no entry {index}")))
}

fn groups(file: &MmtfFile) -> Result<Vec<Group>> {
    let Some(list) = file.value("groupList").and_then(MsgValue::as_array) else {
        return Ok(Vec::new());
    };
    list.iter()
        .map(|group| {
            Ok(Group {
                name: group.field_str("groupName")?.to_string(),
                atoms: strings(group, "atomNameList")?,
                elements: strings(group, "elementList")?,
                charges: match group.get("formalChargeList") {
                    Some(_) => integers(group, "formalChargeList")?,
                    None => Vec::new(),
                },
                kind: group
                    .get("chemCompType")
                    .and_then(MsgValue::as_str)
                    .filter(|kind| !kind.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
}

fn entities(file: &MmtfFile) -> Result<Vec<Entity>> {
    let Some(list) = file.value("entityList").and_then(MsgValue::as_array) else {
        return Ok(Vec::new());
    };
    list.iter()
        .map(|entity| {
            let text = |key: &str| {
                entity
                    .get(key)
                    .and_then(MsgValue::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Ok(Entity {
                kind: text("type"),
                description: text("description"),
                sequence: text("sequence"),
                chains: indices(entity, "chainIndexList")?,
            })
        })
        .collect()
}

/// Index arithmetic over the flat MMTF hierarchy.
struct Layout {
    chain_ids: Vec<String>,
    chain_names: Vec<String>,
    chain_entity: HashMap<usize, usize>,
    first_group: Vec<usize>,
    groups_per_chain: Vec<usize>,
    group_types: Vec<usize>,
    first_model_chains: usize,
}

impl Layout {
    fn new(file: &MmtfFile, entities: &[Entity]) -> Result<Self> {
        let chain_ids = file.texts("chainIdList").unwrap_or_default();
        let chain_names = file
            .texts("chainNameList")
            .unwrap_or_else(|| chain_ids.clone());
        let as_usize = |key: &str| -> Result<Vec<usize>> {
            file.ints(key)
                .unwrap_or_default()
                .into_iter()
                .map(|value| {
                    usize::try_from(value)
                        .map_err(|_| Error::malformed(format!("negative value in {key}")))
                })
                .collect()
        };
        let groups_per_chain = as_usize("groupsPerChain")?;
        let group_types = as_usize("groupTypeList")?;
        let chains_per_model = as_usize("chainsPerModel")?;
        let mut first_group = Vec::with_capacity(groups_per_chain.len());
        let mut running = 0;
        for count in &groups_per_chain {
            first_group.push(running);
            running += count;
        }
        let chain_entity = entities
            .iter()
            .enumerate()
            .flat_map(|(entity, record)| record.chains.iter().map(move |&chain| (chain, entity)))
            .collect();
        Ok(Self {
            first_model_chains: chains_per_model.first().copied().unwrap_or(chain_ids.len()),
            chain_ids,
            chain_names,
            chain_entity,
            first_group,
            groups_per_chain,
            group_types,
        })
    }

    fn chain_id(&self, chain: usize) -> Result<&str> {
        at(&self.chain_ids, chain, "chainIdList").map(String::as_str)
    }

    fn chain_name(&self, chain: usize) -> Result<&str> {
        at(&self.chain_names, chain, "chainNameList").map(String::as_str)
    }

    fn groups_of(&self, chain: usize) -> std::ops::Range<usize> {
        let start = self.first_group.get(chain).copied().unwrap_or(0);
        let count = self.groups_per_chain.get(chain).copied().unwrap_or(0);
        start..start + count
    }
}

fn entry_category(file: &MmtfFile, dictionary: &mut Dictionary) -> Result<Value> {
    let entry_id = Value::from(file.str("structureId").map(str::to_string));
    let mut entry = Category::new("entry", ["id"]);
    if !entry_id.is_missing() {
        entry.push([&entry_id])?;
    }
    dictionary.insert_non_empty(entry);

    if let Some(title) = file.str("title") {
        let mut category = Category::new("struct", ["entry_id", "title"]);
        category.push([entry_id.clone(), Value::text(title)])?;
        dictionary.insert(category);
    }
    if let Some(date) = file.str("depositionDate") {
        let mut status = Category::new(
            "pdbx_database_status",
            ["entry_id", "recvd_initial_deposition_date"],
        );
        status.push([entry_id.clone(), Value::text(date)])?;
        dictionary.insert(status);
    }
    let mut exptl = Category::new("exptl", ["entry_id", "method"]);
    for method in file.texts("experimentalMethods").unwrap_or_default() {
        exptl.push([entry_id.clone(), Value::from(method)])?;
    }
    dictionary.insert_non_empty(exptl);
    Ok(entry_id)
}

fn refinement(file: &MmtfFile, entry_id: &Value, dictionary: &mut Dictionary) -> Result<()> {
    let number = |key: &str| file.value(key).and_then(scalar_text);
    let statistics = [number("resolution"), number("rWork"), number("rFree")];
    if statistics.iter().any(Option::is_some) {
        let method = file
            .texts("experimentalMethods")
            .and_then(|methods| methods.into_iter().next());
        let mut refine = Category::new(
            "refine",
            [
                "pdbx_refine_id",
                "entry_id",
                "ls_d_res_high",
                "ls_R_factor_R_work",
                "ls_R_factor_R_free",
            ],
        );
        let mut row = vec![Value::from(method), entry_id.clone()];
        row.extend(statistics.into_iter().map(Value::from));
        refine.push_row(row)?;
        dictionary.insert(refine);
    }

    if let Some(space_group) = file.str("spaceGroup").filter(|group| *group != "NA") {
        let mut symmetry = Category::new("symmetry", ["entry_id", "space_group_name_H-M"]);
        symmetry.push([entry_id.clone(), Value::text(space_group)])?;
        dictionary.insert(symmetry);
    }
    if let Some(cell) = file.texts("unitCell").filter(|cell| cell.len() == 6) {
        let mut category = Category::new(
            "cell",
            [
                "entry_id",
                "length_a",
                "length_b",
                "length_c",
                "angle_alpha",
                "angle_beta",
                "angle_gamma",
            ],
        );
        let mut row = vec![entry_id.clone()];
        row.extend(cell.into_iter().map(Value::from));
        category.push_row(row)?;
        dictionary.insert(category);
    }
    Ok(())
}

fn polymer_class(layout: &Layout, groups: &[Group], chain: usize) -> ResidueClass {
    layout
        .groups_of(chain)
        .filter_map(|group| layout.group_types.get(group))
        .filter_map(|&kind| groups.get(kind))
        .find_map(|group| residues::class_of(&group.name, None))
        .unwrap_or(ResidueClass::Peptide)
}

fn entity_categories(
    file: &MmtfFile,
    layout: &Layout,
    groups: &[Group],
    entities: &[Entity],
    dictionary: &mut Dictionary,
) -> Result<()> {
    let sequence_index = file.ints("sequenceIndexList").unwrap_or_default();
    let mut entity = Category::new(
        "entity",
        [
            "id",
            "type",
            "src_method",
            "pdbx_description",
            "formula_weight",
            "pdbx_number_of_molecules",
            "details",
        ],
    );
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
            "pdbx_target_identifier",
        ],
    );
    let mut poly_seq = Category::new("entity_poly_seq", ["entity_id", "num", "mon_id", "hetero"]);

    for (index, record) in entities.iter().enumerate() {
        let id = index + 1;
        let chains: Vec<usize> = record
            .chains
            .iter()
            .copied()
            .filter(|&chain| chain < layout.first_model_chains)
            .collect();
        let description = match record.description.as_str() {
            "" if record.kind == "water" => "water".to_string(),
            "" => "?".to_string(),
            text => text.to_string(),
        };
        entity.push([
            Value::from(id),
            Value::from(record.kind.as_str()),
            Value::Unknown,
            Value::from(description),
            Value::Unknown,
            Value::from(chains.len()),
            Value::Unknown,
        ])?;
        if record.kind != "polymer" {
            continue;
        }

        let Some(&first) = chains.first().or(record.chains.first()) else {
            continue;
        };
        let class = polymer_class(layout, groups, first);
        let mut observed = BTreeMap::new();
        let mut nonstandard = false;
        for group in layout.groups_of(first) {
            let kind = *at(&layout.group_types, group, "groupTypeList")?;
            let name = &at(groups, kind, "groupList")?.name;
            nonstandard |= !residues::is_standard(name);
            if let Some(&position) = sequence_index.get(group) {
                if position >= 0 {
                    observed.insert(position as usize, name.as_str());
                }
            }
        }
        let strands = chains
            .iter()
            .map(|&chain| layout.chain_name(chain))
            .collect::<Result<Vec<_>>>()?
            .join(",");
        poly.push([
            Value::from(id),
            Value::from(class.polymer_type()),
            Value::from("no"),
            Value::from(if nonstandard { "yes" } else { "no" }),
            Value::from(record.sequence.as_str()),
            Value::from(record.sequence.as_str()),
            Value::from(strands),
            Value::Unknown,
        ])?;
        for (position, letter) in record.sequence.chars().enumerate() {
            let monomer = observed
                .get(&position)
                .copied()
                .unwrap_or_else(|| residues::residue_for_letter(letter, class));
            poly_seq.push([
                Value::from(id),
                Value::from(position + 1),
                Value::from(monomer),
                Value::from("n"),
            ])?;
        }
    }
    dictionary.insert_non_empty(entity);
    dictionary.insert_non_empty(poly);
    dictionary.insert_non_empty(poly_seq);

    let mut asym = Category::new(
        "struct_asym",
        [
            "id",
            "pdbx_blank_PDB_chainid_flag",
            "pdbx_modified",
            "entity_id",
            "details",
        ],
    );
    for chain in 0..layout.first_model_chains.min(layout.chain_ids.len()) {
        let entity = layout.chain_entity.get(&chain).map(|entity| entity + 1);
        asym.push([
            Value::from(layout.chain_id(chain)?),
            Value::from("N"),
            Value::from("N"),
            entity.map(Value::from).unwrap_or_default(),
            Value::Unknown,
        ])?;
    }
    dictionary.insert_non_empty(asym);
    Ok(())
}

fn chemistry(groups: &[Group], dictionary: &mut Dictionary) -> Result<()> {
    let mut seen: BTreeMap<&str, &Group> = BTreeMap::new();
    for group in groups {
        seen.entry(group.name.as_str()).or_insert(group);
    }
    let mut chem_comp = Category::new(
        "chem_comp",
        ["id", "type", "mon_nstd_flag", "name", "formula", "formula_weight"],
    );
    for (name, group) in seen {
        let standard = residues::standard(name);
        let kind = match &group.kind {
            Some(kind) => kind.clone(),
            None => residues::chem_comp_type(name, None, standard.is_some()).to_string(),
        };
        chem_comp.push([
            Value::from(name),
            Value::from(kind),
            Value::from(if standard.is_some() { "y" } else { "." }),
            Value::from(standard.map(|residue| residue.name)),
            Value::from(standard.map(|residue| residue.formula)),
            Value::from(standard.map(|residue| residue.weight)),
        ])?;
    }
    dictionary.insert_non_empty(chem_comp);

    let elements: BTreeSet<String> = groups
        .iter()
        .flat_map(|group| group.elements.iter())
        .map(|element| element.to_uppercase())
        .filter(|element| !element.is_empty())
        .collect();
    let mut atom_type = Category::new("atom_type", ["symbol"]);
    for element in elements {
        atom_type.push([element])?;
    }
    dictionary.insert_non_empty(atom_type);
    Ok(())
}

fn operator_text(value: &MsgValue) -> Result<String> {
    scalar_text(value)
        .and_then(|text| text.parse::<f64>().ok())
        .map(|number| format!("{number:.10}"))
        .ok_or_else(|| Error::malformed("transform matrix holds a non-number"))
}

fn assemblies(file: &MmtfFile, layout: &Layout, dictionary: &mut Dictionary) -> Result<()> {
    let Some(list) = file.value("bioAssemblyList").and_then(MsgValue::as_array) else {
        return Ok(());
    };
    let mut assembly = Category::new(
        "pdbx_struct_assembly",
        ["id", "details", "method_details", "oligomeric_details", "oligomeric_count"],
    );
    let mut generators = Category::new(
        "pdbx_struct_assembly_gen",
        ["assembly_id", "oper_expression", "asym_id_list"],
    );
    let mut operators: Vec<[String; 12]> = Vec::new();

    for (index, record) in list.iter().enumerate() {
        let id = record
            .get("name")
            .and_then(scalar_text)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| (index + 1).to_string());
        assembly.push([
            Value::from(id.as_str()),
            Value::Unknown,
            Value::Unknown,
            Value::Unknown,
            Value::Unknown,
        ])?;

        let mut gen_rows: Vec<(String, Vec<usize>)> = Vec::new();
        for transform in record.field_array("transformList")? {
            let matrix = transform.field_array("matrix")?;
            if matrix.len() < 12 {
                return Err(Error::malformed("transform matrix needs 16 values"));
            }
            // Row n holds m[4n..4n+3] with its translation at m[4n+3].
            let mut texts: [String; 12] = Default::default();
            for (slot, value) in texts.iter_mut().zip(&matrix[..12]) {
                *slot = operator_text(value)?;
            }
            let operator = match operators.iter().position(|known| *known == texts) {
                Some(position) => position + 1,
                None => {
                    operators.push(texts);
                    operators.len()
                }
            };
            let asym_ids = indices(transform, "chainIndexList")?
                .into_iter()
                .map(|chain| layout.chain_id(chain).map(str::to_string))
                .collect::<Result<Vec<_>>>()?
                .join(",");
            match gen_rows.iter_mut().find(|(list, _)| *list == asym_ids) {
                Some((_, ids)) => ids.push(operator),
                None => gen_rows.push((asym_ids, vec![operator])),
            }
        }
        for (asym_ids, ids) in gen_rows {
            let expression = ids
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(",");
            generators.push([id.clone(), expression, asym_ids])?;
        }
    }

    let mut oper_list = Category::new("pdbx_struct_oper_list", OPERATOR_COLUMNS);
    for (index, texts) in operators.iter().enumerate() {
        let values: Vec<Value> = texts.iter().map(Value::from).collect();
        let identity = is_identity(&values);
        let mut row = vec![
            Value::from(index + 1),
            Value::from(if identity { "identity operation" } else { "?" }),
            Value::from(if identity { "1_555" } else { "?" }),
            Value::from(if identity { "x,y,z" } else { "?" }),
        ];
        row.extend(values);
        oper_list.push_row(row)?;
    }
    dictionary.insert_non_empty(assembly);
    dictionary.insert_non_empty(generators);
    dictionary.insert_non_empty(oper_list);
    Ok(())
}

fn atom_sites(
    file: &MmtfFile,
    layout: &Layout,
    groups: &[Group],
    entities: &[Entity],
    dictionary: &mut Dictionary,
) -> Result<()> {
    let list = |key: &str| file.texts(key).unwrap_or_default();
    let (xs, ys, zs) = (list("xCoordList"), list("yCoordList"), list("zCoordList"));
    let (ids, alt_locs) = (list("atomIdList"), list("altLocList"));
    let (b_factors, occupancies) = (list("bFactorList"), list("occupancyList"));
    let (group_ids, ins_codes) = (list("groupIdList"), list("insCodeList"));
    let sequence_index = file.ints("sequenceIndexList").unwrap_or_default();
    let chains_per_model = file.ints("chainsPerModel").unwrap_or_default();
    let models = file
        .value("numModels")
        .and_then(MsgValue::as_i64)
        .map_or(chains_per_model.len(), |count| count.max(0) as usize);

    let mut category = Category::new("atom_site", ATOM_SITE_COLUMNS);
    let mut chain = 0usize;
    let mut atom = 0usize;
    for model in 0..models {
        let chain_count = chains_per_model.get(model).copied().unwrap_or(0).max(0) as usize;
        for _ in 0..chain_count {
            let entity = layout.chain_entity.get(&chain).copied();
            let polymer = entity
                .and_then(|entity| entities.get(entity))
                .map_or(false, |entity| entity.kind == "polymer");
            let asym_id = layout.chain_id(chain)?;
            let auth_asym_id = layout.chain_name(chain)?;
            for group in layout.groups_of(chain) {
                let definition = at(
                    groups,
                    *at(&layout.group_types, group, "groupTypeList")?,
                    "groupList",
                )?;
                let seq_id = match sequence_index.get(group) {
                    Some(&position) if polymer && position >= 0 => Value::from(position + 1),
                    _ => Value::Inapplicable,
                };
                let ins_code = match ins_codes.get(group).map(String::as_str) {
                    None | Some("") => Value::Unknown,
                    Some(code) => Value::from(code),
                };
                let auth_seq_id = Value::from(group_ids.get(group).map(String::as_str));
                let record = if polymer && residues::is_standard(&definition.name) {
                    "ATOM"
                } else {
                    "HETATM"
                };
                for (slot, name) in definition.atoms.iter().enumerate() {
                    let alt_id = match alt_locs.get(atom).map(String::as_str) {
                        None | Some("") => Value::Inapplicable,
                        Some(alt) => Value::from(alt),
                    };
                    let element = definition
                        .elements
                        .get(slot)
                        .map(|element| element.to_uppercase());
                    let charge = definition.charges.get(slot).copied().unwrap_or(0);
                    category.push_row(vec![
                        Value::from(record),
                        ids.get(atom)
                            .map(Value::from)
                            .unwrap_or_else(|| Value::from(atom + 1)),
                        Value::from(element),
                        Value::from(name),
                        alt_id,
                        Value::from(definition.name.as_str()),
                        Value::from(asym_id),
                        entity.map(|entity| Value::from(entity + 1)).unwrap_or_default(),
                        seq_id.clone(),
                        ins_code.clone(),
                        Value::from(at(&xs, atom, "xCoordList")?),
                        Value::from(at(&ys, atom, "yCoordList")?),
                        Value::from(at(&zs, atom, "zCoordList")?),
                        Value::from(occupancies.get(atom).map_or("1.0", String::as_str)),
                        Value::from(b_factors.get(atom).map(String::as_str)),
                        Value::from(charge),
                        auth_seq_id.clone(),
                        Value::from(definition.name.as_str()),
                        Value::from(auth_asym_id),
                        Value::from(name),
                        Value::from(model + 1),
                    ])?;
                    atom += 1;
                }
            }
            chain += 1;
        }
    }
    tracing::debug!(atoms = category.len(), models, "projected MMTF atoms");
    dictionary.insert_non_empty(category);
    Ok(())
}

pub(super) fn project(file: &MmtfFile) -> Result<Dictionary> {
    let groups = groups(file)?;
    let entities = entities(file)?;
    let layout = Layout::new(file, &entities)?;

    let mut dictionary = Dictionary::new();
    let entry_id = entry_category(file, &mut dictionary)?;
    refinement(file, &entry_id, &mut dictionary)?;
    entity_categories(file, &layout, &groups, &entities, &mut dictionary)?;
    chemistry(&groups, &mut dictionary)?;
    assemblies(file, &layout, &mut dictionary)?;
    atom_sites(file, &layout, &groups, &entities, &mut dictionary)?;
    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use super::super::{fixture, parse_bytes};
    use pretty_assertions::assert_eq;

    fn column(dictionary: &crate::model::Dictionary, category: &str, name: &str) -> Vec<String> {
        dictionary
            .get(category)
            .and_then(|category| category.column(name))
            .map(|values| values.map(|value| value.as_str().to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn header_categories() {
        let dictionary = parse_bytes(&fixture::sample()).expect("parsed");
        assert_eq!(dictionary.entry_id(), Some("1ABC"));
        assert_eq!(dictionary.known("struct", "title"), Some("A SMALL TEST"));
        assert_eq!(
            dictionary.known("pdbx_database_status", "recvd_initial_deposition_date"),
            Some("2002-05-06")
        );
        assert_eq!(dictionary.known("refine", "ls_d_res_high"), Some("1.9"));
        assert_eq!(dictionary.known("refine", "pdbx_refine_id"), Some("X-RAY DIFFRACTION"));
        assert_eq!(dictionary.known("symmetry", "space_group_name_H-M"), Some("P 1 21 1"));
        assert_eq!(dictionary.known("cell", "length_a"), Some("57.57"));
        assert_eq!(dictionary.known("cell", "angle_alpha"), Some("90.0"));
    }

    #[test]
    fn entities_and_sequences() {
        let dictionary = parse_bytes(&fixture::sample()).expect("parsed");
        assert_eq!(column(&dictionary, "entity", "type"), vec!["polymer", "water"]);
        assert_eq!(column(&dictionary, "entity", "pdbx_description"), vec!["PROTEIN X", "water"]);
        assert_eq!(dictionary.known("entity_poly", "pdbx_seq_one_letter_code"), Some("MKVGA"));
        assert_eq!(dictionary.known("entity_poly", "type"), Some("polypeptide(L)"));
        assert_eq!(
            column(&dictionary, "entity_poly_seq", "mon_id"),
            vec!["MET", "LYS", "VAL", "GLY", "ALA"]
        );
        assert_eq!(column(&dictionary, "struct_asym", "entity_id"), vec!["1", "2"]);
        assert_eq!(column(&dictionary, "chem_comp", "id"), vec!["GLY", "HOH", "VAL"]);
        assert_eq!(column(&dictionary, "atom_type", "symbol"), vec!["C", "N", "O"]);
    }

    #[test]
    fn assemblies_use_formatted_operators() {
        let dictionary = parse_bytes(&fixture::sample()).expect("parsed");
        assert_eq!(
            dictionary.known("pdbx_struct_assembly_gen", "asym_id_list"),
            Some("A,B")
        );
        assert_eq!(
            dictionary.known("pdbx_struct_assembly_gen", "oper_expression"),
            Some("1")
        );
        assert_eq!(
            dictionary.known("pdbx_struct_oper_list", "matrix[1][1]"),
            Some("1.0000000000")
        );
        assert_eq!(
            dictionary.known("pdbx_struct_oper_list", "vector[3]"),
            Some("0.0000000000")
        );
        assert_eq!(
            dictionary.known("pdbx_struct_oper_list", "type"),
            Some("identity operation")
        );
    }

    #[test]
    fn atom_sites_follow_the_hierarchy() {
        let dictionary = parse_bytes(&fixture::sample()).expect("parsed");
        let atoms = dictionary.get("atom_site").expect("atom_site");
        assert_eq!(atoms.len(), 4);
        let first = atoms.first().expect("row");
        let values: Vec<&str> = first.values().iter().map(|value| value.as_str()).collect();
        assert_eq!(
            values,
            vec![
                "ATOM", "1", "N", "N", ".", "VAL", "A", "1", "3", "?", "3.696", "3.328", "-7.0",
                "1.0", "21.5", "0", "11", "VAL", "A", "N", "1",
            ]
        );
        assert_eq!(atoms.value(1, "label_alt_id").map(|v| v.as_str()), Some("A"));
        assert_eq!(atoms.value(2, "label_seq_id").map(|v| v.as_str()), Some("4"));
        let water = atoms.row(3).expect("water");
        assert_eq!(water.str("group_PDB"), "HETATM");
        assert_eq!(water.str("label_seq_id"), ".");
        assert_eq!(water.str("label_asym_id"), "B");
        assert_eq!(water.str("auth_seq_id"), "3169");
        assert_eq!(water.str("occupancy"), "0.5");
        assert_eq!(water.str("B_iso_or_equiv"), "40.0");
    }
}
