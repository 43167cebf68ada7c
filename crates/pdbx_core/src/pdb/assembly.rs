//! REMARK 350 biological assemblies.

use super::molecules::Labels;
use super::records::{number, Line, Records};
use crate::error::Result;
use crate::model::{Category, Dictionary, Value};

/// `pdbx_struct_oper_list` columns, matrix rows interleaved with their
/// translation component.
pub(crate) const OPERATOR_COLUMNS: [&str; 16] = [
    "id",
    "type",
    "name",
    "symmetry_operation",
    "matrix[1][1]",
    "matrix[1][2]",
    "matrix[1][3]",
    "vector[1]",
    "matrix[2][1]",
    "matrix[2][2]",
    "matrix[2][3]",
    "vector[2]",
    "matrix[3][1]",
    "matrix[3][2]",
    "matrix[3][3]",
    "vector[3]",
];

pub(super) const ASSEMBLY_COLUMNS: [&str; 5] = [
    "id",
    "details",
    "method_details",
    "oligomeric_details",
    "oligomeric_count",
];

/// Absolute buried area, surface area and free energy, as REMARK 350 keys.
pub(super) const PROPERTIES: [(&str, &str); 3] = [
    ("TOTAL BURIED SURFACE AREA", "ABSA (A^2)"),
    ("SURFACE AREA OF THE COMPLEX", "SSA (A^2)"),
    ("CHANGE IN SOLVENT FREE ENERGY", "MORE"),
];

/// True when the twelve values are `[I | 0]`.
pub(crate) fn is_identity(values: &[Value]) -> bool {
    values.len() == 12
        && values.iter().enumerate().all(|(slot, value)| {
            let expected = if matches!(slot, 0 | 5 | 10) { 1.0 } else { 0.0 };
            value.parse::<f64>() == Some(expected)
        })
}

#[derive(Default)]
struct Group {
    chains: Vec<String>,
    operators: Vec<usize>,
}

#[derive(Default)]
struct Assembly {
    id: String,
    author: Option<String>,
    software: Option<String>,
    method: Option<String>,
    properties: Vec<(&'static str, String)>,
    groups: Vec<Group>,
}

fn chain_list(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(',')
        .map(str::trim)
        .filter(|chain| !chain.is_empty())
        .map(str::to_string)
}

/// A BIOMT row: three matrix values then the translation.
fn biomt_row(line: &Line<'_>) -> [Value; 4] {
    [
        line.number(24, 33),
        line.number(34, 43),
        line.number(44, 53),
        line.number(59, 68),
    ]
}

/// Stores an operator, reusing an existing one with the same values.
fn operator_index(operators: &mut Vec<Vec<Value>>, values: Vec<Value>) -> usize {
    match operators.iter().position(|known| *known == values) {
        Some(position) => position,
        None => {
            operators.push(values);
            operators.len() - 1
        }
    }
}

fn parse(records: &Records<'_>) -> (Vec<Assembly>, Vec<Vec<Value>>) {
    let mut assemblies: Vec<Assembly> = Vec::new();
    let mut operators: Vec<Vec<Value>> = Vec::new();
    let mut rows: Vec<[Value; 4]> = Vec::new();
    let mut last_key = "";

    for line in records.remarks(350) {
        let text = line.rest(11);
        if let Some(id) = text.strip_prefix("BIOMOLECULE:") {
            assemblies.push(Assembly {
                id: id.trim().to_string(),
                ..Assembly::default()
            });
            rows.clear();
            continue;
        }
        let Some(assembly) = assemblies.last_mut() else {
            continue;
        };
        if text.starts_with("BIOMT") {
            rows.push(biomt_row(&line));
            if line.field(14, 19) == "BIOMT3" && rows.len() >= 3 {
                let mut values = Vec::with_capacity(12);
                for row in rows.drain(..) {
                    values.extend(row);
                }
                values.truncate(12);
                let index = operator_index(&mut operators, values);
                if let Some(group) = assembly.groups.last_mut() {
                    if !group.operators.contains(&index) {
                        group.operators.push(index);
                    }
                }
            }
            continue;
        }
        let Some((key, value)) = text.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "AUTHOR DETERMINED BIOLOGICAL UNIT" => assembly.author = Some(value.to_string()),
            "SOFTWARE DETERMINED QUATERNARY STRUCTURE" => {
                assembly.software = Some(value.to_string())
            }
            "SOFTWARE USED" => assembly.method = Some(value.to_string()),
            "APPLY THE FOLLOWING TO CHAINS" => {
                assembly.groups.push(Group {
                    chains: chain_list(value).collect(),
                    operators: Vec::new(),
                });
            }
            "AND CHAINS" if last_key == "APPLY THE FOLLOWING TO CHAINS" || last_key == "AND CHAINS" => {
                if let Some(group) = assembly.groups.last_mut() {
                    group.chains.extend(chain_list(value));
                }
            }
            _ => {
                if let Some(&(_, kind)) = PROPERTIES.iter().find(|(name, _)| *name == key) {
                    let amount = value.split_whitespace().next().unwrap_or("");
                    assembly.properties.push((kind, amount.to_string()));
                }
            }
        }
        last_key = match key {
            "APPLY THE FOLLOWING TO CHAINS" => "APPLY THE FOLLOWING TO CHAINS",
            "AND CHAINS" => "AND CHAINS",
            _ => "",
        };
    }
    (assemblies, operators)
}

pub(super) fn read(records: &Records<'_>, labels: &Labels, dictionary: &mut Dictionary) -> Result<()> {
    let (assemblies, operators) = parse(records);
    let mut assembly_table = Category::new("pdbx_struct_assembly", ASSEMBLY_COLUMNS);
    let mut generators = Category::new(
        "pdbx_struct_assembly_gen",
        ["assembly_id", "oper_expression", "asym_id_list"],
    );
    let mut properties = Category::new(
        "pdbx_struct_assembly_prop",
        ["biol_id", "type", "value", "details"],
    );

    for assembly in &assemblies {
        let details = match (&assembly.author, &assembly.software) {
            (Some(_), Some(_)) => "author_and_software_defined_assembly",
            (None, Some(_)) => "software_defined_assembly",
            _ => "author_defined_assembly",
        };
        let oligomer = assembly
            .author
            .as_ref()
            .or(assembly.software.as_ref())
            .filter(|text| !text.is_empty())
            .map(|text| text.to_ascii_lowercase());
        let count: usize = assembly
            .groups
            .iter()
            .map(|group| group.chains.len() * group.operators.len())
            .sum();
        assembly_table.push([
            Value::text(&assembly.id),
            Value::text(details),
            Value::from(assembly.method.clone()),
            Value::from(oligomer),
            Value::from(count),
        ])?;
        for group in &assembly.groups {
            let asyms: Vec<&str> = group
                .chains
                .iter()
                .flat_map(|chain| labels.asyms_of(chain))
                .map(String::as_str)
                .collect();
            if asyms.is_empty() || group.operators.is_empty() {
                continue;
            }
            let expression = group
                .operators
                .iter()
                .map(|index| (index + 1).to_string())
                .collect::<Vec<_>>()
                .join(",");
            generators.push([
                Value::text(&assembly.id),
                Value::text(expression),
                Value::text(asyms.join(",")),
            ])?;
        }
        for (kind, amount) in &assembly.properties {
            properties.push([
                Value::text(&assembly.id),
                Value::text(*kind),
                number(amount),
                Value::Unknown,
            ])?;
        }
    }

    let mut oper_list = Category::new("pdbx_struct_oper_list", OPERATOR_COLUMNS);
    for (index, values) in operators.into_iter().enumerate() {
        let identity = is_identity(&values);
        let mut row = vec![
            Value::from(index + 1),
            Value::text(if identity {
                "identity operation"
            } else {
                "crystal symmetry operation"
            }),
            if identity { Value::text("1_555") } else { Value::Unknown },
            if identity { Value::text("x,y,z") } else { Value::Unknown },
        ];
        row.extend(values);
        oper_list.push_row(row)?;
    }

    tracing::debug!(assemblies = assembly_table.len(), "read REMARK 350");
    dictionary.insert_non_empty(assembly_table);
    dictionary.insert_non_empty(generators);
    dictionary.insert_non_empty(properties);
    dictionary.insert_non_empty(oper_list);
    Ok(())
}
