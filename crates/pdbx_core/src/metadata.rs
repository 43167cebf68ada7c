//! A summary view over a dictionary: the description, experiment, quality
//! and assembly facts most callers want without walking categories.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::format::Format;
use crate::model::{Dictionary, Row};
use crate::pdb::OPERATOR_COLUMNS;

/// A 3x4 affine transform: rotation columns then translation.
pub(crate) type Transform = [[f64; 4]; 3];

pub(crate) const IDENTITY: Transform = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
];

/// `outer` applied after `inner`.
pub(crate) fn compose(outer: &Transform, inner: &Transform) -> Transform {
    let mut result = [[0.0; 4]; 3];
    for (row, out) in result.iter_mut().enumerate() {
        for (column, cell) in out.iter_mut().enumerate() {
            let mut sum: f64 = (0..3).map(|k| outer[row][k] * inner[k][column]).sum();
            if column == 3 {
                sum += outer[row][3];
            }
            // -0.0 prints as "-0.000000"
            *cell = if sum == 0.0 { 0.0 } else { sum };
        }
    }
    result
}

/// The transform of one `pdbx_struct_oper_list` row; unreadable cells are 0.
pub(crate) fn operator_transform(row: &Row<'_>) -> Transform {
    let mut transform = [[0.0; 4]; 3];
    for (index, column) in OPERATOR_COLUMNS[4..].iter().enumerate() {
        transform[index / 4][index % 4] = row
            .get(column)
            .and_then(|value| value.parse::<f64>())
            .unwrap_or(0.0);
    }
    transform
}

/// Expands an assembly operator expression into the operator id sequences
/// it names.
///
/// `1,2` and `1-4` list alternatives. Parenthesised groups such as
/// `(1-5)(6-10)` multiply out: every sequence takes one id from each group,
/// and the rightmost operator is applied first.
pub fn expand_operators(expression: &str) -> Vec<Vec<String>> {
    let expression = expression.trim();
    let groups: Vec<Vec<String>> = if expression.contains('(') {
        expression
            .split(['(', ')'])
            .map(str::trim)
            .filter(|group| !group.is_empty())
            .map(expand_group)
            .collect()
    } else {
        vec![expand_group(expression)]
    };
    if groups.iter().all(Vec::is_empty) {
        return Vec::new();
    }
    let mut combinations: Vec<Vec<String>> = vec![Vec::new()];
    for group in groups.iter().filter(|group| !group.is_empty()) {
        combinations = combinations
            .iter()
            .flat_map(|prefix| {
                group.iter().map(move |id| {
                    let mut next = prefix.clone();
                    next.push(id.clone());
                    next
                })
            })
            .collect();
    }
    combinations
}

fn expand_group(group: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for part in group.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let range = part
            .split_once('-')
            .and_then(|(start, end)| Some((start.trim().parse::<i64>().ok()?, end.trim().parse::<i64>().ok()?)));
        match range {
            Some((start, end)) if start <= end => ids.extend((start..=end).map(|n| n.to_string())),
            _ => ids.push(part.to_string()),
        }
    }
    ids
}

/// One copy of a set of chains placed by a composed operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transformation {
    /// Label asym ids the operator applies to.
    pub chains: Vec<String>,
    /// Operator ids, applied right to left.
    pub operators: Vec<String>,
    pub matrix: [[f64; 3]; 3],
    pub vector: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembly {
    pub id: String,
    pub software: Option<String>,
    pub delta_energy: Option<f64>,
    pub surface_area: Option<f64>,
    pub buried_surface_area: Option<f64>,
    pub transformations: Vec<Transformation>,
}

/// Biological assemblies described by the `pdbx_struct_assembly*` and
/// `pdbx_struct_oper_list` categories.
pub fn assemblies(dictionary: &Dictionary) -> Vec<Assembly> {
    let rows = |name: &str| {
        dictionary
            .get(name)
            .into_iter()
            .flat_map(|category| category.rows())
    };
    let operators: HashMap<&str, Transform> = rows("pdbx_struct_oper_list")
        .map(|row| (row.str("id"), operator_transform(&row)))
        .collect();

    rows("pdbx_struct_assembly")
        .map(|assembly| {
            let id = assembly.str("id");
            let property = |kind: &str| {
                rows("pdbx_struct_assembly_prop")
                    .find(|row| row.str("biol_id") == id && row.str("type") == kind)
                    .and_then(|row| row.get("value").and_then(|value| value.parse::<f64>()))
            };
            let mut transformations = Vec::new();
            for generator in rows("pdbx_struct_assembly_gen").filter(|row| row.str("assembly_id") == id) {
                let chains: Vec<String> = generator
                    .str("asym_id_list")
                    .split(',')
                    .map(str::trim)
                    .filter(|chain| !chain.is_empty())
                    .map(str::to_string)
                    .collect();
                for combination in expand_operators(generator.str("oper_expression")) {
                    let transform = combination.iter().try_fold(IDENTITY, |total, name| {
                        operators.get(name.as_str()).map(|next| compose(&total, next))
                    });
                    let Some(transform) = transform else {
                        tracing::debug!(assembly = id, "skipping expression with an unknown operator");
                        continue;
                    };
                    transformations.push(Transformation {
                        chains: chains.clone(),
                        operators: combination,
                        matrix: transform.map(|row| [row[0], row[1], row[2]]),
                        vector: transform.map(|row| row[3]),
                    });
                }
            }
            Assembly {
                id: id.to_string(),
                software: assembly.known("method_details").map(str::to_string),
                delta_energy: property("MORE"),
                surface_area: property("SSA (A^2)"),
                buried_surface_area: property("ABSA (A^2)"),
                transformations,
            }
        })
        .collect()
}

/// A parsed structure file summarised the way a reader of the entry would
/// describe it, keeping the full dictionary underneath.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureFile {
    filetype: Format,
    code: Option<String>,
    title: Option<String>,
    deposition_date: Option<NaiveDate>,
    classification: Option<String>,
    keywords: Vec<String>,
    authors: Vec<String>,
    technique: Option<String>,
    source_organism: Option<String>,
    expression_system: Option<String>,
    resolution: Option<f64>,
    rvalue: Option<f64>,
    rfree: Option<f64>,
    assemblies: Vec<Assembly>,
    #[serde(skip)]
    dictionary: Dictionary,
}

impl StructureFile {
    pub fn new(dictionary: Dictionary, filetype: Format) -> Self {
        let text = |category: &str, column: &str| dictionary.known(category, column).map(str::to_string);
        let number = |category: &str, column: &str| {
            dictionary
                .value(category, column)
                .and_then(|value| value.parse::<f64>())
        };
        let list = |category: &str, column: &str| -> Vec<String> {
            dictionary
                .get(category)
                .into_iter()
                .flat_map(|category| category.rows())
                .filter_map(|row| row.known(column).map(str::to_string))
                .collect()
        };

        let file = StructureFile {
            filetype,
            code: dictionary.entry_id().map(str::to_string),
            title: text("struct", "title"),
            deposition_date: dictionary
                .known("pdbx_database_status", "recvd_initial_deposition_date")
                .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()),
            classification: text("struct_keywords", "pdbx_keywords"),
            keywords: dictionary
                .known("struct_keywords", "text")
                .map(|text| {
                    text.split(',')
                        .map(str::trim)
                        .filter(|word| !word.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            authors: list("audit_author", "name"),
            technique: text("exptl", "method"),
            source_organism: text("entity_src_gen", "pdbx_gene_src_scientific_name")
                .or_else(|| text("entity_src_nat", "pdbx_organism_scientific")),
            expression_system: text("entity_src_gen", "pdbx_host_org_scientific_name"),
            resolution: number("reflns", "d_resolution_high")
                .or_else(|| number("refine", "ls_d_res_high")),
            rvalue: number("refine", "ls_R_factor_R_work")
                .or_else(|| number("refine", "ls_R_factor_obs")),
            rfree: number("refine", "ls_R_factor_R_free"),
            assemblies: assemblies(&dictionary),
            dictionary: Dictionary::new(),
        };
        StructureFile { dictionary, ..file }
    }

    pub fn filetype(&self) -> Format {
        self.filetype
    }

    /// The four-character entry code.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn deposition_date(&self) -> Option<NaiveDate> {
        self.deposition_date
    }

    pub fn classification(&self) -> Option<&str> {
        self.classification.as_deref()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// The first experimental method.
    pub fn technique(&self) -> Option<&str> {
        self.technique.as_deref()
    }

    pub fn source_organism(&self) -> Option<&str> {
        self.source_organism.as_deref()
    }

    pub fn expression_system(&self) -> Option<&str> {
        self.expression_system.as_deref()
    }

    /// High resolution limit in ångströms.
    pub fn resolution(&self) -> Option<f64> {
        self.resolution
    }

    pub fn rvalue(&self) -> Option<f64> {
        self.rvalue
    }

    pub fn rfree(&self) -> Option<f64> {
        self.rfree
    }

    pub fn assemblies(&self) -> &[Assembly] {
        &self.assemblies
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn into_dictionary(self) -> Dictionary {
        self.dictionary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmcif;
    use pretty_assertions::assert_eq;

    const ENTRY: &str = "\
data_1ABC
_entry.id 1ABC
_struct.title 'A TEST STRUCTURE'
_struct_keywords.pdbx_keywords HYDROLASE
_struct_keywords.text 'HYDROLASE, TIM BARREL'
_pdbx_database_status.recvd_initial_deposition_date 2002-05-06
_exptl.method 'X-RAY DIFFRACTION'
_refine.ls_d_res_high 1.90
_refine.ls_R_factor_R_work 0.193
_refine.ls_R_factor_R_free ?
_entity_src_gen.pdbx_gene_src_scientific_name 'Homo sapiens'
_entity_src_gen.pdbx_host_org_scientific_name 'Escherichia coli'
loop_
_audit_author.name
'Smith, J.'
'Jones, K.'
_pdbx_struct_assembly.id 1
_pdbx_struct_assembly.method_details PISA
_pdbx_struct_assembly_gen.assembly_id 1
_pdbx_struct_assembly_gen.oper_expression 1,2
_pdbx_struct_assembly_gen.asym_id_list A,B
loop_
_pdbx_struct_assembly_prop.biol_id
_pdbx_struct_assembly_prop.type
_pdbx_struct_assembly_prop.value
1 'ABSA (A^2)' 1720
1 MORE -12.5
loop_
_pdbx_struct_oper_list.id
_pdbx_struct_oper_list.type
_pdbx_struct_oper_list.matrix[1][1]
_pdbx_struct_oper_list.matrix[1][2]
_pdbx_struct_oper_list.matrix[1][3]
_pdbx_struct_oper_list.vector[1]
_pdbx_struct_oper_list.matrix[2][1]
_pdbx_struct_oper_list.matrix[2][2]
_pdbx_struct_oper_list.matrix[2][3]
_pdbx_struct_oper_list.vector[2]
_pdbx_struct_oper_list.matrix[3][1]
_pdbx_struct_oper_list.matrix[3][2]
_pdbx_struct_oper_list.matrix[3][3]
_pdbx_struct_oper_list.vector[3]
1 'identity operation' 1 0 0 0 0 1 0 0 0 0 1 0
2 'crystal symmetry operation' -1 0 0 10 0 -1 0 0 0 0 1 0
";

    fn summary() -> StructureFile {
        StructureFile::new(mmcif::parse_str(ENTRY).expect("parse"), Format::Mmcif)
    }

    #[test]
    fn description_fields() {
        let file = summary();
        assert_eq!(file.code(), Some("1ABC"));
        assert_eq!(file.title(), Some("A TEST STRUCTURE"));
        assert_eq!(file.classification(), Some("HYDROLASE"));
        assert_eq!(file.keywords(), ["HYDROLASE".to_string(), "TIM BARREL".to_string()]);
        assert_eq!(file.deposition_date(), NaiveDate::from_ymd_opt(2002, 5, 6));
        assert_eq!(file.authors(), ["Smith, J.".to_string(), "Jones, K.".to_string()]);
    }

    #[test]
    fn experiment_and_quality() {
        let file = summary();
        assert_eq!(file.technique(), Some("X-RAY DIFFRACTION"));
        assert_eq!(file.source_organism(), Some("Homo sapiens"));
        assert_eq!(file.expression_system(), Some("Escherichia coli"));
        assert_eq!(file.resolution(), Some(1.9));
        assert_eq!(file.rvalue(), Some(0.193));
        assert_eq!(file.rfree(), None);
    }

    #[test]
    fn assemblies_are_projected() {
        let file = summary();
        let assembly = &file.assemblies()[0];
        assert_eq!(assembly.software.as_deref(), Some("PISA"));
        assert_eq!(assembly.buried_surface_area, Some(1720.0));
        assert_eq!(assembly.delta_energy, Some(-12.5));
        assert_eq!(assembly.surface_area, None);
        assert_eq!(assembly.transformations.len(), 2);
        let second = &assembly.transformations[1];
        assert_eq!(second.chains, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(second.matrix[0], [-1.0, 0.0, 0.0]);
        assert_eq!(second.vector, [10.0, 0.0, 0.0]);
    }

    #[test]
    fn serialises_without_the_dictionary() {
        let json = serde_json::to_value(summary()).expect("json");
        assert_eq!(json["code"], "1ABC");
        assert_eq!(json["filetype"], "mmcif");
        assert_eq!(json["deposition_date"], "2002-05-06");
        assert!(json.get("dictionary").is_none());
    }

    #[test]
    fn operator_expressions() {
        let ids = |expression: &str| expand_operators(expression);
        assert_eq!(ids("1"), vec![vec!["1".to_string()]]);
        assert_eq!(ids("1,2").len(), 2);
        assert_eq!(
            ids("1-4").into_iter().flatten().collect::<Vec<_>>(),
            ["1", "2", "3", "4"]
        );
        let product = ids("(1-5)(6-10)");
        assert_eq!(product.len(), 25);
        assert_eq!(product[0], ["1", "6"]);
        assert_eq!(product[24], ["5", "10"]);
        assert_eq!(ids("(X0)(1,2)"), vec![vec!["X0", "1"], vec!["X0", "2"]]);
        assert!(ids("").is_empty());
    }

    #[test]
    fn composition_applies_the_inner_operator_first() {
        let shift = [
            [1.0, 0.0, 0.0, 5.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        let flip = [
            [-1.0, 0.0, 0.0, 0.0],
            [0.0, -1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        assert_eq!(compose(&flip, &shift)[0], [-1.0, 0.0, 0.0, -5.0]);
        assert_eq!(compose(&IDENTITY, &flip)[1], [0.0, -1.0, 0.0, 0.0]);
    }
}
