//! The MODEL / ATOM / HETATM / ANISOU / TER stream, grouped into residues.

use std::collections::{HashMap, HashSet};

use super::records::{hybrid36_decode, Line, Records};
use crate::error::{Error, Result};
use crate::residues;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum Kind {
    Polymer,
    NonPolymer,
    Water,
}

/// Author chain, residue number and insertion code as written in the file.
pub(super) type ResidueKey = (String, String, String);

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Residue {
    pub chain: String,
    pub number: String,
    pub insertion: String,
    pub name: String,
    pub kind: Kind,
}

impl Residue {
    pub fn key(&self) -> ResidueKey {
        (self.chain.clone(), self.number.clone(), self.insertion.clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Atom<'a> {
    pub line: Line<'a>,
    pub model: u32,
    pub residue: usize,
    pub anisou: Option<Line<'a>>,
}

#[derive(Debug, Default)]
pub(super) struct Stream<'a> {
    pub atoms: Vec<Atom<'a>>,
    pub residues: Vec<Residue>,
}

fn is_atom(record: &str) -> bool {
    record == "ATOM" || record == "HETATM"
}

pub(super) fn chain_of(line: &Line<'_>) -> String {
    line.field(22, 22).to_string()
}

pub(super) fn key_of(line: &Line<'_>) -> ResidueKey {
    (
        chain_of(line),
        line.field(23, 26).to_string(),
        line.field(27, 27).to_string(),
    )
}

fn serial(line: &Line<'_>) -> Result<i64> {
    hybrid36_decode(line.raw(7, 11), 5)
        .ok_or_else(|| Error::malformed(format!("unreadable atom serial in {:?}", line.text())))
}

fn check_coordinates(line: &Line<'_>) -> Result<()> {
    for (start, end) in [(31, 38), (39, 46), (47, 54)] {
        if line.field(start, end).parse::<f64>().is_err() {
            return Err(Error::malformed(format!(
                "missing or unreadable coordinate in {:?}",
                line.text()
            )));
        }
    }
    Ok(())
}

/// Chains closed by at least one TER record. A TER without a chain closes
/// the chain of the atom before it.
fn terminated_chains(records: &Records<'_>) -> HashSet<String> {
    let mut chains = HashSet::new();
    let mut last = None;
    for line in records.all() {
        match line.record() {
            record if is_atom(record) => last = Some(chain_of(line)),
            "TER" => {
                let chain = match line.field(22, 22) {
                    "" => last.clone(),
                    chain => Some(chain.to_string()),
                };
                chains.extend(chain);
            }
            _ => {}
        }
    }
    chains
}

/// Reads every atom, deciding on first sight whether its residue is part of
/// a polymer.
pub(super) fn read<'a>(
    records: &Records<'a>,
    modified: &HashSet<&str>,
    all_models: bool,
) -> Result<Stream<'a>> {
    let terminated = terminated_chains(records);
    let mut stream = Stream::default();
    let mut index: HashMap<ResidueKey, usize> = HashMap::new();
    let mut closed: HashSet<String> = HashSet::new();
    let mut model = 1;
    let mut last_chain: Option<String> = None;
    let mut serials: Vec<i64> = Vec::new();

    for line in records.all().iter().copied() {
        match line.record() {
            "MODEL" => {
                model = line.field(11, 14).parse().unwrap_or(model);
                closed.clear();
                last_chain = None;
            }
            "ENDMDL" if !all_models => break,
            "TER" => {
                let chain = match line.field(22, 22) {
                    "" => last_chain.clone(),
                    chain => Some(chain.to_string()),
                };
                closed.extend(chain);
            }
            "ANISOU" => {
                let number = serial(&line)?;
                let target = match serials.last() {
                    Some(&last) if last == number => Some(serials.len() - 1),
                    _ => serials.iter().rposition(|&known| known == number),
                };
                match target {
                    Some(position) => stream.atoms[position].anisou = Some(line),
                    None => tracing::trace!(serial = number, "ANISOU without a matching atom"),
                }
            }
            record if is_atom(record) => {
                serials.push(serial(&line)?);
                check_coordinates(&line)?;
                let key = key_of(&line);
                let residue = match index.get(&key) {
                    Some(&residue) => residue,
                    None => {
                        let name = line.field(18, 20).to_string();
                        let kind = if residues::is_water(&name) {
                            Kind::Water
                        } else if terminated.contains(&key.0) {
                            if closed.contains(&key.0) {
                                Kind::NonPolymer
                            } else {
                                Kind::Polymer
                            }
                        } else if record == "ATOM"
                            || residues::is_standard(&name)
                            || modified.contains(name.as_str())
                        {
                            Kind::Polymer
                        } else {
                            Kind::NonPolymer
                        };
                        stream.residues.push(Residue {
                            chain: key.0.clone(),
                            number: key.1.clone(),
                            insertion: key.2.clone(),
                            name,
                            kind,
                        });
                        index.insert(key.clone(), stream.residues.len() - 1);
                        stream.residues.len() - 1
                    }
                };
                last_chain = Some(key.0);
                stream.atoms.push(Atom {
                    line,
                    model,
                    residue,
                    anisou: None,
                });
            }
            _ => {}
        }
    }
    tracing::debug!(
        atoms = stream.atoms.len(),
        residues = stream.residues.len(),
        "read PDB atom records"
    );
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    const ATOMS: &str = "\
ATOM      1  N   VAL A  11       3.696  33.898  63.219  1.00 21.50           N
ATOM      2  CA  VAL A  11       3.198  33.218  61.983  1.00 19.76           C
ANISOU    2  CA  VAL A  11     2406   1892   1614    198    519   -328       C
ATOM      3  N   GLY A  12       4.225  32.018  61.739  1.00 18.23           N
TER       4      GLY A  12
HETATM    5  P   XMP A 301       7.000  30.000  60.000  1.00 30.00           P
HETATM    6  O   HOH A 401       1.000   2.000   3.000  1.00 40.00           O
HETATM    7  C1  MSE B   1       1.000   2.000   3.000  1.00 40.00           C
HETATM    8  C1  GOL B 501       1.000   2.000   3.000  1.00 40.00           C
";

    #[test]
    fn residues_after_ter_are_not_polymer() {
        let records = Records::new(ATOMS);
        let modified = HashSet::from(["MSE"]);
        let stream = read(&records, &modified, true).expect("atoms");
        let kinds: Vec<(&str, Kind)> = stream
            .residues
            .iter()
            .map(|residue| (residue.name.as_str(), residue.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("VAL", Kind::Polymer),
                ("GLY", Kind::Polymer),
                ("XMP", Kind::NonPolymer),
                ("HOH", Kind::Water),
                ("MSE", Kind::Polymer),
                ("GOL", Kind::NonPolymer),
            ]
        );
        assert_eq!(stream.atoms.len(), 7);
        assert!(stream.atoms[1].anisou.is_some());
        assert_eq!(stream.atoms[1].residue, 0);
    }

    #[test]
    fn later_models_can_be_skipped() {
        let text = format!("MODEL        1\n{ATOMS}ENDMDL\nMODEL        2\n{ATOMS}ENDMDL\n");
        let records = Records::new(&text);
        let stream = read(&records, &HashSet::new(), true).expect("atoms");
        assert_eq!(stream.atoms.len(), 14);
        assert_eq!(stream.residues.len(), 6);
        assert_eq!(stream.atoms[13].model, 2);
        assert_eq!(stream.atoms[6].model, 1);
        let first = read(&records, &HashSet::new(), false).expect("atoms");
        assert_eq!(first.atoms.len(), 7);
    }

    #[test]
    fn bad_coordinates_are_fatal() {
        let records = Records::new(
            "ATOM      1  N   VAL A  11       3.696  xx.xxx  63.219  1.00 21.50           N\n",
        );
        let err = read(&records, &HashSet::new(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        let records = Records::new(
            "ATOM   **  N   VAL A  11       3.696  33.898  63.219  1.00 21.50           N\n",
        );
        assert_eq!(
            read(&records, &HashSet::new(), true).unwrap_err().kind(),
            ErrorKind::Malformed
        );
    }
}
