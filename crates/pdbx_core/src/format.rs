use std::fmt;
use std::path::Path;

use serde::Serialize;

/// The structure file formats this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Mmcif,
    Bcif,
    Pdb,
    Mmtf,
}

impl Format {
    /// Format named by a file extension, looking through a trailing `.gz`.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?.to_ascii_lowercase();
        Self::from_name(&name)
    }

    fn from_name(name: &str) -> Option<Self> {
        if let Some(stem) = name.strip_suffix(".gz") {
            return Self::from_name(stem);
        }
        let (_, extension) = name.rsplit_once('.')?;
        match extension {
            "bcif" => Some(Format::Bcif),
            "mmtf" => Some(Format::Mmtf),
            "pdb" | "ent" => Some(Format::Pdb),
            "cif" | "mmcif" => Some(Format::Mmcif),
            _ => None,
        }
    }

    /// Picks a format from the file name when it has a known extension, and
    /// from the (already decompressed) contents otherwise.
    pub fn detect(filename: &str, bytes: &[u8]) -> Self {
        if let Some(format) = Self::from_name(&filename.to_ascii_lowercase()) {
            return format;
        }
        match std::str::from_utf8(bytes) {
            Err(_) if filename.to_ascii_lowercase().contains("mmtf") => Format::Mmtf,
            Err(_) => Format::Bcif,
            Ok(text) if text.lines().any(|line| line.starts_with("data_")) => Format::Mmcif,
            Ok(_) => Format::Pdb,
        }
    }

    pub fn is_binary(self) -> bool {
        matches!(self, Format::Bcif | Format::Mmtf)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Mmcif => "cif",
            Format::Bcif => "bcif",
            Format::Pdb => "pdb",
            Format::Mmtf => "mmtf",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extension_wins() {
        assert_eq!(Format::from_path("1lol.cif"), Some(Format::Mmcif));
        assert_eq!(Format::from_path("data/1LOL.PDB"), Some(Format::Pdb));
        assert_eq!(Format::from_path("1lol.bcif.gz"), Some(Format::Bcif));
        assert_eq!(Format::from_path("1lol.mmtf"), Some(Format::Mmtf));
        assert_eq!(Format::from_path("1lol"), None);
        assert_eq!(Format::detect("1lol.pdb", b"data_1LOL\n"), Format::Pdb);
    }

    #[test]
    fn sniffs_contents_without_extension() {
        assert_eq!(Format::detect("1LOL", b"data_1LOL\n#\n"), Format::Mmcif);
        assert_eq!(Format::detect("1LOL", b"HEADER    LYASE\n"), Format::Pdb);
        assert_eq!(Format::detect("1LOL", &[0xde, 0xff, 0x00]), Format::Bcif);
        assert_eq!(Format::detect("mmtf_1LOL", &[0xde, 0xff, 0x00]), Format::Mmtf);
    }
}
