#![forbid(unsafe_code)]
//! Opening, fetching and saving structure files.
//!
//! The codecs in `pdbx_core` work on buffers; this crate supplies the
//! buffers. Files may be gzipped, formats are detected from the name or the
//! contents, and every read hands back either the canonical dictionary or a
//! [`StructureFile`] summary of it.

mod transport;

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::io::{AsyncRead, AsyncReadExt};

pub use pdbx_core::{Dictionary, Error, ErrorKind, Format, Result, StructureFile};
pub use transport::{resolve_url, Transport};
#[cfg(feature = "http")]
pub use transport::UreqTransport;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Return the bare dictionary instead of a [`StructureFile`].
    pub dictionary_mode: bool,
}

impl OpenOptions {
    pub fn dictionary() -> Self {
        Self {
            dictionary_mode: true,
        }
    }
}

/// What a read produced, as chosen by [`OpenOptions::dictionary_mode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Dictionary(Dictionary),
    Structure(StructureFile),
}

impl Loaded {
    pub fn dictionary(&self) -> &Dictionary {
        match self {
            Loaded::Dictionary(dictionary) => dictionary,
            Loaded::Structure(file) => file.dictionary(),
        }
    }

    pub fn into_dictionary(self) -> Dictionary {
        match self {
            Loaded::Dictionary(dictionary) => dictionary,
            Loaded::Structure(file) => file.into_dictionary(),
        }
    }

    pub fn structure(&self) -> Option<&StructureFile> {
        match self {
            Loaded::Structure(file) => Some(file),
            Loaded::Dictionary(_) => None,
        }
    }
}

/// Reads a structure file from disk, gunzipping it when needed.
pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Loaded> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| Error::from(err).with_path(path))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    load(name, &bytes, options).map_err(|err| err.with_path(path))
}

/// Reads a whole structure file from an async source. `filename` is only a
/// hint for format detection and may be empty.
pub async fn open_async_reader<R>(mut reader: R, filename: &str, options: OpenOptions) -> Result<Loaded>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    load(filename, &bytes, options)
}

/// Downloads a structure by PDB code or URL (see [`resolve_url`]).
pub fn fetch<T: Transport + ?Sized>(identifier: &str, transport: &T, options: OpenOptions) -> Result<Loaded> {
    let url = resolve_url(identifier);
    tracing::debug!(%url, "fetching");
    let bytes = transport.get(&url)?;
    load(&url, &bytes, options)
}

/// Decodes an in-memory file named `filename`.
pub fn load(filename: &str, bytes: &[u8], options: OpenOptions) -> Result<Loaded> {
    let bytes = decompress(filename, bytes)?;
    let format = Format::detect(filename, &bytes);
    tracing::debug!(filename, %format, bytes = bytes.len(), "decoding");
    let dictionary = pdbx_core::parse_bytes(format, &bytes)?;
    Ok(if options.dictionary_mode {
        Loaded::Dictionary(dictionary)
    } else {
        Loaded::Structure(StructureFile::new(dictionary, format))
    })
}

fn decompress<'a>(filename: &str, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>> {
    let named = filename.to_ascii_lowercase().ends_with(".gz");
    if !named && !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(Cow::Owned(out))
}

/// Writes `dictionary` in the format named by the extension of `path`
/// (`.cif`, `.bcif` or `.pdb`), gzipped when the name ends in `.gz`.
pub fn save_dictionary(dictionary: &Dictionary, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let encoded = encode(dictionary, path).map_err(|err| err.with_path(path))?;
    let gzipped = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    let file = File::create(path).map_err(|err| Error::from(err).with_path(path))?;
    let mut writer = BufWriter::new(file);
    if gzipped {
        let mut encoder = GzEncoder::new(&mut writer, Compression::default());
        encoder.write_all(&encoded)?;
        encoder.finish()?;
    } else {
        writer.write_all(&encoded)?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), bytes = encoded.len(), gzipped, "saved");
    Ok(())
}

fn encode(dictionary: &Dictionary, path: &Path) -> Result<Vec<u8>> {
    match Format::from_path(path) {
        Some(Format::Mmcif) => Ok(pdbx_core::mmcif::to_string(dictionary)?.into_bytes()),
        Some(Format::Pdb) => Ok(pdbx_core::pdb::to_string(dictionary).into_bytes()),
        Some(Format::Bcif) => pdbx_core::bcif::to_bytes(dictionary),
        Some(Format::Mmtf) => Err(Error::unsupported("MMTF files can be read but not written")),
        None => Err(Error::unsupported(
            "expected a .cif, .bcif or .pdb extension",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const ENTRY: &str = "\
data_1ABC
_entry.id 1ABC
_struct.title 'Small test'
loop_
_atom_site.group_PDB
_atom_site.id
_atom_site.type_symbol
_atom_site.label_atom_id
_atom_site.label_comp_id
_atom_site.label_asym_id
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
ATOM 1 N N VAL A 3.696 33.898 63.219
ATOM 2 C CA VAL A 3.198 33.218 61.983
";

    #[derive(Default)]
    struct Recorded {
        bodies: HashMap<String, Vec<u8>>,
        requested: Mutex<Vec<String>>,
    }

    impl Transport for Recorded {
        fn get(&self, url: &str) -> Result<Vec<u8>> {
            if let Ok(mut requested) = self.requested.lock() {
                requested.push(url.to_string());
            }
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("{url} answered 404")))
        }
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).expect("compress");
        encoder.finish().expect("finish")
    }

    #[test]
    fn structure_mode_summarises() {
        let loaded = load("1abc.cif", ENTRY.as_bytes(), OpenOptions::default()).expect("load");
        let file = loaded.structure().expect("structure");
        assert_eq!(file.code(), Some("1ABC"));
        assert_eq!(file.title(), Some("Small test"));
        assert_eq!(file.filetype(), Format::Mmcif);
    }

    #[test]
    fn dictionary_mode_returns_the_tables() {
        let loaded = load("1abc.cif", ENTRY.as_bytes(), OpenOptions::dictionary()).expect("load");
        assert!(loaded.structure().is_none());
        assert_eq!(loaded.dictionary().get("atom_site").map(|sites| sites.len()), Some(2));
    }

    #[test]
    fn gzip_is_recognised_by_magic() {
        let loaded = load("download", &gzip(ENTRY.as_bytes()), OpenOptions::dictionary()).expect("load");
        assert_eq!(loaded.dictionary().entry_id(), Some("1ABC"));
    }

    #[test]
    fn fetch_resolves_then_decodes() {
        let mut transport = Recorded::default();
        transport.bodies.insert(
            "https://files.rcsb.org/view/1abc.cif".to_string(),
            ENTRY.as_bytes().to_vec(),
        );
        let loaded = fetch("1ABC", &transport, OpenOptions::default()).expect("fetch");
        assert_eq!(loaded.structure().and_then(StructureFile::code), Some("1ABC"));
        let requested = transport.requested.lock().expect("lock").clone();
        assert_eq!(requested, vec!["https://files.rcsb.org/view/1abc.cif".to_string()]);
    }

    #[test]
    fn missing_entries_are_not_found() {
        let err = fetch("9XYZ", &Recorded::default(), OpenOptions::default()).expect_err("404");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn async_reader_matches_sync_load() {
        let reader = futures::io::Cursor::new(ENTRY.as_bytes().to_vec());
        let loaded = futures::executor::block_on(open_async_reader(reader, "", OpenOptions::dictionary()))
            .expect("async load");
        let expected = load("", ENTRY.as_bytes(), OpenOptions::dictionary()).expect("load");
        assert_eq!(loaded, expected);
    }

    #[test]
    fn saving_needs_a_known_extension() {
        let dictionary = pdbx_core::mmcif::parse_str(ENTRY).expect("parse");
        let dir = tempfile::tempdir().expect("tempdir");
        let err = save_dictionary(&dictionary, dir.path().join("1abc.txt")).expect_err("extension");
        assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);
        let err = save_dictionary(&dictionary, dir.path().join("1abc.mmtf")).expect_err("mmtf");
        assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);
    }

    #[test]
    fn open_reports_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.cif");
        let err = open(&missing, OpenOptions::default()).expect_err("missing file");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.path(), Some(missing.as_path()));
    }
}
