use std::io::Write;
use std::path::PathBuf;

use flate2::write::GzEncoder;
use flate2::Compression;
use pdbx_io::{open, save_dictionary, Dictionary, Format, Loaded, OpenOptions};
use pretty_assertions::assert_eq;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../pdbx_core/tests/data")
        .join(name)
}

fn cif_fixture() -> Dictionary {
    open(fixture("1abc.cif"), OpenOptions::dictionary())
        .expect("fixture opens")
        .into_dictionary()
}

#[test]
fn saved_files_reopen_unchanged() {
    let dictionary = cif_fixture();
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["out.cif", "out.cif.gz", "out.bcif", "out.bcif.gz"] {
        let path = dir.path().join(name);
        save_dictionary(&dictionary, &path).expect("save");
        let reopened = open(&path, OpenOptions::dictionary()).expect("reopen");
        assert_eq!(reopened.dictionary(), &dictionary, "{name}");
    }
}

#[test]
fn gzipped_output_is_compressed() {
    let dictionary = cif_fixture();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("1abc.cif.gz");
    save_dictionary(&dictionary, &path).expect("save");
    let bytes = std::fs::read(&path).expect("read back");
    assert!(bytes.starts_with(&[0x1f, 0x8b]));
}

#[test]
fn pdb_output_opens_as_a_summary() {
    let dictionary = open(fixture("1lol.pdb"), OpenOptions::dictionary())
        .expect("fixture opens")
        .into_dictionary();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("1lol.pdb");
    save_dictionary(&dictionary, &path).expect("save");

    let Loaded::Structure(file) = open(&path, OpenOptions::default()).expect("reopen") else {
        panic!("expected a structure summary");
    };
    assert_eq!(file.filetype(), Format::Pdb);
    assert_eq!(file.code(), Some("1LOL"));
    assert_eq!(file.classification(), Some("LYASE"));
}

#[test]
fn extensionless_gzip_is_detected() {
    let text = std::fs::read(fixture("1abc.cif")).expect("fixture");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&text).expect("compress");
    let compressed = encoder.finish().expect("finish");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("download");
    std::fs::write(&path, compressed).expect("write");
    let loaded = open(&path, OpenOptions::default()).expect("open");
    let file = loaded.structure().expect("summary");
    assert_eq!(file.filetype(), Format::Mmcif);
    assert_eq!(file.title(), Some("Crystal structure of a small decarboxylase fragment"));
}
