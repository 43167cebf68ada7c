use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pdbx_core::{bcif, mmcif, pdb};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name);
    std::fs::read_to_string(&path).expect("benchmark fixture")
}

fn bench_parse(c: &mut Criterion) {
    let cif = fixture("1abc.cif");
    let pdb_text = fixture("1lol.pdb");
    let dictionary = mmcif::parse_str(&cif).expect("parse cif");
    let binary = bcif::to_bytes(&dictionary).expect("encode bcif");

    c.bench_function("pdbx_core parse mmCIF", |b| {
        b.iter(|| {
            let dictionary = mmcif::parse_str(black_box(&cif)).expect("parse cif");
            black_box(dictionary.len());
        });
    });
    c.bench_function("pdbx_core parse PDB", |b| {
        b.iter(|| {
            let dictionary = pdb::parse_str(black_box(&pdb_text)).expect("parse pdb");
            black_box(dictionary.len());
        });
    });
    c.bench_function("pdbx_core parse BinaryCIF", |b| {
        b.iter(|| {
            let dictionary = bcif::parse_bytes(black_box(&binary)).expect("parse bcif");
            black_box(dictionary.len());
        });
    });
}

criterion_group!(core_benches, bench_parse);
criterion_main!(core_benches);
