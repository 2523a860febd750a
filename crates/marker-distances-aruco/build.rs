//! Compiles `data/*_CODES.json` into `$OUT_DIR/builtins.rs`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;

#[derive(Deserialize)]
struct CodeTable {
    name: String,
    marker_size: usize,
    max_correction_bits: u8,
    codes: Vec<u64>,
}

fn table_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read data dir")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_CODES.json"))
        })
        .collect();
    files.sort();
    files
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let data_dir = manifest_dir.join("data");
    println!("cargo:rerun-if-changed={}", data_dir.display());

    let mut out = String::new();
    let mut names = Vec::new();
    for path in table_files(&data_dir) {
        println!("cargo:rerun-if-changed={}", path.display());
        let text = fs::read_to_string(&path).expect("read code table");
        let table: CodeTable = serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        let bits = table.marker_size * table.marker_size;
        assert!(
            (1..=64).contains(&bits),
            "{}: unsupported marker_size",
            table.name
        );
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        assert!(
            table.codes.iter().all(|&c| c & !mask == 0),
            "{}: code wider than {bits} bits",
            table.name
        );

        let ident = table.name.to_ascii_uppercase();
        writeln!(out, "/// `{}`: {} codes.", table.name, table.codes.len()).unwrap();
        writeln!(out, "pub const {ident}: BuiltinTable = BuiltinTable {{").unwrap();
        writeln!(out, "    name: {:?},", table.name).unwrap();
        writeln!(out, "    marker_size: {},", table.marker_size).unwrap();
        writeln!(out, "    max_correction_bits: {},", table.max_correction_bits).unwrap();
        writeln!(out, "    codes: &[").unwrap();
        for chunk in table.codes.chunks(6) {
            let row: Vec<String> = chunk.iter().map(|c| format!("0x{c:09X}")).collect();
            writeln!(out, "        {},", row.join(", ")).unwrap();
        }
        writeln!(out, "    ],").unwrap();
        writeln!(out, "}};\n").unwrap();
        names.push(ident);
    }

    writeln!(out, "/// Every table compiled into the crate.").unwrap();
    writeln!(out, "pub const BUILTINS: &[BuiltinTable] = &[{}];", names.join(", ")).unwrap();

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    fs::write(out_dir.join("builtins.rs"), out).expect("write builtins.rs");
}
