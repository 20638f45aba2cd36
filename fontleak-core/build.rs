//! Generates the IDX_POINTS table (fontleak-core/src/font/idx_points.rs spec) at
//! build time from the Unicode Character Database so the running binary never
//! needs to carry a name lookup table of its own.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const EXCLUDED: &[&str] = &[
    "ARABIC",
    "GREEK",
    "CYRILLIC",
    "HEBREW",
    "HIRAGANA",
    "KATAKANA",
    "HANGUL",
    "THAI",
];

fn main() {
    let mut points = Vec::new();

    for cp in 256u32..0x1FFFF {
        let Some(ch) = char::from_u32(cp) else {
            continue;
        };
        let Some(name) = unicode_names2::name(ch) else {
            continue;
        };
        let desc = name.to_string().to_uppercase();
        let matches_family = desc.contains("LATIN ") || desc.contains("MATHEMATICAL ");
        let excluded = EXCLUDED.iter().any(|bad| desc.contains(bad));
        if matches_family && !excluded {
            points.push(cp);
        }
    }

    let mut out = String::new();
    writeln!(out, "// @generated by build.rs from the Unicode Character Database. Do not edit.").unwrap();
    writeln!(out, "pub const IDX_POINTS: &[u32] = &[").unwrap();
    for chunk in points.chunks(16) {
        let line = chunk
            .iter()
            .map(|cp| format!("0x{cp:X}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "    {line},").unwrap();
    }
    writeln!(out, "];").unwrap();

    let out_dir = env::var_os("OUT_DIR").unwrap();
    let dest = Path::new(&out_dir).join("idx_points_data.rs");
    fs::write(&dest, out).expect("failed to write generated IDX_POINTS table");

    println!("cargo:rerun-if-changed=build.rs");
}
