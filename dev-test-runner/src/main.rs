//! Replays every `*.catalog.json` fixture through the assembler and checks
//! the result against its `*.expected.json` sibling (when present).
use std::path::{Path, PathBuf};

use descriptor_oas::catalog::Catalog;
use descriptor_oas::{CombinationPolicy, DocumentAssembler, WalkerOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static CATALOG_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<stem>.+)\.catalog\.json$").unwrap());

const REF_PREFIX: &str = "#/components/schemas/";

fn main() {
    let fixtures = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures"));

    let mut entries = match std::fs::read_dir(&fixtures) {
        Ok(entries) => entries.filter_map(Result::ok).map(|e| e.path()).collect::<Vec<_>>(),
        Err(error) => {
            eprintln!("❌ cannot read {}: {error}", fixtures.display());
            std::process::exit(2);
        }
    };
    entries.sort();

    let mut failures = 0usize;
    let mut total = 0usize;
    for path in entries {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(captures) = CATALOG_FILE.captures(file_name) else { continue };
        total += 1;
        let expected = path.with_file_name(format!("{}.expected.json", &captures["stem"]));
        match check(&path, &expected) {
            Ok(()) => println!("✅ {file_name}"),
            Err(message) => {
                failures += 1;
                println!("❌ {file_name}: {message}");
            }
        }
    }

    println!("{} fixture(s), {failures} failure(s)", total);
    if failures > 0 {
        std::process::exit(1);
    }
}

fn check(catalog_path: &Path, expected_path: &Path) -> Result<(), String> {
    let source = std::fs::read_to_string(catalog_path).map_err(|e| e.to_string())?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    let catalog: Catalog = serde_path_to_error::deserialize(de)
        .map_err(|e| format!("invalid catalog at {}: {}", e.path(), e.inner()))?;

    let mut assembler = DocumentAssembler::new(WalkerOptions::default(), CombinationPolicy::OneOf);
    assembler.add_catalog(&catalog).map_err(|e| e.to_string())?;
    let document = assembler.finish();

    let mut refs = Vec::new();
    collect_refs(&document, &mut refs);
    let components = document
        .pointer("/components/schemas")
        .and_then(Value::as_object)
        .ok_or("document has no components.schemas")?;
    for target in refs {
        let resolved = target
            .strip_prefix(REF_PREFIX)
            .is_some_and(|name| components.contains_key(name));
        if !resolved {
            return Err(format!("dangling reference {target}"));
        }
    }

    if expected_path.exists() {
        let expected = std::fs::read_to_string(expected_path).map_err(|e| e.to_string())?;
        let expected: Value = serde_json::from_str(&expected).map_err(|e| e.to_string())?;
        if expected != document {
            let actual = serde_json::to_string_pretty(&document).unwrap_or_default();
            return Err(format!("document differs from {}:\n{actual}", expected_path.display()));
        }
    }
    Ok(())
}

fn collect_refs<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("$ref") {
                out.push(target);
            }
            map.values().for_each(|v| collect_refs(v, out));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}
