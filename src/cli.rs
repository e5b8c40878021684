//! Minimal CLI: descriptor dumps → (component schemas | OpenAPI fragment)
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::assemble::{CombinationPolicy, DocumentAssembler};
use crate::catalog::Catalog;
use crate::descriptor::Descriptor;
use crate::naming::canonical_serial_name;
use crate::registry::ComponentRegistry;
use crate::walker::{SchemaWalker, WalkerOptions};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// synthesize OpenAPI 3.1 schemas from serialization descriptors
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// walk descriptors and print their usage schemas plus the shared components
    Schema(SchemaOut),
    /// assemble an OpenAPI fragment (paths + components) from operation catalogs
    Document(DocumentOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select a subnode in each document (e.g. /data/descriptors)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone, Copy)]
struct WalkSettings {
    /// register plain objects as named components instead of inlining them
    #[arg(long, default_value_t = false)]
    register_objects: bool,

    /// fail on contextual/open descriptors instead of emitting an opaque object
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    walk_settings: WalkSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct DocumentOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    walk_settings: WalkSettings,

    /// how several response bodies sharing a status and content type are combined
    #[arg(long, value_enum, default_value_t = CombinationPolicy::OneOf)]
    combine: CombinationPolicy,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Feed every selected document to `apply`, labelled with its source path.
    fn load_process(&self, mut apply: impl FnMut(&str, Value) -> Result<()>) -> Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            let json_value = crate::path_de::from_str_with_path::<Value>(&source)
                .map_err(|error| anyhow!("failed to parse JSON source file ({source_path_str}): {error}"))?;
            let json_value = match self.json_pointer.as_deref() {
                None => json_value,
                Some(pointer) => json_value
                    .pointer(pointer)
                    .cloned()
                    .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {source_path_str}"))?,
            };
            match self.jq_expr.as_ref() {
                None => apply(&source_path_str, json_value)?,
                Some(jq_expr) => {
                    let results = crate::jq_exec::run_jaq(jq_expr, &json_value).with_context(|| {
                        format!("failed to apply jq expression to source file ({source_path_str})")
                    })?;
                    for json_value in results {
                        apply(&source_path_str, json_value)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl From<WalkSettings> for WalkerOptions {
    fn from(settings: WalkSettings) -> Self {
        WalkerOptions {
            register_objects: settings.register_objects,
            strict: settings.strict,
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                // one registry for every input of this pass
                let mut registry = ComponentRegistry::new();
                let mut walker = SchemaWalker::with_options(&mut registry, target.walk_settings.into());
                let mut usages = IndexMap::<String, Value>::new();
                target.input_settings.load_process(|source, value| {
                    let descriptors = crate::path_de::one_or_many::<Descriptor>(value)
                        .map_err(|error| anyhow!("invalid descriptor in {source}: {error}"))?;
                    for descriptor in &descriptors {
                        let schema = walker
                            .schema_for(descriptor)
                            .with_context(|| format!("while walking `{}` from {source}", descriptor.serial_name))?;
                        usages.insert(canonical_serial_name(&descriptor.serial_name).to_owned(), schema.to_json());
                    }
                    Ok(())
                })?;

                let output = json!({
                    "schemas": usages,
                    "components": walker.registry().to_json(),
                });
                write_output(target.out.as_ref(), &serde_json::to_string_pretty(&output)?)
            }
            Command::Document(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let mut assembler = DocumentAssembler::new(target.walk_settings.into(), target.combine);
                target.input_settings.load_process(|source, value| {
                    let catalogs = crate::path_de::one_or_many::<Catalog>(value)
                        .map_err(|error| anyhow!("invalid catalog in {source}: {error}"))?;
                    for catalog in &catalogs {
                        assembler
                            .add_catalog(catalog)
                            .with_context(|| format!("while assembling catalog from {source}"))?;
                    }
                    Ok(())
                })?;

                let document = assembler.finish();
                write_output(target.out.as_ref(), &serde_json::to_string_pretty(&document)?)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&PathBuf>, src: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{src}");
            Ok(())
        }
    }
}

pub fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            // Treat as a glob pattern
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            // Treat as a literal path
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
