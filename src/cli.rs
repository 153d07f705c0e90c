//! Minimal CLI: decode samples → infer → (descriptor | stats) as JSON
use std::path::{Path, PathBuf};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::inference::{self, Stats};
use crate::lower::{self, LowerOptions, OmitEmpty};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// infer a structural type descriptor from JSON/NDJSON samples
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    /// more logging (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// infer and print the type descriptor with its required capabilities
    Infer(InferOut),
    /// print the raw aggregated statistics (debug view)
    Stats(StatsOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// aggregate documents on all cores and merge the results
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct LowerSettings {
    /// collapse objects with keys that cannot be identifiers into maps
    #[arg(long, default_value_t = false)]
    map_fallback: bool,

    /// how object fields report optionality
    #[arg(long, value_enum, default_value_t = OmitEmpty::Auto)]
    omit_empty: OmitEmpty,
}

#[derive(clap::Parser, Debug)]
struct InferOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    lower_settings: LowerSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct StatsOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        for source_path in resolve_file_path_patterns(&self.input)? {
            let documents = read_documents(&source_path, self.ndjson)?;
            tracing::info!(path = %source_path.display(), documents = documents.len(), "loaded");
            match self.json_pointer.as_deref() {
                None => out.extend(documents),
                Some(pointer) => out.extend(select_pointer(documents, pointer, &source_path)),
            }
        }
        Ok(out)
    }

    fn aggregate(&self) -> Result<Stats> {
        let values = self.load()?;
        let stats = if self.parallel {
            inference::par_infer_from_values(&values)
        } else {
            inference::infer_from_values(&values)
        };
        Ok(stats)
    }
}

impl From<&LowerSettings> for LowerOptions {
    fn from(settings: &LowerSettings) -> Self {
        LowerOptions { map_fallback: settings.map_fallback, omit_empty: settings.omit_empty }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> u8 {
        self.verbose
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Infer(target) => {
                let stats = target.input_settings.aggregate()?;
                let lowered = lower::lower(&stats, 0, &LowerOptions::from(&target.lower_settings));
                write_json(&lowered, target.out.as_deref())
            }
            Command::Stats(target) => {
                let stats = target.input_settings.aggregate()?;
                write_json(&stats, target.out.as_deref())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Decode one file into documents: the whole file, or one per non-blank line
/// when `ndjson` is set.
pub fn read_documents(path: &Path, ndjson: bool) -> Result<Vec<Value>> {
    let source = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if !ndjson {
        let value = serde_json::from_str(&source).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            line: source.line(),
            column: source.column(),
            source,
        })?;
        return Ok(vec![value]);
    }
    let mut out = Vec::new();
    for (index, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(line).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            column: source.column(),
            source,
        })?;
        out.push(value);
    }
    Ok(out)
}

/// Replace each document with its subnode at `pointer`; documents without it
/// are dropped.
pub fn select_pointer(documents: Vec<Value>, pointer: &str, path: &Path) -> Vec<Value> {
    let mut out = Vec::with_capacity(documents.len());
    for (index, mut document) in documents.into_iter().enumerate() {
        match document.pointer_mut(pointer) {
            Some(node) => out.push(node.take()),
            None => tracing::warn!(
                path = %path.display(),
                document = index,
                pointer,
                "JSON pointer not found, skipping document"
            ),
        }
    }
    out
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    let Some(out) = out else {
        println!("{rendered}");
        return Ok(());
    };
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(out, rendered).map_err(|source| Error::Write {
        path: out.to_path_buf(),
        source,
    })
}

pub fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let entries = glob::glob(pattern).map_err(|source| Error::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
            let before = out.len();
            for entry in entries {
                out.push(entry?);
            }
            if out.len() == before {
                return Err(Error::NoMatches(pattern.to_string()));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
