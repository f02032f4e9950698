// hfst-ol-cli: shared utilities for CLI tools.

use std::path::PathBuf;
use std::process;

use hfst_ol::{LookupResult, Transducer};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the model file when `-m` is not given.
pub const MODEL_ENV: &str = "HFST_OL_MODEL";

/// Install a stderr log subscriber. `RUST_LOG` overrides the default `warn`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

/// Resolve the model path.
///
/// Search order:
/// 1. `model` argument (if provided)
/// 2. `HFST_OL_MODEL` environment variable
pub fn resolve_model_path(model: Option<&str>) -> Result<PathBuf, String> {
    let path = match model {
        Some(p) => PathBuf::from(p),
        None => match std::env::var(MODEL_ENV) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => {
                return Err(format!(
                    "no model given: pass -m PATH or set {MODEL_ENV}"
                ));
            }
        },
    };
    if !path.is_file() {
        return Err(format!("model file not found: {}", path.display()));
    }
    Ok(path)
}

/// Resolve and load the model.
pub fn load_transducer(model: Option<&str>) -> Result<Transducer, String> {
    let path = resolve_model_path(model)?;
    debug!(path = %path.display(), "loading model");
    Transducer::from_file(&path).map_err(|e| format!("failed to load {}: {e}", path.display()))
}

/// Parse a `--NAME=VALUE`, `--NAME VALUE` or `-S VALUE` option.
///
/// Returns `(value, remaining_args)`. The last occurrence wins.
pub fn parse_value_option(
    args: &[String],
    long: &str,
    short: &str,
) -> (Option<String>, Vec<String>) {
    let long_eq = format!("{long}=");
    let mut value = None;
    let mut remaining = Vec::new();
    let mut skip_next = false;

    for (i, arg) in args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if let Some(val) = arg.strip_prefix(&long_eq) {
            value = Some(val.to_string());
        } else if arg == long || arg == short {
            if i + 1 < args.len() {
                value = Some(args[i + 1].clone());
                skip_next = true;
            } else {
                eprintln!("error: {arg} requires a value");
                process::exit(1);
            }
        } else {
            remaining.push(arg.clone());
        }
    }

    (value, remaining)
}

/// Parse a `--model=PATH`, `--model PATH` or `-m PATH` argument.
pub fn parse_model_path(args: &[String]) -> (Option<String>, Vec<String>) {
    parse_value_option(args, "--model", "-m")
}

/// Remove every occurrence of a boolean switch. Returns whether it was present.
pub fn take_switch(args: &mut Vec<String>, switch: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != switch);
    args.len() != before
}

/// Collect positional words from the arguments left after option parsing.
///
/// Everything after `--` is a word. Before it, an argument starting with `-`
/// is an unknown option and is reported instead of being dropped.
pub fn positional_words(args: &[String]) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            words.extend(iter.cloned());
            break;
        }
        if arg.len() > 1 && arg.starts_with('-') {
            return Err(format!(
                "unknown option: {arg} (put words starting with '-' after --)"
            ));
        }
        words.push(arg.clone());
    }
    Ok(words)
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}

/// One analysis in JSON output.
#[derive(Debug, Serialize)]
pub struct AnalysisRecord<'a> {
    pub analysis: &'a str,
    pub weight: f32,
}

/// All analyses of one input in JSON output.
#[derive(Debug, Serialize)]
pub struct LookupRecord<'a> {
    pub input: &'a str,
    pub analyses: Vec<AnalysisRecord<'a>>,
}

impl<'a> LookupRecord<'a> {
    pub fn new(input: &'a str, results: &'a [LookupResult]) -> Self {
        Self {
            input,
            analyses: results
                .iter()
                .map(|r| AnalysisRecord {
                    analysis: &r.analysis,
                    weight: r.weight,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> String {
        // Plain strings and floats always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Format results the way `hfst-lookup` does: one `input<TAB>analysis<TAB>weight`
/// line per analysis, or `input<TAB>input+?<TAB>inf` when there is none.
pub fn format_tsv(input: &str, results: &[LookupResult]) -> String {
    if results.is_empty() {
        return format!("{input}\t{input}+?\tinf\n");
    }
    results
        .iter()
        .map(|r| format!("{input}\t{}\t{}\n", r.analysis, r.weight))
        .collect()
}
