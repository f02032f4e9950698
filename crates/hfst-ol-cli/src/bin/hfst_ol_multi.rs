// hfst-ol-multi: Batch lemmatization of whitespace-separated text.
//
// Reads text from stdin, splits each line on whitespace and resolves every
// token to its tag-stripped canonical analysis. Tokens without an analysis
// are echoed; results shorter than two characters are dropped.
//
// Usage:
//   hfst-ol-multi [-m MODEL] [-c CACHE] [--write-cache]
//
// Options:
//   -m, --model PATH   Model file (default: $HFST_OL_MODEL)
//   -c, --cache PATH   Cache file to preload and to write
//                      (default: hfst_lookup_cache.ssv)
//       --write-cache  Write the cache when input ends
//   -h, --help         Print help

use std::io::{self, BufRead, Write};

use tracing::info;

fn main() {
    hfst_ol_cli::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (model, args) = hfst_ol_cli::parse_model_path(&args);
    let (cache_path, mut args) = hfst_ol_cli::parse_value_option(&args, "--cache", "-c");

    if hfst_ol_cli::wants_help(&args) {
        println!("hfst-ol-multi: Batch lemmatization of whitespace-separated text.");
        println!();
        println!("Usage: hfst-ol-multi [-m MODEL] [-c CACHE] [--write-cache] < text");
        println!();
        println!("Prints one line of lemmas per input line.");
        println!();
        println!("Options:");
        println!("  -m, --model PATH   Model file (default: ${})", hfst_ol_cli::MODEL_ENV);
        println!("  -c, --cache PATH   Cache file to preload and to write");
        println!("                     (default: hfst_lookup_cache.ssv)");
        println!("      --write-cache  Write the cache when input ends");
        println!("  -h, --help         Print this help");
        return;
    }

    let write_cache = hfst_ol_cli::take_switch(&mut args, "--write-cache");
    if let Some(unknown) = args.first() {
        hfst_ol_cli::fatal(&format!("unexpected argument: {unknown}"));
    }

    let transducer =
        hfst_ol_cli::load_transducer(model.as_deref()).unwrap_or_else(|e| hfst_ol_cli::fatal(&e));
    let mut options = transducer.options().clone();
    if let Some(path) = &cache_path {
        options = options.with_cache_path(path);
    }
    let mut transducer = transducer.with_options(options);

    if cache_path.is_some() && transducer.options().cache_path.is_file() {
        let path = transducer.options().cache_path.clone();
        match transducer.read_lookup_cache(&path) {
            Ok(entries) => info!(entries, path = %path.display(), "preloaded cache"),
            Err(e) => hfst_ol_cli::fatal(&format!("failed to read cache {}: {e}", path.display())),
        }
    }

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error reading stdin: {e}");
                break;
            }
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let lemmas = transducer.multi_lookup(&tokens);
        if let Err(e) = writeln!(out, "{}", lemmas.join(" ")) {
            hfst_ol_cli::fatal(&format!("error writing output: {e}"));
        }
    }

    if let Err(e) = out.flush() {
        hfst_ol_cli::fatal(&format!("error writing output: {e}"));
    }

    if write_cache {
        if let Err(e) = transducer.write_lookup_cache() {
            hfst_ol_cli::fatal(&format!("failed to write cache: {e}"));
        }
        info!(
            entries = transducer.cache().len(),
            path = %transducer.options().cache_path.display(),
            "wrote cache"
        );
    }
}
