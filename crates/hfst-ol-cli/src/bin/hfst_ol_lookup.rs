// hfst-ol-lookup: Analyze words with an optimized-lookup transducer.
//
// Reads words from stdin (one per line) and prints every analysis with its
// weight, in hfst-lookup's tab-separated layout or as JSON lines.
//
// Usage:
//   hfst-ol-lookup [-m MODEL] [--json] [--] [WORD...]
//
// Options:
//   -m, --model PATH   Model file (default: $HFST_OL_MODEL)
//       --json         One JSON object per input line
//   -h, --help         Print help

use std::io::{self, BufRead, Write};

use hfst_ol::Transducer;
use hfst_ol_cli::LookupRecord;

fn main() {
    hfst_ol_cli::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (model, mut args) = hfst_ol_cli::parse_model_path(&args);

    if hfst_ol_cli::wants_help(&args) {
        println!("hfst-ol-lookup: Analyze words with an optimized-lookup transducer.");
        println!();
        println!("Usage: hfst-ol-lookup [-m MODEL] [--json] [--] [WORD...]");
        println!();
        println!("If WORD arguments are given, analyzes each word.");
        println!("Otherwise reads words from stdin (one per line).");
        println!("Words starting with '-' go after --.");
        println!();
        println!("Options:");
        println!("  -m, --model PATH   Model file (default: ${})", hfst_ol_cli::MODEL_ENV);
        println!("      --json         Print one JSON object per word");
        println!("  -h, --help         Print this help");
        return;
    }

    let json = hfst_ol_cli::take_switch(&mut args, "--json");
    let words = hfst_ol_cli::positional_words(&args).unwrap_or_else(|e| hfst_ol_cli::fatal(&e));

    let mut transducer =
        hfst_ol_cli::load_transducer(model.as_deref()).unwrap_or_else(|e| hfst_ol_cli::fatal(&e));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    let mut analyze_word = |word: &str, transducer: &mut Transducer| {
        let results = transducer.lookup(word);
        let written = if json {
            writeln!(out, "{}", LookupRecord::new(word, &results).to_json())
        } else {
            writeln!(out, "{}", hfst_ol_cli::format_tsv(word, &results))
        };
        if let Err(e) = written {
            hfst_ol_cli::fatal(&format!("error writing output: {e}"));
        }
    };

    if words.is_empty() {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("error reading stdin: {e}");
                    break;
                }
            };
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            analyze_word(word, &mut transducer);
        }
    } else {
        for word in &words {
            analyze_word(word, &mut transducer);
        }
    }

    if let Err(e) = out.flush() {
        hfst_ol_cli::fatal(&format!("error writing output: {e}"));
    }
}
