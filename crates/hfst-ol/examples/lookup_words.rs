// Quick check: load an optimized-lookup model and print analyses for a few
// words, or for the words given after the model path.
//
//   cargo run -p hfst-ol --example lookup_words -- analyser.hfstol talo koira
use hfst_ol::Transducer;

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(model_path) = args.next() else {
        eprintln!("usage: lookup_words MODEL [WORD...]");
        std::process::exit(2);
    };

    let mut t = Transducer::from_file(&model_path).expect("failed to load model");
    let automaton = t.automaton();
    println!(
        "Loaded {model_path}: weighted={}, symbols={}, input symbols={}, flag features={}",
        automaton.is_weighted(),
        automaton.alphabet().symbol_count(),
        automaton.header().input_symbol_count,
        automaton.alphabet().feature_count(),
    );

    let mut words: Vec<String> = args.collect();
    if words.is_empty() {
        words = ["talo", "koira", "kissa", "juoksen", "asdfxyz"]
            .iter()
            .map(|w| w.to_string())
            .collect();
    }

    for word in &words {
        match t.try_lookup(word) {
            Err(err) => println!("\n{word:15} → ({err})"),
            Ok(results) if results.is_empty() => println!("\n{word:15} → (no match)"),
            Ok(results) => {
                println!("\n{word:15} → {} analyses", results.len());
                for (i, r) in results.iter().enumerate().take(5) {
                    println!("  [{i}] {}\t{}", r.analysis, r.weight);
                }
                if results.len() > 5 {
                    println!("  ... ({} more)", results.len() - 5);
                }
            }
        }
    }

    println!("\nBatch: {:?}", t.multi_lookup(&words));
}
