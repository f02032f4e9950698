// Model loading, lookup traversal, and batch lookup with caching.
// Origin: transducer.cc:196-213 (input tape), 279-333 (batch and single lookup),
// 335-467 (traversal), 469-517 (loading and writing)

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, debug_span, warn};

use crate::alphabet::Alphabet;
use crate::cache::ResultCache;
use crate::config::{LookupConfig, LookupOptions};
use crate::encoder::Encoder;
use crate::flags::FlagDiacriticState;
use crate::format::{self, ByteReader, TYPE_WEIGHTED, TransducerHeader, WrapperHeader};
use crate::tags::TagStripper;
use crate::transition::{TransitionTables, indexes_transition_table};
use crate::{
    CacheError, FormatError, LookupError, LookupResult, NO_SYMBOL, SymbolNumber,
    TRANSITION_TARGET_TABLE_START, TableIndex, Weight,
};

/// The immutable part of a loaded transducer.
///
/// Holds the header, alphabet, encoder and tables. Lookups borrow it
/// read-only, so one automaton can serve any number of threads as long as each
/// brings its own [`LookupConfig`].
pub struct Automaton {
    header: TransducerHeader,
    wrapper: Option<WrapperHeader>,
    alphabet: Alphabet,
    encoder: Encoder,
    tables: TransitionTables,
}

impl fmt::Debug for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Automaton")
            .field("weighted", &self.header.weighted)
            .field("symbol_count", &self.header.symbol_count)
            .field("input_symbol_count", &self.header.input_symbol_count)
            .field("index_table_size", &self.tables.index_count())
            .field("target_table_size", &self.tables.transition_count())
            .field("flag_features", &self.alphabet.feature_count())
            .finish()
    }
}

impl Automaton {
    /// Load an automaton from optimized-lookup binary data.
    ///
    /// A leading wrapper header is stripped if present. Bytes following the
    /// transition table are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let mut reader = ByteReader::new(data);
        let wrapper = format::skip_wrapper_header(&mut reader)?;
        let header = TransducerHeader::parse(&mut reader)?;
        let alphabet = Alphabet::parse(&mut reader, header.symbol_count)?;
        let tables = TransitionTables::parse(
            &mut reader,
            header.weighted,
            header.index_table_size,
            header.target_table_size,
        )?;

        if let Some(declared) = wrapper.as_ref().and_then(WrapperHeader::declared_type) {
            if (declared == TYPE_WEIGHTED) != header.weighted {
                warn!(
                    declared,
                    weighted = header.weighted,
                    "wrapper type disagrees with header; using header"
                );
            }
        }

        let encoder = Encoder::new(&alphabet, header.input_symbol_count);
        debug!(
            weighted = header.weighted,
            symbols = header.symbol_count,
            input_symbols = header.input_symbol_count,
            indices = header.index_table_size,
            transitions = header.target_table_size,
            flag_features = alphabet.feature_count(),
            trailing = reader.rest().len(),
            "loaded transducer"
        );

        Ok(Self {
            header,
            wrapper,
            alphabet,
            encoder,
            tables,
        })
    }

    pub fn header(&self) -> &TransducerHeader {
        &self.header
    }

    /// Metadata from the wrapper header, if the data carried one.
    pub fn wrapper(&self) -> Option<&WrapperHeader> {
        self.wrapper.as_ref()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn tables(&self) -> &TransitionTables {
        &self.tables
    }

    pub fn is_weighted(&self) -> bool {
        self.tables.is_weighted()
    }

    /// Scratch sized for this automaton.
    pub fn new_config(&self, options: &LookupOptions) -> LookupConfig {
        LookupConfig::new(
            self.alphabet.feature_count(),
            options.max_io_len,
            options.max_steps,
            options.max_depth,
        )
    }

    /// Serialize header, alphabet and both tables. The wrapper header is not
    /// written.
    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.header.write(out)?;
        self.alphabet.write(out)?;
        self.tables.write(out)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write(&mut out);
        out
    }

    /// Tokenize `text` and collect every accepting path into `config.results`.
    ///
    /// Analyses come out in traversal order. The flag vector in `config` is
    /// left as it was found.
    pub fn lookup_with<'c>(
        &self,
        config: &'c mut LookupConfig,
        text: &str,
    ) -> Result<&'c [LookupResult], LookupError> {
        config.reset();
        let symbols = self.encoder.tokenize(text, config.output_tape.len())?;
        config.input_tape.extend_from_slice(&symbols);

        let LookupConfig {
            input_tape,
            output_tape,
            flag_state,
            results,
            max_steps,
            max_depth,
            steps,
            truncated,
        } = &mut *config;

        let mut traversal = Traversal {
            tables: &self.tables,
            alphabet: &self.alphabet,
            input: input_tape,
            output: output_tape,
            results,
            steps: 0,
            max_steps: *max_steps,
            max_depth: *max_depth,
            truncated: false,
            depth_capped: false,
        };
        traversal.get_analyses(flag_state, 0, 0, 0, 0.0);
        *steps = traversal.steps;
        let (step_bound_hit, depth_capped) = (traversal.truncated, traversal.depth_capped);
        *truncated = step_bound_hit || depth_capped;

        if step_bound_hit {
            warn!(
                input = text,
                max_steps = config.max_steps,
                found = config.results.len(),
                "traversal step bound reached; analyses may be incomplete"
            );
        } else if depth_capped {
            warn!(
                input = text,
                max_depth = config.max_depth,
                found = config.results.len(),
                "traversal depth bound reached; deeper paths were pruned"
            );
        }
        Ok(&config.results)
    }
}

/// One lookup's view of the automaton and the scratch tapes.
///
/// Cursors and the running weight are passed by value, so unwinding a branch
/// needs no bookkeeping. Flag state is passed separately so that a
/// [`FlagGuard`](crate::flags::FlagGuard) can stand in for it.
struct Traversal<'a> {
    tables: &'a TransitionTables,
    alphabet: &'a Alphabet,
    input: &'a [SymbolNumber],
    output: &'a mut [SymbolNumber],
    results: &'a mut Vec<LookupResult>,
    steps: usize,
    max_steps: usize,
    max_depth: usize,
    /// Step bound hit: the whole search stops.
    truncated: bool,
    /// Depth bound hit on some branch: that branch was pruned.
    depth_capped: bool,
}

impl Traversal<'_> {
    #[inline]
    fn step(&mut self) -> bool {
        if self.steps >= self.max_steps {
            self.truncated = true;
            return false;
        }
        self.steps += 1;
        true
    }

    fn get_analyses(
        &mut self,
        flags: &mut FlagDiacriticState,
        i: TableIndex,
        input_pos: usize,
        output_pos: usize,
        weight: Weight,
    ) {
        if !self.step() {
            return;
        }

        if indexes_transition_table(i) {
            let i = i - TRANSITION_TARGET_TABLE_START;
            self.try_epsilon_transitions(flags, i + 1, input_pos, output_pos, weight);
            match self.input.get(input_pos) {
                None => {
                    if self.tables.transition_finality(i) {
                        self.note_analysis(output_pos, weight + self.tables.weight(i));
                    }
                }
                Some(&symbol) => {
                    self.scan_run(flags, symbol, i + 1, input_pos + 1, output_pos, weight);
                }
            }
        } else {
            self.try_epsilon_indices(flags, i + 1, input_pos, output_pos, weight);
            match self.input.get(input_pos) {
                None => {
                    if self.tables.index_finality(i) {
                        self.note_analysis(output_pos, weight + self.tables.final_weight(i));
                    }
                }
                Some(&symbol) => {
                    self.find_index(flags, symbol, i + 1, input_pos + 1, output_pos, weight);
                }
            }
        }
    }

    fn try_epsilon_indices(
        &mut self,
        flags: &mut FlagDiacriticState,
        i: TableIndex,
        input_pos: usize,
        output_pos: usize,
        weight: Weight,
    ) {
        if self.tables.index_input(i) == 0 {
            let target = self.tables.index_target(i);
            self.try_epsilon_transitions(
                flags,
                target.wrapping_sub(TRANSITION_TARGET_TABLE_START),
                input_pos,
                output_pos,
                weight,
            );
        }
    }

    /// Follow the run of epsilon and flag transitions starting at `i`.
    fn try_epsilon_transitions(
        &mut self,
        flags: &mut FlagDiacriticState,
        mut i: TableIndex,
        input_pos: usize,
        output_pos: usize,
        weight: Weight,
    ) {
        loop {
            let input = self.tables.transition_input(i);
            if input == 0 {
                self.take_transition(flags, i, input_pos, output_pos, weight);
            } else if let Some(&op) = self.alphabet.operation(input) {
                let mut guard = flags.speculate(op.feature);
                if guard.apply_operation(&op) {
                    self.take_transition(&mut guard, i, input_pos, output_pos, weight);
                }
            } else {
                return;
            }
            if self.truncated {
                return;
            }
            i += 1;
        }
    }

    fn find_index(
        &mut self,
        flags: &mut FlagDiacriticState,
        symbol: SymbolNumber,
        i: TableIndex,
        input_pos: usize,
        output_pos: usize,
        weight: Weight,
    ) {
        let slot = i + TableIndex::from(symbol);
        if self.tables.index_input(slot) == symbol {
            let target = self.tables.index_target(slot);
            self.find_transitions(
                flags,
                symbol,
                target.wrapping_sub(TRANSITION_TARGET_TABLE_START),
                input_pos,
                output_pos,
                weight,
            );
        }
    }

    /// Follow the contiguous block of transitions on `symbol` starting at `i`.
    fn find_transitions(
        &mut self,
        flags: &mut FlagDiacriticState,
        symbol: SymbolNumber,
        mut i: TableIndex,
        input_pos: usize,
        output_pos: usize,
        weight: Weight,
    ) {
        while self.tables.transition_input(i) == symbol {
            self.take_transition(flags, i, input_pos, output_pos, weight);
            if self.truncated {
                return;
            }
            i += 1;
        }
    }

    /// Follow every transition on `symbol` in the state run starting at `i`.
    /// The run ends at the next record without an input symbol.
    fn scan_run(
        &mut self,
        flags: &mut FlagDiacriticState,
        symbol: SymbolNumber,
        mut i: TableIndex,
        input_pos: usize,
        output_pos: usize,
        weight: Weight,
    ) {
        loop {
            let input = self.tables.transition_input(i);
            if input == NO_SYMBOL {
                return;
            }
            if input == symbol {
                self.take_transition(flags, i, input_pos, output_pos, weight);
                if self.truncated {
                    return;
                }
            }
            i += 1;
        }
    }

    #[inline]
    fn take_transition(
        &mut self,
        flags: &mut FlagDiacriticState,
        i: TableIndex,
        input_pos: usize,
        output_pos: usize,
        weight: Weight,
    ) {
        // Output tape full: prune.
        if output_pos >= self.output.len() {
            return;
        }
        // One recursion level per transition, so the output position is the
        // path depth.
        if output_pos >= self.max_depth {
            self.depth_capped = true;
            return;
        }
        self.output[output_pos] = self.tables.transition_output(i);
        self.get_analyses(
            flags,
            self.tables.transition_target(i),
            input_pos,
            output_pos + 1,
            weight + self.tables.weight(i),
        );
    }

    fn note_analysis(&mut self, output_pos: usize, weight: Weight) {
        let analysis: String = self.output[..output_pos]
            .iter()
            .filter(|&&symbol| symbol != 0)
            .map(|&symbol| self.alphabet.string_from_symbol(symbol))
            .collect();
        self.results.push(LookupResult::new(analysis, weight));
    }
}

/// A loaded transducer with its own lookup scratch and result cache.
///
/// The automaton is shared through an [`Arc`]; [`worker`](Self::worker)
/// makes a sibling for another thread. A single instance must not serve two
/// lookups at once, which `&mut self` already enforces.
pub struct Transducer {
    automaton: Arc<Automaton>,
    config: LookupConfig,
    cache: ResultCache,
    tags: TagStripper,
    options: LookupOptions,
    traversals: u64,
}

impl fmt::Debug for Transducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transducer")
            .field("automaton", &self.automaton)
            .field("cached", &self.cache.len())
            .field("traversals", &self.traversals)
            .field("options", &self.options)
            .finish()
    }
}

impl Transducer {
    pub fn new(automaton: Arc<Automaton>, options: LookupOptions) -> Self {
        let config = automaton.new_config(&options);
        Self {
            automaton,
            config,
            cache: ResultCache::with_capacity(options.cache_capacity),
            tags: TagStripper::default(),
            options,
            traversals: 0,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let automaton = Automaton::from_bytes(data)?;
        Ok(Self::new(Arc::new(automaton), LookupOptions::default()))
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, FormatError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        debug!(path = %path.display(), bytes = data.len(), "read transducer file");
        Self::from_bytes(&data)
    }

    /// Replace the options, resizing the scratch. The cache is kept.
    pub fn with_options(mut self, options: LookupOptions) -> Self {
        self.config = self.automaton.new_config(&options);
        self.options = options;
        self
    }

    pub fn with_tag_stripper(mut self, tags: TagStripper) -> Self {
        self.tags = tags;
        self
    }

    /// A sibling sharing this automaton, with fresh scratch and an empty
    /// cache.
    pub fn worker(&self) -> Self {
        Self::new(Arc::clone(&self.automaton), self.options.clone())
            .with_tag_stripper(self.tags.clone())
    }

    pub fn automaton(&self) -> &Arc<Automaton> {
        &self.automaton
    }

    pub fn alphabet(&self) -> &Alphabet {
        self.automaton.alphabet()
    }

    pub fn options(&self) -> &LookupOptions {
        &self.options
    }

    pub fn flag_state(&self) -> &FlagDiacriticState {
        &self.config.flag_state
    }

    /// Traversal steps taken by the most recent lookup.
    pub fn last_steps(&self) -> usize {
        self.config.steps
    }

    /// Whether the most recent lookup stopped at the step bound.
    pub fn last_truncated(&self) -> bool {
        self.config.truncated
    }

    /// Number of traversals run so far. Cache hits and untokenizable input
    /// do not count.
    pub fn traversal_count(&self) -> u64 {
        self.traversals
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }

    /// Like [`lookup`](Self::lookup), but reports input that never reached
    /// the traversal.
    pub fn try_lookup(&mut self, text: &str) -> Result<Vec<LookupResult>, LookupError> {
        let _span = debug_span!("lookup", input = text).entered();
        let results = self.automaton.lookup_with(&mut self.config, text)?.to_vec();
        self.traversals += 1;
        debug!(
            results = results.len(),
            steps = self.config.steps,
            "lookup finished"
        );
        Ok(results)
    }

    /// All analyses of `text` with their weights, in traversal order.
    ///
    /// Untokenizable input and input with no accepting path both give an
    /// empty vector.
    pub fn lookup(&mut self, text: &str) -> Vec<LookupResult> {
        self.try_lookup(text).unwrap_or_else(|err| {
            debug!(%err, "lookup skipped");
            Vec::new()
        })
    }

    /// Resolve every token to one canonical analysis and strip its tags.
    ///
    /// A token's canonical analysis is the last one traversal produced, and
    /// is cached unless the lookup hit a traversal bound. Tokens without analyses pass through unchanged and are not
    /// cached. Results shorter than two characters after stripping are
    /// dropped, so the output can be shorter than `tokens`.
    pub fn multi_lookup<S: AsRef<str>>(&mut self, tokens: &[S]) -> Vec<String> {
        let _span = debug_span!("multi_lookup", tokens = tokens.len()).entered();
        let mut resolved = Vec::with_capacity(tokens.len());
        let mut hits = 0usize;

        for token in tokens {
            let token = token.as_ref();
            if let Some(cached) = self.cache.get(token) {
                hits += 1;
                resolved.push(cached.to_string());
                continue;
            }
            match self.lookup(token).pop() {
                Some(last) => {
                    // A bounded search may not have reached the real last
                    // analysis; use it for this batch only.
                    if !self.config.truncated {
                        self.cache.insert(token, last.analysis.as_str());
                    }
                    resolved.push(last.analysis);
                }
                None => resolved.push(token.to_string()),
            }
        }

        debug!(
            hits,
            misses = tokens.len() - hits,
            cached = self.cache.len(),
            "batch resolved"
        );
        self.tags.postprocess(resolved)
    }

    /// Write the cache to the configured cache path.
    pub fn write_lookup_cache(&self) -> Result<(), CacheError> {
        self.cache.write_to(&self.options.cache_path)
    }

    pub fn write_lookup_cache_to(&self, path: impl AsRef<Path>) -> Result<(), CacheError> {
        self.cache.write_to(path.as_ref())
    }

    /// Merge entries from a file written by
    /// [`write_lookup_cache`](Self::write_lookup_cache). Returns how many
    /// entries the file held.
    pub fn read_lookup_cache(&mut self, path: impl AsRef<Path>) -> Result<usize, CacheError> {
        let loaded = ResultCache::read_from(path.as_ref())?;
        let count = loaded.len();
        self.cache.extend(loaded);
        Ok(count)
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.automaton.write(out)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.automaton.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_TRAVERSAL_DEPTH;
    use crate::testutil::{ModelBuilder, noun_model};

    fn analyses(results: &[LookupResult]) -> Vec<(&str, Weight)> {
        results
            .iter()
            .map(|r| (r.analysis.as_str(), r.weight))
            .collect()
    }

    fn load(builder: &ModelBuilder) -> Transducer {
        Transducer::from_bytes(&builder.build()).unwrap()
    }

    #[test]
    fn automaton_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Automaton>();
        assert_send_sync::<Arc<Automaton>>();
        fn assert_send<T: Send>() {}
        assert_send::<Transducer>();
    }

    #[test]
    fn lookup_weighted_nouns() {
        let mut t = load(&noun_model());
        assert!(t.automaton().is_weighted());
        assert_eq!(analyses(&t.lookup("talo")), vec![("talo<N><Sg>", 1.0)]);
        assert_eq!(analyses(&t.lookup("talot")), vec![("talo<N><Pl>", 2.5)]);
        assert_eq!(
            analyses(&t.lookup("tuo")),
            vec![("tuo<Pron><Dem>", 0.5), ("tuoda<V><Imp>", 3.0)]
        );
        assert_eq!(analyses(&t.lookup("a")), vec![("a<Punct>", 0.0)]);
    }

    #[test]
    fn lookup_misses() {
        let mut t = load(&noun_model());
        assert!(t.lookup("tal").is_empty());
        assert!(t.lookup("").is_empty());
        assert!(t.lookup("talox").is_empty());
        assert_eq!(
            t.try_lookup("talox"),
            Err(LookupError::Untokenizable { offset: 4 })
        );
        assert_eq!(t.try_lookup("tal"), Ok(Vec::new()));
    }

    #[test]
    fn unweighted_model_has_zero_weights() {
        let symbols = ["", "a", "b", "X"];
        let mut b = ModelBuilder::new(&symbols, 3);
        let s1 = b.state();
        let s2 = b.state();
        b.arc(0, "a", "a", s1, 0.0);
        b.arc(s1, "b", "X", s2, 0.0);
        b.set_final(s2, 7.0);
        let mut t = load(&b);
        assert!(!t.automaton().is_weighted());
        assert_eq!(analyses(&t.lookup("ab")), vec![("aX", 0.0)]);
    }

    #[test]
    fn index_state_branches_in_order() {
        let symbols = ["", "a", "b", "X", "Y"];
        let mut b = ModelBuilder::new(&symbols, 3).weighted();
        let d1 = b.dense_state();
        let s2 = b.state();
        let s3 = b.state();
        b.arc(0, "a", "a", d1, 0.5);
        b.arc(d1, "b", "X", s2, 1.0);
        b.arc(d1, "b", "Y", s3, 2.0);
        b.set_final(s2, 0.0);
        b.set_final(s3, 0.25);
        b.set_final(d1, 3.0);
        let mut t = load(&b);
        assert_eq!(analyses(&t.lookup("ab")), vec![("aX", 1.5), ("aY", 2.75)]);
        assert_eq!(analyses(&t.lookup("a")), vec![("a", 3.5)]);
    }

    #[test]
    fn flag_diacritics_constrain_paths() {
        let symbols = ["", "a", "@P.CASE.UP@", "@P.CASE.LOW@", "@R.CASE.UP@", "@R.CASE.LOW@", "U", "L"];
        let mut b = ModelBuilder::new(&symbols, 6);
        let s1 = b.state();
        let s2 = b.state();
        let up = b.state();
        let low = b.state();
        b.arc(0, "@P.CASE.UP@", "", s1, 0.0);
        b.arc(0, "@P.CASE.LOW@", "", s1, 0.0);
        b.arc(s1, "a", "a", s2, 0.0);
        b.arc(s2, "@R.CASE.UP@", "U", up, 0.0);
        b.arc(s2, "@R.CASE.LOW@", "L", low, 0.0);
        b.set_final(up, 0.0);
        b.set_final(low, 0.0);
        let mut t = load(&b);
        assert_eq!(t.alphabet().feature_count(), 1);

        let results = t.lookup("a");
        assert_eq!(analyses(&results), vec![("aU", 0.0), ("aL", 0.0)]);
        assert_eq!(t.flag_state().values(), &[0]);
    }

    #[test]
    fn flag_output_symbol_is_decoded() {
        let symbols = ["", "a", "@P.X.ON@"];
        let mut b = ModelBuilder::new(&symbols, 3);
        let s1 = b.state();
        let s2 = b.state();
        b.arc(0, "a", "a", s1, 0.0);
        b.arc(s1, "@P.X.ON@", "@P.X.ON@", s2, 0.0);
        b.set_final(s2, 0.0);
        let mut t = load(&b);
        assert_eq!(analyses(&t.lookup("a")), vec![("a@P.X.ON@", 0.0)]);
    }

    #[test]
    fn epsilon_cycle_is_bounded_by_output_tape() {
        let symbols = ["", "a"];
        let mut b = ModelBuilder::new(&symbols, 2);
        b.arc(0, "", "a", 0, 0.0);
        b.set_final(0, 0.0);
        let mut t = load(&b).with_options(LookupOptions::default().with_max_io_len(16));

        let results = t.lookup("");
        assert_eq!(results.len(), 17);
        assert_eq!(results[0].analysis, "a".repeat(16));
        assert_eq!(results.last().map(|r| r.analysis.as_str()), Some(""));
        assert!(!t.last_truncated());
        assert_eq!(t.last_steps(), 17);
    }

    #[test]
    fn branching_cycle_hits_step_bound() {
        let symbols = ["", "a", "b"];
        let mut b = ModelBuilder::new(&symbols, 2);
        b.arc(0, "", "a", 0, 0.0);
        b.arc(0, "", "b", 0, 0.0);
        b.set_final(0, 0.0);
        let options = LookupOptions::default()
            .with_max_io_len(64)
            .with_max_steps(1000);
        let mut t = load(&b).with_options(options);

        let results = t.lookup("");
        assert!(t.last_truncated());
        assert_eq!(t.last_steps(), 1000);
        assert!(!results.is_empty());

        // The next lookup starts from a clean slate.
        t.lookup("x");
        assert!(!t.last_truncated());
    }

    #[test]
    fn epsilon_cycle_with_default_options_stops_at_depth_bound() {
        let symbols = ["", "a", "x"];
        let mut b = ModelBuilder::new(&symbols, 2);
        let s1 = b.state();
        b.arc(0, "a", "a", s1, 0.0);
        b.arc(s1, "", "x", s1, 0.0);
        b.set_final(s1, 0.0);
        let mut t = load(&b);

        let handle = std::thread::spawn(move || {
            let results = t.lookup("a");
            (results, t.last_truncated(), t.flag_state().values().to_vec())
        });
        let (results, truncated, flags) = handle.join().unwrap();
        assert_eq!(results.len(), MAX_TRAVERSAL_DEPTH);
        assert_eq!(
            results[0].analysis,
            format!("a{}", "x".repeat(MAX_TRAVERSAL_DEPTH - 1))
        );
        assert_eq!(results.last().map(|r| r.analysis.as_str()), Some("a"));
        assert!(truncated);
        assert!(flags.is_empty());
    }

    #[test]
    fn depth_bound_prunes_without_stopping_siblings() {
        // Two epsilon loops on the same state: the first is pruned at the
        // depth bound and the second is still explored.
        let symbols = ["", "a", "b"];
        let mut b = ModelBuilder::new(&symbols, 1).weighted();
        let s1 = b.state();
        let s2 = b.state();
        b.arc(0, "", "a", s1, 0.0);
        b.arc(0, "", "b", s2, 0.0);
        b.arc(s1, "", "a", s1, 0.0);
        b.set_final(s2, 1.0);
        let mut t = load(&b).with_options(LookupOptions::default().with_max_depth(8));

        assert_eq!(analyses(&t.lookup("")), vec![("b", 1.0)]);
        assert!(t.last_truncated());
    }

    #[test]
    fn input_longer_than_tape() {
        let mut t = load(&noun_model()).with_options(LookupOptions::default().with_max_io_len(3));
        assert_eq!(
            t.try_lookup("talo"),
            Err(LookupError::InputTooLong { limit: 3 })
        );
        assert_eq!(t.traversal_count(), 0);
    }

    #[test]
    fn multi_lookup_resolves_caches_and_strips() {
        let mut t = load(&noun_model());
        let out = t.multi_lookup(&["talo", "talot", "zzz", "talo"]);
        assert_eq!(out, vec!["talo", "talo", "zzz", "talo"]);
        assert_eq!(t.cache().get("talo"), Some("talo<N><Sg>"));
        assert!(!t.cache().contains("zzz"));
        assert_eq!(t.traversal_count(), 2);
    }

    #[test]
    fn multi_lookup_picks_last_analysis_not_lightest() {
        // tuo<Pron><Dem> weighs 0.5, tuoda<V><Imp> weighs 3.0. The batch path
        // keeps whichever analysis traversal emitted last.
        let mut t = load(&noun_model());
        assert_eq!(t.multi_lookup(&["tuo"]), vec!["tuoda"]);
        assert_eq!(t.cache().get("tuo"), Some("tuoda<V><Imp>"));
    }

    #[test]
    fn multi_lookup_does_not_cache_bounded_search() {
        let symbols = ["", "a", "x"];
        let mut b = ModelBuilder::new(&symbols, 2);
        let s1 = b.state();
        b.arc(0, "a", "a", s1, 0.0);
        b.arc(s1, "", "x", s1, 0.0);
        b.set_final(s1, 0.0);
        let mut t = load(&b).with_options(LookupOptions::default().with_max_depth(4));

        assert_eq!(t.multi_lookup(&["a", "a"]), Vec::<String>::new());
        assert!(t.cache().is_empty());
        assert_eq!(t.traversal_count(), 2);
    }

    #[test]
    fn worker_shares_automaton_with_fresh_state() {
        let mut t = load(&noun_model());
        t.multi_lookup(&["talo"]);
        let mut w = t.worker();
        assert!(Arc::ptr_eq(t.automaton(), w.automaton()));
        assert!(w.cache().is_empty());
        assert_eq!(w.traversal_count(), 0);
        assert_eq!(w.lookup("talo"), t.lookup("talo"));
    }

    #[test]
    fn worker_runs_on_another_thread() {
        let t = load(&noun_model());
        let mut w = t.worker();
        let handle = std::thread::spawn(move || w.lookup("talot"));
        let results = handle.join().unwrap();
        assert_eq!(analyses(&results), vec![("talo<N><Pl>", 2.5)]);
    }

    #[test]
    fn to_bytes_matches_input_without_wrapper() {
        let bytes = noun_model().build();
        let t = Transducer::from_bytes(&bytes).unwrap();
        assert_eq!(t.to_bytes(), bytes);
    }

    #[test]
    fn wrapper_header_is_stripped_and_kept() {
        let plain = noun_model().build();
        let wrapped = noun_model()
            .with_wrapper(b"version\x003.3\x00type\x00HFST_OLW\x00")
            .build();
        let mut t = Transducer::from_bytes(&wrapped).unwrap();
        let wrapper = t.automaton().wrapper().unwrap();
        assert_eq!(wrapper.declared_type(), Some("HFST_OLW"));
        assert_eq!(wrapper.get("version"), Some("3.3"));
        assert_eq!(t.to_bytes(), plain);
        assert_eq!(analyses(&t.lookup("a")), vec![("a<Punct>", 0.0)]);
    }

    #[test]
    fn mismatched_declared_type_still_loads() {
        let wrapped = noun_model().with_wrapper(b"type\x00HFST_OL\x00").build();
        let t = Transducer::from_bytes(&wrapped).unwrap();
        assert!(t.automaton().is_weighted());
    }

    #[test]
    fn foreign_wrapper_type_is_rejected() {
        let wrapped = noun_model().with_wrapper(b"type\x00TROPICAL_OPENFST\x00").build();
        let err = Transducer::from_bytes(&wrapped).unwrap_err();
        assert!(matches!(err, FormatError::WrongType(_)));
    }

    #[test]
    fn from_reader_and_file() {
        let bytes = noun_model().build();
        let mut t = Transducer::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(t.lookup("talo").len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nouns.hfstol");
        std::fs::write(&path, &bytes).unwrap();
        let mut t = Transducer::from_file(&path).unwrap();
        assert_eq!(t.lookup("talo").len(), 1);

        let err = Transducer::from_file(dir.path().join("missing.hfstol")).unwrap_err();
        assert!(matches!(err, FormatError::Io(_)));
    }

    #[test]
    fn cache_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.ssv");
        let mut t = load(&noun_model())
            .with_options(LookupOptions::default().with_cache_path(&path));
        t.multi_lookup(&["talot", "talo"]);
        t.write_lookup_cache().unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "talo talo<N><Sg>\ntalot talo<N><Pl>\n"
        );

        let mut fresh = t.worker();
        assert_eq!(fresh.read_lookup_cache(&path).unwrap(), 2);
        assert_eq!(fresh.multi_lookup(&["talot"]), vec!["talo"]);
        assert_eq!(fresh.traversal_count(), 0);
    }

    #[test]
    fn debug_output_is_compact() {
        let t = load(&noun_model());
        let text = format!("{:?}", t.automaton());
        assert!(text.contains("weighted: true"));
        assert!(text.contains("symbol_count: 15"));
    }
}
