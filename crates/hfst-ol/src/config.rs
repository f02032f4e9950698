// Lookup limits, options, and per-instance traversal scratch.
// Origin: transducer.cc:469-487 (tape and flag state setup)

use std::path::PathBuf;

use crate::flags::FlagDiacriticState;
use crate::{LookupResult, SymbolNumber};

/// Capacity of the input and output tapes, in symbols.
pub const MAX_IO_LEN: usize = 5000;

/// Upper bound on traversal steps per lookup. Guards against epsilon or flag
/// cycles in automata not known to be acyclic on those transitions.
pub const MAX_TRAVERSAL_STEPS: usize = 1_000_000;

/// Deepest path, in transitions, a lookup follows before pruning the branch.
/// Traversal recurses once per transition, so this bounds stack use; the
/// default fits a 2 MiB thread stack in unoptimized builds.
pub const MAX_TRAVERSAL_DEPTH: usize = 512;

/// File written by [`Transducer::write_lookup_cache`](crate::Transducer::write_lookup_cache).
pub const DEFAULT_CACHE_FILE: &str = "hfst_lookup_cache.ssv";

/// Initial capacity reserved for the lookup cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256_000;

/// Tags removed from analyses by batch lookup: `@...@` flags, `<...>` tags,
/// `+`/`#` compound markers and `[...]` groups.
pub const TAG_PATTERN: &str = r"@[^@]*@|<[^>]*>|[+#]|\[[^\]]*\]";

/// Post-processed strings shorter than this many characters are dropped.
pub const MIN_OUTPUT_CHARS: usize = 2;

/// Tunable limits and paths for a [`Transducer`](crate::Transducer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOptions {
    pub max_io_len: usize,
    pub max_steps: usize,
    pub max_depth: usize,
    pub cache_path: PathBuf,
    pub cache_capacity: usize,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            max_io_len: MAX_IO_LEN,
            max_steps: MAX_TRAVERSAL_STEPS,
            max_depth: MAX_TRAVERSAL_DEPTH,
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl LookupOptions {
    pub fn with_max_io_len(mut self, max_io_len: usize) -> Self {
        self.max_io_len = max_io_len;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// Scratch state reused across lookups on one instance.
///
/// Holds the tapes, the flag diacritic vector and the result buffer. It is
/// mutated in place by every lookup, so one config must never serve two
/// lookups at once.
#[derive(Debug)]
pub struct LookupConfig {
    pub input_tape: Vec<SymbolNumber>,
    pub output_tape: Vec<SymbolNumber>,
    pub flag_state: FlagDiacriticState,
    pub results: Vec<LookupResult>,
    /// Step bound applied to each lookup.
    pub max_steps: usize,
    /// Path depth bound applied to each lookup.
    pub max_depth: usize,
    /// Traversal steps taken by the most recent lookup.
    pub steps: usize,
    /// Whether the most recent lookup hit the step or depth bound.
    pub truncated: bool,
}

impl LookupConfig {
    /// `feature_count`: number of distinct flag features.
    /// `max_io_len`: tape capacity in symbols.
    /// `max_steps`: traversal step bound per lookup.
    /// `max_depth`: path depth bound per lookup.
    pub fn new(feature_count: u16, max_io_len: usize, max_steps: usize, max_depth: usize) -> Self {
        Self {
            input_tape: Vec::with_capacity(max_io_len),
            output_tape: vec![0; max_io_len],
            flag_state: FlagDiacriticState::new(feature_count),
            results: Vec::new(),
            max_steps,
            max_depth,
            steps: 0,
            truncated: false,
        }
    }

    /// Reset per-lookup state at the start of a lookup.
    #[inline]
    pub fn reset(&mut self) {
        self.input_tape.clear();
        self.results.clear();
        self.steps = 0;
        self.truncated = false;
    }
}
