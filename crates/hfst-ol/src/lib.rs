//! Optimized-lookup (HFST-OL) transducer runtime.
//!
//! This crate loads weighted or unweighted finite state transducers stored in
//! the compact optimized-lookup binary format and analyzes surface forms into
//! analyses with weights.
//!
//! # Architecture
//!
//! - [`format`] -- Wrapper header stripping and the structural header record
//! - [`alphabet`] -- Symbol table and flag diacritic registry
//! - [`encoder`] -- ASCII fast path plus byte trie tokenizer
//! - [`flags`] -- Flag diacritic operations and the feature value vector
//! - [`transition`] -- Index/transition records and the two binary tables
//! - [`config`] -- Limits, options and per-instance traversal scratch
//! - [`transducer`] -- Loading, lookup traversal, batch lookup with caching
//! - [`navigate`] -- State-level navigation for external walkers
//! - [`cache`] -- Token to analysis cache and its text persistence
//! - [`tags`] -- Tag stripping and length filtering of analyses

pub mod alphabet;
pub mod cache;
pub mod config;
pub mod encoder;
pub mod flags;
pub mod format;
pub mod navigate;
pub mod tags;
pub mod transducer;
pub mod transition;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
pub(crate) mod testutil;

pub use alphabet::Alphabet;
pub use cache::ResultCache;
pub use config::LookupOptions;
pub use transducer::{Automaton, Transducer};

/// Dense identifier of one alphabet entry.
pub type SymbolNumber = u16;

/// Position in the index table, or (at or above
/// [`TRANSITION_TARGET_TABLE_START`]) in the transition table.
pub type TableIndex = u32;

/// Path weight. Stored on disk as IEEE-754 single precision.
pub type Weight = f32;

/// Sentinel symbol: "no symbol" / end of tape. Never a valid alphabet index.
pub const NO_SYMBOL: SymbolNumber = SymbolNumber::MAX;

/// Sentinel table index: "no target".
pub const NO_TABLE_INDEX: TableIndex = TableIndex::MAX;

/// Positions at or above this value address the transition table.
pub const TRANSITION_TARGET_TABLE_START: TableIndex = 2_147_483_648;

/// Error type for loading optimized-lookup transducers.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("unexpected end of data in {context}: expected {expected} bytes, got {actual}")]
    TooShort {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("transducer has wrong type: {0}")]
    WrongType(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("invalid symbol table: {0}")]
    InvalidSymbolTable(String),
    #[error("failed to read transducer: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a lookup produced no analyses before traversal started.
///
/// [`Transducer::lookup`] folds these into an empty result; use
/// [`Transducer::try_lookup`] to tell them apart from "no accepting path".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no input symbol matches the byte at offset {offset}")]
    Untokenizable { offset: usize },
    #[error("input exceeds the tape limit of {limit} symbols")]
    InputTooLong { limit: usize },
}

/// Error type for lookup cache persistence.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed cache entry on line {line}")]
    Malformed { line: usize },
}

/// One accepting path: the decoded output tape and its accumulated weight.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    pub analysis: String,
    pub weight: Weight,
}

impl LookupResult {
    pub fn new(analysis: impl Into<String>, weight: Weight) -> Self {
        Self {
            analysis: analysis.into(),
            weight,
        }
    }
}

impl From<LookupResult> for (String, Weight) {
    fn from(result: LookupResult) -> Self {
        (result.analysis, result.weight)
    }
}
