// Token to canonical analysis cache, persisted as space-separated text.
// Origin: transducer.cc:311-318 (write_lookup_cache)

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use hashbrown::HashMap;
use tracing::debug;

use crate::CacheError;

/// One canonical analysis per distinct input token.
///
/// Only tokens that produced at least one analysis are stored. The file format
/// is one `"<token> <analysis>"` line per entry with no escaping: a token
/// containing a space, or any field containing a newline, does not survive a
/// write/read cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultCache {
    entries: HashMap<String, String>,
}

impl ResultCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn insert(&mut self, token: impl Into<String>, analysis: impl Into<String>) {
        self.entries.insert(token.into(), analysis.into());
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Write all entries, sorted by token.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<(), CacheError> {
        let mut entries: Vec<(&str, &str)> = self.iter().collect();
        entries.sort_unstable();
        for (token, analysis) in entries {
            writeln!(out, "{token} {analysis}")?;
        }
        Ok(())
    }

    /// Write all entries to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<(), CacheError> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write(&mut out)?;
        out.flush()?;
        debug!(entries = self.len(), path = %path.display(), "wrote lookup cache");
        Ok(())
    }

    /// Parse entries written by [`write`](Self::write). Each line splits at
    /// its first space; blank lines are skipped.
    pub fn read<R: BufRead>(input: R) -> Result<Self, CacheError> {
        let mut cache = Self::default();
        for (i, line) in input.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (token, analysis) = line
                .split_once(' ')
                .ok_or(CacheError::Malformed { line: i + 1 })?;
            cache.insert(token, analysis);
        }
        Ok(cache)
    }

    pub fn read_from(path: &Path) -> Result<Self, CacheError> {
        let cache = Self::read(BufReader::new(File::open(path)?))?;
        debug!(entries = cache.len(), path = %path.display(), "read lookup cache");
        Ok(cache)
    }

    /// Add every entry of `other`, overwriting tokens present in both.
    pub fn extend(&mut self, other: ResultCache) {
        self.entries.extend(other.entries);
    }
}
