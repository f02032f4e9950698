// Post-processing of batch lookup output: tag stripping and length filter.
// Origin: transducer.cc:215-223 (remove_tags), 296-307 (post-processing)

use std::sync::LazyLock;

use fancy_regex::Regex;
use rayon::prelude::*;

use crate::config::{MIN_OUTPUT_CHARS, TAG_PATTERN};

static DEFAULT_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TAG_PATTERN).expect("TAG_PATTERN must compile"));

/// Removes tag markup from analyses, leaving the surface-like lemma.
#[derive(Debug, Clone)]
pub struct TagStripper {
    regex: Regex,
}

impl Default for TagStripper {
    fn default() -> Self {
        Self {
            regex: DEFAULT_TAGS.clone(),
        }
    }
}

impl TagStripper {
    /// Strip with a custom pattern instead of [`TAG_PATTERN`].
    pub fn new(pattern: &str) -> Result<Self, fancy_regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn strip(&self, analysis: &str) -> String {
        self.regex.replace_all(analysis, "").into_owned()
    }

    /// Strip every string and drop the ones left shorter than
    /// [`MIN_OUTPUT_CHARS`]. Order of the survivors is preserved.
    pub fn postprocess(&self, resolved: Vec<String>) -> Vec<String> {
        resolved
            .into_par_iter()
            .map(|s| self.strip(&s))
            .filter(|s| s.chars().count() >= MIN_OUTPUT_CHARS)
            .collect()
    }
}
