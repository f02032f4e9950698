// Flag diacritic operations (P, N, R, D, C, U) and the feature value vector.
// Origin: transducer.cc:345-362 (speculative application and restore)

use std::ops::{Deref, DerefMut};

use hashbrown::HashMap;

/// Feature value meaning "unset". Also the value id of an empty value string.
pub const FLAG_VALUE_NEUTRAL: i16 = 0;

/// The six flag diacritic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOp {
    /// Positive set: feature takes the value.
    Positive,
    /// Negative set: feature takes "anything but" the value.
    Negative,
    /// Require: feature must hold the value (or any value, if none given).
    Require,
    /// Disallow: feature must not hold the value (or must be unset, if none given).
    Disallow,
    /// Clear: feature becomes unset.
    Clear,
    /// Unify: set if compatible, fail on a genuine positive conflict.
    Unify,
}

impl FlagOp {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'P' => Some(Self::Positive),
            b'N' => Some(Self::Negative),
            b'R' => Some(Self::Require),
            b'D' => Some(Self::Disallow),
            b'C' => Some(Self::Clear),
            b'U' => Some(Self::Unify),
            _ => None,
        }
    }

    fn needs_value(self) -> bool {
        matches!(self, Self::Positive | Self::Negative | Self::Unify)
    }
}

/// A parsed flag diacritic: operator plus interned feature and value ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagDiacriticOperation {
    pub op: FlagOp,
    pub feature: u16,
    pub value: i16,
}

/// Whether a symbol string follows the `@OP.FEATURE[.VALUE]@` convention.
///
/// P, N and U need a value; R, D and C may omit it.
pub fn is_diacritic(symbol: &str) -> bool {
    let bytes = symbol.as_bytes();
    if bytes.len() < 5 || bytes[0] != b'@' || bytes[bytes.len() - 1] != b'@' || bytes[2] != b'.' {
        return false;
    }
    let Some(op) = FlagOp::from_byte(bytes[1]) else {
        return false;
    };
    let has_value = symbol[3..symbol.len() - 1].contains('.');
    has_value || !op.needs_value()
}

/// Interns feature and value names across an alphabet.
///
/// Features are numbered from 0 in order of first appearance. Values are
/// numbered from 1; the empty value is [`FLAG_VALUE_NEUTRAL`].
#[derive(Debug)]
pub struct FlagDiacriticParser {
    features: HashMap<String, u16>,
    values: HashMap<String, i16>,
}

impl Default for FlagDiacriticParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagDiacriticParser {
    pub fn new() -> Self {
        let mut values = HashMap::new();
        values.insert(String::new(), FLAG_VALUE_NEUTRAL);
        Self {
            features: HashMap::new(),
            values,
        }
    }

    pub fn feature_count(&self) -> u16 {
        self.features.len() as u16
    }

    /// Number of distinct values, the neutral value included.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Parse a flag diacritic, or return `None` if the string is not one.
    pub fn parse(&mut self, symbol: &str) -> Option<FlagDiacriticOperation> {
        if !is_diacritic(symbol) {
            return None;
        }
        let op = FlagOp::from_byte(symbol.as_bytes()[1])?;
        let inner = &symbol[3..symbol.len() - 1];
        let (feature_str, value_str) = inner.split_once('.').unwrap_or((inner, ""));

        let feature = {
            let next = self.features.len() as u16;
            *self.features.entry(feature_str.to_string()).or_insert(next)
        };
        let value = {
            let next = self.values.len() as i16;
            *self.values.entry(value_str.to_string()).or_insert(next)
        };
        Some(FlagDiacriticOperation { op, feature, value })
    }
}

/// Current flag values, one slot per feature.
///
/// A positive set stores the value id, a negative set stores its negation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDiacriticState {
    values: Vec<i16>,
}

impl FlagDiacriticState {
    pub fn new(feature_count: u16) -> Self {
        Self {
            values: vec![FLAG_VALUE_NEUTRAL; feature_count as usize],
        }
    }

    pub fn values(&self) -> &[i16] {
        &self.values
    }

    pub fn reset(&mut self) {
        self.values.fill(FLAG_VALUE_NEUTRAL);
    }

    /// Apply an operation, returning whether it is legal.
    ///
    /// An illegal operation leaves the vector untouched.
    pub fn apply_operation(&mut self, op: &FlagDiacriticOperation) -> bool {
        let Some(current) = self.values.get_mut(op.feature as usize) else {
            return false;
        };
        match op.op {
            FlagOp::Positive => {
                *current = op.value;
                true
            }
            FlagOp::Negative => {
                *current = -op.value;
                true
            }
            FlagOp::Require => {
                if op.value == FLAG_VALUE_NEUTRAL {
                    *current != FLAG_VALUE_NEUTRAL
                } else {
                    *current == op.value
                }
            }
            FlagOp::Disallow => {
                if op.value == FLAG_VALUE_NEUTRAL {
                    *current == FLAG_VALUE_NEUTRAL
                } else {
                    *current != op.value
                }
            }
            FlagOp::Clear => {
                *current = FLAG_VALUE_NEUTRAL;
                true
            }
            FlagOp::Unify => {
                let compatible = *current == FLAG_VALUE_NEUTRAL
                    || *current == op.value
                    || (*current < 0 && -*current != op.value);
                if compatible {
                    *current = op.value;
                }
                compatible
            }
        }
    }

    /// Begin a speculative branch touching `feature`.
    ///
    /// The returned guard restores that feature's value when dropped, however
    /// the branch ends.
    pub fn speculate(&mut self, feature: u16) -> FlagGuard<'_> {
        let feature = feature as usize;
        let saved = self.values.get(feature).copied().unwrap_or(FLAG_VALUE_NEUTRAL);
        FlagGuard {
            state: self,
            feature,
            saved,
        }
    }
}

/// Restores one feature of a [`FlagDiacriticState`] on drop.
pub struct FlagGuard<'a> {
    state: &'a mut FlagDiacriticState,
    feature: usize,
    saved: i16,
}

impl Deref for FlagGuard<'_> {
    type Target = FlagDiacriticState;

    fn deref(&self) -> &Self::Target {
        self.state
    }
}

impl DerefMut for FlagGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.state
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.state.values.get_mut(self.feature) {
            *slot = self.saved;
        }
    }
}
