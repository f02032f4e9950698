// Input tokenizer: ASCII fast path plus a byte-branching trie.
// Origin: transducer.cc:19-21, 152-213

use hashbrown::HashMap;

use crate::alphabet::Alphabet;
use crate::{LookupError, NO_SYMBOL, SymbolNumber};

#[inline]
fn should_ascii_tokenize(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

#[derive(Debug, Default)]
struct Branch {
    /// Symbol ending at this byte.
    symbol: Option<SymbolNumber>,
    /// Longer symbols continuing past this byte.
    child: Option<LetterTrie>,
}

/// Prefix tree over symbol byte strings. Each node owns its children.
#[derive(Debug, Default)]
pub struct LetterTrie {
    branches: HashMap<u8, Branch>,
}

impl LetterTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` as `symbol`. Empty strings are ignored.
    pub fn add_string(&mut self, bytes: &[u8], symbol: SymbolNumber) {
        let Some((&first, rest)) = bytes.split_first() else {
            return;
        };
        let branch = self.branches.entry(first).or_default();
        if rest.is_empty() {
            branch.symbol = Some(symbol);
        } else {
            branch
                .child
                .get_or_insert_with(LetterTrie::new)
                .add_string(rest, symbol);
        }
    }

    /// Match at the start of `input`, returning the symbol and bytes consumed.
    ///
    /// Descends while a child exists for the next byte, then reports the
    /// deepest symbol registered along that single descent.
    pub fn find_key(&self, input: &[u8]) -> Option<(SymbolNumber, usize)> {
        let (&byte, rest) = input.split_first()?;
        let branch = self.branches.get(&byte)?;
        if let Some(child) = &branch.child {
            if let Some((symbol, len)) = child.find_key(rest) {
                return Some((symbol, len + 1));
            }
        }
        branch.symbol.map(|symbol| (symbol, 1))
    }
}

/// Tokenizer over the input-symbol subset of an alphabet.
#[derive(Debug)]
pub struct Encoder {
    ascii_symbols: [SymbolNumber; 256],
    letters: LetterTrie,
}

impl Encoder {
    /// Build from symbols `1..input_symbol_count`.
    ///
    /// Epsilon, empty strings and flag diacritics are not tokenizable. Single
    /// ASCII letters go into the direct array unless a longer symbol starts
    /// with the same letter, in which case only the trie serves that byte.
    pub fn new(alphabet: &Alphabet, input_symbol_count: u16) -> Self {
        let mut ascii_symbols = [NO_SYMBOL; 256];
        let mut shadowed = [false; 256];
        let mut letters = LetterTrie::new();

        for k in 1..input_symbol_count {
            if alphabet.is_flag_diacritic(k) {
                continue;
            }
            let bytes = alphabet.string_from_symbol(k).as_bytes();
            let Some(&first) = bytes.first() else {
                continue;
            };
            if should_ascii_tokenize(first) {
                if bytes.len() == 1 {
                    ascii_symbols[first as usize] = k;
                } else {
                    shadowed[first as usize] = true;
                }
            }
            letters.add_string(bytes, k);
        }

        for (slot, &shadow) in ascii_symbols.iter_mut().zip(shadowed.iter()) {
            if shadow {
                *slot = NO_SYMBOL;
            }
        }

        Self {
            ascii_symbols,
            letters,
        }
    }

    /// Match one symbol at the start of `input`.
    #[inline]
    pub fn find_key(&self, input: &[u8]) -> Option<(SymbolNumber, usize)> {
        let &first = input.first()?;
        match self.ascii_symbols[first as usize] {
            NO_SYMBOL => self.letters.find_key(input),
            symbol => Some((symbol, 1)),
        }
    }

    /// Tokenize all of `text`, or fail without producing a partial tape.
    pub fn tokenize(&self, text: &str, limit: usize) -> Result<Vec<SymbolNumber>, LookupError> {
        let bytes = text.as_bytes();
        let mut tape = Vec::with_capacity(bytes.len().min(limit));
        let mut offset = 0;
        while offset < bytes.len() {
            if tape.len() == limit {
                return Err(LookupError::InputTooLong { limit });
            }
            let (symbol, len) = self
                .find_key(&bytes[offset..])
                .ok_or(LookupError::Untokenizable { offset })?;
            tape.push(symbol);
            offset += len;
        }
        Ok(tape)
    }
}
