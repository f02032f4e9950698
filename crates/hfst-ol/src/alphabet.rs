// Alphabet: symbol table, flag diacritic registry and unknown-symbol marker.
// Origin: transducer.cc:65-101

use std::io::{self, Write};

use hashbrown::HashMap;

use crate::flags::{FlagDiacriticOperation, FlagDiacriticParser, FlagDiacriticState};
use crate::format::ByteReader;
use crate::{FormatError, SymbolNumber};

/// Marker string for the unknown symbol.
pub const UNKNOWN_SYMBOL: &str = "@_UNKNOWN_SYMBOL_@";

/// Marker string some writers use for symbol 0.
pub const EPSILON_SYMBOL: &str = "@_EPSILON_SYMBOL_@";

/// Symbol table of a loaded transducer.
///
/// The position of a string in the table is its [`SymbolNumber`]. Symbol 0 is
/// epsilon. Strings matching the flag diacritic convention are registered with
/// their parsed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Alphabet {
    symbol_table: Vec<String>,
    /// Parsed operation per symbol, `None` for ordinary symbols.
    fd_table: Vec<Option<FlagDiacriticOperation>>,
    feature_count: u16,
    value_count: usize,
    unknown_symbol: Option<SymbolNumber>,
}

impl Alphabet {
    /// Read exactly `symbol_count` NUL-terminated strings.
    pub fn parse(reader: &mut ByteReader<'_>, symbol_count: u16) -> Result<Self, FormatError> {
        let mut symbols = Vec::with_capacity(symbol_count as usize);
        for i in 0..symbol_count {
            let bytes = reader.read_cstr("alphabet")?;
            let symbol = std::str::from_utf8(bytes).map_err(|_| {
                FormatError::InvalidSymbolTable(format!("invalid UTF-8 in symbol {i}"))
            })?;
            symbols.push(symbol.to_string());
        }
        Ok(Self::from_symbols(symbols))
    }

    /// Build an alphabet from an already decoded symbol table.
    pub fn from_symbols(symbol_table: Vec<String>) -> Self {
        let mut parser = FlagDiacriticParser::new();
        let mut fd_table = Vec::with_capacity(symbol_table.len());
        let mut unknown_symbol = None;

        for (i, symbol) in symbol_table.iter().enumerate() {
            let op = parser.parse(symbol);
            if op.is_none() && symbol == UNKNOWN_SYMBOL {
                unknown_symbol = Some(i as SymbolNumber);
            }
            fd_table.push(op);
        }

        Self {
            symbol_table,
            fd_table,
            feature_count: parser.feature_count(),
            value_count: parser.value_count(),
            unknown_symbol,
        }
    }

    pub fn symbol_count(&self) -> usize {
        self.symbol_table.len()
    }

    pub fn symbol_table(&self) -> &[String] {
        &self.symbol_table
    }

    /// The string for `symbol`, or `""` if it is out of range.
    pub fn string_from_symbol(&self, symbol: SymbolNumber) -> &str {
        self.symbol_table
            .get(symbol as usize)
            .map_or("", String::as_str)
    }

    #[inline]
    pub fn is_flag_diacritic(&self, symbol: SymbolNumber) -> bool {
        matches!(self.fd_table.get(symbol as usize), Some(Some(_)))
    }

    #[inline]
    pub fn operation(&self, symbol: SymbolNumber) -> Option<&FlagDiacriticOperation> {
        self.fd_table.get(symbol as usize).and_then(Option::as_ref)
    }

    /// All registered flag diacritics as `(symbol, operation)` pairs.
    pub fn flag_diacritics(&self) -> impl Iterator<Item = (SymbolNumber, &FlagDiacriticOperation)> {
        self.fd_table
            .iter()
            .enumerate()
            .filter_map(|(i, op)| op.as_ref().map(|op| (i as SymbolNumber, op)))
    }

    pub fn feature_count(&self) -> u16 {
        self.feature_count
    }

    /// Number of distinct flag values, the neutral value included.
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    pub fn unknown_symbol(&self) -> Option<SymbolNumber> {
        self.unknown_symbol
    }

    /// A fresh, all-neutral flag state sized for this alphabet.
    pub fn new_flag_state(&self) -> FlagDiacriticState {
        FlagDiacriticState::new(self.feature_count)
    }

    /// Reverse map from symbol string to number. Later duplicates win.
    pub fn build_string_symbol_map(&self) -> HashMap<String, SymbolNumber> {
        self.symbol_table
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as SymbolNumber))
            .collect()
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for symbol in &self.symbol_table {
            out.write_all(symbol.as_bytes())?;
            out.write_all(&[0])?;
        }
        Ok(())
    }
}
