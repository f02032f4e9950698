// Index and transition records, and the two binary tables built from them.
// Origin: transducer.cc:109-150 (record accessors), 498-517 (load and write)

use std::io::{self, Write};

use bytemuck::{Pod, Zeroable};

use crate::format::ByteReader;
use crate::{
    FormatError, NO_SYMBOL, NO_TABLE_INDEX, SymbolNumber, TRANSITION_TARGET_TABLE_START, TableIndex,
    Weight,
};

/// A fixed-width record of the index table.
pub trait IndexRecord: Pod + std::fmt::Debug + PartialEq {
    fn input_symbol(&self) -> SymbolNumber;
    fn target(&self) -> TableIndex;
    fn final_weight(&self) -> Weight;

    #[inline]
    fn is_final(&self) -> bool {
        self.input_symbol() == NO_SYMBOL && self.target() != NO_TABLE_INDEX
    }
}

/// A fixed-width record of the transition table.
pub trait TransitionRecord: Pod + std::fmt::Debug + PartialEq {
    fn input_symbol(&self) -> SymbolNumber;
    fn output_symbol(&self) -> SymbolNumber;
    fn target(&self) -> TableIndex;
    fn weight(&self) -> Weight;

    #[inline]
    fn is_final(&self) -> bool {
        self.input_symbol() == NO_SYMBOL && self.output_symbol() == NO_SYMBOL && self.target() == 1
    }
}

/// Unweighted index record (6 bytes).
///
/// A final index record has no input symbol and any target but
/// [`NO_TABLE_INDEX`].
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransitionIndex {
    input_symbol: u16,
    first_transition_index: u32,
}

/// Weighted index record (6 bytes). For final records the target field holds
/// the bits of the final weight.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransitionWIndex {
    input_symbol: u16,
    first_transition_index: u32,
}

/// Unweighted transition record (8 bytes).
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Transition {
    input_symbol: u16,
    output_symbol: u16,
    target_index: u32,
}

/// Weighted transition record (12 bytes).
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransitionW {
    input_symbol: u16,
    output_symbol: u16,
    target_index: u32,
    weight: u32,
}

impl TransitionIndex {
    pub fn new(input_symbol: SymbolNumber, target: TableIndex) -> Self {
        Self {
            input_symbol: input_symbol.to_le(),
            first_transition_index: target.to_le(),
        }
    }
}

impl TransitionWIndex {
    pub fn new(input_symbol: SymbolNumber, target: TableIndex) -> Self {
        Self {
            input_symbol: input_symbol.to_le(),
            first_transition_index: target.to_le(),
        }
    }

    pub fn new_final(weight: Weight) -> Self {
        Self::new(NO_SYMBOL, weight.to_bits())
    }
}

impl Transition {
    pub fn new(input: SymbolNumber, output: SymbolNumber, target: TableIndex) -> Self {
        Self {
            input_symbol: input.to_le(),
            output_symbol: output.to_le(),
            target_index: target.to_le(),
        }
    }
}

impl TransitionW {
    pub fn new(input: SymbolNumber, output: SymbolNumber, target: TableIndex, weight: Weight) -> Self {
        Self {
            input_symbol: input.to_le(),
            output_symbol: output.to_le(),
            target_index: target.to_le(),
            weight: weight.to_bits().to_le(),
        }
    }
}

impl IndexRecord for TransitionIndex {
    #[inline]
    fn input_symbol(&self) -> SymbolNumber {
        u16::from_le(self.input_symbol)
    }

    #[inline]
    fn target(&self) -> TableIndex {
        u32::from_le(self.first_transition_index)
    }

    #[inline]
    fn final_weight(&self) -> Weight {
        0.0
    }
}

impl IndexRecord for TransitionWIndex {
    #[inline]
    fn input_symbol(&self) -> SymbolNumber {
        u16::from_le(self.input_symbol)
    }

    #[inline]
    fn target(&self) -> TableIndex {
        u32::from_le(self.first_transition_index)
    }

    #[inline]
    fn final_weight(&self) -> Weight {
        f32::from_bits(self.target())
    }
}

impl TransitionRecord for Transition {
    #[inline]
    fn input_symbol(&self) -> SymbolNumber {
        u16::from_le(self.input_symbol)
    }

    #[inline]
    fn output_symbol(&self) -> SymbolNumber {
        u16::from_le(self.output_symbol)
    }

    #[inline]
    fn target(&self) -> TableIndex {
        u32::from_le(self.target_index)
    }

    #[inline]
    fn weight(&self) -> Weight {
        0.0
    }
}

impl TransitionRecord for TransitionW {
    #[inline]
    fn input_symbol(&self) -> SymbolNumber {
        u16::from_le(self.input_symbol)
    }

    #[inline]
    fn output_symbol(&self) -> SymbolNumber {
        u16::from_le(self.output_symbol)
    }

    #[inline]
    fn target(&self) -> TableIndex {
        u32::from_le(self.target_index)
    }

    #[inline]
    fn weight(&self) -> Weight {
        f32::from_bits(u32::from_le(self.weight))
    }
}

const _: () = assert!(size_of::<TransitionIndex>() == 6);
const _: () = assert!(size_of::<TransitionWIndex>() == 6);
const _: () = assert!(size_of::<Transition>() == 8);
const _: () = assert!(size_of::<TransitionW>() == 12);

/// The index and transition tables for one record layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Tables<I, T> {
    indices: Vec<I>,
    transitions: Vec<T>,
}

impl<I: IndexRecord, T: TransitionRecord> Tables<I, T> {
    pub fn new(indices: Vec<I>, transitions: Vec<T>) -> Self {
        Self {
            indices,
            transitions,
        }
    }

    fn parse(
        reader: &mut ByteReader<'_>,
        index_count: u32,
        transition_count: u32,
    ) -> Result<Self, FormatError> {
        let index_bytes = reader.take(record_bytes::<I>(index_count)?, "index table")?;
        let transition_bytes =
            reader.take(record_bytes::<T>(transition_count)?, "transition table")?;
        // Packed records have alignment 1, so the casts cannot fail.
        Ok(Self {
            indices: bytemuck::cast_slice::<u8, I>(index_bytes).to_vec(),
            transitions: bytemuck::cast_slice::<u8, T>(transition_bytes).to_vec(),
        })
    }

    pub fn indices(&self) -> &[I] {
        &self.indices
    }

    pub fn transitions(&self) -> &[T] {
        &self.transitions
    }

    fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(bytemuck::cast_slice(&self.indices))?;
        out.write_all(bytemuck::cast_slice(&self.transitions))
    }
}

fn record_bytes<R>(count: u32) -> Result<usize, FormatError> {
    (count as usize)
        .checked_mul(size_of::<R>())
        .ok_or_else(|| FormatError::InvalidHeader(format!("table size {count} overflows")))
}

/// Whether a position addresses the transition table rather than the index
/// table.
#[inline]
pub fn indexes_transition_table(i: TableIndex) -> bool {
    i >= TRANSITION_TARGET_TABLE_START
}

/// A record of either table, decoded into layout-independent fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionEntry {
    pub input_symbol: SymbolNumber,
    pub output_symbol: SymbolNumber,
    pub target: TableIndex,
    pub weight: Weight,
}

/// Both binary tables, in the weighted or unweighted record layout.
///
/// Reads past the end of either table behave like a sentinel record: no
/// input symbol, no target, not final. Scans therefore stop at a truncated
/// or corrupt table instead of panicking.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionTables {
    Unweighted(Tables<TransitionIndex, Transition>),
    Weighted(Tables<TransitionWIndex, TransitionW>),
}

macro_rules! dispatch {
    ($self:expr, $tables:ident => $body:expr) => {
        match $self {
            TransitionTables::Unweighted($tables) => $body,
            TransitionTables::Weighted($tables) => $body,
        }
    };
}

impl TransitionTables {
    /// Read `index_count` index records followed by `transition_count`
    /// transition records.
    pub fn parse(
        reader: &mut ByteReader<'_>,
        weighted: bool,
        index_count: u32,
        transition_count: u32,
    ) -> Result<Self, FormatError> {
        Ok(if weighted {
            Self::Weighted(Tables::parse(reader, index_count, transition_count)?)
        } else {
            Self::Unweighted(Tables::parse(reader, index_count, transition_count)?)
        })
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self, Self::Weighted(_))
    }

    pub fn index_count(&self) -> usize {
        dispatch!(self, t => t.indices.len())
    }

    pub fn transition_count(&self) -> usize {
        dispatch!(self, t => t.transitions.len())
    }

    #[inline]
    pub fn index_input(&self, i: TableIndex) -> SymbolNumber {
        dispatch!(self, t => t.indices.get(i as usize).map_or(NO_SYMBOL, |r| r.input_symbol()))
    }

    #[inline]
    pub fn index_target(&self, i: TableIndex) -> TableIndex {
        dispatch!(self, t => t.indices.get(i as usize).map_or(NO_TABLE_INDEX, |r| r.target()))
    }

    #[inline]
    pub fn index_finality(&self, i: TableIndex) -> bool {
        dispatch!(self, t => t.indices.get(i as usize).is_some_and(|r| r.is_final()))
    }

    #[inline]
    pub fn final_weight(&self, i: TableIndex) -> Weight {
        dispatch!(self, t => t.indices.get(i as usize).map_or(0.0, |r| r.final_weight()))
    }

    #[inline]
    pub fn transition_input(&self, i: TableIndex) -> SymbolNumber {
        dispatch!(self, t => t.transitions.get(i as usize).map_or(NO_SYMBOL, |r| r.input_symbol()))
    }

    #[inline]
    pub fn transition_output(&self, i: TableIndex) -> SymbolNumber {
        dispatch!(self, t => t.transitions.get(i as usize).map_or(NO_SYMBOL, |r| r.output_symbol()))
    }

    #[inline]
    pub fn transition_target(&self, i: TableIndex) -> TableIndex {
        dispatch!(self, t => t.transitions.get(i as usize).map_or(NO_TABLE_INDEX, |r| r.target()))
    }

    #[inline]
    pub fn transition_finality(&self, i: TableIndex) -> bool {
        dispatch!(self, t => t.transitions.get(i as usize).is_some_and(|r| r.is_final()))
    }

    #[inline]
    pub fn weight(&self, i: TableIndex) -> Weight {
        dispatch!(self, t => t.transitions.get(i as usize).map_or(0.0, |r| r.weight()))
    }

    /// Decoded transition record, if `i` is in range.
    pub fn transition(&self, i: TableIndex) -> Option<TransitionEntry> {
        dispatch!(self, t => t.transitions.get(i as usize).map(|r| TransitionEntry {
            input_symbol: r.input_symbol(),
            output_symbol: r.output_symbol(),
            target: r.target(),
            weight: r.weight(),
        }))
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        dispatch!(self, t => t.write(out))
    }
}
