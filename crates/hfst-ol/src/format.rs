// Optimized-lookup binary format: wrapper header stripping, header record.
// Origin: transducer.cc:23-63 (wrapper header), 469-476 (load order)

use std::io::{self, Write};

use crate::{FormatError, NO_SYMBOL};

/// Magic prefix of the optional wrapper header, including its NUL.
const WRAPPER_MAGIC: &[u8; 5] = b"HFST\0";

/// Runtime type tags a wrapper header may declare.
pub const TYPE_UNWEIGHTED: &str = "HFST_OL";
pub const TYPE_WEIGHTED: &str = "HFST_OLW";

/// Size of the structural header record in bytes.
pub const HEADER_SIZE: usize = 56;

/// Forward-only cursor over the raw model bytes.
///
/// Every read either consumes exactly the requested bytes or fails with
/// [`FormatError::TooShort`] without moving the cursor.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unread bytes.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], FormatError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(FormatError::TooShort {
                context,
                expected: self.pos.saturating_add(len),
                actual: self.data.len(),
            });
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8, FormatError> {
        Ok(self.take(1, context)?[0])
    }

    pub fn read_u16(&mut self, context: &'static str) -> Result<u16, FormatError> {
        let b = self.take(2, context)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self, context: &'static str) -> Result<u32, FormatError> {
        let b = self.take(4, context)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a NUL-terminated string, returning it without the terminator.
    pub fn read_cstr(&mut self, context: &'static str) -> Result<&'a [u8], FormatError> {
        let rest = self.rest();
        match rest.iter().position(|&b| b == 0) {
            Some(len) => {
                self.pos += len + 1;
                Ok(&rest[..len])
            }
            None => Err(FormatError::TooShort {
                context,
                expected: self.data.len() + 1,
                actual: self.data.len(),
            }),
        }
    }
}

/// Metadata carried by the optional wrapper header, as key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapperHeader {
    pub entries: Vec<(String, String)>,
}

impl WrapperHeader {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The declared runtime type, if the metadata has a `type` field.
    pub fn declared_type(&self) -> Option<&str> {
        self.get("type")
    }
}

/// Strip the wrapper header if the data starts with one.
///
/// When the magic is absent nothing is consumed, so header parsing starts at
/// the true beginning of the data. A present wrapper must be complete and, if
/// it declares a `type`, the type must be one of the two optimized-lookup tags.
pub fn skip_wrapper_header(reader: &mut ByteReader<'_>) -> Result<Option<WrapperHeader>, FormatError> {
    if !reader.rest().starts_with(WRAPPER_MAGIC) {
        return Ok(None);
    }
    reader.take(WRAPPER_MAGIC.len(), "wrapper header magic")?;

    let len = reader.read_u16("wrapper header length")? as usize;
    if reader.read_u8("wrapper header separator")? != 0 {
        return Err(FormatError::WrongType(
            "missing NUL after wrapper header length".to_string(),
        ));
    }
    let blob = reader.take(len, "wrapper header metadata")?;
    if blob.last() != Some(&0) {
        return Err(FormatError::WrongType(
            "wrapper header metadata is not NUL-terminated".to_string(),
        ));
    }

    let fields: Vec<String> = blob[..blob.len() - 1]
        .split(|&b| b == 0)
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect();
    let entries: Vec<(String, String)> = fields
        .chunks(2)
        .filter(|pair| pair.len() == 2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    let header = WrapperHeader { entries };

    if let Some(ty) = header.declared_type() {
        if ty != TYPE_UNWEIGHTED && ty != TYPE_WEIGHTED {
            return Err(FormatError::WrongType(format!(
                "declared type {ty:?} is not an optimized-lookup type"
            )));
        }
    }
    Ok(Some(header))
}

/// Structural header record preceding the alphabet.
///
/// Layout (little-endian):
/// - u16 input symbol count, u16 symbol count
/// - u32 index table size, u32 target table size
/// - u32 state count, u32 transition count
/// - nine u32 boolean properties, the first being `weighted`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransducerHeader {
    pub input_symbol_count: u16,
    pub symbol_count: u16,
    pub index_table_size: u32,
    pub target_table_size: u32,
    pub state_count: u32,
    pub transition_count: u32,
    pub weighted: bool,
    pub deterministic: bool,
    pub input_deterministic: bool,
    pub minimized: bool,
    pub cyclic: bool,
    pub has_epsilon_epsilon_transitions: bool,
    pub has_input_epsilon_transitions: bool,
    pub has_input_epsilon_cycles: bool,
    pub has_unweighted_input_epsilon_cycles: bool,
}

impl TransducerHeader {
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        let input_symbol_count = reader.read_u16("header")?;
        let symbol_count = reader.read_u16("header")?;
        let index_table_size = reader.read_u32("header")?;
        let target_table_size = reader.read_u32("header")?;
        let state_count = reader.read_u32("header")?;
        let transition_count = reader.read_u32("header")?;

        let mut props = [false; 9];
        for prop in &mut props {
            *prop = reader.read_u32("header properties")? != 0;
        }

        if symbol_count == NO_SYMBOL {
            return Err(FormatError::InvalidHeader(format!(
                "symbol count {symbol_count} collides with the sentinel symbol"
            )));
        }
        if input_symbol_count > symbol_count {
            return Err(FormatError::InvalidHeader(format!(
                "input symbol count {input_symbol_count} exceeds symbol count {symbol_count}"
            )));
        }

        Ok(Self {
            input_symbol_count,
            symbol_count,
            index_table_size,
            target_table_size,
            state_count,
            transition_count,
            weighted: props[0],
            deterministic: props[1],
            input_deterministic: props[2],
            minimized: props[3],
            cyclic: props[4],
            has_epsilon_epsilon_transitions: props[5],
            has_input_epsilon_transitions: props[6],
            has_input_epsilon_cycles: props[7],
            has_unweighted_input_epsilon_cycles: props[8],
        })
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.input_symbol_count.to_le_bytes())?;
        out.write_all(&self.symbol_count.to_le_bytes())?;
        out.write_all(&self.index_table_size.to_le_bytes())?;
        out.write_all(&self.target_table_size.to_le_bytes())?;
        out.write_all(&self.state_count.to_le_bytes())?;
        out.write_all(&self.transition_count.to_le_bytes())?;
        let props = [
            self.weighted,
            self.deterministic,
            self.input_deterministic,
            self.minimized,
            self.cyclic,
            self.has_epsilon_epsilon_transitions,
            self.has_input_epsilon_transitions,
            self.has_input_epsilon_cycles,
            self.has_unweighted_input_epsilon_cycles,
        ];
        for prop in props {
            out.write_all(&u32::from(prop).to_le_bytes())?;
        }
        Ok(())
    }
}
