//! Property-key table shared by every record of one document.
//!
//! Record property names are written once, in the frame header, and
//! referenced from OBJECT payloads by a numeric index. Indices 0..=2 collide
//! with control bytes, so numbering starts at 3.
//!
//! Two index widths exist, chosen once per document:
//!
//! | Mode | Keys | Size field | Index |
//! |------|------|------------|-------|
//! | compact | 0..=251 | 1 byte | 1 byte |
//! | extended | 252..=65278 | `0xff` + 2 bytes big-endian | 2 bytes little-endian |
//!
//! The decoder tells a RETURN byte from a key index by peeking at the first
//! byte of the index, which in extended mode is the low byte. Extended
//! indices whose low byte is zero are therefore never assigned: after 255
//! numbering continues at `0x0101`, `0x0201` and so on.

use binpack_buffers::{Reader, Writer};
use indexmap::IndexSet;

use crate::error::BinPackError;

/// Sentinel in the size byte announcing a 2-byte extended size.
pub const EXTENDED_SIZE_MARKER: u8 = 0xff;

/// First index handed out; lower values are control bytes.
pub const FIRST_INDEX: u16 = 3;

/// Largest key count that still fits the compact mode.
pub const COMPACT_MAX_KEYS: usize = 251;

/// Largest key count the extended mode can address.
pub const EXTENDED_MAX_KEYS: usize = FIRST_PAGE_KEYS + 255 * LOW_BYTES_PER_PAGE;

/// Longest key name, in UTF-8 bytes, that the 1-byte length field carries.
pub const MAX_KEY_LEN: usize = 254;

/// Indices 3..=255 of the first 256-wide page.
const FIRST_PAGE_KEYS: usize = 256 - FIRST_INDEX as usize;

/// Usable low bytes (1..=255) in every later page.
const LOW_BYTES_PER_PAGE: usize = 255;

/// Index width of a document's key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyMode {
    Compact,
    Extended,
}

impl KeyMode {
    pub fn for_count(count: usize) -> Self {
        if count > COMPACT_MAX_KEYS {
            KeyMode::Extended
        } else {
            KeyMode::Compact
        }
    }

    /// Number of keys addressable in this mode.
    pub fn capacity(self) -> usize {
        match self {
            KeyMode::Compact => COMPACT_MAX_KEYS,
            KeyMode::Extended => EXTENDED_MAX_KEYS,
        }
    }

    /// Bytes taken by one key index inside an OBJECT payload.
    pub fn index_width(self) -> usize {
        match self {
            KeyMode::Compact => 1,
            KeyMode::Extended => 2,
        }
    }

    /// Bytes taken by the table size field.
    pub fn size_field_width(self) -> usize {
        match self {
            KeyMode::Compact => 1,
            KeyMode::Extended => 3,
        }
    }

    /// Wire index of the key at `position` in table order.
    ///
    /// `position` must be below [`KeyMode::capacity`].
    pub fn index_of(self, position: usize) -> u16 {
        let first = FIRST_INDEX as usize;
        let index = match self {
            KeyMode::Compact => position + first,
            KeyMode::Extended if position < FIRST_PAGE_KEYS => position + first,
            KeyMode::Extended => {
                let rest = position - FIRST_PAGE_KEYS;
                (1 + rest / LOW_BYTES_PER_PAGE) * 256 + 1 + rest % LOW_BYTES_PER_PAGE
            }
        };
        index as u16
    }

    /// Table position of a wire index, if the index can be assigned at all.
    pub fn position_of(self, index: u16) -> Option<usize> {
        let index = index as usize;
        let first = FIRST_INDEX as usize;
        match self {
            KeyMode::Compact => index.checked_sub(first),
            KeyMode::Extended if index < 256 => index.checked_sub(first),
            KeyMode::Extended => {
                let low = (index & 0xff).checked_sub(1)?;
                Some(FIRST_PAGE_KEYS + ((index >> 8) - 1) * LOW_BYTES_PER_PAGE + low)
            }
        }
    }
}

/// Encode-side table: distinct names in first-sight order.
#[derive(Debug, Default)]
pub struct KeyTableBuilder<'g> {
    keys: IndexSet<&'g str>,
    entry_bytes: usize,
}

impl<'g> KeyTableBuilder<'g> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` if new and returns its table position.
    ///
    /// Callers reject names longer than [`MAX_KEY_LEN`] first.
    pub fn insert(&mut self, key: &'g str) -> usize {
        let (position, fresh) = self.keys.insert_full(key);
        if fresh {
            self.entry_bytes += 1 + key.len();
        }
        position
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Picks the index mode, failing when no mode can hold every key.
    pub fn mode(&self) -> Result<KeyMode, BinPackError> {
        let mode = KeyMode::for_count(self.keys.len());
        if self.keys.len() > mode.capacity() {
            return Err(BinPackError::Limit(format!(
                "max num of properties ({EXTENDED_MAX_KEYS}) exceeded"
            )));
        }
        Ok(mode)
    }

    /// Size of the size field plus every table entry.
    pub fn encoded_len(&self, mode: KeyMode) -> usize {
        mode.size_field_width() + self.entry_bytes
    }

    /// Writes the size field and the entries in table order.
    pub fn write(&self, writer: &mut Writer, mode: KeyMode) {
        match mode {
            KeyMode::Compact => writer.u8(self.keys.len() as u8),
            KeyMode::Extended => {
                writer.u8(EXTENDED_SIZE_MARKER);
                writer.u16(self.keys.len() as u16);
            }
        }
        for key in &self.keys {
            writer.u8(key.len() as u8);
            writer.buf(key.as_bytes());
        }
    }
}

/// Decode-side table borrowing names from the input.
#[derive(Debug, Clone)]
pub struct KeyTable<'a> {
    mode: KeyMode,
    names: Vec<&'a str>,
}

impl<'a> KeyTable<'a> {
    /// Reads the size field and entries at the reader's cursor.
    pub fn read(reader: &mut Reader<'a>) -> Result<Self, binpack_buffers::BufferError> {
        let size = reader.u8()?;
        let (mode, count) = if size == EXTENDED_SIZE_MARKER {
            (KeyMode::Extended, reader.u16()? as usize)
        } else {
            (KeyMode::Compact, size as usize)
        };
        let mut names = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let len = reader.u8()? as usize;
            names.push(reader.utf8(len)?);
        }
        Ok(Self { mode, names })
    }

    pub fn mode(&self) -> KeyMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name behind a wire index.
    pub fn get(&self, index: u16) -> Option<&'a str> {
        let position = self.mode.position_of(index)?;
        self.names.get(position).copied()
    }
}
