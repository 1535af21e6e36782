//! ELF32 symbol table entry parsing.

use crate::header::Encoding;

/// Symbol type: unspecified.
pub const STT_NOTYPE: u8 = 0;

/// Symbol type: data object.
pub const STT_OBJECT: u8 = 1;

/// Symbol type: function.
pub const STT_FUNC: u8 = 2;

/// Special section index: undefined.
pub const SHN_UNDEF: u16 = 0;

/// First reserved section index. Indices at or above this value carry
/// alternate meanings (`SHN_ABS`, `SHN_COMMON`, processor ranges) and do not
/// point into the section header table.
pub const SHN_LORESERVE: u16 = 0xff00;

/// Special section index: absolute value, not address.
pub const SHN_ABS: u16 = 0xfff1;

/// Special section index: common block.
pub const SHN_COMMON: u16 = 0xfff2;

/// Parsed ELF32 symbol table entry.
#[derive(Debug, Clone, Copy)]
pub struct Elf32Symbol {
    /// Offset into the linked string table for this symbol's name.
    pub st_name: u32,
    /// Symbol value (an address for defined symbols).
    pub st_value: u32,
    /// Symbol size in bytes.
    pub st_size: u32,
    /// Symbol type and binding packed into one byte.
    pub st_info: u8,
    /// Visibility.
    pub st_other: u8,
    /// Index of the section this symbol is defined in.
    pub st_shndx: u16,
}

impl Elf32Symbol {
    /// Parse a symbol entry from raw bytes at the given file offset,
    /// decoding fields in the object's declared byte order.
    ///
    /// The caller must ensure `file_offset + 16 <= data.len()`.
    pub(crate) fn parse(data: &[u8], file_offset: usize, enc: Encoding) -> Self {
        let b = &data[file_offset..];
        Self {
            st_name: enc.u32_at(b, 0),
            st_value: enc.u32_at(b, 4),
            st_size: enc.u32_at(b, 8),
            st_info: b[12],
            st_other: b[13],
            st_shndx: enc.u16_at(b, 14),
        }
    }

    /// Returns the symbol type (lower 4 bits of `st_info`).
    #[must_use]
    pub fn sym_type(&self) -> u8 {
        self.st_info & 0xf
    }

    /// True when `st_shndx` points at a real entry in the section header
    /// table rather than one of the reserved pseudo-indices.
    #[must_use]
    pub fn has_section(&self) -> bool {
        self.st_shndx != SHN_UNDEF && self.st_shndx < SHN_LORESERVE
    }

    /// True for the symbol types that can name an entry point:
    /// untyped, data object, or function.
    #[must_use]
    pub fn is_entry_candidate(&self) -> bool {
        matches!(self.sym_type(), STT_NOTYPE | STT_OBJECT | STT_FUNC)
    }
}
