//! ELF32 section header and string table parsing.

use crate::header::Encoding;

/// Section type: symbol table.
pub const SHT_SYMTAB: u32 = 2;

/// Section type: string table.
pub const SHT_STRTAB: u32 = 3;

/// Section type: occupies no space in the file (`.bss`).
pub const SHT_NOBITS: u32 = 8;

/// Parsed ELF32 section header entry.
#[derive(Debug, Clone, Copy)]
pub struct Elf32SectionHeader {
    /// Offset into the section name string table for this section's name.
    pub sh_name: u32,
    /// Section type (`SHT_NOBITS`, `SHT_SYMTAB`, ...).
    pub sh_type: u32,
    /// Section flags.
    pub sh_flags: u32,
    /// Virtual address of the section in memory.
    pub sh_addr: u32,
    /// File offset of the section data.
    pub sh_offset: u32,
    /// Size of the section in bytes.
    pub sh_size: u32,
    /// Associated section index (string table index for `.symtab`).
    pub sh_link: u32,
    /// Extra info, interpretation depends on section type.
    pub sh_info: u32,
    /// Required alignment.
    pub sh_addralign: u32,
    /// Size of each entry for table-like sections.
    pub sh_entsize: u32,
}

impl Elf32SectionHeader {
    /// Parse a section header from raw bytes at the given file offset,
    /// decoding fields in the object's declared byte order.
    ///
    /// The caller must ensure `file_offset + 40 <= data.len()`.
    pub(crate) fn parse(data: &[u8], file_offset: usize, enc: Encoding) -> Self {
        let b = &data[file_offset..];
        Self {
            sh_name: enc.u32_at(b, 0),
            sh_type: enc.u32_at(b, 4),
            sh_flags: enc.u32_at(b, 8),
            sh_addr: enc.u32_at(b, 12),
            sh_offset: enc.u32_at(b, 16),
            sh_size: enc.u32_at(b, 20),
            sh_link: enc.u32_at(b, 24),
            sh_info: enc.u32_at(b, 28),
            sh_addralign: enc.u32_at(b, 32),
            sh_entsize: enc.u32_at(b, 36),
        }
    }

    /// Returns true for sections that occupy no space in the file.
    #[must_use]
    pub fn is_nobits(&self) -> bool {
        self.sh_type == SHT_NOBITS
    }
}

/// A view over a NUL-terminated string table section.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    bytes: &'a [u8],
}

impl<'a> StringTable<'a> {
    /// Wraps the raw bytes of a string table section.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Looks up the NUL-terminated string starting at `offset`.
    ///
    /// Returns `None` when the offset is out of bounds, the string is not
    /// NUL-terminated, or it is not valid UTF-8.
    #[must_use]
    pub fn get(&self, offset: u32) -> Option<&'a str> {
        let tail = self.bytes.get(offset as usize..)?;
        let end = tail.iter().position(|&b| b == 0)?;
        core::str::from_utf8(&tail[..end]).ok()
    }
}
