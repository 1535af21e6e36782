//! ELF32 file header parsing.
//!
//! Decodes the ELF32 file header from raw bytes, honoring the byte order the
//! object declares in `e_ident[EI_DATA]`. Flight targets come in both byte
//! orders, so every multi-byte field goes through [`Encoding`] rather than a
//! fixed `from_le_bytes`.

use core::fmt;
use std::io;

/// ELF magic bytes: `\x7fELF`.
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// ELF class: 32-bit.
const ELFCLASS32: u8 = 1;

/// ELF data encoding: little-endian.
const ELFDATA2LSB: u8 = 1;

/// ELF data encoding: big-endian.
const ELFDATA2MSB: u8 = 2;

/// The only defined ELF version.
const EV_CURRENT: u8 = 1;

/// Size of an ELF32 file header (52 bytes).
pub const ELF32_EHDR_SIZE: usize = 52;

/// Size of an ELF32 section header entry (40 bytes).
pub(crate) const ELF32_SHDR_SIZE: usize = 40;

/// Size of an ELF32 symbol table entry (16 bytes).
pub(crate) const ELF32_SYM_SIZE: usize = 16;

/// Byte order declared by an object file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Least-significant byte first (`ELFDATA2LSB`).
    Little,
    /// Most-significant byte first (`ELFDATA2MSB`).
    Big,
}

impl Encoding {
    /// Maps an `e_ident[EI_DATA]` byte to an encoding.
    fn from_ident(byte: u8) -> Option<Self> {
        match byte {
            ELFDATA2LSB => Some(Self::Little),
            ELFDATA2MSB => Some(Self::Big),
            _ => None,
        }
    }

    /// Returns the encoding of the machine this code is running on.
    #[must_use]
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    /// Returns true when no byte swapping is needed between this encoding
    /// and the host.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == Self::native()
    }

    /// Read a `u16` from `data` at byte offset `off` in this byte order.
    ///
    /// # Panics
    ///
    /// Panics if `off + 2 > data.len()`. Callers must bounds-check first.
    pub(crate) fn u16_at(self, data: &[u8], off: usize) -> u16 {
        let raw = *data[off..].first_chunk().unwrap();
        match self {
            Self::Little => u16::from_le_bytes(raw),
            Self::Big => u16::from_be_bytes(raw),
        }
    }

    /// Read a `u32` from `data` at byte offset `off` in this byte order.
    ///
    /// # Panics
    ///
    /// Panics if `off + 4 > data.len()`. Callers must bounds-check first.
    pub(crate) fn u32_at(self, data: &[u8], off: usize) -> u32 {
        let raw = *data[off..].first_chunk().unwrap();
        match self {
            Self::Little => u32::from_le_bytes(raw),
            Self::Big => u32::from_be_bytes(raw),
        }
    }

    /// Serialize a `u32` in this byte order.
    #[must_use]
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }
}

/// Errors that can occur when opening or parsing an object file.
#[derive(Debug)]
pub enum ObjectError {
    /// Failed to read the file from disk.
    Io(io::Error),
    /// The file does not start with the ELF magic bytes.
    BadMagic,
    /// The ELF file is not 32-bit (`ELFCLASS32`).
    UnsupportedClass,
    /// The ELF version marker is not `EV_CURRENT`.
    UnsupportedVersion,
    /// The declared data encoding is neither little- nor big-endian.
    UnsupportedEncoding,
    /// The input data is too short for the declared structure.
    Truncated,
    /// A table offset or size is out of bounds.
    InvalidOffset,
    /// The object has no `.symtab` section.
    MissingSymbolTable,
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "i/o error: {err}"),
            Self::BadMagic => write!(f, "invalid ELF magic number"),
            Self::UnsupportedClass => write!(f, "unsupported ELF class (expected ELFCLASS32)"),
            Self::UnsupportedVersion => write!(f, "unsupported ELF version number"),
            Self::UnsupportedEncoding => write!(f, "unknown data encoding in e_ident[EI_DATA]"),
            Self::Truncated => write!(f, "object file truncated"),
            Self::InvalidOffset => write!(f, "table offset or size out of bounds"),
            Self::MissingSymbolTable => write!(f, "can't find symbol table"),
        }
    }
}

impl std::error::Error for ObjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ObjectError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Parsed ELF32 file header.
#[derive(Debug, Clone, Copy)]
pub struct Elf32Header {
    /// Byte order the object declares for its own fields.
    pub encoding: Encoding,
    /// Object file type (relocatable, executable, ...).
    pub e_type: u16,
    /// Target machine architecture.
    pub e_machine: u16,
    /// File format version.
    pub e_version: u32,
    /// Address of the entry point.
    pub e_entry: u32,
    /// Offset of the program header table in the file.
    pub e_phoff: u32,
    /// Offset of the section header table in the file.
    pub e_shoff: u32,
    /// Processor-specific flags.
    pub e_flags: u32,
    /// Size of this header.
    pub e_ehsize: u16,
    /// Size of each program header entry.
    pub e_phentsize: u16,
    /// Number of program header entries.
    pub e_phnum: u16,
    /// Size of each section header entry.
    pub e_shentsize: u16,
    /// Number of section header entries.
    pub e_shnum: u16,
    /// Section header string table index.
    pub e_shstrndx: u16,
}

impl Elf32Header {
    /// Parse an ELF32 file header from raw bytes.
    ///
    /// Validates the magic, the 32-bit class, the version marker, and that
    /// the section header table fits within `data`. The machine type is not
    /// restricted; the tools handle any 32-bit target.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError`] if validation fails or the data is too short.
    pub fn parse(data: &[u8]) -> Result<Self, ObjectError> {
        if data.len() < ELF32_EHDR_SIZE {
            return Err(ObjectError::Truncated);
        }

        if data[..4] != ELF_MAGIC {
            return Err(ObjectError::BadMagic);
        }

        // e_ident[EI_CLASS] at byte 4
        if data[4] != ELFCLASS32 {
            return Err(ObjectError::UnsupportedClass);
        }

        // e_ident[EI_DATA] at byte 5 selects the decoder for every
        // multi-byte field that follows
        let enc = Encoding::from_ident(data[5]).ok_or(ObjectError::UnsupportedEncoding)?;

        // e_ident[EI_VERSION] at byte 6
        if data[6] != EV_CURRENT {
            return Err(ObjectError::UnsupportedVersion);
        }

        // Offsets are safe because we checked len >= 52 above
        let header = Self {
            encoding: enc,
            e_type: enc.u16_at(data, 16),
            e_machine: enc.u16_at(data, 18),
            e_version: enc.u32_at(data, 20),
            e_entry: enc.u32_at(data, 24),
            e_phoff: enc.u32_at(data, 28),
            e_shoff: enc.u32_at(data, 32),
            e_flags: enc.u32_at(data, 36),
            e_ehsize: enc.u16_at(data, 40),
            e_phentsize: enc.u16_at(data, 42),
            e_phnum: enc.u16_at(data, 44),
            e_shentsize: enc.u16_at(data, 46),
            e_shnum: enc.u16_at(data, 48),
            e_shstrndx: enc.u16_at(data, 50),
        };

        // Validate the section header table bounds before anything
        // dereferences it
        if header.e_shnum > 0 {
            if (header.e_shentsize as usize) < ELF32_SHDR_SIZE {
                return Err(ObjectError::InvalidOffset);
            }
            let sh_end = u64::from(header.e_shoff)
                + u64::from(header.e_shnum) * u64::from(header.e_shentsize);
            if sh_end > data.len() as u64 {
                return Err(ObjectError::InvalidOffset);
            }
            if header.e_shstrndx >= header.e_shnum {
                return Err(ObjectError::InvalidOffset);
            }
        }

        Ok(header)
    }
}
