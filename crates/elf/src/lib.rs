//! Reader for 32-bit ELF object files.
//!
//! Supports both little- and big-endian objects regardless of the host's
//! byte order: multi-byte fields are decoded in the order the file declares
//! in its identification bytes. Raw section contents are returned as-is and
//! never swapped.
//!
//! The entry point is [`ObjectFile`], which parses a whole object up front
//! and offers name- and value-based lookups over its sections and symbols.

mod header;
mod object;
mod section;
mod symbol;

pub use header::{ELF32_EHDR_SIZE, Elf32Header, Encoding, ObjectError};
pub use object::{ObjectFile, Section, Symbol};
pub use section::{Elf32SectionHeader, SHT_NOBITS, SHT_STRTAB, SHT_SYMTAB, StringTable};
pub use symbol::{
    Elf32Symbol, SHN_ABS, SHN_COMMON, SHN_LORESERVE, SHN_UNDEF, STT_FUNC, STT_NOTYPE, STT_OBJECT,
};
