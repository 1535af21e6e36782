//! Static load file encoding, decoding, and loading.
//!
//! A static load file packages the `.text`, `.data`, and `.bss` segments of
//! a statically linked object behind a fixed 108-byte header, ready to be
//! copied to its link addresses and started at the recorded entry point.
//! Segments are stored raw or as LZMA archives.
//!
//! [`encode`] turns a parsed ELF object into a load file; [`load`] places
//! one into [`TargetMemory`]. Files carry their fields in the byte order of
//! the target that loads them, which is also the byte order the source
//! object declares.

mod archive;
mod encode;
mod header;
mod load;
mod target;

#[cfg(test)]
mod tests;

pub use archive::ArchiveError;
pub use encode::{
    BSS_SECTION, CODE_SECTION, DATA_SECTION, EncodeError, EncodeOptions, encode, write_load_file,
};
pub use header::{CompressionKind, FILE_MARKER, HEADER_SIZE, LoadFileHeader, NAME_SIZE};
pub use load::{LoadError, load, load_file};
pub use target::{RamRegion, TargetMemory};
