//! Load file header layout and field access.
//!
//! The header is 108 bytes: eleven `u32` fields followed by two 32-byte
//! NUL-padded name strings. Files store every multi-byte field in the byte
//! order of the object they were generated from; the generating tool runs on
//! a host of matching endianness, so the loader reads fields in native
//! order without swapping.

use staticload_elf::Encoding;

/// Marker value identifying a static load file, first field of the header.
pub const FILE_MARKER: u32 = 0x10AD_F11E;

/// Size of each NUL-padded name field in the header.
pub const NAME_SIZE: usize = 32;

/// Total size of the serialized header.
pub const HEADER_SIZE: usize = 108;

/// Segment storage format, recorded in the header's flags field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    /// Segments are stored raw.
    Uncompressed,
    /// Segments are stored as LZMA archives.
    Lzma,
}

impl CompressionKind {
    /// Flags value for raw segment storage.
    pub const FLAG_UNCOMPRESSED: u32 = 1;

    /// Flags value for LZMA segment storage.
    pub const FLAG_LZMA: u32 = 2;

    /// Flags value reserved for gzip. Never written and always rejected on
    /// load.
    pub const FLAG_GZIP: u32 = 3;

    /// Maps a header flags value to a supported storage format.
    #[must_use]
    pub fn from_flags(flags: u32) -> Option<Self> {
        match flags {
            Self::FLAG_UNCOMPRESSED => Some(Self::Uncompressed),
            Self::FLAG_LZMA => Some(Self::Lzma),
            _ => None,
        }
    }

    /// Returns the flags value recorded in the header for this format.
    #[must_use]
    pub fn flags(self) -> u32 {
        match self {
            Self::Uncompressed => Self::FLAG_UNCOMPRESSED,
            Self::Lzma => Self::FLAG_LZMA,
        }
    }
}

/// Static load file header.
///
/// A segment is present when both its target address and its size are
/// nonzero. The BSS segment has no file offset; it is zero filled at load
/// time rather than stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFileHeader {
    /// File marker, [`FILE_MARKER`] in a valid file.
    pub marker: u32,
    /// Address execution starts at.
    pub entry_point: u32,
    /// Segment storage format flags.
    pub flags: u32,
    /// Target address of the code segment.
    pub code_target: u32,
    /// Stored size of the code segment. For compressed files this is the
    /// archive size; the uncompressed size lives inside the archive.
    pub code_size: u32,
    /// File offset of the code segment.
    pub code_offset: u32,
    /// Target address of the data segment.
    pub data_target: u32,
    /// Stored size of the data segment.
    pub data_size: u32,
    /// File offset of the data segment.
    pub data_offset: u32,
    /// Target address of the BSS segment.
    pub bss_target: u32,
    /// Size of the BSS segment.
    pub bss_size: u32,
    /// Name of the loaded object, NUL padded.
    pub object_name: [u8; NAME_SIZE],
    /// Name of the entry point symbol, NUL padded.
    pub entry_point_name: [u8; NAME_SIZE],
}

impl Default for LoadFileHeader {
    fn default() -> Self {
        Self {
            marker: 0,
            entry_point: 0,
            flags: 0,
            code_target: 0,
            code_size: 0,
            code_offset: 0,
            data_target: 0,
            data_size: 0,
            data_offset: 0,
            bss_target: 0,
            bss_size: 0,
            object_name: [0; NAME_SIZE],
            entry_point_name: [0; NAME_SIZE],
        }
    }
}

impl LoadFileHeader {
    /// Resets every field to zero. The loader does this on failure so a
    /// caller can never act on a half-populated header.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when the header describes a code segment.
    #[must_use]
    pub fn has_code(&self) -> bool {
        self.code_target != 0 && self.code_size > 0
    }

    /// True when the header describes a data segment.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data_target != 0 && self.data_size > 0
    }

    /// True when the header describes a BSS segment.
    #[must_use]
    pub fn has_bss(&self) -> bool {
        self.bss_target != 0 && self.bss_size > 0
    }

    /// Returns the object name up to its first NUL.
    #[must_use]
    pub fn object_name(&self) -> &str {
        name_str(&self.object_name)
    }

    /// Returns the entry point name up to its first NUL.
    #[must_use]
    pub fn entry_point_name(&self) -> &str {
        name_str(&self.entry_point_name)
    }

    /// Stores `name` into the object name field, truncated to fit with a
    /// terminating NUL.
    pub fn set_object_name(&mut self, name: &str) {
        set_name(&mut self.object_name, name);
    }

    /// Stores `name` into the entry point name field, truncated to fit with
    /// a terminating NUL.
    pub fn set_entry_point_name(&mut self, name: &str) {
        set_name(&mut self.entry_point_name, name);
    }

    /// Serializes the header with multi-byte fields in the given byte order.
    #[must_use]
    pub fn to_bytes(&self, enc: Encoding) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let fields = [
            self.marker,
            self.entry_point,
            self.flags,
            self.code_target,
            self.code_size,
            self.code_offset,
            self.data_target,
            self.data_size,
            self.data_offset,
            self.bss_target,
            self.bss_size,
        ];
        for (i, field) in fields.iter().enumerate() {
            buf[i * 4..i * 4 + 4].copy_from_slice(&enc.u32_bytes(*field));
        }
        buf[44..44 + NAME_SIZE].copy_from_slice(&self.object_name);
        buf[76..76 + NAME_SIZE].copy_from_slice(&self.entry_point_name);
        buf
    }

    /// Deserializes a header, reading multi-byte fields in the host's own
    /// byte order.
    #[must_use]
    pub fn from_ne_bytes(buf: &[u8; HEADER_SIZE]) -> Self {
        let field = |i: usize| {
            let raw: [u8; 4] = *buf[i * 4..].first_chunk().unwrap();
            u32::from_ne_bytes(raw)
        };
        let mut header = Self {
            marker: field(0),
            entry_point: field(1),
            flags: field(2),
            code_target: field(3),
            code_size: field(4),
            code_offset: field(5),
            data_target: field(6),
            data_size: field(7),
            data_offset: field(8),
            bss_target: field(9),
            bss_size: field(10),
            ..Self::default()
        };
        header.object_name.copy_from_slice(&buf[44..44 + NAME_SIZE]);
        header
            .entry_point_name
            .copy_from_slice(&buf[76..76 + NAME_SIZE]);
        header
    }
}

fn name_str(field: &[u8; NAME_SIZE]) -> &str {
    let end = field.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
    core::str::from_utf8(&field[..end]).unwrap_or("")
}

fn set_name(field: &mut [u8; NAME_SIZE], name: &str) {
    field.fill(0);
    let len = name.len().min(NAME_SIZE - 1);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
}
