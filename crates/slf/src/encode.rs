//! Static load file generation from an ELF object.
//!
//! The encoder extracts the `.text`, `.data`, and `.bss` sections, formats
//! the 108-byte header, and writes header plus stored segments. Segments
//! are stored raw or as LZMA archives; `.bss` is never stored, only its
//! target address and size are recorded.

use core::fmt;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use staticload_elf::ObjectFile;

use crate::archive::{self, ArchiveError};
use crate::header::{CompressionKind, FILE_MARKER, HEADER_SIZE, LoadFileHeader};

/// Section holding executable code.
pub const CODE_SECTION: &str = ".text";

/// Section holding initialized data.
pub const DATA_SECTION: &str = ".data";

/// Section holding zero-initialized data.
pub const BSS_SECTION: &str = ".bss";

/// Encoder configuration.
#[derive(Debug, Default, Clone)]
pub struct EncodeOptions {
    /// Store segments as LZMA archives instead of raw bytes.
    pub compress: bool,
    /// Object name to record, overriding the entry point symbol's name.
    pub object_name: Option<String>,
    /// Entry point name to record, overriding the entry point symbol's
    /// name.
    pub entry_point_name: Option<String>,
}

/// Errors from encoding a load file.
#[derive(Debug)]
pub enum EncodeError {
    /// The object has no `.text` section.
    MissingCodeSection,
    /// No symbol matches the entry point address and neither name override
    /// was given.
    UnresolvedEntryPointName,
    /// A segment failed to compress.
    Archive(ArchiveError),
    /// Writing the output failed.
    Io(io::Error),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCodeSection => write!(f, "object has no {CODE_SECTION} section"),
            Self::UnresolvedEntryPointName => write!(
                f,
                "can't find entry point symbol, override entry point name and object name"
            ),
            Self::Archive(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Archive(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ArchiveError> for EncodeError {
    fn from(err: ArchiveError) -> Self {
        Self::Archive(err)
    }
}

impl From<io::Error> for EncodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Encodes `object` as a static load file and writes it to `out`.
///
/// Header fields are serialized in the object's declared byte order; the
/// file is meant to be loaded on a target of that endianness. Returns the
/// header that was written.
///
/// # Errors
///
/// Returns [`EncodeError::MissingCodeSection`] when the object has no
/// `.text` section, [`EncodeError::UnresolvedEntryPointName`] when no
/// symbol matches the entry point and the overrides don't cover for it,
/// [`EncodeError::Archive`] on compression failure, and
/// [`EncodeError::Io`] on write failure.
pub fn encode(
    object: &ObjectFile,
    options: &EncodeOptions,
    out: &mut impl Write,
) -> Result<LoadFileHeader, EncodeError> {
    let code = object
        .read_section_by_name(CODE_SECTION)
        .ok_or(EncodeError::MissingCodeSection)?;
    let data = object.read_section_by_name(DATA_SECTION);
    let bss = object.read_section_by_name(BSS_SECTION);

    let entry_point = object.entry_point();
    let entry_symbol = object.read_symbol_by_value(entry_point);

    // Without a matching symbol, both names must come from the options or
    // the header would go out with blank fields
    if entry_symbol.is_none()
        && (options.entry_point_name.is_none() || options.object_name.is_none())
    {
        return Err(EncodeError::UnresolvedEntryPointName);
    }

    let code_bytes = code.data.unwrap_or(&[]);
    let data_bytes = data.as_ref().and_then(|s| s.data);

    let stored_code: Cow<'_, [u8]> = if options.compress {
        Cow::Owned(archive::compress(code_bytes)?)
    } else {
        Cow::Borrowed(code_bytes)
    };
    let stored_data: Option<Cow<'_, [u8]>> = match data_bytes {
        Some(bytes) if options.compress => Some(Cow::Owned(archive::compress(bytes)?)),
        Some(bytes) => Some(Cow::Borrowed(bytes)),
        None => None,
    };

    let mut header = LoadFileHeader {
        marker: FILE_MARKER,
        entry_point,
        flags: if options.compress {
            CompressionKind::Lzma.flags()
        } else {
            CompressionKind::Uncompressed.flags()
        },
        code_target: code.addr,
        code_size: stored_len(&stored_code)?,
        code_offset: HEADER_SIZE as u32,
        ..LoadFileHeader::default()
    };

    if let (Some(section), Some(stored)) = (&data, &stored_data) {
        header.data_target = section.addr;
        header.data_size = stored_len(stored)?;
        header.data_offset = segment_offset(header.code_offset, header.code_size)?;
    }

    if let Some(section) = &bss {
        if section.size > 0 {
            header.bss_target = section.addr;
            header.bss_size = section.size;
        }
    }

    let symbol_name = entry_symbol.map(|s| s.name).unwrap_or("");
    header.set_object_name(options.object_name.as_deref().unwrap_or(symbol_name));
    header.set_entry_point_name(options.entry_point_name.as_deref().unwrap_or(symbol_name));

    out.write_all(&header.to_bytes(object.encoding()))?;
    out.write_all(&stored_code)?;
    if let Some(stored) = &stored_data {
        out.write_all(stored)?;
    }

    Ok(header)
}

/// Encodes `object` into a load file at `path`.
///
/// # Errors
///
/// Same as [`encode`], plus [`EncodeError::Io`] when the file cannot be
/// created.
pub fn write_load_file(
    object: &ObjectFile,
    options: &EncodeOptions,
    path: &Path,
) -> Result<LoadFileHeader, EncodeError> {
    let mut out = BufWriter::new(File::create(path)?);
    let header = encode(object, options, &mut out)?;
    out.flush()?;
    Ok(header)
}

fn stored_len(bytes: &[u8]) -> Result<u32, EncodeError> {
    u32::try_from(bytes.len()).map_err(|_| EncodeError::Archive(ArchiveError::TooLarge(bytes.len())))
}

/// File offset of the segment following one of `stored` bytes at `base`.
/// The sum can exceed the header's offset field for stored segments close
/// to 4 GiB.
fn segment_offset(base: u32, stored: u32) -> Result<u32, EncodeError> {
    base.checked_add(stored).ok_or(EncodeError::Archive(ArchiveError::TooLarge(
        base as usize + stored as usize,
    )))
}
