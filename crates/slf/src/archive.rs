//! LZMA segment archives.
//!
//! A stored compressed segment is a small self-describing archive: the
//! 5-byte LZMA properties block, a little-endian `u32` uncompressed size,
//! then the raw LZMA stream. The size field lets the loader verify the
//! destination region before decoding a single byte.

use core::fmt;
use std::io::{self, Read};

use lzma_rs::compress::UnpackedSize as CompressUnpackedSize;
use lzma_rs::decompress::UnpackedSize as DecompressUnpackedSize;
use lzma_rs::{compress, decompress, lzma_compress_with_options, lzma_decompress_with_options};

/// Size of the LZMA properties block at the front of an archive.
const LZMA_PROPS_SIZE: usize = 5;

/// Size of the uncompressed-size field following the properties block.
const SIZE_FIELD_SIZE: usize = 4;

/// Minimum size of a non-empty archive.
const ARCHIVE_HEADER_SIZE: usize = LZMA_PROPS_SIZE + SIZE_FIELD_SIZE;

/// Extra output capacity reserved when compressing, covering the archive
/// framing and pathological inputs that grow under compression.
const COMPRESS_SLACK: usize = 500;

/// Errors from archiving or unarchiving a segment.
#[derive(Debug)]
pub enum ArchiveError {
    /// The segment is too large to record in the archive's size field.
    TooLarge(usize),
    /// The archive is shorter than its fixed framing.
    Truncated,
    /// The archive's declared uncompressed size does not match the
    /// destination.
    SizeMismatch {
        /// Size recorded in the archive.
        declared: u32,
        /// Size the caller expects.
        expected: u32,
    },
    /// The LZMA encoder failed.
    Compress(io::Error),
    /// The LZMA decoder failed or the stream is corrupt.
    Decompress(lzma_rs::error::Error),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge(size) => write!(f, "segment of {size} bytes too large to archive"),
            Self::Truncated => write!(f, "archive shorter than its header"),
            Self::SizeMismatch { declared, expected } => write!(
                f,
                "archive declares {declared} uncompressed bytes, expected {expected}"
            ),
            Self::Compress(err) => write!(f, "lzma compression failed: {err}"),
            Self::Decompress(err) => write!(f, "lzma decompression failed: {err:?}"),
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compress(err) => Some(err),
            _ => None,
        }
    }
}

/// Compresses a segment into an archive.
///
/// An empty input produces an empty archive.
///
/// # Errors
///
/// Returns [`ArchiveError::TooLarge`] when the input size does not fit the
/// archive's `u32` size field, or [`ArchiveError::Compress`] when the
/// encoder fails.
pub fn compress(input: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    let size = u32::try_from(input.len()).map_err(|_| ArchiveError::TooLarge(input.len()))?;

    // The encoder emits the properties block followed by the raw stream.
    // The uncompressed size is kept out of the stream header and recorded
    // in the archive's own size field instead.
    let options = compress::Options {
        unpacked_size: CompressUnpackedSize::SkipWritingToHeader,
    };
    let mut encoded = Vec::with_capacity(input.len() + COMPRESS_SLACK);
    lzma_compress_with_options(&mut &input[..], &mut encoded, &options)
        .map_err(ArchiveError::Compress)?;

    let mut archive = Vec::with_capacity(encoded.len() + SIZE_FIELD_SIZE);
    archive.extend_from_slice(&encoded[..LZMA_PROPS_SIZE]);
    archive.extend_from_slice(&size.to_le_bytes());
    archive.extend_from_slice(&encoded[LZMA_PROPS_SIZE..]);
    Ok(archive)
}

/// Reads the uncompressed size an archive declares.
///
/// An empty archive declares zero bytes.
///
/// # Errors
///
/// Returns [`ArchiveError::Truncated`] when the archive is shorter than its
/// fixed framing.
pub fn unpacked_size(archive: &[u8]) -> Result<u32, ArchiveError> {
    if archive.is_empty() {
        return Ok(0);
    }
    let raw = archive
        .get(LZMA_PROPS_SIZE..ARCHIVE_HEADER_SIZE)
        .ok_or(ArchiveError::Truncated)?;
    Ok(u32::from_le_bytes(raw.try_into().unwrap_or([0; 4])))
}

/// Decompresses an archive into `dest`, which must be exactly the declared
/// uncompressed size. Returns the number of archive bytes consumed.
///
/// An empty archive with an empty destination is a no-op success consuming
/// zero bytes.
///
/// # Errors
///
/// Returns [`ArchiveError::Truncated`] for a short archive,
/// [`ArchiveError::SizeMismatch`] when the declared size and `dest` length
/// disagree, or [`ArchiveError::Decompress`] for a corrupt stream.
pub fn decompress_into(archive: &[u8], dest: &mut [u8]) -> Result<usize, ArchiveError> {
    let declared = unpacked_size(archive)?;
    let expected = u32::try_from(dest.len()).map_err(|_| ArchiveError::TooLarge(dest.len()))?;
    if declared != expected {
        return Err(ArchiveError::SizeMismatch { declared, expected });
    }
    if archive.is_empty() {
        return Ok(0);
    }

    // Stitch the properties block back onto the stream, skipping the
    // archive's own size field, and hand the decoder the size out of band.
    // The stream slice advances as the decoder reads, which is how the
    // consumed count is recovered afterwards.
    let mut stream = &archive[ARCHIVE_HEADER_SIZE..];
    {
        let mut reader = (&archive[..LZMA_PROPS_SIZE]).chain(&mut stream);
        let options = decompress::Options {
            unpacked_size: DecompressUnpackedSize::UseProvided(Some(u64::from(declared))),
            ..decompress::Options::default()
        };
        let mut sink = io::Cursor::new(&mut *dest);
        lzma_decompress_with_options(&mut reader, &mut sink, &options)
            .map_err(ArchiveError::Decompress)?;
    }
    Ok(archive.len() - stream.len())
}
