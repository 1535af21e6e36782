//! Static load file loading.
//!
//! The loader reads the 108-byte header, validates the marker and storage
//! flags, places the code and data segments into target memory, and zero
//! fills the BSS region. Header fields are read in the host's byte order;
//! load files are generated for the endianness of the machine that loads
//! them.
//!
//! Failure contract: when the header cannot be read at all the caller's
//! header is left untouched; when anything goes wrong after that, the
//! caller's header is zeroed so no stale entry point or segment addresses
//! survive a failed load.

use core::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::archive::{self, ArchiveError};
use crate::header::{CompressionKind, FILE_MARKER, HEADER_SIZE, LoadFileHeader};
use crate::target::TargetMemory;

/// Errors from loading a static load file.
#[derive(Debug)]
pub enum LoadError {
    /// The file could not be opened.
    Open(io::Error),
    /// The file ended before the header or a segment was fully read.
    ShortRead,
    /// The first header field is not the file marker.
    BadMarker(u32),
    /// The header's flags name no supported storage format.
    UnsupportedCompression(u32),
    /// A segment does not fit the destination memory.
    BadTargetRegion {
        /// Target address of the rejected segment.
        addr: u32,
        /// Size of the rejected segment.
        size: u32,
    },
    /// A compressed segment is malformed.
    Archive(ArchiveError),
    /// Reading the file failed.
    Io(io::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(err) => write!(f, "can't open load file: {err}"),
            Self::ShortRead => write!(f, "load file ended unexpectedly"),
            Self::BadMarker(marker) => {
                write!(f, "bad file marker {marker:#010x}, expected {FILE_MARKER:#010x}")
            }
            Self::UnsupportedCompression(flags) => {
                write!(f, "unsupported compression flags {flags}")
            }
            Self::BadTargetRegion { addr, size } => {
                write!(f, "segment of {size} bytes at {addr:#010x} outside target memory")
            }
            Self::Archive(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open(err) | Self::Io(err) => Some(err),
            Self::Archive(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ArchiveError> for LoadError {
    fn from(err: ArchiveError) -> Self {
        Self::Archive(err)
    }
}

/// Loads the static load file at `path` into `memory`.
///
/// On success `header_out` holds the file's header, including the entry
/// point and names the caller needs to start the loaded object. See
/// [`load`] for the failure contract.
///
/// # Errors
///
/// [`LoadError::Open`] when the file cannot be opened, plus everything
/// [`load`] returns.
pub fn load_file(
    path: &Path,
    memory: &mut impl TargetMemory,
    header_out: &mut LoadFileHeader,
) -> Result<(), LoadError> {
    let file = File::open(path).map_err(LoadError::Open)?;
    load(&mut BufReader::new(file), memory, header_out)
}

/// Loads a static load file from a seekable source into `memory`.
///
/// If the header itself cannot be read, `header_out` is left untouched.
/// Any later failure zeroes `header_out` before returning, so the caller
/// never sees a header for an object that is not fully in memory.
///
/// # Errors
///
/// [`LoadError::ShortRead`] on truncation, [`LoadError::BadMarker`] and
/// [`LoadError::UnsupportedCompression`] for invalid headers,
/// [`LoadError::BadTargetRegion`] when a segment does not fit `memory`,
/// [`LoadError::Archive`] for corrupt compressed segments, and
/// [`LoadError::Io`] for other read failures.
pub fn load<R: Read + Seek>(
    source: &mut R,
    memory: &mut impl TargetMemory,
    header_out: &mut LoadFileHeader,
) -> Result<(), LoadError> {
    let mut raw = [0u8; HEADER_SIZE];
    if let Err(err) = source.read_exact(&mut raw) {
        return Err(short_read_or_io(err));
    }
    *header_out = LoadFileHeader::from_ne_bytes(&raw);

    if let Err(err) = apply(source, memory, header_out) {
        header_out.clear();
        return Err(err);
    }
    Ok(())
}

/// Validates the header and places every segment it describes.
fn apply<R: Read + Seek>(
    source: &mut R,
    memory: &mut impl TargetMemory,
    header: &LoadFileHeader,
) -> Result<(), LoadError> {
    if header.marker != FILE_MARKER {
        return Err(LoadError::BadMarker(header.marker));
    }
    let kind = CompressionKind::from_flags(header.flags)
        .ok_or(LoadError::UnsupportedCompression(header.flags))?;

    if header.has_code() {
        place_segment(
            source,
            memory,
            kind,
            header.code_target,
            header.code_size,
            header.code_offset,
        )?;
    }
    if header.has_data() {
        place_segment(
            source,
            memory,
            kind,
            header.data_target,
            header.data_size,
            header.data_offset,
        )?;
    }
    if header.has_bss() {
        let region = memory
            .region_mut(header.bss_target, header.bss_size)
            .ok_or(LoadError::BadTargetRegion {
                addr: header.bss_target,
                size: header.bss_size,
            })?;
        region.fill(0);
    }
    Ok(())
}

/// Reads one stored segment and writes it to its target address.
fn place_segment<R: Read + Seek>(
    source: &mut R,
    memory: &mut impl TargetMemory,
    kind: CompressionKind,
    target: u32,
    stored_size: u32,
    offset: u32,
) -> Result<(), LoadError> {
    source
        .seek(SeekFrom::Start(u64::from(offset)))
        .map_err(LoadError::Io)?;

    match kind {
        CompressionKind::Uncompressed => {
            let region = memory
                .region_mut(target, stored_size)
                .ok_or(LoadError::BadTargetRegion {
                    addr: target,
                    size: stored_size,
                })?;
            source.read_exact(region).map_err(short_read_or_io)?;
        }
        CompressionKind::Lzma => {
            let mut stored = vec![0u8; stored_size as usize];
            source.read_exact(&mut stored).map_err(short_read_or_io)?;
            // The archive's own size field tells us how large the target
            // region has to be
            let unpacked = archive::unpacked_size(&stored)?;
            let region = memory
                .region_mut(target, unpacked)
                .ok_or(LoadError::BadTargetRegion {
                    addr: target,
                    size: unpacked,
                })?;
            archive::decompress_into(&stored, region)?;
        }
    }
    Ok(())
}

fn short_read_or_io(err: io::Error) -> LoadError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        LoadError::ShortRead
    } else {
        LoadError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{EncodeOptions, encode, write_load_file};
    use crate::target::RamRegion;
    use crate::tests::{BuiltObject, TestObject};
    use staticload_elf::Encoding;
    use std::io::Cursor;

    /// Three disjoint RAM regions, one per segment.
    struct TestMemory {
        code: RamRegion,
        data: RamRegion,
        bss: RamRegion,
    }

    impl TestMemory {
        fn for_object(obj: &BuiltObject) -> Self {
            Self {
                code: RamRegion::new(TestObject::TEXT_ADDR, obj.text.len()),
                data: RamRegion::new(TestObject::DATA_ADDR, obj.data.len()),
                bss: RamRegion::new(TestObject::BSS_ADDR, TestObject::BSS_SIZE as usize),
            }
        }
    }

    impl TargetMemory for TestMemory {
        fn region_mut(&mut self, addr: u32, size: u32) -> Option<&mut [u8]> {
            if let Some(region) = self.code.region_mut(addr, size) {
                return Some(region);
            }
            if let Some(region) = self.data.region_mut(addr, size) {
                return Some(region);
            }
            self.bss.region_mut(addr, size)
        }
    }

    fn encode_to_vec(obj: &BuiltObject, compress: bool) -> Vec<u8> {
        let options = EncodeOptions {
            compress,
            ..EncodeOptions::default()
        };
        let mut out = Vec::new();
        encode(&obj.object, &options, &mut out).unwrap();
        out
    }

    fn sentinel_header() -> LoadFileHeader {
        let mut header = LoadFileHeader {
            marker: 0x5a5a_5a5a,
            entry_point: 0x5a5a_5a5a,
            bss_size: 0x5a5a_5a5a,
            ..LoadFileHeader::default()
        };
        header.set_object_name("stale");
        header
    }

    #[test]
    fn load_uncompressed() {
        let obj = TestObject::default().build();
        let file = encode_to_vec(&obj, false);
        let mut memory = TestMemory::for_object(&obj);
        // Pre-dirty BSS so the zero fill is observable
        memory.bss.bytes_mut().fill(0xff);

        let mut header = LoadFileHeader::default();
        load(&mut Cursor::new(&file), &mut memory, &mut header).unwrap();

        assert_eq!(header.marker, FILE_MARKER);
        assert_eq!(header.entry_point, TestObject::TEXT_ADDR);
        assert_eq!(header.entry_point_name(), "app_main");
        assert_eq!(header.object_name(), "app_main");
        assert_eq!(memory.code.bytes(), &obj.text[..]);
        assert_eq!(memory.data.bytes(), &obj.data[..]);
        assert!(memory.bss.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn load_compressed() {
        let obj = TestObject::default().build();
        let file = encode_to_vec(&obj, true);
        assert!(file.len() < HEADER_SIZE + obj.text.len() + obj.data.len());

        let mut memory = TestMemory::for_object(&obj);
        let mut header = LoadFileHeader::default();
        load(&mut Cursor::new(&file), &mut memory, &mut header).unwrap();

        assert_eq!(header.flags, CompressionKind::FLAG_LZMA);
        assert_eq!(memory.code.bytes(), &obj.text[..]);
        assert_eq!(memory.data.bytes(), &obj.data[..]);
    }

    #[test]
    fn load_flight_sized_segments() {
        // Sizes on the order of a real flight application image
        let obj = TestObject {
            text: (0u32..500_000).map(|i| (i % 83) as u8).collect(),
            data: (0u32..30_000).map(|i| (i % 19) as u8).collect(),
            bss_size: 3_000,
            ..TestObject::default()
        }
        .build();

        for compress in [false, true] {
            let file = encode_to_vec(&obj, compress);
            let mut memory = TestMemory {
                bss: RamRegion::new(TestObject::BSS_ADDR, 3_000),
                ..TestMemory::for_object(&obj)
            };
            let mut header = LoadFileHeader::default();
            load(&mut Cursor::new(&file), &mut memory, &mut header).unwrap();
            assert_eq!(memory.code.bytes(), &obj.text[..]);
            assert_eq!(memory.data.bytes(), &obj.data[..]);
            assert_eq!(header.bss_size, 3_000);
        }
    }

    #[test]
    fn load_file_round_trip_on_disk() {
        let obj = TestObject::default().build();
        let path = std::env::temp_dir().join(format!(
            "staticload-slf-roundtrip-{}.slf",
            std::process::id()
        ));
        let options = EncodeOptions {
            compress: true,
            ..EncodeOptions::default()
        };
        let written = write_load_file(&obj.object, &options, &path).unwrap();

        let mut memory = TestMemory::for_object(&obj);
        let mut header = LoadFileHeader::default();
        load_file(&path, &mut memory, &mut header).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(header, written);
        assert_eq!(memory.code.bytes(), &obj.text[..]);
    }

    #[test]
    fn load_is_idempotent() {
        let obj = TestObject::default().build();
        let file = encode_to_vec(&obj, false);
        let mut memory = TestMemory::for_object(&obj);
        let mut first = LoadFileHeader::default();
        load(&mut Cursor::new(&file), &mut memory, &mut first).unwrap();
        let snapshot = memory.code.bytes().to_vec();

        let mut second = LoadFileHeader::default();
        load(&mut Cursor::new(&file), &mut memory, &mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(memory.code.bytes(), &snapshot[..]);
    }

    #[test]
    fn missing_file_is_open_error() {
        let mut memory = RamRegion::new(0, 16);
        let mut header = sentinel_header();
        let err = load_file(
            Path::new("/nonexistent/no-such.slf"),
            &mut memory,
            &mut header,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Open(_)));
        // Never read a header, so the caller's copy is untouched
        assert_eq!(header, sentinel_header());
    }

    #[test]
    fn short_header_leaves_caller_header_untouched() {
        let obj = TestObject::default().build();
        let file = encode_to_vec(&obj, false);
        let mut memory = TestMemory::for_object(&obj);
        let mut header = sentinel_header();

        let err = load(&mut Cursor::new(&file[..50]), &mut memory, &mut header).unwrap_err();
        assert!(matches!(err, LoadError::ShortRead));
        assert_eq!(header, sentinel_header());
    }

    #[test]
    fn bad_marker_zeroes_header() {
        let obj = TestObject::default().build();
        let mut file = encode_to_vec(&obj, false);
        file[..4].copy_from_slice(&0xdead_beefu32.to_ne_bytes());

        let mut memory = TestMemory::for_object(&obj);
        let mut header = sentinel_header();
        let err = load(&mut Cursor::new(&file), &mut memory, &mut header).unwrap_err();
        assert!(matches!(err, LoadError::BadMarker(0xdead_beef)));
        assert_eq!(header, LoadFileHeader::default());
    }

    #[test]
    fn gzip_flag_is_rejected() {
        let obj = TestObject::default().build();
        let mut file = encode_to_vec(&obj, false);
        // flags is the third header field
        file[8..12].copy_from_slice(&CompressionKind::FLAG_GZIP.to_ne_bytes());

        let mut memory = TestMemory::for_object(&obj);
        let mut header = sentinel_header();
        let err = load(&mut Cursor::new(&file), &mut memory, &mut header).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedCompression(3)));
        assert_eq!(header, LoadFileHeader::default());
    }

    #[test]
    fn truncated_segment_zeroes_header() {
        let obj = TestObject::default().build();
        let file = encode_to_vec(&obj, false);
        let mut memory = TestMemory::for_object(&obj);
        let mut header = sentinel_header();

        let err = load(
            &mut Cursor::new(&file[..HEADER_SIZE + 10]),
            &mut memory,
            &mut header,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::ShortRead));
        assert_eq!(header, LoadFileHeader::default());
    }

    #[test]
    fn segment_outside_memory_zeroes_header() {
        let obj = TestObject::default().build();
        let file = encode_to_vec(&obj, false);
        // Memory far away from every segment
        let mut memory = RamRegion::new(0x7000_0000, 0x1000);
        let mut header = sentinel_header();

        let err = load(&mut Cursor::new(&file), &mut memory, &mut header).unwrap_err();
        assert!(matches!(
            err,
            LoadError::BadTargetRegion {
                addr: TestObject::TEXT_ADDR,
                ..
            }
        ));
        assert_eq!(header, LoadFileHeader::default());
    }

    #[test]
    fn corrupt_archive_zeroes_header() {
        let obj = TestObject::default().build();
        let mut file = encode_to_vec(&obj, true);
        // Wreck the code archive's stream past its framing
        for byte in &mut file[HEADER_SIZE + 9..HEADER_SIZE + 13] {
            *byte = 0xff;
        }
        file.truncate(HEADER_SIZE + 16);
        // Keep the header consistent with the shorter stored segment
        let code_size = 16u32;
        file[16..20].copy_from_slice(&code_size.to_ne_bytes());
        file[28..44].fill(0); // drop the data segment

        let mut memory = TestMemory::for_object(&obj);
        let mut header = sentinel_header();
        let err = load(&mut Cursor::new(&file), &mut memory, &mut header).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Archive(_) | LoadError::BadTargetRegion { .. }
        ));
        assert_eq!(header, LoadFileHeader::default());
    }

    #[test]
    fn header_only_file_loads_nothing() {
        // No segments at all: a valid header is enough
        let header_in = LoadFileHeader {
            marker: FILE_MARKER,
            entry_point: 0x1234_5678,
            flags: CompressionKind::FLAG_UNCOMPRESSED,
            ..LoadFileHeader::default()
        };
        let file = header_in.to_bytes(Encoding::native());

        // Memory that rejects every request; it must never be asked
        struct NoMemory;
        impl TargetMemory for NoMemory {
            fn region_mut(&mut self, _addr: u32, _size: u32) -> Option<&mut [u8]> {
                None
            }
        }

        let mut header = LoadFileHeader::default();
        load(&mut Cursor::new(&file[..]), &mut NoMemory, &mut header).unwrap();
        assert_eq!(header.entry_point, 0x1234_5678);
        assert!(!header.has_code() && !header.has_data() && !header.has_bss());
    }
}
