//! Object file handle: eager table parsing and section/symbol lookup.
//!
//! An [`ObjectFile`] owns the raw bytes of one opened object plus its parsed
//! section and symbol tables. Dropping the handle releases everything, and
//! independent handles may coexist.

use std::fmt::Write as _;
use std::ops::Range;
use std::path::Path;
use std::fs;

use crate::header::{ELF32_SYM_SIZE, Elf32Header, Encoding, ObjectError};
use crate::section::{Elf32SectionHeader, StringTable};
use crate::symbol::Elf32Symbol;

/// Conventional name of the symbol table section.
const SYMTAB_SECTION: &str = ".symtab";

/// A named section extracted from an object file.
///
/// `data` is `None` for sections that occupy no space in the file
/// (`SHT_NOBITS`, i.e. `.bss`) and for empty sections; the address and size
/// are still meaningful for those.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    /// Section name.
    pub name: &'a str,
    /// Virtual address the section is linked at.
    pub addr: u32,
    /// Size of the section in memory.
    pub size: u32,
    /// File-resident bytes, if any.
    pub data: Option<&'a [u8]>,
}

/// A named symbol extracted from an object file.
#[derive(Debug, Clone, Copy)]
pub struct Symbol<'a> {
    /// Symbol name.
    pub name: &'a str,
    /// Symbol value (address).
    pub addr: u32,
    /// Symbol size in bytes.
    pub size: u32,
    /// Name of the containing section, when the symbol has one.
    pub section_name: Option<&'a str>,
    /// The symbol's file-resident bytes, when it has a containing section
    /// with file data and a nonzero size.
    pub data: Option<&'a [u8]>,
}

/// An opened 32-bit object file.
///
/// Construction parses the file header, the section header table with its
/// name string table, and the symbol table with its linked string table, all
/// up front. Every table offset is validated against the file length before
/// it is dereferenced, so the lookup methods never touch out-of-range bytes.
#[derive(Debug)]
pub struct ObjectFile {
    data: Vec<u8>,
    header: Elf32Header,
    sections: Vec<Elf32SectionHeader>,
    shstrtab: Range<usize>,
    symbols: Vec<Elf32Symbol>,
    symstrtab: Range<usize>,
}

impl ObjectFile {
    /// Opens and parses the object file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Io`] when the file cannot be read, or any of
    /// the parse errors described on [`ObjectFile::parse`].
    pub fn open(path: &Path) -> Result<Self, ObjectError> {
        let data = fs::read(path)?;
        Self::parse(data)
    }

    /// Parses an object file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError`] when the header is malformed (bad magic,
    /// class, version, or encoding), a table falls outside the file, or the
    /// symbol table is missing.
    pub fn parse(data: Vec<u8>) -> Result<Self, ObjectError> {
        let header = Elf32Header::parse(&data)?;
        let enc = header.encoding;

        // Section header table; entry 0 is the reserved null section and is
        // parsed but never matched by lookups.
        let mut sections = Vec::with_capacity(header.e_shnum as usize);
        for i in 0..header.e_shnum as usize {
            let off = header.e_shoff as usize + i * header.e_shentsize as usize;
            sections.push(Elf32SectionHeader::parse(&data, off, enc));
        }

        // Every file-resident section must lie within the file
        for shdr in sections.iter().skip(1) {
            if !shdr.is_nobits() && shdr.sh_size > 0 {
                section_range(&data, shdr)?;
            }
        }

        let shstrtab = match sections.get(header.e_shstrndx as usize) {
            Some(shdr) if !sections.is_empty() => section_range(&data, shdr)?,
            _ => 0..0,
        };

        let (symbols, symstrtab) = parse_symtab(&data, enc, &sections, &shstrtab)?;

        Ok(Self {
            data,
            header,
            sections,
            shstrtab,
            symbols,
            symstrtab,
        })
    }

    /// Returns the entry point address from the file header.
    #[must_use]
    pub fn entry_point(&self) -> u32 {
        self.header.e_entry
    }

    /// Returns the byte order the object declares for its fields. The
    /// encoder serializes load-file headers in this order.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.header.encoding
    }

    /// Returns the parsed file header.
    #[must_use]
    pub fn header(&self) -> &Elf32Header {
        &self.header
    }

    /// Looks up a section by exact name and reads its contents.
    ///
    /// Linear scan of the section table, skipping the reserved entry 0;
    /// first match wins. Returns `None` when no section has that name —
    /// absence is not an error here, the caller decides whether it is.
    #[must_use]
    pub fn read_section_by_name(&self, name: &str) -> Option<Section<'_>> {
        let shdr = self.find_section(name)?;
        let data = if shdr.sh_size > 0 && !shdr.is_nobits() {
            let start = shdr.sh_offset as usize;
            Some(&self.data[start..start + shdr.sh_size as usize])
        } else {
            None
        };
        Some(Section {
            name: self.section_names().get(shdr.sh_name).unwrap_or(""),
            addr: shdr.sh_addr,
            size: shdr.sh_size,
            data,
        })
    }

    /// Returns true when a section with the given name exists.
    #[must_use]
    pub fn section_exists(&self, name: &str) -> bool {
        self.find_section(name).is_some()
    }

    /// Looks up a symbol by value (address), restricted to untyped,
    /// data-object, and function symbols.
    ///
    /// Linear scan of the symbol table, skipping the reserved entry 0;
    /// first match wins.
    #[must_use]
    pub fn read_symbol_by_value(&self, addr: u32) -> Option<Symbol<'_>> {
        let sym = self
            .symbols
            .iter()
            .skip(1)
            .find(|s| s.st_value == addr && s.is_entry_candidate())?;
        Some(self.resolve_symbol(sym))
    }

    /// Looks up a symbol by exact name (any symbol type).
    #[must_use]
    pub fn read_symbol_by_name(&self, name: &str) -> Option<Symbol<'_>> {
        let names = self.symbol_names();
        let sym = self
            .symbols
            .iter()
            .skip(1)
            .find(|s| names.get(s.st_name) == Some(name))?;
        Some(self.resolve_symbol(sym))
    }

    /// Returns true when a symbol with the given name exists.
    #[must_use]
    pub fn symbol_exists(&self, name: &str) -> bool {
        let names = self.symbol_names();
        self.symbols
            .iter()
            .skip(1)
            .any(|s| names.get(s.st_name) == Some(name))
    }

    /// Renders the file header, section table, and symbol table as text for
    /// console dumps.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let h = &self.header;
        let _ = writeln!(out, "ELF header:");
        let _ = writeln!(out, "   encoding               = {:?}", h.encoding);
        let _ = writeln!(out, "   e_type                 = {}", h.e_type);
        let _ = writeln!(out, "   e_machine              = {}", h.e_machine);
        let _ = writeln!(out, "   e_version              = {}", h.e_version);
        let _ = writeln!(out, "   e_entry                = {:#010x}", h.e_entry);
        let _ = writeln!(out, "   e_phoff                = {}", h.e_phoff);
        let _ = writeln!(out, "   e_shoff                = {}", h.e_shoff);
        let _ = writeln!(out, "   e_flags                = {:#010x}", h.e_flags);
        let _ = writeln!(out, "   e_phnum                = {}", h.e_phnum);
        let _ = writeln!(out, "   e_shnum                = {}", h.e_shnum);
        let _ = writeln!(out, "   e_shstrndx             = {}", h.e_shstrndx);

        let names = self.section_names();
        for (i, s) in self.sections.iter().enumerate().skip(1) {
            let _ = writeln!(
                out,
                "Section #{i}: {}",
                names.get(s.sh_name).unwrap_or("<bad name>")
            );
            let _ = writeln!(out, "   sh_type                = {:#010x}", s.sh_type);
            let _ = writeln!(out, "   sh_flags               = {:#010x}", s.sh_flags);
            let _ = writeln!(out, "   sh_addr                = {:#010x}", s.sh_addr);
            let _ = writeln!(out, "   sh_offset              = {:#010x}", s.sh_offset);
            let _ = writeln!(out, "   sh_size                = {:#010x}", s.sh_size);
            let _ = writeln!(out, "   sh_link                = {}", s.sh_link);
        }

        let sym_names = self.symbol_names();
        for (i, s) in self.symbols.iter().enumerate().skip(1) {
            let _ = writeln!(
                out,
                "Symbol #{i}: {}",
                sym_names.get(s.st_name).unwrap_or("<bad name>")
            );
            let _ = writeln!(out, "   st_value               = {:#010x}", s.st_value);
            let _ = writeln!(out, "   st_size                = {:#010x}", s.st_size);
            let _ = writeln!(out, "   st_info                = {:#04x}", s.st_info);
            let _ = writeln!(out, "   st_shndx               = {:#06x}", s.st_shndx);
        }
        out
    }

    fn section_names(&self) -> StringTable<'_> {
        StringTable::new(&self.data[self.shstrtab.clone()])
    }

    fn symbol_names(&self) -> StringTable<'_> {
        StringTable::new(&self.data[self.symstrtab.clone()])
    }

    fn find_section(&self, name: &str) -> Option<&Elf32SectionHeader> {
        let names = self.section_names();
        self.sections
            .iter()
            .skip(1)
            .find(|s| names.get(s.sh_name) == Some(name))
    }

    /// Attaches name, section, and file data to a raw symbol table entry.
    ///
    /// Symbols whose section index is reserved carry no section data; so do
    /// zero-sized symbols, symbols inside `SHT_NOBITS` sections, and symbols
    /// whose recorded value falls outside their containing section.
    fn resolve_symbol(&self, sym: &Elf32Symbol) -> Symbol<'_> {
        let name = self.symbol_names().get(sym.st_name).unwrap_or("");
        let mut section_name = None;
        let mut data = None;

        if sym.has_section() {
            if let Some(shdr) = self.sections.get(sym.st_shndx as usize) {
                section_name = self.section_names().get(shdr.sh_name);
                if sym.st_size > 0 && !shdr.is_nobits() && sym.st_value >= shdr.sh_addr {
                    // The symbol table records no file offset. Its offset
                    // within the containing section is value - section
                    // address; add the section's file offset to locate the
                    // bytes in the file.
                    let rel = sym.st_value - shdr.sh_addr;
                    let in_bounds = rel
                        .checked_add(sym.st_size)
                        .is_some_and(|end| end <= shdr.sh_size);
                    if in_bounds {
                        let start = shdr.sh_offset as usize + rel as usize;
                        data = Some(&self.data[start..start + sym.st_size as usize]);
                    }
                }
            }
        }

        Symbol {
            name,
            addr: sym.st_value,
            size: sym.st_size,
            section_name,
            data,
        }
    }
}

/// Bounds-checks a section's file region and returns it as a byte range.
fn section_range(data: &[u8], shdr: &Elf32SectionHeader) -> Result<Range<usize>, ObjectError> {
    if shdr.is_nobits() || shdr.sh_size == 0 {
        return Ok(0..0);
    }
    let start = shdr.sh_offset as usize;
    let end = start
        .checked_add(shdr.sh_size as usize)
        .ok_or(ObjectError::InvalidOffset)?;
    if end > data.len() {
        return Err(ObjectError::InvalidOffset);
    }
    Ok(start..end)
}

/// Locates `.symtab`, parses its entries, and resolves its linked string
/// table via the section's `sh_link` field.
fn parse_symtab(
    data: &[u8],
    enc: Encoding,
    sections: &[Elf32SectionHeader],
    shstrtab: &Range<usize>,
) -> Result<(Vec<Elf32Symbol>, Range<usize>), ObjectError> {
    let names = StringTable::new(&data[shstrtab.clone()]);
    let symtab = sections
        .iter()
        .skip(1)
        .find(|s| names.get(s.sh_name) == Some(SYMTAB_SECTION))
        .ok_or(ObjectError::MissingSymbolTable)?;

    // A NOBITS symbol table has no file bytes to parse; entry offsets are
    // derived from the validated byte range, never from sh_size alone
    if symtab.is_nobits() || (symtab.sh_entsize as usize) < ELF32_SYM_SIZE {
        return Err(ObjectError::InvalidOffset);
    }
    let range = section_range(data, symtab)?;
    let count = range.len() / symtab.sh_entsize as usize;

    let mut symbols = Vec::with_capacity(count);
    for i in 0..count {
        let off = range.start + i * symtab.sh_entsize as usize;
        symbols.push(Elf32Symbol::parse(data, off, enc));
    }

    let strtab = sections
        .get(symtab.sh_link as usize)
        .filter(|_| symtab.sh_link != 0)
        .ok_or(ObjectError::InvalidOffset)?;
    let symstrtab = section_range(data, strtab)?;

    Ok((symbols, symstrtab))
}
