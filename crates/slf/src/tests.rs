//! Shared test fixture: builds small ELF objects, by default in the host's
//! byte order since the loader reads load file headers in native order.

use staticload_elf::{Encoding, ObjectFile};

/// A built test object plus the section bytes that went into it.
pub(crate) struct BuiltObject {
    pub object: ObjectFile,
    pub text: Vec<u8>,
    pub data: Vec<u8>,
}

/// Configurable ELF object builder.
///
/// Emits `.text`, `.data`, and `.bss` sections and a symbol table with a
/// single `app_main` function symbol at [`TestObject::TEXT_ADDR`].
pub(crate) struct TestObject {
    pub text: Vec<u8>,
    pub data: Vec<u8>,
    pub bss_size: u32,
    pub entry_point: u32,
    pub with_text: bool,
    pub encoding: Encoding,
}

impl Default for TestObject {
    fn default() -> Self {
        Self {
            text: (0u32..0x200).map(|i| (i % 11) as u8).collect(),
            data: (0u32..0x80).map(|i| (i % 5) as u8 + 0xd0).collect(),
            bss_size: Self::BSS_SIZE,
            entry_point: Self::TEXT_ADDR,
            with_text: true,
            encoding: Encoding::native(),
        }
    }
}

impl TestObject {
    pub(crate) const TEXT_ADDR: u32 = 0x0100_0000;
    pub(crate) const DATA_ADDR: u32 = 0x0200_0000;
    pub(crate) const BSS_ADDR: u32 = 0x0300_0000;
    pub(crate) const BSS_SIZE: u32 = 0x40;

    pub(crate) fn build(self) -> BuiltObject {
        let buf = self.serialize();
        let object = ObjectFile::parse(buf).expect("test object parses");
        BuiltObject {
            object,
            text: self.text,
            data: self.data,
        }
    }

    fn serialize(&self) -> Vec<u8> {
        let enc = self.encoding;
        let u32f = |buf: &mut Vec<u8>, v: u32| buf.extend_from_slice(&enc.u32_bytes(v));
        let u16f = |buf: &mut Vec<u8>, v: u16| {
            buf.extend_from_slice(&match enc {
                Encoding::Little => v.to_le_bytes(),
                Encoding::Big => v.to_be_bytes(),
            });
        };
        let shdr = |buf: &mut Vec<u8>,
                    name: u32,
                    sh_type: u32,
                    addr: u32,
                    offset: u32,
                    size: u32,
                    link: u32,
                    entsize: u32| {
            u32f(buf, name);
            u32f(buf, sh_type);
            u32f(buf, 0);
            u32f(buf, addr);
            u32f(buf, offset);
            u32f(buf, size);
            u32f(buf, link);
            u32f(buf, 0);
            u32f(buf, 4);
            u32f(buf, entsize);
        };

        let shstrtab = b"\0.text\0.data\0.bss\0.strtab\0.symtab\0.shstrtab\0";
        let strtab = b"\0app_main\0";

        let text_len = u32::try_from(self.text.len()).unwrap();
        let data_len = u32::try_from(self.data.len()).unwrap();
        let text_off = 52u32;
        let data_off = text_off + text_len;
        let strtab_off = data_off + data_len;
        let symtab_off = strtab_off + strtab.len() as u32;
        let symtab_len = 2 * 16u32;
        let shstrtab_off = symtab_off + symtab_len;
        let shoff = shstrtab_off + shstrtab.len() as u32;

        let mut buf = Vec::new();
        buf.extend_from_slice(&[0x7f, b'E', b'L', b'F']);
        buf.push(1); // ELFCLASS32
        buf.push(match enc {
            Encoding::Little => 1,
            Encoding::Big => 2,
        });
        buf.push(1); // EV_CURRENT
        buf.extend_from_slice(&[0u8; 9]);
        u16f(&mut buf, 2); // e_type
        u16f(&mut buf, 40); // e_machine
        u32f(&mut buf, 1); // e_version
        u32f(&mut buf, self.entry_point);
        u32f(&mut buf, 0); // e_phoff
        u32f(&mut buf, shoff);
        u32f(&mut buf, 0); // e_flags
        u16f(&mut buf, 52); // e_ehsize
        u16f(&mut buf, 0); // e_phentsize
        u16f(&mut buf, 0); // e_phnum
        u16f(&mut buf, 40); // e_shentsize
        u16f(&mut buf, 7); // e_shnum
        u16f(&mut buf, 6); // e_shstrndx
        assert_eq!(buf.len(), 52);

        buf.extend_from_slice(&self.text);
        buf.extend_from_slice(&self.data);
        buf.extend_from_slice(strtab);

        // Symbols: null entry, then app_main at the text base
        buf.extend_from_slice(&[0u8; 16]);
        u32f(&mut buf, 1); // st_name: "app_main"
        u32f(&mut buf, Self::TEXT_ADDR);
        u32f(&mut buf, 0); // st_size
        buf.push(0x12); // STB_GLOBAL | STT_FUNC
        buf.push(0);
        u16f(&mut buf, 1); // st_shndx: .text

        buf.extend_from_slice(shstrtab);

        // A zero name offset hides .text from name lookups
        let text_name = if self.with_text { 1 } else { 0 };
        shdr(&mut buf, 0, 0, 0, 0, 0, 0, 0);
        shdr(&mut buf, text_name, 1, Self::TEXT_ADDR, text_off, text_len, 0, 0);
        shdr(&mut buf, 7, 1, Self::DATA_ADDR, data_off, data_len, 0, 0);
        shdr(&mut buf, 13, 8, Self::BSS_ADDR, 0, self.bss_size, 0, 0);
        shdr(&mut buf, 18, 3, 0, strtab_off, strtab.len() as u32, 0, 0);
        shdr(&mut buf, 26, 2, 0, symtab_off, symtab_len, 4, 16);
        shdr(&mut buf, 34, 3, 0, shstrtab_off, shstrtab.len() as u32, 0, 0);
        buf
    }
}
