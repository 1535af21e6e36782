//! Console dumps of the output header and segment bytes.

use staticload_slf::LoadFileHeader;

/// Print a load file header field by field.
pub fn print_header(header: &LoadFileHeader) {
    println!();
    println!("Static load file header:");
    println!("   marker           = {:#x}", header.marker);
    println!("   entry_point      = {:#010x}", header.entry_point);
    println!("   flags            = {:#010x}", header.flags);
    println!("   code_target      = {:#010x}", header.code_target);
    println!("   code_offset      = {}", header.code_offset);
    println!("   code_size        = {}", header.code_size);
    println!("   data_target      = {:#010x}", header.data_target);
    println!("   data_offset      = {}", header.data_offset);
    println!("   data_size        = {}", header.data_size);
    println!("   bss_target       = {:#010x}", header.bss_target);
    println!("   bss_size         = {}", header.bss_size);
    println!("   object_name      = {}", header.object_name());
    println!("   entry_point_name = {}", header.entry_point_name());
}

/// Hex dump with 16 bytes per row and an ASCII gutter.
pub fn hex_dump(bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        print!("   {:06x}: ", row * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(byte) => print!("{byte:02x} "),
                None => print!("   "),
            }
        }
        print!(" ");
        for byte in chunk {
            let c = if byte.is_ascii_graphic() || *byte == b' ' {
                *byte as char
            } else {
                '.'
            };
            print!("{c}");
        }
        println!();
    }
}
