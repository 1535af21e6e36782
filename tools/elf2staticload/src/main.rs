//! Converts a statically linked ELF object into a static load file.
//!
//! Extracts the `.text`, `.data`, and `.bss` sections, resolves the entry
//! point symbol, and writes the 108-byte header plus stored segments,
//! optionally LZMA compressed. The output is formatted for a target with
//! the byte order the input object declares.

mod cli;
mod dump;

use anyhow::{Context, Result, bail};
use clap::Parser;
use staticload_elf::ObjectFile;
use staticload_slf::{CODE_SECTION, DATA_SECTION, EncodeOptions, NAME_SIZE, write_load_file};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    for (label, name) in [
        ("object name", &cli.object_name),
        ("entry point name", &cli.entry_point_name),
    ] {
        if let Some(name) = name {
            if name.len() >= NAME_SIZE {
                bail!("{label} \"{name}\" longer than {} characters", NAME_SIZE - 1);
            }
        }
    }

    let object = ObjectFile::open(&cli.input)
        .with_context(|| format!("can't read object file {}", cli.input.display()))?;

    if cli.print_input_file {
        print!("{}", object.dump());
    }

    let options = EncodeOptions {
        compress: cli.compression,
        object_name: cli.object_name.clone(),
        entry_point_name: cli.entry_point_name.clone(),
    };
    let header = write_load_file(&object, &options, &cli.output)
        .with_context(|| format!("can't write load file {}", cli.output.display()))?;

    if cli.print_output_file_header {
        dump::print_header(&header);
    }

    if cli.print_output_file_data {
        if let Some(section) = object.read_section_by_name(CODE_SECTION) {
            println!();
            println!("Static load file text section:");
            dump::hex_dump(section.data.unwrap_or(&[]));
        }
        if let Some(section) = object.read_section_by_name(DATA_SECTION) {
            if let Some(data) = section.data {
                println!();
                println!("Static load file data section:");
                dump::hex_dump(data);
            }
        }
    }

    Ok(())
}
