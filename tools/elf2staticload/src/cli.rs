//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

/// Convert a statically linked ELF object into a static load file.
#[derive(Debug, Parser)]
#[command(name = "elf2staticload", version, about)]
pub struct Cli {
    /// Input ELF object file.
    pub input: PathBuf,

    /// Output static load file.
    pub output: PathBuf,

    /// Record this object name instead of the entry point symbol's name.
    #[arg(short = 'o', long, value_name = "NAME")]
    pub object_name: Option<String>,

    /// Record this entry point name instead of the entry point symbol's
    /// name.
    #[arg(short = 'e', long, value_name = "NAME")]
    pub entry_point_name: Option<String>,

    /// Compress segments with LZMA.
    #[arg(short = 'c', long)]
    pub compression: bool,

    /// Print the parsed input object to the console.
    #[arg(short = 'I', long)]
    pub print_input_file: bool,

    /// Print the output file header to the console.
    #[arg(short = 'H', long)]
    pub print_output_file_header: bool,

    /// Hex dump the output segments, before compression, to the console.
    #[arg(short = 'D', long)]
    pub print_output_file_data: bool,
}
