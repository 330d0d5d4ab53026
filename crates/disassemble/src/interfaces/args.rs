use std::path::Path;

use clap::Parser;
use cvm_common::utils::{io::file::read_file, strings::decode_hex};
use derive_builder::Builder;

use crate::error::Error;

/// Arguments for the `disassemble` command and library entry point
#[derive(Debug, Clone, Parser, Builder)]
#[clap(
    about = "Disassembles CVM bytecode to assembly",
    override_usage = "cvm disassemble <TARGET> [OPTIONS]"
)]
pub struct DisassemblerArgs {
    /// The target to disassemble, either hex bytecode or a file containing it.
    #[clap(required = true)]
    pub target: String,

    /// Whether to use base-10 for the program counter.
    #[clap(long = "decimal-counter", short = 'd')]
    pub decimal_counter: bool,

    /// Name of the output file.
    #[clap(long, short, default_value = "", hide_default_value = true)]
    pub name: String,

    /// The output directory to write the output to or 'print' to print to the console
    #[clap(long = "output", short = 'o', default_value = "output", hide_default_value = true)]
    pub output: String,
}

impl DisassemblerArgs {
    /// Resolves the target into bytecode. A target naming an existing file is read first, and
    /// its contents decoded as hex.
    pub fn get_bytecode(&self) -> Result<Vec<u8>, Error> {
        let hex = if Path::new(&self.target).is_file() {
            read_file(&self.target)
                .map_err(|e| Error::InvalidTarget(format!("failed to read target file: {e}")))?
        } else {
            self.target.clone()
        };

        decode_hex(&hex).map_err(|e| Error::InvalidTarget(e.to_string()))
    }
}

impl DisassemblerArgsBuilder {
    /// Creates a builder with every field set to its empty default.
    pub fn new() -> Self {
        Self {
            target: Some(String::new()),
            decimal_counter: Some(false),
            name: Some(String::new()),
            output: Some(String::new()),
        }
    }
}
