//! The `cvm` command line: run bytecode, disassemble it, and manage the configuration.

pub(crate) mod error;
pub(crate) mod log_args;
pub(crate) mod output;
pub(crate) mod run;

use error::Error;
use log_args::LogArgs;
use output::{build_output_path, print_with_less};
use run::RunArgs;
use tracing::info;

use clap::{Parser, Subcommand};

use cvm_common::utils::io::file::write_file;
use cvm_config::{config, ConfigArgs, Configuration};
use cvm_disassembler::{disassemble, DisassemblerArgs};

#[derive(Debug, Parser)]
#[clap(name = "cvm", version)]
pub(crate) struct Arguments {
    #[clap(subcommand)]
    pub(crate) sub: Subcommands,

    #[clap(flatten)]
    logs: LogArgs,
}

#[derive(Debug, Subcommand)]
#[clap(about = "cvm is an energy-metered contract virtual machine toolkit.")]
pub(crate) enum Subcommands {
    #[clap(name = "run", about = "Run bytecode against a fresh in-memory state")]
    Run(RunArgs),

    #[clap(name = "disassemble", about = "Disassemble CVM bytecode to assembly")]
    Disassemble(DisassemblerArgs),

    #[clap(name = "config", about = "Display and edit the current configuration")]
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Arguments::parse();

    // setup logging, the guard flushes the log file on exit
    let _guard = args
        .logs
        .init_tracing()
        .map_err(|e| Error::Generic(format!("failed to initialize tracing: {e}")))?;

    let configuration = Configuration::load()
        .map_err(|e| Error::Generic(format!("failed to load configuration: {e}")))?;
    match args.sub {
        Subcommands::Run(cmd) => {
            let json = cmd.json;
            let result = run::run(cmd, &configuration).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", result.display());
            }
        }

        Subcommands::Disassemble(cmd) => {
            // if the user has passed an output filename, override the default filename
            let mut filename: String = "disassembled.asm".to_string();
            let given_name = cmd.name.as_str();

            if !given_name.is_empty() {
                filename = format!("{given_name}-{filename}");
            }

            let assembly = disassemble(cmd.clone())?;

            if cmd.output == "print" {
                print_with_less(&assembly)
                    .map_err(|e| Error::Generic(format!("failed to print assembly: {e}")))?;
            } else {
                let output_path = build_output_path(&cmd.output, &filename)
                    .map_err(|e| Error::Generic(format!("failed to build output path: {e}")))?;

                write_file(&output_path, &assembly)
                    .map_err(|e| Error::Generic(format!("failed to write assembly: {e}")))?;
                info!("wrote assembly to {output_path}");
            }
        }

        Subcommands::Config(cmd) => {
            config(cmd).map_err(|e| Error::Generic(format!("failed to configure: {e}")))?;
        }
    }

    Ok(())
}
