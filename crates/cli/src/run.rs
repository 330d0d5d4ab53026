use std::{
    fmt::Write,
    path::Path,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy::primitives::{Address, Bytes, U256};
use clap::Parser;
use colored::Colorize;
use cvm_common::utils::{hex::ToLowerHex, io::file::read_file, strings::decode_hex};
use cvm_config::Configuration;
use cvm_vm::{
    core::{
        chains::ChainConfig,
        tracer::{LogConfig, StructLog, StructLogger},
    },
    ext::runtime::{create, execute, RuntimeConfig},
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Error;

fn parse_u256(value: &str) -> Result<U256, String> {
    U256::from_str(value).map_err(|e| format!("invalid number '{value}': {e}"))
}

/// Arguments for the `run` command
#[derive(Debug, Clone, Parser)]
#[clap(
    about = "Runs CVM bytecode against a fresh in-memory state",
    override_usage = "cvm run [OPTIONS] --code <CODE>"
)]
pub(crate) struct RunArgs {
    /// The bytecode to run, in hex.
    #[clap(long, default_value = "", hide_default_value = true)]
    pub(crate) code: String,

    /// A file holding the bytecode to run, in hex. Takes precedence over `--code`.
    #[clap(long, value_name = "PATH")]
    pub(crate) codefile: Option<String>,

    /// The calldata, in hex.
    #[clap(long, default_value = "", hide_default_value = true)]
    pub(crate) input: String,

    /// The energy handed to the run. Defaults to the configured energy limit.
    #[clap(long)]
    pub(crate) energy: Option<u64>,

    /// The energy price. Defaults to the configured energy price.
    #[clap(long, value_parser = parse_u256)]
    pub(crate) price: Option<U256>,

    /// The value sent along.
    #[clap(long, value_parser = parse_u256, default_value = "0")]
    pub(crate) value: U256,

    /// Treat the code as init code and deploy it.
    #[clap(long)]
    pub(crate) create: bool,

    /// Record and print every executed step.
    #[clap(long)]
    pub(crate) debug: bool,

    /// Print the result as JSON.
    #[clap(long)]
    pub(crate) json: bool,

    /// The chain preset or upgrade name. Defaults to the configured chain.
    #[clap(long)]
    pub(crate) chain: Option<String>,

    /// Cancel the run after this many milliseconds.
    #[clap(long, value_name = "MS")]
    pub(crate) timeout: Option<u64>,
}

impl RunArgs {
    fn get_bytecode(&self) -> Result<Vec<u8>, Error> {
        let hex = match &self.codefile {
            Some(path) if Path::new(path).is_file() => read_file(path)
                .map_err(|e| Error::Generic(format!("failed to read code file: {e}")))?,
            Some(path) => return Err(Error::Generic(format!("code file not found: {path}"))),
            None => self.code.clone(),
        };
        if hex.trim().is_empty() {
            return Err(Error::Generic("no code given, use --code or --codefile".to_string()));
        }

        decode_hex(&hex).map_err(|e| Error::Generic(format!("failed to decode code: {e}")))
    }
}

/// What a run produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunResult {
    pub(crate) output: Bytes,
    pub(crate) energy_used: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    pub(crate) cancelled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) struct_logs: Vec<StructLog>,
}

impl RunResult {
    /// Renders the result for a terminal.
    pub(crate) fn display(&self) -> String {
        let mut out = String::new();

        if !self.struct_logs.is_empty() {
            for log in &self.struct_logs {
                let _ = writeln!(
                    out,
                    "{:>6} {:<14} energy={:<10} cost={:<6} depth={}",
                    log.pc,
                    log.op_name(),
                    log.energy,
                    log.energy_cost,
                    log.depth
                );
                for (i, item) in log.stack.iter().rev().enumerate() {
                    let _ = writeln!(out, "{:>10} {i:04}: {}", "", item.to_lower_hex());
                }
                if let Some(error) = &log.error {
                    let _ = writeln!(out, "{:>10} {}", "", error.red());
                }
            }
            out.push('\n');
        }

        if let Some(address) = self.address {
            let _ = writeln!(out, "{} {}", "address:".bold(), address.to_lower_hex());
        }
        let _ = writeln!(out, "{} {}", "output:".bold(), self.output.to_lower_hex());
        let _ = writeln!(out, "{} {}", "energy used:".bold(), self.energy_used);
        if let Some(error) = &self.error {
            let _ = writeln!(out, "{} {}", "error:".bold(), error.red());
        }
        if self.cancelled {
            let _ = writeln!(out, "{}", "cancelled before completion".yellow());
        }
        out
    }
}

/// The `run` command executes code on a blocking worker, cancelling it once `timeout` elapses.
pub(crate) async fn run(args: RunArgs, configuration: &Configuration) -> Result<RunResult, Error> {
    let code = args.get_bytecode()?;
    let input = decode_hex(&args.input)
        .map_err(|e| Error::Generic(format!("failed to decode input: {e}")))?;

    let chain = args.chain.clone().unwrap_or_else(|| configuration.chain.clone());
    let chain_config = ChainConfig::by_name(&chain)
        .ok_or_else(|| Error::Generic(format!("unknown chain: '{chain}'")))?;

    let abort = Arc::new(AtomicBool::new(false));
    let mut handle = tokio::task::spawn_blocking({
        let abort = Arc::clone(&abort);
        let configuration = configuration.clone();
        let args = args.clone();
        move || run_blocking(&args, &configuration, chain_config, &code, &input, abort)
    });

    let joined = match args.timeout {
        Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!("run exceeded {ms}ms, cancelling");
                abort.store(true, Ordering::SeqCst);
                handle.await
            }
        },
        None => handle.await,
    };

    joined.map_err(|e| Error::Generic(format!("failed to join run: {e}")))
}

fn run_blocking(
    args: &RunArgs,
    configuration: &Configuration,
    chain_config: ChainConfig,
    code: &[u8],
    input: &[u8],
    abort: Arc<AtomicBool>,
) -> RunResult {
    let energy_limit = args.energy.unwrap_or(configuration.energy_limit);
    let mut logger = StructLogger::new(LogConfig::default());

    let mut result = {
        let mut cfg = RuntimeConfig {
            chain_config,
            origin: configuration.origin,
            coinbase: configuration.coinbase,
            energy_limit,
            energy_price: args.price.unwrap_or(configuration.energy_price),
            value: args.value,
            abort: Arc::clone(&abort),
            tracer: if args.debug { Some(&mut logger) } else { None },
            ..Default::default()
        };
        debug!(?cfg, create = args.create, "running code");

        if args.create {
            let outcome = create(code, &mut cfg);
            RunResult {
                output: outcome.output,
                energy_used: energy_limit - outcome.energy_left,
                address: Some(outcome.address),
                error: outcome.error.map(|e| e.to_string()),
                ..Default::default()
            }
        } else {
            let outcome = execute(code, input, &mut cfg);
            RunResult {
                output: outcome.output,
                energy_used: energy_limit - outcome.energy_left,
                error: outcome.error.map(|e| e.to_string()),
                ..Default::default()
            }
        }
    };

    result.cancelled = abort.load(Ordering::SeqCst);
    result.struct_logs = logger.struct_logs().to_vec();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(code: &str) -> RunArgs {
        RunArgs {
            code: code.to_string(),
            codefile: None,
            input: String::new(),
            energy: Some(100_000),
            price: None,
            value: U256::ZERO,
            create: false,
            debug: false,
            json: false,
            chain: None,
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_run_returns_output() {
        // PUSH1 0x2a PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let result = run(args("602a60005260206000f3"), &Configuration::default())
            .await
            .expect("failed to run");

        assert_eq!(result.error, None);
        assert_eq!(U256::from_be_slice(&result.output), U256::from(0x2a));
        // four pushes, MSTORE and one word of memory
        assert_eq!(result.energy_used, 18);
        assert!(result.struct_logs.is_empty());
        assert!(!result.cancelled);
    }

    #[tokio::test]
    async fn test_run_with_debug_records_steps() {
        // PUSH1 1 PUSH1 2 ADD STOP
        let args = RunArgs { debug: true, ..args("600160020100") };
        let result = run(args, &Configuration::default()).await.expect("failed to run");

        let ops: Vec<&str> = result.struct_logs.iter().map(StructLog::op_name).collect();
        assert_eq!(ops, vec!["PUSH1", "PUSH1", "ADD", "STOP"]);
        assert_eq!(result.energy_used, 9);
        assert!(result.display().contains("ADD"));
    }

    #[tokio::test]
    async fn test_run_create_reports_address() {
        // returns one zero byte of runtime code
        let args = RunArgs { create: true, ..args("60016000f3") };
        let result = run(args, &Configuration::default()).await.expect("failed to run");

        assert_eq!(result.error, None);
        assert_eq!(result.output, Bytes::from_static(&[0x00]));
        assert_eq!(result.address, Some(Address::ZERO.create(0)));
        assert!(result.display().contains(&format!("{:#x}", Address::ZERO.create(0))));
    }

    #[tokio::test]
    async fn test_run_reports_vm_errors() {
        let result = run(args("0c"), &Configuration::default()).await.expect("failed to run");

        assert!(result.error.is_some());
        assert_eq!(result.energy_used, 100_000);
    }

    #[tokio::test]
    async fn test_run_cancels_after_timeout() {
        // JUMPDEST PUSH1 0 JUMP
        let args = RunArgs { energy: Some(u64::MAX), timeout: Some(50), ..args("5b600056") };
        let result = run(args, &Configuration::default()).await.expect("failed to run");

        assert!(result.cancelled);
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_run_rejects_bad_arguments() {
        let config = Configuration::default();

        assert!(run(args(""), &config).await.is_err());
        assert!(run(args("60zz"), &config).await.is_err());

        let unknown = RunArgs { chain: Some("not-a-chain".to_string()), ..args("00") };
        assert!(run(unknown, &config).await.is_err());
    }
}
