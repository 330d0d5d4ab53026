//! Configuration management for the cvm binaries
//!
//! This crate provides functionality for managing the cvm configuration,
//! including loading, saving, updating, and deleting configuration settings.

/// Error types for the configuration module
pub mod error;

use std::{path::PathBuf, str::FromStr};

use crate::error::Error;
use alloy::primitives::{Address, U256};
use clap::Parser;
use cvm_common::utils::io::file::{delete_path, read_file, write_file};
use cvm_vm::core::chains::ChainConfig;
use serde::{Deserialize, Serialize};
#[allow(deprecated)]
use std::env::home_dir;
use tracing::{error, info};

/// Command line arguments for the configuration command
#[derive(Debug, Clone, Parser)]
#[clap(
    about = "Display and edit the current configuration",
    override_usage = "cvm config [OPTIONS] [KEY] [VALUE]"
)]
pub struct ConfigArgs {
    /// The target key to update.
    #[clap(required = false, default_value = "")]
    key: String,

    /// The value to set the key to.
    #[clap(required = false, default_value = "")]
    value: String,
}

/// The [`Configuration`] struct represents the configuration of the CLI. Every `cvm run`
/// falls back to these values for the options it is not given.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// The chain preset or upgrade name code runs under, see [`ChainConfig::by_name`]
    pub chain: String,

    /// The energy handed to a run
    pub energy_limit: u64,

    /// The energy price of a run
    pub energy_price: U256,

    /// The sender of a run
    pub origin: Address,

    /// The block beneficiary of a run
    pub coinbase: Address,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            chain: "dev".to_string(),
            energy_limit: 10_000_000,
            energy_price: U256::ZERO,
            origin: Address::ZERO,
            coinbase: Address::ZERO,
        }
    }
}

/// Returns `$HOME/.cvm/config.toml`.
#[allow(deprecated)]
fn config_path() -> Result<String, Error> {
    let mut home: PathBuf = home_dir().ok_or_else(|| {
        Error::Generic(
            "failed to get home directory. does your os support `std::env::home_dir()`?"
                .to_string(),
        )
    })?;
    home.push(".cvm");
    home.push("config.toml");

    home.to_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Generic("failed to convert path to string".to_string()))
}

impl Configuration {
    /// Returns the current configuration, writing the defaults first if none exists.
    pub fn load() -> Result<Self, Error> {
        let path = config_path()?;

        // if the config file doesn't exist, create it
        if !std::path::Path::new(&path).exists() {
            let config = Configuration::default();
            config.save()?;
        }

        let contents = read_file(&path)
            .map_err(|e| Error::Generic(format!("failed to read config file: {e}")))?;

        toml::from_str(&contents)
            .map_err(|e| Error::ParseError(format!("failed to parse config file: {e}")))
    }

    /// Saves the current configuration to disk.
    pub fn save(&self) -> Result<(), Error> {
        let contents = toml::to_string(&self)
            .map_err(|e| Error::ParseError(format!("failed to serialize config: {e}")))?;

        write_file(&config_path()?, &contents)
            .map_err(|e| Error::Generic(format!("failed to write config file: {e}")))
    }

    /// Deletes the configuration file at `$HOME/.cvm/config.toml`.
    pub fn delete() -> Result<(), Error> {
        delete_path(&config_path()?)
            .map_err(|e| Error::Generic(format!("failed to delete config file: {e}")))
    }

    /// The [`ChainConfig`] named by [`Configuration::chain`].
    pub fn chain_config(&self) -> Result<ChainConfig, Error> {
        ChainConfig::by_name(&self.chain)
            .ok_or_else(|| Error::ParseError(format!("unknown chain: '{}'", self.chain)))
    }

    /// Update a single key/value pair in the configuration, then save it.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), Error> {
        // update the key in the struct and ensure it's the correct type
        match key {
            "chain" => {
                if ChainConfig::by_name(value).is_none() {
                    return Err(Error::ParseError(format!("unknown chain: '{value}'")));
                }
                self.chain = value.to_string();
            }
            "energy_limit" => {
                self.energy_limit = value
                    .parse()
                    .map_err(|e| Error::ParseError(format!("invalid energy_limit: {e}")))?;
            }
            "energy_price" => {
                self.energy_price = U256::from_str(value)
                    .map_err(|e| Error::ParseError(format!("invalid energy_price: {e}")))?;
            }
            "origin" => {
                self.origin = Address::from_str(value)
                    .map_err(|e| Error::ParseError(format!("invalid origin: {e}")))?;
            }
            "coinbase" => {
                self.coinbase = Address::from_str(value)
                    .map_err(|e| Error::ParseError(format!("invalid coinbase: {e}")))?;
            }
            _ => {
                return Err(Error::Generic(format!(
                    "invalid key: \'{key}\' is not a valid configuration key."
                )))
            }
        }

        // write the updated config to disk
        self.save()
    }
}

/// The `config` command is used to display and edit the current configuration.
pub fn config(args: ConfigArgs) -> Result<(), Error> {
    if !args.key.is_empty() {
        if !args.value.is_empty() {
            // read the config file and update the key/value pair
            let mut config = Configuration::load()?;
            config.update(&args.key, &args.value)?;
            info!("updated configuration! Set \'{}\' = \'{}\' .", &args.key, &args.value);
        } else {
            // key is set, but no value is set
            error!(
                "found key but no value to set. Please specify a value to set, use `cvm config \
                 --help` for more information."
            );
        }
    } else {
        // no key is set, print the config file
        println!("{:#?}", Configuration::load()?);
        info!("use `cvm config <KEY> <VALUE>` to set a key/value pair.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.chain, "dev");
        assert_eq!(config.energy_limit, 10_000_000);
        assert_eq!(config.energy_price, U256::ZERO);
        assert_eq!(config.chain_config().expect("dev is a known chain").network_id, 1337);
    }

    #[test]
    #[serial]
    fn test_load_configuration() {
        // delete config file if it exists
        Configuration::delete().expect("failed to delete config file");
        let config = Configuration::load().expect("failed to load config file");

        assert_eq!(config, Configuration::default());
    }

    #[test]
    #[serial]
    fn test_save_configuration() {
        Configuration::delete().expect("failed to delete config file");
        let mut config = Configuration::default();

        config.update("chain", "byzantium").expect("failed to update chain");
        config.update("energy_price", "7").expect("failed to update energy_price");
        config
            .update("origin", "0x00000000000000000000000000000000000000aa")
            .expect("failed to update origin");

        let loaded = Configuration::load().expect("failed to load config file");
        assert_eq!(loaded.chain, "byzantium");
        assert_eq!(loaded.energy_price, U256::from(7));
        assert_eq!(loaded.origin, Address::with_last_byte(0xaa));
        assert_eq!(loaded.energy_limit, 10_000_000);
    }

    #[test]
    #[serial]
    fn test_update_rejects_invalid_values() {
        Configuration::delete().expect("failed to delete config file");
        let mut config = Configuration::load().expect("failed to load config file");

        assert!(config.update("chain", "not-a-chain").is_err());
        assert!(config.update("energy_limit", "-1").is_err());
        assert!(config.update("coinbase", "0x1234").is_err());
        assert!(config.update("rpc_url", "http://localhost:8545").is_err());

        // nothing was written
        assert_eq!(Configuration::load().expect("failed to load config file"), config);
        assert_eq!(config, Configuration::default());
    }

    #[test]
    #[serial]
    fn test_delete_configuration() {
        Configuration::delete().expect("failed to delete config file");
        let mut config = Configuration::load().expect("failed to load config file");
        config.update("energy_limit", "42").expect("failed to update energy_limit");

        Configuration::delete().expect("failed to delete config file");
        let config = Configuration::load().expect("failed to load config file");
        assert_eq!(config.energy_limit, 10_000_000);
    }
}
