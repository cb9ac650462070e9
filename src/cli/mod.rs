pub mod config;
pub mod run;

use crate::config::ConfigError;
use crate::shipper::ShipperError;
use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config not found; searched ~/.config/logship/config.yml and /etc/logship/config.yml. Use --config <path> or run 'logship config init'")]
    ConfigNotFound,

    #[error("config file already exists at {}; remove it first or use --stdout", .0.display())]
    ConfigExists(PathBuf),

    #[error("no command given to exec")]
    EmptyCommand,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("shipper error: {0}")]
    Shipper(#[from] ShipperError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
