pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FileInventory, VahanClient};
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{
    output_store::OutputStore,
    sync::{SyncOptions, SyncOrchestrator},
};
pub use utils::error::{Result, SyncError};
