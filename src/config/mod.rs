pub mod cli;
pub mod toml_config;

pub const DEFAULT_API_ENDPOINT: &str = "https://scmapml.com/verify/vahan";
pub const DEFAULT_REQUEST_FIELD: &str = "vehiclenumber";
pub const DEFAULT_INVENTORY_PATH: &str = "data/vehicles.json";
pub const DEFAULT_INVENTORY_FIELD: &str = "vehicleNumber";
pub const DEFAULT_OUTPUT_PATH: &str = "data";
pub const DEFAULT_OUTPUT_FILE: &str = "vehicle_documents.json";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[cfg(feature = "cli")]
pub use self::cli_args::CliConfig;

#[cfg(feature = "cli")]
mod cli_args {
    use super::*;
    use crate::core::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "vahan-sync")]
    #[command(about = "Incrementally sync vehicle document expiry dates from the VAHAN verification service")]
    pub struct CliConfig {
        #[arg(long, default_value = DEFAULT_API_ENDPOINT)]
        pub api_endpoint: String,

        /// JSON key the verification service expects the registration number under
        #[arg(long, default_value = DEFAULT_REQUEST_FIELD)]
        pub request_field: String,

        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
        pub timeout_seconds: u64,

        /// Vehicle inventory export (.json array of documents or .csv with a header row)
        #[arg(long, default_value = DEFAULT_INVENTORY_PATH)]
        pub inventory: String,

        #[arg(long, default_value = DEFAULT_INVENTORY_FIELD)]
        pub inventory_field: String,

        #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
        pub output_path: String,

        #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
        pub output_file: String,

        /// Fetch at most this many vehicles in this run
        #[arg(long)]
        pub limit: Option<usize>,

        /// Show which vehicles would be fetched without calling the service
        #[arg(long)]
        pub dry_run: bool,

        /// TOML configuration file; replaces the flags above
        #[arg(short, long)]
        pub config: Option<String>,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,

        #[arg(long, help = "Log memory usage and elapsed time per phase")]
        pub monitor: bool,
    }

    impl Default for CliConfig {
        fn default() -> Self {
            Self {
                api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
                request_field: DEFAULT_REQUEST_FIELD.to_string(),
                timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
                inventory: DEFAULT_INVENTORY_PATH.to_string(),
                inventory_field: DEFAULT_INVENTORY_FIELD.to_string(),
                output_path: DEFAULT_OUTPUT_PATH.to_string(),
                output_file: DEFAULT_OUTPUT_FILE.to_string(),
                limit: None,
                dry_run: false,
                config: None,
                verbose: false,
                log_json: false,
                monitor: false,
            }
        }
    }

    impl ConfigProvider for CliConfig {
        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }

        fn request_field(&self) -> &str {
            &self.request_field
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(self.timeout_seconds)
        }

        fn inventory_path(&self) -> &str {
            &self.inventory
        }

        fn inventory_field(&self) -> &str {
            &self.inventory_field
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn output_file(&self) -> &str {
            &self.output_file
        }

        fn max_vehicles(&self) -> Option<usize> {
            self.limit
        }

        fn dry_run(&self) -> bool {
            self.dry_run
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_url("api_endpoint", &self.api_endpoint)?;
            validation::validate_non_empty_string("request_field", &self.request_field)?;
            validation::validate_range("timeout_seconds", self.timeout_seconds, 1, 600)?;
            validation::validate_path("inventory", &self.inventory)?;
            validation::validate_non_empty_string("inventory_field", &self.inventory_field)?;
            validation::validate_path("output_path", &self.output_path)?;
            validation::validate_file_name("output_file", &self.output_file)?;
            if let Some(limit) = self.limit {
                validation::validate_range("limit", limit, 1, usize::MAX)?;
            }
            Ok(())
        }
    }

}
