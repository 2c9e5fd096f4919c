pub mod database;

#[cfg(feature = "cli")]
mod cli_config {
    use crate::core::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{validate_identifier, validate_path, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_TABLE: &str = "employees";

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "hr-etl")]
    #[command(about = "Clean an HR CSV export and load it into PostgreSQL")]
    pub struct CliConfig {
        /// Path to the source CSV file
        pub source: PathBuf,

        /// Target table name
        #[arg(default_value = DEFAULT_TABLE)]
        pub table: String,
    }

    impl CliConfig {
        pub fn new(source: impl Into<PathBuf>, table: impl Into<String>) -> Self {
            Self {
                source: source.into(),
                table: table.into(),
            }
        }
    }

    impl ConfigProvider for CliConfig {
        fn source_path(&self) -> &Path {
            &self.source
        }

        fn table_name(&self) -> &str {
            &self.table
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_path("source", &self.source.to_string_lossy())?;
            validate_identifier("table", &self.table)?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_defaults_table() {
            let config = CliConfig::parse_from(["hr-etl", "data/hr.csv"]);
            assert_eq!(config.source, PathBuf::from("data/hr.csv"));
            assert_eq!(config.table, "employees");
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_parse_custom_table() {
            let config = CliConfig::parse_from(["hr-etl", "data/hr.csv", "staff"]);
            assert_eq!(config.table_name(), "staff");
        }

        #[test]
        fn test_rejects_blank_table() {
            let config = CliConfig::new("data/hr.csv", " ");
            assert!(config.validate().is_err());
        }
    }
}

#[cfg(feature = "cli")]
pub use cli_config::{CliConfig, DEFAULT_TABLE};
