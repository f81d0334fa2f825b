//! Process configuration.
//!
//! Every option can be given as a flag or through its environment variable.
//!
//! ```bash
//! INVENTORY_DB_PATH=/var/lib/inventory.sqlite3 LOGS=cloud inventory_http
//! inventory_http --db-path :memory: --bind 0.0.0.0:8080
//! ```

use clap::Parser;
use inventory_core::{default_log_level, DbLocation, LogTarget};
use std::net::SocketAddr;

#[derive(Parser, Debug, Clone)]
#[command(name = "inventory_http", version, about = "Equipment and product HTTP API")]
pub struct Config {
    /// SQLite database file, or `:memory:` for a throwaway database.
    #[arg(long, env = "INVENTORY_DB_PATH", default_value = "inventory.sqlite3")]
    pub db_path: String,

    #[arg(long, env = "INVENTORY_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// trace|debug|info|warn|error. Defaults to debug in debug builds.
    #[arg(long, env = "INVENTORY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// local (colored stderr), cloud (plain stderr) or prod (rolling files).
    #[arg(long, env = "LOGS", default_value = "local")]
    pub log_profile: String,

    /// Absolute directory for `prod` log files.
    #[arg(long, env = "INVENTORY_LOG_DIR")]
    pub log_dir: Option<String>,
}

impl Config {
    pub fn db_location(&self) -> DbLocation {
        DbLocation::parse(&self.db_path)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    pub fn log_target(&self) -> Result<LogTarget, String> {
        LogTarget::from_profile(&self.log_profile, self.log_dir.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use clap::Parser;
    use inventory_core::{DbLocation, LogTarget};

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "inventory_http",
            "--db-path",
            ":memory:",
            "--bind",
            "0.0.0.0:8080",
            "--log-level",
            "warn",
            "--log-profile",
            "cloud",
        ])
        .unwrap();

        assert_eq!(config.db_location(), DbLocation::Memory);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.log_level(), "warn");
        assert_eq!(
            config.log_target().unwrap(),
            LogTarget::Console { colored: false }
        );
    }

    #[test]
    fn prod_profile_without_directory_is_rejected() {
        let config =
            Config::try_parse_from(["inventory_http", "--log-profile", "prod"]).unwrap();
        assert!(config.log_target().is_err());
    }
}
