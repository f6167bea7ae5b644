use crate::config::toml_config::{MigrateConfig, ReportConfig};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "matchmaker-migrate")]
#[command(about = "Moves matchmaker data from the seqr tables into the matchmaker tables, and back")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// JSON store snapshot, overrides `store.path`
    #[arg(long)]
    pub store: Option<String>,

    /// Write a CSV report of every step, overrides `report.csv_path`
    #[arg(long)]
    pub report: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub json_logs: bool,

    /// Run inside a transaction and discard it
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Copy data into the matchmaker tables and drop the legacy columns
    Apply,
    /// Restore the legacy columns and copy the data back
    Revert,
    /// Show whether the migration is applied
    Status,
}

impl CliConfig {
    /// The config file (if any) with command line flags layered on top.
    pub fn resolve(&self) -> Result<MigrateConfig> {
        let mut config = match &self.config {
            Some(path) => MigrateConfig::from_file(path)?,
            None => MigrateConfig::default(),
        };

        if let Some(store) = &self.store {
            config.store.path = Some(store.clone());
        }
        if let Some(report) = &self.report {
            config.report = Some(ReportConfig {
                csv_path: report.clone(),
            });
        }
        if self.verbose {
            config.logging.verbose = Some(true);
        }
        if self.json_logs {
            config.logging.json = Some(true);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = CliConfig::parse_from([
            "matchmaker-migrate",
            "--store",
            "seqr.json",
            "--report",
            "report.csv",
            "-v",
            "apply",
        ]);

        assert_eq!(cli.command, Command::Apply);
        let config = cli.resolve().unwrap();
        assert_eq!(config.store_path().unwrap(), "seqr.json");
        assert_eq!(config.report_path(), Some("report.csv"));
        assert!(config.verbose());
    }

    #[test]
    fn test_dry_run_revert() {
        let cli = CliConfig::parse_from(["matchmaker-migrate", "--dry-run", "revert"]);
        assert!(cli.dry_run);
        assert_eq!(cli.command, Command::Revert);
    }
}
