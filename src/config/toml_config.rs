use crate::core::dedup::{DuplicatePolicy, DEFAULT_DUPLICATE_SUFFIX};
use crate::matchmaker;
use crate::utils::error::{MigrationError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrateConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot holding every table.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferConfig {
    pub duplicate_suffix: Option<String>,
    /// Replaces the built-in list of known duplicate submission ids.
    pub duplicated_submission_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub csv_path: String,
}

impl MigrateConfig {
    /// Loads the config from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MigrationError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses the config from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MigrationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` (for example `${SEQR_SNAPSHOT}`) with the environment value. Unset variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MigrationError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn store_path(&self) -> Result<&str> {
        validation::validate_required_field("store.path", &self.store.path).map(String::as_str)
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        let suffix = self
            .transfer
            .duplicate_suffix
            .clone()
            .unwrap_or_else(|| DEFAULT_DUPLICATE_SUFFIX.to_string());

        match &self.transfer.duplicated_submission_ids {
            Some(ids) => DuplicatePolicy::new(ids.iter().cloned(), suffix),
            None => DuplicatePolicy::new(matchmaker::DUPLICATED_SUBMISSION_IDS.iter().copied(), suffix),
        }
    }

    pub fn verbose(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }

    pub fn report_path(&self) -> Option<&str> {
        self.report.as_ref().map(|r| r.csv_path.as_str())
    }
}

impl Validate for MigrateConfig {
    fn validate(&self) -> Result<()> {
        let store_path = self.store_path()?;
        validation::validate_file_extension("store.path", store_path, &["json"])?;

        if let Some(suffix) = &self.transfer.duplicate_suffix {
            validation::validate_non_empty_string("transfer.duplicate_suffix", suffix)?;
        }

        if let Some(ids) = &self.transfer.duplicated_submission_ids {
            for id in ids {
                validation::validate_non_empty_string("transfer.duplicated_submission_ids", id)?;
            }
        }

        if let Some(report_path) = self.report_path() {
            validation::validate_file_extension("report.csv_path", report_path, &["csv"])?;
        }

        Ok(())
    }
}
