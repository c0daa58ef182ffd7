//! Configuration structures for the conversion pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use bnk_reasoning::ProviderKind;

use super::classified::ConfidenceThresholds;
use crate::error::{BnkError, Result};
use crate::statement::TransactionFilter;

/// Main configuration for the bnk pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// External reasoning service.
    pub reasoning: ReasoningConfig,

    /// Routing, batching and acceptance bars.
    pub processing: ProcessingConfig,

    /// Review tier thresholds.
    pub thresholds: ConfidenceThresholds,

    /// Which statement lines reach the converter.
    pub filter: TransactionFilter,

    /// Ledger export layout.
    pub export: ExportConfig,
}

/// External reasoning service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Provider to delegate uncertain cases to.
    pub provider: ProviderKind,

    /// API key. Prefer `api_key_env` so the key stays out of the file.
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,

    /// Model override; provider default when unset.
    pub model: Option<String>,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Upper bound on a whole delegated batch, retries included.
    pub delegation_timeout_secs: u64,

    /// Retries per request on rate-limit, server and network errors.
    pub max_retries: u32,

    /// Endpoint override, e.g. a proxy or a compatible gateway.
    pub base_url: Option<String>,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Anthropic,
            api_key: None,
            api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
            model: None,
            request_timeout_secs: bnk_reasoning::DEFAULT_TIMEOUT_SECS,
            delegation_timeout_secs: 180,
            max_retries: bnk_reasoning::DEFAULT_MAX_RETRIES,
            base_url: None,
        }
    }
}

impl ReasoningConfig {
    /// API key from the config file, falling back to the named environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

/// Routing and batching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Send delegated items in batches rather than one call per item.
    pub use_batch_processing: bool,

    /// Income items per delegated call.
    pub address_batch_size: usize,

    /// Expense items per delegated call.
    pub contractor_batch_size: usize,

    /// Contractors offered to the reasoning service per expense.
    pub candidate_shortlist: usize,

    /// Consult and fill the result cache.
    pub use_cache: bool,

    /// Try the pattern matcher before delegating.
    pub use_regex_first: bool,

    /// Pattern-match confidence needed to skip delegation.
    pub regex_acceptance: u8,

    /// Fuzzy contractor confidence needed to skip delegation.
    pub contractor_acceptance: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            use_batch_processing: true,
            address_batch_size: 20,
            contractor_batch_size: 50,
            candidate_shortlist: 10,
            use_cache: true,
            use_regex_first: true,
            regex_acceptance: 90,
            contractor_acceptance: 90,
        }
    }
}

/// Date layout in the ledger export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    /// `1.04.2025`
    #[default]
    #[serde(rename = "D.MM.YYYY")]
    DayMonthYearDots,
    /// `01/04/2025`
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYearSlashes,
    /// `2025-04-01`
    #[serde(rename = "YYYY-MM-DD")]
    Iso,
}

/// Ledger export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Column separator.
    pub separator: String,

    /// Date layout.
    pub date_format: DateFormat,

    /// Decimal separator for amounts.
    pub decimal_separator: char,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            separator: "\t".to_string(),
            date_format: DateFormat::default(),
            decimal_separator: ',',
        }
    }
}

impl ConverterConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the converter cannot run with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.processing;
        if p.address_batch_size == 0 || p.contractor_batch_size == 0 {
            return Err(BnkError::Config("batch sizes must be at least 1".into()));
        }
        if self.thresholds.needs_review > self.thresholds.auto_approve {
            return Err(BnkError::Config(
                "needs_review threshold must not exceed auto_approve".into(),
            ));
        }
        if self.thresholds.auto_approve > 100 || p.regex_acceptance > 100 {
            return Err(BnkError::Config("thresholds are percentages (0-100)".into()));
        }
        if self.filter.only_positive && self.filter.skip_negative {
            tracing::debug!("only_positive already implies skip_negative");
        }
        Ok(())
    }
}
