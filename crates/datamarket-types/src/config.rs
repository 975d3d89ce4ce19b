//! Engine configuration.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{DataMarketError, IdScheme, Result, constants};

/// What to do when a stored date string cannot be parsed during settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateHandling {
    /// Abort the operation with `DateParse`.
    #[default]
    Strict,
    /// Log a warning and treat the span as zero hours.
    Lenient,
}

/// Whether the caller's organization must match the hosting peer's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OrgCheck {
    #[default]
    Enforce,
    /// Skip the host-org comparison. Logged on every use.
    Bypass { justification: String },
}

/// Settlement engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub id_scheme: IdScheme,
    pub date_handling: DateHandling,
    /// Delivery gap (hours) above which a latency violation is counted.
    pub latency_threshold_hours: Decimal,
    pub org_check: OrgCheck,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_scheme: IdScheme::default(),
            date_handling: DateHandling::default(),
            latency_threshold_hours: constants::DEFAULT_LATENCY_THRESHOLD_HOURS,
            org_check: OrgCheck::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| DataMarketError::Configuration(format!("invalid config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DataMarketError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.latency_threshold_hours <= Decimal::ZERO {
            return Err(DataMarketError::Configuration(format!(
                "latency_threshold_hours must be positive, got {}",
                self.latency_threshold_hours
            )));
        }
        if let OrgCheck::Bypass { justification } = &self.org_check {
            if justification.trim().is_empty() {
                return Err(DataMarketError::Configuration(
                    "org_check bypass requires a justification".into(),
                ));
            }
        }
        Ok(())
    }
}
