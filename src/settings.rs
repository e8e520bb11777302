use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CustosError, Result};
use crate::reports::{ReportOptions, DEFAULT_REVENUE_PREFIX, DEFAULT_TOP_CLIENTS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_workbook")]
    pub workbook: String,
    #[serde(default = "default_revenue_prefix")]
    pub revenue_prefix: String,
    #[serde(default = "default_top_clients")]
    pub top_clients: usize,
}

fn default_workbook() -> String {
    "dados.xlsx".to_string()
}

fn default_revenue_prefix() -> String {
    DEFAULT_REVENUE_PREFIX.to_string()
}

fn default_top_clients() -> usize {
    DEFAULT_TOP_CLIENTS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workbook: default_workbook(),
            revenue_prefix: default_revenue_prefix(),
            top_clients: default_top_clients(),
        }
    }
}

impl Settings {
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            revenue_prefix: self.revenue_prefix.clone(),
            top_clients: self.top_clients,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workbook.trim().is_empty() {
            return Err(CustosError::Settings("workbook path cannot be empty".into()));
        }
        if self.revenue_prefix.trim().is_empty() {
            return Err(CustosError::Settings("revenue prefix cannot be empty".into()));
        }
        if self.top_clients == 0 {
            return Err(CustosError::Settings("top clients must be at least 1".into()));
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("custos")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Missing or malformed files fall back to defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    settings.validate()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CustosError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}
