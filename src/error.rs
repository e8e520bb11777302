use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CustosError {
    #[error("Could not open workbook {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Sheet '{sheet}': {detail}")]
    Schema { sheet: String, detail: String },

    #[error("{0}")]
    Computation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(String),
}

/// Coarse classification used to pick the user-facing rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Load,
    Schema,
    Computation,
    Other,
}

impl CustosError {
    pub fn schema(sheet: &str, detail: impl Into<String>) -> Self {
        Self::Schema {
            sheet: sheet.to_string(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Load { .. } => ErrorKind::Load,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::Computation(_) => ErrorKind::Computation,
            Self::Io(_) | Self::Csv(_) | Self::Json(_) | Self::Settings(_) => ErrorKind::Other,
        }
    }

    /// The message shown to the user. Every pipeline failure collapses into the
    /// same sentence; the detail only goes to the debug log.
    pub fn user_message(&self, workbook: &Path) -> String {
        match self.kind() {
            ErrorKind::Load | ErrorKind::Schema | ErrorKind::Computation => format!(
                "\u{26a0}\u{fe0f} Ocorreu um erro ao carregar os dados. Verifique se o arquivo '{}' está presente e no formato correto.",
                workbook.display()
            ),
            ErrorKind::Other => format!("Error: {self}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, CustosError>;
