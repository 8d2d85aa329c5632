//! # Configuration
//!
//! Resolves where the reference data comes from and applies overrides.
//!
//! Precedence, highest first: command-line flags, `ARCHETYPE_*` environment
//! variables (read by clap), then built-in defaults. With no dataset given
//! the embedded data is used.

use crate::AppError;
use archetype_core::{
    IssueKind, OverrideSet, ReferenceData, ValidationConfig, ValidationReport, load_dataset,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default listen address of the lookup server.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Where data comes from and how it is checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataConfig {
    /// Dataset file (source documents, interchange JSON or snapshot).
    pub dataset: Option<PathBuf>,
    /// Override rules file (JSON array).
    pub overrides: Option<PathBuf>,
    pub validation: ValidationConfig,
}

impl DataConfig {
    /// Load the configured dataset, apply overrides and log its findings.
    pub fn load(&self) -> Result<Arc<ReferenceData>, AppError> {
        let data = match &self.dataset {
            Some(path) => {
                let bytes = read(path)?;
                let data = load_dataset(&bytes, self.validation)?;
                info!(path = %path.display(), records = data.envelope.len(), "dataset loaded");
                data
            }
            None if self.validation == ValidationConfig::default() => {
                ReferenceData::embedded()?.clone()
            }
            None => ReferenceData::load_embedded(self.validation)?,
        };

        let data = match &self.overrides {
            Some(path) => {
                let rules = OverrideSet::from_json_str(&read_to_string(path)?)?;
                let overridden = data.with_overrides(&rules)?;
                info!(path = %path.display(), rules = rules.len(), "overrides applied");
                overridden
            }
            None => data,
        };

        log_issues(&data.issues);
        Ok(Arc::new(data))
    }
}

fn read(path: &Path) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_to_string(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// One line per issue kind at `warn`, every issue at `debug`.
pub fn log_issues(report: &ValidationReport) {
    for (kind, count) in report.summary() {
        warn!(kind = %kind, severity = ?kind.severity(), count, "data issues");
    }
    for issue in report.iter() {
        debug!(kind = %issue.kind, source = %issue.source, "{}", issue.detail);
    }
    let skipped = report.count(IssueKind::MalformedKey)
        + report.count(IssueKind::MalformedRecord)
        + report.count(IssueKind::UnknownComponent);
    if skipped > 0 {
        warn!(skipped, "entries skipped while loading");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_embedded_data() {
        let data = DataConfig::default().load();
        assert!(data.is_ok_and(|d| !d.envelope.is_empty()));
    }

    #[test]
    fn missing_dataset_file_is_io_error() {
        let config = DataConfig {
            dataset: Some(PathBuf::from("/nonexistent/dataset.json")),
            ..DataConfig::default()
        };
        assert!(matches!(config.load(), Err(AppError::Io { .. })));
    }
}
