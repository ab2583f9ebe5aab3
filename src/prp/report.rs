//! Report export. The only place in the engine that writes to disk.

use super::types::ComplianceReport;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors that can occur when exporting a report
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write the compliance report to `path`, replacing any previous file
pub async fn export_report(report: &ComplianceReport, path: &Path) -> Result<(), ExportError> {
    write_json(report, path).await?;
    info!(
        "Exported PRP compliance for {} ({}% overall) to {}",
        report.project,
        report.overall_coverage,
        path.display()
    );
    Ok(())
}

/// Pretty-print `value` as JSON to `path`, creating parent directories
pub async fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(value)?;

    let write_err = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, json).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prp::types::CoverageReport;

    fn report(overall: u8) -> ComplianceReport {
        ComplianceReport {
            project: "todo-app".to_string(),
            session_id: "sess-1".to_string(),
            prp_version: Some("1.0".to_string()),
            has_prp: true,
            timestamp: "2026-01-01T00:00:00+00:00".to_string(),
            user_stories: vec![],
            test_scenarios: vec![],
            overall_coverage: overall,
            requirements: CoverageReport::vacuous(),
        }
    }

    #[tokio::test]
    async fn test_export_writes_expected_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("prp-compliance.json");

        export_report(&report(40), &path).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["project"], "todo-app");
        assert_eq!(value["prpVersion"], "1.0");
        assert_eq!(value["overallCoverage"], 40);
        assert!(value["timestamp"].is_string());
        assert!(value["userStories"].is_array());
        assert!(value["testScenarios"].is_array());
    }

    #[tokio::test]
    async fn test_export_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prp-compliance.json");

        export_report(&report(10), &path).await.unwrap();
        export_report(&report(90), &path).await.unwrap();

        let loaded: ComplianceReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.overall_coverage, 90);
    }

    #[tokio::test]
    async fn test_export_io_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be overwritten as a file
        let err = export_report(&report(0), dir.path()).await.unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
    }
}
