use crate::errors::{ReportError, ResultExt};
use crate::models::ComplianceReport;
use std::path::{Path, PathBuf};

/// `strftime` pattern used to stamp report file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Paths of the artifacts written for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFiles {
    pub metrics: PathBuf,
    /// `None` when there were no untrained users to write.
    pub untrained: Option<PathBuf>,
}

/// Writes compliance reports as CSV files into an output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writes `report` stamped with the current local time.
    pub fn write(&self, report: &ComplianceReport) -> Result<ReportFiles, ReportError> {
        let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.write_at(report, &stamp)
    }

    /// Writes `report` using `stamp` in both file names.
    pub fn write_at(
        &self,
        report: &ComplianceReport,
        stamp: &str,
    ) -> Result<ReportFiles, ReportError> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("creating output directory {}", self.output_dir.display())
        })?;

        let metrics = self
            .output_dir
            .join(format!("knowbe4_metrics_{}.csv", stamp));
        write_metrics(&metrics, report)
            .with_context(|| format!("writing {}", metrics.display()))?;
        tracing::info!("Metrics saved to {}", metrics.display());

        let untrained = if report.untrained_users.is_empty() {
            tracing::info!("No untrained users; skipping untrained users file");
            None
        } else {
            let path = self
                .output_dir
                .join(format!("knowbe4_untrained_users_{}.csv", stamp));
            write_untrained(&path, report)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Untrained users saved to {}", path.display());
            Some(path)
        };

        Ok(ReportFiles { metrics, untrained })
    }
}

fn write_metrics(path: &Path, report: &ComplianceReport) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Metric", "Value"])?;

    let metrics = &report.metrics;
    writer.write_record(["Total Users".to_string(), metrics.total_users.to_string()])?;
    writer.write_record([
        "Total Untrained Users".to_string(),
        metrics.total_untrained_users.to_string(),
    ])?;
    writer.write_record([
        "Completion Rate (%)".to_string(),
        format_rate(metrics.completion_rate),
    ])?;

    if !report.campaign_summaries.is_empty() {
        writer.write_record(["Campaign Completion Rates", ""])?;
        for summary in &report.campaign_summaries {
            writer.write_record([
                format!(" - {}", summary.campaign_name),
                format_rate(summary.completion_rate),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Percentages always carry a fractional part (`100.0`, not `100`).
fn format_rate(rate: f64) -> String {
    format!("{:?}", rate)
}

fn write_untrained(path: &Path, report: &ComplianceReport) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;

    // Every row is built from the same field list, so the first one names the columns.
    let mut header = vec!["Name", "Email", "Manager"];
    if let Some(first) = report.untrained_users.first() {
        header.extend(first.field_names());
    }
    writer.write_record(&header)?;

    for user in &report.untrained_users {
        writer.write_record(user.row())?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CampaignSummary, ComplianceMetrics, UntrainedUser};

    fn sample_report(untrained: Vec<UntrainedUser>) -> ComplianceReport {
        ComplianceReport {
            metrics: ComplianceMetrics {
                total_users: 3,
                total_untrained_users: untrained.len(),
                completion_rate: 66.67,
            },
            untrained_users: untrained,
            campaign_summaries: vec![CampaignSummary {
                campaign_name: "Security101".to_string(),
                enrollments: 3,
                completed: 2,
                overdue: 1,
                completion_rate: 66.67,
            }],
        }
    }

    #[test]
    fn test_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("out"));
        let report = sample_report(vec![UntrainedUser {
            name: "Smith, Jo".to_string(),
            email: "jo@example.com".to_string(),
            manager: None,
            optional_fields: vec![("department".to_string(), Some("Finance".to_string()))],
        }]);

        let files = writer
            .write_at(&report, "20240101_120000")
            .unwrap();

        assert!(files.metrics.ends_with("knowbe4_metrics_20240101_120000.csv"));
        let metrics = std::fs::read_to_string(&files.metrics).unwrap();
        assert_eq!(
            metrics,
            "Metric,Value\n\
             Total Users,3\n\
             Total Untrained Users,1\n\
             Completion Rate (%),66.67\n\
             Campaign Completion Rates,\n\
             \x20- Security101,66.67\n"
        );

        let untrained_path = files.untrained.unwrap();
        assert!(untrained_path.ends_with("knowbe4_untrained_users_20240101_120000.csv"));
        let untrained = std::fs::read_to_string(untrained_path).unwrap();
        assert_eq!(
            untrained,
            "Name,Email,Manager,department\n\"Smith, Jo\",jo@example.com,N/A,Finance\n"
        );
    }

    #[test]
    fn test_skips_untrained_file_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let files = writer
            .write_at(&sample_report(Vec::new()), "20240101_120000")
            .unwrap();

        assert!(files.metrics.exists());
        assert_eq!(files.untrained, None);
        assert!(!dir
            .path()
            .join("knowbe4_untrained_users_20240101_120000.csv")
            .exists());
    }

    #[test]
    fn test_whole_rates_keep_decimal_point() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let mut report = sample_report(Vec::new());
        report.metrics.completion_rate = 100.0;
        report.campaign_summaries[0].completion_rate = 0.0;

        let files = writer.write_at(&report, "20240101_120000").unwrap();

        let metrics = std::fs::read_to_string(&files.metrics).unwrap();
        assert!(metrics.contains("Completion Rate (%),100.0\n"));
        assert!(metrics.contains(" - Security101,0.0\n"));
    }

    #[test]
    fn test_untrained_header_follows_row_fields() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let report = sample_report(vec![UntrainedUser {
            name: "Jo Smith".to_string(),
            email: "jo@example.com".to_string(),
            manager: Some("Pat".to_string()),
            optional_fields: vec![
                ("location".to_string(), None),
                ("department".to_string(), Some("Finance".to_string())),
            ],
        }]);

        let files = writer.write_at(&report, "20240101_120000").unwrap();

        let untrained = std::fs::read_to_string(files.untrained.unwrap()).unwrap();
        assert_eq!(
            untrained,
            "Name,Email,Manager,location,department\n\
             Jo Smith,jo@example.com,Pat,N/A,Finance\n"
        );
    }
}
