/// End-to-end report generation
///
/// 1. Fetch active users
/// 2. Fetch campaigns and keep the mandatory ones (exact name match)
/// 3. Fetch enrollments for each mandatory campaign
/// 4. Analyze compliance
/// 5. Write the report files
use crate::analysis::ComplianceAnalyzer;
use crate::config::Config;
use crate::errors::ReportError;
use crate::fetcher::PagedFetcher;
use crate::models::{Campaign, ComplianceReport, Enrollment};
use crate::report::{ReportFiles, ReportWriter};

pub struct ReportGenerator {
    config: Config,
    fetcher: PagedFetcher,
    analyzer: ComplianceAnalyzer,
}

impl ReportGenerator {
    /// Builds the generator from validated configuration.
    pub fn new(config: Config) -> Result<Self, ReportError> {
        let fetcher = PagedFetcher::new(config.api.base_url.clone(), config.api.api_key.clone())?;
        let analyzer = ComplianceAnalyzer::new(config.user_fields.optional.clone());

        Ok(Self {
            config,
            fetcher,
            analyzer,
        })
    }

    /// Fetches everything and analyzes it, without writing files.
    pub async fn build_report(&self) -> Result<ComplianceReport, ReportError> {
        let mandatory = &self.config.training.mandatory_campaigns;

        let users = self.fetcher.get_users().await;

        let all_campaigns = self.fetcher.get_training_campaigns().await;
        let relevant: Vec<Campaign> = all_campaigns
            .into_iter()
            .filter(|campaign| mandatory.contains(&campaign.name))
            .collect();
        tracing::info!("Found {} relevant campaigns", relevant.len());

        let mut enrollments: Vec<Enrollment> = Vec::new();
        for campaign in &relevant {
            let campaign_enrollments = self
                .fetcher
                .get_training_enrollments(Some(&campaign.campaign_id))
                .await;
            tracing::debug!(
                "Campaign '{}' ({}): {} enrollments",
                campaign.name,
                campaign.campaign_id,
                campaign_enrollments.len()
            );
            enrollments.extend(campaign_enrollments);
        }

        self.analyzer.analyze(&users, &enrollments, mandatory)
    }

    /// Builds the report and writes it into `output_dir`.
    pub async fn generate_report(
        &self,
        output_dir: impl Into<std::path::PathBuf>,
    ) -> Result<ReportFiles, ReportError> {
        let report = self.build_report().await?;
        ReportWriter::new(output_dir).write(&report)
    }
}
