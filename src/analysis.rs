//! Compliance analysis: correlates users with their enrollments in mandatory
//! campaigns and derives untrained users and summary metrics.

use crate::errors::ReportError;
use crate::models::{
    CampaignSummary, ComplianceMetrics, ComplianceReport, Enrollment, RecordId, UntrainedUser,
    User,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Format of enrollment due dates, always UTC.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Enrollment statuses that count as having satisfied a campaign.
pub const COMPLETED_STATUSES: [&str; 2] = ["Completed", "Passed"];

pub fn is_completed(status: Option<&str>) -> bool {
    status.is_some_and(|s| COMPLETED_STATUSES.contains(&s))
}

/// Parses a due date in [`DUE_DATE_FORMAT`].
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, ReportError> {
    NaiveDateTime::parse_from_str(raw, DUE_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| ReportError::DataFormat {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Whether an enrollment leaves its user untrained at `now`.
///
/// Incomplete enrollments without a due date qualify immediately; with a due
/// date they qualify once it is reached (`due <= now`).
fn is_overdue(enrollment: &Enrollment, now: DateTime<Utc>) -> Result<bool, ReportError> {
    if is_completed(enrollment.status.as_deref()) {
        return Ok(false);
    }
    match enrollment.due_date() {
        None => Ok(true),
        Some(raw) => Ok(parse_due_date(raw)? <= now),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn rate(satisfied: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(satisfied as f64 / total as f64 * 100.0)
    }
}

#[derive(Default)]
struct CampaignTally {
    enrollments: usize,
    completed: usize,
    overdue: usize,
}

/// Classifies users as trained or untrained against mandatory campaigns.
#[derive(Debug, Clone, Default)]
pub struct ComplianceAnalyzer {
    optional_fields: Vec<String>,
}

impl ComplianceAnalyzer {
    /// `optional_fields` are the extra user attributes copied into each
    /// untrained-user row.
    pub fn new(optional_fields: Vec<String>) -> Self {
        Self { optional_fields }
    }

    /// Analyzes against the current wall-clock time.
    pub fn analyze(
        &self,
        users: &[User],
        enrollments: &[Enrollment],
        mandatory_campaigns: &[String],
    ) -> Result<ComplianceReport, ReportError> {
        self.analyze_at(users, enrollments, mandatory_campaigns, Utc::now())
    }

    /// Analyzes with due dates compared against `now`.
    ///
    /// Users without any mandatory-campaign enrollment are never flagged.
    /// A malformed due date on a mandatory, incomplete enrollment aborts the
    /// analysis with [`ReportError::DataFormat`].
    pub fn analyze_at(
        &self,
        users: &[User],
        enrollments: &[Enrollment],
        mandatory_campaigns: &[String],
        now: DateTime<Utc>,
    ) -> Result<ComplianceReport, ReportError> {
        // Later duplicates replace earlier ones
        let user_lookup: HashMap<&RecordId, &User> =
            users.iter().map(|user| (&user.id, user)).collect();
        let mandatory: HashSet<&str> = mandatory_campaigns.iter().map(String::as_str).collect();

        let mut untrained_ids: Vec<&RecordId> = Vec::new();
        let mut seen: HashSet<&RecordId> = HashSet::new();
        let mut enrollments_by_user: HashMap<&RecordId, usize> = HashMap::new();
        let mut tallies: HashMap<&str, CampaignTally> = HashMap::new();

        for enrollment in enrollments {
            let user_id = &enrollment.user.id;
            *enrollments_by_user.entry(user_id).or_default() += 1;

            if !mandatory.contains(enrollment.campaign_name.as_str()) {
                continue;
            }

            let overdue = is_overdue(enrollment, now)?;
            let tally = tallies.entry(enrollment.campaign_name.as_str()).or_default();
            tally.enrollments += 1;
            if is_completed(enrollment.status.as_deref()) {
                tally.completed += 1;
            }
            if overdue {
                tally.overdue += 1;
                if seen.insert(user_id) {
                    untrained_ids.push(user_id);
                }
            }
        }

        tracing::debug!(
            "{} enrollments across {} users",
            enrollments.len(),
            enrollments_by_user.len()
        );

        let untrained_users: Vec<UntrainedUser> = untrained_ids
            .iter()
            .filter_map(|id| user_lookup.get(id))
            .map(|user| self.untrained_row(user))
            .collect();

        let dropped = untrained_ids.len() - untrained_users.len();
        if dropped > 0 {
            tracing::warn!("{} untrained user ids not found among fetched users", dropped);
        }

        let total_users = users.len();
        let total_untrained_users = untrained_ids.len();
        let metrics = ComplianceMetrics {
            total_users,
            total_untrained_users,
            completion_rate: rate(total_users.saturating_sub(total_untrained_users), total_users),
        };

        let mut summarized: HashSet<&str> = HashSet::new();
        let campaign_summaries = mandatory_campaigns
            .iter()
            .filter(|name| summarized.insert(name.as_str()))
            .map(|name| {
                let tally = tallies.remove(name.as_str()).unwrap_or_default();
                CampaignSummary {
                    campaign_name: name.clone(),
                    enrollments: tally.enrollments,
                    completed: tally.completed,
                    overdue: tally.overdue,
                    completion_rate: rate(tally.completed, tally.enrollments),
                }
            })
            .collect();

        tracing::info!(
            "Compliance analysis: {} users, {} untrained, {}% completion",
            metrics.total_users,
            metrics.total_untrained_users,
            metrics.completion_rate
        );

        Ok(ComplianceReport {
            metrics,
            untrained_users,
            campaign_summaries,
        })
    }

    fn untrained_row(&self, user: &User) -> UntrainedUser {
        UntrainedUser {
            name: user.full_name(),
            email: user.email.clone(),
            manager: user.manager_name.clone(),
            optional_fields: self
                .optional_fields
                .iter()
                .map(|field| (field.clone(), user.attribute(field)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_due_date() {
        let due = parse_due_date("2024-03-01T12:30:00Z").unwrap();
        assert_eq!(due.to_rfc3339(), "2024-03-01T12:30:00+00:00");

        assert!(matches!(
            parse_due_date("2024-03-01"),
            Err(ReportError::DataFormat { .. })
        ));
        assert!(parse_due_date("2024-03-01T12:30:00.000Z").is_err());
    }

    #[test]
    fn test_is_completed() {
        assert!(is_completed(Some("Completed")));
        assert!(is_completed(Some("Passed")));
        assert!(!is_completed(Some("completed")));
        assert!(!is_completed(Some("In Progress")));
        assert!(!is_completed(None));
    }

    #[test]
    fn test_rate_rounding() {
        assert_eq!(rate(2, 3), 66.67);
        assert_eq!(rate(1, 3), 33.33);
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(5, 5), 100.0);
    }
}
