use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;

/// Sentinel written to report files when a user attribute is absent.
pub const NOT_AVAILABLE: &str = "N/A";

// ============ Upstream API Records ============

/// Deserializes `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Identifier as returned by the training API.
///
/// The API emits integers, but string identifiers are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

/// A user account from the `/users` endpoint.
///
/// The core schema is fixed; everything else the API sends is kept in
/// `extra` so configured optional fields can be resolved by name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    /// Unique identifier, used as the join key with enrollments.
    pub id: RecordId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    /// Manager display name, if the account has one.
    #[serde(default)]
    pub manager_name: Option<String>,
    /// Any attribute not covered by the core schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// First and last name joined by a single space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Resolves an attribute by its API field name.
    ///
    /// Returns `None` when the attribute is missing or `null`. Scalars are
    /// rendered as text, nested values as compact JSON.
    pub fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            "first_name" => Some(self.first_name.clone()),
            "last_name" => Some(self.last_name.clone()),
            "email" => Some(self.email.clone()),
            "manager_name" => self.manager_name.clone(),
            _ => self.extra.get(name).and_then(render_value),
        }
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// A training campaign from `/training/campaigns`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Campaign {
    pub campaign_id: RecordId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// The user reference embedded in an enrollment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnrollmentUser {
    pub id: RecordId,
}

/// A user's enrollment in one training campaign.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Enrollment {
    pub user: EnrollmentUser,
    #[serde(default, deserialize_with = "null_as_default")]
    pub campaign_name: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Raw due date, `YYYY-MM-DDTHH:MM:SSZ`. Parsed during analysis.
    #[serde(default)]
    pub due_date: Option<String>,
}

impl Enrollment {
    /// The due date, treating an empty string as absent.
    pub fn due_date(&self) -> Option<&str> {
        self.due_date.as_deref().filter(|d| !d.is_empty())
    }
}

// ============ Report Types ============

/// Aggregate compliance figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceMetrics {
    /// Number of fetched users, duplicates included.
    pub total_users: usize,
    pub total_untrained_users: usize,
    /// Percentage of users not untrained, rounded to two decimals.
    pub completion_rate: f64,
}

/// Per-campaign breakdown for a mandatory campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignSummary {
    pub campaign_name: String,
    pub enrollments: usize,
    /// Enrollments with a terminal-success status.
    pub completed: usize,
    /// Enrollments that mark their user untrained.
    pub overdue: usize,
    pub completion_rate: f64,
}

/// Detail row for a user who failed a mandatory campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct UntrainedUser {
    pub name: String,
    pub email: String,
    pub manager: Option<String>,
    /// Configured optional fields in configuration order.
    pub optional_fields: Vec<(String, Option<String>)>,
}

impl UntrainedUser {
    /// Output row: Name, Email, Manager, then optional fields, with absent
    /// values rendered as [`NOT_AVAILABLE`].
    pub fn row(&self) -> Vec<String> {
        let mut row = vec![
            self.name.clone(),
            self.email.clone(),
            self.manager.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ];
        row.extend(
            self.optional_fields
                .iter()
                .map(|(_, value)| value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())),
        );
        row
    }

    /// Names of the optional fields carried in [`row`](Self::row).
    pub fn field_names(&self) -> Vec<&str> {
        self.optional_fields
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Result of a compliance analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceReport {
    pub metrics: ComplianceMetrics,
    pub untrained_users: Vec<UntrainedUser>,
    pub campaign_summaries: Vec<CampaignSummary>,
}
