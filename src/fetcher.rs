use crate::errors::ReportError;
use crate::models::{Campaign, Enrollment, RecordId, User};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Records requested per page; the maximum the training API allows.
pub const PAGE_SIZE: usize = 500;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client that walks the page-indexed collection endpoints of the training API.
///
/// Every fetch degrades to a partial result: transport faults, malformed
/// bodies and empty pages end pagination and are logged, never returned.
#[derive(Clone)]
pub struct PagedFetcher {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PagedFetcher {
    /// Creates a new `PagedFetcher`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The API base URL, e.g. `https://us.api.knowbe4.com/v1`.
    /// * `token` - The bearer token for authentication.
    pub fn new(base_url: String, token: String) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                ReportError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Fetches every page of `endpoint` and concatenates the records.
    ///
    /// `params` are sent as query filters alongside `page` and `per_page`.
    /// Stops after the first empty, malformed or short page, or on the first
    /// transport error, returning whatever was accumulated.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Vec<T> {
        let mut all_results = Vec::new();
        let mut page = 1usize;

        loop {
            match self.fetch_page::<T>(endpoint, params, page).await {
                Ok(Some(records)) => {
                    let count = records.len();
                    all_results.extend(records);
                    if count < PAGE_SIZE {
                        break;
                    }
                    page += 1;
                }
                Ok(None) => {
                    tracing::error!("Empty response from {} (page {})", endpoint, page);
                    break;
                }
                Err(ReportError::MalformedResponse(body)) => {
                    tracing::error!(
                        "Invalid JSON response from {} (page {}): {}",
                        endpoint,
                        page,
                        body
                    );
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        "Error fetching data from {} (page {}): {}",
                        endpoint,
                        page,
                        e
                    );
                    break;
                }
            }
        }

        tracing::info!("Fetched {} items from {}", all_results.len(), endpoint);
        all_results
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        page: usize,
    ) -> Result<Option<Vec<T>>, ReportError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut query: Vec<(&str, String)> = params
            .iter()
            .filter(|(key, _)| *key != "page" && *key != "per_page")
            .cloned()
            .collect();
        query.push(("page", page.to_string()));
        query.push(("per_page", PAGE_SIZE.to_string()));

        tracing::debug!("GET {} page {}", url, page);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ReportError::Transport(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;

        parse_page(&body)
    }

    /// Fetches all active users.
    pub async fn get_users(&self) -> Vec<User> {
        self.fetch("/users", &[("status", "active".to_string())]).await
    }

    /// Fetches all training campaigns.
    pub async fn get_training_campaigns(&self) -> Vec<Campaign> {
        self.fetch("/training/campaigns", &[]).await
    }

    /// Fetches training enrollments, optionally filtered by campaign.
    pub async fn get_training_enrollments(
        &self,
        campaign_id: Option<&RecordId>,
    ) -> Vec<Enrollment> {
        let params: Vec<(&str, String)> = campaign_id
            .map(|id| vec![("campaign_id", id.to_string())])
            .unwrap_or_default();
        self.fetch("/training/enrollments", &params).await
    }
}

/// Parses one page body. `Ok(None)` marks an empty page.
fn parse_page<T: DeserializeOwned>(body: &str) -> Result<Option<Vec<T>>, ReportError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|_| ReportError::MalformedResponse(body.to_string()))?;

    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Array(items) if items.is_empty() => Ok(None),
        serde_json::Value::Array(items) => {
            serde_json::from_value::<Vec<T>>(serde_json::Value::Array(items))
                .map(Some)
                .map_err(|e| ReportError::MalformedResponse(format!("{} ({})", body, e)))
        }
        _ => Err(ReportError::MalformedResponse(body.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let fetcher = PagedFetcher::new("https://example.com/v1/".to_string(), "token".to_string());
        assert!(fetcher.is_ok());
        assert_eq!(fetcher.unwrap().base_url, "https://example.com/v1");
    }

    #[test]
    fn test_parse_page_variants() {
        assert!(matches!(parse_page::<Campaign>(""), Ok(None)));
        assert!(matches!(parse_page::<Campaign>("[]"), Ok(None)));
        assert!(matches!(parse_page::<Campaign>("null"), Ok(None)));
        assert!(matches!(
            parse_page::<Campaign>("<html>oops</html>"),
            Err(ReportError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_page::<Campaign>(r#"{"error": "nope"}"#),
            Err(ReportError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_page::<Campaign>(r#"[{"unexpected": true}]"#),
            Err(ReportError::MalformedResponse(_))
        ));

        let records = parse_page::<Campaign>(r#"[{"campaign_id": 7, "name": "Security101"}]"#)
            .unwrap()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].campaign_id, RecordId::Int(7));
    }
}
