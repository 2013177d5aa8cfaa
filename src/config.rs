use serde::Deserialize;
use std::path::Path;

use crate::errors::{ReportError, ResultExt};

pub const DEFAULT_BASE_URL: &str = "https://us.api.knowbe4.com/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub user_fields: UserFieldsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingConfig {
    /// Campaign names that every user must complete.
    #[serde(default)]
    pub mandatory_campaigns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFieldsConfig {
    /// Extra user attributes copied into the untrained-users report.
    #[serde(default)]
    pub optional: Vec<String>,
}

impl Config {
    /// Loads the YAML file at `path`, applies `KB4_API_KEY` / `KB4_BASE_URL`
    /// overrides from the environment (or `.env`) and validates the result.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        dotenvy::dotenv().ok();

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file {}", path.display()))?;
        let mut config: Config = serde_yaml::from_str(&raw)?;

        if let Some(key) = std::env::var("KB4_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            config.api.api_key = key;
        }
        if let Some(url) = std::env::var("KB4_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            config.api.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from a YAML string, without
    /// consulting the environment.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ReportError> {
        let config: Config = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ReportError> {
        if self.api.api_key.trim().is_empty() {
            return Err(ReportError::Configuration(
                "api.api_key is empty or missing (set it in the config file or KB4_API_KEY)"
                    .to_string(),
            ));
        }

        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ReportError::Configuration(
                "api.base_url cannot be empty".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ReportError::Configuration(
                "api.base_url must start with http:// or https://".to_string(),
            ));
        }
        url::Url::parse(base_url).map_err(|e| {
            ReportError::Configuration(format!("api.base_url is not a valid URL: {}", e))
        })?;

        // Non-fatal: the run proceeds and simply finds no relevant campaigns
        tracing::info!(
            "Mandatory campaigns: {:?}",
            self.training.mandatory_campaigns
        );
        if self.training.mandatory_campaigns.is_empty() {
            tracing::error!("training.mandatory_campaigns is empty or invalid");
        }
        tracing::info!("Optional user fields: {:?}", self.user_fields.optional);
        tracing::debug!("API base URL: {}", self.api.base_url);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parses() {
        let config = Config::from_yaml_str(
            r#"
api:
  base_url: https://eu.api.knowbe4.com/v1
  api_key: secret
training:
  mandatory_campaigns:
    - Security Awareness 2024
    - Phishing Basics
user_fields:
  optional:
    - department
    - location
"#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://eu.api.knowbe4.com/v1");
        assert_eq!(config.api.api_key, "secret");
        assert_eq!(config.training.mandatory_campaigns.len(), 2);
        assert_eq!(config.user_fields.optional, vec!["department", "location"]);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = Config::from_yaml_str(
            r#"
api:
  api_key: "   "
training:
  mandatory_campaigns: [Security101]
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ReportError::Configuration(_)));
    }

    #[test]
    fn test_empty_mandatory_list_is_not_fatal() {
        let config = Config::from_yaml_str("api:\n  api_key: secret\n").unwrap();

        assert!(config.training.mandatory_campaigns.is_empty());
        assert!(config.user_fields.optional.is_empty());
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_scheme_required() {
        let err = Config::from_yaml_str(
            "api:\n  api_key: secret\n  base_url: us.api.knowbe4.com/v1\n",
        )
        .unwrap_err();

        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = Config::load(Path::new("/nonexistent/kb4/config.yaml")).unwrap_err();

        assert!(err.to_string().contains("/nonexistent/kb4/config.yaml"));
    }
}
