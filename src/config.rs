use crate::constants::{
    DEFAULT_MAX_ENTRIES, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, ENV_BASE_URL,
    ENV_OBJECT_STORE_ENDPOINT,
};
use crate::error::{Result, ScraperError};
use crate::storage::{StorageConfig, StorageKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    pub web_page: WebPageSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebPageSettings {
    pub base_url: String,
    #[serde(default = "default_max_entries")]
    pub amount_of_movies: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageSettings {
    #[serde(rename = "Type", default = "default_kind")]
    pub kind: StorageKind,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub skip_already_processed: bool,
    pub s3: Option<S3Settings>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            kind: StorageKind::Local,
            output_dir: default_output_dir(),
            skip_already_processed: false,
            s3: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_kind() -> StorageKind {
    StorageKind::Local
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let mut settings = Self::from_toml_str(&content)?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.web_page.base_url = url;
        }
        if let Some(endpoint) = lookup(ENV_OBJECT_STORE_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            if let Some(s3) = self.storage.s3.as_mut() {
                s3.endpoint = Some(endpoint);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.web_page.base_url.trim().is_empty() {
            return Err(ScraperError::Config("WebPage.BaseUrl must not be empty".to_string()));
        }
        if self.web_page.amount_of_movies == 0 {
            return Err(ScraperError::Config("WebPage.AmountOfMovies must be positive".to_string()));
        }
        if self.storage.kind == StorageKind::ObjectStore && self.storage.s3.is_none() {
            return Err(ScraperError::Config(
                "Storage.Type is \"s3\" but no [Storage.S3] section is configured".to_string(),
            ));
        }
        Ok(())
    }

    pub fn storage_config(&self) -> StorageConfig {
        let s3 = self.storage.s3.as_ref();
        StorageConfig {
            kind: self.storage.kind,
            local_root: self.storage.output_dir.clone(),
            bucket: s3.map(|s| s.bucket.clone()),
            region: s3.and_then(|s| s.region.clone()),
            endpoint: s3.and_then(|s| s.endpoint.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[WebPage]
BaseUrl = "https://cartelera.example.com/peliculas"
AmountOfMovies = 12

[Storage]
Type = "s3"
OutputDir = "out/movies_data"
SkipAlreadyProcessed = true

[Storage.S3]
Bucket = "posters"
Region = "eu-west-1"

[Http]
TimeoutSeconds = 5
"#;

    #[test]
    fn test_parse_full_settings() {
        let settings = Settings::from_toml_str(FULL).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.web_page.amount_of_movies, 12);
        assert_eq!(settings.storage.kind, StorageKind::ObjectStore);
        assert!(settings.storage.skip_already_processed);
        assert_eq!(settings.http.timeout_seconds, 5);
        assert_eq!(settings.http.user_agent, DEFAULT_USER_AGENT);

        let storage = settings.storage_config();
        assert_eq!(storage.bucket.as_deref(), Some("posters"));
        assert_eq!(storage.region.as_deref(), Some("eu-west-1"));
        assert_eq!(storage.local_root, PathBuf::from("out/movies_data"));
    }

    #[test]
    fn test_defaults() {
        let settings =
            Settings::from_toml_str("[WebPage]\nBaseUrl = \"https://example.com\"\n").unwrap();
        assert_eq!(settings.web_page.amount_of_movies, DEFAULT_MAX_ENTRIES);
        assert_eq!(settings.storage.kind, StorageKind::Local);
        assert_eq!(settings.storage.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert!(!settings.storage.skip_already_processed);
    }

    #[test]
    fn test_validation_errors() {
        let zero = "[WebPage]\nBaseUrl = \"https://example.com\"\nAmountOfMovies = 0\n";
        assert!(matches!(
            Settings::from_toml_str(zero).unwrap().validate(),
            Err(ScraperError::Config(_))
        ));

        let s3_without_section =
            "[WebPage]\nBaseUrl = \"https://example.com\"\n[Storage]\nType = \"s3\"\n";
        assert!(Settings::from_toml_str(s3_without_section).unwrap().validate().is_err());

        let memory = "[WebPage]\nBaseUrl = \"https://example.com\"\n[Storage]\nType = \"memory\"\n";
        let settings = Settings::from_toml_str(memory).unwrap();
        assert_eq!(settings.storage.kind, StorageKind::Memory);
        assert!(settings.validate().is_ok());

        let bad_kind = "[WebPage]\nBaseUrl = \"https://example.com\"\n[Storage]\nType = \"ftp\"\n";
        assert!(matches!(Settings::from_toml_str(bad_kind), Err(ScraperError::Toml(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::from_toml_str(FULL).unwrap();
        settings.apply_env_overrides(|key| match key {
            ENV_BASE_URL => Some("https://other.example.com".to_string()),
            ENV_OBJECT_STORE_ENDPOINT => Some("http://localhost:9000".to_string()),
            _ => None,
        });
        assert_eq!(settings.web_page.base_url, "https://other.example.com");
        assert_eq!(
            settings.storage_config().endpoint.as_deref(),
            Some("http://localhost:9000")
        );
    }
}
