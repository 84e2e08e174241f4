use thiserror::Error;

use crate::table_store::parse_spreadsheet_id;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub table: TableConfig,
    pub upload: UploadConfig,
    /// Path to a Google service account JSON (optional, defaults to the metadata server)
    pub google_credentials_file: Option<String>,
    /// Display cache lifetime in seconds
    pub cache_ttl_seconds: u64,
    /// Mounts the add/update/delete routes.
    pub edit_mode: bool,
    /// Maximum thumbnail upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBackend {
    Local,
    Sheets,
}

#[derive(Debug, Clone)]
pub struct TableConfig {
    pub backend: TableBackend,
    /// Directory for the local redb table
    pub data_dir: String,
    /// Bare ID; a full sheet URL in the environment is reduced to its ID.
    pub spreadsheet_id: Option<String>,
    pub sheet_range: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadBackend {
    Drive,
    Local,
    Proxy,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub backend: UploadBackend,
    /// Default destination folder. Empty uploads to the backend's root.
    pub folder_id: String,
    pub proxy_url: Option<String>,
    pub local_upload_path: String,
    /// Base for URLs handed out by the local backend
    pub public_base_url: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            backend: TableBackend::Local,
            data_dir: "./data".to_string(),
            spreadsheet_id: None,
            sheet_range: "Sheet1".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            backend: UploadBackend::Local,
            folder_id: String::new(),
            proxy_url: None,
            local_upload_path: "./uploads".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let table_backend = match std::env::var("TABLE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => TableBackend::Local,
            "sheets" => TableBackend::Sheets,
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown TABLE_BACKEND '{other}' (expected local or sheets)"
                )))
            }
        };

        let upload_backend = match std::env::var("UPLOAD_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => UploadBackend::Local,
            "drive" => UploadBackend::Drive,
            "proxy" => UploadBackend::Proxy,
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown UPLOAD_BACKEND '{other}' (expected local, drive or proxy)"
                )))
            }
        };

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        let spreadsheet_id = std::env::var("SPREADSHEET_ID")
            .ok()
            .map(|s| parse_spreadsheet_id(&s))
            .filter(|s| !s.is_empty());
        let sheet_range = std::env::var("SHEET_RANGE").unwrap_or_else(|_| "Sheet1".to_string());

        let folder_id = std::env::var("UPLOAD_FOLDER_ID").unwrap_or_default();
        let proxy_url = std::env::var("UPLOAD_PROXY_URL").ok().filter(|s| !s.is_empty());
        let local_upload_path =
            std::env::var("LOCAL_UPLOAD_PATH").unwrap_or_else(|_| "./uploads".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let google_credentials_file = std::env::var("GOOGLE_CREDENTIALS_FILE").ok();

        let cache_ttl_seconds = std::env::var("CACHE_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);

        let edit_mode = std::env::var("EDIT_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10 * 1024 * 1024); // 10MB

        let config = Config {
            bind_address,
            table: TableConfig {
                backend: table_backend,
                data_dir,
                spreadsheet_id,
                sheet_range,
            },
            upload: UploadConfig {
                backend: upload_backend,
                folder_id,
                proxy_url,
                local_upload_path,
                public_base_url,
            },
            google_credentials_file,
            cache_ttl_seconds,
            edit_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.table.backend == TableBackend::Sheets && self.table.spreadsheet_id.is_none() {
            return Err(ConfigError::ValidationError(
                "SPREADSHEET_ID is required when TABLE_BACKEND=sheets".to_string(),
            ));
        }

        if self.table.sheet_range.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "SHEET_RANGE cannot be empty".to_string(),
            ));
        }

        if self.upload.backend == UploadBackend::Proxy && self.upload.proxy_url.is_none() {
            return Err(ConfigError::ValidationError(
                "UPLOAD_PROXY_URL is required when UPLOAD_BACKEND=proxy".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.cache_ttl_seconds == 0 {
            tracing::warn!("CACHE_TTL_SECONDS is 0; every read goes to the table store");
        }

        Ok(())
    }

    /// Whether any configured backend talks to Google APIs.
    pub fn needs_google_auth(&self) -> bool {
        self.table.backend == TableBackend::Sheets || self.upload.backend == UploadBackend::Drive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            table: TableConfig::default(),
            upload: UploadConfig::default(),
            google_credentials_file: None,
            cache_ttl_seconds: 600,
            edit_mode: true,
            max_upload_size: 1024,
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(config().validate().is_ok());
        assert!(!config().needs_google_auth());
    }

    #[test]
    fn test_sheets_requires_spreadsheet_id() {
        let mut config = config();
        config.table.backend = TableBackend::Sheets;
        assert!(config.validate().is_err());

        config.table.spreadsheet_id = Some("abc".to_string());
        assert!(config.validate().is_ok());
        assert!(config.needs_google_auth());
    }

    #[test]
    fn test_proxy_requires_url() {
        let mut config = config();
        config.upload.backend = UploadBackend::Proxy;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("UPLOAD_PROXY_URL")
        ));
    }
}
