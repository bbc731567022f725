use serde::{Deserialize, Serialize};

/// Base URL used to compose the upload endpoint from a cloud name.
pub const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Filename given to every stamped upload.
pub const STAMPED_FILENAME: &str = "stamped.pdf";

/// Remote object store configuration.
///
/// Either `upload_url` or `cloud_name` must be set; the explicit URL wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Fully-specified upload endpoint
    #[serde(default)]
    pub upload_url: Option<String>,

    /// Unsigned upload preset attached to each upload
    #[serde(default)]
    pub upload_preset: Option<String>,

    /// Cloud account name used to compose the default endpoint
    #[serde(default)]
    pub cloud_name: Option<String>,
}

impl UploadConfig {
    /// Resolve the endpoint uploads are POSTed to.
    pub fn endpoint(&self) -> Result<String, crate::error::Error> {
        if let Some(url) = non_empty(self.upload_url.as_deref()) {
            return Ok(url.to_string());
        }

        non_empty(self.cloud_name.as_deref())
            .map(|cloud| format!("{CLOUDINARY_API_BASE}/{cloud}/auto/upload"))
            .ok_or_else(|| {
                crate::error::Error::ConfigMissing("upload_url or cloud_name".to_string())
            })
    }

    /// Preset to attach, if any.
    pub fn preset(&self) -> Option<&str> {
        non_empty(self.upload_preset.as_deref())
    }

    /// Overlay values from another source; `Some` fields in `other` win.
    #[must_use]
    pub fn merged_with(self, other: Self) -> Self {
        Self {
            upload_url: other.upload_url.or(self.upload_url),
            upload_preset: other.upload_preset.or(self.upload_preset),
            cloud_name: other.cloud_name.or(self.cloud_name),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Object store settings
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, crate::error::Error> {
        toml::from_str(content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })
    }

    /// Load from default locations (~/.config/pdf-stamper/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-stamper").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }
}
