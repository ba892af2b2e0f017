//! Process configuration read from environment variables.
//!
//! A `.env` file in the working directory is honoured when present. Values are
//! resolved through a lookup function so tests can supply their own map.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is required when {context}")]
    Missing { key: &'static str, context: String },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Where uploaded images go.
#[derive(Debug)]
pub enum MediaConfig {
    Memory,
    Local {
        root: PathBuf,
        url_prefix: String,
    },
    Cloudinary {
        cloud_name: String,
        api_key: String,
        api_secret: SecretString,
        folder: Option<String>,
    },
}

#[derive(Debug)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: SecretString,
    /// `None` selects the in-memory stores.
    pub database_url: Option<SecretString>,
    pub media: MediaConfig,
    pub max_upload_bytes: usize,
    /// `None` allows any origin.
    pub cors_allow_origin: Option<String>,
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let media = match var("IMAGE_STORE").as_deref().unwrap_or("memory") {
            "memory" => MediaConfig::Memory,
            "local" => MediaConfig::Local {
                root: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string())),
                url_prefix: var("UPLOAD_URL_PREFIX").unwrap_or_else(|| "/uploads".to_string()),
            },
            "cloudinary" => {
                let required = |key: &'static str| {
                    var(key).ok_or_else(|| ConfigError::Missing {
                        key,
                        context: "IMAGE_STORE=cloudinary".to_string(),
                    })
                };
                MediaConfig::Cloudinary {
                    cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                    api_key: required("CLOUDINARY_API_KEY")?,
                    api_secret: SecretString::from(required("CLOUDINARY_API_SECRET")?),
                    folder: var("CLOUDINARY_FOLDER"),
                }
            }
            other => {
                return Err(ConfigError::Invalid {
                    key: "IMAGE_STORE",
                    reason: format!("expected memory, local or cloudinary, got {other:?}"),
                });
            }
        };

        let database_url = var("DATABASE_URL").map(SecretString::from);
        if database_url.is_none() {
            info!("DATABASE_URL not set; using in-memory stores");
        }

        Ok(Self {
            port: parse_or("PORT", var("PORT"), 5000)?,
            jwt_secret: SecretString::from(jwt_secret),
            database_url,
            media,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", var("MAX_UPLOAD_BYTES"), 5 * 1024 * 1024)?,
            cors_allow_origin: var("CORS_ALLOW_ORIGIN"),
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match raw {
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}
