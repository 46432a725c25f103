//! API request and response models

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::assets::ResourceDescriptor;
use crate::error::ClientError;

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(alias = "msg")]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettingSummary {
    pub id: i64,
    pub owner: String,
    pub domain_base: String,
    pub tld: String,
    #[serde(default)]
    pub flagged_data_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettingDetail {
    pub id: i64,
    pub owner: String,
    pub domain_base: String,
    pub tld: String,
    #[serde(default)]
    pub logo: Option<ImageDetail>,
    #[serde(default)]
    pub additional_settings: Option<Value>,
    #[serde(default)]
    pub flagged_data: Vec<FlaggedDataSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlaggedDataSummary {
    pub id: i64,
    pub domain: String,
    pub algorithm: String,
    #[serde(deserialize_with = "lenient_datetime")]
    pub flagged_time: DateTime<Utc>,
    #[serde(default)]
    pub successfully_scraped: bool,
    #[serde(default, deserialize_with = "present")]
    pub suspected_logo: bool,
    #[serde(default)]
    pub scraped_images_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlaggedDataDetail {
    pub id: i64,
    pub domain: String,
    pub searched_domain: String,
    #[serde(default)]
    pub searched_logo: Option<ImageDetail>,
    pub algorithm: String,
    #[serde(deserialize_with = "lenient_datetime")]
    pub flagged_time: DateTime<Utc>,
    #[serde(default)]
    pub successfully_scraped: bool,
    #[serde(default, deserialize_with = "present")]
    pub suspected_logo: bool,
    #[serde(default)]
    pub scraped_images_count: i64,
    #[serde(default)]
    pub images: Vec<ImageDetail>,
    #[serde(default)]
    pub scan_history: Vec<ScanHistory>,
}

impl FlaggedDataDetail {
    /// Images attached directly plus those collected by every scan, without duplicates.
    pub fn all_images(&self) -> Vec<&ImageDetail> {
        let mut seen = std::collections::HashSet::new();
        self.images
            .iter()
            .chain(self.scan_history.iter().flat_map(|scan| scan.images.iter()))
            .filter(|image| seen.insert(image.id))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanHistory {
    pub id: i64,
    #[serde(deserialize_with = "lenient_datetime")]
    pub scan_time: DateTime<Utc>,
    #[serde(default)]
    pub images_scraped: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageDetail {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub local_path: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(deserialize_with = "lenient_datetime")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

impl From<&ImageDetail> for ResourceDescriptor {
    fn from(image: &ImageDetail) -> Self {
        ResourceDescriptor::new(
            image.id,
            image.local_path.clone(),
            image.name.clone(),
            image.format.clone().unwrap_or_default(),
        )
    }
}

/// Logo file attached to a new search setting.
#[derive(Debug, Clone)]
pub struct LogoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl LogoUpload {
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "logo".to_string());
        Ok(Self { file_name, bytes })
    }
}

#[derive(Debug, Clone)]
pub struct NewSearchSetting {
    pub domain_base: String,
    pub tld: String,
    pub additional_settings: Option<Value>,
    pub logo: Option<LogoUpload>,
}

// Accepts RFC 3339 timestamps and the offset-less ISO form the backend emits (read as UTC).
fn lenient_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

// True for any value other than null/false/empty string.
fn present<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    })
}
