//! source/sheets.rs
//!
//! Google Sheets source. Reads the whole first worksheet through the Sheets
//! v4 values API; no ranged reads, so the request can never run past the
//! sheet's grid limits.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Grid, GridSource, SourceConnector};
use crate::error::HubError;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Token environment variable that overrides the credentials file.
pub const TOKEN_ENV: &str = "JAWSENSE_SHEETS_TOKEN";

/// How requests are authorised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetsCredentials {
    /// OAuth bearer token, sent as `Authorization: Bearer`.
    AccessToken(String),
    /// API key for publicly readable sheets, sent as `?key=`.
    ApiKey(String),
}

impl SheetsCredentials {
    /// Read credentials from a JSON file of the form
    /// `{"access_token": "..."}` or `{"api_key": "..."}`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HubError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HubError::ConfigError(format!("credentials {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| HubError::ConfigError(format!("credentials {}: {}", path.display(), e)))
    }

    /// Prefer the token environment variable, fall back to the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HubError> {
        match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                Ok(SheetsCredentials::AccessToken(token.trim().to_string()))
            }
            _ => Self::from_file(path),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            SheetsCredentials::AccessToken(token) => request.bearer_auth(token),
            SheetsCredentials::ApiKey(key) => request.query(&[("key", key)]),
        }
    }
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Opens handles on the first worksheet of a spreadsheet.
pub struct SheetsConnector {
    spreadsheet_id: String,
    credentials_path: std::path::PathBuf,
    base_url: String,
}

impl SheetsConnector {
    pub fn new(spreadsheet_id: impl Into<String>, credentials_path: impl AsRef<Path>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            credentials_path: credentials_path.as_ref().to_path_buf(),
            base_url: SHEETS_API.to_string(),
        }
    }

    /// Point at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SourceConnector for SheetsConnector {
    async fn connect(&self) -> Result<Box<dyn GridSource>, HubError> {
        if self.spreadsheet_id.is_empty() {
            return Err(HubError::ConfigError("no spreadsheet id configured".into()));
        }
        let credentials = SheetsCredentials::load(&self.credentials_path)?;
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let url = format!("{}/{}", self.base_url, self.spreadsheet_id);
        let meta: SpreadsheetMeta = credentials
            .authorize(client.get(&url).query(&[("fields", "sheets.properties.title")]))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let title = meta
            .sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| HubError::SourceError("spreadsheet has no worksheets".into()))?;

        let mut values_url = reqwest::Url::parse(&url)
            .map_err(|e| HubError::ConfigError(format!("{}: {}", url, e)))?;
        values_url
            .path_segments_mut()
            .map_err(|_| HubError::ConfigError(format!("{} cannot carry a path", url)))?
            .push("values")
            .push(&title);

        Ok(Box::new(SheetsSource {
            client,
            credentials,
            values_url,
            title,
        }))
    }
}

struct SheetsSource {
    client: reqwest::Client,
    credentials: SheetsCredentials,
    values_url: reqwest::Url,
    title: String,
}

#[async_trait]
impl GridSource for SheetsSource {
    async fn fetch_all(&self) -> Result<Grid, HubError> {
        let range: ValueRange = self
            .credentials
            .authorize(self.client.get(self.values_url.clone()))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(to_rectangular(range.values))
    }

    fn describe(&self) -> String {
        format!("worksheet '{}'", self.title)
    }
}

/// The API drops trailing empty cells; pad every row to the widest one.
fn to_rectangular(values: Vec<Vec<serde_json::Value>>) -> Grid {
    let width = values.iter().map(Vec::len).max().unwrap_or(0);
    values
        .into_iter()
        .map(|row| {
            let mut cells: Vec<String> = row.into_iter().map(cell_text).collect();
            cells.resize(width, String::new());
            cells
        })
        .collect()
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rows_are_padded_to_rectangle() {
        let grid = to_rectangular(vec![
            vec!["time".into(), "emg".into(), "note".into()],
            vec!["t0".into(), serde_json::json!(2048)],
            vec![],
        ]);
        assert_eq!(grid[0], vec!["time", "emg", "note"]);
        assert_eq!(grid[1], vec!["t0", "2048", ""]);
        assert_eq!(grid[2], vec!["", "", ""]);
    }

    #[test]
    fn test_empty_range_is_empty_grid() {
        let range: ValueRange = serde_json::from_str(r#"{"range": "Sheet1"}"#).unwrap();
        assert!(to_rectangular(range.values).is_empty());
    }

    #[test]
    fn test_credentials_file_formats() {
        let mut token = tempfile::NamedTempFile::new().unwrap();
        write!(token, r#"{{"access_token": "ya29.abc"}}"#).unwrap();
        assert_eq!(
            SheetsCredentials::from_file(token.path()).unwrap(),
            SheetsCredentials::AccessToken("ya29.abc".into())
        );

        let mut key = tempfile::NamedTempFile::new().unwrap();
        write!(key, r#"{{"api_key": "AIza"}}"#).unwrap();
        assert_eq!(
            SheetsCredentials::from_file(key.path()).unwrap(),
            SheetsCredentials::ApiKey("AIza".into())
        );
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let err = SheetsCredentials::from_file("/nonexistent/creds.json").unwrap_err();
        assert!(matches!(err, HubError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_connect_without_spreadsheet_id_fails() {
        let connector = SheetsConnector::new("", "/nonexistent/creds.json");
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, HubError::ConfigError(_)));
    }
}
