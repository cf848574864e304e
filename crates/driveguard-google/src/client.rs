//! Low-level HTTP client for the Drive and Sheets APIs.
//!
//! This module handles request building, response parsing, and mapping HTTP
//! status codes onto the error taxonomy. Access control and alias resolution
//! live in the service layers above.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{GoogleError, GoogleResult};

/// Base URL for Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload endpoint for Drive API v3.
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// Base URL for Sheets API v4.
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Metadata for one Drive file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Drive file identifier.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes. Drive reports this as a decimal string, and omits it
    /// for Google-native documents.
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
    /// Last modification time.
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Authenticated HTTP client for the Drive and Sheets APIs.
#[derive(Debug)]
pub struct ApiClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl ApiClient {
    /// Creates a client with the given access token.
    pub fn new(
        access_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> GoogleResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| GoogleError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    /// Updates the access token (after refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    // ---- Drive ----

    /// Lists the non-trashed children of a folder, following pagination.
    pub async fn list_folder_children(&self, folder_id: &str) -> GoogleResult<Vec<DriveFile>> {
        let query = format!("'{}' in parents and trashed = false", folder_id);
        self.list_files_query(Some(&query)).await
    }

    /// Lists every non-trashed file visible to the credentials.
    pub async fn list_all_files(&self) -> GoogleResult<Vec<DriveFile>> {
        self.list_files_query(Some("trashed = false")).await
    }

    async fn list_files_query(&self, query: Option<&str>) -> GoogleResult<Vec<DriveFile>> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("fields", "nextPageToken,files(id,name,mimeType,size,modifiedTime)"),
                    ("pageSize", "100"),
                ]);

            if let Some(q) = query {
                request = request.query(&[("q", q)]);
            }
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let body = self.send(request, "drive files.list").await?;
            let page: FileListResponse = serde_json::from_str(&body).map_err(|e| {
                GoogleError::invalid_response(format!("failed to parse file list: {}", e))
            })?;

            all_files.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("listed {} drive files", all_files.len());
        Ok(all_files)
    }

    /// Returns the parent folder IDs of a file.
    pub async fn file_parents(&self, file_id: &str) -> GoogleResult<Vec<String>> {
        let url = format!(
            "{}/files/{}",
            DRIVE_API_BASE,
            urlencoding::encode(file_id)
        );

        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "parents")]);

        let body = self.send(request, "drive files.get").await?;
        let parents: FileParentsResponse = serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("failed to parse file metadata: {}", e))
        })?;

        Ok(parents.parents)
    }

    /// Fetches a file's metadata.
    pub async fn file_metadata(&self, file_id: &str) -> GoogleResult<DriveFile> {
        let url = format!(
            "{}/files/{}",
            DRIVE_API_BASE,
            urlencoding::encode(file_id)
        );

        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id,name,mimeType,size,modifiedTime")]);

        let body = self.send(request, "drive files.get").await?;
        serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("failed to parse file metadata: {}", e))
        })
    }

    /// Downloads a file's content.
    pub async fn download_file(&self, file_id: &str) -> GoogleResult<Vec<u8>> {
        let url = format!(
            "{}/files/{}",
            DRIVE_API_BASE,
            urlencoding::encode(file_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(
                status,
                "drive files.get media",
                &body,
                retry_after,
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GoogleError::network(format!("failed to read file content: {}", e)))?;
        Ok(bytes.to_vec())
    }

    /// Uploads a file into a folder using a multipart/related request.
    ///
    /// Returns the metadata of the created file.
    pub async fn upload_file(
        &self,
        folder_id: &str,
        filename: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> GoogleResult<DriveFile> {
        let metadata = json!({
            "name": filename,
            "parents": [folder_id],
        });

        let boundary = "driveguard_upload_boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n",
                boundary, metadata
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!("--{}\r\nContent-Type: {}\r\n\r\n", boundary, mime_type).as_bytes(),
        );
        body.extend_from_slice(&content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = self
            .http_client
            .post(DRIVE_UPLOAD_URL)
            .bearer_auth(&self.access_token)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id,name,mimeType,size,modifiedTime"),
            ])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);

        let body = self.send(request, "drive files.create").await?;
        serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("failed to parse upload response: {}", e))
        })
    }

    /// Deletes a file.
    pub async fn delete_file(&self, file_id: &str) -> GoogleResult<()> {
        let url = format!(
            "{}/files/{}",
            DRIVE_API_BASE,
            urlencoding::encode(file_id)
        );

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(
                status,
                "drive files.delete",
                &body,
                retry_after,
            ));
        }
        Ok(())
    }

    // ---- Sheets ----

    /// Returns the tab titles of a spreadsheet, in sheet order.
    pub async fn sheet_tabs(&self, spreadsheet_id: &str) -> GoogleResult<Vec<String>> {
        let properties = self.sheet_properties(spreadsheet_id).await?;
        Ok(properties.into_iter().map(|p| p.title).collect())
    }

    /// Returns the numeric sheet ID of a tab, by title.
    pub async fn sheet_id_for_tab(
        &self,
        spreadsheet_id: &str,
        tab: &str,
    ) -> GoogleResult<i64> {
        let properties = self.sheet_properties(spreadsheet_id).await?;
        properties
            .into_iter()
            .find(|p| p.title == tab)
            .map(|p| p.sheet_id)
            .ok_or_else(|| {
                GoogleError::not_found(format!(
                    "tab '{}' not found in spreadsheet {}",
                    tab, spreadsheet_id
                ))
            })
    }

    async fn sheet_properties(&self, spreadsheet_id: &str) -> GoogleResult<Vec<SheetProperties>> {
        let url = format!("{}/{}", SHEETS_API_BASE, urlencoding::encode(spreadsheet_id));

        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "sheets.properties(sheetId,title)")]);

        let body = self.send(request, "sheets spreadsheets.get").await?;
        let metadata: SpreadsheetResponse = serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("failed to parse spreadsheet metadata: {}", e))
        })?;

        Ok(metadata.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Reads the cell values of a range.
    pub async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> GoogleResult<Vec<Vec<String>>> {
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_API_BASE,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range)
        );

        let request = self.http_client.get(&url).bearer_auth(&self.access_token);

        let body = self.send(request, "sheets values.get").await?;
        let values: ValueRangeResponse = serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("failed to parse value range: {}", e))
        })?;

        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    /// Writes raw cell values into a range.
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> GoogleResult<()> {
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_API_BASE,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range)
        );

        let request = self
            .http_client
            .put(&url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "values": values }));

        self.send(request, "sheets values.update").await?;
        Ok(())
    }

    /// Inserts empty rows into a sheet, shifting existing rows down.
    ///
    /// Row indexes are zero-based and the range is half-open.
    pub async fn insert_rows(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        start_index: i64,
        count: i64,
    ) -> GoogleResult<()> {
        let url = format!(
            "{}/{}:batchUpdate",
            SHEETS_API_BASE,
            urlencoding::encode(spreadsheet_id)
        );

        let request_body = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start_index,
                        "endIndex": start_index + count,
                    },
                    "inheritFromBefore": false,
                }
            }]
        });

        let request = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request_body);

        self.send(request, "sheets batchUpdate").await?;
        Ok(())
    }

    /// Sends a request and returns the response body, mapping failures onto
    /// the error taxonomy.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> GoogleResult<String> {
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        let retry_after = retry_after_secs(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| GoogleError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(map_status_error(status, operation, &body, retry_after));
        }

        Ok(body)
    }
}

fn map_transport_error(e: reqwest::Error) -> GoogleError {
    if e.is_timeout() {
        GoogleError::network("request timeout")
    } else if e.is_connect() {
        GoogleError::network(format!("connection failed: {}", e))
    } else {
        GoogleError::network(format!("request failed: {}", e))
    }
}

/// Reads a `Retry-After` header given in delay-seconds form.
///
/// The HTTP-date form is rare on the Google APIs and is ignored.
fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn map_status_error(
    status: reqwest::StatusCode,
    operation: &str,
    body: &str,
    retry_after: Option<u64>,
) -> GoogleError {
    match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            GoogleError::auth("access token expired or invalid")
        }
        reqwest::StatusCode::FORBIDDEN => {
            GoogleError::access_denied(format!("{} forbidden: {}", operation, body))
        }
        reqwest::StatusCode::NOT_FOUND => {
            GoogleError::not_found(format!("{}: resource not found", operation))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => match retry_after {
            Some(secs) => {
                GoogleError::rate_limited(format!("rate limit exceeded, retry after {}s", secs))
                    .with_retry_after(Duration::from_secs(secs))
            }
            None => GoogleError::rate_limited("rate limit exceeded"),
        },
        s if s.is_server_error() => {
            GoogleError::server(format!("{} failed ({}): {}", operation, status, body))
        }
        s if s == reqwest::StatusCode::BAD_REQUEST => {
            GoogleError::bad_request(format!("{} rejected: {}", operation, body))
        }
        _ => GoogleError::server(format!("{} failed ({}): {}", operation, status, body)),
    }
}

/// Response from the Drive files.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// Parents-only projection of Drive file metadata.
#[derive(Debug, Deserialize)]
struct FileParentsResponse {
    #[serde(default)]
    parents: Vec<String>,
}

/// Response from the Sheets spreadsheets.get endpoint.
#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// Response from the Sheets values.get endpoint.
///
/// Cells arrive as arbitrary JSON scalars; numeric and boolean cells are
/// rendered as their literal text.
#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_file_list_response() {
        let json = r#"{
            "files": [
                {
                    "id": "file-1",
                    "name": "report.pdf",
                    "mimeType": "application/pdf",
                    "size": "2048",
                    "modifiedTime": "2024-03-15T10:00:00Z"
                },
                {
                    "id": "doc-1",
                    "name": "Notes",
                    "mimeType": "application/vnd.google-apps.document"
                }
            ],
            "nextPageToken": "token-abc"
        }"#;

        let response: FileListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.files.len(), 2);
        assert_eq!(response.files[0].size, Some(2048));
        assert!(response.files[0].modified_time.is_some());
        // Google-native documents report no size
        assert_eq!(response.files[1].size, None);
        assert_eq!(response.next_page_token, Some("token-abc".to_string()));
    }

    #[test]
    fn parse_file_parents() {
        let json = r#"{ "parents": ["folder-a", "folder-b"] }"#;
        let response: FileParentsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.parents, vec!["folder-a", "folder-b"]);

        // Files at the Drive root have no parents field
        let response: FileParentsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.parents.is_empty());
    }

    #[test]
    fn parse_spreadsheet_metadata() {
        let json = r#"{
            "sheets": [
                { "properties": { "sheetId": 0, "title": "README" } },
                { "properties": { "sheetId": 1438112163, "title": "Prompts" } }
            ]
        }"#;

        let response: SpreadsheetResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.sheets.len(), 2);
        assert_eq!(response.sheets[1].properties.sheet_id, 1438112163);
        assert_eq!(response.sheets[1].properties.title, "Prompts");
    }

    #[test]
    fn parse_value_range() {
        let json = r#"{
            "range": "README!A1:B2",
            "values": [["a", 42], ["c", true]]
        }"#;

        let response: ValueRangeResponse = serde_json::from_str(json).unwrap();
        let rows: Vec<Vec<String>> = response
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        assert_eq!(rows, vec![vec!["a", "42"], vec!["c", "true"]]);

        // An empty range omits the values field entirely
        let response: ValueRangeResponse =
            serde_json::from_str(r#"{ "range": "README!A1" }"#).unwrap();
        assert!(response.values.is_empty());
    }

    #[test]
    fn status_error_mapping() {
        use crate::error::GoogleErrorCode;

        let err = map_status_error(reqwest::StatusCode::UNAUTHORIZED, "op", "", None);
        assert_eq!(err.code(), GoogleErrorCode::AuthFailed);

        let err = map_status_error(reqwest::StatusCode::FORBIDDEN, "op", "", None);
        assert_eq!(err.code(), GoogleErrorCode::AccessDenied);

        let err = map_status_error(reqwest::StatusCode::NOT_FOUND, "op", "", None);
        assert_eq!(err.code(), GoogleErrorCode::NotFound);

        let err = map_status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "op", "", None);
        assert_eq!(err.code(), GoogleErrorCode::RateLimited);
        assert!(err.is_retryable());

        let err = map_status_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "op", "", None);
        assert_eq!(err.code(), GoogleErrorCode::Server);

        let err = map_status_error(reqwest::StatusCode::BAD_REQUEST, "op", "", None);
        assert_eq!(err.code(), GoogleErrorCode::BadRequest);
    }

    #[test]
    fn retry_after_header_parsing() {
        use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

        let headers = HeaderMap::new();
        assert_eq!(retry_after_secs(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(retry_after_secs(&headers), Some(120));

        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(retry_after_secs(&headers), None);
    }

    #[test]
    fn rate_limit_error_carries_retry_after() {
        use crate::error::GoogleErrorCode;

        let err = map_status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "op", "", Some(30));
        assert_eq!(err.code(), GoogleErrorCode::RateLimited);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert!(err.message().contains("30s"));

        let err = map_status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "op", "", None);
        assert_eq!(err.retry_after(), None);
    }
}
