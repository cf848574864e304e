//! Request and response types for the driveguard tool protocol.

use chrono::{DateTime, Utc};
use driveguard_core::PromptRecord;
use serde::{Deserialize, Serialize};

use crate::PROTOCOL_VERSION;

/// Message envelope wrapping all protocol messages.
///
/// Every message exchanged between the client and the daemon is wrapped in
/// this envelope, which provides versioning and request correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Protocol version (always "1" for v1).
    pub protocol_version: String,
    /// Unique request ID for correlation.
    pub request_id: String,
    /// The actual payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Creates a new envelope with the current protocol version.
    pub fn new(request_id: impl Into<String>, payload: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            request_id: request_id.into(),
            payload,
        }
    }

    /// Creates a request envelope.
    pub fn request(request_id: impl Into<String>, request: T) -> Self {
        Self::new(request_id, request)
    }

    /// Creates a response envelope.
    pub fn response(request_id: impl Into<String>, response: T) -> Self {
        Self::new(request_id, response)
    }

    /// Checks if this envelope uses a compatible protocol version.
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}

/// Tool requests the client can send to the daemon.
///
/// Every resource is addressed by its registry alias, never by a raw
/// remote identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// List the tabs of a configured spreadsheet.
    ListSheetTabs {
        /// Registry alias of the spreadsheet.
        sheet_alias: String,
    },

    /// Read a cell range from a configured spreadsheet.
    GetSheetValues {
        /// Registry alias of the spreadsheet.
        sheet_alias: String,
        /// A1-notation range (e.g. "README!A1").
        range: String,
    },

    /// Read all prompt rows from a tab.
    GetPrompts {
        /// Registry alias of the spreadsheet.
        sheet_alias: String,
        /// Tab holding the prompt rows.
        tab: String,
    },

    /// Insert a prompt row at the top of a tab.
    InsertPrompt {
        /// Registry alias of the spreadsheet.
        sheet_alias: String,
        /// Tab holding the prompt rows.
        tab: String,
        /// Prompt name.
        name: String,
        /// Prompt content.
        content: String,
        /// Row author recorded in the sheet.
        #[serde(default = "default_author")]
        author: String,
    },

    /// List files in a configured Drive folder.
    ListDriveFiles {
        /// Registry alias of the folder.
        folder_alias: String,
    },

    /// Upload a local file into a configured Drive folder.
    UploadFile {
        /// Registry alias of the destination folder.
        folder_alias: String,
        /// Path of the file on the daemon host.
        local_path: String,
        /// Remote filename; defaults to the local basename.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },

    /// Download a file that lives in an allowed folder.
    DownloadFile {
        /// Registry alias scoping the profile used for the download.
        folder_alias: String,
        /// Drive file identifier.
        file_id: String,
        /// Destination path; defaults to a temporary file.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        local_path: Option<String>,
    },

    /// Delete a file that lives in an allowed folder.
    DeleteFile {
        /// Registry alias scoping the profile used for the deletion.
        folder_alias: String,
        /// Drive file identifier.
        file_id: String,
    },

    /// Get daemon status.
    Status,

    /// Ping to check daemon liveness.
    Ping,

    /// Request daemon shutdown.
    Shutdown,
}

fn default_author() -> String {
    "driveguard".to_string()
}

/// Metadata for one Drive file, as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFileInfo {
    /// Drive file identifier.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes, when Drive reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
}

/// Daemon status details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    /// Seconds since the daemon started.
    pub uptime_seconds: u64,
    /// Number of configured spreadsheet aliases.
    pub sheet_count: usize,
    /// Number of configured folder aliases.
    pub folder_count: usize,
    /// Profiles that own at least one registry entry.
    pub profiles: Vec<String>,
}

/// Responses the daemon can send back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Tab titles of a spreadsheet.
    SheetTabs { tabs: Vec<String> },

    /// Cell values of a range.
    SheetValues { values: Vec<Vec<String>> },

    /// Decoded prompt rows.
    Prompts { prompts: Vec<PromptRecord> },

    /// Files in a Drive folder.
    DriveFiles { files: Vec<DriveFileInfo> },

    /// A file was uploaded.
    FileUploaded { file_id: String },

    /// A file was downloaded to the given path on the daemon host.
    FileDownloaded { local_path: String },

    /// Daemon status information.
    Status {
        #[serde(flatten)]
        info: StatusInfo,
    },

    /// Generic success.
    Ok,

    /// Structured failure.
    Error {
        #[serde(flatten)]
        error: ErrorResponse,
    },

    /// Pong response to Ping.
    Pong,
}

impl Response {
    /// Creates an error response.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            error: ErrorResponse {
                code,
                message: message.into(),
            },
        }
    }
}

/// High-level failure category carried over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Alias or remote resource not found.
    NotFound,
    /// Refused by the access guard or the remote authorization layer.
    AccessDenied,
    /// Credential lifecycle failed terminally.
    AuthFailed,
    /// Remote rate limit hit.
    RateLimited,
    /// Network-level failure.
    Network,
    /// Remote service error.
    Server,
    /// The request itself was invalid.
    InvalidRequest,
    /// Anything else.
    Internal,
}

/// Structured failure reported to the caller: status code plus message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Failure category.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_version() {
        let envelope = Envelope::request("req-1", Request::Ping);
        assert_eq!(envelope.protocol_version, PROTOCOL_VERSION);
        assert!(envelope.is_compatible());
    }

    #[test]
    fn incompatible_version_detected() {
        let mut envelope = Envelope::request("req-1", Request::Ping);
        envelope.protocol_version = "99".to_string();
        assert!(!envelope.is_compatible());
    }

    #[test]
    fn insert_prompt_author_defaults() {
        let json = r#"{
            "type": "insert_prompt",
            "sheet_alias": "todo",
            "tab": "Prompts",
            "name": "greet",
            "content": "Say hi"
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        match request {
            Request::InsertPrompt { author, .. } => assert_eq!(author, "driveguard"),
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn request_wire_shape() {
        let request = Envelope::request(
            "req-1",
            Request::GetSheetValues {
                sheet_alias: "todo".to_string(),
                range: "README!A1".to_string(),
            },
        );
        insta::assert_json_snapshot!(request, @r#"
        {
          "protocol_version": "1",
          "request_id": "req-1",
          "payload": {
            "type": "get_sheet_values",
            "sheet_alias": "todo",
            "range": "README!A1"
          }
        }
        "#);
    }

    #[test]
    fn error_response_wire_shape() {
        let response = Envelope::response(
            "req-1",
            Response::error(ErrorCode::AccessDenied, "folder F9 is not allowed"),
        );
        insta::assert_json_snapshot!(response, @r#"
        {
          "protocol_version": "1",
          "request_id": "req-1",
          "payload": {
            "type": "error",
            "code": "access_denied",
            "message": "folder F9 is not allowed"
          }
        }
        "#);
    }

    #[test]
    fn drive_files_response_roundtrip() {
        let response = Response::DriveFiles {
            files: vec![DriveFileInfo {
                id: "file-1".to_string(),
                name: "report.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                size: Some(1024),
                modified_time: None,
            }],
        };
        let json = serde_json::to_string(&response).unwrap();
        let decoded: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn status_response_flattens_info() {
        let response = Response::Status {
            info: StatusInfo {
                uptime_seconds: 42,
                sheet_count: 2,
                folder_count: 1,
                profiles: vec!["default".to_string()],
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["uptime_seconds"], 42);
    }
}
