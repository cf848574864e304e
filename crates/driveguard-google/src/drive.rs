//! Drive operations behind the access guard.
//!
//! Every content-touching operation goes through [`AccessGuard`] before any
//! remote call is made. The one exception is [`DriveService::list_all_files`],
//! an administrative path for discovering folder IDs to allowlist.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use driveguard_core::AccessGuard;

use crate::client::{ApiClient, DriveFile};
use crate::error::{GoogleError, GoogleResult};

/// Guarded Drive operations for one profile.
pub struct DriveService<'a> {
    api: &'a ApiClient,
    guard: AccessGuard,
}

impl<'a> DriveService<'a> {
    /// Creates a Drive service over the given client and guard.
    pub fn new(api: &'a ApiClient, guard: AccessGuard) -> Self {
        Self { api, guard }
    }

    /// Lists the files in an allowlisted folder.
    pub async fn list_files(&self, folder_id: &str) -> GoogleResult<Vec<DriveFile>> {
        self.guard.check_folder(folder_id)?;
        self.api.list_folder_children(folder_id).await
    }

    /// Lists every file the credentials can see, ignoring the allowlist.
    ///
    /// This is the administrative discovery path used to find folder IDs
    /// worth allowlisting. It deliberately bypasses the guard.
    pub async fn list_all_files(api: &ApiClient) -> GoogleResult<Vec<DriveFile>> {
        warn!("listing all drive files, bypassing folder allowlist");
        api.list_all_files().await
    }

    /// Uploads a local file into an allowlisted folder.
    ///
    /// The remote name defaults to the local file's basename.
    pub async fn upload_file(
        &self,
        folder_id: &str,
        local_path: &Path,
        filename: Option<&str>,
    ) -> GoogleResult<DriveFile> {
        self.guard.check_folder(folder_id)?;

        let content = tokio::fs::read(local_path).await.map_err(|e| {
            GoogleError::bad_request(format!(
                "failed to read {}: {}",
                local_path.display(),
                e
            ))
        })?;

        let filename = match filename {
            Some(name) => name.to_string(),
            None => local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    GoogleError::bad_request(format!(
                        "cannot derive a filename from {}",
                        local_path.display()
                    ))
                })?,
        };

        let mime_type = guess_mime_type(&filename);

        info!(folder_id, filename, "uploading file");
        let uploaded = self
            .api
            .upload_file(folder_id, &filename, mime_type, content)
            .await?;
        info!(file_id = %uploaded.id, "upload complete");
        Ok(uploaded)
    }

    /// Downloads a file that lives in an allowed folder.
    ///
    /// Returns the path the content was written to. When no destination is
    /// given, the file lands in the system temp directory under its remote
    /// name.
    pub async fn download_file(
        &self,
        file_id: &str,
        local_path: Option<&Path>,
    ) -> GoogleResult<PathBuf> {
        let parents = self.api.file_parents(file_id).await;
        self.guard.check_file(file_id, parents)?;

        let metadata = self.api.file_metadata(file_id).await?;
        let destination = match local_path {
            Some(path) => path.to_path_buf(),
            None => std::env::temp_dir().join(&metadata.name),
        };

        let content = self.api.download_file(file_id).await?;
        tokio::fs::write(&destination, &content).await.map_err(|e| {
            GoogleError::internal(format!(
                "failed to write {}: {}",
                destination.display(),
                e
            ))
        })?;

        info!(file_id, path = %destination.display(), bytes = content.len(), "downloaded file");
        Ok(destination)
    }

    /// Deletes a file that lives in an allowed folder.
    pub async fn remove_file(&self, file_id: &str) -> GoogleResult<()> {
        let parents = self.api.file_parents(file_id).await;
        self.guard.check_file(file_id, parents)?;

        self.api.delete_file(file_id).await?;
        info!(file_id, "deleted file");
        Ok(())
    }
}

/// Maps a filename extension to a MIME type, defaulting to octet-stream.
fn guess_mime_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}
