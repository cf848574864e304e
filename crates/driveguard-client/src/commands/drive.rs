//! Guarded Drive folder commands.
//!
//! Each command resolves its folder alias through the registry and opens
//! a session for the owning profile, the same path the daemon takes.

use std::path::Path;

use driveguard_core::{AppPaths, ResourceKind, ResourceRegistry};
use driveguard_google::{DriveFile, DriveService, GoogleContext};

use crate::error::ClientResult;

/// The resolved alias plus everything needed to open a guarded session.
#[derive(Debug)]
struct FolderTarget {
    folder_id: String,
    profile: String,
    allowlist: Vec<String>,
}

fn resolve_folder(paths: &AppPaths, alias: &str) -> ClientResult<FolderTarget> {
    let registry = ResourceRegistry::load(paths.registry_path());
    let entry = registry.resolve(ResourceKind::Folder, alias)?;
    let allowlist = registry.allowlisted_folder_ids(Some(&entry.profile));
    Ok(FolderTarget {
        folder_id: entry.id.clone(),
        profile: entry.profile.clone(),
        allowlist,
    })
}

fn print_file(file: &DriveFile) {
    let size = file
        .size
        .map(|s| format_size(s))
        .unwrap_or_else(|| "-".to_string());
    let modified = file
        .modified_time
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<44} {:>10} {:<16} {}",
        file.id, size, modified, file.name
    );
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Lists the files in a registered folder.
pub async fn list(paths: &AppPaths, alias: &str) -> ClientResult<()> {
    let target = resolve_folder(paths, alias)?;
    let ctx = GoogleContext::open(paths, &target.profile).await?;
    let files = ctx.drive(target.allowlist).list_files(&target.folder_id).await?;

    if files.is_empty() {
        println!("Folder '{}' is empty.", alias);
        return Ok(());
    }
    for file in &files {
        print_file(file);
    }
    Ok(())
}

/// Lists every file the profile's credentials can see, bypassing the
/// folder allowlist. Maintenance use only.
pub async fn list_all(paths: &AppPaths, profile: &str) -> ClientResult<()> {
    let ctx = GoogleContext::open(paths, profile).await?;
    let files = DriveService::list_all_files(ctx.api()).await?;

    if files.is_empty() {
        println!("No files visible to profile '{}'.", profile);
        return Ok(());
    }
    for file in &files {
        print_file(file);
    }
    Ok(())
}

/// Uploads a local file into a registered folder.
pub async fn upload(
    paths: &AppPaths,
    alias: &str,
    local_path: &Path,
    name: Option<&str>,
) -> ClientResult<()> {
    let target = resolve_folder(paths, alias)?;
    let ctx = GoogleContext::open(paths, &target.profile).await?;
    let uploaded = ctx
        .drive(target.allowlist)
        .upload_file(&target.folder_id, local_path, name)
        .await?;

    println!("Uploaded '{}' (id: {}).", uploaded.name, uploaded.id);
    Ok(())
}

/// Downloads a file from a registered folder.
pub async fn download(
    paths: &AppPaths,
    alias: &str,
    file_id: &str,
    output: Option<&Path>,
) -> ClientResult<()> {
    let target = resolve_folder(paths, alias)?;
    let ctx = GoogleContext::open(paths, &target.profile).await?;
    let destination = ctx
        .drive(target.allowlist)
        .download_file(file_id, output)
        .await?;

    println!("Downloaded to {}.", destination.display());
    Ok(())
}

/// Moves a file in a registered folder to the Drive trash.
pub async fn delete(paths: &AppPaths, alias: &str, file_id: &str) -> ClientResult<()> {
    let target = resolve_folder(paths, alias)?;
    let ctx = GoogleContext::open(paths, &target.profile).await?;
    ctx.drive(target.allowlist).remove_file(file_id).await?;

    println!("Deleted file {}.", file_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use driveguard_google::GoogleErrorCode;

    #[test]
    fn resolve_unknown_alias_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_base(dir.path());

        let err = resolve_folder(&paths, "nope").unwrap_err();
        match err {
            ClientError::Api(e) => assert_eq!(e.code(), GoogleErrorCode::NotFound),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn resolve_scopes_allowlist_to_owning_profile() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_base(dir.path());
        std::fs::write(
            paths.registry_path(),
            r#"{
                "drive_folders": {
                    "reports": { "id": "F1", "profile": "default" },
                    "archive": { "id": "F2", "profile": "work" }
                }
            }"#,
        )
        .unwrap();

        let target = resolve_folder(&paths, "reports").unwrap();
        assert_eq!(target.folder_id, "F1");
        assert_eq!(target.profile, "default");
        assert_eq!(target.allowlist, vec!["F1".to_string()]);
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
