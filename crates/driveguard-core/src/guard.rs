//! Access guard for Drive operations.
//!
//! A guard is constructed per service with the folder IDs one profile is
//! allowed to touch, and is consulted before every mutating or
//! content-reading Drive call. Two rules shape its behavior:
//!
//! - An empty allowlist means Drive access is administratively disabled for
//!   the profile, not unrestricted. Every check fails.
//! - When a file's parent folders cannot be determined (lookup error, file
//!   not found), the operation is denied. Absence of proof is never treated
//!   as proof of allowance.
//!
//! Listing *all* files is a deliberate admin path that never constructs a
//! guard; see `DriveService::list_all_files` in the google crate.

use std::fmt;

use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Folder-membership guard for one profile's Drive operations.
#[derive(Debug, Clone, Default)]
pub struct AccessGuard {
    allowed_folder_ids: Vec<String>,
}

impl AccessGuard {
    /// Creates a guard over the given allowlisted folder IDs.
    pub fn new(allowed_folder_ids: Vec<String>) -> Self {
        Self { allowed_folder_ids }
    }

    /// Returns the allowlisted folder IDs.
    pub fn allowed_folder_ids(&self) -> &[String] {
        &self.allowed_folder_ids
    }

    /// Fails when no folders are configured at all.
    fn ensure_enabled(&self) -> CoreResult<()> {
        if self.allowed_folder_ids.is_empty() {
            return Err(CoreError::access_denied(
                "no folders configured for this profile",
            ));
        }
        Ok(())
    }

    /// Authorizes reading from or writing into a folder.
    ///
    /// Allowed iff the folder ID is in the allowlist.
    pub fn check_folder(&self, folder_id: &str) -> CoreResult<()> {
        self.ensure_enabled()?;

        if self.allowed_folder_ids.iter().any(|id| id == folder_id) {
            debug!(folder_id, "folder access allowed");
            Ok(())
        } else {
            Err(CoreError::access_denied(format!(
                "folder {} is not allowed",
                folder_id
            )))
        }
    }

    /// Authorizes an operation on a file, given the outcome of the remote
    /// parent-folder lookup.
    ///
    /// Allowed iff the lookup succeeded and at least one returned parent is
    /// allowlisted. A failed lookup denies the operation (fail-closed).
    pub fn check_file<E: fmt::Display>(
        &self,
        file_id: &str,
        parents: Result<Vec<String>, E>,
    ) -> CoreResult<()> {
        self.ensure_enabled()?;

        let parents = parents.map_err(|e| {
            CoreError::access_denied(format!(
                "could not verify access for file {}: {}",
                file_id, e
            ))
        })?;

        if parents
            .iter()
            .any(|p| self.allowed_folder_ids.iter().any(|id| id == p))
        {
            debug!(file_id, "file access allowed");
            Ok(())
        } else {
            Err(CoreError::access_denied(format!(
                "file {} is not in an allowed folder",
                file_id
            )))
        }
    }
}
