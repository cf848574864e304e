//! Request/response dispatch handler.
//!
//! Every resource-touching request goes through the same pipeline: resolve
//! the alias in the registry, open an authenticated session for the owning
//! profile, run the guarded operation, map failures onto wire error codes.
//! Raw remote identifiers never come in over the wire; aliases do.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use driveguard_core::{AppPaths, ResourceRegistry, registry::ResourceKind};
use driveguard_google::{DriveFile, GoogleContext, GoogleError, GoogleErrorCode};
use driveguard_protocol::{DriveFileInfo, ErrorCode, Request, Response, StatusInfo};

use crate::error::{ServerError, ServerResult};
use crate::signals::ShutdownHandle;
use crate::socket::Connection;

/// Server state shared across all connections.
#[derive(Debug)]
pub struct ServerState {
    /// Server start time.
    start_time: DateTime<Utc>,
    /// The loaded resource registry.
    registry: ResourceRegistry,
    /// Config directory layout.
    paths: AppPaths,
    /// Whether shutdown has been requested.
    shutdown_requested: bool,
    /// Handle for stopping the accept loop (set at startup).
    shutdown_handle: Option<ShutdownHandle>,
}

impl ServerState {
    /// Creates a new server state.
    pub fn new(registry: ResourceRegistry, paths: AppPaths) -> Self {
        Self {
            start_time: Utc::now(),
            registry,
            paths,
            shutdown_requested: false,
            shutdown_handle: None,
        }
    }

    /// Stores the shutdown handle so shutdown requests stop the accept loop.
    pub fn set_shutdown_handle(&mut self, handle: ShutdownHandle) {
        self.shutdown_handle = Some(handle);
    }

    /// Returns the server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        let duration = Utc::now() - self.start_time;
        duration.num_seconds().max(0) as u64
    }

    /// Returns the status info.
    pub fn status_info(&self) -> StatusInfo {
        StatusInfo {
            uptime_seconds: self.uptime_seconds(),
            sheet_count: self.registry.sheets.len(),
            folder_count: self.registry.drive_folders.len(),
            profiles: self.registry.profiles(),
        }
    }

    /// Returns the loaded registry.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Replaces the registry (after a reload).
    pub fn set_registry(&mut self, registry: ResourceRegistry) {
        self.registry = registry;
    }

    /// Returns the config directory layout.
    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Requests a shutdown.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
        if let Some(handle) = &self.shutdown_handle {
            handle.trigger();
        }
    }

    /// Returns true if shutdown has been requested.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }
}

/// Shared server state wrapped in an Arc<RwLock>.
pub type SharedState = Arc<RwLock<ServerState>>;

/// Creates a new shared state.
pub fn new_shared_state(registry: ResourceRegistry, paths: AppPaths) -> SharedState {
    Arc::new(RwLock::new(ServerState::new(registry, paths)))
}

/// Maps an API error onto a wire error response.
fn error_response(e: GoogleError) -> Response {
    let code = match e.code() {
        GoogleErrorCode::AuthFailed => ErrorCode::AuthFailed,
        GoogleErrorCode::AccessDenied => ErrorCode::AccessDenied,
        GoogleErrorCode::NotFound => ErrorCode::NotFound,
        GoogleErrorCode::RateLimited => ErrorCode::RateLimited,
        GoogleErrorCode::Network => ErrorCode::Network,
        GoogleErrorCode::Server | GoogleErrorCode::InvalidResponse => ErrorCode::Server,
        GoogleErrorCode::BadRequest | GoogleErrorCode::Configuration => ErrorCode::InvalidRequest,
        GoogleErrorCode::Internal => ErrorCode::Internal,
    };
    Response::error(code, e.message())
}

fn file_info(file: DriveFile) -> DriveFileInfo {
    DriveFileInfo {
        id: file.id,
        name: file.name,
        mime_type: file.mime_type,
        size: file.size,
        modified_time: file.modified_time,
    }
}

/// Request handler that processes incoming requests and produces responses.
pub struct RequestHandler {
    state: SharedState,
}

impl RequestHandler {
    /// Creates a new request handler with the given state.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Resolves a sheet alias and opens a session for its owning profile.
    async fn sheet_session(&self, alias: &str) -> Result<(GoogleContext, String), GoogleError> {
        let (id, profile, paths) = {
            let state = self.state.read().await;
            let entry = state.registry.resolve(ResourceKind::Sheet, alias)?;
            (entry.id.clone(), entry.profile.clone(), state.paths.clone())
        };
        let ctx = GoogleContext::open(&paths, &profile).await?;
        Ok((ctx, id))
    }

    /// Resolves a folder alias, opens a session, and returns the profile's
    /// folder allowlist alongside the resolved folder ID.
    async fn folder_session(
        &self,
        alias: &str,
    ) -> Result<(GoogleContext, String, Vec<String>), GoogleError> {
        let (id, profile, allowlist, paths) = {
            let state = self.state.read().await;
            let entry = state.registry.resolve(ResourceKind::Folder, alias)?;
            let allowlist = state.registry.allowlisted_folder_ids(Some(&entry.profile));
            (
                entry.id.clone(),
                entry.profile.clone(),
                allowlist,
                state.paths.clone(),
            )
        };
        let ctx = GoogleContext::open(&paths, &profile).await?;
        Ok((ctx, id, allowlist))
    }

    /// Handles a single request and returns the response.
    #[tracing::instrument(skip(self), fields(request_type, duration_ms))]
    pub async fn handle(&self, request: &Request) -> Response {
        use tracing::Span;

        let start = std::time::Instant::now();
        let request_type = format!("{:?}", request);
        Span::current().record("request_type", &request_type);

        let response = match request {
            Request::Ping => {
                debug!("Handling Ping request");
                Response::Pong
            }
            Request::Status => {
                debug!("Handling Status request");
                let state = self.state.read().await;
                Response::Status {
                    info: state.status_info(),
                }
            }
            Request::Shutdown => {
                info!("Handling Shutdown request");
                let mut state = self.state.write().await;
                state.request_shutdown();
                Response::Ok
            }
            Request::ListSheetTabs { sheet_alias } => {
                debug!(alias = %sheet_alias, "Handling ListSheetTabs request");
                match self.list_sheet_tabs(sheet_alias).await {
                    Ok(tabs) => Response::SheetTabs { tabs },
                    Err(e) => error_response(e),
                }
            }
            Request::GetSheetValues { sheet_alias, range } => {
                debug!(alias = %sheet_alias, range = %range, "Handling GetSheetValues request");
                match self.get_sheet_values(sheet_alias, range).await {
                    Ok(values) => Response::SheetValues { values },
                    Err(e) => error_response(e),
                }
            }
            Request::GetPrompts { sheet_alias, tab } => {
                debug!(alias = %sheet_alias, tab = %tab, "Handling GetPrompts request");
                match self.get_prompts(sheet_alias, tab).await {
                    Ok(prompts) => Response::Prompts { prompts },
                    Err(e) => error_response(e),
                }
            }
            Request::InsertPrompt {
                sheet_alias,
                tab,
                name,
                content,
                author,
            } => {
                debug!(alias = %sheet_alias, tab = %tab, name = %name, "Handling InsertPrompt request");
                match self
                    .insert_prompt(sheet_alias, tab, name, content, author)
                    .await
                {
                    Ok(()) => Response::Ok,
                    Err(e) => error_response(e),
                }
            }
            Request::ListDriveFiles { folder_alias } => {
                debug!(alias = %folder_alias, "Handling ListDriveFiles request");
                match self.list_drive_files(folder_alias).await {
                    Ok(files) => Response::DriveFiles { files },
                    Err(e) => error_response(e),
                }
            }
            Request::UploadFile {
                folder_alias,
                local_path,
                filename,
            } => {
                debug!(alias = %folder_alias, path = %local_path, "Handling UploadFile request");
                match self
                    .upload_file(folder_alias, local_path, filename.as_deref())
                    .await
                {
                    Ok(file_id) => Response::FileUploaded { file_id },
                    Err(e) => error_response(e),
                }
            }
            Request::DownloadFile {
                folder_alias,
                file_id,
                local_path,
            } => {
                debug!(alias = %folder_alias, file_id = %file_id, "Handling DownloadFile request");
                match self
                    .download_file(folder_alias, file_id, local_path.as_deref())
                    .await
                {
                    Ok(path) => Response::FileDownloaded { local_path: path },
                    Err(e) => error_response(e),
                }
            }
            Request::DeleteFile {
                folder_alias,
                file_id,
            } => {
                debug!(alias = %folder_alias, file_id = %file_id, "Handling DeleteFile request");
                match self.delete_file(folder_alias, file_id).await {
                    Ok(()) => Response::Ok,
                    Err(e) => error_response(e),
                }
            }
        };

        let duration = start.elapsed();
        if tracing::enabled!(tracing::Level::DEBUG) {
            Span::current().record("duration_ms", duration.as_millis());
            debug!(
                request_type = %request_type,
                duration_ms = duration.as_millis(),
                "Request handled"
            );
        }

        response
    }

    async fn list_sheet_tabs(&self, alias: &str) -> Result<Vec<String>, GoogleError> {
        let (ctx, id) = self.sheet_session(alias).await?;
        ctx.sheets().list_tabs(&id).await
    }

    async fn get_sheet_values(
        &self,
        alias: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, GoogleError> {
        let (ctx, id) = self.sheet_session(alias).await?;
        ctx.sheets().read_range(&id, range).await
    }

    async fn get_prompts(
        &self,
        alias: &str,
        tab: &str,
    ) -> Result<Vec<driveguard_core::PromptRecord>, GoogleError> {
        let (ctx, id) = self.sheet_session(alias).await?;
        ctx.sheets().get_prompts(&id, tab).await
    }

    async fn insert_prompt(
        &self,
        alias: &str,
        tab: &str,
        name: &str,
        content: &str,
        author: &str,
    ) -> Result<(), GoogleError> {
        let (ctx, id) = self.sheet_session(alias).await?;
        ctx.sheets()
            .insert_prompt(&id, tab, name, content, author)
            .await?;
        Ok(())
    }

    async fn list_drive_files(&self, alias: &str) -> Result<Vec<DriveFileInfo>, GoogleError> {
        let (ctx, folder_id, allowlist) = self.folder_session(alias).await?;
        let files = ctx.drive(allowlist).list_files(&folder_id).await?;
        Ok(files.into_iter().map(file_info).collect())
    }

    async fn upload_file(
        &self,
        alias: &str,
        local_path: &str,
        filename: Option<&str>,
    ) -> Result<String, GoogleError> {
        let (ctx, folder_id, allowlist) = self.folder_session(alias).await?;
        let uploaded = ctx
            .drive(allowlist)
            .upload_file(&folder_id, std::path::Path::new(local_path), filename)
            .await?;
        Ok(uploaded.id)
    }

    async fn download_file(
        &self,
        alias: &str,
        file_id: &str,
        local_path: Option<&str>,
    ) -> Result<String, GoogleError> {
        let (ctx, _folder_id, allowlist) = self.folder_session(alias).await?;
        let path = ctx
            .drive(allowlist)
            .download_file(file_id, local_path.map(std::path::Path::new))
            .await?;
        Ok(path.display().to_string())
    }

    async fn delete_file(&self, alias: &str, file_id: &str) -> Result<(), GoogleError> {
        let (ctx, _folder_id, allowlist) = self.folder_session(alias).await?;
        ctx.drive(allowlist).remove_file(file_id).await
    }

    /// Handles a connection, processing all requests until the connection closes.
    pub async fn handle_connection(&self, mut conn: Connection) -> ServerResult<()> {
        loop {
            match conn.read_request().await {
                Ok(Some(envelope)) => {
                    let response = self.handle(&envelope.payload).await;
                    conn.respond(&envelope.request_id, response).await?;

                    if self.state.read().await.shutdown_requested() {
                        return Err(ServerError::Shutdown);
                    }
                }
                Ok(None) => {
                    debug!("Connection closed by client");
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read request");
                    return Err(e);
                }
            }
        }
    }
}

/// Creates a connection handler closure suitable for [`SocketServer::serve`].
///
/// [`SocketServer::serve`]: crate::socket::SocketServer::serve
pub fn make_connection_handler(
    state: SharedState,
) -> impl Fn(Connection) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
+ Send
+ Sync
+ 'static {
    move |conn| {
        let handler = RequestHandler::new(state.clone());
        Box::pin(async move {
            if let Err(e) = handler.handle_connection(conn).await
                && !matches!(e, ServerError::Shutdown)
            {
                warn!(error = %e, "Connection handler error");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> ResourceRegistry {
        serde_json::from_str(
            r#"{
                "sheets": {
                    "todo": { "id": "S1", "profile": "default" },
                    "budget": { "id": "S2", "profile": "work" }
                },
                "drive_folders": {
                    "reports": { "id": "F1", "profile": "default" }
                }
            }"#,
        )
        .unwrap()
    }

    fn test_state() -> SharedState {
        new_shared_state(sample_registry(), AppPaths::with_base("/tmp/driveguard-test"))
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        let handler = RequestHandler::new(test_state());
        let response = handler.handle(&Request::Ping).await;
        assert_eq!(response, Response::Pong);
    }

    #[tokio::test]
    async fn status_counts_registry_entries() {
        let handler = RequestHandler::new(test_state());
        let response = handler.handle(&Request::Status).await;
        match response {
            Response::Status { info } => {
                assert_eq!(info.sheet_count, 2);
                assert_eq!(info.folder_count, 1);
                assert_eq!(info.profiles, vec!["default".to_string(), "work".to_string()]);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_sheet_alias_is_not_found() {
        let handler = RequestHandler::new(test_state());
        let response = handler
            .handle(&Request::ListSheetTabs {
                sheet_alias: "missing".to_string(),
            })
            .await;
        match response {
            Response::Error { error } => {
                assert_eq!(error.code, ErrorCode::NotFound);
                assert!(error.message.contains("missing"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_folder_alias_is_not_found() {
        let handler = RequestHandler::new(test_state());
        let response = handler
            .handle(&Request::ListDriveFiles {
                folder_alias: "nope".to_string(),
            })
            .await;
        match response {
            Response::Error { error } => assert_eq!(error.code, ErrorCode::NotFound),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn shutdown_marks_state() {
        let state = test_state();
        let handler = RequestHandler::new(state.clone());
        let response = handler.handle(&Request::Shutdown).await;
        assert_eq!(response, Response::Ok);
        assert!(state.read().await.shutdown_requested());
    }

    #[test]
    fn error_codes_map_onto_wire_codes() {
        let cases = [
            (GoogleError::auth("x"), ErrorCode::AuthFailed),
            (GoogleError::access_denied("x"), ErrorCode::AccessDenied),
            (GoogleError::not_found("x"), ErrorCode::NotFound),
            (GoogleError::rate_limited("x"), ErrorCode::RateLimited),
            (GoogleError::network("x"), ErrorCode::Network),
            (GoogleError::server("x"), ErrorCode::Server),
            (GoogleError::invalid_response("x"), ErrorCode::Server),
            (GoogleError::bad_request("x"), ErrorCode::InvalidRequest),
            (GoogleError::internal("x"), ErrorCode::Internal),
        ];

        for (err, expected) in cases {
            match error_response(err) {
                Response::Error { error } => assert_eq!(error.code, expected),
                other => panic!("unexpected response: {:?}", other),
            }
        }
    }
}
