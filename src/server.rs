//! The protocol front end.
//!
//! The backend owns one [`State`] behind a lock. Notifications compute the next
//! state from the current one and swap it in; requests read a snapshot. A
//! failed update or query is logged and never surfaces as a protocol error.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use itertools::Itertools;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::workspace::{FolderSpec, State};
use crate::{gotodef, references};

pub struct Backend {
    client: Client,
    state: Arc<RwLock<Option<State>>>,
}

impl Backend {
    pub fn new(client: Client) -> Backend {
        Backend {
            client,
            state: Arc::new(RwLock::new(None)),
        }
    }

    /// Replaces the state with `update(current)`. On failure the current state
    /// is kept; notifications never report failure back to the client.
    async fn update_state<F>(&self, event: &str, update: F)
    where
        F: FnOnce(&State) -> Result<State>,
    {
        let mut guard = self.state.write().await;
        let Some(current) = guard.as_ref() else {
            tracing::warn!(event, "event before initialize, ignoring");
            return;
        };

        match update(current) {
            Ok(next) => {
                tracing::debug!(event, revision = next.revision(), "state updated");
                *guard = Some(next);
            }
            Err(err) => {
                tracing::error!(event, error = %err, "event failed, keeping the previous state")
            }
        }
    }

    /// Runs `query` against the current snapshot. A failed query ends the
    /// request with no result.
    async fn query<T, F>(&self, request: &str, query: F) -> Option<T>
    where
        F: FnOnce(&State) -> Result<Option<T>>,
    {
        let guard = self.state.read().await;
        let state = guard.as_ref()?;

        query(state).unwrap_or_else(|err| {
            tracing::error!(request, error = %err, "request failed");
            None
        })
    }

    async fn update_for_path<F>(&self, event: &str, path: jsonrpc::Result<PathBuf>, update: F)
    where
        F: FnOnce(&State, PathBuf) -> Result<State>,
    {
        match path {
            Ok(path) => self.update_state(event, |state| update(state, path)).await,
            Err(err) => tracing::warn!(event, error = %err, "ignoring non-file document"),
        }
    }
}

/// Startup failures are the only errors that reach the client.
fn startup_error(err: Error) -> jsonrpc::Error {
    jsonrpc::Error {
        message: err.to_string().into(),
        ..jsonrpc::Error::internal_error()
    }
}

fn folder_spec(folder: &WorkspaceFolder) -> Option<FolderSpec> {
    match folder.uri.to_file_path() {
        Ok(root) => Some(FolderSpec::new(folder.name.clone(), root)),
        Err(()) => {
            tracing::warn!(uri = %folder.uri, "skipping non-file workspace folder");
            None
        }
    }
}

fn file_paths<'a>(uris: impl Iterator<Item = &'a str>) -> Vec<PathBuf> {
    uris.filter_map(|uri| Url::parse(uri).ok()?.to_file_path().ok())
        .collect()
}

/// Workspace folders from the initialize request, falling back to the
/// deprecated root URI.
fn initial_folders(params: &InitializeParams) -> Vec<FolderSpec> {
    if let Some(folders) = &params.workspace_folders {
        return folders.iter().filter_map(folder_spec).collect();
    }

    #[allow(deprecated)]
    let root = params.root_uri.as_ref().and_then(|uri| uri.to_file_path().ok());

    root.map(|root| {
        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        FolderSpec::new(name, root)
    })
    .into_iter()
    .collect()
}

/// File operation filter for every configured Markdown extension.
fn markdown_file_filters(extensions: &[String]) -> FileOperationRegistrationOptions {
    let extensions = extensions
        .iter()
        .map(|extension| extension.to_lowercase())
        .unique()
        .collect_vec();
    let glob = match extensions.as_slice() {
        [single] => format!("**/*.{single}"),
        _ => format!("**/*.{{{}}}", extensions.join(",")),
    };

    FileOperationRegistrationOptions {
        filters: vec![FileOperationFilter {
            scheme: Some("file".to_string()),
            pattern: FileOperationPattern {
                glob,
                matches: Some(FileOperationPatternKind::File),
                options: Some(FileOperationPatternOptions {
                    ignore_case: Some(true),
                }),
            },
        }],
    }
}

pub fn server_capabilities(extensions: &[String]) -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::INCREMENTAL),
                ..Default::default()
            },
        )),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        workspace: Some(WorkspaceServerCapabilities {
            workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                supported: Some(true),
                change_notifications: Some(OneOf::Left(true)),
            }),
            file_operations: Some(WorkspaceFileOperationsServerCapabilities {
                did_create: Some(markdown_file_filters(extensions)),
                did_delete: Some(markdown_file_filters(extensions)),
                ..Default::default()
            }),
        }),
        ..Default::default()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        let specs = initial_folders(&params);
        let settings: HashMap<PathBuf, Settings> = specs
            .iter()
            .map(|spec| (spec.root.clone(), Settings::for_root(&spec.root)))
            .collect();
        let settings_for = |root: &Path| settings.get(root).cloned().unwrap_or_default();

        let state = State::initialize(params.client_info.clone(), &specs, settings_for)
            .map_err(startup_error)?;
        tracing::info!(
            client = ?state.client().map(|client| &client.name),
            folders = state.folders().count(),
            "initialized"
        );

        let extensions = match settings.is_empty() {
            true => Settings::default().markdown_extensions,
            false => settings
                .values()
                .flat_map(|settings| settings.markdown_extensions.iter().cloned())
                .collect(),
        };

        *self.state.write().await = Some(state);

        Ok(InitializeResult {
            capabilities: server_capabilities(&extensions),
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "marklink ready")
            .await;
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        tracing::info!("shutdown requested");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let version = params.text_document.version;
        let text = params.text_document.text.clone();
        self.update_for_path("didOpen", params_path!(params), |state, path| {
            state.open_document(path, &text, version)
        })
        .await
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let version = params.text_document.version;
        self.update_for_path("didChange", params_path!(params), |state, path| {
            state.change_document(&path, Some(version), &params.content_changes)
        })
        .await
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.update_for_path("didClose", params_path!(params), |state, path| {
            state.close_document(&path)
        })
        .await
    }

    async fn did_create_files(&self, params: CreateFilesParams) {
        let paths = file_paths(params.files.iter().map(|file| file.uri.as_str()));
        self.update_state("didCreateFiles", |state| state.files_created(&paths))
            .await
    }

    async fn did_delete_files(&self, params: DeleteFilesParams) {
        let paths = file_paths(params.files.iter().map(|file| file.uri.as_str()));
        self.update_state("didDeleteFiles", |state| state.files_deleted(&paths))
            .await
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let added = params
            .event
            .added
            .iter()
            .filter_map(folder_spec)
            .collect_vec();
        let removed = params
            .event
            .removed
            .iter()
            .filter_map(|folder| folder.uri.to_file_path().ok())
            .collect_vec();

        self.update_state("didChangeWorkspaceFolders", |state| {
            state.reconcile_folders(&added, &removed, Settings::for_root)
        })
        .await
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> jsonrpc::Result<Option<GotoDefinitionResponse>> {
        let (position, path) = params_position_path!(params.text_document_position_params)?;

        let locations = self
            .query("definition", |state| {
                gotodef::goto_definition(state, position, &path)
            })
            .await;

        Ok(locations.map(GotoDefinitionResponse::Array))
    }

    async fn references(&self, params: ReferenceParams) -> jsonrpc::Result<Option<Vec<Location>>> {
        let (position, path) = params_position_path!(params.text_document_position)?;
        let include_declaration = params.context.include_declaration;

        Ok(self
            .query("references", |state| {
                references::references(state, position, &path, include_declaration)
            })
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_cover_sync_workspace_and_navigation() {
        let capabilities = server_capabilities(&["md".to_string()]);

        assert_eq!(
            capabilities.text_document_sync,
            Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::INCREMENTAL),
                ..Default::default()
            }))
        );
        assert_eq!(capabilities.definition_provider, Some(OneOf::Left(true)));
        assert_eq!(capabilities.references_provider, Some(OneOf::Left(true)));

        let workspace = capabilities.workspace.unwrap();
        let folders = workspace.workspace_folders.unwrap();
        assert_eq!(folders.supported, Some(true));
        assert_eq!(folders.change_notifications, Some(OneOf::Left(true)));

        let operations = workspace.file_operations.unwrap();
        let filter = &operations.did_create.unwrap().filters[0];
        assert_eq!(filter.scheme.as_deref(), Some("file"));
        assert_eq!(filter.pattern.glob, "**/*.md");
        assert_eq!(filter.pattern.matches, Some(FileOperationPatternKind::File));
        assert_eq!(
            filter.pattern.options.as_ref().and_then(|o| o.ignore_case),
            Some(true)
        );
        assert!(operations.did_delete.is_some());
    }

    #[test]
    fn capabilities_serialize_with_protocol_names() {
        let json = serde_json::to_value(server_capabilities(&["md".to_string()])).unwrap();
        let filter = &json["workspace"]["fileOperations"]["didDelete"]["filters"][0];

        assert_eq!(json["textDocumentSync"]["change"], 2);
        assert_eq!(json["workspace"]["workspaceFolders"]["changeNotifications"], true);
        assert_eq!(filter["pattern"]["glob"], "**/*.md");
        assert_eq!(filter["pattern"]["matches"], "file");
        assert_eq!(filter["pattern"]["options"]["ignoreCase"], true);
        assert!(json["workspace"]["fileOperations"]["didRename"].is_null());
    }

    #[test]
    fn several_extensions_share_one_glob() {
        let options = markdown_file_filters(&[
            "md".to_string(),
            "MD".to_string(),
            "markdown".to_string(),
        ]);

        assert_eq!(options.filters[0].pattern.glob, "**/*.{md,markdown}");
    }

    #[test]
    fn root_uri_is_the_fallback_folder() {
        #[allow(deprecated)]
        let params = InitializeParams {
            root_uri: Some(Url::parse("file:///home/me/notes").unwrap()),
            ..Default::default()
        };

        assert_eq!(
            initial_folders(&params),
            vec![FolderSpec::new("notes", "/home/me/notes")]
        );
    }

    #[test]
    fn workspace_folders_take_precedence() {
        #[allow(deprecated)]
        let params = InitializeParams {
            root_uri: Some(Url::parse("file:///ignored").unwrap()),
            workspace_folders: Some(vec![
                WorkspaceFolder {
                    uri: Url::parse("file:///a").unwrap(),
                    name: "a".to_string(),
                },
                WorkspaceFolder {
                    uri: Url::parse("https://example.com/b").unwrap(),
                    name: "b".to_string(),
                },
            ]),
            ..Default::default()
        };

        assert_eq!(initial_folders(&params), vec![FolderSpec::new("a", "/a")]);
    }

    #[test]
    fn missing_folders_fail_startup() {
        let err = startup_error(Error::NoWorkspaceFolders);

        assert_eq!(err.code, jsonrpc::ErrorCode::InternalError);
        assert_eq!(err.message, "no workspace folders were registered");
    }
}
