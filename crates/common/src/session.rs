//! Per-user navigator session
//!
//! [`Session`] holds the state, [`Session::apply`] is the pure transition
//! function, and [`FileNavigator`] runs the remote calls against a session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::archive;
use crate::delete::{DeleteFlow, PendingDelete};
use crate::error::{Error, Result};
use crate::navigator::{self, join_path, validate_entry_name, NavAction};
use crate::runtime::ContainerRuntime;
use crate::types::{DirectoryListing, EntryKind, FolderArchive, PendingTransfer};

/// State-only changes to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Navigate(NavAction),
    RequestDelete { name: String, kind: EntryKind },
    CancelDelete,
    SwitchContainer {
        container_id: String,
        working_dir: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub container_id: String,
    /// Where the session starts and returns to on container switch
    pub working_dir: String,
    /// Always a non-empty absolute path
    pub current_path: String,
    pub delete: DeleteFlow,
    pub pending_transfer: Option<PendingTransfer>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    pub fn new(container_id: impl Into<String>, working_dir: Option<String>) -> Self {
        let working_dir = initial_path(working_dir);
        Self {
            id: Uuid::new_v4(),
            container_id: container_id.into(),
            current_path: working_dir.clone(),
            working_dir,
            delete: DeleteFlow::new(),
            pending_transfer: None,
            last_active: Utc::now(),
        }
    }

    /// Apply a state-only action and return the resulting session.
    pub fn apply(mut self, action: SessionAction) -> Result<Self> {
        match action {
            SessionAction::Navigate(nav) => {
                self.current_path = navigator::resolve(&nav, &self.current_path);
            }
            SessionAction::RequestDelete { name, kind } => {
                self.delete.request(&name, kind)?;
            }
            SessionAction::CancelDelete => {
                self.delete.cancel();
            }
            SessionAction::SwitchContainer {
                container_id,
                working_dir,
            } => {
                if container_id != self.container_id {
                    self.container_id = container_id;
                    self.working_dir = initial_path(working_dir);
                    self.current_path = self.working_dir.clone();
                    self.delete = DeleteFlow::new();
                    self.pending_transfer = None;
                }
            }
        }
        Ok(self)
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Full path of an entry in the current directory
    pub fn entry_path(&self, name: &str) -> Result<String> {
        validate_entry_name(name)?;
        Ok(join_path(&self.current_path, name))
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            container_id: self.container_id.clone(),
            working_dir: self.working_dir.clone(),
            current_path: self.current_path.clone(),
            pending_delete: self.delete.pending().cloned(),
            pending_transfer: self.pending_transfer.as_ref().map(|t| TransferView {
                filename: t.filename.clone(),
                size_bytes: t.bytes.len() as u64,
            }),
            last_active: self.last_active,
        }
    }
}

fn initial_path(working_dir: Option<String>) -> String {
    match working_dir {
        Some(dir) if navigator::is_absolute(&dir) => dir,
        _ => "/".to_string(),
    }
}

/// Serializable snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub container_id: String,
    pub working_dir: String,
    pub current_path: String,
    pub pending_delete: Option<PendingDelete>,
    pub pending_transfer: Option<TransferView>,
    pub last_active: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferView {
    pub filename: String,
    pub size_bytes: u64,
}

/// Runs navigator operations against a runtime
#[derive(Clone)]
pub struct FileNavigator {
    runtime: Arc<dyn ContainerRuntime>,
}

impl FileNavigator {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// Start a session on `container`, beginning in its working directory
    pub async fn open(&self, container: &str) -> Result<Session> {
        let working_dir = self.runtime.working_dir(container).await?;
        Ok(Session::new(container, working_dir))
    }

    /// Point an existing session at another container
    pub async fn switch_container(&self, session: Session, container: &str) -> Result<Session> {
        if session.container_id == container {
            return Ok(session);
        }
        let working_dir = self.runtime.working_dir(container).await?;
        session.apply(SessionAction::SwitchContainer {
            container_id: container.to_string(),
            working_dir,
        })
    }

    /// List the current directory
    pub async fn list(&self, session: &Session) -> Result<DirectoryListing> {
        navigator::list(self.runtime.as_ref(), &session.container_id, &session.current_path).await
    }

    /// Resolve `action`, list the target and move there only if that worked.
    pub async fn navigate(&self, session: &mut Session, action: NavAction) -> Result<DirectoryListing> {
        let target = navigator::resolve(&action, &session.current_path);
        debug!(session = %session.id, from = %session.current_path, to = %target, "navigate");

        let listing = navigator::list(self.runtime.as_ref(), &session.container_id, &target).await?;
        session.current_path = target;
        session.touch();
        Ok(listing)
    }

    /// Upload into the current directory
    pub async fn upload(&self, session: &mut Session, filename: &str, bytes: &[u8]) -> Result<()> {
        session.touch();
        archive::upload(
            self.runtime.as_ref(),
            &session.container_id,
            &session.current_path,
            filename,
            bytes,
        )
        .await
    }

    /// Raw bytes of a file in the current directory
    pub async fn download_file(&self, session: &mut Session, name: &str) -> Result<Vec<u8>> {
        let full_path = session.entry_path(name)?;
        session.touch();
        archive::download_file(self.runtime.as_ref(), &session.container_id, &full_path).await
    }

    /// The current directory as a tar archive
    pub async fn download_folder(&self, session: &mut Session) -> Result<FolderArchive> {
        session.touch();
        archive::download_folder(self.runtime.as_ref(), &session.container_id, &session.current_path)
            .await
    }

    /// Fetch a file and keep it on the session until taken or cancelled.
    ///
    /// A failed fetch leaves any previously staged file in place.
    pub async fn select_for_download<'s>(
        &self,
        session: &'s mut Session,
        name: &str,
    ) -> Result<&'s PendingTransfer> {
        let bytes = self.download_file(session, name).await?;
        Ok(session.pending_transfer.insert(PendingTransfer {
            filename: name.to_string(),
            bytes,
        }))
    }

    /// Hand out the staged file and clear it
    pub fn take_transfer(&self, session: &mut Session) -> Result<PendingTransfer> {
        session.touch();
        session
            .pending_transfer
            .take()
            .ok_or_else(|| Error::InvalidRequest("no file is selected for download".into()))
    }

    pub fn cancel_transfer(&self, session: &mut Session) -> Option<PendingTransfer> {
        session.touch();
        session.pending_transfer.take()
    }

    /// First step of deletion
    pub fn request_delete(&self, session: &mut Session, name: &str, kind: EntryKind) -> Result<()> {
        session.touch();
        session.delete.request(name, kind)
    }

    pub fn cancel_delete(&self, session: &mut Session) -> Option<PendingDelete> {
        session.touch();
        session.delete.cancel()
    }

    /// Second step: remove the pending entry, then list the directory again.
    pub async fn confirm_delete(&self, session: &mut Session) -> Result<(String, DirectoryListing)> {
        session.touch();
        let removed = session
            .delete
            .confirm(self.runtime.as_ref(), &session.container_id, &session.current_path)
            .await?;
        let listing = self.list(session).await?;
        Ok((removed, listing))
    }
}
