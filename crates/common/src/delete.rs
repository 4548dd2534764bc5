//! Two-step delete confirmation
//!
//! `Idle -> PendingConfirm -> (Idle | Executing -> Idle)`. At most one entry
//! waits for confirmation; a new request replaces the previous one.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::navigator::{join_path, validate_entry_name};
use crate::runtime::ContainerRuntime;
use crate::types::EntryKind;

/// Entry the user asked to delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDelete {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeleteState {
    #[default]
    Idle,
    PendingConfirm { entry: PendingDelete },
    Executing { entry: PendingDelete },
}

/// Delete confirmation state for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteFlow {
    state: DeleteState,
}

impl DeleteFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DeleteState {
        &self.state
    }

    /// Entry awaiting confirmation, if any
    pub fn pending(&self) -> Option<&PendingDelete> {
        match &self.state {
            DeleteState::PendingConfirm { entry } => Some(entry),
            _ => None,
        }
    }

    /// Ask for confirmation on `name`, discarding any earlier request.
    pub fn request(&mut self, name: &str, kind: EntryKind) -> Result<()> {
        validate_entry_name(name)?;
        if let DeleteState::Executing { entry } = &self.state {
            return Err(Error::InvalidRequest(format!(
                "deletion of '{}' is still running",
                entry.name
            )));
        }
        self.state = DeleteState::PendingConfirm {
            entry: PendingDelete {
                name: name.to_string(),
                kind,
            },
        };
        Ok(())
    }

    /// Back out of a pending confirmation. Returns what was pending.
    pub fn cancel(&mut self) -> Option<PendingDelete> {
        match std::mem::take(&mut self.state) {
            DeleteState::PendingConfirm { entry } => Some(entry),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// `PendingConfirm -> Executing`
    pub fn begin(&mut self) -> Result<PendingDelete> {
        match std::mem::take(&mut self.state) {
            DeleteState::PendingConfirm { entry } => {
                self.state = DeleteState::Executing {
                    entry: entry.clone(),
                };
                Ok(entry)
            }
            other => {
                self.state = other;
                Err(Error::InvalidRequest("no deletion is awaiting confirmation".into()))
            }
        }
    }

    /// `Executing -> Idle`, whatever the outcome of the remote call
    pub fn finish(&mut self) {
        self.state = DeleteState::Idle;
    }

    /// Confirm the pending delete and remove it from `current_path`.
    ///
    /// The pending state is cleared on success and on failure; there is no
    /// retry. Returns the full path that was removed.
    pub async fn confirm(
        &mut self,
        runtime: &dyn ContainerRuntime,
        container: &str,
        current_path: &str,
    ) -> Result<String> {
        let entry = self.begin()?;
        let full_path = join_path(current_path, &entry.name);

        // Back to Idle even if this future is dropped mid-call
        let guard = FinishOnDrop(self);
        let result = runtime
            .exec_remove(container, &full_path, entry.kind.is_directory())
            .await;
        drop(guard);

        let output = result?;
        if !output.success() {
            warn!(
                container = %container,
                path = %full_path,
                exit_code = output.exit_code,
                "remove failed"
            );
            return Err(Error::from_remote_stderr(&output.stderr));
        }

        info!(container = %container, path = %full_path, kind = ?entry.kind, "removed entry");
        Ok(full_path)
    }
}

struct FinishOnDrop<'a>(&'a mut DeleteFlow);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRuntime;
    use std::time::Duration;

    #[test]
    fn test_request_then_cancel() {
        let mut flow = DeleteFlow::new();
        flow.request("notes.txt", EntryKind::File).unwrap();
        assert_eq!(flow.pending().map(|p| p.name.as_str()), Some("notes.txt"));

        let cancelled = flow.cancel().unwrap();
        assert_eq!(cancelled.name, "notes.txt");
        assert_eq!(flow.state(), &DeleteState::Idle);
        assert!(flow.cancel().is_none());
    }

    #[test]
    fn test_last_request_wins() {
        let mut flow = DeleteFlow::new();
        flow.request("a", EntryKind::File).unwrap();
        flow.request("b", EntryKind::Directory).unwrap();

        let pending = flow.pending().unwrap();
        assert_eq!(pending.name, "b");
        assert_eq!(pending.kind, EntryKind::Directory);
    }

    #[test]
    fn test_begin_requires_pending() {
        let mut flow = DeleteFlow::new();
        assert!(matches!(flow.begin(), Err(Error::InvalidRequest(_))));
        assert_eq!(flow.state(), &DeleteState::Idle);

        flow.request("x", EntryKind::File).unwrap();
        let entry = flow.begin().unwrap();
        assert_eq!(entry.name, "x");
        assert!(matches!(flow.state(), DeleteState::Executing { .. }));
        assert!(flow.pending().is_none());

        // Cancelling while executing changes nothing
        assert!(flow.cancel().is_none());
        assert!(matches!(flow.state(), DeleteState::Executing { .. }));

        flow.finish();
        assert_eq!(flow.state(), &DeleteState::Idle);
    }

    #[test]
    fn test_request_rejects_unsafe_names() {
        let mut flow = DeleteFlow::new();
        assert!(flow.request("..", EntryKind::Directory).is_err());
        assert!(flow.request("a/b", EntryKind::File).is_err());
        assert!(flow.request("", EntryKind::File).is_err());
        assert_eq!(flow.state(), &DeleteState::Idle);
    }

    #[tokio::test]
    async fn test_abandoned_confirm_returns_to_idle() {
        let rt = MemoryRuntime::new();
        rt.add_container("c1", "web", None);
        rt.add_file("c1", "/data/a.txt", b"x");
        rt.stall_removals(true);

        let mut flow = DeleteFlow::new();
        flow.request("a.txt", EntryKind::File).unwrap();
        let res = tokio::time::timeout(
            Duration::from_millis(20),
            flow.confirm(&rt, "c1", "/data"),
        )
        .await;
        assert!(res.is_err());

        assert_eq!(flow.state(), &DeleteState::Idle);
        flow.request("a.txt", EntryKind::File).unwrap();
        assert_eq!(flow.cancel().map(|p| p.name), Some("a.txt".to_string()));
        assert!(rt.exists("c1", "/data/a.txt"));
    }
}
