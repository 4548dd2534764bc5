//! Container Filesystem Commands
//!
//! Each command opens a navigator session on the server, moves to the
//! directory it needs, does its work and closes the session again.

use anyhow::{anyhow, bail, Context, Result};
use clap::Subcommand;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use dockhand_common::navigator::{base_name, parent_path};
use dockhand_common::{format_bytes, EntryKind, NavAction};

use crate::client::WebClient;
use crate::output::{print_json, print_list, print_message, print_success, print_warning, OutputFormat};

#[derive(Subcommand)]
pub enum FsCommands {
    /// List a directory (default: the container's working directory)
    Ls {
        /// Container ID or name
        container: String,

        /// Directory to list
        path: Option<String>,
    },

    /// Upload a local file into a container directory
    Upload {
        /// Container ID or name
        container: String,

        /// Local file to upload
        local: PathBuf,

        /// Target directory (default: the container's working directory)
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Download a single file
    Download {
        /// Container ID or name
        container: String,

        /// Remote file path
        remote: String,

        /// Output file (default: the remote file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download a directory as a tar archive
    DownloadDir {
        /// Container ID or name
        container: String,

        /// Remote directory
        remote: String,

        /// Output file (default: <dir>.tar)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove a file or directory
    Rm {
        /// Container ID or name
        container: String,

        /// Remote path
        path: String,

        /// The path is a directory; remove it recursively
        #[arg(short, long)]
        dir: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Split a remote path into the directory to navigate to and the entry name.
///
/// A bare name stays in the working directory.
fn split_remote(remote: &str) -> Result<(Option<String>, String)> {
    let name = base_name(remote)
        .ok_or_else(|| anyhow!("'{}' does not name an entry", remote))?
        .to_string();
    let dir = if remote.trim_end_matches('/').contains('/') {
        Some(parent_path(remote))
    } else {
        None
    };
    Ok((dir, name))
}

/// Open a session and move to `dir` if given
async fn open_at(client: &WebClient, container: &str, dir: Option<&str>) -> Result<String> {
    let opened = client.open_session(container).await?;
    let id = opened.session.id;
    if let Some(dir) = dir {
        if let Err(e) = client
            .navigate(&id, &NavAction::Goto { path: dir.to_string() })
            .await
        {
            close(client, &id).await;
            return Err(e);
        }
    }
    Ok(id)
}

async fn close(client: &WebClient, id: &str) {
    if let Err(e) = client.close_session(id).await {
        warn!("failed to close session {}: {}", id, e);
    }
}

/// Ask on the terminal; stdin is read on the blocking pool
async fn confirm(prompt: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || -> Result<bool> {
        print!("{} [y/N] ", prompt);
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(is_yes(&answer))
    })
    .await
    .context("confirmation prompt")?
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub async fn execute(cmd: FsCommands, client: WebClient, format: OutputFormat) -> Result<()> {
    match cmd {
        FsCommands::Ls { container, path } => {
            let opened = client.open_session(&container).await?;
            let id = opened.session.id.clone();

            let result = match path {
                Some(path) => client
                    .navigate(&id, &NavAction::Goto { path })
                    .await
                    .map(|n| (n.current_path, n.listing)),
                None => match opened.listing {
                    Some(listing) => Ok((opened.session.current_path, listing)),
                    None => Err(anyhow!(opened
                        .listing_error
                        .unwrap_or_else(|| "listing unavailable".to_string()))),
                },
            };
            close(&client, &id).await;
            let (current_path, listing) = result?;

            match format {
                OutputFormat::Json => print_json(&listing),
                _ => {
                    print_message(&current_path, format);
                    let entries: Vec<_> = listing.entries().cloned().collect();
                    print_list(&entries, format);
                }
            }
        }

        FsCommands::Upload { container, local, dir } => {
            let filename = local
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow!("{} has no file name", local.display()))?;
            let bytes = tokio::fs::read(&local)
                .await
                .with_context(|| format!("reading {}", local.display()))?;

            let id = open_at(&client, &container, dir.as_deref()).await?;
            let result = client.upload(&id, &filename, bytes).await;
            close(&client, &id).await;
            let uploaded = result?;

            print_success(&format!(
                "Uploaded {} ({})",
                uploaded.path,
                format_bytes(uploaded.size_bytes)
            ));
        }

        FsCommands::Download {
            container,
            remote,
            output,
        } => {
            let (dir, name) = split_remote(&remote)?;
            let id = open_at(&client, &container, dir.as_deref()).await?;
            let result = client.download(&id, &name).await;
            close(&client, &id).await;
            let bytes = result?;

            let output = output.unwrap_or_else(|| PathBuf::from(&name));
            write_output(&output, &bytes).await?;
            print_success(&format!(
                "Saved {} to {} ({})",
                remote,
                output.display(),
                format_bytes(bytes.len() as u64)
            ));
        }

        FsCommands::DownloadDir {
            container,
            remote,
            output,
        } => {
            let id = open_at(&client, &container, Some(&remote)).await?;
            let result = client.archive(&id).await;
            close(&client, &id).await;
            let (suggested, bytes) = result?;

            let output = output
                .or_else(|| suggested.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("root.tar"));
            write_output(&output, &bytes).await?;
            print_success(&format!(
                "Saved {} to {} ({})",
                remote,
                output.display(),
                format_bytes(bytes.len() as u64)
            ));
        }

        FsCommands::Rm {
            container,
            path,
            dir,
            yes,
        } => {
            let (parent, name) = split_remote(&path)?;
            let kind = if dir { EntryKind::Directory } else { EntryKind::File };

            let id = open_at(&client, &container, parent.as_deref()).await?;
            let result = remove(&client, &id, &name, kind, yes).await;
            close(&client, &id).await;

            match result? {
                Some(removed) => print_success(&format!("Removed {}", removed)),
                None => print_warning("Cancelled"),
            }
        }
    }

    Ok(())
}

/// Request, then confirm or cancel. Returns the removed path if confirmed.
async fn remove(
    client: &WebClient,
    id: &str,
    name: &str,
    kind: EntryKind,
    yes: bool,
) -> Result<Option<String>> {
    client.request_delete(id, name, kind).await?;

    let prompt = match kind {
        EntryKind::Directory => format!("Delete directory '{}' and everything in it?", name),
        EntryKind::File => format!("Delete '{}'?", name),
    };
    if yes || confirm(prompt).await? {
        debug!(session = %id, name = %name, "confirming delete");
        Ok(Some(client.confirm_delete(id).await?))
    } else {
        client.cancel_delete(id).await?;
        Ok(None)
    }
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("empty output path");
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_remote() {
        assert_eq!(
            split_remote("/data/notes.txt").unwrap(),
            (Some("/data".to_string()), "notes.txt".to_string())
        );
        assert_eq!(
            split_remote("/notes.txt").unwrap(),
            (Some("/".to_string()), "notes.txt".to_string())
        );
        assert_eq!(split_remote("notes.txt").unwrap(), (None, "notes.txt".to_string()));
        assert_eq!(
            split_remote("logs/app.log").unwrap(),
            (Some("logs".to_string()), "app.log".to_string())
        );
        assert!(split_remote("/").is_err());
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[tokio::test]
    async fn test_write_output_rejects_empty_path() {
        assert!(write_output(Path::new(""), b"x").await.is_err());
    }
}
