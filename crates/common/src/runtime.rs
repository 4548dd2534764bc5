//! Container runtime adapter
//!
//! The navigator never talks to Docker directly; it goes through
//! [`ContainerRuntime`], implemented here by [`DockerRuntime`] on top of
//! bollard and, for tests, by [`crate::memory::MemoryRuntime`].

use async_trait::async_trait;
use bollard::container::{
    DownloadFromContainerOptions, InspectContainerOptions, ListContainersOptions,
    UploadToContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::Docker;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DockerConfig;
use crate::error::{Error, Result};
use crate::types::{short_id, CommandOutput, ContainerSummary};

/// Operations the file navigator needs from a container runtime
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check that the runtime answers at all
    async fn ping(&self) -> Result<()>;

    /// Running containers, or all of them when `all` is set
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    /// Configured working directory of a container, if any
    async fn working_dir(&self, container: &str) -> Result<Option<String>>;

    /// Run a long-format listing of `path`; nonzero exit when it is not a directory
    async fn list_directory(&self, container: &str, path: &str) -> Result<CommandOutput>;

    /// Archive of `path`: single entry for a file, a tree for a directory
    async fn get_archive(&self, container: &str, path: &str) -> Result<Vec<u8>>;

    /// Extract `archive` into the existing directory `target_dir`
    async fn put_archive(&self, container: &str, target_dir: &str, archive: Vec<u8>) -> Result<()>;

    /// Force-remove `path`, recursing into directories when `recursive`
    async fn exec_remove(&self, container: &str, path: &str, recursive: bool)
        -> Result<CommandOutput>;
}

/// Docker Engine API backed runtime
pub struct DockerRuntime {
    client: Docker,
    listing_locale: String,
}

impl DockerRuntime {
    pub fn new(client: Docker, listing_locale: impl Into<String>) -> Self {
        Self {
            client,
            listing_locale: listing_locale.into(),
        }
    }

    /// Connect using the configured host, or the local defaults
    pub fn connect(cfg: &DockerConfig, listing_locale: &str) -> Result<Self> {
        let timeout = cfg.timeout_secs;
        let client = match cfg.host.as_deref() {
            None => Docker::connect_with_local_defaults()
                .map(|d| d.with_timeout(Duration::from_secs(timeout))),
            Some(host) if host.starts_with("tcp://") || host.starts_with("http://") => {
                let addr = host.replacen("tcp://", "http://", 1);
                Docker::connect_with_http(&addr, timeout, bollard::API_DEFAULT_VERSION)
            }
            Some(host) => {
                let path = host.strip_prefix("unix://").unwrap_or(host);
                Docker::connect_with_unix(path, timeout, bollard::API_DEFAULT_VERSION)
            }
        }
        .map_err(|e| Error::RemoteUnavailable(e.to_string()))?;

        info!(
            host = cfg.host.as_deref().unwrap_or("local defaults"),
            "connected to container runtime"
        );

        Ok(Self::new(client, listing_locale))
    }

    /// Run a command and collect stdout/stderr plus the exit code
    async fn exec(&self, container: &str, cmd: Vec<String>) -> Result<CommandOutput> {
        debug!(container = %container, cmd = ?cmd, "exec");

        let exec = self
            .client
            .create_exec(
                container,
                CreateExecOptions {
                    cmd: Some(cmd),
                    env: Some(vec![format!("LC_ALL={}", self.listing_locale)]),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    tty: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        if let StartExecResults::Attached { mut output, .. } =
            self.client.start_exec(&exec.id, None).await?
        {
            while let Some(item) = output.next().await {
                match item? {
                    bollard::container::LogOutput::StdOut { message } => {
                        stdout.extend_from_slice(&message)
                    }
                    bollard::container::LogOutput::StdErr { message } => {
                        stderr.extend_from_slice(&message)
                    }
                    _ => {}
                }
            }
        }

        let inspect = self.client.inspect_exec(&exec.id).await?;
        let exit_code = reported_exit_code(&exec.id, inspect.exit_code)?;

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<()> {
        self.client
            .ping()
            .await
            .map_err(|e| Error::RemoteUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let containers = self
            .client
            .list_containers(Some(ListContainersOptions::<String> {
                all,
                ..Default::default()
            }))
            .await?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let id = c.id.unwrap_or_default();
                let name = c
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_else(|| short_id(&id));
                ContainerSummary {
                    short_id: short_id(&id),
                    id,
                    name,
                    image: c.image.unwrap_or_default(),
                    state: c.state.unwrap_or_default(),
                    status: c.status.unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn working_dir(&self, container: &str) -> Result<Option<String>> {
        let details = self
            .client
            .inspect_container(container, None::<InspectContainerOptions>)
            .await?;

        Ok(details
            .config
            .and_then(|c| c.working_dir)
            .filter(|w| !w.is_empty()))
    }

    async fn list_directory(&self, container: &str, path: &str) -> Result<CommandOutput> {
        self.exec(
            container,
            vec!["ls".to_string(), "-la".to_string(), dir_operand(path)],
        )
        .await
    }

    async fn get_archive(&self, container: &str, path: &str) -> Result<Vec<u8>> {
        debug!(container = %container, path = %path, "downloading archive");

        let mut stream = Box::pin(self.client.download_from_container(
            container,
            Some(DownloadFromContainerOptions { path: path.to_string() }),
        ));

        // Collect everything before returning so callers never see a partial archive.
        let mut archive = Vec::new();
        while let Some(chunk) = stream.next().await {
            archive.extend_from_slice(&chunk?);
        }
        Ok(archive)
    }

    async fn put_archive(&self, container: &str, target_dir: &str, archive: Vec<u8>) -> Result<()> {
        debug!(
            container = %container,
            target_dir = %target_dir,
            bytes = archive.len(),
            "uploading archive"
        );

        self.client
            .upload_to_container(
                container,
                Some(UploadToContainerOptions {
                    path: target_dir.to_string(),
                    ..Default::default()
                }),
                archive.into(),
            )
            .await?;
        Ok(())
    }

    async fn exec_remove(
        &self,
        container: &str,
        path: &str,
        recursive: bool,
    ) -> Result<CommandOutput> {
        let flag = if recursive { "-rf" } else { "-f" };
        self.exec(
            container,
            vec!["rm".to_string(), flag.to_string(), path.to_string()],
        )
        .await
    }
}

/// An exec whose exit code was never reported is not a success
fn reported_exit_code(exec_id: &str, exit_code: Option<i64>) -> Result<i64> {
    exit_code.ok_or_else(|| {
        Error::Runtime(format!("exec {} finished without an exit code", exec_id))
    })
}

/// `ls` operand that only succeeds for directories; a file yields
/// "Not a directory" with exit code 2.
fn dir_operand(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}
