//! In-memory container runtime
//!
//! Models a handful of containers with a flat path -> node map and produces
//! the same shapes the Docker runtime does: `ls -la` text, tar archives and
//! `rm` exit codes. Used by the test suites.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};

use crate::error::{Error, Result};
use crate::navigator::{base_name, join_path, parent_path};
use crate::runtime::ContainerRuntime;
use crate::types::{short_id, CommandOutput, ContainerSummary};

#[derive(Debug, Clone)]
enum Node {
    Dir { mtime: i64 },
    File { data: Vec<u8>, mtime: i64 },
}

#[derive(Debug, Clone)]
struct MemoryContainer {
    summary: ContainerSummary,
    working_dir: Option<String>,
    nodes: BTreeMap<String, Node>,
    /// Directories that refuse writes
    read_only: Vec<String>,
}

/// Container runtime backed by in-memory filesystems
#[derive(Default)]
pub struct MemoryRuntime {
    containers: Mutex<HashMap<String, MemoryContainer>>,
    unavailable: Mutex<bool>,
    stall_removals: Mutex<bool>,
}

const FIXED_MTIME: i64 = 1_709_547_120; // 2024-03-04 10:12 UTC

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a running container with an empty root filesystem
    pub fn add_container(&self, id: &str, name: &str, working_dir: Option<&str>) {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir { mtime: FIXED_MTIME });
        let container = MemoryContainer {
            summary: ContainerSummary {
                id: id.to_string(),
                short_id: short_id(id),
                name: name.to_string(),
                image: "alpine:3.19".to_string(),
                state: "running".to_string(),
                status: "Up 2 hours".to_string(),
            },
            working_dir: working_dir.map(|w| w.to_string()),
            nodes,
            read_only: Vec::new(),
        };
        self.containers.lock().insert(id.to_string(), container);
        if let Some(dir) = working_dir {
            self.add_dir(id, dir);
        }
    }

    /// Mark a container as stopped
    pub fn stop_container(&self, id: &str) {
        if let Some(c) = self.containers.lock().get_mut(id) {
            c.summary.state = "exited".to_string();
            c.summary.status = "Exited (0) 5 minutes ago".to_string();
        }
    }

    /// Create a directory and its parents
    pub fn add_dir(&self, container: &str, path: &str) {
        let mut containers = self.containers.lock();
        if let Some(c) = containers.get_mut(container) {
            ensure_dirs(&mut c.nodes, path);
        }
    }

    /// Create a file, creating parent directories
    pub fn add_file(&self, container: &str, path: &str, data: &[u8]) {
        let mut containers = self.containers.lock();
        if let Some(c) = containers.get_mut(container) {
            ensure_dirs(&mut c.nodes, &parent_path(path));
            c.nodes.insert(
                normalize(path),
                Node::File {
                    data: data.to_vec(),
                    mtime: FIXED_MTIME,
                },
            );
        }
    }

    /// Refuse writes and removals below `path`
    pub fn make_read_only(&self, container: &str, path: &str) {
        if let Some(c) = self.containers.lock().get_mut(container) {
            c.read_only.push(normalize(path));
        }
    }

    /// Simulate a daemon that cannot be reached
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    /// Make `exec_remove` hang until the caller gives up
    pub fn stall_removals(&self, stall: bool) {
        *self.stall_removals.lock() = stall;
    }

    pub fn exists(&self, container: &str, path: &str) -> bool {
        self.containers
            .lock()
            .get(container)
            .map(|c| c.nodes.contains_key(&normalize(path)))
            .unwrap_or(false)
    }

    pub fn read_file(&self, container: &str, path: &str) -> Option<Vec<u8>> {
        let containers = self.containers.lock();
        match containers.get(container)?.nodes.get(&normalize(path))? {
            Node::File { data, .. } => Some(data.clone()),
            Node::Dir { .. } => None,
        }
    }

    fn check_available(&self) -> Result<()> {
        if *self.unavailable.lock() {
            return Err(Error::RemoteUnavailable(
                "error trying to connect: No such file or directory (os error 2)".into(),
            ));
        }
        Ok(())
    }

    fn with_container<T>(
        &self,
        container: &str,
        f: impl FnOnce(&mut MemoryContainer) -> Result<T>,
    ) -> Result<T> {
        self.check_available()?;
        let mut containers = self.containers.lock();
        let c = containers
            .get_mut(container)
            .ok_or_else(|| Error::not_found("container", container))?;
        if !c.summary.is_running() {
            return Err(Error::Runtime(format!("container {} is not running", container)));
        }
        f(c)
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn ensure_dirs(nodes: &mut BTreeMap<String, Node>, path: &str) {
    let path = normalize(path);
    let mut current = String::from("/");
    for part in path.split('/').filter(|p| !p.is_empty()) {
        current = join_path(&current, part);
        nodes
            .entry(current.clone())
            .or_insert(Node::Dir { mtime: FIXED_MTIME });
    }
}

/// Direct children of `dir`, in name order
fn children<'a>(nodes: &'a BTreeMap<String, Node>, dir: &str) -> Vec<(&'a str, &'a Node)> {
    nodes
        .iter()
        .filter(|(path, _)| path.as_str() != "/" && parent_path(path) == dir)
        .filter_map(|(path, node)| base_name(path).map(|name| (name, node)))
        .collect()
}

fn is_read_only(c: &MemoryContainer, path: &str) -> bool {
    c.read_only
        .iter()
        .any(|ro| path == ro || path.starts_with(&format!("{}/", ro.trim_end_matches('/'))))
}

fn ls_line(name: &str, node: &Node) -> String {
    let (perm, links, size, mtime) = match node {
        Node::Dir { mtime } => ("drwxr-xr-x", 2, 4096, *mtime),
        Node::File { data, mtime } => ("-rw-r--r--", 1, data.len(), *mtime),
    };
    let when: DateTime<Utc> = Utc.timestamp_opt(mtime, 0).single().unwrap_or_default();
    format!(
        "{} {:>4} root     root     {:>9} {} {}",
        perm,
        links,
        size,
        when.format("%b %e %H:%M"),
        name
    )
}

fn tar_header(node: &Node) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    match node {
        Node::Dir { mtime } => {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            header.set_mtime(*mtime as u64);
        }
        Node::File { data, mtime } => {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(data.len() as u64);
            header.set_mtime(*mtime as u64);
        }
    }
    header
}

#[async_trait]
impl ContainerRuntime for MemoryRuntime {
    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        self.check_available()?;
        let containers = self.containers.lock();
        let mut list: Vec<_> = containers
            .values()
            .filter(|c| all || c.summary.is_running())
            .map(|c| c.summary.clone())
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn working_dir(&self, container: &str) -> Result<Option<String>> {
        self.check_available()?;
        self.containers
            .lock()
            .get(container)
            .map(|c| c.working_dir.clone())
            .ok_or_else(|| Error::not_found("container", container))
    }

    async fn list_directory(&self, container: &str, path: &str) -> Result<CommandOutput> {
        self.with_container(container, |c| {
            let dir = normalize(path);
            match c.nodes.get(&dir) {
                Some(node @ Node::Dir { .. }) => {
                    let entries = children(&c.nodes, &dir);
                    let mut lines = vec![format!("total {}", entries.len() * 4)];
                    lines.push(ls_line(".", node));
                    let parent = c.nodes.get(&parent_path(&dir)).unwrap_or(node);
                    lines.push(ls_line("..", parent));
                    lines.extend(entries.iter().map(|(name, node)| ls_line(name, node)));
                    Ok(CommandOutput {
                        exit_code: 0,
                        stdout: lines.join("\n") + "\n",
                        stderr: String::new(),
                    })
                }
                Some(Node::File { .. }) => Ok(CommandOutput {
                    exit_code: 2,
                    stdout: String::new(),
                    stderr: format!("ls: cannot access '{}/': Not a directory\n", dir),
                }),
                None => Ok(CommandOutput {
                    exit_code: 2,
                    stdout: String::new(),
                    stderr: format!("ls: cannot access '{}': No such file or directory\n", path),
                }),
            }
        })
    }

    async fn get_archive(&self, container: &str, path: &str) -> Result<Vec<u8>> {
        self.with_container(container, |c| {
            let root = normalize(path);
            let node = c.nodes.get(&root).ok_or_else(|| {
                Error::Path(format!("Could not find the file {} in container {}", path, container))
            })?;
            let root_name = base_name(&root).unwrap_or(".").to_string();

            let mut builder = tar::Builder::new(Vec::new());
            let mut header = tar_header(node);
            match node {
                Node::File { data, .. } => {
                    builder.append_data(&mut header, &root_name, data.as_slice())?;
                }
                Node::Dir { .. } => {
                    builder.append_data(&mut header, format!("{}/", root_name), std::io::empty())?;
                    let prefix = if root == "/" { "/".to_string() } else { format!("{}/", root) };
                    for (p, n) in c.nodes.range(prefix.clone()..) {
                        if !p.starts_with(&prefix) {
                            break;
                        }
                        if p == &root {
                            continue;
                        }
                        let rel = format!("{}/{}", root_name, &p[prefix.len()..]);
                        let mut header = tar_header(n);
                        match n {
                            Node::File { data, .. } => {
                                builder.append_data(&mut header, rel, data.as_slice())?
                            }
                            Node::Dir { .. } => {
                                builder.append_data(&mut header, format!("{}/", rel), std::io::empty())?
                            }
                        }
                    }
                }
            }
            Ok(builder.into_inner()?)
        })
    }

    async fn put_archive(&self, container: &str, target_dir: &str, archive: Vec<u8>) -> Result<()> {
        self.with_container(container, |c| {
            let target = normalize(target_dir);
            match c.nodes.get(&target) {
                Some(Node::Dir { .. }) => {}
                Some(Node::File { .. }) => {
                    return Err(Error::Path(format!("extraction point is not a directory: {}", target)))
                }
                None => {
                    return Err(Error::Path(format!(
                        "Could not find the file {} in container {}",
                        target, container
                    )))
                }
            }
            if is_read_only(c, &target) {
                return Err(Error::PermissionDenied(format!(
                    "container rootfs is marked read-only: {}",
                    target
                )));
            }

            let mut reader = tar::Archive::new(Cursor::new(archive));
            let entries = reader
                .entries()
                .map_err(|e| Error::ArchiveFormat(e.to_string()))?;
            for entry in entries {
                let mut entry = entry.map_err(|e| Error::ArchiveFormat(e.to_string()))?;
                let rel = entry.path()?.to_string_lossy().into_owned();
                let full = join_path(&target, rel.trim_end_matches('/'));
                let mtime = entry.header().mtime().unwrap_or(0) as i64;
                if entry.header().entry_type().is_dir() {
                    ensure_dirs(&mut c.nodes, &full);
                } else {
                    let mut data = Vec::new();
                    entry.read_to_end(&mut data)?;
                    ensure_dirs(&mut c.nodes, &parent_path(&full));
                    c.nodes.insert(normalize(&full), Node::File { data, mtime });
                }
            }
            Ok(())
        })
    }

    async fn exec_remove(
        &self,
        container: &str,
        path: &str,
        recursive: bool,
    ) -> Result<CommandOutput> {
        let stalled = *self.stall_removals.lock();
        if stalled {
            futures::future::pending::<()>().await;
        }
        self.with_container(container, |c| {
            let target = normalize(path);
            let failed = |stderr: String| CommandOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr,
            };

            let is_dir = match c.nodes.get(&target) {
                // rm -f on a missing path is not an error
                None => return Ok(CommandOutput::default()),
                Some(Node::Dir { .. }) => true,
                Some(Node::File { .. }) => false,
            };

            if is_read_only(c, &target) {
                return Ok(failed(format!("rm: can't remove '{}': Permission denied\n", path)));
            }
            if is_dir && !recursive {
                return Ok(failed(format!("rm: '{}' is a directory\n", path)));
            }
            if target == "/" {
                return Ok(failed("rm: refusing to remove '/'\n".to_string()));
            }

            let prefix = format!("{}/", target);
            c.nodes.retain(|p, _| p != &target && !p.starts_with(&prefix));
            Ok(CommandOutput::default())
        })
    }
}
