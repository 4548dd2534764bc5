//! Core types shared by the navigator, the web API and the CLI

use serde::{Deserialize, Serialize};

/// Whether a filesystem entry is a directory or something else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_directory(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// One line of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
    /// Mode column as printed by the remote, e.g. `drwxr-xr-x`
    pub permission_string: String,
    /// Size column verbatim (bytes, no unit)
    pub size_bytes_display: String,
    /// Date columns joined with single spaces, e.g. `Jan 1 00:00`
    pub modified_display: String,
    /// Target of a symbolic link, when the listing shows one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
}

impl DirectoryEntry {
    pub fn kind(&self) -> EntryKind {
        if self.is_directory {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }
}

/// A listing partitioned for display, directories first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: String,
    pub directories: Vec<DirectoryEntry>,
    pub files: Vec<DirectoryEntry>,
}

impl DirectoryListing {
    /// Split entries while keeping the remote order within each group
    pub fn from_entries(path: impl Into<String>, entries: Vec<DirectoryEntry>) -> Self {
        let (directories, files) = entries.into_iter().partition(|e| e.is_directory);
        Self {
            path: path.into(),
            directories,
            files,
        }
    }

    pub fn len(&self) -> usize {
        self.directories.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, directories first
    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.directories.iter().chain(self.files.iter())
    }

    pub fn find(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries().find(|e| e.name == name)
    }
}

/// Container as shown in the picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub short_id: String,
    pub name: String,
    pub image: String,
    /// Machine state: running, exited, paused, ...
    pub state: String,
    /// Human status line, e.g. "Up 3 hours"
    pub status: String,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// Label used by pickers: `name (short_id)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.short_id)
    }
}

/// Result of a command executed inside a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A file fetched from a container and waiting to be handed to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A directory archive ready to be saved as `filename`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderArchive {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Shorten a container ID the way `docker ps` does
pub fn short_id(id: &str) -> String {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.chars().take(12).collect()
}

/// Format bytes into a human-readable string (e.g. "1.50 KB")
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, dir: bool) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            is_directory: dir,
            permission_string: if dir { "drwxr-xr-x" } else { "-rw-r--r--" }.to_string(),
            size_bytes_display: "0".to_string(),
            modified_display: "Jan 1 00:00".to_string(),
            link_target: None,
        }
    }

    #[test]
    fn test_partition_keeps_remote_order() {
        let listing = DirectoryListing::from_entries(
            "/srv",
            vec![entry("b.txt", false), entry("z", true), entry("a.txt", false), entry("a", true)],
        );
        let dirs: Vec<_> = listing.directories.iter().map(|e| e.name.as_str()).collect();
        let files: Vec<_> = listing.files.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(dirs, vec!["z", "a"]);
        assert_eq!(files, vec!["b.txt", "a.txt"]);
        assert_eq!(listing.len(), 4);
        assert!(listing.find("a.txt").is_some());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef0123"), "0123456789ab");
        assert_eq!(short_id("sha256:0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }
}
