//! Path navigation inside a container filesystem
//!
//! Container paths always use `/` regardless of the host OS, so everything
//! here works on plain strings with POSIX semantics rather than `std::path`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::runtime::ContainerRuntime;
use crate::types::{DirectoryEntry, DirectoryListing};

/// Navigation request coming from the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NavAction {
    /// Jump to `/`
    Root,
    /// Go to the parent directory
    Up,
    /// Jump to `/tmp`
    Tmp,
    /// Jump to `/home`
    Home,
    /// Use an explicit path as typed
    Goto { path: String },
    /// Descend into an entry of the current directory
    Enter { name: String },
}

/// Resolve a navigation action against the current path.
///
/// No existence check happens here; the listing call validates the result.
pub fn resolve(action: &NavAction, current_path: &str) -> String {
    match action {
        NavAction::Root => "/".to_string(),
        NavAction::Up => parent_path(current_path),
        NavAction::Tmp => "/tmp".to_string(),
        NavAction::Home => "/home".to_string(),
        NavAction::Goto { path } => {
            if path.is_empty() {
                "/".to_string()
            } else if is_absolute(path) {
                path.clone()
            } else {
                join_path(normalize_current(current_path), path)
            }
        }
        NavAction::Enter { name } => join_path(normalize_current(current_path), name),
    }
}

pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Join a base directory and a component.
///
/// An absolute component replaces the base, as with POSIX path joining.
pub fn join_path(base: &str, component: &str) -> String {
    if is_absolute(component) || base.is_empty() {
        return component.to_string();
    }
    if base.ends_with('/') {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// Parent of `path`; `/` and the empty path map to `/`.
pub fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        Some(idx) => {
            let head = trimmed[..idx].trim_end_matches('/');
            if head.is_empty() {
                "/".to_string()
            } else {
                head.to_string()
            }
        }
        None => "/".to_string(),
    }
}

/// Last component of `path`, or `None` for `/`
pub fn base_name(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let name = match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn normalize_current(current_path: &str) -> &str {
    let trimmed = current_path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Check an entry or file name before it is joined onto a directory.
pub fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidRequest("name must not be empty".into()));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidRequest(format!("'{}' is not a valid entry name", name)));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(Error::InvalidRequest(format!(
            "entry name must not contain path separators: {}",
            name
        )));
    }
    Ok(())
}

// ============================================================================
// Listing
// ============================================================================

/// Fields before the name in an `ls -la` line
const LEADING_FIELDS: usize = 8;

/// Parse `ls -la` output into entries.
///
/// The first eight whitespace-separated columns are positional, the rest of
/// the line is the name so names containing spaces survive. The `total`
/// header and the `.`/`..` entries are dropped.
pub fn parse_listing(output: &str) -> Vec<DirectoryEntry> {
    let mut lines = output.lines().peekable();
    if lines
        .peek()
        .map(|l| l.trim_start().starts_with("total"))
        .unwrap_or(false)
    {
        lines.next();
    }

    lines.filter_map(parse_listing_line).collect()
}

fn parse_listing_line(line: &str) -> Option<DirectoryEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Vec::with_capacity(LEADING_FIELDS);
    let mut rest = line.trim_start();

    while fields.len() < LEADING_FIELDS {
        let end = rest.find(char::is_whitespace)?;
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    if rest.is_empty() {
        return None;
    }

    let permissions = fields[0];
    let (name, link_target) = if permissions.starts_with('l') {
        match rest.split_once(" -> ") {
            Some((name, target)) => (name.to_string(), Some(target.to_string())),
            None => (rest.to_string(), None),
        }
    } else {
        (rest.to_string(), None)
    };

    if name == "." || name == ".." {
        return None;
    }

    Some(DirectoryEntry {
        name,
        is_directory: permissions.starts_with('d'),
        permission_string: permissions.to_string(),
        size_bytes_display: fields[4].to_string(),
        modified_display: format!("{} {} {}", fields[5], fields[6], fields[7]),
        link_target,
    })
}

/// List `path` inside `container`.
///
/// A nonzero exit becomes an error carrying the remote stderr.
pub async fn list(
    runtime: &dyn ContainerRuntime,
    container: &str,
    path: &str,
) -> Result<DirectoryListing> {
    debug!(container = %container, path = %path, "listing directory");

    let output = runtime.list_directory(container, path).await?;
    if !output.success() {
        warn!(
            container = %container,
            path = %path,
            exit_code = output.exit_code,
            "directory listing failed"
        );
        return Err(Error::from_remote_stderr(&output.stderr));
    }

    Ok(DirectoryListing::from_entries(path, parse_listing(&output.stdout)))
}
