//! Archive transfer between the user and a container
//!
//! The runtime only moves files as tar streams. Uploads wrap a single file in
//! a one-entry archive; file downloads unwrap the first entry; folder
//! downloads pass the archive through untouched.

use std::io::{Cursor, Read};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::navigator::{base_name, validate_entry_name};
use crate::runtime::ContainerRuntime;
use crate::types::FolderArchive;

/// Mode given to uploaded files
const UPLOAD_MODE: u32 = 0o644;

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Build an in-memory tar holding exactly one regular file.
pub fn pack_single_file(filename: &str, bytes: &[u8], mtime: u64) -> Result<Vec<u8>> {
    validate_entry_name(filename)?;

    let mut header = tar::Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(UPLOAD_MODE);
    header.set_mtime(mtime);
    header.set_entry_type(tar::EntryType::Regular);

    let mut builder = tar::Builder::new(Vec::new());
    builder.append_data(&mut header, filename, bytes)?;
    Ok(builder.into_inner()?)
}

/// Read the first entry of a tar archive, returning its name and contents.
pub fn unpack_first_entry(archive: &[u8]) -> Result<(String, Vec<u8>)> {
    let mut archive = tar::Archive::new(Cursor::new(archive));
    let mut entries = archive
        .entries()
        .map_err(|e| Error::ArchiveFormat(e.to_string()))?;

    let mut entry = match entries.next() {
        Some(entry) => entry.map_err(|e| Error::ArchiveFormat(e.to_string()))?,
        None => return Err(Error::ArchiveFormat("archive contains no entries".into())),
    };

    let entry_type = entry.header().entry_type();
    if !entry_type.is_file() {
        return Err(Error::ArchiveFormat(format!(
            "first archive entry is not a regular file ({:?})",
            entry_type
        )));
    }

    let name = entry
        .path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut data = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut data)
        .map_err(|e| Error::ArchiveFormat(format!("truncated archive entry: {}", e)))?;

    Ok((name, data))
}

/// Name a folder download is saved under: `<basename>.tar`, or `root.tar` for `/`
pub fn folder_archive_name(dir_path: &str) -> String {
    format!("{}.tar", base_name(dir_path).unwrap_or("root"))
}

/// Upload `bytes` as `target_dir/filename`.
pub async fn upload(
    runtime: &dyn ContainerRuntime,
    container: &str,
    target_dir: &str,
    filename: &str,
    bytes: &[u8],
) -> Result<()> {
    let archive = pack_single_file(filename, bytes, now_epoch())?;
    runtime.put_archive(container, target_dir, archive).await?;

    info!(
        container = %container,
        target_dir = %target_dir,
        filename = %filename,
        bytes = bytes.len(),
        "uploaded file"
    );
    Ok(())
}

/// Fetch the raw bytes of the file at `full_path`.
pub async fn download_file(
    runtime: &dyn ContainerRuntime,
    container: &str,
    full_path: &str,
) -> Result<Vec<u8>> {
    let archive = runtime.get_archive(container, full_path).await?;
    let (entry_name, data) = unpack_first_entry(&archive)?;

    debug!(
        container = %container,
        path = %full_path,
        entry = %entry_name,
        bytes = data.len(),
        "downloaded file"
    );
    Ok(data)
}

/// Fetch `dir_path` as a tar archive, unmodified.
pub async fn download_folder(
    runtime: &dyn ContainerRuntime,
    container: &str,
    dir_path: &str,
) -> Result<FolderArchive> {
    let bytes = runtime.get_archive(container, dir_path).await?;

    debug!(
        container = %container,
        path = %dir_path,
        bytes = bytes.len(),
        "downloaded folder archive"
    );
    Ok(FolderArchive {
        filename: folder_archive_name(dir_path),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file_archive_has_one_entry() {
        let archive = pack_single_file("hello.txt", b"hello world", 1_700_000_000).unwrap();

        let mut reader = tar::Archive::new(Cursor::new(&archive));
        let entries: Vec<_> = reader.entries().unwrap().map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 1);

        let header = entries[0].header();
        assert_eq!(header.size().unwrap(), 11);
        assert_eq!(header.mtime().unwrap(), 1_700_000_000);
        assert_eq!(header.mode().unwrap(), 0o644);
        assert_eq!(entries[0].path().unwrap().to_str(), Some("hello.txt"));
    }

    #[test]
    fn test_unpack_returns_first_entry_bytes() {
        let archive = pack_single_file("data.bin", &[0, 1, 2, 255], 0).unwrap();
        let (name, data) = unpack_first_entry(&archive).unwrap();
        assert_eq!(name, "data.bin");
        assert_eq!(data, vec![0, 1, 2, 255]);
    }

    #[test]
    fn test_empty_file_roundtrip() {
        let archive = pack_single_file("empty.txt", b"", 0).unwrap();
        let (_, data) = unpack_first_entry(&archive).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_unpack_empty_archive_is_format_error() {
        let builder = tar::Builder::new(Vec::new());
        let archive = builder.into_inner().unwrap();
        let err = unpack_first_entry(&archive).unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat(_)));

        assert!(matches!(unpack_first_entry(&[]), Err(Error::ArchiveFormat(_))));
    }

    #[test]
    fn test_unpack_directory_first_is_format_error() {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        let mut builder = tar::Builder::new(Vec::new());
        builder.append_data(&mut header, "logs/", std::io::empty()).unwrap();
        let archive = builder.into_inner().unwrap();

        assert!(matches!(unpack_first_entry(&archive), Err(Error::ArchiveFormat(_))));
    }

    #[test]
    fn test_pack_rejects_bad_names() {
        assert!(matches!(pack_single_file("", b"x", 0), Err(Error::InvalidRequest(_))));
        assert!(matches!(pack_single_file("../x", b"x", 0), Err(Error::InvalidRequest(_))));
        assert!(matches!(pack_single_file("..", b"x", 0), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_folder_archive_name() {
        assert_eq!(folder_archive_name("/data/logs"), "logs.tar");
        assert_eq!(folder_archive_name("/data/logs/"), "logs.tar");
        assert_eq!(folder_archive_name("/"), "root.tar");
    }
}
