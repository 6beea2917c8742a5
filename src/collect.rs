//! Directory walking for `pack`.
//!
//! Paths come back relative to the root, `/`-separated, in whatever order
//! the directory enumeration yields them.  No sorting is applied.

use std::fs;
use std::path::Path;

use crate::error::{with_path, Result};

/// Relative paths of the regular files under `root`.  Subdirectories are
/// descended into only when `recursive` is set.
pub fn list_files(root: &Path, recursive: bool) -> Result<Vec<String>> {
    let mut out = Vec::new();
    walk(root, "", recursive, &mut out)?;
    Ok(out)
}

fn walk(dir: &Path, prefix: &str, recursive: bool, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(with_path(dir))? {
        let entry = entry.map_err(with_path(dir))?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        let rel = if prefix.is_empty() { name.into_owned() } else { format!("{prefix}/{name}") };

        let file_type = entry.file_type().map_err(with_path(entry.path()))?;
        if file_type.is_dir() {
            if recursive {
                log::debug!("descending into {rel}");
                walk(&entry.path(), &rel, recursive, out)?;
            }
        } else if file_type.is_file() {
            out.push(rel);
        } else if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => out.push(rel),
                _ => log::warn!("skipping {rel}: not a regular file"),
            }
        }
    }
    Ok(())
}

/// Read every file [`list_files`] finds, paired with its relative path.
pub fn collect(root: &Path, recursive: bool) -> Result<Vec<(String, Vec<u8>)>> {
    list_files(root, recursive)?
        .into_iter()
        .map(|rel| -> Result<(String, Vec<u8>)> {
            let path = root.join(&rel);
            let data = fs::read(&path).map_err(with_path(&path))?;
            Ok((rel, data))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("top.txt"), b"top").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/inner.bin"), [1u8, 2]).unwrap();

        let flat = list_files(dir.path(), false).unwrap();
        assert_eq!(flat, vec!["top.txt".to_string()]);

        let mut deep = collect(dir.path(), true).unwrap();
        deep.sort();
        assert_eq!(deep, vec![
            ("sub/inner.bin".to_string(), vec![1u8, 2]),
            ("top.txt".to_string(), b"top".to_vec()),
        ]);
    }

    #[test]
    fn missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(&dir.path().join("nope"), true).is_err());
    }
}
