//! Materialize entry bytes from a parsed image.
//!
//! The reader already refuses tables that point past the image end.  Reads
//! here are checked again against the slice actually handed in, since an
//! [`Archive`] may be paired with a different buffer than it was parsed
//! from.  Whole-image extraction checks every entry before the first file
//! is created, so a corrupt image never leaves a partial output set behind.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::entry::EntryRecord;
use crate::error::{with_path, PfsError, Result};
use crate::reader::Archive;

pub struct EntryExtractor<'a> {
    archive: &'a Archive,
    image:   &'a [u8],
}

impl<'a> EntryExtractor<'a> {
    /// `image` must be the buffer `archive` was parsed from.
    pub fn new(archive: &'a Archive, image: &'a [u8]) -> Self {
        Self { archive, image }
    }

    /// Borrow an entry's bytes from the image.
    pub fn entry_bytes(&self, entry: &EntryRecord) -> Result<&'a [u8]> {
        let (start, end) = self.archive.data_range(entry);
        let available = self.image.len() as u64;
        if end > available {
            return Err(PfsError::PartitionOutOfBounds {
                name: entry.name.clone(),
                start,
                end,
                available,
            });
        }
        Ok(&self.image[start as usize..end as usize])
    }

    /// Bounds-check every entry without writing anything.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.archive.entries {
            self.entry_bytes(entry)?;
        }
        Ok(())
    }

    /// Write one entry to `path`, creating parent directories as needed.
    pub fn extract_to(&self, entry: &EntryRecord, path: &Path) -> Result<()> {
        let data = self.entry_bytes(entry)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(with_path(parent))?;
            }
        }
        log::debug!("extracting {} ({} bytes) -> {}", entry.name, entry.size, path.display());
        fs::write(path, data).map_err(with_path(path))?;
        Ok(())
    }

    /// Write one entry below `dest` at the path its name gives.
    pub fn extract_into(&self, entry: &EntryRecord, dest: &Path) -> Result<PathBuf> {
        let path = dest.join(safe_relative_path(&entry.name)?);
        self.extract_to(entry, &path)?;
        Ok(path)
    }

    /// Extract every entry under `dest`, named by its entry name.
    /// Returns the paths written, in table order.
    pub fn extract_all(&self, dest: &Path) -> Result<Vec<PathBuf>> {
        self.validate()?;
        let targets = self.archive.entries
            .iter()
            .map(|e| safe_relative_path(&e.name).map(|rel| (e, dest.join(rel))))
            .collect::<Result<Vec<_>>>()?;

        fs::create_dir_all(dest).map_err(with_path(dest))?;
        let mut written = Vec::with_capacity(targets.len());
        for (entry, path) in targets {
            self.extract_to(entry, &path)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Turn an entry name into a path that stays below the extraction root.
pub fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir       => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PfsError::UnsafeEntryName(name.to_owned()));
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(PfsError::UnsafeEntryName(name.to_owned()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ArchiveBuilder;

    fn image() -> Vec<u8> {
        let mut b = ArchiveBuilder::new();
        b.add_file("a.txt", b"Hello".to_vec()).unwrap();
        b.add_file("empty", Vec::new()).unwrap();
        b.add_file("sub/b.bin", vec![1, 2, 3]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn slices_entries() {
        let img = image();
        let ar = Archive::parse(&img).unwrap();
        let ex = EntryExtractor::new(&ar, &img);
        assert_eq!(ex.entry_bytes(&ar.entries[0]).unwrap(), b"Hello");
        assert_eq!(ex.entry_bytes(&ar.entries[1]).unwrap(), b"");
        assert_eq!(ex.entry_bytes(&ar.entries[2]).unwrap(), &[1u8, 2, 3]);
    }

    #[test]
    fn truncated_data_is_out_of_bounds() {
        let img = image();
        let ar = Archive::parse(&img).unwrap();
        let cut = &img[..img.len() - 1];
        assert!(matches!(Archive::parse(cut), Err(PfsError::PartitionOutOfBounds { .. })));

        // A parsed table paired with a shorter buffer is still caught.
        let ex = EntryExtractor::new(&ar, cut);
        assert!(ex.entry_bytes(&ar.entries[0]).is_ok());
        match ex.validate().unwrap_err() {
            PfsError::PartitionOutOfBounds { name, end, available, .. } => {
                assert_eq!(name, "sub/b.bin");
                assert_eq!(end, available + 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extract_into_stays_below_dest() {
        let img = image();
        let ar = Archive::parse(&img).unwrap();
        let ex = EntryExtractor::new(&ar, &img);
        let dest = tempfile::tempdir().unwrap();

        let path = ex.extract_into(&ar.entries[2], dest.path()).unwrap();
        assert_eq!(path, dest.path().join("sub").join("b.bin"));
        assert_eq!(fs::read(&path).unwrap(), &[1u8, 2, 3]);

        let evil = EntryRecord { name: "../evil".into(), ..ar.entries[0].clone() };
        assert!(matches!(ex.extract_into(&evil, dest.path()), Err(PfsError::UnsafeEntryName(_))));
    }

    #[test]
    fn unsafe_names() {
        assert_eq!(safe_relative_path("./dir/x").unwrap(), PathBuf::from("dir/x"));
        for bad in ["../etc/passwd", "/etc/passwd", "a/../../b", "", "."] {
            assert!(matches!(safe_relative_path(bad), Err(PfsError::UnsafeEntryName(_))), "{bad}");
        }
    }
}
