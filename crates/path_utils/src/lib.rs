use anyhow::{Context, Result};
use path_slash::PathExt;
use relative_path::RelativePathBuf;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub fn as_relative_slash_path<P: AsRef<Path>>(p: P) -> Result<RelativePathBuf> {
    let pref = p.as_ref();
    let relative_fence_path: RelativePathBuf =
        RelativePathBuf::from_path(pref).with_context(|| {
            let pref_str = pref.to_string_lossy();
            format!("failed to convert path to relative-path: \"{pref_str}\"")
        })?;
    let slashed_pbuf = PathBuf::from(relative_fence_path.as_str())
        .to_slash()
        .map(|s| s.to_string())
        .with_context(|| {
            let rel_fence_str = relative_fence_path.as_str();
            format!("failed to convert relative-path to a slashed path: \"{rel_fence_str}\"")
        })?;
    Ok(RelativePathBuf::from(slashed_pbuf))
}

/// Metadata returned by [`Filesystem::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub is_dir: bool,
    pub size: u64,
}

/// Directory entry returned by [`Filesystem::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Filesystem abstraction consumed by the resolver and tracer, so both
/// can be driven against an in-memory tree in tests instead of a real
/// checkout.
pub trait Filesystem: Send + Sync {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    fn stat(&self, path: &Path) -> Result<FileStat>;
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
    }
}

/// Talks to the real, on-disk filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))
    }

    fn stat(&self, path: &Path) -> Result<FileStat> {
        let meta =
            std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        Ok(FileStat {
            is_dir: meta.is_dir(),
            size: meta.len(),
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path).with_context(|| format!("reading dir {}", path.display()))? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// An in-memory filesystem for tests: a flat map of absolute path → bytes,
/// with directories implied by path prefixes.
#[derive(Debug, Clone, Default)]
pub struct MemFilesystem {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }
}

impl Filesystem for MemFilesystem {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such file: {}", path.display()))
    }

    fn stat(&self, path: &Path) -> Result<FileStat> {
        if let Some(bytes) = self.files.get(path) {
            return Ok(FileStat {
                is_dir: false,
                size: bytes.len() as u64,
            });
        }
        if self.exists(path) {
            return Ok(FileStat { is_dir: true, size: 0 });
        }
        Err(anyhow::anyhow!("no such path: {}", path.display()))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut names = std::collections::BTreeSet::new();
        for file_path in self.files.keys() {
            if let Ok(rest) = file_path.strip_prefix(path) {
                if let Some(first) = rest.components().next() {
                    let name = first.as_os_str().to_string_lossy().to_string();
                    let is_dir = rest.components().count() > 1;
                    names.insert((name, is_dir));
                }
            }
        }
        Ok(names
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.files.keys().any(|p| p.starts_with(path))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mem_filesystem_reads_back_written_file() {
        let fs = MemFilesystem::new().with_file("/pkg/index.js", "export default 1;");
        assert_eq!(
            fs.read_to_string(Path::new("/pkg/index.js")).unwrap(),
            "export default 1;"
        );
        assert!(fs.exists(Path::new("/pkg")));
        assert!(!fs.exists(Path::new("/other")));
    }

    #[test]
    fn mem_filesystem_lists_directory_entries() {
        let fs = MemFilesystem::new()
            .with_file("/pkg/src/index.js", "")
            .with_file("/pkg/package.json", "{}");
        let mut entries = fs.read_dir(Path::new("/pkg")).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            entries,
            vec![
                DirEntry {
                    name: "package.json".to_string(),
                    is_dir: false
                },
                DirEntry {
                    name: "src".to_string(),
                    is_dir: true,
                },
            ]
        );
    }
}
