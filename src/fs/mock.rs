// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File {
        content: Vec<u8>,
        executable: bool,
        modified: SystemTime,
    },
    Dir {
        children: Vec<String>,
        modified: SystemTime,
    },
    /// Points at an absolute target; followed by every lookup.
    Symlink(PathBuf),
}

/// In-memory filesystem for tests.
///
/// Paths are expected to be absolute. Parent directories are created
/// implicitly. Modification times default to the UNIX epoch and can be set
/// per entry with [`MockFileSystem::set_modified_secs`].
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(
            PathBuf::from("/"),
            MockEntry::Dir {
                children: Vec::new(),
                modified: SystemTime::UNIX_EPOCH,
            },
        );

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.insert_file(path.as_ref(), content.into(), false);
    }

    pub fn add_executable(&self, path: impl AsRef<Path>) {
        self.insert_file(path.as_ref(), b"\x7fELF".to_vec(), true);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.lock();
        ensure_dir_entry(&mut files, path.as_ref());
    }

    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        let link = link.as_ref();
        let mut files = self.lock();
        if let Some(parent) = link.parent() {
            ensure_dir_entry(&mut files, parent);
            add_child(&mut files, parent, link);
        }
        files.insert(link.to_path_buf(), MockEntry::Symlink(target.as_ref().to_path_buf()));
    }

    /// Set the mtime of an existing entry to `secs` after the epoch.
    pub fn set_modified_secs(&self, path: impl AsRef<Path>, secs: u64) {
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
        let mut files = self.lock();
        match files.get_mut(path.as_ref()) {
            Some(MockEntry::File { modified, .. }) | Some(MockEntry::Dir { modified, .. }) => {
                *modified = stamp;
            }
            _ => {}
        }
    }

    fn insert_file(&self, path: &Path, content: Vec<u8>, executable: bool) {
        let mut files = self.lock();
        if let Some(parent) = path.parent() {
            ensure_dir_entry(&mut files, parent);
            add_child(&mut files, parent, path);
        }
        files.insert(
            path.to_path_buf(),
            MockEntry::File {
                content,
                executable,
                modified: SystemTime::UNIX_EPOCH,
            },
        );
    }

    fn resolved(&self, path: &Path) -> Option<(PathBuf, MockEntry)> {
        let files = self.lock();
        let real = resolve_links(&files, path);
        files.get(&real).cloned().map(|entry| (real, entry))
    }
}

fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if files.contains_key(path) {
        return;
    }
    files.insert(
        path.to_path_buf(),
        MockEntry::Dir {
            children: Vec::new(),
            modified: SystemTime::UNIX_EPOCH,
        },
    );
    if let Some(parent) = path.parent() {
        ensure_dir_entry(files, parent);
        add_child(files, parent, path);
    }
}

fn add_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir { children, .. }) = files.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

/// Rewrite every symlinked prefix of `path` to its target.
fn resolve_links(files: &HashMap<PathBuf, MockEntry>, path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
        // Bounded: a target never points back at one of its own prefixes in tests.
        for _ in 0..8 {
            match files.get(&out) {
                Some(MockEntry::Symlink(target)) => out = target.clone(),
                _ => break,
            }
        }
    }
    out
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        match self.resolved(path) {
            Some((_, MockEntry::File { content, .. })) => Ok(Box::new(Cursor::new(content))),
            Some(_) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolved(path).is_some()
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.resolved(path), Some((_, MockEntry::File { .. })))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.resolved(path), Some((_, MockEntry::Dir { .. })))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.resolved(path)
            .map(|(real, _)| real)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        match self.resolved(path) {
            Some((_, MockEntry::File { modified, .. })) | Some((_, MockEntry::Dir { modified, .. })) => {
                Ok(modified)
            }
            _ => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_executable(&self, path: &Path) -> bool {
        matches!(
            self.resolved(path),
            Some((_, MockEntry::File { executable: true, .. }))
        )
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.resolved(path) {
            Some((_, MockEntry::Dir { children, .. })) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symlinked_directories_canonicalize_to_target() {
        let fs = MockFileSystem::new();
        fs.add_file("/real/pkg/__init__.py", "");
        fs.add_symlink("/link", "/real");

        assert!(fs.is_file(Path::new("/link/pkg/__init__.py")));
        assert_eq!(
            fs.canonicalize(Path::new("/link/pkg")).unwrap(),
            PathBuf::from("/real/pkg")
        );
    }

    #[test]
    fn parent_dirs_are_created_and_listed() {
        let fs = MockFileSystem::new();
        fs.add_executable("/proj/build/release/rethinkdb");

        assert!(fs.is_dir(Path::new("/proj/build")));
        assert_eq!(
            fs.read_dir(Path::new("/proj/build")).unwrap(),
            vec![PathBuf::from("/proj/build/release")]
        );
        assert!(fs.is_executable(Path::new("/proj/build/release/rethinkdb")));
    }
}
