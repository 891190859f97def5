use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// Filesystem access rooted at the output directory.
#[derive(Clone, Debug)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    pub fn new(base_dir: &Path) -> Result<Self, FetchError> {
        let base_dir = base_dir.to_path_buf();
        fs::create_dir_all(&base_dir)
            .map_err(|e| FetchError::file_io("create directory", &base_dir, e))?;

        Ok(Self { base_dir })
    }

    /// Absolute location of a path relative to the output directory.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        let mut path = self.base_dir.clone();
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    pub fn file_exists(&self, relative: &str) -> bool {
        self.resolve(relative).is_file()
    }

    /// Create a directory (and its parents) under the output directory.
    /// Succeeds when it already exists.
    pub fn ensure_dir(&self, relative: &str) -> Result<PathBuf, FetchError> {
        let path = self.resolve(relative);
        fs::create_dir_all(&path).map_err(|e| FetchError::file_io("create directory", &path, e))?;
        Ok(path)
    }

    pub fn read_to_string(&self, relative: &str) -> Result<String, FetchError> {
        let path = self.resolve(relative);
        let bytes = fs::read(&path).map_err(|e| FetchError::file_io("read", &path, e))?;
        // Pages are not guaranteed to be UTF-8; scanning only needs ASCII patterns
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    /// Append to the end of an existing file without touching its content.
    pub fn append(&self, relative: &str, content: &str) -> Result<(), FetchError> {
        let path = self.resolve(relative);
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| FetchError::file_io("open", &path, e))?;

        file.write_all(content.as_bytes())
            .map_err(|e| FetchError::file_io("append to", &path, e))?;

        Ok(())
    }

    /// Move `from` over `to`, replacing it.
    pub fn rename(&self, from: &str, to: &str) -> Result<PathBuf, FetchError> {
        let source = self.resolve(from);
        let target = self.resolve(to);
        fs::rename(&source, &target).map_err(|e| FetchError::file_io("replace", &target, e))?;
        Ok(target)
    }

    /// Delete a file. Missing files are not an error.
    pub fn remove(&self, relative: &str) -> Result<(), FetchError> {
        let path = self.resolve(relative);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FetchError::file_io("remove", &path, e)),
        }
    }

    /// Replace the whole content of a file, creating it if needed.
    pub fn overwrite(&self, relative: &str, content: &str) -> Result<PathBuf, FetchError> {
        let path = self.resolve(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| FetchError::file_io("create directory", parent, e))?;
        }

        let mut file =
            fs::File::create(&path).map_err(|e| FetchError::file_io("create", &path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| FetchError::file_io("write", &path, e))?;

        Ok(path)
    }
}
