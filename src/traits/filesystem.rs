use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::io::Cursor;
#[cfg(test)]
use std::path::PathBuf;
#[cfg(test)]
use std::sync::{Arc, RwLock};

/// Trait for filesystem operations to enable testing with mocks
pub trait FileSystem: Send + Sync {
    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Open a file for buffered, line-by-line reading
    fn open_read(&self, path: &Path) -> Result<Box<dyn BufRead + Send>>;

    /// Write string contents to file, replacing anything already there
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Append string contents to file, creating it if absent.
    /// The handle is opened and closed within the call.
    fn append(&self, path: &Path, contents: &str) -> Result<()>;

    /// Create an empty file if nothing exists at `path`
    fn touch(&self, path: &Path) -> Result<()>;

    /// Remove a file
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Check if path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;
}

/// Real filesystem implementation using std::fs
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn BufRead + Send>> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open file: {:?}", path))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directory: {:?}", parent))?;
        }

        std::fs::write(path, contents).with_context(|| format!("Failed to write file: {:?}", path))
    }

    fn append(&self, path: &Path, contents: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open file for append: {:?}", path))?;

        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to append to file: {:?}", path))?;
        file.flush()
            .with_context(|| format!("Failed to flush file: {:?}", path))
    }

    fn touch(&self, path: &Path) -> Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).with_context(|| format!("Failed to remove file: {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Mock filesystem implementation for testing (in-memory)
#[cfg(test)]
pub struct MockFileSystem {
    files: Arc<RwLock<HashMap<PathBuf, String>>>,
    directories: Arc<RwLock<HashMap<PathBuf, ()>>>,
    /// Paths whose reads and writes fail, to simulate permission errors
    unreadable: Arc<RwLock<Vec<PathBuf>>>,
}

#[cfg(test)]
impl MockFileSystem {
    /// Create new empty mock filesystem
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            directories: Arc::new(RwLock::new(HashMap::new())),
            unreadable: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed a file
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files
            .write()
            .unwrap()
            .insert(path.into(), contents.into());
        self
    }

    /// Seed a directory
    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.directories.write().unwrap().insert(path.into(), ());
        self
    }

    /// Make every operation on `path` fail
    pub fn deny(&self, path: impl Into<PathBuf>) {
        self.unreadable.write().unwrap().push(path.into());
    }

    /// Get captured file contents for testing assertions
    pub fn get_file_contents(&self, path: &Path) -> Option<String> {
        self.files.read().unwrap().get(path).cloned()
    }

    /// Check if file was written
    pub fn has_file(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    /// List all files in mock filesystem
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.files.read().unwrap().keys().cloned().collect()
    }

    fn check_access(&self, path: &Path) -> Result<()> {
        if self.unreadable.read().unwrap().iter().any(|p| p == path) {
            anyhow::bail!("Permission denied in mock filesystem: {:?}", path);
        }
        Ok(())
    }
}

#[cfg(test)]
impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.check_access(path)?;
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .with_context(|| format!("File not found in mock filesystem: {:?}", path))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn BufRead + Send>> {
        let contents = self.read_to_string(path)?;
        Ok(Box::new(Cursor::new(contents.into_bytes())))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.check_access(path)?;
        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn append(&self, path: &Path, contents: &str) -> Result<()> {
        self.check_access(path)?;
        self.files
            .write()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default()
            .push_str(contents);
        Ok(())
    }

    fn touch(&self, path: &Path) -> Result<()> {
        self.check_access(path)?;
        self.files
            .write()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default();
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.check_access(path)?;
        self.files
            .write()
            .unwrap()
            .remove(path)
            .with_context(|| format!("File not found in mock filesystem: {:?}", path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
            || self.directories.read().unwrap().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.directories.read().unwrap().contains_key(path)
    }
}
