//! Access to raw markdown source.
//!
//! The decorator and the callout observer only ever see rendered output;
//! fence lines are recovered from the source text they get through a
//! [`SourceProvider`].

use relative_path::{RelativePath, RelativePathBuf};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid notes directory: {0}")]
    InvalidNotesDir(String),
}

/// Where raw document text comes from.
pub trait SourceProvider {
    /// Text of the document open for editing, if any. Preferred over disk
    /// since it includes unsaved changes.
    fn active_buffer_text(&self) -> Option<String>;

    fn read_file(&self, path: &RelativePath) -> Result<String, IoError>;

    /// Buffer text if editing, else the file at `path`. Read failures are
    /// logged and treated as no source.
    fn source_text(&self, path: Option<&RelativePath>) -> Option<String> {
        if let Some(text) = self.active_buffer_text() {
            return Some(text);
        }
        let path = path?;
        match self.read_file(path) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Failed to read source for {path}: {e}");
                None
            }
        }
    }
}

/// Read a markdown file and return its content
pub fn read_file(relative_path: &RelativePath, notes_root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(notes_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Scan for markdown files in the notes directory
pub fn scan_markdown_files(notes_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !notes_root.exists() {
        return Err(IoError::InvalidNotesDir(
            "notes directory not found".to_string(),
        ));
    }

    let mut files = Vec::new();
    scan_directory_recursive(notes_root, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && ext == "md"
        {
            files.push(path);
        }
    }

    Ok(())
}

pub fn validate_notes_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidNotesDir(
            "Directory does not exist".to_string(),
        ));
    }

    Ok(())
}

/// [`SourceProvider`] over a notes directory on disk.
///
/// File reads are cached per path until [`FsSource::invalidate`] is called.
/// An editing buffer, when set, shadows every file read.
#[derive(Debug)]
pub struct FsSource {
    notes_root: PathBuf,
    buffer: Option<String>,
    cache: RefCell<HashMap<RelativePathBuf, String>>,
}

impl FsSource {
    pub fn new(notes_root: impl Into<PathBuf>) -> Self {
        Self {
            notes_root: notes_root.into(),
            buffer: None,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn notes_root(&self) -> &Path {
        &self.notes_root
    }

    /// Marks a document as open for editing with the given text.
    pub fn set_buffer(&mut self, text: impl Into<String>) {
        self.buffer = Some(text.into());
    }

    pub fn clear_buffer(&mut self) {
        self.buffer = None;
    }

    /// Drops the cached read of `path`, or every cached read for `None`.
    pub fn invalidate(&self, path: Option<&RelativePath>) {
        let mut cache = self.cache.borrow_mut();
        match path {
            Some(path) => {
                cache.remove(path);
            }
            None => cache.clear(),
        }
    }

    /// Converts an absolute path under the notes root to a relative one.
    pub fn relative(&self, path: &Path) -> Option<RelativePathBuf> {
        let stripped = path.strip_prefix(&self.notes_root).ok()?;
        RelativePathBuf::from_path(stripped).ok()
    }
}

impl SourceProvider for FsSource {
    fn active_buffer_text(&self) -> Option<String> {
        self.buffer.clone()
    }

    fn read_file(&self, path: &RelativePath) -> Result<String, IoError> {
        if let Some(text) = self.cache.borrow().get(path) {
            return Ok(text.clone());
        }
        let text = read_file(path, &self.notes_root)?;
        log::debug!("Read {} bytes from {path}", text.len());
        self.cache
            .borrow_mut()
            .insert(path.to_relative_path_buf(), text.clone());
        Ok(text)
    }
}
