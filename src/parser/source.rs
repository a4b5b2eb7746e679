//! Content source abstraction for reading model files from the filesystem or
//! from KerML project archives (`.kpar`, a ZIP file).

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Read;
use walkdir::WalkDir;

/// File extensions recognised as SysMLv2/KerML textual notation.
pub const MODEL_EXTENSIONS: &[&str] = &["sysml", "kerml"];

/// Returns `true` if `path` looks like a textual model file.
pub fn is_model_file(path: &Utf8Path) -> bool {
    path.extension()
        .is_some_and(|ext| MODEL_EXTENSIONS.contains(&ext))
}

/// Trait for abstracting file I/O (filesystem vs. archive source).
pub trait ContentSource {
    /// Read a file at the given logical path and return its content as a string.
    fn read_to_string(&mut self, path: &Utf8Path) -> Result<String>;
    /// List model files below a directory path, recursively, sorted by path.
    fn list_dir(&mut self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>>;
}

/// Reads files directly from the local filesystem.
pub struct FsSource;

impl ContentSource for FsSource {
    fn read_to_string(&mut self, path: &Utf8Path) -> Result<String> {
        std::fs::read_to_string(path.as_std_path()).with_context(|| format!("Failed to read {}", path))
    }

    fn list_dir(&mut self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(path.as_std_path()).follow_links(true) {
            let entry = entry.with_context(|| format!("Read dir {}", path))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let p = Utf8PathBuf::from_path_buf(entry.into_path())
                .map_err(|p| anyhow::anyhow!("Non-UTF8 path {}", p.display()))?;
            if is_model_file(&p) {
                files.push(p);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Reads files from a ZIP archive (used for `.kpar` project archives).
pub struct ZipSource<R: Read + std::io::Seek> {
    zip: zip::ZipArchive<R>,
}

impl<R: Read + std::io::Seek> ZipSource<R> {
    pub fn new(reader: R) -> Result<Self> {
        let zip = zip::ZipArchive::new(reader).context("Failed to open zip archive")?;
        Ok(Self { zip })
    }
}

fn normalize_entry(path: &Utf8Path) -> String {
    path.as_str()
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

impl<R: Read + std::io::Seek> ContentSource for ZipSource<R> {
    fn read_to_string(&mut self, path: &Utf8Path) -> Result<String> {
        let p = normalize_entry(path);
        let mut f = self
            .zip
            .by_name(&p)
            .with_context(|| format!("File {} not found in zip", p))?;
        let mut s = String::new();
        f.read_to_string(&mut s)
            .with_context(|| format!("Failed to read {} from zip", p))?;
        Ok(s)
    }

    fn list_dir(&mut self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        let mut prefix = normalize_entry(path);
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        let mut files = Vec::new();
        for i in 0..self.zip.len() {
            let name = self.zip.by_index(i)?.name().to_string();
            let candidate = Utf8PathBuf::from(&name);
            if name.starts_with(&prefix) && !name.ends_with('/') && is_model_file(&candidate) {
                files.push(candidate);
            }
        }
        files.sort();
        Ok(files)
    }
}
