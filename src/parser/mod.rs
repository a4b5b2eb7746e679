//! SysMLv2 textual notation parser.
//!
//! Provides [`SysmlParser`] to load model files into the strongly-typed
//! [`Model`]. Sub-modules split the parser into focused areas:
//!
//! - [`source`] – File I/O abstraction (filesystem vs. `.kpar` ZIP)
//! - [`lexer`] – Tokenizer
//! - [`syntax`] – Grammar for packages, definitions and state machines

pub mod lexer;
pub mod source;
pub mod syntax;

pub use source::*;
pub use syntax::parse_str;

use crate::model::*;
use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;

/// Core SysMLv2 parser. Generic over [`ContentSource`] so it can read from
/// the filesystem ([`FsSource`]) or from a project archive ([`ZipSource`]).
pub struct SysmlParser<S: ContentSource> {
    source: S,
}

impl<S: ContentSource> SysmlParser<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Parse a single model file.
    pub fn parse_file(&mut self, path: impl AsRef<Utf8Path>) -> Result<Model> {
        let path = path.as_ref();
        let text = self.source.read_to_string(path)?;
        let file =
            parse_str(&text, path.as_str()).with_context(|| format!("Failed to parse {}", path))?;
        Ok(Model { files: vec![file] })
    }

    /// Parse several files into one model. Texts are read in order and parsed
    /// in parallel; the resulting files keep the input order.
    pub fn parse_files(&mut self, paths: &[Utf8PathBuf]) -> Result<Model> {
        let mut texts: Vec<(&Utf8PathBuf, String)> = Vec::with_capacity(paths.len());
        for p in paths {
            texts.push((p, self.source.read_to_string(p)?));
        }
        let files = texts
            .par_iter()
            .map(|(p, t)| parse_str(t, p.as_str()).with_context(|| format!("Failed to parse {}", p)))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(files = files.len(), "parsed model files");
        Ok(Model { files })
    }

    /// Parse every model file below `dir`.
    pub fn parse_dir(&mut self, dir: impl AsRef<Utf8Path>) -> Result<Model> {
        let dir = dir.as_ref();
        let paths = self.source.list_dir(dir)?;
        if paths.is_empty() {
            return Err(anyhow!("No .sysml or .kerml files found in {}", dir));
        }
        self.parse_files(&paths)
    }
}

/// Load a model from a path on disk: a model file, a directory of model
/// files, a `.kpar` archive, or a binary snapshot written by
/// [`Model::save_to_binary`].
pub fn load_model(path: &Utf8Path) -> Result<Model> {
    if path.is_dir() {
        return SysmlParser::new(FsSource).parse_dir(path);
    }
    match path.extension() {
        Some("kpar") => {
            let file =
                std::fs::File::open(path.as_std_path()).with_context(|| format!("Open {}", path))?;
            let reader = std::io::BufReader::new(file);
            SysmlParser::new(ZipSource::new(reader)?)
                .parse_dir("")
                .with_context(|| format!("Failed to load archive {}", path))
        }
        Some("bin") => Model::load_from_binary(path.as_std_path())
            .with_context(|| format!("Failed to load snapshot {}", path)),
        _ => SysmlParser::new(FsSource).parse_file(path),
    }
}
