//! Multi-document YAML manifests: load, render, atomic in-place write.
//!
//! Documents from every source live in one flat list so references are
//! deduplicated across files; each source remembers its slice of that list.

use std::fmt;
use std::io::Read;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{io_err, ManifestError};

const DOCUMENT_SEPARATOR: &str = "---\n";

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Parse a `---`-separated YAML stream. Empty documents are dropped.
pub fn parse_documents(text: &str) -> Result<Vec<Value>, serde_yaml::Error> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Serialize documents back into a `---`-separated stream.
pub fn render_documents(documents: &[Value]) -> Result<String, serde_yaml::Error> {
    let mut out = String::new();
    for (i, document) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str(DOCUMENT_SEPARATOR);
        }
        out.push_str(&serde_yaml::to_string(document)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where a manifest came from. `-` on the command line means stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Stdin,
    File(PathBuf),
}

impl ManifestSource {
    pub fn from_arg(arg: impl Into<PathBuf>) -> Self {
        let path = arg.into();
        if path.as_os_str() == "-" {
            Self::Stdin
        } else {
            Self::File(path)
        }
    }

    fn read(&self) -> Result<String, ManifestError> {
        match self {
            ManifestSource::Stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .map_err(|e| io_err("<stdin>", e))?;
                Ok(text)
            }
            ManifestSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| io_err(path, e))
            }
        }
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestSource::Stdin => write!(f, "<stdin>"),
            ManifestSource::File(path) => path.display().fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// ManifestSet
// ---------------------------------------------------------------------------

/// Documents of several sources, resolved together.
#[derive(Debug, Default)]
pub struct ManifestSet {
    documents: Vec<Value>,
    sources: Vec<(ManifestSource, Range<usize>)>,
}

impl ManifestSet {
    /// Read and parse every source in order.
    pub fn load(sources: &[ManifestSource]) -> Result<Self, ManifestError> {
        let mut set = Self::default();
        for source in sources {
            let text = source.read()?;
            set.push(source.clone(), &text)?;
        }
        Ok(set)
    }

    /// Parse `text` and append its documents under `source`.
    pub fn push(&mut self, source: ManifestSource, text: &str) -> Result<(), ManifestError> {
        let documents = parse_documents(text).map_err(|e| ManifestError::Parse {
            source_name: source.to_string(),
            source: e,
        })?;
        let start = self.documents.len();
        self.documents.extend(documents);
        self.sources.push((source, start..self.documents.len()));
        Ok(())
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut [Value] {
        &mut self.documents
    }

    pub fn sources(&self) -> impl Iterator<Item = &ManifestSource> {
        self.sources.iter().map(|(source, _)| source)
    }

    /// Render the documents that came from the `index`-th source.
    pub fn render_source(&self, index: usize) -> Result<String, ManifestError> {
        let Some((_, range)) = self.sources.get(index) else {
            return Ok(String::new());
        };
        Ok(render_documents(&self.documents[range.clone()])?)
    }

    /// Render every source, separated by `---`.
    pub fn render_all(&self) -> Result<String, ManifestError> {
        let mut rendered = Vec::with_capacity(self.sources.len());
        for index in 0..self.sources.len() {
            let text = self.render_source(index)?;
            if !text.is_empty() {
                rendered.push(text);
            }
        }
        Ok(rendered.join(DOCUMENT_SEPARATOR))
    }

    /// Fails if any source cannot be written back.
    pub fn ensure_writable(&self) -> Result<(), ManifestError> {
        if self.sources().any(|s| *s == ManifestSource::Stdin) {
            return Err(ManifestError::StdinInPlace);
        }
        Ok(())
    }

    /// Atomically rewrite every file source with its current documents.
    pub fn write_in_place(&self) -> Result<Vec<PathBuf>, ManifestError> {
        self.ensure_writable()?;
        let mut written = Vec::with_capacity(self.sources.len());
        for (index, (source, _)) in self.sources.iter().enumerate() {
            if let ManifestSource::File(path) = source {
                write_atomic(path, &self.render_source(index)?)?;
                tracing::info!("wrote: {}", path.display());
                written.push(path.clone());
            }
        }
        Ok(written)
    }
}

/// Write `content` to `<path>.imagepin.tmp`, then rename over `path`.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), ManifestError> {
    let tmp = PathBuf::from(format!("{}.imagepin.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
