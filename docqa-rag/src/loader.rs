//! Document loaders for files, directories, and web pages.
//!
//! A [`SourceLocation`] names where documents come from. A
//! [`DocumentLoader`] first [expands](DocumentLoader::expand) it into
//! individually loadable sources (a directory becomes its files), then
//! [loads](DocumentLoader::load) each one into [`Document`]s. Expanding
//! before loading lets the pipeline report a failure per file instead of
//! per directory.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use crate::document::{Document, FILE_TYPE_KEY};
use crate::error::{RagError, Result};

/// File formats the loaders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Plain text (`.txt`).
    Text,
    /// Markdown (`.md`, `.markdown`), loaded as plain text.
    Markdown,
    /// PDF (`.pdf`), one document per page.
    Pdf,
}

impl FileKind {
    /// Every supported format.
    pub const ALL: [FileKind; 3] = [FileKind::Text, FileKind::Markdown, FileKind::Pdf];

    /// Detect the format from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(FileKind::Text),
            "md" | "markdown" => Some(FileKind::Markdown),
            "pdf" => Some(FileKind::Pdf),
            _ => None,
        }
    }

    /// The `file_type` metadata value.
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Text => "txt",
            FileKind::Markdown => "md",
            FileKind::Pdf => "pdf",
        }
    }
}

/// Where to load documents from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A directory scanned recursively for files of the given kinds.
    /// Hidden files and directories are skipped.
    Directory {
        /// The directory root.
        path: PathBuf,
        /// Formats to pick up.
        kinds: Vec<FileKind>,
    },
    /// A single file; its format is taken from the extension.
    File(PathBuf),
    /// A web page fetched over HTTP(S).
    Url(String),
}

impl SourceLocation {
    /// A directory scanned for every supported format.
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        SourceLocation::Directory { path: path.into(), kinds: FileKind::ALL.to_vec() }
    }

    /// A directory scanned for `.txt` and `.md` files.
    pub fn text_dir(path: impl Into<PathBuf>) -> Self {
        SourceLocation::Directory {
            path: path.into(),
            kinds: vec![FileKind::Text, FileKind::Markdown],
        }
    }

    /// A directory scanned for `.pdf` files.
    pub fn pdf_dir(path: impl Into<PathBuf>) -> Self {
        SourceLocation::Directory { path: path.into(), kinds: vec![FileKind::Pdf] }
    }

    /// Interpret a command-line argument: `http://` and `https://` prefixes
    /// are URLs, existing directories are scanned, anything else is a file.
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            SourceLocation::Url(arg.to_string())
        } else if Path::new(arg).is_dir() {
            SourceLocation::dir(arg)
        } else {
            SourceLocation::File(PathBuf::from(arg))
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Directory { path, .. } | SourceLocation::File(path) => {
                write!(f, "{}", path.display())
            }
            SourceLocation::Url(url) => f.write_str(url),
        }
    }
}

/// Turns [`SourceLocation`]s into [`Document`]s.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Resolve a location into the sources that [`load`](Self::load)
    /// accepts. The default returns the location unchanged.
    fn expand(&self, source: &SourceLocation) -> Result<Vec<SourceLocation>> {
        Ok(vec![source.clone()])
    }

    /// Load the documents of one expanded source.
    async fn load(&self, source: &SourceLocation) -> Result<Vec<Document>>;
}

/// The default loader: text and Markdown files always, PDFs with the `pdf`
/// feature, and web pages with the `web` feature.
pub struct SourceLoader {
    #[cfg(feature = "web")]
    web: crate::web::WebLoader,
}

impl SourceLoader {
    /// Create a loader with default settings.
    pub fn new() -> Result<Self> {
        Ok(Self {
            #[cfg(feature = "web")]
            web: crate::web::WebLoader::new()?,
        })
    }

    /// Replace the web page loader.
    #[cfg(feature = "web")]
    pub fn with_web_loader(mut self, web: crate::web::WebLoader) -> Self {
        self.web = web;
        self
    }
}

#[async_trait]
impl DocumentLoader for SourceLoader {
    fn expand(&self, source: &SourceLocation) -> Result<Vec<SourceLocation>> {
        match source {
            SourceLocation::Directory { path, kinds } => {
                let files = discover_files(path, kinds)?;
                debug!(directory = %path.display(), file_count = files.len(), "scanned directory");
                Ok(files.into_iter().map(SourceLocation::File).collect())
            }
            other => Ok(vec![other.clone()]),
        }
    }

    async fn load(&self, source: &SourceLocation) -> Result<Vec<Document>> {
        match source {
            SourceLocation::File(path) => load_file(path).await,
            SourceLocation::Url(url) => {
                #[cfg(feature = "web")]
                {
                    Ok(vec![self.web.load(url).await?])
                }
                #[cfg(not(feature = "web"))]
                {
                    Err(RagError::ingestion(url, "loading URLs requires the `web` feature"))
                }
            }
            SourceLocation::Directory { .. } => {
                let mut documents = Vec::new();
                for file in self.expand(source)? {
                    documents.extend(self.load(&file).await?);
                }
                Ok(documents)
            }
        }
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Recursively list files under `root` whose format is one of `kinds`,
/// sorted by path.
pub fn discover_files(root: &Path, kinds: &[FileKind]) -> Result<Vec<PathBuf>> {
    let location = root.display().to_string();
    if !root.is_dir() {
        return Err(RagError::ingestion(location, "not a directory"));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry.map_err(|e| RagError::ingestion(location.clone(), e.to_string()))?;
        if entry.file_type().is_file()
            && FileKind::from_path(entry.path()).is_some_and(|kind| kinds.contains(&kind))
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load one file according to its extension.
pub async fn load_file(path: &Path) -> Result<Vec<Document>> {
    match FileKind::from_path(path) {
        Some(kind @ (FileKind::Text | FileKind::Markdown)) => {
            Ok(vec![load_text(path, kind).await?])
        }
        Some(FileKind::Pdf) => load_pdf(path).await,
        None => Err(RagError::ingestion(path.display().to_string(), "unsupported file format")),
    }
}

async fn load_text(path: &Path, kind: FileKind) -> Result<Document> {
    let source = path.display().to_string();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RagError::ingestion(source.clone(), e.to_string()))?;
    debug!(source = %source, chars = text.chars().count(), "loaded text file");
    Ok(Document::new(source, text).with_metadata(FILE_TYPE_KEY, kind.as_str()))
}

/// Load a PDF as one document per non-blank page, numbered from 1.
///
/// Text extraction is CPU-bound and runs on the blocking thread pool.
#[cfg(feature = "pdf")]
pub async fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    let source = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RagError::ingestion(source.clone(), e.to_string()))?;

    let pages =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
            .await
            .map_err(|e| {
                RagError::ingestion(source.clone(), format!("PDF extraction failed: {e}"))
            })?
            .map_err(|e| RagError::ingestion(source.clone(), format!("unreadable PDF: {e}")))?;

    let documents: Vec<Document> = pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| {
            Document::new(source.clone(), text)
                .with_page(i as u32 + 1)
                .with_metadata(FILE_TYPE_KEY, FileKind::Pdf.as_str())
        })
        .collect();

    debug!(source = %source, page_count = documents.len(), "loaded PDF");
    Ok(documents)
}

#[cfg(not(feature = "pdf"))]
pub async fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    Err(RagError::ingestion(path.display().to_string(), "loading PDFs requires the `pdf` feature"))
}
