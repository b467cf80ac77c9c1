//! Document store: one backing HTML file per document type under a site root.
//!
//! Documents are never cached: every load re-reads and re-parses the file, and
//! every save rewrites it wholesale. There is no locking; concurrent saves to
//! the same file race at the filesystem level and the last write wins. That is
//! acceptable for a single-admin local tool.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use scraper::Html;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::registry::DocumentType;

/// Error type for document store operations
#[derive(Debug)]
pub enum StoreError {
    /// The backing file does not exist.
    NotFound(PathBuf),
    /// The file could not be read or decoded as HTML text.
    Parse { path: PathBuf, reason: String },
    /// Persisting the serialized document failed.
    Write { path: PathBuf, reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(path) => {
                write!(f, "Document file not found: {}", path.display())
            }
            StoreError::Parse { path, reason } => {
                write!(f, "Failed to parse {}: {}", path.display(), reason)
            }
            StoreError::Write { path, reason } => {
                write!(f, "Failed to write {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for StoreError {}

fn default_root() -> PathBuf {
    PathBuf::from("site")
}

fn default_deny() -> Vec<String> {
    vec!["login".to_string()]
}

/// Site configuration: where the documents live and which files the
/// site-wide name scan must leave alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Directory containing the site's HTML files.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Per-document file name overrides. Unlisted types use their defaults.
    #[serde(default)]
    pub files: HashMap<DocumentType, String>,

    /// File-name substrings excluded from the name scan.
    #[serde(default = "default_deny")]
    pub deny: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            files: HashMap::new(),
            deny: default_deny(),
        }
    }
}

impl SiteConfig {
    /// Load site configuration from a YAML file.
    ///
    /// # Errors
    /// Returns error if the file doesn't exist or has invalid format
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        serde_yaml::from_str(&contents).map_err(|e| format!("Failed to parse YAML: {}", e))
    }

    /// Config rooted at a specific directory, with default file names.
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// File name backing a document type.
    pub fn file_name(&self, doc: DocumentType) -> String {
        self.files
            .get(&doc)
            .cloned()
            .unwrap_or_else(|| doc.default_file_name().to_string())
    }

    /// Full path of a document type's backing file.
    pub fn path_for(&self, doc: DocumentType) -> PathBuf {
        self.root.join(self.file_name(doc))
    }

    /// Check a file name against the deny list (substring match).
    pub fn is_denied(&self, file_name: &str) -> bool {
        self.deny.iter().any(|pat| file_name.contains(pat.as_str()))
    }
}

/// Loads and persists whole HTML documents.
pub struct DocumentStore {
    config: SiteConfig,
}

impl DocumentStore {
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Load and parse a document by type.
    pub fn load(&self, doc: DocumentType) -> Result<Html, StoreError> {
        self.load_path(&self.config.path_for(doc))
    }

    /// Load and parse a document from an explicit path.
    pub fn load_path(&self, path: &Path) -> Result<Html, StoreError> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound(path.to_path_buf())
            } else {
                StoreError::Parse {
                    path: path.to_path_buf(),
                    reason: format!("read failed: {}", e),
                }
            }
        })?;

        let contents = String::from_utf8(bytes).map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // html5ever recovers from malformed markup; a load that read valid
        // UTF-8 always yields a document tree.
        Ok(Html::parse_document(&contents))
    }

    /// Serialize and overwrite a document's backing file.
    pub fn save(&self, document: &Html, doc: DocumentType) -> Result<(), StoreError> {
        self.save_path(document, &self.config.path_for(doc))
    }

    /// Serialize and overwrite an explicit path.
    pub fn save_path(&self, document: &Html, path: &Path) -> Result<(), StoreError> {
        fs::write(path, document.html()).map_err(|e| StoreError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Every HTML file under the site root, minus denied names, sorted for
    /// deterministic scan order. Used by the site-wide name scan.
    pub fn html_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.config.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("html"))
                    .unwrap_or(false)
            })
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy();
                !self.config.is_denied(&name)
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> DocumentStore {
        DocumentStore::new(SiteConfig::with_root(dir.path()))
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let err = store.load(DocumentType::Main).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let path = dir.path().join("index.html");
        fs::write(&path, "<html><body><p class=\"x\">hi</p></body></html>").unwrap();

        let doc = store.load(DocumentType::Main).unwrap();
        store.save(&doc, DocumentType::Main).unwrap();

        let reloaded = fs::read_to_string(&path).unwrap();
        assert!(reloaded.contains("class=\"x\""));
        assert!(reloaded.contains("hi"));
    }

    #[test]
    fn test_save_into_missing_directory_is_write_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let doc = Html::parse_document("<html></html>");

        let missing = dir.path().join("nope").join("index.html");
        let err = store.save_path(&doc, &missing).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }

    #[test]
    fn test_html_files_respects_deny_list() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("profile.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("login.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("notes.txt"), "not html").unwrap();
        let store = store_in(&dir);

        let files = store.html_files();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["index.html", "profile.html"]);
    }

    #[test]
    fn test_config_file_overrides() {
        let mut config = SiteConfig::default();
        config
            .files
            .insert(DocumentType::Cards, "my-cards.html".to_string());

        assert_eq!(config.file_name(DocumentType::Cards), "my-cards.html");
        assert_eq!(config.file_name(DocumentType::Main), "index.html");
    }
}
