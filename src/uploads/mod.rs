//! Blob store for uploaded images and documents.
//!
//! Files live under `<root>/<category>/` with generated names; the filename
//! is the stable reference stored in the database and served back under
//! `/uploads/<category>/<filename>`.

use bytes::Bytes;
use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::UploadConfig;

const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp"];
const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCategory {
    IdProofs,
    Profiles,
    Properties,
    PropertyDocuments,
}

impl UploadCategory {
    pub fn dir_name(&self) -> &'static str {
        match self {
            UploadCategory::IdProofs => "id_proofs",
            UploadCategory::Profiles => "profiles",
            UploadCategory::Properties => "properties",
            UploadCategory::PropertyDocuments => "property-documents",
        }
    }

    fn accepts_pdf(&self) -> bool {
        matches!(self, UploadCategory::PropertyDocuments)
    }

    fn type_hint(&self) -> &'static str {
        if self.accepts_pdf() {
            "Only images (jpeg, jpg, png, webp) and PDF documents are allowed"
        } else {
            "Only images (jpeg, jpg, png, webp) are allowed"
        }
    }
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{hint}: {file_name}")]
    UnsupportedType {
        file_name: String,
        hint: &'static str,
    },

    #[error("{file_name} exceeds the {limit} byte upload limit")]
    TooLarge { file_name: String, limit: usize },

    #[error("Too many files for {field} (max {limit})")]
    TooManyFiles { field: String, limit: usize },

    #[error("{0} is empty")]
    Empty(String),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the client caused the failure
    pub fn is_rejection(&self) -> bool {
        !matches!(self, UploadError::Io(_))
    }
}

/// A file received in a multipart request, not yet stored
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

pub struct UploadStore {
    root: PathBuf,
    max_file_bytes: usize,
    max_property_images: usize,
    max_property_documents: usize,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: config.root.clone(),
            max_file_bytes: config.max_file_bytes,
            max_property_images: config.max_property_images,
            max_property_documents: config.max_property_documents,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maximum number of files accepted per request for a category
    pub fn max_files(&self, category: UploadCategory) -> usize {
        match category {
            UploadCategory::Properties => self.max_property_images,
            UploadCategory::PropertyDocuments => self.max_property_documents,
            UploadCategory::IdProofs | UploadCategory::Profiles => 1,
        }
    }

    /// Check type and size without touching the disk
    pub fn validate(&self, category: UploadCategory, file: &IncomingFile) -> Result<(), UploadError> {
        let unsupported = || UploadError::UnsupportedType {
            file_name: file.file_name.clone(),
            hint: category.type_hint(),
        };

        let extension = extension_of(&file.file_name).ok_or_else(unsupported)?;
        let extension_ok = IMAGE_EXTENSIONS.contains(&extension.as_str())
            || (category.accepts_pdf() && extension == "pdf");
        if !extension_ok {
            return Err(unsupported());
        }

        // The declared type must be allowed and agree with the extension
        let guessed = mime_guess::from_ext(&extension)
            .first()
            .ok_or_else(unsupported)?;
        let declared = file
            .content_type
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_else(|| guessed.essence_str().to_string());
        let type_ok = IMAGE_TYPES.contains(&declared.as_str())
            || (category.accepts_pdf() && declared == "application/pdf");
        if !type_ok || declared != guessed.essence_str() {
            return Err(unsupported());
        }

        if file.bytes.is_empty() {
            return Err(UploadError::Empty(file.file_name.clone()));
        }
        if file.bytes.len() > self.max_file_bytes {
            return Err(UploadError::TooLarge {
                file_name: file.file_name.clone(),
                limit: self.max_file_bytes,
            });
        }
        Ok(())
    }

    /// Validate every file, then store them all, returning their references
    /// in input order. Nothing is written if any file is rejected.
    pub async fn save_all(
        &self,
        category: UploadCategory,
        files: &[IncomingFile],
    ) -> Result<Vec<String>, UploadError> {
        let limit = self.max_files(category);
        if files.len() > limit {
            let field = files
                .first()
                .map(|f| f.field.clone())
                .unwrap_or_else(|| category.dir_name().to_string());
            return Err(UploadError::TooManyFiles { field, limit });
        }
        for file in files {
            self.validate(category, file)?;
        }

        let dir = self.root.join(category.dir_name());
        tokio::fs::create_dir_all(&dir).await?;

        let mut references = Vec::with_capacity(files.len());
        for file in files {
            let reference = generate_name(&file.file_name);
            tokio::fs::write(dir.join(&reference), &file.bytes).await?;
            debug!(category = category.dir_name(), reference = %reference, "Stored upload");
            references.push(reference);
        }
        Ok(references)
    }

    pub async fn save(&self, category: UploadCategory, file: &IncomingFile) -> Result<String, UploadError> {
        let mut saved = self.save_all(category, std::slice::from_ref(file)).await?;
        saved
            .pop()
            .ok_or_else(|| UploadError::Empty(file.file_name.clone()))
    }

    /// Best-effort removal of a stored blob
    pub async fn remove(&self, category: UploadCategory, reference: &str) {
        if reference.is_empty() || reference.contains(['/', '\\']) || reference.contains("..") {
            return;
        }
        let path = self.root.join(category.dir_name()).join(reference);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove upload");
            }
        }
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// `<unix millis>-<random><.ext>`
fn generate_name(original: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    match extension_of(original) {
        Some(ext) => format!("{}-{}.{}", millis, suffix, ext),
        None => format!("{}-{}", millis, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn store(dir: &TempDir) -> UploadStore {
        UploadStore::new(&UploadConfig {
            root: dir.path().to_path_buf(),
            max_file_bytes: 16,
            max_property_images: 2,
            max_property_documents: 1,
        })
    }

    fn file(name: &str, content_type: Option<&str>, len: usize) -> IncomingFile {
        IncomingFile {
            field: "images".into(),
            file_name: name.into(),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from(vec![7u8; len]),
        }
    }

    #[test]
    fn images_pass_and_mismatched_types_fail() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let category = UploadCategory::Properties;

        assert_ok!(store.validate(category, &file("a.JPG", Some("image/jpeg"), 4)));
        assert_ok!(store.validate(category, &file("a.webp", None, 4)));

        for bad in [
            file("a.gif", Some("image/gif"), 4),
            file("a.png", Some("image/jpeg"), 4),
            file("a.pdf", Some("application/pdf"), 4),
            file("noext", Some("image/png"), 4),
            file("a.png", Some("text/html"), 4),
        ] {
            assert!(matches!(
                store.validate(category, &bad),
                Err(UploadError::UnsupportedType { .. })
            ));
        }
    }

    #[test]
    fn documents_also_accept_pdf() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_ok!(store.validate(
            UploadCategory::PropertyDocuments,
            &file("deed.pdf", Some("application/pdf"), 4)
        ));
    }

    #[test]
    fn size_limits_apply() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let category = UploadCategory::Profiles;

        assert!(matches!(
            store.validate(category, &file("a.png", Some("image/png"), 17)),
            Err(UploadError::TooLarge { limit: 16, .. })
        ));
        assert!(matches!(
            store.validate(category, &file("a.png", Some("image/png"), 0)),
            Err(UploadError::Empty(_))
        ));
    }

    #[tokio::test]
    async fn save_all_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let category = UploadCategory::Properties;

        let rejected = store
            .save_all(
                category,
                &[file("a.png", Some("image/png"), 4), file("b.exe", None, 4)],
            )
            .await;
        assert_err!(rejected);
        assert!(!dir.path().join("properties").exists());

        let too_many = store
            .save_all(
                category,
                &[
                    file("a.png", None, 4),
                    file("b.png", None, 4),
                    file("c.png", None, 4),
                ],
            )
            .await;
        assert!(matches!(too_many, Err(UploadError::TooManyFiles { limit: 2, .. })));

        let saved = store
            .save_all(category, &[file("a.png", None, 4), file("b.jpg", None, 5)])
            .await
            .unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved[0].ends_with(".png"));
        assert!(saved[1].ends_with(".jpg"));
        for reference in &saved {
            assert!(dir.path().join("properties").join(reference).exists());
        }
    }

    #[tokio::test]
    async fn remove_is_best_effort_and_stays_inside_the_root() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let reference = store
            .save(UploadCategory::Profiles, &file("me.png", None, 4))
            .await
            .unwrap();
        let path = dir.path().join("profiles").join(&reference);
        assert!(path.exists());

        store.remove(UploadCategory::Profiles, &reference).await;
        assert!(!path.exists());

        // Missing files and traversal attempts are ignored
        store.remove(UploadCategory::Profiles, &reference).await;
        store.remove(UploadCategory::Profiles, "../secret").await;
    }
}
