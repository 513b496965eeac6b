use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::{info, warn};

use super::model::{MediaType, UploadedFile};

/// Largest accepted document, in bytes.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Why a single file was skipped. Rejections never abort the rest of a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileRejection {
    #[error("{name}: unsupported file type '{media_type}' (allowed: PDF, JPEG, PNG, WEBP)")]
    UnsupportedType { name: String, media_type: String },
    #[error("{name}: file is {size} bytes, larger than the 10 MB limit")]
    TooLarge { name: String, size: u64 },
    #[error("{name}: could not be read: {reason}")]
    Unreadable { name: String, reason: String },
}

/// Outcome of adding a batch of files.
#[derive(Debug, Default)]
pub struct IntakeReport {
    pub accepted: Vec<UploadedFile>,
    pub rejected: Vec<FileRejection>,
}

/// The pending document set for the configuration form.
#[derive(Debug, Default)]
pub struct DocumentSet {
    files: Vec<UploadedFile>,
    next_id: u64,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add one file given its declared media type.
    pub fn add(&mut self, name: &str, media_type: &str, content: &[u8]) -> Result<UploadedFile, FileRejection> {
        let media = MediaType::from_mime(media_type).ok_or_else(|| FileRejection::UnsupportedType {
            name: name.to_string(),
            media_type: media_type.to_string(),
        })?;
        self.add_typed(name, media, content)
    }

    fn add_typed(&mut self, name: &str, media_type: MediaType, content: &[u8]) -> Result<UploadedFile, FileRejection> {
        let size = content.len() as u64;
        if size > MAX_FILE_BYTES {
            return Err(FileRejection::TooLarge { name: name.to_string(), size });
        }

        self.next_id += 1;
        let file = UploadedFile::new(
            format!("doc-{}", self.next_id),
            name.to_string(),
            media_type,
            STANDARD.encode(content),
            size,
        );
        info!(id = file.id(), name, media_type = %media_type, size, "Accepted document");
        self.files.push(file.clone());
        Ok(file)
    }

    /// Add several in-memory files given as `(name, media type, content)`.
    pub fn add_batch<'a, I>(&mut self, files: I) -> IntakeReport
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a [u8])>,
    {
        let mut report = IntakeReport::default();
        for (name, media_type, content) in files {
            let result = self.add(name, media_type, content);
            record(&mut report, result);
        }
        report
    }

    /// Read files from disk, inferring the media type from the extension.
    pub async fn add_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> IntakeReport {
        let mut report = IntakeReport::default();
        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let result = match path.extension().and_then(|e| e.to_str()).and_then(MediaType::from_extension) {
                None => Err(FileRejection::UnsupportedType {
                    name: name.clone(),
                    media_type: path
                        .extension()
                        .map(|e| e.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "unknown".to_string()),
                }),
                Some(media_type) => match tokio::fs::metadata(path).await {
                    Ok(meta) if meta.len() > MAX_FILE_BYTES => {
                        Err(FileRejection::TooLarge { name: name.clone(), size: meta.len() })
                    }
                    Ok(_) => match tokio::fs::read(path).await {
                        Ok(bytes) => self.add_typed(&name, media_type, &bytes),
                        Err(e) => Err(FileRejection::Unreadable { name: name.clone(), reason: e.to_string() }),
                    },
                    Err(e) => Err(FileRejection::Unreadable { name: name.clone(), reason: e.to_string() }),
                },
            };
            record(&mut report, result);
        }
        report
    }

    pub fn remove(&mut self, id: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.id() == id)?;
        Some(self.files.remove(index))
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Hand the accepted documents to a quiz configuration.
    pub fn into_files(self) -> Vec<UploadedFile> {
        self.files
    }
}

fn record(report: &mut IntakeReport, result: Result<UploadedFile, FileRejection>) {
    match result {
        Ok(file) => report.accepted.push(file),
        Err(rejection) => {
            warn!(%rejection, "Skipped document");
            report.rejected.push(rejection);
        }
    }
}
