use std::fmt;
use std::path::{Path, PathBuf};

use snafu::{OptionExt, ResultExt, Snafu, ensure};

/// Extensions the answering service knows how to extract text from.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "txt"];
/// Upload ceiling enforced by the answering service.
pub const MAX_ATTACHMENT_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AttachmentError {
    #[snafu(display("failed to read attachment at {path:?} on `{stage}`: {source}"))]
    Read {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("attachment {path:?} has no usable file name"))]
    MissingFileName { stage: &'static str, path: PathBuf },
    #[snafu(display(
        "'{name}' is not a supported attachment; use one of: {}",
        SUPPORTED_EXTENSIONS.join(", ")
    ))]
    UnsupportedExtension { stage: &'static str, name: String },
    #[snafu(display("'{name}' is {size} bytes, larger than the {limit} byte limit"))]
    TooLarge {
        stage: &'static str,
        name: String,
        size: u64,
        limit: u64,
    },
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;

/// A file picked by the user, held in memory until the next send consumes it.
#[derive(Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub blob: Vec<u8>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, blob: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            blob: blob.into(),
        }
    }

    /// Reads a file from disk after checking it against the upload limits.
    pub fn load(path: impl AsRef<Path>) -> AttachmentResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .context(MissingFileNameSnafu {
                stage: "attachment-file-name",
                path: path.to_path_buf(),
            })?;

        ensure!(
            is_supported_attachment(&name),
            UnsupportedExtensionSnafu {
                stage: "attachment-extension",
                name: name.clone(),
            }
        );

        let metadata = std::fs::metadata(path).context(ReadSnafu {
            stage: "attachment-metadata",
            path: path.to_path_buf(),
        })?;
        ensure!(
            metadata.len() <= MAX_ATTACHMENT_BYTES,
            TooLargeSnafu {
                stage: "attachment-size",
                name: name.clone(),
                size: metadata.len(),
                limit: MAX_ATTACHMENT_BYTES,
            }
        );

        let blob = std::fs::read(path).context(ReadSnafu {
            stage: "attachment-read",
            path: path.to_path_buf(),
        })?;

        tracing::debug!(name = %name, bytes = blob.len(), "loaded attachment");
        Ok(Self { name, blob })
    }

    pub fn len(&self) -> usize {
        self.blob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }
}

// Blobs can be megabytes; keep them out of logs.
impl fmt::Debug for FileRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FileRef")
            .field("name", &self.name)
            .field("bytes", &self.blob.len())
            .finish()
    }
}

pub fn is_supported_attachment(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(extension))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported_attachment("terms.pdf"));
        assert!(is_supported_attachment("Ledger.XLSX"));
        assert!(!is_supported_attachment("photo.png"));
        assert!(!is_supported_attachment("README"));
    }

    #[test]
    fn load_reads_supported_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("terms.txt");
        std::fs::write(&path, b"refunds within 30 days").expect("write fixture");

        let file = FileRef::load(&path).expect("supported file loads");
        assert_eq!(file.name, "terms.txt");
        assert_eq!(file.blob, b"refunds within 30 days");
    }

    #[test]
    fn load_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("diagram.png");
        std::fs::write(&path, b"not really a png").expect("write fixture");

        let error = FileRef::load(&path).expect_err("png is rejected");
        assert!(matches!(error, AttachmentError::UnsupportedExtension { .. }));
    }

    #[test]
    fn load_rejects_oversized_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("huge.txt");
        let file = std::fs::File::create(&path).expect("create fixture");
        file.set_len(MAX_ATTACHMENT_BYTES + 1).expect("grow fixture");

        let error = FileRef::load(&path).expect_err("oversized file is rejected");
        assert!(matches!(
            error,
            AttachmentError::TooLarge { size, .. } if size == MAX_ATTACHMENT_BYTES + 1
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = FileRef::load(dir.path().join("gone.pdf")).expect_err("missing file");
        assert!(matches!(error, AttachmentError::Read { .. }));
    }
}
