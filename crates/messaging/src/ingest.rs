//! Validation and storage of uploaded attachment blobs.
//!
//! Blobs are written before any message references them. A client that
//! uploads and never sends leaves an orphaned file behind, which is fine;
//! nothing in the conversation ever points at it.

use std::path::Path;

use tokio::io::AsyncWriteExt;

use marquee_config::UploadConfig;

use crate::error::MessagingError;
use crate::types::AttachmentRef;

const MAX_FILE_NAME_LENGTH: usize = 255;

/// Media types accepted for upload, each with the extensions it maps to.
/// The first extension is the one stored blobs are named with.
const ACCEPTED_TYPES: &[(&str, &[&str])] = &[
    ("image/jpeg", &["jpg", "jpeg"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/webp", &["webp"]),
    ("application/pdf", &["pdf"]),
    ("text/plain", &["txt"]),
    ("application/msword", &["doc"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &["docx"],
    ),
    ("application/vnd.ms-excel", &["xls"]),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &["xlsx"],
    ),
];

/// One file received from a client, before validation.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A stored blob read back for download.
#[derive(Debug)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// Validate an upload and write it to blob storage under a generated name.
///
/// The write is flushed to disk before the reference is handed out, so a
/// reference that reaches a client always points at a complete file.
pub async fn ingest(
    config: &UploadConfig,
    upload: Upload,
) -> Result<AttachmentRef, MessagingError> {
    if upload.file_name.is_empty() {
        return Err(MessagingError::upload("file name is required"));
    }
    if upload.file_name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(MessagingError::upload(format!(
            "file name exceeds {MAX_FILE_NAME_LENGTH} characters"
        )));
    }
    if upload.bytes.is_empty() {
        return Err(MessagingError::upload("uploaded file is empty"));
    }
    if upload.bytes.len() as u64 > config.max_size_bytes {
        return Err(MessagingError::upload(format!(
            "file exceeds the maximum size of {} bytes",
            config.max_size_bytes
        )));
    }

    let media_type = resolve_media_type(upload.media_type.as_deref(), &upload.file_name)
        .ok_or_else(|| MessagingError::upload("unsupported file type"))?;
    let extension = extension_for_media_type(media_type)
        .ok_or_else(|| MessagingError::upload("unsupported file type"))?;

    let reference = format!("{}.{}", cuid2::create_id(), extension);

    tokio::fs::create_dir_all(&config.dir).await?;
    let path = Path::new(&config.dir).join(&reference);
    let mut file = tokio::fs::File::create(&path).await?;
    file.write_all(&upload.bytes).await?;
    file.sync_all().await?;

    tracing::debug!(%reference, size = upload.bytes.len(), "stored attachment blob");

    Ok(AttachmentRef {
        reference,
        name: upload.file_name,
        media_type: media_type.to_owned(),
        size_bytes: upload.bytes.len() as i64,
    })
}

/// Read a stored blob back by its reference.
///
/// References are bare file names. Anything that could escape the upload
/// directory is treated as an unknown blob rather than a path.
pub async fn open_blob(config: &UploadConfig, reference: &str) -> Result<Blob, MessagingError> {
    if reference.is_empty()
        || reference.contains('/')
        || reference.contains('\\')
        || reference.contains("..")
    {
        return Err(MessagingError::NotFound);
    }

    let path = Path::new(&config.dir).join(reference);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(MessagingError::NotFound)
        }
        Err(err) => return Err(err.into()),
    };

    Ok(Blob {
        bytes,
        media_type: media_type_for_reference(reference).to_owned(),
    })
}

/// Prefer the declared content type; fall back to the file extension when
/// the declaration is missing or not something we accept. Browsers routinely
/// send application/octet-stream for office documents.
fn resolve_media_type(declared: Option<&str>, file_name: &str) -> Option<&'static str> {
    if let Some(declared) = declared {
        let normalized = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if let Some((media_type, _)) = ACCEPTED_TYPES
            .iter()
            .find(|(media_type, _)| *media_type == normalized)
        {
            return Some(media_type);
        }
    }

    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    ACCEPTED_TYPES
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension.as_str()))
        .map(|(media_type, _)| *media_type)
}

fn extension_for_media_type(media_type: &str) -> Option<&'static str> {
    ACCEPTED_TYPES
        .iter()
        .find(|(accepted, _)| *accepted == media_type)
        .and_then(|(_, extensions)| extensions.first().copied())
}

fn media_type_for_reference(reference: &str) -> &'static str {
    reference
        .rsplit_once('.')
        .and_then(|(_, extension)| {
            let extension = extension.to_ascii_lowercase();
            ACCEPTED_TYPES
                .iter()
                .find(|(_, extensions)| extensions.contains(&extension.as_str()))
                .map(|(media_type, _)| *media_type)
        })
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> UploadConfig {
        UploadConfig {
            dir: temp_dir.path().to_string_lossy().into_owned(),
            max_size_bytes: 5 * 1024 * 1024,
        }
    }

    fn pdf_upload() -> Upload {
        Upload {
            file_name: "quote.pdf".to_owned(),
            media_type: Some("application/pdf".to_owned()),
            bytes: b"%PDF-1.7 test payload".to_vec(),
        }
    }

    #[tokio::test]
    async fn ingest_writes_blob_and_returns_reference() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let attachment = ingest(&config, pdf_upload()).await.unwrap();

        assert!(attachment.reference.ends_with(".pdf"));
        assert_eq!(attachment.name, "quote.pdf");
        assert_eq!(attachment.media_type, "application/pdf");
        assert_eq!(attachment.size_bytes, 21);

        let stored = std::fs::read(temp_dir.path().join(&attachment.reference)).unwrap();
        assert_eq!(stored, b"%PDF-1.7 test payload");
    }

    #[tokio::test]
    async fn ingest_creates_the_upload_directory_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let config = UploadConfig {
            dir: temp_dir
                .path()
                .join("nested")
                .join("blobs")
                .to_string_lossy()
                .into_owned(),
            max_size_bytes: 1024,
        };

        let attachment = ingest(&config, pdf_upload()).await.unwrap();
        assert!(Path::new(&config.dir).join(&attachment.reference).exists());
    }

    #[tokio::test]
    async fn ingest_rejects_empty_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let err = ingest(
            &config,
            Upload {
                file_name: "empty.pdf".to_owned(),
                media_type: Some("application/pdf".to_owned()),
                bytes: Vec::new(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MessagingError::Upload(_)));
    }

    #[tokio::test]
    async fn ingest_rejects_files_over_the_size_ceiling() {
        let temp_dir = TempDir::new().unwrap();
        let config = UploadConfig {
            dir: temp_dir.path().to_string_lossy().into_owned(),
            max_size_bytes: 16,
        };

        let err = ingest(
            &config,
            Upload {
                file_name: "big.pdf".to_owned(),
                media_type: Some("application/pdf".to_owned()),
                bytes: vec![0u8; 17],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MessagingError::Upload(_)));

        let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 0, "rejected uploads must not leave files behind");
    }

    #[tokio::test]
    async fn ingest_rejects_unsupported_types() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let err = ingest(
            &config,
            Upload {
                file_name: "archive.zip".to_owned(),
                media_type: Some("application/zip".to_owned()),
                bytes: b"PK\x03\x04".to_vec(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MessagingError::Upload(_)));
    }

    #[tokio::test]
    async fn ingest_rejects_overlong_file_names() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let err = ingest(
            &config,
            Upload {
                file_name: format!("{}.pdf", "a".repeat(300)),
                media_type: Some("application/pdf".to_owned()),
                bytes: b"data".to_vec(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MessagingError::Upload(_)));
    }

    #[tokio::test]
    async fn ingest_falls_back_to_the_extension_for_generic_declarations() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let attachment = ingest(
            &config,
            Upload {
                file_name: "contract.docx".to_owned(),
                media_type: Some("application/octet-stream".to_owned()),
                bytes: b"fake docx".to_vec(),
            },
        )
        .await
        .unwrap();

        assert_eq!(
            attachment.media_type,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert!(attachment.reference.ends_with(".docx"));
    }

    #[tokio::test]
    async fn ingest_honors_declared_type_with_parameters() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let attachment = ingest(
            &config,
            Upload {
                file_name: "notes".to_owned(),
                media_type: Some("text/plain; charset=utf-8".to_owned()),
                bytes: b"hello".to_vec(),
            },
        )
        .await
        .unwrap();

        assert_eq!(attachment.media_type, "text/plain");
        assert!(attachment.reference.ends_with(".txt"));
    }

    #[tokio::test]
    async fn ingest_generates_distinct_references_for_identical_uploads() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let first = ingest(&config, pdf_upload()).await.unwrap();
        let second = ingest(&config, pdf_upload()).await.unwrap();
        assert_ne!(first.reference, second.reference);
    }

    #[tokio::test]
    async fn open_blob_returns_stored_bytes_and_media_type() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let attachment = ingest(&config, pdf_upload()).await.unwrap();
        let blob = open_blob(&config, &attachment.reference).await.unwrap();

        assert_eq!(blob.bytes, b"%PDF-1.7 test payload");
        assert_eq!(blob.media_type, "application/pdf");
    }

    #[tokio::test]
    async fn open_blob_refuses_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        std::fs::write(temp_dir.path().join("secret.txt"), b"secret").unwrap();

        for reference in ["../secret.txt", "a/b.pdf", "..\\up.pdf", "..", ""] {
            let err = open_blob(&config, reference).await.unwrap_err();
            assert!(
                matches!(err, MessagingError::NotFound),
                "reference {reference:?} must be refused"
            );
        }
    }

    #[tokio::test]
    async fn open_blob_reports_missing_blobs_as_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let err = open_blob(&config, "nonexistent.pdf").await.unwrap_err();
        assert!(matches!(err, MessagingError::NotFound));
    }
}
