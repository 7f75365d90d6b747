//! Integrity checks applied to a downloaded archive before extraction.
//!
//! The checks are deliberately shallow: the payload must be non-empty,
//! start with the zip local-file signature, and survive the trip to the
//! scratch directory at its full length. Nothing here touches the install
//! directory.

use std::path::{Path, PathBuf};

/// Leading bytes of every zip container (`PK`).
pub const ZIP_SIGNATURE: [u8; 2] = [0x50, 0x4B];

/// Shortest payload that can carry a zip signature record.
const MIN_PAYLOAD_LEN: usize = 4;

/// Errors raised by payload integrity checks.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    /// The downloaded payload has no bytes.
    #[error("downloaded payload is empty")]
    EmptyPayload,

    /// The payload is too short or lacks the zip signature.
    #[error("payload is not a zip archive (bad signature)")]
    BadSignature,

    /// The staged file length differs from the downloaded length.
    #[error("staged archive {path} is {on_disk} bytes, expected {expected}")]
    SizeMismatch {
        /// The staged file.
        path: PathBuf,
        /// Length of the in-memory payload.
        expected: u64,
        /// Length reported by the filesystem.
        on_disk: u64,
    },

    /// Writing or inspecting the staged file failed.
    #[error("failed to stage archive {path}: {source}")]
    Stage {
        /// The staged file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Check that `bytes` is a non-empty payload carrying the zip signature.
///
/// Emptiness is reported before the signature check.
///
/// # Errors
///
/// Returns [`IntegrityError::EmptyPayload`] or
/// [`IntegrityError::BadSignature`].
///
/// # Examples
///
/// ```
/// use loader_installer::artefact::integrity::{IntegrityError, validate_payload};
///
/// assert!(validate_payload(b"PK\x03\x04rest").is_ok());
/// assert!(matches!(validate_payload(b""), Err(IntegrityError::EmptyPayload)));
/// assert!(matches!(validate_payload(b"PK"), Err(IntegrityError::BadSignature)));
/// ```
pub fn validate_payload(bytes: &[u8]) -> Result<(), IntegrityError> {
    if bytes.is_empty() {
        return Err(IntegrityError::EmptyPayload);
    }
    if bytes.len() < MIN_PAYLOAD_LEN || !bytes.starts_with(&ZIP_SIGNATURE) {
        return Err(IntegrityError::BadSignature);
    }
    Ok(())
}

/// Check that the file at `path` is exactly `expected` bytes long.
///
/// # Errors
///
/// Returns [`IntegrityError::SizeMismatch`] on a length difference and
/// [`IntegrityError::Stage`] when the file cannot be inspected.
pub fn verify_written_size(path: &Path, expected: u64) -> Result<(), IntegrityError> {
    let on_disk = std::fs::metadata(path)
        .map_err(|source| IntegrityError::Stage {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if on_disk != expected {
        return Err(IntegrityError::SizeMismatch {
            path: path.to_path_buf(),
            expected,
            on_disk,
        });
    }
    Ok(())
}

/// Write `bytes` to `dir/file_name` and confirm the written length.
///
/// `file_name` is usually built from a release tag and asset name, so path
/// separators and drive colons in it are replaced with `_`; the staged file
/// always lands directly inside `dir`.
///
/// # Errors
///
/// Returns [`IntegrityError::Stage`] if the write fails and
/// [`IntegrityError::SizeMismatch`] if the file comes back short.
pub fn stage_payload(bytes: &[u8], dir: &Path, file_name: &str) -> Result<PathBuf, IntegrityError> {
    let path = dir.join(flatten_file_name(file_name));
    std::fs::write(&path, bytes).map_err(|source| IntegrityError::Stage {
        path: path.clone(),
        source,
    })?;
    verify_written_size(&path, bytes.len() as u64)?;
    log::debug!("staged {} bytes at {}", bytes.len(), path.display());
    Ok(path)
}

fn flatten_file_name(file_name: &str) -> String {
    let flattened: String = file_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    match flattened.as_str() {
        "" | "." | ".." => "payload.zip".to_owned(),
        _ => flattened,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(b"", "EmptyPayload")]
    #[case::one_byte(b"P", "BadSignature")]
    #[case::signature_only(b"PK", "BadSignature")]
    #[case::three_bytes(b"PK\x03", "BadSignature")]
    #[case::wrong_magic(b"MZ\x90\x00", "BadSignature")]
    #[case::gzip_magic(b"\x1f\x8b\x08\x00", "BadSignature")]
    fn rejects_invalid_payloads(#[case] bytes: &[u8], #[case] expected: &str) {
        let err = validate_payload(bytes).expect_err("payload should be rejected");
        let kind = match err {
            IntegrityError::EmptyPayload => "EmptyPayload",
            IntegrityError::BadSignature => "BadSignature",
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(kind, expected);
    }

    #[test]
    fn accepts_minimal_zip_header() {
        assert!(validate_payload(&[0x50, 0x4B, 0x05, 0x06]).is_ok());
    }

    #[test]
    fn stage_payload_writes_full_length() {
        let temp = tempfile::tempdir().expect("temp dir");
        let payload = b"PK\x03\x04payload";
        let path = stage_payload(payload, temp.path(), "1.0.0-loader.zip").expect("staged");
        assert_eq!(std::fs::read(&path).expect("read back"), payload);
    }

    #[rstest]
    #[case::slash_in_tag("loader/0.6.2-Loader.x64.zip", "loader_0.6.2-Loader.x64.zip")]
    #[case::parent_segments("../../0.6.2-Loader.x64.zip", ".._.._0.6.2-Loader.x64.zip")]
    #[case::backslash_and_drive(r"C:\loader.zip", "C__loader.zip")]
    #[case::bare_parent("..", "payload.zip")]
    fn stage_payload_stays_inside_dir(#[case] file_name: &str, #[case] staged_as: &str) {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = temp.path().join("scratch");
        std::fs::create_dir(&dir).expect("scratch dir");

        let path = stage_payload(b"PK\x03\x04", &dir, file_name).expect("staged");

        assert_eq!(path, dir.join(staged_as));
        assert_eq!(
            std::fs::read_dir(temp.path()).expect("list temp").count(),
            1,
            "nothing written beside the scratch directory"
        );
    }

    #[test]
    fn truncated_stage_file_is_size_mismatch() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("loader.zip");
        let payload = [0x50, 0x4B, 3, 4, 5, 6, 7, 8, 9, 10];
        std::fs::write(&path, payload).expect("write payload");
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("open staged file");
        file.set_len(8).expect("truncate");

        let err = verify_written_size(&path, payload.len() as u64).expect_err("mismatch");
        assert!(matches!(
            err,
            IntegrityError::SizeMismatch {
                expected: 10,
                on_disk: 8,
                ..
            }
        ));
    }

    #[test]
    fn missing_stage_file_is_stage_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        let err = verify_written_size(&temp.path().join("absent.zip"), 4).expect_err("missing");
        assert!(matches!(err, IntegrityError::Stage { .. }));
    }
}
