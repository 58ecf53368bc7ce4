//! Input file fingerprints for dataset provenance

use crate::error::{Result, TinxError};
use crate::types::{ChecksumAlgorithm, FileFingerprint};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Compute the checksum of a file on disk
pub fn compute_file_checksum(
    path: impl AsRef<Path>,
    algorithm: ChecksumAlgorithm,
) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_checksum(&mut file, algorithm)
}

/// Compute the checksum of any readable source
pub fn compute_checksum<R: Read>(reader: &mut R, algorithm: ChecksumAlgorithm) -> Result<String> {
    match algorithm {
        ChecksumAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            std::io::copy(reader, &mut hasher)?;
            Ok(hex::encode(hasher.finalize()))
        },
    }
}

/// Fingerprint a file: path, size and SHA-256 digest
pub fn fingerprint_file(path: impl AsRef<Path>) -> Result<FileFingerprint> {
    let path = path.as_ref();
    let size = std::fs::metadata(path)?.len();
    let checksum = compute_file_checksum(path, ChecksumAlgorithm::Sha256)?;

    Ok(FileFingerprint {
        path: path.display().to_string(),
        algorithm: ChecksumAlgorithm::Sha256,
        checksum,
        size,
    })
}

/// Verify that a file still matches a previously recorded fingerprint
pub fn verify_fingerprint(fingerprint: &FileFingerprint) -> Result<()> {
    let actual = compute_file_checksum(&fingerprint.path, fingerprint.algorithm)?;
    if actual == fingerprint.checksum {
        Ok(())
    } else {
        Err(TinxError::ChecksumMismatch {
            expected: fingerprint.checksum.clone(),
            actual,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_compute_checksum_sha256() {
        let mut cursor = Cursor::new(b"hello world");
        let checksum = compute_checksum(&mut cursor, ChecksumAlgorithm::Sha256).unwrap();
        assert_eq!(checksum, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }

    #[test]
    fn test_fingerprint_and_verify() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ENSP001\t10 11\n").unwrap();

        let fingerprint = fingerprint_file(file.path()).unwrap();
        assert_eq!(fingerprint.size, 14);
        assert!(verify_fingerprint(&fingerprint).is_ok());

        file.write_all(b"ENSP002\t12\n").unwrap();
        assert!(matches!(
            verify_fingerprint(&fingerprint),
            Err(TinxError::ChecksumMismatch { .. })
        ));
    }
}
