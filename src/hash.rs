//! Integrity hashes for media descriptors.
//!
//! Layout never performs I/O. Descriptors that arrive without a hash can be
//! completed beforehand with [`fill_missing_hashes`], which reads bytes
//! through a [`MediaSource`]. A read that fails or finds nothing leaves the
//! hash empty and the summary prints the manifest placeholder instead.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::model::MediaDescriptor;

/// Where media bytes come from.
pub trait MediaSource {
    /// Bytes for a descriptor, or `None` if the source does not have them.
    fn read(&self, descriptor: &MediaDescriptor) -> io::Result<Option<Vec<u8>>>;
}

/// Media stored as files in one directory, named by descriptor id or by
/// original file name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate paths, in lookup order. Names that would escape the
    /// directory are skipped.
    fn candidates(&self, descriptor: &MediaDescriptor) -> Vec<PathBuf> {
        [descriptor.id.as_str(), descriptor.original_name.as_str()]
            .into_iter()
            .map(str::trim)
            .filter(|name| is_plain_file_name(name))
            .map(|name| self.root.join(name))
            .collect()
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

impl MediaSource for DirectorySource {
    fn read(&self, descriptor: &MediaDescriptor) -> io::Result<Option<Vec<u8>>> {
        for path in self.candidates(descriptor) {
            match std::fs::read(&path) {
                Ok(bytes) => return Ok(Some(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

/// Lowercase hex SHA-256.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compute hashes for descriptors that have none. Returns how many were
/// filled in.
pub fn fill_missing_hashes(media: &mut [MediaDescriptor], source: &dyn MediaSource) -> usize {
    let mut filled = 0;
    for descriptor in media.iter_mut() {
        if descriptor.hash.as_deref().is_some_and(|h| !h.trim().is_empty()) {
            continue;
        }
        match source.read(descriptor) {
            Ok(Some(bytes)) => {
                descriptor.hash = Some(sha256_hex(&bytes));
                filled += 1;
                debug!(id = %descriptor.id, size = bytes.len(), "hashed media");
            }
            Ok(None) => {
                debug!(id = %descriptor.id, "media bytes not available; hash left to manifest");
            }
            Err(e) => {
                warn!(id = %descriptor.id, error = %e, "reading media failed; hash left to manifest");
            }
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaKind;

    fn descriptor(id: &str, name: &str, hash: Option<&str>) -> MediaDescriptor {
        MediaDescriptor {
            id: id.to_string(),
            message_id: None,
            original_name: name.to_string(),
            content_type: String::new(),
            hash: hash.map(str::to_string),
            kind: MediaKind::Attachment,
        }
    }

    struct FailingSource;

    impl MediaSource for FailingSource {
        fn read(&self, _: &MediaDescriptor) -> io::Result<Option<Vec<u8>>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn reads_by_id_then_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m1"), b"first").unwrap();
        std::fs::write(dir.path().join("photo.jpg"), b"second").unwrap();

        let mut media = vec![
            descriptor("m1", "ignored.jpg", None),
            descriptor("m2", "photo.jpg", None),
            descriptor("m3", "missing.jpg", None),
        ];
        let filled = fill_missing_hashes(&mut media, &DirectorySource::new(dir.path()));

        assert_eq!(filled, 2);
        assert_eq!(media[0].hash.as_deref(), Some(sha256_hex(b"first").as_str()));
        assert_eq!(media[1].hash.as_deref(), Some(sha256_hex(b"second").as_str()));
        assert!(media[2].hash.is_none());
    }

    #[test]
    fn existing_hashes_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m1"), b"bytes").unwrap();
        let mut media = vec![descriptor("m1", "", Some("precomputed"))];
        assert_eq!(fill_missing_hashes(&mut media, &DirectorySource::new(dir.path())), 0);
        assert_eq!(media[0].hash.as_deref(), Some("precomputed"));
    }

    #[test]
    fn failed_reads_degrade() {
        let mut media = vec![descriptor("m1", "a.pdf", None)];
        assert_eq!(fill_missing_hashes(&mut media, &FailingSource), 0);
        assert!(media[0].hash.is_none());
    }

    #[test]
    fn path_like_names_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        let d = descriptor("../secret", "/etc/passwd", None);
        assert!(source.candidates(&d).is_empty());
    }
}
