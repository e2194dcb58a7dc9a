//! Content hashing for change detection.
//!
//! SHA-1 over the whole file, hex-encoded. SHA-1 is plenty for detecting
//! "did this file change since last run" — we are not defending against an
//! adversary crafting collisions, and the digest is part of the on-disk
//! sidecar format, so it stays stable across releases.
//!
//! The whole file is read; no sampling. A notebook edit can touch a single
//! stroke deep inside the container, and sampling would miss it.

use crate::error::Note2MdError;
use sha1::{Digest, Sha1};
use std::path::Path;

/// Hash a byte slice to a lowercase hex SHA-1 digest.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash a file's full contents to a lowercase hex SHA-1 digest.
pub fn hash_file(path: &Path) -> Result<String, Note2MdError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Note2MdError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Note2MdError::io(path, e)
        }
    })?;
    Ok(hash_bytes(&bytes))
}
