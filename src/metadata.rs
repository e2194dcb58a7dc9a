//! The conversion-metadata sidecar: one hidden YAML record per output
//! directory, mapping an input file to its generated document.
//!
//! The record stores hashes of *both* files as they existed at write time.
//! `input_hash` is the snapshot future runs compare against to detect input
//! changes; `output_hash` detects out-of-band edits to the generated Markdown
//! (hand-tweaks the user would not want silently overwritten).
//!
//! The sidecar lives next to the output (one record per output location, not
//! per input), so inputs rendering into different directories never collide.
//! It is overwritten wholesale on every successful conversion and never
//! deleted automatically. Two processes racing on the *same* output location
//! can interleave read-modify-write — there is no locking; this is a known
//! gap, not a solved problem.

use crate::error::Note2MdError;
use crate::hash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the hidden sidecar file, colocated with the generated document.
pub const SIDECAR_FILENAME: &str = ".note2md.metadata.yaml";

/// One record per output directory; written only after a successful
/// conversion has fully landed on disk.
///
/// Unknown keys in the YAML are ignored for forward compatibility; missing
/// required keys fail with [`Note2MdError::CorruptMetadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMetadata {
    /// Source file that was converted.
    pub input_file: PathBuf,
    /// Hash of `input_file`'s bytes at the time of the last successful conversion.
    pub input_hash: String,
    /// Path to the generated document.
    pub output_file: PathBuf,
    /// Hash of `output_file`'s bytes at the time it was written.
    pub output_hash: String,
}

/// Path of the sidecar record for a given output directory.
pub fn sidecar_path(output_dir: &Path) -> PathBuf {
    output_dir.join(SIDECAR_FILENAME)
}

/// Load the sidecar record for `output_dir`, if one exists.
///
/// Absent means "never converted" and is not an error. A file that exists
/// but does not parse into the expected shape is [`Note2MdError::CorruptMetadata`].
pub fn read(output_dir: &Path) -> Result<Option<ConversionMetadata>, Note2MdError> {
    let path = sidecar_path(output_dir);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Note2MdError::io(&path, e)),
    };

    let metadata: ConversionMetadata =
        serde_yaml::from_str(&raw).map_err(|e| Note2MdError::CorruptMetadata {
            path: path.clone(),
            detail: e.to_string(),
        })?;

    debug!("Loaded sidecar record from {}", path.display());
    Ok(Some(metadata))
}

/// Hash both files as they currently exist on disk and persist a fresh
/// record, replacing any prior one at that location.
///
/// Must be called only after `output_file` (and any page images) reached
/// their final state — the output must be flushed and closed first, or the
/// stored `output_hash` will not match what future runs see.
pub fn write(input_file: &Path, output_file: &Path) -> Result<ConversionMetadata, Note2MdError> {
    let output_dir = output_file.parent().ok_or_else(|| {
        Note2MdError::Internal(format!(
            "output file '{}' has no parent directory",
            output_file.display()
        ))
    })?;

    let metadata = ConversionMetadata {
        input_file: input_file.to_path_buf(),
        input_hash: hash::hash_file(input_file)?,
        output_file: output_file.to_path_buf(),
        output_hash: hash::hash_file(output_file)?,
    };

    let path = sidecar_path(output_dir);
    let yaml = serde_yaml::to_string(&metadata)
        .map_err(|e| Note2MdError::Internal(format!("sidecar serialisation failed: {e}")))?;
    std::fs::write(&path, yaml).map_err(|e| Note2MdError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    })?;

    debug!("Wrote sidecar record to {}", path.display());
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("source.note");
        let output = dir.path().join("output.md");
        std::fs::write(&input, b"original content").unwrap();
        std::fs::write(&output, b"# Original markdown").unwrap();
        (dir, input, output)
    }

    #[test]
    fn absent_sidecar_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read(dir.path()).unwrap(), None);
    }

    #[test]
    fn write_then_read_round_trips() {
        let (dir, input, output) = fixture();
        let written = write(&input, &output).unwrap();

        assert!(sidecar_path(dir.path()).exists());
        let loaded = read(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, written);
        assert_eq!(loaded.input_file, input);
        assert_eq!(loaded.output_file, output);
        assert_eq!(loaded.input_hash, hash::hash_bytes(b"original content"));
        assert_eq!(loaded.output_hash, hash::hash_bytes(b"# Original markdown"));
    }

    #[test]
    fn write_overwrites_prior_record() {
        let (dir, input, output) = fixture();
        write(&input, &output).unwrap();

        std::fs::write(&input, b"changed content").unwrap();
        let second = write(&input, &output).unwrap();

        let loaded = read(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, second);
        assert_eq!(loaded.input_hash, hash::hash_bytes(b"changed content"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let (dir, input, output) = fixture();
        let yaml = format!(
            "input_file: {}\ninput_hash: aaaa\noutput_file: {}\noutput_hash: bbbb\nfuture_key: whatever\n",
            input.display(),
            output.display()
        );
        std::fs::write(sidecar_path(dir.path()), yaml).unwrap();

        let loaded = read(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.input_hash, "aaaa");
        assert_eq!(loaded.output_hash, "bbbb");
    }

    #[test]
    fn missing_required_key_is_corrupt() {
        let (dir, input, _output) = fixture();
        let yaml = format!("input_file: {}\ninput_hash: aaaa\n", input.display());
        std::fs::write(sidecar_path(dir.path()), yaml).unwrap();

        let err = read(dir.path()).unwrap_err();
        assert!(matches!(err, Note2MdError::CorruptMetadata { .. }), "got: {err}");
    }

    #[test]
    fn unparsable_yaml_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(sidecar_path(dir.path()), ":[ this is not yaml {{{").unwrap();

        let err = read(dir.path()).unwrap_err();
        assert!(matches!(err, Note2MdError::CorruptMetadata { .. }));
    }
}
