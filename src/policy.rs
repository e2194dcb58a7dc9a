//! The staleness policy: may a conversion proceed for this output location?
//!
//! A single decision function, recomputed fresh from live re-hashes on every
//! invocation — there is no persistent state machine, so the decision can
//! never drift from what is actually on disk.
//!
//! Check order matters. Input-unchanged is tested *before* output-tampered:
//! the unchanged input is the expected steady state of idempotent re-runs
//! and must stay cheap and quiet, while a tampered output only matters once
//! the input has actually changed (if the input is the same there is nothing
//! to regenerate, edits or not).
//!
//! A corrupt sidecar is a hard failure here, not "treat as never converted":
//! silently reconverting over a directory whose record we cannot read risks
//! clobbering an output whose tamper state is unknown. `force` still
//! bypasses everything, including the corrupt-sidecar check.

use crate::error::Note2MdError;
use crate::hash;
use crate::metadata;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of a staleness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Conversion may proceed.
    Proceed,
    /// Conversion must not proceed; the reason says how loudly to report it.
    Refuse(RefuseReason),
}

/// Why a conversion was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefuseReason {
    /// The input is byte-identical to the last successful conversion.
    InputUnchanged { input: PathBuf },
    /// The generated output was edited out-of-band since generation.
    OutputTampered { output: PathBuf },
}

impl RefuseReason {
    /// Convert into the typed, catchable error the orchestrator returns.
    pub fn into_error(self) -> Note2MdError {
        match self {
            RefuseReason::InputUnchanged { input } => Note2MdError::InputUnchanged { input },
            RefuseReason::OutputTampered { output } => Note2MdError::OutputTampered { output },
        }
    }
}

/// Decide whether a conversion targeting `output_dir` may proceed.
///
/// 1. `force` → always [`Decision::Proceed`] (the caller reports the override).
/// 2. No sidecar record → proceed (first-time conversion).
/// 3. Live input hash equals the stored snapshot → refuse `InputUnchanged`.
/// 4. Live output hash differs from the stored snapshot → refuse `OutputTampered`.
/// 5. Otherwise proceed: the input changed and the output is still exactly
///    what we generated, so regenerating discards nothing.
///
/// If the sidecar references an output file that no longer exists, there is
/// nothing left to protect and the conversion proceeds (after step 3).
pub fn should_convert(output_dir: &Path, force: bool) -> Result<Decision, Note2MdError> {
    if force {
        return Ok(Decision::Proceed);
    }

    let Some(meta) = metadata::read(output_dir)? else {
        debug!("No sidecar record in {}; first-time conversion", output_dir.display());
        return Ok(Decision::Proceed);
    };

    let live_input = hash::hash_file(&meta.input_file)?;
    if live_input == meta.input_hash {
        debug!("Input {} unchanged since last run", meta.input_file.display());
        return Ok(Decision::Refuse(RefuseReason::InputUnchanged {
            input: meta.input_file,
        }));
    }

    if !meta.output_file.exists() {
        debug!(
            "Output {} referenced by sidecar is gone; regenerating",
            meta.output_file.display()
        );
        return Ok(Decision::Proceed);
    }

    let live_output = hash::hash_file(&meta.output_file)?;
    if live_output != meta.output_hash {
        warn!(
            "Output {} was modified out-of-band since generation",
            meta.output_file.display()
        );
        return Ok(Decision::Refuse(RefuseReason::OutputTampered {
            output: meta.output_file,
        }));
    }

    Ok(Decision::Proceed)
}
