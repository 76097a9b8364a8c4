//! The progress-reporting seam.

use crate::unpack::RunSummary;
use std::fmt;

/// A step in the overall unpack process. Each step is entered exactly once
/// per run, in declaration order; the initial "started" state has no signal
/// of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStep {
    /// The game content folder was located, but unpacking hasn't started yet.
    GameFound,
    /// The decoding runtime is being prepared.
    LoadingRuntime,
    /// The files are being unpacked.
    Unpacking,
    /// The overall unpack process completed.
    Done,
}

/// An error code indicating why unpacking failed for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackFailedReason {
    /// The loader could not decode the raw container.
    ReadError,
    /// The container decoded, but no writer handles the resulting value.
    UnsupportedFileType,
    /// A writer matched but failed during conversion.
    WriteError,
    /// Any other unexpected fault during dispatch or conversion.
    UnknownError,
}

impl fmt::Display for UnpackFailedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnpackFailedReason::ReadError => "read error",
            UnpackFailedReason::UnsupportedFileType => "unsupported file type",
            UnpackFailedReason::WriteError => "write error",
            UnpackFailedReason::UnknownError => "unknown error",
        };
        write!(f, "{name}")
    }
}

/// Receives updates while the unpacker is running.
///
/// All methods have empty defaults so embedders only implement the signals
/// they care about.
pub trait ProgressReporter {
    /// An error prevented the unpack from starting (e.g. content folder
    /// missing). Fatal; signalled at most once, before any step.
    fn on_start_error(&mut self, _error: &str) {}

    /// The overall process entered a new step.
    fn on_step_changed(&mut self, _step: ProgressStep, _message: &str) {}

    /// A file is about to be decoded.
    fn on_file_unpacking(&mut self, _relative_path: &str) {}

    /// A file couldn't be unpacked. A verbatim copy of the original
    /// container was exported instead.
    fn on_file_unpack_failed(
        &mut self,
        _relative_path: &str,
        _reason: UnpackFailedReason,
        _message: &str,
    ) {
    }

    /// The run finished (after the `Done` step).
    fn on_ended(&mut self, _summary: &RunSummary) {}
}

/// A reporter that ignores every signal.
pub struct NullReporter;

impl ProgressReporter for NullReporter {}
