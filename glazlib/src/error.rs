//! Translation of GlazLib status codes into Rust errors.
//!
//! Every native call that reports a status is checked with [`NativeFailure::check`], which reads
//! the library's last error message straight away, before any other call can overwrite it. The
//! resulting [`NativeFailure`] is then wrapped in a [`GlazError`] variant that says which kind of
//! operation failed.
use std::ffi::c_int;
use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use glazlib_sys::{LoadError, NativeLibrary};
use thiserror::Error;

use crate::settings::Parameter;
use crate::wrap::SessionState;

/// The status codes GlazLib documents, plus [`Status::Unrecognised`] for anything else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// No problem, move along
    Ok,
    NotInitialised,
    Script,
    ConnectingToCameras,
    DownloadingCalibrations,
    InvalidWavelengths,
    InvalidAveraging,
    InvalidScanCount,
    InvalidTriggerMode,
    InvalidTriggerDelay,
    InvalidIntegrationTime,
    InvalidScanClockSpeed,
    /// A setting is valid on its own but not in combination with the others, e.g. an internal
    /// trigger frequency while the trigger mode is external
    InvalidSettings,
    CapturingBackgrounds,
    RunningMeasurement,
    InvalidCalculationIndex,
    InvalidResultDataSize,
    InvalidPdNumber,
    InvalidPdChannel,
    InvalidCameraNumber,
    InvalidTriggerFrequency,
    NoMeasurementRun,
    InitialisingSingleDevice,
    InvalidSingleDeviceType,
    InvalidSyncOutMode,
    InvalidIntegrationMode,
    ClockSpeedUnsupported,
    InvalidAuxOutMode,
    CycleCountUnsupported,
    InvalidCycleCount,
    InvalidTestMode,
    OutPolarityNotSupported,
    InvalidOutPolarity,
    ResolutionOutOfRange,
    ResolutionNotSupported,
    RunningUsbCommsTest,
    MeasurementStream,
    AuxStatesNotSupported,
    IntegrationTimeNotSupported,
    InvalidAdcGain,
    AuxCycleCountInvalid,
    /// A code this crate does not know about, presumably from a newer library
    Unrecognised,
}

/// Indexed by native status code
const STATUS_TABLE: [(Status, &str); 41] = [
    (Status::Ok, "no error"),
    (Status::NotInitialised, "session not initialised"),
    (Status::Script, "error in configuration script"),
    (Status::ConnectingToCameras, "could not connect to the detectors"),
    (Status::DownloadingCalibrations, "could not download calibrations"),
    (Status::InvalidWavelengths, "invalid wavelength range"),
    (Status::InvalidAveraging, "invalid hardware averaging"),
    (Status::InvalidScanCount, "invalid scan count"),
    (Status::InvalidTriggerMode, "invalid trigger mode"),
    (Status::InvalidTriggerDelay, "invalid trigger delay"),
    (Status::InvalidIntegrationTime, "invalid integration time"),
    (Status::InvalidScanClockSpeed, "invalid scan clock speed"),
    (Status::InvalidSettings, "invalid combination of settings"),
    (Status::CapturingBackgrounds, "error capturing backgrounds"),
    (Status::RunningMeasurement, "error running measurement"),
    (Status::InvalidCalculationIndex, "invalid result index"),
    (Status::InvalidResultDataSize, "invalid result data size"),
    (Status::InvalidPdNumber, "invalid photodiode number"),
    (Status::InvalidPdChannel, "invalid photodiode channel"),
    (Status::InvalidCameraNumber, "invalid detector number"),
    (Status::InvalidTriggerFrequency, "invalid trigger frequency"),
    (Status::NoMeasurementRun, "no measurement has been run"),
    (Status::InitialisingSingleDevice, "error initialising single device"),
    (Status::InvalidSingleDeviceType, "invalid single device type"),
    (Status::InvalidSyncOutMode, "invalid sync output mode"),
    (Status::InvalidIntegrationMode, "invalid integration mode"),
    (Status::ClockSpeedUnsupported, "scan clock speed not supported by this device"),
    (Status::InvalidAuxOutMode, "invalid aux output mode"),
    (Status::CycleCountUnsupported, "output cycle count not supported by this device"),
    (Status::InvalidCycleCount, "invalid output cycle count"),
    (Status::InvalidTestMode, "invalid test mode"),
    (Status::OutPolarityNotSupported, "output polarity not supported by this device"),
    (Status::InvalidOutPolarity, "invalid output polarity"),
    (Status::ResolutionOutOfRange, "resolution out of range"),
    (Status::ResolutionNotSupported, "resolution not supported by this device"),
    (Status::RunningUsbCommsTest, "USB communications test failed"),
    (Status::MeasurementStream, "measurement stream error"),
    (Status::AuxStatesNotSupported, "aux states not supported by this device"),
    (Status::IntegrationTimeNotSupported, "integration time not supported by this device"),
    (Status::InvalidAdcGain, "invalid ADC gain"),
    (Status::AuxCycleCountInvalid, "invalid aux cycle count"),
];

impl From<c_int> for Status {
    fn from(code: c_int) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|i| STATUS_TABLE.get(i))
            .map(|(status, _)| *status)
            .unwrap_or(Status::Unrecognised)
    }
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Ok
    }

    /// A short fixed description, for when the native message is empty
    pub fn description(self) -> &'static str {
        STATUS_TABLE
            .iter()
            .find(|(status, _)| *status == self)
            .map(|(_, text)| *text)
            .unwrap_or("unrecognised error")
    }

    /// Whether the device model in use lacks the requested feature, as opposed to the
    /// requested value being out of range
    pub fn is_unsupported(self) -> bool {
        matches!(
            self,
            Status::ClockSpeedUnsupported
                | Status::CycleCountUnsupported
                | Status::OutPolarityNotSupported
                | Status::ResolutionNotSupported
                | Status::AuxStatesNotSupported
                | Status::IntegrationTimeNotSupported
        )
    }

    /// Whether the failure came from talking to the hardware rather than from the arguments
    pub fn is_communication(self) -> bool {
        matches!(
            self,
            Status::ConnectingToCameras
                | Status::DownloadingCalibrations
                | Status::RunningUsbCommsTest
                | Status::MeasurementStream
        )
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A non-success status from a native call, together with the message the library left for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFailure {
    /// The native entry point that failed
    pub operation: &'static str,
    pub code: c_int,
    pub status: Status,
    pub message: String,
}

impl NativeFailure {
    /// Turn the status returned by `operation` into a `Result`. On failure the native error
    /// message is read immediately.
    pub(crate) fn check(
        library: &NativeLibrary,
        operation: &'static str,
        code: c_int,
    ) -> Result<(), NativeFailure> {
        let status = Status::from(code);
        if status.is_success() {
            return Ok(());
        }
        let message = library.last_error_message();
        tracing::debug!(operation, code, %message, "native call failed");
        Err(NativeFailure {
            operation,
            code,
            status,
            message,
        })
    }
}

impl Display for NativeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = if self.message.is_empty() {
            self.status.description()
        } else {
            self.message.as_str()
        };
        write!(f, "{} returned {} ({:?}): {}", self.operation, self.code, self.status, message)
    }
}

impl std::error::Error for NativeFailure {}

/// Convenience alias for results using [`GlazError`]
pub type GlazResult<T> = std::result::Result<T, GlazError>;

#[derive(Debug, Error)]
pub enum GlazError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to initialise session: {0}")]
    Initialization(NativeFailure),

    #[error("failed to set {parameter}: {failure}")]
    Configuration {
        parameter: Parameter,
        failure: NativeFailure,
    },

    #[error("acquisition failed: {0}")]
    Acquisition(NativeFailure),

    #[error("failed to retrieve data: {0}")]
    Retrieval(NativeFailure),

    #[error("failed to close session: {0}")]
    Close(NativeFailure),

    #[error("{0}")]
    Native(NativeFailure),

    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("configuration file {name} not found, looked in: {}", display_paths(.searched))]
    ConfigNotFound { name: String, searched: Vec<PathBuf> },

    #[error("path cannot be passed to GlazLib: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("{operation} did not complete within {waited:?}")]
    Timeout {
        operation: &'static str,
        waited: Duration,
    },

    #[error("{operation} reported {rows} x {cols} samples, which cannot be allocated")]
    BufferSize {
        operation: &'static str,
        rows: usize,
        cols: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl GlazError {
    /// The native failure behind this error, if it came from a status code
    pub fn failure(&self) -> Option<&NativeFailure> {
        match self {
            GlazError::Initialization(f)
            | GlazError::Acquisition(f)
            | GlazError::Retrieval(f)
            | GlazError::Close(f)
            | GlazError::Native(f)
            | GlazError::Configuration { failure: f, .. } => Some(f),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<Status> {
        self.failure().map(|f| f.status)
    }

    pub fn native_message(&self) -> Option<&str> {
        self.failure().map(|f| f.message.as_str())
    }

    /// True both when the session was already closed on the Rust side and when the library
    /// itself reported that it was not initialised
    pub fn is_not_initialised(&self) -> bool {
        match self {
            GlazError::InvalidState {
                state: SessionState::Closed,
                ..
            } => true,
            _ => self.status() == Some(Status::NotInitialised),
        }
    }
}
