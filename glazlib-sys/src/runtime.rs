use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use libloading::Library;
use thiserror::Error;

use crate::buffer::ErrorMessageBuffer;
use crate::ffi::{self, FunctionTable};

/// Environment variable naming the root of the native library tree
pub const LIBRARY_DIR_ENV: &str = "GLAZLIB_LIBRARY_DIR";

#[cfg(all(windows, target_pointer_width = "64"))]
const CANDIDATES: &[&str] = &["win64/GlazLib.dll", "win64-static/GlazLib.dll"];

#[cfg(all(windows, target_pointer_width = "32"))]
const CANDIDATES: &[&str] = &["win32/GlazLib.dll", "win32-static/GlazLib.dll"];

#[cfg(target_os = "linux")]
const CANDIDATES: &[&str] = &["linux64/libGlazLib.so.9.23.0"];

#[cfg(not(any(windows, target_os = "linux")))]
const CANDIDATES: &[&str] = &[];

/// Ways locating and opening the native library can fail
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("GlazLib is not distributed for platform {0}")]
    UnsupportedPlatform(&'static str),
    #[error("could not find the GlazLib library, looked in: {}", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("{} does not export {name}: {source}", .path.display())]
    MissingSymbol {
        path: PathBuf,
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A loaded copy of GlazLib: its resolved [`FunctionTable`] and whatever keeps the code behind
/// it mapped.
///
/// The table is only handed out by reference, so the pointers in it cannot outlive the
/// [`Library`] they were resolved from.
pub struct NativeLibrary {
    table: FunctionTable,
    path: Option<PathBuf>,
    _library: Option<Library>,
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .field("in_process", &self._library.is_none())
            .finish()
    }
}

macro_rules! resolve {
    ($library:expr, $path:expr, $name:literal, $ty:ty) => {{
        let symbol = unsafe { $library.get::<$ty>(concat!($name, "\0").as_bytes()) }.map_err(
            |source| LoadError::MissingSymbol {
                path: $path.to_path_buf(),
                name: $name,
                source,
            },
        )?;
        *symbol
    }};
}

impl NativeLibrary {
    /// Open the library at `path` and resolve every GlazLib entry point.
    ///
    /// # Safety
    /// Loading runs the library's initialisers, and the resolved symbols are trusted to have
    /// the signatures declared in [`ffi`]. Only point this at a genuine GlazLib build.
    pub unsafe fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let table = FunctionTable {
            get_version: resolve!(library, path, "getVersion", ffi::GetVersionFn),
            get_last_error_message: resolve!(library, path, "getLastErrorMessage", ffi::GetLastErrorMessageFn),
            get_usb_parameters: resolve!(library, path, "getUSBParameters", ffi::GetUsbParametersFn),
            set_usb_parameters: resolve!(library, path, "setUSBParameters", ffi::SetUsbParametersFn),
            enable_data_stream_log: resolve!(library, path, "enableDataStreamLog", ffi::EnableDataStreamLogFn),
            initialise_session: resolve!(library, path, "initialiseSession", ffi::InitialiseSessionFn),
            initialise_single_device_session: resolve!(
                library,
                path,
                "initialiseSingleDeviceSession",
                ffi::InitialiseSingleDeviceSessionFn
            ),
            close_session: resolve!(library, path, "closeSession", ffi::StatusFn),
            reset_all_devices: resolve!(library, path, "resetAllDevices", ffi::VoidFn),
            reset_all_ports: resolve!(library, path, "resetAllPorts", ffi::VoidFn),
            set_test_mode: resolve!(library, path, "setTestMode", ffi::SetIntFn),
            set_wavelengths: resolve!(library, path, "setWavelengths", ffi::SetWavelengthsFn),
            set_hardware_averaging: resolve!(library, path, "setHardwareAveraging", ffi::SetIntFn),
            set_resolution: resolve!(library, path, "setResolution", ffi::SetIntFn),
            set_scan_count: resolve!(library, path, "setScanCount", ffi::SetIntFn),
            set_scan_clock_speed: resolve!(library, path, "setScanClockSpeed", ffi::SetIntFn),
            set_adc_gain: resolve!(library, path, "setADCGain", ffi::SetIntFn),
            set_trigger_delay: resolve!(library, path, "setTriggerDelay", ffi::SetIntFn),
            set_trigger_mode: resolve!(library, path, "setTriggerMode", ffi::SetIntFn),
            set_internal_trigger_frequency: resolve!(
                library,
                path,
                "setInternalTriggerFrequency",
                ffi::SetDoubleFn
            ),
            set_integration_mode: resolve!(library, path, "setIntegrationMode", ffi::SetIntFn),
            set_integration_time: resolve!(library, path, "setIntegrationTime", ffi::SetIntFn),
            set_sync_out_mode: resolve!(library, path, "setSyncOutMode", ffi::SetIntFn),
            set_sync_out_polarity: resolve!(library, path, "setSyncOutPolarity", ffi::SetIntFn),
            set_aux_out_mode: resolve!(library, path, "setAuxOutMode", ffi::SetIntFn),
            set_aux_out_polarity: resolve!(library, path, "setAuxOutPolarity", ffi::SetIntFn),
            set_out_cycle_count: resolve!(library, path, "setOutCycleCount", ffi::SetIntFn),
            set_timeout: resolve!(library, path, "setTimeout", ffi::SetIntFn),
            capture_background: resolve!(library, path, "captureBackground", ffi::SetIntFn),
            run_measurement: resolve!(library, path, "runMeasurement", ffi::StatusFn),
            start_measurement: resolve!(library, path, "startMeasurement", ffi::StatusFn),
            is_measurement_done: resolve!(library, path, "isMeasurementDone", ffi::IsMeasurementDoneFn),
            get_result: resolve!(library, path, "getResult", ffi::GetResultFn),
            get_complex_result: resolve!(library, path, "getComplexResult", ffi::GetComplexResultFn),
            get_time_stamp: resolve!(library, path, "getTimeStamp", ffi::GetChannelValueFn),
            get_scan: resolve!(library, path, "getScan", ffi::GetScanFn),
            get_complex_scan: resolve!(library, path, "getComplexScan", ffi::GetComplexScanFn),
            get_all_scans_sizes: resolve!(library, path, "getAllScansSizes", ffi::GetAllScansSizesFn),
            get_all_scans: resolve!(library, path, "getAllScans", ffi::GetAllScansFn),
            write_all_scans_to_file: resolve!(
                library,
                path,
                "writeAllScansToFile",
                ffi::WriteAllScansToFileFn
            ),
            get_pd_values: resolve!(library, path, "getPDValues", ffi::GetPdValuesFn),
            get_pd_reference: resolve!(library, path, "getPDReference", ffi::GetChannelValueFn),
            get_aux_states: resolve!(library, path, "getAUXStates", ffi::GetAuxStatesFn),
            get_aux_cycle_counts: resolve!(library, path, "getAUXCycleCounts", ffi::GetAuxCycleCountsFn),
            run_usb_comms_test: resolve!(library, path, "runUSBCommsTest", ffi::StatusFn),
        };

        tracing::debug!(path = %path.display(), "resolved GlazLib entry points");

        Ok(Self {
            table,
            path: Some(path.to_path_buf()),
            _library: Some(library),
        })
    }

    /// Search the standard locations (see [`search_roots`]) for this platform's build of
    /// GlazLib and load the first one that opens.
    pub fn discover() -> Result<Self, LoadError> {
        Self::discover_in(&search_roots())
    }

    fn discover_in(roots: &[PathBuf]) -> Result<Self, LoadError> {
        if CANDIDATES.is_empty() {
            return Err(LoadError::UnsupportedPlatform(env::consts::OS));
        }

        let mut searched = Vec::new();
        let mut last_error = None;
        for root in roots {
            for candidate in CANDIDATES {
                let path = root.join(candidate);
                if path.is_file() {
                    match unsafe { Self::load(&path) } {
                        Ok(lib) => return Ok(lib),
                        Err(e) => {
                            tracing::debug!("skipping {}: {e}", path.display());
                            last_error = Some(e);
                        }
                    }
                }
                searched.push(path);
            }
        }
        Err(last_error.unwrap_or(LoadError::NotFound { searched }))
    }

    /// Wrap a function table whose code lives in this process already, such as a statically
    /// linked build or a test double.
    ///
    /// # Safety
    /// Every pointer in `table` must honour the contract of the GlazLib entry point it stands
    /// in for, for as long as the returned value is alive.
    pub unsafe fn from_function_table(table: FunctionTable) -> Self {
        Self {
            table,
            path: None,
            _library: None,
        }
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.table
    }

    /// The file this library was loaded from, if it was loaded from disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the library's process-wide last error message.
    ///
    /// This must be called right after the failing call, any other call may overwrite it.
    pub fn last_error_message(&self) -> String {
        let mut buffer = ErrorMessageBuffer::new();
        unsafe { (self.table.get_last_error_message)(buffer.as_mut_ptr()) };
        buffer.to_string_lossy()
    }
}

static LIBRARY_DIR: RwLock<Option<PathBuf>> = RwLock::new(None);

static LIBRARY: RwLock<Option<Arc<NativeLibrary>>> = RwLock::new(None);

/// Set the directory searched first for the native library tree. This has no effect once
/// [`get_library`] has succeeded.
pub fn set_library_dir<P: Into<PathBuf>>(path: P) {
    let path = path.into();
    if LIBRARY.read().unwrap_or_else(PoisonError::into_inner).is_some() {
        tracing::warn!(
            "GlazLib is already loaded, ignoring library directory {}",
            path.display()
        );
    }
    *LIBRARY_DIR.write().unwrap_or_else(PoisonError::into_inner) = Some(path);
}

/// The directories searched for the library tree, in order: the one given to
/// [`set_library_dir`], `$GLAZLIB_LIBRARY_DIR`, then `./lib`.
pub fn search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(dir) = LIBRARY_DIR.read().unwrap_or_else(PoisonError::into_inner).clone() {
        roots.push(dir);
    }
    if let Some(dir) = env::var_os(LIBRARY_DIR_ENV) {
        roots.push(PathBuf::from(dir));
    }
    roots.push(PathBuf::from("lib"));
    roots
}

/// Get the process-wide GlazLib instance, loading it on first use.
///
/// A failed load is not remembered, the next call searches again.
pub fn get_library() -> Result<Arc<NativeLibrary>, LoadError> {
    if let Some(lib) = LIBRARY.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
        return Ok(lib.clone());
    }

    let mut guard = LIBRARY.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(lib) = guard.as_ref() {
        return Ok(lib.clone());
    }
    let lib = Arc::new(NativeLibrary::discover()?);
    tracing::info!(path = ?lib.path(), "loaded GlazLib");
    *guard = Some(lib.clone());
    Ok(lib)
}
