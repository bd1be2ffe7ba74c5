use std::ffi::{CString, c_int};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use glazlib_sys::{FunctionTable, NativeLibrary, get_library};

use crate::config::{default_search_dirs, find_config_file};
use crate::constants::{
    AdcGain, Averaging, DeviceType, IntegrationMode, OutputMode, OutputPolarity, Resolution,
    ScanClockSpeed, TestMode, TriggerMode,
};
use crate::data::{ComplexSeries, ScanMatrix};
use crate::error::{GlazError, GlazResult, NativeFailure, Status};
use crate::marshal::{query_matrix_size, read_matrix, read_sized, read_sized_pair};
use crate::settings::{Setting, WavelengthRange};

/// Where a session is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Closed,
    /// Open and idle, ready to be configured or to measure
    Ready,
    /// A measurement started with [`GlazSession::start_measurement`] has not been seen to
    /// finish yet
    Acquiring,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Closed => "closed",
            SessionState::Ready => "ready",
            SessionState::Acquiring => "acquiring",
        })
    }
}

/// The bookkeeping guarded by a [`GlazLibrary`]'s lock. Each successful open bumps the
/// generation, so a stale [`GlazSession`] can tell its session is gone.
#[derive(Debug, Default)]
struct SessionSlot {
    state: SessionState,
    generation: u64,
}

impl SessionSlot {
    fn state_of(&self, generation: u64) -> SessionState {
        if self.generation == generation {
            self.state
        } else {
            SessionState::Closed
        }
    }
}

/// The library's version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// USB transfer tuning, shared by every device the library talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsbParameters {
    /// In milliseconds
    pub timeout: i32,
    pub bulk_size: i32,
    pub queue_size: i32,
}

/// How to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSource {
    /// An XML configuration document. A path to an existing file is used as-is, anything else
    /// is treated as a name to look up, see [`find_config_file`].
    ConfigFile(PathBuf),
    /// A single device of a known model, configured by the library itself
    Device {
        device: DeviceType,
        use_defaults: bool,
        /// Fall back to a simulated device when no hardware is attached
        allow_demo: bool,
    },
    /// Use one of the default configuration documents if one can be found, otherwise behave
    /// like [`SessionSource::Device`]
    Auto {
        device: DeviceType,
        use_defaults: bool,
        allow_demo: bool,
    },
}

impl SessionSource {
    pub fn config<P: Into<PathBuf>>(path: P) -> Self {
        Self::ConfigFile(path.into())
    }

    /// A single `device` with its default settings, allowing demo mode
    pub fn device(device: DeviceType) -> Self {
        Self::Device {
            device,
            use_defaults: true,
            allow_demo: true,
        }
    }
}

impl Default for SessionSource {
    fn default() -> Self {
        Self::Auto {
            device: DeviceType::default(),
            use_defaults: true,
            allow_demo: true,
        }
    }
}

/// The native initialisation call a [`SessionSource`] resolved to
#[derive(Debug)]
enum Initialise {
    Config { path: PathBuf, encoded: CString },
    Device {
        device: DeviceType,
        use_defaults: bool,
        allow_demo: bool,
    },
}

fn encode_path(path: &Path) -> GlazResult<CString> {
    let text = path
        .to_str()
        .ok_or_else(|| GlazError::InvalidPath(path.to_path_buf()))?;
    CString::new(text).map_err(|_| GlazError::InvalidPath(path.to_path_buf()))
}

impl Initialise {
    fn resolve<P: AsRef<Path>>(source: &SessionSource, config_dirs: &[P]) -> GlazResult<Self> {
        let path = match source {
            SessionSource::ConfigFile(path) => {
                if path.is_file() {
                    path.clone()
                } else {
                    find_config_file(Some(&path.to_string_lossy()), config_dirs)?
                }
            }
            SessionSource::Device {
                device,
                use_defaults,
                allow_demo,
            } => {
                return Ok(Self::Device {
                    device: *device,
                    use_defaults: *use_defaults,
                    allow_demo: *allow_demo,
                });
            }
            SessionSource::Auto {
                device,
                use_defaults,
                allow_demo,
            } => match find_config_file(None, config_dirs) {
                Ok(path) => path,
                Err(GlazError::ConfigNotFound { .. }) => {
                    tracing::debug!(%device, "no default configuration found, opening by device type");
                    return Ok(Self::Device {
                        device: *device,
                        use_defaults: *use_defaults,
                        allow_demo: *allow_demo,
                    });
                }
                Err(e) => return Err(e),
            },
        };
        let encoded = encode_path(&path)?;
        Ok(Self::Config { path, encoded })
    }
}

/// A loaded GlazLib together with the lock every call into it is made under.
///
/// The library keeps one session and one error message for the whole process, so all
/// access, including the calls that need no session, is serialised here. Wrap each
/// [`NativeLibrary`] in only one `GlazLibrary`.
#[derive(Debug)]
pub struct GlazLibrary {
    native: Arc<NativeLibrary>,
    slot: Mutex<SessionSlot>,
}

static PROCESS_LIBRARY: RwLock<Option<Arc<GlazLibrary>>> = RwLock::new(None);

impl GlazLibrary {
    pub fn new(native: Arc<NativeLibrary>) -> Self {
        Self {
            native,
            slot: Mutex::new(SessionSlot::default()),
        }
    }

    /// The process-wide instance over [`get_library`], created on first use
    pub fn process() -> GlazResult<Arc<Self>> {
        if let Some(lib) = PROCESS_LIBRARY
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(lib.clone());
        }
        let mut guard = PROCESS_LIBRARY
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(lib) = guard.as_ref() {
            return Ok(lib.clone());
        }
        let lib = Arc::new(Self::new(get_library()?));
        *guard = Some(lib.clone());
        Ok(lib)
    }

    pub fn native(&self) -> &NativeLibrary {
        &self.native
    }

    fn functions(&self) -> &FunctionTable {
        self.native.functions()
    }

    // Only plain bookkeeping lives behind the lock, so a panic while it was held leaves
    // nothing half-updated.
    fn lock(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The state of the most recently opened session
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn version(&self) -> Version {
        let _slot = self.lock();
        let mut major: c_int = 0;
        let mut minor: c_int = 0;
        unsafe { (self.functions().get_version)(&mut major, &mut minor) };
        Version { major, minor }
    }

    /// The message the library left for the last failed call, whatever it was
    pub fn last_error_message(&self) -> String {
        let _slot = self.lock();
        self.native.last_error_message()
    }

    pub fn usb_parameters(&self) -> UsbParameters {
        let _slot = self.lock();
        let mut params = UsbParameters::default();
        unsafe {
            (self.functions().get_usb_parameters)(
                &mut params.timeout,
                &mut params.bulk_size,
                &mut params.queue_size,
            )
        };
        params
    }

    pub fn set_usb_parameters(&self, params: UsbParameters) {
        let _slot = self.lock();
        tracing::debug!(?params, "setting USB parameters");
        unsafe {
            (self.functions().set_usb_parameters)(params.timeout, params.bulk_size, params.queue_size)
        };
    }

    pub fn enable_data_stream_log(&self, enable: bool) {
        let _slot = self.lock();
        unsafe { (self.functions().enable_data_stream_log)(enable) };
    }

    pub fn reset_all_devices(&self) {
        let _slot = self.lock();
        tracing::info!("resetting all devices");
        unsafe { (self.functions().reset_all_devices)() };
    }

    pub fn reset_all_ports(&self) {
        let _slot = self.lock();
        tracing::info!("resetting all ports");
        unsafe { (self.functions().reset_all_ports)() };
    }

    /// Open a session, looking configuration documents up in [`default_search_dirs`]
    pub fn open_session(self: &Arc<Self>, source: SessionSource) -> GlazResult<GlazSession> {
        self.open_session_in(source, &default_search_dirs())
    }

    /// Open a session, looking configuration documents up in `config_dirs`.
    ///
    /// Only one session may be open at a time, opening another before the first is closed
    /// fails with [`GlazError::InvalidState`].
    pub fn open_session_in<P: AsRef<Path>>(
        self: &Arc<Self>,
        source: SessionSource,
        config_dirs: &[P],
    ) -> GlazResult<GlazSession> {
        let init = Initialise::resolve(&source, config_dirs)?;

        let mut slot = self.lock();
        if slot.state != SessionState::Closed {
            return Err(GlazError::InvalidState {
                operation: "open a session",
                state: slot.state,
            });
        }

        let functions = self.functions();
        let result = match &init {
            Initialise::Config { path, encoded } => {
                tracing::info!("initialising session from {}", path.display());
                let code = unsafe { (functions.initialise_session)(encoded.as_ptr()) };
                NativeFailure::check(&self.native, "initialiseSession", code)
            }
            Initialise::Device {
                device,
                use_defaults,
                allow_demo,
            } => {
                tracing::info!(%device, use_defaults, allow_demo, "initialising single device session");
                let code = unsafe {
                    (functions.initialise_single_device_session)(
                        device.as_raw(),
                        *use_defaults,
                        *allow_demo,
                    )
                };
                NativeFailure::check(&self.native, "initialiseSingleDeviceSession", code)
            }
        };
        result.map_err(GlazError::Initialization)?;

        slot.generation += 1;
        slot.state = SessionState::Ready;
        tracing::debug!(generation = slot.generation, "session open");
        Ok(GlazSession {
            library: self.clone(),
            generation: slot.generation,
        })
    }
}

/// An open GlazLib session.
///
/// The session is closed by [`GlazSession::close`] or, failing that, when it is dropped.
/// Every method takes the library's lock for the duration of its native calls, so a session
/// can be shared between threads but its calls never overlap.
///
/// ```no_run
/// use glazlib::{GlazSession, SessionSource, TriggerMode};
///
/// # fn main() -> glazlib::GlazResult<()> {
/// let session = GlazSession::open(SessionSource::config("single_spectrometer"))?;
/// session.set_trigger_mode(TriggerMode::Internal)?;
/// session.set_internal_trigger_frequency(100.0)?;
/// session.set_scan_count(10)?;
/// session.capture_background(5)?;
/// session.run_measurement()?;
/// let spectrum = session.result(0)?;
/// println!("{} points", spectrum.len());
/// session.close()
/// # }
/// ```
#[derive(Debug)]
pub struct GlazSession {
    library: Arc<GlazLibrary>,
    generation: u64,
}

impl GlazSession {
    /// Open a session on the process-wide library, loading it if needed
    pub fn open(source: SessionSource) -> GlazResult<Self> {
        GlazLibrary::process()?.open_session(source)
    }

    pub fn library(&self) -> &Arc<GlazLibrary> {
        &self.library
    }

    pub fn state(&self) -> SessionState {
        self.library.lock().state_of(self.generation)
    }

    pub fn is_open(&self) -> bool {
        self.state() != SessionState::Closed
    }

    fn native(&self) -> &NativeLibrary {
        &self.library.native
    }

    fn functions(&self) -> &FunctionTable {
        self.library.functions()
    }

    /// Take the lock, requiring the session to be open
    fn open_slot(&self, operation: &'static str) -> GlazResult<MutexGuard<'_, SessionSlot>> {
        let slot = self.library.lock();
        match slot.state_of(self.generation) {
            SessionState::Closed => Err(GlazError::InvalidState {
                operation,
                state: SessionState::Closed,
            }),
            _ => Ok(slot),
        }
    }

    /// Take the lock, requiring the session to be open and idle
    fn ready_slot(&self, operation: &'static str) -> GlazResult<MutexGuard<'_, SessionSlot>> {
        let slot = self.library.lock();
        match slot.state_of(self.generation) {
            SessionState::Ready => Ok(slot),
            state => Err(GlazError::InvalidState { operation, state }),
        }
    }

    /// Close the session. Closing a session that is already closed does nothing.
    ///
    /// The session counts as closed afterwards even if the library reports an error. A
    /// "not initialised" status is ignored.
    pub fn close(&self) -> GlazResult<()> {
        let mut slot = self.library.lock();
        match slot.state_of(self.generation) {
            SessionState::Closed => {
                tracing::trace!("session already closed");
                return Ok(());
            }
            SessionState::Acquiring => {
                tracing::warn!("closing the session while a measurement is in progress")
            }
            SessionState::Ready => {}
        }
        slot.state = SessionState::Closed;

        let code = unsafe { (self.functions().close_session)() };
        match NativeFailure::check(self.native(), "closeSession", code) {
            Ok(()) => {
                tracing::info!("closed session");
                Ok(())
            }
            Err(failure) if failure.status == Status::NotInitialised => {
                tracing::warn!("ignoring close status: {failure}");
                Ok(())
            }
            Err(failure) => {
                tracing::warn!("close failed: {failure}");
                Err(GlazError::Close(failure))
            }
        }
    }

    /// Apply one setting. The library does all validation, including of combinations, and the
    /// session stays usable when it rejects a value.
    pub fn configure(&self, setting: Setting) -> GlazResult<()> {
        let _slot = self.ready_slot("configure")?;
        let f = self.functions();
        let (operation, code) = unsafe {
            match setting {
                Setting::TriggerMode(v) => ("setTriggerMode", (f.set_trigger_mode)(v.as_raw())),
                Setting::InternalTriggerFrequency(v) => (
                    "setInternalTriggerFrequency",
                    (f.set_internal_trigger_frequency)(v),
                ),
                Setting::TriggerDelay(v) => ("setTriggerDelay", (f.set_trigger_delay)(v)),
                Setting::IntegrationMode(v) => {
                    ("setIntegrationMode", (f.set_integration_mode)(v.as_raw()))
                }
                Setting::IntegrationTime(v) => ("setIntegrationTime", (f.set_integration_time)(v)),
                Setting::HardwareAveraging(v) => {
                    ("setHardwareAveraging", (f.set_hardware_averaging)(v.as_raw()))
                }
                Setting::Resolution(v) => ("setResolution", (f.set_resolution)(v.as_raw())),
                Setting::ScanCount(v) => ("setScanCount", (f.set_scan_count)(v)),
                Setting::ScanClockSpeed(v) => {
                    ("setScanClockSpeed", (f.set_scan_clock_speed)(v.as_raw()))
                }
                Setting::AdcGain(v) => ("setADCGain", (f.set_adc_gain)(v.as_raw())),
                Setting::SyncOutMode(v) => ("setSyncOutMode", (f.set_sync_out_mode)(v.as_raw())),
                Setting::SyncOutPolarity(v) => {
                    ("setSyncOutPolarity", (f.set_sync_out_polarity)(v.as_raw()))
                }
                Setting::AuxOutMode(v) => ("setAuxOutMode", (f.set_aux_out_mode)(v.as_raw())),
                Setting::AuxOutPolarity(v) => {
                    ("setAuxOutPolarity", (f.set_aux_out_polarity)(v.as_raw()))
                }
                Setting::OutCycleCount(v) => ("setOutCycleCount", (f.set_out_cycle_count)(v)),
                Setting::Timeout(v) => ("setTimeout", (f.set_timeout)(v)),
                Setting::Wavelengths(WavelengthRange { min, max }) => {
                    ("setWavelengths", (f.set_wavelengths)(min, max))
                }
                Setting::TestMode(v) => ("setTestMode", (f.set_test_mode)(v.as_raw())),
            }
        };
        NativeFailure::check(self.native(), operation, code).map_err(|failure| {
            GlazError::Configuration {
                parameter: setting.parameter(),
                failure,
            }
        })?;
        tracing::debug!(parameter = %setting.parameter(), ?setting, "configured");
        Ok(())
    }

    /// Apply `settings` in order, stopping at the first one the library rejects
    pub fn configure_all<I: IntoIterator<Item = Setting>>(&self, settings: I) -> GlazResult<()> {
        for setting in settings {
            self.configure(setting)?;
        }
        Ok(())
    }

    pub fn set_trigger_mode(&self, mode: TriggerMode) -> GlazResult<()> {
        self.configure(Setting::TriggerMode(mode))
    }

    /// In Hz. The trigger mode must already be [`TriggerMode::Internal`].
    pub fn set_internal_trigger_frequency(&self, frequency: f64) -> GlazResult<()> {
        self.configure(Setting::InternalTriggerFrequency(frequency))
    }

    /// In microseconds
    pub fn set_trigger_delay(&self, delay: i32) -> GlazResult<()> {
        self.configure(Setting::TriggerDelay(delay))
    }

    pub fn set_integration_mode(&self, mode: IntegrationMode) -> GlazResult<()> {
        self.configure(Setting::IntegrationMode(mode))
    }

    /// In microseconds
    pub fn set_integration_time(&self, time: i32) -> GlazResult<()> {
        self.configure(Setting::IntegrationTime(time))
    }

    pub fn set_hardware_averaging(&self, averaging: Averaging) -> GlazResult<()> {
        self.configure(Setting::HardwareAveraging(averaging))
    }

    pub fn set_resolution(&self, resolution: Resolution) -> GlazResult<()> {
        self.configure(Setting::Resolution(resolution))
    }

    pub fn set_scan_count(&self, count: i32) -> GlazResult<()> {
        self.configure(Setting::ScanCount(count))
    }

    pub fn set_scan_clock_speed(&self, speed: ScanClockSpeed) -> GlazResult<()> {
        self.configure(Setting::ScanClockSpeed(speed))
    }

    pub fn set_adc_gain(&self, gain: AdcGain) -> GlazResult<()> {
        self.configure(Setting::AdcGain(gain))
    }

    pub fn set_sync_out_mode(&self, mode: OutputMode) -> GlazResult<()> {
        self.configure(Setting::SyncOutMode(mode))
    }

    pub fn set_sync_out_polarity(&self, polarity: OutputPolarity) -> GlazResult<()> {
        self.configure(Setting::SyncOutPolarity(polarity))
    }

    pub fn set_aux_out_mode(&self, mode: OutputMode) -> GlazResult<()> {
        self.configure(Setting::AuxOutMode(mode))
    }

    pub fn set_aux_out_polarity(&self, polarity: OutputPolarity) -> GlazResult<()> {
        self.configure(Setting::AuxOutPolarity(polarity))
    }

    pub fn set_out_cycle_count(&self, count: i32) -> GlazResult<()> {
        self.configure(Setting::OutCycleCount(count))
    }

    /// In milliseconds
    pub fn set_timeout(&self, timeout: i32) -> GlazResult<()> {
        self.configure(Setting::Timeout(timeout))
    }

    /// In nanometres
    pub fn set_wavelengths(&self, min: f64, max: f64) -> GlazResult<()> {
        self.configure(Setting::Wavelengths(WavelengthRange { min, max }))
    }

    pub fn set_test_mode(&self, mode: TestMode) -> GlazResult<()> {
        self.configure(Setting::TestMode(mode))
    }

    /// Capture and average `count` background scans
    pub fn capture_background(&self, count: i32) -> GlazResult<()> {
        let _slot = self.ready_slot("capture a background")?;
        tracing::debug!(count, "capturing background");
        let code = unsafe { (self.functions().capture_background)(count) };
        NativeFailure::check(self.native(), "captureBackground", code)
            .map_err(GlazError::Acquisition)
    }

    /// Run a measurement, blocking until it is complete. This can take seconds, so keep it
    /// off threads that must stay responsive.
    pub fn run_measurement(&self) -> GlazResult<()> {
        let mut slot = self.ready_slot("run a measurement")?;
        slot.state = SessionState::Acquiring;
        tracing::debug!("running measurement");
        let code = unsafe { (self.functions().run_measurement)() };
        slot.state = SessionState::Ready;
        NativeFailure::check(self.native(), "runMeasurement", code).map_err(GlazError::Acquisition)
    }

    /// Start a measurement and return immediately. Poll [`GlazSession::is_measurement_done`]
    /// until it reports `true` before doing anything else with the session.
    pub fn start_measurement(&self) -> GlazResult<()> {
        let mut slot = self.ready_slot("start a measurement")?;
        let code = unsafe { (self.functions().start_measurement)() };
        NativeFailure::check(self.native(), "startMeasurement", code)
            .map_err(GlazError::Acquisition)?;
        slot.state = SessionState::Acquiring;
        tracing::debug!("measurement started");
        Ok(())
    }

    pub fn is_measurement_done(&self) -> GlazResult<bool> {
        let mut slot = self.open_slot("poll the measurement")?;
        let mut done: u8 = 0;
        let code = unsafe { (self.functions().is_measurement_done)(&mut done) };
        if let Err(failure) = NativeFailure::check(self.native(), "isMeasurementDone", code) {
            // a failed poll ends the acquisition
            if slot.state == SessionState::Acquiring {
                slot.state = SessionState::Ready;
            }
            return Err(GlazError::Acquisition(failure));
        }
        let done = done != 0;
        if done && slot.state == SessionState::Acquiring {
            slot.state = SessionState::Ready;
            tracing::debug!("measurement finished");
        }
        Ok(done)
    }

    /// Poll [`GlazSession::is_measurement_done`] every `poll_interval` until it reports `true`,
    /// giving up after `timeout`. The lock is released between polls.
    pub fn wait_for_measurement(&self, poll_interval: Duration, timeout: Duration) -> GlazResult<()> {
        let start = Instant::now();
        loop {
            if self.is_measurement_done()? {
                return Ok(());
            }
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(GlazError::Timeout {
                    operation: "measurement",
                    waited,
                });
            }
            thread::sleep(poll_interval);
        }
    }

    /// The processed spectrum of result `index`
    pub fn result(&self, index: i32) -> GlazResult<Vec<f64>> {
        let _slot = self.ready_slot("retrieve a result")?;
        let f = self.functions();
        read_sized(self.native(), "getResult", |size, data| unsafe {
            (f.get_result)(index, size, data)
        })
    }

    pub fn complex_result(&self, index: i32) -> GlazResult<ComplexSeries> {
        let _slot = self.ready_slot("retrieve a result")?;
        let f = self.functions();
        let (real, imag) = read_sized_pair(self.native(), "getComplexResult", |size, re, im| unsafe {
            (f.get_complex_result)(index, size, re, im)
        })?;
        Ok(ComplexSeries { real, imag })
    }

    /// One processed scan of result `index`
    pub fn scan(&self, index: i32, scan_index: i32) -> GlazResult<Vec<f64>> {
        let _slot = self.ready_slot("retrieve a scan")?;
        let f = self.functions();
        read_sized(self.native(), "getScan", |size, data| unsafe {
            (f.get_scan)(index, scan_index, size, data)
        })
    }

    pub fn complex_scan(&self, index: i32, scan_index: i32) -> GlazResult<ComplexSeries> {
        let _slot = self.ready_slot("retrieve a scan")?;
        let f = self.functions();
        let (real, imag) = read_sized_pair(self.native(), "getComplexScan", |size, re, im| unsafe {
            (f.get_complex_scan)(index, scan_index, size, re, im)
        })?;
        Ok(ComplexSeries { real, imag })
    }

    /// The number of raw scans in result `index` and the number of pixels in each
    pub fn all_scans_sizes(&self, index: i32) -> GlazResult<(usize, usize)> {
        let _slot = self.ready_slot("retrieve scan sizes")?;
        let f = self.functions();
        query_matrix_size(self.native(), "getAllScansSizes", |rows, cols| unsafe {
            (f.get_all_scans_sizes)(index, rows, cols)
        })
    }

    /// Every raw scan of result `index`
    pub fn all_scans(&self, index: i32) -> GlazResult<ScanMatrix> {
        let _slot = self.ready_slot("retrieve all scans")?;
        let f = self.functions();
        let (rows, cols, data) = read_matrix(
            self.native(),
            "getAllScansSizes",
            "getAllScans",
            |rows, cols| unsafe { (f.get_all_scans_sizes)(index, rows, cols) },
            |data| unsafe { (f.get_all_scans)(index, data) },
        )?;
        ScanMatrix::new(rows, cols, data).ok_or(GlazError::BufferSize {
            operation: "getAllScans",
            rows,
            cols,
        })
    }

    /// Have the library write every raw scan of result `index` to `path`
    pub fn write_all_scans_to_file<P: AsRef<Path>>(
        &self,
        index: i32,
        path: P,
        include_header: bool,
    ) -> GlazResult<()> {
        let path = path.as_ref();
        let encoded = encode_path(path)?;
        let _slot = self.ready_slot("write scans")?;
        tracing::debug!(index, include_header, "writing scans to {}", path.display());
        let code = unsafe {
            (self.functions().write_all_scans_to_file)(index, encoded.as_ptr(), include_header)
        };
        NativeFailure::check(self.native(), "writeAllScansToFile", code)
            .map_err(GlazError::Retrieval)
    }

    /// Photodiode readings of result `index` on `channel`
    pub fn pd_values(&self, index: i32, channel: i32) -> GlazResult<Vec<f64>> {
        let _slot = self.ready_slot("retrieve photodiode values")?;
        let f = self.functions();
        read_sized(self.native(), "getPDValues", |size, data| unsafe {
            (f.get_pd_values)(index, channel, size, data)
        })
    }

    pub fn pd_reference(&self, index: i32, channel: i32) -> GlazResult<f64> {
        let _slot = self.ready_slot("retrieve the photodiode reference")?;
        let mut value = 0.0;
        let code = unsafe { (self.functions().get_pd_reference)(index, channel, &mut value) };
        NativeFailure::check(self.native(), "getPDReference", code).map_err(GlazError::Retrieval)?;
        Ok(value)
    }

    pub fn time_stamp(&self, index: i32, channel: i32) -> GlazResult<f64> {
        let _slot = self.ready_slot("retrieve a time stamp")?;
        let mut value = 0.0;
        let code = unsafe { (self.functions().get_time_stamp)(index, channel, &mut value) };
        NativeFailure::check(self.native(), "getTimeStamp", code).map_err(GlazError::Retrieval)?;
        Ok(value)
    }

    /// The digital aux input states recorded with result `index`, one per scan
    pub fn aux_states(&self, index: i32) -> GlazResult<Vec<bool>> {
        let _slot = self.ready_slot("retrieve aux states")?;
        let f = self.functions();
        let states: Vec<u8> = read_sized(self.native(), "getAUXStates", |size, data| unsafe {
            (f.get_aux_states)(index, size, data)
        })?;
        Ok(states.into_iter().map(|s| s != 0).collect())
    }

    pub fn aux_cycle_counts(&self, index: i32, channel: i32) -> GlazResult<Vec<i32>> {
        let _slot = self.ready_slot("retrieve aux cycle counts")?;
        let f = self.functions();
        read_sized(self.native(), "getAUXCycleCounts", |size, data| unsafe {
            (f.get_aux_cycle_counts)(index, channel, size, data)
        })
    }

    pub fn run_usb_comms_test(&self) -> GlazResult<()> {
        let _slot = self.ready_slot("run the USB communications test")?;
        tracing::info!("running USB communications test");
        let code = unsafe { (self.functions().run_usb_comms_test)() };
        NativeFailure::check(self.native(), "runUSBCommsTest", code).map_err(GlazError::Native)
    }
}

impl Drop for GlazSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("failed to close session on drop: {e}");
        }
    }
}
