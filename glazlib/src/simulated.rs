//! An in-process stand-in for GlazLib, for tests.
//!
//! The device state is thread-local, so every test thread gets its own device. It follows
//! the library's rules closely enough to exercise the wrapper: calls need an open session,
//! failures leave a message behind, the internal trigger frequency can only be set in
//! internal trigger mode, and sized getters report their element count when given a null
//! buffer.
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_double, c_int};
use std::fs;
use std::ptr;
use std::sync::Arc;

use glazlib_sys::{FunctionTable, NativeLibrary, ffi};

use crate::wrap::GlazLibrary;

/// Pixels per scan of the simulated detector
pub const PIXELS: usize = 8;

/// Entries reported by `getAUXCycleCounts`
pub const AUX_CYCLE_COUNTS: usize = 3;

#[derive(Debug)]
pub struct SimDevice {
    pub initialised: bool,
    pub last_error: String,
    /// Every entry point called, in order
    pub calls: Vec<&'static str>,
    /// The size slot each sized getter was handed along with a buffer
    pub fetch_capacities: Vec<(&'static str, c_int)>,
    /// The last value given to each integer or floating point setter
    pub settings: HashMap<&'static str, f64>,
    pub wavelengths: Option<(f64, f64)>,
    pub config_path: Option<String>,
    pub device: Option<(c_int, bool, bool)>,
    pub detectors: c_int,
    pub trigger_mode: c_int,
    pub scan_count: c_int,
    pub measured: bool,
    pub acquiring: bool,
    pub polls_left: u32,
    pub usb: (c_int, c_int, c_int),
    pub data_stream_log: bool,

    /// Number of polls an asynchronous measurement takes to complete
    pub polls_until_done: u32,
    pub pixels: usize,
    /// Status `closeSession` returns
    pub close_code: c_int,
    /// Status `runUSBCommsTest` returns
    pub usb_test_code: c_int,
    /// Status `isMeasurementDone` returns
    pub poll_code: c_int,
}

impl Default for SimDevice {
    fn default() -> Self {
        Self {
            initialised: false,
            last_error: String::new(),
            calls: Vec::new(),
            fetch_capacities: Vec::new(),
            settings: HashMap::new(),
            wavelengths: None,
            config_path: None,
            device: None,
            detectors: 0,
            trigger_mode: ffi::TRIGGER_EXTERNAL,
            scan_count: 1,
            measured: false,
            acquiring: false,
            polls_left: 0,
            usb: (1000, 65536, 16),
            data_stream_log: false,
            polls_until_done: 1,
            pixels: PIXELS,
            close_code: ffi::ERROR_NONE,
            usb_test_code: ffi::ERROR_NONE,
            poll_code: ffi::ERROR_NONE,
        }
    }
}

impl SimDevice {
    fn fail(&mut self, code: c_int, message: &str) -> c_int {
        self.last_error = message.to_string();
        code
    }

    fn check_index(&mut self, index: c_int) -> Result<(), c_int> {
        if !self.measured {
            return Err(self.fail(ffi::ERROR_NO_MEASUREMENT_RUN, "No measurement has been run"));
        }
        if !(0..self.detectors).contains(&index) {
            return Err(self.fail(ffi::ERROR_INVALID_CALCULATION_INDEX, "Invalid calculation index"));
        }
        Ok(())
    }

    fn spectrum(&self, index: c_int, offset: f64) -> Vec<f64> {
        (0..self.pixels)
            .map(|i| i as f64 * 10.0 + f64::from(index) + offset)
            .collect()
    }

    fn store(&mut self, symbol: &'static str, value: c_int, valid: bool, code: c_int) -> c_int {
        if !valid {
            return self.fail(code, &format!("Invalid value {value} for {symbol}"));
        }
        self.settings.insert(symbol, f64::from(value));
        ffi::ERROR_NONE
    }
}

thread_local! {
    static DEVICE: RefCell<SimDevice> = RefCell::new(SimDevice::default());
}

/// Inspect or adjust this thread's simulated device
pub fn with_device<T>(f: impl FnOnce(&mut SimDevice) -> T) -> T {
    DEVICE.with(|d| f(&mut d.borrow_mut()))
}

pub fn calls() -> Vec<&'static str> {
    with_device(|d| d.calls.clone())
}

pub fn clear_calls() {
    with_device(|d| {
        d.calls.clear();
        d.fetch_capacities.clear();
    })
}

/// Reset this thread's device and return a library bound to it
pub fn native() -> NativeLibrary {
    with_device(|d| *d = SimDevice::default());
    unsafe { NativeLibrary::from_function_table(table()) }
}

pub fn library() -> Arc<GlazLibrary> {
    Arc::new(GlazLibrary::new(Arc::new(native())))
}

fn call<T>(symbol: &'static str, f: impl FnOnce(&mut SimDevice) -> T) -> T {
    with_device(|d| {
        d.calls.push(symbol);
        f(d)
    })
}

fn session_call(symbol: &'static str, f: impl FnOnce(&mut SimDevice) -> c_int) -> c_int {
    call(symbol, |d| {
        if !d.initialised {
            return d.fail(ffi::ERROR_NOT_INITIALISED, "Session not initialised");
        }
        f(d)
    })
}

/// Copy `values` into a caller buffer the way the sized getters do
unsafe fn fill<T: Copy>(
    d: &mut SimDevice,
    symbol: &'static str,
    size: *mut c_int,
    data: *mut T,
    values: &[T],
) -> c_int {
    unsafe {
        if data.is_null() {
            *size = values.len() as c_int;
            return ffi::ERROR_NONE;
        }
        d.fetch_capacities.push((symbol, *size));
        let n = usize::try_from(*size).unwrap_or(0).min(values.len());
        ptr::copy_nonoverlapping(values.as_ptr(), data, n);
        *size = n as c_int;
    }
    ffi::ERROR_NONE
}

unsafe extern "C" fn get_version(major: *mut c_int, minor: *mut c_int) {
    call("getVersion", |_| unsafe {
        *major = 9;
        *minor = 23;
    })
}

unsafe extern "C" fn get_last_error_message(buffer: *mut c_char) -> c_int {
    call("getLastErrorMessage", |d| {
        let bytes = d.last_error.as_bytes();
        let n = bytes.len().min(ffi::ERROR_MESSAGE_CAPACITY - 1);
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.cast::<u8>(), n);
            *buffer.add(n) = 0;
        }
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn get_usb_parameters(timeout: *mut c_int, bulk: *mut c_int, queue: *mut c_int) {
    call("getUSBParameters", |d| unsafe {
        (*timeout, *bulk, *queue) = d.usb;
    })
}

unsafe extern "C" fn set_usb_parameters(timeout: c_int, bulk: c_int, queue: c_int) {
    call("setUSBParameters", |d| d.usb = (timeout, bulk, queue))
}

unsafe extern "C" fn enable_data_stream_log(enable: bool) {
    call("enableDataStreamLog", |d| d.data_stream_log = enable)
}

unsafe extern "C" fn initialise_session(path: *const c_char) -> c_int {
    let path = unsafe { CStr::from_ptr(path) }.to_string_lossy().into_owned();
    call("initialiseSession", |d| {
        if !std::path::Path::new(&path).is_file() {
            return d.fail(ffi::ERROR_SCRIPT, "Could not read configuration");
        }
        d.detectors = if path.contains("double") { 2 } else { 1 };
        d.config_path = Some(path);
        d.initialised = true;
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn initialise_single_device_session(
    device: c_int,
    use_defaults: bool,
    allow_demo: bool,
) -> c_int {
    call("initialiseSingleDeviceSession", |d| {
        if !(1..=8).contains(&device) {
            return d.fail(ffi::ERROR_INVALID_SINGLE_DEVICE_TYPE, "Invalid device type");
        }
        if !allow_demo {
            return d.fail(ffi::ERROR_CONNECTING_TO_CAMERAS, "No devices found");
        }
        d.device = Some((device, use_defaults, allow_demo));
        d.detectors = 1;
        d.initialised = true;
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn close_session() -> c_int {
    session_call("closeSession", |d| {
        d.initialised = false;
        d.acquiring = false;
        if d.close_code != ffi::ERROR_NONE {
            let code = d.close_code;
            return d.fail(code, "Close reported an error");
        }
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn reset_all_devices() {
    call("resetAllDevices", |_| ())
}

unsafe extern "C" fn reset_all_ports() {
    call("resetAllPorts", |_| ())
}

macro_rules! int_setter {
    ($name:ident, $symbol:literal, $valid:expr, $code:expr) => {
        unsafe extern "C" fn $name(value: c_int) -> c_int {
            session_call($symbol, |d| {
                let valid: fn(c_int) -> bool = $valid;
                d.store($symbol, value, valid(value), $code)
            })
        }
    };
}

int_setter!(set_test_mode, "setTestMode", |v| (0..=3).contains(&v), ffi::ERROR_INVALID_TEST_MODE);
int_setter!(set_hardware_averaging, "setHardwareAveraging", |v| (0..=12).contains(&v), ffi::ERROR_INVALID_AVERAGING);
int_setter!(set_resolution, "setResolution", |v| (0..=3).contains(&v), ffi::ERROR_RESOLUTION_OUT_OF_RANGE);
int_setter!(set_scan_clock_speed, "setScanClockSpeed", |v| (0..=1).contains(&v), ffi::ERROR_INVALID_SCAN_CLOCK_SPEED);
int_setter!(set_adc_gain, "setADCGain", |v| (0..=2).contains(&v), ffi::ERROR_INVALID_ADC_GAIN);
int_setter!(set_trigger_delay, "setTriggerDelay", |v| v >= 0, ffi::ERROR_INVALID_TRIGGER_DELAY);
int_setter!(set_integration_mode, "setIntegrationMode", |v| (0..=1).contains(&v), ffi::ERROR_INVALID_INTEGRATION_MODE);
int_setter!(set_integration_time, "setIntegrationTime", |v| v > 0, ffi::ERROR_INVALID_INTEGRATION_TIME);
int_setter!(set_sync_out_mode, "setSyncOutMode", |v| (0..=5).contains(&v), ffi::ERROR_INVALID_SYNC_OUT_MODE);
int_setter!(set_sync_out_polarity, "setSyncOutPolarity", |v| (0..=1).contains(&v), ffi::ERROR_INVALID_OUT_POLARITY);
int_setter!(set_aux_out_mode, "setAuxOutMode", |v| (0..=5).contains(&v), ffi::ERROR_INVALID_AUX_OUT_MODE);
int_setter!(set_aux_out_polarity, "setAuxOutPolarity", |v| (0..=1).contains(&v), ffi::ERROR_INVALID_OUT_POLARITY);
int_setter!(set_out_cycle_count, "setOutCycleCount", |v| v >= 0, ffi::ERROR_INVALID_CYCLE_COUNT);
int_setter!(set_timeout, "setTimeout", |v| v >= 0, ffi::ERROR_INVALID_SETTINGS);

unsafe extern "C" fn set_scan_count(value: c_int) -> c_int {
    session_call("setScanCount", |d| {
        if value < 1 {
            return d.fail(ffi::ERROR_INVALID_SCAN_COUNT, "Scan count must be at least 1");
        }
        d.scan_count = value;
        d.store("setScanCount", value, true, ffi::ERROR_NONE)
    })
}

unsafe extern "C" fn set_trigger_mode(value: c_int) -> c_int {
    session_call("setTriggerMode", |d| {
        let status = d.store("setTriggerMode", value, (0..=2).contains(&value), ffi::ERROR_INVALID_TRIGGER_MODE);
        if status == ffi::ERROR_NONE {
            d.trigger_mode = value;
        }
        status
    })
}

unsafe extern "C" fn set_internal_trigger_frequency(value: c_double) -> c_int {
    session_call("setInternalTriggerFrequency", |d| {
        if d.trigger_mode != ffi::TRIGGER_INTERNAL {
            return d.fail(
                ffi::ERROR_INVALID_SETTINGS,
                "Internal trigger frequency requires internal trigger mode",
            );
        }
        if value <= 0.0 {
            return d.fail(ffi::ERROR_INVALID_TRIGGER_FREQUENCY, "Invalid trigger frequency");
        }
        d.settings.insert("setInternalTriggerFrequency", value);
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn set_wavelengths(min: c_double, max: c_double) -> c_int {
    session_call("setWavelengths", |d| {
        if min >= max {
            return d.fail(ffi::ERROR_INVALID_WAVELENGTHS, "Invalid wavelength range");
        }
        d.wavelengths = Some((min, max));
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn capture_background(count: c_int) -> c_int {
    session_call("captureBackground", |d| {
        if count < 1 {
            return d.fail(ffi::ERROR_CAPTURING_BACKGROUNDS, "Background count must be at least 1");
        }
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn run_measurement() -> c_int {
    session_call("runMeasurement", |d| {
        d.measured = true;
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn start_measurement() -> c_int {
    session_call("startMeasurement", |d| {
        d.acquiring = true;
        d.polls_left = d.polls_until_done;
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn is_measurement_done(done: *mut u8) -> c_int {
    session_call("isMeasurementDone", |d| {
        if d.poll_code != ffi::ERROR_NONE {
            let code = d.poll_code;
            d.acquiring = false;
            return d.fail(code, "Measurement stream interrupted");
        }
        if d.acquiring {
            d.polls_left = d.polls_left.saturating_sub(1);
            if d.polls_left == 0 {
                d.acquiring = false;
                d.measured = true;
            }
        }
        unsafe { *done = u8::from(!d.acquiring) };
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn get_result(index: c_int, size: *mut c_int, data: *mut c_double) -> c_int {
    session_call("getResult", |d| {
        if let Err(code) = d.check_index(index) {
            return code;
        }
        let values = d.spectrum(index, 0.0);
        unsafe { fill(d, "getResult", size, data, &values) }
    })
}

unsafe extern "C" fn get_complex_result(
    index: c_int,
    size: *mut c_int,
    real: *mut c_double,
    imag: *mut c_double,
) -> c_int {
    session_call("getComplexResult", |d| {
        if let Err(code) = d.check_index(index) {
            return code;
        }
        let re = d.spectrum(index, 0.0);
        let im: Vec<f64> = re.iter().map(|v| -v).collect();
        unsafe {
            let mut imag_size = *size;
            fill(d, "getComplexResult", size, real, &re);
            fill(d, "getComplexResult", &mut imag_size, imag, &im)
        }
    })
}

unsafe extern "C" fn get_time_stamp(index: c_int, channel: c_int, value: *mut c_double) -> c_int {
    session_call("getTimeStamp", |d| {
        if let Err(code) = d.check_index(index) {
            return code;
        }
        unsafe { *value = f64::from(index) * 1000.0 + f64::from(channel) };
        ffi::ERROR_NONE
    })
}

fn check_scan(d: &mut SimDevice, index: c_int, scan_index: c_int) -> Result<(), c_int> {
    d.check_index(index)?;
    if !(0..d.scan_count).contains(&scan_index) {
        return Err(d.fail(ffi::ERROR_INVALID_RESULT_DATA_SIZE, "Invalid scan index"));
    }
    Ok(())
}

unsafe extern "C" fn get_scan(
    index: c_int,
    scan_index: c_int,
    size: *mut c_int,
    data: *mut c_double,
) -> c_int {
    session_call("getScan", |d| {
        if let Err(code) = check_scan(d, index, scan_index) {
            return code;
        }
        let values = d.spectrum(index, f64::from(scan_index));
        unsafe { fill(d, "getScan", size, data, &values) }
    })
}

unsafe extern "C" fn get_complex_scan(
    index: c_int,
    scan_index: c_int,
    size: *mut c_int,
    real: *mut c_double,
    imag: *mut c_double,
) -> c_int {
    session_call("getComplexScan", |d| {
        if let Err(code) = check_scan(d, index, scan_index) {
            return code;
        }
        let re = d.spectrum(index, f64::from(scan_index));
        let im = vec![0.0; re.len()];
        unsafe {
            let mut imag_size = *size;
            fill(d, "getComplexScan", size, real, &re);
            fill(d, "getComplexScan", &mut imag_size, imag, &im)
        }
    })
}

unsafe extern "C" fn get_all_scans_sizes(
    index: c_int,
    scan_count: *mut c_int,
    pixels: *mut c_int,
) -> c_int {
    session_call("getAllScansSizes", |d| {
        if let Err(code) = d.check_index(index) {
            return code;
        }
        unsafe {
            *scan_count = d.scan_count;
            *pixels = d.pixels as c_int;
        }
        ffi::ERROR_NONE
    })
}

fn raw_scans(d: &SimDevice) -> Vec<u16> {
    (0..d.scan_count as usize)
        .flat_map(|scan| (0..d.pixels).map(move |pixel| (scan * 100 + pixel) as u16))
        .collect()
}

unsafe extern "C" fn get_all_scans(index: c_int, data: *mut u16) -> c_int {
    session_call("getAllScans", |d| {
        if let Err(code) = d.check_index(index) {
            return code;
        }
        let values = raw_scans(d);
        unsafe { ptr::copy_nonoverlapping(values.as_ptr(), data, values.len()) };
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn write_all_scans_to_file(
    index: c_int,
    filename: *const c_char,
    include_header: bool,
) -> c_int {
    let filename = unsafe { CStr::from_ptr(filename) }.to_string_lossy().into_owned();
    session_call("writeAllScansToFile", |d| {
        if let Err(code) = d.check_index(index) {
            return code;
        }
        let mut text = String::new();
        if include_header {
            text.push_str(&format!("scans={} pixels={}\n", d.scan_count, d.pixels));
        }
        for row in raw_scans(d).chunks(d.pixels.max(1)) {
            let row: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            text.push_str(&row.join("\t"));
            text.push('\n');
        }
        match fs::write(&filename, text) {
            Ok(()) => ffi::ERROR_NONE,
            Err(_) => d.fail(ffi::ERROR_RUNNING_MEASUREMENT, "Could not write scans"),
        }
    })
}

fn check_channel(d: &mut SimDevice, index: c_int, channel: c_int) -> Result<(), c_int> {
    d.check_index(index)?;
    if !(0..2).contains(&channel) {
        return Err(d.fail(ffi::ERROR_INVALID_PD_CHANNEL, "Invalid photodiode channel"));
    }
    Ok(())
}

unsafe extern "C" fn get_pd_values(
    index: c_int,
    channel: c_int,
    size: *mut c_int,
    data: *mut c_double,
) -> c_int {
    session_call("getPDValues", |d| {
        if let Err(code) = check_channel(d, index, channel) {
            return code;
        }
        let values: Vec<f64> = (0..d.scan_count).map(|i| f64::from(i) * 0.5).collect();
        unsafe { fill(d, "getPDValues", size, data, &values) }
    })
}

unsafe extern "C" fn get_pd_reference(index: c_int, channel: c_int, value: *mut c_double) -> c_int {
    session_call("getPDReference", |d| {
        if let Err(code) = check_channel(d, index, channel) {
            return code;
        }
        unsafe { *value = 1.5 + f64::from(channel) };
        ffi::ERROR_NONE
    })
}

unsafe extern "C" fn get_aux_states(index: c_int, size: *mut c_int, states: *mut u8) -> c_int {
    session_call("getAUXStates", |d| {
        if let Err(code) = d.check_index(index) {
            return code;
        }
        let values: Vec<u8> = (0..d.scan_count).map(|i| (i % 2) as u8).collect();
        unsafe { fill(d, "getAUXStates", size, states, &values) }
    })
}

unsafe extern "C" fn get_aux_cycle_counts(
    index: c_int,
    channel: c_int,
    size: *mut c_int,
    counts: *mut c_int,
) -> c_int {
    session_call("getAUXCycleCounts", |d| {
        if let Err(code) = d.check_index(index) {
            return code;
        }
        let values: Vec<c_int> = (0..AUX_CYCLE_COUNTS as c_int).map(|i| channel * 10 + i).collect();
        unsafe { fill(d, "getAUXCycleCounts", size, counts, &values) }
    })
}

unsafe extern "C" fn run_usb_comms_test() -> c_int {
    session_call("runUSBCommsTest", |d| {
        if d.usb_test_code != ffi::ERROR_NONE {
            let code = d.usb_test_code;
            return d.fail(code, "USB communications test failed");
        }
        ffi::ERROR_NONE
    })
}

pub fn table() -> FunctionTable {
    FunctionTable {
        get_version,
        get_last_error_message,
        get_usb_parameters,
        set_usb_parameters,
        enable_data_stream_log,
        initialise_session,
        initialise_single_device_session,
        close_session,
        reset_all_devices,
        reset_all_ports,
        set_test_mode,
        set_wavelengths,
        set_hardware_averaging,
        set_resolution,
        set_scan_count,
        set_scan_clock_speed,
        set_adc_gain,
        set_trigger_delay,
        set_trigger_mode,
        set_internal_trigger_frequency,
        set_integration_mode,
        set_integration_time,
        set_sync_out_mode,
        set_sync_out_polarity,
        set_aux_out_mode,
        set_aux_out_polarity,
        set_out_cycle_count,
        set_timeout,
        capture_background,
        run_measurement,
        start_measurement,
        is_measurement_done,
        get_result,
        get_complex_result,
        get_time_stamp,
        get_scan,
        get_complex_scan,
        get_all_scans_sizes,
        get_all_scans,
        write_all_scans_to_file,
        get_pd_values,
        get_pd_reference,
        get_aux_states,
        get_aux_cycle_counts,
        run_usb_comms_test,
    }
}
