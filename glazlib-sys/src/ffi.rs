//! Typed mirror of the GlazLib C ABI.
//!
//! Every entry point exported by the native library has a function pointer type here and a
//! slot in [`FunctionTable`]. Nothing in this module validates arguments or interprets
//! status codes, that is left to the safe `glazlib` crate.
//!
//! # Conventions
//! - Calls returning [`c_int`] report a status, where [`ERROR_NONE`] means success.
//! - Variable-length getters take an `*mut c_int` size slot and a data pointer. Passing a null
//!   data pointer asks the library to write only the element count.
//! - C `bool` out-parameters are declared as `*mut u8` and must be read as `!= 0`. By-value
//!   `bool` arguments use Rust's `bool`, which shares the C ABI.
#![allow(missing_docs)]

use std::ffi::{c_char, c_double, c_int};

pub type GetVersionFn = unsafe extern "C" fn(major: *mut c_int, minor: *mut c_int);
pub type GetLastErrorMessageFn = unsafe extern "C" fn(buffer: *mut c_char) -> c_int;
pub type GetUsbParametersFn =
    unsafe extern "C" fn(timeout: *mut c_int, bulk_size: *mut c_int, queue_size: *mut c_int);
pub type SetUsbParametersFn = unsafe extern "C" fn(timeout: c_int, bulk_size: c_int, queue_size: c_int);
pub type EnableDataStreamLogFn = unsafe extern "C" fn(enable: bool);

pub type InitialiseSessionFn = unsafe extern "C" fn(config_path: *const c_char) -> c_int;
pub type InitialiseSingleDeviceSessionFn =
    unsafe extern "C" fn(device_type: c_int, use_defaults: bool, allow_demo: bool) -> c_int;
pub type StatusFn = unsafe extern "C" fn() -> c_int;
pub type VoidFn = unsafe extern "C" fn();

pub type SetIntFn = unsafe extern "C" fn(value: c_int) -> c_int;
pub type SetDoubleFn = unsafe extern "C" fn(value: c_double) -> c_int;
pub type SetWavelengthsFn = unsafe extern "C" fn(min: c_double, max: c_double) -> c_int;

pub type IsMeasurementDoneFn = unsafe extern "C" fn(done: *mut u8) -> c_int;

pub type GetResultFn =
    unsafe extern "C" fn(index: c_int, size: *mut c_int, data: *mut c_double) -> c_int;
pub type GetComplexResultFn = unsafe extern "C" fn(
    index: c_int,
    size: *mut c_int,
    real: *mut c_double,
    imag: *mut c_double,
) -> c_int;
pub type GetChannelValueFn =
    unsafe extern "C" fn(index: c_int, channel: c_int, value: *mut c_double) -> c_int;
pub type GetScanFn = unsafe extern "C" fn(
    index: c_int,
    scan_index: c_int,
    size: *mut c_int,
    data: *mut c_double,
) -> c_int;
pub type GetComplexScanFn = unsafe extern "C" fn(
    index: c_int,
    scan_index: c_int,
    size: *mut c_int,
    real: *mut c_double,
    imag: *mut c_double,
) -> c_int;
pub type GetAllScansSizesFn =
    unsafe extern "C" fn(index: c_int, scan_count: *mut c_int, pixels_per_scan: *mut c_int) -> c_int;
pub type GetAllScansFn = unsafe extern "C" fn(index: c_int, data: *mut u16) -> c_int;
pub type WriteAllScansToFileFn =
    unsafe extern "C" fn(index: c_int, filename: *const c_char, include_header: bool) -> c_int;
pub type GetPdValuesFn = unsafe extern "C" fn(
    index: c_int,
    channel: c_int,
    size: *mut c_int,
    data: *mut c_double,
) -> c_int;
pub type GetAuxStatesFn = unsafe extern "C" fn(index: c_int, size: *mut c_int, states: *mut u8) -> c_int;
pub type GetAuxCycleCountsFn = unsafe extern "C" fn(
    index: c_int,
    channel: c_int,
    size: *mut c_int,
    counts: *mut c_int,
) -> c_int;

/// The resolved entry points of a GlazLib instance, one field per exported symbol.
///
/// A table is only meaningful while whatever provides the code behind these pointers is alive,
/// see [`NativeLibrary`](crate::NativeLibrary).
#[derive(Debug, Clone, Copy)]
pub struct FunctionTable {
    pub get_version: GetVersionFn,
    pub get_last_error_message: GetLastErrorMessageFn,
    pub get_usb_parameters: GetUsbParametersFn,
    pub set_usb_parameters: SetUsbParametersFn,
    pub enable_data_stream_log: EnableDataStreamLogFn,

    pub initialise_session: InitialiseSessionFn,
    pub initialise_single_device_session: InitialiseSingleDeviceSessionFn,
    pub close_session: StatusFn,
    pub reset_all_devices: VoidFn,
    pub reset_all_ports: VoidFn,

    pub set_test_mode: SetIntFn,
    pub set_wavelengths: SetWavelengthsFn,
    pub set_hardware_averaging: SetIntFn,
    pub set_resolution: SetIntFn,
    pub set_scan_count: SetIntFn,
    pub set_scan_clock_speed: SetIntFn,
    pub set_adc_gain: SetIntFn,
    pub set_trigger_delay: SetIntFn,
    pub set_trigger_mode: SetIntFn,
    pub set_internal_trigger_frequency: SetDoubleFn,
    pub set_integration_mode: SetIntFn,
    pub set_integration_time: SetIntFn,
    pub set_sync_out_mode: SetIntFn,
    pub set_sync_out_polarity: SetIntFn,
    pub set_aux_out_mode: SetIntFn,
    pub set_aux_out_polarity: SetIntFn,
    pub set_out_cycle_count: SetIntFn,
    pub set_timeout: SetIntFn,

    pub capture_background: SetIntFn,
    pub run_measurement: StatusFn,
    pub start_measurement: StatusFn,
    pub is_measurement_done: IsMeasurementDoneFn,

    pub get_result: GetResultFn,
    pub get_complex_result: GetComplexResultFn,
    pub get_time_stamp: GetChannelValueFn,
    pub get_scan: GetScanFn,
    pub get_complex_scan: GetComplexScanFn,
    pub get_all_scans_sizes: GetAllScansSizesFn,
    pub get_all_scans: GetAllScansFn,
    pub write_all_scans_to_file: WriteAllScansToFileFn,
    pub get_pd_values: GetPdValuesFn,
    pub get_pd_reference: GetChannelValueFn,
    pub get_aux_states: GetAuxStatesFn,
    pub get_aux_cycle_counts: GetAuxCycleCountsFn,

    pub run_usb_comms_test: StatusFn,
}

/// Size of the text buffer `getLastErrorMessage` writes into, including the terminator.
pub const ERROR_MESSAGE_CAPACITY: usize = 1024;

// Status codes
pub const ERROR_NONE: c_int = 0;
pub const ERROR_NOT_INITIALISED: c_int = 1;
pub const ERROR_SCRIPT: c_int = 2;
pub const ERROR_CONNECTING_TO_CAMERAS: c_int = 3;
pub const ERROR_DOWNLOADING_CALIBRATIONS: c_int = 4;
pub const ERROR_INVALID_WAVELENGTHS: c_int = 5;
pub const ERROR_INVALID_AVERAGING: c_int = 6;
pub const ERROR_INVALID_SCAN_COUNT: c_int = 7;
pub const ERROR_INVALID_TRIGGER_MODE: c_int = 8;
pub const ERROR_INVALID_TRIGGER_DELAY: c_int = 9;
pub const ERROR_INVALID_INTEGRATION_TIME: c_int = 10;
pub const ERROR_INVALID_SCAN_CLOCK_SPEED: c_int = 11;
pub const ERROR_INVALID_SETTINGS: c_int = 12;
pub const ERROR_CAPTURING_BACKGROUNDS: c_int = 13;
pub const ERROR_RUNNING_MEASUREMENT: c_int = 14;
pub const ERROR_INVALID_CALCULATION_INDEX: c_int = 15;
pub const ERROR_INVALID_RESULT_DATA_SIZE: c_int = 16;
pub const ERROR_INVALID_PD_NUMBER: c_int = 17;
pub const ERROR_INVALID_PD_CHANNEL: c_int = 18;
pub const ERROR_INVALID_CAMERA_NUMBER: c_int = 19;
pub const ERROR_INVALID_TRIGGER_FREQUENCY: c_int = 20;
pub const ERROR_NO_MEASUREMENT_RUN: c_int = 21;
/// Spelled as in the vendor header.
pub const ERROR_INITIALISING_SINGEL_DEVICE: c_int = 22;
pub const ERROR_INVALID_SINGLE_DEVICE_TYPE: c_int = 23;
pub const ERROR_INVALID_SYNC_OUT_MODE: c_int = 24;
pub const ERROR_INVALID_INTEGRATION_MODE: c_int = 25;
pub const ERROR_CLOCK_SPEED_UNSUPPORTED: c_int = 26;
pub const ERROR_INVALID_AUX_OUT_MODE: c_int = 27;
pub const ERROR_CYCLE_COUNT_UNSUPPORTED: c_int = 28;
pub const ERROR_INVALID_CYCLE_COUNT: c_int = 29;
pub const ERROR_INVALID_TEST_MODE: c_int = 30;
pub const ERROR_OUT_POLARITY_NOT_SUPPORTED: c_int = 31;
pub const ERROR_INVALID_OUT_POLARITY: c_int = 32;
pub const ERROR_RESOLUTION_OUT_OF_RANGE: c_int = 33;
pub const ERROR_RESOLUTION_NOT_SUPPORTED: c_int = 34;
pub const ERROR_RUNNING_USB_COMMS_TEST: c_int = 35;
pub const ERROR_MEASUREMENT_STREAM: c_int = 36;
pub const ERROR_AUX_STATES_NOT_SUPPORTED: c_int = 37;
pub const ERROR_INTEGRATION_TIME_NOT_SUPPORTED: c_int = 38;
pub const ERROR_INVALID_ADC_GAIN: c_int = 39;
pub const ERROR_AUX_CYCLE_COUNT_INVALID: c_int = 40;

// Device types
pub const GLAZ_LINESCAN_I_PULSESYNC_S10453_SINGLE_DEVICE_TYPE: c_int = 1;
pub const GLAZ_LINESCAN_I_PULSESYNC_S11639_SINGLE_DEVICE_TYPE: c_int = 2;
pub const GLAZ_LINESCAN_I_TIMEFILL_S11639_SINGLE_DEVICE_TYPE: c_int = 3;
pub const GLAZ_LINESCAN_I_SPECTROCAM_S11639_SINGLE_DEVICE_TYPE: c_int = 4;
pub const GLAZ_LINESCAN_II_SINGLE_DEVICE_TYPE: c_int = 5;
pub const GLAZ_LINESCAN_II_V2_SINGLE_DEVICE_TYPE: c_int = 6;
pub const GLAZ_LINESCAN_LS_SINGLE_DEVICE_TYPE: c_int = 7;
pub const GLAZ_LINESCAN_EC_SINGLE_DEVICE_TYPE: c_int = 8;

// Hardware averaging, as a power-of-two index
pub const AVERAGING_X1: c_int = 0;
pub const AVERAGING_X2: c_int = 1;
pub const AVERAGING_X4: c_int = 2;
pub const AVERAGING_X8: c_int = 3;
pub const AVERAGING_X16: c_int = 4;
pub const AVERAGING_X32: c_int = 5;
pub const AVERAGING_X64: c_int = 6;
pub const AVERAGING_X128: c_int = 7;
pub const AVERAGING_X256: c_int = 8;
pub const AVERAGING_X512: c_int = 9;
pub const AVERAGING_X1024: c_int = 10;
pub const AVERAGING_X2048: c_int = 11;
pub const AVERAGING_X4096: c_int = 12;

// ADC resolution
pub const RESOLUTION_10BIT: c_int = 0;
pub const RESOLUTION_12BIT: c_int = 1;
pub const RESOLUTION_14BIT: c_int = 2;
pub const RESOLUTION_16BIT: c_int = 3;

// Trigger modes
pub const TRIGGER_EXTERNAL: c_int = 0;
pub const TRIGGER_INTERNAL: c_int = 1;
pub const TRIGGER_BURST: c_int = 2;

// Integration modes
pub const INT_MODE_PULSESYNC: c_int = 0;
pub const INT_MODE_TIMEFILL: c_int = 1;

// Sync and aux output modes
pub const OUT_INT_WINDOW: c_int = 0;
pub const OUT_TRIGGER: c_int = 1;
pub const OUT_BUSY: c_int = 2;
pub const OUT_TRIGGER_CYCLE_START: c_int = 3;
pub const OUT_TRIGGER_CYCLE_RUNNING: c_int = 4;
pub const OUT_OFF: c_int = 5;

// Output polarities
pub const OUT_POLARITY_ACTIVE_LO: c_int = 0;
pub const OUT_POLARITY_ACTIVE_HI: c_int = 1;

// Scan clock speeds
pub const SCAN_CLOCK_FULL_SPEED: c_int = 0;
pub const SCAN_CLOCK_HALF_SPEED: c_int = 1;

// Test modes
pub const TEST_OFF: c_int = 0;
pub const TEST_DAC_ALTERNATING: c_int = 1;
pub const TEST_DAC_ALL_ONES: c_int = 2;
pub const TEST_DAC_ALL_ZEROS: c_int = 3;

// ADC gain
pub const ADC_GAIN_X1: c_int = 0;
pub const ADC_GAIN_X2: c_int = 1;
pub const ADC_GAIN_X4: c_int = 2;
