//! Control GlazLib spectrometers from Rust.
//!
//! GlazLib is a closed-source dynamic library that does all of the talking to the hardware.
//! This crate loads it (see [`glazlib_sys`]), keeps track of the one session it supports, and
//! turns its status codes and caller-allocated buffers into [`GlazResult`]s and owned data.
//!
//! The main access point is [`GlazSession`], via [`GlazSession::open`].
//!
//! ```no_run
//! use glazlib::{GlazSession, SessionSource};
//!
//! # fn main() -> glazlib::GlazResult<()> {
//! let session = GlazSession::open(SessionSource::default())?;
//! session.set_scan_count(10)?;
//! session.run_measurement()?;
//! let scans = session.all_scans(0)?;
//! println!("{:?}", scans.shape());
//! # Ok(())
//! # }
//! ```
//!
//! All calls into the library are serialised on one lock, and a blocking
//! [`GlazSession::run_measurement`] holds it until the hardware is done. Async callers should
//! run it on a blocking-friendly thread, or use [`GlazSession::start_measurement`] and poll.
pub mod config;
pub mod constants;
pub(crate) mod data;
pub(crate) mod error;
pub(crate) mod marshal;
pub mod settings;
pub(crate) mod wrap;

#[cfg(test)]
pub(crate) mod simulated;

pub use crate::data::{ComplexSeries, ScanMatrix};
pub use crate::error::{GlazError, GlazResult, NativeFailure, Status};
pub use crate::wrap::{
    GlazLibrary, GlazSession, SessionSource, SessionState, UsbParameters, Version,
};
pub use crate::constants::{
    AdcGain, Averaging, DeviceType, IntegrationMode, OutputMode, OutputPolarity, Resolution,
    ScanClockSpeed, TestMode, TriggerMode, UnknownVariant,
};
pub use crate::settings::{AcquisitionSettings, Parameter, Setting, WavelengthRange};
pub use glazlib_sys::{LoadError, get_library, set_library_dir};
