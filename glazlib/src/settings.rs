use std::fmt::{self, Display};

use crate::constants::{
    AdcGain, Averaging, IntegrationMode, OutputMode, OutputPolarity, Resolution, ScanClockSpeed,
    TestMode, TriggerMode,
};

/// The acquisition parameters a session can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    TriggerMode,
    InternalTriggerFrequency,
    TriggerDelay,
    IntegrationMode,
    IntegrationTime,
    HardwareAveraging,
    Resolution,
    ScanCount,
    ScanClockSpeed,
    AdcGain,
    SyncOutMode,
    SyncOutPolarity,
    AuxOutMode,
    AuxOutPolarity,
    OutCycleCount,
    Timeout,
    Wavelengths,
    TestMode,
}

impl Parameter {
    pub fn name(self) -> &'static str {
        match self {
            Parameter::TriggerMode => "trigger_mode",
            Parameter::InternalTriggerFrequency => "internal_trigger_frequency",
            Parameter::TriggerDelay => "trigger_delay",
            Parameter::IntegrationMode => "integration_mode",
            Parameter::IntegrationTime => "integration_time",
            Parameter::HardwareAveraging => "hardware_averaging",
            Parameter::Resolution => "resolution",
            Parameter::ScanCount => "scan_count",
            Parameter::ScanClockSpeed => "scan_clock_speed",
            Parameter::AdcGain => "adc_gain",
            Parameter::SyncOutMode => "sync_out_mode",
            Parameter::SyncOutPolarity => "sync_out_polarity",
            Parameter::AuxOutMode => "aux_out_mode",
            Parameter::AuxOutPolarity => "aux_out_polarity",
            Parameter::OutCycleCount => "out_cycle_count",
            Parameter::Timeout => "timeout",
            Parameter::Wavelengths => "wavelengths",
            Parameter::TestMode => "test_mode",
        }
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One parameter together with the value to give it.
///
/// Numeric values are passed to the library as-is, it is the only authority on what is in
/// range for the attached hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Setting {
    TriggerMode(TriggerMode),
    /// In Hz, only accepted while the trigger mode is [`TriggerMode::Internal`]
    InternalTriggerFrequency(f64),
    /// In microseconds
    TriggerDelay(i32),
    IntegrationMode(IntegrationMode),
    /// In microseconds
    IntegrationTime(i32),
    HardwareAveraging(Averaging),
    Resolution(Resolution),
    ScanCount(i32),
    ScanClockSpeed(ScanClockSpeed),
    AdcGain(AdcGain),
    SyncOutMode(OutputMode),
    SyncOutPolarity(OutputPolarity),
    AuxOutMode(OutputMode),
    AuxOutPolarity(OutputPolarity),
    OutCycleCount(i32),
    /// In milliseconds
    Timeout(i32),
    /// In nanometres
    Wavelengths(WavelengthRange),
    TestMode(TestMode),
}

impl Setting {
    pub fn parameter(&self) -> Parameter {
        match self {
            Setting::TriggerMode(_) => Parameter::TriggerMode,
            Setting::InternalTriggerFrequency(_) => Parameter::InternalTriggerFrequency,
            Setting::TriggerDelay(_) => Parameter::TriggerDelay,
            Setting::IntegrationMode(_) => Parameter::IntegrationMode,
            Setting::IntegrationTime(_) => Parameter::IntegrationTime,
            Setting::HardwareAveraging(_) => Parameter::HardwareAveraging,
            Setting::Resolution(_) => Parameter::Resolution,
            Setting::ScanCount(_) => Parameter::ScanCount,
            Setting::ScanClockSpeed(_) => Parameter::ScanClockSpeed,
            Setting::AdcGain(_) => Parameter::AdcGain,
            Setting::SyncOutMode(_) => Parameter::SyncOutMode,
            Setting::SyncOutPolarity(_) => Parameter::SyncOutPolarity,
            Setting::AuxOutMode(_) => Parameter::AuxOutMode,
            Setting::AuxOutPolarity(_) => Parameter::AuxOutPolarity,
            Setting::OutCycleCount(_) => Parameter::OutCycleCount,
            Setting::Timeout(_) => Parameter::Timeout,
            Setting::Wavelengths(_) => Parameter::Wavelengths,
            Setting::TestMode(_) => Parameter::TestMode,
        }
    }
}

/// A wavelength window, in nanometres
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WavelengthRange {
    pub min: f64,
    pub max: f64,
}

/// A batch of optional settings, e.g. read from a settings file.
///
/// [`AcquisitionSettings::to_settings`] orders the present values so that modes come before
/// the values that depend on them.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct AcquisitionSettings {
    pub test_mode: Option<TestMode>,
    pub trigger_mode: Option<TriggerMode>,
    pub internal_trigger_frequency: Option<f64>,
    pub trigger_delay: Option<i32>,
    pub integration_mode: Option<IntegrationMode>,
    pub integration_time: Option<i32>,
    pub hardware_averaging: Option<Averaging>,
    pub resolution: Option<Resolution>,
    pub adc_gain: Option<AdcGain>,
    pub scan_clock_speed: Option<ScanClockSpeed>,
    pub scan_count: Option<i32>,
    pub wavelengths: Option<WavelengthRange>,
    pub sync_out_mode: Option<OutputMode>,
    pub sync_out_polarity: Option<OutputPolarity>,
    pub aux_out_mode: Option<OutputMode>,
    pub aux_out_polarity: Option<OutputPolarity>,
    pub out_cycle_count: Option<i32>,
    pub timeout: Option<i32>,
}

impl AcquisitionSettings {
    pub fn to_settings(&self) -> Vec<Setting> {
        [
            self.test_mode.map(Setting::TestMode),
            self.trigger_mode.map(Setting::TriggerMode),
            self.internal_trigger_frequency
                .map(Setting::InternalTriggerFrequency),
            self.trigger_delay.map(Setting::TriggerDelay),
            self.integration_mode.map(Setting::IntegrationMode),
            self.integration_time.map(Setting::IntegrationTime),
            self.hardware_averaging.map(Setting::HardwareAveraging),
            self.resolution.map(Setting::Resolution),
            self.adc_gain.map(Setting::AdcGain),
            self.scan_clock_speed.map(Setting::ScanClockSpeed),
            self.scan_count.map(Setting::ScanCount),
            self.wavelengths.map(Setting::Wavelengths),
            self.sync_out_mode.map(Setting::SyncOutMode),
            self.sync_out_polarity.map(Setting::SyncOutPolarity),
            self.aux_out_mode.map(Setting::AuxOutMode),
            self.aux_out_polarity.map(Setting::AuxOutPolarity),
            self.out_cycle_count.map(Setting::OutCycleCount),
            self.timeout.map(Setting::Timeout),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
