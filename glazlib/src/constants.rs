use std::ffi::c_int;
use std::fmt::{self, Display};
use std::str::FromStr;

use glazlib_sys::ffi;
use thiserror::Error;

/// A name that does not match any variant of a GlazLib enumeration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {value:?}, expected one of: {expected}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

/// Declares a Rust enum mirroring one of GlazLib's integer enumerations, along with its
/// conversions to and from the native value and a lowercase label used for parsing and
/// (de)serialization.
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:expr => $label:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(i32)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[cfg_attr(feature = "serde", serde(rename = $label))]
                $variant = $value,
            )+
        }

        impl $name {
            /// Every variant, in native value order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The value the native library expects
            pub fn as_raw(self) -> c_int {
                self as c_int
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl From<$name> for c_int {
            fn from(value: $name) -> c_int {
                value.as_raw()
            }
        }

        impl TryFrom<c_int> for $name {
            type Error = c_int;

            fn try_from(value: c_int) -> Result<Self, Self::Error> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_raw() == value)
                    .ok_or(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                        expected: $name::ALL
                            .iter()
                            .map(|v| v.label())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

native_enum! {
    /// The spectrometer models a single-device session can be opened for
    pub enum DeviceType {
        LinescanIPulseSyncS10453 = ffi::GLAZ_LINESCAN_I_PULSESYNC_S10453_SINGLE_DEVICE_TYPE => "linescan_i_pulsesync_s10453",
        LinescanIPulseSyncS11639 = ffi::GLAZ_LINESCAN_I_PULSESYNC_S11639_SINGLE_DEVICE_TYPE => "linescan_i_pulsesync_s11639",
        LinescanITimeFillS11639 = ffi::GLAZ_LINESCAN_I_TIMEFILL_S11639_SINGLE_DEVICE_TYPE => "linescan_i_timefill_s11639",
        LinescanISpectroCamS11639 = ffi::GLAZ_LINESCAN_I_SPECTROCAM_S11639_SINGLE_DEVICE_TYPE => "linescan_i_spectrocam_s11639",
        LinescanII = ffi::GLAZ_LINESCAN_II_SINGLE_DEVICE_TYPE => "linescan_ii",
        LinescanIIV2 = ffi::GLAZ_LINESCAN_II_V2_SINGLE_DEVICE_TYPE => "linescan_ii_v2",
        LinescanLS = ffi::GLAZ_LINESCAN_LS_SINGLE_DEVICE_TYPE => "linescan_ls",
        LinescanEC = ffi::GLAZ_LINESCAN_EC_SINGLE_DEVICE_TYPE => "linescan_ec",
    }
}

impl Default for DeviceType {
    fn default() -> Self {
        Self::LinescanIIV2
    }
}

native_enum! {
    /// On-device averaging. The native value is the base-2 logarithm of the factor.
    pub enum Averaging {
        X1 = ffi::AVERAGING_X1 => "x1",
        X2 = ffi::AVERAGING_X2 => "x2",
        X4 = ffi::AVERAGING_X4 => "x4",
        X8 = ffi::AVERAGING_X8 => "x8",
        X16 = ffi::AVERAGING_X16 => "x16",
        X32 = ffi::AVERAGING_X32 => "x32",
        X64 = ffi::AVERAGING_X64 => "x64",
        X128 = ffi::AVERAGING_X128 => "x128",
        X256 = ffi::AVERAGING_X256 => "x256",
        X512 = ffi::AVERAGING_X512 => "x512",
        X1024 = ffi::AVERAGING_X1024 => "x1024",
        X2048 = ffi::AVERAGING_X2048 => "x2048",
        X4096 = ffi::AVERAGING_X4096 => "x4096",
    }
}

impl Averaging {
    /// The number of scans averaged together
    pub fn factor(self) -> u32 {
        1 << self.as_raw()
    }
}

native_enum! {
    /// ADC sample resolution
    pub enum Resolution {
        Bits10 = ffi::RESOLUTION_10BIT => "10bit",
        Bits12 = ffi::RESOLUTION_12BIT => "12bit",
        Bits14 = ffi::RESOLUTION_14BIT => "14bit",
        Bits16 = ffi::RESOLUTION_16BIT => "16bit",
    }
}

impl Resolution {
    pub fn bits(self) -> u32 {
        10 + 2 * self.as_raw() as u32
    }
}

native_enum! {
    pub enum TriggerMode {
        External = ffi::TRIGGER_EXTERNAL => "external",
        /// Driven by the device's own clock, see
        /// [`GlazSession::set_internal_trigger_frequency`](crate::GlazSession::set_internal_trigger_frequency)
        Internal = ffi::TRIGGER_INTERNAL => "internal",
        Burst = ffi::TRIGGER_BURST => "burst",
    }
}

native_enum! {
    pub enum IntegrationMode {
        PulseSync = ffi::INT_MODE_PULSESYNC => "pulsesync",
        TimeFill = ffi::INT_MODE_TIMEFILL => "timefill",
    }
}

native_enum! {
    /// What the sync and aux outputs signal
    pub enum OutputMode {
        IntegrationWindow = ffi::OUT_INT_WINDOW => "integration_window",
        Trigger = ffi::OUT_TRIGGER => "trigger",
        Busy = ffi::OUT_BUSY => "busy",
        TriggerCycleStart = ffi::OUT_TRIGGER_CYCLE_START => "trigger_cycle_start",
        TriggerCycleRunning = ffi::OUT_TRIGGER_CYCLE_RUNNING => "trigger_cycle_running",
        Off = ffi::OUT_OFF => "off",
    }
}

native_enum! {
    pub enum OutputPolarity {
        ActiveLow = ffi::OUT_POLARITY_ACTIVE_LO => "active_low",
        ActiveHigh = ffi::OUT_POLARITY_ACTIVE_HI => "active_high",
    }
}

native_enum! {
    pub enum ScanClockSpeed {
        Full = ffi::SCAN_CLOCK_FULL_SPEED => "full",
        Half = ffi::SCAN_CLOCK_HALF_SPEED => "half",
    }
}

native_enum! {
    /// DAC test patterns, for diagnosing the readout chain
    pub enum TestMode {
        Off = ffi::TEST_OFF => "off",
        DacAlternating = ffi::TEST_DAC_ALTERNATING => "dac_alternating",
        DacAllOnes = ffi::TEST_DAC_ALL_ONES => "dac_all_ones",
        DacAllZeros = ffi::TEST_DAC_ALL_ZEROS => "dac_all_zeros",
    }
}

native_enum! {
    pub enum AdcGain {
        X1 = ffi::ADC_GAIN_X1 => "x1",
        X2 = ffi::ADC_GAIN_X2 => "x2",
        X4 = ffi::ADC_GAIN_X4 => "x4",
    }
}
