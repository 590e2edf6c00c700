//! Event codes and conversion constants
//!
//! Kernel event types/codes (from linux/input-event-codes.h) and the
//! platform binding that maps them onto sensor fields. These are fixed for
//! the KXTF9 accelerometer and MAX9635 ambient-light parts.

// Event types
pub const EV_SYN: u16 = 0x00;
pub const EV_ABS: u16 = 0x03;
pub const EV_MSC: u16 = 0x04;
pub const EV_LED: u16 = 0x11;

// Absolute axes
pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;

pub const MSC_RAW: u16 = 0x03;
pub const LED_MISC: u16 = 0x08;

/// Axis codes reported by the accelerometer input device
pub const EVENT_TYPE_ACCEL_X: u16 = ABS_X;
pub const EVENT_TYPE_ACCEL_Y: u16 = ABS_Y;
pub const EVENT_TYPE_ACCEL_Z: u16 = ABS_Z;

/// LED channel carrying the ambient-light index
pub const EVENT_TYPE_LIGHT: u16 = LED_MISC;

/// Sensor handles, as exposed to the sensor service
pub const ID_A: i32 = 0;
pub const ID_O: i32 = 2;
pub const ID_L: i32 = 5;

/// Sensor types (sensors.h numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum SensorType {
    #[default]
    Accelerometer = 1,
    Light = 5,
}

/// Sample accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i8)]
pub enum Accuracy {
    #[default]
    Unreliable = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

pub const GRAVITY_EARTH: f32 = 9.80665;

// KXTF9 reports milli-g
pub const CONVERT_A: f32 = GRAVITY_EARTH / 1000.0;
pub const CONVERT_A_X: f32 = CONVERT_A;
pub const CONVERT_A_Y: f32 = CONVERT_A;
pub const CONVERT_A_Z: f32 = CONVERT_A;

/// Scale factor for an accelerometer axis code
pub fn accel_scale(code: u16) -> Option<f32> {
    match code {
        EVENT_TYPE_ACCEL_X => Some(CONVERT_A_X),
        EVENT_TYPE_ACCEL_Y => Some(CONVERT_A_Y),
        EVENT_TYPE_ACCEL_Z => Some(CONVERT_A_Z),
        _ => None,
    }
}
