//! Raw input records and outbound sensor events

use crate::codes::{Accuracy, SensorType};
use serde::{Deserialize, Serialize};

/// Raw input event from evdev
///
/// Layout matches the kernel's `struct input_event` for the target ABI, so a
/// record can be read straight out of the event device.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputEvent {
    pub tv_sec: libc::time_t,
    pub tv_usec: libc::suseconds_t,
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

const _: () =
    assert!(std::mem::size_of::<InputEvent>() == std::mem::size_of::<libc::input_event>());

impl InputEvent {
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
            ..Default::default()
        }
    }

    /// Same record with the given kernel timestamp
    pub fn at(mut self, sec: i64, usec: i64) -> Self {
        self.tv_sec = sec as libc::time_t;
        self.tv_usec = usec as libc::suseconds_t;
        self
    }

    /// Kernel timestamp in nanoseconds
    pub fn timestamp_nanos(&self) -> i64 {
        crate::sensor::timeval_to_nanos(self.tv_sec as i64, self.tv_usec as i64)
    }
}

/// Kernel `struct input_absinfo`, as returned by `EVIOCGABS`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsInfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

/// Three-axis sample in m/s²
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorPayload {
    Acceleration(Vector3),
    Light(f32),
}

impl Default for SensorPayload {
    fn default() -> Self {
        SensorPayload::Acceleration(Vector3::default())
    }
}

/// Event handed to the sensor service
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    pub version: i32,
    pub sensor: i32,
    pub sensor_type: SensorType,
    /// Nanoseconds
    pub timestamp: i64,
    pub payload: SensorPayload,
    pub status: Accuracy,
}

impl SensorEvent {
    pub fn new(sensor: i32, sensor_type: SensorType, payload: SensorPayload) -> Self {
        Self {
            version: std::mem::size_of::<SensorEvent>() as i32,
            sensor,
            sensor_type,
            timestamp: 0,
            payload,
            status: Accuracy::Unreliable,
        }
    }

    pub fn acceleration(&self) -> Option<Vector3> {
        match self.payload {
            SensorPayload::Acceleration(v) => Some(v),
            _ => None,
        }
    }

    pub fn light(&self) -> Option<f32> {
        match self.payload {
            SensorPayload::Light(lux) => Some(lux),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{EV_SYN, ID_L};

    #[test]
    fn test_input_event_timestamp() {
        let ev = InputEvent::new(EV_SYN, 0, 0).at(1, 1);
        assert_eq!(ev.timestamp_nanos(), 1_000_001_000);
    }

    #[test]
    fn test_payload_accessors() {
        let ev = SensorEvent::new(ID_L, SensorType::Light, SensorPayload::Light(12.5));
        assert_eq!(ev.light(), Some(12.5));
        assert!(ev.acceleration().is_none());
        assert_eq!(ev.version as usize, std::mem::size_of::<SensorEvent>());
    }

    #[test]
    fn test_sensor_event_json() {
        let ev = SensorEvent::new(ID_L, SensorType::Light, SensorPayload::Light(3.0));
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"light\":3.0"));
        assert!(json.contains("\"sensor_type\":\"light\""));
    }
}
