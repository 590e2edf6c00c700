//! Accelerometer adapter
//!
//! The KXTF9 is shared by two clients: the raw accelerometer and the
//! orientation derivation. The hardware stays on while either of them wants
//! it; this is a two-bit OR, not a reference count.

use crate::codes::{
    Accuracy, EV_ABS, EV_SYN, EVENT_TYPE_ACCEL_X, EVENT_TYPE_ACCEL_Y, EVENT_TYPE_ACCEL_Z, ID_A,
    ID_O, SensorType, accel_scale,
};
use crate::device::{AccelControl, EventDevice, EventSource, Kxtf9};
use crate::error::SensorError;
use crate::event::{SensorEvent, SensorPayload, Vector3};
use crate::reader::InputEventReader;
use crate::sensor::{SensorAdapter, SensorBase, check_capacity, delay_to_millis};
use std::os::fd::BorrowedFd;
use std::path::Path;

const READER_CAPACITY: usize = 32;

/// Logical client of the shared accelerometer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelClient {
    Raw,
    Orientation,
}

impl AccelClient {
    pub fn from_handle(handle: i32) -> Option<Self> {
        match handle {
            ID_A => Some(AccelClient::Raw),
            ID_O => Some(AccelClient::Orientation),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AccelClient::Raw => "accelerometer",
            AccelClient::Orientation => "orientation",
        }
    }
}

pub struct AccelerationSensor<C, D> {
    base: SensorBase<C, D>,
    enabled: bool,
    orientation_enabled: bool,
    pending: SensorEvent,
    reader: InputEventReader,
}

impl<C: AccelControl, D: EventSource> AccelerationSensor<C, D> {
    /// Create the adapter and recover hardware state.
    ///
    /// If the driver is already enabled, the raw client is latched on and the
    /// pending sample is seeded from the kernel's cached axis values.
    pub fn new(control: C, data: D) -> Self {
        let mut pending = SensorEvent::new(
            ID_A,
            SensorType::Accelerometer,
            SensorPayload::Acceleration(Vector3::default()),
        );
        pending.status = Accuracy::High;

        let mut sensor = Self {
            base: SensorBase::new(control, data),
            enabled: false,
            orientation_enabled: false,
            pending,
            reader: InputEventReader::new(READER_CAPACITY),
        };
        sensor.recover_state();
        sensor
    }

    fn recover_state(&mut self) {
        let enabled = match self.base.control.get_enable() {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::warn!("KXTF9_IOCTL_GET_ENABLE failed ({}), assuming disabled", e);
                return;
            }
        };
        tracing::debug!("Accelerometer enabled at startup: {}", enabled);
        if !enabled {
            return;
        }

        self.enabled = true;
        for axis in [EVENT_TYPE_ACCEL_X, EVENT_TYPE_ACCEL_Y, EVENT_TYPE_ACCEL_Z] {
            match self.base.data.abs_info(axis) {
                Ok(info) => self.process_event(axis, info.value),
                Err(e) => tracing::warn!("EVIOCGABS({}) failed: {}", axis, e),
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_orientation_enabled(&self) -> bool {
        self.orientation_enabled
    }

    /// Hardware is on while either client wants it
    pub fn is_hardware_on(&self) -> bool {
        self.enabled || self.orientation_enabled
    }

    /// Last accumulated sample
    pub fn pending(&self) -> &SensorEvent {
        &self.pending
    }

    /// Raw accelerometer client
    pub fn set_enabled(&mut self, on: bool) -> Result<(), SensorError> {
        self.set_client_enabled(AccelClient::Raw, on)
    }

    /// Orientation client
    pub fn set_orientation_enabled(&mut self, on: bool) -> Result<(), SensorError> {
        self.set_client_enabled(AccelClient::Orientation, on)
    }

    pub fn set_client_enabled(&mut self, client: AccelClient, on: bool) -> Result<(), SensorError> {
        let (current, other) = match client {
            AccelClient::Raw => (self.enabled, self.orientation_enabled),
            AccelClient::Orientation => (self.orientation_enabled, self.enabled),
        };
        if on == current {
            return Ok(());
        }

        // don't power down while the other client still wants samples
        if !on && other {
            tracing::debug!(
                "{} disabled, hardware kept on for the other client",
                client.name()
            );
            self.latch(client, false);
            return Ok(());
        }

        tracing::debug!("{} enable -> {}", client.name(), on);
        if let Err(e) = self.base.control.set_enable(on) {
            tracing::error!("KXTF9_IOCTL_SET_ENABLE failed ({})", e);
            return Err(SensorError::driver("KXTF9_IOCTL_SET_ENABLE", e));
        }
        self.latch(client, on);
        Ok(())
    }

    fn latch(&mut self, client: AccelClient, on: bool) {
        match client {
            AccelClient::Raw => self.enabled = on,
            AccelClient::Orientation => self.orientation_enabled = on,
        }
    }

    fn process_event(&mut self, code: u16, value: i32) {
        let Some(scale) = accel_scale(code) else {
            return;
        };
        if let SensorPayload::Acceleration(ref mut v) = self.pending.payload {
            let scaled = value as f32 * scale;
            match code {
                EVENT_TYPE_ACCEL_X => v.x = scaled,
                EVENT_TYPE_ACCEL_Y => v.y = scaled,
                _ => v.z = scaled,
            }
        }
    }
}

impl AccelerationSensor<Kxtf9, EventDevice> {
    /// Open the KXTF9 control node and the input device named `input_name`
    pub fn open(control_path: &Path, input_name: &str) -> Result<Self, SensorError> {
        let control = Kxtf9::open(control_path)?;
        let data = EventDevice::open_by_name(input_name)?;
        tracing::info!(
            "Accelerometer on {} ({})",
            data.path().display(),
            control_path.display()
        );
        Ok(Self::new(control, data))
    }
}

impl<C: AccelControl, D: EventSource> SensorAdapter for AccelerationSensor<C, D> {
    fn enable(&mut self, handle: i32, on: bool) -> Result<(), SensorError> {
        let client = AccelClient::from_handle(handle)
            .ok_or(SensorError::InvalidArgument("unknown accelerometer handle"))?;
        self.set_client_enabled(client, on)
    }

    fn set_delay(&mut self, ns: i64) -> Result<(), SensorError> {
        let delay_ms = delay_to_millis(ns)?;
        tracing::debug!("Accelerometer delay -> {} ms", delay_ms);
        self.base.control.set_delay(delay_ms).map_err(|e| {
            tracing::error!("KXTF9_IOCTL_SET_DELAY failed ({})", e);
            SensorError::driver("KXTF9_IOCTL_SET_DELAY", e)
        })
    }

    fn read_events(&mut self, out: &mut [SensorEvent]) -> Result<usize, SensorError> {
        check_capacity(out)?;
        self.reader.fill(&mut self.base.data)?;

        let mut received = 0;
        while received < out.len() {
            let Some(&event) = self.reader.read_event() else {
                break;
            };
            match event.event_type {
                EV_ABS => self.process_event(event.code, event.value),
                EV_SYN => {
                    self.pending.timestamp = event.timestamp_nanos();
                    if self.enabled {
                        out[received] = self.pending;
                        received += 1;
                    }
                }
                _ => tracing::warn!(
                    "AccelerationSensor: unknown event (type={}, code={})",
                    event.event_type,
                    event.code
                ),
            }
            self.reader.next();
        }

        Ok(received)
    }

    fn poll_fd(&self) -> BorrowedFd<'_> {
        self.base.data_fd()
    }
}

impl<C, D> std::fmt::Debug for AccelerationSensor<C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccelerationSensor")
            .field("enabled", &self.enabled)
            .field("orientation_enabled", &self.orientation_enabled)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{CONVERT_A_X, CONVERT_A_Y, CONVERT_A_Z, EV_LED};
    use crate::event::InputEvent;
    use crate::mock::{MockEventSource, MockIoctl, MockKxtf9};
    use nix::errno::Errno;

    fn sensor() -> (
        AccelerationSensor<MockKxtf9, MockEventSource>,
        MockKxtf9,
        MockEventSource,
    ) {
        let driver = MockKxtf9::new();
        let input = MockEventSource::new().unwrap();
        let accel = AccelerationSensor::new(driver.clone(), input.clone());
        (accel, driver, input)
    }

    #[test]
    fn test_starts_disabled() {
        let (accel, driver, _) = sensor();
        assert!(!accel.is_enabled());
        assert!(!accel.is_orientation_enabled());
        assert_eq!(driver.ioctls(), vec![MockIoctl::GetEnable]);
        assert_eq!(accel.pending().status, Accuracy::High);
    }

    #[test]
    fn test_enable_is_idempotent() {
        let (mut accel, driver, _) = sensor();
        accel.set_enabled(true).unwrap();
        accel.set_enabled(true).unwrap();
        assert_eq!(driver.set_enable_calls(), vec![1]);
    }

    #[test]
    fn test_second_client_on_reissues_ioctl() {
        let (mut accel, driver, _) = sensor();
        accel.set_orientation_enabled(true).unwrap();
        accel.set_enabled(true).unwrap();
        assert_eq!(driver.set_enable_calls(), vec![1, 1]);
    }

    #[test]
    fn test_enable_failure_leaves_latches() {
        let (mut accel, driver, _) = sensor();
        driver.fail_next(Errno::EIO);

        let err = accel.set_enabled(true).unwrap_err();
        assert_eq!(err.status(), -libc::EIO);
        assert!(!accel.is_enabled());
        assert!(!accel.is_orientation_enabled());
    }

    #[test]
    fn test_disable_failure_keeps_client_on() {
        let (mut accel, driver, _) = sensor();
        accel.set_enabled(true).unwrap();
        driver.fail_next(Errno::ENODEV);

        assert!(accel.set_enabled(false).is_err());
        assert!(accel.is_enabled());
        assert!(accel.is_hardware_on());
    }

    #[test]
    fn test_unknown_handle_rejected() {
        let (mut accel, driver, _) = sensor();
        let err = accel.enable(42, true).unwrap_err();
        assert_eq!(err.status(), -libc::EINVAL);
        assert!(driver.set_enable_calls().is_empty());
    }

    #[test]
    fn test_set_delay_truncates_to_millis() {
        let (mut accel, driver, _) = sensor();
        accel.set_delay(66_670_000).unwrap();
        assert_eq!(driver.delay_ms(), 66);

        accel.set_delay(10_000_000_000_000).unwrap();
        assert_eq!(driver.delay_ms(), i16::MAX);
    }

    #[test]
    fn test_set_delay_driver_error() {
        let (mut accel, driver, _) = sensor();
        driver.fail_next(Errno::EINVAL);
        assert_eq!(accel.set_delay(20_000_000).unwrap_err().status(), -libc::EINVAL);
    }

    #[test]
    fn test_unknown_events_are_dropped() {
        let (mut accel, _, input) = sensor();
        accel.set_enabled(true).unwrap();
        input.push_events(&[
            InputEvent::new(EV_LED, 0, 1),
            InputEvent::new(EV_ABS, 0x28, 7),
            InputEvent::new(EV_SYN, 0, 0).at(3, 0),
        ]);

        let mut out = [SensorEvent::default(); 4];
        assert_eq!(accel.read_events(&mut out).unwrap(), 1);
        assert_eq!(out[0].acceleration(), Some(Vector3::default()));
    }

    #[test]
    fn test_startup_seeding_scales_axes() {
        let driver = MockKxtf9::enabled();
        let input = MockEventSource::new().unwrap();
        input.set_abs(EVENT_TYPE_ACCEL_X, 10);
        input.set_abs(EVENT_TYPE_ACCEL_Y, 20);
        input.set_abs(EVENT_TYPE_ACCEL_Z, 30);

        let accel = AccelerationSensor::new(driver, input);
        assert!(accel.is_enabled());
        assert_eq!(
            accel.pending().acceleration(),
            Some(Vector3 {
                x: 10.0 * CONVERT_A_X,
                y: 20.0 * CONVERT_A_Y,
                z: 30.0 * CONVERT_A_Z,
            })
        );
    }

    #[test]
    fn test_startup_seeding_skips_failed_axis() {
        let driver = MockKxtf9::enabled();
        let input = MockEventSource::new().unwrap();
        input.set_abs(EVENT_TYPE_ACCEL_Y, 20);

        let accel = AccelerationSensor::new(driver, input);
        let v = accel.pending().acceleration().unwrap();
        assert_eq!(v.x, 0.0);
        assert_eq!(v.y, 20.0 * CONVERT_A_Y);
        assert_eq!(v.z, 0.0);
    }

    #[test]
    fn test_get_enable_failure_assumes_disabled() {
        let driver = MockKxtf9::enabled();
        driver.fail_next(Errno::ENOTTY);
        let accel = AccelerationSensor::new(driver, MockEventSource::new().unwrap());
        assert!(!accel.is_enabled());
    }
}
