//! Ambient-light adapter (MAX9635)
//!
//! The driver is not toggled from here; enabling only gates forwarding.
//! Each off-to-on transition arms one synthetic emission of the last known
//! value, so a client that subscribes while the light level is stable still
//! gets a reading right away.

use crate::codes::{EV_LED, EV_MSC, EV_SYN, EVENT_TYPE_LIGHT, ID_L, MSC_RAW, SensorType};
use crate::device::{ControlNode, EventDevice, EventSource};
use crate::error::SensorError;
use crate::event::{SensorEvent, SensorPayload};
use crate::reader::InputEventReader;
use crate::sensor::{
    SensorAdapter, SensorBase, check_capacity, delay_to_millis, monotonic_timestamp,
};
use std::os::fd::BorrowedFd;
use std::path::Path;

const READER_CAPACITY: usize = 4;

/// Maps the driver's light index to the reported value
pub type IndexToValue = fn(i32) -> f32;

/// Default mapping: the index is the value
pub fn identity_index(index: i32) -> f32 {
    index as f32
}

pub struct LightSensor<D> {
    base: SensorBase<Option<ControlNode>, D>,
    enabled: bool,
    has_pending_event: bool,
    pending: SensorEvent,
    reader: InputEventReader,
    index_to_value: IndexToValue,
}

impl<D: EventSource> LightSensor<D> {
    /// `control` is kept open for the adapter's lifetime; no ioctls are issued on it
    pub fn new(control: Option<ControlNode>, data: D) -> Self {
        Self {
            base: SensorBase::new(control, data),
            enabled: false,
            has_pending_event: false,
            pending: SensorEvent::new(ID_L, SensorType::Light, SensorPayload::Light(0.0)),
            reader: InputEventReader::new(READER_CAPACITY),
            index_to_value: identity_index,
        }
    }

    pub fn with_conversion(mut self, index_to_value: IndexToValue) -> Self {
        self.index_to_value = index_to_value;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pending(&self) -> &SensorEvent {
        &self.pending
    }

    pub fn set_enabled(&mut self, on: bool) {
        if on && !self.enabled {
            // report a value immediately
            self.has_pending_event = true;
        }
        tracing::debug!("Light enable -> {}", on);
        self.enabled = on;
    }

    pub fn index_to_value(&self, index: i32) -> f32 {
        (self.index_to_value)(index)
    }
}

impl LightSensor<EventDevice> {
    /// Open the optional driver node and the input device named `input_name`
    pub fn open(control_path: Option<&Path>, input_name: &str) -> Result<Self, SensorError> {
        let control = control_path.map(ControlNode::open).transpose()?;
        let data = EventDevice::open_by_name(input_name)?;
        tracing::info!("Light sensor on {}", data.path().display());
        Ok(Self::new(control, data))
    }
}

impl<D: EventSource> SensorAdapter for LightSensor<D> {
    fn enable(&mut self, handle: i32, on: bool) -> Result<(), SensorError> {
        if handle != ID_L {
            return Err(SensorError::InvalidArgument("unknown light handle"));
        }
        self.set_enabled(on);
        Ok(())
    }

    fn set_delay(&mut self, ns: i64) -> Result<(), SensorError> {
        // the part free-runs; only validate the request
        delay_to_millis(ns).map(drop)
    }

    fn read_events(&mut self, out: &mut [SensorEvent]) -> Result<usize, SensorError> {
        check_capacity(out)?;

        if self.has_pending_event {
            self.has_pending_event = false;
            self.pending.timestamp = monotonic_timestamp();
            out[0] = self.pending;
            return Ok(usize::from(self.enabled));
        }

        self.reader.fill(&mut self.base.data)?;

        let mut received = 0;
        while received < out.len() {
            let Some(&event) = self.reader.read_event() else {
                break;
            };
            match (event.event_type, event.code) {
                (EV_LED, EVENT_TYPE_LIGHT) => {
                    self.pending.payload = SensorPayload::Light(self.index_to_value(event.value));
                }
                (EV_LED, _) => {}
                (EV_SYN, _) => {
                    self.pending.timestamp = event.timestamp_nanos();
                    if self.enabled {
                        out[received] = self.pending;
                        received += 1;
                    }
                }
                // emitted constantly by the driver
                (EV_MSC, MSC_RAW) => {}
                (event_type, code) => tracing::warn!(
                    "LightSensor: unknown event (type={}, code={})",
                    event_type,
                    code
                ),
            }
            self.reader.next();
        }

        Ok(received)
    }

    fn has_pending_events(&self) -> bool {
        self.has_pending_event
    }

    fn poll_fd(&self) -> BorrowedFd<'_> {
        self.base.data_fd()
    }
}

impl<D> std::fmt::Debug for LightSensor<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightSensor")
            .field("enabled", &self.enabled)
            .field("has_pending_event", &self.has_pending_event)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::InputEvent;
    use crate::mock::MockEventSource;

    fn sensor() -> (LightSensor<MockEventSource>, MockEventSource) {
        let input = MockEventSource::new().unwrap();
        (LightSensor::new(None, input.clone()), input)
    }

    #[test]
    fn test_enable_arms_synthetic_once() {
        let (mut light, _) = sensor();
        assert!(!light.has_pending_events());

        light.set_enabled(true);
        assert!(light.has_pending_events());

        let mut out = [SensorEvent::default(); 2];
        assert_eq!(light.read_events(&mut out).unwrap(), 1);
        assert!(!light.has_pending_events());
    }

    #[test]
    fn test_reenable_while_on_does_not_rearm() {
        let (mut light, _) = sensor();
        light.set_enabled(true);
        let mut out = [SensorEvent::default(); 1];
        light.read_events(&mut out).unwrap();

        light.set_enabled(true);
        assert!(!light.has_pending_events());
    }

    #[test]
    fn test_synthetic_after_disable_reports_zero() {
        let (mut light, input) = sensor();
        light.set_enabled(true);
        light.set_enabled(false);

        let mut out = [SensorEvent::default(); 1];
        assert_eq!(light.read_events(&mut out).unwrap(), 0);
        assert_eq!(input.read_calls(), 0);
        assert!(!light.has_pending_events());
    }

    #[test]
    fn test_custom_conversion() {
        let input = MockEventSource::new().unwrap();
        let mut light = LightSensor::new(None, input.clone()).with_conversion(|i| i as f32 * 2.5);
        light.set_enabled(true);
        let mut out = [SensorEvent::default(); 4];
        light.read_events(&mut out).unwrap();

        input.push_events(&[
            InputEvent::new(EV_LED, EVENT_TYPE_LIGHT, 4),
            InputEvent::new(EV_SYN, 0, 0).at(5, 0),
        ]);
        assert_eq!(light.read_events(&mut out).unwrap(), 1);
        assert_eq!(out[0].light(), Some(10.0));
    }

    #[test]
    fn test_other_led_codes_ignored() {
        let (mut light, input) = sensor();
        input.push_events(&[
            InputEvent::new(EV_LED, 0x00, 9), // LED_NUML
            InputEvent::new(EV_SYN, 0, 0),
        ]);
        light.set_enabled(true);
        let mut out = [SensorEvent::default(); 4];
        light.read_events(&mut out).unwrap(); // synthetic
        assert_eq!(light.read_events(&mut out).unwrap(), 1);
        assert_eq!(out[0].light(), Some(0.0));
    }

    #[test]
    fn test_set_delay_validation() {
        let (mut light, _) = sensor();
        assert!(light.set_delay(200_000_000).is_ok());
        assert_eq!(light.set_delay(-5).unwrap_err().status(), -libc::EINVAL);
    }

    #[test]
    fn test_wrong_handle() {
        let (mut light, _) = sensor();
        assert!(light.enable(crate::codes::ID_A, true).is_err());
        assert!(!light.is_enabled());
    }
}
