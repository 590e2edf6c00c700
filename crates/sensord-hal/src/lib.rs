//! Sensor adapters for Linux input devices
//!
//! Translates raw evdev records from a KXTF9 accelerometer and a MAX9635
//! ambient-light sensor into timestamped [`SensorEvent`]s for a sensor service.
//!
//! Each adapter owns two descriptors: the driver's control node (ioctls) and
//! the input device the driver reports samples on. The host polls
//! [`SensorAdapter::poll_fd`] and calls [`SensorAdapter::read_events`] when it
//! is readable, or straight away while [`SensorAdapter::has_pending_events`]
//! holds.
//!
//! # Example
//!
//! ```no_run
//! use sensord_hal::{AccelerationSensor, ID_A, SensorAdapter, SensorEvent};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut accel = AccelerationSensor::open(Path::new("/dev/kxtf9"), "accelerometer")?;
//!     accel.enable(ID_A, true)?;
//!
//!     let mut events = [SensorEvent::default(); 16];
//!     let n = accel.read_events(&mut events)?;
//!     for event in &events[..n] {
//!         println!("{:?}", event.acceleration());
//!     }
//!     Ok(())
//! }
//! ```

pub mod accel;
pub mod codes;
pub mod device;
pub mod error;
pub mod event;
pub mod light;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod reader;
pub mod sensor;

pub use accel::{AccelClient, AccelerationSensor};
pub use codes::*;
pub use device::{AccelControl, ControlNode, EventDevice, EventSource, Kxtf9, find_input_device};
pub use error::SensorError;
pub use event::{AbsInfo, InputEvent, SensorEvent, SensorPayload, Vector3};
pub use light::{IndexToValue, LightSensor, identity_index};
pub use reader::InputEventReader;
pub use sensor::{SensorAdapter, SensorBase, monotonic_timestamp, timeval_to_nanos};
