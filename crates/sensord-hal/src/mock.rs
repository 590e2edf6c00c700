//! Mock drivers for testing without real hardware
//!
//! The mocks keep their state behind `Arc<RwLock<..>>`, so a test can keep a
//! clone of the handle after moving the mock into an adapter and inspect the
//! ioctls it received or queue more input records.
//!
//! # Usage
//!
//! Built for this crate's own tests and behind the `mock` feature.
//!
//! ```no_run
//! use sensord_hal::mock::{MockEventSource, MockKxtf9};
//! use sensord_hal::{AccelerationSensor, InputEvent, EV_SYN};
//!
//! fn main() -> std::io::Result<()> {
//!     let driver = MockKxtf9::new();
//!     let input = MockEventSource::new()?;
//!     let _accel = AccelerationSensor::new(driver.clone(), input.clone());
//!
//!     input.push_event(InputEvent::new(EV_SYN, 0, 0));
//!     Ok(())
//! }
//! ```

use crate::device::{AccelControl, EventSource};
use crate::event::{AbsInfo, InputEvent};
use nix::errno::Errno;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::sync::{Arc, RwLock};

/// Ioctl received by [`MockKxtf9`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockIoctl {
    GetEnable,
    SetEnable(i32),
    SetDelay(i16),
}

/// Shared state of a mock accelerometer driver
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Hardware enable as the driver sees it
    pub enabled: bool,
    /// Last accepted delay
    pub delay_ms: i16,
    /// Every ioctl, in order
    pub ioctls: Vec<MockIoctl>,
    /// Error returned by the next ioctl
    pub fail_next: Option<Errno>,
}

/// Mock KXTF9 control node
#[derive(Debug, Clone, Default)]
pub struct MockKxtf9 {
    state: Arc<RwLock<MockDriverState>>,
}

impl MockKxtf9 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver that reports the hardware as already enabled
    pub fn enabled() -> Self {
        let mock = Self::new();
        if let Ok(mut state) = mock.state.write() {
            state.enabled = true;
        }
        mock
    }

    pub fn ioctls(&self) -> Vec<MockIoctl> {
        self.state
            .read()
            .map(|s| s.ioctls.clone())
            .unwrap_or_default()
    }

    /// Values passed to SET_ENABLE, in order
    pub fn set_enable_calls(&self) -> Vec<i32> {
        self.ioctls()
            .into_iter()
            .filter_map(|ioctl| match ioctl {
                MockIoctl::SetEnable(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn clear_ioctls(&self) {
        if let Ok(mut state) = self.state.write() {
            state.ioctls.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().map(|s| s.enabled).unwrap_or(false)
    }

    pub fn delay_ms(&self) -> i16 {
        self.state.read().map(|s| s.delay_ms).unwrap_or(0)
    }

    pub fn fail_next(&self, errno: Errno) {
        if let Ok(mut state) = self.state.write() {
            state.fail_next = Some(errno);
        }
    }

    fn issue(&self, ioctl: MockIoctl) -> Result<MockIoctl, Errno> {
        let mut state = self.state.write().map_err(|_| Errno::EIO)?;
        state.ioctls.push(ioctl);
        match state.fail_next.take() {
            Some(errno) => Err(errno),
            None => Ok(ioctl),
        }
    }
}

impl AccelControl for MockKxtf9 {
    fn get_enable(&self) -> Result<bool, Errno> {
        self.issue(MockIoctl::GetEnable)?;
        Ok(self.is_enabled())
    }

    fn set_enable(&mut self, enable: bool) -> Result<(), Errno> {
        self.issue(MockIoctl::SetEnable(i32::from(enable)))?;
        let mut state = self.state.write().map_err(|_| Errno::EIO)?;
        state.enabled = enable;
        Ok(())
    }

    fn set_delay(&mut self, delay_ms: i16) -> Result<(), Errno> {
        self.issue(MockIoctl::SetDelay(delay_ms))?;
        let mut state = self.state.write().map_err(|_| Errno::EIO)?;
        state.delay_ms = delay_ms;
        Ok(())
    }
}

/// Shared state of a mock event device
#[derive(Debug, Default)]
pub struct MockInputState {
    /// Records waiting to be read
    pub queue: VecDeque<InputEvent>,
    /// Values reported by `EVIOCGABS`
    pub abs: HashMap<u16, i32>,
    /// Number of reads performed
    pub read_calls: usize,
    /// errno returned by the next read
    pub fail_next_read: Option<i32>,
}

/// Mock evdev node
///
/// Reads drain the queue; an empty queue reads as zero records instead of
/// blocking. The descriptor handed to pollers is `/dev/null`.
#[derive(Debug, Clone)]
pub struct MockEventSource {
    state: Arc<RwLock<MockInputState>>,
    null: Arc<File>,
}

impl MockEventSource {
    /// Backed by `/dev/null`, which supplies the pollable descriptor
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            state: Arc::new(RwLock::new(MockInputState::default())),
            null: Arc::new(File::open("/dev/null")?),
        })
    }

    pub fn push_event(&self, event: InputEvent) {
        self.push_events(&[event]);
    }

    pub fn push_events(&self, events: &[InputEvent]) {
        if let Ok(mut state) = self.state.write() {
            state.queue.extend(events.iter().copied());
        }
    }

    /// Set the cached value of an absolute axis
    pub fn set_abs(&self, axis: u16, value: i32) {
        if let Ok(mut state) = self.state.write() {
            state.abs.insert(axis, value);
        }
    }

    pub fn fail_next_read(&self, errno: i32) {
        if let Ok(mut state) = self.state.write() {
            state.fail_next_read = Some(errno);
        }
    }

    pub fn queued(&self) -> usize {
        self.state.read().map(|s| s.queue.len()).unwrap_or(0)
    }

    pub fn read_calls(&self) -> usize {
        self.state.read().map(|s| s.read_calls).unwrap_or(0)
    }
}

impl AsFd for MockEventSource {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.null.as_fd()
    }
}

impl EventSource for MockEventSource {
    fn read_events(&mut self, buf: &mut [InputEvent]) -> io::Result<usize> {
        let mut state = self
            .state
            .write()
            .map_err(|_| io::Error::from_raw_os_error(libc::EIO))?;
        state.read_calls += 1;
        if let Some(errno) = state.fail_next_read.take() {
            return Err(io::Error::from_raw_os_error(errno));
        }

        let mut count = 0;
        for slot in buf.iter_mut() {
            match state.queue.pop_front() {
                Some(event) => {
                    *slot = event;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }

    fn abs_info(&self, axis: u16) -> Result<AbsInfo, Errno> {
        let state = self.state.read().map_err(|_| Errno::EIO)?;
        state
            .abs
            .get(&axis)
            .map(|&value| AbsInfo {
                value,
                ..Default::default()
            })
            .ok_or(Errno::EINVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{ABS_X, EV_SYN};

    #[test]
    fn test_mock_driver_records_ioctls() {
        let mut driver = MockKxtf9::new();
        driver.set_enable(true).unwrap();
        driver.set_delay(20).unwrap();

        assert!(driver.is_enabled());
        assert_eq!(driver.delay_ms(), 20);
        assert_eq!(
            driver.ioctls(),
            vec![MockIoctl::SetEnable(1), MockIoctl::SetDelay(20)]
        );
    }

    #[test]
    fn test_mock_driver_failure_is_one_shot() {
        let mut driver = MockKxtf9::new();
        driver.fail_next(Errno::EIO);
        assert_eq!(driver.set_enable(true), Err(Errno::EIO));
        assert!(!driver.is_enabled());
        assert_eq!(driver.set_enable(true), Ok(()));
    }

    #[test]
    fn test_mock_source_shares_state_across_clones() {
        let source = MockEventSource::new().unwrap();
        let mut reader_side = source.clone();
        source.push_event(InputEvent::new(EV_SYN, 0, 0));

        let mut buf = [InputEvent::default(); 4];
        assert_eq!(reader_side.read_events(&mut buf).unwrap(), 1);
        assert_eq!(source.queued(), 0);
        assert_eq!(source.read_calls(), 1);
    }

    #[test]
    fn test_mock_abs_info() {
        let source = MockEventSource::new().unwrap();
        source.set_abs(ABS_X, 10);
        assert_eq!(source.abs_info(ABS_X).unwrap().value, 10);
        assert_eq!(source.abs_info(0x05), Err(Errno::EINVAL));
    }

    #[test]
    fn test_mock_source_fd_is_pollable_and_shared() {
        use std::os::fd::AsRawFd;

        let source = MockEventSource::new().unwrap();
        let clone = source.clone();
        assert!(source.as_fd().as_raw_fd() >= 0);
        assert_eq!(source.as_fd().as_raw_fd(), clone.as_fd().as_raw_fd());
    }
}
