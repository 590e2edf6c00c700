//! Adapter base and the contract the sensor service drives

use crate::error::SensorError;
use crate::event::SensorEvent;
use nix::time::{ClockId, clock_gettime};
use std::os::fd::{AsFd, BorrowedFd};

/// Operations the sensor service issues against one adapter
pub trait SensorAdapter {
    /// Reconcile the caller's enable request for `handle` with the hardware
    fn enable(&mut self, handle: i32, on: bool) -> Result<(), SensorError>;

    /// Request a sampling period in nanoseconds
    fn set_delay(&mut self, ns: i64) -> Result<(), SensorError>;

    /// Fill `out` with completed samples; returns how many were written
    fn read_events(&mut self, out: &mut [SensorEvent]) -> Result<usize, SensorError>;

    /// Whether a sample is ready without consulting the descriptor
    fn has_pending_events(&self) -> bool {
        false
    }

    /// Data descriptor for the host's readiness loop
    fn poll_fd(&self) -> BorrowedFd<'_>;
}

/// Control and data descriptors shared by every adapter
#[derive(Debug)]
pub struct SensorBase<C, D> {
    pub(crate) control: C,
    pub(crate) data: D,
}

impl<C, D: AsFd> SensorBase<C, D> {
    pub fn new(control: C, data: D) -> Self {
        Self { control, data }
    }

    pub fn data_fd(&self) -> BorrowedFd<'_> {
        self.data.as_fd()
    }
}

/// `CLOCK_MONOTONIC` in nanoseconds
pub fn monotonic_timestamp() -> i64 {
    match clock_gettime(ClockId::CLOCK_MONOTONIC) {
        Ok(ts) => ts.tv_sec() as i64 * 1_000_000_000 + ts.tv_nsec() as i64,
        Err(e) => {
            tracing::error!("clock_gettime(CLOCK_MONOTONIC) failed: {}", e);
            0
        }
    }
}

/// Kernel timeval to nanoseconds
pub fn timeval_to_nanos(sec: i64, usec: i64) -> i64 {
    sec * 1_000_000_000 + usec * 1_000
}

/// Nanosecond delay to the driver's 16-bit millisecond field.
///
/// Truncates toward zero and saturates at `i16::MAX`.
pub fn delay_to_millis(ns: i64) -> Result<i16, SensorError> {
    if ns < 0 {
        return Err(SensorError::InvalidArgument("negative delay"));
    }
    Ok(i16::try_from(ns / 1_000_000).unwrap_or(i16::MAX))
}

pub(crate) fn check_capacity(out: &[SensorEvent]) -> Result<(), SensorError> {
    if out.is_empty() {
        return Err(SensorError::InvalidArgument("event buffer is empty"));
    }
    Ok(())
}
