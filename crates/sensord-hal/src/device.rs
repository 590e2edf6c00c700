//! Device nodes and kernel bindings
//!
//! Each adapter talks to two descriptors: the driver's misc node, used for
//! device-private ioctls, and the evdev node the driver reports samples on.
//! Both sides sit behind small traits so the adapters can run against the
//! mocks in [`crate::mock`].

use crate::error::SensorError;
use crate::event::{AbsInfo, InputEvent};
use nix::errno::Errno;
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};

/// Source of raw input records (the data descriptor)
pub trait EventSource: AsFd {
    /// Single read of up to `buf.len()` records; returns the number read
    fn read_events(&mut self, buf: &mut [InputEvent]) -> std::io::Result<usize>;

    /// Cached state of an absolute axis (`EVIOCGABS`)
    fn abs_info(&self, axis: u16) -> Result<AbsInfo, Errno>;
}

/// Enable/delay control of an accelerometer driver (the control descriptor)
pub trait AccelControl {
    fn get_enable(&self) -> Result<bool, Errno>;
    fn set_enable(&mut self, enable: bool) -> Result<(), Errno>;
    fn set_delay(&mut self, delay_ms: i16) -> Result<(), Errno>;
}

mod ioctl {
    use libc::c_int;

    const KXTF9_IOCTL_BASE: u8 = 77;

    // The driver declares SET_DELAY with an int but reads a short.
    nix::ioctl_write_ptr_bad!(
        kxtf9_set_delay,
        nix::request_code_write!(KXTF9_IOCTL_BASE, 0, std::mem::size_of::<c_int>()),
        i16
    );
    nix::ioctl_write_ptr!(kxtf9_set_enable, KXTF9_IOCTL_BASE, 2, c_int);
    nix::ioctl_read!(kxtf9_get_enable, KXTF9_IOCTL_BASE, 3, c_int);
}

/// Driver misc node (e.g. `/dev/kxtf9`)
#[derive(Debug)]
pub struct ControlNode {
    file: File,
}

impl ControlNode {
    pub fn open(path: &Path) -> Result<Self, SensorError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| SensorError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!("Opened control node {}", path.display());
        Ok(Self { file })
    }
}

impl AsFd for ControlNode {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// KXTF9 accelerometer driver
#[derive(Debug)]
pub struct Kxtf9 {
    node: ControlNode,
}

impl Kxtf9 {
    pub fn new(node: ControlNode) -> Self {
        Self { node }
    }

    pub fn open(path: &Path) -> Result<Self, SensorError> {
        ControlNode::open(path).map(Self::new)
    }
}

impl AccelControl for Kxtf9 {
    fn get_enable(&self) -> Result<bool, Errno> {
        let mut flags: libc::c_int = 0;
        let fd = self.node.as_fd().as_raw_fd();
        // SAFETY: the fd is owned by `node` and `flags` outlives the call
        unsafe { ioctl::kxtf9_get_enable(fd, &mut flags) }.map(|_| flags != 0)
    }

    fn set_enable(&mut self, enable: bool) -> Result<(), Errno> {
        let flags = libc::c_int::from(enable);
        let fd = self.node.as_fd().as_raw_fd();
        // SAFETY: as above
        unsafe { ioctl::kxtf9_set_enable(fd, &flags) }.map(drop)
    }

    fn set_delay(&mut self, delay_ms: i16) -> Result<(), Errno> {
        let fd = self.node.as_fd().as_raw_fd();
        // SAFETY: as above
        unsafe { ioctl::kxtf9_set_delay(fd, &delay_ms) }.map(drop)
    }
}

/// Evdev node (`/dev/input/eventN`)
#[derive(Debug)]
pub struct EventDevice {
    file: File,
    path: PathBuf,
}

impl EventDevice {
    pub fn open(path: &Path) -> Result<Self, SensorError> {
        let file = File::open(path).map_err(|source| SensorError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open the event device whose kernel name is `name`
    pub fn open_by_name(name: &str) -> Result<Self, SensorError> {
        let path = find_input_device(Path::new("/dev/input"), name)?
            .ok_or_else(|| SensorError::DeviceNotFound(name.to_string()))?;
        tracing::info!("Found input device '{}' at {}", name, path.display());
        Self::open(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsFd for EventDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl EventSource for EventDevice {
    fn read_events(&mut self, buf: &mut [InputEvent]) -> std::io::Result<usize> {
        let record = std::mem::size_of::<InputEvent>();
        // SAFETY: InputEvent is repr(C) plain data; any byte pattern is valid
        let bytes = unsafe {
            std::slice::from_raw_parts_mut(buf.as_mut_ptr().cast::<u8>(), buf.len() * record)
        };
        let n = self.file.read(bytes)?;
        // evdev only hands out whole records
        Ok(n / record)
    }

    fn abs_info(&self, axis: u16) -> Result<AbsInfo, Errno> {
        let mut info = AbsInfo::default();
        let request = nix::request_code_read!(
            b'E',
            0x40 + axis as usize,
            std::mem::size_of::<AbsInfo>()
        );
        // SAFETY: EVIOCGABS fills exactly one input_absinfo
        let res = unsafe {
            libc::ioctl(self.file.as_raw_fd(), request as _, &mut info as *mut AbsInfo)
        };
        Errno::result(res)?;
        Ok(info)
    }
}

/// Scan `input_dir` for an `eventN` node whose sysfs name matches `name`
pub fn find_input_device(input_dir: &Path, name: &str) -> Result<Option<PathBuf>, SensorError> {
    if !input_dir.exists() {
        return Ok(None);
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        let is_event = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with("event"))
            .unwrap_or(false);
        if is_event {
            candidates.push(path);
        }
    }
    candidates.sort();

    Ok(candidates
        .into_iter()
        .find(|path| device_name(path).as_deref() == Some(name)))
}

/// Kernel name of an event node, from sysfs
fn device_name(path: &Path) -> Option<String> {
    let node = path.file_name()?.to_string_lossy();
    let sysfs_path = format!("/sys/class/input/{}/device/name", node);
    fs::read_to_string(sysfs_path)
        .ok()
        .map(|s| s.trim().to_string())
}
