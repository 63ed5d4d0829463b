//! Event Devices (`/dev/input/event*`)

use crate::config::ScanConfig;
use crate::error::{Result, ShimError};
use crate::ioctl::{ioctl_read_into, ioctl_read_slice, RequestCode, MAX_PAYLOAD_SIZE};
use crate::kernel_input::{
    eviocgabs, eviocgbit, eviocgid, eviocgkey, eviocgname, AbsoluteAxisInfo, BitSet, DeviceIdentity, EventType, InputEvent, ABS_MAX,
    EV_MAX, KEY_MAX,
};
use std::ffi::CString;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

pub struct EventDevice {
    fd: libc::c_int,
    path: PathBuf,
}
impl EventDevice {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_flags(path.as_ref(), libc::O_RDONLY)
    }
    /// Opens without blocking on `read_event`.
    pub fn open_nonblocking(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_flags(path.as_ref(), libc::O_RDONLY | libc::O_NONBLOCK)
    }

    fn open_with_flags(path: &Path, flags: libc::c_int) -> Result<Self> {
        let path_c = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| ShimError::invalid_argument(format!("nul byte in {}", path.display())))?;
        let fp = unsafe { libc::open(path_c.as_ptr(), flags | libc::O_CLOEXEC) };
        if fp < 0 {
            return Err(ShimError::last_os_error("open"));
        }

        debug!("opened event device {} (fd={fp})", path.display());
        Ok(Self {
            fd: fp,
            path: path.to_owned(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_event(&self) -> Result<InputEvent> {
        let mut ev = std::mem::MaybeUninit::<InputEvent>::uninit();
        let r = unsafe {
            libc::read(
                self.fd,
                ev.as_mut_ptr() as _,
                std::mem::size_of::<InputEvent>(),
            )
        };
        if r < 0 {
            return Err(ShimError::last_os_error("read"));
        }
        if r as usize != std::mem::size_of::<InputEvent>() {
            return Err(ShimError::invalid_argument(format!("short event read ({r} bytes)")));
        }

        Ok(unsafe { ev.assume_init() })
    }

    /// `EVIOCGID`
    pub fn identity(&self) -> Result<DeviceIdentity> {
        let mut id = DeviceIdentity::default();
        ioctl_read_into(self.fd, RequestCode(eviocgid()), &mut id)?;

        Ok(id)
    }

    /// `EVIOCGBIT`: codes of `ev` this device can emit, sized for codes `0 ..= max`.
    /// `ev == 0` queries the supported event types themselves.
    pub fn event_bits(&self, ev: u16, max: u16) -> Result<BitSet> {
        if ev > EV_MAX {
            return Err(ShimError::invalid_argument(format!("event type 0x{ev:x} > EV_MAX")));
        }

        let mut bits = BitSet::with_max(max);
        let len = payload_len(bits.byte_len())?;
        ioctl_read_slice(self.fd, RequestCode(eviocgbit(ev as _, len)), bits.words_mut())?;

        Ok(bits)
    }
    pub fn supported_event_types(&self) -> Result<BitSet> {
        self.event_bits(0, EV_MAX)
    }
    pub fn supports(&self, ev: EventType) -> Result<bool> {
        Ok(self.supported_event_types()?.test(ev as _))
    }

    /// `EVIOCGABS`
    pub fn absolute_axis_info(&self, axis: u16) -> Result<AbsoluteAxisInfo> {
        if axis > ABS_MAX {
            return Err(ShimError::invalid_argument(format!("axis 0x{axis:x} > ABS_MAX")));
        }

        let mut info = AbsoluteAxisInfo::default();
        ioctl_read_into(self.fd, RequestCode(eviocgabs(axis as _)), &mut info)?;

        Ok(info)
    }

    /// `EVIOCGKEY`: keys/buttons currently held down
    pub fn key_state(&self) -> Result<BitSet> {
        let mut bits = BitSet::with_max(KEY_MAX);
        let len = payload_len(bits.byte_len())?;
        ioctl_read_slice(self.fd, RequestCode(eviocgkey(len)), bits.words_mut())?;

        Ok(bits)
    }

    /// `EVIOCGNAME`
    pub fn name(&self) -> Result<String> {
        let mut buf = [0u8; 256];
        ioctl_read_slice(self.fd, RequestCode(eviocgname(buf.len() as _)), &mut buf)?;

        Ok(decode_name(&buf))
    }
}

fn payload_len(bytes: usize) -> Result<u32> {
    if bytes > MAX_PAYLOAD_SIZE {
        return Err(ShimError::invalid_argument(format!(
            "payload size {bytes} exceeds {MAX_PAYLOAD_SIZE}"
        )));
    }

    Ok(bytes as _)
}

/// Device name up to the first nul; the kernel leaves names that fill the buffer unterminated.
fn decode_name(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
impl AsRawFd for EventDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}
impl Drop for EventDevice {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
impl std::fmt::Debug for EventDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDevice")
            .field("fd", &self.fd)
            .field("path", &self.path)
            .finish()
    }
}

/// Lists event device nodes under the configured directory, sorted by path.
pub fn scan(config: &ScanConfig) -> Result<Vec<PathBuf>> {
    let node_regex = config.node_regex()?;
    let mut nodes = Vec::new();
    for e in std::fs::read_dir(&config.device_dir)? {
        let path = e?.path();
        let matched = path.to_str().map_or(false, |p| node_regex.is_match(p));
        if matched {
            nodes.push(path);
        } else {
            trace!("skipping non-event node {}", path.display());
        }
    }
    nodes.sort();

    Ok(nodes)
}
