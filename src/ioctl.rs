//! ioctl request codes and forwarders
//!
//! Request codes pack `(direction, type, number, size)` into one integer the same way
//! `<asm-generic/ioctl.h>` does. Field widths differ between architectures, so they are
//! selected at compile time.

use crate::error::{Result, ShimError};
use cfg_if::cfg_if;
use libc::{c_int, c_ulong, c_void};
use std::os::fd::RawFd;

cfg_if! {
    if #[cfg(any(
        target_arch = "powerpc", target_arch = "powerpc64",
        target_arch = "mips", target_arch = "mips64",
        target_arch = "mips32r6", target_arch = "mips64r6",
        target_arch = "sparc", target_arch = "sparc64"
    ))] {
        const SIZE_BITS: u32 = 13;
        const DIR_BITS: u32 = 3;
        const DIR_NONE: u32 = 1;
        const DIR_READ: u32 = 2;
        const DIR_WRITE: u32 = 4;
    } else {
        const SIZE_BITS: u32 = 14;
        const DIR_BITS: u32 = 2;
        const DIR_NONE: u32 = 0;
        const DIR_READ: u32 = 2;
        const DIR_WRITE: u32 = 1;
    }
}

const NR_BITS: u32 = 8;
const TYPE_BITS: u32 = 8;

const NR_SHIFT: u32 = 0;
const TYPE_SHIFT: u32 = NR_SHIFT + NR_BITS;
const SIZE_SHIFT: u32 = TYPE_SHIFT + TYPE_BITS;
const DIR_SHIFT: u32 = SIZE_SHIFT + SIZE_BITS;

const NR_MASK: u32 = (1 << NR_BITS) - 1;
const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;
const SIZE_MASK: u32 = (1 << SIZE_BITS) - 1;
const DIR_MASK: u32 = (1 << DIR_BITS) - 1;

/// Largest payload size representable in a request code on this target.
pub const MAX_PAYLOAD_SIZE: usize = SIZE_MASK as usize;

/// Data transfer direction, seen from userspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    None,
    /// kernel writes into the payload
    Read,
    /// kernel reads from the payload
    Write,
    ReadWrite,
}
impl Direction {
    pub const fn bits(self) -> u32 {
        match self {
            Self::None => DIR_NONE,
            Self::Read => DIR_READ,
            Self::Write => DIR_WRITE,
            Self::ReadWrite => DIR_READ | DIR_WRITE,
        }
    }

    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits == DIR_NONE {
            Some(Self::None)
        } else if bits == DIR_READ {
            Some(Self::Read)
        } else if bits == DIR_WRITE {
            Some(Self::Write)
        } else if bits == DIR_READ | DIR_WRITE {
            Some(Self::ReadWrite)
        } else {
            None
        }
    }

    pub const fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }
}

/// `_IOC(dir, type, nr, size)`. Like the macro, fields are not masked.
pub const fn ioc(dir: Direction, ty: u32, nr: u32, size: u32) -> c_ulong {
    ((dir.bits() << DIR_SHIFT) | (ty << TYPE_SHIFT) | (nr << NR_SHIFT) | (size << SIZE_SHIFT))
        as c_ulong
}
/// `_IOR(type, nr, size)`
pub const fn ior(ty: u32, nr: u32, size: u32) -> c_ulong {
    ioc(Direction::Read, ty, nr, size)
}

/// A decoded ioctl request code.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestCode(pub c_ulong);
impl RequestCode {
    /// Builds a request code, rejecting fields that would overflow their bit range.
    pub fn checked(dir: Direction, ty: u8, nr: u32, size: usize) -> Result<Self> {
        if nr > NR_MASK {
            return Err(ShimError::invalid_argument(format!(
                "request number 0x{nr:x} does not fit in {NR_BITS} bits"
            )));
        }
        if size > MAX_PAYLOAD_SIZE {
            return Err(ShimError::invalid_argument(format!(
                "payload size {size} exceeds {MAX_PAYLOAD_SIZE}"
            )));
        }

        Ok(Self(ioc(dir, ty as _, nr, size as _)))
    }

    pub const fn raw(self) -> c_ulong {
        self.0
    }

    pub const fn direction(self) -> Option<Direction> {
        Direction::from_bits((self.0 as u32 >> DIR_SHIFT) & DIR_MASK)
    }
    pub const fn kind(self) -> u8 {
        ((self.0 as u32 >> TYPE_SHIFT) & TYPE_MASK) as _
    }
    pub const fn number(self) -> u32 {
        (self.0 as u32 >> NR_SHIFT) & NR_MASK
    }
    pub const fn size(self) -> usize {
        ((self.0 as u32 >> SIZE_SHIFT) & SIZE_MASK) as _
    }
}

/// Plain records the kernel may fill in through an ioctl payload.
///
/// # Safety
/// Implementors must be `#[repr(C)]` (or primitive) and valid for any bit pattern.
pub unsafe trait KernelRecord: Copy {}
unsafe impl KernelRecord for u8 {}
unsafe impl KernelRecord for u16 {}
unsafe impl KernelRecord for u32 {}
unsafe impl KernelRecord for u64 {}
unsafe impl KernelRecord for i32 {}

/// Forwards `ioctl(fd, request, value)` unchanged.
///
/// # Safety
/// `request` decides what the kernel does with `value`; the caller vouches for it.
pub unsafe fn ioctl_value(fd: c_int, request: c_ulong, value: c_int) -> c_int {
    libc::ioctl(fd, request as _, value)
}

/// Forwards `ioctl(fd, request, ptr)` unchanged.
///
/// # Safety
/// `ptr` must reference memory laid out and sized as `request` expects.
pub unsafe fn ioctl_ptr(fd: c_int, request: c_ulong, ptr: *mut c_void) -> c_int {
    libc::ioctl(fd, request as _, ptr)
}

fn check_readable(fd: RawFd, request: RequestCode) -> Result<()> {
    if fd < 0 {
        return Err(ShimError::InvalidHandle);
    }
    match request.direction() {
        Some(d) if d.reads() => Ok(()),
        d => Err(ShimError::invalid_argument(format!(
            "request 0x{:x} does not read from the kernel (direction {d:?})",
            request.raw()
        ))),
    }
}

/// Issues a read request whose encoded size must equal `size_of::<T>()`.
pub fn ioctl_read_into<T: KernelRecord>(fd: RawFd, request: RequestCode, sink: &mut T) -> Result<c_int> {
    check_readable(fd, request)?;
    if request.size() != std::mem::size_of::<T>() {
        return Err(ShimError::invalid_argument(format!(
            "request expects {} bytes, record has {}",
            request.size(),
            std::mem::size_of::<T>()
        )));
    }

    let r = unsafe { ioctl_ptr(fd, request.raw(), sink as *mut T as *mut c_void) };
    if r < 0 {
        Err(ShimError::last_os_error("ioctl"))
    } else {
        Ok(r)
    }
}

/// Issues a read request into a buffer at least as large as the encoded size.
pub fn ioctl_read_slice<T: KernelRecord>(fd: RawFd, request: RequestCode, sink: &mut [T]) -> Result<c_int> {
    check_readable(fd, request)?;
    let len = std::mem::size_of_val(sink);
    if request.size() > len {
        return Err(ShimError::invalid_argument(format!(
            "request expects {} bytes, buffer has {len}",
            request.size()
        )));
    }

    let r = unsafe { ioctl_ptr(fd, request.raw(), sink.as_mut_ptr() as *mut c_void) };
    if r < 0 {
        Err(ShimError::last_os_error("ioctl"))
    } else {
        Ok(r)
    }
}

/// Issues a request that predates `_IOC` encoding (`FIONREAD`, `TIOCGWINSZ`, ...).
/// Such codes carry no direction or size, so only the descriptor is checked.
pub fn ioctl_read_legacy_into<T: KernelRecord>(fd: RawFd, request: c_ulong, sink: &mut T) -> Result<c_int> {
    if fd < 0 {
        return Err(ShimError::InvalidHandle);
    }

    let r = unsafe { ioctl_ptr(fd, request, sink as *mut T as *mut c_void) };
    if r < 0 {
        Err(ShimError::last_os_error("ioctl"))
    } else {
        Ok(r)
    }
}
