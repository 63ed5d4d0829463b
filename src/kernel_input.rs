//! Linux input subsystem ABI (`<linux/input.h>`)

use crate::ioctl::{ior, KernelRecord};
use libc::c_ulong;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct InputEvent {
	pub time: libc::timeval,
	pub type_: u16,
	pub code: u16,
	pub value: i32
}
unsafe impl KernelRecord for InputEvent {}

/// `struct input_absinfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsoluteAxisInfo {
	pub value: i32,
	pub minimum: i32,
	pub maximum: i32,
	pub fuzz: i32,
	pub flat: i32,
	pub resolution: i32
}
unsafe impl KernelRecord for AbsoluteAxisInfo {}

/// `struct input_id`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
	pub bus_type: u16,
	pub vendor: u16,
	pub product: u16,
	pub version: u16
}
unsafe impl KernelRecord for DeviceIdentity {}

/// Event Types
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
	Synchronize = 0x00,
	Key = 0x01,
	Relative = 0x02,
	Absolute = 0x03,
	Misc = 0x04,
	Switch = 0x05,
	ForceFeedback = 0x15
}

/// Synchronization Events
#[repr(u16)]
pub enum SynchronizationEvent {
	Report = 0,
	Config = 1,
	MTReport = 2,
	Dropped = 3
}

/// Relative Axis
#[repr(u16)]
pub enum RelativeAxes {
	X = 0x00,
	Y = 0x01,
	Z = 0x02,
	RX = 0x03,
	RY = 0x04,
	RZ = 0x05,
	HorizontalWheel = 0x06,
	Dial = 0x07,
	Wheel = 0x08,
	Misc = 0x09
}

/// Absolute Axes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsoluteAxes {
	X = 0x00,
	Y = 0x01,
	Z = 0x02,
	RX = 0x03,
	RY = 0x04,
	RZ = 0x05,
	Throttle = 0x06,
	Rudder = 0x07,
	Wheel = 0x08,
	Gas = 0x09,
	Brake = 0x0a,
	Hat0X = 0x10,
	Hat0Y = 0x11,
	Hat1X = 0x12,
	Hat1Y = 0x13,
	Hat2X = 0x14,
	Hat2Y = 0x15,
	Hat3X = 0x16,
	Hat3Y = 0x17,
	Pressure = 0x18,
	Distance = 0x19,
	TiltX = 0x1a,
	TiltY = 0x1b,
	ToolWidth = 0x1c,
	Volume = 0x20,
	Misc = 0x28
}

/// Key
#[repr(u16)]
pub enum Key {
	/// = Mouse
	Left = 0x110,
	Right = 0x111,
	Middle = 0x112,
	Side = 0x113,
	Extra = 0x114,
	Forward = 0x115,
	Back = 0x116,
	Task = 0x117,
	/// = Joystick
	Trigger = 0x120,
	/// = Gamepad
	South = 0x130
}

pub const EV_MAX: u16 = 0x1f;
pub const KEY_MAX: u16 = 0x2ff;
pub const REL_MAX: u16 = 0x0f;
pub const ABS_MAX: u16 = 0x3f;
pub const FF_MAX: u16 = 0x7f;
pub const BTN_JOYSTICK: u16 = Key::Trigger as _;
pub const ABS_HAT0X: u16 = AbsoluteAxes::Hat0X as _;
pub const ABS_HAT0Y: u16 = AbsoluteAxes::Hat0Y as _;
pub const ABS_HAT3Y: u16 = AbsoluteAxes::Hat3Y as _;

const EVDEV_IOCTL_TYPE: u32 = b'E' as _;

// function numbers wrap like the macros' unsigned arithmetic

/// `EVIOCGBIT(ev, len)`: bitmap of codes supported for event type `ev`
pub const fn eviocgbit(ev: u32, len: u32) -> c_ulong {
	ior(EVDEV_IOCTL_TYPE, ev.wrapping_add(0x20), len)
}
/// `EVIOCGABS(abs)`: state and limits of absolute axis `abs`
pub const fn eviocgabs(abs: u32) -> c_ulong {
	ior(EVDEV_IOCTL_TYPE, abs.wrapping_add(0x40), std::mem::size_of::<AbsoluteAxisInfo>() as _)
}
/// `EVIOCGKEY(len)`: global key state
pub const fn eviocgkey(len: u32) -> c_ulong {
	ior(EVDEV_IOCTL_TYPE, 0x18, len)
}
/// `EVIOCGID`
pub const fn eviocgid() -> c_ulong {
	ior(EVDEV_IOCTL_TYPE, 0x02, std::mem::size_of::<DeviceIdentity>() as _)
}
/// `EVIOCGNAME(len)`: device name, truncated to `len` bytes
pub const fn eviocgname(len: u32) -> c_ulong {
	ior(EVDEV_IOCTL_TYPE, 0x06, len)
}

const BITS_PER_WORD: usize = std::mem::size_of::<c_ulong>() * 8;

/// Bitmap in the kernel's `unsigned long[]` layout, as filled by `EVIOCGBIT`/`EVIOCGKEY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSet(Vec<c_ulong>);
impl BitSet {
	/// Enough words to hold bits `0 ..= max`.
	pub fn with_max(max: u16) -> Self {
		Self(vec![0; max as usize / BITS_PER_WORD + 1])
	}

	pub fn byte_len(&self) -> usize { self.0.len() * std::mem::size_of::<c_ulong>() }
	pub fn words_mut(&mut self) -> &mut [c_ulong] { &mut self.0 }

	pub fn test(&self, bit: u16) -> bool {
		let bit = bit as usize;
		self.0.get(bit / BITS_PER_WORD).map_or(false, |w| (w >> (bit % BITS_PER_WORD)) & 1 != 0)
	}
	pub fn set(&mut self, bit: u16) {
		let bit = bit as usize;
		if let Some(w) = self.0.get_mut(bit / BITS_PER_WORD) {
			*w |= 1 << (bit % BITS_PER_WORD);
		}
	}

	pub fn iter_set(&self) -> impl Iterator<Item = u16> + '_ {
		(0 .. (self.0.len() * BITS_PER_WORD) as u32).map(|b| b as u16).filter(move |&b| self.test(b))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::mem::{align_of, offset_of, size_of};

	#[test]
	fn record_layouts() {
		assert_eq!(size_of::<AbsoluteAxisInfo>(), 24);
		assert_eq!(align_of::<AbsoluteAxisInfo>(), 4);
		assert_eq!(offset_of!(AbsoluteAxisInfo, value), 0);
		assert_eq!(offset_of!(AbsoluteAxisInfo, minimum), 4);
		assert_eq!(offset_of!(AbsoluteAxisInfo, maximum), 8);
		assert_eq!(offset_of!(AbsoluteAxisInfo, fuzz), 12);
		assert_eq!(offset_of!(AbsoluteAxisInfo, flat), 16);
		assert_eq!(offset_of!(AbsoluteAxisInfo, resolution), 20);

		assert_eq!(size_of::<DeviceIdentity>(), 8);
		assert_eq!(align_of::<DeviceIdentity>(), 2);
		assert_eq!(offset_of!(DeviceIdentity, bus_type), 0);
		assert_eq!(offset_of!(DeviceIdentity, vendor), 2);
		assert_eq!(offset_of!(DeviceIdentity, product), 4);
		assert_eq!(offset_of!(DeviceIdentity, version), 6);
	}

	#[cfg(not(any(
		target_arch = "powerpc", target_arch = "powerpc64",
		target_arch = "mips", target_arch = "mips64",
		target_arch = "mips32r6", target_arch = "mips64r6",
		target_arch = "sparc", target_arch = "sparc64"
	)))]
	#[test]
	fn request_codes_match_kernel_headers() {
		assert_eq!(eviocgid(), 0x80084502);
		assert_eq!(eviocgabs(0x00), 0x80184540);
		assert_eq!(eviocgabs(ABS_HAT0X as _), 0x80184550);
		assert_eq!(eviocgabs(ABS_MAX as _), 0x8018457f);
		assert_eq!(eviocgkey(96), 0x80604518);
		assert_eq!(eviocgbit(0, 8), 0x80084520);
		assert_eq!(eviocgbit(EventType::Key as _, 96), 0x80604521);
		assert_eq!(eviocgbit(EventType::Absolute as _, 8), 0x80084523);
	}

	#[cfg(any(target_arch = "powerpc", target_arch = "powerpc64"))]
	#[test]
	fn request_codes_match_kernel_headers() {
		// read direction is 2 << 29 on the 13-bit size layout
		assert_eq!(eviocgid(), 0x40084502);
		assert_eq!(eviocgabs(0x00), 0x40184540);
		assert_eq!(eviocgkey(96), 0x40604518);
	}

	#[test]
	fn request_code_fields() {
		use crate::ioctl::{Direction, RequestCode};

		for abs in 0 ..= ABS_MAX as u32 {
			let r = RequestCode(eviocgabs(abs));
			assert_eq!(r.direction(), Some(Direction::Read));
			assert_eq!(r.kind(), b'E');
			assert_eq!(r.number(), 0x40 + abs);
			assert_eq!(r.size(), size_of::<AbsoluteAxisInfo>());
		}
		for len in [0u32, 1, 8, 96, 4096] {
			let r = RequestCode(eviocgkey(len));
			assert_eq!(r.number(), 0x18);
			assert_eq!(r.size(), len as usize);
		}
		for ev in 0 ..= EV_MAX as u32 {
			let r = RequestCode(eviocgbit(ev, 16));
			assert_eq!(r.number(), 0x20 + ev);
			assert_eq!(r.size(), 16);
		}
	}

	#[test]
	fn function_numbers_wrap_without_trapping() {
		assert_eq!(eviocgbit(u32::MAX, 8), ior(EVDEV_IOCTL_TYPE, 0x1f, 8));
		assert_eq!(
			eviocgabs(u32::MAX),
			ior(EVDEV_IOCTL_TYPE, 0x3f, std::mem::size_of::<AbsoluteAxisInfo>() as _)
		);
		assert_eq!(eviocgbit(u32::MAX - 0x1f, 8), ior(EVDEV_IOCTL_TYPE, 0, 8));
	}

	#[test]
	fn bitset_addressing() {
		let mut keys = BitSet::with_max(KEY_MAX);
		assert!(keys.byte_len() * 8 > KEY_MAX as usize);
		assert!(!keys.test(0x2c0));

		keys.set(0x2c0);
		keys.set(BTN_JOYSTICK);
		keys.set(3);
		assert!(keys.test(0x2c0));
		assert!(keys.test(BTN_JOYSTICK));
		assert!(!keys.test(BTN_JOYSTICK + 1));
		assert_eq!(keys.iter_set().collect::<Vec<_>>(), vec![3, BTN_JOYSTICK, 0x2c0]);

		// out of range bits read as cleared
		assert!(!BitSet::with_max(REL_MAX).test(0x1000));
	}
}
