//! Game controller probing over evdev

use crate::error::{Result, ShimError};
use crate::evdev::EventDevice;
use crate::kernel_input::{
    AbsoluteAxisInfo, BitSet, DeviceIdentity, EventType, ABS_HAT0X, ABS_HAT0Y, ABS_HAT3Y, ABS_MAX,
    BTN_JOYSTICK, KEY_MAX, REL_MAX,
};

const VENDOR_MICROSOFT: u16 = 0x045e;
const PRODUCT_XBOX_ONE_ELITE_2: u16 = 0x0b05;
const VENDOR_ATARI: u16 = 0x3250;
/// set only by the first Elite Series 2 firmware, which duplicated every input
const ELITE_2_DUPLICATE_INPUT_KEY: u16 = 0x2c0;

/// Rewrites identities the same way SDL does so mapping database entries keep matching.
///
/// `keys` is the device's `EV_KEY` capability bitmap; it is only consulted for the
/// Elite Series 2 firmware check.
pub fn fix_up_identity(mut id: DeviceIdentity, keys: Option<&BitSet>) -> DeviceIdentity {
    if id.vendor == VENDOR_MICROSOFT && id.product == PRODUCT_XBOX_ONE_ELITE_2 && id.version == 0x0903 {
        if keys.map_or(false, |k| k.test(ELITE_2_DUPLICATE_INPUT_KEY)) {
            debug!("Elite Series 2 with duplicated inputs: reporting version 0x0902");
            id.version = 0x0902;
        }
    }
    // Atari VCS controllers encode firmware in the version; the mapping does not change
    if id.vendor == VENDOR_ATARI && (id.product == 0x1001 || id.product == 0x1002) {
        id.version = 0;
    }

    id
}

/// Reads `EVIOCGID` and applies [`fix_up_identity`].
pub fn probe_identity(device: &EventDevice) -> Result<DeviceIdentity> {
    let id = device.identity()?;
    let keys = if id.vendor == VENDOR_MICROSOFT && id.product == PRODUCT_XBOX_ONE_ELITE_2 {
        device.event_bits(EventType::Key as _, KEY_MAX).ok()
    } else {
        None
    };

    Ok(fix_up_identity(id, keys.as_ref()))
}

/// Bus types as reported in [`DeviceIdentity::bus_type`]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Unknown = 0x00,
    Usb = 0x03,
    Bluetooth = 0x05,
    Virtual = 0xff,
}

/// SDL2-compatible joystick GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerGuid(pub [u8; 16]);
impl ControllerGuid {
    pub fn from_identity(id: &DeviceIdentity) -> Self {
        Self::from_words([id.bus_type, 0, id.vendor, 0, id.product, 0, id.version, 0])
    }
    /// Variant that also folds the device name's CRC into the GUID.
    pub fn with_name(id: &DeviceIdentity, name: &str) -> Self {
        Self::from_words([id.bus_type, crc16(0, name.as_bytes()), id.vendor, 0, id.product, 0, id.version, 0])
    }

    fn from_words(words: [u16; 8]) -> Self {
        let mut bytes = [0u8; 16];
        for (dst, w) in bytes.chunks_exact_mut(2).zip(words) {
            dst.copy_from_slice(&w.to_le_bytes());
        }

        Self(bytes)
    }
    fn word(&self, n: usize) -> u16 {
        u16::from_le_bytes([self.0[n * 2], self.0[n * 2 + 1]])
    }

    pub fn transport(&self) -> u16 {
        self.word(0)
    }
    pub fn vendor(&self) -> u16 {
        self.word(2)
    }
    pub fn product(&self) -> u16 {
        self.word(4)
    }
    pub fn version(&self) -> u16 {
        self.word(6)
    }
}
impl std::fmt::Display for ControllerGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }

        Ok(())
    }
}
impl std::str::FromStr for ControllerGuid {
    type Err = ShimError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 32 || !s.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(ShimError::invalid_argument(format!("malformed guid {s:?}")));
        }

        let mut bytes = [0u8; 16];
        for (n, b) in bytes.iter_mut().enumerate() {
            *b = u8::from_str_radix(&s[n * 2..n * 2 + 2], 16)
                .map_err(|e| ShimError::invalid_argument(format!("guid: {e}")))?;
        }
        Ok(Self(bytes))
    }
}

/// CRC-16 (polynomial 0xA001) as SDL computes it for joystick names.
pub fn crc16(mut crc: u16, data: &[u8]) -> u16 {
    fn crc16_for_byte(mut r: u8) -> u16 {
        let mut crc = 0u16;
        for _ in 0..8 {
            crc = (if ((crc as u8 ^ r) & 1) != 0 { 0xa001 } else { 0 }) ^ (crc >> 1);
            r >>= 1;
        }
        crc
    }

    for &b in data {
        crc = crc16_for_byte(crc as u8 ^ b) ^ (crc >> 8);
    }
    crc
}

/// One input element of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    /// axis/key code, or hat index for hats
    pub number: u16,
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub axes: Vec<Element>,
    pub hats: Vec<Element>,
    pub buttons: Vec<Element>,
}
impl Capabilities {
    /// Collects axes, hats and buttons. Fails if any of the key, absolute or relative
    /// capability bitmaps cannot be read.
    pub fn probe(device: &EventDevice) -> Result<Self> {
        let keys = device.event_bits(EventType::Key as _, KEY_MAX)?;
        let abs = device.event_bits(EventType::Absolute as _, ABS_MAX)?;
        device.event_bits(EventType::Relative as _, REL_MAX)?;

        Ok(Self::from_bits(&keys, &abs, |axis| device.absolute_axis_info(axis)))
    }

    pub fn from_bits(
        keys: &BitSet,
        abs: &BitSet,
        mut axis_info: impl FnMut(u16) -> Result<AbsoluteAxisInfo>,
    ) -> Self {
        let mut caps = Self::default();

        for axis in (0..ABS_MAX).filter(|a| !(ABS_HAT0X..=ABS_HAT3Y).contains(a)) {
            if !abs.test(axis) {
                continue;
            }
            match axis_info(axis) {
                Ok(info) => caps.axes.push(Element {
                    number: axis,
                    min: info.minimum,
                    max: info.maximum,
                }),
                Err(e) => warn!("skipping axis 0x{axis:02x}: {e}"),
            }
        }

        for x_axis in (ABS_HAT0X..=ABS_HAT3Y).step_by(2) {
            if !abs.test(x_axis) && !abs.test(x_axis + 1) {
                continue;
            }
            match axis_info(x_axis) {
                Ok(info) => caps.hats.push(Element {
                    number: (x_axis - ABS_HAT0X) / 2,
                    min: info.minimum,
                    max: info.maximum,
                }),
                Err(e) => warn!("skipping hat {}: {e}", (x_axis - ABS_HAT0X) / 2),
            }
        }

        // joystick/gamepad buttons first so that button indices start at BTN_JOYSTICK
        for code in (BTN_JOYSTICK..KEY_MAX).chain(0..BTN_JOYSTICK) {
            if keys.test(code) {
                caps.buttons.push(Element {
                    number: code,
                    min: 0,
                    max: 1,
                });
            }
        }

        caps
    }

    /// Button codes set in `state`, in button index order.
    pub fn pressed(&self, state: &BitSet) -> Vec<u16> {
        self.buttons.iter().map(|b| b.number).filter(|&n| state.test(n)).collect()
    }
}

/// Hat position as SDL's bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HatDirection(pub u8);
impl HatDirection {
    pub const CENTERED: Self = Self(0);
    pub const UP: Self = Self(1);
    pub const RIGHT: Self = Self(2);
    pub const DOWN: Self = Self(4);
    pub const LEFT: Self = Self(8);

    /// `x`/`y` are the hat's axis values; negative y points up.
    pub fn from_axes(x: i32, y: i32) -> Self {
        let h = match x.signum() {
            1 => Self::RIGHT.0,
            -1 => Self::LEFT.0,
            _ => 0,
        };
        let v = match y.signum() {
            1 => Self::DOWN.0,
            -1 => Self::UP.0,
            _ => 0,
        };

        Self(h | v)
    }

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && (self.0 & other.0) == other.0
    }
}

/// Reads the current position of hat `index` (0 ..= 3).
pub fn read_hat(device: &EventDevice, index: u16) -> Result<HatDirection> {
    hat_position(index, |axis| device.absolute_axis_info(axis))
}

/// Hat `index` from the current values of its axis pair, as reported by `axis_info`.
pub fn hat_position(
    index: u16,
    mut axis_info: impl FnMut(u16) -> Result<AbsoluteAxisInfo>,
) -> Result<HatDirection> {
    if index > (ABS_HAT3Y - ABS_HAT0X) / 2 {
        return Err(ShimError::invalid_argument(format!("hat index {index} out of range")));
    }

    let x = axis_info(ABS_HAT0X + index * 2)?;
    let y = axis_info(ABS_HAT0Y + index * 2)?;
    Ok(HatDirection::from_axes(x.value, y.value))
}

/// How an axis' raw range maps onto `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisMode {
    Whole,
    WholeInverted,
    /// only the positive half is used (e.g. a trigger sharing an axis)
    Positive,
    Negative,
}

pub fn normalize_axis(info: &AbsoluteAxisInfo, mode: AxisMode) -> f32 {
    fn lerp_unit(factor: f32) -> f32 {
        -1.0 + 2.0 * factor.clamp(0.0, 1.0)
    }

    match mode {
        AxisMode::Whole | AxisMode::WholeInverted => {
            let distance = info.maximum as f32 - info.minimum as f32;
            if distance == 0.0 {
                return 0.0;
            }
            let v = lerp_unit((info.value as f32 - info.minimum as f32) / distance);
            if mode == AxisMode::WholeInverted {
                -v
            } else {
                v
            }
        }
        AxisMode::Positive if info.value > 0 && info.maximum > 0 => {
            lerp_unit(info.value as f32 / info.maximum as f32)
        }
        AxisMode::Negative if info.value < 0 && info.minimum < 0 => {
            lerp_unit(info.value as f32 / info.minimum as f32)
        }
        AxisMode::Positive | AxisMode::Negative => -1.0,
    }
}

/// Button codes of `caps` currently held down.
pub fn pressed_buttons(device: &EventDevice, caps: &Capabilities) -> Result<Vec<u16>> {
    Ok(caps.pressed(&device.key_state()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(vendor: u16, product: u16, version: u16) -> DeviceIdentity {
        DeviceIdentity {
            bus_type: Transport::Usb as _,
            vendor,
            product,
            version,
        }
    }

    #[test]
    fn elite_series_2_fixup() {
        let mut keys = BitSet::with_max(KEY_MAX);
        let elite = id(0x045e, 0x0b05, 0x0903);
        assert_eq!(fix_up_identity(elite, Some(&keys)).version, 0x0903);
        assert_eq!(fix_up_identity(elite, None).version, 0x0903);

        keys.set(0x2c0);
        assert_eq!(fix_up_identity(elite, Some(&keys)).version, 0x0902);
        // other firmware versions are left alone
        assert_eq!(fix_up_identity(id(0x045e, 0x0b05, 0x0905), Some(&keys)).version, 0x0905);
    }

    #[test]
    fn atari_vcs_fixup() {
        assert_eq!(fix_up_identity(id(0x3250, 0x1001, 0x0123), None).version, 0);
        assert_eq!(fix_up_identity(id(0x3250, 0x1002, 0x0456), None).version, 0);
        assert_eq!(fix_up_identity(id(0x3250, 0x1003, 0x0456), None).version, 0x0456);
    }

    #[test]
    fn guid_formatting() {
        // Xbox 360 pad over USB, as listed in SDL's controller database
        let g = ControllerGuid::from_identity(&id(0x045e, 0x028e, 0x0114));
        assert_eq!(g.to_string(), "030000005e0400008e02000014010000");
        assert_eq!(g.vendor(), 0x045e);
        assert_eq!(g.product(), 0x028e);
        assert_eq!(g.version(), 0x0114);
        assert_eq!(g.transport(), Transport::Usb as u16);

        let parsed: ControllerGuid = "030000005e0400008e02000014010000".parse().expect("parse");
        assert_eq!(parsed, g);
        assert!("030000005E0400008E02000014010000".parse::<ControllerGuid>().is_err());
        assert!("0300".parse::<ControllerGuid>().is_err());
    }

    #[test]
    fn crc16_reference_values() {
        assert_eq!(crc16(0, b""), 0);
        // CRC-16/ARC check value
        assert_eq!(crc16(0, b"123456789"), 0xbb3d);

        let g = ControllerGuid::with_name(&id(1, 2, 3), "123456789");
        assert_eq!(&g.0[2..4], &[0x3d, 0xbb]);
    }

    #[test]
    fn capabilities_from_bits() {
        let mut keys = BitSet::with_max(KEY_MAX);
        keys.set(1); // KEY_ESC
        keys.set(0x130); // BTN_SOUTH
        keys.set(0x131);
        let mut abs = BitSet::with_max(ABS_MAX);
        abs.set(0x00);
        abs.set(0x01);
        abs.set(0x05);
        abs.set(ABS_HAT0X);
        abs.set(ABS_HAT0Y);
        abs.set(ABS_HAT0X + 5); // hat 2, y axis only

        let caps = Capabilities::from_bits(&keys, &abs, |axis| match axis {
            0x05 => Err(ShimError::InvalidHandle),
            a if a >= ABS_HAT0X => Ok(AbsoluteAxisInfo { minimum: -1, maximum: 1, ..Default::default() }),
            _ => Ok(AbsoluteAxisInfo { minimum: -32768, maximum: 32767, ..Default::default() }),
        });

        assert_eq!(caps.axes.iter().map(|e| e.number).collect::<Vec<_>>(), vec![0x00, 0x01]);
        assert_eq!(caps.axes[0].min, -32768);
        assert_eq!(caps.hats.iter().map(|e| e.number).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(caps.hats[0].max, 1);
        assert_eq!(caps.buttons.iter().map(|e| e.number).collect::<Vec<_>>(), vec![0x130, 0x131, 1]);
    }

    #[test]
    fn hat_directions() {
        assert_eq!(HatDirection::from_axes(0, 0), HatDirection::CENTERED);
        assert_eq!(HatDirection::from_axes(0, -1), HatDirection::UP);
        assert_eq!(HatDirection::from_axes(1, 0), HatDirection::RIGHT);
        assert_eq!(HatDirection::from_axes(-1, 0), HatDirection::LEFT);

        let down_left = HatDirection::from_axes(-1, 1);
        assert!(down_left.contains(HatDirection::DOWN));
        assert!(down_left.contains(HatDirection::LEFT));
        assert!(!down_left.contains(HatDirection::UP));
        assert!(!down_left.contains(HatDirection::CENTERED));

        let up_right = HatDirection::from_axes(1, -1);
        assert_eq!(up_right.0, HatDirection::UP.0 | HatDirection::RIGHT.0);
    }

    #[test]
    fn axis_normalization() {
        let stick = |value| AbsoluteAxisInfo { value, minimum: -32768, maximum: 32767, ..Default::default() };
        assert_eq!(normalize_axis(&stick(-32768), AxisMode::Whole), -1.0);
        assert_eq!(normalize_axis(&stick(32767), AxisMode::Whole), 1.0);
        assert!(normalize_axis(&stick(0), AxisMode::Whole).abs() < 0.001);
        assert_eq!(normalize_axis(&stick(32767), AxisMode::WholeInverted), -1.0);

        assert_eq!(normalize_axis(&stick(32767), AxisMode::Positive), 1.0);
        assert_eq!(normalize_axis(&stick(-100), AxisMode::Positive), -1.0);
        assert_eq!(normalize_axis(&stick(-32768), AxisMode::Negative), 1.0);
        assert_eq!(normalize_axis(&stick(100), AxisMode::Negative), -1.0);

        let flat = AbsoluteAxisInfo { value: 5, minimum: 5, maximum: 5, ..Default::default() };
        assert_eq!(normalize_axis(&flat, AxisMode::Whole), 0.0);
    }

    #[test]
    fn pressed_follows_button_order() {
        let mut keys = BitSet::with_max(KEY_MAX);
        for code in [1, 0x130, 0x131, 0x133] {
            keys.set(code);
        }
        let caps = Capabilities::from_bits(&keys, &BitSet::with_max(ABS_MAX), |_| {
            Ok(AbsoluteAxisInfo::default())
        });

        let mut state = BitSet::with_max(KEY_MAX);
        assert!(caps.pressed(&state).is_empty());

        state.set(1);
        state.set(0x131);
        state.set(0x132); // held but not a capability
        assert_eq!(caps.pressed(&state), vec![0x131, 1]);
    }

    #[test]
    fn hat_position_reads_axis_pair() {
        let values = |x: i32, y: i32| {
            move |axis: u16| {
                let value = match axis {
                    a if a == ABS_HAT0X + 4 => x,
                    a if a == ABS_HAT0Y + 4 => y,
                    _ => 0,
                };
                Ok::<_, ShimError>(AbsoluteAxisInfo { value, minimum: -1, maximum: 1, ..Default::default() })
            }
        };

        assert_eq!(hat_position(2, values(0, 0)).ok(), Some(HatDirection::CENTERED));
        assert_eq!(hat_position(2, values(1, 0)).ok(), Some(HatDirection::RIGHT));
        assert_eq!(
            hat_position(2, values(-1, -1)).ok(),
            Some(HatDirection(HatDirection::UP.0 | HatDirection::LEFT.0))
        );
        // another hat's axes stay centered
        assert_eq!(hat_position(0, values(1, 1)).ok(), Some(HatDirection::CENTERED));

        let mut asked = Vec::new();
        let out_of_range = hat_position(4, |axis| {
            asked.push(axis);
            Ok(AbsoluteAxisInfo::default())
        });
        assert!(matches!(out_of_range, Err(ShimError::InvalidArgument(_))));
        assert!(asked.is_empty());

        assert!(matches!(
            hat_position(1, |_| Err(ShimError::InvalidHandle)),
            Err(ShimError::InvalidHandle)
        ));
    }
}
