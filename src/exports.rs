//! C ABI entry points
//!
//! Each function forwards to the native call with fixed arguments and returns its
//! result untouched. Nothing here validates handles, descriptors or indices.
#![allow(non_snake_case)]

use crate::ioctl;
use crate::kernel_input;
use libc::{c_int, c_uint, c_ulong, c_void};

#[cfg(feature = "xlib")]
mod x {
    use crate::xlib;
    use libc::c_int;
    use x11::xlib::{Display, Window, XIC, XIM};

    /// Input context with no preedit/status area whose client and focus window is `window`.
    #[no_mangle]
    pub unsafe extern "C" fn CreateInputContext(input_method: XIM, window: Window) -> XIC {
        xlib::create_input_context_raw(input_method, window)
    }

    #[no_mangle]
    pub unsafe extern "C" fn DisplayWidthPixels(display: *mut Display, screen: c_int) -> c_int {
        xlib::screen_metrics_raw(display, screen).width_pixels
    }

    #[no_mangle]
    pub unsafe extern "C" fn DisplayWidthMillimeters(display: *mut Display, screen: c_int) -> c_int {
        xlib::screen_metrics_raw(display, screen).width_millimeters
    }

    #[no_mangle]
    pub unsafe extern "C" fn DisplayHeightPixels(display: *mut Display, screen: c_int) -> c_int {
        xlib::screen_metrics_raw(display, screen).height_pixels
    }

    #[no_mangle]
    pub unsafe extern "C" fn DisplayHeightMillimeters(display: *mut Display, screen: c_int) -> c_int {
        xlib::screen_metrics_raw(display, screen).height_millimeters
    }
}
#[cfg(feature = "xlib")]
pub use self::x::*;

#[no_mangle]
pub unsafe extern "C" fn IoctlWithIntPayload(fd: c_int, request: c_ulong, value: c_int) -> c_int {
    ioctl::ioctl_value(fd, request, value)
}

#[no_mangle]
pub unsafe extern "C" fn IoctlWithPointerPayload(fd: c_int, request: c_ulong, ptr: *mut c_void) -> c_int {
    ioctl::ioctl_ptr(fd, request, ptr)
}

/// `EVIOCGBIT(event_type, buffer_length)`
#[no_mangle]
pub extern "C" fn MakeEventBitmapRequestCode(event_type: c_uint, buffer_length: c_uint) -> c_ulong {
    kernel_input::eviocgbit(event_type, buffer_length)
}

/// `EVIOCGABS(axis)`
#[no_mangle]
pub extern "C" fn MakeAbsoluteAxisInfoRequestCode(axis: c_uint) -> c_ulong {
    kernel_input::eviocgabs(axis)
}

/// `EVIOCGKEY(buffer_length)`
#[no_mangle]
pub extern "C" fn MakeKeyStateRequestCode(buffer_length: c_uint) -> c_ulong {
    kernel_input::eviocgkey(buffer_length)
}

/// `EVIOCGID`
#[no_mangle]
pub extern "C" fn MakeDeviceIdentityRequestCode() -> c_ulong {
    kernel_input::eviocgid()
}
