//! Xlib input contexts and display metrics
//!
//! `XCreateIC`/`XGetICValues` are variadic and `DisplayWidth`-style accessors are macros,
//! so both are given fixed-argument forms here.

use crate::error::{Result, ShimError};
use libc::{c_char, c_int, c_ulong};
use std::ffi::CStr;
use std::marker::PhantomData;
use std::ptr::NonNull;
use x11::xlib::{
    XCloseDisplay, XCloseIM, XCreateIC, XDefaultScreen, XDestroyIC, XErrorEvent, XGetErrorText,
    XGetICValues, XOpenDisplay, XOpenIM, XRootWindow, XScreenCount, XScreenOfDisplay,
    XSetErrorHandler, XIC, XIM,
};

pub use x11::xlib::Window;

const XN_INPUT_STYLE: &'static CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"inputStyle\0") };
const XN_CLIENT_WINDOW: &'static CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"clientWindow\0") };
const XN_FOCUS_WINDOW: &'static CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"focusWindow\0") };

const XIM_PREEDIT_NOTHING: c_ulong = 0x0008;
const XIM_STATUS_NOTHING: c_ulong = 0x0400;

/// Input style every context is created with: no preedit or status area.
pub const INPUT_STYLE: c_ulong = XIM_PREEDIT_NOTHING | XIM_STATUS_NOTHING;

/// `XCreateIC(im, XNInputStyle, none|none, XNClientWindow, w, XNFocusWindow, w, NULL)`
///
/// # Safety
/// `im` must be an open input method and `window` a window on its display.
/// A null return is forwarded as is.
pub unsafe fn create_input_context_raw(im: XIM, window: Window) -> XIC {
    XCreateIC(
        im,
        XN_INPUT_STYLE.as_ptr(),
        INPUT_STYLE,
        XN_CLIENT_WINDOW.as_ptr(),
        window,
        XN_FOCUS_WINDOW.as_ptr(),
        window,
        std::ptr::null_mut::<c_char>(),
    )
}

/// Per-screen metrics, read the way the `DisplayWidth`/`DisplayWidthMM`/... macros do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenMetrics {
    pub width_pixels: c_int,
    pub height_pixels: c_int,
    pub width_millimeters: c_int,
    pub height_millimeters: c_int,
}

/// # Safety
/// `display` must be an open connection and `screen` in `0 .. ScreenCount(display)`.
pub unsafe fn screen_metrics_raw(display: *mut x11::xlib::Display, screen: c_int) -> ScreenMetrics {
    let s = &*XScreenOfDisplay(display, screen);

    ScreenMetrics {
        width_pixels: s.width,
        height_pixels: s.height,
        width_millimeters: s.mwidth,
        height_millimeters: s.mheight,
    }
}

#[repr(transparent)]
pub struct Display(NonNull<x11::xlib::Display>);
impl Display {
    /// `name == None` connects to `$DISPLAY`.
    pub fn open(name: Option<&CStr>) -> Result<Self> {
        install_error_logger();

        let p = unsafe { XOpenDisplay(name.map_or_else(std::ptr::null, CStr::as_ptr)) };
        NonNull::new(p).map(Self).ok_or_else(|| ShimError::null_result("XOpenDisplay"))
    }

    pub fn as_ptr(&self) -> *mut x11::xlib::Display {
        self.0.as_ptr()
    }

    pub fn default_screen(&self) -> c_int {
        unsafe { XDefaultScreen(self.0.as_ptr()) }
    }

    pub fn screen_count(&self) -> c_int {
        unsafe { XScreenCount(self.0.as_ptr()) }
    }

    pub fn root_window(&self, screen: c_int) -> Result<Window> {
        self.check_screen(screen)?;
        Ok(unsafe { XRootWindow(self.0.as_ptr(), screen) })
    }

    fn check_screen(&self, screen: c_int) -> Result<()> {
        let count = self.screen_count();
        if (0..count).contains(&screen) {
            Ok(())
        } else {
            Err(ShimError::invalid_argument(format!(
                "screen {screen} out of range (display has {count})"
            )))
        }
    }

    pub fn screen_metrics(&self, screen: c_int) -> Result<ScreenMetrics> {
        self.check_screen(screen)?;
        Ok(unsafe { screen_metrics_raw(self.0.as_ptr(), screen) })
    }
    pub fn width_pixels(&self, screen: c_int) -> Result<c_int> {
        self.screen_metrics(screen).map(|m| m.width_pixels)
    }
    pub fn width_millimeters(&self, screen: c_int) -> Result<c_int> {
        self.screen_metrics(screen).map(|m| m.width_millimeters)
    }
    pub fn height_pixels(&self, screen: c_int) -> Result<c_int> {
        self.screen_metrics(screen).map(|m| m.height_pixels)
    }
    pub fn height_millimeters(&self, screen: c_int) -> Result<c_int> {
        self.screen_metrics(screen).map(|m| m.height_millimeters)
    }
}
impl Drop for Display {
    fn drop(&mut self) {
        unsafe { XCloseDisplay(self.0.as_ptr()) };
    }
}

/// An input method opened on a [`Display`].
pub struct InputMethod<'d> {
    im: NonNull<x11::xlib::_XIM>,
    _display: PhantomData<&'d Display>,
}
impl<'d> InputMethod<'d> {
    /// `XOpenIM` with the default resource database and names.
    pub fn open(display: &'d Display) -> Result<Self> {
        let im = unsafe {
            XOpenIM(
                display.as_ptr(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };

        NonNull::new(im)
            .map(|im| Self {
                im,
                _display: PhantomData,
            })
            .ok_or_else(|| ShimError::null_result("XOpenIM"))
    }

    pub fn as_ptr(&self) -> XIM {
        self.im.as_ptr()
    }
}
impl Drop for InputMethod<'_> {
    fn drop(&mut self) {
        unsafe { XCloseIM(self.im.as_ptr()) };
    }
}

/// Input context bound to one window; client and focus window are the same.
pub struct InputContext<'m> {
    ic: NonNull<x11::xlib::_XIC>,
    _im: PhantomData<&'m InputMethod<'m>>,
}
impl<'m> InputContext<'m> {
    pub fn new(im: &'m InputMethod<'_>, window: Window) -> Result<Self> {
        if window == 0 {
            return Err(ShimError::InvalidHandle);
        }

        let ic = unsafe { create_input_context_raw(im.as_ptr(), window) };
        match NonNull::new(ic) {
            Some(ic) => Ok(Self {
                ic,
                _im: PhantomData,
            }),
            None => {
                warn!("XCreateIC refused window 0x{window:x} (input style unsupported?)");
                Err(ShimError::null_result("XCreateIC"))
            }
        }
    }

    pub fn as_ptr(&self) -> XIC {
        self.ic.as_ptr()
    }

    fn window_value(&self, name: &CStr) -> Result<Window> {
        let mut w: Window = 0;
        let failed = unsafe {
            XGetICValues(
                self.ic.as_ptr(),
                name.as_ptr(),
                &mut w as *mut Window,
                std::ptr::null_mut::<c_char>(),
            )
        };
        if failed.is_null() {
            Ok(w)
        } else {
            Err(ShimError::null_result("XGetICValues"))
        }
    }
    pub fn client_window(&self) -> Result<Window> {
        self.window_value(XN_CLIENT_WINDOW)
    }
    pub fn focus_window(&self) -> Result<Window> {
        self.window_value(XN_FOCUS_WINDOW)
    }
}
impl Drop for InputContext<'_> {
    fn drop(&mut self) {
        unsafe { XDestroyIC(self.ic.as_ptr()) };
    }
}

/// Routes Xlib protocol errors to the log instead of Xlib's default exit-on-error handler.
pub fn install_error_logger() {
    static INSTALL: std::sync::Once = std::sync::Once::new();
    INSTALL.call_once(|| unsafe {
        XSetErrorHandler(Some(error_handler));
    });
}

unsafe extern "C" fn error_handler(d: *mut x11::xlib::Display, e: *mut XErrorEvent) -> c_int {
    let Some(e) = (unsafe { e.as_ref() }) else {
        error!("X error handler called without an event");
        return 0;
    };
    let mut error_text = [0 as c_char; 256];
    unsafe {
        XGetErrorText(
            d,
            e.error_code as _,
            error_text.as_mut_ptr(),
            error_text.len() as _,
        )
    };

    error!(
        "[req #{}({}.{})] Err {}: {}",
        e.serial,
        e.request_code,
        e.minor_code,
        e.error_code,
        unsafe { CStr::from_ptr(error_text.as_ptr()) }.to_string_lossy()
    );

    0
}
