//! Native capability shims for Linux/X11 hosts
//!
//! Fixed-argument, macro-free entry points for engines that reach the platform through a
//! foreign-function interface, plus safe wrappers for Rust callers:
//!
//! - X11 input-context construction and screen metrics ([`xlib`], feature `xlib`)
//! - evdev request-code synthesis and ioctl forwarding ([`ioctl`], [`kernel_input`], [`evdev`])
//! - controller identity/capability probing ([`controller`])

#[macro_use] extern crate log;

pub mod error; pub use self::error::{Result, ShimError};
pub mod config; pub use self::config::ScanConfig;
pub mod ioctl;
pub mod kernel_input;
pub mod evdev; pub use self::evdev::EventDevice;
pub mod controller;
#[cfg(feature = "xlib")] pub mod xlib;
pub mod exports;
