//! Shim Errors

/// Failure reported by the safe wrappers around native calls.
#[derive(Debug)]
pub enum ShimError {
    /// A null display/input-method/window handle or a closed descriptor was supplied.
    InvalidHandle,
    /// An argument was outside the range the native call accepts.
    InvalidArgument(String),
    /// The native call itself reported failure.
    NativeCallFailed {
        call: &'static str,
        source: std::io::Error,
    },
}
impl ShimError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Captures `errno` for a native call that just returned a failure value.
    pub fn last_os_error(call: &'static str) -> Self {
        Self::NativeCallFailed {
            call,
            source: std::io::Error::last_os_error(),
        }
    }

    /// For constructors that signal failure only by returning null (no errno).
    pub fn null_result(call: &'static str) -> Self {
        Self::NativeCallFailed {
            call,
            source: std::io::Error::new(std::io::ErrorKind::Other, "null handle returned"),
        }
    }
}
impl From<std::io::Error> for ShimError {
    fn from(value: std::io::Error) -> Self {
        Self::NativeCallFailed {
            call: "io",
            source: value,
        }
    }
}
impl std::fmt::Display for ShimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHandle => write!(f, "invalid native handle"),
            Self::InvalidArgument(m) => write!(f, "invalid argument: {m}"),
            Self::NativeCallFailed { call, source } => write!(f, "{call} failed: {source}"),
        }
    }
}
impl std::error::Error for ShimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NativeCallFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShimError>;
