//! Contract between the session and a native global hook.

use crate::event::RawEvent;

/// Status codes returned by a native hook's `run` and `stop` entrypoints.
///
/// Values are grouped by family: generic (0x0_), thread (0x1_), X11 (0x2_),
/// Windows (0x3_) and Darwin (0x4_).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    Success = 0x00,
    Failure = 0x01,
    OutOfMemory = 0x02,

    ThreadCreate = 0x10,

    XOpenDisplay = 0x20,
    XRecordNotFound = 0x21,
    XRecordAllocRange = 0x22,
    XRecordCreateContext = 0x23,
    XRecordEnableContext = 0x24,
    XRecordGetContext = 0x25,

    SetWindowsHookEx = 0x30,
    GetModuleHandle = 0x31,

    AxApiDisabled = 0x40,
    CreateEventPort = 0x41,
    CreateRunLoopSource = 0x42,
    GetRunLoop = 0x43,
    CreateObserver = 0x44,
}

impl StatusCode {
    pub fn value(self) -> u16 {
        self as u16
    }

    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }

    /// Map a raw value back to a status. Unknown values are `Failure`.
    pub fn from_value(value: u16) -> Self {
        match value {
            0x00 => StatusCode::Success,
            0x02 => StatusCode::OutOfMemory,
            0x10 => StatusCode::ThreadCreate,
            0x20 => StatusCode::XOpenDisplay,
            0x21 => StatusCode::XRecordNotFound,
            0x22 => StatusCode::XRecordAllocRange,
            0x23 => StatusCode::XRecordCreateContext,
            0x24 => StatusCode::XRecordEnableContext,
            0x25 => StatusCode::XRecordGetContext,
            0x30 => StatusCode::SetWindowsHookEx,
            0x31 => StatusCode::GetModuleHandle,
            0x40 => StatusCode::AxApiDisabled,
            0x41 => StatusCode::CreateEventPort,
            0x42 => StatusCode::CreateRunLoopSource,
            0x43 => StatusCode::GetRunLoop,
            0x44 => StatusCode::CreateObserver,
            _ => StatusCode::Failure,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StatusCode::Success => "Success",
            StatusCode::Failure => "An unknown hook error occurred",
            StatusCode::OutOfMemory => "Failed to allocate memory",
            StatusCode::ThreadCreate => "Failed to create hook thread",
            StatusCode::XOpenDisplay => "Failed to open X11 display",
            StatusCode::XRecordNotFound => "Unable to locate XRecord extension",
            StatusCode::XRecordAllocRange => "Unable to allocate XRecord range",
            StatusCode::XRecordCreateContext => "Unable to allocate XRecord context",
            StatusCode::XRecordEnableContext => "Failed to enable XRecord context",
            StatusCode::XRecordGetContext => "Failed to get XRecord context",
            StatusCode::SetWindowsHookEx => "Failed to register low level windows hook",
            StatusCode::GetModuleHandle => "Failed to get module handle",
            StatusCode::AxApiDisabled => "Failed to enable access for assistive devices",
            StatusCode::CreateEventPort => "Failed to create apple event port",
            StatusCode::CreateRunLoopSource => "Failed to create apple run loop source",
            StatusCode::GetRunLoop => "Failed to acquire apple run loop",
            StatusCode::CreateObserver => "Failed to create apple run loop observer",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#04X})", self.description(), self.value())
    }
}

/// Receives every event the hook captures, on the hook's own thread.
pub type DispatchFn = Box<dyn FnMut(&RawEvent) + Send>;

/// Receives diagnostic output from the hook implementation.
pub type LoggerFn = Box<dyn Fn(log::Level, &str) + Send + Sync>;

/// A global input hook.
///
/// The hook is shared between the thread blocked in [`run`](NativeHook::run)
/// and the thread that calls [`stop`](NativeHook::stop), so every method
/// takes `&self`.
pub trait NativeHook: Send + Sync {
    /// Clear any stop request left over from a previous run. Called on the
    /// controlling thread before the hook thread is spawned, so a `stop`
    /// that races ahead of `run` is still honoured.
    fn arm(&self) {}

    fn set_logger(&self, logger: LoggerFn);

    fn set_dispatch(&self, dispatch: DispatchFn);

    /// Run the hook, calling the dispatch callback for every event. Blocks
    /// until [`stop`](NativeHook::stop) is called or the hook fails.
    fn run(&self) -> StatusCode;

    /// Ask a running (or about to run) hook to return from `run`.
    fn stop(&self) -> StatusCode;
}

/// Forward a message to the registered hook logger, if any.
pub(crate) fn emit(logger: &Option<LoggerFn>, level: log::Level, message: &str) {
    if let Some(logger) = logger {
        logger(level, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_round_trip() {
        for code in [
            StatusCode::Success,
            StatusCode::OutOfMemory,
            StatusCode::XRecordGetContext,
            StatusCode::SetWindowsHookEx,
            StatusCode::CreateObserver,
        ] {
            assert_eq!(StatusCode::from_value(code.value()), code);
        }
    }

    #[test]
    fn test_unknown_value_is_failure() {
        assert_eq!(StatusCode::from_value(0x99), StatusCode::Failure);
    }

    #[test]
    fn test_display_includes_hex() {
        assert_eq!(
            StatusCode::XOpenDisplay.to_string(),
            "Failed to open X11 display (0x20)"
        );
    }
}
