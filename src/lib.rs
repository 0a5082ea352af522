//! Global keyboard and mouse hook bridged to async consumers.
//!
//! The native hook delivers events synchronously on its own thread, and
//! some platforms disable a hook whose callback is slow. This crate keeps
//! that callback down to a single record copy: events go into an unbounded
//! queue, a forwarder thread drains the queue in order, and each event is
//! handed to an [`EventBoundary`] without ever blocking on it.
//!
//! ```text
//! native loop -> dispatch (hook thread) -> EventQueue -> forwarder thread -> EventBoundary -> host
//! ```
//!
//! # Features
//!
//! - **Native Wayland support on Linux** - Uses evdev directly (reads `/dev/input`)
//! - **macOS support** - Uses rdev
//! - **Ordered delivery** - Events reach the host in capture order
//! - **Single session** - `start` while running and `stop` while idle are no-ops
//! - **Clean shutdown** - `stop` joins both threads before returning
//!
//! # Example
//!
//! ```no_run
//! use iohook_bridge::{boundary, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let controller = SessionController::builder()
//!         .log_file("iohook.log")
//!         .build()?;
//!
//!     let (sink, mut events) = boundary::channel(1024);
//!     controller.start(sink, false);
//!
//!     while let Some(record) = events.recv().await {
//!         println!("{}", record.to_json());
//!     }
//!
//!     controller.stop();
//!     Ok(())
//! }
//! ```
//!
//! # Linux Requirements
//!
//! On Linux, the user must have permission to read from `/dev/input/event*` devices.
//! This typically means running as root or being a member of the `input` group.

pub mod boundary;
mod controller;
mod decode;
mod error;
mod event;
mod forwarder;
pub mod key;
pub mod logger;
mod manual;
mod native;
mod queue;
mod session;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

pub use boundary::{BoundaryError, ChannelBoundary, EventBoundary, EventReceiver};
pub use controller::{Phase, SessionController, SessionControllerBuilder, StartOutcome, StopOutcome};
pub use decode::{decode, EventRecord, KeyboardRecord, MouseRecord, WheelRecord};
pub use error::HookError;
pub use event::{
    EventData, EventKind, KeyboardData, MouseData, RawEvent, WheelData, WHEEL_BLOCK_SCROLL,
    WHEEL_HORIZONTAL_DIRECTION, WHEEL_UNIT_SCROLL, WHEEL_VERTICAL_DIRECTION,
};
pub use key::Modifiers;
pub use manual::{ManualHook, ManualTrigger};
pub use native::{DispatchFn, LoggerFn, NativeHook, StatusCode};
pub use queue::EventQueue;

#[cfg(target_os = "linux")]
pub use linux::{find_devices, EvdevHook};

#[cfg(target_os = "macos")]
pub use macos::RdevHook;
