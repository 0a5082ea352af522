//! macOS hook using rdev.
//!
//! rdev's listener cannot be stopped once started, so one listener thread is
//! started on the first run and kept for the life of the process. Each run
//! attaches its dispatch callback to that listener and detaches it on stop.

use crate::event::{
    EventData, KeyboardData, MouseData, RawEvent, WheelData, WHEEL_HORIZONTAL_DIRECTION,
    WHEEL_UNIT_SCROLL, WHEEL_VERTICAL_DIRECTION,
};
use crate::key::{button, mask, modifier_bit, vc};
use crate::native::{self, DispatchFn, LoggerFn, NativeHook, StatusCode};
use log::Level;
use rdev::{listen, Event, EventType, ListenError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::UNIX_EPOCH;

/// Convert an rdev key to a virtual keycode.
fn to_vc(key: rdev::Key) -> u16 {
    use rdev::Key;
    match key {
        Key::Escape => vc::ESCAPE,
        Key::Num1 => vc::NUM_1,
        Key::Num2 => vc::NUM_2,
        Key::Num3 => vc::NUM_3,
        Key::Num4 => vc::NUM_4,
        Key::Num5 => vc::NUM_5,
        Key::Num6 => vc::NUM_6,
        Key::Num7 => vc::NUM_7,
        Key::Num8 => vc::NUM_8,
        Key::Num9 => vc::NUM_9,
        Key::Num0 => vc::NUM_0,
        Key::Minus => vc::MINUS,
        Key::Equal => vc::EQUALS,
        Key::Backspace => vc::BACKSPACE,
        Key::Tab => vc::TAB,
        Key::KeyQ => vc::Q,
        Key::KeyW => vc::W,
        Key::KeyE => vc::E,
        Key::KeyR => vc::R,
        Key::KeyT => vc::T,
        Key::KeyY => vc::Y,
        Key::KeyU => vc::U,
        Key::KeyI => vc::I,
        Key::KeyO => vc::O,
        Key::KeyP => vc::P,
        Key::LeftBracket => vc::OPEN_BRACKET,
        Key::RightBracket => vc::CLOSE_BRACKET,
        Key::Return => vc::ENTER,
        Key::ControlLeft => vc::CONTROL_L,
        Key::KeyA => vc::A,
        Key::KeyS => vc::S,
        Key::KeyD => vc::D,
        Key::KeyF => vc::F,
        Key::KeyG => vc::G,
        Key::KeyH => vc::H,
        Key::KeyJ => vc::J,
        Key::KeyK => vc::K,
        Key::KeyL => vc::L,
        Key::SemiColon => vc::SEMICOLON,
        Key::Quote => vc::QUOTE,
        Key::BackQuote => vc::BACKQUOTE,
        Key::ShiftLeft => vc::SHIFT_L,
        Key::BackSlash => vc::BACK_SLASH,
        Key::KeyZ => vc::Z,
        Key::KeyX => vc::X,
        Key::KeyC => vc::C,
        Key::KeyV => vc::V,
        Key::KeyB => vc::B,
        Key::KeyN => vc::N,
        Key::KeyM => vc::M,
        Key::Comma => vc::COMMA,
        Key::Dot => vc::PERIOD,
        Key::Slash => vc::SLASH,
        Key::ShiftRight => vc::SHIFT_R,
        Key::Alt => vc::ALT_L,
        Key::AltGr => vc::ALT_R,
        Key::Space => vc::SPACE,
        Key::CapsLock => vc::CAPS_LOCK,
        Key::F1 => vc::F1,
        Key::F2 => vc::F2,
        Key::F3 => vc::F3,
        Key::F4 => vc::F4,
        Key::F5 => vc::F5,
        Key::F6 => vc::F6,
        Key::F7 => vc::F7,
        Key::F8 => vc::F8,
        Key::F9 => vc::F9,
        Key::F10 => vc::F10,
        Key::F11 => vc::F11,
        Key::F12 => vc::F12,
        Key::NumLock => vc::NUM_LOCK,
        Key::ScrollLock => vc::SCROLL_LOCK,
        Key::ControlRight => vc::CONTROL_R,
        Key::Home => vc::HOME,
        Key::UpArrow => vc::UP,
        Key::PageUp => vc::PAGE_UP,
        Key::LeftArrow => vc::LEFT,
        Key::RightArrow => vc::RIGHT,
        Key::End => vc::END,
        Key::DownArrow => vc::DOWN,
        Key::PageDown => vc::PAGE_DOWN,
        Key::Insert => vc::INSERT,
        Key::Delete => vc::DELETE,
        Key::MetaLeft => vc::META_L,
        Key::MetaRight => vc::META_R,
        _ => vc::UNDEFINED,
    }
}

fn rawcode(key: rdev::Key) -> u16 {
    match key {
        rdev::Key::Unknown(code) => u16::try_from(code).unwrap_or(0),
        _ => 0,
    }
}

fn to_button(button: rdev::Button) -> u16 {
    match button {
        rdev::Button::Left => button::BUTTON1,
        rdev::Button::Right => button::BUTTON2,
        rdev::Button::Middle => button::BUTTON3,
        rdev::Button::Unknown(n) => u16::from(n),
    }
}

fn status_for(error: &ListenError) -> StatusCode {
    match error {
        ListenError::EventTapError => StatusCode::CreateEventPort,
        ListenError::LoopSourceError => StatusCode::CreateRunLoopSource,
        _ => StatusCode::Failure,
    }
}

/// Converts rdev events, tracking the modifier/button mask, pointer
/// position and whether a press turned into a drag.
#[derive(Default)]
struct Tracker {
    mask: u16,
    x: i16,
    y: i16,
    held: Option<(u16, bool)>,
}

impl Tracker {
    fn convert(&mut self, event: &Event, out: &mut dyn FnMut(&RawEvent)) {
        let time = event
            .time
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();

        match event.event_type {
            EventType::KeyPress(key) => {
                let keycode = to_vc(key);
                if let Some(bit) = modifier_bit(keycode) {
                    self.mask |= bit;
                }
                let data = KeyboardData {
                    keycode,
                    rawcode: rawcode(key),
                    keychar: 0,
                };
                out(&RawEvent::new(time, self.mask, EventData::KeyPressed(data)));

                let typed = event
                    .name
                    .as_deref()
                    .and_then(|name| name.encode_utf16().next())
                    .filter(|c| *c >= 0x20 || *c == 0x09 || *c == 0x0D);
                if let Some(keychar) = typed {
                    let data = KeyboardData { keychar, ..data };
                    out(&RawEvent::new(time, self.mask, EventData::KeyTyped(data)));
                }
            }
            EventType::KeyRelease(key) => {
                let keycode = to_vc(key);
                if let Some(bit) = modifier_bit(keycode) {
                    self.mask &= !bit;
                }
                let data = KeyboardData {
                    keycode,
                    rawcode: rawcode(key),
                    keychar: 0,
                };
                out(&RawEvent::new(time, self.mask, EventData::KeyReleased(data)));
            }
            EventType::ButtonPress(b) => {
                let button = to_button(b);
                self.mask |= mask::for_button(button);
                self.held = Some((button, false));
                let data = MouseData {
                    button,
                    clicks: 1,
                    x: self.x,
                    y: self.y,
                };
                out(&RawEvent::new(time, self.mask, EventData::MousePressed(data)));
            }
            EventType::ButtonRelease(b) => {
                let button = to_button(b);
                self.mask &= !mask::for_button(button);
                let data = MouseData {
                    button,
                    clicks: 1,
                    x: self.x,
                    y: self.y,
                };
                out(&RawEvent::new(time, self.mask, EventData::MouseReleased(data)));
                if matches!(self.held.take(), Some((held, false)) if held == button) {
                    out(&RawEvent::new(time, self.mask, EventData::MouseClicked(data)));
                }
            }
            EventType::MouseMove { x, y } => {
                self.x = x as i16;
                self.y = y as i16;
                let mut data = MouseData {
                    button: button::NONE,
                    clicks: 0,
                    x: self.x,
                    y: self.y,
                };
                let kind = match self.held.as_mut() {
                    Some((button, moved)) => {
                        *moved = true;
                        data.button = *button;
                        EventData::MouseDragged(data)
                    }
                    None => EventData::MouseMoved(data),
                };
                out(&RawEvent::new(time, self.mask, kind));
            }
            EventType::Wheel { delta_x, delta_y } => {
                let (direction, delta) = if delta_y != 0 {
                    (WHEEL_VERTICAL_DIRECTION, -delta_y)
                } else {
                    (WHEEL_HORIZONTAL_DIRECTION, delta_x)
                };
                let data = WheelData {
                    amount: 3,
                    clicks: 1,
                    direction,
                    rotation: delta.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16,
                    scroll_type: WHEEL_UNIT_SCROLL,
                    x: self.x,
                    y: self.y,
                };
                out(&RawEvent::new(time, self.mask, EventData::MouseWheel(data)));
            }
        }
    }
}

#[derive(Default)]
struct RunState {
    stop_requested: bool,
    listener_alive: bool,
    listen_error: Option<StatusCode>,
}

#[derive(Default)]
struct Shared {
    dispatch: Mutex<Option<DispatchFn>>,
    state: Mutex<RunState>,
    changed: Condvar,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self) -> MutexGuard<'_, Option<DispatchFn>> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Global hook backed by an rdev listener.
pub struct RdevHook {
    shared: Arc<Shared>,
    logger: Mutex<Option<LoggerFn>>,
}

impl RdevHook {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            logger: Mutex::new(None),
        }
    }

    fn spawn_listener(&self) -> Result<(), StatusCode> {
        let shared = Arc::clone(&self.shared);
        thread::Builder::new()
            .name("iohook-rdev".into())
            .spawn(move || {
                let callback_shared = Arc::clone(&shared);
                let mut tracker = Tracker::default();
                let callback = move |event: Event| {
                    if let Some(dispatch) = callback_shared.dispatch().as_mut() {
                        tracker.convert(&event, &mut **dispatch);
                    }
                };

                if let Err(e) = listen(callback) {
                    let mut state = shared.state();
                    state.listener_alive = false;
                    state.listen_error = Some(status_for(&e));
                    shared.changed.notify_all();
                }
            })
            .map(|_| ())
            .map_err(|_| StatusCode::ThreadCreate)
    }
}

impl Default for RdevHook {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHook for RdevHook {
    fn arm(&self) {
        self.shared.state().stop_requested = false;
    }

    fn set_logger(&self, logger: LoggerFn) {
        *self.logger.lock().unwrap_or_else(PoisonError::into_inner) = Some(logger);
    }

    fn set_dispatch(&self, dispatch: DispatchFn) {
        *self.shared.dispatch() = Some(dispatch);
    }

    fn run(&self) -> StatusCode {
        let logger = self.logger.lock().unwrap_or_else(PoisonError::into_inner).take();

        {
            let mut state = self.shared.state();
            state.listen_error = None;
            if !state.listener_alive {
                if let Err(status) = self.spawn_listener() {
                    return status;
                }
                state.listener_alive = true;
            }
        }

        match self.shared.dispatch().as_mut() {
            Some(dispatch) => dispatch(&RawEvent::new(0, 0, EventData::HookEnabled)),
            None => {
                native::emit(&logger, Level::Error, "No dispatch callback registered");
                return StatusCode::Failure;
            }
        }
        native::emit(&logger, Level::Debug, "rdev hook attached");

        let status = {
            let state = self.shared.state();
            let mut state = self
                .shared
                .changed
                .wait_while(state, |s| !s.stop_requested && s.listen_error.is_none())
                .unwrap_or_else(PoisonError::into_inner);
            state.listen_error.take().unwrap_or(StatusCode::Success)
        };

        if let Some(mut dispatch) = self.shared.dispatch().take() {
            dispatch(&RawEvent::new(0, 0, EventData::HookDisabled));
        }
        status
    }

    fn stop(&self) -> StatusCode {
        self.shared.state().stop_requested = true;
        self.shared.changed.notify_all();
        StatusCode::Success
    }
}
