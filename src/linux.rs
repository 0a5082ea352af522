//! Linux hook using evdev.
//!
//! Reads `/dev/input/event*` directly, so it works under both X11 and
//! Wayland. The user must be able to read those devices (root, or a member
//! of the `input` group).

use crate::event::{
    EventData, KeyboardData, MouseData, RawEvent, WheelData, WHEEL_HORIZONTAL_DIRECTION,
    WHEEL_UNIT_SCROLL, WHEEL_VERTICAL_DIRECTION,
};
use crate::key::{button, mask, modifier_bit, vc};
use crate::native::{self, DispatchFn, LoggerFn, NativeHook, StatusCode};
use anyhow::{anyhow, Context, Result};
use evdev::{Device, InputEventKind, RelativeAxisType};
use log::Level;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Lines scrolled per wheel notch.
const WHEEL_AMOUNT: u16 = 3;
/// Presses of the same button closer together than this count as one
/// multi-click.
const MULTI_CLICK_MS: u64 = 500;
/// Minimum interval between device rescans after a read error.
const RESCAN_INTERVAL: Duration = Duration::from_secs(3);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Find all keyboards and pointing devices in /dev/input.
pub fn find_devices() -> Result<Vec<Device>> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev/input")? {
        let entry = entry?;
        let path = entry.path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        if let Ok(device) = Device::open(&path) {
            let keys = device.supported_keys().map_or(false, |keys| {
                keys.contains(evdev::Key::KEY_A) || keys.contains(evdev::Key::BTN_LEFT)
            });
            let pointer = device
                .supported_relative_axes()
                .map_or(false, |axes| axes.contains(RelativeAxisType::REL_X));

            if keys || pointer {
                log::debug!("Found input device: {:?} at {:?}", device.name(), path);
                devices.push(device);
            }
        }
    }

    if devices.is_empty() {
        Err(anyhow!(
            "No input devices found. Make sure you're in the 'input' group or running as root."
        ))
    } else {
        Ok(devices)
    }
}

/// Set non-blocking mode on devices.
fn set_nonblocking(devices: &[Device]) -> Result<()> {
    for device in devices {
        let fd = device.as_raw_fd();
        let flags = fcntl(fd, FcntlArg::F_GETFL).context("Failed to get fd flags")?;
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
        fcntl(fd, FcntlArg::F_SETFL(flags)).context("Failed to set non-blocking")?;
    }
    Ok(())
}

fn would_block(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(libc::EAGAIN) || e.raw_os_error() == Some(libc::EWOULDBLOCK)
}

/// Drain stale events so input from before the hook started is not reported.
fn drain_events(devices: &mut [Device]) {
    for device in devices.iter_mut() {
        loop {
            match device.fetch_events() {
                Ok(events) => {
                    if events.count() == 0 {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    }
}

/// Map an evdev key code to a virtual keycode.
fn to_vc(code: u16) -> u16 {
    match code {
        // The main block shares its numbering with scancode set 1.
        1..=88 => code,
        96 => 0x0E1C,
        97 => vc::CONTROL_R,
        98 => 0x0E35,
        99 => 0x0E37,
        100 => vc::ALT_R,
        102 => vc::HOME,
        103 => vc::UP,
        104 => vc::PAGE_UP,
        105 => vc::LEFT,
        106 => vc::RIGHT,
        107 => vc::END,
        108 => vc::DOWN,
        109 => vc::PAGE_DOWN,
        110 => vc::INSERT,
        111 => vc::DELETE,
        119 => 0x0E45,
        125 => vc::META_L,
        126 => vc::META_R,
        127 => 0x0E5D,
        _ => vc::UNDEFINED,
    }
}

/// Map an evdev button code to a mouse button number.
fn to_button(code: u16) -> Option<u16> {
    match code {
        0x110 => Some(button::BUTTON1),
        0x111 => Some(button::BUTTON2),
        0x112 => Some(button::BUTTON3),
        0x113 => Some(button::BUTTON4),
        0x114 => Some(button::BUTTON5),
        _ => None,
    }
}

const TOP_ROW: &[u8] = b"qwertyuiop";
const HOME_ROW: &[u8] = b"asdfghjkl";
const BOTTOM_ROW: &[u8] = b"zxcvbnm";
const DIGITS: &[u8] = b"1234567890";

/// Character produced by a key, for the keys with an unambiguous one.
fn keychar(keycode: u16, modifiers: u16) -> Option<u16> {
    let letter = match keycode {
        vc::Q..=vc::P => Some(TOP_ROW[usize::from(keycode - vc::Q)]),
        vc::A..=vc::L => Some(HOME_ROW[usize::from(keycode - vc::A)]),
        vc::Z..=vc::M => Some(BOTTOM_ROW[usize::from(keycode - vc::Z)]),
        _ => None,
    };
    if let Some(letter) = letter {
        let shifted = modifiers & mask::SHIFT != 0;
        let caps = modifiers & mask::CAPS_LOCK != 0;
        let c = if shifted != caps {
            letter.to_ascii_uppercase()
        } else {
            letter
        };
        return Some(u16::from(c));
    }

    match keycode {
        vc::NUM_1..=vc::NUM_0 if modifiers & mask::SHIFT == 0 => {
            Some(u16::from(DIGITS[usize::from(keycode - vc::NUM_1)]))
        }
        vc::SPACE => Some(u16::from(b' ')),
        vc::TAB => Some(u16::from(b'\t')),
        vc::ENTER => Some(u16::from(b'\r')),
        _ => None,
    }
}

/// Device-independent view of one evdev event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Key(u16),
    Button(u16),
    MoveX,
    MoveY,
    Wheel,
    HWheel,
}

fn classify(kind: InputEventKind) -> Option<Input> {
    match kind {
        InputEventKind::Key(key) => {
            let code = key.code();
            match to_button(code) {
                Some(button) => Some(Input::Button(button)),
                None => Some(Input::Key(code)),
            }
        }
        InputEventKind::RelAxis(axis) => match axis {
            RelativeAxisType::REL_X => Some(Input::MoveX),
            RelativeAxisType::REL_Y => Some(Input::MoveY),
            RelativeAxisType::REL_WHEEL => Some(Input::Wheel),
            RelativeAxisType::REL_HWHEEL => Some(Input::HWheel),
            _ => None,
        },
        _ => None,
    }
}

/// Turns raw device input into hook events, tracking modifier/button state,
/// pointer position and click counts across devices.
#[derive(Debug, Default)]
struct Translator {
    mask: u16,
    x: i32,
    y: i32,
    /// Button held down and whether the pointer moved since.
    held: Option<(u16, bool)>,
    /// Last click: button, time, count.
    last_click: Option<(u16, u64, u16)>,
}

impl Translator {
    fn pos(&self) -> (i16, i16) {
        let clamp = |v: i32| v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        (clamp(self.x), clamp(self.y))
    }

    fn event(&self, time: u64, data: EventData) -> RawEvent {
        RawEvent::new(time, self.mask, data)
    }

    fn feed(&mut self, time: u64, input: Input, value: i32, emit: &mut dyn FnMut(&RawEvent)) {
        match input {
            Input::Key(code) => self.key(time, to_vc(code), code, value, emit),
            Input::Button(button) => self.button(time, button, value, emit),
            Input::MoveX | Input::MoveY => {
                if input == Input::MoveX {
                    self.x = self.x.saturating_add(value);
                } else {
                    self.y = self.y.saturating_add(value);
                }
                let (x, y) = self.pos();
                let mut data = MouseData {
                    button: button::NONE,
                    clicks: 0,
                    x,
                    y,
                };
                let event = match self.held.as_mut() {
                    Some((button, moved)) => {
                        *moved = true;
                        data.button = *button;
                        EventData::MouseDragged(data)
                    }
                    None => EventData::MouseMoved(data),
                };
                self.last_click = None;
                emit(&self.event(time, event));
            }
            Input::Wheel | Input::HWheel => {
                let (x, y) = self.pos();
                let (direction, rotation) = if input == Input::Wheel {
                    (WHEEL_VERTICAL_DIRECTION, -value)
                } else {
                    (WHEEL_HORIZONTAL_DIRECTION, value)
                };
                let data = WheelData {
                    amount: WHEEL_AMOUNT,
                    clicks: 1,
                    direction,
                    rotation: rotation.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
                    scroll_type: WHEEL_UNIT_SCROLL,
                    x,
                    y,
                };
                emit(&self.event(time, EventData::MouseWheel(data)));
            }
        }
    }

    fn key(&mut self, time: u64, keycode: u16, rawcode: u16, value: i32, emit: &mut dyn FnMut(&RawEvent)) {
        let data = KeyboardData {
            keycode,
            rawcode,
            keychar: 0,
        };
        match value {
            // 1 is a press, 2 an autorepeat
            1 | 2 => {
                if value == 1 {
                    if let Some(bit) = modifier_bit(keycode) {
                        self.mask |= bit;
                    } else if keycode == vc::CAPS_LOCK {
                        self.mask ^= mask::CAPS_LOCK;
                    }
                }
                emit(&self.event(time, EventData::KeyPressed(data)));
                if let Some(keychar) = keychar(keycode, self.mask) {
                    let typed = KeyboardData { keychar, ..data };
                    emit(&self.event(time, EventData::KeyTyped(typed)));
                }
            }
            0 => {
                if let Some(bit) = modifier_bit(keycode) {
                    self.mask &= !bit;
                }
                emit(&self.event(time, EventData::KeyReleased(data)));
            }
            _ => {}
        }
    }

    fn button(&mut self, time: u64, button: u16, value: i32, emit: &mut dyn FnMut(&RawEvent)) {
        let (x, y) = self.pos();
        match value {
            1 => {
                let clicks = match self.last_click {
                    Some((last, at, count))
                        if last == button && time.saturating_sub(at) <= MULTI_CLICK_MS =>
                    {
                        count + 1
                    }
                    _ => 1,
                };
                self.last_click = Some((button, time, clicks));
                self.held = Some((button, false));
                self.mask |= mask::for_button(button);
                let data = MouseData {
                    button,
                    clicks,
                    x,
                    y,
                };
                emit(&self.event(time, EventData::MousePressed(data)));
            }
            0 => {
                let clicks = self.last_click.map_or(0, |(_, _, count)| count);
                self.mask &= !mask::for_button(button);
                let data = MouseData {
                    button,
                    clicks,
                    x,
                    y,
                };
                emit(&self.event(time, EventData::MouseReleased(data)));

                let clicked = matches!(self.held, Some((held, false)) if held == button);
                self.held = None;
                if clicked {
                    emit(&self.event(time, EventData::MouseClicked(data)));
                }
            }
            _ => {}
        }
    }
}

/// Global hook over evdev devices.
pub struct EvdevHook {
    epoch: Instant,
    stop_requested: AtomicBool,
    dispatch: Mutex<Option<DispatchFn>>,
    logger: Mutex<Option<LoggerFn>>,
}

impl EvdevHook {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            stop_requested: AtomicBool::new(false),
            dispatch: Mutex::new(None),
            logger: Mutex::new(None),
        }
    }

    fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for EvdevHook {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHook for EvdevHook {
    fn arm(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    fn set_logger(&self, logger: LoggerFn) {
        *self.logger.lock().unwrap_or_else(PoisonError::into_inner) = Some(logger);
    }

    fn set_dispatch(&self, dispatch: DispatchFn) {
        *self.dispatch.lock().unwrap_or_else(PoisonError::into_inner) = Some(dispatch);
    }

    fn run(&self) -> StatusCode {
        let logger = self.logger.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(mut dispatch) = self
            .dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            native::emit(&logger, Level::Error, "No dispatch callback registered");
            return StatusCode::Failure;
        };

        let mut devices = match find_devices() {
            Ok(devices) => devices,
            Err(e) => {
                native::emit(&logger, Level::Error, &e.to_string());
                return StatusCode::Failure;
            }
        };
        if let Err(e) = set_nonblocking(&devices) {
            native::emit(&logger, Level::Error, &format!("{:#}", e));
            return StatusCode::Failure;
        }
        drain_events(&mut devices);
        native::emit(
            &logger,
            Level::Info,
            &format!("Listening on {} input device(s)", devices.len()),
        );

        let mut translator = Translator::default();
        let mut last_rescan = Instant::now();
        let mut had_error = false;

        dispatch(&RawEvent::new(self.now(), 0, EventData::HookEnabled));

        while !self.stop_requested.load(Ordering::SeqCst) {
            if had_error && last_rescan.elapsed() >= RESCAN_INTERVAL {
                native::emit(&logger, Level::Info, "Input device error detected, rescanning...");
                match find_devices() {
                    Ok(mut new_devices) => {
                        // Give devices time to fully initialize (especially BT keyboards)
                        thread::sleep(Duration::from_millis(100));

                        match set_nonblocking(&new_devices) {
                            Ok(()) => {
                                native::emit(
                                    &logger,
                                    Level::Info,
                                    &format!("Devices reconnected: found {}", new_devices.len()),
                                );
                                drain_events(&mut new_devices);
                                devices.clear();
                                devices = new_devices;
                                translator = Translator::default();
                                had_error = false;
                            }
                            Err(e) => native::emit(
                                &logger,
                                Level::Warn,
                                &format!("Failed to set non-blocking on new devices: {:#}", e),
                            ),
                        }
                    }
                    Err(e) => native::emit(
                        &logger,
                        Level::Warn,
                        &format!("Failed to rescan input devices: {}", e),
                    ),
                }
                last_rescan = Instant::now();
            }

            for device in devices.iter_mut() {
                match device.fetch_events() {
                    Ok(events) => {
                        for event in events {
                            if let Some(input) = classify(event.kind()) {
                                translator.feed(self.now(), input, event.value(), &mut *dispatch);
                            }
                        }
                    }
                    Err(e) => {
                        if !would_block(&e) {
                            native::emit(&logger, Level::Debug, &format!("Device read error: {}", e));
                            had_error = true;
                        }
                    }
                }
            }

            thread::sleep(POLL_INTERVAL);
        }

        dispatch(&RawEvent::new(self.now(), translator.mask, EventData::HookDisabled));
        StatusCode::Success
    }

    fn stop(&self) -> StatusCode {
        self.stop_requested.store(true, Ordering::SeqCst);
        StatusCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn feed(translator: &mut Translator, time: u64, input: Input, value: i32) -> Vec<RawEvent> {
        let mut out = Vec::new();
        translator.feed(time, input, value, &mut |e: &RawEvent| out.push(*e));
        out
    }

    fn kinds(events: &[RawEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn test_to_vc() {
        assert_eq!(to_vc(30), vc::A);
        assert_eq!(to_vc(42), vc::SHIFT_L);
        assert_eq!(to_vc(97), vc::CONTROL_R);
        assert_eq!(to_vc(125), vc::META_L);
        assert_eq!(to_vc(500), vc::UNDEFINED);
    }

    #[test]
    fn test_key_press_types_char() {
        let mut t = Translator::default();
        let events = feed(&mut t, 1, Input::Key(30), 1);
        assert_eq!(kinds(&events), vec![EventKind::KeyPressed, EventKind::KeyTyped]);
        assert_eq!(events[1].keyboard().unwrap().keychar, u16::from(b'a'));

        let events = feed(&mut t, 2, Input::Key(30), 0);
        assert_eq!(kinds(&events), vec![EventKind::KeyReleased]);
    }

    #[test]
    fn test_shift_tracks_mask() {
        let mut t = Translator::default();
        let events = feed(&mut t, 1, Input::Key(42), 1);
        assert_eq!(kinds(&events), vec![EventKind::KeyPressed]);
        assert_eq!(events[0].mask & mask::SHIFT_L, mask::SHIFT_L);

        let events = feed(&mut t, 2, Input::Key(30), 1);
        assert_eq!(events[1].keyboard().unwrap().keychar, u16::from(b'A'));

        feed(&mut t, 3, Input::Key(42), 0);
        assert_eq!(t.mask & mask::SHIFT, 0);
    }

    #[test]
    fn test_move_and_drag() {
        let mut t = Translator::default();
        let events = feed(&mut t, 1, Input::MoveX, 10);
        assert_eq!(kinds(&events), vec![EventKind::MouseMoved]);
        assert_eq!(events[0].mouse().unwrap().x, 10);

        feed(&mut t, 2, Input::Button(button::BUTTON1), 1);
        let events = feed(&mut t, 3, Input::MoveY, -4);
        assert_eq!(kinds(&events), vec![EventKind::MouseDragged]);
        assert_eq!(events[0].mask & mask::BUTTON1, mask::BUTTON1);

        // Dragged release is not a click.
        let events = feed(&mut t, 4, Input::Button(button::BUTTON1), 0);
        assert_eq!(kinds(&events), vec![EventKind::MouseReleased]);
    }

    #[test]
    fn test_click_and_double_click() {
        let mut t = Translator::default();
        feed(&mut t, 100, Input::Button(button::BUTTON1), 1);
        let events = feed(&mut t, 150, Input::Button(button::BUTTON1), 0);
        assert_eq!(kinds(&events), vec![EventKind::MouseReleased, EventKind::MouseClicked]);
        assert_eq!(events[1].mouse().unwrap().clicks, 1);

        let events = feed(&mut t, 300, Input::Button(button::BUTTON1), 1);
        assert_eq!(events[0].mouse().unwrap().clicks, 2);

        feed(&mut t, 320, Input::Button(button::BUTTON1), 0);
        let events = feed(&mut t, 2000, Input::Button(button::BUTTON1), 1);
        assert_eq!(events[0].mouse().unwrap().clicks, 1);
    }

    #[test]
    fn test_wheel() {
        let mut t = Translator::default();
        let events = feed(&mut t, 1, Input::Wheel, 1);
        let wheel = events[0].wheel().unwrap();
        assert_eq!(wheel.amount, WHEEL_AMOUNT);
        assert_eq!(wheel.rotation, -1);
        assert_eq!(wheel.direction, WHEEL_VERTICAL_DIRECTION);

        let events = feed(&mut t, 2, Input::HWheel, 1);
        assert_eq!(events[0].wheel().unwrap().direction, WHEEL_HORIZONTAL_DIRECTION);
    }

    #[test]
    fn test_stop_before_run_is_honoured() {
        let hook = EvdevHook::new();
        hook.arm();
        hook.stop();
        assert!(hook.stop_requested.load(Ordering::SeqCst));
        hook.arm();
        assert!(!hook.stop_requested.load(Ordering::SeqCst));
    }
}
