//! Raw events delivered by the native hook.

/// Event kinds with their stable numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventKind {
    HookEnabled = 1,
    HookDisabled = 2,
    KeyTyped = 3,
    KeyPressed = 4,
    KeyReleased = 5,
    MouseClicked = 6,
    MousePressed = 7,
    MouseReleased = 8,
    MouseMoved = 9,
    MouseDragged = 10,
    MouseWheel = 11,
}

impl EventKind {
    /// Numeric code of this kind.
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::HookEnabled => "HookEnabled",
            EventKind::HookDisabled => "HookDisabled",
            EventKind::KeyTyped => "KeyTyped",
            EventKind::KeyPressed => "KeyPressed",
            EventKind::KeyReleased => "KeyReleased",
            EventKind::MouseClicked => "MouseClicked",
            EventKind::MousePressed => "MousePressed",
            EventKind::MouseReleased => "MouseReleased",
            EventKind::MouseMoved => "MouseMoved",
            EventKind::MouseDragged => "MouseDragged",
            EventKind::MouseWheel => "MouseWheel",
        };
        write!(f, "{}", name)
    }
}

/// Keyboard payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardData {
    /// Virtual keycode, see [`crate::key::vc`].
    pub keycode: u16,
    /// Platform scancode as reported by the backend.
    pub rawcode: u16,
    /// UTF-16 unit typed. Only meaningful for [`EventData::KeyTyped`].
    pub keychar: u16,
}

/// Mouse button and pointer payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseData {
    pub button: u16,
    pub clicks: u16,
    pub x: i16,
    pub y: i16,
}

/// Scroll wheel payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelData {
    pub amount: u16,
    pub clicks: u16,
    pub direction: i16,
    pub rotation: i16,
    pub scroll_type: u8,
    pub x: i16,
    pub y: i16,
}

/// Unit scroll (lines).
pub const WHEEL_UNIT_SCROLL: u8 = 1;
/// Block scroll (pages).
pub const WHEEL_BLOCK_SCROLL: u8 = 2;
pub const WHEEL_VERTICAL_DIRECTION: i16 = 3;
pub const WHEEL_HORIZONTAL_DIRECTION: i16 = 4;

/// Kind and payload. The payload lives inside the variant so it can only be
/// read for the kind it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventData {
    HookEnabled,
    HookDisabled,
    KeyTyped(KeyboardData),
    KeyPressed(KeyboardData),
    KeyReleased(KeyboardData),
    MouseClicked(MouseData),
    MousePressed(MouseData),
    MouseReleased(MouseData),
    MouseMoved(MouseData),
    MouseDragged(MouseData),
    MouseWheel(WheelData),
}

/// One captured input occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Milliseconds at capture.
    pub time: u64,
    /// Active modifiers and buttons, see [`crate::key::mask`].
    pub mask: u16,
    pub data: EventData,
}

impl RawEvent {
    pub fn new(time: u64, mask: u16, data: EventData) -> Self {
        Self { time, mask, data }
    }

    pub fn kind(&self) -> EventKind {
        match self.data {
            EventData::HookEnabled => EventKind::HookEnabled,
            EventData::HookDisabled => EventKind::HookDisabled,
            EventData::KeyTyped(_) => EventKind::KeyTyped,
            EventData::KeyPressed(_) => EventKind::KeyPressed,
            EventData::KeyReleased(_) => EventKind::KeyReleased,
            EventData::MouseClicked(_) => EventKind::MouseClicked,
            EventData::MousePressed(_) => EventKind::MousePressed,
            EventData::MouseReleased(_) => EventKind::MouseReleased,
            EventData::MouseMoved(_) => EventKind::MouseMoved,
            EventData::MouseDragged(_) => EventKind::MouseDragged,
            EventData::MouseWheel(_) => EventKind::MouseWheel,
        }
    }

    /// Hook enabled/disabled notifications carry no input data.
    pub fn is_hook_status(&self) -> bool {
        matches!(self.data, EventData::HookEnabled | EventData::HookDisabled)
    }

    pub fn keyboard(&self) -> Option<&KeyboardData> {
        match &self.data {
            EventData::KeyTyped(k) | EventData::KeyPressed(k) | EventData::KeyReleased(k) => {
                Some(k)
            }
            _ => None,
        }
    }

    pub fn mouse(&self) -> Option<&MouseData> {
        match &self.data {
            EventData::MouseClicked(m)
            | EventData::MousePressed(m)
            | EventData::MouseReleased(m)
            | EventData::MouseMoved(m)
            | EventData::MouseDragged(m) => Some(m),
            _ => None,
        }
    }

    pub fn wheel(&self) -> Option<&WheelData> {
        match &self.data {
            EventData::MouseWheel(w) => Some(w),
            _ => None,
        }
    }

    /// Keycode for keyboard events, 0 otherwise. Used in debug log lines.
    pub(crate) fn keycode(&self) -> u16 {
        self.keyboard().map(|k| k.keycode).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        assert_eq!(EventKind::HookEnabled.code(), 1);
        assert_eq!(EventKind::KeyTyped.code(), 3);
        assert_eq!(EventKind::MouseWheel.code(), 11);
    }

    #[test]
    fn test_payload_follows_kind() {
        let key = RawEvent::new(
            5,
            0,
            EventData::KeyPressed(KeyboardData {
                keycode: 0x1E,
                rawcode: 30,
                keychar: 0,
            }),
        );
        assert_eq!(key.kind(), EventKind::KeyPressed);
        assert!(key.keyboard().is_some());
        assert!(key.mouse().is_none());
        assert!(key.wheel().is_none());

        let wheel = RawEvent::new(6, 0, EventData::MouseWheel(WheelData::default()));
        assert!(wheel.wheel().is_some());
        assert!(wheel.keyboard().is_none());
        assert_eq!(wheel.keycode(), 0);
    }

    #[test]
    fn test_hook_status() {
        assert!(RawEvent::new(0, 0, EventData::HookEnabled).is_hook_status());
        assert!(RawEvent::new(0, 0, EventData::HookDisabled).is_hook_status());
        assert!(!RawEvent::new(0, 0, EventData::MouseMoved(MouseData::default())).is_hook_status());
    }
}
