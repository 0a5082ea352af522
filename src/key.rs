//! Virtual keycodes and modifier masks.
//!
//! Keycodes follow scancode set 1, with `0x0E` prefixed to the extended
//! (right-hand and navigation) keys. This matches the numbering used by
//! libuiohook, so hosts written against it see the same values.

/// Virtual keycode constants.
pub mod vc {
    pub const UNDEFINED: u16 = 0x0000;

    pub const ESCAPE: u16 = 0x0001;
    pub const NUM_1: u16 = 0x0002;
    pub const NUM_2: u16 = 0x0003;
    pub const NUM_3: u16 = 0x0004;
    pub const NUM_4: u16 = 0x0005;
    pub const NUM_5: u16 = 0x0006;
    pub const NUM_6: u16 = 0x0007;
    pub const NUM_7: u16 = 0x0008;
    pub const NUM_8: u16 = 0x0009;
    pub const NUM_9: u16 = 0x000A;
    pub const NUM_0: u16 = 0x000B;
    pub const MINUS: u16 = 0x000C;
    pub const EQUALS: u16 = 0x000D;
    pub const BACKSPACE: u16 = 0x000E;
    pub const TAB: u16 = 0x000F;

    pub const Q: u16 = 0x0010;
    pub const W: u16 = 0x0011;
    pub const E: u16 = 0x0012;
    pub const R: u16 = 0x0013;
    pub const T: u16 = 0x0014;
    pub const Y: u16 = 0x0015;
    pub const U: u16 = 0x0016;
    pub const I: u16 = 0x0017;
    pub const O: u16 = 0x0018;
    pub const P: u16 = 0x0019;
    pub const OPEN_BRACKET: u16 = 0x001A;
    pub const CLOSE_BRACKET: u16 = 0x001B;
    pub const ENTER: u16 = 0x001C;
    pub const CONTROL_L: u16 = 0x001D;
    pub const A: u16 = 0x001E;
    pub const S: u16 = 0x001F;
    pub const D: u16 = 0x0020;
    pub const F: u16 = 0x0021;
    pub const G: u16 = 0x0022;
    pub const H: u16 = 0x0023;
    pub const J: u16 = 0x0024;
    pub const K: u16 = 0x0025;
    pub const L: u16 = 0x0026;
    pub const SEMICOLON: u16 = 0x0027;
    pub const QUOTE: u16 = 0x0028;
    pub const BACKQUOTE: u16 = 0x0029;
    pub const SHIFT_L: u16 = 0x002A;
    pub const BACK_SLASH: u16 = 0x002B;
    pub const Z: u16 = 0x002C;
    pub const X: u16 = 0x002D;
    pub const C: u16 = 0x002E;
    pub const V: u16 = 0x002F;
    pub const B: u16 = 0x0030;
    pub const N: u16 = 0x0031;
    pub const M: u16 = 0x0032;
    pub const COMMA: u16 = 0x0033;
    pub const PERIOD: u16 = 0x0034;
    pub const SLASH: u16 = 0x0035;
    pub const SHIFT_R: u16 = 0x0036;
    pub const ALT_L: u16 = 0x0038;
    pub const SPACE: u16 = 0x0039;
    pub const CAPS_LOCK: u16 = 0x003A;

    pub const F1: u16 = 0x003B;
    pub const F2: u16 = 0x003C;
    pub const F3: u16 = 0x003D;
    pub const F4: u16 = 0x003E;
    pub const F5: u16 = 0x003F;
    pub const F6: u16 = 0x0040;
    pub const F7: u16 = 0x0041;
    pub const F8: u16 = 0x0042;
    pub const F9: u16 = 0x0043;
    pub const F10: u16 = 0x0044;
    pub const NUM_LOCK: u16 = 0x0045;
    pub const SCROLL_LOCK: u16 = 0x0046;
    pub const F11: u16 = 0x0057;
    pub const F12: u16 = 0x0058;

    pub const CONTROL_R: u16 = 0x0E1D;
    pub const ALT_R: u16 = 0x0E38;
    pub const HOME: u16 = 0x0E47;
    pub const UP: u16 = 0x0E48;
    pub const PAGE_UP: u16 = 0x0E49;
    pub const LEFT: u16 = 0x0E4B;
    pub const RIGHT: u16 = 0x0E4D;
    pub const END: u16 = 0x0E4F;
    pub const DOWN: u16 = 0x0E50;
    pub const PAGE_DOWN: u16 = 0x0E51;
    pub const INSERT: u16 = 0x0E52;
    pub const DELETE: u16 = 0x0E53;
    pub const META_L: u16 = 0x0E5B;
    pub const META_R: u16 = 0x0E5C;
}

/// Modifier and button bits carried in [`RawEvent::mask`](crate::RawEvent::mask).
pub mod mask {
    pub const SHIFT_L: u16 = 1 << 0;
    pub const CTRL_L: u16 = 1 << 1;
    pub const META_L: u16 = 1 << 2;
    pub const ALT_L: u16 = 1 << 3;
    pub const SHIFT_R: u16 = 1 << 4;
    pub const CTRL_R: u16 = 1 << 5;
    pub const META_R: u16 = 1 << 6;
    pub const ALT_R: u16 = 1 << 7;

    pub const SHIFT: u16 = SHIFT_L | SHIFT_R;
    pub const CTRL: u16 = CTRL_L | CTRL_R;
    pub const META: u16 = META_L | META_R;
    pub const ALT: u16 = ALT_L | ALT_R;

    pub const BUTTON1: u16 = 1 << 8;
    pub const BUTTON2: u16 = 1 << 9;
    pub const BUTTON3: u16 = 1 << 10;
    pub const BUTTON4: u16 = 1 << 11;
    pub const BUTTON5: u16 = 1 << 12;

    pub const NUM_LOCK: u16 = 1 << 13;
    pub const CAPS_LOCK: u16 = 1 << 14;
    pub const SCROLL_LOCK: u16 = 1 << 15;

    /// Mask bit for a mouse button number (1..=5). Other buttons have no bit.
    pub fn for_button(button: u16) -> u16 {
        match button {
            1 => BUTTON1,
            2 => BUTTON2,
            3 => BUTTON3,
            4 => BUTTON4,
            5 => BUTTON5,
            _ => 0,
        }
    }
}

/// Mouse button numbers.
pub mod button {
    pub const NONE: u16 = 0;
    /// Left
    pub const BUTTON1: u16 = 1;
    /// Right
    pub const BUTTON2: u16 = 2;
    /// Middle
    pub const BUTTON3: u16 = 3;
    pub const BUTTON4: u16 = 4;
    pub const BUTTON5: u16 = 5;
}

/// The modifier mask bit a keycode toggles, if it is a modifier key.
pub fn modifier_bit(keycode: u16) -> Option<u16> {
    match keycode {
        vc::SHIFT_L => Some(mask::SHIFT_L),
        vc::SHIFT_R => Some(mask::SHIFT_R),
        vc::CONTROL_L => Some(mask::CTRL_L),
        vc::CONTROL_R => Some(mask::CTRL_R),
        vc::META_L => Some(mask::META_L),
        vc::META_R => Some(mask::META_R),
        vc::ALT_L => Some(mask::ALT_L),
        vc::ALT_R => Some(mask::ALT_R),
        _ => None,
    }
}

/// Shift, ctrl, alt and meta as plain flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Flags for the key itself: set when `keycode` is that modifier key.
    pub fn from_keycode(keycode: u16) -> Self {
        Self {
            shift: matches!(keycode, vc::SHIFT_L | vc::SHIFT_R),
            ctrl: matches!(keycode, vc::CONTROL_L | vc::CONTROL_R),
            alt: matches!(keycode, vc::ALT_L | vc::ALT_R),
            meta: matches!(keycode, vc::META_L | vc::META_R),
        }
    }

    /// Flags held down at capture time, read from an event mask.
    pub fn from_mask(bits: u16) -> Self {
        Self {
            shift: bits & mask::SHIFT != 0,
            ctrl: bits & mask::CTRL != 0,
            alt: bits & mask::ALT != 0,
            meta: bits & mask::META != 0,
        }
    }
}

impl std::fmt::Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.meta {
            parts.push("Meta");
        }
        write!(f, "{}", parts.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_keycode() {
        let mods = Modifiers::from_keycode(vc::SHIFT_L);
        assert!(mods.shift);
        assert!(!mods.ctrl);
        assert!(!mods.alt);
        assert!(!mods.meta);

        assert!(Modifiers::from_keycode(vc::META_R).meta);
        assert_eq!(Modifiers::from_keycode(vc::A), Modifiers::default());
    }

    #[test]
    fn test_from_mask() {
        let mods = Modifiers::from_mask(mask::CTRL_R | mask::ALT_L | mask::BUTTON1);
        assert!(mods.ctrl);
        assert!(mods.alt);
        assert!(!mods.shift);
        assert!(!mods.meta);
    }

    #[test]
    fn test_modifier_bit() {
        assert_eq!(modifier_bit(vc::CONTROL_R), Some(mask::CTRL_R));
        assert_eq!(modifier_bit(vc::F8), None);
    }

    #[test]
    fn test_button_mask() {
        assert_eq!(mask::for_button(button::BUTTON1), mask::BUTTON1);
        assert_eq!(mask::for_button(9), 0);
    }

    #[test]
    fn test_display() {
        let mods = Modifiers {
            shift: true,
            ctrl: true,
            ..Default::default()
        };
        assert_eq!(mods.to_string(), "Ctrl+Shift");
    }
}
