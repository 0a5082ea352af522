//! Host-visible shape of an event.

use crate::event::{EventData, KeyboardData, MouseData, RawEvent, WheelData};
use crate::key::Modifiers;
use serde::Serialize;

/// Decoded event, serialized as
/// `{type, mask, time, keyboard?: {...}, mouse?: {...}, wheel?: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: u16,
    pub mask: u16,
    pub time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<KeyboardRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouse: Option<MouseRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wheel: Option<WheelRecord>,
}

/// Modifier flags describe the key itself (pressing left shift yields
/// `shift_key`); the modifiers held at capture time are in
/// [`EventRecord::mask`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardRecord {
    pub shift_key: bool,
    pub alt_key: bool,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub keycode: u16,
    pub rawcode: u16,
    /// Present for `KeyTyped` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keychar: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MouseRecord {
    pub button: u16,
    pub clicks: u16,
    pub x: i16,
    pub y: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WheelRecord {
    pub amount: u16,
    pub clicks: u16,
    pub direction: i16,
    pub rotation: i16,
    #[serde(rename = "type")]
    pub scroll_type: u8,
    pub x: i16,
    pub y: i16,
}

impl EventRecord {
    pub fn to_json(&self) -> serde_json::Value {
        // Plain integers and bools only, serialization cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn keyboard(data: &KeyboardData, typed: bool) -> KeyboardRecord {
    let mods = Modifiers::from_keycode(data.keycode);
    KeyboardRecord {
        shift_key: mods.shift,
        alt_key: mods.alt,
        ctrl_key: mods.ctrl,
        meta_key: mods.meta,
        keycode: data.keycode,
        rawcode: data.rawcode,
        keychar: typed.then_some(data.keychar),
    }
}

fn mouse(data: &MouseData) -> MouseRecord {
    MouseRecord {
        button: data.button,
        clicks: data.clicks,
        x: data.x,
        y: data.y,
    }
}

fn wheel(data: &WheelData) -> WheelRecord {
    WheelRecord {
        amount: data.amount,
        clicks: data.clicks,
        direction: data.direction,
        rotation: data.rotation,
        scroll_type: data.scroll_type,
        x: data.x,
        y: data.y,
    }
}

/// Map a raw event to its host-visible record.
pub fn decode(event: &RawEvent) -> EventRecord {
    let mut record = EventRecord {
        kind: event.kind().code(),
        mask: event.mask,
        time: event.time,
        keyboard: None,
        mouse: None,
        wheel: None,
    };

    match &event.data {
        EventData::HookEnabled | EventData::HookDisabled => {}
        EventData::KeyTyped(data) => record.keyboard = Some(keyboard(data, true)),
        EventData::KeyPressed(data) | EventData::KeyReleased(data) => {
            record.keyboard = Some(keyboard(data, false))
        }
        EventData::MouseClicked(data)
        | EventData::MousePressed(data)
        | EventData::MouseReleased(data)
        | EventData::MouseMoved(data)
        | EventData::MouseDragged(data) => record.mouse = Some(mouse(data)),
        EventData::MouseWheel(data) => record.wheel = Some(wheel(data)),
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{mask, vc};
    use serde_json::json;

    fn key_data(keycode: u16, keychar: u16) -> KeyboardData {
        KeyboardData {
            keycode,
            rawcode: keycode,
            keychar,
        }
    }

    #[test]
    fn test_shift_pressed() {
        let event = RawEvent::new(10, 0, EventData::KeyPressed(key_data(vc::SHIFT_L, 0)));
        let keyboard = decode(&event).keyboard.unwrap();
        assert!(keyboard.shift_key);
        assert!(!keyboard.alt_key);
        assert!(!keyboard.ctrl_key);
        assert!(!keyboard.meta_key);
        assert_eq!(keyboard.keycode, vc::SHIFT_L);
    }

    #[test]
    fn test_flags_ignore_mask() {
        let event = RawEvent::new(10, mask::SHIFT_L, EventData::KeyPressed(key_data(vc::A, 0)));
        let record = decode(&event);
        assert_eq!(record.mask, mask::SHIFT_L);
        assert!(!record.keyboard.unwrap().shift_key);
    }

    #[test]
    fn test_wheel() {
        let event = RawEvent::new(
            20,
            0,
            EventData::MouseWheel(WheelData {
                amount: 3,
                clicks: 1,
                direction: -1,
                rotation: -1,
                scroll_type: crate::event::WHEEL_UNIT_SCROLL,
                x: 100,
                y: 200,
            }),
        );
        let record = decode(&event);
        assert!(record.keyboard.is_none());
        assert!(record.mouse.is_none());
        let wheel = record.wheel.unwrap();
        assert_eq!(wheel.amount, 3);
        assert_eq!(wheel.direction, -1);
    }

    #[test]
    fn test_keychar_only_for_typed() {
        let typed = decode(&RawEvent::new(1, 0, EventData::KeyTyped(key_data(vc::A, 0x61))));
        assert_eq!(typed.keyboard.unwrap().keychar, Some(0x61));

        let pressed = decode(&RawEvent::new(1, 0, EventData::KeyPressed(key_data(vc::A, 0x61))));
        assert_eq!(pressed.keyboard.unwrap().keychar, None);
    }

    #[test]
    fn test_json_shape() {
        let typed = decode(&RawEvent::new(7, 0, EventData::KeyTyped(key_data(vc::A, 0x61))));
        assert_eq!(
            typed.to_json(),
            json!({
                "type": 3,
                "mask": 0,
                "time": 7,
                "keyboard": {
                    "shiftKey": false,
                    "altKey": false,
                    "ctrlKey": false,
                    "metaKey": false,
                    "keycode": vc::A,
                    "rawcode": vc::A,
                    "keychar": 0x61,
                }
            })
        );

        let pressed = decode(&RawEvent::new(7, 0, EventData::KeyPressed(key_data(vc::A, 0x61))));
        assert!(pressed.to_json()["keyboard"].get("keychar").is_none());

        let clicked = decode(&RawEvent::new(
            8,
            mask::BUTTON1,
            EventData::MouseClicked(MouseData {
                button: 1,
                clicks: 2,
                x: -5,
                y: 40,
            }),
        ));
        assert_eq!(
            clicked.to_json(),
            json!({
                "type": 6,
                "mask": mask::BUTTON1,
                "time": 8,
                "mouse": { "button": 1, "clicks": 2, "x": -5, "y": 40 }
            })
        );
    }

    #[test]
    fn test_hook_status_has_no_payload() {
        let record = decode(&RawEvent::new(0, 0, EventData::HookEnabled));
        assert_eq!(record.kind, 1);
        assert_eq!(record.to_json(), json!({"type": 1, "mask": 0, "time": 0}));
    }
}
