//! Key-event values crossing the native dispatch boundary.
//!
//! Events delivered to the native layer repurpose the scan-code field to
//! carry a Unicode codepoint instead of a hardware scan code. The receiving
//! side decodes it symmetrically, so the field layout and that convention
//! are a fixed wire contract.

use std::sync::OnceLock;
use std::time::Instant;

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Device id used for events synthesized from soft-keyboard text
/// (`KeyCharacterMap.VIRTUAL_KEYBOARD`).
pub const DEVICE_ID_VIRTUAL: i32 = -1;

/// Key-event action (`KeyEvent.ACTION_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum KeyAction {
    Down = 0,
    Up = 1,
    Multiple = 2,
}

bitflags! {
    /// Meta-key state bits (`KeyEvent.META_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MetaState: u32 {
        const SHIFT_ON = 0x0000_0001;
        const ALT_ON = 0x0000_0002;
        const SYM_ON = 0x0000_0004;
        const CTRL_ON = 0x0000_1000;
        const META_ON = 0x0001_0000;
    }
}

/// The platform key codes a soft or hardware keyboard commonly emits
/// (`KeyEvent.KEYCODE_*`). Anything else resolves to no character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum Keycode {
    Unknown = 0,
    Num0 = 7,
    Num1 = 8,
    Num2 = 9,
    Num3 = 10,
    Num4 = 11,
    Num5 = 12,
    Num6 = 13,
    Num7 = 14,
    Num8 = 15,
    Num9 = 16,
    A = 29,
    B = 30,
    C = 31,
    D = 32,
    E = 33,
    F = 34,
    G = 35,
    H = 36,
    I = 37,
    J = 38,
    K = 39,
    L = 40,
    M = 41,
    N = 42,
    O = 43,
    P = 44,
    Q = 45,
    R = 46,
    S = 47,
    T = 48,
    U = 49,
    V = 50,
    W = 51,
    X = 52,
    Y = 53,
    Z = 54,
    Comma = 55,
    Period = 56,
    Tab = 61,
    Space = 62,
    Enter = 66,
    Del = 67,
    Grave = 68,
    Minus = 69,
    Equals = 70,
    LeftBracket = 71,
    RightBracket = 72,
    Backslash = 73,
    Semicolon = 74,
    Apostrophe = 75,
    Slash = 76,
}

impl Keycode {
    /// Printable character for this key code under the given shift state,
    /// or `None` when the key produces no character.
    fn resolve(self, shifted: bool) -> Option<char> {
        let v = u32::from(self);

        let a = u32::from(Keycode::A);
        if (a..=u32::from(Keycode::Z)).contains(&v) {
            let ch = (b'a' + (v - a) as u8) as char;
            return Some(if shifted { ch.to_ascii_uppercase() } else { ch });
        }

        let zero = u32::from(Keycode::Num0);
        if (zero..=u32::from(Keycode::Num9)).contains(&v) {
            let digit = (v - zero) as usize;
            return if shifted {
                // US layout symbol row
                Some(b")!@#$%^&*("[digit] as char)
            } else {
                Some((b'0' + digit as u8) as char)
            };
        }

        let pair = |plain, shift| Some(if shifted { shift } else { plain });
        match self {
            Keycode::Comma => pair(',', '<'),
            Keycode::Period => pair('.', '>'),
            Keycode::Grave => pair('`', '~'),
            Keycode::Minus => pair('-', '_'),
            Keycode::Equals => pair('=', '+'),
            Keycode::LeftBracket => pair('[', '{'),
            Keycode::RightBracket => pair(']', '}'),
            Keycode::Backslash => pair('\\', '|'),
            Keycode::Semicolon => pair(';', ':'),
            Keycode::Apostrophe => pair('\'', '"'),
            Keycode::Slash => pair('/', '?'),
            Keycode::Space => Some(' '),
            Keycode::Tab => Some('\t'),
            Keycode::Enter => Some('\n'),
            _ => None,
        }
    }
}

/// An immutable key event in the platform's field layout.
///
/// `scan_code` carries a Unicode codepoint, not a hardware scan code, once
/// an event has passed through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub down_time_ms: i64,
    pub event_time_ms: i64,
    pub action: KeyAction,
    pub key_code: i32,
    pub repeat_count: i32,
    pub meta_state: MetaState,
    pub device_id: i32,
    pub scan_code: u32,
}

impl KeyEvent {
    /// A key-down synthesized from a single soft-keyboard character. The
    /// character's codepoint goes into the scan-code field.
    pub fn synthetic_char(ch: char, now_ms: i64) -> Self {
        Self {
            down_time_ms: now_ms,
            event_time_ms: now_ms,
            action: KeyAction::Down,
            key_code: 0,
            repeat_count: 0,
            meta_state: MetaState::empty(),
            device_id: DEVICE_ID_VIRTUAL,
            scan_code: ch as u32,
        }
    }

    /// Resolved Unicode codepoint for this event, or 0 when the event has
    /// no printable character.
    ///
    /// Synthetic events already carry their codepoint in the scan-code
    /// field; hardware events resolve through the key-code table.
    pub fn unicode_char(&self) -> u32 {
        if self.device_id == DEVICE_ID_VIRTUAL {
            return self.scan_code;
        }
        let shifted = self.meta_state.intersects(MetaState::SHIFT_ON);
        u32::try_from(self.key_code)
            .ok()
            .and_then(|v| Keycode::try_from(v).ok())
            .and_then(|code| code.resolve(shifted))
            .map_or(0, |ch| ch as u32)
    }

    /// The same event with the scan-code field overwritten by the resolved
    /// Unicode character. Every other field is preserved.
    pub fn with_unicode_scan_code(&self) -> Self {
        Self {
            scan_code: self.unicode_char(),
            ..*self
        }
    }
}

/// Milliseconds of monotonic time since the process first asked, standing
/// in for `SystemClock.uptimeMillis` on event timestamps.
pub(crate) fn uptime_ms() -> i64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_millis() as i64
}
