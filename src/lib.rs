//! Android soft-keyboard bridge for native event-loop apps.
//!
//! A native application that renders its own surface has no text widget
//! for the platform IME to edit. This crate gives the embedding activity
//! a focusable, zero-content overlay that declares itself a text editor,
//! then relays every soft-keyboard character as a synthetic key-down on a
//! single key-event channel the native loop polls. The character's
//! Unicode codepoint travels in the event's scan-code field; the native
//! side decodes it the same way.
//!
//! Built as `cdylib` for the activity's JNI downcalls (see
//! [`jni_glue`]) and `rlib`/C ABI for the native application layer
//! (below).

mod activity;
mod editable;
mod focus_view;
mod handler;
mod input_bridge;
pub mod jni_glue;
mod key_event;

pub use activity::{HostActivity, Ime, SoftInputMode, Window};
pub use editable::EditBuffer;
pub use focus_view::{EditorInfo, FocusableView, ImeOptions};
pub use handler::{KeyEventQueue, MainThreadHandler};
pub use input_bridge::{BridgeInputConnection, InputConnection, KeyEventSink, TapEditable};
pub use key_event::{KeyAction, KeyEvent, Keycode, MetaState, DEVICE_ID_VIRTUAL};

use libc::c_int;

// === FFI Contract (native application layer) ===

/// C-layout projection of [`KeyEvent`].
///
/// `scan_code` carries a Unicode codepoint, not a hardware scan code.
#[repr(C)]
pub struct RawKeyEvent {
    pub down_time_ms: i64,
    pub event_time_ms: i64,
    pub action: i32,
    pub key_code: i32,
    pub repeat_count: i32,
    pub meta_state: u32,
    pub device_id: i32,
    pub scan_code: u32,
}

impl From<KeyEvent> for RawKeyEvent {
    fn from(event: KeyEvent) -> Self {
        Self {
            down_time_ms: event.down_time_ms,
            event_time_ms: event.event_time_ms,
            action: event.action.into(),
            key_code: event.key_code,
            repeat_count: event.repeat_count,
            meta_state: event.meta_state.bits(),
            device_id: event.device_id,
            scan_code: event.scan_code,
        }
    }
}

/// Ask the activity to show (`show != 0`) or hide the soft keyboard.
///
/// Callable from any thread; the request is deferred onto the activity's
/// UI-thread queue and dropped if the activity is gone.
#[no_mangle]
pub extern "C" fn keywire_show_keyboard(show: c_int) {
    jni_glue::show_keyboard_request(show != 0);
}

/// Pop the next bridged key event into `out`. Returns 1 when an event was
/// written, 0 when the queue is empty or `out` is null.
#[no_mangle]
pub extern "C" fn keywire_poll_key_event(out: *mut RawKeyEvent) -> c_int {
    if out.is_null() {
        return 0;
    }
    match jni_glue::poll_key_event() {
        Some(event) => {
            unsafe { out.write(RawKeyEvent::from(event)) };
            1
        }
        None => 0,
    }
}
