//! The focus-target surface the soft keyboard attaches to.
//!
//! The view draws nothing. It exists to hold input focus, to declare
//! itself a text editor so the input-method service engages at all, and to
//! hand out the bridging input connection with IME chrome suppressed
//! (no fullscreen takeover, no extracted-text strip) so the native
//! rendering underneath stays visible.

use bitflags::bitflags;

use crate::input_bridge::{BridgeInputConnection, KeyEventSink};
use crate::key_event::KeyEvent;

bitflags! {
    /// Editor IME options (`EditorInfo.IME_*`). The action value and the
    /// flag bits share one field, packed the way the platform packs them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ImeOptions: u32 {
        const ACTION_DONE = 0x0000_0006;
        const FLAG_NO_FULLSCREEN = 0x0200_0000;
        const FLAG_NO_EXTRACT_UI = 0x1000_0000;
    }
}

/// Out-parameter filled while the IME queries an input connection.
#[derive(Debug, Default)]
pub struct EditorInfo {
    pub ime_options: ImeOptions,
}

/// A zero-content view that is focusable in touch mode from construction,
/// so the soft keyboard can target it without a preceding pointer-down.
pub struct FocusableView<S: KeyEventSink + Clone> {
    sink: S,
    focusable: bool,
    focusable_in_touch_mode: bool,
    focused: bool,
}

impl<S: KeyEventSink + Clone> FocusableView<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            focusable: true,
            focusable_in_touch_mode: true,
            focused: false,
        }
    }

    pub fn request_focus(&mut self) -> bool {
        if self.focusable {
            self.focused = true;
        }
        self.focused
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    pub fn is_focusable_in_touch_mode(&self) -> bool {
        self.focusable_in_touch_mode
    }

    /// Always a text editor; this is what makes the input-method service
    /// engage with the view.
    pub fn on_check_is_text_editor(&self) -> bool {
        true
    }

    /// Produce the input connection for this view, configuring the editor
    /// to a "done" action with fullscreen IME and the extract UI
    /// suppressed.
    pub fn on_create_input_connection(
        &self,
        out_attrs: &mut EditorInfo,
    ) -> BridgeInputConnection<S> {
        out_attrs.ime_options = ImeOptions::ACTION_DONE
            | ImeOptions::FLAG_NO_FULLSCREEN
            | ImeOptions::FLAG_NO_EXTRACT_UI;
        BridgeInputConnection::new(self.sink.clone())
    }

    /// The view's event-dispatch entry point; events aimed at the view
    /// continue onto the key channel unchanged.
    pub fn dispatch_key_event(&self, event: KeyEvent) {
        self.sink.dispatch_key_event(event);
    }
}
