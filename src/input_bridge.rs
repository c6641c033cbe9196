//! Soft-keyboard text input adapted onto a synthetic key-event sink.
//!
//! The IME talks to [`BridgeInputConnection`] through the usual
//! text-editing operations; every operation funnels into one replace path
//! on the underlying buffer. A replacement that inserts exactly one
//! character becomes a key-down event whose scan-code field carries that
//! character's Unicode codepoint. Anything else mutates the buffer and
//! synthesizes nothing.

use crate::editable::EditBuffer;
use crate::key_event::{uptime_ms, KeyEvent};

/// A target view's key-event dispatch entry point.
pub trait KeyEventSink {
    fn dispatch_key_event(&self, event: KeyEvent);
}

/// The minimal text-editing capability set the input-method framework
/// expects from a focused editor.
pub trait InputConnection {
    fn commit_text(&mut self, text: &str, new_cursor_position: i32);
    fn set_composing_text(&mut self, text: &str, new_cursor_position: i32);
    fn finish_composing_text(&mut self);
    fn delete_surrounding_text(&mut self, before_length: usize, after_length: usize);
    fn send_key_event(&mut self, event: KeyEvent);
}

/// An [`EditBuffer`] wrapper that watches replacements on their way in.
///
/// When a replacement inserts exactly one character, the character is
/// synthesized into a key-down and dispatched to the sink before the
/// buffer mutation is applied. Multi-character and deletion edits pass
/// straight through.
pub struct TapEditable<S: KeyEventSink> {
    buffer: EditBuffer,
    sink: S,
}

impl<S: KeyEventSink> TapEditable<S> {
    pub fn new(sink: S) -> Self {
        Self {
            buffer: EditBuffer::new(),
            sink,
        }
    }

    /// Replace the buffer span `start..end` with the character slice
    /// `text_start..text_end` of `text` (character indices).
    pub fn replace_span(
        &mut self,
        start: usize,
        end: usize,
        text: &str,
        text_start: usize,
        text_end: usize,
    ) {
        if text_end.saturating_sub(text_start) == 1 && !text.is_empty() {
            if let Some(ch) = text.chars().nth(text_start) {
                self.sink
                    .dispatch_key_event(KeyEvent::synthetic_char(ch, uptime_ms()));
            }
        } else {
            log::trace!(
                "edit of {} chars skipped key synthesis",
                text_end.saturating_sub(text_start)
            );
        }

        let insert: String = text
            .chars()
            .skip(text_start)
            .take(text_end.saturating_sub(text_start))
            .collect();
        self.buffer.replace(start, end, &insert);
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }
}

/// Input connection that relays characters as key events.
///
/// Text operations route through the tap's replace path the same way the
/// platform's base connection routes them through its editable, so a
/// one-character commit or composition update produces exactly one
/// key-down, in call order. Key events from other sources are re-emitted
/// with the scan-code field normalized to the event's Unicode character.
pub struct BridgeInputConnection<S: KeyEventSink> {
    editable: TapEditable<S>,
    cursor: usize,
    composing: Option<(usize, usize)>,
}

impl<S: KeyEventSink> BridgeInputConnection<S> {
    pub fn new(sink: S) -> Self {
        Self {
            editable: TapEditable::new(sink),
            cursor: 0,
            composing: None,
        }
    }

    pub fn editable(&self) -> &EditBuffer {
        self.editable.buffer()
    }

    /// Span the next edit applies to: the composing region if one is
    /// active, otherwise the cursor position.
    fn edit_span(&self) -> (usize, usize) {
        self.composing.unwrap_or((self.cursor, self.cursor))
    }

    fn replace_edit_span(&mut self, text: &str) -> usize {
        let (start, end) = self.edit_span();
        let inserted = text.chars().count();
        self.editable.replace_span(start, end, text, 0, inserted);
        self.cursor = start + inserted;
        start
    }
}

impl<S: KeyEventSink> InputConnection for BridgeInputConnection<S> {
    fn commit_text(&mut self, text: &str, _new_cursor_position: i32) {
        self.replace_edit_span(text);
        self.composing = None;
    }

    fn set_composing_text(&mut self, text: &str, _new_cursor_position: i32) {
        let start = self.replace_edit_span(text);
        let len = text.chars().count();
        self.composing = if len == 0 { None } else { Some((start, start + len)) };
    }

    fn finish_composing_text(&mut self) {
        self.composing = None;
    }

    fn delete_surrounding_text(&mut self, before_length: usize, after_length: usize) {
        let before = before_length.min(self.cursor);
        self.editable
            .replace_span(self.cursor, self.cursor + after_length, "", 0, 0);
        self.editable
            .replace_span(self.cursor - before, self.cursor, "", 0, 0);
        self.cursor -= before;
        self.composing = None;
    }

    fn send_key_event(&mut self, event: KeyEvent) {
        self.editable
            .sink
            .dispatch_key_event(event.with_unicode_scan_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_event::{KeyAction, Keycode, MetaState, DEVICE_ID_VIRTUAL};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Rc<RefCell<Vec<KeyEvent>>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<KeyEvent> {
            self.events.borrow().clone()
        }
    }

    impl KeyEventSink for RecordingSink {
        fn dispatch_key_event(&self, event: KeyEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    fn connection() -> (BridgeInputConnection<RecordingSink>, RecordingSink) {
        let sink = RecordingSink::default();
        (BridgeInputConnection::new(sink.clone()), sink)
    }

    #[test]
    fn single_char_commit_emits_one_key_down() {
        let (mut conn, sink) = connection();
        conn.commit_text("a", 1);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, KeyAction::Down);
        assert_eq!(events[0].scan_code, 97);
        assert_eq!(events[0].device_id, DEVICE_ID_VIRTUAL);
    }

    #[test]
    fn multi_char_commit_emits_nothing_but_mutates_buffer() {
        let (mut conn, sink) = connection();
        conn.commit_text("ab", 1);

        assert!(sink.events().is_empty());
        assert_eq!(conn.editable().text(), "ab");
    }

    #[test]
    fn empty_commit_is_a_no_op_for_synthesis() {
        let (mut conn, sink) = connection();
        conn.commit_text("", 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn composition_updates_tap_per_single_char() {
        let (mut conn, sink) = connection();
        conn.set_composing_text("f", 1);
        conn.set_composing_text("fo", 1);
        conn.finish_composing_text();

        // Only the first, single-character update qualifies.
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].scan_code, 'f' as u32);
    }

    #[test]
    fn composing_region_is_replaced_not_appended() {
        let (mut conn, _sink) = connection();
        conn.set_composing_text("ab", 1);
        conn.set_composing_text("abc", 1);
        conn.commit_text("done", 1);
        assert_eq!(conn.editable().text(), "done");
    }

    #[test]
    fn delete_surrounding_emits_nothing() {
        let (mut conn, sink) = connection();
        conn.commit_text("ab", 1);
        conn.delete_surrounding_text(1, 0);

        assert!(sink.events().is_empty());
        assert_eq!(conn.editable().text(), "a");
    }

    #[test]
    fn delete_surrounding_clamps_at_buffer_start() {
        let (mut conn, _sink) = connection();
        conn.commit_text("a", 1);
        conn.delete_surrounding_text(5, 0);
        assert_eq!(conn.editable().text(), "");
    }

    #[test]
    fn forwarded_event_gets_unicode_scan_code_other_fields_kept() {
        let (mut conn, sink) = connection();
        let event = KeyEvent {
            down_time_ms: 7,
            event_time_ms: 9,
            action: KeyAction::Down,
            key_code: u32::from(Keycode::G) as i32,
            repeat_count: 2,
            meta_state: MetaState::SHIFT_ON,
            device_id: 4,
            scan_code: 34,
        };
        conn.send_key_event(event);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].scan_code, 'G' as u32);
        assert_eq!(events[0].down_time_ms, 7);
        assert_eq!(events[0].event_time_ms, 9);
        assert_eq!(events[0].key_code, event.key_code);
        assert_eq!(events[0].repeat_count, 2);
        assert_eq!(events[0].meta_state, MetaState::SHIFT_ON);
        assert_eq!(events[0].device_id, 4);
    }

    #[test]
    fn events_come_out_in_call_order() {
        let (mut conn, sink) = connection();
        conn.commit_text("a", 1);
        conn.commit_text("b", 1);
        conn.commit_text("c", 1);

        let chars: Vec<u32> = sink.events().iter().map(|e| e.scan_code).collect();
        assert_eq!(chars, vec![97, 98, 99]);
    }
}
