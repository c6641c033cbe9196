//! Activity-side orchestration: window input mode, the focus overlay, and
//! keyboard visibility requests.
//!
//! Keyboard visibility has two observable states, both owned by the host
//! framework. This layer only issues show/hide requests; it tracks
//! nothing and repeated identical requests are the framework's problem to
//! deduplicate.

use std::sync::Arc;

use bitflags::bitflags;

use crate::focus_view::{EditorInfo, FocusableView};
use crate::handler::{KeyEventQueue, MainThreadHandler};
use crate::input_bridge::BridgeInputConnection;

bitflags! {
    /// Window soft-input mode bits (`WindowManager.LayoutParams.SOFT_INPUT_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SoftInputMode: u32 {
        const STATE_HIDDEN = 0x0002;
        const ADJUST_NOTHING = 0x0030;
    }
}

/// Input-method-service capability the activity needs. Implementations
/// are bound to the activity's focus view: `show_soft_input` targets that
/// view, `hide_soft_input_from_window` uses its window token.
pub trait Ime: Send + Sync {
    fn show_soft_input(&self);
    fn hide_soft_input_from_window(&self);
}

/// The activity's window, as far as this shim cares: a soft-input mode
/// and whether the focus overlay has been attached over existing content.
#[derive(Debug, Default)]
pub struct Window {
    soft_input_mode: SoftInputMode,
    overlay_attached: bool,
}

impl Window {
    pub fn soft_input_mode(&self) -> SoftInputMode {
        self.soft_input_mode
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay_attached
    }
}

/// Native-activity host: owns the lifecycle, the full-window focus
/// overlay, and the deferred keyboard visibility requests.
pub struct HostActivity<I: Ime + 'static> {
    ime: Arc<I>,
    window: Window,
    focus_view: FocusableView<KeyEventQueue>,
    handler: MainThreadHandler,
    keys: KeyEventQueue,
}

impl<I: Ime + 'static> HostActivity<I> {
    pub fn new(ime: I) -> Self {
        let keys = KeyEventQueue::new();
        Self {
            ime: Arc::new(ime),
            window: Window::default(),
            focus_view: FocusableView::new(keys.clone()),
            handler: MainThreadHandler::new(),
            keys,
        }
    }

    /// Creation: the keyboard starts hidden and never resizes or pans the
    /// window (the native surface owns the full window), and the focus
    /// view goes in as a full-window overlay above existing content.
    pub fn on_create(&mut self) {
        self.window.soft_input_mode = SoftInputMode::STATE_HIDDEN | SoftInputMode::ADJUST_NOTHING;
        self.window.overlay_attached = true;
        log::debug!("activity created, focus overlay attached");
    }

    /// Focus is not reliably persisted across pause/resume, so take it
    /// back on every resume.
    pub fn on_resume(&mut self) {
        self.focus_view.request_focus();
        log::trace!("resumed, focus requested");
    }

    pub fn on_pause(&mut self) {
        log::trace!("paused");
    }

    /// After destruction, pending and future keyboard requests are
    /// dropped rather than run against a dead activity.
    pub fn on_destroy(&mut self) {
        self.handler.shutdown();
        log::debug!("activity destroyed");
    }

    /// Request the soft keyboard shown or hidden.
    ///
    /// Never synchronous, even on the UI thread: the request is posted to
    /// the main-thread queue and runs after the current input/layout pass
    /// settles. Callable from any thread.
    pub fn show_keyboard(&self, show: bool) {
        let ime = Arc::clone(&self.ime);
        log::debug!("keyboard {} requested", if show { "show" } else { "hide" });
        self.handler.post(move || {
            if show {
                ime.show_soft_input();
            } else {
                ime.hide_soft_input_from_window();
            }
        });
    }

    /// Drain deferred main-thread work; call on the UI thread.
    pub fn run_pending_tasks(&self) -> usize {
        self.handler.run_pending()
    }

    pub fn create_input_connection(
        &self,
        out_attrs: &mut EditorInfo,
    ) -> BridgeInputConnection<KeyEventQueue> {
        self.focus_view.on_create_input_connection(out_attrs)
    }

    /// The channel the native application loop drains.
    pub fn key_events(&self) -> KeyEventQueue {
        self.keys.clone()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn focus_view(&self) -> &FocusableView<KeyEventQueue> {
        &self.focus_view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicIsize, Ordering};

    /// Records show/hide calls; +1 per show, -1 per hide, last wins.
    #[derive(Default)]
    struct FakeIme {
        calls: AtomicIsize,
        visible: std::sync::Mutex<Option<bool>>,
    }

    impl Ime for Arc<FakeIme> {
        fn show_soft_input(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.visible.lock().unwrap() = Some(true);
        }

        fn hide_soft_input_from_window(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.visible.lock().unwrap() = Some(false);
        }
    }

    fn activity() -> (HostActivity<Arc<FakeIme>>, Arc<FakeIme>) {
        let ime = Arc::new(FakeIme::default());
        (HostActivity::new(Arc::clone(&ime)), ime)
    }

    #[test]
    fn create_hides_keyboard_and_never_resizes_window() {
        let (mut host, _ime) = activity();
        host.on_create();

        let mode = host.window().soft_input_mode();
        assert!(mode.contains(SoftInputMode::STATE_HIDDEN));
        assert!(mode.contains(SoftInputMode::ADJUST_NOTHING));
        assert!(host.window().has_overlay());
    }

    #[test]
    fn overlay_is_a_text_editor_focusable_in_touch_mode() {
        let (mut host, _ime) = activity();
        host.on_create();

        assert!(host.focus_view().is_focusable_in_touch_mode());
        assert!(host.focus_view().on_check_is_text_editor());
    }

    #[test]
    fn resume_takes_focus() {
        let (mut host, _ime) = activity();
        host.on_create();
        assert!(!host.focus_view().is_focused());

        host.on_resume();
        assert!(host.focus_view().is_focused());
    }

    #[test]
    fn show_keyboard_is_deferred_until_drain() {
        let (mut host, ime) = activity();
        host.on_create();

        host.show_keyboard(true);
        assert_eq!(ime.calls.load(Ordering::SeqCst), 0);

        assert_eq!(host.run_pending_tasks(), 1);
        assert_eq!(ime.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*ime.visible.lock().unwrap(), Some(true));
    }

    #[test]
    fn hide_request_reaches_the_ime() {
        let (mut host, ime) = activity();
        host.on_create();

        host.show_keyboard(false);
        host.run_pending_tasks();
        assert_eq!(*ime.visible.lock().unwrap(), Some(false));
    }

    #[test]
    fn requests_run_in_call_order() {
        let (mut host, ime) = activity();
        host.on_create();

        host.show_keyboard(true);
        host.show_keyboard(false);
        host.run_pending_tasks();
        assert_eq!(ime.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*ime.visible.lock().unwrap(), Some(false));
    }

    #[test]
    fn requests_after_destroy_are_dropped() {
        let (mut host, ime) = activity();
        host.on_create();
        host.on_destroy();

        host.show_keyboard(true);
        assert_eq!(host.run_pending_tasks(), 0);
        assert_eq!(ime.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn typed_characters_reach_the_key_channel() {
        use crate::input_bridge::InputConnection;

        let (mut host, _ime) = activity();
        host.on_create();
        host.on_resume();

        let mut info = EditorInfo::default();
        let mut conn = host.create_input_connection(&mut info);
        conn.commit_text("h", 1);
        conn.commit_text("i", 1);

        let keys = host.key_events();
        assert_eq!(keys.poll().unwrap().scan_code, 'h' as u32);
        assert_eq!(keys.poll().unwrap().scan_code, 'i' as u32);
        assert!(keys.poll().is_none());
    }
}
