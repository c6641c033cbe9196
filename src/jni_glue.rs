//! JNI boundary with the embedding activity.
//!
//! Downcalls arrive from `keywire.app.KeywireActivity`: lifecycle,
//! main-queue drains, and the thin Java `InputConnection` forwarding its
//! text-editing calls here. Upcalls go the other way through [`JniIme`],
//! which drives `InputMethodManager` for keyboard visibility. JNI
//! failures are logged and swallowed; nothing at this boundary is fatal.

use std::sync::Mutex;

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{jint, jlong};
use jni::{JNIEnv, JavaVM};

use crate::activity::{HostActivity, Ime, SoftInputMode};
use crate::focus_view::EditorInfo;
use crate::handler::KeyEventQueue;
use crate::input_bridge::{BridgeInputConnection, InputConnection};
use crate::key_event::{KeyAction, KeyEvent, MetaState};

/// `InputMethodManager.SHOW_IMPLICIT`
const SHOW_IMPLICIT: jint = 1;

struct Bridge {
    activity: HostActivity<JniIme>,
    connection: Option<BridgeInputConnection<KeyEventQueue>>,
}

// One activity instance per process, the platform's native-activity model.
static BRIDGE: Mutex<Option<Bridge>> = Mutex::new(None);

fn with_bridge<R>(f: impl FnOnce(&mut Bridge) -> R) -> Option<R> {
    let mut guard = BRIDGE.lock().unwrap_or_else(|e| e.into_inner());
    guard.as_mut().map(f)
}

/// Show or hide the keyboard on behalf of the native application layer.
pub(crate) fn show_keyboard_request(show: bool) {
    if with_bridge(|bridge| bridge.activity.show_keyboard(show)).is_none() {
        log::debug!("keyboard request before activity creation, dropped");
    }
}

/// Next bridged key event for the native application layer.
pub(crate) fn poll_key_event() -> Option<KeyEvent> {
    with_bridge(|bridge| bridge.activity.key_events().poll()).flatten()
}

#[cfg(target_os = "android")]
fn init_logging() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("keywire"),
    );
}

#[cfg(not(target_os = "android"))]
fn init_logging() {}

/// `InputMethodManager` bound to the activity's focus view, reachable
/// from any thread through the cached `JavaVM`.
pub struct JniIme {
    vm: JavaVM,
    imm: GlobalRef,
    view: GlobalRef,
}

impl JniIme {
    pub fn new(
        env: &mut JNIEnv<'_>,
        activity: &JObject<'_>,
        focus_view: &JObject<'_>,
    ) -> jni::errors::Result<Self> {
        let service_name = env.new_string("input_method")?;
        let imm = env
            .call_method(
                activity,
                "getSystemService",
                "(Ljava/lang/String;)Ljava/lang/Object;",
                &[JValue::Object(&service_name)],
            )?
            .l()?;
        Ok(Self {
            vm: env.get_java_vm()?,
            imm: env.new_global_ref(imm)?,
            view: env.new_global_ref(focus_view)?,
        })
    }

    fn show(&self, env: &mut JNIEnv<'_>) -> jni::errors::Result<()> {
        env.call_method(
            self.imm.as_obj(),
            "showSoftInput",
            "(Landroid/view/View;I)Z",
            &[
                JValue::Object(self.view.as_obj()),
                JValue::Int(SHOW_IMPLICIT),
            ],
        )?;
        Ok(())
    }

    fn hide(&self, env: &mut JNIEnv<'_>) -> jni::errors::Result<()> {
        let token = env
            .call_method(self.view.as_obj(), "getWindowToken", "()Landroid/os/IBinder;", &[])?
            .l()?;
        env.call_method(
            self.imm.as_obj(),
            "hideSoftInputFromWindow",
            "(Landroid/os/IBinder;I)Z",
            &[JValue::Object(&token), JValue::Int(0)],
        )?;
        Ok(())
    }

    fn with_env(&self, what: &str, f: impl FnOnce(&mut JNIEnv<'_>) -> jni::errors::Result<()>) {
        match self.vm.attach_current_thread() {
            Ok(mut env) => {
                if let Err(e) = f(&mut env) {
                    log::error!("{what} failed: {e}");
                }
            }
            Err(e) => log::error!("JVM attach for {what} failed: {e}"),
        }
    }
}

impl Ime for JniIme {
    fn show_soft_input(&self) {
        self.with_env("showSoftInput", |env| self.show(env));
    }

    fn hide_soft_input_from_window(&self) {
        self.with_env("hideSoftInputFromWindow", |env| self.hide(env));
    }
}

fn apply_soft_input_mode(
    env: &mut JNIEnv<'_>,
    activity: &JObject<'_>,
    mode: SoftInputMode,
) -> jni::errors::Result<()> {
    let window = env
        .call_method(activity, "getWindow", "()Landroid/view/Window;", &[])?
        .l()?;
    env.call_method(
        &window,
        "setSoftInputMode",
        "(I)V",
        &[JValue::Int(mode.bits() as jint)],
    )?;
    Ok(())
}

// ── Lifecycle downcalls ─────────────────────────────────────────

#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeOnCreate(
    mut env: JNIEnv,
    _class: JClass,
    activity: JObject,
    focus_view: JObject,
) {
    init_logging();

    let ime = match JniIme::new(&mut env, &activity, &focus_view) {
        Ok(ime) => ime,
        Err(e) => {
            log::error!("input-method service lookup failed: {e}");
            return;
        }
    };

    let mut host = HostActivity::new(ime);
    host.on_create();
    if let Err(e) = apply_soft_input_mode(&mut env, &activity, host.window().soft_input_mode()) {
        log::error!("setSoftInputMode failed: {e}");
    }

    let mut guard = BRIDGE.lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(Bridge {
        activity: host,
        connection: None,
    });
}

#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeOnResume(
    _env: JNIEnv,
    _class: JClass,
) {
    with_bridge(|bridge| bridge.activity.on_resume());
}

#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeOnPause(
    _env: JNIEnv,
    _class: JClass,
) {
    with_bridge(|bridge| bridge.activity.on_pause());
}

#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeOnDestroy(
    _env: JNIEnv,
    _class: JClass,
) {
    with_bridge(|bridge| bridge.activity.on_destroy());
    let mut guard = BRIDGE.lock().unwrap_or_else(|e| e.into_inner());
    *guard = None;
}

/// Drain deferred main-thread work; the activity calls this from its UI
/// thread handler. Returns how many tasks ran.
#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeRunMainQueue(
    _env: JNIEnv,
    _class: JClass,
) -> jint {
    with_bridge(|bridge| bridge.activity.run_pending_tasks() as jint).unwrap_or(0)
}

// ── Input-connection downcalls ──────────────────────────────────

/// Called from `onCreateInputConnection`; installs a fresh bridging
/// connection and returns the IME option bits for `outAttrs.imeOptions`.
#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeCreateInputConnection(
    _env: JNIEnv,
    _class: JClass,
) -> jint {
    with_bridge(|bridge| {
        let mut info = EditorInfo::default();
        bridge.connection = Some(bridge.activity.create_input_connection(&mut info));
        info.ime_options.bits() as jint
    })
    .unwrap_or(0)
}

fn with_connection(f: impl FnOnce(&mut BridgeInputConnection<KeyEventQueue>)) {
    let routed = with_bridge(|bridge| match bridge.connection.as_mut() {
        Some(connection) => {
            f(connection);
            true
        }
        None => false,
    });
    if routed != Some(true) {
        log::debug!("IME call with no active input connection, dropped");
    }
}

#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeCommitText(
    mut env: JNIEnv,
    _class: JClass,
    text: JString,
    new_cursor_position: jint,
) {
    let text: String = env.get_string(&text).map(|s| s.into()).unwrap_or_default();
    with_connection(|connection| connection.commit_text(&text, new_cursor_position));
}

#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeSetComposingText(
    mut env: JNIEnv,
    _class: JClass,
    text: JString,
    new_cursor_position: jint,
) {
    let text: String = env.get_string(&text).map(|s| s.into()).unwrap_or_default();
    with_connection(|connection| connection.set_composing_text(&text, new_cursor_position));
}

#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeFinishComposingText(
    _env: JNIEnv,
    _class: JClass,
) {
    with_connection(|connection| connection.finish_composing_text());
}

#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeDeleteSurroundingText(
    _env: JNIEnv,
    _class: JClass,
    before_length: jint,
    after_length: jint,
) {
    let before = before_length.max(0) as usize;
    let after = after_length.max(0) as usize;
    with_connection(|connection| connection.delete_surrounding_text(before, after));
}

/// Key events from the IME action row or a physical keyboard, in the
/// platform's field order. They re-emerge on the key channel with the
/// scan-code field normalized to the event's Unicode character.
#[no_mangle]
pub extern "system" fn Java_keywire_app_KeywireActivity_nativeSendKeyEvent(
    _env: JNIEnv,
    _class: JClass,
    down_time_ms: jlong,
    event_time_ms: jlong,
    action: jint,
    key_code: jint,
    repeat_count: jint,
    meta_state: jint,
    device_id: jint,
    scan_code: jint,
) {
    let action = KeyAction::try_from(action).unwrap_or(KeyAction::Down);
    let event = KeyEvent {
        down_time_ms,
        event_time_ms,
        action,
        key_code,
        repeat_count,
        meta_state: MetaState::from_bits_truncate(meta_state as u32),
        device_id,
        scan_code: scan_code.max(0) as u32,
    };
    with_connection(|connection| connection.send_key_event(event));
}
