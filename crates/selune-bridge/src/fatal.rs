//! Fatal-error hook.
//!
//! When the engine raises an error with no protected call to catch it, it
//! calls its panic function and then aborts the process. The hook installed
//! here only sees the diagnostic; nothing returns to the host afterwards.
//!
//! The hook is process-wide. Installing one replaces the previous hook for
//! every VM instance. Without a hook the message goes to `tracing` under the
//! `selune::fatal` target.

use crate::raw;
use mlua_sys as ffi;
use selune_bridge_core::TypeTag;
use std::ffi::c_int;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::error;

/// Receives the engine's diagnostic payload for an unrecoverable fault.
pub type FatalHook = Arc<dyn Fn(&str) + Send + Sync>;

static HOOK: RwLock<Option<FatalHook>> = RwLock::new(None);

/// Install `hook`, returning the one it replaces.
pub fn install(hook: FatalHook) -> Option<FatalHook> {
    let mut slot = HOOK.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.replace(hook)
}

/// Remove the installed hook, falling back to the logging default.
pub fn reset() -> Option<FatalHook> {
    let mut slot = HOOK.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.take()
}

pub fn is_installed() -> bool {
    HOOK.read()
        .map(|slot| slot.is_some())
        .unwrap_or(false)
}

/// Deliver `message` to the installed hook, or log it.
pub(crate) fn report(message: &str) {
    let hook = HOOK
        .read()
        .ok()
        .and_then(|slot| slot.clone());
    match hook {
        Some(hook) => {
            if catch_unwind(AssertUnwindSafe(|| hook(message))).is_err() {
                error!(target: "selune::fatal", %message, "fatal hook panicked");
            }
        }
        None => error!(target: "selune::fatal", %message, "unprotected error in interpreter"),
    }
}

/// Panic function registered with every state.
pub(crate) unsafe extern "C-unwind" fn on_panic(state: *mut ffi::lua_State) -> c_int {
    let message = if ffi::lua_gettop(state) > 0 && raw::type_at(state, -1) == TypeTag::String {
        String::from_utf8_lossy(&raw::string_bytes(state, -1)).into_owned()
    } else {
        "error object is not a string".to_string()
    };
    report(&message);
    0
}
