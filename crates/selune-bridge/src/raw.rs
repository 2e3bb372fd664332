//! Low-level helpers over the engine API.
//!
//! Every function here is `unsafe`: callers guarantee `state` is a live
//! interpreter thread with room for the slots the helper pushes.

use mlua_sys as ffi;
use selune_bridge_core::TypeTag;
use std::any::Any;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

/// Registry key under which each state stores its `VmShared` pointer.
static SHARED_KEY: u8 = 0;

pub(crate) const LOADED_TABLE: &CStr = c"_LOADED";

pub(crate) fn shared_key() -> *const c_void {
    &SHARED_KEY as *const u8 as *const c_void
}

#[inline]
pub(crate) unsafe fn type_at(state: *mut ffi::lua_State, index: c_int) -> TypeTag {
    TypeTag::from_code(ffi::lua_type(state, index))
}

pub(crate) unsafe fn push_bytes(state: *mut ffi::lua_State, bytes: &[u8]) {
    ffi::lua_pushlstring(state, bytes.as_ptr() as *const c_char, bytes.len());
}

/// Copy the bytes of the string at `index`. The slot must hold a string.
pub(crate) unsafe fn string_bytes(state: *mut ffi::lua_State, index: c_int) -> Vec<u8> {
    let mut len = 0usize;
    let data = ffi::lua_tolstring(state, index, &mut len);
    if data.is_null() {
        return Vec::new();
    }
    std::slice::from_raw_parts(data as *const u8, len).to_vec()
}

/// The engine's raw printed form of a non-primitive slot, `"<kind>: 0x<addr>"`.
///
/// Mirrors the default string conversion without running `__tostring`, so it
/// can never raise. Userdata that declare `__name` print under that name.
/// Needs two free slots.
pub(crate) unsafe fn display_name(
    state: *mut ffi::lua_State,
    index: c_int,
    tag: TypeTag,
) -> String {
    let mut kind = tag.name().to_string();
    if tag == TypeTag::Userdata {
        let field = ffi::luaL_getmetafield(state, index, c"__name".as_ptr());
        if field != ffi::LUA_TNIL {
            if field == ffi::LUA_TSTRING {
                kind = String::from_utf8_lossy(&string_bytes(state, -1)).into_owned();
            }
            ffi::lua_pop(state, 1);
        }
    }
    format!("{kind}: {:p}", ffi::lua_topointer(state, index))
}

/// Describe whatever occupies `index` for diagnostics and handle checks.
pub(crate) unsafe fn describe(state: *mut ffi::lua_State, index: c_int) -> (TypeTag, String) {
    let tag = type_at(state, index);
    let text = match tag {
        TypeTag::Table
        | TypeTag::Function
        | TypeTag::Userdata
        | TypeTag::LightUserdata
        | TypeTag::Thread => display_name(state, index, tag),
        other => other.name().to_string(),
    };
    (tag, text)
}

/// Pop the value on top and turn it into error text.
pub(crate) unsafe fn pop_error_text(state: *mut ffi::lua_State) -> String {
    if ffi::lua_gettop(state) == 0 {
        return "no error value".to_string();
    }
    let text = match type_at(state, -1) {
        TypeTag::String | TypeTag::Number => {
            let mut len = 0usize;
            let data = ffi::lua_tolstring(state, -1, &mut len);
            String::from_utf8_lossy(std::slice::from_raw_parts(data as *const u8, len)).into_owned()
        }
        TypeTag::Nil => "nil".to_string(),
        TypeTag::Boolean => (ffi::lua_toboolean(state, -1) != 0).to_string(),
        _ => {
            ffi::lua_checkstack(state, 2);
            let (tag, name) = describe(state, -1);
            format!("(error object is a {tag} value: {name})")
        }
    };
    ffi::lua_pop(state, 1);
    text
}

/// Push a full userdata owning `value`, with a metatable named `meta` whose
/// `__gc` drops it. Needs three free slots: the userdata, its metatable and
/// the `__gc` function.
///
/// The payload is stored as `Option<T>` so a collector call can only drop it once.
pub(crate) unsafe fn push_userdata<T: 'static>(state: *mut ffi::lua_State, value: T, meta: &CStr) {
    let slot = ffi::lua_newuserdatauv(state, std::mem::size_of::<Option<T>>(), 0) as *mut Option<T>;
    ptr::write(slot, Some(value));
    if ffi::luaL_newmetatable(state, meta.as_ptr()) != 0 {
        ffi::lua_pushcfunction(state, collect_userdata::<T>);
        ffi::lua_setfield(state, -2, c"__gc".as_ptr());
        ffi::lua_pushboolean(state, 0);
        ffi::lua_setfield(state, -2, c"__metatable".as_ptr());
    }
    ffi::lua_setmetatable(state, -2);
}

/// Borrow the payload of a userdata created by [`push_userdata`] with `meta`.
pub(crate) unsafe fn userdata_ref<'a, T: 'static>(
    state: *mut ffi::lua_State,
    index: c_int,
    meta: &CStr,
) -> Option<&'a T> {
    let slot = ffi::luaL_testudata(state, index, meta.as_ptr()) as *const Option<T>;
    if slot.is_null() {
        return None;
    }
    (*slot).as_ref()
}

/// Borrow the payload of a userdata known to have been created with type `T`.
pub(crate) unsafe fn userdata_ref_unchecked<'a, T: 'static>(
    state: *mut ffi::lua_State,
    index: c_int,
) -> Option<&'a T> {
    let slot = ffi::lua_touserdata(state, index) as *const Option<T>;
    if slot.is_null() {
        return None;
    }
    (*slot).as_ref()
}

unsafe extern "C-unwind" fn collect_userdata<T: 'static>(state: *mut ffi::lua_State) -> c_int {
    let slot = ffi::lua_touserdata(state, 1) as *mut Option<T>;
    if !slot.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| drop((*slot).take())));
    }
    0
}

/// Render a panic payload for an error message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Raise `message` as an engine error. Never returns.
///
/// Takes the message by value and drops it before the engine unwinds, so no
/// Rust-owned resource is left on this frame when control leaves it.
pub(crate) unsafe fn raise(state: *mut ffi::lua_State, message: String) -> c_int {
    ffi::lua_checkstack(state, 1);
    push_bytes(state, message.as_bytes());
    drop(message);
    ffi::lua_error(state)
}
