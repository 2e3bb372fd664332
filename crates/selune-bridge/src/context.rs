//! Stack context: a view of one interpreter stack.

use crate::raw;
use crate::state::VmShared;
use mlua_sys as ffi;
use selune_bridge_core::index::{self, resolve_window};
use selune_bridge_core::{BridgeError, Result, StackId, TypeTag};
use std::ffi::c_int;
use std::ptr::NonNull;
use std::rc::Rc;

/// A view of one stack of a live interpreter: the main thread or a coroutine.
///
/// A context never owns the interpreter. Host functions receive the context of
/// the thread that called them and must push their results there.
pub struct Context {
    raw: NonNull<ffi::lua_State>,
}

impl Context {
    /// Wrap a live interpreter thread.
    ///
    /// # Safety
    /// `raw` must point to a live thread for as long as the context is used.
    pub(crate) unsafe fn from_raw(raw: NonNull<ffi::lua_State>) -> Self {
        Context { raw }
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut ffi::lua_State {
        self.raw.as_ptr()
    }

    /// Identity of this stack, recorded by opaque handles.
    pub fn stack_id(&self) -> StackId {
        StackId(self.raw.as_ptr() as usize)
    }

    /// The bookkeeping shared by every thread of this VM instance.
    pub(crate) fn shared(&self) -> Result<Rc<VmShared>> {
        let state = self.as_ptr();
        unsafe {
            if ffi::lua_checkstack(state, 1) == 0 {
                return Err(BridgeError::StackOverflow { requested: 1 });
            }
            ffi::lua_rawgetp(state, ffi::LUA_REGISTRYINDEX, raw::shared_key());
            let ptr = ffi::lua_touserdata(state, -1) as *const VmShared;
            ffi::lua_pop(state, 1);
            if ptr.is_null() {
                return Err(BridgeError::UnsupportedValue(
                    "interpreter was not created by this bridge".into(),
                ));
            }
            Rc::increment_strong_count(ptr);
            Ok(Rc::from_raw(ptr))
        }
    }

    /// True when both contexts are threads of the same VM instance.
    pub fn same_vm(&self, other: &Context) -> bool {
        match (self.shared(), other.shared()) {
            (Ok(a), Ok(b)) => Rc::ptr_eq(&a, &b),
            _ => false,
        }
    }

    // ---- Depth and indices ----

    /// Current stack depth.
    pub fn top(&self) -> i32 {
        unsafe { ffi::lua_gettop(self.as_ptr()) }
    }

    /// Set the stack depth. Growing fills with nil; a negative value is an
    /// index whose slot becomes the new top.
    pub fn set_top(&mut self, top: i32) -> Result<()> {
        let target = if top < 0 { self.resolve(top)? } else { top };
        let depth = self.top();
        if target > depth {
            self.check_stack(target - depth)?;
        }
        unsafe { ffi::lua_settop(self.as_ptr(), target) };
        Ok(())
    }

    /// Resolve a signed index against the current depth.
    pub fn resolve(&self, index: i32) -> Result<i32> {
        index::resolve(index, self.top())
    }

    /// Make room for `extra` more values.
    pub fn check_stack(&mut self, extra: i32) -> Result<()> {
        if extra <= 0 {
            return Ok(());
        }
        if unsafe { ffi::lua_checkstack(self.as_ptr(), extra) } == 0 {
            return Err(BridgeError::StackOverflow { requested: extra });
        }
        Ok(())
    }

    pub(crate) fn check_stack_for(&mut self, count: usize) -> Result<()> {
        let extra = c_int::try_from(count).map_err(|_| BridgeError::StackOverflow {
            requested: c_int::MAX,
        })?;
        self.check_stack(extra)
    }

    /// Drop back to `depth` without checks. Only for unwinding our own pushes.
    pub(crate) fn truncate(&mut self, depth: i32) {
        unsafe { ffi::lua_settop(self.as_ptr(), depth) };
    }

    // ---- Stack manipulation ----

    /// Pop `count` values.
    pub fn pop(&mut self, count: i32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        resolve_window(count, None, self.top())?;
        unsafe { ffi::lua_pop(self.as_ptr(), count) };
        Ok(())
    }

    /// Remove the value at `index`, shifting the ones above it down.
    pub fn remove(&mut self, index: i32) -> Result<()> {
        let pos = self.resolve(index)?;
        unsafe { ffi::lua_remove(self.as_ptr(), pos) };
        Ok(())
    }

    /// Push a copy of the value at `index`.
    pub fn duplicate(&mut self, index: i32) -> Result<()> {
        let pos = self.resolve(index)?;
        self.check_stack(1)?;
        unsafe { ffi::lua_pushvalue(self.as_ptr(), pos) };
        Ok(())
    }

    /// Pop the top value into `index`.
    pub fn replace(&mut self, index: i32) -> Result<()> {
        let pos = self.resolve(index)?;
        unsafe { ffi::lua_replace(self.as_ptr(), pos) };
        Ok(())
    }

    /// Rotate the window from `index` to the top by `amount` positions toward
    /// the top. Negative amounts rotate toward the bottom.
    pub fn rotate(&mut self, index: i32, amount: i32) -> Result<()> {
        let pos = self.resolve(index)?;
        let window = self.top() - pos + 1;
        let shift = amount.rem_euclid(window);
        if shift != 0 {
            unsafe { ffi::lua_rotate(self.as_ptr(), pos, shift) };
        }
        Ok(())
    }

    /// Copy the value at `from` over the value at `to`.
    pub fn copy(&mut self, from: i32, to: i32) -> Result<()> {
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        unsafe { ffi::lua_copy(self.as_ptr(), src, dst) };
        Ok(())
    }

    // ---- Inspection ----

    pub fn type_of(&self, index: i32) -> Result<TypeTag> {
        let pos = self.resolve(index)?;
        Ok(unsafe { raw::type_at(self.as_ptr(), pos) })
    }

    /// Primitive length: string bytes, table border, userdata size. No metamethods.
    pub fn raw_len(&self, index: i32) -> Result<u64> {
        let pos = self.resolve(index)?;
        Ok(unsafe { ffi::lua_rawlen(self.as_ptr(), pos) } as u64)
    }

    // ---- Globals (raw access) ----

    /// Push the global `name` and return it as read.
    pub fn get_global(&mut self, name: &str) -> Result<crate::Value> {
        self.check_stack(3)?;
        let state = self.as_ptr();
        unsafe {
            ffi::lua_rawgeti(state, ffi::LUA_REGISTRYINDEX, ffi::LUA_RIDX_GLOBALS);
            raw::push_bytes(state, name.as_bytes());
            ffi::lua_rawget(state, -2);
            ffi::lua_remove(state, -2);
        }
        self.read(-1)
    }

    /// Pop the top value into the global `name`.
    pub fn set_global(&mut self, name: &str) -> Result<()> {
        self.resolve(-1)?;
        self.check_stack(3)?;
        let state = self.as_ptr();
        unsafe {
            ffi::lua_rawgeti(state, ffi::LUA_REGISTRYINDEX, ffi::LUA_RIDX_GLOBALS);
            raw::push_bytes(state, name.as_bytes());
            ffi::lua_pushvalue(state, -3);
            ffi::lua_rawset(state, -3);
            ffi::lua_pop(state, 2);
        }
        Ok(())
    }

    // ---- Cross-stack transfer ----

    /// Move the top `count` values of this stack onto `to`.
    ///
    /// Both stacks must be threads of the same VM. This stack shrinks by
    /// `count` and `to` grows by `count` in one engine operation.
    pub fn transfer(&mut self, to: &mut Context, count: i32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        resolve_window(count, None, self.top())?;
        if !self.same_vm(to) {
            return Err(BridgeError::UnsupportedValue(
                "cannot move values between independent VM instances".into(),
            ));
        }
        if self.raw == to.raw {
            return Ok(());
        }
        to.check_stack(count)?;
        unsafe { ffi::lua_xmove(self.as_ptr(), to.as_ptr(), count) };
        Ok(())
    }

    /// Raw pointer of this thread, for native code that needs the engine API.
    pub fn as_raw(&self) -> *mut ffi::lua_State {
        self.as_ptr()
    }
}
