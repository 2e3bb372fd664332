//! Owned interpreter instances.

use crate::call::chunk_name;
use crate::config::Config;
use crate::context::Context;
use crate::fatal;
use crate::raw;
use mlua_sys as ffi;
use selune_bridge_core::{BridgeError, Result};
use std::cell::Cell;
use std::ffi::{c_void, CString};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::rc::Rc;
use tracing::debug;

/// Bookkeeping shared by every thread of one VM instance.
///
/// The registry holds one strong count (as a light userdata) so contexts
/// created inside native calls can reach it.
///
/// `closed` is set once the owning [`State`] is gone. The interpreter itself
/// is only freed when no [`ThreadStack`](crate::ThreadStack) view is left.
pub(crate) struct VmShared {
    pub(crate) main: NonNull<ffi::lua_State>,
    pub(crate) closed: Cell<bool>,
    pub(crate) views: Cell<usize>,
    pub(crate) chunk_name: CString,
}

impl VmShared {
    pub(crate) fn acquire_view(&self) {
        self.views.set(self.views.get() + 1);
    }

    pub(crate) fn release_view(self: &Rc<Self>) {
        let left = self.views.get().saturating_sub(1);
        self.views.set(left);
        if left == 0 && self.closed.get() {
            self.shutdown();
        }
    }

    /// Free the interpreter. Runs exactly once: after the owner is dropped
    /// and the last view is released, whichever comes second.
    fn shutdown(self: &Rc<Self>) {
        unsafe {
            ffi::lua_close(self.main.as_ptr());
            // Release the count held by the registry.
            drop(Rc::from_raw(Rc::as_ptr(self)));
        }
        debug!(target: "selune::bridge", "state closed");
    }
}

/// An interpreter instance. Dereferences to the main thread's [`Context`].
pub struct State {
    ctx: Context,
    shared: Rc<VmShared>,
}

impl State {
    /// Create a state, opening all standard libraries or none.
    pub fn new(open_std_libs: bool) -> Result<State> {
        State::with_config(Config::default().open_std_libs(open_std_libs))
    }

    pub fn with_config(config: Config) -> Result<State> {
        let chunk_name = chunk_name(&config.chunk_name)?;
        let main = NonNull::new(unsafe { ffi::luaL_newstate() }).ok_or(BridgeError::Allocation)?;
        if let Some(hook) = config.fatal_hook.clone() {
            fatal::install(hook);
        }
        let shared = Rc::new(VmShared {
            main,
            closed: Cell::new(false),
            views: Cell::new(0),
            chunk_name,
        });
        unsafe {
            let state = main.as_ptr();
            ffi::lua_atpanic(state, fatal::on_panic);
            ffi::lua_pushlightuserdata(state, Rc::into_raw(Rc::clone(&shared)) as *mut c_void);
            ffi::lua_rawsetp(state, ffi::LUA_REGISTRYINDEX, raw::shared_key());
        }
        let mut state = State {
            ctx: unsafe { Context::from_raw(main) },
            shared,
        };
        if config.open_std_libs {
            state.open_std_libs()?;
        } else {
            for lib in &config.libs {
                state.open_lib(*lib)?;
            }
        }
        debug!(target: "selune::bridge", ?config, "state created");
        Ok(state)
    }

    /// Close the interpreter, running pending finalizers.
    ///
    /// Open [`ThreadStack`](crate::ThreadStack) views keep the interpreter
    /// alive until they are dropped.
    pub fn close(self) {
        drop(self);
    }
}

impl Deref for State {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.ctx
    }
}

impl DerefMut for State {
    fn deref_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }
}

impl Drop for State {
    fn drop(&mut self) {
        if self.shared.closed.replace(true) {
            return;
        }
        if self.shared.views.get() == 0 {
            self.shared.shutdown();
        } else {
            debug!(
                target: "selune::bridge",
                views = self.shared.views.get(),
                "state dropped, close deferred"
            );
        }
    }
}
