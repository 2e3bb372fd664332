//! Coroutine threads.
//!
//! A [`ThreadHandle`] keeps its coroutine alive through a registry reference
//! until the last clone is dropped. Each coroutine has its own stack, reached
//! through [`ThreadHandle::stack`]; values move between stacks only with
//! [`Context::transfer`] or by pushing a handle.

use crate::context::Context;
use crate::raw;
use crate::state::VmShared;
use crate::value::Value;
use mlua_sys as ffi;
use selune_bridge_core::{BridgeError, Result, StackId};
use std::ffi::c_int;
use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::rc::Rc;

/// Coroutine lifecycle states, as `coroutine.status` reports them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoroutineStatus {
    /// Created or yielded: ready to be resumed.
    Suspended,
    /// The thread asking.
    Running,
    /// Resumed another coroutine and waiting for it.
    Normal,
    /// Finished or failed.
    Dead,
}

/// What a resumed coroutine handed back.
#[derive(Clone, Debug, PartialEq)]
pub enum Resume {
    Yielded(Vec<Value>),
    Returned(Vec<Value>),
}

impl Resume {
    pub fn values(&self) -> &[Value] {
        match self {
            Resume::Yielded(v) | Resume::Returned(v) => v,
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            Resume::Yielded(v) | Resume::Returned(v) => v,
        }
    }
}

struct Anchor {
    thread: NonNull<ffi::lua_State>,
    reference: c_int,
    vm: Rc<VmShared>,
}

impl Drop for Anchor {
    fn drop(&mut self) {
        if !self.vm.closed.get() {
            unsafe {
                ffi::luaL_unref(self.vm.main.as_ptr(), ffi::LUA_REGISTRYINDEX, self.reference)
            };
        }
    }
}

/// A live reference to a coroutine (or the main thread) of a VM instance.
#[derive(Clone)]
pub struct ThreadHandle {
    anchor: Rc<Anchor>,
}

impl ThreadHandle {
    /// Anchor the thread at absolute position `pos` of `ctx`.
    pub(crate) fn capture(ctx: &mut Context, pos: i32) -> Result<ThreadHandle> {
        let vm = ctx.shared()?;
        ctx.check_stack(1)?;
        let state = ctx.as_ptr();
        let thread = unsafe { NonNull::new(ffi::lua_tothread(state, pos)) }
            .ok_or_else(|| BridgeError::UnsupportedValue("slot does not hold a thread".into()))?;
        let reference = unsafe {
            ffi::lua_pushvalue(state, pos);
            ffi::luaL_ref(state, ffi::LUA_REGISTRYINDEX)
        };
        Ok(ThreadHandle {
            anchor: Rc::new(Anchor {
                thread,
                reference,
                vm,
            }),
        })
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut ffi::lua_State {
        self.anchor.thread.as_ptr()
    }

    pub fn stack_id(&self) -> StackId {
        StackId(self.as_ptr() as usize)
    }

    /// Whether this thread lives in the same VM instance as `ctx`.
    pub fn belongs_to(&self, ctx: &Context) -> Result<bool> {
        if self.anchor.vm.closed.get() {
            return Ok(false);
        }
        Ok(Rc::ptr_eq(&self.anchor.vm, &ctx.shared()?))
    }

    /// A view of this coroutine's own stack.
    ///
    /// The view keeps the interpreter alive: dropping the [`State`](crate::State)
    /// while it is open defers the close until the view is gone.
    pub fn stack(&self) -> Result<ThreadStack<'_>> {
        let vm = &self.anchor.vm;
        if vm.closed.get() {
            return Err(BridgeError::UnsupportedValue("thread outlived its VM".into()));
        }
        vm.acquire_view();
        Ok(ThreadStack {
            ctx: unsafe { Context::from_raw(self.anchor.thread) },
            vm: Rc::clone(vm),
            _handle: PhantomData,
        })
    }

    /// Status as seen from the thread running `from`.
    pub fn status(&self, from: &Context) -> CoroutineStatus {
        let co = self.as_ptr();
        if self.anchor.vm.closed.get() {
            return CoroutineStatus::Dead;
        }
        if co == from.as_ptr() {
            return CoroutineStatus::Running;
        }
        unsafe {
            match ffi::lua_status(co) {
                ffi::LUA_YIELD => CoroutineStatus::Suspended,
                ffi::LUA_OK => {
                    let mut ar = MaybeUninit::<ffi::lua_Debug>::uninit();
                    if ffi::lua_getstack(co, 0, ar.as_mut_ptr()) != 0 {
                        CoroutineStatus::Normal
                    } else if ffi::lua_gettop(co) == 0 {
                        CoroutineStatus::Dead
                    } else {
                        CoroutineStatus::Suspended
                    }
                }
                _ => CoroutineStatus::Dead,
            }
        }
    }

    /// Resume the coroutine from the thread running `from`, passing `args`.
    ///
    /// A fresh coroutine starts the function sitting on its stack. Results or
    /// yielded values are read off the coroutine's stack and removed.
    pub fn resume(&self, from: &mut Context, args: &[Value]) -> Result<Resume> {
        if !self.belongs_to(from)? {
            return Err(BridgeError::UnsupportedValue(
                "cannot resume a coroutine of another VM instance".into(),
            ));
        }
        match self.status(from) {
            CoroutineStatus::Suspended => {}
            CoroutineStatus::Dead => {
                return Err(BridgeError::Call("cannot resume dead coroutine".into()))
            }
            _ => {
                return Err(BridgeError::Call(
                    "cannot resume non-suspended coroutine".into(),
                ))
            }
        }
        let mut co = self.stack()?;
        let base = co.top();
        let nargs = c_int::try_from(args.len())
            .map_err(|_| BridgeError::StackOverflow { requested: c_int::MAX })?;
        if let Err(err) = co.push_all(args) {
            co.truncate(base);
            return Err(err);
        }
        let mut nresults: c_int = 0;
        let status = unsafe { ffi::lua_resume(co.as_ptr(), from.as_ptr(), nargs, &mut nresults) };
        match status {
            ffi::LUA_OK => Ok(Resume::Returned(co.pop_values(nresults)?)),
            ffi::LUA_YIELD => Ok(Resume::Yielded(co.pop_values(nresults)?)),
            _ => Err(BridgeError::Call(unsafe { raw::pop_error_text(co.as_ptr()) })),
        }
    }
}

impl PartialEq for ThreadHandle {
    fn eq(&self, other: &Self) -> bool {
        self.anchor.thread == other.anchor.thread && Rc::ptr_eq(&self.anchor.vm, &other.anchor.vm)
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread: {:p}", self.as_ptr())
    }
}

/// A coroutine's stack, borrowed from its handle.
pub struct ThreadStack<'a> {
    ctx: Context,
    vm: Rc<VmShared>,
    _handle: PhantomData<&'a ThreadHandle>,
}

impl Drop for ThreadStack<'_> {
    fn drop(&mut self) {
        self.vm.release_view();
    }
}

impl Deref for ThreadStack<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.ctx
    }
}

impl DerefMut for ThreadStack<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }
}

impl Context {
    /// Create a coroutine sharing this VM. Its stack starts empty.
    pub fn new_thread(&mut self) -> Result<ThreadHandle> {
        self.check_stack(2)?;
        unsafe { ffi::lua_newthread(self.as_ptr()) };
        let top = self.top();
        let handle = ThreadHandle::capture(self, top);
        self.truncate(top - 1);
        handle
    }

    /// A handle to the thread this context belongs to.
    pub fn current_thread(&mut self) -> Result<ThreadHandle> {
        self.check_stack(2)?;
        unsafe { ffi::lua_pushthread(self.as_ptr()) };
        let top = self.top();
        let handle = ThreadHandle::capture(self, top);
        self.truncate(top - 1);
        handle
    }
}
