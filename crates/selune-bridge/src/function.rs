//! Host functions callable from the VM.
//!
//! Two shapes are supported. A raw function gets the caller's context, reads
//! its own arguments and returns how many results it pushed. A list function
//! gets its arguments already read and returns its results as a vector; the
//! bridge reads and pushes around it. The shape picks the native entry point
//! once, when the function is pushed.

use crate::context::Context;
use crate::raw;
use crate::value::Value;
use mlua_sys as ffi;
use selune_bridge_core::{BridgeError, Result};
use std::ffi::{c_int, CStr};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::NonNull;
use std::rc::Rc;

pub type RawFn = dyn Fn(&mut Context) -> Result<usize>;
pub type ListFn = dyn Fn(&mut Context, Vec<Value>) -> Result<Vec<Value>>;

const RAW_META: &CStr = c"selune.raw_function";
const LIST_META: &CStr = c"selune.list_function";

/// A host callable, in one of the two calling shapes.
#[derive(Clone)]
pub enum HostFunction {
    Raw(Rc<RawFn>),
    List(Rc<ListFn>),
}

impl HostFunction {
    /// Wrap a function that works the stack directly.
    pub fn raw<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> Result<usize> + 'static,
    {
        HostFunction::Raw(Rc::new(f))
    }

    /// Wrap a function over argument and result lists.
    pub fn list<F>(f: F) -> Self
    where
        F: Fn(&mut Context, Vec<Value>) -> Result<Vec<Value>> + 'static,
    {
        HostFunction::List(Rc::new(f))
    }

    pub fn ptr_eq(&self, other: &HostFunction) -> bool {
        match (self, other) {
            (HostFunction::Raw(a), HostFunction::Raw(b)) => Rc::ptr_eq(a, b),
            (HostFunction::List(a), HostFunction::List(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostFunction::Raw(func) => {
                write!(f, "host function (raw): {:p}", Rc::as_ptr(func) as *const ())
            }
            HostFunction::List(func) => {
                write!(f, "host function (list): {:p}", Rc::as_ptr(func) as *const ())
            }
        }
    }
}

impl Context {
    /// Install `func` as a native closure on top of the stack. Needs three
    /// free slots.
    pub(crate) fn push_function(&mut self, func: &HostFunction) {
        let state = self.as_ptr();
        unsafe {
            match func {
                HostFunction::Raw(f) => {
                    raw::push_userdata::<Rc<RawFn>>(state, Rc::clone(f), RAW_META);
                    ffi::lua_pushcclosure(state, call_raw, 1);
                }
                HostFunction::List(f) => {
                    raw::push_userdata::<Rc<ListFn>>(state, Rc::clone(f), LIST_META);
                    ffi::lua_pushcclosure(state, call_list, 1);
                }
            }
        }
    }
}

unsafe extern "C-unwind" fn call_raw(state: *mut ffi::lua_State) -> c_int {
    let outcome = catch_unwind(AssertUnwindSafe(|| invoke_raw(state)));
    finish(state, outcome)
}

unsafe extern "C-unwind" fn call_list(state: *mut ffi::lua_State) -> c_int {
    let outcome = catch_unwind(AssertUnwindSafe(|| invoke_list(state)));
    finish(state, outcome)
}

unsafe fn entry_context(state: *mut ffi::lua_State) -> Result<Context> {
    NonNull::new(state)
        .map(|raw| Context::from_raw(raw))
        .ok_or_else(|| BridgeError::runtime("native call without an interpreter thread"))
}

unsafe fn invoke_raw(state: *mut ffi::lua_State) -> Result<c_int> {
    let func = raw::userdata_ref_unchecked::<Rc<RawFn>>(state, ffi::lua_upvalueindex(1))
        .map(Rc::clone)
        .ok_or_else(|| BridgeError::runtime("host function was already collected"))?;
    let mut ctx = entry_context(state)?;
    let count = func(&mut ctx)?;
    let depth = ctx.top();
    match c_int::try_from(count) {
        Ok(n) if n <= depth => Ok(n),
        _ => Err(BridgeError::runtime(format!(
            "host function reported {count} results but the stack holds {depth}"
        ))),
    }
}

unsafe fn invoke_list(state: *mut ffi::lua_State) -> Result<c_int> {
    let func = raw::userdata_ref_unchecked::<Rc<ListFn>>(state, ffi::lua_upvalueindex(1))
        .map(Rc::clone)
        .ok_or_else(|| BridgeError::runtime("host function was already collected"))?;
    let mut ctx = entry_context(state)?;
    let argc = ctx.top();
    let args = ctx.read_batch(argc, Some(1))?;
    let results = func(&mut ctx, args)?;
    ctx.push_all(&results)?;
    c_int::try_from(results.len())
        .map_err(|_| BridgeError::runtime("too many results from host function"))
}

/// Turn the outcome of a host call into a result count, or raise it.
unsafe fn finish(state: *mut ffi::lua_State, outcome: std::thread::Result<Result<c_int>>) -> c_int {
    let message = match outcome {
        Ok(Ok(count)) => return count,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("host function panicked: {}", raw::panic_message(&*payload)),
    };
    raw::raise(state, message)
}
