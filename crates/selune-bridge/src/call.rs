//! Loading chunks and protected calls.

use crate::context::Context;
use crate::raw;
use crate::value::Value;
use mlua_sys as ffi;
use selune_bridge_core::{BridgeError, Result, TypeTag};
use std::ffi::{c_char, c_int, CStr, CString};
use tracing::{debug, trace};

/// How many results a call should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultCount {
    /// Every value the callee returns.
    Variable,
    /// Exactly this many, padded with nil or truncated.
    Fixed(u16),
}

impl ResultCount {
    fn as_raw(self) -> c_int {
        match self {
            ResultCount::Variable => ffi::LUA_MULTRET,
            ResultCount::Fixed(n) => c_int::from(n),
        }
    }
}

/// Which chunk formats `load` accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadMode {
    Text,
    Binary,
    Any,
}

impl LoadMode {
    fn as_cstr(self) -> &'static CStr {
        match self {
            LoadMode::Text => c"t",
            LoadMode::Binary => c"b",
            LoadMode::Any => c"bt",
        }
    }
}

/// Raw outcome of loading a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Ok,
    Syntax,
    Memory,
    Other(i32),
}

impl LoadStatus {
    fn from_code(code: c_int) -> Self {
        match code {
            ffi::LUA_OK => LoadStatus::Ok,
            ffi::LUA_ERRSYNTAX => LoadStatus::Syntax,
            ffi::LUA_ERRMEM => LoadStatus::Memory,
            other => LoadStatus::Other(other),
        }
    }

    pub fn is_ok(self) -> bool {
        self == LoadStatus::Ok
    }
}

unsafe extern "C-unwind" fn len_of_first(state: *mut ffi::lua_State) -> c_int {
    ffi::lua_len(state, 1);
    1
}

impl Context {
    /// Compile `chunk` and push the resulting function.
    pub fn load(&mut self, chunk: &[u8]) -> Result<()> {
        let name = self.shared()?.chunk_name.clone();
        self.load_with(chunk, &name, LoadMode::Any)
    }

    /// Compile `chunk` under `name`, accepting only `mode` formats.
    pub fn load_named(&mut self, chunk: &[u8], name: &str, mode: LoadMode) -> Result<()> {
        let name = chunk_name(name)?;
        self.load_with(chunk, &name, mode)
    }

    /// Compile `chunk` and report the engine's status without converting it.
    ///
    /// The stack holds the function on success, or whatever the engine left
    /// for the failure (normally one error message).
    pub fn try_load(&mut self, chunk: &[u8]) -> Result<LoadStatus> {
        let name = self.shared()?.chunk_name.clone();
        self.try_load_with(chunk, &name, LoadMode::Any)
    }

    fn try_load_with(&mut self, chunk: &[u8], name: &CStr, mode: LoadMode) -> Result<LoadStatus> {
        self.check_stack(1)?;
        let code = unsafe {
            ffi::luaL_loadbufferx(
                self.as_ptr(),
                chunk.as_ptr() as *const c_char,
                chunk.len(),
                name.as_ptr(),
                mode.as_cstr().as_ptr(),
            )
        };
        Ok(LoadStatus::from_code(code))
    }

    fn load_with(&mut self, chunk: &[u8], name: &CStr, mode: LoadMode) -> Result<()> {
        let base = self.top();
        if self.try_load_with(chunk, name, mode)?.is_ok() {
            return Ok(());
        }
        // The engine normally leaves one message; be ready for it not to.
        let description = if self.top() == base + 1 && self.type_of(-1)? == TypeTag::String {
            Some(unsafe { raw::pop_error_text(self.as_ptr()) })
        } else {
            None
        };
        self.truncate(base);
        let err = BridgeError::compile(description);
        debug!(target: "selune::bridge", error = %err, "chunk failed to load");
        Err(err)
    }

    /// Call the function on top of the stack with `args`, returning all results.
    pub fn call(&mut self, args: &[Value]) -> Result<Vec<Value>> {
        self.call_with(args, ResultCount::Variable)
    }

    /// Call the function on top of the stack with `args`.
    ///
    /// The callable and its arguments are consumed whatever the outcome; the
    /// results are read in order and removed, so the stack ends one shorter
    /// than before the call.
    pub fn call_with(&mut self, args: &[Value], results: ResultCount) -> Result<Vec<Value>> {
        let produced = self.call_in_place(args, results)?;
        let base = self.top() - produced;
        let values = self.read_batch(produced, Some(base + 1));
        self.truncate(base);
        values
    }

    /// Like [`call_with`](Self::call_with) but leaves the results on the
    /// stack, returning their count. Opaque results stay valid this way.
    pub fn call_in_place(&mut self, args: &[Value], results: ResultCount) -> Result<i32> {
        let depth = self.top();
        if depth < 1 {
            return Err(BridgeError::Index { index: -1, depth });
        }
        let base = depth - 1;
        let nargs = c_int::try_from(args.len())
            .map_err(|_| BridgeError::StackOverflow { requested: c_int::MAX })?;
        if let Err(err) = self.push_all(args) {
            self.truncate(base);
            return Err(err);
        }
        self.protected_call(nargs, results, base)
    }

    /// Run a protected call of the function at `base + 1` with the `nargs`
    /// values above it. On failure the stack is cut back to `base`.
    pub(crate) fn protected_call(
        &mut self,
        nargs: c_int,
        results: ResultCount,
        base: i32,
    ) -> Result<i32> {
        if let ResultCount::Fixed(n) = results {
            // Results may outnumber the callable plus arguments they replace.
            self.check_stack(i32::from(n) - nargs - 1)?;
        }
        trace!(target: "selune::bridge", nargs, ?results, "protected call");
        let status = unsafe { ffi::lua_pcall(self.as_ptr(), nargs, results.as_raw(), 0) };
        if status != ffi::LUA_OK {
            let message = unsafe { raw::pop_error_text(self.as_ptr()) };
            self.truncate(base);
            debug!(target: "selune::bridge", status, %message, "protected call failed");
            return Err(BridgeError::Call(message));
        }
        // Results sit where the callable was: count from one below it.
        Ok(self.top() - base)
    }

    /// Length of the value at `index` as the `#` operator computes it,
    /// honouring `__len`. Runs protected; a failing metamethod is a call error.
    pub fn len(&mut self, index: i32) -> Result<Value> {
        let pos = self.resolve(index)?;
        self.check_stack(2)?;
        let base = self.top();
        unsafe {
            ffi::lua_pushcfunction(self.as_ptr(), len_of_first);
            ffi::lua_pushvalue(self.as_ptr(), pos);
        }
        self.protected_call(1, ResultCount::Fixed(1), base)?;
        let value = self.read(-1);
        self.truncate(base);
        value
    }
}

pub(crate) fn chunk_name(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| {
        BridgeError::UnsupportedValue(format!("chunk name {name:?} contains a NUL byte"))
    })
}
