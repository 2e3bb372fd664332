//! Standard libraries and module registration.

use crate::call::ResultCount;
use crate::context::Context;
use crate::function::HostFunction;
use crate::raw;
use crate::value::Value;
use mlua_sys as ffi;
use selune_bridge_core::Result;
use std::fmt;
use tracing::debug;

/// The engine's standard libraries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StdLib {
    Base,
    Package,
    Coroutine,
    Table,
    Io,
    Os,
    String,
    Utf8,
    Math,
    Debug,
}

impl StdLib {
    /// Every library, in the order the engine opens them.
    pub const ALL: [StdLib; 10] = [
        StdLib::Base,
        StdLib::Package,
        StdLib::Coroutine,
        StdLib::Table,
        StdLib::Io,
        StdLib::Os,
        StdLib::String,
        StdLib::Utf8,
        StdLib::Math,
        StdLib::Debug,
    ];

    /// Module name, which is also the global it is published under.
    pub fn name(self) -> &'static str {
        match self {
            StdLib::Base => "_G",
            StdLib::Package => "package",
            StdLib::Coroutine => "coroutine",
            StdLib::Table => "table",
            StdLib::Io => "io",
            StdLib::Os => "os",
            StdLib::String => "string",
            StdLib::Utf8 => "utf8",
            StdLib::Math => "math",
            StdLib::Debug => "debug",
        }
    }

    fn opener(self) -> ffi::lua_CFunction {
        match self {
            StdLib::Base => ffi::luaopen_base,
            StdLib::Package => ffi::luaopen_package,
            StdLib::Coroutine => ffi::luaopen_coroutine,
            StdLib::Table => ffi::luaopen_table,
            StdLib::Io => ffi::luaopen_io,
            StdLib::Os => ffi::luaopen_os,
            StdLib::String => ffi::luaopen_string,
            StdLib::Utf8 => ffi::luaopen_utf8,
            StdLib::Math => ffi::luaopen_math,
            StdLib::Debug => ffi::luaopen_debug,
        }
    }
}

/// Code that builds a module value. Called once with the module name.
#[derive(Clone)]
pub enum ModuleOpener {
    Native(ffi::lua_CFunction),
    Host(HostFunction),
}

impl fmt::Debug for ModuleOpener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleOpener::Native(func) => write!(f, "native opener: {:p}", *func as *const ()),
            ModuleOpener::Host(func) => write!(f, "{func:?}"),
        }
    }
}

impl Context {
    /// Register the module `name`, running `opener` unless the module is
    /// already loaded.
    ///
    /// The module value is recorded in the loaded-modules table, optionally
    /// published as a global, and left on top of the stack.
    pub fn register_module(
        &mut self,
        name: &str,
        opener: ModuleOpener,
        publish_global: bool,
    ) -> Result<Value> {
        let base = self.top();
        self.check_stack(5)?;
        let state = self.as_ptr();
        let loaded = base + 1;
        let loaded_before = unsafe {
            ffi::luaL_getsubtable(state, ffi::LUA_REGISTRYINDEX, raw::LOADED_TABLE.as_ptr());
            raw::push_bytes(state, name.as_bytes());
            ffi::lua_rawget(state, loaded);
            ffi::lua_toboolean(state, -1) != 0
        };
        if !loaded_before {
            self.truncate(loaded);
            match &opener {
                ModuleOpener::Native(func) => unsafe { ffi::lua_pushcfunction(state, *func) },
                ModuleOpener::Host(func) => self.push_function(func),
            }
            unsafe { raw::push_bytes(state, name.as_bytes()) };
            if let Err(err) = self.protected_call(1, ResultCount::Fixed(1), loaded) {
                self.truncate(base);
                return Err(err);
            }
            unsafe {
                raw::push_bytes(state, name.as_bytes());
                ffi::lua_pushvalue(state, -2);
                ffi::lua_rawset(state, loaded);
            }
        }
        unsafe { ffi::lua_remove(state, loaded) };
        if publish_global {
            self.duplicate(-1)?;
            self.set_global(name)?;
        }
        debug!(
            target: "selune::bridge",
            module = name,
            fresh = !loaded_before,
            publish_global,
            "module registered"
        );
        self.read(-1)
    }

    /// Open one standard library and publish it as a global.
    pub fn open_lib(&mut self, lib: StdLib) -> Result<()> {
        self.register_module(lib.name(), ModuleOpener::Native(lib.opener()), true)?;
        self.pop(1)
    }

    /// Open every standard library.
    pub fn open_std_libs(&mut self) -> Result<()> {
        StdLib::ALL.iter().try_for_each(|lib| self.open_lib(*lib))
    }
}
