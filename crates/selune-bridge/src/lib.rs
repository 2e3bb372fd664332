//! Selune host bridge: drive an embedded Lua 5.4 interpreter from Rust.
//!
//! Everything goes through the interpreter's value stack. A [`Context`] is a
//! view of one stack (the main thread or a coroutine); a [`State`] owns the
//! interpreter and dereferences to the context of its main thread.
//!
//! ```no_run
//! use selune_bridge::{State, Value};
//!
//! let mut state = State::new(true)?;
//! state.load(b"return ...")?;
//! let results = state.call(&[Value::Integer(1), Value::from("two")])?;
//! assert_eq!(results, vec![Value::Integer(1), Value::from("two")]);
//! # Ok::<(), selune_bridge::BridgeError>(())
//! ```

mod call;
pub mod config;
mod context;
pub mod fatal;
mod function;
mod marshal;
mod module;
mod raw;
mod state;
mod thread;
mod value;

pub use call::{LoadMode, LoadStatus, ResultCount};
pub use config::Config;
pub use context::Context;
pub use fatal::FatalHook;
pub use function::HostFunction;
pub use module::{ModuleOpener, StdLib};
pub use state::State;
pub use thread::{CoroutineStatus, Resume, ThreadHandle, ThreadStack};
pub use value::{Foreign, Value};

pub use selune_bridge_core::{BridgeError, OpaqueHandle, Result, StackId, Text, TypeTag};

/// The raw engine API, for native module openers.
pub use mlua_sys as ffi;
