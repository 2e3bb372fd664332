//! Moving values between host and VM stack.

use crate::context::Context;
use crate::raw;
use crate::thread::ThreadHandle;
use crate::value::{Foreign, Value};
use mlua_sys as ffi;
use selune_bridge_core::index::resolve_window;
use selune_bridge_core::{BridgeError, OpaqueHandle, Result, Text, TypeTag};
use std::any::Any;
use std::ffi::CStr;
use std::ptr;
use std::rc::Rc;

pub(crate) const FOREIGN_META: &CStr = c"selune.foreign";

impl Context {
    /// Push one value onto the top of the stack.
    ///
    /// A thread handle can only be pushed onto a stack of its own VM instance.
    /// Handles from another instance fail with `UnsupportedValue`, since the
    /// engine cannot move values between independent states.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
        self.push_value(&value.into())
    }

    /// Push one value by reference.
    pub fn push_value(&mut self, value: &Value) -> Result<()> {
        self.check_stack(3)?;
        let state = self.as_ptr();
        match value {
            Value::Nil => unsafe { ffi::lua_pushnil(state) },
            Value::Boolean(b) => unsafe { ffi::lua_pushboolean(state, *b as _) },
            Value::Integer(i) => unsafe { ffi::lua_pushinteger(state, *i) },
            Value::Float(f) => unsafe { ffi::lua_pushnumber(state, *f) },
            Value::Text(t) => unsafe { raw::push_bytes(state, t.as_bytes()) },
            Value::Function(func) => self.push_function(func),
            Value::Thread(thread) => self.push_thread(thread)?,
            Value::Opaque(handle) => {
                self.validate(handle)?;
                unsafe { ffi::lua_pushvalue(state, handle.position()) };
            }
            Value::Foreign(foreign) => unsafe {
                raw::push_userdata::<Rc<dyn Any>>(state, Rc::clone(&foreign.0), FOREIGN_META)
            },
        }
        Ok(())
    }

    /// Push every value in order. Stops at the first failure.
    pub fn push_all(&mut self, values: &[Value]) -> Result<()> {
        self.check_stack_for(values.len())?;
        values.iter().try_for_each(|v| self.push_value(v))
    }

    fn push_thread(&mut self, thread: &ThreadHandle) -> Result<()> {
        if !thread.belongs_to(self)? {
            return Err(BridgeError::UnsupportedValue(
                "thread handle belongs to a different VM instance".into(),
            ));
        }
        let state = self.as_ptr();
        let source = thread.as_ptr();
        unsafe {
            if source == state {
                ffi::lua_pushthread(state);
            } else {
                if ffi::lua_checkstack(source, 1) == 0 {
                    return Err(BridgeError::StackOverflow { requested: 1 });
                }
                ffi::lua_pushthread(source);
                ffi::lua_xmove(source, state, 1);
            }
        }
        Ok(())
    }

    /// Read the value at `index` without changing the stack.
    pub fn read(&mut self, index: i32) -> Result<Value> {
        let pos = self.resolve(index)?;
        self.check_stack(2)?;
        let state = self.as_ptr();
        let value = unsafe {
            match raw::type_at(state, pos) {
                TypeTag::None | TypeTag::Nil => Value::Nil,
                TypeTag::Boolean => Value::Boolean(ffi::lua_toboolean(state, pos) != 0),
                // Integer subtype first: a whole-valued float stays a float.
                TypeTag::Number if ffi::lua_isinteger(state, pos) != 0 => {
                    Value::Integer(ffi::lua_tointegerx(state, pos, ptr::null_mut()))
                }
                TypeTag::Number => Value::Float(ffi::lua_tonumberx(state, pos, ptr::null_mut())),
                TypeTag::String => Value::Text(Text::new(raw::string_bytes(state, pos))),
                TypeTag::Thread => Value::Thread(ThreadHandle::capture(self, pos)?),
                tag => Value::Opaque(OpaqueHandle::new(
                    tag,
                    raw::display_name(state, pos, tag),
                    pos,
                    self.stack_id(),
                )),
            }
        };
        Ok(value)
    }

    /// Read `count` values starting at `start` (default `-count`), lowest
    /// position first. The stack is left as it was.
    pub fn read_batch(&mut self, count: i32, start: Option<i32>) -> Result<Vec<Value>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let first = resolve_window(count, start, self.top())?;
        (first..first + count).map(|pos| self.read(pos)).collect()
    }

    /// Read and pop the top `count` values, in push order.
    pub fn pop_values(&mut self, count: i32) -> Result<Vec<Value>> {
        let values = self.read_batch(count, None)?;
        self.pop(count)?;
        Ok(values)
    }

    /// Check that `handle` still describes the value at its position.
    pub fn validate(&mut self, handle: &OpaqueHandle) -> Result<()> {
        let pos = handle.position();
        let current = if pos >= 1 && pos <= self.top() {
            self.check_stack(2)?;
            Some(unsafe { raw::describe(self.as_ptr(), pos) })
        } else {
            None
        };
        handle.check(
            self.stack_id(),
            current.as_ref().map(|(tag, name)| (*tag, name.as_str())),
        )
    }

    /// Recover a [`Foreign`] value pushed earlier. `None` if the slot holds
    /// anything else.
    pub fn read_foreign(&mut self, index: i32) -> Result<Option<Foreign>> {
        let pos = self.resolve(index)?;
        self.check_stack(2)?;
        let payload = unsafe { raw::userdata_ref::<Rc<dyn Any>>(self.as_ptr(), pos, FOREIGN_META) };
        Ok(payload.map(|rc| Foreign(Rc::clone(rc))))
    }
}
